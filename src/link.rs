// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Dotfile symlink management.
//!
//! Dotfile repositories keep the files meant for the home directory inside a
//! top-level `home` directory, without their leading dot. Linking such a
//! repository places a dot-prefixed symbolic link in the home directory for
//! every entry of `home`, pointing back at the repository's copy.
//!
//! Links always win. Whatever file or link sits at the destination is
//! removed before the new link is made. The one exception is a real
//! directory, which is never removed recursively.

use std::{
    fs::{read_dir, remove_file, symlink_metadata},
    io::ErrorKind,
    path::{Path, PathBuf},
};
use tracing::{debug, info, instrument};

/// Name of directory in dotfile repositories holding home directory content.
pub const HOME_DIR_NAME: &str = "home";

/// Replace target with symbolic link to source.
///
/// Removes any file or symbolic link, dangling or not, that already exists
/// at the target before creating the link.
///
/// # Errors
///
/// - Return [`LinkError::DirectoryInTheWay`] if target is a real directory.
/// - Return [`LinkError::Remove`] if existing target cannot be removed.
/// - Return [`LinkError::Symlink`] if link cannot be created.
#[instrument(skip(source, target), level = "debug")]
pub fn replace_symlink(source: impl AsRef<Path>, target: impl AsRef<Path>) -> Result<()> {
    let source = source.as_ref();
    let target = target.as_ref();

    match symlink_metadata(target) {
        Ok(meta) if meta.is_dir() => {
            return Err(LinkError::DirectoryInTheWay {
                target: target.to_path_buf(),
            })
        }
        Ok(_) => {
            debug!("remove existing {:?}", target.display());
            remove_file(target).map_err(|err| LinkError::Remove {
                source: err,
                target: target.to_path_buf(),
            })?;
        }
        Err(err) if err.kind() == ErrorKind::NotFound => {}
        Err(err) => {
            return Err(LinkError::Remove {
                source: err,
                target: target.to_path_buf(),
            })
        }
    }

    info!("link {:?} -> {:?}", target.display(), source.display());
    symlink(source, target).map_err(|err| LinkError::Symlink {
        source: err,
        target: target.to_path_buf(),
    })
}

/// Link every entry of repository's `home` directory into home directory.
///
/// Each entry `x` becomes link `<home>/.x`. Entries are linked in sorted
/// order. Returns the links that were made.
///
/// # Errors
///
/// - Return [`LinkError::ReadHome`] if `home` directory cannot be listed.
/// - Return any error of [`replace_symlink`].
#[instrument(skip(repo, home), level = "debug")]
pub fn link_home(repo: impl AsRef<Path>, home: impl AsRef<Path>) -> Result<Vec<PathBuf>> {
    let dothome = repo.as_ref().join(HOME_DIR_NAME);
    let read_err = |err| LinkError::ReadHome {
        source: err,
        path: dothome.clone(),
    };

    let mut entries = read_dir(&dothome)
        .map_err(read_err)?
        .map(|entry| entry.map(|entry| entry.file_name()))
        .collect::<std::io::Result<Vec<_>>>()
        .map_err(read_err)?;
    entries.sort();

    let mut links = Vec::with_capacity(entries.len());
    for name in entries {
        let mut dotname = std::ffi::OsString::from(".");
        dotname.push(&name);
        let target = home.as_ref().join(dotname);
        replace_symlink(dothome.join(&name), &target)?;
        links.push(target);
    }

    Ok(links)
}

#[cfg(unix)]
fn symlink(source: &Path, target: &Path) -> std::io::Result<()> {
    std::os::unix::fs::symlink(source, target)
}

#[cfg(windows)]
fn symlink(source: &Path, target: &Path) -> std::io::Result<()> {
    if source.is_dir() {
        std::os::windows::fs::symlink_dir(source, target)
    } else {
        std::os::windows::fs::symlink_file(source, target)
    }
}

/// Symlink management error types.
#[derive(Debug, thiserror::Error)]
pub enum LinkError {
    /// Repository `home` directory cannot be listed.
    #[error("failed to read dotfile directory {:?}", path.display())]
    ReadHome {
        #[source]
        source: std::io::Error,
        path: PathBuf,
    },

    /// Real directory occupies link target.
    #[error("refusing to replace directory {:?} with link", target.display())]
    DirectoryInTheWay { target: PathBuf },

    /// Existing link target cannot be removed.
    #[error("failed to remove existing {:?}", target.display())]
    Remove {
        #[source]
        source: std::io::Error,
        target: PathBuf,
    },

    /// Link cannot be created.
    #[error("failed to create link {:?}", target.display())]
    Symlink {
        #[source]
        source: std::io::Error,
        target: PathBuf,
    },
}

/// Friendly result alias :3
pub type Result<T, E = LinkError> = std::result::Result<T, E>;
