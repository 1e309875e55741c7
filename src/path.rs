// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Path resolution utilities.
//!
//! Determine relevent path information for the prefix directory that
//! rootstrap populates, and the directories needed to locate it.
//!
//! # Prefix Layout
//!
//! The __prefix directory__ is a user-local installation root analogous to
//! `/usr/local`, scoped to the operator's account. By default it lives at
//! `$HOME/.root`, and always contains the following directories:
//!
//! ```text
//! <prefix>/bin
//! <prefix>/include
//! <prefix>/lib
//! <prefix>/opt
//! <prefix>/tmp
//! <prefix>/var
//! <prefix>/share/doc
//! <prefix>/share/info
//! <prefix>/share/man
//! ```
//!
//! The `opt` directory is special. It houses extracted third-party source
//! and binary trees, and the existence of a tree in there is the only marker
//! rootstrap consults to decide if a tool is already installed.

use std::path::{Path, PathBuf};
use tracing::{debug, info, instrument};

/// Determine absolute path to user's home directory.
///
/// Does not check if the path returned actually exists.
///
/// # Errors
///
/// - Return [`NoWayHome`] if home directory path cannot be determined.
pub fn home_dir() -> Result<PathBuf, NoWayHome> {
    dirs::home_dir().ok_or(NoWayHome)
}

/// Determine default absolute path to manifest file.
///
/// Uses XDG Base Directory path `$XDG_CONFIG_HOME/rootstrap/manifest.toml`.
/// Does not check if the path returned actually exists.
///
/// # Errors
///
/// - Return [`NoWayHome`] if configuration directory cannot be determined.
pub fn default_manifest_path() -> Result<PathBuf, NoWayHome> {
    dirs::config_dir()
        .map(|path| path.join("rootstrap").join("manifest.toml"))
        .ok_or(NoWayHome)
}

/// Directory layout of home and prefix.
///
/// Carries the two roots every other component needs, so nothing has to
/// consult global state to find out where to put things.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Layout {
    home: PathBuf,
    prefix: PathBuf,
}

impl Layout {
    /// Construct new layout from explicit home and prefix paths.
    pub fn new(home: impl Into<PathBuf>, prefix: impl Into<PathBuf>) -> Self {
        Self {
            home: home.into(),
            prefix: prefix.into(),
        }
    }

    pub fn home(&self) -> &Path {
        self.home.as_path()
    }

    pub fn prefix(&self) -> &Path {
        self.prefix.as_path()
    }

    pub fn bin(&self) -> PathBuf {
        self.prefix.join("bin")
    }

    pub fn include(&self) -> PathBuf {
        self.prefix.join("include")
    }

    pub fn lib(&self) -> PathBuf {
        self.prefix.join("lib")
    }

    /// Directory holding extracted third-party trees.
    pub fn opt(&self) -> PathBuf {
        self.prefix.join("opt")
    }

    pub fn tmp(&self) -> PathBuf {
        self.prefix.join("tmp")
    }

    pub fn var(&self) -> PathBuf {
        self.prefix.join("var")
    }

    pub fn share(&self) -> PathBuf {
        self.prefix.join("share")
    }

    /// Full listing of directories that make up the prefix layout.
    pub fn directories(&self) -> Vec<PathBuf> {
        let share = self.share();
        vec![
            self.bin(),
            self.include(),
            self.lib(),
            self.opt(),
            self.tmp(),
            self.var(),
            share.join("doc"),
            share.join("info"),
            share.join("man"),
        ]
    }

    /// Create every directory of the prefix layout.
    ///
    /// Directories that already exist are left alone, so calling this more
    /// than once always yields the same directory set.
    ///
    /// # Errors
    ///
    /// - Return [`LayoutError::CreateDir`] if any directory cannot be created.
    #[instrument(skip(self), level = "debug")]
    pub fn initialize(&self) -> Result<(), LayoutError> {
        info!("initialize prefix layout at {:?}", self.prefix.display());
        for dir in self.directories() {
            match mkdirp::mkdirp(&dir) {
                Ok(Some(created)) => debug!("created {:?}", created.display()),
                Ok(None) => debug!("{:?} already exists", dir.display()),
                Err(err) => {
                    return Err(LayoutError::CreateDir {
                        source: err,
                        path: dir,
                    })
                }
            }
        }

        Ok(())
    }
}

/// No way to determine user's home directory.
///
/// # See Also
///
/// - [`dirs::home_dir`](https://docs.rs/dirs/latest/dirs/fn.home_dir.html)
#[derive(Clone, Debug, thiserror::Error)]
#[error("cannot determine absolute path to user's home directory")]
pub struct NoWayHome;

/// Prefix layout error types.
#[derive(Debug, thiserror::Error)]
pub enum LayoutError {
    /// Layout directory cannot be created.
    #[error("failed to create directory {:?}", path.display())]
    CreateDir {
        #[source]
        source: std::io::Error,
        path: PathBuf,
    },
}
