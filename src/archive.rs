// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Archive format detection and extraction.
//!
//! Rootstrap recognizes archive formats purely by file name extension. An
//! archive is always extracted in place, i.e., into the directory that
//! contains it, which is expected to produce one top-level directory named
//! after the archive minus its extension.

use flate2::read::GzDecoder;
use std::{
    fs::File,
    io::BufReader,
    path::{Path, PathBuf},
};
use tar::Archive;
use tracing::{debug, instrument};

/// Recognized archive formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveKind {
    /// Gzip compressed tarball, `.tar.gz` or `.tgz`.
    TarGz,

    /// Uncompressed tarball, `.tar`.
    Tar,

    /// Zip archive, `.zip`.
    Zip,
}

impl ArchiveKind {
    const EXTENSIONS: [(&'static str, ArchiveKind); 4] = [
        (".tar.gz", ArchiveKind::TarGz),
        (".tgz", ArchiveKind::TarGz),
        (".tar", ArchiveKind::Tar),
        (".zip", ArchiveKind::Zip),
    ];

    /// Detect archive format from file name.
    pub fn from_file_name(name: impl AsRef<str>) -> Option<Self> {
        let name = name.as_ref();
        Self::EXTENSIONS
            .iter()
            .find(|(ext, _)| name.ends_with(ext))
            .map(|(_, kind)| *kind)
    }

    /// Strip recognized archive extension from file name.
    ///
    /// Returns [`None`] if file name does not carry a recognized extension,
    /// or would be empty after stripping.
    pub fn strip_extension(name: &str) -> Option<&str> {
        Self::EXTENSIONS
            .iter()
            .find_map(|(ext, _)| name.strip_suffix(ext))
            .filter(|stem| !stem.is_empty())
    }
}

/// Extract archive into target directory.
///
/// # Errors
///
/// - Return [`ArchiveError::Unsupported`] if archive format is unknown.
/// - Return [`ArchiveError::Open`] if archive file cannot be opened.
/// - Return [`ArchiveError::Unpack`] if tarball cannot be unpacked.
/// - Return [`ArchiveError::Zip`] if zip archive cannot be read.
#[instrument(skip(archive, dest), level = "debug")]
pub fn extract(archive: impl AsRef<Path>, dest: impl AsRef<Path>) -> Result<()> {
    let archive = archive.as_ref();
    let dest = dest.as_ref();
    let name = archive
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    let kind = ArchiveKind::from_file_name(&name).ok_or_else(|| ArchiveError::Unsupported {
        path: archive.to_path_buf(),
    })?;

    debug!("extract {:?} as {kind:?} into {:?}", archive.display(), dest.display());
    let file = File::open(archive).map_err(|err| ArchiveError::Open {
        source: err,
        path: archive.to_path_buf(),
    })?;

    let unpack_err = |err| ArchiveError::Unpack {
        source: err,
        path: archive.to_path_buf(),
    };
    match kind {
        ArchiveKind::TarGz => Archive::new(GzDecoder::new(BufReader::new(file)))
            .unpack(dest)
            .map_err(unpack_err)?,
        ArchiveKind::Tar => Archive::new(BufReader::new(file))
            .unpack(dest)
            .map_err(unpack_err)?,
        ArchiveKind::Zip => zip::ZipArchive::new(file)
            .and_then(|mut zip| zip.extract(dest))
            .map_err(|err| ArchiveError::Zip {
                source: err,
                path: archive.to_path_buf(),
            })?,
    }

    Ok(())
}

/// Archive error types.
#[derive(Debug, thiserror::Error)]
pub enum ArchiveError {
    /// Archive format not recognized.
    #[error("unsupported archive format {:?}", path.display())]
    Unsupported { path: PathBuf },

    /// Archive file cannot be opened.
    #[error("failed to open archive {:?}", path.display())]
    Open {
        #[source]
        source: std::io::Error,
        path: PathBuf,
    },

    /// Tarball cannot be unpacked.
    #[error("failed to unpack archive {:?}", path.display())]
    Unpack {
        #[source]
        source: std::io::Error,
        path: PathBuf,
    },

    /// Zip archive cannot be extracted.
    #[error("failed to extract zip archive {:?}", path.display())]
    Zip {
        #[source]
        source: zip::result::ZipError,
        path: PathBuf,
    },
}

/// Friendly result alias :3
pub type Result<T, E = ArchiveError> = std::result::Result<T, E>;
