// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Fetch, extract, build, and install third-party tools.
//!
//! Each third-party tool is described by an [`InstallSpec`]. Installing one
//! is a single gated step:
//!
//! 1. Ask the operator. Declining skips the step without side effects.
//! 2. If the extracted directory already exists in the opt directory, the
//!    tool counts as fetched, so go straight to the build commands.
//! 3. Otherwise download the archive into the opt directory, replacing any
//!    stale copy, extract it in place, and delete the archive.
//! 4. Run each post-extract command inside the extracted directory with the
//!    environment overlay applied, stopping at the first failure.
//!
//! Errors in steps 2 through 4 fail this step only. The existence of the
//! extracted directory is the only install state ever consulted.

use crate::{
    archive::{extract, ArchiveError},
    config::InstallSpec,
    fetch::{Fetch, FetchError},
    prompt::{Prompt, PromptError},
    report::Outcome,
    syscall::{syscall_interactive, SyscallError},
};

use std::{
    fs::remove_file,
    path::{Path, PathBuf},
};
use tracing::{error, info, instrument, warn};

/// Runner of install steps into one opt directory.
#[derive(Debug)]
pub struct Installer<F>
where
    F: Fetch,
{
    opt_dir: PathBuf,
    fetcher: F,
}

impl<F> Installer<F>
where
    F: Fetch,
{
    /// Construct new installer targeting given opt directory.
    pub fn new(opt_dir: impl Into<PathBuf>, fetcher: F) -> Self {
        Self {
            opt_dir: opt_dir.into(),
            fetcher,
        }
    }

    /// Directory tool extracts to.
    pub fn target_dir(&self, spec: &InstallSpec) -> PathBuf {
        self.opt_dir.join(&spec.extracted_directory_name)
    }

    /// Check if tool was already fetched and extracted.
    pub fn is_installed(&self, spec: &InstallSpec) -> bool {
        self.target_dir(spec).is_dir()
    }

    /// Run gated install step.
    ///
    /// Asks the operator for confirmation first. Any failure past the
    /// confirmation is logged and turned into [`Outcome::Failed`].
    ///
    /// # Errors
    ///
    /// - Return [`PromptError::Interrupted`] if the operator interrupted the
    ///   confirmation prompt. Every other prompt failure fails the step.
    pub async fn run(&self, spec: &InstallSpec, prompt: &mut impl Prompt) -> Result<Outcome, PromptError> {
        let question = format!("Do you want to install {}? (y/n)", spec.name);
        match prompt.confirm(&question) {
            Ok(true) => {}
            Ok(false) => return Ok(Outcome::Skipped),
            Err(PromptError::Interrupted) => return Err(PromptError::Interrupted),
            Err(err) => {
                let err = anyhow::Error::new(err).context(format!("cannot confirm {}", spec.name));
                error!("{err:?}");
                return Ok(Outcome::failed(&err));
            }
        }

        match self.install(spec).await {
            Ok(()) => Ok(Outcome::Installed),
            Err(err) => {
                let err = anyhow::Error::new(err).context(format!("failed to install {}", spec.name));
                error!("{err:?}");
                Ok(Outcome::failed(&err))
            }
        }
    }

    /// Fetch, extract, and build tool without asking.
    ///
    /// # Errors
    ///
    /// - Return [`InstallError::Fetch`] if archive cannot be downloaded.
    /// - Return [`InstallError::Archive`] if archive cannot be extracted.
    /// - Return [`InstallError::MissingDirectory`] if extraction did not
    ///   produce the expected directory.
    /// - Return [`InstallError::Syscall`] if a post-extract command fails.
    #[instrument(skip(self, spec), fields(name = %spec.name), level = "debug")]
    pub async fn install(&self, spec: &InstallSpec) -> Result<()> {
        let target = self.target_dir(spec);
        if self.is_installed(spec) {
            info!(
                "{} already extracted at {:?}, skip fetch",
                spec.name,
                target.display()
            );
        } else {
            self.fetch_and_extract(spec, &target).await?;
        }

        for argv in &spec.post_extract_commands {
            info!("{}: {argv}", spec.name);
            syscall_interactive(argv, Some(&target), &spec.environment_overlay)?;
        }

        Ok(())
    }

    async fn fetch_and_extract(&self, spec: &InstallSpec, target: &Path) -> Result<()> {
        mkdirp::mkdirp(&self.opt_dir).map_err(|err| InstallError::CreateDir {
            source: err,
            path: self.opt_dir.clone(),
        })?;

        let archive = self.opt_dir.join(&spec.archive_file_name);
        if archive.exists() {
            warn!("replace stale archive {:?}", archive.display());
            remove_archive(&archive)?;
        }

        self.fetcher.fetch(&spec.source_url, &archive).await?;
        extract(&archive, &self.opt_dir)?;
        remove_archive(&archive)?;

        if !target.is_dir() {
            return Err(InstallError::MissingDirectory {
                archive: spec.archive_file_name.clone(),
                path: target.to_path_buf(),
            });
        }

        Ok(())
    }
}

fn remove_archive(archive: &Path) -> Result<()> {
    remove_file(archive).map_err(|err| InstallError::RemoveArchive {
        source: err,
        path: archive.to_path_buf(),
    })
}

/// Install step error types.
#[derive(Debug, thiserror::Error)]
pub enum InstallError {
    /// Opt directory cannot be created.
    #[error("failed to create directory {:?}", path.display())]
    CreateDir {
        #[source]
        source: std::io::Error,
        path: PathBuf,
    },

    /// Archive file cannot be removed.
    #[error("failed to remove archive {:?}", path.display())]
    RemoveArchive {
        #[source]
        source: std::io::Error,
        path: PathBuf,
    },

    /// Archive did not extract to expected directory.
    #[error("archive {archive:?} did not extract to {:?}", path.display())]
    MissingDirectory { archive: String, path: PathBuf },

    /// Archive download fails.
    #[error(transparent)]
    Fetch(#[from] FetchError),

    /// Archive extraction fails.
    #[error(transparent)]
    Archive(#[from] ArchiveError),

    /// Post-extract command fails.
    #[error(transparent)]
    Syscall(#[from] SyscallError),
}

/// Friendly result alias :3
pub type Result<T, E = InstallError> = std::result::Result<T, E>;
