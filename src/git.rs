// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Git configuration and repository syncing through libgit2.
//!
//! Two things are needed from Git during a bootstrap run. First, global
//! configuration keys must be written into the operator's global config
//! file. Second, dotfile repositories must be brought into a fixed local
//! path and forced to match their remote, whether they already exist there
//! or not. The second operation is called __clone-or-reset__, and it never
//! preserves local changes.

use crate::{config::GitSettings, prompt::PromptError};

use auth_git2::{GitAuthenticator, Prompter};
use git2::{Config, FetchOptions, RemoteCallbacks, Repository, ResetType};
use indicatif::{ProgressBar, ProgressStyle};
use inquire::{InquireError, Password, Text};
use std::{
    path::{Path, PathBuf},
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    time,
};
use tracing::{debug, info, instrument, warn};

/// Name of remote every synced repository fetches from.
pub const REMOTE_NAME: &str = "origin";

/// Write fixed global settings into git config file.
///
/// Opens the config file at the given path, creating it if it is missing,
/// and writes every fixed setting. Interactive settings are handled by the
/// caller through [`set_global`].
///
/// # Errors
///
/// - Return [`GitError::Git2`] if config file cannot be opened or written.
#[instrument(skip(config_path, settings), level = "debug")]
pub fn configure_global(config_path: impl AsRef<Path>, settings: &GitSettings) -> Result<()> {
    let mut config = Config::open(config_path.as_ref())?;
    for (key, value) in &settings.settings {
        info!("git config --global {key} {value:?}");
        config.set_str(key, value)?;
    }

    Ok(())
}

/// Write one global setting into git config file.
///
/// # Errors
///
/// - Return [`GitError::Git2`] if config file cannot be opened or written.
pub fn set_global(config_path: impl AsRef<Path>, key: &str, value: &str) -> Result<()> {
    info!("git config --global {key} {value:?}");
    Config::open(config_path.as_ref())?.set_str(key, value)?;
    Ok(())
}

/// Determine path to global git config file under home directory.
pub fn global_config_path(home: impl AsRef<Path>) -> PathBuf {
    home.as_ref().join(".gitconfig")
}

/// Clone repository into fixed path, or reset existing one to its remote.
///
/// Creates the target path when missing. When the path is not a repository
/// yet, it is initialized in place with remote "origin" pointing at the URL.
/// Either way, the remote is fetched and the work tree is hard reset to
/// `origin/<branch>`, discarding any local changes.
///
/// # Errors
///
/// - Return [`GitError::CreateDir`] if target path cannot be created.
/// - Return [`GitError::Git2`] if libgit2 operations fail.
/// - Return [`GitError::Prompt`] if the operator interrupted a credential
///   prompt.
/// - Return [`GitError::IndicatifStyleTemplate`] if progress bar cannot be styled.
#[instrument(skip(url, path, branch, bar), level = "debug")]
pub fn clone_or_reset(
    url: impl AsRef<str>,
    path: impl AsRef<Path>,
    branch: impl AsRef<str>,
    bar: ProgressBar,
) -> Result<Repository> {
    let path = path.as_ref();
    mkdirp::mkdirp(path).map_err(|err| GitError::CreateDir {
        source: err,
        path: path.to_path_buf(),
    })?;

    let repository = match Repository::open(path) {
        Ok(repository) => {
            debug!("reuse repository at {:?}", path.display());
            repository
        }
        Err(_) => {
            info!("initialize repository at {:?}", path.display());
            let repository = Repository::init(path)?;
            repository.remote(REMOTE_NAME, url.as_ref())?;
            repository
        }
    };

    fetch(&repository, url.as_ref(), bar)?;

    let target = format!("refs/remotes/{REMOTE_NAME}/{}", branch.as_ref());
    info!("reset {:?} to {target}", path.display());
    let commit = repository.find_reference(&target)?.peel_to_commit()?;

    // INVARIANT: Fresh repositories need a local branch for HEAD to land on.
    if repository.head().is_err() {
        repository.branch(branch.as_ref(), &commit, true)?;
        repository.set_head(&format!("refs/heads/{}", branch.as_ref()))?;
    }
    repository.reset(commit.as_object(), ResetType::Hard, None)?;

    // INVARIANT: Release borrow of repository before handing it back.
    drop(commit);

    Ok(repository)
}

fn fetch(repository: &Repository, url: &str, bar: ProgressBar) -> Result<()> {
    let style = ProgressStyle::with_template(
        "{elapsed_precise:.green}  {msg:<50}  [{wide_bar:.yellow/blue}]",
    )?
    .progress_chars("-Cco.");
    bar.set_style(style);
    bar.set_message(url.to_string());
    bar.enable_steady_tick(time::Duration::from_millis(100));

    let prompter = IndicatifPrompter::new(bar);
    let authenticator = GitAuthenticator::default().set_prompter(prompter.clone());
    let config = repository.config()?;

    let mut throttle = time::Instant::now();
    let mut rc = RemoteCallbacks::new();
    rc.credentials(authenticator.credentials(&config));
    rc.transfer_progress(|progress| {
        let bar_size = progress.total_objects() as u64;
        let bar_pos = progress.received_objects() as u64;
        if throttle.elapsed() > time::Duration::from_millis(10) {
            throttle = time::Instant::now();
            prompter.bar.set_length(bar_size);
            prompter.bar.set_position(bar_pos);
        }
        true
    });

    let mut fo = FetchOptions::new();
    fo.remote_callbacks(rc);

    let mut remote = repository.find_remote(REMOTE_NAME)?;
    let result = remote.fetch::<&str>(&[], Some(&mut fo), None);
    prompter.bar.finish_and_clear();
    if prompter.is_interrupted() {
        return Err(PromptError::Interrupted.into());
    }
    result?;

    Ok(())
}

/// Credential prompter that gets along with progress bars.
///
/// Suspends the progress bar while asking the operator for credentials.
/// libgit2 only learns that no credentials came back, so an interrupt is
/// remembered here for the caller to check once the fetch returns.
#[derive(Debug, Clone)]
pub struct IndicatifPrompter {
    pub(crate) bar: ProgressBar,
    interrupted: Arc<AtomicBool>,
}

impl IndicatifPrompter {
    /// Construct new credential prompter over progress bar.
    pub fn new(bar: ProgressBar) -> Self {
        Self {
            bar,
            interrupted: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Check if the operator interrupted any credential prompt.
    pub fn is_interrupted(&self) -> bool {
        self.interrupted.load(Ordering::Relaxed)
    }

    fn answer<T>(&self, result: Result<T, InquireError>) -> Option<T> {
        match result {
            Ok(value) => Some(value),
            Err(InquireError::OperationInterrupted) => {
                self.interrupted.store(true, Ordering::Relaxed);
                None
            }
            Err(err) => {
                warn!("no credentials given: {err}");
                None
            }
        }
    }

    fn ask_secret(&self, message: &str) -> Option<String> {
        if self.is_interrupted() {
            return None;
        }

        let result = self
            .bar
            .suspend(|| Password::new(message).without_confirmation().prompt());
        self.answer(result)
    }
}

impl Prompter for IndicatifPrompter {
    #[instrument(skip(self, url, _config), level = "debug")]
    fn prompt_username_password(
        &mut self,
        url: &str,
        _config: &git2::Config,
    ) -> Option<(String, String)> {
        if self.is_interrupted() {
            return None;
        }

        info!("credentials required for {url}");
        let username = self.bar.suspend(|| Text::new("username").prompt());
        let username = self.answer(username)?;
        let password = self.ask_secret("password")?;
        Some((username, password))
    }

    #[instrument(skip(self, username, url, _config), level = "debug")]
    fn prompt_password(
        &mut self,
        username: &str,
        url: &str,
        _config: &git2::Config,
    ) -> Option<String> {
        info!("password of {username} required for {url}");
        self.ask_secret("password")
    }

    #[instrument(skip(self, ssh_key_path, _config), level = "debug")]
    fn prompt_ssh_key_passphrase(
        &mut self,
        ssh_key_path: &Path,
        _config: &git2::Config,
    ) -> Option<String> {
        info!("passphrase of {:?} required", ssh_key_path.display());
        self.ask_secret("passphrase")
    }
}

/// Git error types.
#[derive(Debug, thiserror::Error)]
pub enum GitError {
    /// Repository path cannot be created.
    #[error("failed to create repository directory {:?}", path.display())]
    CreateDir {
        #[source]
        source: std::io::Error,
        path: PathBuf,
    },

    /// Style template cannot be set for progress bars.
    #[error(transparent)]
    IndicatifStyleTemplate(#[from] indicatif::style::TemplateError),

    /// Operator interrupted a credential prompt.
    #[error("credential prompt failed")]
    Prompt(#[from] PromptError),

    /// Operations from libgit2 fail.
    #[error(transparent)]
    Git2(#[from] git2::Error),
}

/// Friendly result alias :3
pub type Result<T, E = GitError> = std::result::Result<T, E>;
