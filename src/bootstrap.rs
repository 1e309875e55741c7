// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! The bootstrap run.
//!
//! A run is a fixed, linear sequence of gated steps:
//!
//! 1. Install system packages.
//! 2. Initialize the prefix layout.
//! 3. Clone and link each dotfile repository marked `before_git`.
//! 4. Configure git globally.
//! 5. Clone and link each remaining dotfile repository.
//! 6. Fetch and build each third-party tool.
//!
//! Every step asks for confirmation first. A failing step is logged and
//! recorded in the [`Report`], and the run moves on to the next step. Only an
//! operator interrupt ends a run early.

use crate::{
    config::{DotfileRepo, Manifest},
    fetch::Fetch,
    git::{clone_or_reset, configure_global, global_config_path, set_global},
    install::Installer,
    link::{link_home, replace_symlink},
    package::install_packages,
    path::Layout,
    prompt::{Prompt, PromptError},
    report::{Outcome, Report},
    syscall::syscall_interactive,
};

use anyhow::Context;
use indicatif::{ProgressBar, ProgressDrawTarget};
use std::{collections::BTreeMap, path::PathBuf};
use tracing::{error, info};

/// Linear bootstrap run over one manifest.
pub struct Bootstrap<P, F>
where
    P: Prompt,
    F: Fetch,
{
    layout: Layout,
    manifest: Manifest,
    prompt: P,
    installer: Installer<F>,
    git_config: PathBuf,
    progress: bool,
}

impl<P, F> Bootstrap<P, F>
where
    P: Prompt,
    F: Fetch,
{
    /// Construct new bootstrap run.
    ///
    /// Tools install into the opt directory of the layout, and git settings
    /// go to `.gitconfig` in the layout's home directory.
    pub fn new(layout: Layout, manifest: Manifest, prompt: P, fetcher: F) -> Self {
        let installer = Installer::new(layout.opt(), fetcher);
        let git_config = global_config_path(layout.home());
        Self {
            layout,
            manifest,
            prompt,
            installer,
            git_config,
            progress: true,
        }
    }

    /// Toggle clone progress bars.
    pub fn with_progress(mut self, progress: bool) -> Self {
        self.progress = progress;
        self
    }

    /// Run every step in order.
    ///
    /// # Errors
    ///
    /// - Return [`PromptError::Interrupted`] if the operator interrupted a
    ///   prompt. Every other failure is recorded in the report instead.
    pub async fn run(&mut self) -> Result<Report, PromptError> {
        let mut report = Report::new();

        if !self.manifest.packages.manager.is_empty() {
            let manager = self.manifest.packages.manager.as_slice()[0].clone();
            let question = format!("Do you want to install packages with {manager}? (y/n)");
            self.gated(&mut report, "packages", &question, |this| {
                Ok(install_packages(&this.manifest.packages)?)
            })?;
        }

        let question = format!(
            "Do you want to initialize {} directory? (y/n)",
            self.layout.prefix().display()
        );
        self.gated(&mut report, "layout", &question, |this| {
            Ok(this.layout.initialize()?)
        })?;

        self.dotfiles(&mut report, true)?;
        self.gated(&mut report, "git", "Do you want to config git? (y/n)", |this| {
            this.configure_git()
        })?;
        self.dotfiles(&mut report, false)?;

        for spec in &self.manifest.installs {
            let outcome = self.installer.run(spec, &mut self.prompt).await?;
            report.record(format!("install {}", spec.name), outcome);
        }

        Ok(report)
    }

    fn dotfiles(&mut self, report: &mut Report, before_git: bool) -> Result<(), PromptError> {
        for index in 0..self.manifest.dotfiles.len() {
            if self.manifest.dotfiles[index].before_git != before_git {
                continue;
            }

            let name = self.manifest.dotfiles[index].name.clone();
            let question = format!("Do you want to config {name}? (y/n)");
            self.gated(report, format!("dotfiles {name}"), &question, |this| {
                this.sync_dotfiles(&this.manifest.dotfiles[index])
            })?;
        }

        Ok(())
    }

    fn gated(
        &mut self,
        report: &mut Report,
        step: impl Into<String>,
        question: &str,
        body: impl FnOnce(&mut Self) -> anyhow::Result<()>,
    ) -> Result<(), PromptError> {
        let step = step.into();
        let outcome = match self.prompt.confirm(question) {
            Ok(false) => Outcome::Skipped,
            Ok(true) => match body(self) {
                Ok(()) => Outcome::Installed,
                Err(err) if is_interrupt(&err) => return Err(PromptError::Interrupted),
                Err(err) => {
                    let err = err.context(format!("step {step:?} failed"));
                    error!("{err:?}");
                    Outcome::failed(&err)
                }
            },
            Err(PromptError::Interrupted) => return Err(PromptError::Interrupted),
            Err(err) => {
                let err = anyhow::Error::new(err).context(format!("cannot confirm step {step:?}"));
                error!("{err:?}");
                Outcome::failed(&err)
            }
        };

        report.record(step, outcome);
        Ok(())
    }

    fn configure_git(&mut self) -> anyhow::Result<()> {
        configure_global(&self.git_config, &self.manifest.git)?;
        for entry in &self.manifest.git.prompts {
            let value = self.prompt.text(&entry.message)?;
            if value.is_empty() {
                info!("leave {} unset", entry.key);
                continue;
            }
            set_global(&self.git_config, &entry.key, &value)?;
        }

        Ok(())
    }

    fn sync_dotfiles(&self, repo: &DotfileRepo) -> anyhow::Result<()> {
        let bar = ProgressBar::new(0);
        if !self.progress {
            bar.set_draw_target(ProgressDrawTarget::hidden());
        }
        clone_or_reset(&repo.url, &repo.path, &repo.branch, bar)
            .with_context(|| format!("failed to sync {:?}", repo.path.display()))?;

        if repo.link_home {
            link_home(&repo.path, self.layout.home())?;
        }

        for link in &repo.links {
            replace_symlink(repo.path.join(&link.source), &link.target)?;
        }

        for argv in &repo.post_commands {
            syscall_interactive(argv, Some(&repo.path), &BTreeMap::new())?;
        }

        Ok(())
    }
}

fn is_interrupt(err: &anyhow::Error) -> bool {
    err.chain().any(|cause| {
        matches!(
            cause.downcast_ref::<PromptError>(),
            Some(PromptError::Interrupted)
        )
    })
}
