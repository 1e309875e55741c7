// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

use rootstrap::{
    bootstrap::Bootstrap,
    config::{Manifest, DEFAULT_MANIFEST},
    fetch::HttpFetcher,
    path::{default_manifest_path, home_dir, Layout},
    prompt::{InquirePrompt, LinePrompt, Prompt},
};

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use std::{
    fs::read_to_string,
    io::{stdin, stdout, IsTerminal},
    path::PathBuf,
    process::exit,
};
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Debug, Clone, Parser)]
#[command(
    about,
    override_usage = "rootstrap [options] <rootstrap-command>",
    subcommand_help_heading = "Commands",
    version
)]
struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    async fn run(self) -> Result<()> {
        match self.command {
            Command::Run(opts) => run_bootstrap(opts).await,
            Command::Manifest(opts) => run_manifest(opts),
        }
    }
}

#[derive(Debug, Clone, Subcommand)]
enum Command {
    /// Walk through every bootstrap step, asking before each one.
    #[command(override_usage = "rootstrap run [options]")]
    Run(ManifestOptions),

    /// Print effective manifest.
    #[command(override_usage = "rootstrap manifest [options]")]
    Manifest(ManifestOptions),
}

#[derive(Args, Clone, Debug)]
struct ManifestOptions {
    /// Path to manifest to use instead of the default one.
    #[arg(short, long, value_name = "path")]
    pub manifest: Option<PathBuf>,

    /// Prefix directory to use instead of the one in the manifest.
    #[arg(short, long, value_name = "path")]
    pub prefix: Option<PathBuf>,
}

#[tokio::main]
async fn main() {
    let layer = fmt::layer()
        .compact()
        .with_target(false)
        .without_time();
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("info"))
        .unwrap();
    tracing_subscriber::registry()
        .with(layer)
        .with(filter)
        .init();

    if let Err(error) = run().await {
        error!("{error:?}");
        exit(1);
    }

    exit(0)
}

async fn run() -> Result<()> {
    Cli::parse().run().await
}

fn load_manifest(opts: &ManifestOptions) -> Result<Manifest> {
    let path = match &opts.manifest {
        Some(path) => Some(path.clone()),
        None => default_manifest_path().ok().filter(|path| path.is_file()),
    };

    let manifest = match path {
        Some(path) => {
            info!("use manifest {:?}", path.display());
            let data = read_to_string(&path)
                .with_context(|| format!("failed to read manifest {:?}", path.display()))?;
            Manifest::parse_with_prefix(&data, opts.prefix.as_deref())
                .with_context(|| format!("invalid manifest {:?}", path.display()))?
        }
        None => Manifest::parse_with_prefix(DEFAULT_MANIFEST, opts.prefix.as_deref())
            .context("invalid built-in manifest")?,
    };

    Ok(manifest)
}

async fn run_bootstrap(opts: ManifestOptions) -> Result<()> {
    let manifest = load_manifest(&opts)?;
    let layout = Layout::new(home_dir()?, manifest.prefix.clone());

    // INVARIANT: Progress bars only make sense next to a terminal prompt.
    if stdin().is_terminal() {
        bootstrap(layout, manifest, InquirePrompt::new(), true).await
    } else {
        let prompt = LinePrompt::new(stdin().lock(), stdout());
        bootstrap(layout, manifest, prompt, false).await
    }
}

async fn bootstrap(
    layout: Layout,
    manifest: Manifest,
    prompt: impl Prompt,
    progress: bool,
) -> Result<()> {
    let fetcher = HttpFetcher::default().with_progress(progress);
    let mut bootstrap = Bootstrap::new(layout, manifest, prompt, fetcher).with_progress(progress);
    let report = bootstrap.run().await?;

    println!("{report}");
    if report.failures() > 0 {
        info!("{} step(s) failed, see above for details", report.failures());
    }

    Ok(())
}

fn run_manifest(opts: ManifestOptions) -> Result<()> {
    print!("{}", load_manifest(&opts)?);
    Ok(())
}
