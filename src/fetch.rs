// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Archive download.
//!
//! Fetching is modeled through the [`Fetch`] trait so the install step can be
//! driven without a network. The real implementation streams the response
//! body of an HTTP(S) request straight into the destination file, showing
//! progress as it goes. There are no retries, and nothing is verified.

use futures::StreamExt;
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use std::{
    future::Future,
    path::{Path, PathBuf},
};
use tokio::{fs::File, io::AsyncWriteExt};
use tracing::{info, instrument};

/// Download remote resource into local file.
pub trait Fetch {
    /// Fetch resource at URL, writing it to destination file.
    ///
    /// The destination file is created, or truncated if it already exists.
    fn fetch(&self, url: &str, dest: &Path) -> impl Future<Output = Result<()>>;
}

/// Fetch over HTTP(S) through reqwest.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
    progress: bool,
}

impl HttpFetcher {
    /// Construct new HTTP fetcher.
    pub fn new(client: reqwest::Client) -> Self {
        Self {
            client,
            progress: true,
        }
    }

    /// Toggle download progress bar.
    pub fn with_progress(mut self, progress: bool) -> Self {
        self.progress = progress;
        self
    }

    fn progress_bar(&self, url: &str, len: Option<u64>) -> Result<ProgressBar> {
        let bar = match len {
            Some(len) => ProgressBar::new(len),
            None => ProgressBar::no_length(),
        };
        if !self.progress {
            bar.set_draw_target(ProgressDrawTarget::hidden());
        }

        let style = ProgressStyle::with_template(
            "{elapsed_precise:.green}  {msg:<50}  [{wide_bar:.yellow/blue}] {bytes}/{total_bytes}",
        )?
        .progress_chars("-Cco.");
        bar.set_style(style);
        bar.set_message(url.to_string());

        Ok(bar)
    }
}

impl Default for HttpFetcher {
    fn default() -> Self {
        Self::new(reqwest::Client::new())
    }
}

impl Fetch for HttpFetcher {
    #[instrument(skip(self, url, dest), level = "debug")]
    async fn fetch(&self, url: &str, dest: &Path) -> Result<()> {
        info!("fetch {url}");
        let response = self.client.get(url).send().await?.error_for_status()?;
        let bar = self.progress_bar(url, response.content_length())?;

        let write_err = |err| FetchError::Write {
            source: err,
            path: dest.to_path_buf(),
        };
        let mut file = File::create(dest).await.map_err(write_err)?;
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            file.write_all(&chunk).await.map_err(write_err)?;
            bar.inc(chunk.len() as u64);
        }
        file.flush().await.map_err(write_err)?;
        bar.finish_and_clear();

        Ok(())
    }
}

/// Fetch error types.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    /// Request failed, or server answered with an error status.
    #[error(transparent)]
    Request(#[from] reqwest::Error),

    /// Destination file cannot be written.
    #[error("failed to write download to {:?}", path.display())]
    Write {
        #[source]
        source: std::io::Error,
        path: PathBuf,
    },

    /// Style template cannot be set for progress bars.
    #[error(transparent)]
    IndicatifStyleTemplate(#[from] indicatif::style::TemplateError),
}

/// Friendly result alias :3
pub type Result<T, E = FetchError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tokio::{
        io::{AsyncReadExt, AsyncWriteExt},
        net::TcpListener,
    };

    // Serve exactly one canned HTTP response.
    async fn serve_once(status: &'static str, body: &'static [u8]) -> anyhow::Result<String> {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        tokio::spawn(async move {
            if let Ok((mut socket, _)) = listener.accept().await {
                let mut buf = [0u8; 4096];
                let _ = socket.read(&mut buf).await;
                let head = format!(
                    "HTTP/1.1 {status}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
                    body.len()
                );
                let _ = socket.write_all(head.as_bytes()).await;
                let _ = socket.write_all(body).await;
                let _ = socket.shutdown().await;
            }
        });

        Ok(format!("http://{addr}/blah-1.0.tar.gz"))
    }

    #[tokio::test]
    async fn http_fetch_writes_body() -> anyhow::Result<()> {
        let url = serve_once("200 OK", b"not really a tarball").await?;
        let scratch = tempfile::tempdir()?;
        let dest = scratch.path().join("blah-1.0.tar.gz");
        std::fs::write(&dest, b"stale partial download that is longer")?;

        HttpFetcher::default()
            .with_progress(false)
            .fetch(&url, &dest)
            .await?;

        assert_eq!(std::fs::read(&dest)?, b"not really a tarball");

        Ok(())
    }

    #[tokio::test]
    async fn http_fetch_rejects_error_status() -> anyhow::Result<()> {
        let url = serve_once("404 Not Found", b"").await?;
        let scratch = tempfile::tempdir()?;
        let dest = scratch.path().join("blah-1.0.tar.gz");

        let result = HttpFetcher::default()
            .with_progress(false)
            .fetch(&url, &dest)
            .await;

        assert!(matches!(result, Err(FetchError::Request(_))));
        assert!(!dest.exists());

        Ok(())
    }
}
