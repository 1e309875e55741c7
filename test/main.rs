// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT


use anyhow::Result;
use git2::{IndexEntry, IndexTime, Repository, RepositoryInitOptions};
use rootstrap::fetch::{Fetch, FetchError};
use std::{
    cell::Cell,
    path::{Path, PathBuf},
};

/// Stand-in for a remote dotfile repository.
pub(crate) struct RepoFixture {
    repo: Repository,
}

impl RepoFixture {
    pub(crate) fn new(path: impl AsRef<Path>, branch: &str) -> Result<Self> {
        let mut opts = RepositoryInitOptions::new();
        opts.initial_head(branch);
        opts.bare(true);
        let repo = Repository::init_opts(path.as_ref(), &opts)?;

        // INVARIANT: Always provide valid name and email.
        //   - Git will complain if this is not set in CI/CD environments.
        let mut config = repo.config()?;
        config.set_str("user.name", "John Doe")?;
        config.set_str("user.email", "john@doe.com")?;

        Ok(Self { repo })
    }

    pub(crate) fn url(&self) -> String {
        self.repo.path().to_string_lossy().into_owned()
    }

    pub(crate) fn stage_and_commit(
        &self,
        filename: impl AsRef<Path>,
        contents: impl AsRef<str>,
    ) -> Result<()> {
        let entry = IndexEntry {
            ctime: IndexTime::new(0, 0),
            mtime: IndexTime::new(0, 0),
            dev: 0,
            ino: 0,
            mode: 0o100644,
            uid: 0,
            gid: 0,
            file_size: contents.as_ref().len() as u32,
            id: self.repo.blob(contents.as_ref().as_bytes())?,
            flags: 0,
            flags_extended: 0,
            path: filename
                .as_ref()
                .as_os_str()
                .to_string_lossy()
                .into_owned()
                .into_bytes(),
        };

        // INVARIANT: Always use new tree produced by index after staging new entry.
        let mut index = self.repo.index()?;
        index.add_frombuffer(&entry, contents.as_ref().as_bytes())?;
        let tree_oid = index.write_tree()?;
        let tree = self.repo.find_tree(tree_oid)?;

        // INVARIANT: Always determine latest parent commits to append to.
        let signature = self.repo.signature()?;
        let mut parents = Vec::new();
        if let Some(parent) = self.repo.head().ok().and_then(|head| head.target()) {
            parents.push(self.repo.find_commit(parent)?);
        }
        let parents = parents.iter().collect::<Vec<_>>();

        self.repo.commit(
            Some("HEAD"),
            &signature,
            &signature,
            format!("chore: add {:?}", filename.as_ref()).as_ref(),
            &tree,
            &parents,
        )?;

        Ok(())
    }
}

/// Serve archives from a local directory by URL file name.
pub(crate) struct DirFetcher {
    dir: PathBuf,
    calls: Cell<usize>,
}

impl DirFetcher {
    pub(crate) fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            calls: Cell::new(0),
        }
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.get()
    }
}

impl Fetch for DirFetcher {
    async fn fetch(&self, url: &str, dest: &Path) -> rootstrap::fetch::Result<()> {
        self.calls.set(self.calls.get() + 1);
        let name = url.rsplit('/').next().unwrap_or(url);
        std::fs::copy(self.dir.join(name), dest)
            .map(|_| ())
            .map_err(|err| FetchError::Write {
                source: err,
                path: dest.to_path_buf(),
            })
    }
}

impl Fetch for &DirFetcher {
    async fn fetch(&self, url: &str, dest: &Path) -> rootstrap::fetch::Result<()> {
        (**self).fetch(url, dest).await
    }
}
