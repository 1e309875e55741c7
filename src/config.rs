// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Configuration layout.
//!
//! Specify the layout of the bootstrap __manifest__ to simplify the process
//! of serialization and deserialization. File I/O is left to the caller to
//! figure out.
//!
//! # General Layout
//!
//! A manifest lists everything a bootstrap run may do: the prefix directory
//! to populate, system packages to install, global git settings, dotfile
//! repositories to clone and link, and third-party tools to fetch and build.
//! Every path, command argument, and environment value goes through shell
//! expansion once the manifest is parsed. Next to the regular environment,
//! the variable `ROOT_PREFIX` expands to the resolved prefix directory.

use crate::{archive::ArchiveKind, syscall::Argv};

use serde::{Deserialize, Serialize};
use std::{
    collections::BTreeMap,
    env::VarError,
    fmt::{Display, Error as FmtError, Formatter, Result as FmtResult},
    path::{Path, PathBuf},
    str::FromStr,
    sync::Arc,
};

/// Manifest shipped with rootstrap, used when no other manifest exists.
pub const DEFAULT_MANIFEST: &str = include_str!("manifest.toml");

/// Variable that expands to the prefix directory.
pub const PREFIX_VAR: &str = "ROOT_PREFIX";

/// Bootstrap manifest layout.
#[derive(Debug, PartialEq, Eq, Clone, Deserialize, Serialize)]
pub struct Manifest {
    /// Prefix directory to populate.
    #[serde(default = "default_prefix")]
    pub prefix: PathBuf,

    /// System package settings.
    #[serde(default)]
    pub packages: PackageSettings,

    /// Global git configuration.
    #[serde(default)]
    pub git: GitSettings,

    /// Dotfile repositories to clone and link.
    #[serde(default)]
    pub dotfiles: Vec<DotfileRepo>,

    /// Third-party tools to fetch and build.
    #[serde(default, rename = "install")]
    pub installs: Vec<InstallSpec>,
}

impl Manifest {
    /// Parse manifest, optionally overriding its prefix directory.
    ///
    /// The override is applied before shell expansion, so everything that
    /// refers to `ROOT_PREFIX` follows it. A relative prefix is resolved
    /// against the current directory, since build commands run elsewhere.
    ///
    /// # Errors
    ///
    /// - Return [`ConfigError::Deserialize`] if TOML is invalid.
    /// - Return [`ConfigError::ShellExpansion`] if a variable cannot be expanded.
    /// - Return [`ConfigError::AbsolutePrefix`] if prefix cannot be made absolute.
    /// - Return [`ConfigError::NoArchiveName`] or
    ///   [`ConfigError::NoDirectoryName`] if install names cannot be derived.
    pub fn parse_with_prefix(data: &str, prefix: Option<&Path>) -> Result<Self> {
        let mut manifest: Manifest = toml::de::from_str(data).map_err(ConfigError::Deserialize)?;

        // INVARIANT: Expand prefix first, everything else may refer to it.
        let prefix = match prefix {
            Some(prefix) => prefix.to_path_buf(),
            None => PathBuf::from(expand(&manifest.prefix.to_string_lossy(), None)?),
        };
        manifest.prefix =
            std::path::absolute(&prefix).map_err(|err| ConfigError::AbsolutePrefix {
                source: Arc::new(err),
                path: prefix,
            })?;
        let prefix = manifest.prefix.to_string_lossy().into_owned();
        let prefix = Some(prefix.as_str());

        for repo in &mut manifest.dotfiles {
            repo.path = expand_path(&repo.path, prefix)?;
            for link in &mut repo.links {
                link.target = expand_path(&link.target, prefix)?;
            }
            repo.post_commands = expand_commands(std::mem::take(&mut repo.post_commands), prefix)?;
        }

        for spec in &mut manifest.installs {
            spec.resolve_names()?;
            spec.post_extract_commands =
                expand_commands(std::mem::take(&mut spec.post_extract_commands), prefix)?;
            for value in spec.environment_overlay.values_mut() {
                *value = expand(value, prefix)?;
            }
        }

        Ok(manifest)
    }
}

impl FromStr for Manifest {
    type Err = ConfigError;

    fn from_str(data: &str) -> Result<Self, Self::Err> {
        Self::parse_with_prefix(data, None)
    }
}

impl Display for Manifest {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> FmtResult {
        fmt.write_str(
            toml::ser::to_string_pretty(self)
                .map_err(ConfigError::Serialize)?
                .as_str(),
        )
    }
}

fn default_prefix() -> PathBuf {
    PathBuf::from("~/.root")
}

/// System package manager settings.
#[derive(Default, Debug, PartialEq, Eq, Clone, Deserialize, Serialize)]
pub struct PackageSettings {
    /// Command prefix used to invoke package manager, e.g., `sudo apt-get`.
    #[serde(default)]
    pub manager: Argv,

    /// Packages to install.
    #[serde(default)]
    pub names: Vec<String>,
}

/// Global git configuration settings.
#[derive(Default, Debug, PartialEq, Eq, Clone, Deserialize, Serialize)]
pub struct GitSettings {
    /// Fixed configuration keys and their values.
    #[serde(default)]
    pub settings: BTreeMap<String, String>,

    /// Configuration keys whose values are asked for interactively.
    #[serde(default, rename = "prompt")]
    pub prompts: Vec<GitPrompt>,
}

/// Configuration key to ask the operator for.
#[derive(Default, Debug, PartialEq, Eq, Clone, Deserialize, Serialize)]
pub struct GitPrompt {
    /// Configuration key, e.g., `user.name`.
    pub key: String,

    /// Message shown to the operator.
    pub message: String,
}

/// Dotfile repository to clone and link into home directory.
#[derive(Debug, PartialEq, Eq, Clone, Deserialize, Serialize)]
pub struct DotfileRepo {
    /// Short name of repository, used in prompts.
    pub name: String,

    /// Remote URL to fetch from.
    pub url: String,

    /// Fixed local path to clone into.
    pub path: PathBuf,

    /// Remote branch to reset work tree to.
    #[serde(default = "default_branch")]
    pub branch: String,

    /// Sync before global git configuration instead of after it.
    #[serde(default)]
    pub before_git: bool,

    /// Link each entry of the repository's `home` directory as a dotfile.
    #[serde(default)]
    pub link_home: bool,

    /// Extra links from repository content to arbitrary targets.
    #[serde(default)]
    pub links: Vec<LinkSpec>,

    /// Commands to run inside repository after linking.
    #[serde(default)]
    pub post_commands: Vec<Argv>,
}

fn default_branch() -> String {
    "master".into()
}

/// Symbolic link from repository content to target path.
#[derive(Debug, PartialEq, Eq, Clone, Deserialize, Serialize)]
pub struct LinkSpec {
    /// Path relative to repository root.
    pub source: PathBuf,

    /// Absolute path of link to create.
    pub target: PathBuf,
}

/// Fetch and build descriptor for one third-party tool.
///
/// # Invariant
///
/// - A tool is already installed iff `extracted_directory_name` exists
///   under the opt directory.
#[derive(Default, Debug, PartialEq, Eq, Clone, Deserialize, Serialize)]
pub struct InstallSpec {
    /// Name of tool, used in prompts and reports.
    pub name: String,

    /// URL to fetch archive from.
    pub source_url: String,

    /// File name of archive in opt directory. Derived from URL if omitted.
    #[serde(default)]
    pub archive_file_name: String,

    /// Directory archive extracts to. Derived from archive name if omitted.
    #[serde(default)]
    pub extracted_directory_name: String,

    /// Commands to run inside extracted directory, in order.
    #[serde(default)]
    pub post_extract_commands: Vec<Argv>,

    /// Environment variables set on top of inherited environment.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub environment_overlay: BTreeMap<String, String>,
}

impl InstallSpec {
    /// Fill in archive and directory names when omitted.
    ///
    /// # Errors
    ///
    /// - Return [`ConfigError::NoArchiveName`] if URL has no file name.
    /// - Return [`ConfigError::NoDirectoryName`] if archive name carries no
    ///   recognized extension.
    pub fn resolve_names(&mut self) -> Result<()> {
        if self.archive_file_name.is_empty() {
            self.archive_file_name = archive_name_from_url(&self.source_url)
                .ok_or_else(|| ConfigError::NoArchiveName {
                    name: self.name.clone(),
                    url: self.source_url.clone(),
                })?
                .to_string();
        }

        if self.extracted_directory_name.is_empty() {
            self.extracted_directory_name = ArchiveKind::strip_extension(&self.archive_file_name)
                .ok_or_else(|| ConfigError::NoDirectoryName {
                    name: self.name.clone(),
                    archive: self.archive_file_name.clone(),
                })?
                .to_string();
        }

        Ok(())
    }
}

fn archive_name_from_url(url: &str) -> Option<&str> {
    let url = url.split(['?', '#']).next().unwrap_or(url);
    let (base, name) = url.rsplit_once('/')?;
    if name.is_empty() || base.ends_with('/') {
        return None;
    }

    Some(name)
}

fn expand(input: &str, prefix: Option<&str>) -> Result<String> {
    let home_dir = || dirs::home_dir().map(|path| path.to_string_lossy().into_owned());
    let expanded = shellexpand::full_with_context(input, home_dir, |var| {
        if var == PREFIX_VAR {
            if let Some(prefix) = prefix {
                return Ok(Some(prefix.to_string()));
            }
        }

        std::env::var(var).map(Some)
    })
    .map_err(ConfigError::ShellExpansion)?;

    Ok(expanded.into_owned())
}

fn expand_path(path: &Path, prefix: Option<&str>) -> Result<PathBuf> {
    expand(&path.to_string_lossy(), prefix).map(PathBuf::from)
}

fn expand_commands(commands: Vec<Argv>, prefix: Option<&str>) -> Result<Vec<Argv>> {
    commands
        .into_iter()
        .map(|argv| argv.try_map(|arg| expand(&arg, prefix)))
        .collect()
}

/// Configuration error types.
#[derive(Clone, Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to deserialize configuration.
    #[error(transparent)]
    Deserialize(#[from] toml::de::Error),

    /// Failed to serialize configuration.
    #[error(transparent)]
    Serialize(#[from] toml::ser::Error),

    /// Failed to perform shell expansion on configuration.
    #[error(transparent)]
    ShellExpansion(#[from] shellexpand::LookupError<VarError>),

    /// Prefix directory cannot be resolved to an absolute path.
    #[error("cannot resolve prefix {:?}", path.display())]
    AbsolutePrefix {
        #[source]
        source: Arc<std::io::Error>,
        path: PathBuf,
    },

    /// Archive file name cannot be derived from source URL.
    #[error("cannot derive archive file name of {name:?} from {url:?}")]
    NoArchiveName { name: String, url: String },

    /// Extracted directory name cannot be derived from archive file name.
    #[error("cannot derive extracted directory name of {name:?} from {archive:?}")]
    NoDirectoryName { name: String, archive: String },
}

impl From<ConfigError> for FmtError {
    fn from(_: ConfigError) -> Self {
        FmtError
    }
}

/// Friendly result alias :3
type Result<T, E = ConfigError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;
    use indoc::indoc;
    use pretty_assertions::assert_eq;
    use sealed_test::prelude::*;
    use simple_test_case::test_case;

    #[sealed_test(env = [("HOME", "/home/blah"), ("BLAH", "/srv/blah")])]
    fn deserialize_manifest() -> anyhow::Result<()> {
        let result: Manifest = indoc! {r#"
            prefix = "~/.local/root"

            [packages]
            manager = ["sudo", "apt-get"]
            names = ["git"]

            [git.settings]
            "core.editor" = "vim"

            [[git.prompt]]
            key = "user.name"
            message = "name?"

            [[dotfiles]]
            name = "home"
            url = "https://blah.org/dotfiles.git"
            path = "${ROOT_PREFIX}/opt/dotfiles"
            before_git = true
            link_home = true

            [[dotfiles.links]]
            source = "vimrc"
            target = "$BLAH/.vimrc"

            [[install]]
            name = "curl"
            source_url = "https://blah.org/download/curl-7.60.0.tar.gz?raw=1"
            post_extract_commands = [["./configure", "--prefix=${ROOT_PREFIX}"], ["make"]]

            [install.environment_overlay]
            CFLAGS = "-I${ROOT_PREFIX}/include"
        "#}
        .parse()?;

        let expect = Manifest {
            prefix: "/home/blah/.local/root".into(),
            packages: PackageSettings {
                manager: Argv::new(["sudo", "apt-get"]),
                names: vec!["git".into()],
            },
            git: GitSettings {
                settings: BTreeMap::from([("core.editor".into(), "vim".into())]),
                prompts: vec![GitPrompt {
                    key: "user.name".into(),
                    message: "name?".into(),
                }],
            },
            dotfiles: vec![DotfileRepo {
                name: "home".into(),
                url: "https://blah.org/dotfiles.git".into(),
                path: "/home/blah/.local/root/opt/dotfiles".into(),
                branch: "master".into(),
                before_git: true,
                link_home: true,
                links: vec![LinkSpec {
                    source: "vimrc".into(),
                    target: "/srv/blah/.vimrc".into(),
                }],
                post_commands: vec![],
            }],
            installs: vec![InstallSpec {
                name: "curl".into(),
                source_url: "https://blah.org/download/curl-7.60.0.tar.gz?raw=1".into(),
                archive_file_name: "curl-7.60.0.tar.gz".into(),
                extracted_directory_name: "curl-7.60.0".into(),
                post_extract_commands: vec![
                    Argv::new(["./configure", "--prefix=/home/blah/.local/root"]),
                    Argv::new(["make"]),
                ],
                environment_overlay: BTreeMap::from([(
                    "CFLAGS".into(),
                    "-I/home/blah/.local/root/include".into(),
                )]),
            }],
        };

        assert_eq!(result, expect);

        Ok(())
    }

    #[sealed_test(env = [("HOME", "/home/blah")])]
    fn prefix_override_follows_through() -> anyhow::Result<()> {
        let data = indoc! {r#"
            [[install]]
            name = "blah"
            source_url = "https://blah.org/blah-1.0.tgz"
            post_extract_commands = [["make", "PREFIX=${ROOT_PREFIX}"]]
        "#};
        let result = Manifest::parse_with_prefix(data, Some(Path::new("/opt/root")))?;

        assert_eq!(result.prefix, PathBuf::from("/opt/root"));
        assert_eq!(result.installs[0].extracted_directory_name, "blah-1.0");
        assert_eq!(
            result.installs[0].post_extract_commands,
            vec![Argv::new(["make", "PREFIX=/opt/root"])]
        );

        Ok(())
    }

    #[sealed_test(env = [("HOME", "/home/blah")])]
    fn builtin_manifest_parses() -> anyhow::Result<()> {
        let manifest: Manifest = DEFAULT_MANIFEST.parse()?;

        assert_eq!(manifest.prefix, PathBuf::from("/home/blah/.root"));
        assert_eq!(
            manifest.packages.names,
            vec!["build-essential", "curl", "file", "git"]
        );
        assert_eq!(manifest.git.settings.len(), 4);
        assert_eq!(manifest.dotfiles[0].path, PathBuf::from("/home/blah/.root/opt/dotfiles"));
        assert_eq!(manifest.dotfiles[1].links[0].target, PathBuf::from("/home/blah/.vimrc"));
        assert!(manifest.dotfiles[0].before_git);
        assert!(!manifest.dotfiles[1].before_git);

        let curl = &manifest.installs[0];
        assert_eq!(curl.archive_file_name, "curl-7.60.0.tar.gz");
        assert_eq!(curl.extracted_directory_name, "curl-7.60.0");

        let vim = manifest.installs.last().unwrap();
        assert_eq!(vim.extracted_directory_name, "vim-8.1.0100");
        assert_eq!(vim.environment_overlay["LDFLAGS"], "-L/home/blah/.root/lib");

        Ok(())
    }

    #[sealed_test(env = [("HOME", "/home/blah")])]
    fn relative_prefix_resolves_against_current_dir() -> anyhow::Result<()> {
        let data = indoc! {r#"
            [[install]]
            name = "curl"
            source_url = "https://blah.org/curl-7.60.0.tar.gz"
            post_extract_commands = [["./configure", "--prefix=${ROOT_PREFIX}"]]
        "#};
        let result = Manifest::parse_with_prefix(data, Some(Path::new("myroot")))?;

        let expect = std::env::current_dir()?.join("myroot");
        assert_eq!(result.prefix, expect);
        assert_eq!(
            result.installs[0].post_extract_commands,
            vec![Argv::new([
                "./configure".to_string(),
                format!("--prefix={}", expect.display())
            ])]
        );

        Ok(())
    }

    #[test]
    fn missing_variable_fails_expansion() {
        let data = indoc! {r#"
            prefix = "$ROOTSTRAP_SURELY_NOT_SET/root"
        "#};
        let result = data.parse::<Manifest>();
        assert!(matches!(result, Err(ConfigError::ShellExpansion(_))));
    }

    #[test_case("https://blah.org/curl-7.60.0.tar.gz", Some("curl-7.60.0.tar.gz"); "plain")]
    #[test_case("https://blah.org/a/b.zip?raw=true#top", Some("b.zip"); "query and fragment")]
    #[test_case("https://blah.org/", None; "trailing slash")]
    #[test_case("https://", None; "no path")]
    #[test_case("curl.tar.gz", None; "no slash")]
    #[test]
    fn archive_name_derivation(url: &str, expect: Option<&str>) {
        pretty_assertions::assert_eq!(archive_name_from_url(url), expect);
    }

    #[test]
    fn unknown_archive_extension_needs_directory_name() {
        let mut spec = InstallSpec {
            name: "node".into(),
            source_url: "https://blah.org/node-v8.11.3-linux-x64.tar.xz".into(),
            ..Default::default()
        };
        let result = spec.resolve_names();
        assert!(matches!(result, Err(ConfigError::NoDirectoryName { .. })));

        spec.extracted_directory_name = "node-v8.11.3-linux-x64".into();
        assert!(spec.resolve_names().is_ok());
    }
}
