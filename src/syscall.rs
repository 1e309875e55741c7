// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! External command execution.
//!
//! Every external command rootstrap runs is described by an [`Argv`], a
//! structured argument vector whose first element names the program. Nothing
//! is ever handed to a shell, so there is no quoting to get wrong.

use serde::{Deserialize, Serialize};
use std::{
    collections::BTreeMap,
    fmt::{Display, Formatter, Result as FmtResult},
    path::{Path, PathBuf},
    process::Command,
};
use tracing::{debug, instrument};

/// Structured argument vector of external command.
#[derive(Default, Debug, PartialEq, Eq, Clone, Deserialize, Serialize)]
#[serde(transparent)]
pub struct Argv(Vec<String>);

impl Argv {
    /// Construct new argument vector.
    pub fn new(args: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self(args.into_iter().map(Into::into).collect())
    }

    /// Extend argument vector with extra arguments, returning the result.
    pub fn with(&self, args: impl IntoIterator<Item = impl Into<String>>) -> Self {
        let mut argv = self.clone();
        argv.0.extend(args.into_iter().map(Into::into));
        argv
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_slice(&self) -> &[String] {
        self.0.as_slice()
    }

    /// Apply fallible transformation to each argument.
    pub fn try_map<E>(self, f: impl FnMut(String) -> Result<String, E>) -> Result<Self, E> {
        Ok(Self(self.0.into_iter().map(f).collect::<Result<_, _>>()?))
    }
}

impl Display for Argv {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> FmtResult {
        let mut first = true;
        for arg in &self.0 {
            if !first {
                fmt.write_str(" ")?;
            }
            first = false;

            if arg.is_empty() || arg.contains(char::is_whitespace) {
                write!(fmt, "{arg:?}")?;
            } else {
                fmt.write_str(arg)?;
            }
        }

        Ok(())
    }
}

/// Run external command through current process.
///
/// Blocks until the command exits. Standard streams are inherited, so the
/// operator sees build output as it happens. The environment overlay is
/// applied on top of the inherited process environment.
///
/// # Errors
///
/// - Return [`SyscallError::EmptyCommand`] if argument vector is empty.
/// - Return [`SyscallError::Spawn`] if command cannot be started.
/// - Return [`SyscallError::Failed`] if command exits unsuccessfully.
#[instrument(skip(argv, cwd, env), level = "debug")]
pub fn syscall_interactive(
    argv: &Argv,
    cwd: Option<&Path>,
    env: &BTreeMap<String, String>,
) -> Result<()> {
    let (program, args) = argv
        .as_slice()
        .split_first()
        .ok_or(SyscallError::EmptyCommand)?;

    debug!("run {argv}");
    let mut command = Command::new(program);
    command.args(args).envs(env);
    if let Some(cwd) = cwd {
        command.current_dir(cwd);
    }

    let status = command
        .spawn()
        .and_then(|mut child| child.wait())
        .map_err(|err| SyscallError::Spawn {
            source: err,
            command: argv.to_string(),
            cwd: cwd.map(Path::to_path_buf),
        })?;

    if !status.success() {
        return Err(SyscallError::Failed {
            command: argv.to_string(),
            status: status
                .code()
                .map_or_else(|| "terminated by signal".into(), |code| format!("exit code {code}")),
        });
    }

    Ok(())
}

/// External command error types.
#[derive(Debug, thiserror::Error)]
pub enum SyscallError {
    /// No program given to run.
    #[error("cannot run empty command")]
    EmptyCommand,

    /// Command could not be started.
    #[error("failed to run command {command:?} in {cwd:?}")]
    Spawn {
        #[source]
        source: std::io::Error,
        command: String,
        cwd: Option<PathBuf>,
    },

    /// Command ran, but exited unsuccessfully.
    #[error("command {command:?} failed with {status}")]
    Failed { command: String, status: String },
}

/// Friendly result alias :3
pub type Result<T, E = SyscallError> = std::result::Result<T, E>;
