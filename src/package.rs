// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! System package bootstrap.
//!
//! Refreshes the package index, upgrades what is already installed, then
//! installs each listed package with its own package manager invocation. One
//! failing invocation does not stop the others.

use crate::{
    config::PackageSettings,
    syscall::{syscall_interactive, Argv},
};

use std::collections::BTreeMap;
use tracing::{info, instrument, warn};

/// Package manager invocations needed to bootstrap packages, in order.
pub fn package_commands(settings: &PackageSettings) -> Vec<Argv> {
    let manager = &settings.manager;
    let mut commands = vec![manager.with(["update"]), manager.with(["upgrade", "-y"])];
    commands.extend(
        settings
            .names
            .iter()
            .map(|name| manager.with(["install", "-y", name.as_str()])),
    );

    commands
}

/// Run every package manager invocation.
///
/// # Errors
///
/// - Return [`PackageError::Failed`] listing each invocation that failed,
///   after all of them were attempted.
#[instrument(skip(settings), level = "debug")]
pub fn install_packages(settings: &PackageSettings) -> Result<(), PackageError> {
    let env = BTreeMap::new();
    let mut failed = Vec::new();
    for argv in package_commands(settings) {
        info!("{argv}");
        if let Err(err) = syscall_interactive(&argv, None, &env) {
            warn!("{err}");
            failed.push(argv.to_string());
        }
    }

    if !failed.is_empty() {
        return Err(PackageError::Failed { failed });
    }

    Ok(())
}

/// Package bootstrap error types.
#[derive(Debug, thiserror::Error)]
pub enum PackageError {
    /// One or more package manager invocations failed.
    #[error("package manager failed on: {}", failed.join(", "))]
    Failed { failed: Vec<String> },
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn settings(manager: &[&str]) -> PackageSettings {
        PackageSettings {
            manager: Argv::new(manager.iter().copied()),
            names: vec!["build-essential".into(), "curl".into()],
        }
    }

    #[test]
    fn package_commands_in_order() {
        let result = package_commands(&settings(&["sudo", "apt-get"]));
        let expect = vec![
            Argv::new(["sudo", "apt-get", "update"]),
            Argv::new(["sudo", "apt-get", "upgrade", "-y"]),
            Argv::new(["sudo", "apt-get", "install", "-y", "build-essential"]),
            Argv::new(["sudo", "apt-get", "install", "-y", "curl"]),
        ];
        assert_eq!(result, expect);
    }

    #[cfg(unix)]
    #[test]
    fn install_packages_success() {
        assert!(install_packages(&settings(&["true"])).is_ok());
    }

    #[cfg(unix)]
    #[test]
    fn install_packages_attempts_every_command() {
        let result = install_packages(&settings(&["false"]));
        match result {
            Err(PackageError::Failed { failed }) => assert_eq!(
                failed,
                vec![
                    "false update",
                    "false upgrade -y",
                    "false install -y build-essential",
                    "false install -y curl",
                ]
            ),
            other => panic!("expected failure, got {other:?}"),
        }
    }
}
