// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Personal machine bootstrap.
//!
//! Rootstrap walks the operator through setting up a fresh account: system
//! packages, a user-local prefix directory, global git settings, dotfile
//! repositories linked into the home directory, and third-party tools
//! fetched and built into the prefix. Every action asks first, and a failed
//! action never stops the ones after it.
//!
//! What a run does is described by a [`Manifest`](config::Manifest). The run
//! itself is driven by [`Bootstrap`](bootstrap::Bootstrap).

pub mod archive;
pub mod bootstrap;
pub mod config;
pub mod fetch;
pub mod git;
pub mod install;
pub mod link;
pub mod package;
pub mod path;
pub mod prompt;
pub mod report;
pub mod syscall;
