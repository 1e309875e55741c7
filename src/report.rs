// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Step outcomes and the run report.

use std::fmt::{Display, Formatter, Result as FmtResult};

/// Outcome of one gated step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Operator declined the step. Nothing was touched.
    Skipped,

    /// Step ran to completion.
    Installed,

    /// Step failed for given reason. The run went on regardless.
    Failed(String),
}

impl Outcome {
    /// Build failure outcome from error, keeping its whole cause chain.
    pub fn failed(error: &anyhow::Error) -> Self {
        Self::Failed(format!("{error:#}"))
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed(_))
    }
}

impl Display for Outcome {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> FmtResult {
        match self {
            Self::Skipped => fmt.write_str("skipped"),
            Self::Installed => fmt.write_str("installed"),
            Self::Failed(reason) => write!(fmt, "failed: {reason}"),
        }
    }
}

/// Ordered listing of step outcomes of one run.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Report {
    entries: Vec<(String, Outcome)>,
}

impl Report {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record outcome of named step.
    pub fn record(&mut self, step: impl Into<String>, outcome: Outcome) {
        self.entries.push((step.into(), outcome));
    }

    pub fn entries(&self) -> &[(String, Outcome)] {
        self.entries.as_slice()
    }

    /// Look up outcome of named step.
    pub fn outcome(&self, step: &str) -> Option<&Outcome> {
        self.entries
            .iter()
            .find(|(name, _)| name == step)
            .map(|(_, outcome)| outcome)
    }

    /// Count failed steps.
    pub fn failures(&self) -> usize {
        self.entries
            .iter()
            .filter(|(_, outcome)| outcome.is_failed())
            .count()
    }
}

impl Display for Report {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> FmtResult {
        let width = self
            .entries
            .iter()
            .map(|(name, _)| name.len())
            .max()
            .unwrap_or(0);

        for (name, outcome) in &self.entries {
            writeln!(fmt, "{name:<width$}  {outcome}")?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use indoc::indoc;
    use pretty_assertions::assert_eq;

    #[test]
    fn report_display() {
        let mut report = Report::new();
        report.record("packages", Outcome::Skipped);
        report.record("layout", Outcome::Installed);
        report.record("install curl", Outcome::Failed("command \"make\" failed".into()));

        let expect = indoc! {r#"
            packages      skipped
            layout        installed
            install curl  failed: command "make" failed
        "#};
        assert_eq!(report.to_string(), expect);
        assert_eq!(report.failures(), 1);
        assert_eq!(report.outcome("layout"), Some(&Outcome::Installed));
    }

    #[test]
    fn failed_outcome_keeps_cause_chain() {
        let error = anyhow::anyhow!("exit code 2").context("failed to build curl");
        assert_eq!(
            Outcome::failed(&error),
            Outcome::Failed("failed to build curl: exit code 2".into())
        );
    }
}
