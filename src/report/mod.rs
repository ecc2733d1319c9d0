// Copyright (C) 2026 Checkmk GmbH - License: GNU General Public License v2
// This file is part of Checkmk (https://checkmk.com). It is subject to the terms and
// conditions defined in the file COPYING, which is part of this source code package.

//! Compliance report and the public API for summarizing and validating it.

mod aggregator;
mod console;
mod issue;
mod totals;
mod utils;
mod validate;

pub use aggregator::ComplianceAggregator;
pub use console::summarize_report;
pub(crate) use issue::error_chain;
pub use issue::{Issue, Severity};
pub use totals::{AbiTotals, AlignmentTotals, IssueTotals, LibraryTotals, ReportTotals};
pub use validate::validate_report;

use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

use crate::artifact::Artifact;
use crate::dependencies::ResolvedDependencies;
use crate::library::NativeLibrary;

/// Overall result of an audit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Status {
    Pass,
    Warn,
    Fail,
}

impl Status {
    /// `FAIL` if any issue is high, else `WARN` if any is a warning, else `PASS`.
    #[must_use]
    pub fn from_issues(issues: &[Issue]) -> Self {
        match issues.iter().map(|issue| issue.severity).max() {
            Some(Severity::High) => Self::Fail,
            Some(Severity::Warn) => Self::Warn,
            _ => Self::Pass,
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Pass => "PASS",
            Self::Warn => "WARN",
            Self::Fail => "FAIL",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComplianceReport {
    pub status: Status,
    pub root: PathBuf,
    pub totals: ReportTotals,
    /// Every issue of the run, including those raised inside artifacts.
    pub issues: Vec<Issue>,
    pub native_libraries: Vec<NativeLibrary>,
    pub artifacts: Vec<Artifact>,
    pub resolved_dependencies: ResolvedDependencies,
    // BTreeMap keeps protection names in alphabetical order in the JSON.
    pub protections: BTreeMap<String, bool>,
}

impl ComplianceReport {
    /// Libraries found on disk followed by those nested in artifacts.
    pub fn all_libraries(&self) -> impl Iterator<Item = &NativeLibrary> {
        self.native_libraries.iter().chain(
            self.artifacts
                .iter()
                .flat_map(|artifact| artifact.contained_libraries.iter()),
        )
    }

    /// Issues at or above `severity`.
    pub fn issues_at_least(&self, severity: Severity) -> impl Iterator<Item = &Issue> {
        self.issues
            .iter()
            .filter(move |issue| issue.severity >= severity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn issues(severities: &[Severity]) -> Vec<Issue> {
        severities
            .iter()
            .map(|severity| Issue::new(*severity, "rule", "message", "origin"))
            .collect()
    }

    #[test]
    fn test_status_precedence() {
        let mut one_high = vec![Severity::Warn; 10];
        one_high.push(Severity::High);
        assert_eq!(Status::from_issues(&issues(&one_high)), Status::Fail);
        assert_eq!(
            Status::from_issues(&issues(&[Severity::Info, Severity::Warn])),
            Status::Warn
        );
        assert_eq!(
            Status::from_issues(&issues(&[Severity::Pass, Severity::Info])),
            Status::Pass
        );
        assert_eq!(Status::from_issues(&[]), Status::Pass);
    }

    #[test]
    fn test_status_is_order_independent() {
        let mut ordered = issues(&[Severity::Info, Severity::High, Severity::Warn]);
        let forward = Status::from_issues(&ordered);
        ordered.reverse();
        assert_eq!(Status::from_issues(&ordered), forward);
    }

    #[test]
    fn test_status_serializes_uppercase() {
        assert_eq!(serde_json::to_value(Status::Warn).unwrap(), "WARN");
        assert_eq!(Status::Fail.to_string(), "FAIL");
    }
}
