// Copyright (C) 2026 Checkmk GmbH - License: GNU General Public License v2
// This file is part of Checkmk (https://checkmk.com). It is subject to the terms and
// conditions defined in the file COPYING, which is part of this source code package.

//! Merges the issue streams of an audit into one report.

use std::collections::BTreeMap;
use std::path::Path;
use tracing::debug;

use super::totals::ReportTotals;
use super::{ComplianceReport, Issue, Severity, Status};
use crate::artifact::Artifact;
use crate::dependencies::ResolvedDependencies;
use crate::library::{Architecture, NativeLibrary};

/// Collects issues and findings from independent streams.
///
/// Streams may be added in any order, the merged report is the same.
#[derive(Debug, Default)]
pub struct ComplianceAggregator {
    issues: Vec<Issue>,
    libraries: Vec<NativeLibrary>,
    artifacts: Vec<Artifact>,
    dependencies: ResolvedDependencies,
    protections: BTreeMap<String, bool>,
}

impl ComplianceAggregator {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an issue stream, e.g. the build config audit or an external lint run.
    pub fn add_issues(&mut self, issues: impl IntoIterator<Item = Issue>) -> &mut Self {
        self.issues.extend(issues);
        self
    }

    pub fn add_libraries(&mut self, libraries: impl IntoIterator<Item = NativeLibrary>) -> &mut Self {
        self.libraries.extend(libraries);
        self
    }

    /// Artifact issues are copied into the report's issue list on merge.
    pub fn add_artifacts(&mut self, artifacts: impl IntoIterator<Item = Artifact>) -> &mut Self {
        self.artifacts.extend(artifacts);
        self
    }

    pub fn set_dependencies(&mut self, dependencies: ResolvedDependencies) -> &mut Self {
        self.dependencies = dependencies;
        self
    }

    pub fn add_protections(&mut self, protections: BTreeMap<String, bool>) -> &mut Self {
        self.protections.extend(protections);
        self
    }

    /// Build the report for `root`.
    #[must_use]
    pub fn merge(self, root: &Path) -> ComplianceReport {
        let Self {
            mut issues,
            mut libraries,
            mut artifacts,
            dependencies,
            protections,
        } = self;

        libraries.sort_by(|a, b| a.path.cmp(&b.path));
        artifacts.sort_by(|a, b| a.path.cmp(&b.path));
        for artifact in &mut artifacts {
            artifact
                .contained_libraries
                .sort_by(|a, b| a.path.cmp(&b.path));
            issues.extend(artifact.issues.iter().cloned());
        }

        let all_libraries: Vec<&NativeLibrary> = libraries
            .iter()
            .chain(artifacts.iter().flat_map(|a| a.contained_libraries.iter()))
            .collect();
        issues.extend(abi_coverage_issue(&all_libraries, root));
        issues.sort_by(|a, b| a.sort_key().cmp(&b.sort_key()));

        let totals = ReportTotals::new(&issues, &all_libraries);
        let status = Status::from_issues(&issues);
        debug!(%status, issues = issues.len(), libraries = all_libraries.len(), "Report merged");

        ComplianceReport {
            status,
            root: root.to_path_buf(),
            totals,
            issues,
            native_libraries: libraries,
            artifacts,
            resolved_dependencies: dependencies,
            protections,
        }
    }
}

/// Devices with 16KB pages are arm64 only, so a project shipping native code
/// without an arm64-v8a build cannot run there at all.
fn abi_coverage_issue(libraries: &[&NativeLibrary], root: &Path) -> Option<Issue> {
    if libraries.is_empty()
        || libraries
            .iter()
            .any(|library| library.architecture == Architecture::Arm64V8a)
    {
        return None;
    }
    let mut present: Vec<&str> = libraries
        .iter()
        .map(|library| library.architecture.dir_name())
        .collect();
    present.sort_unstable();
    present.dedup();
    Some(
        Issue::new(
            Severity::High,
            "abi-coverage-no-arm64",
            format!(
                "Native libraries are shipped for {} but not for arm64-v8a",
                present.join(", ")
            ),
            root.display().to_string(),
        )
        .with_context("abis", present)
        .with_action("Build and package arm64-v8a variants of all native libraries"),
    )
}
