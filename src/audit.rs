// Copyright (C) 2026 Checkmk GmbH - License: GNU General Public License v2
// This file is part of Checkmk (https://checkmk.com). It is subject to the terms and
// conditions defined in the file COPYING, which is part of this source code package.

//! Runs a complete audit of a project and builds the report.
//!
//! The run is split in two concurrent streams on a dedicated thread pool:
//! build configuration and dependency auditing on one side, native library and
//! artifact scanning on the other. Per-file failures become issues; only a
//! missing project root or a failure to start the pool aborts the run.

use rayon::prelude::*;
use rayon::ThreadPoolBuilder;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

use crate::artifact::{find_artifacts, Artifact, ArtifactArchiveScanner};
use crate::config::AuditConfig;
use crate::dependencies::{
    analyze_resolved_dependencies, get_resolved_dependencies, DependencyResolver, GradleResolver,
    ResolvedDependencies,
};
use crate::elf::{ProgramHeaderReader, SegmentAlignmentInspector, ToolLocator, ToolReader};
use crate::gradle::{audit_build_config, BuildConfigAudit};
use crate::library::{absolute_path, locate, locate_manual, NativeLibrary};
use crate::report::{ComplianceAggregator, ComplianceReport, Issue, Severity};

#[derive(Debug, Error)]
pub enum AuditError {
    #[error("Project root is not a directory: {path:?}")]
    RootNotFound { path: PathBuf },
    #[error("Failed to start worker pool")]
    PoolBuildFailed(#[from] rayon::ThreadPoolBuildError),
}

enum ReaderChoice {
    /// Locate an introspection tool once at the start of each run.
    Discover(ToolLocator),
    Fixed(Box<dyn ProgramHeaderReader>),
}

/// Audits projects with one configuration.
pub struct Auditor {
    config: AuditConfig,
    reader: ReaderChoice,
    resolver: Box<dyn DependencyResolver>,
}

struct ConfigurationFindings {
    build: BuildConfigAudit,
    dependencies: ResolvedDependencies,
    issues: Vec<Issue>,
}

#[derive(Default)]
struct LibraryFindings {
    libraries: Vec<NativeLibrary>,
    artifacts: Vec<Artifact>,
    issues: Vec<Issue>,
}

impl Auditor {
    /// Auditor discovering the tool from the environment and resolving
    /// dependencies through Gradle.
    #[must_use]
    pub fn new(config: AuditConfig) -> Self {
        let resolver = GradleResolver::new(
            config.android_project_dirs.clone(),
            config.dependency_configuration.clone(),
            config.dependency_timeout(),
        );
        Self {
            config,
            reader: ReaderChoice::Discover(ToolLocator::from_env()),
            resolver: Box::new(resolver),
        }
    }

    /// Read program headers with `reader` instead of an external tool.
    #[must_use]
    pub fn with_reader(mut self, reader: Box<dyn ProgramHeaderReader>) -> Self {
        self.reader = ReaderChoice::Fixed(reader);
        self
    }

    #[must_use]
    pub fn with_tool_locator(mut self, locator: ToolLocator) -> Self {
        self.reader = ReaderChoice::Discover(locator);
        self
    }

    #[must_use]
    pub fn with_resolver(mut self, resolver: Box<dyn DependencyResolver>) -> Self {
        self.resolver = resolver;
        self
    }

    #[must_use]
    pub fn config(&self) -> &AuditConfig {
        &self.config
    }

    /// Audit the project at `root`.
    ///
    /// # Errors
    /// Returns an error if `root` is not a directory or the worker pool cannot be built.
    pub fn run(&self, root: &Path) -> Result<ComplianceReport, AuditError> {
        let root = absolute_path(root);
        if !root.is_dir() {
            return Err(AuditError::RootNotFound { path: root });
        }
        let jobs = self.config.jobs();
        let pool = ThreadPoolBuilder::new()
            .num_threads(jobs)
            .thread_name(|index| format!("pagesize-audit-{index}"))
            .build()?;
        info!(root = %root.display(), jobs, "Starting audit");

        let mut run_issues = Vec::new();
        let tool_reader;
        let reader: Option<&dyn ProgramHeaderReader> = match &self.reader {
            ReaderChoice::Fixed(reader) => Some(reader.as_ref()),
            ReaderChoice::Discover(locator) => {
                match locator.resolve(self.config.tool.as_deref()) {
                    Some(tool) => {
                        tool_reader = ToolReader::new(tool, self.config.tool_timeout());
                        Some(&tool_reader)
                    }
                    None => {
                        run_issues.push(tool_missing_issue(&root));
                        None
                    }
                }
            }
        };
        let inspector = reader.map(SegmentAlignmentInspector::new);

        let (configuration, libraries) = pool.install(|| {
            rayon::join(
                || self.audit_configuration(&root),
                || self.scan_libraries(&root, inspector.as_ref()),
            )
        });

        let mut aggregator = ComplianceAggregator::new();
        aggregator
            .add_issues(run_issues)
            .add_issues(configuration.build.issues)
            .add_protections(configuration.build.protections)
            .add_issues(configuration.issues)
            .set_dependencies(configuration.dependencies)
            .add_libraries(libraries.libraries)
            .add_artifacts(libraries.artifacts)
            .add_issues(libraries.issues);
        let report = aggregator.merge(&root);
        info!(status = %report.status, issues = report.issues.len(), "Audit completed");
        Ok(report)
    }

    fn audit_configuration(&self, root: &Path) -> ConfigurationFindings {
        let (build, (dependencies, issues)) = rayon::join(
            || audit_build_config(root),
            || self.audit_dependencies(root),
        );
        ConfigurationFindings {
            build,
            dependencies,
            issues,
        }
    }

    fn audit_dependencies(&self, root: &Path) -> (ResolvedDependencies, Vec<Issue>) {
        if !self.config.resolve_dependencies {
            debug!("Dependency resolution disabled");
            return (ResolvedDependencies::default(), Vec::new());
        }
        let resolved = get_resolved_dependencies(root, self.resolver.as_ref());
        let mut issues = analyze_resolved_dependencies(&resolved.dependencies);
        if let Some(error) = &resolved.error {
            issues.push(
                Issue::new(
                    Severity::Info,
                    "dependency-resolution-skipped",
                    format!("Dependency versions were not checked: {error}"),
                    root.display().to_string(),
                )
                .with_action("Commit Gradle lockfiles or make the Gradle wrapper runnable"),
            );
        }
        (resolved, issues)
    }

    fn scan_libraries(
        &self,
        root: &Path,
        inspector: Option<&SegmentAlignmentInspector<'_>>,
    ) -> LibraryFindings {
        let mut findings = LibraryFindings {
            libraries: locate(root, &self.config.build_dirs),
            ..LibraryFindings::default()
        };
        let manual = locate_manual(root, &self.config.manual_dirs);
        findings
            .issues
            .extend(manual.iter().map(manual_library_issue));
        findings.libraries.extend(manual);

        if let Some(inspector) = inspector {
            findings
                .issues
                .extend(inspector.verify_all(&mut findings.libraries));
        }

        let scanner = ArtifactArchiveScanner::new(inspector);
        findings.artifacts = find_artifacts(root, &self.config.build_dirs)
            .par_iter()
            .map(|path| scanner.scan(path))
            .collect();
        debug!(
            libraries = findings.libraries.len(),
            artifacts = findings.artifacts.len(),
            "Library scan completed"
        );
        findings
    }
}

fn tool_missing_issue(root: &Path) -> Issue {
    Issue::new(
        Severity::Info,
        "alignment-tool-missing",
        "No ELF introspection tool found, segment alignment was not verified",
        root.display().to_string(),
    )
    .with_action("Install the Android NDK or pass --tool with the path to llvm-readelf")
}

fn manual_library_issue(library: &NativeLibrary) -> Issue {
    Issue::new(
        Severity::Info,
        "manual-native-library",
        "Prebuilt native library bypasses build-time alignment settings",
        library.path.display().to_string(),
    )
    .with_context("abi", library.architecture.dir_name())
}
