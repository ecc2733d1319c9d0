// Copyright (C) 2026 Checkmk GmbH - License: GNU General Public License v2
// This file is part of Checkmk (https://checkmk.com). It is subject to the terms and
// conditions defined in the file COPYING, which is part of this source code package.

//! Resolves the project's dependency list and compares it against known
//! minimum versions that ship 16KB aligned native code.

mod analyzer;
mod gradle_resolver;

use serde::Serialize;
use std::fmt;
use std::path::Path;
use std::time::Duration;
use tracing::{info, warn};

pub use analyzer::{analyze_resolved_dependencies, MinimumVersion, FLOORS};
pub use gradle_resolver::{parse_dependency_tree, parse_lockfile, GradleResolver};
pub(crate) use gradle_resolver::{
    default_project_dirs, DEFAULT_CONFIGURATION, DEFAULT_DEPENDENCY_TIMEOUT,
};

/// A `group:name:version` coordinate as resolved by the build tool.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct ResolvedDependency {
    pub group: String,
    pub name: String,
    pub version: String,
}

impl ResolvedDependency {
    pub fn new(
        group: impl Into<String>,
        name: impl Into<String>,
        version: impl Into<String>,
    ) -> Self {
        Self {
            group: group.into(),
            name: name.into(),
            version: version.into(),
        }
    }
}

impl fmt::Display for ResolvedDependency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.group, self.name, self.version)
    }
}

/// Outcome of a resolution attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    Resolved(Vec<ResolvedDependency>),
    TimedOut(Duration),
    /// No resolution source, or the build tool failed; carries the reason.
    Unavailable(String),
}

/// Source of the resolved dependency list of a project.
pub trait DependencyResolver: Send + Sync {
    fn resolve(&self, root: &Path) -> Resolution;
}

/// Resolved dependencies as they appear in the report.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ResolvedDependencies {
    pub dependencies: Vec<ResolvedDependency>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Resolve the dependencies of the project at `root`.
///
/// Failures never propagate: a timeout or missing resolution source yields an
/// empty list and an `error` describing why resolution was skipped.
#[must_use]
pub fn get_resolved_dependencies(
    root: &Path,
    resolver: &dyn DependencyResolver,
) -> ResolvedDependencies {
    match resolver.resolve(root) {
        Resolution::Resolved(mut dependencies) => {
            dependencies.sort();
            dependencies.dedup();
            info!(count = dependencies.len(), "Dependencies resolved");
            ResolvedDependencies {
                dependencies,
                error: None,
            }
        }
        Resolution::TimedOut(timeout) => {
            warn!(?timeout, "Dependency resolution timed out");
            ResolvedDependencies {
                dependencies: Vec::new(),
                error: Some(format!("Dependency resolution timed out after {timeout:?}")),
            }
        }
        Resolution::Unavailable(reason) => {
            info!(%reason, "Dependency resolution unavailable");
            ResolvedDependencies {
                dependencies: Vec::new(),
                error: Some(reason),
            }
        }
    }
}
