// Copyright (C) 2026 Checkmk GmbH - License: GNU General Public License v2
// This file is part of Checkmk (https://checkmk.com). It is subject to the terms and
// conditions defined in the file COPYING, which is part of this source code package.

//! Heuristic audit of Gradle build scripts, properties and manifests.
//!
//! This is a line-oriented regex scanner, not a Gradle evaluator: values computed
//! at configuration time (`rootProject.ext.ndkVersion`, version catalogs) are not
//! resolved and simply produce no finding.

mod anti_regression;
mod build_script;

use rayon::prelude::*;
use regex::{Captures, Regex};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::report::{Issue, Severity};

pub use anti_regression::{check_anti_regression, AntiRegression, Guard};
pub use build_script::check_gradle;

/// Directories never descended into when looking for build configuration.
const SKIPPED_DIRS: [&str; 4] = ["node_modules", ".git", "build", ".gradle"];

const BUILD_FILE_NAMES: [&str; 5] = [
    "build.gradle",
    "build.gradle.kts",
    "gradle.properties",
    "gradle-wrapper.properties",
    "AndroidManifest.xml",
];

/// Comments and single-line string literals, matched in one pass so that globs
/// such as `'lib/*/libc++_shared.so'` never open a block comment and a `/*`
/// inside a line comment never opens one either.
static COMMENT_OR_STRING: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"(?m:^[ \t]*(?://|#)[^\n]*)|"(?:[^"\\\n]|\\.)*"|'(?:[^'\\\n]|\\.)*'|/\*(?s:.*?)\*/|<!--(?s:.*?)-->"#,
    )
    .expect("valid regex")
});

/// Findings of the build configuration audit.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BuildConfigAudit {
    pub issues: Vec<Issue>,
    pub protections: BTreeMap<String, bool>,
}

/// Remove comments so commented-out settings do not count.
///
/// Handles whole-line `//` and `#` comments and `/* */` and `<!-- -->` blocks.
/// String literals are kept as they are.
pub(crate) fn strip_comments(text: &str) -> String {
    COMMENT_OR_STRING
        .replace_all(text, |captures: &Captures<'_>| {
            let matched = &captures[0];
            if matched.starts_with(['"', '\'']) {
                matched.to_string()
            } else {
                String::new()
            }
        })
        .into_owned()
}

/// Find build scripts, properties and manifests below `root`, sorted by path.
#[must_use]
pub fn find_build_files(root: &Path) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = WalkDir::new(root)
        .into_iter()
        .filter_entry(|entry| {
            entry.depth() == 0
                || !(entry.file_type().is_dir()
                    && entry
                        .file_name()
                        .to_str()
                        .is_some_and(|name| SKIPPED_DIRS.contains(&name)))
        })
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(e) => {
                warn!(error = %e, "Failed to walk directory entry");
                None
            }
        })
        .filter(|entry| entry.file_type().is_file())
        .filter(|entry| {
            entry
                .file_name()
                .to_str()
                .is_some_and(|name| BUILD_FILE_NAMES.contains(&name))
        })
        .map(walkdir::DirEntry::into_path)
        .collect();
    files.sort();
    debug!(count = files.len(), "Build configuration files located");
    files
}

fn is_manifest(path: &Path) -> bool {
    path.file_name().is_some_and(|name| name == "AndroidManifest.xml")
}

/// Audit every build configuration file below `root`.
///
/// Scripts and properties are checked one by one; anti-regression guards are
/// evaluated over the concatenation of all files, manifests included, because a
/// guard may be disabled in any of them.
#[must_use]
pub fn audit_build_config(root: &Path) -> BuildConfigAudit {
    let files = find_build_files(root);
    let contents: Vec<(PathBuf, Result<String, Issue>)> = files
        .into_par_iter()
        .map(|path| {
            let content = fs::read_to_string(&path).map_err(|e| {
                Issue::new(
                    Severity::Warn,
                    "file-unreadable",
                    format!("Failed to read build file: {e}"),
                    path.display().to_string(),
                )
            });
            (path, content)
        })
        .collect();

    let mut audit = BuildConfigAudit::default();
    let mut combined = String::new();
    for (path, content) in &contents {
        match content {
            Ok(text) => {
                if !is_manifest(path) {
                    audit
                        .issues
                        .extend(check_gradle(text, &path.display().to_string()));
                }
                combined.push_str(text);
                combined.push('\n');
            }
            Err(issue) => audit.issues.push(issue.clone()),
        }
    }

    let anti_regression = check_anti_regression(&combined, &root.display().to_string());
    audit.issues.extend(anti_regression.issues);
    audit.protections = anti_regression.protections;
    debug!(
        files = contents.len(),
        issues = audit.issues.len(),
        "Build configuration audited"
    );
    audit
}
