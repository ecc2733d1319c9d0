// Copyright (C) 2026 Checkmk GmbH - License: GNU General Public License v2
// This file is part of Checkmk (https://checkmk.com). It is subject to the terms and
// conditions defined in the file COPYING, which is part of this source code package.

//! Resolves dependencies from Gradle lockfiles or the Gradle wrapper.

use regex::Regex;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::LazyLock;
use std::time::Duration;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use super::{DependencyResolver, Resolution, ResolvedDependency};
use crate::process::{run_with_timeout, ProcessError};
use crate::report::error_chain;

pub(crate) const DEFAULT_DEPENDENCY_TIMEOUT: Duration = Duration::from_secs(120);
pub(crate) const DEFAULT_CONFIGURATION: &str = "releaseRuntimeClasspath";
/// Lockfiles deeper than this below a project directory are not considered.
const LOCKFILE_DEPTH: usize = 3;

static TREE_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[+\\]--- ([^\s:]+):([^\s:]+)(?::(\{[^}]*\}|[^\s]+))?(?: -> ([^\s]+))?")
        .expect("valid regex")
});

#[must_use]
pub(crate) fn default_project_dirs() -> Vec<PathBuf> {
    ["platforms/android", "android", "."]
        .into_iter()
        .map(PathBuf::from)
        .collect()
}

/// Resolves through Gradle. A persisted lockfile is preferred over running the
/// wrapper, which needs a configured SDK and may download the world.
#[derive(Debug, Clone)]
pub struct GradleResolver {
    project_dirs: Vec<PathBuf>,
    configuration: String,
    timeout: Duration,
}

impl Default for GradleResolver {
    fn default() -> Self {
        Self::new(
            default_project_dirs(),
            DEFAULT_CONFIGURATION.to_string(),
            DEFAULT_DEPENDENCY_TIMEOUT,
        )
    }
}

impl GradleResolver {
    #[must_use]
    pub fn new(project_dirs: Vec<PathBuf>, configuration: String, timeout: Duration) -> Self {
        Self {
            project_dirs,
            configuration,
            timeout,
        }
    }

    fn project_dirs<'a>(&'a self, root: &'a Path) -> impl Iterator<Item = PathBuf> + 'a {
        self.project_dirs
            .iter()
            .map(move |dir| root.join(dir))
            .filter(|dir| dir.is_dir())
    }

    fn from_lockfiles(&self, root: &Path) -> Option<Vec<ResolvedDependency>> {
        for dir in self.project_dirs(root) {
            let lockfiles = find_lockfiles(&dir);
            if lockfiles.is_empty() {
                continue;
            }
            let mut dependencies = Vec::new();
            for lockfile in &lockfiles {
                match fs::read_to_string(lockfile) {
                    Ok(text) => dependencies.extend(parse_lockfile(&text)),
                    Err(e) => {
                        warn!(lockfile = %lockfile.display(), error = %e, "Failed to read lockfile");
                    }
                }
            }
            info!(directory = %dir.display(), lockfiles = lockfiles.len(), "Using Gradle lockfiles");
            return Some(dependencies);
        }
        None
    }

    fn from_wrapper(&self, root: &Path) -> Resolution {
        let wrapper_name = if cfg!(windows) {
            "gradlew.bat"
        } else {
            "gradlew"
        };
        let Some((dir, wrapper)) = self
            .project_dirs(root)
            .map(|dir| {
                let wrapper = dir.join(wrapper_name);
                (dir, wrapper)
            })
            .find(|(_, wrapper)| wrapper.is_file())
        else {
            return Resolution::Unavailable("No Gradle lockfile or wrapper found".to_string());
        };

        info!(wrapper = %wrapper.display(), configuration = %self.configuration, "Running Gradle dependency report");
        let mut command = Command::new(&wrapper);
        command
            .args(["app:dependencies", "--configuration", self.configuration.as_str(), "-q"])
            .current_dir(&dir);
        match run_with_timeout(command, self.timeout) {
            Ok(output) => Resolution::Resolved(parse_dependency_tree(&output)),
            Err(ProcessError::Timeout { timeout, .. }) => Resolution::TimedOut(timeout),
            Err(e) => Resolution::Unavailable(error_chain(&e)),
        }
    }
}

impl DependencyResolver for GradleResolver {
    fn resolve(&self, root: &Path) -> Resolution {
        match self.from_lockfiles(root) {
            Some(dependencies) => Resolution::Resolved(dependencies),
            None => self.from_wrapper(root),
        }
    }
}

fn find_lockfiles(dir: &Path) -> Vec<PathBuf> {
    let mut lockfiles: Vec<PathBuf> = WalkDir::new(dir)
        .max_depth(LOCKFILE_DEPTH)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|entry| entry.file_type().is_file())
        .filter(|entry| {
            entry
                .file_name()
                .to_str()
                .is_some_and(|name| name.ends_with("gradle.lockfile"))
        })
        .map(walkdir::DirEntry::into_path)
        .collect();
    lockfiles.sort();
    debug!(directory = %dir.display(), count = lockfiles.len(), "Lockfiles located");
    lockfiles
}

/// Parse a Gradle lockfile (`group:name:version=configurations` per line).
#[must_use]
pub fn parse_lockfile(text: &str) -> Vec<ResolvedDependency> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .filter_map(|line| {
            let (coordinate, _configurations) = line.split_once('=')?;
            let mut parts = coordinate.split(':');
            let group = parts.next()?;
            let name = parts.next()?;
            let version = parts.next()?;
            Some(ResolvedDependency::new(group, name, version))
        })
        .collect()
}

/// Parse the tree printed by `gradle dependencies`, following `a -> b`
/// conflict resolution to the version actually selected.
#[must_use]
pub fn parse_dependency_tree(output: &str) -> Vec<ResolvedDependency> {
    TREE_LINE
        .captures_iter(output)
        .filter_map(|captures| {
            let version = captures.get(4).or_else(|| captures.get(3))?;
            Some(ResolvedDependency::new(
                &captures[1],
                &captures[2],
                version.as_str(),
            ))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const TREE: &str = r"
releaseRuntimeClasspath - Runtime classpath of compilation 'release' (target  (androidJvm)).
+--- project :nativescript-optional
+--- androidx.camera:camera-core:1.3.4
|    +--- androidx.annotation:annotation:1.2.0 -> 1.8.0
|    \--- androidx.core:core:1.1.0 -> 1.13.1 (*)
+--- com.facebook.fresco:fresco:{strictly 2.6.0} -> 2.6.0 (c)
\--- org.jetbrains.kotlin:kotlin-stdlib -> 1.9.24
";

    #[test]
    fn test_parse_dependency_tree() {
        let dependencies: Vec<String> = parse_dependency_tree(TREE)
            .iter()
            .map(ToString::to_string)
            .collect();
        assert_eq!(
            dependencies,
            vec![
                "androidx.camera:camera-core:1.3.4",
                "androidx.annotation:annotation:1.8.0",
                "androidx.core:core:1.13.1",
                "com.facebook.fresco:fresco:2.6.0",
                "org.jetbrains.kotlin:kotlin-stdlib:1.9.24",
            ]
        );
    }

    #[test]
    fn test_parse_lockfile() {
        let text = "# This is a Gradle generated file for dependency locking.\n\
                    androidx.camera:camera-core:1.4.0=releaseRuntimeClasspath\n\
                    io.sentry:sentry-android-ndk:7.3.0=debugRuntimeClasspath,releaseRuntimeClasspath\n\
                    empty=\n";
        let dependencies = parse_lockfile(text);
        assert_eq!(
            dependencies,
            vec![
                ResolvedDependency::new("androidx.camera", "camera-core", "1.4.0"),
                ResolvedDependency::new("io.sentry", "sentry-android-ndk", "7.3.0"),
            ]
        );
    }

    #[test]
    fn test_lockfile_is_preferred() {
        let dir = TempDir::new().unwrap();
        let app = dir.path().join("platforms/android/app");
        fs::create_dir_all(&app).unwrap();
        fs::write(
            app.join("gradle.lockfile"),
            "com.tencent:mmkv:1.3.5=releaseRuntimeClasspath\n",
        )
        .unwrap();
        // A wrapper that would fail if it were run.
        fs::write(dir.path().join("platforms/android/gradlew"), "exit 1").unwrap();

        let resolution = GradleResolver::default().resolve(dir.path());
        assert_eq!(
            resolution,
            Resolution::Resolved(vec![ResolvedDependency::new("com.tencent", "mmkv", "1.3.5")])
        );
    }

    #[test]
    fn test_nothing_to_resolve_with() {
        let dir = TempDir::new().unwrap();
        let resolution = GradleResolver::default().resolve(dir.path());
        assert!(matches!(resolution, Resolution::Unavailable(_)));
    }

    #[cfg(unix)]
    #[test]
    fn test_wrapper_timeout() {
        use std::os::unix::fs::PermissionsExt;

        let dir = TempDir::new().unwrap();
        let wrapper = dir.path().join("gradlew");
        fs::write(&wrapper, "#!/bin/sh\nexec sleep 30\n").unwrap();
        fs::set_permissions(&wrapper, fs::Permissions::from_mode(0o755)).unwrap();

        let resolver = GradleResolver::new(
            vec![PathBuf::from(".")],
            DEFAULT_CONFIGURATION.to_string(),
            Duration::from_millis(300),
        );
        assert_eq!(
            resolver.resolve(dir.path()),
            Resolution::TimedOut(Duration::from_millis(300))
        );
    }

    #[cfg(unix)]
    #[test]
    fn test_wrapper_output_is_parsed() {
        use std::os::unix::fs::PermissionsExt;

        let dir = TempDir::new().unwrap();
        let wrapper = dir.path().join("gradlew");
        fs::write(
            &wrapper,
            "#!/bin/sh\necho '+--- io.sentry:sentry-android-ndk:7.3.0'\n",
        )
        .unwrap();
        fs::set_permissions(&wrapper, fs::Permissions::from_mode(0o755)).unwrap();

        let resolver = GradleResolver::new(
            vec![PathBuf::from(".")],
            DEFAULT_CONFIGURATION.to_string(),
            Duration::from_secs(10),
        );
        assert_eq!(
            resolver.resolve(dir.path()),
            Resolution::Resolved(vec![ResolvedDependency::new(
                "io.sentry",
                "sentry-android-ndk",
                "7.3.0"
            )])
        );
    }
}
