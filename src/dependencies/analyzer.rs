// Copyright (C) 2026 Checkmk GmbH - License: GNU General Public License v2
// This file is part of Checkmk (https://checkmk.com). It is subject to the terms and
// conditions defined in the file COPYING, which is part of this source code package.

use tracing::debug;

use super::ResolvedDependency;
use crate::report::{Issue, Severity};
use crate::version::Version;

/// First release of a library whose bundled native code is 16KB aligned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MinimumVersion {
    pub group: &'static str,
    pub name: &'static str,
    pub floor: Version,
}

const fn floor(group: &'static str, name: &'static str, floor: Version) -> MinimumVersion {
    MinimumVersion { group, name, floor }
}

/// Libraries known to ship native code, with their first 16KB aligned release.
pub const FLOORS: &[MinimumVersion] = &[
    floor("androidx.camera", "camera-core", Version::new(1, 4, 0)),
    floor("androidx.graphics", "graphics-path", Version::new(1, 0, 1)),
    floor("androidx.sqlite", "sqlite-bundled", Version::new(2, 5, 0)),
    floor("com.facebook.fresco", "fresco", Version::new(3, 2, 0)),
    floor("com.facebook.react", "react-android", Version::new(0, 77, 0)),
    floor("com.google.mlkit", "barcode-scanning", Version::new(17, 3, 0)),
    floor("com.tencent", "mmkv", Version::new(2, 0, 0)),
    floor("io.sentry", "sentry-android-ndk", Version::new(7, 14, 0)),
    floor("net.zetetic", "sqlcipher-android", Version::new(4, 6, 1)),
    floor("org.tensorflow", "tensorflow-lite", Version::new(2, 16, 1)),
];

fn minimum_for(dependency: &ResolvedDependency) -> Option<&'static MinimumVersion> {
    FLOORS
        .iter()
        .find(|entry| entry.group == dependency.group && entry.name == dependency.name)
}

/// Compare resolved dependencies against [`FLOORS`].
///
/// Below the floor is `high`. At or above the floor but in the same major line
/// and at most one minor release ahead is `info`, since such releases are often
/// the first aligned builds and regress easily. Versions that cannot be parsed
/// are ignored.
#[must_use]
pub fn analyze_resolved_dependencies(dependencies: &[ResolvedDependency]) -> Vec<Issue> {
    dependencies
        .iter()
        .filter_map(|dependency| {
            let minimum = minimum_for(dependency)?;
            let Some(version) = Version::parse(&dependency.version) else {
                debug!(dependency = %dependency, "Unparsable dependency version");
                return None;
            };
            let floor = minimum.floor;
            let origin = dependency.to_string();
            if version < floor {
                return Some(
                    Issue::new(
                        Severity::High,
                        "dependency-below-floor",
                        format!(
                            "{}:{} {} ships native code without 16KB alignment, {floor} or newer is required",
                            dependency.group, dependency.name, dependency.version
                        ),
                        origin,
                    )
                    .with_context("version", dependency.version.clone())
                    .with_context("floor", floor.to_string())
                    .with_action(format!("Upgrade {}:{} to {floor} or newer", dependency.group, dependency.name)),
                );
            }
            if version.major == floor.major && version.minor <= floor.minor + 1 {
                return Some(
                    Issue::new(
                        Severity::Info,
                        "dependency-near-floor",
                        format!(
                            "{}:{} {} is close to the minimum aligned release {floor}",
                            dependency.group, dependency.name, dependency.version
                        ),
                        origin,
                    )
                    .with_context("version", dependency.version.clone())
                    .with_context("floor", floor.to_string()),
                );
            }
            None
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn analyze(group: &str, name: &str, version: &str) -> Vec<Issue> {
        analyze_resolved_dependencies(&[ResolvedDependency::new(group, name, version)])
    }

    #[test]
    fn test_below_floor_is_high() {
        let issues = analyze("io.sentry", "sentry-android-ndk", "7.3.0");
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].severity, Severity::High);
        assert_eq!(issues[0].rule, "dependency-below-floor");
        assert_eq!(issues[0].origin, "io.sentry:sentry-android-ndk:7.3.0");
        assert_eq!(issues[0].context["floor"], "7.14.0");
    }

    #[test]
    fn test_near_floor_is_info() {
        for version in ["1.4.0", "1.4.2", "1.5.0-alpha01"] {
            let issues = analyze("androidx.camera", "camera-core", version);
            assert_eq!(issues.len(), 1, "{version}");
            assert_eq!(issues[0].severity, Severity::Info, "{version}");
            assert_eq!(issues[0].rule, "dependency-near-floor");
        }
    }

    #[test]
    fn test_comfortably_above_floor_is_silent() {
        assert!(analyze("androidx.camera", "camera-core", "1.6.0").is_empty());
        assert!(analyze("com.tencent", "mmkv", "3.0.0").is_empty());
    }

    #[test]
    fn test_unknown_and_unparsable_are_ignored() {
        assert!(analyze("com.example", "native", "0.0.1").is_empty());
        assert!(analyze("io.sentry", "sentry-android-ndk", "latest.release").is_empty());
    }

    #[test]
    fn test_older_minor_below_floor() {
        let issues = analyze("com.facebook.react", "react-android", "0.76.5");
        assert_eq!(issues[0].severity, Severity::High);
    }
}
