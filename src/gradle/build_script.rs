// Copyright (C) 2026 Checkmk GmbH - License: GNU General Public License v2
// This file is part of Checkmk (https://checkmk.com). It is subject to the terms and
// conditions defined in the file COPYING, which is part of this source code package.

use regex::Regex;
use std::sync::LazyLock;

use super::strip_comments;
use crate::report::{Issue, Severity};
use crate::version::Version;

/// First NDK that aligns LOAD segments to 16KB by default.
const NDK_DEFAULT_16K: Version = Version::new(28, 0, 0);
/// First NDK that supports the flexible page size flag.
const NDK_FLEXIBLE: Version = Version::new(27, 0, 0);
/// First Android Gradle plugin that zip-aligns uncompressed libraries to 16KB.
const AGP_MINIMUM: Version = Version::new(8, 5, 1);
const GRADLE_MINIMUM: Version = Version::new(8, 7, 0);
/// API level from which devices may ship with 16KB pages.
const TARGET_SDK_16K: u64 = 35;

static NDK_VERSION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"\b(?:android\.)?ndkVersion\s*[=(]?\s*["']?([0-9][0-9A-Za-z.\-]*)"#)
        .expect("valid regex")
});
pub(super) static FLEXIBLE_PAGE_SIZES: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"ANDROID_SUPPORT_FLEXIBLE_PAGE_SIZES\s*=\s*ON\b").expect("valid regex")
});
static AGP_CLASSPATH: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"com\.android\.tools\.build:gradle:([0-9][0-9A-Za-z.\-]*)").expect("valid regex")
});
static AGP_PLUGIN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"id\s*\(?\s*["']com\.android\.(?:application|library)["']\s*\)?\s*version\s*\(?\s*["']([^"']+)["']"#,
    )
    .expect("valid regex")
});
static WRAPPER_DISTRIBUTION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"distributionUrl\s*=\s*\S*?gradle-([0-9]+(?:\.[0-9]+)*)").expect("valid regex")
});
pub(super) static ZIPALIGN_DISABLED: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(?:is)?[zZ]ipAlignEnabled\s*(?:=\s*)?false\b").expect("valid regex")
});
static PAGE_SIZE_4K: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"max-page-size=4096\b").expect("valid regex"));
static ABI_FILTERS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^.*\babiFilters\b.*$").expect("valid regex"));
static ANDROID_MODULE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)com\.android\.(?:application|library)\b|^\s*android\s*\{")
        .expect("valid regex")
});
static TARGET_SDK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\btargetSdk(?:Version)?\s*[=(]?\s*([0-9]+)\b").expect("valid regex")
});

fn first_version(regex: &Regex, text: &str) -> Option<(String, Version)> {
    regex.captures_iter(text).find_map(|captures| {
        let raw = captures.get(1)?.as_str().to_string();
        let version = Version::parse(&raw)?;
        Some((raw, version))
    })
}

/// Check one build script or properties file for settings affecting 16KB
/// page support. Findings carry `origin`.
///
/// The ABI filter presence check only applies to build scripts that declare an
/// Android module; `.properties` files are checked for versions and flags.
#[must_use]
pub fn check_gradle(text: &str, origin: &str) -> Vec<Issue> {
    let text = strip_comments(text);
    let mut issues = Vec::new();
    let issue = |severity, rule: &str, message: String| Issue::new(severity, rule, message, origin);

    if let Some((raw, version)) = first_version(&NDK_VERSION, &text) {
        let flexible = FLEXIBLE_PAGE_SIZES.is_match(&text);
        let (severity, message) = if version < NDK_FLEXIBLE {
            (
                Severity::High,
                format!("NDK {raw} cannot build 16KB aligned libraries, use r28 or newer"),
            )
        } else if version >= NDK_DEFAULT_16K || flexible {
            (Severity::Pass, format!("NDK {raw} builds 16KB aligned libraries"))
        } else {
            (
                Severity::Info,
                format!("NDK {raw} needs ANDROID_SUPPORT_FLEXIBLE_PAGE_SIZES=ON for 16KB alignment"),
            )
        };
        let mut finding = issue(severity, "ndk-version", message).with_context("version", raw);
        if severity != Severity::Pass {
            finding = finding.with_action("Set ndkVersion to 28.0.12674087 or newer");
        }
        issues.push(finding);
    }

    let agp = first_version(&AGP_CLASSPATH, &text).or_else(|| first_version(&AGP_PLUGIN, &text));
    if let Some((raw, version)) = agp {
        issues.push(floor_issue(
            issue,
            "agp-version",
            "Android Gradle plugin",
            &raw,
            version,
            AGP_MINIMUM,
        ));
    }

    if let Some((raw, version)) = first_version(&WRAPPER_DISTRIBUTION, &text) {
        issues.push(floor_issue(
            issue,
            "gradle-wrapper-version",
            "Gradle wrapper",
            &raw,
            version,
            GRADLE_MINIMUM,
        ));
    }

    if ZIPALIGN_DISABLED.is_match(&text) {
        issues.push(
            issue(
                Severity::High,
                "packaging-zipalign-disabled",
                "zipAlignEnabled false leaves uncompressed libraries unaligned".to_string(),
            )
            .with_action("Remove zipAlignEnabled false"),
        );
    }

    if PAGE_SIZE_4K.is_match(&text) {
        issues.push(
            issue(
                Severity::High,
                "packaging-4k-page-size",
                "Linker flag max-page-size=4096 forces 4KB segment alignment".to_string(),
            )
            .with_action("Use -Wl,-z,max-page-size=16384"),
        );
    }

    let is_properties = origin.ends_with(".properties");
    let filters: Vec<&str> = ABI_FILTERS.find_iter(&text).map(|m| m.as_str()).collect();
    if !filters.is_empty() {
        if filters.iter().any(|line| line.contains("arm64-v8a")) {
            issues.push(issue(
                Severity::Pass,
                "abi-filters",
                "abiFilters include arm64-v8a".to_string(),
            ));
        } else {
            issues.push(
                issue(
                    Severity::Warn,
                    "abi-filters-no-arm64",
                    "abiFilters do not include arm64-v8a".to_string(),
                )
                .with_action("Add arm64-v8a to abiFilters"),
            );
        }
    } else if !is_properties && ANDROID_MODULE.is_match(&text) {
        issues.push(issue(
            Severity::Info,
            "abi-filters-missing",
            "No abiFilters declared, every ABI the dependencies ship is packaged".to_string(),
        ));
    }

    let target_sdk = TARGET_SDK
        .captures_iter(&text)
        .find_map(|captures| captures.get(1)?.as_str().parse::<u64>().ok());
    if let Some(level) = target_sdk {
        let finding = if level < TARGET_SDK_16K {
            issue(
                Severity::Info,
                "target-sdk",
                format!("targetSdk {level} is below {TARGET_SDK_16K}, 16KB devices are not tested"),
            )
        } else {
            issue(Severity::Pass, "target-sdk", format!("targetSdk {level}"))
        };
        issues.push(finding.with_context("version", level));
    }

    issues
}

fn floor_issue(
    issue: impl Fn(Severity, &str, String) -> Issue,
    rule: &str,
    component: &str,
    raw: &str,
    version: Version,
    minimum: Version,
) -> Issue {
    if version < minimum {
        issue(
            Severity::High,
            rule,
            format!("{component} {raw} is older than {minimum}"),
        )
        .with_context("version", raw)
        .with_context("floor", minimum.to_string())
        .with_action(format!("Upgrade {component} to {minimum} or newer"))
    } else {
        issue(
            Severity::Pass,
            rule,
            format!("{component} {raw} meets {minimum}"),
        )
        .with_context("version", raw)
    }
}
