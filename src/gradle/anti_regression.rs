// Copyright (C) 2026 Checkmk GmbH - License: GNU General Public License v2
// This file is part of Checkmk (https://checkmk.com). It is subject to the terms and
// conditions defined in the file COPYING, which is part of this source code package.

//! Guards that keep a compliant project compliant.

use regex::Regex;
use std::collections::BTreeMap;
use std::sync::LazyLock;

use super::build_script::{FLEXIBLE_PAGE_SIZES, ZIPALIGN_DISABLED};
use super::strip_comments;
use crate::report::{Issue, Severity};

static LEGACY_PACKAGING: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\buseLegacyPackaging\s*(?:=\s*)?true\b").expect("valid regex")
});
static EXTRACT_NATIVE_LIBS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"android:extractNativeLibs\s*=\s*"true""#).expect("valid regex")
});
static BUNDLE_COMPRESSED_LIBS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"android\.bundle\.enableUncompressedNativeLibs\s*=\s*false\b").expect("valid regex")
});
static LINKER_16K: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"-Wl,-z,max-page-size=16384\b").expect("valid regex"));

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Guard {
    /// Libraries stay uncompressed in the package so they can be mapped in place.
    UncompressedNativeLibs,
    ZipAlignment,
    FlexiblePageSizes,
    MaxPageSizeLinkerFlag,
}

impl Guard {
    pub const ALL: [Guard; 4] = [
        Guard::UncompressedNativeLibs,
        Guard::ZipAlignment,
        Guard::FlexiblePageSizes,
        Guard::MaxPageSizeLinkerFlag,
    ];

    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::UncompressedNativeLibs => "uncompressed-native-libs",
            Self::ZipAlignment => "zip-alignment",
            Self::FlexiblePageSizes => "flexible-page-sizes",
            Self::MaxPageSizeLinkerFlag => "max-page-size-linker-flag",
        }
    }

    /// A required guard that is disabled is reported.
    #[must_use]
    pub fn is_required(self) -> bool {
        matches!(self, Self::UncompressedNativeLibs | Self::ZipAlignment)
    }

    fn is_enabled(self, text: &str) -> bool {
        match self {
            Self::UncompressedNativeLibs => {
                !(LEGACY_PACKAGING.is_match(text)
                    || EXTRACT_NATIVE_LIBS.is_match(text)
                    || BUNDLE_COMPRESSED_LIBS.is_match(text))
            }
            Self::ZipAlignment => !ZIPALIGN_DISABLED.is_match(text),
            Self::FlexiblePageSizes => FLEXIBLE_PAGE_SIZES.is_match(text),
            Self::MaxPageSizeLinkerFlag => LINKER_16K.is_match(text),
        }
    }

    fn action(self) -> &'static str {
        match self {
            Self::UncompressedNativeLibs => {
                "Remove useLegacyPackaging true, android:extractNativeLibs=\"true\" and android.bundle.enableUncompressedNativeLibs=false"
            }
            Self::ZipAlignment => "Remove zipAlignEnabled false",
            Self::FlexiblePageSizes => "Pass -DANDROID_SUPPORT_FLEXIBLE_PAGE_SIZES=ON to CMake",
            Self::MaxPageSizeLinkerFlag => "Link with -Wl,-z,max-page-size=16384",
        }
    }
}

/// Guard states and the issues raised for disabled required guards.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AntiRegression {
    pub issues: Vec<Issue>,
    pub protections: BTreeMap<String, bool>,
}

/// Evaluate every [`Guard`] against `text`, usually the concatenation of all
/// build configuration files of a project.
#[must_use]
pub fn check_anti_regression(text: &str, origin: &str) -> AntiRegression {
    let text = strip_comments(text);
    let mut result = AntiRegression::default();
    for guard in Guard::ALL {
        let enabled = guard.is_enabled(&text);
        result.protections.insert(guard.name().to_string(), enabled);
        if guard.is_required() && !enabled {
            result.issues.push(
                Issue::new(
                    Severity::Warn,
                    format!("anti-regression-{}", guard.name()),
                    format!("Protection {} is disabled", guard.name()),
                    origin,
                )
                .with_action(guard.action()),
            );
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_project_keeps_required_guards() {
        let result = check_anti_regression("android { compileSdk 35 }", "/p");
        assert!(result.issues.is_empty());
        assert!(result.protections["uncompressed-native-libs"]);
        assert!(result.protections["zip-alignment"]);
        assert!(!result.protections["flexible-page-sizes"]);
        assert!(!result.protections["max-page-size-linker-flag"]);
    }

    #[test]
    fn test_each_opt_out_disables_uncompressed_libs() {
        for text in [
            "packaging { jniLibs { useLegacyPackaging true } }",
            "packagingOptions { jniLibs { useLegacyPackaging = true } }",
            "<application android:extractNativeLibs=\"true\" />",
            "android.bundle.enableUncompressedNativeLibs=false",
        ] {
            let result = check_anti_regression(text, "/p");
            assert!(!result.protections["uncompressed-native-libs"], "{text}");
            assert_eq!(result.issues.len(), 1, "{text}");
            assert_eq!(
                result.issues[0].rule,
                "anti-regression-uncompressed-native-libs"
            );
            assert_eq!(result.issues[0].severity, Severity::Warn);
        }
    }

    #[test]
    fn test_zip_alignment_guard() {
        let result = check_anti_regression("release { zipAlignEnabled false }", "/p");
        assert!(!result.protections["zip-alignment"]);
        assert_eq!(result.issues.len(), 1);
        assert_eq!(result.issues[0].rule, "anti-regression-zip-alignment");
        assert_eq!(result.issues[0].origin, "/p");
    }

    #[test]
    fn test_optional_guards_never_raise_issues() {
        let result = check_anti_regression(
            "arguments \"-DANDROID_SUPPORT_FLEXIBLE_PAGE_SIZES=ON\"\nldflags \"-Wl,-z,max-page-size=16384\"",
            "/p",
        );
        assert!(result.protections["flexible-page-sizes"]);
        assert!(result.protections["max-page-size-linker-flag"]);
        assert!(result.issues.is_empty());
    }

    #[test]
    fn test_opt_out_in_comment_is_ignored() {
        let result = check_anti_regression(
            "// useLegacyPackaging true\n<!-- android:extractNativeLibs=\"true\" -->",
            "/p",
        );
        assert!(result.issues.is_empty());
    }

    #[test]
    fn test_opt_out_between_glob_strings() {
        let text = "pickFirst 'lib/*/libc++_shared.so'\njniLibs { useLegacyPackaging true }\npickFirst \"**/*.so\"\n";
        let result = check_anti_regression(text, "/p");
        assert!(!result.protections["uncompressed-native-libs"]);
        assert_eq!(result.issues.len(), 1);
    }
}
