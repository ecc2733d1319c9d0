// Copyright (C) 2026 Checkmk GmbH - License: GNU General Public License v2
// This file is part of Checkmk (https://checkmk.com). It is subject to the terms and
// conditions defined in the file COPYING, which is part of this source code package.

//! Native library model and ABI classification.

mod locator;

use path_clean::PathClean;
use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};

pub use locator::{locate, locate_manual};

/// Android ABI of a native library, derived from its directory name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum Architecture {
    #[serde(rename = "arm64-v8a")]
    Arm64V8a,
    #[serde(rename = "armeabi-v7a")]
    ArmeabiV7a,
    #[serde(rename = "x86_64")]
    X86_64,
    #[serde(rename = "x86")]
    X86,
    #[serde(rename = "unknown")]
    Unknown,
}

impl Architecture {
    /// Canonical ABI directory names in match order.
    pub const KNOWN: [Architecture; 4] = [
        Architecture::Arm64V8a,
        Architecture::ArmeabiV7a,
        Architecture::X86_64,
        Architecture::X86,
    ];

    #[must_use]
    pub fn dir_name(self) -> &'static str {
        match self {
            Self::Arm64V8a => "arm64-v8a",
            Self::ArmeabiV7a => "armeabi-v7a",
            Self::X86_64 => "x86_64",
            Self::X86 => "x86",
            Self::Unknown => "unknown",
        }
    }

    /// Classify a path by the ABI directory it lives in.
    ///
    /// Works on path text only so that archive entries (`app.apk!/lib/x86/libfoo.so`)
    /// classify the same way as files on disk. The first ABI of [`Self::KNOWN`] contained
    /// in any directory component wins, so `arm64-v8a-hwasan/` is still arm64; no match
    /// yields [`Architecture::Unknown`].
    #[must_use]
    pub fn classify(path: &str) -> Self {
        let mut directories: Vec<&str> = path.split(['/', '\\']).collect();
        // The last component is the file name, not a directory.
        directories.pop();
        Self::KNOWN
            .into_iter()
            .find(|abi| directories.iter().any(|dir| dir.contains(abi.dir_name())))
            .unwrap_or(Self::Unknown)
    }
}

impl fmt::Display for Architecture {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.dir_name())
    }
}

/// Where a library was discovered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum SourceKind {
    /// Placed by hand outside the build pipeline.
    Manual,
    PlatformBuild,
    /// Nested inside a packaged APK or AAB.
    Artifact,
}

/// Outcome of the 16KB segment alignment check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum AlignmentVerdict {
    Compliant,
    NonCompliant,
    #[default]
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NativeLibrary {
    pub path: PathBuf,
    pub architecture: Architecture,
    pub source_kind: SourceKind,
    pub alignment: AlignmentVerdict,
}

impl NativeLibrary {
    #[must_use]
    pub fn new(path: PathBuf, source_kind: SourceKind) -> Self {
        let architecture = Architecture::classify(&path.to_string_lossy());
        Self {
            path,
            architecture,
            source_kind,
            alignment: AlignmentVerdict::Unknown,
        }
    }

    #[must_use]
    pub fn is_shared_library_name(name: &str) -> bool {
        name.ends_with(".so")
    }
}

/// Make a path absolute and lexically clean so it can serve as a dedup key.
pub(crate) fn absolute_path(path: &Path) -> PathBuf {
    if path.is_absolute() {
        return path.clean();
    }
    std::env::current_dir()
        .map(|cwd| cwd.join(path))
        .unwrap_or_else(|_| path.to_path_buf())
        .clean()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_known_abis() {
        assert_eq!(
            Architecture::classify("/app/build/lib/arm64-v8a/libfoo.so"),
            Architecture::Arm64V8a
        );
        assert_eq!(
            Architecture::classify("/app/build/lib/armeabi-v7a/libfoo.so"),
            Architecture::ArmeabiV7a
        );
        assert_eq!(
            Architecture::classify("/app/build/lib/x86/libbar.so"),
            Architecture::X86
        );
        assert_eq!(
            Architecture::classify("/app/build/lib/x86_64/libbar.so"),
            Architecture::X86_64
        );
    }

    #[test]
    fn test_classify_unknown() {
        assert_eq!(
            Architecture::classify("/app/build/lib/mips/libfoo.so"),
            Architecture::Unknown
        );
        assert_eq!(Architecture::classify("libfoo.so"), Architecture::Unknown);
    }

    #[test]
    fn test_classify_ignores_file_name() {
        assert_eq!(
            Architecture::classify("/libs/tools/x86"),
            Architecture::Unknown
        );
    }

    #[test]
    fn test_classify_abi_directory_variants() {
        assert_eq!(
            Architecture::classify("/out/lib/arm64-v8a-hwasan/libfoo.so"),
            Architecture::Arm64V8a
        );
        assert_eq!(
            Architecture::classify("/prebuilt/x86_64-release/libfoo.so"),
            Architecture::X86_64
        );
        assert_eq!(
            Architecture::classify("/prebuilt/android-x86/libfoo.so"),
            Architecture::X86
        );
    }

    #[test]
    fn test_classify_archive_entry() {
        assert_eq!(
            Architecture::classify("/out/app.aab!/base/lib/arm64-v8a/libapp.so"),
            Architecture::Arm64V8a
        );
        assert_eq!(
            Architecture::classify("C:\\out\\lib\\x86\\libapp.so"),
            Architecture::X86
        );
    }

    #[test]
    fn test_classify_first_canonical_match_wins() {
        assert_eq!(
            Architecture::classify("/x86/nested/arm64-v8a/libfoo.so"),
            Architecture::Arm64V8a
        );
    }

    #[test]
    fn test_new_library_starts_unknown() {
        let library = NativeLibrary::new(
            PathBuf::from("/p/jniLibs/arm64-v8a/libfoo.so"),
            SourceKind::Manual,
        );
        assert_eq!(library.architecture, Architecture::Arm64V8a);
        assert_eq!(library.alignment, AlignmentVerdict::Unknown);
    }

    #[test]
    fn test_absolute_path_is_clean() {
        assert_eq!(
            absolute_path(Path::new("/a/b/../c/./libfoo.so")),
            PathBuf::from("/a/c/libfoo.so")
        );
        assert!(absolute_path(Path::new("relative/libfoo.so")).is_absolute());
    }
}
