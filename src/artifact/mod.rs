// Copyright (C) 2026 Checkmk GmbH - License: GNU General Public License v2
// This file is part of Checkmk (https://checkmk.com). It is subject to the terms and
// conditions defined in the file COPYING, which is part of this source code package.

//! Packaged build artifacts (APK and AAB) and the libraries nested inside them.

mod scanner;

use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::library::NativeLibrary;
use crate::report::Issue;

pub use scanner::{ArtifactArchiveScanner, ArtifactError};

/// Type of packaged artifact, identified by extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ArtifactKind {
    /// Installable `.apk`; libraries live under `lib/<abi>/`.
    Package,
    /// Publishing `.aab`; libraries live under `<module>/lib/<abi>/`.
    Bundle,
}

impl ArtifactKind {
    #[must_use]
    pub fn from_path(path: &Path) -> Option<Self> {
        match path.extension()?.to_str()? {
            "apk" => Some(Self::Package),
            "aab" => Some(Self::Bundle),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Artifact {
    pub path: PathBuf,
    pub kind: ArtifactKind,
    pub contained_libraries: Vec<NativeLibrary>,
    pub issues: Vec<Issue>,
}

impl Artifact {
    #[must_use]
    pub fn new(path: PathBuf, kind: ArtifactKind) -> Self {
        Self {
            path,
            kind,
            contained_libraries: Vec::new(),
            issues: Vec::new(),
        }
    }
}

/// Find `.apk` and `.aab` files below the build directories of `root`, sorted by path.
#[must_use]
pub fn find_artifacts(root: &Path, build_dirs: &[PathBuf]) -> Vec<PathBuf> {
    let mut artifacts: Vec<PathBuf> = build_dirs
        .iter()
        .map(|dir| root.join(dir))
        .filter(|base| base.is_dir())
        .flat_map(WalkDir::new)
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(e) => {
                warn!(error = %e, "Failed to walk directory entry");
                None
            }
        })
        .filter(|entry| entry.file_type().is_file())
        .filter(|entry| ArtifactKind::from_path(entry.path()).is_some())
        .map(|entry| crate::library::absolute_path(entry.path()))
        .collect();
    artifacts.sort();
    artifacts.dedup();
    debug!(count = artifacts.len(), "Build artifacts located");
    artifacts
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_kind_from_extension() {
        assert_eq!(
            ArtifactKind::from_path(Path::new("out/app-release.apk")),
            Some(ArtifactKind::Package)
        );
        assert_eq!(
            ArtifactKind::from_path(Path::new("out/app-release.aab")),
            Some(ArtifactKind::Bundle)
        );
        assert_eq!(ArtifactKind::from_path(Path::new("out/app.zip")), None);
        assert_eq!(ArtifactKind::from_path(Path::new("out/apk")), None);
    }

    #[test]
    fn test_find_artifacts_sorted() {
        let dir = TempDir::new().unwrap();
        let outputs = dir.path().join("platforms/android/app/build/outputs");
        fs::create_dir_all(outputs.join("bundle/release")).unwrap();
        fs::create_dir_all(outputs.join("apk/release")).unwrap();
        fs::write(outputs.join("bundle/release/app-release.aab"), b"").unwrap();
        fs::write(outputs.join("apk/release/app-release.apk"), b"").unwrap();
        fs::write(outputs.join("apk/release/output-metadata.json"), b"{}").unwrap();

        let found = find_artifacts(dir.path(), &[PathBuf::from("platforms/android")]);
        let names: Vec<_> = found
            .iter()
            .map(|path| path.file_name().unwrap().to_str().unwrap())
            .collect();
        assert_eq!(names, vec!["app-release.apk", "app-release.aab"]);
    }

    #[test]
    fn test_find_artifacts_missing_tree() {
        let dir = TempDir::new().unwrap();
        assert!(find_artifacts(dir.path(), &[PathBuf::from("platforms/android")]).is_empty());
    }
}
