// Copyright (C) 2026 Checkmk GmbH - License: GNU General Public License v2
// This file is part of Checkmk (https://checkmk.com). It is subject to the terms and
// conditions defined in the file COPYING, which is part of this source code package.

//! Opens APK/AAB archives and routes the nested native libraries through the
//! segment alignment inspector.

use rayon::prelude::*;
use std::fs::File;
use std::io::{self, BufReader, BufWriter, Read};
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use thiserror::Error;
use tracing::{debug, info, warn};
use zip::result::ZipError;
use zip::{CompressionMethod, ZipArchive};

use super::{Artifact, ArtifactKind};
use crate::elf::{SegmentAlignmentInspector, REQUIRED_ALIGNMENT};
use crate::library::{Architecture, NativeLibrary, SourceKind};
use crate::report::{error_chain, Issue, Severity};

type Result<T> = std::result::Result<T, ArtifactError>;

/// Errors that can occur while reading an artifact.
#[derive(Debug, Error)]
pub enum ArtifactError {
    #[error("Failed to open artifact: {path:?}")]
    OpenFailed {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("Artifact is not a valid zip archive: {path:?}")]
    InvalidArchive {
        path: PathBuf,
        #[source]
        source: ZipError,
    },
    #[error("Failed to extract {entry} from {path:?}")]
    EntryFailed {
        path: PathBuf,
        entry: String,
        #[source]
        source: io::Error,
    },
    #[error("Failed to create/delete temporary directory")]
    TempDirFailed {
        #[source]
        source: io::Error,
    },
}

/// A library selected from the archive, with its extracted copy if one was made.
struct Selected {
    library: NativeLibrary,
    extracted: Option<PathBuf>,
}

/// Scans packaged artifacts. Without an inspector, libraries are enumerated and
/// zip alignment is checked but segment alignment is left `unknown`.
pub struct ArtifactArchiveScanner<'a> {
    inspector: Option<&'a SegmentAlignmentInspector<'a>>,
}

impl<'a> ArtifactArchiveScanner<'a> {
    #[must_use]
    pub fn new(inspector: Option<&'a SegmentAlignmentInspector<'a>>) -> Self {
        Self { inspector }
    }

    /// Scan one artifact. Never fails: an unreadable archive yields a single
    /// `artifact-unreadable` warning and no libraries.
    #[must_use]
    pub fn scan(&self, path: &Path) -> Artifact {
        let kind = ArtifactKind::from_path(path).unwrap_or(ArtifactKind::Package);
        let mut artifact = Artifact::new(path.to_path_buf(), kind);
        info!(artifact = %path.display(), kind = ?kind, "Scanning artifact");

        if let Err(e) = self.scan_archive(&mut artifact) {
            warn!(artifact = %path.display(), error = %e, "Artifact could not be read");
            artifact.contained_libraries.clear();
            artifact.issues = vec![Issue::new(
                Severity::Warn,
                "artifact-unreadable",
                error_chain(&e),
                path.display().to_string(),
            )];
            return artifact;
        }

        artifact
            .contained_libraries
            .sort_by(|a, b| a.path.cmp(&b.path));
        debug!(
            artifact = %path.display(),
            libraries = artifact.contained_libraries.len(),
            issues = artifact.issues.len(),
            "Artifact scanned"
        );
        artifact
    }

    fn scan_archive(&self, artifact: &mut Artifact) -> Result<()> {
        let path = artifact.path.clone();
        let file = File::open(&path).map_err(|e| ArtifactError::OpenFailed {
            path: path.clone(),
            source: e,
        })?;
        let mut archive =
            ZipArchive::new(BufReader::new(file)).map_err(|e| ArtifactError::InvalidArchive {
                path: path.clone(),
                source: e,
            })?;

        // Removed on drop on every path; closed explicitly below to surface removal errors.
        let scratch = tempfile::Builder::new()
            .prefix("pagesize-audit-")
            .tempdir()
            .map_err(|e| ArtifactError::TempDirFailed { source: e })?;

        let mut selected = Vec::new();
        for index in 0..archive.len() {
            let mut entry = match archive.by_index(index) {
                Ok(entry) => entry,
                Err(e) => {
                    artifact.issues.push(Issue::new(
                        Severity::Warn,
                        "artifact-entry-unreadable",
                        format!("Entry #{index} cannot be read: {e}"),
                        path.display().to_string(),
                    ));
                    continue;
                }
            };
            if !entry.is_file() {
                continue;
            }
            // Entries escaping the archive root are never extracted.
            let Some(name) = entry
                .enclosed_name()
                .map(|name| name.to_string_lossy().replace('\\', "/"))
                .filter(|name| is_native_library_entry(name))
            else {
                continue;
            };

            let library = NativeLibrary::new(
                PathBuf::from(format!("{}!/{name}", path.display())),
                SourceKind::Artifact,
            );
            let stored = entry.compression() == CompressionMethod::Stored;
            if let Some(issue) =
                zip_alignment_issue(artifact.kind, &library, stored, entry.data_start())
            {
                artifact.issues.push(issue);
            }

            let extracted = if self.inspector.is_some()
                && library.architecture == Architecture::Arm64V8a
            {
                match extract_entry(&mut entry, &name, index, &scratch, &path) {
                    Ok(target) => Some(target),
                    Err(e) => {
                        artifact.issues.push(Issue::new(
                            Severity::Warn,
                            "artifact-entry-unreadable",
                            error_chain(&e),
                            library.path.display().to_string(),
                        ));
                        None
                    }
                }
            } else {
                None
            };
            selected.push(Selected { library, extracted });
        }
        drop(archive);

        let (libraries, issues): (Vec<NativeLibrary>, Vec<Vec<Issue>>) = selected
            .into_par_iter()
            .map(|Selected { mut library, extracted }| {
                let issues = match (self.inspector, extracted) {
                    (Some(inspector), Some(file)) => {
                        let inspection = inspector.verify(&library, &file);
                        library.alignment = inspection.verdict;
                        inspection.issues
                    }
                    _ => Vec::new(),
                };
                (library, issues)
            })
            .unzip();
        artifact.contained_libraries = libraries;
        artifact.issues.extend(issues.into_iter().flatten());

        if let Err(e) = scratch.close() {
            warn!(artifact = %path.display(), error = %e, "Failed to remove scratch directory");
        }
        Ok(())
    }
}

/// Whether a normalized entry name is a native library below `lib/<abi>/`.
fn is_native_library_entry(name: &str) -> bool {
    NativeLibrary::is_shared_library_name(name)
        && Architecture::KNOWN
            .iter()
            .any(|abi| name.contains(&format!("lib/{}/", abi.dir_name())))
}

/// Stored arm64 libraries in an APK are mapped directly from the archive, so
/// their data must start on a 16KB boundary.
fn zip_alignment_issue(
    kind: ArtifactKind,
    library: &NativeLibrary,
    stored: bool,
    offset: u64,
) -> Option<Issue> {
    if kind != ArtifactKind::Package || library.architecture != Architecture::Arm64V8a || !stored
    {
        return None;
    }
    if offset % REQUIRED_ALIGNMENT == 0 {
        return None;
    }
    Some(
        Issue::new(
            Severity::High,
            "zip-alignment",
            format!("Uncompressed library data starts at offset {offset}, not on a 16KB boundary"),
            library.path.display().to_string(),
        )
        .with_context("abi", library.architecture.dir_name())
        .with_context("data_offset", offset)
        .with_context("required_alignment", REQUIRED_ALIGNMENT)
        .with_action("Package with Android Gradle plugin 8.5.1 or newer, or zipalign -P 16"),
    )
}

fn extract_entry(
    entry: &mut impl Read,
    name: &str,
    index: usize,
    scratch: &TempDir,
    artifact: &Path,
) -> Result<PathBuf> {
    let file_name = name.rsplit('/').next().unwrap_or(name);
    // Prefixed with the entry index: the same file name appears once per ABI.
    let target = scratch.path().join(format!("{index}-{file_name}"));
    let to_error = |e: io::Error| ArtifactError::EntryFailed {
        path: artifact.to_path_buf(),
        entry: name.to_string(),
        source: e,
    };
    let mut writer = BufWriter::new(File::create(&target).map_err(to_error)?);
    io::copy(entry, &mut writer).map_err(to_error)?;
    writer.into_inner().map_err(|e| to_error(e.into_error()))?;
    Ok(target)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::elf::testing::arm64_library;
    use crate::elf::GoblinReader;
    use crate::library::AlignmentVerdict;
    use std::fs;
    use std::io::Write;
    use zip::write::SimpleFileOptions;
    use zip::ZipWriter;

    fn write_archive(path: &Path, entries: &[(&str, Vec<u8>, CompressionMethod)]) {
        let mut writer = ZipWriter::new(File::create(path).unwrap());
        for (name, bytes, method) in entries {
            let options = SimpleFileOptions::default().compression_method(*method);
            writer.start_file(*name, options).unwrap();
            writer.write_all(bytes).unwrap();
        }
        writer.finish().unwrap();
    }

    #[test]
    fn test_package_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let apk = dir.path().join("app-release.apk");
        write_archive(
            &apk,
            &[
                ("AndroidManifest.xml", b"<manifest/>".to_vec(), CompressionMethod::Deflated),
                ("lib/arm64-v8a/libgood.so", arm64_library(16384), CompressionMethod::Deflated),
                ("lib/arm64-v8a/libbad.so", arm64_library(4096), CompressionMethod::Deflated),
            ],
        );

        let inspector = SegmentAlignmentInspector::new(&GoblinReader);
        let artifact = ArtifactArchiveScanner::new(Some(&inspector)).scan(&apk);

        assert_eq!(artifact.kind, ArtifactKind::Package);
        assert_eq!(artifact.contained_libraries.len(), 2);
        let high: Vec<_> = artifact
            .issues
            .iter()
            .filter(|issue| issue.severity == Severity::High)
            .collect();
        assert_eq!(high.len(), 1);
        assert_eq!(high[0].rule, "elf-alignment");
        assert!(high[0].origin.ends_with("app-release.apk!/lib/arm64-v8a/libbad.so"));

        let bad = &artifact.contained_libraries[0];
        assert!(bad.path.to_string_lossy().ends_with("libbad.so"));
        assert_eq!(bad.alignment, AlignmentVerdict::NonCompliant);
        assert_eq!(bad.source_kind, SourceKind::Artifact);
        assert_eq!(
            artifact.contained_libraries[1].alignment,
            AlignmentVerdict::Compliant
        );
    }

    #[test]
    fn test_bundle_module_libraries_are_found() {
        let dir = tempfile::tempdir().unwrap();
        let aab = dir.path().join("app-release.aab");
        write_archive(
            &aab,
            &[
                ("base/lib/arm64-v8a/libapp.so", arm64_library(16384), CompressionMethod::Stored),
                ("base/lib/x86_64/libapp.so", arm64_library(4096), CompressionMethod::Deflated),
                ("base/assets/lib/readme.so.txt", b"text".to_vec(), CompressionMethod::Deflated),
            ],
        );
        let inspector = SegmentAlignmentInspector::new(&GoblinReader);
        let artifact = ArtifactArchiveScanner::new(Some(&inspector)).scan(&aab);

        assert_eq!(artifact.kind, ArtifactKind::Bundle);
        let abis: Vec<_> = artifact
            .contained_libraries
            .iter()
            .map(|library| library.architecture)
            .collect();
        assert_eq!(abis, vec![Architecture::Arm64V8a, Architecture::X86_64]);
        // Bundles are repackaged by the store, zip offsets are not checked.
        assert!(artifact.issues.is_empty());
    }

    #[test]
    fn test_invalid_archive_yields_single_warning() {
        let dir = tempfile::tempdir().unwrap();
        let apk = dir.path().join("broken.apk");
        fs::write(&apk, b"this is not a zip archive").unwrap();

        let artifact = ArtifactArchiveScanner::new(None).scan(&apk);
        assert!(artifact.contained_libraries.is_empty());
        assert_eq!(artifact.issues.len(), 1);
        assert_eq!(artifact.issues[0].rule, "artifact-unreadable");
        assert_eq!(artifact.issues[0].severity, Severity::Warn);
    }

    #[test]
    fn test_without_inspector_libraries_stay_unknown() {
        let dir = tempfile::tempdir().unwrap();
        let apk = dir.path().join("app.apk");
        write_archive(
            &apk,
            &[("lib/arm64-v8a/libbad.so", arm64_library(4096), CompressionMethod::Deflated)],
        );
        let artifact = ArtifactArchiveScanner::new(None).scan(&apk);
        assert_eq!(artifact.contained_libraries.len(), 1);
        assert_eq!(
            artifact.contained_libraries[0].alignment,
            AlignmentVerdict::Unknown
        );
        assert!(artifact.issues.is_empty());
    }

    #[test]
    fn test_stored_misaligned_library_in_package() {
        let dir = tempfile::tempdir().unwrap();
        let apk = dir.path().join("app.apk");
        write_archive(
            &apk,
            &[("lib/arm64-v8a/libfoo.so", arm64_library(16384), CompressionMethod::Stored)],
        );
        let artifact = ArtifactArchiveScanner::new(None).scan(&apk);
        assert_eq!(artifact.issues.len(), 1);
        assert_eq!(artifact.issues[0].rule, "zip-alignment");
        assert_eq!(artifact.issues[0].severity, Severity::High);
    }

    #[test]
    fn test_stored_aligned_library_in_package() {
        let dir = tempfile::tempdir().unwrap();
        let apk = dir.path().join("app.apk");
        let mut writer = ZipWriter::new(File::create(&apk).unwrap());
        let options = SimpleFileOptions::default()
            .compression_method(CompressionMethod::Stored)
            .with_alignment(16384);
        writer.start_file("lib/arm64-v8a/libfoo.so", options).unwrap();
        writer.write_all(&arm64_library(16384)).unwrap();
        writer.finish().unwrap();

        let artifact = ArtifactArchiveScanner::new(None).scan(&apk);
        assert_eq!(artifact.contained_libraries.len(), 1);
        assert!(artifact.issues.is_empty());
    }
}
