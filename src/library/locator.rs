// Copyright (C) 2026 Checkmk GmbH - License: GNU General Public License v2
// This file is part of Checkmk (https://checkmk.com). It is subject to the terms and
// conditions defined in the file COPYING, which is part of this source code package.

//! Discovers native shared libraries in build outputs and manual library directories.

use dashmap::DashMap;
use rayon::prelude::*;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use walkdir::WalkDir;

use super::{absolute_path, NativeLibrary, SourceKind};

/// Find libraries produced by the platform build below `root`.
///
/// Each entry of `build_dirs` is resolved relative to `root`; missing
/// directories contribute nothing.
#[must_use]
pub fn locate(root: &Path, build_dirs: &[PathBuf]) -> Vec<NativeLibrary> {
    collect(root, build_dirs, SourceKind::PlatformBuild)
}

/// Find libraries bundled by hand, outside the build pipeline.
#[must_use]
pub fn locate_manual(root: &Path, manual_dirs: &[PathBuf]) -> Vec<NativeLibrary> {
    collect(root, manual_dirs, SourceKind::Manual)
}

fn collect(root: &Path, dirs: &[PathBuf], kind: SourceKind) -> Vec<NativeLibrary> {
    // Keyed by absolute path, overlapping directories must not duplicate libraries.
    let found: DashMap<PathBuf, NativeLibrary> = DashMap::new();
    dirs.par_iter().for_each(|dir| {
        let base = root.join(dir);
        if !base.is_dir() {
            debug!(directory = %base.display(), "Library directory absent, skipping");
            return;
        }
        for entry in WalkDir::new(&base) {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    warn!(directory = %base.display(), error = %e, "Failed to walk directory entry");
                    continue;
                }
            };
            let is_library = entry.file_type().is_file()
                && entry
                    .file_name()
                    .to_str()
                    .is_some_and(NativeLibrary::is_shared_library_name);
            if is_library {
                let path = absolute_path(entry.path());
                found
                    .entry(path.clone())
                    .or_insert_with(|| NativeLibrary::new(path, kind));
            }
        }
    });

    let mut libraries: Vec<NativeLibrary> = found.into_iter().map(|(_, lib)| lib).collect();
    libraries.sort_by(|a, b| a.path.cmp(&b.path));
    debug!(count = libraries.len(), kind = ?kind, "Native libraries located");
    libraries
}
