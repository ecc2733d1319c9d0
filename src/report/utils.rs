// Copyright (C) 2026 Checkmk GmbH - License: GNU General Public License v2
// This file is part of Checkmk (https://checkmk.com). It is subject to the terms and
// conditions defined in the file COPYING, which is part of this source code package.

//! Utility functions for output formatting.

use std::path::{Path, PathBuf};

use super::Issue;

/// Find the directory prefix shared by every path origin of `issues`.
///
/// Origins that are not absolute paths (dependency coordinates) are ignored.
/// Archive entries such as `/out/app.apk!/lib/arm64-v8a/libfoo.so` are treated
/// as paths. Returns `None` unless at least two path origins share a prefix.
#[must_use]
pub(crate) fn common_origin_prefix(issues: &[&Issue]) -> Option<PathBuf> {
    let mut paths = issues
        .iter()
        .map(|issue| Path::new(&issue.origin))
        .filter(|path| path.is_absolute());
    let first = paths.next()?;
    let mut count = 1;
    let mut common = first.to_path_buf();
    for path in paths {
        count += 1;
        common = common
            .components()
            .zip(path.components())
            .take_while(|(a, b)| a == b)
            .map(|(a, _)| a)
            .collect();
    }
    (count > 1 && common.parent().is_some()).then_some(common)
}

/// Origin of `issue` relative to `prefix`, unchanged if that would leave nothing.
#[must_use]
pub(crate) fn display_origin(issue: &Issue, prefix: Option<&Path>) -> String {
    let origin = Path::new(&issue.origin);
    match prefix.and_then(|prefix| origin.strip_prefix(prefix).ok()) {
        Some(relative) if !relative.as_os_str().is_empty() => {
            relative.to_string_lossy().into_owned()
        }
        _ => issue.origin.clone(),
    }
}
