// Copyright (C) 2026 Checkmk GmbH - License: GNU General Public License v2
// This file is part of Checkmk (https://checkmk.com). It is subject to the terms and
// conditions defined in the file COPYING, which is part of this source code package.

//! Issue and library statistics for the report.

mod issues;
mod libraries;

use rayon::prelude::*;
use serde::Serialize;

use crate::library::NativeLibrary;
use crate::report::Issue;

pub use issues::Totals as IssueTotals;
pub use libraries::{AbiTotals, AlignmentTotals, Totals as LibraryTotals};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReportTotals {
    pub issues: IssueTotals,
    pub libraries: LibraryTotals,
}

impl ReportTotals {
    /// `libraries` covers every library of the run, including those inside artifacts.
    #[must_use]
    pub(crate) fn new(issues: &[Issue], libraries: &[&NativeLibrary]) -> Self {
        Self {
            issues: IssueTotals::calculate(issues),
            libraries: LibraryTotals::calculate(libraries.par_iter().copied()),
        }
    }
}
