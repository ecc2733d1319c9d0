// Copyright (C) 2026 Checkmk GmbH - License: GNU General Public License v2
// This file is part of Checkmk (https://checkmk.com). It is subject to the terms and
// conditions defined in the file COPYING, which is part of this source code package.

//! Validates reports and returns an error for a failed audit.

use anyhow::Result;
use tracing::error;

use super::{ComplianceReport, Severity, Status};

/// Validate the report.
///
/// # Errors
/// Returns an error if the report status is `FAIL`.
pub fn validate_report(report: &ComplianceReport) -> Result<()> {
    if report.status != Status::Fail {
        return Ok(());
    }
    for issue in report.issues_at_least(Severity::High) {
        error!(rule = %issue.rule, origin = %issue.origin, "{}", issue.message);
    }
    Err(anyhow::anyhow!(
        "16KB page size audit failed: {} high severity issue(s)",
        report.totals.issues.high
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::{ComplianceAggregator, Issue};
    use std::path::Path;

    #[test]
    fn test_only_fail_is_an_error() {
        let mut warn = ComplianceAggregator::new();
        warn.add_issues([Issue::new(Severity::Warn, "ndk-version", "m", "/p")]);
        assert!(validate_report(&warn.merge(Path::new("/p"))).is_ok());

        let mut fail = ComplianceAggregator::new();
        fail.add_issues([Issue::new(Severity::High, "elf-alignment", "m", "/p")]);
        let error = validate_report(&fail.merge(Path::new("/p"))).unwrap_err();
        assert!(error.to_string().contains("1 high severity issue"));
    }
}
