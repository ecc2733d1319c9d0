// Copyright (C) 2026 Checkmk GmbH - License: GNU General Public License v2
// This file is part of Checkmk (https://checkmk.com). It is subject to the terms and
// conditions defined in the file COPYING, which is part of this source code package.
use rayon::prelude::*;
use serde::Serialize;
use std::ops::Add;

use crate::report::{Issue, Severity};

#[derive(Default, Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Totals {
    pub pass: usize,
    pub info: usize,
    pub warn: usize,
    pub high: usize,
    pub total: usize,
}

impl Totals {
    pub(crate) fn calculate(issues: &[Issue]) -> Self {
        issues
            .par_iter()
            .fold(Totals::default, |mut totals, issue| {
                match issue.severity {
                    Severity::Pass => totals.pass += 1,
                    Severity::Info => totals.info += 1,
                    Severity::Warn => totals.warn += 1,
                    Severity::High => totals.high += 1,
                }
                totals.total += 1;
                totals
            })
            .reduce(Totals::default, |a, b| a + b)
    }
}

impl Add for Totals {
    type Output = Self;

    fn add(self, other: Self) -> Self {
        let pass = self.pass + other.pass;
        let info = self.info + other.info;
        let warn = self.warn + other.warn;
        let high = self.high + other.high;
        Self {
            pass,
            info,
            warn,
            high,
            total: pass + info + warn + high,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counts_by_severity() {
        let issue = |severity| Issue::new(severity, "rule", "message", "origin");
        let issues = vec![
            issue(Severity::High),
            issue(Severity::Warn),
            issue(Severity::Warn),
            issue(Severity::Info),
        ];
        let totals = Totals::calculate(&issues);
        assert_eq!(
            totals,
            Totals {
                pass: 0,
                info: 1,
                warn: 2,
                high: 1,
                total: 4,
            }
        );
    }

    #[test]
    fn test_empty() {
        assert_eq!(Totals::calculate(&[]), Totals::default());
    }
}
