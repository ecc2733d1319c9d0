// Copyright (C) 2026 Checkmk GmbH - License: GNU General Public License v2
// This file is part of Checkmk (https://checkmk.com). It is subject to the terms and
// conditions defined in the file COPYING, which is part of this source code package.

//! Lenient version parsing for toolchain, plugin and library versions.

use serde::{Serialize, Serializer};
use std::fmt;

/// A `major.minor.patch` version. Missing components are zero and anything
/// after the numeric prefix (`-alpha01`, `-rc1`, build metadata) is ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Version {
    pub major: u64,
    pub minor: u64,
    pub patch: u64,
}

impl Version {
    #[must_use]
    pub const fn new(major: u64, minor: u64, patch: u64) -> Self {
        Self {
            major,
            minor,
            patch,
        }
    }

    /// Parse a version string such as `8.5.1`, `26.1.10909125`, `1.4.0-alpha02`
    /// or an NDK release name like `r26b`.
    #[must_use]
    pub fn parse(text: &str) -> Option<Self> {
        let text = text.trim().trim_start_matches('v');
        if let Some(release) = text.strip_prefix('r') {
            return Self::parse_ndk_release(release);
        }

        let numeric: &str = text
            .split(|c: char| !(c.is_ascii_digit() || c == '.'))
            .next()
            .unwrap_or("");
        let mut parts = numeric
            .split('.')
            .take(3)
            .map(|part| part.parse::<u64>().ok());
        let major = parts.next().flatten()?;
        let minor = parts.next().flatten().unwrap_or(0);
        let patch = parts.next().flatten().unwrap_or(0);
        Some(Self::new(major, minor, patch))
    }

    /// `r26` is 26.0, `r26b` is 26.1 and so on.
    fn parse_ndk_release(release: &str) -> Option<Self> {
        let digits: String = release.chars().take_while(char::is_ascii_digit).collect();
        let major = digits.parse::<u64>().ok()?;
        let minor = release[digits.len()..]
            .chars()
            .next()
            .filter(char::is_ascii_lowercase)
            .map_or(0, |letter| u64::from(letter as u8 - b'a'));
        Some(Self::new(major, minor, 0))
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

impl Serialize for Version {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_str(self)
    }
}
