// Copyright (C) 2026 Checkmk GmbH - License: GNU General Public License v2
// This file is part of Checkmk (https://checkmk.com). It is subject to the terms and
// conditions defined in the file COPYING, which is part of this source code package.
use rayon::prelude::*;
use serde::Serialize;
use std::ops::Add;

use crate::library::{AlignmentVerdict, Architecture, NativeLibrary};

#[derive(Default, Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AbiTotals {
    #[serde(rename = "arm64-v8a")]
    pub arm64_v8a: usize,
    #[serde(rename = "armeabi-v7a")]
    pub armeabi_v7a: usize,
    pub x86_64: usize,
    pub x86: usize,
    pub unknown: usize,
}

#[derive(Default, Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AlignmentTotals {
    pub compliant: usize,
    pub non_compliant: usize,
    pub unknown: usize,
}

#[derive(Default, Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Totals {
    pub by_abi: AbiTotals,
    pub by_alignment: AlignmentTotals,
    pub total: usize,
}

impl Totals {
    pub(crate) fn calculate<'a, I>(libraries: I) -> Self
    where
        I: IntoParallelIterator<Item = &'a NativeLibrary>,
    {
        libraries
            .into_par_iter()
            .fold(Totals::default, |mut totals, library| {
                let abi = &mut totals.by_abi;
                match library.architecture {
                    Architecture::Arm64V8a => abi.arm64_v8a += 1,
                    Architecture::ArmeabiV7a => abi.armeabi_v7a += 1,
                    Architecture::X86_64 => abi.x86_64 += 1,
                    Architecture::X86 => abi.x86 += 1,
                    Architecture::Unknown => abi.unknown += 1,
                }
                let alignment = &mut totals.by_alignment;
                match library.alignment {
                    AlignmentVerdict::Compliant => alignment.compliant += 1,
                    AlignmentVerdict::NonCompliant => alignment.non_compliant += 1,
                    AlignmentVerdict::Unknown => alignment.unknown += 1,
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
        Self {
            by_abi: AbiTotals {
                arm64_v8a: self.by_abi.arm64_v8a + other.by_abi.arm64_v8a,
                armeabi_v7a: self.by_abi.armeabi_v7a + other.by_abi.armeabi_v7a,
                x86_64: self.by_abi.x86_64 + other.by_abi.x86_64,
                x86: self.by_abi.x86 + other.by_abi.x86,
                unknown: self.by_abi.unknown + other.by_abi.unknown,
            },
            by_alignment: AlignmentTotals {
                compliant: self.by_alignment.compliant + other.by_alignment.compliant,
                non_compliant: self.by_alignment.non_compliant + other.by_alignment.non_compliant,
                unknown: self.by_alignment.unknown + other.by_alignment.unknown,
            },
            total: self.total + other.total,
        }
    }
}
