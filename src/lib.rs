// Copyright (C) 2026 Checkmk GmbH - License: GNU General Public License v2
// This file is part of Checkmk (https://checkmk.com). It is subject to the terms and
// conditions defined in the file COPYING, which is part of this source code package.

//! A tool for auditing Android projects for 16KB memory page size compliance.
//!
//! This crate provides functionality to:
//! - Locate native libraries in build trees, prebuilt directories and APK/AAB artifacts
//! - Verify the `LOAD` segment alignment of arm64-v8a libraries
//! - Check build scripts for toolchain versions and packaging opt-outs
//! - Compare resolved dependencies against their first 16KB aligned releases
//! - Merge all findings into a PASS/WARN/FAIL report

pub mod artifact;
pub mod audit;
pub mod config;
pub mod dependencies;
pub mod elf;
pub mod gradle;
pub mod library;
pub(crate) mod process;
pub mod report;
pub mod version;

// Re-export key types for convenience
pub use audit::{AuditError, Auditor};
pub use config::AuditConfig;
pub use library::{AlignmentVerdict, Architecture, NativeLibrary, SourceKind};
pub use report::{ComplianceReport, Issue, Severity, Status};
