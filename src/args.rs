// Copyright (C) 2026 Checkmk GmbH - License: GNU General Public License v2
// This file is part of Checkmk (https://checkmk.com). It is subject to the terms and
// conditions defined in the file COPYING, which is part of this source code package.
use clap::Parser;
use std::num::NonZeroUsize;
use std::path::PathBuf;

use pagesize_audit::AuditConfig;

#[derive(Parser)]
#[command(name = "pagesize-audit")]
#[command(version)]
#[command(about = "Audits an Android project for 16KB memory page size compliance")]
pub(crate) struct Args {
    /// Path to the project root to audit.
    pub root: PathBuf,

    /// Path to the file to write the audit report in JSON format.
    #[arg(long, default_value = "pagesize-audit-report.json")]
    pub report: PathBuf,

    /// ELF introspection tool (llvm-readelf or llvm-objdump); discovered from the NDK when omitted.
    #[arg(long)]
    pub tool: Option<PathBuf>,

    #[arg(
        long,
        long_help = "Path to a TOML configuration file.\n\
                Defaults to $PAGESIZE_AUDIT_CONFIG, then pagesize-audit.toml in the project root."
    )]
    pub config: Option<PathBuf>,

    /// Number of worker threads for library inspection.
    #[arg(long)]
    pub jobs: Option<NonZeroUsize>,

    /// Skip resolving and checking dependency versions.
    #[arg(long)]
    pub no_dependencies: bool,

    /// Log filter used when RUST_LOG is not set.
    #[arg(long, default_value = "info")]
    pub log_level: String,
}

impl Args {
    /// Command line flags take precedence over the configuration file.
    pub fn apply(&self, config: &mut AuditConfig) {
        if let Some(tool) = &self.tool {
            config.tool = Some(tool.clone());
        }
        if let Some(jobs) = self.jobs {
            config.jobs = Some(jobs);
        }
        if self.no_dependencies {
            config.resolve_dependencies = false;
        }
    }
}
