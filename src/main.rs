// Copyright (C) 2026 Checkmk GmbH - License: GNU General Public License v2
// This file is part of Checkmk (https://checkmk.com). It is subject to the terms and
// conditions defined in the file COPYING, which is part of this source code package.
mod args;

use anyhow::{Context, Result};
use clap::Parser;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use tracing::info;
use tracing_subscriber::EnvFilter;

use args::Args;
use pagesize_audit::report::{summarize_report, validate_report, ComplianceReport};
use pagesize_audit::{AuditConfig, Auditor};

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(&args.log_level);

    let mut config = AuditConfig::resolve(args.config.as_deref(), &args.root)
        .with_context(|| "Failed to load configuration")?;
    args.apply(&mut config);

    let report = Auditor::new(config)
        .run(&args.root)
        .with_context(|| format!("Failed to audit project: {}", args.root.display()))?;
    write_report_to_file(&report, &args.report)?;
    summarize_report(&report);
    validate_report(&report)
}

/// Log to stderr; `RUST_LOG` overrides `--log-level`.
fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Write the report to a file.
///
/// # Errors
/// Returns an error if the file cannot be created or the report cannot be serialized and written to it.
fn write_report_to_file(report: &ComplianceReport, dest: &Path) -> Result<()> {
    info!(file = %dest.display(), "Writing report");
    let file = File::create(dest)
        .with_context(|| format!("Failed to create JSON output file: {}", dest.display()))?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, report)
        .with_context(|| format!("Failed to serialize report to JSON: {}", dest.display()))?;
    writer
        .flush()
        .with_context(|| format!("Failed to write JSON output file: {}", dest.display()))?;
    Ok(())
}
