// Copyright (C) 2026 Checkmk GmbH - License: GNU General Public License v2
// This file is part of Checkmk (https://checkmk.com). It is subject to the terms and
// conditions defined in the file COPYING, which is part of this source code package.

//! Formats and prints report summaries to the console.

use comfy_table::{Attribute, Cell, Color, Table};

use super::utils::{common_origin_prefix, display_origin};
use super::{ComplianceReport, Issue, Severity, Status};

/// Summarize the report to the console.
///
/// Prints the overall status, issue counts by severity, library counts by ABI
/// and alignment, and a table of every warning and high severity issue.
pub fn summarize_report(report: &ComplianceReport) {
    println!("Project: {}", report.root.display());
    println!("Status: {}\n", report.status);

    println!("{}\n", severity_table(report));
    println!("{}\n", library_table(report));
    if !report.protections.is_empty() {
        println!("{}\n", protection_table(report));
    }

    let failing: Vec<&Issue> = report.issues_at_least(Severity::Warn).collect();
    if !failing.is_empty() {
        println!("{}", issue_table(&failing));
        println!(
            "\nTotal: {} high and {} warning issue(s)",
            report.totals.issues.high, report.totals.issues.warn
        );
    }
}

/// Create a table with the default preset styling.
fn default_table_preset() -> Table {
    let mut table = Table::new();
    table
        .load_preset(comfy_table::presets::UTF8_FULL_CONDENSED)
        .apply_modifier(comfy_table::modifiers::UTF8_ROUND_CORNERS)
        .set_content_arrangement(comfy_table::ContentArrangement::Dynamic);
    table
}

fn header(names: &[&str]) -> Vec<Cell> {
    names
        .iter()
        .map(|name| Cell::new(name).add_attribute(Attribute::Bold))
        .collect()
}

fn severity_cell(severity: Severity) -> Cell {
    let cell = Cell::new(severity);
    match severity {
        Severity::High => cell.fg(Color::Red),
        Severity::Warn => cell.fg(Color::Yellow),
        Severity::Info | Severity::Pass => cell,
    }
}

/// Create a table showing issue counts by severity.
fn severity_table(report: &ComplianceReport) -> Table {
    let totals = &report.totals.issues;
    let status = Cell::new(report.status).add_attribute(Attribute::Bold);
    let status = match report.status {
        Status::Fail => status.fg(Color::Red),
        Status::Warn => status.fg(Color::Yellow),
        Status::Pass => status.fg(Color::Green),
    };
    let mut table = default_table_preset();
    table
        .set_header(header(&["Severity", "Count"]))
        .add_row(vec![severity_cell(Severity::High), Cell::new(totals.high)])
        .add_row(vec![severity_cell(Severity::Warn), Cell::new(totals.warn)])
        .add_row(vec![severity_cell(Severity::Info), Cell::new(totals.info)])
        .add_row(vec![severity_cell(Severity::Pass), Cell::new(totals.pass)])
        .add_row(vec![
            Cell::new("Total").add_attribute(Attribute::Bold),
            Cell::new(totals.total).add_attribute(Attribute::Bold),
        ])
        .add_row(vec![Cell::new("Status").add_attribute(Attribute::Bold), status]);
    table
}

/// Create a table showing native libraries by ABI and alignment verdict.
fn library_table(report: &ComplianceReport) -> Table {
    let abi = &report.totals.libraries.by_abi;
    let alignment = &report.totals.libraries.by_alignment;
    let mut table = default_table_preset();
    table
        .set_header(header(&["Native Libraries", "Count"]))
        .add_row(vec![Cell::new("arm64-v8a"), Cell::new(abi.arm64_v8a)])
        .add_row(vec![Cell::new("armeabi-v7a"), Cell::new(abi.armeabi_v7a)])
        .add_row(vec![Cell::new("x86_64"), Cell::new(abi.x86_64)])
        .add_row(vec![Cell::new("x86"), Cell::new(abi.x86)])
        .add_row(vec![Cell::new("Unknown ABI"), Cell::new(abi.unknown)])
        .add_row(vec![Cell::new("16KB aligned"), Cell::new(alignment.compliant)])
        .add_row(vec![
            Cell::new("Not 16KB aligned"),
            Cell::new(alignment.non_compliant),
        ])
        .add_row(vec![Cell::new("Not verified"), Cell::new(alignment.unknown)])
        .add_row(vec![
            Cell::new("Total").add_attribute(Attribute::Bold),
            Cell::new(report.totals.libraries.total).add_attribute(Attribute::Bold),
        ]);
    table
}

fn protection_table(report: &ComplianceReport) -> Table {
    let mut table = default_table_preset();
    table.set_header(header(&["Protection", "Enabled"]));
    for (name, enabled) in &report.protections {
        let state = if *enabled { "yes" } else { "no" };
        table.add_row(vec![Cell::new(name), Cell::new(state)]);
    }
    table
}

/// Create a table of issues with the paths shortened to their common prefix.
fn issue_table(issues: &[&Issue]) -> Table {
    let common_prefix = common_origin_prefix(issues);

    let mut table = default_table_preset();
    table.set_header(header(&["Severity", "Rule", "Origin", "Message"]));
    for issue in issues {
        let message = match issue.action() {
            Some(action) => format!("{}\n{action}", issue.message),
            None => issue.message.clone(),
        };
        table.add_row(vec![
            severity_cell(issue.severity),
            Cell::new(&issue.rule),
            Cell::new(display_origin(issue, common_prefix.as_deref())),
            Cell::new(message),
        ]);
    }
    table
}
