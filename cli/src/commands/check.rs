// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Integrity check command

use anyhow::Result;
use clap::Args;
use colored::Colorize;
use std::path::PathBuf;

use tenant_audit_core::IntegrityReport;

use crate::embedded::AuditRuntime;

#[derive(Args)]
pub struct CheckCommand {
    /// Print the report as JSON
    #[arg(long)]
    json: bool,

    /// Report findings but exit successfully, overriding
    /// `integrity.fail_on_violation`
    #[arg(long)]
    no_fail: bool,
}

pub async fn handle_command(command: CheckCommand, config_path: Option<PathBuf>) -> Result<()> {
    let runtime = AuditRuntime::new(config_path)?;
    let fail_on_violation = runtime.config.integrity.fail_on_violation && !command.no_fail;

    let report = runtime.audit.run_integrity_check().await;
    runtime.shutdown().await?;
    let report = report?;

    if command.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report);
    }

    if fail_on_violation {
        report.ensure_clean()?;
    }
    Ok(())
}

fn print_report(report: &IntegrityReport) {
    if report.is_clean() {
        println!("{}", "✓ Directory, platform replica and storage agree".green());
        return;
    }

    println!(
        "{}",
        format!("✗ {} integrity error(s) found:", report.errors.len()).red()
    );
    for error in &report.errors {
        let tenant = error
            .tenant_id
            .as_ref()
            .map(|t| t.to_string())
            .unwrap_or_else(|| "-".to_string());
        println!(
            "  {:<28} {:<20} {}",
            format!("{:?}", error.kind).yellow(),
            tenant.bold(),
            error.message
        );
    }
}
