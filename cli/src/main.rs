// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! # Tenant Audit CLI
//!
//! The `tenant-audit` binary is the operator tool for the per-tenant audit
//! core. Every command runs the core in-process against the configured
//! storage backend.
//!
//! ## Commands
//!
//! - `tenant-audit tenant provision|deprovision|list` - Tenant lifecycle
//! - `tenant-audit event record|import|query|actions|accesses` - Audit log access
//! - `tenant-audit check` - Directory / platform / storage integrity check
//! - `tenant-audit config show|validate|generate` - Configuration management

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use std::path::PathBuf;

mod commands;
mod embedded;

use commands::{ConfigCommand, EventCommand, TenantCommand};

/// Tenant Audit - per-tenant audit logs and integrity checking
#[derive(Parser)]
#[command(name = "tenant-audit")]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Path to configuration file (overrides discovery)
    #[arg(
        short,
        long,
        global = true,
        env = "TENANT_AUDIT_CONFIG_PATH",
        value_name = "FILE"
    )]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true, env = "TENANT_AUDIT_LOG_LEVEL", default_value = "warn")]
    log_level: String,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Tenant provisioning
    #[command(name = "tenant")]
    Tenant {
        #[command(subcommand)]
        command: TenantCommand,
    },

    /// Audit event recording and queries
    #[command(name = "event")]
    Event {
        #[command(subcommand)]
        command: EventCommand,
    },

    /// Run the integrity check
    #[command(name = "check")]
    Check {
        #[command(flatten)]
        command: commands::CheckCommand,
    },

    /// Configuration management
    #[command(name = "config")]
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(&cli.log_level)?;

    match cli.command {
        Some(Commands::Tenant { command }) => {
            commands::tenant::handle_command(command, cli.config).await
        }
        Some(Commands::Event { command }) => {
            commands::event::handle_command(command, cli.config).await
        }
        Some(Commands::Check { command }) => {
            commands::check::handle_command(command, cli.config).await
        }
        Some(Commands::Config { command }) => {
            commands::config::handle_command(command, cli.config).await
        }
        None => {
            eprintln!("{}", "No command specified. Use --help for usage.".yellow());
            std::process::exit(1);
        }
    }
}

/// Initialize tracing subscriber for logging
fn init_logging(level: &str) -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .or_else(|_| tracing_subscriber::EnvFilter::try_new(level))
        .context("Failed to create log filter")?;

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .init();

    Ok(())
}
