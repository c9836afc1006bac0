// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Tenant provisioning commands
//!
//! Commands: provision, deprovision, list

use anyhow::Result;
use clap::Subcommand;
use colored::Colorize;
use std::path::PathBuf;

use tenant_audit_core::application::ProvisionRequest;
use tenant_audit_core::TenantId;

use super::parse_pairs;
use crate::embedded::AuditRuntime;

#[derive(Subcommand)]
pub enum TenantCommand {
    /// Register a tenant in the directory, platform replica and storage
    Provision {
        #[arg(value_name = "TENANT_ID")]
        tenant_id: TenantId,

        /// Directory metadata (repeatable)
        #[arg(long = "meta", value_name = "KEY=VALUE")]
        metadata: Vec<String>,

        /// Platform settings (repeatable)
        #[arg(long = "setting", value_name = "KEY=VALUE")]
        settings: Vec<String>,
    },

    /// Remove a tenant and drop all its audit events
    Deprovision {
        #[arg(value_name = "TENANT_ID")]
        tenant_id: TenantId,
    },

    /// List provisioned tenants
    List,
}

pub async fn handle_command(command: TenantCommand, config_path: Option<PathBuf>) -> Result<()> {
    let runtime = AuditRuntime::new(config_path)?;

    let result = match command {
        TenantCommand::Provision {
            tenant_id,
            metadata,
            settings,
        } => provision(&runtime, tenant_id, &metadata, &settings).await,
        TenantCommand::Deprovision { tenant_id } => deprovision(&runtime, tenant_id).await,
        TenantCommand::List => list(&runtime).await,
    };

    runtime.shutdown().await?;
    result
}

async fn provision(
    runtime: &AuditRuntime,
    tenant_id: TenantId,
    metadata: &[String],
    settings: &[String],
) -> Result<()> {
    let request = ProvisionRequest {
        metadata: parse_pairs(metadata)?,
        settings: parse_pairs(settings)?,
    };
    runtime.provisioning.provision(&tenant_id, request).await?;

    println!("{}", format!("✓ Tenant provisioned: {}", tenant_id).green());
    Ok(())
}

async fn deprovision(runtime: &AuditRuntime, tenant_id: TenantId) -> Result<()> {
    let events_dropped = runtime.provisioning.deprovision(&tenant_id).await?;

    println!("{}", format!("✓ Tenant deprovisioned: {}", tenant_id).green());
    if !events_dropped {
        println!("{}", "  (no event collection was found for this tenant)".dimmed());
    }
    Ok(())
}

async fn list(runtime: &AuditRuntime) -> Result<()> {
    let tenants = runtime.provisioning.list_tenants().await?;

    if tenants.is_empty() {
        println!("{}", "No tenants found".yellow());
        return Ok(());
    }

    println!("{} tenants found:", tenants.len());
    for tenant in tenants {
        println!("  {}", tenant.as_str().bold());
    }
    Ok(())
}
