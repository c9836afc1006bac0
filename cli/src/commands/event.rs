// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Audit event commands
//!
//! Commands: record, import, query, actions, accesses

use anyhow::{Context, Result};
use clap::Subcommand;
use colored::Colorize;
use std::collections::BTreeSet;
use std::path::PathBuf;

use tenant_audit_core::{AuditEvent, EventQuery, NewAuditEvent, TenantId};

use super::parse_pairs;
use crate::embedded::AuditRuntime;

#[derive(Subcommand)]
pub enum EventCommand {
    /// Append one event to a tenant's audit log
    Record {
        #[arg(value_name = "TENANT_ID")]
        tenant_id: TenantId,

        /// Event type, e.g. log/test
        #[arg(long = "type", value_name = "TYPE")]
        event_type: String,

        /// Acting principal
        #[arg(long)]
        created_by: String,

        /// Stream tag such as action-events.get or access-toto (repeatable)
        #[arg(long = "stream-id", value_name = "TAG")]
        stream_ids: Vec<String>,

        /// Event payload as a JSON object
        #[arg(long, value_name = "JSON")]
        content: Option<String>,
    },

    /// Append events from a JSON Lines file as one bounded batch
    Import {
        #[arg(value_name = "TENANT_ID")]
        tenant_id: TenantId,

        #[arg(value_name = "FILE")]
        file: PathBuf,
    },

    /// Query a tenant's events by field equality
    Query {
        #[arg(value_name = "TENANT_ID")]
        tenant_id: TenantId,

        /// Equality predicate on a top-level or content field (repeatable)
        #[arg(long = "where", value_name = "FIELD=VALUE")]
        predicates: Vec<String>,

        /// Print raw JSON, one event per line
        #[arg(long)]
        json: bool,
    },

    /// Distinct actions recorded for a tenant
    Actions {
        #[arg(value_name = "TENANT_ID")]
        tenant_id: TenantId,
    },

    /// Distinct accessors recorded for a tenant
    Accesses {
        #[arg(value_name = "TENANT_ID")]
        tenant_id: TenantId,
    },
}

pub async fn handle_command(command: EventCommand, config_path: Option<PathBuf>) -> Result<()> {
    let runtime = AuditRuntime::new(config_path)?;

    let result = match command {
        EventCommand::Record {
            tenant_id,
            event_type,
            created_by,
            stream_ids,
            content,
        } => {
            let mut event = NewAuditEvent::new(event_type, created_by).with_stream_ids(stream_ids);
            if let Some(content) = content {
                event = event.with_content(
                    serde_json::from_str(&content).context("--content is not valid JSON")?,
                );
            }
            record(&runtime, tenant_id, event).await
        }
        EventCommand::Import { tenant_id, file } => import(&runtime, tenant_id, file).await,
        EventCommand::Query {
            tenant_id,
            predicates,
            json,
        } => query(&runtime, tenant_id, &predicates, json).await,
        EventCommand::Actions { tenant_id } => {
            let actions = runtime.audit.get_all_actions(&tenant_id).await?;
            print_set("actions", &actions);
            Ok(())
        }
        EventCommand::Accesses { tenant_id } => {
            let accesses = runtime.audit.get_all_accesses(&tenant_id).await?;
            print_set("accessors", &accesses);
            Ok(())
        }
    };

    runtime.shutdown().await?;
    result
}

async fn record(runtime: &AuditRuntime, tenant_id: TenantId, event: NewAuditEvent) -> Result<()> {
    let stored = runtime.audit.record_event(&tenant_id, event).await?;
    println!("{}", format!("✓ Event recorded: {}", stored.id).green());
    Ok(())
}

async fn import(runtime: &AuditRuntime, tenant_id: TenantId, file: PathBuf) -> Result<()> {
    let content = std::fs::read_to_string(&file)
        .with_context(|| format!("Failed to read {:?}", file))?;

    let mut events = Vec::new();
    for (n, line) in content.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let event: NewAuditEvent = serde_json::from_str(line)
            .with_context(|| format!("{}:{}: invalid event", file.display(), n + 1))?;
        events.push(event);
    }

    let stored = runtime
        .audit
        .record_batch(&tenant_id, futures::stream::iter(events))
        .await?;
    println!("{}", format!("✓ Imported {} events", stored.len()).green());
    Ok(())
}

async fn query(runtime: &AuditRuntime, tenant_id: TenantId, predicates: &[String], json: bool) -> Result<()> {
    let query = parse_pairs(predicates)?
        .into_iter()
        .fold(EventQuery::all(), |query, (field, value)| query.field(field, value));
    let events = runtime.audit.get_events(&tenant_id, &query).await?;

    if json {
        for event in &events {
            println!("{}", serde_json::to_string(event)?);
        }
        return Ok(());
    }

    if events.is_empty() {
        println!("{}", "No events found".yellow());
        return Ok(());
    }

    println!("{} events found:", events.len());
    println!("{:<25} {:<20} {:<16} {}", "TIME", "TYPE", "CREATED BY", "STREAMS");
    for event in &events {
        print_event(event);
    }
    Ok(())
}

fn print_event(event: &AuditEvent) {
    println!(
        "{:<25} {:<20} {:<16} {}",
        event.time.format("%Y-%m-%d %H:%M:%S%.3f"),
        event.event_type.bold(),
        event.created_by,
        event.stream_ids.join(",").dimmed()
    );
}

fn print_set(label: &str, values: &BTreeSet<String>) {
    if values.is_empty() {
        println!("{}", format!("No {} recorded", label).yellow());
        return;
    }
    for value in values {
        println!("{}", value);
    }
}
