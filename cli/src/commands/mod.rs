// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Command implementations for the tenant-audit CLI

pub mod check;
pub mod config;
pub mod event;
pub mod tenant;

pub use self::check::CheckCommand;
pub use self::config::ConfigCommand;
pub use self::event::EventCommand;
pub use self::tenant::TenantCommand;

use anyhow::{Context, Result};
use serde_json::{Map, Value};

/// Parse `key=value` pairs; values that are valid JSON keep their type,
/// anything else is taken as a string.
pub fn parse_pairs(pairs: &[String]) -> Result<Map<String, Value>> {
    let mut map = Map::new();
    for pair in pairs {
        let (key, value) = pair
            .split_once('=')
            .with_context(|| format!("Expected KEY=VALUE, got '{}'", pair))?;
        map.insert(key.to_string(), parse_value(value));
    }
    Ok(map)
}

pub fn parse_value(raw: &str) -> Value {
    serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
}
