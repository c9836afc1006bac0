// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::error::AuditError;

// ============================================================================
// Value Objects
// ============================================================================

/// Identifier of a tenant (the user owning an isolated audit log).
///
/// Deserialization is deliberately unchecked so that malformed records read
/// back from storage can still be reported by the integrity checks.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TenantId(String);

impl TenantId {
    /// Parse a tenant ID, rejecting empty or non `[A-Za-z0-9_.-]` identifiers.
    pub fn parse(s: impl Into<String>) -> Result<Self, AuditError> {
        let id = Self(s.into());
        if !id.is_well_formed() {
            return Err(AuditError::Validation(format!(
                "invalid tenant id '{}'",
                id.0
            )));
        }
        Ok(id)
    }

    /// Wrap an identifier read back from storage without checking it.
    pub(crate) fn from_raw(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_well_formed(&self) -> bool {
        !self.0.is_empty()
            && self
                .0
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'))
    }
}

impl std::fmt::Display for TenantId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::str::FromStr for TenantId {
    type Err = AuditError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

// ============================================================================
// Directory / Platform records
// ============================================================================

/// One entry of the global tenant directory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DirectoryEntry {
    pub tenant_id: TenantId,
    /// Provisioning metadata (e.g. email, language, referrer)
    #[serde(default)]
    pub metadata: serde_json::Map<String, serde_json::Value>,
    pub created_at: DateTime<Utc>,
}

impl DirectoryEntry {
    pub fn new(tenant_id: TenantId, metadata: serde_json::Map<String, serde_json::Value>) -> Self {
        Self {
            tenant_id,
            metadata,
            created_at: Utc::now(),
        }
    }
}

/// Per-tenant settings snapshot held by the platform replica.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlatformRecord {
    pub tenant_id: TenantId,
    /// Settings document; must be a JSON object to be well formed
    pub settings: serde_json::Value,
    pub updated_at: DateTime<Utc>,
}

impl PlatformRecord {
    pub fn new(tenant_id: TenantId, settings: serde_json::Value) -> Self {
        Self {
            tenant_id,
            settings,
            updated_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tenant_id_parse() {
        assert!(TenantId::parse("u1").is_ok());
        assert!(TenantId::parse("user.name-01_x").is_ok());
        assert!(matches!(TenantId::parse(""), Err(AuditError::Validation(_))));
        assert!(TenantId::parse("bad/id").is_err());
        assert!(TenantId::parse("with space").is_err());
    }

    #[test]
    fn test_unchecked_deserialization_is_detectable() {
        let id: TenantId = serde_json::from_str("\"\"").unwrap();
        assert!(!id.is_well_formed());
    }
}
