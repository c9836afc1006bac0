// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Integrity Findings
//!
//! An [`IntegrityReport`] is the successful outcome of an integrity check,
//! even when it lists problems. Only a failure to run the check at all is an
//! error ([`IntegrityCheckError`]).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::repository::RepositoryError;
use crate::domain::tenant::TenantId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntegrityErrorKind {
    /// The same tenant appears more than once within one subsystem
    DuplicateEntry,
    /// A record that cannot describe a tenant (bad id, bad settings shape)
    MalformedEntry,
    /// A tenant is known to only one of directory and platform replica
    DirectoryPlatformMismatch,
    /// A tenant registered in both subsystems whose store cannot be opened
    OrphanedDirectoryEntry,
    /// A tenant store exists in storage without a directory entry
    OrphanedStore,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorDescriptor {
    pub kind: IntegrityErrorKind,
    pub tenant_id: Option<TenantId>,
    pub message: String,
}

impl ErrorDescriptor {
    pub fn new(kind: IntegrityErrorKind, tenant_id: Option<TenantId>, message: impl Into<String>) -> Self {
        Self {
            kind,
            tenant_id,
            message: message.into(),
        }
    }

    pub fn for_tenant(kind: IntegrityErrorKind, tenant_id: &TenantId, message: impl Into<String>) -> Self {
        Self::new(kind, Some(tenant_id.clone()), message)
    }
}

impl std::fmt::Display for ErrorDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.tenant_id {
            Some(tenant) => write!(f, "[{:?}] tenant '{}': {}", self.kind, tenant, self.message),
            None => write!(f, "[{:?}] {}", self.kind, self.message),
        }
    }
}

/// Result of an integrity check; an empty `errors` list means consistent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntegrityReport {
    pub errors: Vec<ErrorDescriptor>,
    pub checked_at: DateTime<Utc>,
}

impl IntegrityReport {
    pub fn new(errors: Vec<ErrorDescriptor>) -> Self {
        Self {
            errors,
            checked_at: Utc::now(),
        }
    }

    pub fn empty() -> Self {
        Self::new(Vec::new())
    }

    pub fn is_clean(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn count_of(&self, kind: IntegrityErrorKind) -> usize {
        self.errors.iter().filter(|e| e.kind == kind).count()
    }

    pub fn merge(&mut self, other: IntegrityReport) {
        self.errors.extend(other.errors);
    }

    /// Zero-tolerance view: any finding becomes an error.
    pub fn ensure_clean(self) -> Result<(), IntegrityViolation> {
        if self.is_clean() {
            Ok(())
        } else {
            Err(IntegrityViolation { errors: self.errors })
        }
    }
}

/// A non-empty report turned into an error by [`IntegrityReport::ensure_clean`]
#[derive(Debug, Clone, thiserror::Error)]
#[error("integrity violated: {} error(s), first: {}", errors.len(), errors.first().map(|e| e.to_string()).unwrap_or_default())]
pub struct IntegrityViolation {
    pub errors: Vec<ErrorDescriptor>,
}

/// The checker itself could not run
#[derive(Debug, thiserror::Error)]
pub enum IntegrityCheckError {
    #[error("tenant directory unreachable: {0}")]
    DirectoryUnreachable(RepositoryError),

    #[error("platform replica unreachable: {0}")]
    PlatformUnreachable(RepositoryError),

    #[error("tenant storage unreachable: {0}")]
    StorageUnreachable(RepositoryError),
}
