// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Error taxonomy of the audit core.
//!
//! None of these are retried internally; every variant propagates to the
//! immediate caller.

use crate::domain::repository::RepositoryError;

#[derive(Debug, thiserror::Error)]
pub enum AuditError {
    /// Malformed input (missing `type`/`createdBy`, bad tenant id, bad predicate)
    #[error("Validation error: {0}")]
    Validation(String),

    /// A bounded ingestion burst exceeded its capacity
    #[error("Ingestion buffer overflow: capacity of {capacity} items exceeded")]
    Overflow { capacity: usize },

    #[error("Storage unavailable: {0}")]
    StorageUnavailable(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Duplicate: {0}")]
    Duplicate(String),

    #[error("Storage error: {0}")]
    Storage(String),
}

impl From<RepositoryError> for AuditError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::Unavailable(msg) => AuditError::StorageUnavailable(msg),
            RepositoryError::NotFound(msg) => AuditError::NotFound(msg),
            RepositoryError::Duplicate(msg) => AuditError::Duplicate(msg),
            RepositoryError::Serialization(msg) | RepositoryError::Unknown(msg) => {
                AuditError::Storage(msg)
            }
        }
    }
}
