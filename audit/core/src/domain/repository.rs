// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Domain Repository Interfaces
//!
//! Persistence contracts for the audit core. The interfaces live in the
//! domain layer and are implemented in `crate::infrastructure::repositories`.
//!
//! | Trait | Holds | Implementations |
//! |-------|-------|----------------|
//! | `EventCollection` | one tenant's `AuditEvent`s | `InMemoryEventCollection`, `SledEventCollection` |
//! | `CollectionProvider` | the set of tenant collections | `InMemoryCollectionProvider`, `SledCollectionProvider` |
//! | `DirectoryIndex` | `DirectoryEntry` per tenant | `InMemoryDirectoryIndex`, `SledDirectoryIndex` |
//! | `PlatformReplica` | `PlatformRecord` per tenant | `InMemoryPlatformReplica`, `SledPlatformReplica` |
//!
//! Concrete implementations are selected from [`StorageBackend`] by
//! `crate::application::repository_factory`.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;

use crate::domain::audit_event::{AuditEvent, NewAuditEvent};
use crate::domain::integrity::{ErrorDescriptor, IntegrityErrorKind, IntegrityReport};
use crate::domain::query::EventQuery;
use crate::domain::tenant::{DirectoryEntry, PlatformRecord, TenantId};

/// Storage backend enum for pluggable persistence
#[derive(Debug, Clone, PartialEq)]
pub enum StorageBackend {
    InMemory,
    Sled(SledConfig),
}

#[derive(Debug, Clone, PartialEq)]
pub struct SledConfig {
    pub path: PathBuf,
}

/// How a tenant collection is opened
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenMode {
    CreateIfMissing,
    /// Fail with `RepositoryError::NotFound` when the collection does not exist
    MustExist,
}

/// Append-only document collection owned by exactly one tenant.
#[async_trait]
pub trait EventCollection: Send + Sync {
    /// Persist an already validated event, assigning its id and timestamp.
    /// The insert is atomic per event.
    async fn insert(&self, event: NewAuditEvent) -> Result<AuditEvent, RepositoryError>;

    /// Events matching the query, in insertion order
    async fn find(&self, query: &EventQuery) -> Result<Vec<AuditEvent>, RepositoryError>;

    /// Remove matching events, returning how many were removed
    async fn delete_many(&self, query: &EventQuery) -> Result<usize, RepositoryError>;

    async fn count(&self) -> Result<usize, RepositoryError>;
}

/// Opens and enumerates per-tenant collections.
#[async_trait]
pub trait CollectionProvider: Send + Sync {
    async fn open(
        &self,
        tenant_id: &TenantId,
        mode: OpenMode,
    ) -> Result<Arc<dyn EventCollection>, RepositoryError>;

    /// Drop a tenant's collection and all its events. Returns false if absent.
    async fn drop_collection(&self, tenant_id: &TenantId) -> Result<bool, RepositoryError>;

    /// Tenants for which a collection exists in storage
    async fn list_collections(&self) -> Result<Vec<TenantId>, RepositoryError>;

    /// Make pending writes durable
    async fn flush(&self) -> Result<(), RepositoryError>;
}

/// Global list of known tenants.
#[async_trait]
pub trait DirectoryIndex: Send + Sync {
    /// Raw entries as stored, duplicates and malformed records included
    async fn list_entries(&self) -> Result<Vec<DirectoryEntry>, RepositoryError>;

    async fn get(&self, tenant_id: &TenantId) -> Result<Option<DirectoryEntry>, RepositoryError>;

    /// Insert a new entry; `RepositoryError::Duplicate` if the tenant exists
    async fn insert(&self, entry: DirectoryEntry) -> Result<(), RepositoryError>;

    /// Remove a tenant's entry. Returns false if absent.
    async fn remove(&self, tenant_id: &TenantId) -> Result<bool, RepositoryError>;

    async fn list_tenants(&self) -> Result<Vec<TenantId>, RepositoryError> {
        let mut tenants: Vec<TenantId> = self
            .list_entries()
            .await?
            .into_iter()
            .map(|e| e.tenant_id)
            .collect();
        tenants.sort();
        tenants.dedup();
        Ok(tenants)
    }

    /// Structural self-check of the directory alone.
    async fn check_integrity(&self) -> Result<IntegrityReport, RepositoryError> {
        Ok(check_directory_entries(&self.list_entries().await?))
    }
}

/// Independently maintained replica of tenant settings.
#[async_trait]
pub trait PlatformReplica: Send + Sync {
    async fn list_records(&self) -> Result<Vec<PlatformRecord>, RepositoryError>;

    async fn get(&self, tenant_id: &TenantId) -> Result<Option<PlatformRecord>, RepositoryError>;

    /// Insert or replace a tenant's record
    async fn upsert(&self, record: PlatformRecord) -> Result<(), RepositoryError>;

    async fn remove(&self, tenant_id: &TenantId) -> Result<bool, RepositoryError>;

    async fn list_tenants(&self) -> Result<Vec<TenantId>, RepositoryError> {
        let mut tenants: Vec<TenantId> = self
            .list_records()
            .await?
            .into_iter()
            .map(|r| r.tenant_id)
            .collect();
        tenants.sort();
        tenants.dedup();
        Ok(tenants)
    }

    /// Structural self-check of the replica alone.
    async fn check_integrity(&self) -> Result<IntegrityReport, RepositoryError> {
        Ok(check_platform_records(&self.list_records().await?))
    }
}

/// Duplicate and malformed-id findings over a set of directory entries
pub fn check_directory_entries(entries: &[DirectoryEntry]) -> IntegrityReport {
    let mut errors = duplicate_errors(entries.iter().map(|e| &e.tenant_id), "directory");
    for entry in entries {
        if !entry.tenant_id.is_well_formed() {
            errors.push(ErrorDescriptor::for_tenant(
                IntegrityErrorKind::MalformedEntry,
                &entry.tenant_id,
                "directory entry has an invalid tenant id",
            ));
        }
    }
    IntegrityReport::new(errors)
}

/// Duplicate, malformed-id and settings-shape findings over platform records
pub fn check_platform_records(records: &[PlatformRecord]) -> IntegrityReport {
    let mut errors = duplicate_errors(records.iter().map(|r| &r.tenant_id), "platform");
    for record in records {
        if !record.tenant_id.is_well_formed() {
            errors.push(ErrorDescriptor::for_tenant(
                IntegrityErrorKind::MalformedEntry,
                &record.tenant_id,
                "platform record has an invalid tenant id",
            ));
        }
        if !record.settings.is_object() {
            errors.push(ErrorDescriptor::for_tenant(
                IntegrityErrorKind::MalformedEntry,
                &record.tenant_id,
                "platform settings are not an object",
            ));
        }
    }
    IntegrityReport::new(errors)
}

fn duplicate_errors<'a>(
    ids: impl Iterator<Item = &'a TenantId>,
    subsystem: &str,
) -> Vec<ErrorDescriptor> {
    let mut counts: HashMap<&TenantId, usize> = HashMap::new();
    for id in ids {
        *counts.entry(id).or_default() += 1;
    }
    let mut duplicates: Vec<_> = counts.into_iter().filter(|(_, n)| *n > 1).collect();
    duplicates.sort();
    duplicates
        .into_iter()
        .map(|(id, n)| {
            ErrorDescriptor::for_tenant(
                IntegrityErrorKind::DuplicateEntry,
                id,
                format!("{} {} entries for the same tenant", n, subsystem),
            )
        })
        .collect()
}

/// Repository errors
#[derive(Debug, Clone, thiserror::Error)]
pub enum RepositoryError {
    #[error("Entity not found: {0}")]
    NotFound(String),

    #[error("Storage unavailable: {0}")]
    Unavailable(String),

    #[error("Duplicate entity: {0}")]
    Duplicate(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Unknown error: {0}")]
    Unknown(String),
}

impl From<sled::Error> for RepositoryError {
    fn from(err: sled::Error) -> Self {
        match err {
            sled::Error::CollectionNotFound(name) => {
                RepositoryError::NotFound(String::from_utf8_lossy(&name).into_owned())
            }
            sled::Error::Io(_) | sled::Error::Corruption { .. } => {
                RepositoryError::Unavailable(err.to_string())
            }
            _ => RepositoryError::Unknown(err.to_string()),
        }
    }
}

impl From<serde_json::Error> for RepositoryError {
    fn from(err: serde_json::Error) -> Self {
        RepositoryError::Serialization(err.to_string())
    }
}
