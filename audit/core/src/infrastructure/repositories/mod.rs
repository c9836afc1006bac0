// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Repository Implementations
//!
//! Infrastructure implementations of the persistence contracts defined in
//! `crate::domain::repository`.
//!
//! # Available Implementations
//!
//! ## Sled Repositories
//!
//! Embedded, durable storage ([`sled_store`] module): one tree per tenant log plus
//! a `directory` and a `platform` tree.
//!
//! ## In-Memory Repositories
//!
//! Lightweight implementations for testing and development:
//! - **InMemoryEventCollection** - Vec-backed, insertion ordered
//! - **InMemoryCollectionProvider** - tenant → collection map
//! - **InMemoryDirectoryIndex** / **InMemoryPlatformReplica** - Vec-backed records

pub mod sled_store;

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::RwLock;

use crate::domain::audit_event::{AuditEvent, EventId, NewAuditEvent};
use crate::domain::query::EventQuery;
use crate::domain::repository::{
    CollectionProvider, DirectoryIndex, EventCollection, OpenMode, PlatformReplica, RepositoryError,
};
use crate::domain::tenant::{DirectoryEntry, PlatformRecord, TenantId};

// ============================================================================
// Event collections
// ============================================================================

#[derive(Default)]
pub struct InMemoryEventCollection {
    events: RwLock<Vec<AuditEvent>>,
}

impl InMemoryEventCollection {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl EventCollection for InMemoryEventCollection {
    async fn insert(&self, event: NewAuditEvent) -> Result<AuditEvent, RepositoryError> {
        let stored = event.into_stored(EventId::new(), Utc::now());
        self.events.write().push(stored.clone());
        Ok(stored)
    }

    async fn find(&self, query: &EventQuery) -> Result<Vec<AuditEvent>, RepositoryError> {
        Ok(self
            .events
            .read()
            .iter()
            .filter(|e| query.matches(e))
            .cloned()
            .collect())
    }

    async fn delete_many(&self, query: &EventQuery) -> Result<usize, RepositoryError> {
        let mut events = self.events.write();
        let before = events.len();
        events.retain(|e| !query.matches(e));
        Ok(before - events.len())
    }

    async fn count(&self) -> Result<usize, RepositoryError> {
        Ok(self.events.read().len())
    }
}

#[derive(Default)]
pub struct InMemoryCollectionProvider {
    collections: RwLock<HashMap<TenantId, Arc<InMemoryEventCollection>>>,
    created: AtomicUsize,
}

impl InMemoryCollectionProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of collections created since construction
    pub fn created_count(&self) -> usize {
        self.created.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CollectionProvider for InMemoryCollectionProvider {
    async fn open(
        &self,
        tenant_id: &TenantId,
        mode: OpenMode,
    ) -> Result<Arc<dyn EventCollection>, RepositoryError> {
        let mut collections = self.collections.write();
        if let Some(existing) = collections.get(tenant_id) {
            return Ok(existing.clone());
        }
        if mode == OpenMode::MustExist {
            return Err(RepositoryError::NotFound(format!(
                "no event collection for tenant '{}'",
                tenant_id
            )));
        }
        let collection = Arc::new(InMemoryEventCollection::new());
        collections.insert(tenant_id.clone(), collection.clone());
        self.created.fetch_add(1, Ordering::SeqCst);
        Ok(collection)
    }

    async fn drop_collection(&self, tenant_id: &TenantId) -> Result<bool, RepositoryError> {
        Ok(self.collections.write().remove(tenant_id).is_some())
    }

    async fn list_collections(&self) -> Result<Vec<TenantId>, RepositoryError> {
        let mut tenants: Vec<TenantId> = self.collections.read().keys().cloned().collect();
        tenants.sort();
        Ok(tenants)
    }

    async fn flush(&self) -> Result<(), RepositoryError> {
        Ok(())
    }
}

// ============================================================================
// Directory / Platform
// ============================================================================

#[derive(Default)]
pub struct InMemoryDirectoryIndex {
    entries: RwLock<Vec<DirectoryEntry>>,
}

impl InMemoryDirectoryIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed from an existing snapshot, as-is (duplicates are kept so that
    /// `check_integrity` can report them).
    pub fn from_entries(entries: Vec<DirectoryEntry>) -> Self {
        Self {
            entries: RwLock::new(entries),
        }
    }
}

#[async_trait]
impl DirectoryIndex for InMemoryDirectoryIndex {
    async fn list_entries(&self) -> Result<Vec<DirectoryEntry>, RepositoryError> {
        Ok(self.entries.read().clone())
    }

    async fn get(&self, tenant_id: &TenantId) -> Result<Option<DirectoryEntry>, RepositoryError> {
        Ok(self
            .entries
            .read()
            .iter()
            .find(|e| &e.tenant_id == tenant_id)
            .cloned())
    }

    async fn insert(&self, entry: DirectoryEntry) -> Result<(), RepositoryError> {
        let mut entries = self.entries.write();
        if entries.iter().any(|e| e.tenant_id == entry.tenant_id) {
            return Err(RepositoryError::Duplicate(format!(
                "tenant '{}' already in directory",
                entry.tenant_id
            )));
        }
        entries.push(entry);
        Ok(())
    }

    async fn remove(&self, tenant_id: &TenantId) -> Result<bool, RepositoryError> {
        let mut entries = self.entries.write();
        let before = entries.len();
        entries.retain(|e| &e.tenant_id != tenant_id);
        Ok(entries.len() != before)
    }
}

#[derive(Default)]
pub struct InMemoryPlatformReplica {
    records: RwLock<Vec<PlatformRecord>>,
}

impl InMemoryPlatformReplica {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_records(records: Vec<PlatformRecord>) -> Self {
        Self {
            records: RwLock::new(records),
        }
    }
}

#[async_trait]
impl PlatformReplica for InMemoryPlatformReplica {
    async fn list_records(&self) -> Result<Vec<PlatformRecord>, RepositoryError> {
        Ok(self.records.read().clone())
    }

    async fn get(&self, tenant_id: &TenantId) -> Result<Option<PlatformRecord>, RepositoryError> {
        Ok(self
            .records
            .read()
            .iter()
            .find(|r| &r.tenant_id == tenant_id)
            .cloned())
    }

    async fn upsert(&self, record: PlatformRecord) -> Result<(), RepositoryError> {
        let mut records = self.records.write();
        match records.iter_mut().find(|r| r.tenant_id == record.tenant_id) {
            Some(existing) => *existing = record,
            None => records.push(record),
        }
        Ok(())
    }

    async fn remove(&self, tenant_id: &TenantId) -> Result<bool, RepositoryError> {
        let mut records = self.records.write();
        let before = records.len();
        records.retain(|r| &r.tenant_id != tenant_id);
        Ok(records.len() != before)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::integrity::IntegrityErrorKind;
    use serde_json::json;

    fn tenant(id: &str) -> TenantId {
        TenantId::parse(id).unwrap()
    }

    #[tokio::test]
    async fn test_collection_preserves_insertion_order() {
        let collection = InMemoryEventCollection::new();
        for i in 0..5 {
            collection
                .insert(NewAuditEvent::new("log/test", "u1").with_content(json!({ "n": i })))
                .await
                .unwrap();
        }
        let all = collection.find(&EventQuery::all()).await.unwrap();
        let ns: Vec<_> = all.iter().map(|e| e.content["n"].as_i64().unwrap()).collect();
        assert_eq!(ns, vec![0, 1, 2, 3, 4]);

        let removed = collection
            .delete_many(&EventQuery::all().field("n", 2))
            .await
            .unwrap();
        assert_eq!(removed, 1);
        assert_eq!(collection.count().await.unwrap(), 4);
    }

    #[tokio::test]
    async fn test_provider_open_modes() {
        let provider = InMemoryCollectionProvider::new();
        let err = provider.open(&tenant("u1"), OpenMode::MustExist).await;
        assert!(matches!(err, Err(RepositoryError::NotFound(_))));

        provider.open(&tenant("u1"), OpenMode::CreateIfMissing).await.unwrap();
        provider.open(&tenant("u1"), OpenMode::MustExist).await.unwrap();
        assert_eq!(provider.created_count(), 1);
        assert_eq!(provider.list_collections().await.unwrap(), vec![tenant("u1")]);

        assert!(provider.drop_collection(&tenant("u1")).await.unwrap());
        assert!(!provider.drop_collection(&tenant("u1")).await.unwrap());
    }

    #[tokio::test]
    async fn test_directory_rejects_duplicate_insert() {
        let directory = InMemoryDirectoryIndex::new();
        directory
            .insert(DirectoryEntry::new(tenant("u1"), Default::default()))
            .await
            .unwrap();
        let dup = directory
            .insert(DirectoryEntry::new(tenant("u1"), Default::default()))
            .await;
        assert!(matches!(dup, Err(RepositoryError::Duplicate(_))));
        assert!(directory.check_integrity().await.unwrap().is_clean());
    }

    #[tokio::test]
    async fn test_seeded_duplicates_are_reported() {
        let directory = InMemoryDirectoryIndex::from_entries(vec![
            DirectoryEntry::new(tenant("u1"), Default::default()),
            DirectoryEntry::new(tenant("u1"), Default::default()),
            DirectoryEntry::new(TenantId::from_raw(""), Default::default()),
        ]);
        let report = directory.check_integrity().await.unwrap();
        assert_eq!(report.count_of(IntegrityErrorKind::DuplicateEntry), 1);
        assert_eq!(report.count_of(IntegrityErrorKind::MalformedEntry), 1);
        assert_eq!(directory.list_tenants().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_platform_upsert_and_malformed_settings() {
        let platform = InMemoryPlatformReplica::new();
        platform
            .upsert(PlatformRecord::new(tenant("u1"), json!({ "lang": "en" })))
            .await
            .unwrap();
        platform
            .upsert(PlatformRecord::new(tenant("u1"), json!("not an object")))
            .await
            .unwrap();
        assert_eq!(platform.list_records().await.unwrap().len(), 1);

        let report = platform.check_integrity().await.unwrap();
        assert_eq!(report.count_of(IntegrityErrorKind::MalformedEntry), 1);
    }
}
