// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Sled-backed repositories
//!
//! Layout inside one `sled::Db`:
//!
//! | Tree | Key | Value |
//! |------|-----|-------|
//! | `events/<tenant>` | big-endian `generate_id()` | JSON `AuditEvent` |
//! | `directory` | tenant id | JSON `DirectoryEntry` |
//! | `platform` | tenant id | JSON `PlatformRecord` |
//!
//! `generate_id()` is monotonic, so iterating a tenant tree yields events in
//! insertion order.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tracing::{debug, info};

use crate::domain::audit_event::{AuditEvent, EventId, NewAuditEvent};
use crate::domain::integrity::{ErrorDescriptor, IntegrityErrorKind, IntegrityReport};
use crate::domain::query::EventQuery;
use crate::domain::repository::{
    check_directory_entries, check_platform_records, CollectionProvider, DirectoryIndex,
    EventCollection, OpenMode, PlatformReplica, RepositoryError, SledConfig,
};
use crate::domain::tenant::{DirectoryEntry, PlatformRecord, TenantId};

const EVENTS_TREE_PREFIX: &str = "events/";
const DIRECTORY_TREE: &str = "directory";
const PLATFORM_TREE: &str = "platform";

fn events_tree_name(tenant_id: &TenantId) -> String {
    format!("{}{}", EVENTS_TREE_PREFIX, tenant_id)
}

/// Open the database shared by all sled repositories
pub fn open_database(config: &SledConfig) -> Result<sled::Db, RepositoryError> {
    info!("Opening sled database at {:?}", config.path);
    sled::open(&config.path).map_err(|e| RepositoryError::Unavailable(format!("sled open {:?}: {}", config.path, e)))
}

// ============================================================================
// Event collections
// ============================================================================

pub struct SledEventCollection {
    db: sled::Db,
    tree: sled::Tree,
}

#[async_trait]
impl EventCollection for SledEventCollection {
    async fn insert(&self, event: NewAuditEvent) -> Result<AuditEvent, RepositoryError> {
        let stored = event.into_stored(EventId::new(), Utc::now());
        let key = self.db.generate_id()?.to_be_bytes();
        let value = serde_json::to_vec(&stored)?;
        self.tree.insert(key, value)?;
        Ok(stored)
    }

    async fn find(&self, query: &EventQuery) -> Result<Vec<AuditEvent>, RepositoryError> {
        let mut found = Vec::new();
        for item in self.tree.iter() {
            let (_, value) = item?;
            let event: AuditEvent = serde_json::from_slice(&value)?;
            if query.matches(&event) {
                found.push(event);
            }
        }
        Ok(found)
    }

    async fn delete_many(&self, query: &EventQuery) -> Result<usize, RepositoryError> {
        let mut removed = 0;
        for item in self.tree.iter() {
            let (key, value) = item?;
            let event: AuditEvent = serde_json::from_slice(&value)?;
            if query.matches(&event) && self.tree.remove(key)?.is_some() {
                removed += 1;
            }
        }
        Ok(removed)
    }

    async fn count(&self) -> Result<usize, RepositoryError> {
        Ok(self.tree.len())
    }
}

pub struct SledCollectionProvider {
    db: sled::Db,
}

impl SledCollectionProvider {
    pub fn new(db: sled::Db) -> Self {
        Self { db }
    }
}

#[async_trait]
impl CollectionProvider for SledCollectionProvider {
    async fn open(
        &self,
        tenant_id: &TenantId,
        mode: OpenMode,
    ) -> Result<Arc<dyn EventCollection>, RepositoryError> {
        let name = events_tree_name(tenant_id);
        if mode == OpenMode::MustExist
            && !self.db.tree_names().iter().any(|n| &**n == name.as_bytes())
        {
            return Err(RepositoryError::NotFound(format!(
                "no event collection for tenant '{}'",
                tenant_id
            )));
        }
        debug!(tenant_id = %tenant_id, "Opening sled event tree");
        let tree = self.db.open_tree(name.as_bytes())?;
        Ok(Arc::new(SledEventCollection {
            db: self.db.clone(),
            tree,
        }))
    }

    async fn drop_collection(&self, tenant_id: &TenantId) -> Result<bool, RepositoryError> {
        Ok(self.db.drop_tree(events_tree_name(tenant_id).as_bytes())?)
    }

    async fn list_collections(&self) -> Result<Vec<TenantId>, RepositoryError> {
        let mut tenants: Vec<TenantId> = self
            .db
            .tree_names()
            .iter()
            .filter_map(|name| {
                std::str::from_utf8(name)
                    .ok()
                    .and_then(|n| n.strip_prefix(EVENTS_TREE_PREFIX))
                    .map(TenantId::from_raw)
            })
            .collect();
        tenants.sort();
        Ok(tenants)
    }

    async fn flush(&self) -> Result<(), RepositoryError> {
        self.db.flush_async().await?;
        Ok(())
    }
}

// ============================================================================
// Directory / Platform
// ============================================================================

/// Decode every value of a record tree. Undecodable values and values whose
/// tenant id disagrees with their key are returned as findings.
fn decode_tree<T, F>(
    tree: &sled::Tree,
    tenant_of: F,
    subsystem: &str,
) -> Result<(Vec<T>, Vec<ErrorDescriptor>), RepositoryError>
where
    T: serde::de::DeserializeOwned,
    F: Fn(&T) -> &TenantId,
{
    let mut records = Vec::new();
    let mut findings = Vec::new();
    for item in tree.iter() {
        let (key, value) = item?;
        let key_tenant = TenantId::from_raw(String::from_utf8_lossy(&key).into_owned());
        match serde_json::from_slice::<T>(&value) {
            Ok(record) => {
                if tenant_of(&record) != &key_tenant {
                    findings.push(ErrorDescriptor::for_tenant(
                        IntegrityErrorKind::MalformedEntry,
                        &key_tenant,
                        format!("{} record stored under a different tenant key", subsystem),
                    ));
                }
                records.push(record);
            }
            Err(e) => findings.push(ErrorDescriptor::for_tenant(
                IntegrityErrorKind::MalformedEntry,
                &key_tenant,
                format!("undecodable {} record: {}", subsystem, e),
            )),
        }
    }
    Ok((records, findings))
}

pub struct SledDirectoryIndex {
    tree: sled::Tree,
}

impl SledDirectoryIndex {
    pub fn new(db: &sled::Db) -> Result<Self, RepositoryError> {
        Ok(Self {
            tree: db.open_tree(DIRECTORY_TREE)?,
        })
    }
}

#[async_trait]
impl DirectoryIndex for SledDirectoryIndex {
    /// Undecodable records are skipped here and surface in `check_integrity`
    async fn list_entries(&self) -> Result<Vec<DirectoryEntry>, RepositoryError> {
        Ok(decode_tree(&self.tree, |e: &DirectoryEntry| &e.tenant_id, "directory")?.0)
    }

    async fn get(&self, tenant_id: &TenantId) -> Result<Option<DirectoryEntry>, RepositoryError> {
        match self.tree.get(tenant_id.as_str())? {
            Some(value) => Ok(Some(serde_json::from_slice(&value)?)),
            None => Ok(None),
        }
    }

    async fn insert(&self, entry: DirectoryEntry) -> Result<(), RepositoryError> {
        let value = serde_json::to_vec(&entry)?;
        self.tree
            .compare_and_swap(entry.tenant_id.as_str(), None::<&[u8]>, Some(value))?
            .map_err(|_| {
                RepositoryError::Duplicate(format!("tenant '{}' already in directory", entry.tenant_id))
            })
    }

    async fn remove(&self, tenant_id: &TenantId) -> Result<bool, RepositoryError> {
        Ok(self.tree.remove(tenant_id.as_str())?.is_some())
    }

    async fn check_integrity(&self) -> Result<IntegrityReport, RepositoryError> {
        let (entries, findings) = decode_tree(&self.tree, |e: &DirectoryEntry| &e.tenant_id, "directory")?;
        let mut report = IntegrityReport::new(findings);
        report.merge(check_directory_entries(&entries));
        Ok(report)
    }
}

pub struct SledPlatformReplica {
    tree: sled::Tree,
}

impl SledPlatformReplica {
    pub fn new(db: &sled::Db) -> Result<Self, RepositoryError> {
        Ok(Self {
            tree: db.open_tree(PLATFORM_TREE)?,
        })
    }
}

#[async_trait]
impl PlatformReplica for SledPlatformReplica {
    async fn list_records(&self) -> Result<Vec<PlatformRecord>, RepositoryError> {
        Ok(decode_tree(&self.tree, |r: &PlatformRecord| &r.tenant_id, "platform")?.0)
    }

    async fn get(&self, tenant_id: &TenantId) -> Result<Option<PlatformRecord>, RepositoryError> {
        match self.tree.get(tenant_id.as_str())? {
            Some(value) => Ok(Some(serde_json::from_slice(&value)?)),
            None => Ok(None),
        }
    }

    async fn upsert(&self, record: PlatformRecord) -> Result<(), RepositoryError> {
        let value = serde_json::to_vec(&record)?;
        self.tree.insert(record.tenant_id.as_str(), value)?;
        Ok(())
    }

    async fn remove(&self, tenant_id: &TenantId) -> Result<bool, RepositoryError> {
        Ok(self.tree.remove(tenant_id.as_str())?.is_some())
    }

    async fn check_integrity(&self) -> Result<IntegrityReport, RepositoryError> {
        let (records, findings) = decode_tree(&self.tree, |r: &PlatformRecord| &r.tenant_id, "platform")?;
        let mut report = IntegrityReport::new(findings);
        report.merge(check_platform_records(&records));
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn tenant(id: &str) -> TenantId {
        TenantId::parse(id).unwrap()
    }

    fn temp_db() -> (tempfile::TempDir, sled::Db) {
        let dir = tempfile::tempdir().unwrap();
        let db = open_database(&SledConfig {
            path: dir.path().join("db"),
        })
        .unwrap();
        (dir, db)
    }

    #[tokio::test]
    async fn test_events_persist_in_insertion_order() {
        let (_dir, db) = temp_db();
        let provider = SledCollectionProvider::new(db);
        let collection = provider.open(&tenant("u1"), OpenMode::CreateIfMissing).await.unwrap();
        for i in 0..3 {
            collection
                .insert(NewAuditEvent::new("log/test", "u1").with_content(json!({ "n": i })))
                .await
                .unwrap();
        }

        let reopened = provider.open(&tenant("u1"), OpenMode::MustExist).await.unwrap();
        let ns: Vec<_> = reopened
            .find(&EventQuery::all())
            .await
            .unwrap()
            .iter()
            .map(|e| e.content["n"].as_i64().unwrap())
            .collect();
        assert_eq!(ns, vec![0, 1, 2]);
        assert_eq!(reopened.delete_many(&EventQuery::all().field("n", 0)).await.unwrap(), 1);
        assert_eq!(reopened.count().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_provider_lists_and_drops_collections() {
        let (_dir, db) = temp_db();
        let provider = SledCollectionProvider::new(db);
        assert!(matches!(
            provider.open(&tenant("u1"), OpenMode::MustExist).await,
            Err(RepositoryError::NotFound(_))
        ));
        provider.open(&tenant("u1"), OpenMode::CreateIfMissing).await.unwrap();
        provider.open(&tenant("u2"), OpenMode::CreateIfMissing).await.unwrap();
        assert_eq!(provider.list_collections().await.unwrap(), vec![tenant("u1"), tenant("u2")]);

        assert!(provider.drop_collection(&tenant("u1")).await.unwrap());
        assert_eq!(provider.list_collections().await.unwrap(), vec![tenant("u2")]);
    }

    #[tokio::test]
    async fn test_directory_insert_is_exclusive() {
        let (_dir, db) = temp_db();
        let directory = SledDirectoryIndex::new(&db).unwrap();
        directory
            .insert(DirectoryEntry::new(tenant("u1"), Default::default()))
            .await
            .unwrap();
        assert!(matches!(
            directory.insert(DirectoryEntry::new(tenant("u1"), Default::default())).await,
            Err(RepositoryError::Duplicate(_))
        ));
        assert_eq!(directory.list_tenants().await.unwrap(), vec![tenant("u1")]);
        assert!(directory.check_integrity().await.unwrap().is_clean());
    }

    #[tokio::test]
    async fn test_undecodable_and_misfiled_records_are_reported() {
        let (_dir, db) = temp_db();
        let platform = SledPlatformReplica::new(&db).unwrap();
        platform
            .upsert(PlatformRecord::new(tenant("u1"), json!({})))
            .await
            .unwrap();

        let tree = db.open_tree(PLATFORM_TREE).unwrap();
        tree.insert("u2", b"{not json".to_vec()).unwrap();
        let misfiled = serde_json::to_vec(&PlatformRecord::new(tenant("u4"), json!({}))).unwrap();
        tree.insert("u3", misfiled).unwrap();

        let report = platform.check_integrity().await.unwrap();
        assert_eq!(report.count_of(IntegrityErrorKind::MalformedEntry), 2);
    }
}
