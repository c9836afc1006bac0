// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Integrity Checker
//!
//! Detects, and never repairs, disagreement between the tenant directory,
//! the platform replica and tenant storage.
//!
//! | Check | Source | Kind |
//! |-------|--------|------|
//! | Directory self-check | `DirectoryIndex::check_integrity` | as reported |
//! | Platform self-check | `PlatformReplica::check_integrity` | as reported |
//! | Directory vs platform | tenant set difference | `DirectoryPlatformMismatch` |
//! | Collection can be opened | `CollectionProvider::open` (`MustExist`) | `OrphanedDirectoryEntry` |
//! | Store has an owner | `CollectionProvider::list_collections` | `OrphanedStore` |
//!
//! The last two checks run only when the checker was given storage access.
//! They open collections directly rather than through the registry, so a
//! run never reads event logs or rebuilds indexes and its cost grows with
//! the number of tenants, not events.
//! Findings are the successful result; only an unreachable subsystem makes
//! [`IntegrityChecker::run`] fail.

use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::Utc;
use tracing::{info, warn};

use crate::application::store_registry::StoreRegistry;
use crate::domain::events::IntegrityCheckCompleted;
use crate::domain::integrity::{
    ErrorDescriptor, IntegrityCheckError, IntegrityErrorKind, IntegrityReport,
};
use crate::domain::repository::{DirectoryIndex, OpenMode, PlatformReplica, RepositoryError};
use crate::domain::tenant::TenantId;
use crate::infrastructure::event_bus::EventBus;

pub struct IntegrityChecker {
    directory: Arc<dyn DirectoryIndex>,
    platform: Arc<dyn PlatformReplica>,
    registry: Option<Arc<StoreRegistry>>,
    event_bus: Arc<EventBus>,
}

impl IntegrityChecker {
    /// Checker over directory and platform only
    pub fn new(
        directory: Arc<dyn DirectoryIndex>,
        platform: Arc<dyn PlatformReplica>,
        event_bus: Arc<EventBus>,
    ) -> Self {
        Self {
            directory,
            platform,
            registry: None,
            event_bus,
        }
    }

    /// Enable the storage checks
    pub fn with_storage(mut self, registry: Arc<StoreRegistry>) -> Self {
        self.registry = Some(registry);
        self
    }

    pub async fn run(&self) -> Result<IntegrityReport, IntegrityCheckError> {
        let mut report = self
            .directory
            .check_integrity()
            .await
            .map_err(IntegrityCheckError::DirectoryUnreachable)?;
        report.merge(
            self.platform
                .check_integrity()
                .await
                .map_err(IntegrityCheckError::PlatformUnreachable)?,
        );

        let in_directory: BTreeSet<TenantId> = self
            .directory
            .list_tenants()
            .await
            .map_err(IntegrityCheckError::DirectoryUnreachable)?
            .into_iter()
            .collect();
        let in_platform: BTreeSet<TenantId> = self
            .platform
            .list_tenants()
            .await
            .map_err(IntegrityCheckError::PlatformUnreachable)?
            .into_iter()
            .collect();

        report.errors.extend(mismatches(&in_directory, &in_platform));

        if let Some(registry) = &self.registry {
            let stored: BTreeSet<TenantId> = registry
                .provider()
                .list_collections()
                .await
                .map_err(IntegrityCheckError::StorageUnreachable)?
                .into_iter()
                .collect();

            let in_both: Vec<&TenantId> = in_directory.intersection(&in_platform).collect();
            report
                .errors
                .extend(unopenable_stores(registry, &stored, in_both).await?);

            report.errors.extend(
                stored
                    .iter()
                    .filter(|tenant| !in_directory.contains(*tenant))
                    .map(|tenant| {
                        ErrorDescriptor::for_tenant(
                            IntegrityErrorKind::OrphanedStore,
                            tenant,
                            "event collection exists without a directory entry",
                        )
                    }),
            );
        }

        self.record(&report);
        Ok(report)
    }

    fn record(&self, report: &IntegrityReport) {
        for error in &report.errors {
            warn!(
                kind = ?error.kind,
                tenant_id = ?error.tenant_id.as_ref().map(TenantId::as_str),
                "Integrity finding: {}",
                error.message
            );
        }
        metrics::counter!("tenant_audit_integrity_errors_total").increment(report.errors.len() as u64);
        info!(
            error_count = report.errors.len(),
            storage_checked = self.registry.is_some(),
            "Integrity check completed"
        );
        self.event_bus.publish_integrity_event(IntegrityCheckCompleted {
            error_count: report.errors.len(),
            completed_at: Utc::now(),
        });
    }
}

fn mismatches(in_directory: &BTreeSet<TenantId>, in_platform: &BTreeSet<TenantId>) -> Vec<ErrorDescriptor> {
    let only_in_directory = in_directory.difference(in_platform).map(|tenant| {
        ErrorDescriptor::for_tenant(
            IntegrityErrorKind::DirectoryPlatformMismatch,
            tenant,
            "registered in the directory but missing from the platform replica",
        )
    });
    let only_in_platform = in_platform.difference(in_directory).map(|tenant| {
        ErrorDescriptor::for_tenant(
            IntegrityErrorKind::DirectoryPlatformMismatch,
            tenant,
            "present in the platform replica but missing from the directory",
        )
    });
    only_in_directory.chain(only_in_platform).collect()
}

/// A cached store does not prove its collection still exists, so presence
/// in storage is checked before opening.
async fn unopenable_stores(
    registry: &StoreRegistry,
    stored: &BTreeSet<TenantId>,
    tenants: Vec<&TenantId>,
) -> Result<Vec<ErrorDescriptor>, IntegrityCheckError> {
    let mut errors = Vec::new();
    for tenant in tenants {
        if !stored.contains(tenant) {
            errors.push(ErrorDescriptor::for_tenant(
                IntegrityErrorKind::OrphanedDirectoryEntry,
                tenant,
                "no event collection in storage",
            ));
            continue;
        }
        match registry.provider().open(tenant, OpenMode::MustExist).await {
            Ok(_) => {}
            Err(e @ RepositoryError::Unavailable(_)) => {
                return Err(IntegrityCheckError::StorageUnreachable(e));
            }
            Err(e) => errors.push(ErrorDescriptor::for_tenant(
                IntegrityErrorKind::OrphanedDirectoryEntry,
                tenant,
                format!("tenant store cannot be opened: {}", e),
            )),
        }
    }
    Ok(errors)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::repository::CollectionProvider;
    use crate::domain::tenant::{DirectoryEntry, PlatformRecord};
    use crate::infrastructure::event_bus::DomainEvent;
    use crate::infrastructure::repositories::{
        InMemoryCollectionProvider, InMemoryDirectoryIndex, InMemoryPlatformReplica,
    };
    use async_trait::async_trait;
    use serde_json::json;

    fn tenant(id: &str) -> TenantId {
        TenantId::parse(id).unwrap()
    }

    fn entry(id: &str) -> DirectoryEntry {
        DirectoryEntry::new(tenant(id), Default::default())
    }

    fn record(id: &str) -> PlatformRecord {
        PlatformRecord::new(tenant(id), json!({}))
    }

    #[tokio::test]
    async fn test_empty_system_is_clean() {
        let checker = IntegrityChecker::new(
            Arc::new(InMemoryDirectoryIndex::new()),
            Arc::new(InMemoryPlatformReplica::new()),
            Arc::new(EventBus::new(8)),
        )
        .with_storage(Arc::new(StoreRegistry::new(Arc::new(InMemoryCollectionProvider::new()))));

        assert!(checker.run().await.unwrap().is_clean());
    }

    #[tokio::test]
    async fn test_reports_mismatch_per_tenant() {
        let checker = IntegrityChecker::new(
            Arc::new(InMemoryDirectoryIndex::from_entries(vec![entry("a"), entry("b")])),
            Arc::new(InMemoryPlatformReplica::from_records(vec![record("b"), record("c")])),
            Arc::new(EventBus::new(8)),
        );

        let report = checker.run().await.unwrap();
        assert_eq!(report.count_of(IntegrityErrorKind::DirectoryPlatformMismatch), 2);
        let tenants: Vec<_> = report.errors.iter().filter_map(|e| e.tenant_id.clone()).collect();
        assert_eq!(tenants, vec![tenant("a"), tenant("c")]);
    }

    #[tokio::test]
    async fn test_self_check_findings_are_kept_verbatim() {
        let checker = IntegrityChecker::new(
            Arc::new(InMemoryDirectoryIndex::from_entries(vec![entry("a"), entry("a")])),
            Arc::new(InMemoryPlatformReplica::from_records(vec![PlatformRecord::new(
                tenant("a"),
                json!([1, 2]),
            )])),
            Arc::new(EventBus::new(8)),
        );

        let report = checker.run().await.unwrap();
        assert_eq!(report.count_of(IntegrityErrorKind::DuplicateEntry), 1);
        assert_eq!(report.count_of(IntegrityErrorKind::MalformedEntry), 1);
        assert_eq!(report.errors.len(), 2);
    }

    #[tokio::test]
    async fn test_storage_checks() {
        let provider = Arc::new(InMemoryCollectionProvider::new());
        let registry = Arc::new(StoreRegistry::new(provider.clone()));
        // "a" has no collection; "stray" has a collection but no directory entry
        registry.for_tenant(&tenant("stray")).await.unwrap();

        let checker = IntegrityChecker::new(
            Arc::new(InMemoryDirectoryIndex::from_entries(vec![entry("a")])),
            Arc::new(InMemoryPlatformReplica::from_records(vec![record("a")])),
            Arc::new(EventBus::new(8)),
        )
        .with_storage(registry.clone());

        let report = checker.run().await.unwrap();
        assert_eq!(report.count_of(IntegrityErrorKind::OrphanedDirectoryEntry), 1);
        assert_eq!(report.count_of(IntegrityErrorKind::OrphanedStore), 1);
        assert_eq!(report.errors.len(), 2);
        // the check itself never creates collections
        assert_eq!(provider.created_count(), 1);
    }

    #[tokio::test]
    async fn test_storage_checks_do_not_open_tenant_stores() {
        let provider = Arc::new(InMemoryCollectionProvider::new());
        provider.open(&tenant("b"), OpenMode::CreateIfMissing).await.unwrap();
        let registry = Arc::new(StoreRegistry::new(provider.clone()));

        let checker = IntegrityChecker::new(
            Arc::new(InMemoryDirectoryIndex::from_entries(vec![entry("b")])),
            Arc::new(InMemoryPlatformReplica::from_records(vec![record("b")])),
            Arc::new(EventBus::new(8)),
        )
        .with_storage(registry.clone());

        assert!(checker.run().await.unwrap().is_clean());
        assert!(registry.live_tenants().is_empty());
    }

    struct UnreachableDirectory;

    #[async_trait]
    impl DirectoryIndex for UnreachableDirectory {
        async fn list_entries(&self) -> Result<Vec<DirectoryEntry>, RepositoryError> {
            Err(RepositoryError::Unavailable("directory down".to_string()))
        }
        async fn get(&self, _tenant_id: &TenantId) -> Result<Option<DirectoryEntry>, RepositoryError> {
            Err(RepositoryError::Unavailable("directory down".to_string()))
        }
        async fn insert(&self, _entry: DirectoryEntry) -> Result<(), RepositoryError> {
            Err(RepositoryError::Unavailable("directory down".to_string()))
        }
        async fn remove(&self, _tenant_id: &TenantId) -> Result<bool, RepositoryError> {
            Err(RepositoryError::Unavailable("directory down".to_string()))
        }
    }

    #[tokio::test]
    async fn test_unreachable_directory_is_fatal() {
        let checker = IntegrityChecker::new(
            Arc::new(UnreachableDirectory),
            Arc::new(InMemoryPlatformReplica::new()),
            Arc::new(EventBus::new(8)),
        );
        assert!(matches!(
            checker.run().await,
            Err(IntegrityCheckError::DirectoryUnreachable(_))
        ));
    }

    #[tokio::test]
    async fn test_publishes_completion_event() {
        let bus = Arc::new(EventBus::new(8));
        let mut receiver = bus.subscribe();
        let checker = IntegrityChecker::new(
            Arc::new(InMemoryDirectoryIndex::from_entries(vec![entry("a")])),
            Arc::new(InMemoryPlatformReplica::new()),
            bus,
        );
        checker.run().await.unwrap();

        match receiver.recv().await.unwrap() {
            DomainEvent::Integrity(e) => assert_eq!(e.error_count, 1),
            other => panic!("Wrong event type received: {:?}", other),
        }
    }
}
