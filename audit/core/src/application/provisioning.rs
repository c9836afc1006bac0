// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Tenant Provisioning
//!
//! Brings a tenant into (and out of) existence across the three subsystems
//! that must agree at every quiescent checkpoint: the directory, the
//! platform replica and tenant storage.
//!
//! Provisioning order is directory → platform → store. A failure part-way
//! undoes the steps already applied, in reverse, and publishes
//! `TenantEvent::ProvisioningRolledBack`. Deprovisioning goes the other way
//! (store → platform → directory) so the directory entry is the last trace
//! of the tenant to disappear.

use std::sync::Arc;

use chrono::Utc;
use serde_json::{Map, Value};
use tracing::{error, info, warn};

use crate::application::store_registry::StoreRegistry;
use crate::domain::error::AuditError;
use crate::domain::events::TenantEvent;
use crate::domain::repository::{DirectoryIndex, PlatformReplica};
use crate::domain::tenant::{DirectoryEntry, PlatformRecord, TenantId};
use crate::infrastructure::event_bus::EventBus;

/// What a tenant is provisioned with
#[derive(Debug, Clone, Default)]
pub struct ProvisionRequest {
    pub metadata: Map<String, Value>,
    pub settings: Map<String, Value>,
}

pub struct TenantProvisioningService {
    directory: Arc<dyn DirectoryIndex>,
    platform: Arc<dyn PlatformReplica>,
    registry: Arc<StoreRegistry>,
    event_bus: Arc<EventBus>,
}

impl TenantProvisioningService {
    pub fn new(
        directory: Arc<dyn DirectoryIndex>,
        platform: Arc<dyn PlatformReplica>,
        registry: Arc<StoreRegistry>,
        event_bus: Arc<EventBus>,
    ) -> Self {
        Self {
            directory,
            platform,
            registry,
            event_bus,
        }
    }

    pub async fn provision(&self, tenant_id: &TenantId, request: ProvisionRequest) -> Result<(), AuditError> {
        if !tenant_id.is_well_formed() {
            return Err(AuditError::Validation(format!("invalid tenant id '{}'", tenant_id)));
        }

        info!(tenant_id = %tenant_id, "Provisioning tenant");
        self.directory
            .insert(DirectoryEntry::new(tenant_id.clone(), request.metadata))
            .await?;

        if let Err(e) = self
            .platform
            .upsert(PlatformRecord::new(tenant_id.clone(), Value::Object(request.settings)))
            .await
        {
            let e = AuditError::from(e);
            self.roll_back(tenant_id, false, &e).await;
            return Err(e);
        }

        if let Err(e) = self.registry.for_tenant(tenant_id).await {
            self.roll_back(tenant_id, true, &e).await;
            return Err(e);
        }

        metrics::counter!("tenant_audit_tenants_provisioned_total").increment(1);
        info!(tenant_id = %tenant_id, "Tenant provisioned");
        self.event_bus.publish_tenant_event(TenantEvent::Provisioned {
            tenant_id: tenant_id.clone(),
            provisioned_at: Utc::now(),
        });
        Ok(())
    }

    async fn roll_back(&self, tenant_id: &TenantId, platform_written: bool, cause: &AuditError) {
        warn!(tenant_id = %tenant_id, error = %cause, "Provisioning failed, rolling back");

        if platform_written {
            if let Err(e) = self.platform.remove(tenant_id).await {
                error!(tenant_id = %tenant_id, error = %e, "Failed to remove platform record during rollback");
            }
        }
        if let Err(e) = self.directory.remove(tenant_id).await {
            error!(tenant_id = %tenant_id, error = %e, "Failed to remove directory entry during rollback");
        }

        self.event_bus.publish_tenant_event(TenantEvent::ProvisioningRolledBack {
            tenant_id: tenant_id.clone(),
            reason: cause.to_string(),
            rolled_back_at: Utc::now(),
        });
    }

    /// Remove a tenant and all its audit events.
    ///
    /// Returns whether an event collection was dropped. Fails with
    /// `AuditError::NotFound` for a tenant unknown to the directory.
    pub async fn deprovision(&self, tenant_id: &TenantId) -> Result<bool, AuditError> {
        if self.directory.get(tenant_id).await?.is_none() {
            return Err(AuditError::NotFound(format!("tenant '{}' is not provisioned", tenant_id)));
        }

        info!(tenant_id = %tenant_id, "Deprovisioning tenant");
        self.registry.close(tenant_id).await;
        let events_dropped = self.registry.provider().drop_collection(tenant_id).await?;
        self.platform.remove(tenant_id).await?;
        self.directory.remove(tenant_id).await?;

        info!(tenant_id = %tenant_id, events_dropped, "Tenant deprovisioned");
        self.event_bus.publish_tenant_event(TenantEvent::Deprovisioned {
            tenant_id: tenant_id.clone(),
            events_dropped,
            deprovisioned_at: Utc::now(),
        });
        Ok(events_dropped)
    }

    /// Provisioned tenants, as known to the directory
    pub async fn list_tenants(&self) -> Result<Vec<TenantId>, AuditError> {
        Ok(self.directory.list_tenants().await?)
    }

    pub async fn is_provisioned(&self, tenant_id: &TenantId) -> Result<bool, AuditError> {
        Ok(self.directory.get(tenant_id).await?.is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::integrity_checker::IntegrityChecker;
    use crate::domain::audit_event::NewAuditEvent;
    use crate::domain::repository::{CollectionProvider, EventCollection, OpenMode, RepositoryError};
    use crate::infrastructure::event_bus::DomainEvent;
    use crate::infrastructure::repositories::{
        InMemoryCollectionProvider, InMemoryDirectoryIndex, InMemoryPlatformReplica,
    };
    use async_trait::async_trait;

    fn tenant(id: &str) -> TenantId {
        TenantId::parse(id).unwrap()
    }

    struct Harness {
        service: TenantProvisioningService,
        registry: Arc<StoreRegistry>,
        checker: IntegrityChecker,
        bus: Arc<EventBus>,
    }

    fn harness(provider: Arc<dyn CollectionProvider>) -> Harness {
        let directory: Arc<dyn DirectoryIndex> = Arc::new(InMemoryDirectoryIndex::new());
        let platform: Arc<dyn PlatformReplica> = Arc::new(InMemoryPlatformReplica::new());
        let registry = Arc::new(StoreRegistry::new(provider));
        let bus = Arc::new(EventBus::new(32));
        Harness {
            service: TenantProvisioningService::new(
                directory.clone(),
                platform.clone(),
                registry.clone(),
                bus.clone(),
            ),
            checker: IntegrityChecker::new(directory, platform, bus.clone()).with_storage(registry.clone()),
            registry,
            bus,
        }
    }

    #[tokio::test]
    async fn test_provision_and_deprovision_keep_integrity() {
        let h = harness(Arc::new(InMemoryCollectionProvider::new()));
        assert!(h.checker.run().await.unwrap().is_clean());

        h.service.provision(&tenant("u1"), ProvisionRequest::default()).await.unwrap();
        assert!(h.checker.run().await.unwrap().is_clean());
        assert!(h.service.is_provisioned(&tenant("u1")).await.unwrap());

        let dropped = h.service.deprovision(&tenant("u1")).await.unwrap();
        assert!(dropped);
        assert!(h.checker.run().await.unwrap().is_clean());
        assert!(h.service.list_tenants().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_handle_held_across_deprovision_cannot_append() {
        let provider = Arc::new(InMemoryCollectionProvider::new());
        let h = harness(provider.clone());
        h.service.provision(&tenant("u1"), ProvisionRequest::default()).await.unwrap();
        let held = h.registry.for_tenant(&tenant("u1")).await.unwrap();

        h.service.deprovision(&tenant("u1")).await.unwrap();

        let err = held
            .append(NewAuditEvent::new("log/test", "u1").with_stream_ids(["action-late"]))
            .await;
        assert!(matches!(err, Err(AuditError::StorageUnavailable(_))));
        assert!(provider.list_collections().await.unwrap().is_empty());
        assert!(h.checker.run().await.unwrap().is_clean());
    }

    #[tokio::test]
    async fn test_duplicate_provision_is_rejected_without_drift() {
        let h = harness(Arc::new(InMemoryCollectionProvider::new()));
        h.service.provision(&tenant("u1"), ProvisionRequest::default()).await.unwrap();

        let err = h.service.provision(&tenant("u1"), ProvisionRequest::default()).await;
        assert!(matches!(err, Err(AuditError::Duplicate(_))));
        assert!(h.checker.run().await.unwrap().is_clean());
    }

    #[tokio::test]
    async fn test_deprovision_unknown_tenant() {
        let h = harness(Arc::new(InMemoryCollectionProvider::new()));
        let err = h.service.deprovision(&tenant("ghost")).await;
        assert!(matches!(err, Err(AuditError::NotFound(_))));
    }

    struct BrokenProvider;

    #[async_trait]
    impl CollectionProvider for BrokenProvider {
        async fn open(
            &self,
            _tenant_id: &TenantId,
            _mode: OpenMode,
        ) -> Result<Arc<dyn EventCollection>, RepositoryError> {
            Err(RepositoryError::Unknown("disk full".to_string()))
        }
        async fn drop_collection(&self, _tenant_id: &TenantId) -> Result<bool, RepositoryError> {
            Ok(false)
        }
        async fn list_collections(&self) -> Result<Vec<TenantId>, RepositoryError> {
            Ok(Vec::new())
        }
        async fn flush(&self) -> Result<(), RepositoryError> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_failed_store_creation_rolls_back() {
        let h = harness(Arc::new(BrokenProvider));
        let mut events = h.bus.subscribe();

        let err = h.service.provision(&tenant("u1"), ProvisionRequest::default()).await;
        assert!(matches!(err, Err(AuditError::Storage(_))));
        assert!(!h.service.is_provisioned(&tenant("u1")).await.unwrap());
        assert!(h.checker.run().await.unwrap().is_clean());

        match events.recv().await.unwrap() {
            DomainEvent::Tenant(TenantEvent::ProvisioningRolledBack { tenant_id, reason, .. }) => {
                assert_eq!(tenant_id, tenant("u1"));
                assert!(reason.contains("disk full"));
            }
            other => panic!("Wrong event type received: {:?}", other),
        }
    }
}
