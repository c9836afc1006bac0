// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Audit Service
//!
//! Upward-facing surface of the audit core: record and query a tenant's
//! events, read its derived indexes, run the integrity check.
//!
//! Every tenant-scoped call first confirms the tenant is provisioned, so
//! that reads and writes never create stores for unknown tenants.

use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::Utc;
use futures::{Stream, StreamExt};
use tracing::{debug, info};

use crate::application::integrity_checker::IntegrityChecker;
use crate::application::store_registry::StoreRegistry;
use crate::application::tenant_store::TenantStore;
use crate::domain::audit_event::{AuditEvent, NewAuditEvent};
use crate::domain::error::AuditError;
use crate::domain::events::AuditEventRecorded;
use crate::domain::integrity::{IntegrityCheckError, IntegrityReport};
use crate::domain::query::EventQuery;
use crate::domain::repository::DirectoryIndex;
use crate::domain::tenant::TenantId;
use crate::infrastructure::collector::{CollectorError, SequenceCollector};
use crate::infrastructure::event_bus::EventBus;

pub struct AuditService {
    directory: Arc<dyn DirectoryIndex>,
    registry: Arc<StoreRegistry>,
    checker: Arc<IntegrityChecker>,
    event_bus: Arc<EventBus>,
    max_batch_size: usize,
}

impl AuditService {
    pub fn new(
        directory: Arc<dyn DirectoryIndex>,
        registry: Arc<StoreRegistry>,
        checker: Arc<IntegrityChecker>,
        event_bus: Arc<EventBus>,
        max_batch_size: usize,
    ) -> Self {
        Self {
            directory,
            registry,
            checker,
            event_bus,
            max_batch_size,
        }
    }

    async fn store(&self, tenant_id: &TenantId) -> Result<Arc<TenantStore>, AuditError> {
        if self.directory.get(tenant_id).await?.is_none() {
            return Err(AuditError::NotFound(format!("tenant '{}' is not provisioned", tenant_id)));
        }
        self.registry.for_tenant(tenant_id).await
    }

    pub async fn record_event(&self, tenant_id: &TenantId, event: NewAuditEvent) -> Result<AuditEvent, AuditError> {
        let stored = self.store(tenant_id).await?.append(event).await?;
        self.publish_recorded(tenant_id, &stored);
        Ok(stored)
    }

    /// Drain `events` into a bounded buffer, then append them in order.
    ///
    /// More than `max_batch_size` events aborts the burst with
    /// `AuditError::Overflow` before anything is written. Every event is
    /// validated before the first append.
    pub async fn record_batch<S>(&self, tenant_id: &TenantId, events: S) -> Result<Vec<AuditEvent>, AuditError>
    where
        S: Stream<Item = NewAuditEvent> + Send,
    {
        let store = self.store(tenant_id).await?;

        let (mut collector, result) = SequenceCollector::<NewAuditEvent>::channel(self.max_batch_size);
        futures::pin_mut!(events);
        while let Some(event) = events.next().await {
            collector.push(event).map_err(collector_error)?;
        }
        collector.close().map_err(collector_error)?;
        let drained = result
            .await
            .map_err(|_| AuditError::Storage("ingestion buffer dropped its result".to_string()))?
            .map_err(collector_error)?;

        let validated = drained
            .into_iter()
            .map(NewAuditEvent::validate)
            .collect::<Result<Vec<_>, _>>()?;

        debug!(tenant_id = %tenant_id, events = validated.len(), "Appending ingestion burst");
        let mut stored = Vec::with_capacity(validated.len());
        for event in validated {
            let event = store.append(event).await?;
            self.publish_recorded(tenant_id, &event);
            stored.push(event);
        }
        info!(tenant_id = %tenant_id, events = stored.len(), "Recorded event batch");
        Ok(stored)
    }

    pub async fn get_events(&self, tenant_id: &TenantId, query: &EventQuery) -> Result<Vec<AuditEvent>, AuditError> {
        self.store(tenant_id).await?.query(query).await
    }

    pub async fn get_all_actions(&self, tenant_id: &TenantId) -> Result<BTreeSet<String>, AuditError> {
        self.store(tenant_id).await?.all_actions().await
    }

    pub async fn get_all_accesses(&self, tenant_id: &TenantId) -> Result<BTreeSet<String>, AuditError> {
        self.store(tenant_id).await?.all_accesses().await
    }

    pub async fn run_integrity_check(&self) -> Result<IntegrityReport, IntegrityCheckError> {
        self.checker.run().await
    }

    pub async fn shutdown(&self) -> Result<(), AuditError> {
        self.registry.shutdown().await
    }

    fn publish_recorded(&self, tenant_id: &TenantId, event: &AuditEvent) {
        self.event_bus.publish_audit_event(AuditEventRecorded {
            tenant_id: tenant_id.clone(),
            event_id: event.id,
            event_type: event.event_type.clone(),
            recorded_at: Utc::now(),
        });
    }
}

fn collector_error(err: CollectorError) -> AuditError {
    match err {
        CollectorError::Overflow { capacity } => AuditError::Overflow { capacity },
        CollectorError::Finished => AuditError::Storage(err.to_string()),
    }
}
