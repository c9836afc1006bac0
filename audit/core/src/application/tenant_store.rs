// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Tenant Store
//!
//! Append-only audit log of one tenant, plus its derived indexes.
//!
//! ## Index consistency
//!
//! The indexes are rebuilt from the collection when the store is opened and
//! then maintained incrementally. An append holds the index write lock across
//! the collection insert and the index update, and readers take the read
//! lock, so a reader never sees an event without its index contribution (or
//! the reverse).
//!
//! [`TenantStore::close`] takes the same write lock, so once it returns no
//! append is in flight and every later operation on the handle fails with
//! `AuditError::StorageUnavailable`. A store re-opened over the collection
//! therefore indexes every event that was ever accepted.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::domain::audit_event::{AuditEvent, IndexKind, NewAuditEvent};
use crate::domain::error::AuditError;
use crate::domain::query::EventQuery;
use crate::domain::repository::EventCollection;
use crate::domain::tenant::TenantId;

/// Distinct values per [`IndexKind`] over all events of a store
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DerivedIndexes {
    values: BTreeMap<IndexKind, BTreeSet<String>>,
}

impl DerivedIndexes {
    pub fn from_events<'a>(events: impl IntoIterator<Item = &'a AuditEvent>) -> Self {
        let mut indexes = Self::default();
        for event in events {
            indexes.absorb(event);
        }
        indexes
    }

    pub fn absorb(&mut self, event: &AuditEvent) {
        for kind in IndexKind::ALL {
            for value in event.index_values(kind) {
                self.values.entry(kind).or_default().insert(value.to_string());
            }
        }
    }

    pub fn values(&self, kind: IndexKind) -> BTreeSet<String> {
        self.values.get(&kind).cloned().unwrap_or_default()
    }
}

#[derive(Debug, Default)]
struct StoreState {
    indexes: DerivedIndexes,
    closed: bool,
}

pub struct TenantStore {
    tenant_id: TenantId,
    collection: Arc<dyn EventCollection>,
    state: RwLock<StoreState>,
}

impl std::fmt::Debug for TenantStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TenantStore")
            .field("tenant_id", &self.tenant_id)
            .finish_non_exhaustive()
    }
}

impl TenantStore {
    /// Open a store over the tenant's exclusive collection, rebuilding the
    /// derived indexes from the events already stored.
    pub async fn open(tenant_id: TenantId, collection: Arc<dyn EventCollection>) -> Result<Self, AuditError> {
        let existing = collection.find(&EventQuery::all()).await?;
        let indexes = DerivedIndexes::from_events(&existing);
        info!(
            tenant_id = %tenant_id,
            events = existing.len(),
            "Opened tenant store"
        );
        Ok(Self {
            tenant_id,
            collection,
            state: RwLock::new(StoreState {
                indexes,
                closed: false,
            }),
        })
    }

    pub fn tenant_id(&self) -> &TenantId {
        &self.tenant_id
    }

    /// Validate and persist an event, updating the derived indexes.
    pub async fn append(&self, event: NewAuditEvent) -> Result<AuditEvent, AuditError> {
        let event = match event.validate() {
            Ok(event) => event,
            Err(e) => {
                metrics::counter!("tenant_audit_events_rejected_total").increment(1);
                return Err(e);
            }
        };

        let mut state = self.state.write().await;
        self.ensure_open(&state)?;
        let stored = self.collection.insert(event).await?;
        state.indexes.absorb(&stored);
        drop(state);

        metrics::counter!("tenant_audit_events_appended_total").increment(1);
        debug!(
            tenant_id = %self.tenant_id,
            event_id = %stored.id,
            event_type = %stored.event_type,
            "Appended audit event"
        );
        Ok(stored)
    }

    /// Events matching every predicate, in append order.
    pub async fn query(&self, query: &EventQuery) -> Result<Vec<AuditEvent>, AuditError> {
        query.validate()?;
        let state = self.state.read().await;
        self.ensure_open(&state)?;
        Ok(self.collection.find(query).await?)
    }

    pub async fn index_values(&self, kind: IndexKind) -> Result<BTreeSet<String>, AuditError> {
        let state = self.state.read().await;
        self.ensure_open(&state)?;
        Ok(state.indexes.values(kind))
    }

    /// Distinct `action-*` tag values across all appended events
    pub async fn all_actions(&self) -> Result<BTreeSet<String>, AuditError> {
        self.index_values(IndexKind::Action).await
    }

    /// Distinct `access-*` tag values across all appended events
    pub async fn all_accesses(&self) -> Result<BTreeSet<String>, AuditError> {
        self.index_values(IndexKind::Access).await
    }

    pub async fn count(&self) -> Result<usize, AuditError> {
        let state = self.state.read().await;
        self.ensure_open(&state)?;
        Ok(self.collection.count().await?)
    }

    /// Retire this handle. Waits for in-flight appends; idempotent.
    pub async fn close(&self) {
        let mut state = self.state.write().await;
        if !state.closed {
            state.closed = true;
            debug!(tenant_id = %self.tenant_id, "Tenant store handle closed");
        }
    }

    pub async fn is_closed(&self) -> bool {
        self.state.read().await.closed
    }

    fn ensure_open(&self, state: &StoreState) -> Result<(), AuditError> {
        if state.closed {
            return Err(AuditError::StorageUnavailable(format!(
                "store for tenant '{}' has been closed",
                self.tenant_id
            )));
        }
        Ok(())
    }
}
