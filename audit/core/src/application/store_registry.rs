// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Store Registry
//!
//! Explicitly constructed cache of open [`TenantStore`]s. Callers hold an
//! `Arc<StoreRegistry>`; there is no process-wide instance.
//!
//! Lifecycle: [`StoreRegistry::new`] → any number of `for_tenant` /
//! `close` calls → [`StoreRegistry::shutdown`]. After shutdown every
//! lookup fails with `AuditError::StorageUnavailable`.
//!
//! First access to a tenant is single-flight: each tenant has one
//! `OnceCell`, and concurrent callers await the same initialization. A
//! failed initialization leaves the cell empty so the next call retries.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::OnceCell;
use tracing::{debug, info};

use crate::application::tenant_store::TenantStore;
use crate::domain::error::AuditError;
use crate::domain::repository::{CollectionProvider, OpenMode};
use crate::domain::tenant::TenantId;

type StoreCell = Arc<OnceCell<Arc<TenantStore>>>;

pub struct StoreRegistry {
    provider: Arc<dyn CollectionProvider>,
    stores: DashMap<TenantId, StoreCell>,
    shut_down: AtomicBool,
}

impl StoreRegistry {
    pub fn new(provider: Arc<dyn CollectionProvider>) -> Self {
        Self {
            provider,
            stores: DashMap::new(),
            shut_down: AtomicBool::new(false),
        }
    }

    pub fn provider(&self) -> &Arc<dyn CollectionProvider> {
        &self.provider
    }

    /// Store for `tenant_id`, creating its collection on first use.
    pub async fn for_tenant(&self, tenant_id: &TenantId) -> Result<Arc<TenantStore>, AuditError> {
        self.acquire(tenant_id, OpenMode::CreateIfMissing).await
    }

    /// Store for `tenant_id` only if its collection already exists in
    /// storage; `AuditError::NotFound` otherwise.
    pub async fn open_existing(&self, tenant_id: &TenantId) -> Result<Arc<TenantStore>, AuditError> {
        self.acquire(tenant_id, OpenMode::MustExist).await
    }

    async fn acquire(&self, tenant_id: &TenantId, mode: OpenMode) -> Result<Arc<TenantStore>, AuditError> {
        self.ensure_running()?;

        // Clone the cell out so no map guard is held across the await
        let cell = self.stores.entry(tenant_id.clone()).or_default().clone();

        let store = cell
            .get_or_try_init(|| async {
                debug!(tenant_id = %tenant_id, ?mode, "Opening tenant collection");
                let collection = self.provider.open(tenant_id, mode).await?;
                let store = TenantStore::open(tenant_id.clone(), collection).await?;
                Ok::<_, AuditError>(Arc::new(store))
            })
            .await?;

        Ok(store.clone())
    }

    /// Evict and close a tenant's cached store. The next `for_tenant`
    /// re-opens it.
    ///
    /// Handles already held by callers are closed too: once this returns,
    /// no append through them is in flight and later ones fail with
    /// `AuditError::StorageUnavailable`.
    pub async fn close(&self, tenant_id: &TenantId) -> bool {
        let store = self
            .stores
            .remove(tenant_id)
            .and_then(|(_, cell)| cell.get().cloned());
        match store {
            Some(store) => {
                store.close().await;
                debug!(tenant_id = %tenant_id, "Closed tenant store");
                true
            }
            None => false,
        }
    }

    /// Tenants with an open, cached store
    pub fn live_tenants(&self) -> Vec<TenantId> {
        let mut tenants: Vec<TenantId> = self
            .stores
            .iter()
            .filter(|entry| entry.value().initialized())
            .map(|entry| entry.key().clone())
            .collect();
        tenants.sort();
        tenants
    }

    /// Evict every store and flush the provider. Irreversible.
    pub async fn shutdown(&self) -> Result<(), AuditError> {
        if self.shut_down.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        let cells: Vec<StoreCell> = self.stores.iter().map(|entry| entry.value().clone()).collect();
        self.stores.clear();
        let mut live = 0;
        for store in cells.iter().filter_map(|cell| cell.get()) {
            store.close().await;
            live += 1;
        }
        self.provider.flush().await?;
        info!(stores_closed = live, "Store registry shut down");
        Ok(())
    }

    pub fn is_shut_down(&self) -> bool {
        self.shut_down.load(Ordering::SeqCst)
    }

    fn ensure_running(&self) -> Result<(), AuditError> {
        if self.is_shut_down() {
            return Err(AuditError::StorageUnavailable(
                "store registry has been shut down".to_string(),
            ));
        }
        Ok(())
    }
}
