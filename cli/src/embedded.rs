// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! In-process audit runtime
//!
//! Loads configuration, opens the configured storage backend and wires the
//! core services together for one CLI invocation.

use anyhow::{Context, Result};
use std::path::PathBuf;
use std::sync::Arc;

use tenant_audit_core::{
    application::{
        create_repositories, AuditService, IntegrityChecker, StoreRegistry,
        TenantProvisioningService,
    },
    domain::config::AuditConfig,
    infrastructure::event_bus::EventBus,
};

pub struct AuditRuntime {
    pub config: AuditConfig,
    pub audit: AuditService,
    pub provisioning: TenantProvisioningService,
}

impl AuditRuntime {
    pub fn new(config_path: Option<PathBuf>) -> Result<Self> {
        let config = AuditConfig::load_or_default(config_path)
            .context("Failed to load configuration")?;
        Self::from_config(config)
    }

    pub fn from_config(config: AuditConfig) -> Result<Self> {
        config
            .validate()
            .context("Configuration validation failed")?;

        let repos = create_repositories(&config.storage_backend())
            .context("Failed to open audit storage")?;
        let event_bus = Arc::new(EventBus::new(config.event_bus.capacity));
        let registry = Arc::new(StoreRegistry::new(repos.provider.clone()));
        let checker = Arc::new(
            IntegrityChecker::new(repos.directory.clone(), repos.platform.clone(), event_bus.clone())
                .with_storage(registry.clone()),
        );

        let provisioning = TenantProvisioningService::new(
            repos.directory.clone(),
            repos.platform.clone(),
            registry.clone(),
            event_bus.clone(),
        );
        let audit = AuditService::new(
            repos.directory,
            registry,
            checker,
            event_bus,
            config.ingestion.max_batch_size,
        );

        Ok(Self {
            config,
            audit,
            provisioning,
        })
    }

    /// Flush storage before the process exits
    pub async fn shutdown(self) -> Result<()> {
        self.audit
            .shutdown()
            .await
            .context("Failed to flush audit storage")
    }
}
