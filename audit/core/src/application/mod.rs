// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

pub mod audit_service;
pub mod integrity_checker;
pub mod provisioning;
pub mod repository_factory;
pub mod store_registry;
pub mod tenant_store;

pub use audit_service::AuditService;
pub use integrity_checker::IntegrityChecker;
pub use provisioning::{ProvisionRequest, TenantProvisioningService};
pub use repository_factory::{create_repositories, Repositories};
pub use store_registry::StoreRegistry;
pub use tenant_store::{DerivedIndexes, TenantStore};
