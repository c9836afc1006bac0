// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # `tenant-audit-core` — Per-Tenant Audit Log
//!
//! Records every security-relevant action into an append-only log scoped to
//! the acting tenant, keeps derived action/accessor indexes fresh on append,
//! and reconciles the tenant directory against the platform replica and the
//! set of live tenant stores.
//!
//! ## Crate Layout
//!
//! | Module | Layer | Contents |
//! |--------|-------|----------|
//! | [`domain`] | Domain | `AuditEvent`, `TenantId`, `EventQuery`, `IntegrityReport`, repository traits |
//! | [`application`] | Application | `TenantStore`, `StoreRegistry`, `IntegrityChecker`, `AuditService` |
//! | [`infrastructure`] | Infrastructure | `BoundedCollector`, `EventBus`, in-memory and sled repositories |

pub mod domain;
pub mod application;
pub mod infrastructure;

pub use domain::*;
