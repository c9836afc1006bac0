// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Domain layer: value objects, aggregates and persistence contracts.

pub mod audit_event;
pub mod config;
pub mod error;
pub mod events;
pub mod integrity;
pub mod query;
pub mod repository;
pub mod tenant;

pub use audit_event::{AuditEvent, EventId, IndexKind, NewAuditEvent};
pub use error::AuditError;
pub use integrity::{ErrorDescriptor, IntegrityErrorKind, IntegrityReport};
pub use query::{EventQuery, FieldPredicate};
pub use tenant::TenantId;
