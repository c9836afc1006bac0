// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Domain events published on the in-process event bus.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::audit_event::EventId;
use crate::domain::tenant::TenantId;

/// Tenant lifecycle events
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum TenantEvent {
    Provisioned {
        tenant_id: TenantId,
        provisioned_at: DateTime<Utc>,
    },
    Deprovisioned {
        tenant_id: TenantId,
        events_dropped: bool,
        deprovisioned_at: DateTime<Utc>,
    },
    /// A provisioning attempt failed and its applied steps were undone
    ProvisioningRolledBack {
        tenant_id: TenantId,
        reason: String,
        rolled_back_at: DateTime<Utc>,
    },
}

impl TenantEvent {
    pub fn tenant_id(&self) -> &TenantId {
        match self {
            TenantEvent::Provisioned { tenant_id, .. }
            | TenantEvent::Deprovisioned { tenant_id, .. }
            | TenantEvent::ProvisioningRolledBack { tenant_id, .. } => tenant_id,
        }
    }
}

/// An audit event was appended to a tenant's store
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEventRecorded {
    pub tenant_id: TenantId,
    pub event_id: EventId,
    pub event_type: String,
    pub recorded_at: DateTime<Utc>,
}

/// An integrity check finished (successfully, whatever it found)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IntegrityCheckCompleted {
    pub error_count: usize,
    pub completed_at: DateTime<Utc>,
}
