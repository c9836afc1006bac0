// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Audit Event
//!
//! An `AuditEvent` records who (`createdBy`) did what (`type`, `content`) and
//! carries a list of stream tags. Two tag families feed the derived indexes:
//! `action-<name>` and `access-<accessor>`; the remaining tags are opaque
//! classification labels.
//!
//! Events are immutable once stored. [`NewAuditEvent`] is the unvalidated
//! input; the storage layer turns it into an [`AuditEvent`] by assigning an
//! identifier and a timestamp.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::error::AuditError;

/// Storage-assigned identifier of an audit event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventId(pub Uuid);

impl EventId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for EventId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for EventId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// Derived index kinds
// ============================================================================

/// Secondary indexes derived from stream tags.
///
/// Adding a kind here makes every index maintenance path handle it, since
/// they iterate [`IndexKind::ALL`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IndexKind {
    /// `action-<name>` tags: the action performed
    Action,
    /// `access-<accessor>` tags: the accessor involved
    Access,
}

impl IndexKind {
    pub const ALL: [IndexKind; 2] = [IndexKind::Action, IndexKind::Access];

    pub fn prefix(self) -> &'static str {
        match self {
            IndexKind::Action => "action-",
            IndexKind::Access => "access-",
        }
    }

    /// Extract the indexed value from a stream tag, if the tag belongs to
    /// this kind. A bare prefix with an empty suffix is not indexed.
    pub fn extract(self, tag: &str) -> Option<&str> {
        tag.strip_prefix(self.prefix()).filter(|value| !value.is_empty())
    }

    /// Build the stream tag for a value of this kind.
    pub fn tag(self, value: &str) -> String {
        format!("{}{}", self.prefix(), value)
    }
}

// ============================================================================
// Events
// ============================================================================

/// Unvalidated audit event as submitted by the ingress layer.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewAuditEvent {
    #[serde(rename = "type", default)]
    pub event_type: String,
    #[serde(default)]
    pub created_by: String,
    #[serde(default)]
    pub stream_ids: Vec<String>,
    #[serde(default = "empty_content")]
    pub content: serde_json::Value,
}

fn empty_content() -> serde_json::Value {
    serde_json::Value::Object(serde_json::Map::new())
}

impl NewAuditEvent {
    pub fn new(event_type: impl Into<String>, created_by: impl Into<String>) -> Self {
        Self {
            event_type: event_type.into(),
            created_by: created_by.into(),
            stream_ids: Vec::new(),
            content: empty_content(),
        }
    }

    pub fn with_stream_ids<I, S>(mut self, stream_ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.stream_ids = stream_ids.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_content(mut self, content: serde_json::Value) -> Self {
        self.content = content;
        self
    }

    /// Check required fields and normalize the event.
    ///
    /// `type` and `createdBy` must be non-blank, `content` must be a JSON
    /// object (`null` is read as an empty object) and duplicate stream tags
    /// are collapsed, keeping the first occurrence.
    pub fn validate(mut self) -> Result<Self, AuditError> {
        if self.event_type.trim().is_empty() {
            return Err(AuditError::Validation("event 'type' is required".to_string()));
        }
        if self.created_by.trim().is_empty() {
            return Err(AuditError::Validation("event 'createdBy' is required".to_string()));
        }
        match self.content {
            serde_json::Value::Object(_) => {}
            serde_json::Value::Null => self.content = empty_content(),
            _ => {
                return Err(AuditError::Validation(
                    "event 'content' must be an object".to_string(),
                ))
            }
        }

        let mut seen = std::collections::HashSet::new();
        self.stream_ids.retain(|tag| seen.insert(tag.clone()));
        Ok(self)
    }

    /// Turn the input into a stored event with the given identity.
    pub fn into_stored(self, id: EventId, time: DateTime<Utc>) -> AuditEvent {
        AuditEvent {
            id,
            time,
            event_type: self.event_type,
            created_by: self.created_by,
            stream_ids: self.stream_ids,
            content: self.content,
        }
    }
}

/// A stored, immutable audit event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditEvent {
    pub id: EventId,
    pub time: DateTime<Utc>,
    #[serde(rename = "type")]
    pub event_type: String,
    pub created_by: String,
    pub stream_ids: Vec<String>,
    pub content: serde_json::Value,
}

impl AuditEvent {
    /// Values this event contributes to the given index.
    pub fn index_values(&self, kind: IndexKind) -> impl Iterator<Item = &str> + '_ {
        self.stream_ids.iter().filter_map(move |tag| kind.extract(tag))
    }
}
