// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Conjunctive field-equality queries over audit events.
//!
//! A field path is dotted. `type`, `createdBy`, `id` and `time` address the
//! top-level fields; `content` or `content.<path>` address the payload; any
//! other path is resolved inside `content`. `streamIds` is not queryable here,
//! tag membership is served by the derived indexes.

use std::borrow::Cow;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::domain::audit_event::AuditEvent;
use crate::domain::error::AuditError;

/// One `field == value` test
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldPredicate {
    pub field: String,
    pub value: Value,
}

impl FieldPredicate {
    pub fn new(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            field: field.into(),
            value: value.into(),
        }
    }

    fn resolve<'a>(&self, event: &'a AuditEvent) -> Option<Cow<'a, Value>> {
        match self.field.as_str() {
            "type" => Some(Cow::Owned(Value::String(event.event_type.clone()))),
            "createdBy" => Some(Cow::Owned(Value::String(event.created_by.clone()))),
            "id" => Some(Cow::Owned(Value::String(event.id.to_string()))),
            "time" => serde_json::to_value(event.time).ok().map(Cow::Owned),
            "content" => Some(Cow::Borrowed(&event.content)),
            path => {
                let path = path.strip_prefix("content.").unwrap_or(path);
                path.split('.')
                    .try_fold(&event.content, |node, segment| node.get(segment))
                    .map(Cow::Borrowed)
            }
        }
    }

    pub fn matches(&self, event: &AuditEvent) -> bool {
        self.resolve(event)
            .map(|found| *found == self.value)
            .unwrap_or(false)
    }
}

/// Conjunction of [`FieldPredicate`]s. The empty query matches every event.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EventQuery {
    pub predicates: Vec<FieldPredicate>,
}

impl EventQuery {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn new(predicates: Vec<FieldPredicate>) -> Self {
        Self { predicates }
    }

    pub fn field(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.predicates.push(FieldPredicate::new(field, value));
        self
    }

    /// Reject empty paths and predicates on `streamIds`.
    pub fn validate(&self) -> Result<(), AuditError> {
        for predicate in &self.predicates {
            if predicate.field.is_empty() || predicate.field.split('.').any(str::is_empty) {
                return Err(AuditError::Validation(format!(
                    "invalid field path '{}'",
                    predicate.field
                )));
            }
            if predicate.field == "streamIds" || predicate.field.starts_with("streamIds.") {
                return Err(AuditError::Validation(
                    "streamIds cannot be queried by equality; use the action/access indexes"
                        .to_string(),
                ));
            }
        }
        Ok(())
    }

    pub fn matches(&self, event: &AuditEvent) -> bool {
        self.predicates.iter().all(|p| p.matches(event))
    }
}
