// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

pub mod collector;
pub mod event_bus;
pub mod repositories;

pub use collector::{BoundedCollector, CollectorError, KeyedCollector, SequenceCollector};
pub use event_bus::{DomainEvent, EventBus, EventBusError};
