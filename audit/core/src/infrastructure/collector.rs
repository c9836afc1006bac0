// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Bounded Collector
//!
//! Capacity-limited accumulator used while draining a bulk stream before a
//! single downstream write. A session delivers its result exactly once:
//! either the accumulated collection on [`BoundedCollector::close`], or
//! [`CollectorError::Overflow`] at the push that exceeds capacity. Once a
//! session has completed, further pushes and closes change nothing.
//!
//! The output mode is chosen by the accumulation type:
//! [`SequenceCollector`] keeps items in push order, [`KeyedCollector`] builds
//! a map from pushed `(key, value)` pairs.
//!
//! The completion callback runs inline on the completing call. Consumers
//! that want to await the result elsewhere use [`BoundedCollector::channel`].

use std::collections::HashMap;
use std::hash::Hash;

use tokio::sync::oneshot;
use tracing::{debug, warn};

/// Output container of a collector session
pub trait Accumulation: Default + Send {
    type Item;

    fn accumulate(&mut self, item: Self::Item);
}

impl<T: Send> Accumulation for Vec<T> {
    type Item = T;

    fn accumulate(&mut self, item: T) {
        self.push(item);
    }
}

impl<K: Eq + Hash + Send, V: Send> Accumulation for HashMap<K, V> {
    type Item = (K, V);

    fn accumulate(&mut self, (key, value): (K, V)) {
        self.insert(key, value);
    }
}

pub type SequenceCollector<T> = BoundedCollector<Vec<T>>;
pub type KeyedCollector<K, V> = BoundedCollector<HashMap<K, V>>;

type Completion<A> = Box<dyn FnOnce(Result<A, CollectorError>) + Send>;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CollectorError {
    #[error("collector capacity of {capacity} items exceeded")]
    Overflow { capacity: usize },

    /// The session already delivered its result
    #[error("collector session already completed")]
    Finished,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollectorState {
    Open,
    Completed,
    Failed,
}

pub struct BoundedCollector<A: Accumulation> {
    capacity: usize,
    pushed: usize,
    accumulated: A,
    state: CollectorState,
    on_complete: Option<Completion<A>>,
}

impl<A: Accumulation> BoundedCollector<A> {
    pub fn new<F>(capacity: usize, on_complete: F) -> Self
    where
        F: FnOnce(Result<A, CollectorError>) + Send + 'static,
    {
        Self {
            capacity,
            pushed: 0,
            accumulated: A::default(),
            state: CollectorState::Open,
            on_complete: Some(Box::new(on_complete)),
        }
    }

    /// Collector whose single result is delivered through a oneshot channel.
    pub fn channel(capacity: usize) -> (Self, oneshot::Receiver<Result<A, CollectorError>>)
    where
        A: 'static,
    {
        let (tx, rx) = oneshot::channel();
        let collector = Self::new(capacity, move |result| {
            // The consumer may have given up on the session
            let _ = tx.send(result);
        });
        (collector, rx)
    }

    /// Add one item. Fails synchronously with `Overflow` when the item would
    /// exceed capacity; the partial accumulation is discarded.
    pub fn push(&mut self, item: A::Item) -> Result<(), CollectorError> {
        if self.state != CollectorState::Open {
            return Err(CollectorError::Finished);
        }
        if self.pushed >= self.capacity {
            warn!(capacity = self.capacity, "Bounded collector overflow, discarding accumulation");
            metrics::counter!("tenant_audit_collector_overflows_total").increment(1);
            self.state = CollectorState::Failed;
            self.accumulated = A::default();
            let error = CollectorError::Overflow { capacity: self.capacity };
            self.complete(Err(error.clone()));
            return Err(error);
        }
        self.accumulated.accumulate(item);
        self.pushed += 1;
        Ok(())
    }

    /// End the session, delivering the accumulated result.
    pub fn close(&mut self) -> Result<(), CollectorError> {
        if self.state != CollectorState::Open {
            return Err(CollectorError::Finished);
        }
        debug!(items = self.pushed, capacity = self.capacity, "Bounded collector closed");
        self.state = CollectorState::Completed;
        let accumulated = std::mem::take(&mut self.accumulated);
        self.complete(Ok(accumulated));
        Ok(())
    }

    fn complete(&mut self, result: Result<A, CollectorError>) {
        if let Some(on_complete) = self.on_complete.take() {
            on_complete(result);
        }
    }

    pub fn state(&self) -> CollectorState {
        self.state
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Items pushed so far in this session
    pub fn len(&self) -> usize {
        self.pushed
    }

    pub fn is_empty(&self) -> bool {
        self.pushed == 0
    }
}
