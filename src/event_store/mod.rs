// Copyright (c) 2025 - Cowboy AI, Inc.
//! Event Store Abstraction
//!
//! The event log is the only shared mutable resource of the command layer.
//! Commands talk to it through two operations:
//!
//! - [`EventStore::filter`] returns the events matching a [`SearchQuery`],
//!   ordered by position.
//! - [`EventStore::push`] appends a [`PushBatch`] atomically.
//!
//! # Architecture
//!
//! ```text
//! Command → Write Model ──query──→ EventStore::filter
//!    ↓           ↓ guard
//! PushBatch { events, guards, unique constraints } → EventStore::push
//!                                                       ↓
//!                                            StoredEvent (sequence, position)
//! ```
//!
//! # Push Semantics
//!
//! 1. **Unique constraints** are checked first; a violation rejects the
//!    batch with [`StoreError::UniqueConstraintViolated`].
//! 2. **Guards** are checked next: a guard `(query, position)` rejects the
//!    batch with [`StoreError::Conflict`] if any event matching `query` was
//!    persisted after `position`.
//! 3. **All or nothing**: events of every aggregate in the batch become
//!    visible together, or none do.
//!
//! The store never retries; callers decide whether to reload and try again.

use async_trait::async_trait;
use thiserror::Error;

use crate::errors::CommandError;
use crate::events::{PendingEvent, StoredEvent};

pub mod memory;
pub mod query;

pub use memory::InMemoryEventStore;
pub use query::{AggregateFilter, SearchQuery};

/// Event store errors
#[derive(Debug, Error)]
pub enum StoreError {
    /// A guarded query has a newer event than the writer observed
    #[error("Concurrent modification: event at position {position} is newer than {expected}")]
    Conflict { expected: u64, position: u64 },

    /// A unique constraint added by the batch already exists
    #[error("Unique constraint {table}/{key} already exists")]
    UniqueConstraintViolated {
        table: &'static str,
        key: String,
        error_key: &'static str,
    },

    /// A pending event carries no known payload
    #[error("Event has no known type")]
    UnknownEventType,

    /// Payload encoding or decoding failed
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Backing storage is not reachable
    #[error("Event store unavailable: {0}")]
    Unavailable(String),

    /// The caller's deadline passed before the operation completed
    #[error("Deadline exceeded")]
    DeadlineExceeded,
}

impl From<StoreError> for CommandError {
    fn from(err: StoreError) -> Self {
        let mapped = match &err {
            StoreError::Conflict { .. } => {
                CommandError::aborted("STORE-2ks9f", "Errors.Eventstore.Conflict")
            }
            StoreError::UniqueConstraintViolated { error_key, .. } => {
                CommandError::already_exists("STORE-8fk3s", *error_key)
            }
            StoreError::DeadlineExceeded => {
                CommandError::aborted("STORE-0rd2d", "Errors.Context.DeadlineExceeded")
            }
            StoreError::UnknownEventType
            | StoreError::Serialization(_)
            | StoreError::Unavailable(_) => {
                CommandError::internal("STORE-j3k0s", "Errors.Internal")
            }
        };
        mapped.with_source(err)
    }
}

/// Optimistic concurrency condition attached to a push
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Guard {
    pub query: SearchQuery,
    /// Last position the writer observed for `query`
    pub position: u64,
}

impl Guard {
    pub fn new(query: SearchQuery, position: u64) -> Self {
        Self { query, position }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConstraintAction {
    Add,
    Release,
}

/// Uniqueness reservation maintained atomically with a push
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UniqueConstraint {
    pub instance_id: String,
    pub table: &'static str,
    pub key: String,
    pub action: ConstraintAction,
    /// Message key reported when an add collides
    pub error_key: &'static str,
}

impl UniqueConstraint {
    pub fn add(
        instance_id: impl Into<String>,
        table: &'static str,
        key: impl Into<String>,
        error_key: &'static str,
    ) -> Self {
        Self {
            instance_id: instance_id.into(),
            table,
            key: key.into(),
            action: ConstraintAction::Add,
            error_key,
        }
    }

    pub fn release(instance_id: impl Into<String>, table: &'static str, key: impl Into<String>) -> Self {
        Self {
            instance_id: instance_id.into(),
            table,
            key: key.into(),
            action: ConstraintAction::Release,
            error_key: "",
        }
    }
}

/// Events, guards and constraints appended atomically
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PushBatch {
    pub events: Vec<PendingEvent>,
    pub guards: Vec<Guard>,
    pub constraints: Vec<UniqueConstraint>,
}

impl PushBatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn event(mut self, event: PendingEvent) -> Self {
        self.events.push(event);
        self
    }

    pub fn events(mut self, events: impl IntoIterator<Item = PendingEvent>) -> Self {
        self.events.extend(events);
        self
    }

    pub fn guard(mut self, guard: Guard) -> Self {
        self.guards.push(guard);
        self
    }

    pub fn constraint(mut self, constraint: UniqueConstraint) -> Self {
        self.constraints.push(constraint);
        self
    }

    /// Append everything from `other` after this batch's content
    pub fn merge(mut self, other: PushBatch) -> Self {
        self.events.extend(other.events);
        self.guards.extend(other.guards);
        self.constraints.extend(other.constraints);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

/// Event Store trait for filtering and appending domain events
///
/// Implementations must ensure:
///
/// - **Atomicity**: a batch is appended completely or not at all
/// - **Ordering**: `sequence` increases per aggregate, `position` across the log
/// - **Conditional append**: guards and unique constraints are evaluated
///   against the same log state the batch is appended to
#[async_trait]
pub trait EventStore: Send + Sync {
    /// Read the events matching `query`
    ///
    /// # Returns
    ///
    /// Matching events in ascending position order; an empty vector when
    /// nothing matches.
    ///
    /// # Errors
    ///
    /// - `Unavailable` if the log cannot be read
    /// - `Serialization` if a stored payload of a known type is malformed
    async fn filter(&self, query: &SearchQuery) -> Result<Vec<StoredEvent>, StoreError>;

    /// Append a batch of events
    ///
    /// # Returns
    ///
    /// The persisted events, in batch order, with sequence, position and
    /// timestamp assigned.
    ///
    /// # Errors
    ///
    /// - `UniqueConstraintViolated` if an added constraint already exists
    /// - `Conflict` if a guard's query has newer events
    /// - `UnknownEventType` / `Serialization` if an event cannot be encoded
    async fn push(&self, batch: PushBatch) -> Result<Vec<StoredEvent>, StoreError>;
}
