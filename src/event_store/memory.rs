// Copyright (c) 2025 - Cowboy AI, Inc.
//! In-memory event store
//!
//! Keeps the log as encoded `(event type, JSON)` rows behind a single
//! [`tokio::sync::RwLock`]. Every push runs its constraint check, guard
//! check and append under one write lock, which makes batches atomic and
//! serializes concurrent writers the way a transactional log would.
//! Payloads go through the same encode/decode path a durable store uses,
//! so unknown event types behave identically.

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use tracing::{debug, warn};

use super::{ConstraintAction, EventStore, PushBatch, SearchQuery, StoreError};
use crate::events::{Aggregate, AggregateType, EventPayload, StoredEvent};

#[derive(Debug, Clone)]
struct Row {
    aggregate: Aggregate,
    sequence: u64,
    position: u64,
    created_at: DateTime<Utc>,
    creator: String,
    event_type: String,
    data: serde_json::Value,
}

impl Row {
    fn decode(&self) -> Result<StoredEvent, StoreError> {
        Ok(StoredEvent {
            aggregate: self.aggregate.clone(),
            sequence: self.sequence,
            position: self.position,
            created_at: self.created_at,
            creator: self.creator.clone(),
            event_type: self.event_type.clone(),
            payload: EventPayload::decode(&self.event_type, self.data.clone())?,
        })
    }
}

type AggregateKey = (String, AggregateType, String);
type ConstraintKey = (String, &'static str, String);

#[derive(Debug, Default)]
struct Log {
    rows: Vec<Row>,
    sequences: HashMap<AggregateKey, u64>,
    constraints: HashSet<ConstraintKey>,
}

impl Log {
    fn next_position(&self) -> u64 {
        self.rows.last().map_or(1, |row| row.position + 1)
    }
}

/// Event store holding the whole log in process memory
#[derive(Debug, Default)]
pub struct InMemoryEventStore {
    log: RwLock<Log>,
}

impl InMemoryEventStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of persisted events
    pub async fn len(&self) -> usize {
        self.log.read().await.rows.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Position of the newest event, 0 for an empty log
    pub async fn latest_position(&self) -> u64 {
        self.log.read().await.rows.last().map_or(0, |row| row.position)
    }
}

#[async_trait]
impl EventStore for InMemoryEventStore {
    async fn filter(&self, query: &SearchQuery) -> Result<Vec<StoredEvent>, StoreError> {
        let log = self.log.read().await;
        log.rows
            .iter()
            .filter(|row| query.matches(&row.aggregate, &row.event_type, row.position))
            .map(Row::decode)
            .collect()
    }

    async fn push(&self, batch: PushBatch) -> Result<Vec<StoredEvent>, StoreError> {
        // Encode before taking the lock; a bad payload never blocks writers.
        let mut encoded = Vec::with_capacity(batch.events.len());
        for event in &batch.events {
            let event_type = event
                .payload
                .event_type()
                .ok_or(StoreError::UnknownEventType)?;
            encoded.push((event, event_type, event.payload.encode()?));
        }

        let mut log = self.log.write().await;

        // Constraints first: a duplicate add reports the business error even
        // when the same writer would also lose on a guard.
        let mut staged: Vec<(ConstraintKey, bool)> = Vec::new();
        for constraint in &batch.constraints {
            let key = (
                constraint.instance_id.clone(),
                constraint.table,
                constraint.key.clone(),
            );
            let present = staged
                .iter()
                .rev()
                .find(|(staged_key, _)| *staged_key == key)
                .map_or_else(|| log.constraints.contains(&key), |(_, present)| *present);
            match constraint.action {
                ConstraintAction::Add if present => {
                    warn!(table = constraint.table, key = %constraint.key, "unique constraint violated");
                    return Err(StoreError::UniqueConstraintViolated {
                        table: constraint.table,
                        key: constraint.key.clone(),
                        error_key: constraint.error_key,
                    });
                }
                ConstraintAction::Add => staged.push((key, true)),
                ConstraintAction::Release => staged.push((key, false)),
            }
        }

        for guard in &batch.guards {
            let newer = log
                .rows
                .iter()
                .rev()
                .take_while(|row| row.position > guard.position)
                .find(|row| guard.query.matches(&row.aggregate, &row.event_type, row.position));
            if let Some(row) = newer {
                warn!(
                    expected = guard.position,
                    position = row.position,
                    aggregate_id = %row.aggregate.id,
                    "push rejected by concurrency guard"
                );
                return Err(StoreError::Conflict {
                    expected: guard.position,
                    position: row.position,
                });
            }
        }

        let created_at = Utc::now();
        let mut position = log.next_position();
        let mut persisted = Vec::with_capacity(encoded.len());
        for (event, event_type, data) in encoded {
            let aggregate_key = (
                event.aggregate.instance_id.clone(),
                event.aggregate.aggregate_type,
                event.aggregate.id.clone(),
            );
            let sequence = log.sequences.entry(aggregate_key).or_insert(0);
            *sequence += 1;

            let row = Row {
                aggregate: event.aggregate.clone(),
                sequence: *sequence,
                position,
                created_at,
                creator: event.creator.clone(),
                event_type: event_type.to_string(),
                data,
            };
            persisted.push(StoredEvent {
                aggregate: row.aggregate.clone(),
                sequence: row.sequence,
                position,
                created_at,
                creator: row.creator.clone(),
                event_type: row.event_type.clone(),
                payload: event.payload.clone(),
            });
            log.rows.push(row);
            position += 1;
        }

        for (key, present) in staged {
            if present {
                log.constraints.insert(key);
            } else {
                log.constraints.remove(&key);
            }
        }

        debug!(
            events = persisted.len(),
            guards = batch.guards.len(),
            constraints = batch.constraints.len(),
            "pushed batch"
        );
        Ok(persisted)
    }
}
