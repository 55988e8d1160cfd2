// Copyright (c) 2025 - Cowboy AI, Inc.
//! Success payload shared by all mutating commands

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Owning resource, identifier and version of the state a command produced
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ObjectDetails {
    pub resource_owner: String,
    pub aggregate_id: String,
    /// Sequence of the last event folded into the write model
    pub sequence: u64,
    pub event_date: Option<DateTime<Utc>>,
}
