// Copyright (c) 2025 - Cowboy AI, Inc.
//! Event-sourced command side of an identity and access management core
//!
//! Every mutating operation follows one shape: rebuild a write model from
//! the filtered event log, validate the request against it, push the
//! resulting events with optimistic concurrency guards, then advance the
//! write model from what was persisted.
//!
//! # Modules
//!
//! - [`events`] - aggregates, event payloads, pending and stored events
//! - [`event_store`] - search queries, guarded pushes, the in-memory log
//! - [`aggregate`] - write models and append-and-reduce
//! - [`state_machine`] - entity lifecycle and auth request flow
//! - [`domain`] - policy settings, invariants, object details
//! - [`service`] - the [`Commands`] entry points and the cascade coordinator
//! - [`adapters`] - permission, lookup, asset, crypto and id collaborators
//! - [`config`], [`context`], [`errors`], [`telemetry`] - ambient concerns

pub mod adapters;
pub mod aggregate;
pub mod config;
pub mod context;
pub mod domain;
pub mod errors;
pub mod event_store;
pub mod events;
pub mod service;
pub mod state_machine;
pub mod telemetry;

// Re-export commonly used types
pub use aggregate::{PolicyScope, WriteModel};
pub use config::CommandConfig;
pub use context::CommandContext;
pub use domain::ObjectDetails;
pub use errors::{CommandError, CommandResult, ErrorKind};
pub use event_store::{EventStore, InMemoryEventStore};
pub use service::{Collaborators, Commands};
