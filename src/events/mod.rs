// Copyright (c) 2025 - Cowboy AI, Inc.
//! IAM Domain Events
//!
//! An event is an immutable fact recorded against one aggregate. Commands
//! build [`PendingEvent`]s; the event store persists them and hands back
//! [`StoredEvent`]s carrying the assigned sequence, global position and
//! timestamp.
//!
//! # Event Sourcing Principles
//!
//! 1. **Events are immutable**: once persisted they never change
//! 2. **Events are past tense**: `MemberAdded`, not `AddMember`
//! 3. **Removal is an event**: nothing is ever deleted from the log
//! 4. **Unknown is harmless**: event types newer than this build decode to
//!    [`EventPayload::Unknown`] and every reducer skips them
//!
//! # Aggregate Hierarchy
//!
//! ```text
//! Instance ⊃ Org ⊃ Project ⊃ {Role, Grant}
//!               ⊃ Group
//!               ⊃ {UserGrant, GroupGrant}
//! Instance ⊃ AuthRequest → OidcSession
//! Instance ⊃ SamlRequest
//! ```
//!
//! # Module Organization
//!
//! - [`payload`] - the [`EventPayload`] sum type and event type names
//! - [`policy`] - label, password, privacy, mail template and custom text events
//! - [`member`] - membership events shared by orgs and projects
//! - [`project`] - project, role and project grant events
//! - [`user_grant`] - user grant events
//! - [`group`] - group and group grant events
//! - [`oidc`] - auth request and OIDC session events
//! - [`saml`] - SAML request events

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub mod group;
pub mod member;
pub mod oidc;
pub mod payload;
pub mod policy;
pub mod project;
pub mod saml;
pub mod user_grant;

pub use payload::{event_types, EventPayload};

/// Kind of aggregate an event belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AggregateType {
    Instance,
    Org,
    Project,
    UserGrant,
    Group,
    GroupGrant,
    AuthRequest,
    OidcSession,
    SamlRequest,
}

impl fmt::Display for AggregateType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AggregateType::Instance => "instance",
            AggregateType::Org => "org",
            AggregateType::Project => "project",
            AggregateType::UserGrant => "user_grant",
            AggregateType::Group => "group",
            AggregateType::GroupGrant => "group_grant",
            AggregateType::AuthRequest => "auth_request",
            AggregateType::OidcSession => "oidc_session",
            AggregateType::SamlRequest => "saml_request",
        };
        f.write_str(name)
    }
}

/// Identity of the aggregate an event is recorded against
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Aggregate {
    pub id: String,
    pub aggregate_type: AggregateType,
    /// Organization (or instance) owning the aggregate
    pub resource_owner: String,
    pub instance_id: String,
}

impl Aggregate {
    pub fn new(
        aggregate_type: AggregateType,
        id: impl Into<String>,
        resource_owner: impl Into<String>,
        instance_id: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            aggregate_type,
            resource_owner: resource_owner.into(),
            instance_id: instance_id.into(),
        }
    }
}

/// Payload for events that carry no data
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct EmptyPayload {}

/// Event built by a command, not yet persisted
#[derive(Debug, Clone, PartialEq)]
pub struct PendingEvent {
    pub aggregate: Aggregate,
    /// Acting user
    pub creator: String,
    pub payload: EventPayload,
}

impl PendingEvent {
    pub fn new(aggregate: Aggregate, creator: impl Into<String>, payload: EventPayload) -> Self {
        Self {
            aggregate,
            creator: creator.into(),
            payload,
        }
    }
}

/// Event as persisted by the event store
#[derive(Debug, Clone, PartialEq)]
pub struct StoredEvent {
    pub aggregate: Aggregate,
    /// Strictly increasing per aggregate, starting at 1
    pub sequence: u64,
    /// Strictly increasing across the whole log
    pub position: u64,
    pub created_at: DateTime<Utc>,
    pub creator: String,
    /// Type name as stored, kept even when the payload is unknown
    pub event_type: String,
    pub payload: EventPayload,
}
