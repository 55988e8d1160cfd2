// Copyright (c) 2025 - Cowboy AI, Inc.
//! Write Models
//!
//! A write model is the per-request, in-memory projection of one aggregate
//! (or one sub-entity inside an aggregate) that a command validates against.
//!
//! # Lifecycle
//!
//! ```text
//! new(ids) ──query()──→ EventStore::filter ──fold()──→ validated by command
//!                                                         ↓ PushBatch (guard())
//!                                  append_and_reduce() ←── persisted events
//! ```
//!
//! Write models are never cached or shared. Concurrency safety comes from
//! the guard each model contributes to the push: the model's own query plus
//! the last position it folded.
//!
//! # Fold Pattern
//!
//! Events are folded strictly in position order. [`WriteModel::fold`] only
//! passes events matching the model's query to [`WriteModel::reduce`], so
//! a batch that also touched other aggregates can be applied verbatim.
//! Reducers must be pure: the same events always give the same fields.
//!
//! # Module Organization
//!
//! - [`label_policy`] - label policy at instance or org scope
//! - [`policy`] - generic settings policies (password, privacy, mail template)
//! - [`custom_text`] - message texts per template and language
//! - [`member`] - org and project memberships
//! - [`project`] - projects, project roles and project grants
//! - [`user_grant`] - user grants
//! - [`group`] - groups and group grants
//! - [`oidc`] - auth requests and OIDC sessions
//! - [`saml`] - SAML requests

use chrono::{DateTime, Utc};

use crate::domain::ObjectDetails;
use crate::errors::{CommandError, CommandResult};
use crate::event_store::{Guard, SearchQuery};
use crate::events::{Aggregate, AggregateType, StoredEvent};

/// Build a "changed" payload holding only fields that differ
macro_rules! diff_fields {
    ($current:expr, $target:expr, $changes:ty { $($field:ident),+ $(,)? }) => {{
        let mut changes = <$changes>::default();
        let mut changed = false;
        $(
            if $current.$field != $target.$field {
                changes.$field = Some($target.$field.clone());
                changed = true;
            }
        )+
        changed.then_some(changes)
    }};
}

/// Overwrite fields present in a "changed" payload
macro_rules! apply_fields {
    ($current:expr, $changes:expr, { $($field:ident),+ $(,)? }) => {
        $(
            if let Some(value) = &$changes.$field {
                $current.$field = value.clone();
            }
        )+
    };
}

pub mod custom_text;
pub mod group;
pub mod label_policy;
pub mod member;
pub mod oidc;
pub mod policy;
pub mod project;
pub mod saml;
pub mod user_grant;

pub use custom_text::CustomTextWriteModel;
pub use group::{GroupGrantWriteModel, GroupWriteModel};
pub use label_policy::{EffectiveLabelPolicy, LabelPolicyWriteModel};
pub use member::{MemberTarget, MemberWriteModel};
pub use oidc::{AuthRequestWriteModel, OidcSessionWriteModel};
pub use policy::{PolicyEvent, PolicySettings, PolicyWriteModel};
pub use project::{
    ProjectGrantRolesWriteModel, ProjectGrantWriteModel, ProjectRoleWriteModel, ProjectWriteModel,
};
pub use saml::SamlRequestWriteModel;
pub use user_grant::UserGrantWriteModel;

/// Fields every write model tracks regardless of shape
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WriteModelRoot {
    pub aggregate_id: String,
    pub resource_owner: String,
    pub instance_id: String,
    /// Sequence of the last folded event, 0 if none
    pub processed_sequence: u64,
    /// Log position of the last folded event, 0 if none
    pub processed_position: u64,
    pub change_date: Option<DateTime<Utc>>,
}

impl WriteModelRoot {
    pub fn new(
        aggregate_id: impl Into<String>,
        resource_owner: impl Into<String>,
        instance_id: impl Into<String>,
    ) -> Self {
        Self {
            aggregate_id: aggregate_id.into(),
            resource_owner: resource_owner.into(),
            instance_id: instance_id.into(),
            ..Self::default()
        }
    }

    fn observe(&mut self, event: &StoredEvent) {
        if self.aggregate_id.is_empty() {
            self.aggregate_id = event.aggregate.id.clone();
        }
        if self.resource_owner.is_empty() {
            self.resource_owner = event.aggregate.resource_owner.clone();
        }
        self.processed_sequence = event.sequence;
        self.processed_position = event.position;
        self.change_date = Some(event.created_at);
    }

    pub fn details(&self) -> ObjectDetails {
        ObjectDetails {
            resource_owner: self.resource_owner.clone(),
            aggregate_id: self.aggregate_id.clone(),
            sequence: self.processed_sequence,
            event_date: self.change_date,
        }
    }
}

/// Per-aggregate-shape accumulator of filtered events
pub trait WriteModel: Send + Sync {
    fn root(&self) -> &WriteModelRoot;

    fn root_mut(&mut self) -> &mut WriteModelRoot;

    /// Events this model is built from
    fn query(&self) -> SearchQuery;

    /// Fold one event; events the model does not care about are ignored
    fn reduce(&mut self, event: &StoredEvent);

    /// Fold every event matching [`WriteModel::query`], in order
    fn fold(&mut self, events: &[StoredEvent]) {
        let query = self.query();
        for event in events.iter().filter(|event| query.matches_event(event)) {
            self.reduce(event);
            self.root_mut().observe(event);
        }
    }

    /// Concurrency guard covering everything this model has observed
    fn guard(&self) -> Guard {
        Guard::new(self.query(), self.root().processed_position)
    }

    fn details(&self) -> ObjectDetails {
        self.root().details()
    }
}

/// Advance a loaded write model with the events a push just persisted
///
/// Produces the same fields a fresh load would. Events of other aggregates
/// in the batch are skipped; an event at or before the model's processed
/// position means the model was not loaded from the log this batch was
/// appended to.
pub fn append_and_reduce<W>(model: &mut W, persisted: &[StoredEvent]) -> CommandResult<()>
where
    W: WriteModel + ?Sized,
{
    let query = model.query();
    let processed = model.root().processed_position;
    if persisted
        .iter()
        .any(|event| event.position <= processed && query.matches_event(event))
    {
        return Err(CommandError::internal(
            "MODEL-8dk2s",
            "Errors.WriteModel.EventsOutOfOrder",
        ));
    }
    model.fold(persisted);
    Ok(())
}

/// Level a policy or custom text lives on
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PolicyScope {
    /// System default of the instance
    Instance,
    /// Override of one organization
    Org(String),
}

impl PolicyScope {
    pub fn aggregate_type(&self) -> AggregateType {
        match self {
            PolicyScope::Instance => AggregateType::Instance,
            PolicyScope::Org(_) => AggregateType::Org,
        }
    }

    pub fn aggregate(&self, instance_id: &str) -> Aggregate {
        match self {
            PolicyScope::Instance => {
                Aggregate::new(AggregateType::Instance, instance_id, instance_id, instance_id)
            }
            PolicyScope::Org(org_id) => {
                Aggregate::new(AggregateType::Org, org_id.as_str(), org_id.as_str(), instance_id)
            }
        }
    }

    /// Prefix of error keys for this scope
    pub fn error_prefix(&self) -> &'static str {
        match self {
            PolicyScope::Instance => "IAM",
            PolicyScope::Org(_) => "Org",
        }
    }

    /// Permission required to write policies of this scope
    pub fn write_permission(&self) -> &'static str {
        match self {
            PolicyScope::Instance => "iam.policy.write",
            PolicyScope::Org(_) => "org.policy.write",
        }
    }

    fn root(&self, instance_id: &str) -> WriteModelRoot {
        let aggregate = self.aggregate(instance_id);
        WriteModelRoot::new(aggregate.id, aggregate.resource_owner, instance_id)
    }
}


#[cfg(test)]
mod tests {
    use super::testing::stored;
    use super::*;
    use crate::events::member::MemberAdded;
    use crate::events::EventPayload;

    fn member_model() -> MemberWriteModel {
        MemberWriteModel::new(MemberTarget::org("org1"), "user1", "instance1")
    }

    fn member_added(position: u64, user_id: &str) -> StoredEvent {
        let aggregate = Aggregate::new(AggregateType::Org, "org1", "org1", "instance1");
        stored(
            &aggregate,
            position,
            position,
            EventPayload::MemberAdded(MemberAdded {
                user_id: user_id.to_string(),
                roles: vec!["ORG_OWNER".to_string()],
            }),
        )
    }

    #[test]
    fn test_fold_advances_root() {
        // Arrange
        let mut model = member_model();

        // Act
        model.fold(&[member_added(1, "user1")]);

        // Assert
        assert_eq!(model.root().processed_sequence, 1);
        assert_eq!(model.root().processed_position, 1);
        assert_eq!(model.details().resource_owner, "org1");
        assert!(model.details().event_date.is_some());
    }

    #[test]
    fn test_fold_skips_events_outside_query() {
        let mut model = member_model();
        let other_org = Aggregate::new(AggregateType::Org, "org2", "org2", "instance1");
        let foreign = stored(
            &other_org,
            1,
            7,
            EventPayload::MemberAdded(MemberAdded {
                user_id: "user1".to_string(),
                roles: vec![],
            }),
        );

        model.fold(&[foreign]);

        assert_eq!(model.root().processed_position, 0);
    }

    #[test]
    fn test_append_and_reduce_rejects_stale_events() {
        let mut model = member_model();
        model.fold(&[member_added(4, "user1")]);

        let result = append_and_reduce(&mut model, &[member_added(3, "user1")]);

        assert!(result.is_err());
    }

    #[test]
    fn test_guard_uses_processed_position() {
        let mut model = member_model();
        model.fold(&[member_added(2, "user1")]);

        let guard = model.guard();

        assert_eq!(guard.position, 2);
        assert_eq!(guard.query, model.query());
    }

    #[test]
    fn test_scope_aggregates() {
        let instance = PolicyScope::Instance.aggregate("instance1");
        let org = PolicyScope::Org("org1".to_string()).aggregate("instance1");

        assert_eq!(instance.aggregate_type, AggregateType::Instance);
        assert_eq!(instance.resource_owner, "instance1");
        assert_eq!(org.id, "org1");
        assert_eq!(org.instance_id, "instance1");
    }
}
