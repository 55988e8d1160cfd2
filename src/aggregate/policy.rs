// Copyright (c) 2025 - Cowboy AI, Inc.
//! Generic settings policy write model
//!
//! Password age, password complexity, privacy and mail template policies
//! share one shape: added with full settings, changed field by field,
//! removed back to nothing. [`PolicySettings`] binds a settings type to its
//! events so a single [`PolicyWriteModel`] serves them all.

use std::fmt;

use super::{PolicyScope, WriteModel, WriteModelRoot};
use crate::domain::{
    MailTemplatePolicy, PasswordAgePolicy, PasswordComplexityPolicy, PolicyError, PrivacyPolicy,
};
use crate::event_store::{AggregateFilter, SearchQuery};
use crate::events::policy::{
    MailTemplatePolicyChanged, PasswordAgePolicyChanged, PasswordComplexityPolicyChanged,
    PrivacyPolicyChanged,
};
use crate::events::{event_types, Aggregate, EmptyPayload, EventPayload, StoredEvent};
use crate::state_machine::EntityState;

/// Event of a settings policy, borrowed from a payload
#[derive(Debug, PartialEq)]
pub enum PolicyEvent<'a, P: PolicySettings> {
    Added(&'a P),
    Changed(&'a P::Changes),
    Removed,
}

/// Settings value managed as an instance default with org overrides
pub trait PolicySettings: Clone + Default + PartialEq + fmt::Debug + Send + Sync + 'static {
    /// Payload of the "changed" event
    type Changes: Clone + PartialEq + fmt::Debug + Send + Sync;

    /// Entity name used in error keys
    const NAME: &'static str;

    /// Added, changed and removed event types
    const EVENT_TYPES: [&'static str; 3];

    fn validate(&self) -> Result<(), PolicyError>;

    /// Fields of `target` that differ from `self`
    fn changes(&self, target: &Self) -> Option<Self::Changes>;

    fn apply(&mut self, changes: &Self::Changes);

    fn added(self) -> EventPayload;

    fn changed(changes: Self::Changes) -> EventPayload;

    fn removed() -> EventPayload;

    /// Recognize this policy's events
    fn project(payload: &EventPayload) -> Option<PolicyEvent<'_, Self>>;
}

macro_rules! policy_settings {
    (
        $policy:ty, $changes:ty, $name:literal,
        validate: $validate:expr,
        events: $added:ident / $changed:ident / $removed:ident,
        types: [$added_type:path, $changed_type:path, $removed_type:path],
        fields: { $($field:ident),+ $(,)? }
    ) => {
        impl PolicySettings for $policy {
            type Changes = $changes;

            const NAME: &'static str = $name;

            const EVENT_TYPES: [&'static str; 3] = [$added_type, $changed_type, $removed_type];

            fn validate(&self) -> Result<(), PolicyError> {
                let validate: fn(&Self) -> Result<(), PolicyError> = $validate;
                validate(self)
            }

            fn changes(&self, target: &Self) -> Option<Self::Changes> {
                diff_fields!(self, target, $changes { $($field),+ })
            }

            fn apply(&mut self, changes: &Self::Changes) {
                apply_fields!(self, changes, { $($field),+ });
            }

            fn added(self) -> EventPayload {
                EventPayload::$added(self)
            }

            fn changed(changes: Self::Changes) -> EventPayload {
                EventPayload::$changed(changes)
            }

            fn removed() -> EventPayload {
                EventPayload::$removed(EmptyPayload {})
            }

            fn project(payload: &EventPayload) -> Option<PolicyEvent<'_, Self>> {
                match payload {
                    EventPayload::$added(settings) => Some(PolicyEvent::Added(settings)),
                    EventPayload::$changed(changes) => Some(PolicyEvent::Changed(changes)),
                    EventPayload::$removed(_) => Some(PolicyEvent::Removed),
                    _ => None,
                }
            }
        }
    };
}

policy_settings! {
    PasswordAgePolicy, PasswordAgePolicyChanged, "PasswordAgePolicy",
    validate: |_| Ok(()),
    events: PasswordAgePolicyAdded / PasswordAgePolicyChanged / PasswordAgePolicyRemoved,
    types: [
        event_types::PASSWORD_AGE_POLICY_ADDED,
        event_types::PASSWORD_AGE_POLICY_CHANGED,
        event_types::PASSWORD_AGE_POLICY_REMOVED
    ],
    fields: { expire_warn_days, max_age_days }
}

policy_settings! {
    PasswordComplexityPolicy, PasswordComplexityPolicyChanged, "PasswordComplexityPolicy",
    validate: |policy| policy.validate(),
    events: PasswordComplexityPolicyAdded / PasswordComplexityPolicyChanged / PasswordComplexityPolicyRemoved,
    types: [
        event_types::PASSWORD_COMPLEXITY_POLICY_ADDED,
        event_types::PASSWORD_COMPLEXITY_POLICY_CHANGED,
        event_types::PASSWORD_COMPLEXITY_POLICY_REMOVED
    ],
    fields: { min_length, has_lowercase, has_uppercase, has_number, has_symbol }
}

policy_settings! {
    PrivacyPolicy, PrivacyPolicyChanged, "PrivacyPolicy",
    validate: |policy| policy.validate(),
    events: PrivacyPolicyAdded / PrivacyPolicyChanged / PrivacyPolicyRemoved,
    types: [
        event_types::PRIVACY_POLICY_ADDED,
        event_types::PRIVACY_POLICY_CHANGED,
        event_types::PRIVACY_POLICY_REMOVED
    ],
    fields: { tos_link, privacy_link, help_link, support_email }
}

policy_settings! {
    MailTemplatePolicy, MailTemplatePolicyChanged, "MailTemplatePolicy",
    validate: |policy| policy.validate(),
    events: MailTemplatePolicyAdded / MailTemplatePolicyChanged / MailTemplatePolicyRemoved,
    types: [
        event_types::MAIL_TEMPLATE_POLICY_ADDED,
        event_types::MAIL_TEMPLATE_POLICY_CHANGED,
        event_types::MAIL_TEMPLATE_POLICY_REMOVED
    ],
    fields: { template }
}

/// Settings policy of one scope
#[derive(Debug, Clone, PartialEq)]
pub struct PolicyWriteModel<P: PolicySettings> {
    root: WriteModelRoot,
    scope: PolicyScope,
    pub settings: P,
    pub state: EntityState,
}

impl<P: PolicySettings> PolicyWriteModel<P> {
    pub fn new(scope: PolicyScope, instance_id: &str) -> Self {
        Self {
            root: scope.root(instance_id),
            scope,
            settings: P::default(),
            state: EntityState::Unspecified,
        }
    }

    pub fn scope(&self) -> &PolicyScope {
        &self.scope
    }

    pub fn aggregate(&self) -> Aggregate {
        self.scope.aggregate(&self.root.instance_id)
    }

    /// Entity name used in error keys, e.g. `IAM.PasswordAgePolicy`
    pub fn entity(&self) -> String {
        format!("{}.{}", self.scope.error_prefix(), P::NAME)
    }
}

impl<P: PolicySettings> WriteModel for PolicyWriteModel<P> {
    fn root(&self) -> &WriteModelRoot {
        &self.root
    }

    fn root_mut(&mut self) -> &mut WriteModelRoot {
        &mut self.root
    }

    fn query(&self) -> SearchQuery {
        SearchQuery::new().instance_id(self.root.instance_id.as_str()).filter(
            AggregateFilter::new(self.scope.aggregate_type())
                .aggregate_id(self.root.aggregate_id.as_str())
                .event_types(P::EVENT_TYPES),
        )
    }

    fn reduce(&mut self, event: &StoredEvent) {
        match P::project(&event.payload) {
            Some(PolicyEvent::Added(settings)) => {
                self.settings = settings.clone();
                self.state = EntityState::Active;
            }
            Some(PolicyEvent::Changed(changes)) => self.settings.apply(changes),
            Some(PolicyEvent::Removed) => {
                self.settings = P::default();
                self.state = EntityState::Removed;
            }
            None => {}
        }
    }
}
