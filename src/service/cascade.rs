// Copyright (c) 2025 - Cowboy AI, Inc.
//! Cascade coordinator
//!
//! Removing a role, a project grant or a project leaves dependents that
//! still reference it. The caller names the dependents; each is loaded,
//! and those that actually reference the removed entity contribute a
//! companion event plus their own guard to the primary batch.
//!
//! ```text
//! remove role key1 ──→ dependents [grant1, grant2, usergrant1]
//!                           │ load concurrently
//!                           ↓
//!             grant1 {key1,key2} → cascade.changed {key2}
//!             grant2 {key3}      → nothing
//!             usergrant1 {key1}  → cascade.changed {}
//! ```

use std::collections::BTreeSet;

use futures::future::try_join_all;
use tracing::debug;

use super::{event, Commands};
use crate::aggregate::{GroupGrantWriteModel, ProjectGrantWriteModel, UserGrantWriteModel, WriteModel};
use crate::context::CommandContext;
use crate::errors::CommandResult;
use crate::event_store::{PushBatch, UniqueConstraint};
use crate::events::group::GroupGrantRolesChanged;
use crate::events::project::ProjectGrantChanged;
use crate::events::user_grant::{UserGrantRemoved, UserGrantRolesChanged};
use crate::events::{Aggregate, EventPayload};
use crate::service::group_grant;
use crate::service::user_grant::USER_GRANT_TABLE;
use crate::state_machine::EntityState;

/// What the removal means for a dependent
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CascadeEffect {
    /// Drop these role keys from the dependent's set
    RemoveReferences(Vec<String>),
    /// The referenced project or project grant is gone
    Invalidate,
}

/// Dependents outside this scope are left untouched
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CascadeScope {
    pub project_id: String,
    /// Restrict to dependents of one project grant
    pub project_grant_id: Option<String>,
}

impl CascadeScope {
    pub fn project(project_id: impl Into<String>) -> Self {
        Self {
            project_id: project_id.into(),
            project_grant_id: None,
        }
    }

    pub fn project_grant(project_id: impl Into<String>, project_grant_id: impl Into<String>) -> Self {
        Self {
            project_id: project_id.into(),
            project_grant_id: Some(project_grant_id.into()),
        }
    }
}

/// Write model that can be the target of a cascade
pub(crate) trait CascadeDependent: WriteModel + Sized {
    fn dependent_aggregate(&self) -> Aggregate;

    fn dependent_state(&self) -> EntityState;

    fn in_scope(&self, scope: &CascadeScope) -> bool;

    fn role_keys(&self) -> &[String];

    fn cascade_changed(&self, role_keys: Vec<String>) -> EventPayload;

    /// Batch ending the dependent; `None` when it ends with its parent anyway
    fn cascade_removed(&self, ctx: &CommandContext) -> Option<PushBatch>;
}

impl CascadeEffect {
    /// Companion batch for one dependent, `None` when it is unaffected
    pub(crate) fn plan<D: CascadeDependent>(
        &self,
        ctx: &CommandContext,
        dependent: &D,
        scope: &CascadeScope,
    ) -> Option<PushBatch> {
        if !dependent.dependent_state().exists() || !dependent.in_scope(scope) {
            return None;
        }
        let batch = match self {
            CascadeEffect::RemoveReferences(removed) => {
                let current = dependent.role_keys();
                if !current.iter().any(|key| removed.contains(key)) {
                    return None;
                }
                let reduced = current
                    .iter()
                    .filter(|key| !removed.contains(key))
                    .cloned()
                    .collect();
                PushBatch::new().event(event(
                    ctx,
                    dependent.dependent_aggregate(),
                    dependent.cascade_changed(reduced),
                ))
            }
            CascadeEffect::Invalidate => dependent.cascade_removed(ctx)?,
        };
        Some(batch.guard(dependent.guard()))
    }
}

impl CascadeDependent for ProjectGrantWriteModel {
    fn dependent_aggregate(&self) -> Aggregate {
        self.aggregate()
    }

    fn dependent_state(&self) -> EntityState {
        self.state
    }

    fn in_scope(&self, scope: &CascadeScope) -> bool {
        self.project_id() == scope.project_id
            && scope
                .project_grant_id
                .as_deref()
                .map_or(true, |grant_id| grant_id == self.grant_id())
    }

    fn role_keys(&self) -> &[String] {
        &self.role_keys
    }

    fn cascade_changed(&self, role_keys: Vec<String>) -> EventPayload {
        EventPayload::ProjectGrantCascadeChanged(ProjectGrantChanged {
            grant_id: self.grant_id().to_string(),
            role_keys,
        })
    }

    fn cascade_removed(&self, _ctx: &CommandContext) -> Option<PushBatch> {
        None
    }
}

impl CascadeDependent for UserGrantWriteModel {
    fn dependent_aggregate(&self) -> Aggregate {
        self.aggregate()
    }

    fn dependent_state(&self) -> EntityState {
        self.state
    }

    fn in_scope(&self, scope: &CascadeScope) -> bool {
        self.project_id == scope.project_id
            && scope
                .project_grant_id
                .as_ref()
                .map_or(true, |grant_id| self.project_grant_id.as_ref() == Some(grant_id))
    }

    fn role_keys(&self) -> &[String] {
        &self.role_keys
    }

    fn cascade_changed(&self, role_keys: Vec<String>) -> EventPayload {
        EventPayload::UserGrantCascadeChanged(UserGrantRolesChanged { role_keys })
    }

    fn cascade_removed(&self, ctx: &CommandContext) -> Option<PushBatch> {
        let removed = UserGrantRemoved {
            user_id: self.user_id.clone(),
            project_id: self.project_id.clone(),
            project_grant_id: self.project_grant_id.clone(),
        };
        let batch = PushBatch::new()
            .event(event(ctx, self.aggregate(), EventPayload::UserGrantCascadeRemoved(removed)))
            .constraint(UniqueConstraint::release(
                ctx.instance_id.as_str(),
                USER_GRANT_TABLE,
                UserGrantWriteModel::unique_key(
                    &self.user_id,
                    &self.project_id,
                    self.project_grant_id.as_deref(),
                ),
            ));
        Some(batch)
    }
}

impl CascadeDependent for GroupGrantWriteModel {
    fn dependent_aggregate(&self) -> Aggregate {
        self.aggregate()
    }

    fn dependent_state(&self) -> EntityState {
        self.state
    }

    fn in_scope(&self, scope: &CascadeScope) -> bool {
        self.project_id == scope.project_id
            && scope
                .project_grant_id
                .as_ref()
                .map_or(true, |grant_id| self.project_grant_id.as_ref() == Some(grant_id))
    }

    fn role_keys(&self) -> &[String] {
        &self.role_keys
    }

    fn cascade_changed(&self, role_keys: Vec<String>) -> EventPayload {
        EventPayload::GroupGrantCascadeChanged(GroupGrantRolesChanged { role_keys })
    }

    fn cascade_removed(&self, ctx: &CommandContext) -> Option<PushBatch> {
        Some(group_grant::removal(ctx, self, EventPayload::GroupGrantCascadeRemoved))
    }
}

impl Commands {
    /// Load the named dependents and collect their companion batches
    ///
    /// Duplicate ids are loaded once. Loading fails the whole cascade.
    pub(crate) async fn cascade<D, F>(
        &self,
        ctx: &CommandContext,
        dependent_ids: &[String],
        new_model: F,
        scope: &CascadeScope,
        effect: &CascadeEffect,
    ) -> CommandResult<PushBatch>
    where
        D: CascadeDependent,
        F: Fn(&str) -> D,
    {
        let ids: BTreeSet<&str> = dependent_ids.iter().map(String::as_str).collect();
        let dependents = try_join_all(ids.iter().map(|id| self.load(ctx, new_model(*id)))).await?;

        let batch = dependents
            .iter()
            .filter_map(|dependent| effect.plan(ctx, dependent, scope))
            .fold(PushBatch::new(), PushBatch::merge);
        debug!(
            project_id = %scope.project_id,
            dependents = ids.len(),
            cascaded = batch.events.len(),
            "cascade planned"
        );
        Ok(batch)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::testing::stored;
    use crate::events::group::GroupGrantAdded;
    use crate::events::project::ProjectGrantAdded;
    use crate::events::user_grant::UserGrantAdded;
    use pretty_assertions::assert_eq;

    fn ctx() -> CommandContext {
        CommandContext::new("instance1", "user1")
    }

    fn grant(grant_id: &str, role_keys: &[&str]) -> ProjectGrantWriteModel {
        let mut model = ProjectGrantWriteModel::new("project1", grant_id, "org1", "instance1");
        let aggregate = model.aggregate();
        model.fold(&[stored(
            &aggregate,
            1,
            1,
            EventPayload::ProjectGrantAdded(ProjectGrantAdded {
                grant_id: grant_id.to_string(),
                granted_org_id: "org2".to_string(),
                role_keys: role_keys.iter().map(|k| k.to_string()).collect(),
            }),
        )]);
        model
    }

    fn user_grant(project_grant_id: Option<&str>) -> UserGrantWriteModel {
        let mut model = UserGrantWriteModel::new("usergrant1", "org2", "instance1");
        let aggregate = model.aggregate();
        model.fold(&[stored(
            &aggregate,
            1,
            5,
            EventPayload::UserGrantAdded(UserGrantAdded {
                user_id: "user2".to_string(),
                project_id: "project1".to_string(),
                project_grant_id: project_grant_id.map(str::to_string),
                role_keys: vec!["key1".to_string()],
            }),
        )]);
        model
    }

    #[test]
    fn test_reference_removal_reduces_set() {
        let effect = CascadeEffect::RemoveReferences(vec!["key1".to_string()]);

        let batch = effect
            .plan(&ctx(), &grant("grant1", &["key1", "key2"]), &CascadeScope::project("project1"))
            .unwrap();

        assert_eq!(batch.events.len(), 1);
        assert_eq!(batch.guards.len(), 1);
        assert_eq!(
            batch.events[0].payload,
            EventPayload::ProjectGrantCascadeChanged(ProjectGrantChanged {
                grant_id: "grant1".to_string(),
                role_keys: vec!["key2".to_string()],
            })
        );
    }

    #[test]
    fn test_unreferenced_dependent_is_skipped() {
        let effect = CascadeEffect::RemoveReferences(vec!["key1".to_string()]);

        let batch = effect.plan(&ctx(), &grant("grant1", &["key2"]), &CascadeScope::project("project1"));

        assert!(batch.is_none());
    }

    #[test]
    fn test_reduced_set_may_become_empty() {
        let effect = CascadeEffect::RemoveReferences(vec!["key1".to_string()]);

        let batch = effect
            .plan(&ctx(), &user_grant(None), &CascadeScope::project("project1"))
            .unwrap();

        assert_eq!(
            batch.events[0].payload,
            EventPayload::UserGrantCascadeChanged(UserGrantRolesChanged { role_keys: vec![] })
        );
    }

    #[test]
    fn test_invalidate_removes_user_grant_and_releases_constraint() {
        let batch = CascadeEffect::Invalidate
            .plan(
                &ctx(),
                &user_grant(Some("grant1")),
                &CascadeScope::project_grant("project1", "grant1"),
            )
            .unwrap();

        assert_eq!(batch.events[0].payload.event_type(), Some("user.grant.cascade.removed"));
        assert_eq!(batch.constraints[0].key, "user2:project1:grant1");
        assert_eq!(batch.guards[0].position, 5);
    }

    #[test]
    fn test_out_of_scope_dependents_are_skipped() {
        let other_grant = CascadeScope::project_grant("project1", "grant9");
        let other_project = CascadeScope::project("project9");

        assert!(CascadeEffect::Invalidate
            .plan(&ctx(), &user_grant(Some("grant1")), &other_grant)
            .is_none());
        assert!(CascadeEffect::Invalidate
            .plan(&ctx(), &user_grant(None), &other_project)
            .is_none());
    }

    #[test]
    fn test_absent_dependent_is_skipped() {
        let absent = UserGrantWriteModel::new("usergrant9", "org2", "instance1");

        let batch = CascadeEffect::Invalidate.plan(&ctx(), &absent, &CascadeScope::project("project1"));

        assert!(batch.is_none());
    }

    fn group_grant(project_grant_id: Option<&str>, role_keys: &[&str]) -> GroupGrantWriteModel {
        let mut model = GroupGrantWriteModel::new("groupgrant1", "org2", "instance1");
        let aggregate = model.aggregate();
        model.fold(&[stored(
            &aggregate,
            1,
            9,
            EventPayload::GroupGrantAdded(GroupGrantAdded {
                group_id: "group1".to_string(),
                project_id: "project1".to_string(),
                project_grant_id: project_grant_id.map(str::to_string),
                role_keys: role_keys.iter().map(|k| k.to_string()).collect(),
            }),
        )]);
        model
    }

    #[test]
    fn test_group_grant_follows_role_removal() {
        let effect = CascadeEffect::RemoveReferences(vec!["key1".to_string()]);

        let batch = effect
            .plan(&ctx(), &group_grant(None, &["key1", "key2"]), &CascadeScope::project("project1"))
            .unwrap();

        assert_eq!(
            batch.events[0].payload,
            EventPayload::GroupGrantCascadeChanged(GroupGrantRolesChanged {
                role_keys: vec!["key2".to_string()],
            })
        );
        assert_eq!(batch.guards[0].position, 9);
    }

    #[test]
    fn test_invalidate_removes_group_grant_and_releases_constraint() {
        let batch = CascadeEffect::Invalidate
            .plan(
                &ctx(),
                &group_grant(Some("grant1"), &["key1"]),
                &CascadeScope::project_grant("project1", "grant1"),
            )
            .unwrap();

        assert_eq!(batch.events[0].payload.event_type(), Some("group.grant.cascade.removed"));
        assert_eq!(batch.constraints[0].key, "group1:project1:grant1");
    }
}
