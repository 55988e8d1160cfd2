// Copyright (c) 2025 - Cowboy AI, Inc.
//! Group grant commands
//!
//! A group grant hands roles on a project to every member of a group. The
//! grantable roles follow the user grant rules: the project's own roles for
//! the owning org, the roles of a project grant for the granted org.

use std::collections::BTreeSet;

use tracing::info;

use super::{event, invalid, Commands};
use crate::aggregate::{GroupGrantWriteModel, WriteModel};
use crate::context::CommandContext;
use crate::domain::invariants::{require, same_roles};
use crate::domain::ObjectDetails;
use crate::errors::{CommandError, CommandResult};
use crate::event_store::{PushBatch, UniqueConstraint};
use crate::events::group::{GroupGrantAdded, GroupGrantRemoved, GroupGrantRolesChanged};
use crate::events::{EmptyPayload, EventPayload};
use crate::state_machine::Lifecycle;

pub(crate) const GROUP_GRANT_TABLE: &str = "group_grants";

const GROUP_GRANT_WRITE: &str = "group.grant.write";

/// Roles to grant a group on a project
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupGrantInput {
    pub group_id: String,
    pub project_id: String,
    /// Issue through this project grant instead of the project itself
    pub project_grant_id: Option<String>,
    pub role_keys: Vec<String>,
}

impl GroupGrantInput {
    fn validate(&self) -> CommandResult<()> {
        require("group_id", &self.group_id)
            .and_then(|()| require("project_id", &self.project_id))
            .and_then(|()| match self.project_grant_id.as_deref() {
                Some(grant_id) => require("project_grant_id", grant_id),
                None => Ok(()),
            })
            .map_err(invalid("GGRANT-4kd9s", "Errors.GroupGrant.Invalid"))
    }
}

fn require_ids(group_grant_id: &str, org_id: &str) -> CommandResult<()> {
    require("group_grant_id", group_grant_id)
        .and_then(|()| require("resource_owner", org_id))
        .map_err(invalid("GGRANT-0fk2m", "Errors.GroupGrant.IDMissing"))
}

fn roles_not_found() -> CommandError {
    CommandError::precondition_failed("GGRANT-3ms8d", "Errors.Project.Role.NotFound")
}

impl Commands {
    /// Issue a group grant owned by `org_id`; the new id is in the details
    pub async fn add_group_grant(
        &self,
        ctx: &CommandContext,
        org_id: &str,
        input: GroupGrantInput,
    ) -> CommandResult<ObjectDetails> {
        require("resource_owner", org_id).map_err(invalid("GGRANT-6fj2s", "Errors.IDMissing"))?;
        input.validate()?;
        let group = self.active_group(ctx, &input.group_id, org_id).await?;

        let (grantable, guard) = self
            .grantable_roles(ctx, org_id, &input.project_id, input.project_grant_id.as_deref())
            .await?;
        if input.role_keys.iter().any(|key| !grantable.contains(key)) {
            return Err(roles_not_found());
        }
        self.check_permission(ctx, org_id, &input.project_id, GROUP_GRANT_WRITE).await?;

        let group_grant_id = self.next_id()?;
        let mut model = GroupGrantWriteModel::new(&group_grant_id, org_id, &ctx.instance_id);
        let unique_key = GroupGrantWriteModel::unique_key(
            &input.group_id,
            &input.project_id,
            input.project_grant_id.as_deref(),
        );
        let batch = PushBatch::new()
            .event(event(
                ctx,
                model.aggregate(),
                EventPayload::GroupGrantAdded(GroupGrantAdded {
                    group_id: input.group_id,
                    project_id: input.project_id,
                    project_grant_id: input.project_grant_id,
                    role_keys: input.role_keys,
                }),
            ))
            .guard(model.guard())
            .guard(group.guard())
            .guard(guard)
            .constraint(UniqueConstraint::add(
                ctx.instance_id.as_str(),
                GROUP_GRANT_TABLE,
                unique_key,
                "Errors.GroupGrant.AlreadyExists",
            ));
        let details = self.push_and_reduce(ctx, &mut model, batch).await?;
        info!(group_grant_id = %group_grant_id, org_id, "group grant added");
        Ok(details)
    }

    /// Replace the roles of a group grant; the same set is rejected
    pub async fn change_group_grant(
        &self,
        ctx: &CommandContext,
        group_grant_id: &str,
        org_id: &str,
        role_keys: Vec<String>,
    ) -> CommandResult<ObjectDetails> {
        require_ids(group_grant_id, org_id)?;

        let mut model = self
            .load(ctx, GroupGrantWriteModel::new(group_grant_id, org_id, &ctx.instance_id))
            .await?;
        model.state.check(Lifecycle::Change, "GroupGrant")?;
        if same_roles(&model.role_keys, &role_keys) {
            return Err(CommandError::precondition_failed(
                "GGRANT-5ld9s",
                "Errors.GroupGrant.NotChanged",
            ));
        }
        let (grantable, guard) = self
            .grantable_roles(ctx, org_id, &model.project_id, model.project_grant_id.as_deref())
            .await?;
        if role_keys.iter().any(|key| !grantable.contains(key)) {
            return Err(roles_not_found());
        }
        self.check_permission(ctx, org_id, group_grant_id, GROUP_GRANT_WRITE).await?;

        let batch = PushBatch::new()
            .event(event(
                ctx,
                model.aggregate(),
                EventPayload::GroupGrantChanged(GroupGrantRolesChanged { role_keys }),
            ))
            .guard(model.guard())
            .guard(guard);
        self.push_and_reduce(ctx, &mut model, batch).await
    }

    pub async fn deactivate_group_grant(
        &self,
        ctx: &CommandContext,
        group_grant_id: &str,
        org_id: &str,
    ) -> CommandResult<ObjectDetails> {
        self.transition_group_grant(ctx, group_grant_id, org_id, Lifecycle::Deactivate)
            .await
    }

    pub async fn reactivate_group_grant(
        &self,
        ctx: &CommandContext,
        group_grant_id: &str,
        org_id: &str,
    ) -> CommandResult<ObjectDetails> {
        self.transition_group_grant(ctx, group_grant_id, org_id, Lifecycle::Reactivate)
            .await
    }

    async fn transition_group_grant(
        &self,
        ctx: &CommandContext,
        group_grant_id: &str,
        org_id: &str,
        input: Lifecycle,
    ) -> CommandResult<ObjectDetails> {
        require_ids(group_grant_id, org_id)?;
        let mut model = self
            .load(ctx, GroupGrantWriteModel::new(group_grant_id, org_id, &ctx.instance_id))
            .await?;
        model.state.check(input, "GroupGrant")?;
        self.check_permission(ctx, org_id, group_grant_id, GROUP_GRANT_WRITE).await?;

        let payload = match input {
            Lifecycle::Deactivate => EventPayload::GroupGrantDeactivated(EmptyPayload {}),
            _ => EventPayload::GroupGrantReactivated(EmptyPayload {}),
        };
        let batch = PushBatch::new()
            .event(event(ctx, model.aggregate(), payload))
            .guard(model.guard());
        self.push_and_reduce(ctx, &mut model, batch).await
    }

    /// Remove a group grant and free its (group, project, grant) slot
    pub async fn remove_group_grant(
        &self,
        ctx: &CommandContext,
        group_grant_id: &str,
        org_id: &str,
    ) -> CommandResult<ObjectDetails> {
        require_ids(group_grant_id, org_id)?;
        let mut model = self
            .load(ctx, GroupGrantWriteModel::new(group_grant_id, org_id, &ctx.instance_id))
            .await?;
        model.state.check(Lifecycle::Remove, "GroupGrant")?;
        self.check_permission(ctx, org_id, group_grant_id, GROUP_GRANT_WRITE).await?;

        let batch = removal(ctx, &model, EventPayload::GroupGrantRemoved).guard(model.guard());
        self.push_and_reduce(ctx, &mut model, batch).await
    }

    /// Remove several group grants of `org_id` in one push
    ///
    /// Every grant must exist; a single missing one rejects the whole call.
    /// Duplicate ids are removed once.
    pub async fn bulk_remove_group_grants(
        &self,
        ctx: &CommandContext,
        group_grant_ids: &[String],
        org_id: &str,
    ) -> CommandResult<()> {
        if group_grant_ids.is_empty() {
            return Err(CommandError::invalid_argument(
                "GGRANT-7sk2d",
                "Errors.GroupGrant.IDMissing",
            ));
        }
        let ids: BTreeSet<&str> = group_grant_ids.iter().map(String::as_str).collect();
        let mut batch = PushBatch::new();
        for group_grant_id in &ids {
            require_ids(group_grant_id, org_id)?;
            let model = self
                .load(ctx, GroupGrantWriteModel::new(group_grant_id, org_id, &ctx.instance_id))
                .await?;
            model.state.check(Lifecycle::Remove, "GroupGrant")?;
            self.check_permission(ctx, org_id, group_grant_id, GROUP_GRANT_WRITE).await?;
            batch = batch.merge(removal(ctx, &model, EventPayload::GroupGrantRemoved).guard(model.guard()));
        }
        self.push(ctx, batch).await?;
        info!(org_id, removed = ids.len(), "group grants removed");
        Ok(())
    }
}

/// Removal event of a group grant plus the release of its constraint
pub(crate) fn removal(
    ctx: &CommandContext,
    model: &GroupGrantWriteModel,
    payload: fn(GroupGrantRemoved) -> EventPayload,
) -> PushBatch {
    let removed = GroupGrantRemoved {
        group_id: model.group_id.clone(),
        project_id: model.project_id.clone(),
        project_grant_id: model.project_grant_id.clone(),
    };
    PushBatch::new()
        .event(event(ctx, model.aggregate(), payload(removed)))
        .constraint(UniqueConstraint::release(
            ctx.instance_id.as_str(),
            GROUP_GRANT_TABLE,
            GroupGrantWriteModel::unique_key(
                &model.group_id,
                &model.project_id,
                model.project_grant_id.as_deref(),
            ),
        ))
}
