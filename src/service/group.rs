// Copyright (c) 2025 - Cowboy AI, Inc.
//! Group commands
//!
//! A group belongs to one org. Its id may be chosen by the caller; a name
//! made of whitespace only is invalid.

use tracing::info;

use super::{event, invalid, Commands};
use crate::adapters::EntityKind;
use crate::aggregate::{GroupWriteModel, WriteModel};
use crate::context::CommandContext;
use crate::domain::invariants::require;
use crate::domain::ObjectDetails;
use crate::errors::{CommandError, CommandResult};
use crate::event_store::PushBatch;
use crate::events::group::{GroupAdded, GroupChanged, GroupRemoved};
use crate::events::EventPayload;
use crate::state_machine::Lifecycle;

const GROUP_WRITE: &str = "group.write";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewGroup {
    /// Generated when absent
    pub id: Option<String>,
    pub name: String,
    pub description: String,
}

/// Fields to overwrite; `None` keeps the current value
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GroupUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
}

fn validate_name(name: &str) -> CommandResult<()> {
    require("name", name.trim()).map_err(invalid("GROUP-4kd8s", "Errors.Group.InvalidName"))
}

impl Commands {
    /// Create a group in `org_id`; the group id is in the details
    pub async fn create_group(&self, ctx: &CommandContext, org_id: &str, group: NewGroup) -> CommandResult<ObjectDetails> {
        validate_name(&group.name)?;
        require("resource_owner", org_id).map_err(invalid("GROUP-8dj2s", "Errors.IDMissing"))?;
        self.require_entity(ctx, EntityKind::Org, org_id, None).await?;

        let group_id = match group.id {
            Some(id) if !id.trim().is_empty() => id,
            _ => self.next_id()?,
        };
        // ids are unique across orgs, so the existence check ignores the owner
        let existing = self
            .load(ctx, GroupWriteModel::new(&group_id, "", &ctx.instance_id))
            .await?;
        existing.state.check(Lifecycle::Add, "Group")?;
        self.check_permission(ctx, org_id, &group_id, GROUP_WRITE).await?;

        let mut model = GroupWriteModel::new(&group_id, org_id, &ctx.instance_id);
        let batch = PushBatch::new()
            .event(event(
                ctx,
                model.aggregate(),
                EventPayload::GroupAdded(GroupAdded {
                    name: group.name,
                    description: group.description,
                }),
            ))
            .guard(existing.guard());
        let details = self.push_and_reduce(ctx, &mut model, batch).await?;
        info!(group_id = %group_id, org_id, "group created");
        Ok(details)
    }

    /// Overwrite name and description; an update changing nothing succeeds
    /// without appending
    pub async fn update_group(&self, ctx: &CommandContext, group_id: &str, update: GroupUpdate) -> CommandResult<ObjectDetails> {
        require("group_id", group_id).map_err(invalid("GROUP-3md9s", "Errors.IDMissing"))?;
        if let Some(name) = &update.name {
            validate_name(name)?;
        }

        let mut model = self
            .load(ctx, GroupWriteModel::new(group_id, "", &ctx.instance_id))
            .await?;
        model.state.check(Lifecycle::Change, "Group")?;
        let changed = GroupChanged {
            name: update.name.filter(|name| *name != model.name),
            description: update.description.filter(|description| *description != model.description),
        };
        if changed == GroupChanged::default() {
            return Ok(model.details());
        }
        let owner = model.root().resource_owner.clone();
        self.check_permission(ctx, &owner, group_id, GROUP_WRITE).await?;

        let batch = PushBatch::new()
            .event(event(ctx, model.aggregate(), EventPayload::GroupChanged(changed)))
            .guard(model.guard());
        self.push_and_reduce(ctx, &mut model, batch).await
    }

    /// Remove a group; removing a missing group succeeds without appending
    pub async fn delete_group(&self, ctx: &CommandContext, group_id: &str) -> CommandResult<ObjectDetails> {
        require("group_id", group_id).map_err(invalid("GROUP-0fk3m", "Errors.IDMissing"))?;

        let mut model = self
            .load(ctx, GroupWriteModel::new(group_id, "", &ctx.instance_id))
            .await?;
        if !model.state.exists() {
            return Ok(model.details());
        }
        let owner = model.root().resource_owner.clone();
        self.check_permission(ctx, &owner, group_id, GROUP_WRITE).await?;

        let batch = PushBatch::new()
            .event(event(
                ctx,
                model.aggregate(),
                EventPayload::GroupRemoved(GroupRemoved {
                    name: model.name.clone(),
                }),
            ))
            .guard(model.guard());
        let details = self.push_and_reduce(ctx, &mut model, batch).await?;
        info!(group_id, "group deleted");
        Ok(details)
    }

    /// Load a group of `org_id`, failing with `PreconditionFailed` unless
    /// it is active
    pub(crate) async fn active_group(&self, ctx: &CommandContext, group_id: &str, org_id: &str) -> CommandResult<GroupWriteModel> {
        let group = self
            .load(ctx, GroupWriteModel::new(group_id, org_id, &ctx.instance_id))
            .await?;
        if !group.state.is_active() {
            return Err(CommandError::precondition_failed(
                "GROUP-6sk2d",
                "Errors.Group.NotFound",
            ));
        }
        Ok(group)
    }
}
