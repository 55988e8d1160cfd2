// Copyright (c) 2025 - Cowboy AI, Inc.
//! Org and project member commands

use tracing::debug;

use super::{event, invalid, Commands};
use crate::adapters::EntityKind;
use crate::aggregate::{MemberTarget, MemberWriteModel, ProjectWriteModel, WriteModel};
use crate::context::CommandContext;
use crate::domain::invariants::{require, same_roles, validate_roles};
use crate::domain::ObjectDetails;
use crate::errors::{CommandError, CommandResult};
use crate::event_store::{PushBatch, UniqueConstraint};
use crate::events::member::{MemberAdded, MemberChanged, MemberRemoved};
use crate::events::EventPayload;
use crate::state_machine::Lifecycle;

pub(crate) const MEMBER_TABLE: &str = "members";

impl Commands {
    /// Structural checks shared by add and change
    fn validate_member(&self, target: &MemberTarget, user_id: &str, roles: &[String]) -> CommandResult<()> {
        require("aggregate_id", target.aggregate_id())
            .and_then(|()| require("user_id", user_id))
            .map_err(invalid("MEMBER-3kd9s", "Errors.Member.Invalid"))?;
        if roles.is_empty() {
            return Err(CommandError::invalid_argument("MEMBER-8dj2s", "Errors.Member.Invalid"));
        }
        let allowed: &[String] = match target {
            MemberTarget::Org { .. } => &self.config.org_member_roles,
            MemberTarget::Project { .. } => &self.config.project_member_roles,
        };
        validate_roles(roles, allowed).map_err(invalid("MEMBER-0fk3m", "Errors.Member.InvalidRoles"))
    }

    /// The project of a project membership must exist
    async fn require_target(&self, ctx: &CommandContext, target: &MemberTarget) -> CommandResult<()> {
        if let MemberTarget::Project {
            project_id,
            resource_owner,
        } = target
        {
            let project = self
                .load(ctx, ProjectWriteModel::new(project_id, resource_owner, &ctx.instance_id))
                .await?;
            if !project.state.exists() {
                return Err(CommandError::precondition_failed(
                    "MEMBER-5md8c",
                    "Errors.Project.NotFound",
                ));
            }
        }
        Ok(())
    }

    pub async fn add_member(
        &self,
        ctx: &CommandContext,
        target: MemberTarget,
        user_id: &str,
        roles: Vec<String>,
    ) -> CommandResult<ObjectDetails> {
        self.validate_member(&target, user_id, &roles)?;
        self.require_target(ctx, &target).await?;
        self.require_entity(ctx, EntityKind::User, user_id, None).await?;

        let mut model = self
            .load(ctx, MemberWriteModel::new(target, user_id, &ctx.instance_id))
            .await?;
        model.state.check(Lifecycle::Add, model.target().entity())?;
        let target = model.target();
        self.check_permission(ctx, target.resource_owner(), target.aggregate_id(), target.write_permission())
            .await?;

        let batch = PushBatch::new()
            .event(event(
                ctx,
                model.aggregate(),
                EventPayload::MemberAdded(MemberAdded {
                    user_id: user_id.to_string(),
                    roles,
                }),
            ))
            .guard(model.guard())
            .constraint(UniqueConstraint::add(
                ctx.instance_id.as_str(),
                MEMBER_TABLE,
                target.unique_key(user_id),
                "Errors.Member.AlreadyExists",
            ));
        self.push_and_reduce(ctx, &mut model, batch).await
    }

    /// Replace the roles of a member; the same set is rejected
    pub async fn change_member(
        &self,
        ctx: &CommandContext,
        target: MemberTarget,
        user_id: &str,
        roles: Vec<String>,
    ) -> CommandResult<ObjectDetails> {
        self.validate_member(&target, user_id, &roles)?;

        let mut model = self
            .load(ctx, MemberWriteModel::new(target, user_id, &ctx.instance_id))
            .await?;
        model.state.check(Lifecycle::Change, model.target().entity())?;
        if same_roles(&model.roles, &roles) {
            return Err(CommandError::precondition_failed(
                "MEMBER-2ld9s",
                "Errors.Member.RolesNotChanged",
            ));
        }
        let target = model.target();
        self.check_permission(ctx, target.resource_owner(), target.aggregate_id(), target.write_permission())
            .await?;

        let batch = PushBatch::new()
            .event(event(
                ctx,
                model.aggregate(),
                EventPayload::MemberChanged(MemberChanged {
                    user_id: user_id.to_string(),
                    roles,
                }),
            ))
            .guard(model.guard());
        self.push_and_reduce(ctx, &mut model, batch).await
    }

    /// Removing a user who is not a member succeeds without a push
    pub async fn remove_member(
        &self,
        ctx: &CommandContext,
        target: MemberTarget,
        user_id: &str,
    ) -> CommandResult<ObjectDetails> {
        require("aggregate_id", target.aggregate_id())
            .and_then(|()| require("user_id", user_id))
            .map_err(invalid("MEMBER-9dk2m", "Errors.Member.Invalid"))?;

        let mut model = self
            .load(ctx, MemberWriteModel::new(target, user_id, &ctx.instance_id))
            .await?;
        if !model.state.exists() {
            debug!(user_id, aggregate_id = %model.target().aggregate_id(), "member already absent");
            return Ok(model.details());
        }
        let target = model.target();
        self.check_permission(ctx, target.resource_owner(), target.aggregate_id(), target.write_permission())
            .await?;

        let batch = PushBatch::new()
            .event(event(
                ctx,
                model.aggregate(),
                EventPayload::MemberRemoved(MemberRemoved {
                    user_id: user_id.to_string(),
                }),
            ))
            .guard(model.guard())
            .constraint(UniqueConstraint::release(
                ctx.instance_id.as_str(),
                MEMBER_TABLE,
                target.unique_key(user_id),
            ));
        self.push_and_reduce(ctx, &mut model, batch).await
    }
}
