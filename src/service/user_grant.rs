// Copyright (c) 2025 - Cowboy AI, Inc.
//! User grant commands
//!
//! A user grant gives one user roles on a project. Without a project grant
//! it is issued by the project's owning org from the project's roles; with
//! one it is issued by the granted org from the grant's roles.

use tracing::info;

use super::{event, invalid, Commands};
use crate::adapters::EntityKind;
use crate::aggregate::{ProjectGrantWriteModel, ProjectWriteModel, UserGrantWriteModel, WriteModel};
use crate::context::CommandContext;
use crate::domain::invariants::{require, same_roles};
use crate::domain::ObjectDetails;
use crate::errors::{CommandError, CommandResult};
use crate::event_store::{Guard, PushBatch, UniqueConstraint};
use crate::events::user_grant::{UserGrantAdded, UserGrantRemoved, UserGrantRolesChanged};
use crate::events::{EmptyPayload, EventPayload};
use crate::state_machine::Lifecycle;

pub(crate) const USER_GRANT_TABLE: &str = "user_grants";

const USER_GRANT_WRITE: &str = "user.grant.write";

/// Roles to grant a user on a project
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserGrantInput {
    pub user_id: String,
    pub project_id: String,
    /// Issue through this project grant instead of the project itself
    pub project_grant_id: Option<String>,
    pub role_keys: Vec<String>,
}

impl UserGrantInput {
    fn validate(&self) -> CommandResult<()> {
        require("user_id", &self.user_id)
            .and_then(|()| require("project_id", &self.project_id))
            .and_then(|()| match self.project_grant_id.as_deref() {
                Some(grant_id) => require("project_grant_id", grant_id),
                None => Ok(()),
            })
            .map_err(invalid("UGRANT-4kd9s", "Errors.UserGrant.Invalid"))
    }
}

fn require_ids(user_grant_id: &str, org_id: &str) -> CommandResult<()> {
    require("user_grant_id", user_grant_id)
        .and_then(|()| require("resource_owner", org_id))
        .map_err(invalid("UGRANT-0fk2m", "Errors.IDMissing"))
}

fn not_found() -> CommandError {
    CommandError::precondition_failed("UGRANT-3ms8d", "Errors.Project.Role.NotFound")
}

impl Commands {
    /// Roles `org_id` may hand out on the project, with the guard that
    /// keeps them valid until the push
    pub(super) async fn grantable_roles(
        &self,
        ctx: &CommandContext,
        org_id: &str,
        project_id: &str,
        project_grant_id: Option<&str>,
    ) -> CommandResult<(Vec<String>, Guard)> {
        let project = self
            .load(ctx, ProjectWriteModel::new(project_id, "", &ctx.instance_id))
            .await?;
        if !project.state.is_active() {
            return Err(CommandError::precondition_failed(
                "UGRANT-7dj3s",
                "Errors.Project.NotFound",
            ));
        }

        match project_grant_id {
            Some(grant_id) => {
                let owner = project.root().resource_owner.clone();
                let grant = self
                    .load(ctx, ProjectGrantWriteModel::new(project_id, grant_id, &owner, &ctx.instance_id))
                    .await?;
                if !grant.state.is_active() || grant.granted_org_id != org_id {
                    return Err(CommandError::precondition_failed(
                        "UGRANT-9sk2d",
                        "Errors.Project.Grant.NotFound",
                    ));
                }
                Ok((grant.role_keys.clone(), grant.guard()))
            }
            None => {
                if project.root().resource_owner != org_id {
                    return Err(CommandError::precondition_failed(
                        "UGRANT-2nd8c",
                        "Errors.Project.NotFound",
                    ));
                }
                Ok((project.role_keys.iter().cloned().collect(), project.guard()))
            }
        }
    }

    /// Issue a user grant owned by `org_id`; the new id is in the details
    pub async fn add_user_grant(
        &self,
        ctx: &CommandContext,
        org_id: &str,
        input: UserGrantInput,
    ) -> CommandResult<ObjectDetails> {
        require("resource_owner", org_id).map_err(invalid("UGRANT-6fj2s", "Errors.IDMissing"))?;
        input.validate()?;
        self.require_entity(ctx, EntityKind::User, &input.user_id, None).await?;

        let (grantable, guard) = self
            .grantable_roles(ctx, org_id, &input.project_id, input.project_grant_id.as_deref())
            .await?;
        if input.role_keys.iter().any(|key| !grantable.contains(key)) {
            return Err(not_found());
        }
        self.check_permission(ctx, org_id, &input.project_id, USER_GRANT_WRITE).await?;

        let user_grant_id = self.next_id()?;
        let mut model = UserGrantWriteModel::new(&user_grant_id, org_id, &ctx.instance_id);
        let unique_key = UserGrantWriteModel::unique_key(
            &input.user_id,
            &input.project_id,
            input.project_grant_id.as_deref(),
        );
        let batch = PushBatch::new()
            .event(event(
                ctx,
                model.aggregate(),
                EventPayload::UserGrantAdded(UserGrantAdded {
                    user_id: input.user_id,
                    project_id: input.project_id,
                    project_grant_id: input.project_grant_id,
                    role_keys: input.role_keys,
                }),
            ))
            .guard(model.guard())
            .guard(guard)
            .constraint(UniqueConstraint::add(
                ctx.instance_id.as_str(),
                USER_GRANT_TABLE,
                unique_key,
                "Errors.UserGrant.AlreadyExists",
            ));
        let details = self.push_and_reduce(ctx, &mut model, batch).await?;
        info!(user_grant_id = %user_grant_id, org_id, "user grant added");
        Ok(details)
    }

    /// Replace the roles of a user grant; the same set is rejected
    pub async fn change_user_grant(
        &self,
        ctx: &CommandContext,
        user_grant_id: &str,
        org_id: &str,
        role_keys: Vec<String>,
    ) -> CommandResult<ObjectDetails> {
        require_ids(user_grant_id, org_id)?;

        let mut model = self
            .load(ctx, UserGrantWriteModel::new(user_grant_id, org_id, &ctx.instance_id))
            .await?;
        model.state.check(Lifecycle::Change, "UserGrant")?;
        if same_roles(&model.role_keys, &role_keys) {
            return Err(CommandError::precondition_failed(
                "UGRANT-5ld9s",
                "Errors.UserGrant.NotChanged",
            ));
        }
        let (grantable, guard) = self
            .grantable_roles(ctx, org_id, &model.project_id, model.project_grant_id.as_deref())
            .await?;
        if role_keys.iter().any(|key| !grantable.contains(key)) {
            return Err(not_found());
        }
        self.check_permission(ctx, org_id, user_grant_id, USER_GRANT_WRITE).await?;

        let batch = PushBatch::new()
            .event(event(
                ctx,
                model.aggregate(),
                EventPayload::UserGrantChanged(UserGrantRolesChanged { role_keys }),
            ))
            .guard(model.guard())
            .guard(guard);
        self.push_and_reduce(ctx, &mut model, batch).await
    }

    pub async fn deactivate_user_grant(
        &self,
        ctx: &CommandContext,
        user_grant_id: &str,
        org_id: &str,
    ) -> CommandResult<ObjectDetails> {
        self.transition_user_grant(ctx, user_grant_id, org_id, Lifecycle::Deactivate)
            .await
    }

    pub async fn reactivate_user_grant(
        &self,
        ctx: &CommandContext,
        user_grant_id: &str,
        org_id: &str,
    ) -> CommandResult<ObjectDetails> {
        self.transition_user_grant(ctx, user_grant_id, org_id, Lifecycle::Reactivate)
            .await
    }

    async fn transition_user_grant(
        &self,
        ctx: &CommandContext,
        user_grant_id: &str,
        org_id: &str,
        input: Lifecycle,
    ) -> CommandResult<ObjectDetails> {
        require_ids(user_grant_id, org_id)?;
        let mut model = self
            .load(ctx, UserGrantWriteModel::new(user_grant_id, org_id, &ctx.instance_id))
            .await?;
        model.state.check(input, "UserGrant")?;
        self.check_permission(ctx, org_id, user_grant_id, USER_GRANT_WRITE).await?;

        let payload = match input {
            Lifecycle::Deactivate => EventPayload::UserGrantDeactivated(EmptyPayload {}),
            _ => EventPayload::UserGrantReactivated(EmptyPayload {}),
        };
        let batch = PushBatch::new()
            .event(event(ctx, model.aggregate(), payload))
            .guard(model.guard());
        self.push_and_reduce(ctx, &mut model, batch).await
    }

    /// Remove a user grant and free its (user, project, grant) slot
    pub async fn remove_user_grant(
        &self,
        ctx: &CommandContext,
        user_grant_id: &str,
        org_id: &str,
    ) -> CommandResult<ObjectDetails> {
        require_ids(user_grant_id, org_id)?;
        let mut model = self
            .load(ctx, UserGrantWriteModel::new(user_grant_id, org_id, &ctx.instance_id))
            .await?;
        model.state.check(Lifecycle::Remove, "UserGrant")?;
        self.check_permission(ctx, org_id, user_grant_id, USER_GRANT_WRITE).await?;

        let removed = UserGrantRemoved {
            user_id: model.user_id.clone(),
            project_id: model.project_id.clone(),
            project_grant_id: model.project_grant_id.clone(),
        };
        let batch = PushBatch::new()
            .event(event(ctx, model.aggregate(), EventPayload::UserGrantRemoved(removed)))
            .guard(model.guard())
            .constraint(UniqueConstraint::release(
                ctx.instance_id.as_str(),
                USER_GRANT_TABLE,
                UserGrantWriteModel::unique_key(
                    &model.user_id,
                    &model.project_id,
                    model.project_grant_id.as_deref(),
                ),
            ));
        self.push_and_reduce(ctx, &mut model, batch).await
    }
}
