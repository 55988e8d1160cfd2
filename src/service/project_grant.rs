// Copyright (c) 2025 - Cowboy AI, Inc.
//! Project grant commands
//!
//! A project grant hands a subset of a project's roles to another org.
//! User and group grants issued through it are its dependents.

use tracing::info;

use super::cascade::{CascadeEffect, CascadeScope};
use super::{event, invalid, Commands};
use crate::adapters::EntityKind;
use crate::aggregate::{GroupGrantWriteModel, ProjectGrantWriteModel, UserGrantWriteModel, WriteModel};
use crate::context::CommandContext;
use crate::domain::invariants::{require, same_roles};
use crate::domain::ObjectDetails;
use crate::errors::{CommandError, CommandResult};
use crate::event_store::{PushBatch, UniqueConstraint};
use crate::events::project::{ProjectGrantAdded, ProjectGrantChanged, ProjectGrantRemoved};
use crate::events::EventPayload;
use crate::state_machine::Lifecycle;

pub(crate) const PROJECT_GRANT_TABLE: &str = "project_grants";

const PROJECT_GRANT_WRITE: &str = "project.grant.write";

/// Key of the (project, granted org) uniqueness constraint
pub(crate) fn grant_key(project_id: &str, granted_org_id: &str) -> String {
    format!("{project_id}:{granted_org_id}")
}

fn require_ids(project_id: &str, org_id: &str, grant_id: &str) -> CommandResult<()> {
    require("project_id", project_id)
        .and_then(|()| require("resource_owner", org_id))
        .and_then(|()| require("grant_id", grant_id))
        .map_err(invalid("PGRANT-2ms9d", "Errors.IDMissing"))
}

impl Commands {
    /// Grant roles of a project to another org
    ///
    /// Returns the new grant id with the details of the project.
    pub async fn add_project_grant(
        &self,
        ctx: &CommandContext,
        project_id: &str,
        org_id: &str,
        granted_org_id: &str,
        role_keys: Vec<String>,
    ) -> CommandResult<(String, ObjectDetails)> {
        require("project_id", project_id)
            .and_then(|()| require("resource_owner", org_id))
            .and_then(|()| require("granted_org_id", granted_org_id))
            .map_err(invalid("PGRANT-8dk3s", "Errors.Project.Grant.Invalid"))?;
        if granted_org_id == org_id {
            return Err(CommandError::invalid_argument(
                "PGRANT-4fj9s",
                "Errors.Project.Grant.Invalid",
            ));
        }

        let mut project = self.existing_project(ctx, project_id, org_id).await?;
        if !project.unknown_roles(&role_keys).is_empty() {
            return Err(CommandError::precondition_failed(
                "PGRANT-6md2s",
                "Errors.Project.Role.NotFound",
            ));
        }
        self.require_entity(ctx, EntityKind::Org, granted_org_id, None).await?;
        self.check_permission(ctx, org_id, project_id, PROJECT_GRANT_WRITE).await?;

        let grant_id = self.next_id()?;
        let batch = PushBatch::new()
            .event(event(
                ctx,
                project.aggregate(),
                EventPayload::ProjectGrantAdded(ProjectGrantAdded {
                    grant_id: grant_id.clone(),
                    granted_org_id: granted_org_id.to_string(),
                    role_keys,
                }),
            ))
            .guard(project.guard())
            .constraint(UniqueConstraint::add(
                ctx.instance_id.as_str(),
                PROJECT_GRANT_TABLE,
                grant_key(project_id, granted_org_id),
                "Errors.Project.Grant.AlreadyExists",
            ));
        let details = self.push_and_reduce(ctx, &mut project, batch).await?;
        info!(project_id, grant_id = %grant_id, granted_org_id, "project grant added");
        Ok((grant_id, details))
    }

    /// Replace the roles of a grant
    ///
    /// Keys dropped from the grant are removed from the listed user and
    /// group grants issued through it.
    #[allow(clippy::too_many_arguments)]
    pub async fn change_project_grant(
        &self,
        ctx: &CommandContext,
        project_id: &str,
        org_id: &str,
        grant_id: &str,
        role_keys: Vec<String>,
        cascading_user_grant_ids: &[String],
        cascading_group_grant_ids: &[String],
    ) -> CommandResult<ObjectDetails> {
        require_ids(project_id, org_id, grant_id)?;

        let mut model = self
            .load(ctx, ProjectGrantWriteModel::new(project_id, grant_id, org_id, &ctx.instance_id))
            .await?;
        model.state.check(Lifecycle::Change, "Project.Grant")?;
        if same_roles(&model.role_keys, &role_keys) {
            return Err(CommandError::precondition_failed(
                "PGRANT-9sk3d",
                "Errors.Project.Grant.NotChanged",
            ));
        }
        let project = self.existing_project(ctx, project_id, org_id).await?;
        if !project.unknown_roles(&role_keys).is_empty() {
            return Err(CommandError::precondition_failed(
                "PGRANT-1kd8f",
                "Errors.Project.Role.NotFound",
            ));
        }
        self.check_permission(ctx, org_id, project_id, PROJECT_GRANT_WRITE).await?;

        let removed: Vec<String> = model
            .role_keys
            .iter()
            .filter(|key| !role_keys.contains(key))
            .cloned()
            .collect();
        let cascaded = if removed.is_empty() {
            PushBatch::new()
        } else {
            let instance_id = ctx.instance_id.as_str();
            let scope = CascadeScope::project_grant(project_id, grant_id);
            let effect = CascadeEffect::RemoveReferences(removed);
            let user_grants = self
                .cascade(
                    ctx,
                    cascading_user_grant_ids,
                    |id| UserGrantWriteModel::new(id, "", instance_id),
                    &scope,
                    &effect,
                )
                .await?;
            let group_grants = self
                .cascade(
                    ctx,
                    cascading_group_grant_ids,
                    |id| GroupGrantWriteModel::new(id, "", instance_id),
                    &scope,
                    &effect,
                )
                .await?;
            user_grants.merge(group_grants)
        };

        let batch = PushBatch::new()
            .event(event(
                ctx,
                model.aggregate(),
                EventPayload::ProjectGrantChanged(ProjectGrantChanged {
                    grant_id: grant_id.to_string(),
                    role_keys,
                }),
            ))
            .guard(model.guard())
            .guard(project.guard())
            .merge(cascaded);
        self.push_and_reduce(ctx, &mut model, batch).await
    }

    /// Remove a grant together with the listed user and group grants issued
    /// through it
    pub async fn remove_project_grant(
        &self,
        ctx: &CommandContext,
        project_id: &str,
        org_id: &str,
        grant_id: &str,
        cascading_user_grant_ids: &[String],
        cascading_group_grant_ids: &[String],
    ) -> CommandResult<ObjectDetails> {
        require_ids(project_id, org_id, grant_id)?;

        let mut model = self
            .load(ctx, ProjectGrantWriteModel::new(project_id, grant_id, org_id, &ctx.instance_id))
            .await?;
        model.state.check(Lifecycle::Remove, "Project.Grant")?;
        self.check_permission(ctx, org_id, project_id, PROJECT_GRANT_WRITE).await?;

        let instance_id = ctx.instance_id.as_str();
        let scope = CascadeScope::project_grant(project_id, grant_id);
        let user_grants = self
            .cascade(
                ctx,
                cascading_user_grant_ids,
                |id| UserGrantWriteModel::new(id, "", instance_id),
                &scope,
                &CascadeEffect::Invalidate,
            )
            .await?;
        let group_grants = self
            .cascade(
                ctx,
                cascading_group_grant_ids,
                |id| GroupGrantWriteModel::new(id, "", instance_id),
                &scope,
                &CascadeEffect::Invalidate,
            )
            .await?;
        let batch = PushBatch::new()
            .event(event(
                ctx,
                model.aggregate(),
                EventPayload::ProjectGrantRemoved(ProjectGrantRemoved {
                    grant_id: grant_id.to_string(),
                    granted_org_id: model.granted_org_id.clone(),
                }),
            ))
            .guard(model.guard())
            .constraint(UniqueConstraint::release(
                instance_id,
                PROJECT_GRANT_TABLE,
                grant_key(project_id, &model.granted_org_id),
            ))
            .merge(user_grants)
            .merge(group_grants);
        let details = self.push_and_reduce(ctx, &mut model, batch).await?;
        info!(project_id, grant_id, "project grant removed");
        Ok(details)
    }
}
