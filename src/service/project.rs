// Copyright (c) 2025 - Cowboy AI, Inc.
//! Project and project role commands
//!
//! Removing a project or a role leaves dependents behind. The caller names
//! them (`cascading_*_ids`); the [`cascade`](super::cascade) coordinator
//! turns the affected ones into companion events of the same push.

use tracing::{info, warn};

use super::cascade::{CascadeEffect, CascadeScope};
use super::project_grant::{grant_key, PROJECT_GRANT_TABLE};
use super::{event, invalid, Commands};
use crate::adapters::EntityKind;
use crate::aggregate::{
    GroupGrantWriteModel, ProjectGrantRolesWriteModel, ProjectGrantWriteModel, ProjectRoleWriteModel,
    ProjectWriteModel, UserGrantWriteModel, WriteModel,
};
use crate::context::CommandContext;
use crate::domain::invariants::{require, validate_unique_keys};
use crate::domain::ObjectDetails;
use crate::errors::{CommandError, CommandResult};
use crate::event_store::{PushBatch, UniqueConstraint};
use crate::events::project::{
    ProjectAdded, ProjectChanged, ProjectRemoved, ProjectRoleAdded, ProjectRoleChanged,
    ProjectRoleRemoved,
};
use crate::events::{EmptyPayload, EventPayload};
use crate::state_machine::Lifecycle;

pub(crate) const PROJECT_NAME_TABLE: &str = "project_names";
pub(crate) const PROJECT_ROLE_TABLE: &str = "project_roles";

const PROJECT_WRITE: &str = "project.write";
const PROJECT_ROLE_WRITE: &str = "project.role.write";

/// Role to define on a project
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectRole {
    pub key: String,
    pub display_name: String,
    pub group: String,
}

impl ProjectRole {
    pub fn new(key: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            display_name: display_name.into(),
            group: String::new(),
        }
    }

    pub fn with_group(mut self, group: impl Into<String>) -> Self {
        self.group = group.into();
        self
    }

    fn validate(&self) -> CommandResult<()> {
        require("key", &self.key)
            .and_then(|()| require("display_name", &self.display_name))
            .map_err(invalid("PROJECT-2kd8s", "Errors.Project.Role.Invalid"))
    }

    fn added(&self) -> EventPayload {
        EventPayload::ProjectRoleAdded(ProjectRoleAdded {
            key: self.key.clone(),
            display_name: self.display_name.clone(),
            group: self.group.clone(),
        })
    }
}

fn name_key(org_id: &str, name: &str) -> String {
    format!("{org_id}:{name}")
}

pub(crate) fn role_key(project_id: &str, key: &str) -> String {
    format!("{project_id}:{key}")
}

fn require_ids(project_id: &str, org_id: &str) -> CommandResult<()> {
    require("project_id", project_id)
        .and_then(|()| require("resource_owner", org_id))
        .map_err(invalid("PROJECT-0sd2m", "Errors.IDMissing"))
}

impl Commands {
    /// Load a project, failing with `PreconditionFailed` unless it exists
    pub(crate) async fn existing_project(
        &self,
        ctx: &CommandContext,
        project_id: &str,
        org_id: &str,
    ) -> CommandResult<ProjectWriteModel> {
        let project = self
            .load(ctx, ProjectWriteModel::new(project_id, org_id, &ctx.instance_id))
            .await?;
        if !project.state.exists() {
            return Err(CommandError::precondition_failed(
                "PROJECT-4md9s",
                "Errors.Project.NotFound",
            ));
        }
        Ok(project)
    }

    /// Create a project in `org_id`; the new project id is in the details
    pub async fn add_project(&self, ctx: &CommandContext, org_id: &str, name: &str) -> CommandResult<ObjectDetails> {
        require("resource_owner", org_id)
            .and_then(|()| require("name", name))
            .map_err(invalid("PROJECT-8fj2s", "Errors.Project.Invalid"))?;
        self.require_entity(ctx, EntityKind::Org, org_id, None).await?;
        self.check_permission(ctx, org_id, org_id, "project.create").await?;

        let project_id = self.next_id()?;
        let mut model = ProjectWriteModel::new(&project_id, org_id, &ctx.instance_id);
        let batch = PushBatch::new()
            .event(event(
                ctx,
                model.aggregate(),
                EventPayload::ProjectAdded(ProjectAdded {
                    name: name.to_string(),
                }),
            ))
            .guard(model.guard())
            .constraint(UniqueConstraint::add(
                ctx.instance_id.as_str(),
                PROJECT_NAME_TABLE,
                name_key(org_id, name),
                "Errors.Project.AlreadyExists",
            ));
        let details = self.push_and_reduce(ctx, &mut model, batch).await?;
        info!(project_id = %project_id, org_id, "project added");
        Ok(details)
    }

    pub async fn change_project(
        &self,
        ctx: &CommandContext,
        project_id: &str,
        org_id: &str,
        name: &str,
    ) -> CommandResult<ObjectDetails> {
        require_ids(project_id, org_id)?;
        require("name", name).map_err(invalid("PROJECT-3nd8c", "Errors.Project.Invalid"))?;

        let mut model = self
            .load(ctx, ProjectWriteModel::new(project_id, org_id, &ctx.instance_id))
            .await?;
        model.state.check(Lifecycle::Change, "Project")?;
        if model.name == name {
            return Err(CommandError::precondition_failed(
                "PROJECT-7sk2d",
                "Errors.Project.NotChanged",
            ));
        }
        self.check_permission(ctx, org_id, project_id, PROJECT_WRITE).await?;

        let batch = PushBatch::new()
            .event(event(
                ctx,
                model.aggregate(),
                EventPayload::ProjectChanged(ProjectChanged {
                    name: name.to_string(),
                }),
            ))
            .guard(model.guard())
            .constraint(UniqueConstraint::release(
                ctx.instance_id.as_str(),
                PROJECT_NAME_TABLE,
                name_key(org_id, &model.name),
            ))
            .constraint(UniqueConstraint::add(
                ctx.instance_id.as_str(),
                PROJECT_NAME_TABLE,
                name_key(org_id, name),
                "Errors.Project.AlreadyExists",
            ));
        self.push_and_reduce(ctx, &mut model, batch).await
    }

    pub async fn deactivate_project(
        &self,
        ctx: &CommandContext,
        project_id: &str,
        org_id: &str,
    ) -> CommandResult<ObjectDetails> {
        self.transition_project(ctx, project_id, org_id, Lifecycle::Deactivate)
            .await
    }

    pub async fn reactivate_project(
        &self,
        ctx: &CommandContext,
        project_id: &str,
        org_id: &str,
    ) -> CommandResult<ObjectDetails> {
        self.transition_project(ctx, project_id, org_id, Lifecycle::Reactivate)
            .await
    }

    async fn transition_project(
        &self,
        ctx: &CommandContext,
        project_id: &str,
        org_id: &str,
        input: Lifecycle,
    ) -> CommandResult<ObjectDetails> {
        require_ids(project_id, org_id)?;
        let mut model = self
            .load(ctx, ProjectWriteModel::new(project_id, org_id, &ctx.instance_id))
            .await?;
        model.state.check(input, "Project")?;
        self.check_permission(ctx, org_id, project_id, PROJECT_WRITE).await?;

        let payload = match input {
            Lifecycle::Deactivate => EventPayload::ProjectDeactivated(EmptyPayload {}),
            _ => EventPayload::ProjectReactivated(EmptyPayload {}),
        };
        let batch = PushBatch::new()
            .event(event(ctx, model.aggregate(), payload))
            .guard(model.guard());
        self.push_and_reduce(ctx, &mut model, batch).await
    }

    /// Remove a project with its roles and grants
    ///
    /// The listed user and group grants that belong to the project are
    /// removed in the same push; project grants end with the project itself.
    pub async fn remove_project(
        &self,
        ctx: &CommandContext,
        project_id: &str,
        org_id: &str,
        cascading_user_grant_ids: &[String],
        cascading_group_grant_ids: &[String],
    ) -> CommandResult<ObjectDetails> {
        require_ids(project_id, org_id)?;
        let mut model = self
            .load(ctx, ProjectWriteModel::new(project_id, org_id, &ctx.instance_id))
            .await?;
        model.state.check(Lifecycle::Remove, "Project")?;
        self.check_permission(ctx, org_id, project_id, PROJECT_WRITE).await?;

        let instance_id = ctx.instance_id.as_str();
        let released = std::iter::once(UniqueConstraint::release(
            instance_id,
            PROJECT_NAME_TABLE,
            name_key(org_id, &model.name),
        ))
        .chain(
            model
                .role_keys
                .iter()
                .map(|key| UniqueConstraint::release(instance_id, PROJECT_ROLE_TABLE, role_key(project_id, key))),
        )
        .chain(model.granted_orgs.values().map(|granted_org| {
            UniqueConstraint::release(instance_id, PROJECT_GRANT_TABLE, grant_key(project_id, granted_org))
        }));
        let mut batch = PushBatch::new()
            .event(event(
                ctx,
                model.aggregate(),
                EventPayload::ProjectRemoved(ProjectRemoved {
                    name: model.name.clone(),
                }),
            ))
            .guard(model.guard());
        for constraint in released {
            batch = batch.constraint(constraint);
        }

        let scope = CascadeScope::project(project_id);
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
        let batch = batch.merge(user_grants).merge(group_grants);
        let details = self.push_and_reduce(ctx, &mut model, batch).await?;
        info!(project_id, org_id, "project removed");
        Ok(details)
    }

    pub async fn add_project_role(
        &self,
        ctx: &CommandContext,
        project_id: &str,
        org_id: &str,
        role: ProjectRole,
    ) -> CommandResult<ObjectDetails> {
        self.bulk_add_project_roles(ctx, project_id, org_id, vec![role]).await
    }

    /// Add several roles in one push; a duplicate key in the request is invalid
    pub async fn bulk_add_project_roles(
        &self,
        ctx: &CommandContext,
        project_id: &str,
        org_id: &str,
        roles: Vec<ProjectRole>,
    ) -> CommandResult<ObjectDetails> {
        require_ids(project_id, org_id)?;
        if roles.is_empty() {
            return Err(CommandError::invalid_argument("PROJECT-6dk3s", "Errors.Project.Role.Invalid"));
        }
        for role in &roles {
            role.validate()?;
        }
        validate_unique_keys(roles.iter().map(|role| role.key.as_str()))
            .map_err(invalid("PROJECT-1md8s", "Errors.Project.Role.DuplicateKeys"))?;

        let mut model = self.existing_project(ctx, project_id, org_id).await?;
        if roles.iter().any(|role| model.role_keys.contains(&role.key)) {
            return Err(CommandError::already_exists(
                "PROJECT-9fk2m",
                "Errors.Project.Role.AlreadyExists",
            ));
        }
        self.check_permission(ctx, org_id, project_id, PROJECT_ROLE_WRITE).await?;

        let aggregate = model.aggregate();
        let mut batch = PushBatch::new().guard(model.guard());
        for role in &roles {
            batch = batch
                .event(event(ctx, aggregate.clone(), role.added()))
                .constraint(UniqueConstraint::add(
                    ctx.instance_id.as_str(),
                    PROJECT_ROLE_TABLE,
                    role_key(project_id, &role.key),
                    "Errors.Project.Role.AlreadyExists",
                ));
        }
        self.push_and_reduce(ctx, &mut model, batch).await
    }

    pub async fn change_project_role(
        &self,
        ctx: &CommandContext,
        project_id: &str,
        org_id: &str,
        role: ProjectRole,
    ) -> CommandResult<ObjectDetails> {
        require_ids(project_id, org_id)?;
        role.validate()?;

        let mut model = self
            .load(ctx, ProjectRoleWriteModel::new(project_id, &role.key, org_id, &ctx.instance_id))
            .await?;
        model.state.check(Lifecycle::Change, "Project.Role")?;
        let changed = ProjectRoleChanged {
            key: role.key.clone(),
            display_name: (model.display_name != role.display_name).then(|| role.display_name.clone()),
            group: (model.group != role.group).then(|| role.group.clone()),
        };
        if changed.display_name.is_none() && changed.group.is_none() {
            return Err(CommandError::precondition_failed(
                "PROJECT-5ks9d",
                "Errors.Project.Role.NotChanged",
            ));
        }
        self.check_permission(ctx, org_id, project_id, PROJECT_ROLE_WRITE).await?;

        let batch = PushBatch::new()
            .event(event(ctx, model.aggregate(), EventPayload::ProjectRoleChanged(changed)))
            .guard(model.guard());
        self.push_and_reduce(ctx, &mut model, batch).await
    }

    /// Remove a role and drop its key from the listed grants
    ///
    /// Project, user and group grants still holding `key` get a cascade
    /// change with the reduced key set in the same push; the reduced set
    /// may be empty. The push is guarded by every grant of the project, so
    /// a grant picking up `key` concurrently aborts the removal.
    #[allow(clippy::too_many_arguments)]
    pub async fn remove_project_role(
        &self,
        ctx: &CommandContext,
        project_id: &str,
        org_id: &str,
        key: &str,
        cascading_project_grant_ids: &[String],
        cascading_user_grant_ids: &[String],
        cascading_group_grant_ids: &[String],
    ) -> CommandResult<ObjectDetails> {
        require_ids(project_id, org_id)?;
        require("key", key).map_err(invalid("PROJECT-3fk8s", "Errors.Project.Role.Invalid"))?;

        let mut model = self
            .load(ctx, ProjectRoleWriteModel::new(project_id, key, org_id, &ctx.instance_id))
            .await?;
        model.state.check(Lifecycle::Remove, "Project.Role")?;
        self.check_permission(ctx, org_id, project_id, PROJECT_ROLE_WRITE).await?;

        let grant_roles = self
            .load(ctx, ProjectGrantRolesWriteModel::new(project_id, org_id, &ctx.instance_id))
            .await?;
        let unlisted: Vec<&str> = grant_roles
            .holders(key)
            .into_iter()
            .filter(|grant_id| !cascading_project_grant_ids.iter().any(|id| id == grant_id))
            .collect();
        if !unlisted.is_empty() {
            warn!(project_id, key, ?unlisted, "project grants holding the role are not cascaded");
        }

        let instance_id = ctx.instance_id.as_str();
        let scope = CascadeScope::project(project_id);
        let effect = CascadeEffect::RemoveReferences(vec![key.to_string()]);
        let grants = self
            .cascade(
                ctx,
                cascading_project_grant_ids,
                |id| ProjectGrantWriteModel::new(project_id, id, org_id, instance_id),
                &scope,
                &effect,
            )
            .await?;
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

        let batch = PushBatch::new()
            .event(event(
                ctx,
                model.aggregate(),
                EventPayload::ProjectRoleRemoved(ProjectRoleRemoved { key: key.to_string() }),
            ))
            .guard(model.guard())
            .guard(grant_roles.guard())
            .constraint(UniqueConstraint::release(
                instance_id,
                PROJECT_ROLE_TABLE,
                role_key(project_id, key),
            ))
            .merge(grants)
            .merge(user_grants)
            .merge(group_grants);
        let cascaded = batch.events.len() - 1;
        let details = self.push_and_reduce(ctx, &mut model, batch).await?;
        info!(project_id, key, cascaded, "project role removed");
        Ok(details)
    }
}
