// Copyright (c) 2025 - Cowboy AI, Inc.
//! Settings policy commands
//!
//! One set of commands serves every [`PolicySettings`] type; the type
//! parameter picks the events and the error keys.

use super::label_policy::validate_scope;
use super::{event, invalid, Commands};
use crate::aggregate::{PolicyScope, PolicySettings, PolicyWriteModel, WriteModel};
use crate::context::CommandContext;
use crate::domain::ObjectDetails;
use crate::errors::{CommandError, CommandResult};
use crate::event_store::PushBatch;
use crate::state_machine::Lifecycle;

impl Commands {
    pub async fn add_policy<P: PolicySettings>(
        &self,
        ctx: &CommandContext,
        scope: PolicyScope,
        settings: P,
    ) -> CommandResult<ObjectDetails> {
        validate_scope(&scope)?;
        settings
            .validate()
            .map_err(invalid("POLICY-5kd8s", "Errors.Policy.Invalid"))?;

        let mut model = self
            .load(ctx, PolicyWriteModel::<P>::new(scope, &ctx.instance_id))
            .await?;
        model.state.check(Lifecycle::Add, &model.entity())?;
        let aggregate = model.aggregate();
        self.check_permission(ctx, &aggregate.resource_owner, &aggregate.id, model.scope().write_permission())
            .await?;

        let batch = PushBatch::new()
            .event(event(ctx, aggregate, settings.added()))
            .guard(model.guard());
        self.push_and_reduce(ctx, &mut model, batch).await
    }

    /// Identical settings fail with `PreconditionFailed` and push nothing
    pub async fn change_policy<P: PolicySettings>(
        &self,
        ctx: &CommandContext,
        scope: PolicyScope,
        settings: P,
    ) -> CommandResult<ObjectDetails> {
        validate_scope(&scope)?;
        settings
            .validate()
            .map_err(invalid("POLICY-9fj3d", "Errors.Policy.Invalid"))?;

        let mut model = self
            .load(ctx, PolicyWriteModel::<P>::new(scope, &ctx.instance_id))
            .await?;
        model.state.check(Lifecycle::Change, &model.entity())?;
        let changes = model.settings.changes(&settings).ok_or_else(|| {
            CommandError::precondition_failed(
                "POLICY-3md9s",
                format!("Errors.{}.NotChanged", model.entity()),
            )
        })?;
        let aggregate = model.aggregate();
        self.check_permission(ctx, &aggregate.resource_owner, &aggregate.id, model.scope().write_permission())
            .await?;

        let batch = PushBatch::new()
            .event(event(ctx, aggregate, P::changed(changes)))
            .guard(model.guard());
        self.push_and_reduce(ctx, &mut model, batch).await
    }

    /// Remove an org override; readers fall back to the instance default
    pub async fn remove_policy<P: PolicySettings>(
        &self,
        ctx: &CommandContext,
        org_id: &str,
    ) -> CommandResult<ObjectDetails> {
        let scope = PolicyScope::Org(org_id.to_string());
        validate_scope(&scope)?;

        let mut model = self
            .load(ctx, PolicyWriteModel::<P>::new(scope, &ctx.instance_id))
            .await?;
        model.state.check(Lifecycle::Remove, &model.entity())?;
        let aggregate = model.aggregate();
        self.check_permission(ctx, &aggregate.resource_owner, &aggregate.id, model.scope().write_permission())
            .await?;

        let batch = PushBatch::new()
            .event(event(ctx, aggregate, P::removed()))
            .guard(model.guard());
        self.push_and_reduce(ctx, &mut model, batch).await
    }
}
