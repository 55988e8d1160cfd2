// Copyright (c) 2025 - Cowboy AI, Inc.
//! Label policy commands

use tracing::{info, warn};

use super::{event, invalid, Commands};
use crate::aggregate::{LabelPolicyWriteModel, PolicyScope, WriteModel};
use crate::context::CommandContext;
use crate::domain::{LabelAsset, LabelPolicy, ObjectDetails};
use crate::errors::{CommandError, CommandResult};
use crate::event_store::PushBatch;
use crate::events::policy::{LabelAssetAdded, LabelAssetRemoved};
use crate::events::{EmptyPayload, EventPayload};
use crate::state_machine::Lifecycle;

/// Uploaded branding asset
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetUpload {
    pub content_type: String,
    pub content: Vec<u8>,
}

/// Reject an org scope without an id
pub(crate) fn validate_scope(scope: &PolicyScope) -> CommandResult<()> {
    match scope {
        PolicyScope::Org(org_id) if org_id.trim().is_empty() => {
            Err(CommandError::invalid_argument("POLICY-0sk2m", "Errors.IDMissing"))
        }
        _ => Ok(()),
    }
}

impl Commands {
    pub async fn add_label_policy(
        &self,
        ctx: &CommandContext,
        scope: PolicyScope,
        policy: LabelPolicy,
    ) -> CommandResult<ObjectDetails> {
        validate_scope(&scope)?;
        policy
            .validate()
            .map_err(invalid("LABEL-3m9fs", "Errors.LabelPolicy.Invalid"))?;

        let mut model = self
            .load(ctx, LabelPolicyWriteModel::new(scope, &ctx.instance_id))
            .await?;
        model.state.check(Lifecycle::Add, &model.entity())?;
        let aggregate = model.aggregate();
        self.check_permission(ctx, &aggregate.resource_owner, &aggregate.id, model.scope().write_permission())
            .await?;

        let batch = PushBatch::new()
            .event(event(ctx, aggregate, EventPayload::LabelPolicyAdded(policy)))
            .guard(model.guard());
        self.push_and_reduce(ctx, &mut model, batch).await
    }

    /// Replace the preview; the policy stays inactive until activated again
    pub async fn change_label_policy(
        &self,
        ctx: &CommandContext,
        scope: PolicyScope,
        policy: LabelPolicy,
    ) -> CommandResult<ObjectDetails> {
        validate_scope(&scope)?;
        policy
            .validate()
            .map_err(invalid("LABEL-8dk2c", "Errors.LabelPolicy.Invalid"))?;

        let mut model = self
            .load(ctx, LabelPolicyWriteModel::new(scope, &ctx.instance_id))
            .await?;
        model.state.check(Lifecycle::Change, &model.entity())?;
        let changes = model.changes(&policy).ok_or_else(|| {
            CommandError::precondition_failed(
                "LABEL-4nf9s",
                format!("Errors.{}.NotChanged", model.entity()),
            )
        })?;
        let aggregate = model.aggregate();
        self.check_permission(ctx, &aggregate.resource_owner, &aggregate.id, model.scope().write_permission())
            .await?;

        let batch = PushBatch::new()
            .event(event(ctx, aggregate, EventPayload::LabelPolicyChanged(changes)))
            .guard(model.guard());
        self.push_and_reduce(ctx, &mut model, batch).await
    }

    pub async fn activate_label_policy(
        &self,
        ctx: &CommandContext,
        scope: PolicyScope,
    ) -> CommandResult<ObjectDetails> {
        validate_scope(&scope)?;
        let mut model = self
            .load(ctx, LabelPolicyWriteModel::new(scope, &ctx.instance_id))
            .await?;
        model.state.check(Lifecycle::Change, &model.entity())?;
        let aggregate = model.aggregate();
        self.check_permission(ctx, &aggregate.resource_owner, &aggregate.id, model.scope().write_permission())
            .await?;

        let batch = PushBatch::new()
            .event(event(ctx, aggregate, EventPayload::LabelPolicyActivated(EmptyPayload {})))
            .guard(model.guard());
        self.push_and_reduce(ctx, &mut model, batch).await
    }

    /// Remove an org override together with its stored assets
    ///
    /// Assets are deleted before the event is pushed; a storage failure
    /// leaves the policy in place.
    pub async fn remove_label_policy(&self, ctx: &CommandContext, org_id: &str) -> CommandResult<ObjectDetails> {
        let scope = PolicyScope::Org(org_id.to_string());
        validate_scope(&scope)?;
        let mut model = self
            .load(ctx, LabelPolicyWriteModel::new(scope, &ctx.instance_id))
            .await?;
        model.state.check(Lifecycle::Remove, &model.entity())?;
        let aggregate = model.aggregate();
        self.check_permission(ctx, &aggregate.resource_owner, &aggregate.id, model.scope().write_permission())
            .await?;

        for key in model.assets.values() {
            self.assets.remove_object(&ctx.instance_id, key).await?;
        }

        let batch = PushBatch::new()
            .event(event(ctx, aggregate, EventPayload::LabelPolicyRemoved(EmptyPayload {})))
            .guard(model.guard());
        self.push_and_reduce(ctx, &mut model, batch).await
    }

    /// Upload an asset into the policy preview
    pub async fn add_label_asset(
        &self,
        ctx: &CommandContext,
        scope: PolicyScope,
        asset: LabelAsset,
        upload: AssetUpload,
    ) -> CommandResult<ObjectDetails> {
        validate_scope(&scope)?;
        if upload.content.is_empty() || upload.content_type.trim().is_empty() {
            return Err(CommandError::invalid_argument("LABEL-6fk3s", "Errors.Assets.Empty"));
        }

        let mut model = self
            .load(ctx, LabelPolicyWriteModel::new(scope, &ctx.instance_id))
            .await?;
        model.state.check(Lifecycle::Change, &model.entity())?;
        let aggregate = model.aggregate();
        self.check_permission(ctx, &aggregate.resource_owner, &aggregate.id, model.scope().write_permission())
            .await?;

        let name = format!("{}{}", asset.object_prefix(), self.next_id()?);
        let storage_key = self
            .assets
            .put_object(
                &ctx.instance_id,
                &aggregate.resource_owner,
                &name,
                &upload.content_type,
                upload.content,
            )
            .await?;
        let replaced = model.assets.get(&asset).cloned();

        let batch = PushBatch::new()
            .event(event(
                ctx,
                aggregate,
                EventPayload::LabelAssetAdded(LabelAssetAdded { asset, storage_key }),
            ))
            .guard(model.guard());
        let details = self.push_and_reduce(ctx, &mut model, batch).await?;

        if let Some(replaced) = replaced {
            // the event is durable; a leftover object is only garbage
            if let Err(err) = self.assets.remove_object(&ctx.instance_id, &replaced).await {
                warn!(key = %replaced, error = %err, "replaced label asset not removed");
            }
        }
        info!(asset = %asset, aggregate_id = %details.aggregate_id, "label asset added");
        Ok(details)
    }

    pub async fn remove_label_asset(
        &self,
        ctx: &CommandContext,
        scope: PolicyScope,
        asset: LabelAsset,
    ) -> CommandResult<ObjectDetails> {
        validate_scope(&scope)?;
        let mut model = self
            .load(ctx, LabelPolicyWriteModel::new(scope, &ctx.instance_id))
            .await?;
        model.state.check(Lifecycle::Change, &model.entity())?;
        let storage_key = model.assets.get(&asset).cloned().ok_or_else(|| {
            CommandError::not_found("LABEL-2md8s", format!("Errors.{}.Asset.NotFound", model.entity()))
        })?;
        let aggregate = model.aggregate();
        self.check_permission(ctx, &aggregate.resource_owner, &aggregate.id, model.scope().write_permission())
            .await?;

        self.assets.remove_object(&ctx.instance_id, &storage_key).await?;

        let batch = PushBatch::new()
            .event(event(
                ctx,
                aggregate,
                EventPayload::LabelAssetRemoved(LabelAssetRemoved { asset, storage_key }),
            ))
            .guard(model.guard());
        self.push_and_reduce(ctx, &mut model, batch).await
    }
}
