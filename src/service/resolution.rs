// Copyright (c) 2025 - Cowboy AI, Inc.
//! Effective policy lookup
//!
//! An org override wins while it is active; otherwise the instance default
//! applies and the result is marked as default.

use std::collections::BTreeMap;

use tracing::debug;

use super::Commands;
use crate::aggregate::{
    CustomTextWriteModel, EffectiveLabelPolicy, LabelPolicyWriteModel, PolicyScope,
    PolicySettings, PolicyWriteModel, WriteModel,
};
use crate::context::CommandContext;
use crate::domain::ObjectDetails;
use crate::errors::{CommandError, CommandResult};

/// Value found by the resolution chain
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolved<T> {
    pub value: T,
    /// The value comes from the instance, not from the org
    pub is_default: bool,
    pub details: ObjectDetails,
}

impl Commands {
    pub async fn resolve_label_policy(
        &self,
        ctx: &CommandContext,
        org_id: &str,
    ) -> CommandResult<Resolved<EffectiveLabelPolicy>> {
        let org = self
            .load(ctx, LabelPolicyWriteModel::new(PolicyScope::Org(org_id.to_string()), &ctx.instance_id))
            .await?;
        if org.state.is_active() {
            return Ok(Resolved {
                value: org.effective(),
                is_default: false,
                details: org.details(),
            });
        }

        let instance = self
            .load(ctx, LabelPolicyWriteModel::new(PolicyScope::Instance, &ctx.instance_id))
            .await?;
        if !instance.state.is_active() {
            return Err(CommandError::not_found("RESOLVE-2kd9s", "Errors.LabelPolicy.NotFound"));
        }
        debug!(org_id, "label policy resolved to instance default");
        Ok(Resolved {
            value: instance.effective(),
            is_default: true,
            details: instance.details(),
        })
    }

    pub async fn resolve_policy<P: PolicySettings>(
        &self,
        ctx: &CommandContext,
        org_id: &str,
    ) -> CommandResult<Resolved<P>> {
        let org = self
            .load(
                ctx,
                PolicyWriteModel::<P>::new(PolicyScope::Org(org_id.to_string()), &ctx.instance_id),
            )
            .await?;
        if org.state.is_active() {
            let details = org.details();
            return Ok(Resolved {
                value: org.settings,
                is_default: false,
                details,
            });
        }

        let instance = self
            .load(ctx, PolicyWriteModel::<P>::new(PolicyScope::Instance, &ctx.instance_id))
            .await?;
        if !instance.state.is_active() {
            return Err(CommandError::not_found(
                "RESOLVE-7fj3s",
                format!("Errors.{}.NotFound", P::NAME),
            ));
        }
        debug!(org_id, policy = P::NAME, "policy resolved to instance default");
        let details = instance.details();
        Ok(Resolved {
            value: instance.settings,
            is_default: true,
            details,
        })
    }

    /// Texts of the org if any are set, else those of the instance
    ///
    /// Having no texts at either level is not an error.
    pub async fn resolve_custom_texts(
        &self,
        ctx: &CommandContext,
        org_id: &str,
        template: &str,
        language: &str,
    ) -> CommandResult<Resolved<BTreeMap<String, String>>> {
        let org = self
            .load(
                ctx,
                CustomTextWriteModel::new(
                    PolicyScope::Org(org_id.to_string()),
                    template,
                    language,
                    &ctx.instance_id,
                ),
            )
            .await?;
        if org.state.is_active() {
            let details = org.details();
            return Ok(Resolved {
                value: org.texts,
                is_default: false,
                details,
            });
        }

        let instance = self
            .load(
                ctx,
                CustomTextWriteModel::new(PolicyScope::Instance, template, language, &ctx.instance_id),
            )
            .await?;
        let details = instance.details();
        Ok(Resolved {
            value: instance.texts,
            is_default: true,
            details,
        })
    }
}
