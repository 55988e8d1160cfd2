// Copyright (c) 2025 - Cowboy AI, Inc.
//! Custom message text commands

use std::collections::BTreeMap;

use super::label_policy::validate_scope;
use super::{event, invalid, Commands};
use crate::aggregate::{CustomTextWriteModel, PolicyScope, WriteModel};
use crate::context::CommandContext;
use crate::domain::invariants::{require, validate_language};
use crate::domain::ObjectDetails;
use crate::errors::{CommandError, CommandResult};
use crate::event_store::PushBatch;
use crate::events::policy::{CustomTextRemoved, CustomTextSet, CustomTextTemplateRemoved};
use crate::events::EventPayload;

impl Commands {
    /// Set the texts of a template in one language
    ///
    /// An empty text removes the key. Texts equal to the stored ones emit
    /// nothing; when nothing differs the current details come back without
    /// a push.
    pub async fn set_custom_texts(
        &self,
        ctx: &CommandContext,
        scope: PolicyScope,
        template: &str,
        language: &str,
        texts: BTreeMap<String, String>,
    ) -> CommandResult<ObjectDetails> {
        validate_scope(&scope)?;
        require("template", template).map_err(invalid("TEXT-2kd9s", "Errors.CustomText.Invalid"))?;
        validate_language(language).map_err(invalid("TEXT-8sj2d", "Errors.CustomText.Invalid"))?;
        for key in texts.keys() {
            require("key", key).map_err(invalid("TEXT-0dk3m", "Errors.CustomText.Invalid"))?;
        }

        let mut model = self
            .load(ctx, CustomTextWriteModel::new(scope, template, language, &ctx.instance_id))
            .await?;
        let aggregate = model.aggregate();
        self.check_permission(ctx, &aggregate.resource_owner, &aggregate.id, model.scope().write_permission())
            .await?;

        let events: Vec<_> = texts
            .into_iter()
            .filter_map(|(key, text)| {
                let payload = match (model.texts.get(&key), text.is_empty()) {
                    (Some(_), true) => EventPayload::CustomTextRemoved(CustomTextRemoved {
                        template: template.to_string(),
                        language: language.to_string(),
                        key,
                    }),
                    (None, true) => return None,
                    (Some(current), false) if *current == text => return None,
                    (_, false) => EventPayload::CustomTextSet(CustomTextSet {
                        template: template.to_string(),
                        language: language.to_string(),
                        key,
                        text,
                    }),
                };
                Some(event(ctx, aggregate.clone(), payload))
            })
            .collect();
        if events.is_empty() {
            return Ok(model.details());
        }

        let batch = PushBatch::new().events(events).guard(model.guard());
        self.push_and_reduce(ctx, &mut model, batch).await
    }

    /// Drop all texts of an org's template in one language
    pub async fn reset_custom_texts(
        &self,
        ctx: &CommandContext,
        org_id: &str,
        template: &str,
        language: &str,
    ) -> CommandResult<ObjectDetails> {
        let scope = PolicyScope::Org(org_id.to_string());
        validate_scope(&scope)?;
        validate_language(language).map_err(invalid("TEXT-4md8s", "Errors.CustomText.Invalid"))?;

        let mut model = self
            .load(ctx, CustomTextWriteModel::new(scope, template, language, &ctx.instance_id))
            .await?;
        if !model.state.is_active() {
            return Err(CommandError::not_found("TEXT-9fk2s", "Errors.CustomText.NotFound"));
        }
        let aggregate = model.aggregate();
        self.check_permission(ctx, &aggregate.resource_owner, &aggregate.id, model.scope().write_permission())
            .await?;

        let removed = CustomTextTemplateRemoved {
            template: template.to_string(),
            language: language.to_string(),
        };
        let batch = PushBatch::new()
            .event(event(ctx, aggregate, EventPayload::CustomTextTemplateRemoved(removed)))
            .guard(model.guard());
        self.push_and_reduce(ctx, &mut model, batch).await
    }
}
