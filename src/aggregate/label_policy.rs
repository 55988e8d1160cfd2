// Copyright (c) 2025 - Cowboy AI, Inc.
//! Label policy write model
//!
//! Changes and asset uploads go to a preview; `activated` turns true only
//! after an explicit activation and falls back to false on the next change.

use std::collections::BTreeMap;

use super::{PolicyScope, WriteModel, WriteModelRoot};
use crate::domain::{LabelAsset, LabelPolicy};
use crate::event_store::{AggregateFilter, SearchQuery};
use crate::events::policy::LabelPolicyChanged;
use crate::events::{event_types, Aggregate, EventPayload, StoredEvent};
use crate::state_machine::EntityState;

/// Label policy of one scope
#[derive(Debug, Clone, PartialEq)]
pub struct LabelPolicyWriteModel {
    root: WriteModelRoot,
    scope: PolicyScope,
    pub policy: LabelPolicy,
    /// Storage keys of uploaded assets
    pub assets: BTreeMap<LabelAsset, String>,
    pub activated: bool,
    pub state: EntityState,
}

/// Label policy as seen by readers of the resolution chain
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct EffectiveLabelPolicy {
    pub policy: LabelPolicy,
    pub assets: BTreeMap<LabelAsset, String>,
    pub activated: bool,
}

impl LabelPolicyWriteModel {
    pub fn new(scope: PolicyScope, instance_id: &str) -> Self {
        Self {
            root: scope.root(instance_id),
            scope,
            policy: LabelPolicy::default(),
            assets: BTreeMap::new(),
            activated: false,
            state: EntityState::Unspecified,
        }
    }

    pub fn scope(&self) -> &PolicyScope {
        &self.scope
    }

    pub fn aggregate(&self) -> Aggregate {
        self.scope.aggregate(&self.root.instance_id)
    }

    /// Entity name used in error keys, e.g. `Org.LabelPolicy`
    pub fn entity(&self) -> String {
        format!("{}.LabelPolicy", self.scope.error_prefix())
    }

    /// Fields of `target` that differ from the current policy
    pub fn changes(&self, target: &LabelPolicy) -> Option<LabelPolicyChanged> {
        diff_fields!(self.policy, target, LabelPolicyChanged {
            primary_color,
            background_color,
            warn_color,
            font_color,
            primary_color_dark,
            background_color_dark,
            warn_color_dark,
            font_color_dark,
            hide_login_name_suffix,
            error_msg_popup,
            disable_watermark,
            theme_mode,
        })
    }

    pub fn effective(&self) -> EffectiveLabelPolicy {
        EffectiveLabelPolicy {
            policy: self.policy.clone(),
            assets: self.assets.clone(),
            activated: self.activated,
        }
    }
}

impl WriteModel for LabelPolicyWriteModel {
    fn root(&self) -> &WriteModelRoot {
        &self.root
    }

    fn root_mut(&mut self) -> &mut WriteModelRoot {
        &mut self.root
    }

    fn query(&self) -> SearchQuery {
        SearchQuery::new().instance_id(self.root.instance_id.as_str()).filter(
            AggregateFilter::new(self.scope.aggregate_type())
                .aggregate_id(self.root.aggregate_id.as_str())
                .event_types([
                    event_types::LABEL_POLICY_ADDED,
                    event_types::LABEL_POLICY_CHANGED,
                    event_types::LABEL_POLICY_ACTIVATED,
                    event_types::LABEL_POLICY_REMOVED,
                    event_types::LABEL_ASSET_ADDED,
                    event_types::LABEL_ASSET_REMOVED,
                ]),
        )
    }

    fn reduce(&mut self, event: &StoredEvent) {
        match &event.payload {
            EventPayload::LabelPolicyAdded(policy) => {
                self.policy = policy.clone();
                self.assets.clear();
                self.activated = false;
                self.state = EntityState::Active;
            }
            EventPayload::LabelPolicyChanged(changes) => {
                apply_fields!(self.policy, changes, {
                    primary_color,
                    background_color,
                    warn_color,
                    font_color,
                    primary_color_dark,
                    background_color_dark,
                    warn_color_dark,
                    font_color_dark,
                    hide_login_name_suffix,
                    error_msg_popup,
                    disable_watermark,
                    theme_mode,
                });
                self.activated = false;
            }
            EventPayload::LabelPolicyActivated(_) => self.activated = true,
            EventPayload::LabelPolicyRemoved(_) => {
                self.policy = LabelPolicy::default();
                self.assets.clear();
                self.activated = false;
                self.state = EntityState::Removed;
            }
            EventPayload::LabelAssetAdded(added) => {
                self.assets.insert(added.asset, added.storage_key.clone());
                self.activated = false;
            }
            EventPayload::LabelAssetRemoved(removed) => {
                self.assets.remove(&removed.asset);
                self.activated = false;
            }
            _ => {}
        }
    }
}
