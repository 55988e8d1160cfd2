// Copyright (c) 2025 - Cowboy AI, Inc.
//! Custom message text write model

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};

use super::{PolicyScope, WriteModel, WriteModelRoot};
use crate::domain::ObjectDetails;
use crate::event_store::{AggregateFilter, SearchQuery};
use crate::events::{event_types, Aggregate, EventPayload, StoredEvent};
use crate::state_machine::EntityState;

/// Texts of one template in one language at one scope
///
/// The model is `Active` while at least one text is set. Texts of every
/// template and language share one aggregate, so the guard covers all of
/// them while [`WriteModel::details`] reports the last event addressing
/// this template and language.
#[derive(Debug, Clone, PartialEq)]
pub struct CustomTextWriteModel {
    root: WriteModelRoot,
    scope: PolicyScope,
    template: String,
    language: String,
    pub texts: BTreeMap<String, String>,
    pub state: EntityState,
    text_sequence: u64,
    text_date: Option<DateTime<Utc>>,
}

impl CustomTextWriteModel {
    pub fn new(scope: PolicyScope, template: &str, language: &str, instance_id: &str) -> Self {
        Self {
            root: scope.root(instance_id),
            scope,
            template: template.to_string(),
            language: language.to_string(),
            texts: BTreeMap::new(),
            state: EntityState::Unspecified,
            text_sequence: 0,
            text_date: None,
        }
    }

    pub fn scope(&self) -> &PolicyScope {
        &self.scope
    }

    pub fn template(&self) -> &str {
        &self.template
    }

    pub fn language(&self) -> &str {
        &self.language
    }

    pub fn aggregate(&self) -> Aggregate {
        self.scope.aggregate(&self.root.instance_id)
    }

    fn addresses(&self, template: &str, language: &str) -> bool {
        self.template == template && self.language == language
    }

    fn refresh(&mut self, event: &StoredEvent) {
        self.state = if self.texts.is_empty() {
            EntityState::Removed
        } else {
            EntityState::Active
        };
        self.text_sequence = event.sequence;
        self.text_date = Some(event.created_at);
    }
}

impl WriteModel for CustomTextWriteModel {
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
                    event_types::CUSTOM_TEXT_SET,
                    event_types::CUSTOM_TEXT_REMOVED,
                    event_types::CUSTOM_TEXT_TEMPLATE_REMOVED,
                ]),
        )
    }

    fn reduce(&mut self, event: &StoredEvent) {
        match &event.payload {
            EventPayload::CustomTextSet(set) if self.addresses(&set.template, &set.language) => {
                self.texts.insert(set.key.clone(), set.text.clone());
                self.refresh(event);
            }
            EventPayload::CustomTextRemoved(removed)
                if self.addresses(&removed.template, &removed.language) =>
            {
                self.texts.remove(&removed.key);
                self.refresh(event);
            }
            EventPayload::CustomTextTemplateRemoved(removed)
                if self.addresses(&removed.template, &removed.language) =>
            {
                self.texts.clear();
                self.refresh(event);
            }
            _ => {}
        }
    }

    fn details(&self) -> ObjectDetails {
        ObjectDetails {
            sequence: self.text_sequence,
            event_date: self.text_date,
            ..self.root.details()
        }
    }
}
