// Copyright (c) 2025 - Cowboy AI, Inc.
//! User grant write model

use super::{WriteModel, WriteModelRoot};
use crate::event_store::{AggregateFilter, SearchQuery};
use crate::events::{event_types, Aggregate, AggregateType, EventPayload, StoredEvent};
use crate::state_machine::EntityState;

/// Roles a user holds on a project, directly or through a project grant
#[derive(Debug, Clone, PartialEq)]
pub struct UserGrantWriteModel {
    root: WriteModelRoot,
    pub user_id: String,
    pub project_id: String,
    pub project_grant_id: Option<String>,
    pub role_keys: Vec<String>,
    pub state: EntityState,
}

impl UserGrantWriteModel {
    /// `resource_owner` may be empty when the owning org is not known
    pub fn new(user_grant_id: &str, resource_owner: &str, instance_id: &str) -> Self {
        Self {
            root: WriteModelRoot::new(user_grant_id, resource_owner, instance_id),
            user_id: String::new(),
            project_id: String::new(),
            project_grant_id: None,
            role_keys: Vec::new(),
            state: EntityState::Unspecified,
        }
    }

    pub fn aggregate(&self) -> Aggregate {
        Aggregate::new(
            AggregateType::UserGrant,
            self.root.aggregate_id.as_str(),
            self.root.resource_owner.as_str(),
            self.root.instance_id.as_str(),
        )
    }

    /// Key of the (user, project, project grant) uniqueness constraint
    pub fn unique_key(user_id: &str, project_id: &str, project_grant_id: Option<&str>) -> String {
        format!("{user_id}:{project_id}:{}", project_grant_id.unwrap_or_default())
    }
}

impl WriteModel for UserGrantWriteModel {
    fn root(&self) -> &WriteModelRoot {
        &self.root
    }

    fn root_mut(&mut self) -> &mut WriteModelRoot {
        &mut self.root
    }

    fn query(&self) -> SearchQuery {
        let query = SearchQuery::new().instance_id(self.root.instance_id.as_str());
        let query = if self.root.resource_owner.is_empty() {
            query
        } else {
            query.resource_owner(self.root.resource_owner.as_str())
        };
        query.filter(
            AggregateFilter::new(AggregateType::UserGrant)
                .aggregate_id(self.root.aggregate_id.as_str())
                .event_types([
                    event_types::USER_GRANT_ADDED,
                    event_types::USER_GRANT_CHANGED,
                    event_types::USER_GRANT_CASCADE_CHANGED,
                    event_types::USER_GRANT_DEACTIVATED,
                    event_types::USER_GRANT_REACTIVATED,
                    event_types::USER_GRANT_REMOVED,
                    event_types::USER_GRANT_CASCADE_REMOVED,
                ]),
        )
    }

    fn reduce(&mut self, event: &StoredEvent) {
        match &event.payload {
            EventPayload::UserGrantAdded(added) => {
                self.user_id = added.user_id.clone();
                self.project_id = added.project_id.clone();
                self.project_grant_id = added.project_grant_id.clone();
                self.role_keys = added.role_keys.clone();
                self.state = EntityState::Active;
            }
            EventPayload::UserGrantChanged(changed) | EventPayload::UserGrantCascadeChanged(changed) => {
                self.role_keys = changed.role_keys.clone();
            }
            EventPayload::UserGrantDeactivated(_) => self.state = EntityState::Inactive,
            EventPayload::UserGrantReactivated(_) => self.state = EntityState::Active,
            EventPayload::UserGrantRemoved(_) | EventPayload::UserGrantCascadeRemoved(_) => {
                self.role_keys.clear();
                self.state = EntityState::Removed;
            }
            _ => {}
        }
    }
}
