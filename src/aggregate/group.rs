// Copyright (c) 2025 - Cowboy AI, Inc.
//! Group and group grant write models
//!
//! A group is owned by an org and collects users; a group grant gives all
//! of them roles on a project at once. Group grants mirror user grants:
//! the same references, the same lifecycle, the same cascades.

use super::{WriteModel, WriteModelRoot};
use crate::event_store::{AggregateFilter, SearchQuery};
use crate::events::{event_types, Aggregate, AggregateType, EventPayload, StoredEvent};
use crate::state_machine::EntityState;

/// Query on one aggregate, bound to the owner only once it is known
fn owned_query<const N: usize>(
    root: &WriteModelRoot,
    aggregate_type: AggregateType,
    types: [&'static str; N],
) -> SearchQuery {
    let query = SearchQuery::new().instance_id(root.instance_id.as_str());
    let query = if root.resource_owner.is_empty() {
        query
    } else {
        query.resource_owner(root.resource_owner.as_str())
    };
    query.filter(
        AggregateFilter::new(aggregate_type)
            .aggregate_id(root.aggregate_id.as_str())
            .event_types(types),
    )
}

#[derive(Debug, Clone, PartialEq)]
pub struct GroupWriteModel {
    root: WriteModelRoot,
    pub name: String,
    pub description: String,
    pub state: EntityState,
}

impl GroupWriteModel {
    /// `resource_owner` may be empty when the owning org is not known
    pub fn new(group_id: &str, resource_owner: &str, instance_id: &str) -> Self {
        Self {
            root: WriteModelRoot::new(group_id, resource_owner, instance_id),
            name: String::new(),
            description: String::new(),
            state: EntityState::Unspecified,
        }
    }

    pub fn aggregate(&self) -> Aggregate {
        Aggregate::new(
            AggregateType::Group,
            self.root.aggregate_id.as_str(),
            self.root.resource_owner.as_str(),
            self.root.instance_id.as_str(),
        )
    }
}

impl WriteModel for GroupWriteModel {
    fn root(&self) -> &WriteModelRoot {
        &self.root
    }

    fn root_mut(&mut self) -> &mut WriteModelRoot {
        &mut self.root
    }

    fn query(&self) -> SearchQuery {
        owned_query(
            &self.root,
            AggregateType::Group,
            [
                event_types::GROUP_ADDED,
                event_types::GROUP_CHANGED,
                event_types::GROUP_REMOVED,
            ],
        )
    }

    fn reduce(&mut self, event: &StoredEvent) {
        match &event.payload {
            EventPayload::GroupAdded(added) => {
                self.name = added.name.clone();
                self.description = added.description.clone();
                self.state = EntityState::Active;
            }
            EventPayload::GroupChanged(changed) => {
                apply_fields!(self, changed, { name, description });
            }
            EventPayload::GroupRemoved(_) => self.state = EntityState::Removed,
            _ => {}
        }
    }
}

/// Roles a group holds on a project, directly or through a project grant
#[derive(Debug, Clone, PartialEq)]
pub struct GroupGrantWriteModel {
    root: WriteModelRoot,
    pub group_id: String,
    pub project_id: String,
    pub project_grant_id: Option<String>,
    pub role_keys: Vec<String>,
    pub state: EntityState,
}

impl GroupGrantWriteModel {
    /// `resource_owner` may be empty when the owning org is not known
    pub fn new(group_grant_id: &str, resource_owner: &str, instance_id: &str) -> Self {
        Self {
            root: WriteModelRoot::new(group_grant_id, resource_owner, instance_id),
            group_id: String::new(),
            project_id: String::new(),
            project_grant_id: None,
            role_keys: Vec::new(),
            state: EntityState::Unspecified,
        }
    }

    pub fn aggregate(&self) -> Aggregate {
        Aggregate::new(
            AggregateType::GroupGrant,
            self.root.aggregate_id.as_str(),
            self.root.resource_owner.as_str(),
            self.root.instance_id.as_str(),
        )
    }

    /// Key of the (group, project, project grant) uniqueness constraint
    pub fn unique_key(group_id: &str, project_id: &str, project_grant_id: Option<&str>) -> String {
        format!("{group_id}:{project_id}:{}", project_grant_id.unwrap_or_default())
    }
}

impl WriteModel for GroupGrantWriteModel {
    fn root(&self) -> &WriteModelRoot {
        &self.root
    }

    fn root_mut(&mut self) -> &mut WriteModelRoot {
        &mut self.root
    }

    fn query(&self) -> SearchQuery {
        owned_query(
            &self.root,
            AggregateType::GroupGrant,
            [
                event_types::GROUP_GRANT_ADDED,
                event_types::GROUP_GRANT_CHANGED,
                event_types::GROUP_GRANT_CASCADE_CHANGED,
                event_types::GROUP_GRANT_DEACTIVATED,
                event_types::GROUP_GRANT_REACTIVATED,
                event_types::GROUP_GRANT_REMOVED,
                event_types::GROUP_GRANT_CASCADE_REMOVED,
            ],
        )
    }

    fn reduce(&mut self, event: &StoredEvent) {
        match &event.payload {
            EventPayload::GroupGrantAdded(added) => {
                self.group_id = added.group_id.clone();
                self.project_id = added.project_id.clone();
                self.project_grant_id = added.project_grant_id.clone();
                self.role_keys = added.role_keys.clone();
                self.state = EntityState::Active;
            }
            EventPayload::GroupGrantChanged(changed) | EventPayload::GroupGrantCascadeChanged(changed) => {
                self.role_keys = changed.role_keys.clone();
            }
            EventPayload::GroupGrantDeactivated(_) => self.state = EntityState::Inactive,
            EventPayload::GroupGrantReactivated(_) => self.state = EntityState::Active,
            EventPayload::GroupGrantRemoved(_) | EventPayload::GroupGrantCascadeRemoved(_) => {
                self.role_keys.clear();
                self.state = EntityState::Removed;
            }
            _ => {}
        }
    }
}
