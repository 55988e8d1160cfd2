// Copyright (c) 2025 - Cowboy AI, Inc.
//! Project, project role and project grant write models
//!
//! All of them read the project aggregate. Roles and grants are
//! sub-entities keyed by role key and grant id; the project removal event
//! ends all of them at once.

use std::collections::{BTreeMap, BTreeSet};

use super::{WriteModel, WriteModelRoot};
use crate::event_store::{AggregateFilter, SearchQuery};
use crate::events::{event_types, Aggregate, AggregateType, EventPayload, StoredEvent};
use crate::state_machine::EntityState;

fn project_aggregate(root: &WriteModelRoot) -> Aggregate {
    Aggregate::new(
        AggregateType::Project,
        root.aggregate_id.as_str(),
        root.resource_owner.as_str(),
        root.instance_id.as_str(),
    )
}

fn project_query<const N: usize>(root: &WriteModelRoot, types: [&'static str; N]) -> SearchQuery {
    let query = SearchQuery::new().instance_id(root.instance_id.as_str());
    // an empty owner means "unknown yet", not "owned by nobody"
    let query = if root.resource_owner.is_empty() {
        query
    } else {
        query.resource_owner(root.resource_owner.as_str())
    };
    query.filter(
        AggregateFilter::new(AggregateType::Project)
            .aggregate_id(root.aggregate_id.as_str())
            .event_types(types),
    )
}

/// Project with its lifecycle, role keys and grants
#[derive(Debug, Clone, PartialEq)]
pub struct ProjectWriteModel {
    root: WriteModelRoot,
    pub name: String,
    pub role_keys: BTreeSet<String>,
    /// Granted org per live project grant id
    pub granted_orgs: BTreeMap<String, String>,
    pub state: EntityState,
}

impl ProjectWriteModel {
    /// `resource_owner` may be empty when the owning org is not known
    pub fn new(project_id: &str, resource_owner: &str, instance_id: &str) -> Self {
        Self {
            root: WriteModelRoot::new(project_id, resource_owner, instance_id),
            name: String::new(),
            role_keys: BTreeSet::new(),
            granted_orgs: BTreeMap::new(),
            state: EntityState::Unspecified,
        }
    }

    pub fn aggregate(&self) -> Aggregate {
        project_aggregate(&self.root)
    }

    /// Keys in `requested` the project does not define
    pub fn unknown_roles<'a>(&self, requested: &'a [String]) -> Vec<&'a str> {
        requested
            .iter()
            .filter(|key| !self.role_keys.contains(key.as_str()))
            .map(String::as_str)
            .collect()
    }
}

impl WriteModel for ProjectWriteModel {
    fn root(&self) -> &WriteModelRoot {
        &self.root
    }

    fn root_mut(&mut self) -> &mut WriteModelRoot {
        &mut self.root
    }

    fn query(&self) -> SearchQuery {
        project_query(
            &self.root,
            [
                event_types::PROJECT_ADDED,
                event_types::PROJECT_CHANGED,
                event_types::PROJECT_DEACTIVATED,
                event_types::PROJECT_REACTIVATED,
                event_types::PROJECT_REMOVED,
                event_types::PROJECT_ROLE_ADDED,
                event_types::PROJECT_ROLE_REMOVED,
                event_types::PROJECT_GRANT_ADDED,
                event_types::PROJECT_GRANT_REMOVED,
            ],
        )
    }

    fn reduce(&mut self, event: &StoredEvent) {
        match &event.payload {
            EventPayload::ProjectAdded(added) => {
                self.name = added.name.clone();
                self.state = EntityState::Active;
            }
            EventPayload::ProjectChanged(changed) => self.name = changed.name.clone(),
            EventPayload::ProjectDeactivated(_) => self.state = EntityState::Inactive,
            EventPayload::ProjectReactivated(_) => self.state = EntityState::Active,
            EventPayload::ProjectRemoved(_) => {
                self.role_keys.clear();
                self.granted_orgs.clear();
                self.state = EntityState::Removed;
            }
            EventPayload::ProjectRoleAdded(role) => {
                self.role_keys.insert(role.key.clone());
            }
            EventPayload::ProjectRoleRemoved(role) => {
                self.role_keys.remove(&role.key);
            }
            EventPayload::ProjectGrantAdded(grant) => {
                self.granted_orgs
                    .insert(grant.grant_id.clone(), grant.granted_org_id.clone());
            }
            EventPayload::ProjectGrantRemoved(grant) => {
                self.granted_orgs.remove(&grant.grant_id);
            }
            _ => {}
        }
    }
}

/// One role of a project
#[derive(Debug, Clone, PartialEq)]
pub struct ProjectRoleWriteModel {
    root: WriteModelRoot,
    key: String,
    pub display_name: String,
    pub group: String,
    pub state: EntityState,
}

impl ProjectRoleWriteModel {
    pub fn new(project_id: &str, key: &str, resource_owner: &str, instance_id: &str) -> Self {
        Self {
            root: WriteModelRoot::new(project_id, resource_owner, instance_id),
            key: key.to_string(),
            display_name: String::new(),
            group: String::new(),
            state: EntityState::Unspecified,
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn aggregate(&self) -> Aggregate {
        project_aggregate(&self.root)
    }
}

impl WriteModel for ProjectRoleWriteModel {
    fn root(&self) -> &WriteModelRoot {
        &self.root
    }

    fn root_mut(&mut self) -> &mut WriteModelRoot {
        &mut self.root
    }

    fn query(&self) -> SearchQuery {
        project_query(
            &self.root,
            [
                event_types::PROJECT_ROLE_ADDED,
                event_types::PROJECT_ROLE_CHANGED,
                event_types::PROJECT_ROLE_REMOVED,
                event_types::PROJECT_REMOVED,
            ],
        )
    }

    fn reduce(&mut self, event: &StoredEvent) {
        match &event.payload {
            EventPayload::ProjectRoleAdded(role) if role.key == self.key => {
                self.display_name = role.display_name.clone();
                self.group = role.group.clone();
                self.state = EntityState::Active;
            }
            EventPayload::ProjectRoleChanged(role) if role.key == self.key => {
                if let Some(display_name) = &role.display_name {
                    self.display_name = display_name.clone();
                }
                if let Some(group) = &role.group {
                    self.group = group.clone();
                }
            }
            EventPayload::ProjectRoleRemoved(role) if role.key == self.key => {
                self.state = EntityState::Removed;
            }
            EventPayload::ProjectRemoved(_) if self.state.exists() => {
                self.state = EntityState::Removed;
            }
            _ => {}
        }
    }
}

/// One grant of a project to another organization
#[derive(Debug, Clone, PartialEq)]
pub struct ProjectGrantWriteModel {
    root: WriteModelRoot,
    grant_id: String,
    pub granted_org_id: String,
    pub role_keys: Vec<String>,
    pub state: EntityState,
}

impl ProjectGrantWriteModel {
    pub fn new(project_id: &str, grant_id: &str, resource_owner: &str, instance_id: &str) -> Self {
        Self {
            root: WriteModelRoot::new(project_id, resource_owner, instance_id),
            grant_id: grant_id.to_string(),
            granted_org_id: String::new(),
            role_keys: Vec::new(),
            state: EntityState::Unspecified,
        }
    }

    pub fn grant_id(&self) -> &str {
        &self.grant_id
    }

    pub fn project_id(&self) -> &str {
        &self.root.aggregate_id
    }

    pub fn aggregate(&self) -> Aggregate {
        project_aggregate(&self.root)
    }
}

impl WriteModel for ProjectGrantWriteModel {
    fn root(&self) -> &WriteModelRoot {
        &self.root
    }

    fn root_mut(&mut self) -> &mut WriteModelRoot {
        &mut self.root
    }

    fn query(&self) -> SearchQuery {
        project_query(
            &self.root,
            [
                event_types::PROJECT_GRANT_ADDED,
                event_types::PROJECT_GRANT_CHANGED,
                event_types::PROJECT_GRANT_CASCADE_CHANGED,
                event_types::PROJECT_GRANT_REMOVED,
                event_types::PROJECT_REMOVED,
            ],
        )
    }

    fn reduce(&mut self, event: &StoredEvent) {
        match &event.payload {
            EventPayload::ProjectGrantAdded(grant) if grant.grant_id == self.grant_id => {
                self.granted_org_id = grant.granted_org_id.clone();
                self.role_keys = grant.role_keys.clone();
                self.state = EntityState::Active;
            }
            EventPayload::ProjectGrantChanged(grant) | EventPayload::ProjectGrantCascadeChanged(grant)
                if grant.grant_id == self.grant_id =>
            {
                self.role_keys = grant.role_keys.clone();
            }
            EventPayload::ProjectGrantRemoved(grant) if grant.grant_id == self.grant_id => {
                self.state = EntityState::Removed;
            }
            EventPayload::ProjectRemoved(_) if self.state.exists() => {
                self.state = EntityState::Removed;
            }
            _ => {}
        }
    }
}

/// Role keys held by every live grant of a project
///
/// Loaded next to a role that is about to be removed: its guard fails the
/// removal when a grant picks up the key concurrently.
#[derive(Debug, Clone, PartialEq)]
pub struct ProjectGrantRolesWriteModel {
    root: WriteModelRoot,
    pub grants: BTreeMap<String, Vec<String>>,
}

impl ProjectGrantRolesWriteModel {
    pub fn new(project_id: &str, resource_owner: &str, instance_id: &str) -> Self {
        Self {
            root: WriteModelRoot::new(project_id, resource_owner, instance_id),
            grants: BTreeMap::new(),
        }
    }

    /// Ids of the grants currently holding `key`
    pub fn holders(&self, key: &str) -> Vec<&str> {
        self.grants
            .iter()
            .filter(|(_, keys)| keys.iter().any(|held| held == key))
            .map(|(grant_id, _)| grant_id.as_str())
            .collect()
    }
}

impl WriteModel for ProjectGrantRolesWriteModel {
    fn root(&self) -> &WriteModelRoot {
        &self.root
    }

    fn root_mut(&mut self) -> &mut WriteModelRoot {
        &mut self.root
    }

    fn query(&self) -> SearchQuery {
        project_query(
            &self.root,
            [
                event_types::PROJECT_GRANT_ADDED,
                event_types::PROJECT_GRANT_CHANGED,
                event_types::PROJECT_GRANT_CASCADE_CHANGED,
                event_types::PROJECT_GRANT_REMOVED,
                event_types::PROJECT_REMOVED,
            ],
        )
    }

    fn reduce(&mut self, event: &StoredEvent) {
        match &event.payload {
            EventPayload::ProjectGrantAdded(grant) => {
                self.grants.insert(grant.grant_id.clone(), grant.role_keys.clone());
            }
            EventPayload::ProjectGrantChanged(grant) | EventPayload::ProjectGrantCascadeChanged(grant) => {
                if let Some(keys) = self.grants.get_mut(&grant.grant_id) {
                    *keys = grant.role_keys.clone();
                }
            }
            EventPayload::ProjectGrantRemoved(grant) => {
                self.grants.remove(&grant.grant_id);
            }
            EventPayload::ProjectRemoved(_) => self.grants.clear(),
            _ => {}
        }
    }
}
