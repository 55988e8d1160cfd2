// Copyright (c) 2025 - Cowboy AI, Inc.
//! Membership write model
//!
//! A membership is a join of one user and one org or project. Its events
//! live on the org or project aggregate; the model filters by user id while
//! reducing.

use super::{WriteModel, WriteModelRoot};
use crate::event_store::{AggregateFilter, SearchQuery};
use crate::events::{event_types, Aggregate, AggregateType, EventPayload, StoredEvent};
use crate::state_machine::EntityState;

/// Aggregate a member belongs to
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum MemberTarget {
    Org { org_id: String },
    Project { project_id: String, resource_owner: String },
}

impl MemberTarget {
    pub fn org(org_id: impl Into<String>) -> Self {
        MemberTarget::Org { org_id: org_id.into() }
    }

    pub fn project(project_id: impl Into<String>, resource_owner: impl Into<String>) -> Self {
        MemberTarget::Project {
            project_id: project_id.into(),
            resource_owner: resource_owner.into(),
        }
    }

    pub fn aggregate_id(&self) -> &str {
        match self {
            MemberTarget::Org { org_id } => org_id,
            MemberTarget::Project { project_id, .. } => project_id,
        }
    }

    pub fn resource_owner(&self) -> &str {
        match self {
            MemberTarget::Org { org_id } => org_id,
            MemberTarget::Project { resource_owner, .. } => resource_owner,
        }
    }

    pub fn aggregate_type(&self) -> AggregateType {
        match self {
            MemberTarget::Org { .. } => AggregateType::Org,
            MemberTarget::Project { .. } => AggregateType::Project,
        }
    }

    pub fn aggregate(&self, instance_id: &str) -> Aggregate {
        Aggregate::new(
            self.aggregate_type(),
            self.aggregate_id(),
            self.resource_owner(),
            instance_id,
        )
    }

    /// Entity name used in error keys
    pub fn entity(&self) -> &'static str {
        match self {
            MemberTarget::Org { .. } => "Org.Member",
            MemberTarget::Project { .. } => "Project.Member",
        }
    }

    /// Permission required to manage members of the target
    pub fn write_permission(&self) -> &'static str {
        match self {
            MemberTarget::Org { .. } => "org.member.write",
            MemberTarget::Project { .. } => "project.member.write",
        }
    }

    /// Key of the (target, user) uniqueness constraint
    pub fn unique_key(&self, user_id: &str) -> String {
        format!("{}:{}:{}", self.aggregate_type(), self.aggregate_id(), user_id)
    }
}

/// Membership of one user in one org or project
#[derive(Debug, Clone, PartialEq)]
pub struct MemberWriteModel {
    root: WriteModelRoot,
    target: MemberTarget,
    user_id: String,
    pub roles: Vec<String>,
    pub state: EntityState,
}

impl MemberWriteModel {
    pub fn new(target: MemberTarget, user_id: &str, instance_id: &str) -> Self {
        Self {
            root: WriteModelRoot::new(target.aggregate_id(), target.resource_owner(), instance_id),
            target,
            user_id: user_id.to_string(),
            roles: Vec::new(),
            state: EntityState::Unspecified,
        }
    }

    pub fn target(&self) -> &MemberTarget {
        &self.target
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    pub fn aggregate(&self) -> Aggregate {
        self.target.aggregate(&self.root.instance_id)
    }
}

impl WriteModel for MemberWriteModel {
    fn root(&self) -> &WriteModelRoot {
        &self.root
    }

    fn root_mut(&mut self) -> &mut WriteModelRoot {
        &mut self.root
    }

    fn query(&self) -> SearchQuery {
        SearchQuery::new()
            .instance_id(self.root.instance_id.as_str())
            .resource_owner(self.target.resource_owner())
            .filter(
                AggregateFilter::new(self.target.aggregate_type())
                    .aggregate_id(self.target.aggregate_id())
                    .event_types([
                        event_types::MEMBER_ADDED,
                        event_types::MEMBER_CHANGED,
                        event_types::MEMBER_REMOVED,
                    ]),
            )
    }

    fn reduce(&mut self, event: &StoredEvent) {
        match &event.payload {
            EventPayload::MemberAdded(added) if added.user_id == self.user_id => {
                self.roles = added.roles.clone();
                self.state = EntityState::Active;
            }
            EventPayload::MemberChanged(changed) if changed.user_id == self.user_id => {
                self.roles = changed.roles.clone();
            }
            EventPayload::MemberRemoved(removed) if removed.user_id == self.user_id => {
                self.roles.clear();
                self.state = EntityState::Removed;
            }
            _ => {}
        }
    }
}
