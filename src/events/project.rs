// Copyright (c) 2025 - Cowboy AI, Inc.
//! Project, project role and project grant events
//!
//! Roles and grants have no aggregate of their own: they are recorded on
//! the project aggregate and keyed by role key or grant id.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectAdded {
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectChanged {
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectRemoved {
    /// Name at removal time, needed to release the name constraint
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectRoleAdded {
    pub key: String,
    pub display_name: String,
    #[serde(default)]
    pub group: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectRoleChanged {
    pub key: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectRoleRemoved {
    pub key: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectGrantAdded {
    pub grant_id: String,
    pub granted_org_id: String,
    pub role_keys: Vec<String>,
}

/// New role keys of a grant, used for both direct and cascading changes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectGrantChanged {
    pub grant_id: String,
    pub role_keys: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectGrantRemoved {
    pub grant_id: String,
    pub granted_org_id: String,
}
