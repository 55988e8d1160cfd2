// Copyright (c) 2025 - Cowboy AI, Inc.
//! User grant events

use serde::{Deserialize, Serialize};

/// A user received roles on a project, directly or through a project grant
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserGrantAdded {
    pub user_id: String,
    pub project_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_grant_id: Option<String>,
    pub role_keys: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserGrantRolesChanged {
    pub role_keys: Vec<String>,
}

/// Carries the references needed to release the uniqueness constraint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserGrantRemoved {
    pub user_id: String,
    pub project_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_grant_id: Option<String>,
}
