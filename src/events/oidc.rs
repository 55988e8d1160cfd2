// Copyright (c) 2025 - Cowboy AI, Inc.
//! Auth request and OIDC session events

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// OAuth response type requested by the client
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseType {
    /// Authorization code flow
    #[default]
    Code,
    /// Implicit flow, ID token only
    IdToken,
    /// Implicit flow, ID token and access token
    IdTokenToken,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthRequestAdded {
    /// Login UI client that handles the request
    pub login_client: String,
    pub client_id: String,
    pub redirect_uri: String,
    #[serde(default)]
    pub state: String,
    #[serde(default)]
    pub nonce: String,
    pub scope: Vec<String>,
    #[serde(default)]
    pub audience: Vec<String>,
    pub response_type: ResponseType,
}

/// The user authenticated with a login session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionLinked {
    pub session_id: String,
    pub user_id: String,
    pub user_resource_owner: String,
    pub auth_time: DateTime<Utc>,
    pub auth_methods: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthRequestFailed {
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OidcSessionAdded {
    pub user_id: String,
    pub user_resource_owner: String,
    /// Login session the OIDC session was derived from
    pub session_id: String,
    pub client_id: String,
    pub audience: Vec<String>,
    pub scope: Vec<String>,
    pub auth_methods: Vec<String>,
    pub auth_time: DateTime<Utc>,
    #[serde(default)]
    pub nonce: String,
}

/// Expiration is the event timestamp plus the lifetime
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessTokenAdded {
    pub token_id: String,
    pub scope: Vec<String>,
    pub lifetime_secs: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefreshTokenAdded {
    pub token_id: String,
    pub lifetime_secs: u64,
    pub idle_lifetime_secs: u64,
}

/// Refresh token rotated; the previous token id is no longer valid
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefreshTokenRenewed {
    pub token_id: String,
    pub idle_lifetime_secs: u64,
}
