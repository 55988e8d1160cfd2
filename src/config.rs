// Copyright (c) 2025 - Cowboy AI, Inc.
//! Command layer configuration

use std::time::Duration;

use thiserror::Error;

/// Environment variable holding the comma separated org member roles
pub const ENV_ORG_MEMBER_ROLES: &str = "IAM_ORG_MEMBER_ROLES";
/// Environment variable holding the comma separated project member roles
pub const ENV_PROJECT_MEMBER_ROLES: &str = "IAM_PROJECT_MEMBER_ROLES";
pub const ENV_PUSH_TIMEOUT_MS: &str = "IAM_PUSH_TIMEOUT_MS";
pub const ENV_ACCESS_TOKEN_LIFETIME_SECS: &str = "IAM_ACCESS_TOKEN_LIFETIME_SECS";
pub const ENV_REFRESH_TOKEN_LIFETIME_SECS: &str = "IAM_REFRESH_TOKEN_LIFETIME_SECS";
pub const ENV_REFRESH_TOKEN_IDLE_LIFETIME_SECS: &str = "IAM_REFRESH_TOKEN_IDLE_LIFETIME_SECS";

/// Configuration loading error
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{name} is not a valid number: {value}")]
    InvalidNumber { name: &'static str, value: String },

    #[error("{0} must contain at least one role")]
    EmptyRoleList(&'static str),
}

/// Configuration for the command layer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandConfig {
    /// Roles a user may hold as member of an organization
    pub org_member_roles: Vec<String>,
    /// Roles a user may hold as member of a project
    pub project_member_roles: Vec<String>,
    /// Upper bound for a single push when the caller sets no tighter deadline
    pub push_timeout: Option<Duration>,
    pub access_token_lifetime: Duration,
    pub refresh_token_lifetime: Duration,
    /// A refresh token not used within this window expires
    pub refresh_token_idle_lifetime: Duration,
}

impl Default for CommandConfig {
    fn default() -> Self {
        Self {
            org_member_roles: [
                "ORG_OWNER",
                "ORG_OWNER_VIEWER",
                "ORG_USER_MANAGER",
                "ORG_PROJECT_CREATOR",
            ]
            .map(String::from)
            .to_vec(),
            project_member_roles: ["PROJECT_OWNER", "PROJECT_OWNER_VIEWER", "PROJECT_GRANT_OWNER"]
                .map(String::from)
                .to_vec(),
            push_timeout: Some(Duration::from_secs(5)),
            access_token_lifetime: Duration::from_secs(12 * 60 * 60),
            refresh_token_lifetime: Duration::from_secs(90 * 24 * 60 * 60),
            refresh_token_idle_lifetime: Duration::from_secs(30 * 24 * 60 * 60),
        }
    }
}

impl CommandConfig {
    /// Load configuration from the process environment, starting from defaults
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load configuration from an arbitrary variable source
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(value) = lookup(ENV_ORG_MEMBER_ROLES) {
            config.org_member_roles = parse_roles(ENV_ORG_MEMBER_ROLES, &value)?;
        }
        if let Some(value) = lookup(ENV_PROJECT_MEMBER_ROLES) {
            config.project_member_roles = parse_roles(ENV_PROJECT_MEMBER_ROLES, &value)?;
        }
        if let Some(value) = lookup(ENV_PUSH_TIMEOUT_MS) {
            // zero disables the bound
            let millis = parse_number(ENV_PUSH_TIMEOUT_MS, &value)?;
            config.push_timeout = (millis > 0).then(|| Duration::from_millis(millis));
        }
        if let Some(value) = lookup(ENV_ACCESS_TOKEN_LIFETIME_SECS) {
            config.access_token_lifetime =
                Duration::from_secs(parse_number(ENV_ACCESS_TOKEN_LIFETIME_SECS, &value)?);
        }
        if let Some(value) = lookup(ENV_REFRESH_TOKEN_LIFETIME_SECS) {
            config.refresh_token_lifetime =
                Duration::from_secs(parse_number(ENV_REFRESH_TOKEN_LIFETIME_SECS, &value)?);
        }
        if let Some(value) = lookup(ENV_REFRESH_TOKEN_IDLE_LIFETIME_SECS) {
            config.refresh_token_idle_lifetime =
                Duration::from_secs(parse_number(ENV_REFRESH_TOKEN_IDLE_LIFETIME_SECS, &value)?);
        }

        Ok(config)
    }

    pub fn with_org_member_roles<I, S>(mut self, roles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.org_member_roles = roles.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_project_member_roles<I, S>(mut self, roles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.project_member_roles = roles.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_push_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.push_timeout = timeout;
        self
    }

    pub fn with_access_token_lifetime(mut self, lifetime: Duration) -> Self {
        self.access_token_lifetime = lifetime;
        self
    }

    pub fn with_refresh_token_lifetimes(mut self, absolute: Duration, idle: Duration) -> Self {
        self.refresh_token_lifetime = absolute;
        self.refresh_token_idle_lifetime = idle;
        self
    }
}

fn parse_roles(name: &'static str, value: &str) -> Result<Vec<String>, ConfigError> {
    let roles: Vec<String> = value
        .split(',')
        .map(str::trim)
        .filter(|role| !role.is_empty())
        .map(String::from)
        .collect();
    if roles.is_empty() {
        return Err(ConfigError::EmptyRoleList(name));
    }
    Ok(roles)
}

fn parse_number(name: &'static str, value: &str) -> Result<u64, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::InvalidNumber {
            name,
            value: value.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| vars.get(name).cloned()
    }

    #[test]
    fn test_defaults_without_variables() {
        let config = CommandConfig::from_lookup(lookup(&[])).unwrap();

        assert_eq!(config, CommandConfig::default());
        assert!(config.org_member_roles.contains(&"ORG_OWNER".to_string()));
    }

    #[test]
    fn test_overrides_from_variables() {
        let config = CommandConfig::from_lookup(lookup(&[
            (ENV_ORG_MEMBER_ROLES, "ORG_OWNER, ORG_AUDITOR ,"),
            (ENV_PUSH_TIMEOUT_MS, "0"),
            (ENV_ACCESS_TOKEN_LIFETIME_SECS, "60"),
        ]))
        .unwrap();

        assert_eq!(config.org_member_roles, vec!["ORG_OWNER", "ORG_AUDITOR"]);
        assert_eq!(config.push_timeout, None);
        assert_eq!(config.access_token_lifetime, Duration::from_secs(60));
    }

    #[test]
    fn test_malformed_number_is_rejected() {
        let err = CommandConfig::from_lookup(lookup(&[(ENV_PUSH_TIMEOUT_MS, "soon")])).unwrap_err();

        assert_eq!(
            err,
            ConfigError::InvalidNumber {
                name: ENV_PUSH_TIMEOUT_MS,
                value: "soon".to_string()
            }
        );
    }

    #[test]
    fn test_empty_role_list_is_rejected() {
        let err = CommandConfig::from_lookup(lookup(&[(ENV_PROJECT_MEMBER_ROLES, " , ")])).unwrap_err();

        assert_eq!(err, ConfigError::EmptyRoleList(ENV_PROJECT_MEMBER_ROLES));
    }
}
