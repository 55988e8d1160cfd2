// Copyright (c) 2025 - Cowboy AI, Inc.

//! Collaborator seams of the command layer
//!
//! Everything a command needs besides the event log sits behind one of
//! these traits and is injected when [`Commands`](crate::service::Commands)
//! is built. Nothing here is a process-wide singleton.
//!
//! | Trait | Used for |
//! |-------|----------|
//! | [`IdGenerator`] | ids of new aggregates and tokens |
//! | [`PermissionChecker`] | actor authorization |
//! | [`EntityLookup`] | existence of users, orgs and login sessions |
//! | [`AssetStorage`] | label policy logos, icons and fonts |
//! | [`SecretCrypto`] | opaque refresh tokens |
//!
//! [`memory`] holds in-process implementations for tests and embedding.

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use crate::context::CommandContext;
use crate::errors::CommandError;

pub mod memory;

pub use memory::{
    AllowAllPermissions, InMemoryAssetStorage, InMemoryEntityLookup, SequentialIdGenerator,
    StaticPermissions,
};

/// Failure of a collaborator
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AdapterError {
    #[error("Id generation failed: {0}")]
    IdGeneration(String),

    #[error("Asset storage failed: {0}")]
    Storage(String),

    #[error("Encryption failed: {0}")]
    Crypto(String),

    #[error("Entity lookup failed: {0}")]
    Lookup(String),
}

impl From<AdapterError> for CommandError {
    fn from(err: AdapterError) -> Self {
        CommandError::internal("ADAPT-4kd9s", "Errors.Internal").with_source(err)
    }
}

/// Outcome of a permission check other than success
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PermissionError {
    #[error("Permission {permission} denied")]
    Denied { permission: String },

    #[error("Permission service unavailable: {0}")]
    Unavailable(String),
}

impl From<PermissionError> for CommandError {
    fn from(err: PermissionError) -> Self {
        let mapped = match &err {
            PermissionError::Denied { .. } => {
                CommandError::permission_denied("AUTHZ-8dk2s", "Errors.PermissionDenied")
            }
            PermissionError::Unavailable(_) => CommandError::internal("AUTHZ-1md0s", "Errors.Internal"),
        };
        mapped.with_source(err)
    }
}

/// Source of ids for new aggregates
pub trait IdGenerator: Send + Sync {
    fn next_id(&self) -> Result<String, AdapterError>;
}

/// Time-ordered UUID v7 ids
#[derive(Debug, Clone, Copy, Default)]
pub struct UuidV7Generator;

impl IdGenerator for UuidV7Generator {
    fn next_id(&self) -> Result<String, AdapterError> {
        Ok(Uuid::now_v7().to_string())
    }
}

/// Authorization of the acting user
#[async_trait]
pub trait PermissionChecker: Send + Sync {
    /// Succeeds when `ctx.user_id` holds `permission` on the resource
    async fn check_permission(
        &self,
        ctx: &CommandContext,
        resource_owner: &str,
        resource_id: &str,
        permission: &str,
    ) -> Result<(), PermissionError>;
}

/// Entities owned by other parts of the system
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    User,
    Org,
    /// Login session created by the login UI
    Session,
}

impl EntityKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::User => "User",
            EntityKind::Org => "Org",
            EntityKind::Session => "Session",
        }
    }
}

/// Existence of peer entities referenced by commands
#[async_trait]
pub trait EntityLookup: Send + Sync {
    /// Owning resource of the entity, `None` when it is absent or removed
    ///
    /// With `scope` set, an entity owned by another resource counts as absent.
    async fn exists(
        &self,
        ctx: &CommandContext,
        kind: EntityKind,
        id: &str,
        scope: Option<&str>,
    ) -> Result<Option<String>, AdapterError>;
}

/// Object storage for branding assets
#[async_trait]
pub trait AssetStorage: Send + Sync {
    /// Store an object and return its storage key
    async fn put_object(
        &self,
        instance_id: &str,
        resource_owner: &str,
        name: &str,
        content_type: &str,
        content: Vec<u8>,
    ) -> Result<String, AdapterError>;

    /// Remove an object; removing a missing key succeeds
    async fn remove_object(&self, instance_id: &str, key: &str) -> Result<(), AdapterError>;
}

/// Reversible encryption of secrets handed out to clients
#[async_trait]
pub trait SecretCrypto: Send + Sync {
    async fn encrypt(&self, plain: &[u8]) -> Result<String, AdapterError>;

    async fn decrypt(&self, cipher: &str) -> Result<Vec<u8>, AdapterError>;
}
