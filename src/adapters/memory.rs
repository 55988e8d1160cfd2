// Copyright (c) 2025 - Cowboy AI, Inc.

//! In-process collaborators
//!
//! Deterministic implementations of the collaborator traits for tests and
//! single-process deployments.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::debug;

use super::{
    AdapterError, AssetStorage, EntityKind, EntityLookup, IdGenerator, PermissionChecker,
    PermissionError,
};
use crate::context::CommandContext;

/// Grants every permission
#[derive(Debug, Clone, Copy, Default)]
pub struct AllowAllPermissions;

#[async_trait]
impl PermissionChecker for AllowAllPermissions {
    async fn check_permission(
        &self,
        _ctx: &CommandContext,
        _resource_owner: &str,
        _resource_id: &str,
        _permission: &str,
    ) -> Result<(), PermissionError> {
        Ok(())
    }
}

/// Fixed set of (user, permission) grants, independent of the resource
#[derive(Debug, Clone, Default)]
pub struct StaticPermissions {
    granted: HashSet<(String, String)>,
}

impl StaticPermissions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn allow(mut self, user_id: impl Into<String>, permission: impl Into<String>) -> Self {
        self.granted.insert((user_id.into(), permission.into()));
        self
    }
}

#[async_trait]
impl PermissionChecker for StaticPermissions {
    async fn check_permission(
        &self,
        ctx: &CommandContext,
        _resource_owner: &str,
        _resource_id: &str,
        permission: &str,
    ) -> Result<(), PermissionError> {
        if self
            .granted
            .contains(&(ctx.user_id.clone(), permission.to_string()))
        {
            return Ok(());
        }
        Err(PermissionError::Denied {
            permission: permission.to_string(),
        })
    }
}

/// Registry of existing users, orgs and sessions keyed by kind and id
#[derive(Debug, Default)]
pub struct InMemoryEntityLookup {
    entities: RwLock<HashMap<(EntityKind, String), String>>,
}

impl InMemoryEntityLookup {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert(&self, kind: EntityKind, id: impl Into<String>, resource_owner: impl Into<String>) {
        self.entities
            .write()
            .await
            .insert((kind, id.into()), resource_owner.into());
    }

    pub async fn remove(&self, kind: EntityKind, id: &str) {
        self.entities.write().await.remove(&(kind, id.to_string()));
    }
}

#[async_trait]
impl EntityLookup for InMemoryEntityLookup {
    async fn exists(
        &self,
        _ctx: &CommandContext,
        kind: EntityKind,
        id: &str,
        scope: Option<&str>,
    ) -> Result<Option<String>, AdapterError> {
        let entities = self.entities.read().await;
        let owner = entities
            .get(&(kind, id.to_string()))
            .filter(|owner| scope.map_or(true, |scope| scope == owner.as_str()))
            .cloned();
        Ok(owner)
    }
}

/// Stored asset object
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredObject {
    pub content_type: String,
    pub content: Vec<u8>,
}

/// Object storage in a map, with switchable failure
#[derive(Debug, Default)]
pub struct InMemoryAssetStorage {
    objects: RwLock<HashMap<String, StoredObject>>,
    failing: AtomicBool,
}

impl InMemoryAssetStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every following call fail until reset
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub async fn get(&self, key: &str) -> Option<StoredObject> {
        self.objects.read().await.get(key).cloned()
    }

    pub async fn len(&self) -> usize {
        self.objects.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    fn check_available(&self) -> Result<(), AdapterError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(AdapterError::Storage("storage unavailable".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl AssetStorage for InMemoryAssetStorage {
    async fn put_object(
        &self,
        instance_id: &str,
        resource_owner: &str,
        name: &str,
        content_type: &str,
        content: Vec<u8>,
    ) -> Result<String, AdapterError> {
        self.check_available()?;
        let key = format!("{instance_id}/{resource_owner}/{name}");
        debug!(key = %key, size = content.len(), "storing asset");
        self.objects.write().await.insert(
            key.clone(),
            StoredObject {
                content_type: content_type.to_string(),
                content,
            },
        );
        Ok(key)
    }

    async fn remove_object(&self, _instance_id: &str, key: &str) -> Result<(), AdapterError> {
        self.check_available()?;
        self.objects.write().await.remove(key);
        Ok(())
    }
}

/// Ids `{prefix}1`, `{prefix}2`, ...
#[derive(Debug)]
pub struct SequentialIdGenerator {
    prefix: String,
    next: AtomicU64,
}

impl SequentialIdGenerator {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            next: AtomicU64::new(1),
        }
    }
}

impl IdGenerator for SequentialIdGenerator {
    fn next_id(&self) -> Result<String, AdapterError> {
        let id = self.next.fetch_add(1, Ordering::SeqCst);
        Ok(format!("{}{id}", self.prefix))
    }
}
