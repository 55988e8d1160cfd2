// Copyright (c) 2025 - Cowboy AI, Inc.
//! Test Fixtures for iam-commands
//!
//! Builds a [`Commands`] over the in-memory event store and in-process
//! collaborators with deterministic ids.
//!
//! # Design Principles
//! - Ids come from a sequential generator (`id1`, `id2`, ...)
//! - Peer entities are seeded up front: users, orgs and one login session
//! - Tests read persisted events back through the store, never through
//!   private state

#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;

use iam_commands::adapters::{
    AdapterError, AllowAllPermissions, EntityKind, InMemoryAssetStorage, InMemoryEntityLookup,
    PermissionChecker, SecretCrypto, SequentialIdGenerator,
};
use iam_commands::event_store::{EventStore, PushBatch, SearchQuery, StoreError};
use iam_commands::events::StoredEvent;
use iam_commands::service::ProjectRole;
use iam_commands::{Collaborators, CommandConfig, CommandContext, Commands, InMemoryEventStore};

pub const INSTANCE_ID: &str = "instance1";
pub const ADMIN_ID: &str = "admin1";

pub const ORG_1: &str = "org1";
pub const ORG_2: &str = "org2";
pub const ORG_3: &str = "org3";

/// Owned by org1
pub const USER_1: &str = "user1";
/// Owned by org2
pub const USER_2: &str = "user2";

pub const SESSION_1: &str = "session1";

/// Reversible stand-in for a real cipher: `enc:` followed by hex
#[derive(Debug, Default)]
pub struct HexCrypto;

#[async_trait]
impl SecretCrypto for HexCrypto {
    async fn encrypt(&self, plain: &[u8]) -> Result<String, AdapterError> {
        let hex: String = plain.iter().map(|byte| format!("{byte:02x}")).collect();
        Ok(format!("enc:{hex}"))
    }

    async fn decrypt(&self, cipher: &str) -> Result<Vec<u8>, AdapterError> {
        let hex = cipher
            .strip_prefix("enc:")
            .ok_or_else(|| AdapterError::Crypto("unknown cipher".to_string()))?;
        if hex.len() % 2 != 0 {
            return Err(AdapterError::Crypto("odd length".to_string()));
        }
        (0..hex.len())
            .step_by(2)
            .map(|i| {
                u8::from_str_radix(&hex[i..i + 2], 16)
                    .map_err(|err| AdapterError::Crypto(err.to_string()))
            })
            .collect()
    }
}

/// [`HexCrypto`] whose encryption can be switched off mid-test
#[derive(Debug, Default)]
pub struct SwitchableCrypto {
    failing: AtomicBool,
}

impl SwitchableCrypto {
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }
}

#[async_trait]
impl SecretCrypto for SwitchableCrypto {
    async fn encrypt(&self, plain: &[u8]) -> Result<String, AdapterError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(AdapterError::Crypto("key unavailable".to_string()));
        }
        HexCrypto.encrypt(plain).await
    }

    async fn decrypt(&self, cipher: &str) -> Result<Vec<u8>, AdapterError> {
        HexCrypto.decrypt(cipher).await
    }
}

/// Store that lands a queued batch right before the next push
///
/// Simulates a writer that commits between a command's load and its push.
pub struct InterleavingStore {
    inner: Arc<InMemoryEventStore>,
    queued: Mutex<Option<PushBatch>>,
}

impl InterleavingStore {
    pub fn new(inner: Arc<InMemoryEventStore>) -> Self {
        Self {
            inner,
            queued: Mutex::new(None),
        }
    }

    /// Push `batch` ahead of whatever is pushed next
    pub async fn interleave(&self, batch: PushBatch) {
        *self.queued.lock().await = Some(batch);
    }
}

#[async_trait]
impl EventStore for InterleavingStore {
    async fn filter(&self, query: &SearchQuery) -> Result<Vec<StoredEvent>, StoreError> {
        self.inner.filter(query).await
    }

    async fn push(&self, batch: PushBatch) -> Result<Vec<StoredEvent>, StoreError> {
        let queued = self.queued.lock().await.take();
        if let Some(queued) = queued {
            self.inner.push(queued).await?;
        }
        self.inner.push(batch).await
    }
}

/// Commands plus handles on the collaborators tests inspect
pub struct Harness {
    pub commands: Commands,
    pub store: Arc<InMemoryEventStore>,
    pub lookup: Arc<InMemoryEntityLookup>,
    pub assets: Arc<InMemoryAssetStorage>,
}

impl Harness {
    /// All persisted events in log order
    pub async fn events(&self) -> Vec<StoredEvent> {
        self.store
            .filter(&SearchQuery::new())
            .await
            .expect("in-memory filter never fails")
    }

    /// Event type names persisted after `position`
    pub async fn event_types_after(&self, position: u64) -> Vec<String> {
        self.store
            .filter(&SearchQuery::new().position_after(position))
            .await
            .expect("in-memory filter never fails")
            .into_iter()
            .map(|event| event.event_type)
            .collect()
    }

    pub async fn position(&self) -> u64 {
        self.store.latest_position().await
    }
}

pub fn ctx() -> CommandContext {
    CommandContext::new(INSTANCE_ID, ADMIN_ID)
}

pub async fn harness() -> Harness {
    harness_with(Arc::new(AllowAllPermissions), CommandConfig::default()).await
}

pub async fn harness_with(permissions: Arc<dyn PermissionChecker>, config: CommandConfig) -> Harness {
    build(permissions, config, Arc::new(HexCrypto)).await
}

pub async fn harness_with_crypto(crypto: Arc<dyn SecretCrypto>) -> Harness {
    build(Arc::new(AllowAllPermissions), CommandConfig::default(), crypto).await
}

/// Harness whose commands push through an [`InterleavingStore`]
pub async fn interleaving_harness() -> (Harness, Arc<InterleavingStore>) {
    let store = Arc::new(InMemoryEventStore::new());
    let interleaving = Arc::new(InterleavingStore::new(store.clone()));
    let h = build_over(
        store,
        interleaving.clone(),
        Arc::new(AllowAllPermissions),
        CommandConfig::default(),
        Arc::new(HexCrypto),
    )
    .await;
    (h, interleaving)
}

async fn build(
    permissions: Arc<dyn PermissionChecker>,
    config: CommandConfig,
    crypto: Arc<dyn SecretCrypto>,
) -> Harness {
    let store = Arc::new(InMemoryEventStore::new());
    build_over(store.clone(), store, permissions, config, crypto).await
}

async fn build_over(
    store: Arc<InMemoryEventStore>,
    pushed_through: Arc<dyn EventStore>,
    permissions: Arc<dyn PermissionChecker>,
    config: CommandConfig,
    crypto: Arc<dyn SecretCrypto>,
) -> Harness {
    let lookup = Arc::new(InMemoryEntityLookup::new());
    let assets = Arc::new(InMemoryAssetStorage::new());

    for org in [ORG_1, ORG_2, ORG_3] {
        lookup.insert(EntityKind::Org, org, org).await;
    }
    lookup.insert(EntityKind::User, USER_1, ORG_1).await;
    lookup.insert(EntityKind::User, USER_2, ORG_2).await;
    lookup.insert(EntityKind::Session, SESSION_1, INSTANCE_ID).await;

    let collaborators = Collaborators {
        ids: Arc::new(SequentialIdGenerator::new("id")),
        permissions,
        lookup: lookup.clone(),
        assets: assets.clone(),
        crypto,
    };
    let commands = Commands::new(pushed_through, collaborators, config);

    Harness {
        commands,
        store,
        lookup,
        assets,
    }
}

pub fn roles(keys: &[&str]) -> Vec<String> {
    keys.iter().map(|key| key.to_string()).collect()
}

/// Project "project" of org1 carrying `keys` as roles; returns its id
pub async fn project_with_roles(h: &Harness, keys: &[&str]) -> String {
    let project_id = h
        .commands
        .add_project(&ctx(), ORG_1, "project")
        .await
        .expect("project added")
        .aggregate_id;
    if !keys.is_empty() {
        let project_roles = keys
            .iter()
            .map(|key| ProjectRole::new(*key, key.to_uppercase()))
            .collect();
        h.commands
            .bulk_add_project_roles(&ctx(), &project_id, ORG_1, project_roles)
            .await
            .expect("roles added");
    }
    project_id
}
