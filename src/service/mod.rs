// Copyright (c) 2025 - Cowboy AI, Inc.
//! Command Service Layer
//!
//! [`Commands`] is the entry point of every mutating operation. It holds
//! the event store and the collaborators, all injected at construction.
//!
//! # Command Shape
//!
//! ```text
//! structural validation ──→ load write model(s) ──→ state preconditions
//!        ↓ InvalidArgument        ↓ filter            ↓ NotFound / AlreadyExists
//! peer existence, permission ──→ build PushBatch ──→ push (guards, constraints)
//!        ↓ PreconditionFailed      events + guards      ↓ Aborted / AlreadyExists
//!          PermissionDenied                        append_and_reduce → ObjectDetails
//! ```
//!
//! Commands never retry. A conflict comes back as `Aborted` and the caller
//! decides whether to run the command again against fresh state.
//!
//! # Module Organization
//!
//! - [`label_policy`] - label policy and its assets
//! - [`policy`] - generic settings policies
//! - [`custom_text`] - message texts
//! - [`resolution`] - effective policy lookup (org, then instance)
//! - [`member`] - org and project members
//! - [`project`] - projects and project roles
//! - [`project_grant`] - project grants
//! - [`user_grant`] - user grants
//! - [`group`] - groups
//! - [`group_grant`] - group grants
//! - [`cascade`] - dependents of removed roles, grants and projects
//! - [`oidc`] - auth requests and OIDC sessions
//! - [`saml`] - SAML requests

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info};

use crate::adapters::{
    AssetStorage, EntityKind, EntityLookup, IdGenerator, PermissionChecker, SecretCrypto,
};
use crate::aggregate::WriteModel;
use crate::config::CommandConfig;
use crate::context::CommandContext;
use crate::domain::ObjectDetails;
use crate::errors::{CommandError, CommandResult};
use crate::event_store::{EventStore, PushBatch, StoreError};
use crate::events::{Aggregate, EventPayload, PendingEvent, StoredEvent};

pub mod cascade;
pub mod custom_text;
pub mod group;
pub mod group_grant;
pub mod label_policy;
pub mod member;
pub mod oidc;
pub mod policy;
pub mod project;
pub mod project_grant;
pub mod resolution;
pub mod saml;
pub mod user_grant;

pub use cascade::{CascadeEffect, CascadeScope};
pub use group::{GroupUpdate, NewGroup};
pub use group_grant::GroupGrantInput;
pub use label_policy::AssetUpload;
pub use oidc::{NewAuthRequest, OidcTokens, SessionLink};
pub use project::ProjectRole;
pub use resolution::Resolved;
pub use saml::NewSamlRequest;
pub use user_grant::UserGrantInput;

/// Collaborators besides the event store
#[derive(Clone)]
pub struct Collaborators {
    pub ids: Arc<dyn IdGenerator>,
    pub permissions: Arc<dyn PermissionChecker>,
    pub lookup: Arc<dyn EntityLookup>,
    pub assets: Arc<dyn AssetStorage>,
    pub crypto: Arc<dyn SecretCrypto>,
}

/// Command entry points
///
/// Cheap to clone; all state lives in the event store.
#[derive(Clone)]
pub struct Commands {
    store: Arc<dyn EventStore>,
    ids: Arc<dyn IdGenerator>,
    permissions: Arc<dyn PermissionChecker>,
    lookup: Arc<dyn EntityLookup>,
    assets: Arc<dyn AssetStorage>,
    crypto: Arc<dyn SecretCrypto>,
    config: CommandConfig,
}

impl Commands {
    pub fn new(store: Arc<dyn EventStore>, collaborators: Collaborators, config: CommandConfig) -> Self {
        Self {
            store,
            ids: collaborators.ids,
            permissions: collaborators.permissions,
            lookup: collaborators.lookup,
            assets: collaborators.assets,
            crypto: collaborators.crypto,
            config,
        }
    }

    pub fn config(&self) -> &CommandConfig {
        &self.config
    }

    /// Build `model` from the events matching its query
    pub(crate) async fn load<W: WriteModel>(&self, ctx: &CommandContext, mut model: W) -> CommandResult<W> {
        let query = model.query();
        let events = bounded(ctx, None, self.store.filter(&query)).await?;
        model.fold(&events);
        Ok(model)
    }

    /// Append a batch; an expired context never reaches the store
    pub(crate) async fn push(&self, ctx: &CommandContext, batch: PushBatch) -> CommandResult<Vec<StoredEvent>> {
        let count = batch.events.len();
        debug!(
            instance_id = %ctx.instance_id,
            events = count,
            guards = batch.guards.len(),
            constraints = batch.constraints.len(),
            "pushing batch"
        );
        let persisted = bounded(ctx, self.config.push_timeout, self.store.push(batch)).await?;
        if let Some(last) = persisted.last() {
            info!(
                aggregate_id = %last.aggregate.id,
                event_type = %last.event_type,
                position = last.position,
                events = count,
                "events appended"
            );
        }
        Ok(persisted)
    }

    /// Push and advance `model` with what was persisted
    pub(crate) async fn push_and_reduce<W: WriteModel>(
        &self,
        ctx: &CommandContext,
        model: &mut W,
        batch: PushBatch,
    ) -> CommandResult<ObjectDetails> {
        let persisted = self.push(ctx, batch).await?;
        crate::aggregate::append_and_reduce(model, &persisted)?;
        Ok(model.details())
    }

    pub(crate) async fn check_permission(
        &self,
        ctx: &CommandContext,
        resource_owner: &str,
        resource_id: &str,
        permission: &str,
    ) -> CommandResult<()> {
        self.permissions
            .check_permission(ctx, resource_owner, resource_id, permission)
            .await
            .map_err(|err| {
                debug!(user_id = %ctx.user_id, permission, resource_id, "permission check failed");
                CommandError::from(err)
            })
    }

    /// Owning resource of a peer entity; absence fails the precondition
    pub(crate) async fn require_entity(
        &self,
        ctx: &CommandContext,
        kind: EntityKind,
        id: &str,
        scope: Option<&str>,
    ) -> CommandResult<String> {
        self.lookup
            .exists(ctx, kind, id, scope)
            .await?
            .ok_or_else(|| {
                CommandError::precondition_failed(
                    "CMD-4kd8s",
                    format!("Errors.{}.NotFound", kind.as_str()),
                )
            })
    }

    pub(crate) fn next_id(&self) -> CommandResult<String> {
        Ok(self.ids.next_id()?)
    }
}

/// Event recorded by the acting user
pub(crate) fn event(ctx: &CommandContext, aggregate: Aggregate, payload: EventPayload) -> PendingEvent {
    PendingEvent::new(aggregate, ctx.user_id.as_str(), payload)
}

/// Map a validation failure to `InvalidArgument`, keeping it as source
pub(crate) fn invalid<E>(id: &'static str, key: &'static str) -> impl FnOnce(E) -> CommandError
where
    E: std::error::Error + Send + Sync + 'static,
{
    move |err| CommandError::invalid_argument(id, key).with_source(err)
}

/// Run a store call within the context deadline, tightened by `bound`
async fn bounded<T, F>(ctx: &CommandContext, bound: Option<Duration>, call: F) -> Result<T, StoreError>
where
    F: Future<Output = Result<T, StoreError>>,
{
    if ctx.is_expired() {
        return Err(StoreError::DeadlineExceeded);
    }
    match ctx.effective_deadline(bound) {
        Some(deadline) => tokio::time::timeout_at(deadline, call)
            .await
            .map_err(|_| StoreError::DeadlineExceeded)?,
        None => call.await,
    }
}
