// Copyright (c) 2025 - Cowboy AI, Inc.
//! Auth request and OIDC session write models
//!
//! Both aggregates are owned by the instance. A session is created from a
//! succeeded auth request in the same push that marks the request
//! succeeded, so the two models are always loaded side by side.

use std::time::Duration;

use chrono::{DateTime, Utc};

use super::{WriteModel, WriteModelRoot};
use crate::event_store::{AggregateFilter, SearchQuery};
use crate::events::oidc::{AuthRequestAdded, SessionLinked};
use crate::events::{event_types, Aggregate, AggregateType, EventPayload, StoredEvent};
use crate::state_machine::{AuthRequestState, EntityState};

fn instance_owned(aggregate_type: AggregateType, root: &WriteModelRoot) -> Aggregate {
    Aggregate::new(
        aggregate_type,
        root.aggregate_id.as_str(),
        root.instance_id.as_str(),
        root.instance_id.as_str(),
    )
}

/// `issued + lifetime`, `None` when the sum is not representable
fn expires_at(issued: DateTime<Utc>, lifetime_secs: u64) -> Option<DateTime<Utc>> {
    let lifetime = chrono::Duration::from_std(Duration::from_secs(lifetime_secs)).ok()?;
    issued.checked_add_signed(lifetime)
}

/// Authorization request of a relying party
#[derive(Debug, Clone, PartialEq)]
pub struct AuthRequestWriteModel {
    root: WriteModelRoot,
    pub request: Option<AuthRequestAdded>,
    pub session: Option<SessionLinked>,
    pub state: AuthRequestState,
}

impl AuthRequestWriteModel {
    pub fn new(auth_request_id: &str, instance_id: &str) -> Self {
        Self {
            root: WriteModelRoot::new(auth_request_id, instance_id, instance_id),
            request: None,
            session: None,
            state: AuthRequestState::Unspecified,
        }
    }

    pub fn aggregate(&self) -> Aggregate {
        instance_owned(AggregateType::AuthRequest, &self.root)
    }
}

impl WriteModel for AuthRequestWriteModel {
    fn root(&self) -> &WriteModelRoot {
        &self.root
    }

    fn root_mut(&mut self) -> &mut WriteModelRoot {
        &mut self.root
    }

    fn query(&self) -> SearchQuery {
        SearchQuery::new().instance_id(self.root.instance_id.as_str()).filter(
            AggregateFilter::new(AggregateType::AuthRequest)
                .aggregate_id(self.root.aggregate_id.as_str())
                .event_types([
                    event_types::AUTH_REQUEST_ADDED,
                    event_types::AUTH_REQUEST_SESSION_LINKED,
                    event_types::AUTH_REQUEST_CODE_ADDED,
                    event_types::AUTH_REQUEST_CODE_EXCHANGED,
                    event_types::AUTH_REQUEST_FAILED,
                    event_types::AUTH_REQUEST_SUCCEEDED,
                ]),
        )
    }

    fn reduce(&mut self, event: &StoredEvent) {
        match &event.payload {
            EventPayload::AuthRequestAdded(added) => {
                self.request = Some(added.clone());
                self.state = AuthRequestState::Added;
            }
            EventPayload::AuthRequestSessionLinked(linked) => {
                self.session = Some(linked.clone());
                self.state = AuthRequestState::SessionLinked;
            }
            EventPayload::AuthRequestCodeAdded(_) => self.state = AuthRequestState::CodeAdded,
            EventPayload::AuthRequestCodeExchanged(_) => self.state = AuthRequestState::CodeExchanged,
            EventPayload::AuthRequestFailed(_) => self.state = AuthRequestState::Failed,
            EventPayload::AuthRequestSucceeded(_) => self.state = AuthRequestState::Succeeded,
            _ => {}
        }
    }
}

/// Session of a user at one OIDC client, with its current tokens
#[derive(Debug, Clone, PartialEq)]
pub struct OidcSessionWriteModel {
    root: WriteModelRoot,
    pub user_id: String,
    pub user_resource_owner: String,
    pub session_id: String,
    pub client_id: String,
    pub audience: Vec<String>,
    pub scope: Vec<String>,
    pub auth_methods: Vec<String>,
    pub auth_time: Option<DateTime<Utc>>,
    pub access_token_id: Option<String>,
    pub access_token_expiration: Option<DateTime<Utc>>,
    pub refresh_token_id: Option<String>,
    pub refresh_token_expiration: Option<DateTime<Utc>>,
    pub refresh_token_idle_expiration: Option<DateTime<Utc>>,
    pub state: EntityState,
}

impl OidcSessionWriteModel {
    pub fn new(oidc_session_id: &str, instance_id: &str) -> Self {
        Self {
            root: WriteModelRoot::new(oidc_session_id, instance_id, instance_id),
            user_id: String::new(),
            user_resource_owner: String::new(),
            session_id: String::new(),
            client_id: String::new(),
            audience: Vec::new(),
            scope: Vec::new(),
            auth_methods: Vec::new(),
            auth_time: None,
            access_token_id: None,
            access_token_expiration: None,
            refresh_token_id: None,
            refresh_token_expiration: None,
            refresh_token_idle_expiration: None,
            state: EntityState::Unspecified,
        }
    }

    pub fn aggregate(&self) -> Aggregate {
        instance_owned(AggregateType::OidcSession, &self.root)
    }

    /// Whether `token_id` is the current refresh token and neither of its
    /// expirations has passed at `now`
    pub fn refresh_token_valid(&self, token_id: &str, now: DateTime<Utc>) -> bool {
        let not_passed = |expiration: Option<DateTime<Utc>>| expiration.is_some_and(|at| now < at);
        self.state.is_active()
            && self.refresh_token_id.as_deref() == Some(token_id)
            && not_passed(self.refresh_token_expiration)
            && not_passed(self.refresh_token_idle_expiration)
    }
}

impl WriteModel for OidcSessionWriteModel {
    fn root(&self) -> &WriteModelRoot {
        &self.root
    }

    fn root_mut(&mut self) -> &mut WriteModelRoot {
        &mut self.root
    }

    fn query(&self) -> SearchQuery {
        SearchQuery::new().instance_id(self.root.instance_id.as_str()).filter(
            AggregateFilter::new(AggregateType::OidcSession)
                .aggregate_id(self.root.aggregate_id.as_str())
                .event_types([
                    event_types::OIDC_SESSION_ADDED,
                    event_types::OIDC_ACCESS_TOKEN_ADDED,
                    event_types::OIDC_REFRESH_TOKEN_ADDED,
                    event_types::OIDC_REFRESH_TOKEN_RENEWED,
                    event_types::OIDC_SESSION_TERMINATED,
                ]),
        )
    }

    fn reduce(&mut self, event: &StoredEvent) {
        match &event.payload {
            EventPayload::OidcSessionAdded(added) => {
                self.user_id = added.user_id.clone();
                self.user_resource_owner = added.user_resource_owner.clone();
                self.session_id = added.session_id.clone();
                self.client_id = added.client_id.clone();
                self.audience = added.audience.clone();
                self.scope = added.scope.clone();
                self.auth_methods = added.auth_methods.clone();
                self.auth_time = Some(added.auth_time);
                self.state = EntityState::Active;
            }
            EventPayload::OidcAccessTokenAdded(token) => {
                self.access_token_id = Some(token.token_id.clone());
                self.access_token_expiration = expires_at(event.created_at, token.lifetime_secs);
                self.scope = token.scope.clone();
            }
            EventPayload::OidcRefreshTokenAdded(token) => {
                self.refresh_token_id = Some(token.token_id.clone());
                self.refresh_token_expiration = expires_at(event.created_at, token.lifetime_secs);
                self.refresh_token_idle_expiration =
                    expires_at(event.created_at, token.idle_lifetime_secs);
            }
            EventPayload::OidcRefreshTokenRenewed(token) => {
                self.refresh_token_id = Some(token.token_id.clone());
                self.refresh_token_idle_expiration =
                    expires_at(event.created_at, token.idle_lifetime_secs);
            }
            EventPayload::OidcSessionTerminated(_) => {
                self.access_token_id = None;
                self.refresh_token_id = None;
                self.state = EntityState::Removed;
            }
            _ => {}
        }
    }
}
