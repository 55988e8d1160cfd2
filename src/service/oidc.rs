// Copyright (c) 2025 - Cowboy AI, Inc.
//! Auth request and OIDC session commands
//!
//! # Flow
//!
//! ```text
//! add_auth_request → link_session_to_auth_request → [add_auth_request_code]
//!                                                          ↓
//!        create_oidc_session_from_auth_request (one push, two aggregates)
//!          auth request: [code exchanged], succeeded
//!          oidc session: added, access token, [refresh token]
//!                                                          ↓
//!                   exchange_refresh_token ⟲ · terminate_oidc_session
//! ```
//!
//! Refresh tokens leave the crate encrypted; the plain form is
//! `{oidc_session_id}:{token_id}`. Encryption happens before the push, so
//! a failing cipher leaves the log untouched.

use chrono::{DateTime, Utc};
use tracing::{debug, info};

use super::{event, invalid, Commands};
use crate::adapters::EntityKind;
use crate::aggregate::{append_and_reduce, AuthRequestWriteModel, OidcSessionWriteModel, WriteModel};
use crate::context::CommandContext;
use crate::domain::invariants::require;
use crate::domain::ObjectDetails;
use crate::errors::{CommandError, CommandResult};
use crate::event_store::PushBatch;
use crate::events::oidc::{
    AccessTokenAdded, AuthRequestAdded, AuthRequestFailed, OidcSessionAdded, RefreshTokenAdded,
    RefreshTokenRenewed, ResponseType, SessionLinked,
};
use crate::events::{EmptyPayload, EventPayload};
use crate::state_machine::{AuthRequestInput, AuthRequestState, StateMachine, TransitionError};

const SCOPE_OPENID: &str = "openid";
const SCOPE_OFFLINE_ACCESS: &str = "offline_access";

const AUTH_REQUEST_WRITE: &str = "oidc.auth_request.write";
const SESSION_WRITE: &str = "oidc.session.write";

/// Authorization request as received from a relying party
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewAuthRequest {
    pub login_client: String,
    pub client_id: String,
    pub redirect_uri: String,
    pub state: String,
    pub nonce: String,
    pub scope: Vec<String>,
    pub audience: Vec<String>,
    pub response_type: ResponseType,
}

/// Login session that authenticated the user of an auth request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionLink {
    pub session_id: String,
    pub user_id: String,
    pub auth_methods: Vec<String>,
}

/// Tokens handed out for an OIDC session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OidcTokens {
    pub details: ObjectDetails,
    pub oidc_session_id: String,
    pub access_token_id: String,
    pub access_token_expiration: Option<DateTime<Utc>>,
    /// Encrypted refresh token, present with `offline_access` in the code flow
    pub refresh_token: Option<String>,
}

/// Run the auth request machine, mapping rejections to command errors
pub(super) fn advance(state: AuthRequestState, input: AuthRequestInput) -> CommandResult<AuthRequestState> {
    match state.transition(&input) {
        Ok((next, ())) => Ok(next),
        Err(TransitionError::NotExisting(_)) => {
            Err(CommandError::not_found("OIDC-3kd9s", "Errors.AuthRequest.NotFound"))
        }
        Err(TransitionError::AlreadyExisting(_)) => Err(CommandError::already_exists(
            "OIDC-8dj2s",
            "Errors.AuthRequest.AlreadyExists",
        )),
        Err(err @ TransitionError::InvalidTransition { .. }) => Err(CommandError::precondition_failed(
            "OIDC-0fk3m",
            "Errors.AuthRequest.InvalidState",
        )
        .with_source(err)),
    }
}

fn refresh_token_invalid() -> CommandError {
    CommandError::precondition_failed("OIDC-5md8c", "Errors.OIDCSession.RefreshTokenInvalid")
}

/// Split a decrypted refresh token into session id and token id
fn parse_refresh_token(plain: &[u8]) -> CommandResult<(String, String)> {
    let malformed = || CommandError::invalid_argument("OIDC-2ld9s", "Errors.OIDCSession.RefreshTokenInvalid");
    let plain = std::str::from_utf8(plain).map_err(|_| malformed())?;
    match plain.split_once(':') {
        Some((session_id, token_id)) if !session_id.is_empty() && !token_id.is_empty() => {
            Ok((session_id.to_string(), token_id.to_string()))
        }
        _ => Err(malformed()),
    }
}

impl Commands {
    async fn load_auth_request(&self, ctx: &CommandContext, auth_request_id: &str) -> CommandResult<AuthRequestWriteModel> {
        require("auth_request_id", auth_request_id).map_err(invalid("OIDC-7sk2d", "Errors.IDMissing"))?;
        self.load(ctx, AuthRequestWriteModel::new(auth_request_id, &ctx.instance_id))
            .await
    }

    async fn encrypt_refresh_token(&self, oidc_session_id: &str, token_id: &str) -> CommandResult<String> {
        let plain = format!("{oidc_session_id}:{token_id}");
        Ok(self.crypto.encrypt(plain.as_bytes()).await?)
    }

    /// Record an auth request; the new id is in the details
    pub async fn add_auth_request(&self, ctx: &CommandContext, request: NewAuthRequest) -> CommandResult<ObjectDetails> {
        require("login_client", &request.login_client)
            .and_then(|()| require("client_id", &request.client_id))
            .and_then(|()| require("redirect_uri", &request.redirect_uri))
            .map_err(invalid("OIDC-4nf9s", "Errors.AuthRequest.Invalid"))?;
        if !request.scope.iter().any(|scope| scope == SCOPE_OPENID) {
            return Err(CommandError::invalid_argument(
                "OIDC-9fj3d",
                "Errors.AuthRequest.OpenIDScopeMissing",
            ));
        }
        self.check_permission(ctx, &ctx.instance_id, &request.client_id, AUTH_REQUEST_WRITE)
            .await?;

        let auth_request_id = self.next_id()?;
        let mut model = AuthRequestWriteModel::new(&auth_request_id, &ctx.instance_id);
        advance(model.state, AuthRequestInput::Add)?;

        let added = AuthRequestAdded {
            login_client: request.login_client,
            client_id: request.client_id,
            redirect_uri: request.redirect_uri,
            state: request.state,
            nonce: request.nonce,
            scope: request.scope,
            audience: request.audience,
            response_type: request.response_type,
        };
        let batch = PushBatch::new()
            .event(event(ctx, model.aggregate(), EventPayload::AuthRequestAdded(added)))
            .guard(model.guard());
        self.push_and_reduce(ctx, &mut model, batch).await
    }

    /// Attach the login session that authenticated the user
    pub async fn link_session_to_auth_request(
        &self,
        ctx: &CommandContext,
        auth_request_id: &str,
        link: SessionLink,
    ) -> CommandResult<ObjectDetails> {
        require("session_id", &link.session_id)
            .and_then(|()| require("user_id", &link.user_id))
            .map_err(invalid("OIDC-6dk3s", "Errors.AuthRequest.Invalid"))?;

        let mut model = self.load_auth_request(ctx, auth_request_id).await?;
        advance(model.state, AuthRequestInput::LinkSession)?;
        self.require_entity(ctx, EntityKind::Session, &link.session_id, None).await?;
        let user_resource_owner = self
            .require_entity(ctx, EntityKind::User, &link.user_id, None)
            .await?;
        self.check_permission(ctx, &ctx.instance_id, auth_request_id, AUTH_REQUEST_WRITE)
            .await?;

        let linked = SessionLinked {
            session_id: link.session_id,
            user_id: link.user_id,
            user_resource_owner,
            auth_time: Utc::now(),
            auth_methods: link.auth_methods,
        };
        let batch = PushBatch::new()
            .event(event(ctx, model.aggregate(), EventPayload::AuthRequestSessionLinked(linked)))
            .guard(model.guard());
        self.push_and_reduce(ctx, &mut model, batch).await
    }

    /// Issue the authorization code of a code flow request
    pub async fn add_auth_request_code(&self, ctx: &CommandContext, auth_request_id: &str) -> CommandResult<ObjectDetails> {
        let mut model = self.load_auth_request(ctx, auth_request_id).await?;
        advance(model.state, AuthRequestInput::AddCode)?;
        if model.request.as_ref().map(|request| request.response_type) != Some(ResponseType::Code) {
            return Err(CommandError::precondition_failed(
                "OIDC-1md8s",
                "Errors.AuthRequest.NoCodeFlow",
            ));
        }
        self.check_permission(ctx, &ctx.instance_id, auth_request_id, AUTH_REQUEST_WRITE)
            .await?;

        let batch = PushBatch::new()
            .event(event(ctx, model.aggregate(), EventPayload::AuthRequestCodeAdded(EmptyPayload {})))
            .guard(model.guard());
        self.push_and_reduce(ctx, &mut model, batch).await
    }

    pub async fn fail_auth_request(
        &self,
        ctx: &CommandContext,
        auth_request_id: &str,
        reason: &str,
    ) -> CommandResult<ObjectDetails> {
        let mut model = self.load_auth_request(ctx, auth_request_id).await?;
        advance(model.state, AuthRequestInput::Fail)?;
        self.check_permission(ctx, &ctx.instance_id, auth_request_id, AUTH_REQUEST_WRITE)
            .await?;

        let batch = PushBatch::new()
            .event(event(
                ctx,
                model.aggregate(),
                EventPayload::AuthRequestFailed(AuthRequestFailed {
                    reason: reason.to_string(),
                }),
            ))
            .guard(model.guard());
        let details = self.push_and_reduce(ctx, &mut model, batch).await?;
        info!(auth_request_id, reason, "auth request failed");
        Ok(details)
    }

    /// Complete an auth request by creating its OIDC session
    ///
    /// The session, its tokens and the success of the request are pushed
    /// together; either all of them persist or none does.
    pub async fn create_oidc_session_from_auth_request(
        &self,
        ctx: &CommandContext,
        auth_request_id: &str,
    ) -> CommandResult<OidcTokens> {
        let mut request_model = self.load_auth_request(ctx, auth_request_id).await?;
        let code_flow = request_model
            .request
            .as_ref()
            .is_some_and(|request| request.response_type == ResponseType::Code);
        let mut state = request_model.state;
        if code_flow {
            state = advance(state, AuthRequestInput::ExchangeCode)?;
        }
        advance(state, AuthRequestInput::Succeed)?;
        let (Some(request), Some(session)) = (request_model.request.clone(), request_model.session.clone()) else {
            return Err(CommandError::precondition_failed(
                "OIDC-3fk8s",
                "Errors.AuthRequest.InvalidState",
            ));
        };
        self.check_permission(ctx, &ctx.instance_id, auth_request_id, SESSION_WRITE)
            .await?;

        let oidc_session_id = self.next_id()?;
        let access_token_id = self.next_id()?;
        let refresh_token_id = if code_flow && request.scope.iter().any(|scope| scope == SCOPE_OFFLINE_ACCESS) {
            Some(self.next_id()?)
        } else {
            None
        };
        // encrypted before the push; a crypto failure must leave no session behind
        let refresh_token = match &refresh_token_id {
            Some(token_id) => Some(self.encrypt_refresh_token(&oidc_session_id, token_id).await?),
            None => None,
        };

        let mut session_model = OidcSessionWriteModel::new(&oidc_session_id, &ctx.instance_id);
        let session_aggregate = session_model.aggregate();
        let request_aggregate = request_model.aggregate();
        let config = &self.config;

        let mut events = vec![
            event(
                ctx,
                session_aggregate.clone(),
                EventPayload::OidcSessionAdded(OidcSessionAdded {
                    user_id: session.user_id,
                    user_resource_owner: session.user_resource_owner,
                    session_id: session.session_id,
                    client_id: request.client_id,
                    audience: request.audience,
                    scope: request.scope.clone(),
                    auth_methods: session.auth_methods,
                    auth_time: session.auth_time,
                    nonce: request.nonce,
                }),
            ),
            event(
                ctx,
                session_aggregate.clone(),
                EventPayload::OidcAccessTokenAdded(AccessTokenAdded {
                    token_id: access_token_id.clone(),
                    scope: request.scope,
                    lifetime_secs: config.access_token_lifetime.as_secs(),
                }),
            ),
        ];
        if let Some(token_id) = &refresh_token_id {
            events.push(event(
                ctx,
                session_aggregate,
                EventPayload::OidcRefreshTokenAdded(RefreshTokenAdded {
                    token_id: token_id.clone(),
                    lifetime_secs: config.refresh_token_lifetime.as_secs(),
                    idle_lifetime_secs: config.refresh_token_idle_lifetime.as_secs(),
                }),
            ));
        }
        if code_flow {
            events.push(event(
                ctx,
                request_aggregate.clone(),
                EventPayload::AuthRequestCodeExchanged(EmptyPayload {}),
            ));
        }
        events.push(event(
            ctx,
            request_aggregate,
            EventPayload::AuthRequestSucceeded(EmptyPayload {}),
        ));

        let batch = PushBatch::new()
            .events(events)
            .guard(request_model.guard())
            .guard(session_model.guard());
        let persisted = self.push(ctx, batch).await?;
        append_and_reduce(&mut session_model, &persisted)?;
        append_and_reduce(&mut request_model, &persisted)?;

        info!(
            auth_request_id,
            oidc_session_id = %oidc_session_id,
            refresh_token = refresh_token.is_some(),
            "oidc session created"
        );
        Ok(OidcTokens {
            details: session_model.details(),
            oidc_session_id,
            access_token_id,
            access_token_expiration: session_model.access_token_expiration,
            refresh_token,
        })
    }

    /// Trade a refresh token for a new access token and a rotated refresh token
    pub async fn exchange_refresh_token(&self, ctx: &CommandContext, refresh_token: &str) -> CommandResult<OidcTokens> {
        require("refresh_token", refresh_token).map_err(invalid("OIDC-8sj2d", "Errors.OIDCSession.RefreshTokenInvalid"))?;
        let plain = self.crypto.decrypt(refresh_token).await?;
        let (oidc_session_id, token_id) = parse_refresh_token(&plain)?;

        let mut model = self
            .load(ctx, OidcSessionWriteModel::new(&oidc_session_id, &ctx.instance_id))
            .await?;
        if !model.refresh_token_valid(&token_id, Utc::now()) {
            debug!(oidc_session_id = %oidc_session_id, "refresh token rejected");
            return Err(refresh_token_invalid());
        }
        self.check_permission(ctx, &ctx.instance_id, &oidc_session_id, SESSION_WRITE)
            .await?;

        let access_token_id = self.next_id()?;
        let renewed_token_id = self.next_id()?;
        let refresh_token = self
            .encrypt_refresh_token(&oidc_session_id, &renewed_token_id)
            .await?;
        let aggregate = model.aggregate();
        let batch = PushBatch::new()
            .event(event(
                ctx,
                aggregate.clone(),
                EventPayload::OidcAccessTokenAdded(AccessTokenAdded {
                    token_id: access_token_id.clone(),
                    scope: model.scope.clone(),
                    lifetime_secs: self.config.access_token_lifetime.as_secs(),
                }),
            ))
            .event(event(
                ctx,
                aggregate,
                EventPayload::OidcRefreshTokenRenewed(RefreshTokenRenewed {
                    token_id: renewed_token_id.clone(),
                    idle_lifetime_secs: self.config.refresh_token_idle_lifetime.as_secs(),
                }),
            ))
            .guard(model.guard());
        let details = self.push_and_reduce(ctx, &mut model, batch).await?;

        Ok(OidcTokens {
            details,
            oidc_session_id,
            access_token_id,
            access_token_expiration: model.access_token_expiration,
            refresh_token: Some(refresh_token),
        })
    }

    /// End a session; terminating an unknown or ended session is a no-op
    pub async fn terminate_oidc_session(&self, ctx: &CommandContext, oidc_session_id: &str) -> CommandResult<ObjectDetails> {
        require("oidc_session_id", oidc_session_id).map_err(invalid("OIDC-4md8s", "Errors.IDMissing"))?;
        let mut model = self
            .load(ctx, OidcSessionWriteModel::new(oidc_session_id, &ctx.instance_id))
            .await?;
        if !model.state.exists() {
            return Ok(model.details());
        }
        self.check_permission(ctx, &ctx.instance_id, oidc_session_id, SESSION_WRITE)
            .await?;

        let batch = PushBatch::new()
            .event(event(ctx, model.aggregate(), EventPayload::OidcSessionTerminated(EmptyPayload {})))
            .guard(model.guard());
        self.push_and_reduce(ctx, &mut model, batch).await
    }
}
