// Copyright (c) 2025 - Cowboy AI, Inc.
//! SAML request commands
//!
//! ```text
//! add_saml_request → link_session_to_saml_request → succeed_saml_request
//!        └──────────────────┴──→ fail_saml_request
//! ```
//!
//! The request runs on the auth request machine, so rejections carry the
//! same error keys as the OIDC flow.

use chrono::Utc;
use tracing::info;

use super::oidc::{advance, SessionLink};
use super::{event, invalid, Commands};
use crate::adapters::EntityKind;
use crate::aggregate::{SamlRequestWriteModel, WriteModel};
use crate::context::CommandContext;
use crate::domain::invariants::require;
use crate::domain::ObjectDetails;
use crate::errors::CommandResult;
use crate::event_store::PushBatch;
use crate::events::oidc::{AuthRequestFailed, SessionLinked};
use crate::events::saml::SamlRequestAdded;
use crate::events::{EmptyPayload, EventPayload};
use crate::state_machine::AuthRequestInput;

const SAML_REQUEST_WRITE: &str = "saml.request.write";

/// Authentication request as received from a service provider
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewSamlRequest {
    pub login_client: String,
    pub application_id: String,
    pub acs_url: String,
    pub relay_state: String,
    pub request_id: String,
    pub binding: String,
    pub issuer: String,
    pub issuer_name: String,
    pub destination: String,
}

impl NewSamlRequest {
    fn validate(&self) -> CommandResult<()> {
        require("login_client", &self.login_client)
            .and_then(|()| require("application_id", &self.application_id))
            .and_then(|()| require("acs_url", &self.acs_url))
            .and_then(|()| require("request_id", &self.request_id))
            .and_then(|()| require("binding", &self.binding))
            .and_then(|()| require("issuer", &self.issuer))
            .map_err(invalid("SAML-2kd8s", "Errors.SAMLRequest.Invalid"))
    }
}

impl Commands {
    async fn load_saml_request(&self, ctx: &CommandContext, saml_request_id: &str) -> CommandResult<SamlRequestWriteModel> {
        require("saml_request_id", saml_request_id).map_err(invalid("SAML-7fj3d", "Errors.IDMissing"))?;
        self.load(ctx, SamlRequestWriteModel::new(saml_request_id, &ctx.instance_id))
            .await
    }

    /// Record a SAML request; the new id is in the details
    pub async fn add_saml_request(&self, ctx: &CommandContext, request: NewSamlRequest) -> CommandResult<ObjectDetails> {
        request.validate()?;
        self.check_permission(ctx, &ctx.instance_id, &request.application_id, SAML_REQUEST_WRITE)
            .await?;

        let saml_request_id = self.next_id()?;
        let mut model = SamlRequestWriteModel::new(&saml_request_id, &ctx.instance_id);
        advance(model.state, AuthRequestInput::Add)?;

        let added = SamlRequestAdded {
            login_client: request.login_client,
            application_id: request.application_id,
            acs_url: request.acs_url,
            relay_state: request.relay_state,
            request_id: request.request_id,
            binding: request.binding,
            issuer: request.issuer,
            issuer_name: request.issuer_name,
            destination: request.destination,
        };
        let batch = PushBatch::new()
            .event(event(ctx, model.aggregate(), EventPayload::SamlRequestAdded(added)))
            .guard(model.guard());
        self.push_and_reduce(ctx, &mut model, batch).await
    }

    /// Attach the login session that authenticated the user
    pub async fn link_session_to_saml_request(
        &self,
        ctx: &CommandContext,
        saml_request_id: &str,
        link: SessionLink,
    ) -> CommandResult<ObjectDetails> {
        require("session_id", &link.session_id)
            .and_then(|()| require("user_id", &link.user_id))
            .map_err(invalid("SAML-5md9s", "Errors.SAMLRequest.Invalid"))?;

        let mut model = self.load_saml_request(ctx, saml_request_id).await?;
        advance(model.state, AuthRequestInput::LinkSession)?;
        self.require_entity(ctx, EntityKind::Session, &link.session_id, None).await?;
        let user_resource_owner = self
            .require_entity(ctx, EntityKind::User, &link.user_id, None)
            .await?;
        self.check_permission(ctx, &ctx.instance_id, saml_request_id, SAML_REQUEST_WRITE)
            .await?;

        let linked = SessionLinked {
            session_id: link.session_id,
            user_id: link.user_id,
            user_resource_owner,
            auth_time: Utc::now(),
            auth_methods: link.auth_methods,
        };
        let batch = PushBatch::new()
            .event(event(ctx, model.aggregate(), EventPayload::SamlRequestSessionLinked(linked)))
            .guard(model.guard());
        self.push_and_reduce(ctx, &mut model, batch).await
    }

    /// Mark the request answered once the SAML response went out
    pub async fn succeed_saml_request(&self, ctx: &CommandContext, saml_request_id: &str) -> CommandResult<ObjectDetails> {
        let mut model = self.load_saml_request(ctx, saml_request_id).await?;
        advance(model.state, AuthRequestInput::Succeed)?;
        self.check_permission(ctx, &ctx.instance_id, saml_request_id, SAML_REQUEST_WRITE)
            .await?;

        let batch = PushBatch::new()
            .event(event(ctx, model.aggregate(), EventPayload::SamlRequestSucceeded(EmptyPayload {})))
            .guard(model.guard());
        let details = self.push_and_reduce(ctx, &mut model, batch).await?;
        info!(saml_request_id, "saml request succeeded");
        Ok(details)
    }

    pub async fn fail_saml_request(
        &self,
        ctx: &CommandContext,
        saml_request_id: &str,
        reason: &str,
    ) -> CommandResult<ObjectDetails> {
        let mut model = self.load_saml_request(ctx, saml_request_id).await?;
        advance(model.state, AuthRequestInput::Fail)?;
        self.check_permission(ctx, &ctx.instance_id, saml_request_id, SAML_REQUEST_WRITE)
            .await?;

        let batch = PushBatch::new()
            .event(event(
                ctx,
                model.aggregate(),
                EventPayload::SamlRequestFailed(AuthRequestFailed {
                    reason: reason.to_string(),
                }),
            ))
            .guard(model.guard());
        let details = self.push_and_reduce(ctx, &mut model, batch).await?;
        info!(saml_request_id, reason, "saml request failed");
        Ok(details)
    }
}
