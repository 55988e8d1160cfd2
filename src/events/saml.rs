// Copyright (c) 2025 - Cowboy AI, Inc.
//! SAML request events
//!
//! A SAML request shares the session link and failure payloads of the OIDC
//! auth request; only its creation carries SAML specific data.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SamlRequestAdded {
    /// Login UI client that handles the request
    pub login_client: String,
    pub application_id: String,
    /// Assertion consumer service the response is posted to
    pub acs_url: String,
    #[serde(default)]
    pub relay_state: String,
    /// Id of the `AuthnRequest` sent by the service provider
    pub request_id: String,
    pub binding: String,
    pub issuer: String,
    #[serde(default)]
    pub issuer_name: String,
    #[serde(default)]
    pub destination: String,
}
