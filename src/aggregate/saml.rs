// Copyright (c) 2025 - Cowboy AI, Inc.
//! SAML request write model
//!
//! Runs on the auth request machine without the code steps: added, session
//! linked, then succeeded or failed.

use super::{WriteModel, WriteModelRoot};
use crate::event_store::{AggregateFilter, SearchQuery};
use crate::events::oidc::SessionLinked;
use crate::events::saml::SamlRequestAdded;
use crate::events::{event_types, Aggregate, AggregateType, EventPayload, StoredEvent};
use crate::state_machine::AuthRequestState;

/// Authentication request of a SAML service provider
#[derive(Debug, Clone, PartialEq)]
pub struct SamlRequestWriteModel {
    root: WriteModelRoot,
    pub request: Option<SamlRequestAdded>,
    pub session: Option<SessionLinked>,
    pub state: AuthRequestState,
}

impl SamlRequestWriteModel {
    pub fn new(saml_request_id: &str, instance_id: &str) -> Self {
        Self {
            root: WriteModelRoot::new(saml_request_id, instance_id, instance_id),
            request: None,
            session: None,
            state: AuthRequestState::Unspecified,
        }
    }

    pub fn aggregate(&self) -> Aggregate {
        Aggregate::new(
            AggregateType::SamlRequest,
            self.root.aggregate_id.as_str(),
            self.root.instance_id.as_str(),
            self.root.instance_id.as_str(),
        )
    }
}

impl WriteModel for SamlRequestWriteModel {
    fn root(&self) -> &WriteModelRoot {
        &self.root
    }

    fn root_mut(&mut self) -> &mut WriteModelRoot {
        &mut self.root
    }

    fn query(&self) -> SearchQuery {
        SearchQuery::new().instance_id(self.root.instance_id.as_str()).filter(
            AggregateFilter::new(AggregateType::SamlRequest)
                .aggregate_id(self.root.aggregate_id.as_str())
                .event_types([
                    event_types::SAML_REQUEST_ADDED,
                    event_types::SAML_REQUEST_SESSION_LINKED,
                    event_types::SAML_REQUEST_FAILED,
                    event_types::SAML_REQUEST_SUCCEEDED,
                ]),
        )
    }

    fn reduce(&mut self, event: &StoredEvent) {
        match &event.payload {
            EventPayload::SamlRequestAdded(added) => {
                self.request = Some(added.clone());
                self.state = AuthRequestState::Added;
            }
            EventPayload::SamlRequestSessionLinked(linked) => {
                self.session = Some(linked.clone());
                self.state = AuthRequestState::SessionLinked;
            }
            EventPayload::SamlRequestFailed(_) => self.state = AuthRequestState::Failed,
            EventPayload::SamlRequestSucceeded(_) => self.state = AuthRequestState::Succeeded,
            _ => {}
        }
    }
}
