// Copyright (c) 2025 - Cowboy AI, Inc.
//! Event payload sum type
//!
//! One table maps every variant to its payload struct and its stable type
//! name. The store persists `(type name, JSON payload)` rows; decoding a
//! type name missing from the table yields [`EventPayload::Unknown`].

use super::group::{
    GroupAdded, GroupChanged, GroupGrantAdded, GroupGrantRemoved, GroupGrantRolesChanged,
    GroupRemoved,
};
use super::member::{MemberAdded, MemberChanged, MemberRemoved};
use super::oidc::{
    AccessTokenAdded, AuthRequestAdded, AuthRequestFailed, OidcSessionAdded, RefreshTokenAdded,
    RefreshTokenRenewed, SessionLinked,
};
use super::policy::{
    CustomTextRemoved, CustomTextSet, CustomTextTemplateRemoved, LabelAssetAdded,
    LabelAssetRemoved, LabelPolicyChanged, MailTemplatePolicyChanged, PasswordAgePolicyChanged,
    PasswordComplexityPolicyChanged, PrivacyPolicyChanged,
};
use super::project::{
    ProjectAdded, ProjectChanged, ProjectGrantAdded, ProjectGrantChanged, ProjectGrantRemoved,
    ProjectRemoved, ProjectRoleAdded, ProjectRoleChanged, ProjectRoleRemoved,
};
use super::saml::SamlRequestAdded;
use super::user_grant::{UserGrantAdded, UserGrantRemoved, UserGrantRolesChanged};
use super::EmptyPayload;
use crate::domain::{
    LabelPolicy, MailTemplatePolicy, PasswordAgePolicy, PasswordComplexityPolicy, PrivacyPolicy,
};

macro_rules! event_payloads {
    ($( $(#[$meta:meta])* $variant:ident($payload:ty) = $konst:ident => $name:literal; )+) => {
        /// Event type names as stored in the log
        pub mod event_types {
            $( pub const $konst: &str = $name; )+
        }

        /// Typed payload of every event this build understands
        #[derive(Debug, Clone, PartialEq)]
        pub enum EventPayload {
            $( $(#[$meta])* $variant($payload), )+
            /// Event type unknown to this build; reducers skip it
            Unknown,
        }

        impl EventPayload {
            /// Stable type name, `None` for [`EventPayload::Unknown`]
            pub fn event_type(&self) -> Option<&'static str> {
                match self {
                    $( Self::$variant(_) => Some($name), )+
                    Self::Unknown => None,
                }
            }

            pub fn encode(&self) -> Result<serde_json::Value, serde_json::Error> {
                match self {
                    $( Self::$variant(payload) => serde_json::to_value(payload), )+
                    Self::Unknown => Ok(serde_json::Value::Null),
                }
            }

            pub fn decode(event_type: &str, data: serde_json::Value) -> Result<Self, serde_json::Error> {
                match event_type {
                    $( $name => serde_json::from_value(data).map(Self::$variant), )+
                    _ => Ok(Self::Unknown),
                }
            }
        }
    };
}

event_payloads! {
    LabelPolicyAdded(LabelPolicy) = LABEL_POLICY_ADDED => "policy.label.added";
    LabelPolicyChanged(LabelPolicyChanged) = LABEL_POLICY_CHANGED => "policy.label.changed";
    LabelPolicyActivated(EmptyPayload) = LABEL_POLICY_ACTIVATED => "policy.label.activated";
    LabelPolicyRemoved(EmptyPayload) = LABEL_POLICY_REMOVED => "policy.label.removed";
    LabelAssetAdded(LabelAssetAdded) = LABEL_ASSET_ADDED => "policy.label.asset.added";
    LabelAssetRemoved(LabelAssetRemoved) = LABEL_ASSET_REMOVED => "policy.label.asset.removed";

    PasswordAgePolicyAdded(PasswordAgePolicy) = PASSWORD_AGE_POLICY_ADDED => "policy.password.age.added";
    PasswordAgePolicyChanged(PasswordAgePolicyChanged) = PASSWORD_AGE_POLICY_CHANGED => "policy.password.age.changed";
    PasswordAgePolicyRemoved(EmptyPayload) = PASSWORD_AGE_POLICY_REMOVED => "policy.password.age.removed";
    PasswordComplexityPolicyAdded(PasswordComplexityPolicy) = PASSWORD_COMPLEXITY_POLICY_ADDED => "policy.password.complexity.added";
    PasswordComplexityPolicyChanged(PasswordComplexityPolicyChanged) = PASSWORD_COMPLEXITY_POLICY_CHANGED => "policy.password.complexity.changed";
    PasswordComplexityPolicyRemoved(EmptyPayload) = PASSWORD_COMPLEXITY_POLICY_REMOVED => "policy.password.complexity.removed";
    PrivacyPolicyAdded(PrivacyPolicy) = PRIVACY_POLICY_ADDED => "policy.privacy.added";
    PrivacyPolicyChanged(PrivacyPolicyChanged) = PRIVACY_POLICY_CHANGED => "policy.privacy.changed";
    PrivacyPolicyRemoved(EmptyPayload) = PRIVACY_POLICY_REMOVED => "policy.privacy.removed";
    MailTemplatePolicyAdded(MailTemplatePolicy) = MAIL_TEMPLATE_POLICY_ADDED => "policy.mail.template.added";
    MailTemplatePolicyChanged(MailTemplatePolicyChanged) = MAIL_TEMPLATE_POLICY_CHANGED => "policy.mail.template.changed";
    MailTemplatePolicyRemoved(EmptyPayload) = MAIL_TEMPLATE_POLICY_REMOVED => "policy.mail.template.removed";

    CustomTextSet(CustomTextSet) = CUSTOM_TEXT_SET => "customtext.set";
    CustomTextRemoved(CustomTextRemoved) = CUSTOM_TEXT_REMOVED => "customtext.removed";
    CustomTextTemplateRemoved(CustomTextTemplateRemoved) = CUSTOM_TEXT_TEMPLATE_REMOVED => "customtext.template.removed";

    MemberAdded(MemberAdded) = MEMBER_ADDED => "member.added";
    MemberChanged(MemberChanged) = MEMBER_CHANGED => "member.changed";
    MemberRemoved(MemberRemoved) = MEMBER_REMOVED => "member.removed";

    ProjectAdded(ProjectAdded) = PROJECT_ADDED => "project.added";
    ProjectChanged(ProjectChanged) = PROJECT_CHANGED => "project.changed";
    ProjectDeactivated(EmptyPayload) = PROJECT_DEACTIVATED => "project.deactivated";
    ProjectReactivated(EmptyPayload) = PROJECT_REACTIVATED => "project.reactivated";
    ProjectRemoved(ProjectRemoved) = PROJECT_REMOVED => "project.removed";
    ProjectRoleAdded(ProjectRoleAdded) = PROJECT_ROLE_ADDED => "project.role.added";
    ProjectRoleChanged(ProjectRoleChanged) = PROJECT_ROLE_CHANGED => "project.role.changed";
    ProjectRoleRemoved(ProjectRoleRemoved) = PROJECT_ROLE_REMOVED => "project.role.removed";
    ProjectGrantAdded(ProjectGrantAdded) = PROJECT_GRANT_ADDED => "project.grant.added";
    ProjectGrantChanged(ProjectGrantChanged) = PROJECT_GRANT_CHANGED => "project.grant.changed";
    /// Role keys reduced because a referenced role was removed
    ProjectGrantCascadeChanged(ProjectGrantChanged) = PROJECT_GRANT_CASCADE_CHANGED => "project.grant.cascade.changed";
    ProjectGrantRemoved(ProjectGrantRemoved) = PROJECT_GRANT_REMOVED => "project.grant.removed";

    UserGrantAdded(UserGrantAdded) = USER_GRANT_ADDED => "user.grant.added";
    UserGrantChanged(UserGrantRolesChanged) = USER_GRANT_CHANGED => "user.grant.changed";
    /// Role keys reduced because a referenced role or grant changed
    UserGrantCascadeChanged(UserGrantRolesChanged) = USER_GRANT_CASCADE_CHANGED => "user.grant.cascade.changed";
    UserGrantDeactivated(EmptyPayload) = USER_GRANT_DEACTIVATED => "user.grant.deactivated";
    UserGrantReactivated(EmptyPayload) = USER_GRANT_REACTIVATED => "user.grant.reactivated";
    UserGrantRemoved(UserGrantRemoved) = USER_GRANT_REMOVED => "user.grant.removed";
    /// Removed because the referenced project or project grant is gone
    UserGrantCascadeRemoved(UserGrantRemoved) = USER_GRANT_CASCADE_REMOVED => "user.grant.cascade.removed";

    GroupAdded(GroupAdded) = GROUP_ADDED => "group.added";
    GroupChanged(GroupChanged) = GROUP_CHANGED => "group.changed";
    GroupRemoved(GroupRemoved) = GROUP_REMOVED => "group.removed";

    GroupGrantAdded(GroupGrantAdded) = GROUP_GRANT_ADDED => "group.grant.added";
    GroupGrantChanged(GroupGrantRolesChanged) = GROUP_GRANT_CHANGED => "group.grant.changed";
    /// Role keys reduced because a referenced role or grant changed
    GroupGrantCascadeChanged(GroupGrantRolesChanged) = GROUP_GRANT_CASCADE_CHANGED => "group.grant.cascade.changed";
    GroupGrantDeactivated(EmptyPayload) = GROUP_GRANT_DEACTIVATED => "group.grant.deactivated";
    GroupGrantReactivated(EmptyPayload) = GROUP_GRANT_REACTIVATED => "group.grant.reactivated";
    GroupGrantRemoved(GroupGrantRemoved) = GROUP_GRANT_REMOVED => "group.grant.removed";
    /// Removed because the referenced project or project grant is gone
    GroupGrantCascadeRemoved(GroupGrantRemoved) = GROUP_GRANT_CASCADE_REMOVED => "group.grant.cascade.removed";

    AuthRequestAdded(AuthRequestAdded) = AUTH_REQUEST_ADDED => "auth_request.added";
    AuthRequestSessionLinked(SessionLinked) = AUTH_REQUEST_SESSION_LINKED => "auth_request.session.linked";
    AuthRequestCodeAdded(EmptyPayload) = AUTH_REQUEST_CODE_ADDED => "auth_request.code.added";
    AuthRequestCodeExchanged(EmptyPayload) = AUTH_REQUEST_CODE_EXCHANGED => "auth_request.code.exchanged";
    AuthRequestFailed(AuthRequestFailed) = AUTH_REQUEST_FAILED => "auth_request.failed";
    AuthRequestSucceeded(EmptyPayload) = AUTH_REQUEST_SUCCEEDED => "auth_request.succeeded";

    SamlRequestAdded(SamlRequestAdded) = SAML_REQUEST_ADDED => "saml_request.added";
    SamlRequestSessionLinked(SessionLinked) = SAML_REQUEST_SESSION_LINKED => "saml_request.session.linked";
    SamlRequestFailed(AuthRequestFailed) = SAML_REQUEST_FAILED => "saml_request.failed";
    SamlRequestSucceeded(EmptyPayload) = SAML_REQUEST_SUCCEEDED => "saml_request.succeeded";

    OidcSessionAdded(OidcSessionAdded) = OIDC_SESSION_ADDED => "oidc_session.added";
    OidcAccessTokenAdded(AccessTokenAdded) = OIDC_ACCESS_TOKEN_ADDED => "oidc_session.access_token.added";
    OidcRefreshTokenAdded(RefreshTokenAdded) = OIDC_REFRESH_TOKEN_ADDED => "oidc_session.refresh_token.added";
    OidcRefreshTokenRenewed(RefreshTokenRenewed) = OIDC_REFRESH_TOKEN_RENEWED => "oidc_session.refresh_token.renewed";
    OidcSessionTerminated(EmptyPayload) = OIDC_SESSION_TERMINATED => "oidc_session.terminated";
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_decode_known_type() {
        let data = json!({"user_id": "user1", "roles": ["ORG_OWNER"]});

        let payload = EventPayload::decode(event_types::MEMBER_ADDED, data).unwrap();

        assert_eq!(
            payload,
            EventPayload::MemberAdded(MemberAdded {
                user_id: "user1".to_string(),
                roles: vec!["ORG_OWNER".to_string()],
            })
        );
        assert_eq!(payload.event_type(), Some("member.added"));
    }

    #[test]
    fn test_decode_unknown_type_is_not_an_error() {
        let data = json!({"anything": [1, 2, 3]});

        let payload = EventPayload::decode("user.passkey.added", data).unwrap();

        assert_eq!(payload, EventPayload::Unknown);
        assert_eq!(payload.event_type(), None);
    }

    #[test]
    fn test_decode_malformed_known_type_fails() {
        let data = json!({"user_id": 42});

        assert!(EventPayload::decode(event_types::MEMBER_REMOVED, data).is_err());
    }

    #[test]
    fn test_empty_payload_encodes_as_object() {
        let payload = EventPayload::LabelPolicyActivated(EmptyPayload {});

        assert_eq!(payload.encode().unwrap(), json!({}));
    }
}
