// Copyright (c) 2025 - Cowboy AI, Inc.
//! Policy and custom text events
//!
//! "Added" events carry the full settings value from [`crate::domain`].
//! "Changed" events carry only the fields that differ; `None` means the
//! field keeps its previous value.

use serde::{Deserialize, Serialize};

use crate::domain::{LabelAsset, ThemeMode};

/// Changed fields of a label policy
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct LabelPolicyChanged {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub primary_color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub background_color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub warn_color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font_color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub primary_color_dark: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub background_color_dark: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub warn_color_dark: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font_color_dark: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hide_login_name_suffix: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_msg_popup: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub disable_watermark: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub theme_mode: Option<ThemeMode>,
}

/// Uploaded asset attached to a label policy
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelAssetAdded {
    pub asset: LabelAsset,
    pub storage_key: String,
}

/// Asset detached from a label policy
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelAssetRemoved {
    pub asset: LabelAsset,
    pub storage_key: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PasswordAgePolicyChanged {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expire_warn_days: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_age_days: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PasswordComplexityPolicyChanged {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_length: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub has_lowercase: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub has_uppercase: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub has_number: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub has_symbol: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PrivacyPolicyChanged {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tos_link: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub privacy_link: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub help_link: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub support_email: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct MailTemplatePolicyChanged {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub template: Option<Vec<u8>>,
}

/// One message text set for a template and language
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomTextSet {
    pub template: String,
    pub language: String,
    pub key: String,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomTextRemoved {
    pub template: String,
    pub language: String,
    pub key: String,
}

/// All texts of a template and language reset at once
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomTextTemplateRemoved {
    pub template: String,
    pub language: String,
}
