// Copyright (c) 2025 - Cowboy AI, Inc.
//! Policy settings value objects
//!
//! Each policy exists once per instance (the default) and optionally once
//! per organization (an override). The settings carried here are the same
//! at both levels.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use super::color::{Color, ColorError};

/// Policy settings validation error
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PolicyError {
    #[error("Invalid color: {0}")]
    InvalidColor(#[from] ColorError),

    #[error("Minimum password length must be between 1 and {max}: {actual}")]
    MinLengthOutOfRange { actual: u64, max: u64 },

    #[error("Support email is not an email address: {0}")]
    InvalidSupportEmail(String),

    #[error("Mail template is empty")]
    EmptyTemplate,
}

/// Login UI theme selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ThemeMode {
    #[default]
    Auto,
    Light,
    Dark,
}

/// Branding of the login UI and notification mails
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct LabelPolicy {
    pub primary_color: String,
    pub background_color: String,
    pub warn_color: String,
    pub font_color: String,
    pub primary_color_dark: String,
    pub background_color_dark: String,
    pub warn_color_dark: String,
    pub font_color_dark: String,
    pub hide_login_name_suffix: bool,
    pub error_msg_popup: bool,
    pub disable_watermark: bool,
    pub theme_mode: ThemeMode,
}

impl LabelPolicy {
    /// All colors must be empty or valid hex colors
    pub fn validate(&self) -> Result<(), PolicyError> {
        for color in self.colors() {
            Color::validate_optional(color)?;
        }
        Ok(())
    }

    fn colors(&self) -> [&str; 8] {
        [
            &self.primary_color,
            &self.background_color,
            &self.warn_color,
            &self.font_color,
            &self.primary_color_dark,
            &self.background_color_dark,
            &self.warn_color_dark,
            &self.font_color_dark,
        ]
    }
}

/// Uploadable branding asset of a label policy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LabelAsset {
    Logo,
    LogoDark,
    Icon,
    IconDark,
    Font,
}

impl LabelAsset {
    pub const ALL: [LabelAsset; 5] = [
        LabelAsset::Logo,
        LabelAsset::LogoDark,
        LabelAsset::Icon,
        LabelAsset::IconDark,
        LabelAsset::Font,
    ];

    /// Object name prefix used in asset storage
    pub fn object_prefix(&self) -> &'static str {
        match self {
            LabelAsset::Logo => "policy/label/logo-",
            LabelAsset::LogoDark => "policy/label/logo-dark-",
            LabelAsset::Icon => "policy/label/icon-",
            LabelAsset::IconDark => "policy/label/icon-dark-",
            LabelAsset::Font => "policy/label/font-",
        }
    }
}

impl fmt::Display for LabelAsset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LabelAsset::Logo => "logo",
            LabelAsset::LogoDark => "logo_dark",
            LabelAsset::Icon => "icon",
            LabelAsset::IconDark => "icon_dark",
            LabelAsset::Font => "font",
        };
        f.write_str(name)
    }
}

/// Password expiry settings
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PasswordAgePolicy {
    pub expire_warn_days: u64,
    pub max_age_days: u64,
}

/// Password strength requirements
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PasswordComplexityPolicy {
    pub min_length: u64,
    pub has_lowercase: bool,
    pub has_uppercase: bool,
    pub has_number: bool,
    pub has_symbol: bool,
}

impl PasswordComplexityPolicy {
    /// Longest password the hasher accepts
    pub const MAX_MIN_LENGTH: u64 = 72;

    pub fn validate(&self) -> Result<(), PolicyError> {
        if self.min_length == 0 || self.min_length > Self::MAX_MIN_LENGTH {
            return Err(PolicyError::MinLengthOutOfRange {
                actual: self.min_length,
                max: Self::MAX_MIN_LENGTH,
            });
        }
        Ok(())
    }
}

/// Legal and support links shown to end users
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PrivacyPolicy {
    pub tos_link: String,
    pub privacy_link: String,
    pub help_link: String,
    pub support_email: String,
}

impl PrivacyPolicy {
    pub fn validate(&self) -> Result<(), PolicyError> {
        let email = self.support_email.trim();
        if !email.is_empty() {
            let valid = email
                .split_once('@')
                .is_some_and(|(local, domain)| !local.is_empty() && domain.contains('.'));
            if !valid {
                return Err(PolicyError::InvalidSupportEmail(email.to_string()));
            }
        }
        Ok(())
    }
}

/// HTML template wrapping notification mails
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct MailTemplatePolicy {
    pub template: Vec<u8>,
}

impl MailTemplatePolicy {
    pub fn validate(&self) -> Result<(), PolicyError> {
        if self.template.is_empty() {
            return Err(PolicyError::EmptyTemplate);
        }
        Ok(())
    }
}
