// Copyright (c) 2025 - Cowboy AI, Inc.
//! Color Value Object for branding settings

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Color validation error
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ColorError {
    #[error("Color must start with '#': {0}")]
    MissingHash(String),

    #[error("Color must have 3, 6 or 8 hex digits: {0}")]
    InvalidLength(String),

    #[error("Invalid hex digit in color: {0}")]
    InvalidDigit(char),
}

/// CSS hex color (`#rgb`, `#rrggbb` or `#rrggbbaa`)
///
/// # Examples
///
/// ```rust
/// use iam_commands::domain::Color;
///
/// assert!(Color::new("#5469d4").is_ok());
/// assert!(Color::new("#fff").is_ok());
/// assert!(Color::new("5469d4").is_err());
/// assert!(Color::new("#12345").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Color(String);

impl Color {
    pub fn new(value: impl Into<String>) -> Result<Self, ColorError> {
        let value = value.into();

        let Some(digits) = value.strip_prefix('#') else {
            return Err(ColorError::MissingHash(value));
        };

        if !matches!(digits.len(), 3 | 6 | 8) {
            return Err(ColorError::InvalidLength(value));
        }

        if let Some(bad) = digits.chars().find(|c| !c.is_ascii_hexdigit()) {
            return Err(ColorError::InvalidDigit(bad));
        }

        Ok(Self(value.to_ascii_lowercase()))
    }

    /// Validate a color setting where the empty string means "not set"
    pub fn validate_optional(value: &str) -> Result<(), ColorError> {
        if value.is_empty() {
            return Ok(());
        }
        Self::new(value).map(|_| ())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
