// Copyright (c) 2025 - Cowboy AI, Inc.
//! IAM Domain Models
//!
//! Value objects and pure invariants used by the command layer.
//!
//! # Value Objects with Invariants
//!
//! - [`Color`] - CSS hex color used by label policies
//! - [`LabelPolicy`], [`PasswordAgePolicy`], [`PasswordComplexityPolicy`],
//!   [`PrivacyPolicy`], [`MailTemplatePolicy`] - policy settings
//! - [`ObjectDetails`] - uniform success result of mutating commands
//!
//! # Invariants
//!
//! [`invariants`] holds the structural checks (required fields, role
//! allow-lists, duplicate keys, language tags) shared across commands.

pub mod color;
pub mod details;
pub mod invariants;
pub mod policy;

pub use color::{Color, ColorError};
pub use details::ObjectDetails;
pub use invariants::{ValidationError, ValidationResult};
pub use policy::{
    LabelAsset, LabelPolicy, MailTemplatePolicy, PasswordAgePolicy, PasswordComplexityPolicy,
    PolicyError, PrivacyPolicy, ThemeMode,
};
