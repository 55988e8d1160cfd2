// Copyright (c) 2025 - Cowboy AI, Inc.
//! Pure Validation Functions - Domain Invariants
//!
//! Structural checks shared by many commands. All functions are pure and
//! return a [`ValidationError`]; commands decide which error kind the
//! failure maps to at their call site.

use std::collections::BTreeSet;

/// Validation result with detailed error information
pub type ValidationResult = Result<(), ValidationError>;

/// Validation error with context
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    /// Required field is empty
    #[error("Field {0} must not be empty")]
    Empty(&'static str),

    /// Roles outside the allowed set were requested
    #[error("Roles not allowed: {0:?}")]
    RolesNotAllowed(Vec<String>),

    /// The same key appears more than once in one request
    #[error("Duplicate keys: {0:?}")]
    DuplicateKeys(Vec<String>),

    /// Language tag is malformed
    #[error("Invalid language tag: {0}")]
    InvalidLanguage(String),
}

/// Reject empty or whitespace-only values
pub fn require(field: &'static str, value: &str) -> ValidationResult {
    if value.trim().is_empty() {
        return Err(ValidationError::Empty(field));
    }
    Ok(())
}

/// Every requested role must be in `allowed`; no partial acceptance
pub fn validate_roles<S: AsRef<str>>(requested: &[String], allowed: &[S]) -> ValidationResult {
    let invalid: Vec<String> = requested
        .iter()
        .filter(|role| !allowed.iter().any(|a| a.as_ref() == role.as_str()))
        .cloned()
        .collect();

    if !invalid.is_empty() {
        return Err(ValidationError::RolesNotAllowed(invalid));
    }
    Ok(())
}

/// Keys must be unique within one request
pub fn validate_unique_keys<'a, I>(keys: I) -> ValidationResult
where
    I: IntoIterator<Item = &'a str>,
{
    let mut seen = BTreeSet::new();
    let mut duplicates = BTreeSet::new();
    for key in keys {
        if !seen.insert(key) {
            duplicates.insert(key.to_string());
        }
    }

    if !duplicates.is_empty() {
        return Err(ValidationError::DuplicateKeys(duplicates.into_iter().collect()));
    }
    Ok(())
}

/// Same roles regardless of order and repetition
pub fn same_roles(left: &[String], right: &[String]) -> bool {
    let left: BTreeSet<&str> = left.iter().map(String::as_str).collect();
    let right: BTreeSet<&str> = right.iter().map(String::as_str).collect();
    left == right
}

/// Minimal BCP 47 shape check: `ll`, `lll` or `ll-Region` style tags
pub fn validate_language(tag: &str) -> ValidationResult {
    let invalid = || ValidationError::InvalidLanguage(tag.to_string());

    let mut parts = tag.split('-');
    let primary = parts.next().unwrap_or_default();
    if !(2..=3).contains(&primary.len()) || !primary.chars().all(|c| c.is_ascii_alphabetic()) {
        return Err(invalid());
    }

    for subtag in parts {
        if subtag.is_empty() || subtag.len() > 8 || !subtag.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(invalid());
        }
    }
    Ok(())
}
