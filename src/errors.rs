// Copyright (c) 2025 - Cowboy AI, Inc.
//! Error types for command operations
//!
//! Every failure surfaced by a command carries three things:
//!
//! - an [`ErrorKind`] that callers branch on,
//! - a stable id (`"LABEL-9fk2s"`) that identifies the exact call site,
//! - a localizable message key (`"Errors.Org.LabelPolicy.NotFound"`).
//!
//! Collaborator failures keep their own error enums and are wrapped as
//! [`ErrorKind::Internal`] (or [`ErrorKind::Aborted`] for concurrency
//! conflicts) at the command boundary.

use std::borrow::Cow;
use std::fmt;

use thiserror::Error;

/// Boxed error used as the optional cause of a [`CommandError`]
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Classification of a command failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Malformed or missing input, invalid role or enum value
    InvalidArgument,
    /// Referenced aggregate does not exist or is removed
    NotFound,
    /// Uniqueness violated
    AlreadyExists,
    /// Valid request, but the current state forbids it
    PreconditionFailed,
    /// Authorization check failed
    PermissionDenied,
    /// Concurrent writer won, or the deadline passed before commit
    Aborted,
    /// Collaborator failure
    Internal,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::InvalidArgument => "invalid argument",
            ErrorKind::NotFound => "not found",
            ErrorKind::AlreadyExists => "already exists",
            ErrorKind::PreconditionFailed => "precondition failed",
            ErrorKind::PermissionDenied => "permission denied",
            ErrorKind::Aborted => "aborted",
            ErrorKind::Internal => "internal",
        };
        f.write_str(name)
    }
}

/// Error returned by every command entry point
#[derive(Debug, Error)]
#[error("{kind}: {key} ({id})")]
pub struct CommandError {
    kind: ErrorKind,
    id: &'static str,
    key: Cow<'static, str>,
    #[source]
    source: Option<BoxError>,
}

/// Result type for command operations
pub type CommandResult<T> = Result<T, CommandError>;

impl CommandError {
    /// Create an error of the given kind
    pub fn new(kind: ErrorKind, id: &'static str, key: impl Into<Cow<'static, str>>) -> Self {
        Self {
            kind,
            id,
            key: key.into(),
            source: None,
        }
    }

    pub fn invalid_argument(id: &'static str, key: impl Into<Cow<'static, str>>) -> Self {
        Self::new(ErrorKind::InvalidArgument, id, key)
    }

    pub fn not_found(id: &'static str, key: impl Into<Cow<'static, str>>) -> Self {
        Self::new(ErrorKind::NotFound, id, key)
    }

    pub fn already_exists(id: &'static str, key: impl Into<Cow<'static, str>>) -> Self {
        Self::new(ErrorKind::AlreadyExists, id, key)
    }

    pub fn precondition_failed(id: &'static str, key: impl Into<Cow<'static, str>>) -> Self {
        Self::new(ErrorKind::PreconditionFailed, id, key)
    }

    pub fn permission_denied(id: &'static str, key: impl Into<Cow<'static, str>>) -> Self {
        Self::new(ErrorKind::PermissionDenied, id, key)
    }

    pub fn aborted(id: &'static str, key: impl Into<Cow<'static, str>>) -> Self {
        Self::new(ErrorKind::Aborted, id, key)
    }

    pub fn internal(id: &'static str, key: impl Into<Cow<'static, str>>) -> Self {
        Self::new(ErrorKind::Internal, id, key)
    }

    /// Attach the underlying cause
    pub fn with_source(mut self, source: impl Into<BoxError>) -> Self {
        self.source = Some(source.into());
        self
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// Stable identifier of the failing call site
    pub fn id(&self) -> &'static str {
        self.id
    }

    /// Localizable message key
    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn is(&self, kind: ErrorKind) -> bool {
        self.kind == kind
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn test_constructors_set_kind() {
        let cases = [
            (CommandError::invalid_argument("T-1", "k"), ErrorKind::InvalidArgument),
            (CommandError::not_found("T-2", "k"), ErrorKind::NotFound),
            (CommandError::already_exists("T-3", "k"), ErrorKind::AlreadyExists),
            (CommandError::precondition_failed("T-4", "k"), ErrorKind::PreconditionFailed),
            (CommandError::permission_denied("T-5", "k"), ErrorKind::PermissionDenied),
            (CommandError::aborted("T-6", "k"), ErrorKind::Aborted),
            (CommandError::internal("T-7", "k"), ErrorKind::Internal),
        ];

        for (err, kind) in cases {
            assert!(err.is(kind));
            assert_eq!(err.kind(), kind);
        }
    }

    #[test]
    fn test_display_contains_key_and_id() {
        let err = CommandError::not_found("LABEL-0qS2f", "Errors.Org.LabelPolicy.NotFound");

        let rendered = err.to_string();

        assert_eq!(
            rendered,
            "not found: Errors.Org.LabelPolicy.NotFound (LABEL-0qS2f)"
        );
    }

    #[test]
    fn test_source_is_exposed() {
        let io = std::io::Error::new(std::io::ErrorKind::Other, "disk gone");

        let err = CommandError::internal("STORE-1", "Errors.Internal").with_source(io);

        assert!(err.source().is_some());
        assert_eq!(err.id(), "STORE-1");
        assert_eq!(err.key(), "Errors.Internal");
    }
}
