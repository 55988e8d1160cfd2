// Copyright (c) 2025 - Cowboy AI, Inc.
//! Per-call command context

use std::time::Duration;

use tokio::time::Instant;

/// Caller identity and deadline for one command invocation
///
/// The context is created per request and never shared between commands.
#[derive(Debug, Clone)]
pub struct CommandContext {
    /// Instance (tenant) every event of this call belongs to
    pub instance_id: String,
    /// Acting user, recorded as creator of appended events
    pub user_id: String,
    deadline: Option<Instant>,
}

impl CommandContext {
    pub fn new(instance_id: impl Into<String>, user_id: impl Into<String>) -> Self {
        Self {
            instance_id: instance_id.into(),
            user_id: user_id.into(),
            deadline: None,
        }
    }

    /// Abort store calls still pending at `deadline`
    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    pub fn with_timeout(self, timeout: Duration) -> Self {
        self.with_deadline(Instant::now() + timeout)
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    pub fn is_expired(&self) -> bool {
        self.deadline.is_some_and(|deadline| Instant::now() >= deadline)
    }

    /// Tightest of the caller deadline and `now + bound`
    pub(crate) fn effective_deadline(&self, bound: Option<Duration>) -> Option<Instant> {
        let bounded = bound.map(|bound| Instant::now() + bound);
        match (self.deadline, bounded) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }
}
