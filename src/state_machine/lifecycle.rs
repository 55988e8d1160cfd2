// Copyright (c) 2025 - Cowboy AI, Inc.
//! Generic Entity Lifecycle State Machine
//!
//! # States
//!
//! - Unspecified: no event seen yet
//! - Active: added (or reactivated)
//! - Inactive: deactivated, still existing
//! - Removed: removed; only a new `Add` leaves this state
//!
//! # Inputs
//!
//! - Add: Unspecified | Removed → Active
//! - Change: Active | Inactive → same state
//! - Deactivate: Active → Inactive
//! - Reactivate: Inactive → Active
//! - Remove: Active | Inactive → Removed
//!
//! `Add` on an existing entity is rejected as already existing; every other
//! input on a missing entity is rejected as not existing.

use std::fmt;

use super::{StateMachine, TransitionError, TransitionResult};
use crate::errors::{CommandError, CommandResult};

/// Lifecycle state of a write model
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EntityState {
    #[default]
    Unspecified,
    Active,
    Inactive,
    Removed,
}

impl EntityState {
    /// Active or inactive
    pub fn exists(&self) -> bool {
        matches!(self, EntityState::Active | EntityState::Inactive)
    }

    pub fn is_active(&self) -> bool {
        *self == EntityState::Active
    }

    /// Check `input` against this state, naming `entity` in error keys
    ///
    /// Maps rejections to the command error taxonomy:
    /// not existing → `NotFound`, already existing → `AlreadyExists`,
    /// wrong state → `PreconditionFailed` (`NotActive` / `NotInactive`).
    pub fn check(&self, input: Lifecycle, entity: &str) -> CommandResult<EntityState> {
        match self.transition(&input) {
            Ok((next, ())) => Ok(next),
            Err(TransitionError::NotExisting(_)) => Err(CommandError::not_found(
                "LIFE-3k9sd",
                format!("Errors.{entity}.NotFound"),
            )),
            Err(TransitionError::AlreadyExisting(_)) => Err(CommandError::already_exists(
                "LIFE-0ps2m",
                format!("Errors.{entity}.AlreadyExists"),
            )),
            Err(TransitionError::InvalidTransition { .. }) => {
                let reason = match input {
                    Lifecycle::Reactivate => "NotInactive",
                    _ => "NotActive",
                };
                Err(CommandError::precondition_failed(
                    "LIFE-7dn2x",
                    format!("Errors.{entity}.{reason}"),
                ))
            }
        }
    }
}

impl fmt::Display for EntityState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Lifecycle command (FSM input)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lifecycle {
    Add,
    Change,
    Deactivate,
    Reactivate,
    Remove,
}

impl StateMachine for EntityState {
    type Input = Lifecycle;
    type Output = ();

    fn transition(&self, input: &Self::Input) -> TransitionResult<(Self, Self::Output)> {
        use EntityState::*;
        use Lifecycle::*;

        match (self, input) {
            (Unspecified | Removed, Add) => Ok((Active, ())),
            (Active | Inactive, Add) => Err(TransitionError::AlreadyExisting(self.to_string())),
            (Unspecified | Removed, _) => Err(TransitionError::NotExisting(self.to_string())),
            (Active | Inactive, Change) => Ok((*self, ())),
            (Active, Deactivate) => Ok((Inactive, ())),
            (Inactive, Reactivate) => Ok((Active, ())),
            (Active | Inactive, Remove) => Ok((Removed, ())),
            (Inactive, Deactivate) | (Active, Reactivate) => Err(TransitionError::InvalidTransition {
                from: self.to_string(),
                input: format!("{input:?}"),
            }),
        }
    }
}
