// Copyright (c) 2025 - Cowboy AI, Inc.
//! Finite State Machine Abstractions
//!
//! Lifecycles of write models are modeled as pure state machines. Commands
//! ask the machine whether their intent is a legal transition from the
//! state the write model was folded into; reducers never consult it, since
//! persisted events are facts that already happened.
//!
//! # Mealy Machine
//!
//! ```text
//! (State, Input) → (State, Output)
//! ```
//!
//! # Machines
//!
//! - [`lifecycle::EntityState`] - `Unspecified → Active ⇄ Inactive → Removed`
//!   shared by policies, members, projects, roles, grants and sessions
//! - [`auth_request::AuthRequestState`] - the OIDC auth request flow

pub mod auth_request;
pub mod lifecycle;

pub use auth_request::{AuthRequestInput, AuthRequestState};
pub use lifecycle::{EntityState, Lifecycle};

/// Result of a state transition
pub type TransitionResult<S> = Result<S, TransitionError>;

/// Errors that can occur during state transitions
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransitionError {
    /// The input requires an existing entity
    #[error("Entity does not exist (state {0})")]
    NotExisting(String),

    /// The input requires the entity to be absent
    #[error("Entity already exists (state {0})")]
    AlreadyExisting(String),

    /// The entity exists but the input is not accepted in its state
    #[error("Invalid transition from {from} on {input}")]
    InvalidTransition { from: String, input: String },
}

/// Trait for finite state machines
///
/// Implement this trait to define a state machine with typed states,
/// inputs, and outputs.
pub trait StateMachine: Sized + Clone {
    /// Input type that triggers transitions
    type Input;

    /// Output type produced by transitions (use () if none)
    type Output;

    /// Attempt to transition to a new state given an input
    ///
    /// # Returns
    /// - Ok((new_state, output)) if transition is valid
    /// - Err(TransitionError) if transition is invalid
    fn transition(&self, input: &Self::Input) -> TransitionResult<(Self, Self::Output)>;

    /// Check if a transition is valid without performing it
    fn can_transition(&self, input: &Self::Input) -> bool {
        self.transition(input).is_ok()
    }
}
