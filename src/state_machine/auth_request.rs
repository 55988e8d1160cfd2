// Copyright (c) 2025 - Cowboy AI, Inc.
//! Auth Request Lifecycle State Machine
//!
//! # States
//!
//! ```text
//! Unspecified ─Add→ Added ─LinkSession→ SessionLinked ─AddCode→ CodeAdded
//!                     │                     │                      │
//!                     │                     │ Succeed (implicit)   │ ExchangeCode
//!                     │                     ↓                      ↓
//!                     │                 Succeeded ←──Succeed── CodeExchanged
//!                     └──────Fail──────→ Failed (from Added, SessionLinked, CodeAdded)
//! ```
//!
//! `Succeeded` and `Failed` are terminal.

use std::fmt;

use super::{StateMachine, TransitionError, TransitionResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AuthRequestState {
    #[default]
    Unspecified,
    Added,
    SessionLinked,
    CodeAdded,
    CodeExchanged,
    Succeeded,
    Failed,
}

impl fmt::Display for AuthRequestState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthRequestInput {
    Add,
    LinkSession,
    AddCode,
    ExchangeCode,
    Succeed,
    Fail,
}

impl StateMachine for AuthRequestState {
    type Input = AuthRequestInput;
    type Output = ();

    fn transition(&self, input: &Self::Input) -> TransitionResult<(Self, Self::Output)> {
        use AuthRequestInput as I;
        use AuthRequestState as S;

        let next = match (self, input) {
            (S::Unspecified, I::Add) => S::Added,
            (_, I::Add) => return Err(TransitionError::AlreadyExisting(self.to_string())),
            (S::Unspecified, _) => return Err(TransitionError::NotExisting(self.to_string())),
            (S::Added, I::LinkSession) => S::SessionLinked,
            (S::SessionLinked, I::AddCode) => S::CodeAdded,
            (S::CodeAdded, I::ExchangeCode) => S::CodeExchanged,
            (S::SessionLinked | S::CodeExchanged, I::Succeed) => S::Succeeded,
            (S::Added | S::SessionLinked | S::CodeAdded, I::Fail) => S::Failed,
            _ => {
                return Err(TransitionError::InvalidTransition {
                    from: self.to_string(),
                    input: format!("{input:?}"),
                })
            }
        };
        Ok((next, ()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    fn run(inputs: &[AuthRequestInput]) -> TransitionResult<AuthRequestState> {
        inputs
            .iter()
            .try_fold(AuthRequestState::Unspecified, |state, input| {
                state.transition(input).map(|(next, ())| next)
            })
    }

    #[test]
    fn test_code_flow_reaches_succeeded() {
        use AuthRequestInput::*;

        let state = run(&[Add, LinkSession, AddCode, ExchangeCode, Succeed]);

        assert_eq!(state, Ok(AuthRequestState::Succeeded));
    }

    #[test]
    fn test_implicit_flow_succeeds_after_session_link() {
        use AuthRequestInput::*;

        assert_eq!(run(&[Add, LinkSession, Succeed]), Ok(AuthRequestState::Succeeded));
    }

    #[test_case(AuthRequestState::Succeeded ; "succeeded")]
    #[test_case(AuthRequestState::Failed ; "failed")]
    fn test_terminal_states_reject_everything(state: AuthRequestState) {
        for input in [
            AuthRequestInput::LinkSession,
            AuthRequestInput::AddCode,
            AuthRequestInput::ExchangeCode,
            AuthRequestInput::Succeed,
            AuthRequestInput::Fail,
        ] {
            assert!(!state.can_transition(&input), "{state} accepted {input:?}");
        }
    }

    #[test]
    fn test_code_cannot_be_exchanged_twice() {
        use AuthRequestInput::*;

        let err = run(&[Add, LinkSession, AddCode, ExchangeCode, ExchangeCode]).unwrap_err();

        assert!(matches!(err, TransitionError::InvalidTransition { .. }));
    }

    #[test]
    fn test_missing_request_is_not_existing() {
        let err = AuthRequestState::Unspecified
            .transition(&AuthRequestInput::Fail)
            .unwrap_err();

        assert_eq!(err, TransitionError::NotExisting("Unspecified".to_string()));
    }
}
