//! Workflow phases and the transitions between them

use crate::error::{SwapError, SwapResult};

use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Settlement {
    Success,
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "phase", content = "outcome", rename_all = "snake_case")]
pub enum Phase {
    Idle,
    Classifying,
    Quoting,
    ReadyToSubmit,
    Approving,
    Executing,
    Settled(Settlement),
}

impl Phase {
    /// A submission is between user confirmation and receipt
    pub fn is_busy(&self) -> bool {
        matches!(self, Phase::Approving | Phase::Executing)
    }

    pub fn can_transition_to(&self, next: Phase) -> bool {
        use Phase::*;

        match (*self, next) {
            // Any state may fail
            (_, Settled(Settlement::Error)) => true,
            // Edits, except while a submission holds the request
            (Idle | Classifying | Quoting | ReadyToSubmit | Settled(_), Classifying) => true,
            (Classifying, Idle | Quoting | ReadyToSubmit) => true,
            (Quoting, ReadyToSubmit) => true,
            (ReadyToSubmit, Approving | Executing) => true,
            (Approving, Executing) => true,
            (Executing, Settled(Settlement::Success)) => true,
            _ => false,
        }
    }

    pub fn transition(self, next: Phase) -> SwapResult<Phase> {
        if self.can_transition_to(next) {
            Ok(next)
        } else {
            Err(SwapError::InvalidStateTransition {
                from: self.to_string(),
                to: next.to_string(),
            })
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::Idle => write!(f, "idle"),
            Phase::Classifying => write!(f, "classifying"),
            Phase::Quoting => write!(f, "quoting"),
            Phase::ReadyToSubmit => write!(f, "ready to submit"),
            Phase::Approving => write!(f, "approving"),
            Phase::Executing => write!(f, "executing"),
            Phase::Settled(Settlement::Success) => write!(f, "settled (success)"),
            Phase::Settled(Settlement::Error) => write!(f, "settled (error)"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_happy_paths() {
        let quoted = [
            Phase::Classifying,
            Phase::Quoting,
            Phase::ReadyToSubmit,
            Phase::Approving,
            Phase::Executing,
            Phase::Settled(Settlement::Success),
        ];
        let mut phase = Phase::Idle;
        for next in quoted {
            phase = phase.transition(next).unwrap();
        }

        // Wrap: no quote, no approval
        let phase = Phase::Settled(Settlement::Success)
            .transition(Phase::Classifying)
            .and_then(|p| p.transition(Phase::ReadyToSubmit))
            .and_then(|p| p.transition(Phase::Executing))
            .unwrap();
        assert_eq!(phase, Phase::Executing);
    }

    #[test]
    fn test_no_execution_without_ready_request() {
        assert!(!Phase::Quoting.can_transition_to(Phase::Executing));
        assert!(!Phase::Classifying.can_transition_to(Phase::Approving));
        assert!(!Phase::Idle.can_transition_to(Phase::Executing));
        assert!(matches!(
            Phase::Quoting.transition(Phase::Approving),
            Err(SwapError::InvalidStateTransition { .. })
        ));
    }

    #[test]
    fn test_edits_blocked_while_submitting() {
        assert!(!Phase::Approving.can_transition_to(Phase::Classifying));
        assert!(!Phase::Executing.can_transition_to(Phase::Classifying));
        assert!(Phase::Approving.is_busy());
    }

    #[test]
    fn test_any_state_can_fail() {
        for phase in [
            Phase::Idle,
            Phase::Classifying,
            Phase::Quoting,
            Phase::ReadyToSubmit,
            Phase::Approving,
            Phase::Executing,
        ] {
            assert!(phase.can_transition_to(Phase::Settled(Settlement::Error)));
        }
    }
}
