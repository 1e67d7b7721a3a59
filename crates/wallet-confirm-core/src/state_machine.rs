use serde::{Deserialize, Serialize};

use crate::error::ConfirmError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ConfirmState {
    Loading,
    Ready,
    Authorizing,
    Succeeded,
    Failed,
    Cancelled,
}

impl ConfirmState {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Succeeded | Self::Cancelled)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ConfirmAction {
    Prepared,
    Confirm,
    SignSuccess,
    SignFailure,
    Cancel,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StateTransition {
    pub from: ConfirmState,
    pub to: ConfirmState,
    pub reason: &'static str,
}

pub fn confirm_transition(
    state: ConfirmState,
    action: ConfirmAction,
) -> Result<(ConfirmState, StateTransition), ConfirmError> {
    use ConfirmAction as A;
    use ConfirmState as S;

    let (to, reason) = match (state, action) {
        (S::Loading, A::Prepared) => (S::Ready, "prerequisites_loaded"),
        (S::Ready, A::Confirm) => (S::Authorizing, "user_confirmed"),
        (S::Failed, A::Confirm) => (S::Authorizing, "user_retried"),
        (S::Authorizing, A::SignSuccess) => (S::Succeeded, "signer_succeeded"),
        (S::Authorizing, A::SignFailure) => (S::Failed, "signer_failed"),
        (S::Loading | S::Ready | S::Authorizing | S::Failed, A::Cancel) => {
            (S::Cancelled, "cancelled")
        }
        _ => {
            return Err(ConfirmError::IllegalTransition {
                from: state,
                action,
            })
        }
    };

    Ok((
        to,
        StateTransition {
            from: state,
            to,
            reason,
        },
    ))
}
