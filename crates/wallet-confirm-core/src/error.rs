use thiserror::Error;

use crate::ports::PortError;
use crate::state_machine::{ConfirmAction, ConfirmState};

/// EIP-1193 "user rejected request".
pub const USER_REJECTED_CODE: i64 = 4001;
pub const INTERNAL_ERROR_CODE: i64 = -32603;
pub const SESSION_ERROR_CODE: i64 = -32000;

#[derive(Debug, Error)]
pub enum ConfirmError {
    #[error("validation error: {0}")]
    Validation(String),
    #[error("gas estimation failed: {0}")]
    Estimation(String),
    #[error("signing failed: {message}")]
    Signing {
        message: String,
        hardware_wallet: bool,
    },
    #[error("dapp session unavailable: {0}")]
    Session(String),
    #[error("user rejected the request")]
    UserRejected,
    #[error("illegal confirmation transition: {from:?} via {action:?}")]
    IllegalTransition {
        from: ConfirmState,
        action: ConfirmAction,
    },
    #[error(transparent)]
    Port(#[from] PortError),
}

impl ConfirmError {
    /// Code reported back to the requesting dApp.
    pub fn rpc_code(&self) -> i64 {
        match self {
            Self::UserRejected | Self::Validation(_) => USER_REJECTED_CODE,
            Self::Session(_) => SESSION_ERROR_CODE,
            _ => INTERNAL_ERROR_CODE,
        }
    }
}
