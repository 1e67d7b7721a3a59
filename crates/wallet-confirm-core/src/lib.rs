pub mod chains;
pub mod config;
pub mod confirmation;
pub mod domain;
pub mod error;
pub mod gas;
pub mod nonce;
pub mod polling;
pub mod ports;
pub mod state_machine;
pub mod sufficiency;
pub mod wallets;

pub use config::{ChainSettings, ConfirmConfig};
pub use confirmation::{ConfirmOutcome, ConfirmView, ConfirmationSession, USER_REJECTED_MESSAGE};
pub use domain::{
    AccountInfo, AnalyticsEvent, Approval, ChainId, DismissRequest, GasFeeParams, GasFeeSelection,
    GasFeeTable, HistoryRecord, HistoryStatus, PendingRequest, RequestMethod, RequestSource,
    RequestType, SpeedTier, TimestampMs, TransactionDraft, TransactionRequest, TransactionResult,
    WalletHandle,
};
pub use error::{ConfirmError, INTERNAL_ERROR_CODE, SESSION_ERROR_CODE, USER_REJECTED_CODE};
pub use polling::GasPollHandle;
pub use ports::{
    AnalyticsPort, ChainStatePort, ClockPort, DappSessionPort, GasEstimatorPort, HistoryPort,
    NavigatorPort, PortError, Ports, SignerPort,
};
pub use state_machine::{ConfirmAction, ConfirmState, StateTransition};
pub use sufficiency::{ConfirmLabel, Sufficiency};
pub use wallets::{Wallet, WalletAccount, WalletError, WalletKind, WalletRepository};
