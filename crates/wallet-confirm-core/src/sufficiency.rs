use alloy::primitives::U256;
use serde::{Deserialize, Serialize};

use crate::domain::GasFeeSelection;
use crate::gas::is_valid_gas;
use crate::state_machine::ConfirmState;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Sufficiency {
    /// Balance or fee data has not loaded yet.
    Pending,
    Sufficient,
    Insufficient,
}

/// Compares `value + max_fee` with the native balance on the target chain.
pub fn check_balance(
    balance: Option<U256>,
    value: U256,
    max_fee: Option<U256>,
    is_message: bool,
) -> Sufficiency {
    if is_message {
        return Sufficiency::Sufficient;
    }
    let (Some(balance), Some(max_fee)) = (balance, max_fee) else {
        return Sufficiency::Pending;
    };
    if balance >= value.saturating_add(max_fee) {
        Sufficiency::Sufficient
    } else {
        Sufficiency::Insufficient
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConfirmLabel {
    Loading,
    Confirm,
    InsufficientFunds { symbol: String },
    InvalidGas,
    Authorizing,
    Done,
}

#[derive(Debug, Clone, Copy)]
pub struct ConfirmGate<'a> {
    pub state: ConfirmState,
    pub is_message: bool,
    pub sufficiency: Sufficiency,
    pub selection: Option<&'a GasFeeSelection>,
}

impl ConfirmGate<'_> {
    pub fn can_confirm(&self) -> bool {
        if !matches!(self.state, ConfirmState::Ready | ConfirmState::Failed) {
            return false;
        }
        if self.is_message {
            return true;
        }
        let gas_ok = self.selection.is_some_and(is_valid_gas);
        gas_ok && self.sufficiency == Sufficiency::Sufficient
    }

    pub fn label(&self, native_symbol: &str) -> ConfirmLabel {
        match self.state {
            ConfirmState::Loading => return ConfirmLabel::Loading,
            ConfirmState::Authorizing => return ConfirmLabel::Authorizing,
            ConfirmState::Succeeded | ConfirmState::Cancelled => return ConfirmLabel::Done,
            ConfirmState::Ready | ConfirmState::Failed => {}
        }
        if self.is_message {
            return ConfirmLabel::Confirm;
        }
        if self.sufficiency == Sufficiency::Insufficient {
            return ConfirmLabel::InsufficientFunds {
                symbol: native_symbol.to_owned(),
            };
        }
        match self.selection {
            None => ConfirmLabel::Loading,
            Some(selection) if !is_valid_gas(selection) => ConfirmLabel::InvalidGas,
            Some(_) if self.sufficiency == Sufficiency::Pending => ConfirmLabel::Loading,
            Some(_) => ConfirmLabel::Confirm,
        }
    }
}
