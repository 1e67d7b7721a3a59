use alloy::primitives::U256;

use crate::domain::{GasFeeParams, GasFeeSelection, GasFeeTable, SpeedTier};

/// Gas used by a plain native-asset transfer.
pub const BASIC_TX_GAS: u64 = 21_000;

const BPS: u64 = 10_000;

pub fn apply_bps(value: u64, bps: u64) -> u64 {
    let scaled = u128::from(value) * u128::from(bps) / u128::from(BPS);
    u64::try_from(scaled).unwrap_or(u64::MAX)
}

/// Pads a raw estimate while keeping it under the latest block gas limit.
///
/// An estimate already above `last_block` is returned untouched; otherwise the
/// padded estimate is used unless it would cross `last_block`.
pub fn pad_estimate(
    estimated: u64,
    block_gas_limit: u64,
    padding_bps: u64,
    last_block_ratio_bps: u64,
) -> u64 {
    let last_block = apply_bps(block_gas_limit, last_block_ratio_bps);
    let padded = apply_bps(estimated, padding_bps);
    if estimated > last_block {
        estimated
    } else if last_block > padded {
        padded
    } else {
        last_block
    }
}

/// Gas to put on the final transaction given a fresh padded estimate.
///
/// The padded value wins when the dApp sent no limit or sent a lower one.
pub fn confirm_gas_limit(
    padded: Option<u64>,
    dapp_gas: Option<u64>,
    dapp_gas_limit: Option<u64>,
) -> Option<u64> {
    let Some(padded) = padded else {
        return dapp_gas.or(dapp_gas_limit);
    };
    let use_padded = (dapp_gas.is_none() && dapp_gas_limit.is_none())
        || dapp_gas.is_some_and(|g| padded > g)
        || dapp_gas_limit.is_some_and(|g| padded > g);
    if use_padded {
        Some(padded)
    } else {
        dapp_gas.or(dapp_gas_limit)
    }
}

/// Returns `(estimated_fee, max_fee)` in wei.
pub fn fees_for(
    params: &GasFeeParams,
    current_base_fee: Option<U256>,
    gas_limit: u64,
    l1_fee: Option<U256>,
) -> (U256, U256) {
    let gas = U256::from(gas_limit);
    let estimated_price = match params {
        GasFeeParams::Eip1559 {
            max_base_fee,
            max_priority_fee,
        } => current_base_fee
            .unwrap_or(*max_base_fee)
            .saturating_add(*max_priority_fee),
        GasFeeParams::Legacy { gas_price } => *gas_price,
    };
    let max_price = params.max_price_per_gas();
    let l1 = l1_fee.unwrap_or(U256::ZERO);
    (
        gas.saturating_mul(estimated_price).saturating_add(l1),
        gas.saturating_mul(max_price).saturating_add(l1),
    )
}

/// Prices the chosen tier; custom params take precedence when supplied.
pub fn select_fee(
    table: &GasFeeTable,
    tier: SpeedTier,
    custom: Option<&GasFeeParams>,
    gas_limit: u64,
) -> Option<GasFeeSelection> {
    let (speed_tier, params) = match (tier, custom) {
        (SpeedTier::Custom, Some(custom)) => (SpeedTier::Custom, custom.clone()),
        _ => match table.by_speed.get(&tier) {
            Some(params) => (tier, params.clone()),
            None => (
                SpeedTier::Normal,
                table.by_speed.get(&SpeedTier::Normal)?.clone(),
            ),
        },
    };
    let (estimated_fee, max_fee) = fees_for(&params, table.current_base_fee, gas_limit, table.l1_fee);
    Some(GasFeeSelection {
        speed_tier,
        params,
        gas_limit,
        estimated_fee,
        max_fee,
    })
}

pub fn is_valid_gas(selection: &GasFeeSelection) -> bool {
    if selection.gas_limit < BASIC_TX_GAS {
        return false;
    }
    match &selection.params {
        GasFeeParams::Eip1559 {
            max_base_fee,
            max_priority_fee: _,
        } => !max_base_fee.is_zero(),
        GasFeeParams::Legacy { gas_price } => !gas_price.is_zero(),
    }
}
