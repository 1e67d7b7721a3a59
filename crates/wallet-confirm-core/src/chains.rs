//! Chain constants the confirmation flow needs to know about.

use crate::domain::ChainId;

pub const MAINNET: ChainId = 1;
pub const OPTIMISM: ChainId = 10;
pub const BSC: ChainId = 56;
pub const POLYGON: ChainId = 137;
pub const BASE: ChainId = 8453;
pub const ARBITRUM: ChainId = 42161;
pub const AVALANCHE: ChainId = 43114;
pub const ZORA: ChainId = 7777777;

pub fn native_symbol(chain_id: ChainId) -> &'static str {
    match chain_id {
        POLYGON => "POL",
        BSC => "BNB",
        AVALANCHE => "AVAX",
        _ => "ETH",
    }
}

/// OP-stack rollups charge an extra L1 data fee on top of execution gas.
pub fn charges_l1_fee(chain_id: ChainId) -> bool {
    matches!(chain_id, OPTIMISM | BASE | ZORA)
}
