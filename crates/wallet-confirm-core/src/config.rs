use std::collections::BTreeMap;
use std::time::Duration;

use crate::chains;
use crate::domain::ChainId;
use crate::gas::BASIC_TX_GAS;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChainSettings {
    pub poll_interval_ms: u64,
    pub default_gas_limit: u64,
}

#[derive(Debug, Clone)]
pub struct ConfirmConfig {
    /// Multiplier applied to gas estimates at confirm time, in basis points.
    pub gas_padding_bps: u64,
    /// Share of the latest block gas limit a padded estimate may not exceed.
    pub last_block_ratio_bps: u64,
    pub default_gas_limit: u64,
    pub default_poll_interval_ms: u64,
    pub prepare_timeout_ms: u64,
    pub chain_settings: BTreeMap<ChainId, ChainSettings>,
}

impl Default for ConfirmConfig {
    fn default() -> Self {
        let mut chain_settings = BTreeMap::new();
        chain_settings.insert(
            chains::POLYGON,
            ChainSettings {
                poll_interval_ms: 2_000,
                default_gas_limit: BASIC_TX_GAS,
            },
        );
        chain_settings.insert(
            chains::ARBITRUM,
            ChainSettings {
                poll_interval_ms: 3_000,
                default_gas_limit: 350_000,
            },
        );
        Self {
            gas_padding_bps: 11_000,
            last_block_ratio_bps: 9_000,
            default_gas_limit: BASIC_TX_GAS,
            default_poll_interval_ms: 5_000,
            prepare_timeout_ms: 15_000,
            chain_settings,
        }
    }
}

impl ConfirmConfig {
    pub fn poll_interval(&self, chain_id: ChainId) -> Duration {
        let ms = self
            .chain_settings
            .get(&chain_id)
            .map(|s| s.poll_interval_ms)
            .unwrap_or(self.default_poll_interval_ms);
        Duration::from_millis(ms.max(1))
    }

    pub fn default_gas_limit(&self, chain_id: ChainId) -> u64 {
        self.chain_settings
            .get(&chain_id)
            .map(|s| s.default_gas_limit)
            .unwrap_or(self.default_gas_limit)
    }

    pub fn prepare_timeout(&self) -> Duration {
        Duration::from_millis(self.prepare_timeout_ms)
    }
}
