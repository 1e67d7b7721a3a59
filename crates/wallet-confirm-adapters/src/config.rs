use std::collections::BTreeMap;

use wallet_confirm_core::ChainId;

pub const ENV_PROFILE: &str = "WALLET_CONFIRM_PROFILE";
pub const ENV_RPC_PREFIX: &str = "WALLET_CONFIRM_RPC_";
pub const ENV_RPC_TIMEOUT_MS: &str = "WALLET_CONFIRM_RPC_TIMEOUT_MS";
pub const ENV_SIGNER_KEY: &str = "WALLET_CONFIRM_SIGNER_KEY";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RuntimeProfile {
    #[default]
    Development,
    Production,
}

impl RuntimeProfile {
    fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "development" | "dev" => Some(Self::Development),
            "production" | "prod" => Some(Self::Production),
            _ => None,
        }
    }
}

/// Multipliers in basis points applied to the node's fee data per speed tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TierMultipliers {
    pub base_fee_bps: u64,
    pub priority_fee_bps: u64,
    pub gas_price_bps: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeeTierConfig {
    pub normal: TierMultipliers,
    pub fast: TierMultipliers,
    pub urgent: TierMultipliers,
    /// Tip used when the node does not answer `eth_maxPriorityFeePerGas`.
    pub fallback_priority_fee_wei: u64,
}

impl Default for FeeTierConfig {
    fn default() -> Self {
        Self {
            normal: TierMultipliers {
                base_fee_bps: 12_500,
                priority_fee_bps: 10_000,
                gas_price_bps: 10_000,
            },
            fast: TierMultipliers {
                base_fee_bps: 15_000,
                priority_fee_bps: 15_000,
                gas_price_bps: 12_000,
            },
            urgent: TierMultipliers {
                base_fee_bps: 20_000,
                priority_fee_bps: 20_000,
                gas_price_bps: 15_000,
            },
            fallback_priority_fee_wei: 1_000_000_000,
        }
    }
}

#[derive(Debug, Clone)]
pub struct AdapterConfig {
    pub runtime_profile: RuntimeProfile,
    pub rpc_urls: BTreeMap<ChainId, String>,
    pub rpc_timeout_ms: u64,
    /// Hex private key for the local signer. Without one only the
    /// deterministic development signer is available.
    pub signer_key: Option<String>,
    pub fee_tiers: FeeTierConfig,
}

impl Default for AdapterConfig {
    fn default() -> Self {
        Self {
            runtime_profile: RuntimeProfile::Development,
            rpc_urls: BTreeMap::new(),
            rpc_timeout_ms: 15_000,
            signer_key: None,
            fee_tiers: FeeTierConfig::default(),
        }
    }
}

impl AdapterConfig {
    pub fn from_env() -> Self {
        Self::from_vars(std::env::vars())
    }

    /// Builds a config from `(key, value)` pairs; unknown keys are ignored.
    pub fn from_vars<I, K, V>(vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        let mut config = Self::default();
        for (key, value) in vars {
            let key = key.as_ref();
            let value: String = value.into();
            match key {
                ENV_PROFILE => match RuntimeProfile::parse(&value) {
                    Some(profile) => config.runtime_profile = profile,
                    None => tracing::warn!(value = %value, "unknown runtime profile ignored"),
                },
                ENV_RPC_TIMEOUT_MS => match value.trim().parse() {
                    Ok(ms) => config.rpc_timeout_ms = ms,
                    Err(_) => tracing::warn!(value = %value, "invalid rpc timeout ignored"),
                },
                ENV_SIGNER_KEY => {
                    let trimmed = value.trim();
                    if !trimmed.is_empty() {
                        config.signer_key = Some(trimmed.to_owned());
                    }
                }
                _ => {
                    let Some(chain) = key.strip_prefix(ENV_RPC_PREFIX) else {
                        continue;
                    };
                    match chain.parse::<ChainId>() {
                        Ok(chain_id) => {
                            config.rpc_urls.insert(chain_id, value.trim().to_owned());
                        }
                        Err(_) => tracing::warn!(key, "rpc variable without a numeric chain id"),
                    }
                }
            }
        }
        config
    }

    pub fn strict_runtime_required(&self) -> bool {
        self.runtime_profile == RuntimeProfile::Production
    }
}
