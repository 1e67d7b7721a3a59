use std::sync::Arc;

use wallet_confirm_core::{PortError, Ports};

use crate::{
    AdapterConfig, AnalyticsAdapter, DappSessionAdapter, HistoryAdapter, NavigatorAdapter,
    RpcChainState, RpcClient, RpcGasEstimator, SignerAdapter, SystemClock,
};

/// Every adapter wired from one config. Clones share state.
#[derive(Debug, Clone)]
pub struct AdapterSet {
    pub gas: RpcGasEstimator,
    pub chain: RpcChainState,
    pub signer: SignerAdapter,
    pub session: DappSessionAdapter,
    pub history: HistoryAdapter,
    pub navigator: NavigatorAdapter,
    pub analytics: AnalyticsAdapter,
}

impl AdapterSet {
    pub fn from_config(config: &AdapterConfig) -> Result<Self, PortError> {
        let rpc = RpcClient::with_config(config)?;
        Ok(Self {
            gas: RpcGasEstimator::new(rpc.clone(), config.fee_tiers.clone()),
            chain: RpcChainState::new(rpc.clone()),
            signer: SignerAdapter::with_config(config, rpc),
            session: DappSessionAdapter::default(),
            history: HistoryAdapter::default(),
            navigator: NavigatorAdapter::default(),
            analytics: AnalyticsAdapter::default(),
        })
    }

    pub fn ports(&self) -> Ports {
        Ports {
            gas: Arc::new(self.gas.clone()),
            chain: Arc::new(self.chain.clone()),
            signer: Arc::new(self.signer.clone()),
            session: Arc::new(self.session.clone()),
            history: Arc::new(self.history.clone()),
            navigator: Arc::new(self.navigator.clone()),
            analytics: Arc::new(self.analytics.clone()),
            clock: Arc::new(SystemClock),
        }
    }
}
