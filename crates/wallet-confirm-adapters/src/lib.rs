pub mod analytics;
pub mod chain;
pub mod clock;
pub mod config;
pub mod gas;
pub mod history;
pub mod navigator;
pub mod rpc;
pub mod runtime;
pub mod session;
pub mod signer;

pub use analytics::AnalyticsAdapter;
pub use chain::RpcChainState;
pub use clock::SystemClock;
pub use config::{AdapterConfig, FeeTierConfig, RuntimeProfile, TierMultipliers};
pub use gas::RpcGasEstimator;
pub use history::HistoryAdapter;
pub use navigator::NavigatorAdapter;
pub use rpc::RpcClient;
pub use runtime::AdapterSet;
pub use session::{DappSession, DappSessionAdapter, SessionResponse};
pub use signer::SignerAdapter;
