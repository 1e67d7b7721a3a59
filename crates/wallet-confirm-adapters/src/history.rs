use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use alloy::primitives::Address;
use async_trait::async_trait;

use wallet_confirm_core::{ChainId, HistoryPort, HistoryRecord, PortError};

/// Submitted transactions per `(account, chain)`, newest last.
#[derive(Debug, Clone, Default)]
pub struct HistoryAdapter {
    inner: Arc<Mutex<HashMap<(Address, ChainId), Vec<HistoryRecord>>>>,
}

impl HistoryAdapter {
    fn records(
        &self,
    ) -> Result<MutexGuard<'_, HashMap<(Address, ChainId), Vec<HistoryRecord>>>, PortError> {
        self.inner
            .lock()
            .map_err(|e| PortError::Transport(format!("history lock poisoned: {e}")))
    }

    pub fn transactions(
        &self,
        address: Address,
        chain_id: ChainId,
    ) -> Result<Vec<HistoryRecord>, PortError> {
        Ok(self
            .records()?
            .get(&(address, chain_id))
            .cloned()
            .unwrap_or_default())
    }
}

#[async_trait]
impl HistoryPort for HistoryAdapter {
    async fn add_transaction(
        &self,
        address: Address,
        chain_id: ChainId,
        record: HistoryRecord,
    ) -> Result<(), PortError> {
        let mut g = self.records()?;
        let entries = g.entry((address, chain_id)).or_default();
        if entries.iter().any(|r| r.hash == record.hash) {
            return Err(PortError::Conflict(format!(
                "transaction {} already recorded",
                record.hash
            )));
        }
        tracing::debug!(%address, chain_id, hash = %record.hash, "history record added");
        entries.push(record);
        Ok(())
    }

    async fn latest_nonce(
        &self,
        address: Address,
        chain_id: ChainId,
    ) -> Result<Option<u64>, PortError> {
        Ok(self
            .records()?
            .get(&(address, chain_id))
            .and_then(|entries| entries.iter().map(|r| r.nonce).max()))
    }
}
