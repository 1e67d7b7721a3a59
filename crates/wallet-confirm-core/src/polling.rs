//! Background refresh of fee tables while a confirmation is on screen.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::domain::{ChainId, GasFeeTable};
use crate::ports::GasEstimatorPort;

/// Owns the polling task for one chain at a time.
///
/// Must be created inside a tokio runtime. Dropping the handle stops polling.
pub struct GasPollHandle {
    estimator: Arc<dyn GasEstimatorPort>,
    chain_id: ChainId,
    interval: Duration,
    table: Arc<watch::Sender<Option<GasFeeTable>>>,
    generation: Arc<AtomicU64>,
    task: Option<JoinHandle<()>>,
}

impl GasPollHandle {
    pub fn start(estimator: Arc<dyn GasEstimatorPort>, chain_id: ChainId, interval: Duration) -> Self {
        let (tx, _rx) = watch::channel(None);
        let mut handle = Self {
            estimator,
            chain_id,
            interval,
            table: Arc::new(tx),
            generation: Arc::new(AtomicU64::new(0)),
            task: None,
        };
        handle.spawn();
        handle
    }

    pub fn chain_id(&self) -> ChainId {
        self.chain_id
    }

    pub fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|t| !t.is_finished())
    }

    pub fn subscribe(&self) -> watch::Receiver<Option<GasFeeTable>> {
        self.table.subscribe()
    }

    pub fn latest(&self) -> Option<GasFeeTable> {
        self.table.borrow().clone()
    }

    /// Halts polling and clears the published table.
    pub fn stop(&mut self) {
        self.pause();
        self.table.send_replace(None);
    }

    /// Halts polling but keeps the last table, e.g. while another sheet is on top.
    pub fn pause(&mut self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
        if let Some(task) = self.task.take() {
            task.abort();
            tracing::debug!(chain_id = self.chain_id, "gas polling stopped");
        }
    }

    pub fn restart(&mut self, chain_id: ChainId, interval: Duration) {
        self.stop();
        self.chain_id = chain_id;
        self.interval = interval;
        self.spawn();
    }

    pub fn resume(&mut self) {
        if !self.is_running() {
            self.spawn();
        }
    }

    fn spawn(&mut self) {
        let generation = self.generation.load(Ordering::SeqCst);
        let task = tokio::spawn(poll_loop(
            Arc::clone(&self.estimator),
            self.chain_id,
            self.interval,
            Arc::clone(&self.table),
            Arc::clone(&self.generation),
            generation,
        ));
        tracing::debug!(
            chain_id = self.chain_id,
            interval_ms = self.interval.as_millis() as u64,
            "gas polling started"
        );
        self.task = Some(task);
    }
}

impl Drop for GasPollHandle {
    fn drop(&mut self) {
        self.stop();
    }
}

async fn poll_loop(
    estimator: Arc<dyn GasEstimatorPort>,
    chain_id: ChainId,
    interval: Duration,
    table: Arc<watch::Sender<Option<GasFeeTable>>>,
    generation: Arc<AtomicU64>,
    own_generation: u64,
) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    loop {
        ticker.tick().await;
        if generation.load(Ordering::SeqCst) != own_generation {
            return;
        }
        match estimator.fee_table(chain_id).await {
            Ok(fresh) if fresh.chain_id != chain_id => {
                tracing::warn!(
                    chain_id,
                    got = fresh.chain_id,
                    "fee table for unexpected chain ignored"
                );
            }
            Ok(fresh) => {
                // a stop() may have raced the fetch
                if generation.load(Ordering::SeqCst) != own_generation {
                    return;
                }
                table.send_replace(Some(fresh));
            }
            Err(err) => {
                tracing::warn!(chain_id, error = %err, "gas fee poll failed, keeping last table");
            }
        }
    }
}
