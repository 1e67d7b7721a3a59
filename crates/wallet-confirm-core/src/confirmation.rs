//! One confirmation sheet: load prerequisites, gate Confirm, drive the signer,
//! and resolve the originating request exactly once.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, OnceLock, PoisonError};

use alloy::primitives::{Address, U256};
use tokio::runtime::Handle;
use tokio::sync::watch;

use crate::chains;
use crate::config::ConfirmConfig;
use crate::domain::{
    AccountInfo, AnalyticsEvent, Approval, DismissRequest, GasFeeParams, GasFeeSelection,
    GasFeeTable, HistoryRecord, HistoryStatus, PendingRequest, SpeedTier, TimestampMs,
    TransactionDraft, TransactionRequest, TransactionResult, WalletHandle,
};
use crate::error::{ConfirmError, USER_REJECTED_CODE};
use crate::gas::{confirm_gas_limit, pad_estimate, select_fee, BASIC_TX_GAS};
use crate::nonce::next_nonce;
use crate::polling::GasPollHandle;
use crate::ports::Ports;
use crate::state_machine::{confirm_transition, ConfirmAction, ConfirmState, StateTransition};
use crate::sufficiency::{check_balance, ConfirmGate, ConfirmLabel, Sufficiency};

pub const USER_REJECTED_MESSAGE: &str = "User rejected the request.";

/// Snapshot of everything the sheet renders.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfirmView {
    pub state: ConfirmState,
    pub sufficiency: Sufficiency,
    pub selection: Option<GasFeeSelection>,
    pub gas_limit: Option<u64>,
    pub can_confirm: bool,
    pub label: ConfirmLabel,
    pub nonce: Option<u64>,
    pub is_hardware_wallet: bool,
    pub native_symbol: &'static str,
    pub last_error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfirmOutcome {
    Approved(Approval),
    /// Confirm is disabled; carries the label explaining why.
    Blocked(ConfirmLabel),
    AlreadyAuthorizing,
    /// The request was already resolved by another path.
    Resolved,
    Failed {
        message: String,
        sheet_open: bool,
    },
}

#[derive(Debug)]
struct SessionInner {
    state: ConfirmState,
    transaction: Option<TransactionRequest>,
    balance: Option<U256>,
    gas_limit: Option<u64>,
    selected_tier: SpeedTier,
    custom_params: Option<GasFeeParams>,
    nonce: Option<u64>,
    transitions: Vec<StateTransition>,
    last_error: Option<String>,
    /// Taken from the account, then from the loaded wallet.
    hardware_wallet: bool,
}

impl Default for SessionInner {
    fn default() -> Self {
        Self {
            state: ConfirmState::Loading,
            transaction: None,
            balance: None,
            gas_limit: None,
            selected_tier: SpeedTier::Normal,
            custom_params: None,
            nonce: None,
            transitions: Vec::new(),
            last_error: None,
            hardware_wallet: false,
        }
    }
}

pub struct ConfirmationSession {
    request: PendingRequest,
    account: AccountInfo,
    ports: Ports,
    config: ConfirmConfig,
    inner: Mutex<SessionInner>,
    poller: Mutex<Option<GasPollHandle>>,
    resolved: AtomicBool,
    closed: AtomicBool,
    runtime: OnceLock<Handle>,
}

impl ConfirmationSession {
    /// Opens the sheet. Gas polling starts right away for transaction requests
    /// when a tokio runtime is available, otherwise on [`prepare`](Self::prepare).
    pub fn open(
        request: PendingRequest,
        account: AccountInfo,
        ports: Ports,
        config: ConfirmConfig,
    ) -> Self {
        ports.analytics.track(AnalyticsEvent::TxRequestShownSheet {
            source: request.source,
            request_type: request.method.request_type(),
        });
        tracing::info!(
            request_id = %request.request_id,
            method = request.method.as_str(),
            chain_id = request.chain_id,
            dapp = request.dapp_host(),
            "confirmation opened"
        );
        let inner = SessionInner {
            hardware_wallet: account.is_hardware_wallet,
            ..SessionInner::default()
        };
        let session = Self {
            request,
            account,
            ports,
            config,
            inner: Mutex::new(inner),
            poller: Mutex::new(None),
            resolved: AtomicBool::new(false),
            closed: AtomicBool::new(false),
            runtime: OnceLock::new(),
        };
        session.remember_runtime();
        session.ensure_polling();
        session
    }

    pub fn request(&self) -> &PendingRequest {
        &self.request
    }

    pub fn account(&self) -> &AccountInfo {
        &self.account
    }

    pub fn state(&self) -> ConfirmState {
        self.lock_inner().state
    }

    pub fn transitions(&self) -> Vec<StateTransition> {
        self.lock_inner().transitions.clone()
    }

    pub fn is_resolved(&self) -> bool {
        self.resolved.load(Ordering::SeqCst)
    }

    pub fn is_polling(&self) -> bool {
        self.lock_poller().as_ref().is_some_and(GasPollHandle::is_running)
    }

    /// Loads balance, display nonce, first fee table and gas limit, then moves
    /// to `Ready`. A missing dApp session cancels the request.
    pub async fn prepare(&self) -> Result<ConfirmView, ConfirmError> {
        if self.is_resolved() {
            return Ok(self.view());
        }

        let session_id = &self.request.session_id;
        let active = match self.ports.session.is_session_active(session_id).await {
            Ok(active) => active,
            Err(err) => {
                tracing::warn!(session_id = %session_id, error = %err, "session lookup failed");
                false
            }
        };
        if !active {
            let err = ConfirmError::Session(format!("no active session for {session_id}"));
            tracing::error!(request_id = %self.request.request_id, error = %err, "cancelling request");
            self.cancel_with(Some(&err), true).await;
            return Err(err);
        }

        if self.request.is_message_request() {
            let mut inner = self.lock_inner();
            if inner.state == ConfirmState::Loading {
                self.apply(&mut inner, ConfirmAction::Prepared)?;
            }
            drop(inner);
            return Ok(self.view());
        }

        let tx = match self.request.transaction_request() {
            Ok(tx) => tx,
            Err(err) => {
                let err = ConfirmError::from(err);
                tracing::error!(request_id = %self.request.request_id, error = %err, "malformed transaction request");
                self.cancel_with(Some(&err), true).await;
                return Err(err);
            }
        };

        let address = self.request.address;
        let chain_id = self.request.chain_id;
        let balance = self
            .ports
            .chain
            .native_balance(address, chain_id)
            .await
            .map_err(|err| {
                tracing::warn!(%address, chain_id, error = %err, "balance lookup failed");
                ConfirmError::from(err)
            })?;
        let nonce = match self.fresh_nonce(address).await {
            Ok(nonce) => Some(nonce),
            Err(err) => {
                tracing::warn!(%address, chain_id, error = %err, "nonce lookup failed");
                None
            }
        };

        self.ensure_polling();
        self.wait_for_fees().await?;
        let gas_limit = self.initial_gas_limit(&tx).await;

        let mut inner = self.lock_inner();
        inner.transaction = Some(tx);
        inner.balance = Some(balance);
        inner.nonce = nonce;
        inner.gas_limit = Some(gas_limit);
        if inner.state == ConfirmState::Loading {
            self.apply(&mut inner, ConfirmAction::Prepared)?;
        }
        drop(inner);
        Ok(self.view())
    }

    pub fn view(&self) -> ConfirmView {
        let table = self.latest_table();
        let inner = self.lock_inner();
        self.view_locked(&inner, table.as_ref())
    }

    pub fn select_speed(&self, tier: SpeedTier) {
        let mut inner = self.lock_inner();
        if tier != SpeedTier::Custom {
            inner.custom_params = None;
        }
        inner.selected_tier = tier;
    }

    pub fn set_custom_fee(&self, params: GasFeeParams) {
        let mut inner = self.lock_inner();
        inner.custom_params = Some(params);
        inner.selected_tier = SpeedTier::Custom;
    }

    /// Halts polling while another sheet is on top.
    pub fn pause_polling(&self) {
        if let Some(poller) = self.lock_poller().as_mut() {
            poller.pause();
        }
    }

    pub fn resume_polling(&self) {
        if self.state().is_terminal() {
            return;
        }
        if let Some(poller) = self.lock_poller().as_mut() {
            poller.resume();
        }
    }

    pub async fn confirm(&self) -> Result<ConfirmOutcome, ConfirmError> {
        if self.is_resolved() {
            return Ok(ConfirmOutcome::Resolved);
        }
        let table = self.latest_table();
        let selection = {
            let mut inner = self.lock_inner();
            if inner.state == ConfirmState::Authorizing {
                tracing::debug!(request_id = %self.request.request_id, "confirm ignored, already authorizing");
                return Ok(ConfirmOutcome::AlreadyAuthorizing);
            }
            let view = self.view_locked(&inner, table.as_ref());
            if !view.can_confirm {
                return Ok(ConfirmOutcome::Blocked(view.label));
            }
            self.apply(&mut inner, ConfirmAction::Confirm)?;
            inner.last_error = None;
            view.selection
        };

        let attempt = if self.request.is_message_request() {
            self.approve_message().await.map(|approval| (approval, None))
        } else {
            self.approve_transaction(selection)
                .await
                .map(|(approval, draft)| (approval, Some(draft)))
        };

        match attempt {
            Ok((approval, draft)) => self.resolve_success(approval, draft).await,
            Err(err) => self.handle_failure(err).await,
        }
    }

    /// User-initiated cancel. Ignored while the signer is running.
    pub async fn cancel(&self) -> bool {
        if self.state() == ConfirmState::Authorizing {
            tracing::debug!(request_id = %self.request.request_id, "cancel ignored while authorizing");
            return false;
        }
        self.cancel_with(None, true).await
    }

    /// Unmount: stops polling and rejects the request if nothing resolved it.
    /// While the signer runs, its result resolves the request instead.
    pub async fn close(&self) -> bool {
        self.closed.store(true, Ordering::SeqCst);
        self.stop_polling();
        if self.is_resolved() {
            return false;
        }
        if self.state() == ConfirmState::Authorizing {
            tracing::info!(request_id = %self.request.request_id, "sheet closed while authorizing, awaiting signer");
            return false;
        }
        tracing::info!(request_id = %self.request.request_id, "sheet closed without resolution");
        self.cancel_with(None, false).await
    }

    async fn approve_message(&self) -> Result<Approval, ConfirmError> {
        let message = self.request.message_param()?.clone();
        let wallet = self.load_wallet(self.request.address).await?;
        let signature = self
            .ports
            .signer
            .sign_message(&wallet, self.request.method, &message)
            .await?;
        Ok(Approval::SignedMessage(signature))
    }

    async fn approve_transaction(
        &self,
        selection: Option<GasFeeSelection>,
    ) -> Result<(Approval, TransactionDraft), ConfirmError> {
        let selection = selection
            .ok_or_else(|| ConfirmError::Validation("no gas fee selected".to_owned()))?;
        let tx = self.request.transaction_request()?;
        let chain_id = self.request.chain_id;

        let padded = match self.estimate_with_padding(&tx).await {
            Ok(gas) => Some(gas),
            Err(err) => {
                tracing::warn!(chain_id, error = %err, "padded gas estimate failed, using known limit");
                None
            }
        };
        let loaded_limit = self.lock_inner().gas_limit;
        let gas_limit = confirm_gas_limit(padded, tx.dapp_gas(), tx.dapp_gas_limit())
            .or(loaded_limit)
            .unwrap_or_else(|| self.config.default_gas_limit(chain_id));

        let from = self.request.address;
        let nonce = self.fresh_nonce(from).await?;
        let draft = TransactionDraft {
            chain_id,
            from,
            to: tx.to,
            value: tx.value_or_zero(),
            data: tx.data.clone().unwrap_or_default(),
            nonce,
            gas_limit,
            gas_params: selection.params,
        };
        tracing::info!(
            request_id = %self.request.request_id,
            chain_id,
            %from,
            to = ?draft.to,
            nonce,
            gas_limit,
            "transaction draft built"
        );

        let wallet = self.load_wallet(from).await?;
        let approval = if self.request.method.is_send() {
            Approval::Sent(self.ports.signer.send_transaction(&wallet, &draft).await?)
        } else {
            Approval::SignedTransaction(self.ports.signer.sign_transaction(&wallet, &draft).await?)
        };
        Ok((approval, draft))
    }

    async fn resolve_success(
        &self,
        approval: Approval,
        draft: Option<TransactionDraft>,
    ) -> Result<ConfirmOutcome, ConfirmError> {
        if !self.claim_resolution() {
            tracing::warn!(request_id = %self.request.request_id, "signer finished after request was resolved");
            if let (Approval::Sent(result), Some(draft)) = (&approval, draft.as_ref()) {
                self.persist_history(result, draft).await;
            }
            return Ok(ConfirmOutcome::Resolved);
        }
        {
            let mut inner = self.lock_inner();
            self.apply(&mut inner, ConfirmAction::SignSuccess)?;
        }
        self.ports.analytics.track(AnalyticsEvent::TxRequestApprove {
            source: self.request.source,
            request_type: self.request.method.request_type(),
            dapp_name: self.request.dapp_name.clone(),
            dapp_url: self.request.dapp_url.clone(),
            is_hardware_wallet: self.is_hardware_wallet(),
            chain_id: self.request.chain_id,
        });
        if let Err(err) = self
            .ports
            .session
            .respond_success(&self.request.request_id, approval.rpc_result())
            .await
        {
            tracing::error!(request_id = %self.request.request_id, error = %err, "failed to deliver approval");
        }
        if let (Approval::Sent(result), Some(draft)) = (&approval, draft.as_ref()) {
            self.persist_history(result, draft).await;
        }
        self.stop_polling();
        if !self.is_closed() {
            self.dismiss_sheet(false).await;
        }
        Ok(ConfirmOutcome::Approved(approval))
    }

    async fn persist_history(&self, result: &TransactionResult, draft: &TransactionDraft) {
        let added_at_ms = self.ports.clock.now_ms().unwrap_or_else(|err| {
            tracing::warn!(error = %err, "clock unavailable for history record");
            0
        });
        let record = HistoryRecord {
            hash: result.hash,
            chain_id: draft.chain_id,
            from: result.from,
            to: result.to,
            value: result.value,
            data: result.data.clone(),
            nonce: result.nonce,
            gas_limit: draft.gas_limit,
            gas_params: draft.gas_params.clone(),
            status: HistoryStatus::Pending,
            dapp_name: self.request.dapp_name.clone(),
            dapp_icon: self.request.image_url.clone(),
            added_at_ms: TimestampMs(added_at_ms),
        };
        if let Err(err) = self
            .ports
            .history
            .add_transaction(draft.from, draft.chain_id, record)
            .await
        {
            tracing::error!(hash = %result.hash, error = %err, "failed to record transaction");
        }
    }

    async fn handle_failure(&self, err: ConfirmError) -> Result<ConfirmOutcome, ConfirmError> {
        let message = err.to_string();
        let hardware_wallet = self.is_hardware_wallet();
        tracing::error!(
            request_id = %self.request.request_id,
            hardware_wallet,
            error = %err,
            "confirmation failed"
        );
        if self.is_resolved() {
            return Ok(ConfirmOutcome::Resolved);
        }

        if hardware_wallet && !self.is_closed() {
            let mut inner = self.lock_inner();
            inner.last_error = Some(message.clone());
            if inner.state == ConfirmState::Authorizing {
                self.apply(&mut inner, ConfirmAction::SignFailure)?;
            }
            return Ok(ConfirmOutcome::Failed {
                message,
                sheet_open: true,
            });
        }

        let signing = ConfirmError::Signing {
            message: message.clone(),
            hardware_wallet,
        };
        self.lock_inner().last_error = Some(message.clone());
        self.cancel_with(Some(&signing), !self.is_closed()).await;
        Ok(ConfirmOutcome::Failed {
            message,
            sheet_open: false,
        })
    }

    async fn cancel_with(&self, error: Option<&ConfirmError>, dismiss: bool) -> bool {
        if !self.claim_resolution() {
            return false;
        }
        {
            let mut inner = self.lock_inner();
            if !inner.state.is_terminal() {
                if let Err(err) = self.apply(&mut inner, ConfirmAction::Cancel) {
                    tracing::warn!(error = %err, "cancel transition rejected");
                }
            }
        }
        self.ports.analytics.track(self.reject_event());

        let (code, message) = match error {
            Some(err) => (err.rpc_code(), err.to_string()),
            None => (USER_REJECTED_CODE, USER_REJECTED_MESSAGE.to_owned()),
        };
        if let Err(err) = self
            .ports
            .session
            .respond_error(&self.request.request_id, code, &message)
            .await
        {
            tracing::error!(request_id = %self.request.request_id, error = %err, "failed to deliver rejection");
        }
        self.stop_polling();
        if dismiss {
            self.dismiss_sheet(true).await;
        }
        true
    }

    async fn dismiss_sheet(&self, canceled: bool) {
        let request = DismissRequest {
            request_id: self.request.request_id.clone(),
            canceled,
            hardware_wallet: self.is_hardware_wallet(),
        };
        if let Err(err) = self.ports.navigator.dismiss(request).await {
            tracing::warn!(request_id = %self.request.request_id, error = %err, "dismiss failed");
        }
    }

    /// Gas limit shown while loading: the raw estimate, else the dApp's
    /// suggestion, else the chain default.
    async fn initial_gas_limit(&self, tx: &TransactionRequest) -> u64 {
        let chain_id = self.request.chain_id;
        match self
            .ports
            .gas
            .estimate_gas(chain_id, &tx.for_estimation())
            .await
        {
            Ok(gas) => gas,
            Err(err) => {
                tracing::warn!(chain_id, error = %err, "gas estimate failed, falling back");
                tx.dapp_gas()
                    .or(tx.dapp_gas_limit())
                    .unwrap_or_else(|| self.config.default_gas_limit(chain_id))
            }
        }
    }

    async fn estimate_with_padding(&self, tx: &TransactionRequest) -> Result<u64, ConfirmError> {
        let chain_id = self.request.chain_id;
        let Some(to) = tx.to else {
            return Ok(self.config.default_gas_limit(chain_id));
        };
        if !tx.has_data() {
            let code = self.ports.chain.code_at(to, chain_id).await?;
            if code.is_empty() {
                return Ok(BASIC_TX_GAS);
            }
        }
        let block_gas_limit = self.ports.gas.block_gas_limit(chain_id).await?;
        let estimated = self
            .ports
            .gas
            .estimate_gas(chain_id, &tx.for_estimation())
            .await?;
        Ok(pad_estimate(
            estimated,
            block_gas_limit,
            self.config.gas_padding_bps,
            self.config.last_block_ratio_bps,
        ))
    }

    async fn fresh_nonce(&self, address: Address) -> Result<u64, ConfirmError> {
        let chain_id = self.request.chain_id;
        let pending = self.ports.chain.pending_nonce(address, chain_id).await?;
        let local = match self.ports.history.latest_nonce(address, chain_id).await {
            Ok(local) => local,
            Err(err) => {
                tracing::warn!(%address, chain_id, error = %err, "history nonce unavailable");
                None
            }
        };
        Ok(next_nonce(pending, local))
    }

    async fn wait_for_fees(&self) -> Result<(), ConfirmError> {
        let Some(mut updates) = self.fee_updates() else {
            return Err(ConfirmError::Estimation("gas polling is not running".to_owned()));
        };
        let waited = tokio::time::timeout(
            self.config.prepare_timeout(),
            updates.wait_for(Option::is_some),
        )
        .await
        .map(|seen| seen.map(|_| ()));
        match waited {
            Ok(Ok(())) => Ok(()),
            Ok(Err(_)) => Err(ConfirmError::Estimation(
                "gas polling stopped before fees arrived".to_owned(),
            )),
            Err(_) => {
                tracing::warn!(chain_id = self.request.chain_id, "timed out waiting for gas fees");
                Err(ConfirmError::Estimation("timed out waiting for gas fees".to_owned()))
            }
        }
    }

    fn view_locked(&self, inner: &SessionInner, table: Option<&GasFeeTable>) -> ConfirmView {
        let is_message = self.request.is_message_request();
        let selection = if is_message {
            None
        } else {
            table.zip(inner.gas_limit).and_then(|(table, gas_limit)| {
                select_fee(
                    table,
                    inner.selected_tier,
                    inner.custom_params.as_ref(),
                    gas_limit,
                )
            })
        };
        let value = inner
            .transaction
            .as_ref()
            .map(TransactionRequest::value_or_zero)
            .unwrap_or(U256::ZERO);
        let sufficiency = check_balance(
            inner.balance,
            value,
            selection.as_ref().map(|s| s.max_fee),
            is_message,
        );
        let gate = ConfirmGate {
            state: inner.state,
            is_message,
            sufficiency,
            selection: selection.as_ref(),
        };
        let native_symbol = chains::native_symbol(self.request.chain_id);
        ConfirmView {
            state: inner.state,
            sufficiency,
            can_confirm: gate.can_confirm(),
            label: gate.label(native_symbol),
            selection,
            gas_limit: inner.gas_limit,
            nonce: inner.nonce,
            is_hardware_wallet: inner.hardware_wallet,
            native_symbol,
            last_error: inner.last_error.clone(),
        }
    }

    fn apply(&self, inner: &mut SessionInner, action: ConfirmAction) -> Result<(), ConfirmError> {
        let (next, transition) = confirm_transition(inner.state, action).map_err(|err| {
            tracing::error!(request_id = %self.request.request_id, error = %err, "rejected transition");
            err
        })?;
        tracing::info!(
            request_id = %self.request.request_id,
            from = ?transition.from,
            to = ?transition.to,
            reason = transition.reason,
            "confirmation transition"
        );
        inner.state = next;
        inner.transitions.push(transition);
        Ok(())
    }

    fn claim_resolution(&self) -> bool {
        self.resolved
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
    }

    fn reject_event(&self) -> AnalyticsEvent {
        AnalyticsEvent::TxRequestReject {
            source: self.request.source,
            request_type: self.request.method.request_type(),
            is_hardware_wallet: self.is_hardware_wallet(),
        }
    }

    /// One unlock per attempt; the handle decides whether the signer is a device.
    async fn load_wallet(&self, address: Address) -> Result<WalletHandle, ConfirmError> {
        let wallet = self.ports.signer.load_wallet(address).await?;
        if wallet.is_hardware_wallet {
            tracing::info!(
                request_id = %self.request.request_id,
                device_id = wallet.device_id.as_deref().unwrap_or("unknown"),
                "hardware wallet loaded"
            );
        }
        self.lock_inner().hardware_wallet = wallet.is_hardware_wallet;
        Ok(wallet)
    }

    fn is_hardware_wallet(&self) -> bool {
        self.lock_inner().hardware_wallet
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    fn remember_runtime(&self) {
        if let Ok(handle) = Handle::try_current() {
            let _ = self.runtime.set(handle);
        }
    }

    fn ensure_polling(&self) {
        if self.request.is_message_request() || self.is_resolved() {
            return;
        }
        if Handle::try_current().is_err() {
            tracing::debug!("no runtime yet, gas polling deferred");
            return;
        }
        self.remember_runtime();
        let mut poller = self.lock_poller();
        if poller.is_none() {
            let chain_id = self.request.chain_id;
            *poller = Some(GasPollHandle::start(
                Arc::clone(&self.ports.gas),
                chain_id,
                self.config.poll_interval(chain_id),
            ));
        }
    }

    fn stop_polling(&self) {
        if let Some(mut poller) = self.lock_poller().take() {
            poller.stop();
        }
    }

    fn fee_updates(&self) -> Option<watch::Receiver<Option<GasFeeTable>>> {
        self.lock_poller().as_ref().map(GasPollHandle::subscribe)
    }

    fn latest_table(&self) -> Option<GasFeeTable> {
        self.lock_poller().as_ref().and_then(GasPollHandle::latest)
    }

    fn lock_inner(&self) -> MutexGuard<'_, SessionInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn lock_poller(&self) -> MutexGuard<'_, Option<GasPollHandle>> {
        self.poller.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Drop for ConfirmationSession {
    fn drop(&mut self) {
        let poller = self
            .poller
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        drop(poller);

        if self.is_resolved() {
            return;
        }
        let request_id = self.request.request_id.clone();
        let Some(runtime) = Handle::try_current()
            .ok()
            .or_else(|| self.runtime.get().cloned())
        else {
            tracing::error!(request_id = %request_id, "session dropped unresolved without a runtime");
            return;
        };
        if !self.claim_resolution() {
            return;
        }
        tracing::warn!(request_id = %request_id, "session dropped unresolved, rejecting");
        self.ports.analytics.track(self.reject_event());
        let session = Arc::clone(&self.ports.session);
        runtime.spawn(async move {
            if let Err(err) = session
                .respond_error(&request_id, USER_REJECTED_CODE, USER_REJECTED_MESSAGE)
                .await
            {
                tracing::error!(request_id = %request_id, error = %err, "failed to deliver rejection");
            }
        });
    }
}
