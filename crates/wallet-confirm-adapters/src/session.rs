use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use serde_json::Value;

use wallet_confirm_core::{DappSessionPort, PortError};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DappSession {
    pub session_id: String,
    pub dapp_name: String,
    pub dapp_url: String,
    pub active: bool,
}

/// Answer delivered to the dApp for one request.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionResponse {
    Success(Value),
    Error { code: i64, message: String },
}

/// In-memory dApp session registry. Each request id may be answered once.
#[derive(Debug, Clone, Default)]
pub struct DappSessionAdapter {
    inner: Arc<Mutex<SessionState>>,
}

#[derive(Debug, Default)]
struct SessionState {
    sessions: HashMap<String, DappSession>,
    responses: HashMap<String, SessionResponse>,
}

impl DappSessionAdapter {
    fn state(&self) -> Result<MutexGuard<'_, SessionState>, PortError> {
        self.inner
            .lock()
            .map_err(|e| PortError::Transport(format!("session lock poisoned: {e}")))
    }

    pub fn insert_session(&self, session: DappSession) -> Result<(), PortError> {
        let mut g = self.state()?;
        g.sessions.insert(session.session_id.clone(), session);
        Ok(())
    }

    pub fn disconnect(&self, session_id: &str) -> Result<(), PortError> {
        let mut g = self.state()?;
        let session = g
            .sessions
            .get_mut(session_id)
            .ok_or_else(|| PortError::NotFound(format!("session missing: {session_id}")))?;
        session.active = false;
        Ok(())
    }

    pub fn response(&self, request_id: &str) -> Result<Option<SessionResponse>, PortError> {
        Ok(self.state()?.responses.get(request_id).cloned())
    }

    fn record(&self, request_id: &str, response: SessionResponse) -> Result<(), PortError> {
        let mut g = self.state()?;
        if g.responses.contains_key(request_id) {
            return Err(PortError::Conflict(format!(
                "request {request_id} already answered"
            )));
        }
        g.responses.insert(request_id.to_owned(), response);
        Ok(())
    }
}

#[async_trait]
impl DappSessionPort for DappSessionAdapter {
    async fn is_session_active(&self, session_id: &str) -> Result<bool, PortError> {
        Ok(self
            .state()?
            .sessions
            .get(session_id)
            .is_some_and(|s| s.active))
    }

    async fn respond_success(&self, request_id: &str, result: Value) -> Result<(), PortError> {
        tracing::info!(request_id, "responding with success");
        self.record(request_id, SessionResponse::Success(result))
    }

    async fn respond_error(
        &self,
        request_id: &str,
        code: i64,
        message: &str,
    ) -> Result<(), PortError> {
        tracing::info!(request_id, code, "responding with error");
        self.record(
            request_id,
            SessionResponse::Error {
                code,
                message: message.to_owned(),
            },
        )
    }
}
