use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use wallet_confirm_core::{DismissRequest, NavigatorPort, PortError};

/// Headless navigator: remembers which sheets were dismissed and how.
#[derive(Debug, Clone, Default)]
pub struct NavigatorAdapter {
    dismissed: Arc<Mutex<Vec<DismissRequest>>>,
}

impl NavigatorAdapter {
    pub fn dismissed(&self) -> Result<Vec<DismissRequest>, PortError> {
        self.dismissed
            .lock()
            .map(|g| g.clone())
            .map_err(|e| PortError::Transport(format!("navigator lock poisoned: {e}")))
    }
}

#[async_trait]
impl NavigatorPort for NavigatorAdapter {
    async fn dismiss(&self, request: DismissRequest) -> Result<(), PortError> {
        tracing::info!(
            request_id = %request.request_id,
            canceled = request.canceled,
            hardware_wallet = request.hardware_wallet,
            "sheet dismissed"
        );
        self.dismissed
            .lock()
            .map_err(|e| PortError::Transport(format!("navigator lock poisoned: {e}")))?
            .push(request);
        Ok(())
    }
}
