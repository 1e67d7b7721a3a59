use std::time::{SystemTime, UNIX_EPOCH};

use wallet_confirm_core::{ClockPort, PortError};

/// Wall-clock milliseconds used to stamp history records.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl ClockPort for SystemClock {
    fn now_ms(&self) -> Result<u64, PortError> {
        let elapsed = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_err(|e| PortError::Transport(format!("system clock before epoch: {e}")))?;
        u64::try_from(elapsed.as_millis())
            .map_err(|_| PortError::Transport("system clock overflow".to_owned()))
    }
}
