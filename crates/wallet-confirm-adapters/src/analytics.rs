use std::sync::{Arc, Mutex};

use wallet_confirm_core::{AnalyticsEvent, AnalyticsPort};

/// Logs every event and keeps it until drained.
#[derive(Debug, Clone, Default)]
pub struct AnalyticsAdapter {
    events: Arc<Mutex<Vec<AnalyticsEvent>>>,
}

impl AnalyticsAdapter {
    pub fn drain(&self) -> Vec<AnalyticsEvent> {
        match self.events.lock() {
            Ok(mut g) => std::mem::take(&mut *g),
            Err(_) => Vec::new(),
        }
    }
}

impl AnalyticsPort for AnalyticsAdapter {
    fn track(&self, event: AnalyticsEvent) {
        let payload = serde_json::to_string(&event).unwrap_or_default();
        tracing::info!(event = event.name(), %payload, "analytics");
        if let Ok(mut g) = self.events.lock() {
            g.push(event);
        }
    }
}
