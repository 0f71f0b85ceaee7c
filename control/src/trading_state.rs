//! Per-consumer trading enable/disable switch. Unknown consumers default to enabled: this store
//! only ever needs to remember the consumers someone has explicitly toggled.

use parking_lot::RwLock;
use std::collections::HashMap;

fn normalise(consumer_id: &str) -> String {
    consumer_id.trim().to_lowercase()
}

#[derive(Debug, Default)]
pub struct TradingStateStore {
    enabled: RwLock<HashMap<String, bool>>,
}

impl TradingStateStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Trading is enabled for any consumer that has not been explicitly disabled.
    pub fn enabled(&self, consumer_id: &str) -> bool {
        self.enabled
            .read()
            .get(&normalise(consumer_id))
            .copied()
            .unwrap_or(true)
    }

    pub fn set_enabled(&self, consumer_id: &str, enabled: bool) {
        self.enabled.write().insert(normalise(consumer_id), enabled);
    }
}
