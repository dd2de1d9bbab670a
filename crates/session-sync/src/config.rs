//! Synchronizer configuration

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::{EVENT_CAPACITY, POLL_INTERVAL_MS};

/// Synchronizer settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Interval between background fetches, in milliseconds
    pub poll_interval_ms: u64,
    /// Start the background poller whenever a session is bound
    pub auto_poll: bool,
    /// Buffered view events per subscriber before it lags
    pub event_capacity: usize,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: POLL_INTERVAL_MS,
            auto_poll: true,
            event_capacity: EVENT_CAPACITY,
        }
    }
}

impl SyncConfig {
    pub fn poll_interval(&self) -> Duration {
        // interval() panics on a zero period
        Duration::from_millis(self.poll_interval_ms.max(1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: SyncConfig = serde_json::from_str(r#"{"poll_interval_ms": 500}"#).unwrap();
        assert_eq!(config.poll_interval(), Duration::from_millis(500));
        assert!(config.auto_poll);
        assert_eq!(config.event_capacity, EVENT_CAPACITY);
    }

    #[test]
    fn test_zero_interval_clamped() {
        let config = SyncConfig {
            poll_interval_ms: 0,
            ..Default::default()
        };
        assert_eq!(config.poll_interval(), Duration::from_millis(1));
    }
}
