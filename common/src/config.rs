use std::{env, time::Duration};

use serde::{Deserialize, Serialize};

/// Endpoint family used by the Discord client and most rich-presence hosts
pub const DEFAULT_ENDPOINT_PREFIX: &str = "discord-ipc-";

const BUSY_TIMEOUT_ENV: &str = "PIPELINK_BUSY_TIMEOUT_MS";
const BUSY_POLL_ENV: &str = "PIPELINK_BUSY_POLL_MS";

const DEFAULT_BUSY_TIMEOUT: Duration = Duration::from_millis(5000);
const DEFAULT_BUSY_POLL_INTERVAL: Duration = Duration::from_millis(50);

fn env_millis(name: &str) -> Option<Duration> {
    let raw = env::var(name).ok()?;
    match raw.trim().parse::<u64>() {
        Ok(ms) => Some(Duration::from_millis(ms)),
        Err(e) => {
            tracing::warn!("Ignoring {}={:?}: {}", name, raw, e);
            None
        }
    }
}

/// Settings for the busy-endpoint retry policy of `open`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransportConfig {
    /// Total time `open` may spend waiting on a busy endpoint
    pub busy_timeout:       Duration,
    /// How often a busy Unix socket is retried inside the wait window
    pub busy_poll_interval: Duration,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            busy_timeout:       DEFAULT_BUSY_TIMEOUT,
            busy_poll_interval: DEFAULT_BUSY_POLL_INTERVAL,
        }
    }
}

impl TransportConfig {
    /// Creates a configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates configuration from environment variables
    ///
    /// Reads PIPELINK_BUSY_TIMEOUT_MS and PIPELINK_BUSY_POLL_MS
    pub fn from_env() -> Self {
        let mut config = Self::new();

        if let Some(timeout) = env_millis(BUSY_TIMEOUT_ENV) {
            config.busy_timeout = timeout;
        }
        if let Some(interval) = env_millis(BUSY_POLL_ENV) {
            config.busy_poll_interval = interval;
        }

        config
    }

    /// Set the busy wait budget
    pub fn with_busy_timeout(mut self, timeout: Duration) -> Self {
        self.busy_timeout = timeout;
        self
    }

    /// Set the busy poll interval
    pub fn with_busy_poll_interval(mut self, interval: Duration) -> Self {
        self.busy_poll_interval = interval;
        self
    }

    /// Poll interval clamped to at least one millisecond so a zero setting cannot spin
    pub fn effective_poll_interval(&self) -> Duration {
        self.busy_poll_interval.max(Duration::from_millis(1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = TransportConfig::default();
        assert_eq!(config.busy_timeout, Duration::from_millis(5000));
        assert_eq!(config.busy_poll_interval, Duration::from_millis(50));
    }

    #[test]
    fn test_builder() {
        let config = TransportConfig::new()
            .with_busy_timeout(Duration::from_secs(10))
            .with_busy_poll_interval(Duration::ZERO);
        assert_eq!(config.busy_timeout, Duration::from_secs(10));
        assert_eq!(config.effective_poll_interval(), Duration::from_millis(1));
    }

    #[test]
    fn test_from_env() {
        // Only this test touches these variables
        env::set_var(BUSY_TIMEOUT_ENV, "1000");
        env::set_var(BUSY_POLL_ENV, "not-a-number");
        let config = TransportConfig::from_env();
        env::remove_var(BUSY_TIMEOUT_ENV);
        env::remove_var(BUSY_POLL_ENV);

        assert_eq!(config.busy_timeout, Duration::from_millis(1000));
        assert_eq!(config.busy_poll_interval, DEFAULT_BUSY_POLL_INTERVAL);
    }

    #[test]
    fn test_deserialize_partial() {
        let config: TransportConfig =
            serde_json::from_str(r#"{"busy_timeout":{"secs":10,"nanos":0}}"#).unwrap();
        assert_eq!(config.busy_timeout, Duration::from_secs(10));
        assert_eq!(config.busy_poll_interval, DEFAULT_BUSY_POLL_INTERVAL);
    }
}
