//! Client configuration

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default time allowed for a full open/close transition
pub const DEFAULT_TRANSITION_TIMEOUT: Duration = Duration::from_secs(30);

/// Default delay between status polls during a transition
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// HTTP level timeouts for a single request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Timeout for one status or command request
    pub request_ms: u64,
    /// Connection timeout
    pub connect_ms: u64,
    /// How long idle pooled connections are kept
    pub pool_idle_ms: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            request_ms: 10000,   // 10 seconds, the module answers slowly while moving
            connect_ms: 5000,
            pool_idle_ms: 30000,
        }
    }
}

impl TimeoutConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_ms)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_ms)
    }

    pub fn pool_idle_timeout(&self) -> Duration {
        Duration::from_millis(self.pool_idle_ms)
    }
}

/// Bounds for the open/close state machine
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransitionConfig {
    /// Overall limit for one transition
    pub timeout_ms: u64,
    /// Delay between status polls
    pub poll_interval_ms: u64,
}

impl Default for TransitionConfig {
    fn default() -> Self {
        Self {
            timeout_ms: DEFAULT_TRANSITION_TIMEOUT.as_millis() as u64,
            poll_interval_ms: DEFAULT_POLL_INTERVAL.as_millis() as u64,
        }
    }
}

impl TransitionConfig {
    pub fn new(timeout: Duration, poll_interval: Duration) -> Self {
        Self {
            timeout_ms: timeout.as_millis() as u64,
            poll_interval_ms: poll_interval.as_millis() as u64,
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}
