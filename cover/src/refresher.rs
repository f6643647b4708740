//! Periodic status refresh
//!
//! Polls the module on a fixed interval and publishes the outcome through a
//! `watch` channel. Polling only happens while somebody holds a receiver.
//! A failed poll never ends the loop; it flips `last_update_success` and the
//! previous status stays available so the host can show it as stale.

use crate::{LiftError, LiftResult};
use nexus21_ipmodule::{IpModuleClient, IpModuleError, StatusResponse};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, warn};

/// Default refresh period
pub const UPDATE_INTERVAL: Duration = Duration::from_secs(60);

/// Default bound for one refresh
pub const REFRESH_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RefreshConfig {
    pub update_interval_ms: u64,
    pub refresh_timeout_ms: u64,
}

impl Default for RefreshConfig {
    fn default() -> Self {
        Self {
            update_interval_ms: UPDATE_INTERVAL.as_millis() as u64,
            refresh_timeout_ms: REFRESH_TIMEOUT.as_millis() as u64,
        }
    }
}

impl RefreshConfig {
    pub fn update_interval(&self) -> Duration {
        Duration::from_millis(self.update_interval_ms)
    }

    pub fn refresh_timeout(&self) -> Duration {
        Duration::from_millis(self.refresh_timeout_ms)
    }
}

/// Latest refresh outcome
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RefreshSnapshot {
    /// Last successfully read status
    pub status: Option<StatusResponse>,
    /// Whether the most recent refresh succeeded
    pub last_update_success: bool,
    /// Message of the most recent failure, cleared on success
    pub last_error: Option<String>,
}

impl RefreshSnapshot {
    /// Status exists but the latest refresh failed
    pub fn is_stale(&self) -> bool {
        self.status.is_some() && !self.last_update_success
    }
}

pub struct StatusRefresher {
    client: Arc<IpModuleClient>,
    config: RefreshConfig,
    sender: watch::Sender<RefreshSnapshot>,
}

impl StatusRefresher {
    pub fn new(client: Arc<IpModuleClient>, config: RefreshConfig) -> Self {
        let (sender, _) = watch::channel(RefreshSnapshot::default());
        Self {
            client,
            config,
            sender,
        }
    }

    pub fn config(&self) -> &RefreshConfig {
        &self.config
    }

    /// Register a consumer. Polling continues while at least one receiver lives.
    pub fn subscribe(&self) -> watch::Receiver<RefreshSnapshot> {
        self.sender.subscribe()
    }

    pub fn has_subscribers(&self) -> bool {
        self.sender.receiver_count() > 0
    }

    pub fn snapshot(&self) -> RefreshSnapshot {
        self.sender.borrow().clone()
    }

    /// Poll once, publish the outcome and return it
    pub async fn refresh(&self) -> LiftResult<StatusResponse> {
        let timeout = self.config.refresh_timeout();
        let result = match tokio::time::timeout(timeout, self.client.get_status()).await {
            Ok(result) => result,
            Err(_) => Err(IpModuleError::timeout("status refresh", timeout.as_millis() as u64)),
        };

        match result {
            Ok(status) => {
                debug!(host = %self.client.host(), vertical = ?status.vertical(), "Status refreshed");
                self.sender.send_modify(|snapshot| {
                    snapshot.status = Some(status.clone());
                    snapshot.last_update_success = true;
                    snapshot.last_error = None;
                });
                Ok(status)
            }
            Err(source) => {
                let error = LiftError::UpdateFailed {
                    host: self.client.host().to_string(),
                    source,
                };
                warn!(host = %self.client.host(), "{}", error);
                self.sender.send_modify(|snapshot| {
                    snapshot.last_update_success = false;
                    snapshot.last_error = Some(error.to_string());
                });
                Err(error)
            }
        }
    }

    /// Publish a status obtained elsewhere (e.g. during a transition)
    pub fn publish(&self, status: StatusResponse) {
        self.sender.send_modify(|snapshot| {
            snapshot.status = Some(status);
            snapshot.last_update_success = true;
            snapshot.last_error = None;
        });
    }

    /// Refresh loop. Runs until the task is aborted.
    pub async fn run(self: Arc<Self>) {
        let mut ticker = tokio::time::interval(self.config.update_interval());
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;
            if !self.has_subscribers() {
                continue;
            }
            // Failures are already published to subscribers
            let _ = self.refresh().await;
        }
    }

    pub fn spawn(self: Arc<Self>) -> JoinHandle<()> {
        tokio::spawn(self.run())
    }
}
