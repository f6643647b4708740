//! Cover entity for a Nexus21 lift
//!
//! Maps the module's vertical position onto the open/closed model of a
//! garage-style cover. Which end of travel counts as "open" depends on how
//! the lift is mounted, see [`Orientation`].

use crate::{LiftConfig, LiftError, LiftResult, RefreshSnapshot};
use async_trait::async_trait;
use nexus21_ipmodule::{Command, IpModuleClient, ProgressListener, StatusResponse};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, info, warn};

/// Device class reported to the host
pub const DEVICE_CLASS: &str = "garage";

/// How the lift is mounted
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Orientation {
    /// Rises out of furniture: UP is open
    #[default]
    Floor,
    /// Drops from the ceiling: DOWN is open
    Ceiling,
}

impl Orientation {
    fn at_open_position(self, status: &StatusResponse) -> bool {
        match self {
            Orientation::Floor => status.up(),
            Orientation::Ceiling => status.down(),
        }
    }

    fn at_closed_position(self, status: &StatusResponse) -> bool {
        match self {
            Orientation::Floor => status.down(),
            Orientation::Ceiling => status.up(),
        }
    }

    /// Movement command that performs `action`
    pub fn command_for(self, action: CoverAction) -> Command {
        match (self, action) {
            (Orientation::Floor, CoverAction::Open) | (Orientation::Ceiling, CoverAction::Close) => Command::Up,
            (Orientation::Floor, CoverAction::Close) | (Orientation::Ceiling, CoverAction::Open) => Command::Down,
        }
    }
}

/// User-requested cover action
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoverAction {
    Open,
    Close,
}

impl fmt::Display for CoverAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CoverAction::Open => write!(f, "Opening"),
            CoverAction::Close => write!(f, "Closing"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CoverState {
    Open,
    Closed,
    Opening,
    Closing,
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoverFeature {
    Open,
    Close,
}

/// Marks an action as in progress for as long as it lives.
///
/// On drop the marker goes back to what it was before, unless another guard
/// has replaced it in the meantime.
struct ActionGuard<'a> {
    cover: &'a LiftCover,
    action: CoverAction,
    previous: Option<CoverAction>,
}

impl<'a> ActionGuard<'a> {
    fn begin(cover: &'a LiftCover, action: CoverAction) -> Self {
        let previous = cover
            .in_progress
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .replace(action);
        cover.notify();
        Self {
            cover,
            action,
            previous,
        }
    }
}

impl Drop for ActionGuard<'_> {
    fn drop(&mut self) {
        {
            let mut marker = self.cover.in_progress.lock().unwrap_or_else(PoisonError::into_inner);
            if *marker == Some(self.action) {
                *marker = self.previous;
            }
        }
        self.cover.notify();
    }
}

/// A lift exposed as a cover
pub struct LiftCover {
    config: LiftConfig,
    client: Arc<IpModuleClient>,
    status: RwLock<Option<StatusResponse>>,
    stale: AtomicBool,
    in_progress: Mutex<Option<CoverAction>>,
    // One open/close at a time per cover
    command_lock: tokio::sync::Mutex<()>,
    state_tx: watch::Sender<CoverState>,
}

impl LiftCover {
    pub fn new(config: LiftConfig, client: Arc<IpModuleClient>) -> Self {
        let (state_tx, _) = watch::channel(CoverState::Unknown);
        Self {
            config,
            client,
            status: RwLock::new(None),
            stale: AtomicBool::new(false),
            in_progress: Mutex::new(None),
            command_lock: tokio::sync::Mutex::new(()),
            state_tx,
        }
    }

    /// Build the client from `config` and wrap it
    pub fn from_config(config: LiftConfig, http_client: Option<reqwest::Client>) -> LiftResult<Self> {
        let client = config.build_client(http_client)?;
        Ok(Self::new(config, client))
    }

    pub fn name(&self) -> &str {
        &self.config.name
    }

    pub fn unique_id(&self) -> &str {
        self.config.unique_id()
    }

    pub fn host(&self) -> &str {
        self.client.host()
    }

    pub fn client(&self) -> &Arc<IpModuleClient> {
        &self.client
    }

    pub fn config(&self) -> &LiftConfig {
        &self.config
    }

    pub fn device_info(&self) -> crate::DeviceInfo {
        self.config.device_info()
    }

    pub fn device_class(&self) -> &'static str {
        DEVICE_CLASS
    }

    pub fn supported_features(&self) -> &'static [CoverFeature] {
        &[CoverFeature::Open, CoverFeature::Close]
    }

    /// Last known status
    pub fn status(&self) -> Option<StatusResponse> {
        self.status.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// A status has been received at least once
    pub fn available(&self) -> bool {
        self.status.read().unwrap_or_else(PoisonError::into_inner).is_some()
    }

    /// The cached status is kept but the latest refresh failed
    pub fn is_stale(&self) -> bool {
        self.stale.load(Ordering::Relaxed)
    }

    pub fn in_progress(&self) -> Option<CoverAction> {
        *self.in_progress.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn check(&self, predicate: impl Fn(Orientation, &StatusResponse) -> bool) -> bool {
        let orientation = self.config.orientation;
        self.status
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .map(|status| predicate(orientation, status))
            .unwrap_or(false)
    }

    pub fn is_open(&self) -> bool {
        self.check(|o, s| o.at_open_position(s) && s.not_moving())
    }

    pub fn is_closed(&self) -> bool {
        self.check(|o, s| o.at_closed_position(s) && s.not_moving())
    }

    pub fn is_opening(&self) -> bool {
        self.check(|o, s| o.at_closed_position(s) && s.moving())
    }

    pub fn is_closing(&self) -> bool {
        self.check(|o, s| o.at_open_position(s) && s.moving())
    }

    pub fn state(&self) -> CoverState {
        if self.is_open() {
            CoverState::Open
        } else if self.is_closed() {
            CoverState::Closed
        } else if self.is_opening() {
            CoverState::Opening
        } else if self.is_closing() {
            CoverState::Closing
        } else if self.check(|_, s| s.moving()) {
            // VERTICAL=MOVING carries no direction; use the running action
            match self.in_progress() {
                Some(CoverAction::Open) => CoverState::Opening,
                Some(CoverAction::Close) => CoverState::Closing,
                None => CoverState::Unknown,
            }
        } else {
            CoverState::Unknown
        }
    }

    /// Watch state changes
    pub fn subscribe_state(&self) -> watch::Receiver<CoverState> {
        self.state_tx.subscribe()
    }

    fn notify(&self) {
        let state = self.state();
        self.state_tx.send_if_modified(|current| {
            if *current == state {
                false
            } else {
                *current = state;
                true
            }
        });
    }

    fn store(&self, status: StatusResponse) {
        *self.status.write().unwrap_or_else(PoisonError::into_inner) = Some(status);
        self.stale.store(false, Ordering::Relaxed);
        self.notify();
    }

    /// Fetch the status directly and cache it
    pub async fn update(&self) -> LiftResult<StatusResponse> {
        match self.client.get_status().await {
            Ok(status) => {
                self.store(status.clone());
                Ok(status)
            }
            Err(source) => {
                self.stale.store(true, Ordering::Relaxed);
                Err(LiftError::UpdateFailed {
                    host: self.host().to_string(),
                    source,
                })
            }
        }
    }

    /// Take over the refresher's latest outcome
    pub fn apply_refresh(&self, snapshot: &RefreshSnapshot) {
        if let Some(status) = &snapshot.status {
            self.store(status.clone());
        }
        self.stale.store(!snapshot.last_update_success, Ordering::Relaxed);
    }

    /// Open the cover. Returns `None` when nothing had to be done.
    pub async fn open_cover(&self) -> LiftResult<Option<Duration>> {
        self.perform(CoverAction::Open).await
    }

    /// Close the cover. Returns `None` when nothing had to be done.
    pub async fn close_cover(&self) -> LiftResult<Option<Duration>> {
        self.perform(CoverAction::Close).await
    }

    fn satisfied(&self, action: CoverAction) -> bool {
        match action {
            CoverAction::Open => self.is_open() || self.is_opening(),
            CoverAction::Close => self.is_closed() || self.is_closing(),
        }
    }

    async fn perform(&self, action: CoverAction) -> LiftResult<Option<Duration>> {
        if self.in_progress() == Some(action) || self.satisfied(action) {
            debug!(host = %self.host(), %action, state = ?self.state(), "Cover already there");
            return Ok(None);
        }

        // A different action may be running; wait for it, then look again
        let _serial = self.command_lock.lock().await;
        if self.satisfied(action) {
            debug!(host = %self.host(), %action, state = ?self.state(), "Cover already there");
            return Ok(None);
        }

        let command = self.config.orientation.command_for(action);
        info!(host = %self.host(), %action, %command, "Moving cover");

        let _guard = ActionGuard::begin(self, action);
        let listener: &dyn ProgressListener = self;
        let result = match command {
            Command::Up => self.client.open(Some(listener)).await,
            _ => self.client.close(Some(listener)).await,
        };

        match result {
            Ok(elapsed) => Ok(Some(elapsed)),
            Err(source) => {
                let error = LiftError::CommandFailed {
                    action,
                    host: self.host().to_string(),
                    source,
                };
                warn!("{}", error);
                Err(error)
            }
        }
    }
}

#[async_trait]
impl ProgressListener for LiftCover {
    async fn on_progress(&self, status: &StatusResponse, done: bool) {
        debug!(host = %self.host(), vertical = ?status.vertical(), done, "Cover progress");
        self.store(status.clone());

        if done {
            let orientation = self.config.orientation;
            let arrived = match self.in_progress() {
                Some(CoverAction::Open) => orientation.at_open_position(status),
                Some(CoverAction::Close) => orientation.at_closed_position(status),
                None => true,
            };
            if !arrived {
                warn!(host = %self.host(), state = ?self.state(), "Cover stopped short of its target");
            }
        }
    }
}
