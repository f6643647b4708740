//! Open/close transition tracking
//!
//! A transition sends one movement command and then follows the lift by
//! comparing consecutive status samples rather than waiting for a fixed end
//! state. That tolerates a lift that is already where it was sent (no motion
//! at all) as well as short flickers between samples:
//!
//! | previous   | current    | step        |
//! |------------|------------|-------------|
//! | any        | ERROR      | failed      |
//! | STATIONARY | STATIONARY | finished    |
//! | STATIONARY | MOVING     | started     |
//! | MOVING     | MOVING     | still moving|
//! | MOVING     | STATIONARY | finished    |
//! | ERROR      | not ERROR  | unexpected  |

use crate::{Command, IpModuleClient, IpModuleError, IpModuleResult, MotionState, StatusResponse};
use async_trait::async_trait;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// Receives status samples while a transition is running.
///
/// Every sample taken while the lift moves is delivered with `done == false`.
/// The sample at which the lift came to rest is delivered once with
/// `done == true`. It is not necessarily the commanded end position; compare
/// it against the expected direction to tell an arrival from a plain stop.
#[async_trait]
pub trait ProgressListener: Send + Sync {
    async fn on_progress(&self, status: &StatusResponse, done: bool);
}

/// Outcome of comparing two consecutive samples
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionStep {
    Started,
    StillMoving,
    Finished,
    Failed,
    Unexpected,
}

/// Classify a pair of consecutive samples
pub fn classify(previous: MotionState, current: MotionState) -> TransitionStep {
    use MotionState::*;

    match (previous, current) {
        (_, Error) => TransitionStep::Failed,
        (Stationary, Stationary) => TransitionStep::Finished,
        (Stationary, Moving) => TransitionStep::Started,
        (Moving, Moving) => TransitionStep::StillMoving,
        (Moving, Stationary) => TransitionStep::Finished,
        (Error, _) => TransitionStep::Unexpected,
    }
}

fn arrived(command: Command, status: &StatusResponse) -> bool {
    match command {
        Command::Up => status.up(),
        Command::Down => status.down(),
        _ => false,
    }
}

impl IpModuleClient {
    pub(crate) async fn run_transition(
        &self,
        command: Command,
        progress: Option<&dyn ProgressListener>,
        timeout: Duration,
        poll_interval: Duration,
    ) -> IpModuleResult<Duration> {
        match tokio::time::timeout(timeout, self.track(command, progress, poll_interval)).await {
            Ok(result) => result,
            Err(_) => {
                warn!(host = %self.host(), %command, ?timeout, "Transition timed out");
                Err(IpModuleError::TransitionTimeout {
                    host: self.host().to_string(),
                    command: command.to_string(),
                    timeout,
                })
            }
        }
    }

    async fn track(
        &self,
        command: Command,
        progress: Option<&dyn ProgressListener>,
        poll_interval: Duration,
    ) -> IpModuleResult<Duration> {
        let began_at = Instant::now();
        let mut previous = self.get_status().await?;

        self.send_command(command).await?;

        loop {
            let current = self.get_status().await?;
            let step = classify(previous.motion_state(), current.motion_state());
            debug!(
                host = %self.host(),
                %command,
                previous = %previous.motion_state(),
                current = %current.motion_state(),
                ?step,
                "Transition sample"
            );

            match step {
                TransitionStep::Started | TransitionStep::StillMoving => {
                    if let Some(listener) = progress {
                        listener.on_progress(&current, false).await;
                    }
                }
                TransitionStep::Finished => {
                    if !arrived(command, &current) {
                        warn!(
                            host = %self.host(),
                            %command,
                            vertical = ?current.vertical(),
                            "Lift stopped away from the commanded position"
                        );
                    }
                    if let Some(listener) = progress {
                        listener.on_progress(&current, true).await;
                    }
                    break;
                }
                TransitionStep::Failed => {
                    return Err(IpModuleError::CommandFailed {
                        host: self.host().to_string(),
                        command: command.to_string(),
                        status: current.status().to_string(),
                        description: current.description(),
                    });
                }
                TransitionStep::Unexpected => {
                    return Err(IpModuleError::UnexpectedTransition {
                        host: self.host().to_string(),
                        command: command.to_string(),
                        previous: previous.motion_state(),
                        current: current.motion_state(),
                    });
                }
            }

            previous = current;
            tokio::time::sleep(poll_interval).await;
        }

        let elapsed = began_at.elapsed();
        info!(host = %self.host(), %command, ?elapsed, "Transition finished");
        Ok(elapsed)
    }
}
