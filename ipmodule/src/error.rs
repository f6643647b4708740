//! IP Module error types

use crate::response::{MotionState, ValidationError};
use std::time::Duration;
use thiserror::Error;

/// Errors raised while talking to a Nexus21 IP Module
#[derive(Debug, Error)]
pub enum IpModuleError {
    /// The device answered but the payload did not match the expected schema
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("Nexus21 IP module {host} responded to '{endpoint}' with HTTP status {status}: {body}")]
    InvalidResponse {
        host: String,
        endpoint: String,
        status: u16,
        body: String,
    },

    #[error("'{command}' is an invalid command. A valid command must be one of UP, DOWN, MEM1, MEM2, MEM3")]
    InvalidCommand { command: String },

    #[error("Sent '{command}' to IP module {host} but the result was an error '{status}'{}",
        .description.as_deref().map(|d| format!(" ({})", d)).unwrap_or_default())]
    CommandFailed {
        host: String,
        command: String,
        status: String,
        description: Option<String>,
    },

    #[error("Transition '{command}' on {host} did not finish within {timeout:?}")]
    TransitionTimeout {
        host: String,
        command: String,
        timeout: Duration,
    },

    /// A pair of consecutive samples that the transition loop has no rule for.
    /// Seeing this means the device reported something the motion model does
    /// not cover; it is never expected during normal operation.
    #[error("Unexpected transition {previous} -> {current} while running '{command}' on {host}")]
    UnexpectedTransition {
        host: String,
        command: String,
        previous: MotionState,
        current: MotionState,
    },

    #[error("Connection timeout after {duration_ms}ms during {operation}")]
    Timeout { operation: String, duration_ms: u64 },

    #[error("Connection refused: {url} - {cause}")]
    ConnectionRefused { url: String, cause: String },

    #[error("Request failed: {0}")]
    RequestFailed(String),
}

impl IpModuleError {
    /// Create a timeout error with operation context
    pub fn timeout(operation: impl Into<String>, duration_ms: u64) -> Self {
        IpModuleError::Timeout {
            operation: operation.into(),
            duration_ms,
        }
    }

    /// Create a connection refused error
    pub fn connection_refused(url: impl Into<String>, cause: impl Into<String>) -> Self {
        IpModuleError::ConnectionRefused {
            url: url.into(),
            cause: cause.into(),
        }
    }

    /// True for the internal-invariant variant, false for every expected domain error
    pub fn is_invariant_violation(&self) -> bool {
        matches!(self, IpModuleError::UnexpectedTransition { .. })
    }

    /// True when the failure happened below HTTP (no response was received)
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            IpModuleError::Timeout { .. }
                | IpModuleError::ConnectionRefused { .. }
                | IpModuleError::RequestFailed(_)
        )
    }
}

impl From<reqwest::Error> for IpModuleError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            IpModuleError::Timeout {
                operation: err
                    .url()
                    .map(|u| u.path().to_string())
                    .unwrap_or_else(|| "HTTP request".to_string()),
                duration_ms: crate::TimeoutConfig::default().request_ms,
            }
        } else if err.is_connect() {
            let url = err
                .url()
                .map(|u| u.to_string())
                .unwrap_or_else(|| "unknown".to_string());
            IpModuleError::ConnectionRefused {
                url,
                cause: err.to_string(),
            }
        } else {
            IpModuleError::RequestFailed(err.to_string())
        }
    }
}

pub type IpModuleResult<T> = Result<T, IpModuleError>;
