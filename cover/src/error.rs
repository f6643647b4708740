//! Host-facing error types
//!
//! Client errors are never shown raw. A failed user command becomes
//! [`LiftError::CommandFailed`], a failed background refresh becomes
//! [`LiftError::UpdateFailed`]; both keep the client error as their source.

use crate::CoverAction;
use nexus21_ipmodule::IpModuleError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LiftError {
    #[error("{action} of cover {host} failed with error: {source}")]
    CommandFailed {
        action: CoverAction,
        host: String,
        #[source]
        source: IpModuleError,
    },

    #[error("Error communicating with Nexus21 IP Module {host}: {source}")]
    UpdateFailed {
        host: String,
        #[source]
        source: IpModuleError,
    },

    #[error("Invalid MAC address '{0}'")]
    InvalidMac(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl LiftError {
    /// Underlying client error, if any
    pub fn client_error(&self) -> Option<&IpModuleError> {
        match self {
            LiftError::CommandFailed { source, .. } | LiftError::UpdateFailed { source, .. } => Some(source),
            LiftError::InvalidMac(_) | LiftError::InvalidConfig(_) => None,
        }
    }
}

pub type LiftResult<T> = Result<T, LiftError>;
