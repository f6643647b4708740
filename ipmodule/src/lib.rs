//! Nexus21 IP Module Client
//!
//! Talks to the HTTP API of the Nexus21 IP Module that drives motorized TV
//! lifts. The module exposes two endpoints:
//!
//! - `GET /api/status` reports the vertical and horizontal position
//! - `POST /api/command` accepts `{"COMMAND": "UP" | "DOWN" | "MEM1" | "MEM2" | "MEM3"}`
//!
//! On top of those, [`IpModuleClient::open`] and [`IpModuleClient::close`]
//! send a movement command and follow the lift until it stops, reporting
//! progress along the way.

mod client;
mod command;
mod config;
mod error;
mod response;
mod transition;
mod transport;

pub use client::*;
pub use command::*;
pub use config::*;
pub use error::*;
pub use response::*;
pub use transition::*;
pub use transport::*;

/// Manufacturer reported for every module
pub const MANUFACTURER: &str = "Nexus21";

/// Model name reported for every module
pub const MODEL: &str = "IP Module";
