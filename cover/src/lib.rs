//! Nexus21 lift cover integration
//!
//! Exposes a Nexus21 TV lift as a garage-style cover on top of
//! [`nexus21_ipmodule`]: configuration and identity ([`LiftConfig`]), the
//! cover entity ([`LiftCover`]) and a periodic status poller
//! ([`StatusRefresher`]).

mod cover;
mod device;
mod error;
mod refresher;

pub use cover::*;
pub use device::*;
pub use error::*;
pub use refresher::*;
