//! Commands accepted by `POST /api/command`

use crate::IpModuleError;
use std::fmt;
use std::str::FromStr;

/// The fixed set of commands understood by the IP Module
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Command {
    Up,
    Down,
    Mem1,
    Mem2,
    Mem3,
}

impl Command {
    pub const ALL: [Command; 5] = [
        Command::Up,
        Command::Down,
        Command::Mem1,
        Command::Mem2,
        Command::Mem3,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Command::Up => "UP",
            Command::Down => "DOWN",
            Command::Mem1 => "MEM1",
            Command::Mem2 => "MEM2",
            Command::Mem3 => "MEM3",
        }
    }

    /// Memory preset command for slot 1..=3
    pub fn memory(slot: u8) -> Option<Self> {
        match slot {
            1 => Some(Command::Mem1),
            2 => Some(Command::Mem2),
            3 => Some(Command::Mem3),
            _ => None,
        }
    }
}

impl FromStr for Command {
    type Err = IpModuleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Command::ALL
            .into_iter()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| IpModuleError::InvalidCommand {
                command: s.to_string(),
            })
    }
}

impl AsRef<str> for Command {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
