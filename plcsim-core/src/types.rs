/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 16/10/26
******************************************************************************/

//! Core enumerations for the telegram protocol.
//!
//! - [`TelegramKind`]: the four telegram type codes
//! - [`ConnectionState`]: lifecycle of one connection instance
//! - [`Direction`]: which way an event log entry travelled

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Telegram type code (wire offset 0, two ASCII characters).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TelegramKind {
    /// `LI` heartbeat carrying `PING` or `PONG`.
    Life,
    /// `MO` move order for a transport unit.
    MoveOrder,
    /// `CF` confirmation of a completed move order.
    Confirmation,
    /// `ER` error code and message.
    Error,
}

impl TelegramKind {
    /// All kinds, in wire-code order.
    pub const ALL: [Self; 4] = [Self::Life, Self::MoveOrder, Self::Confirmation, Self::Error];

    /// Returns the two-character wire code.
    #[inline]
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::Life => "LI",
            Self::MoveOrder => "MO",
            Self::Confirmation => "CF",
            Self::Error => "ER",
        }
    }

    /// Returns the short display label used in logs and exports.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Life => "LIFE",
            Self::MoveOrder => "MOVE",
            Self::Confirmation => "CNFM",
            Self::Error => "ERROR",
        }
    }

    /// Parses a wire code. Returns `None` for anything but the four known codes.
    #[must_use]
    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "LI" => Some(Self::Life),
            "MO" => Some(Self::MoveOrder),
            "CF" => Some(Self::Confirmation),
            "ER" => Some(Self::Error),
            _ => None,
        }
    }
}

impl FromStr for TelegramKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_code(&s.trim().to_ascii_uppercase()).ok_or_else(|| s.to_string())
    }
}

impl fmt::Display for TelegramKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Lifecycle state of a single connection instance.
///
/// States only ever move forward: `Idle → Connecting → Active → Stopping → Stopped`,
/// with `Connecting → Stopped` on connect failure.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
pub enum ConnectionState {
    /// Created, no connect request yet.
    #[default]
    Idle,
    /// Socket establishment in progress.
    Connecting,
    /// Read and write loops running.
    Active,
    /// Stop requested or peer gone, loops winding down.
    Stopping,
    /// Loops exited and socket closed.
    Stopped,
}

impl ConnectionState {
    /// Returns true while the instance holds or is acquiring a socket.
    #[must_use]
    pub const fn is_live(self) -> bool {
        matches!(self, Self::Connecting | Self::Active)
    }

    /// Returns true if telegrams may be enqueued.
    #[must_use]
    pub const fn can_send(self) -> bool {
        matches!(self, Self::Active)
    }

    /// Returns true once the instance can never run again.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Stopped)
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "Idle",
            Self::Connecting => "Connecting",
            Self::Active => "Active",
            Self::Stopping => "Stopping",
            Self::Stopped => "Stopped",
        };
        f.write_str(name)
    }
}

/// Direction of an event log entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    /// Telegram received from the host.
    Inbound,
    /// Telegram written to the socket.
    Outbound,
    /// Condition raised by the simulator itself.
    Diagnostic,
}

impl Direction {
    /// Returns the three-letter column tag (`RX`, `TX`, `SYS`).
    #[must_use]
    pub const fn tag(self) -> &'static str {
        match self {
            Self::Inbound => "RX",
            Self::Outbound => "TX",
            Self::Diagnostic => "SYS",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_codes() {
        for kind in TelegramKind::ALL {
            assert_eq!(TelegramKind::from_code(kind.code()), Some(kind));
        }
        assert_eq!(TelegramKind::from_code("XX"), None);
        assert_eq!(TelegramKind::from_code("li"), None);
    }

    #[test]
    fn test_kind_from_str_is_lenient() {
        assert_eq!(" mo ".parse::<TelegramKind>(), Ok(TelegramKind::MoveOrder));
        assert!("ZZ".parse::<TelegramKind>().is_err());
    }

    #[test]
    fn test_kind_labels() {
        assert_eq!(TelegramKind::Confirmation.label(), "CNFM");
        assert_eq!(TelegramKind::Error.to_string(), "ER");
    }

    #[test]
    fn test_state_ordering() {
        assert!(ConnectionState::Idle < ConnectionState::Connecting);
        assert!(ConnectionState::Active < ConnectionState::Stopping);
        assert!(ConnectionState::Stopping < ConnectionState::Stopped);
    }

    #[test]
    fn test_state_predicates() {
        assert!(ConnectionState::Active.can_send());
        assert!(!ConnectionState::Connecting.can_send());
        assert!(ConnectionState::Connecting.is_live());
        assert!(!ConnectionState::Stopping.is_live());
        assert!(ConnectionState::Stopped.is_terminal());
        assert_eq!(ConnectionState::default(), ConnectionState::Idle);
    }

    #[test]
    fn test_direction_tags() {
        assert_eq!(Direction::Inbound.to_string(), "RX");
        assert_eq!(Direction::Outbound.tag(), "TX");
        assert_eq!(Direction::Diagnostic.tag(), "SYS");
    }
}
