/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 16/10/26
******************************************************************************/

//! Event log entries.

use chrono::{DateTime, Local};
use plcsim_core::telegram::Telegram;
use plcsim_core::types::Direction;
use serde::{Deserialize, Serialize};

/// One record in the event log.
///
/// Entries are created by the core and never modified after being appended,
/// except for the index which the log assigns on append.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventLogEntry {
    /// Position in the log, assigned on append and never reused.
    pub index: u64,
    /// Wall-clock time the entry was created.
    pub timestamp: DateTime<Local>,
    /// Which way the entry travelled.
    pub direction: Direction,
    /// Telegram involved, absent for most diagnostics.
    pub telegram: Option<Telegram>,
    /// Free text. May contain raw tabs or newlines copied from peer data.
    pub detail: String,
}

impl EventLogEntry {
    fn new(direction: Direction, telegram: Option<Telegram>, detail: String) -> Self {
        Self {
            index: 0,
            timestamp: Local::now(),
            direction,
            telegram,
            detail,
        }
    }

    /// Creates an entry for a received telegram.
    #[must_use]
    pub fn inbound(telegram: Telegram) -> Self {
        Self::new(Direction::Inbound, Some(telegram), String::new())
    }

    /// Creates an entry for a telegram written to the socket.
    #[must_use]
    pub fn outbound(telegram: Telegram) -> Self {
        Self::new(Direction::Outbound, Some(telegram), String::new())
    }

    /// Creates a diagnostic entry.
    #[must_use]
    pub fn diagnostic(detail: impl Into<String>) -> Self {
        Self::new(Direction::Diagnostic, None, detail.into())
    }

    /// Sets the detail text.
    #[must_use]
    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = detail.into();
        self
    }

    /// Returns the detail text, or the telegram data when no detail was set.
    #[must_use]
    pub fn summary(&self) -> &str {
        match &self.telegram {
            Some(telegram) if self.detail.is_empty() => telegram.data(),
            _ => &self.detail,
        }
    }
}
