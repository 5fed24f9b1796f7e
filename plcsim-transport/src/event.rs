/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 16/10/26
******************************************************************************/

//! Events reported by a running connection.

use plcsim_core::error::{ConnectionError, EncodeError, ParseFailure};
use plcsim_core::telegram::Telegram;

/// Something the receive or send loop observed.
///
/// At most one terminal event (`PeerClosed`, `Failed`, `Fatal`) is sent per
/// connection.
///
/// State transitions are not events; watch them through
/// [`ConnectionManager::subscribe_state`](crate::ConnectionManager::subscribe_state).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionEvent {
    /// A frame decoded into a telegram.
    Received(Telegram),
    /// A frame could not be decoded; the connection continues.
    ParseFailed(ParseFailure),
    /// Old unconsumed bytes were dropped to respect the buffer bound.
    BufferOverflow {
        /// Number of bytes dropped.
        discarded: usize,
    },
    /// The peer closed its end of the socket.
    PeerClosed,
    /// The connection failed and is shutting down.
    Failed(ConnectionError),
    /// The codec broke its own invariant; the connection is shutting down.
    Fatal(EncodeError),
}

impl ConnectionEvent {
    /// Returns true for the events that end a connection.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::PeerClosed | Self::Failed(_) | Self::Fatal(_))
    }
}
