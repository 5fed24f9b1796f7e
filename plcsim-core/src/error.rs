/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 16/10/26
******************************************************************************/

//! Error types for the PLC-SIM device simulator.
//!
//! This module provides the error taxonomy shared by every layer, built with
//! `thiserror`:
//! - [`ValidationError`]: bad host/port, raised before any I/O
//! - [`ParseFailure`]: malformed inbound frame, logged and skipped
//! - [`ConnectionError`]: socket establishment or I/O failure, ends the session
//! - [`EncodeError`]: internal consistency failure inside the codec (fatal)

use crate::types::ConnectionState;
use bytes::Bytes;
use std::fmt;
use thiserror::Error;

/// Result type alias using [`SimError`] as the error type.
pub type Result<T> = std::result::Result<T, SimError>;

/// Number of raw bytes rendered by [`ParseFailure::hex_preview`].
pub const HEX_PREVIEW_LEN: usize = 32;

/// Top-level error type for all simulator operations.
#[derive(Debug, Error)]
pub enum SimError {
    /// Connect request rejected before touching the network.
    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Inbound frame could not be decoded.
    #[error("parse failure: {0}")]
    Parse(#[from] ParseFailure),

    /// Socket establishment or I/O failure.
    #[error("connection error: {0}")]
    Connection(#[from] ConnectionError),

    /// The codec broke its own length invariant.
    #[error("internal consistency failure: {0}")]
    Internal(#[from] EncodeError),

    /// Operation requires an active connection.
    #[error("not connected (state: {state})")]
    NotActive {
        /// State observed when the operation was attempted.
        state: ConnectionState,
    },
}

/// Errors raised while validating a connect request.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Host is empty after trimming.
    #[error("host cannot be empty")]
    EmptyHost,

    /// Port outside `1..=65535`.
    #[error("port must be an integer between 1 and 65535, got {0}")]
    PortOutOfRange(u32),
}

/// Structural problems found while decoding a frame.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DecodeError {
    /// Frame is not exactly one telegram long.
    #[error("invalid frame length: expected {expected} bytes, got {actual}")]
    InvalidLength {
        /// Required frame length.
        expected: usize,
        /// Length actually received.
        actual: usize,
    },

    /// Type code is not one of `LI`, `MO`, `CF`, `ER`.
    #[error("unknown telegram type: {0:?}")]
    UnknownType(String),

    /// Subtype is not a two-digit number.
    #[error("invalid subtype: {0:?}")]
    InvalidSubtype(String),

    /// Sequence is not a non-negative integer.
    #[error("invalid sequence: {0:?}")]
    InvalidSequence(String),
}

/// A frame that failed to decode, carrying the raw bytes for diagnostics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseFailure {
    /// Why the frame was rejected.
    pub error: DecodeError,
    /// The offending bytes, exactly as received.
    pub raw: Bytes,
}

impl ParseFailure {
    /// Creates a parse failure for the given raw frame.
    #[must_use]
    pub fn new(error: DecodeError, raw: impl Into<Bytes>) -> Self {
        Self {
            error,
            raw: raw.into(),
        }
    }

    /// Returns the reason string.
    #[must_use]
    pub fn reason(&self) -> String {
        self.error.to_string()
    }

    /// Returns an upper-case hex rendering of the first [`HEX_PREVIEW_LEN`] bytes.
    ///
    /// A trailing `..` marks a truncated preview.
    #[must_use]
    pub fn hex_preview(&self) -> String {
        let shown = self.raw.len().min(HEX_PREVIEW_LEN);
        let mut preview = hex::encode_upper(&self.raw[..shown]);
        if self.raw.len() > shown {
            preview.push_str("..");
        }
        preview
    }
}

impl fmt::Display for ParseFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (raw: {})", self.error, self.hex_preview())
    }
}

impl std::error::Error for ParseFailure {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.error)
    }
}

/// Internal consistency failures of the codec.
///
/// These indicate a bug in the codec itself, never bad input.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EncodeError {
    /// The encoded frame does not have the fixed telegram length.
    #[error("encoded telegram length {actual} != {expected}")]
    LengthMismatch {
        /// Required frame length.
        expected: usize,
        /// Length actually produced.
        actual: usize,
    },
}

/// Errors in socket establishment and I/O.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConnectionError {
    /// The peer refused or the address could not be reached.
    #[error("connect to {addr} failed: {reason}")]
    Connect {
        /// Target address.
        addr: String,
        /// Underlying failure.
        reason: String,
    },

    /// Connection establishment exceeded the timeout.
    #[error("connect to {addr} timed out after {after_ms} ms")]
    Timeout {
        /// Target address.
        addr: String,
        /// Timeout in milliseconds.
        after_ms: u64,
    },

    /// A stop was requested while the connection was being established.
    #[error("connect to {addr} cancelled")]
    Cancelled {
        /// Target address.
        addr: String,
    },

    /// Read or write failure on an established socket.
    #[error("io error: {0}")]
    Io(String),

    /// A connection instance was started twice.
    #[error("connection cannot start from state {0}")]
    InvalidState(ConnectionState),
}

impl From<std::io::Error> for ConnectionError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}
