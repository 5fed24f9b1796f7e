/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 16/10/26
******************************************************************************/

//! Bounded receive buffer.
//!
//! Socket reads are appended here and cut into whole telegrams in arrival
//! order. The number of unconsumed bytes never exceeds the capacity; an
//! append that would overflow discards the oldest bytes first.

use crate::codec::TelegramCodec;
use bytes::{Buf, BytesMut};
use plcsim_core::error::ParseFailure;
use plcsim_core::telegram::Telegram;
use plcsim_wire::TELEGRAM_LEN;
use tokio_util::codec::Decoder;

/// Default bound on unconsumed bytes (256 telegrams).
pub const DEFAULT_MAX_BUFFERED: usize = TELEGRAM_LEN * 256;

/// Accumulates stream bytes and yields complete frames.
#[derive(Debug)]
pub struct ReceiveBuffer {
    buf: BytesMut,
    capacity: usize,
    codec: TelegramCodec,
}

impl ReceiveBuffer {
    /// Creates a buffer bounded to [`DEFAULT_MAX_BUFFERED`] bytes.
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_MAX_BUFFERED)
    }

    /// Creates a buffer bounded to `capacity` bytes, at least one telegram.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(TELEGRAM_LEN);
        Self {
            buf: BytesMut::with_capacity(TELEGRAM_LEN),
            capacity,
            codec: TelegramCodec::new(),
        }
    }

    /// Appends freshly read bytes.
    ///
    /// # Returns
    /// The number of old bytes discarded to stay within capacity, 0 normally.
    pub fn extend(&mut self, chunk: &[u8]) -> usize {
        let total = self.buf.len() + chunk.len();
        if total <= self.capacity {
            self.buf.extend_from_slice(chunk);
            return 0;
        }

        let excess = total - self.capacity;
        if excess >= self.buf.len() {
            let skip = excess - self.buf.len();
            self.buf.clear();
            self.buf.extend_from_slice(&chunk[skip..]);
        } else {
            self.buf.advance(excess);
            self.buf.extend_from_slice(chunk);
        }
        excess
    }

    /// Removes and decodes the oldest complete frame, if any.
    pub fn next_frame(&mut self) -> Option<Result<Telegram, ParseFailure>> {
        self.codec.decode(&mut self.buf).unwrap_or_default()
    }

    /// Removes and decodes every complete frame, oldest first.
    pub fn drain_frames(&mut self) -> Vec<Result<Telegram, ParseFailure>> {
        let mut frames = Vec::with_capacity(self.buf.len() / TELEGRAM_LEN);
        while let Some(frame) = self.next_frame() {
            frames.push(frame);
        }
        frames
    }

    /// Returns the number of unconsumed bytes.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    /// Returns true if no bytes are buffered.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Returns the bound on unconsumed bytes.
    #[inline]
    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    /// Drops all buffered bytes.
    pub fn clear(&mut self) {
        self.buf.clear();
    }
}

impl Default for ReceiveBuffer {
    fn default() -> Self {
        Self::new()
    }
}
