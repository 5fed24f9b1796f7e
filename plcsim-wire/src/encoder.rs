/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 16/10/26
******************************************************************************/

//! Telegram encoder.
//!
//! This module renders a [`Telegram`] into its fixed 128-byte wire form.
//! Encoding never fails on input: long fields are truncated, short fields are
//! padded, and non-ASCII characters are substituted.

use crate::layout::{
    self, DATA, DESTINATION, PAD, SEQUENCE, SEQUENCE_MODULUS, SOURCE, SUBTYPE, SUBTYPE_MODULUS,
    TELEGRAM_LEN,
};
use bytes::{BufMut, Bytes, BytesMut};
use plcsim_core::error::EncodeError;
use plcsim_core::telegram::Telegram;

/// Fixed-width field writer.
///
/// The encoder appends fields left to right; [`Encoder::finish`] checks that
/// exactly one telegram's worth of bytes was written.
#[derive(Debug)]
pub struct Encoder {
    buf: BytesMut,
}

impl Encoder {
    /// Creates an encoder sized for one telegram.
    #[must_use]
    pub fn new() -> Self {
        Self {
            buf: BytesMut::with_capacity(TELEGRAM_LEN),
        }
    }

    /// Appends text truncated or space-padded to `width` bytes.
    ///
    /// # Arguments
    /// * `value` - Field text; each character outside printable ASCII becomes `?`
    /// * `width` - Exact number of bytes to write
    #[inline]
    pub fn put_text(&mut self, value: &str, width: usize) {
        let mut written = 0;
        for c in value.chars().take(width) {
            self.buf.put_u8(layout::sanitize(c));
            written += 1;
        }
        self.buf.put_bytes(PAD, width - written);
    }

    /// Appends a number left-padded with zeros to `width` bytes.
    ///
    /// Only the lowest `width` digits are kept if the number is wider.
    ///
    /// # Arguments
    /// * `value` - Field value
    /// * `width` - Exact number of bytes to write
    #[inline]
    pub fn put_number(&mut self, value: u64, width: usize) {
        let mut buf = itoa::Buffer::new();
        let digits = buf.format(value).as_bytes();
        if digits.len() >= width {
            self.buf.put_slice(&digits[digits.len() - width..]);
        } else {
            self.buf.put_bytes(b'0', width - digits.len());
            self.buf.put_slice(digits);
        }
    }

    /// Returns the number of bytes written so far.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    /// Returns true if nothing has been written yet.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Finalizes the telegram.
    ///
    /// # Errors
    /// Returns `EncodeError::LengthMismatch` if the written length is not
    /// exactly [`TELEGRAM_LEN`].
    pub fn finish(self) -> Result<Bytes, EncodeError> {
        if self.buf.len() != TELEGRAM_LEN {
            return Err(EncodeError::LengthMismatch {
                expected: TELEGRAM_LEN,
                actual: self.buf.len(),
            });
        }
        Ok(self.buf.freeze())
    }
}

impl Default for Encoder {
    fn default() -> Self {
        Self::new()
    }
}

/// Encodes a telegram into exactly [`TELEGRAM_LEN`] bytes.
///
/// # Errors
/// Returns `EncodeError` only if the encoder breaks its own length invariant.
pub fn encode(telegram: &Telegram) -> Result<Bytes, EncodeError> {
    let mut encoder = Encoder::new();
    encoder.put_text(telegram.kind().code(), layout::TYPE.width);
    encoder.put_number(
        u64::from(telegram.subtype() % SUBTYPE_MODULUS),
        SUBTYPE.width,
    );
    encoder.put_text(telegram.source(), SOURCE.width);
    encoder.put_text(telegram.destination(), DESTINATION.width);
    encoder.put_number(
        u64::from(telegram.sequence() % SEQUENCE_MODULUS),
        SEQUENCE.width,
    );
    encoder.put_text(telegram.data(), DATA.width);
    encoder.finish()
}
