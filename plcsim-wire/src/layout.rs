/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 16/10/26
******************************************************************************/

//! Fixed telegram layout.
//!
//! Every telegram is exactly [`TELEGRAM_LEN`] bytes of printable ASCII:
//!
//! | Offset | Width | Field |
//! |---|---|---|
//! | 0 | 2 | type |
//! | 2 | 2 | subtype (zero-padded) |
//! | 4 | 8 | source |
//! | 12 | 8 | destination |
//! | 20 | 6 | sequence (zero-padded) |
//! | 26 | 102 | data |

use plcsim_core::telegram::DATA_LEN;
use std::ops::Range;

/// Length of one encoded telegram in bytes.
pub const TELEGRAM_LEN: usize = 128;

/// Byte substituted for anything outside printable ASCII.
pub const SUBSTITUTE: u8 = b'?';

/// Byte used to pad short text fields.
pub const PAD: u8 = b' ';

/// Sequence numbers are rendered modulo this value.
pub const SEQUENCE_MODULUS: u32 = 1_000_000;

/// Subtypes are rendered modulo this value.
pub const SUBTYPE_MODULUS: u8 = 100;

/// Position and width of one header or data field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSpan {
    /// Byte offset from the start of the telegram.
    pub offset: usize,
    /// Width in bytes.
    pub width: usize,
}

impl FieldSpan {
    const fn new(offset: usize, width: usize) -> Self {
        Self { offset, width }
    }

    /// Returns the byte range covered by the field.
    #[inline]
    #[must_use]
    pub const fn range(self) -> Range<usize> {
        self.offset..self.offset + self.width
    }
}

/// Telegram type code.
pub const TYPE: FieldSpan = FieldSpan::new(0, 2);
/// Subtype.
pub const SUBTYPE: FieldSpan = FieldSpan::new(2, 2);
/// Sending device or system.
pub const SOURCE: FieldSpan = FieldSpan::new(4, 8);
/// Receiving device or system.
pub const DESTINATION: FieldSpan = FieldSpan::new(12, 8);
/// Sequence number.
pub const SEQUENCE: FieldSpan = FieldSpan::new(20, 6);
/// Type-specific data.
pub const DATA: FieldSpan = FieldSpan::new(26, DATA_LEN);

/// Fields in wire order.
pub const FIELDS: [FieldSpan; 6] = [TYPE, SUBTYPE, SOURCE, DESTINATION, SEQUENCE, DATA];

const _: () = assert!(DATA.offset + DATA.width == TELEGRAM_LEN);

/// Maps a character onto the wire alphabet.
///
/// Printable ASCII (`0x20..=0x7E`) passes through, everything else becomes
/// [`SUBSTITUTE`].
#[inline]
#[must_use]
pub const fn sanitize(c: char) -> u8 {
    if c >= ' ' && c <= '~' {
        c as u8
    } else {
        SUBSTITUTE
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fields_are_contiguous() {
        let mut expected = 0;
        for field in FIELDS {
            assert_eq!(field.offset, expected);
            expected += field.width;
        }
        assert_eq!(expected, TELEGRAM_LEN);
    }

    #[test]
    fn test_sanitize() {
        assert_eq!(sanitize('A'), b'A');
        assert_eq!(sanitize(' '), b' ');
        assert_eq!(sanitize('~'), b'~');
        assert_eq!(sanitize('é'), SUBSTITUTE);
        assert_eq!(sanitize('\t'), SUBSTITUTE);
        assert_eq!(sanitize('\u{7f}'), SUBSTITUTE);
    }

    #[test]
    fn test_span_range() {
        assert_eq!(SEQUENCE.range(), 20..26);
        assert_eq!(DATA.range(), 26..128);
    }
}
