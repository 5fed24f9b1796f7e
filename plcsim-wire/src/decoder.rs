/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 16/10/26
******************************************************************************/

//! Telegram decoder.
//!
//! This module parses one 128-byte frame back into a [`Telegram`]. Every
//! structural problem is returned as a [`ParseFailure`] carrying the raw
//! bytes; decoding never panics.

use crate::layout::{DATA, DESTINATION, FieldSpan, SEQUENCE, SOURCE, SUBTYPE, TELEGRAM_LEN, TYPE};
use plcsim_core::error::{DecodeError, ParseFailure};
use plcsim_core::telegram::Telegram;
use plcsim_core::types::TelegramKind;

/// Decodes exactly one telegram.
///
/// Trailing padding is trimmed from every field. Bytes outside ASCII are
/// read as U+FFFD instead of failing.
///
/// # Arguments
/// * `raw` - Frame bytes, expected to be exactly [`TELEGRAM_LEN`] long
///
/// # Errors
/// Returns `ParseFailure` on a wrong length, an unknown type code, or a
/// non-numeric subtype or sequence.
pub fn decode(raw: &[u8]) -> Result<Telegram, ParseFailure> {
    fields(raw).map_err(|error| ParseFailure::new(error, raw.to_vec()))
}

fn fields(raw: &[u8]) -> Result<Telegram, DecodeError> {
    if raw.len() != TELEGRAM_LEN {
        return Err(DecodeError::InvalidLength {
            expected: TELEGRAM_LEN,
            actual: raw.len(),
        });
    }

    let code = text(raw, TYPE);
    let kind = TelegramKind::from_code(code.trim()).ok_or(DecodeError::UnknownType(code))?;

    let subtype = text(raw, SUBTYPE);
    let subtype = subtype
        .trim()
        .parse::<u8>()
        .map_err(|_| DecodeError::InvalidSubtype(subtype.clone()))?;

    let sequence = text(raw, SEQUENCE);
    let sequence = sequence
        .trim()
        .parse::<u32>()
        .map_err(|_| DecodeError::InvalidSequence(sequence.clone()))?;

    Ok(Telegram::new(
        kind,
        text(raw, SOURCE),
        text(raw, DESTINATION),
        sequence,
        text(raw, DATA),
    )
    .with_subtype(subtype))
}

/// Reads one field as text with trailing padding removed.
fn text(raw: &[u8], span: FieldSpan) -> String {
    let mut out: String = raw[span.range()]
        .iter()
        .map(|&b| {
            if b.is_ascii() {
                char::from(b)
            } else {
                char::REPLACEMENT_CHARACTER
            }
        })
        .collect();
    let keep = out.trim_end().len();
    out.truncate(keep);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encoder::encode;
    use plcsim_core::telegram::{Confirmation, ErrorReport, LifeSignal, MoveOrder, Payload};

    fn frame(header: &str, data: &str) -> Vec<u8> {
        let mut raw = format!("{header}{data}").into_bytes();
        raw.resize(TELEGRAM_LEN, b' ');
        raw
    }

    #[test]
    fn test_decode_move_order_scenario() {
        let order = MoveOrder::new("TU00001", "A01", "B02", "05");
        let sent = Telegram::move_order("EWM-MFS", "PLC-SIM", 17, &order);

        let bytes = encode(&sent).unwrap();
        let received = decode(&bytes).unwrap();

        assert_eq!(received, sent);
        assert_eq!(received.payload(), Payload::MoveOrder(order));
    }

    #[test]
    fn test_decode_each_kind() {
        let samples = [
            Telegram::life("PLC-SIM", "EWM-MFS", 1, LifeSignal::Pong),
            Telegram::confirmation(
                "PLC-SIM",
                "EWM-MFS",
                999_999,
                &Confirmation {
                    transport_unit: "TU1".into(),
                    bin: "B02".into(),
                    status: "DONE".into(),
                    timestamp: "20260101120000".into(),
                },
            ),
            Telegram::error("PLC-SIM", "EWM-MFS", 0, &ErrorReport::new("E001", "jam"))
                .with_subtype(7),
        ];
        for sent in samples {
            let decoded = decode(&encode(&sent).unwrap()).unwrap();
            assert_eq!(decoded, sent);
        }
    }

    #[test]
    fn test_decode_wrong_length() {
        let failure = decode(b"LI00").unwrap_err();
        assert_eq!(
            failure.error,
            DecodeError::InvalidLength {
                expected: TELEGRAM_LEN,
                actual: 4,
            }
        );
        assert_eq!(&failure.raw[..], b"LI00");

        let long = vec![b' '; TELEGRAM_LEN + 1];
        assert!(decode(&long).is_err());
    }

    #[test]
    fn test_decode_unknown_type() {
        let raw = frame("ZZ00PLC-SIM EWM-MFS 000001", "PING");
        let failure = decode(&raw).unwrap_err();
        assert_eq!(failure.error, DecodeError::UnknownType("ZZ".into()));
        assert_eq!(failure.raw.len(), TELEGRAM_LEN);
        assert!(failure.hex_preview().starts_with("5A5A"));
    }

    #[test]
    fn test_decode_lowercase_type_is_unknown() {
        let raw = frame("li00PLC-SIM EWM-MFS 000001", "PING");
        assert!(matches!(
            decode(&raw).unwrap_err().error,
            DecodeError::UnknownType(_)
        ));
    }

    #[test]
    fn test_decode_bad_numbers() {
        let raw = frame("LIxxPLC-SIM EWM-MFS 000001", "PING");
        assert_eq!(
            decode(&raw).unwrap_err().error,
            DecodeError::InvalidSubtype("xx".into())
        );

        let raw = frame("LI00PLC-SIM EWM-MFS 00A001", "PING");
        assert_eq!(
            decode(&raw).unwrap_err().error,
            DecodeError::InvalidSequence("00A001".into())
        );
    }

    #[test]
    fn test_decode_non_ascii_is_not_an_error() {
        let mut raw = frame("LI00PLC-SIM EWM-MFS 000001", "PING");
        raw[10] = 0xC3;
        let telegram = decode(&raw).unwrap();
        assert_eq!(telegram.source(), "PLC-SI\u{FFFD}");
        assert!(telegram.is_ping());
    }
}
