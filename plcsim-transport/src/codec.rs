/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 16/10/26
******************************************************************************/

//! Tokio codec for telegram framing.
//!
//! Telegrams have no delimiters: every 128 bytes on the stream is one frame.
//! A frame that fails to decode is yielded as a [`ParseFailure`] item rather
//! than an error, so one bad frame never ends the stream.

use bytes::{BufMut, BytesMut};
use plcsim_core::error::{EncodeError, ParseFailure};
use plcsim_core::telegram::Telegram;
use plcsim_wire::TELEGRAM_LEN;
use thiserror::Error;
use tokio_util::codec::{Decoder, Encoder};

/// Errors that can occur during codec operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CodecError {
    /// The encoder broke its length invariant.
    #[error(transparent)]
    Encode(#[from] EncodeError),

    /// I/O error.
    #[error("io error: {0}")]
    Io(String),
}

impl From<std::io::Error> for CodecError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

/// Tokio codec for fixed-length telegrams.
#[derive(Debug, Clone, Copy, Default)]
pub struct TelegramCodec;

impl TelegramCodec {
    /// Creates a new codec.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl Decoder for TelegramCodec {
    type Item = Result<Telegram, ParseFailure>;
    type Error = CodecError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if src.len() < TELEGRAM_LEN {
            src.reserve(TELEGRAM_LEN - src.len());
            return Ok(None);
        }

        let frame = src.split_to(TELEGRAM_LEN);
        Ok(Some(plcsim_wire::decode(&frame)))
    }
}

impl Encoder<Telegram> for TelegramCodec {
    type Error = CodecError;

    fn encode(&mut self, item: Telegram, dst: &mut BytesMut) -> Result<(), Self::Error> {
        let frame = plcsim_wire::encode(&item)?;
        dst.reserve(frame.len());
        dst.put_slice(&frame);
        Ok(())
    }
}

impl Encoder<&Telegram> for TelegramCodec {
    type Error = CodecError;

    fn encode(&mut self, item: &Telegram, dst: &mut BytesMut) -> Result<(), Self::Error> {
        let frame = plcsim_wire::encode(item)?;
        dst.reserve(frame.len());
        dst.put_slice(&frame);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use plcsim_core::error::DecodeError;
    use plcsim_core::telegram::LifeSignal;

    fn ping_frame(seq: u32) -> Vec<u8> {
        let t = Telegram::life("EWM-MFS", "PLC-SIM", seq, LifeSignal::Ping);
        plcsim_wire::encode(&t).unwrap().to_vec()
    }

    #[test]
    fn test_codec_decode_complete_frame() {
        let mut codec = TelegramCodec::new();
        let mut buf = BytesMut::from(&ping_frame(1)[..]);

        let telegram = codec.decode(&mut buf).unwrap().unwrap().unwrap();
        assert!(telegram.is_ping());
        assert!(buf.is_empty());
    }

    #[test]
    fn test_codec_decode_incomplete() {
        let mut codec = TelegramCodec::new();
        let frame = ping_frame(1);
        let mut buf = BytesMut::from(&frame[..100]);

        assert!(codec.decode(&mut buf).unwrap().is_none());
        assert_eq!(buf.len(), 100);

        buf.extend_from_slice(&frame[100..]);
        assert!(codec.decode(&mut buf).unwrap().is_some());
    }

    #[test]
    fn test_codec_decode_keeps_trailing_bytes() {
        let mut codec = TelegramCodec::new();
        let mut buf = BytesMut::new();
        buf.extend_from_slice(&ping_frame(1));
        buf.extend_from_slice(&ping_frame(2)[..10]);

        let first = codec.decode(&mut buf).unwrap().unwrap().unwrap();
        assert_eq!(first.sequence(), 1);
        assert_eq!(buf.len(), 10);
        assert!(codec.decode(&mut buf).unwrap().is_none());
    }

    #[test]
    fn test_codec_decode_bad_frame_is_an_item() {
        let mut codec = TelegramCodec::new();
        let mut raw = ping_frame(1);
        raw[0] = b'Z';
        raw[1] = b'Z';
        let mut buf = BytesMut::from(&raw[..]);

        let failure = codec.decode(&mut buf).unwrap().unwrap().unwrap_err();
        assert_eq!(failure.error, DecodeError::UnknownType("ZZ".into()));
        assert_eq!(&failure.raw[..], &raw[..]);
    }

    #[test]
    fn test_codec_encode() {
        let mut codec = TelegramCodec::new();
        let t = Telegram::life("PLC-SIM", "EWM-MFS", 3, LifeSignal::Pong);
        let mut dst = BytesMut::new();

        codec.encode(&t, &mut dst).unwrap();
        codec.encode(t, &mut dst).unwrap();
        assert_eq!(dst.len(), 2 * TELEGRAM_LEN);
        assert_eq!(&dst[..2], b"LI");
    }
}
