/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 16/10/26
******************************************************************************/

//! # PLC-SIM Wire
//!
//! Fixed-length telegram encoding and decoding for the PLC-SIM simulator.
//!
//! Telegrams are 128 bytes of printable ASCII with fixed field offsets and no
//! delimiters.
//!
//! ## Features
//!
//! - **Total encoding**: any field set encodes to exactly 128 bytes
//! - **Non-panicking decoding**: malformed frames become a `ParseFailure`

pub mod decoder;
pub mod encoder;
pub mod layout;

pub use decoder::decode;
pub use encoder::{Encoder, encode};
pub use layout::TELEGRAM_LEN;
