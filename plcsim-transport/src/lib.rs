/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 16/10/26
******************************************************************************/

//! # PLC-SIM Transport
//!
//! Network transport layer for the PLC-SIM device simulator.
//!
//! This crate provides:
//! - **Codec**: Tokio codec for fixed-length telegram framing
//! - **Receive buffer**: Bounded accumulation of socket bytes
//! - **Connection manager**: Single-use TCP connection with read and write loops

pub mod buffer;
pub mod codec;
pub mod config;
pub mod connection;
pub mod event;

pub use buffer::{DEFAULT_MAX_BUFFERED, ReceiveBuffer};
pub use codec::{CodecError, TelegramCodec};
pub use config::{Endpoint, TransportConfig};
pub use connection::ConnectionManager;
pub use event::ConnectionEvent;
