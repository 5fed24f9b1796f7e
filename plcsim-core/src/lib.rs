/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 16/10/26
******************************************************************************/

//! # PLC-SIM Core
//!
//! Core types, telegram values, and error definitions for the PLC-SIM device
//! simulator.
//!
//! This crate provides the building blocks shared by every PLC-SIM crate:
//! - **Error types**: one taxonomy per failure class, built with `thiserror`
//! - **Telegram values**: [`Telegram`] plus typed views of each data layout
//! - **Core types**: [`TelegramKind`], [`ConnectionState`], [`Direction`]

pub mod error;
pub mod telegram;
pub mod types;

pub use error::{
    ConnectionError, DecodeError, EncodeError, ParseFailure, Result, SimError, ValidationError,
};
pub use telegram::{Confirmation, ErrorReport, LifeSignal, MoveOrder, Payload, Telegram};
pub use types::{ConnectionState, Direction, TelegramKind};
