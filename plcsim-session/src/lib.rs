/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 16/10/26
******************************************************************************/

//! # PLC-SIM Session
//!
//! Session-level behaviour of the simulated device.
//!
//! This crate provides:
//! - **Configuration**: Device identity and behaviour toggles
//! - **Sequence management**: Wrapping six-digit outbound sequence numbers
//! - **Heartbeat**: Periodic PING origination and rate-limited PONG replies
//! - **Controller**: Reactions to inbound telegrams (auto-confirm, PONG)

pub mod config;
pub mod controller;
pub mod heartbeat;
pub mod sequence;

pub use config::{SessionConfig, SessionConfigBuilder};
pub use controller::{Reaction, SessionController};
pub use heartbeat::{
    HeartbeatScheduler, MIN_HEARTBEAT_INTERVAL, MIN_PONG_GAP, PongLimiter, clamp_interval,
    clamp_pong_gap, next_heartbeat_at,
};
pub use sequence::SequenceManager;
