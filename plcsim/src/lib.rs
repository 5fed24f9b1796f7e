/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 16/10/26
******************************************************************************/

//! # PLC-SIM
//!
//! A field device simulator for warehouse automation hosts.
//!
//! PLC-SIM plays the PLC side of a conveyor control link: it connects to a
//! warehouse host over TCP and exchanges fixed-length 128-byte ASCII
//! telegrams with it.
//!
//! ## Features
//!
//! - **Fixed-width codec**: Bit-exact telegram layout with lenient decoding
//! - **Bounded buffering**: Partial frames reassembled, overflow discarded oldest first
//! - **Single-use connections**: Forward-only state machine, bounded teardown
//! - **Session behaviour**: Auto-heartbeat, rate-limited PONG, auto-confirm
//! - **Event log**: Bounded, observable, exportable as tab-separated text
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use plcsim::prelude::*;
//!
//! let simulator = SimulatorBuilder::new()
//!     .with_session(SessionConfig::new("PLC-SIM", "EWM-MFS").with_auto_heartbeat(true))
//!     .build();
//! simulator.connect("127.0.0.1", 5000).await?;
//! simulator.send_ping().await?;
//! ```
//!
//! ## Crate Organization
//!
//! - [`core`]: Telegram model, enumerations, and error definitions
//! - [`wire`]: Fixed-width telegram encoding and decoding
//! - [`session`]: Sequence numbers, heartbeat, and reactions to inbound telegrams
//! - [`store`]: Event log and export
//! - [`transport`]: Receive buffer, codec, and connection manager
//! - [`engine`]: High-level simulator facade

pub mod core {
    //! Telegram model, enumerations, and error definitions.
    pub use plcsim_core::*;
}

pub mod wire {
    //! Fixed-width telegram encoding and decoding.
    pub use plcsim_wire::*;
}

pub mod session {
    //! Sequence numbers, heartbeat, and reactions to inbound telegrams.
    pub use plcsim_session::*;
}

pub mod store {
    //! Event log and export.
    pub use plcsim_store::*;
}

pub mod transport {
    //! Receive buffer, codec, and connection manager.
    pub use plcsim_transport::*;
}

pub mod engine {
    //! High-level simulator facade.
    pub use plcsim_engine::*;
}

/// Prelude module for convenient imports.
pub mod prelude {
    // Core types
    pub use plcsim_core::{
        Confirmation, ConnectionError, ConnectionState, DecodeError, Direction, EncodeError,
        ErrorReport, LifeSignal, MoveOrder, ParseFailure, Payload, Result, SimError, Telegram,
        TelegramKind, ValidationError,
    };

    // Wire encoding
    pub use plcsim_wire::{TELEGRAM_LEN, decode, encode};

    // Session
    pub use plcsim_session::{Reaction, SequenceManager, SessionConfig, SessionController};

    // Store
    pub use plcsim_store::{EventLogEntry, EventStore, MemoryEventLog};

    // Transport
    pub use plcsim_transport::{ConnectionManager, Endpoint, ReceiveBuffer, TransportConfig};

    // Engine
    pub use plcsim_engine::{NoOpObserver, Observer, Simulator, SimulatorBuilder};
}

#[cfg(test)]
mod tests {
    use super::prelude::*;

    #[test]
    fn test_prelude_imports() {
        let ping = Telegram::life("PLC-SIM", "EWM-MFS", 1, LifeSignal::Ping);
        let frame = encode(&ping).unwrap();
        assert_eq!(frame.len(), TELEGRAM_LEN);
        assert_eq!(decode(&frame).unwrap(), ping);
    }

    #[tokio::test]
    async fn test_simulator_starts_idle() {
        let simulator = SimulatorBuilder::new().build();
        assert_eq!(simulator.state(), ConnectionState::Idle);
        assert!(simulator.log().is_empty());
    }
}
