/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 16/10/26
******************************************************************************/

//! # PLC-SIM Store
//!
//! Event log storage for the PLC-SIM device simulator.
//!
//! This crate provides:
//! - **EventStore trait**: Abstract interface the core records through
//! - **MemoryEventLog**: Bounded in-memory ring with push subscription
//! - **export**: Tab-separated export of the log

pub mod entry;
pub mod export;
pub mod memory;
pub mod traits;

pub use entry::EventLogEntry;
pub use export::{ExportError, export_to_dir, sanitize_field, write_tsv};
pub use memory::{DEFAULT_LOG_CAPACITY, LogCounters, MemoryEventLog};
pub use traits::EventStore;
