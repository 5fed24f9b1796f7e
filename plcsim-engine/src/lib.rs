/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 16/10/26
******************************************************************************/

//! # PLC-SIM Engine
//!
//! High-level device simulator facade.
//!
//! This crate provides:
//! - **Simulator**: connect, disconnect, send and toggle automatic behaviour
//! - **Observer trait**: callback interface for a presentation layer
//! - **Builder API**: fluent configuration for simulator setup

pub mod application;
pub mod builder;
pub mod simulator;

pub use application::{NoOpObserver, Observer};
pub use builder::{DEFAULT_STOP_TIMEOUT, SimulatorBuilder};
pub use simulator::Simulator;
