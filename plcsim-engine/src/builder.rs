/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 16/10/26
******************************************************************************/

//! Simulator builder for fluent configuration.
//!
//! This module provides a builder API for configuring a [`Simulator`].

use crate::application::{NoOpObserver, Observer};
use crate::simulator::Simulator;
use plcsim_session::config::SessionConfig;
use plcsim_store::DEFAULT_LOG_CAPACITY;
use plcsim_transport::TransportConfig;
use std::sync::Arc;
use std::time::Duration;

/// Default time a replaced or disconnected connection gets to stop.
pub const DEFAULT_STOP_TIMEOUT: Duration = Duration::from_secs(3);

/// Builder for configuring a device simulator.
#[derive(Debug)]
pub struct SimulatorBuilder<O: Observer = NoOpObserver> {
    /// Observer callback handler.
    observer: Arc<O>,
    /// Identities, heartbeat and auto-confirm settings.
    session: SessionConfig,
    /// Socket and queue settings.
    transport: TransportConfig,
    /// Bound on waiting for a connection to stop.
    stop_timeout: Duration,
    /// Event log retention.
    log_capacity: usize,
}

impl Default for SimulatorBuilder<NoOpObserver> {
    fn default() -> Self {
        Self::new()
    }
}

impl SimulatorBuilder<NoOpObserver> {
    /// Creates a new simulator builder with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self {
            observer: Arc::new(NoOpObserver),
            session: SessionConfig::default(),
            transport: TransportConfig::default(),
            stop_timeout: DEFAULT_STOP_TIMEOUT,
            log_capacity: DEFAULT_LOG_CAPACITY,
        }
    }
}

impl<O: Observer + 'static> SimulatorBuilder<O> {
    /// Sets the observer callback handler.
    #[must_use]
    pub fn with_observer<B: Observer>(self, observer: B) -> SimulatorBuilder<B> {
        SimulatorBuilder {
            observer: Arc::new(observer),
            session: self.session,
            transport: self.transport,
            stop_timeout: self.stop_timeout,
            log_capacity: self.log_capacity,
        }
    }

    /// Sets the session configuration.
    #[must_use]
    pub fn with_session(mut self, config: SessionConfig) -> Self {
        self.session = config;
        self
    }

    /// Sets the transport configuration.
    #[must_use]
    pub fn with_transport(mut self, config: TransportConfig) -> Self {
        self.transport = config;
        self
    }

    /// Sets the connect timeout.
    #[must_use]
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.transport = self.transport.with_connect_timeout(timeout);
        self
    }

    /// Sets how long a connection being replaced or disconnected may take to stop.
    #[must_use]
    pub const fn with_stop_timeout(mut self, timeout: Duration) -> Self {
        self.stop_timeout = timeout;
        self
    }

    /// Sets the number of entries the event log retains.
    #[must_use]
    pub const fn with_log_capacity(mut self, capacity: usize) -> Self {
        self.log_capacity = capacity;
        self
    }

    /// Returns the session configuration.
    #[must_use]
    pub const fn session(&self) -> &SessionConfig {
        &self.session
    }

    /// Returns the transport configuration.
    #[must_use]
    pub const fn transport(&self) -> &TransportConfig {
        &self.transport
    }

    /// Returns the stop timeout.
    #[must_use]
    pub const fn stop_timeout(&self) -> Duration {
        self.stop_timeout
    }

    /// Returns the event log capacity.
    #[must_use]
    pub const fn log_capacity(&self) -> usize {
        self.log_capacity
    }

    /// Returns the observer.
    #[must_use]
    pub fn observer(&self) -> Arc<O> {
        Arc::clone(&self.observer)
    }

    /// Builds the simulator. No connection is opened.
    #[must_use]
    pub fn build(self) -> Simulator {
        Simulator::new(
            self.session,
            self.transport,
            self.stop_timeout,
            self.log_capacity,
            self.observer,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use plcsim_core::types::ConnectionState;

    #[test]
    fn test_simulator_builder_default() {
        let builder = SimulatorBuilder::new();
        assert_eq!(builder.stop_timeout(), Duration::from_secs(3));
        assert_eq!(builder.log_capacity(), 5000);
        assert_eq!(builder.transport().connect_timeout, Duration::from_secs(5));
        assert_eq!(builder.session().device_id, "PLC-SIM");
    }

    #[test]
    fn test_simulator_builder_with_session() {
        let session = SessionConfig::new("PLC-07", "WMS")
            .with_auto_confirm(false)
            .with_heartbeat_interval_secs(0);

        let simulator = SimulatorBuilder::new()
            .with_session(session)
            .with_log_capacity(10)
            .with_connect_timeout(Duration::from_millis(250))
            .build();

        assert_eq!(simulator.controller().device_id(), "PLC-07");
        assert!(!simulator.controller().auto_confirm());
        assert_eq!(simulator.controller().heartbeat_interval(), Duration::from_secs(1));
        assert_eq!(simulator.log().capacity(), 10);
        assert_eq!(simulator.state(), ConnectionState::Idle);
    }
}
