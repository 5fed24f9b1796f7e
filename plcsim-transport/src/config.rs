/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 16/10/26
******************************************************************************/

//! Transport configuration and connect-target validation.

use crate::buffer::DEFAULT_MAX_BUFFERED;
use plcsim_core::error::ValidationError;
use std::fmt;
use std::time::Duration;

/// Default bound on socket connection establishment.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Default size of a single socket read.
pub const DEFAULT_READ_CHUNK: usize = 4096;

/// Default depth of the outbound telegram queue.
pub const DEFAULT_OUTBOUND_CAPACITY: usize = 256;

/// Default depth of the inbound event queue.
pub const DEFAULT_EVENT_CAPACITY: usize = 1024;

/// A validated host and port.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Endpoint {
    host: String,
    port: u16,
}

impl Endpoint {
    /// Validates a connect target without touching the network.
    ///
    /// # Arguments
    /// * `host` - Host name or address; surrounding whitespace is ignored
    /// * `port` - Port number, accepted in `1..=65535`
    ///
    /// # Errors
    /// Returns `ValidationError::EmptyHost` for a blank host and
    /// `ValidationError::PortOutOfRange` for a port outside the valid range.
    pub fn new(host: &str, port: u32) -> Result<Self, ValidationError> {
        let host = host.trim();
        if host.is_empty() {
            return Err(ValidationError::EmptyHost);
        }
        let port = u16::try_from(port)
            .ok()
            .filter(|&p| p != 0)
            .ok_or(ValidationError::PortOutOfRange(port))?;
        Ok(Self {
            host: host.to_string(),
            port,
        })
    }

    /// Returns the trimmed host.
    #[must_use]
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Returns the port.
    #[must_use]
    pub const fn port(&self) -> u16 {
        self.port
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

/// Tuning for one connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportConfig {
    /// Bound on socket connection establishment.
    pub connect_timeout: Duration,
    /// Size of a single socket read.
    pub read_chunk_size: usize,
    /// Bound on unconsumed received bytes.
    pub max_buffered: usize,
    /// Depth of the outbound telegram queue.
    pub outbound_capacity: usize,
    /// Depth of the inbound event queue.
    pub event_capacity: usize,
}

impl TransportConfig {
    /// Creates a configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self {
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            read_chunk_size: DEFAULT_READ_CHUNK,
            max_buffered: DEFAULT_MAX_BUFFERED,
            outbound_capacity: DEFAULT_OUTBOUND_CAPACITY,
            event_capacity: DEFAULT_EVENT_CAPACITY,
        }
    }

    /// Sets the connect timeout.
    #[must_use]
    pub const fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Sets the read chunk size (at least one byte).
    #[must_use]
    pub fn with_read_chunk_size(mut self, size: usize) -> Self {
        self.read_chunk_size = size.max(1);
        self
    }

    /// Sets the bound on unconsumed received bytes.
    #[must_use]
    pub const fn with_max_buffered(mut self, bytes: usize) -> Self {
        self.max_buffered = bytes;
        self
    }

    /// Sets the outbound queue depth (at least one).
    #[must_use]
    pub fn with_outbound_capacity(mut self, capacity: usize) -> Self {
        self.outbound_capacity = capacity.max(1);
        self
    }

    /// Sets the inbound event queue depth (at least one).
    #[must_use]
    pub fn with_event_capacity(mut self, capacity: usize) -> Self {
        self.event_capacity = capacity.max(1);
        self
    }
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_valid() {
        let endpoint = Endpoint::new("  127.0.0.1 ", 5000).unwrap();
        assert_eq!(endpoint.host(), "127.0.0.1");
        assert_eq!(endpoint.port(), 5000);
        assert_eq!(endpoint.to_string(), "127.0.0.1:5000");

        assert!(Endpoint::new("h", 1).is_ok());
        assert!(Endpoint::new("h", 65535).is_ok());
    }

    #[test]
    fn test_endpoint_invalid() {
        assert_eq!(Endpoint::new("   ", 5000), Err(ValidationError::EmptyHost));
        assert_eq!(
            Endpoint::new("h", 0),
            Err(ValidationError::PortOutOfRange(0))
        );
        assert_eq!(
            Endpoint::new("h", 65536),
            Err(ValidationError::PortOutOfRange(65536))
        );
    }

    #[test]
    fn test_transport_config_defaults() {
        let config = TransportConfig::default();
        assert_eq!(config.connect_timeout, Duration::from_secs(5));
        assert_eq!(config.read_chunk_size, 4096);
        assert_eq!(config.max_buffered, 128 * 256);
        assert_eq!(config.outbound_capacity, 256);
        assert_eq!(config.event_capacity, 1024);
    }

    #[test]
    fn test_transport_config_setters() {
        let config = TransportConfig::new()
            .with_connect_timeout(Duration::from_millis(200))
            .with_read_chunk_size(0)
            .with_outbound_capacity(0)
            .with_event_capacity(8)
            .with_max_buffered(1024);
        assert_eq!(config.connect_timeout, Duration::from_millis(200));
        assert_eq!(config.read_chunk_size, 1);
        assert_eq!(config.outbound_capacity, 1);
        assert_eq!(config.event_capacity, 8);
        assert_eq!(config.max_buffered, 1024);
    }
}
