/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 16/10/26
******************************************************************************/

//! Session configuration.
//!
//! This module provides configuration options for a simulated device session.

use crate::heartbeat::{MIN_HEARTBEAT_INTERVAL, clamp_interval, clamp_pong_gap};
use std::time::Duration;

/// Name the simulator uses as telegram source.
pub const DEFAULT_DEVICE_ID: &str = "PLC-SIM";

/// Name of the warehouse host used as telegram destination.
pub const DEFAULT_HOST_ID: &str = "EWM-MFS";

/// Default spacing of automatic heartbeats.
pub const DEFAULT_HEARTBEAT_INTERVAL: Duration = Duration::from_secs(10);

/// Minimum spacing of PONG replies.
pub const DEFAULT_PONG_MIN_GAP: Duration = Duration::from_secs(1);

/// Configuration for a device session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    /// Source field of every originated telegram.
    pub device_id: String,
    /// Destination field of every originated telegram.
    pub host_id: String,
    /// Spacing of automatic heartbeats, never below one second.
    pub heartbeat_interval: Duration,
    /// Whether heartbeats are originated automatically.
    pub auto_heartbeat: bool,
    /// Whether each move order is answered with a confirmation.
    pub auto_confirm: bool,
    /// Minimum spacing of PONG replies.
    pub pong_min_gap: Duration,
}

impl SessionConfig {
    /// Creates a configuration with the given identities and default behaviour.
    ///
    /// Blank identities fall back to [`DEFAULT_DEVICE_ID`] and [`DEFAULT_HOST_ID`].
    ///
    /// # Arguments
    /// * `device_id` - Name of the simulated device
    /// * `host_id` - Name of the warehouse host
    #[must_use]
    pub fn new(device_id: impl Into<String>, host_id: impl Into<String>) -> Self {
        Self {
            device_id: or_default(device_id.into(), DEFAULT_DEVICE_ID),
            host_id: or_default(host_id.into(), DEFAULT_HOST_ID),
            heartbeat_interval: DEFAULT_HEARTBEAT_INTERVAL,
            auto_heartbeat: false,
            auto_confirm: true,
            pong_min_gap: DEFAULT_PONG_MIN_GAP,
        }
    }

    /// Sets the heartbeat interval, clamped to at least one second.
    #[must_use]
    pub fn with_heartbeat_interval(mut self, interval: Duration) -> Self {
        self.heartbeat_interval = clamp_interval(interval);
        self
    }

    /// Sets the heartbeat interval from a signed number of seconds.
    ///
    /// Zero and negative values are clamped to one second.
    #[must_use]
    pub fn with_heartbeat_interval_secs(mut self, secs: i64) -> Self {
        self.heartbeat_interval = u64::try_from(secs)
            .map(Duration::from_secs)
            .map_or(MIN_HEARTBEAT_INTERVAL, clamp_interval);
        self
    }

    /// Sets whether heartbeats are originated automatically.
    #[must_use]
    pub const fn with_auto_heartbeat(mut self, enabled: bool) -> Self {
        self.auto_heartbeat = enabled;
        self
    }

    /// Sets whether move orders are confirmed automatically.
    #[must_use]
    pub const fn with_auto_confirm(mut self, enabled: bool) -> Self {
        self.auto_confirm = enabled;
        self
    }

    /// Sets the minimum spacing of PONG replies, clamped to at least one second.
    #[must_use]
    pub fn with_pong_min_gap(mut self, gap: Duration) -> Self {
        self.pong_min_gap = clamp_pong_gap(gap);
        self
    }

    /// Returns the heartbeat interval in seconds.
    #[must_use]
    pub const fn heartbeat_interval_secs(&self) -> u64 {
        self.heartbeat_interval.as_secs()
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self::new(DEFAULT_DEVICE_ID, DEFAULT_HOST_ID)
    }
}

fn or_default(value: String, default: &str) -> String {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        default.to_string()
    } else {
        trimmed.to_string()
    }
}

/// Builder for session configuration.
#[derive(Debug, Default)]
pub struct SessionConfigBuilder {
    device_id: Option<String>,
    host_id: Option<String>,
    heartbeat_interval: Option<Duration>,
    auto_heartbeat: bool,
    auto_confirm: Option<bool>,
    pong_min_gap: Option<Duration>,
}

impl SessionConfigBuilder {
    /// Creates a new builder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the device name.
    #[must_use]
    pub fn device_id(mut self, id: impl Into<String>) -> Self {
        self.device_id = Some(id.into());
        self
    }

    /// Sets the host name.
    #[must_use]
    pub fn host_id(mut self, id: impl Into<String>) -> Self {
        self.host_id = Some(id.into());
        self
    }

    /// Sets the heartbeat interval.
    #[must_use]
    pub fn heartbeat_interval(mut self, interval: Duration) -> Self {
        self.heartbeat_interval = Some(interval);
        self
    }

    /// Sets whether heartbeats are originated automatically.
    #[must_use]
    pub const fn auto_heartbeat(mut self, enabled: bool) -> Self {
        self.auto_heartbeat = enabled;
        self
    }

    /// Sets whether move orders are confirmed automatically.
    #[must_use]
    pub const fn auto_confirm(mut self, enabled: bool) -> Self {
        self.auto_confirm = Some(enabled);
        self
    }

    /// Sets the minimum spacing of PONG replies.
    #[must_use]
    pub const fn pong_min_gap(mut self, gap: Duration) -> Self {
        self.pong_min_gap = Some(gap);
        self
    }

    /// Builds the configuration. Unset fields take their defaults.
    #[must_use]
    pub fn build(self) -> SessionConfig {
        let mut config = SessionConfig::new(
            self.device_id.unwrap_or_default(),
            self.host_id.unwrap_or_default(),
        )
        .with_auto_heartbeat(self.auto_heartbeat);

        if let Some(interval) = self.heartbeat_interval {
            config = config.with_heartbeat_interval(interval);
        }
        if let Some(enabled) = self.auto_confirm {
            config.auto_confirm = enabled;
        }
        if let Some(gap) = self.pong_min_gap {
            config = config.with_pong_min_gap(gap);
        }

        config
    }
}
