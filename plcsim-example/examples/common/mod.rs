//! Shared helpers for the PLC-SIM demos.

#![allow(dead_code)]

use plcsim_store::EventLogEntry;

/// Settings read from `PLCSIM_*` environment variables.
#[derive(Debug, Clone)]
pub struct ExampleConfig {
    pub host: String,
    pub port: u32,
    pub device_id: String,
    pub host_id: String,
    pub life_secs: i64,
}

impl ExampleConfig {
    pub fn from_env() -> Self {
        Self {
            host: env_or("PLCSIM_HOST", "127.0.0.1".to_string()),
            port: env_or("PLCSIM_PORT", 5000),
            device_id: env_or("PLCSIM_DEVICE", "PLC-SIM".to_string()),
            host_id: env_or("PLCSIM_HOST_ID", "EWM-MFS".to_string()),
            life_secs: env_or("PLCSIM_LIFE_SECS", 10),
        }
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn env_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

pub fn init_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();
}

/// One console line per event log entry.
pub fn format_entry(entry: &EventLogEntry) -> String {
    let time = entry.timestamp.format("%H:%M:%S%.3f");
    match &entry.telegram {
        Some(t) => format!(
            "{time} {} {:<8} -> {:<8} {} #{:06} {}",
            entry.direction,
            t.source(),
            t.destination(),
            t.kind().label(),
            t.sequence(),
            entry.summary()
        ),
        None => format!("{time} {} {}", entry.direction, entry.detail),
    }
}
