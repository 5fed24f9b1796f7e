//! Device Example
//!
//! Connects the simulator to a host, keeps the heartbeat running, prints the
//! event log, and exports it on Ctrl-C.

use async_trait::async_trait;
use plcsim_core::{ConnectionState, Telegram};
use plcsim_engine::{Observer, SimulatorBuilder};
use plcsim_session::{Reaction, SessionConfig};
use tokio::sync::broadcast::error::RecvError;
use tracing::{info, warn};

mod common;
use common::{ExampleConfig, format_entry, init_logging};

struct Console;

#[async_trait]
impl Observer for Console {
    async fn on_state_changed(&self, connection_id: u64, state: ConnectionState) {
        info!(connection_id, %state, "state changed");
    }

    async fn on_telegram(&self, telegram: &Telegram, reaction: &Reaction) {
        if let Some(reply) = reaction.reply() {
            info!("{} answered with {}", telegram.kind().label(), reply.kind().label());
        }
    }

    async fn on_diagnostic(&self, detail: &str) {
        warn!("{}", detail);
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logging();
    let cfg = ExampleConfig::from_env();
    info!("Device {} connecting to {}", cfg.device_id, cfg.addr());

    let session = SessionConfig::new(cfg.device_id.clone(), cfg.host_id.clone())
        .with_heartbeat_interval_secs(cfg.life_secs)
        .with_auto_heartbeat(true);
    let simulator = SimulatorBuilder::new()
        .with_session(session)
        .with_observer(Console)
        .build();

    let mut entries = simulator.subscribe();
    let printer = tokio::spawn(async move {
        loop {
            match entries.recv().await {
                Ok(entry) => println!("{}", format_entry(&entry)),
                Err(RecvError::Lagged(n)) => println!("... {n} entries skipped"),
                Err(RecvError::Closed) => break,
            }
        }
    });

    simulator.connect(&cfg.host, cfg.port).await?;
    tokio::signal::ctrl_c().await?;

    simulator.disconnect().await;
    if let Some(path) = simulator.export_to_dir(&std::env::current_dir()?).await? {
        info!("Log written to {}", path.display());
    }
    printer.abort();
    Ok(())
}
