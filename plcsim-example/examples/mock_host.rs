//! Mock Host Example
//!
//! A minimal warehouse host: answers PING with PONG, pings the device and
//! issues a move order every few seconds, and logs what the device sends back.

use futures::{SinkExt, StreamExt};
use plcsim_core::{LifeSignal, MoveOrder, Payload, Telegram, TelegramKind};
use plcsim_transport::TelegramCodec;
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};
use tokio::time::interval;
use tokio_util::codec::Framed;
use tracing::{error, info, warn};

mod common;
use common::{ExampleConfig, init_logging};

const ORDER_EVERY: Duration = Duration::from_secs(5);
const PING_EVERY: Duration = Duration::from_secs(3);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logging();
    let cfg = ExampleConfig::from_env();
    info!("Host {} listening on {}", cfg.host_id, cfg.addr());

    let listener = TcpListener::bind(cfg.addr()).await?;
    loop {
        let (socket, addr) = listener.accept().await?;
        info!("Device connected from {}", addr);
        let cfg = cfg.clone();
        tokio::spawn(async move {
            if let Err(e) = handle(socket, cfg).await {
                error!("Error: {}", e);
            }
        });
    }
}

async fn handle(socket: TcpStream, cfg: ExampleConfig) -> anyhow::Result<()> {
    let mut framed = Framed::new(socket, TelegramCodec::new());
    let mut orders = interval(ORDER_EVERY);
    let mut pings = interval(PING_EVERY);
    let mut seq = 0u32;
    let mut next_seq = move || {
        seq = (seq + 1) % 1_000_000;
        seq
    };

    loop {
        tokio::select! {
            frame = framed.next() => {
                let telegram = match frame {
                    Some(Ok(Ok(telegram))) => telegram,
                    Some(Ok(Err(failure))) => {
                        warn!("Bad frame: {}", failure);
                        continue;
                    }
                    Some(Err(e)) => return Err(e.into()),
                    None => break,
                };
                info!(
                    "Received {} #{} from {}: {}",
                    telegram.kind().label(),
                    telegram.sequence(),
                    telegram.source(),
                    telegram.data()
                );
                match telegram.payload() {
                    Payload::Life(Some(LifeSignal::Ping)) => {
                        let pong =
                            Telegram::life(&cfg.host_id, &cfg.device_id, next_seq(), LifeSignal::Pong);
                        framed.send(pong).await?;
                    }
                    Payload::Confirmation(cf) => {
                        info!("TU {} arrived at {} ({})", cf.transport_unit, cf.bin, cf.status);
                    }
                    Payload::Error(er) => warn!("Device error {}: {}", er.code, er.message),
                    _ => {}
                }
            }
            _ = pings.tick() => {
                let ping = Telegram::life(&cfg.host_id, &cfg.device_id, next_seq(), LifeSignal::Ping);
                framed.send(ping).await?;
            }
            _ = orders.tick() => {
                let n = next_seq();
                let order = MoveOrder::new(format!("TU{n:05}"), "A01", "B02", "05");
                let mo = Telegram::move_order(&cfg.host_id, &cfg.device_id, n, &order);
                info!("Sending {} for {}", TelegramKind::MoveOrder.label(), order.transport_unit);
                framed.send(mo).await?;
            }
        }
    }

    info!("Device disconnected");
    Ok(())
}
