/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 16/10/26
******************************************************************************/

//! Protocol reactions of the simulated device.
//!
//! The [`SessionController`] turns each decoded inbound telegram into a
//! [`Reaction`] and builds every telegram the device originates. It owns the
//! outbound sequence counter, the PONG rate limiter, and the heartbeat
//! settings; it never touches the socket.

use crate::config::SessionConfig;
use crate::heartbeat::{HeartbeatScheduler, PongLimiter, clamp_interval, next_heartbeat_at};
use crate::sequence::SequenceManager;
use chrono::Local;
use parking_lot::{Mutex, RwLock};
use plcsim_core::telegram::{Confirmation, ErrorReport, LifeSignal, MoveOrder, Payload, Telegram};
use plcsim_core::types::TelegramKind;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Error code of manually raised move order errors.
pub const MANUAL_ERROR_CODE: &str = "E001";

/// What the device does in response to one inbound telegram.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reaction {
    /// Nothing to send.
    Ignore,
    /// Reply to a PING.
    Pong(Telegram),
    /// A PING arrived too soon after the last PONG.
    PongSuppressed {
        /// Time since the last PONG.
        since_last: Duration,
    },
    /// Confirmation for a move order.
    Confirm(Telegram),
    /// A move order arrived while auto-confirm is off.
    ConfirmDisabled,
}

impl Reaction {
    /// Returns the telegram to enqueue, if any.
    #[must_use]
    pub fn reply(&self) -> Option<&Telegram> {
        match self {
            Self::Pong(t) | Self::Confirm(t) => Some(t),
            _ => None,
        }
    }

    /// Consumes the reaction, returning the telegram to enqueue.
    #[must_use]
    pub fn into_reply(self) -> Option<Telegram> {
        match self {
            Self::Pong(t) | Self::Confirm(t) => Some(t),
            _ => None,
        }
    }

    /// Returns a note for the inbound log entry, if the reaction warrants one.
    #[must_use]
    pub fn note(&self) -> Option<String> {
        match self {
            Self::PongSuppressed { since_last } => Some(format!(
                "PONG suppressed ({} ms since last)",
                since_last.as_millis()
            )),
            Self::ConfirmDisabled => Some("auto-confirm off".to_string()),
            _ => None,
        }
    }
}

/// Session behaviour of one simulated device.
///
/// Settings may be changed at any time from any task; each inbound telegram
/// sees a consistent value of each setting.
#[derive(Debug)]
pub struct SessionController {
    device_id: String,
    host_id: String,
    sequence: SequenceManager,
    limiter: PongLimiter,
    auto_confirm: AtomicBool,
    auto_heartbeat: AtomicBool,
    heartbeat_interval: RwLock<Duration>,
    last_heartbeat: Mutex<Option<tokio::time::Instant>>,
}

impl SessionController {
    /// Creates a controller from a configuration.
    #[must_use]
    pub fn new(config: SessionConfig) -> Self {
        Self {
            limiter: PongLimiter::new(config.pong_min_gap),
            sequence: SequenceManager::new(),
            auto_confirm: AtomicBool::new(config.auto_confirm),
            auto_heartbeat: AtomicBool::new(config.auto_heartbeat),
            heartbeat_interval: RwLock::new(clamp_interval(config.heartbeat_interval)),
            last_heartbeat: Mutex::new(None),
            device_id: config.device_id,
            host_id: config.host_id,
        }
    }

    /// Returns the device name.
    #[must_use]
    pub fn device_id(&self) -> &str {
        &self.device_id
    }

    /// Returns the host name.
    #[must_use]
    pub fn host_id(&self) -> &str {
        &self.host_id
    }

    /// Returns the outbound sequence counter.
    #[must_use]
    pub const fn sequence(&self) -> &SequenceManager {
        &self.sequence
    }

    /// Returns the current settings.
    #[must_use]
    pub fn config(&self) -> SessionConfig {
        SessionConfig {
            device_id: self.device_id.clone(),
            host_id: self.host_id.clone(),
            heartbeat_interval: self.heartbeat_interval(),
            auto_heartbeat: self.auto_heartbeat(),
            auto_confirm: self.auto_confirm(),
            pong_min_gap: self.limiter.min_gap(),
        }
    }

    /// Returns whether move orders are confirmed automatically.
    #[must_use]
    pub fn auto_confirm(&self) -> bool {
        self.auto_confirm.load(Ordering::SeqCst)
    }

    /// Turns auto-confirm on or off.
    pub fn set_auto_confirm(&self, enabled: bool) {
        self.auto_confirm.store(enabled, Ordering::SeqCst);
    }

    /// Returns whether heartbeats should be originated.
    #[must_use]
    pub fn auto_heartbeat(&self) -> bool {
        self.auto_heartbeat.load(Ordering::SeqCst)
    }

    /// Records whether heartbeats should be originated.
    ///
    /// Starting or stopping the timer is the caller's job.
    pub fn set_auto_heartbeat(&self, enabled: bool) {
        self.auto_heartbeat.store(enabled, Ordering::SeqCst);
    }

    /// Returns the heartbeat interval.
    #[must_use]
    pub fn heartbeat_interval(&self) -> Duration {
        *self.heartbeat_interval.read()
    }

    /// Changes the heartbeat interval and returns the clamped value applied.
    pub fn set_heartbeat_interval(&self, interval: Duration) -> Duration {
        let interval = clamp_interval(interval);
        *self.heartbeat_interval.write() = interval;
        interval
    }

    /// Decides the reaction to an inbound telegram.
    pub fn on_inbound(&self, telegram: &Telegram) -> Reaction {
        self.on_inbound_at(telegram, Instant::now())
    }

    /// Decides the reaction to an inbound telegram received at `now`.
    ///
    /// Only PING is answered; PONG, CF and ER telegrams are logged by the
    /// caller and otherwise ignored.
    pub fn on_inbound_at(&self, telegram: &Telegram, now: Instant) -> Reaction {
        match telegram.payload() {
            Payload::Life(Some(LifeSignal::Ping)) => match self.limiter.try_acquire_at(now) {
                Ok(()) => Reaction::Pong(self.pong()),
                Err(since_last) => {
                    debug!(
                        since_last_ms = since_last.as_millis() as u64,
                        "pong suppressed"
                    );
                    Reaction::PongSuppressed { since_last }
                }
            },
            Payload::MoveOrder(order) => {
                if self.auto_confirm() {
                    Reaction::Confirm(self.confirm_for(&order))
                } else {
                    Reaction::ConfirmDisabled
                }
            }
            _ => Reaction::Ignore,
        }
    }

    /// Builds a PING with the next sequence number.
    #[must_use]
    pub fn ping(&self) -> Telegram {
        self.life(LifeSignal::Ping)
    }

    /// Builds a PONG with the next sequence number.
    #[must_use]
    pub fn pong(&self) -> Telegram {
        self.life(LifeSignal::Pong)
    }

    fn life(&self, signal: LifeSignal) -> Telegram {
        Telegram::life(
            &self.device_id,
            &self.host_id,
            self.sequence.allocate(),
            signal,
        )
    }

    /// Builds a `DONE` confirmation for a move order.
    ///
    /// The confirmed bin is the order's destination bin.
    #[must_use]
    pub fn confirm_for(&self, order: &MoveOrder) -> Telegram {
        let confirmation =
            Confirmation::done(&order.transport_unit, &order.destination_bin, Local::now());
        Telegram::confirmation(
            &self.device_id,
            &self.host_id,
            self.sequence.allocate(),
            &confirmation,
        )
    }

    /// Builds a manual `E001` error for a move order.
    #[must_use]
    pub fn error_for(&self, order: &MoveOrder) -> Telegram {
        let report = ErrorReport::new(
            MANUAL_ERROR_CODE,
            format!("Manual error for TU {}", order.transport_unit),
        );
        Telegram::error(
            &self.device_id,
            &self.host_id,
            self.sequence.allocate(),
            &report,
        )
    }

    /// Builds an arbitrary telegram addressed from this device to the host.
    #[must_use]
    pub fn compose(&self, kind: TelegramKind, data: &str) -> Telegram {
        Telegram::new(
            kind,
            self.device_id.clone(),
            self.host_id.clone(),
            self.sequence.allocate(),
            data,
        )
    }

    /// Spawns the heartbeat timer at the current interval.
    ///
    /// The first PING goes out one interval after the previous automatic
    /// PING, or right away if there was none, so replacing the timer never
    /// shortens the spacing.
    ///
    /// # Arguments
    /// * `outbound` - Queue feeding the connection's send loop
    /// * `cancel` - Stops the timer
    pub fn spawn_heartbeat(
        self: &Arc<Self>,
        outbound: mpsc::Sender<Telegram>,
        cancel: CancellationToken,
    ) -> JoinHandle<()> {
        let interval = self.heartbeat_interval();
        let start = next_heartbeat_at(
            *self.last_heartbeat.lock(),
            interval,
            tokio::time::Instant::now(),
        );
        let controller = Arc::clone(self);
        HeartbeatScheduler::new(interval).spawn_at(start, outbound, cancel, move || {
            controller.heartbeat_ping()
        })
    }

    /// Builds an automatic PING and records when it was made.
    fn heartbeat_ping(&self) -> Telegram {
        *self.last_heartbeat.lock() = Some(tokio::time::Instant::now());
        self.ping()
    }
}

impl Default for SessionController {
    fn default() -> Self {
        Self::new(SessionConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn inbound_ping(seq: u32) -> Telegram {
        Telegram::life("EWM-MFS", "PLC-SIM", seq, LifeSignal::Ping)
    }

    fn inbound_order() -> (MoveOrder, Telegram) {
        let order = MoveOrder::new("TU00001", "A01", "B02", "05");
        let telegram = Telegram::move_order("EWM-MFS", "PLC-SIM", 5, &order);
        (order, telegram)
    }

    #[test]
    fn test_ping_gets_pong() {
        let controller = SessionController::default();
        let reaction = controller.on_inbound(&inbound_ping(1));

        let pong = reaction.reply().unwrap();
        assert_eq!(pong.kind(), TelegramKind::Life);
        assert_eq!(pong.payload(), Payload::Life(Some(LifeSignal::Pong)));
        assert_eq!(pong.source(), "PLC-SIM");
        assert_eq!(pong.destination(), "EWM-MFS");
        assert_eq!(pong.sequence(), 1);
    }

    #[test]
    fn test_ping_burst_yields_one_pong() {
        let controller = SessionController::default();
        let start = Instant::now();

        let pongs = (0..300)
            .map(|i| {
                let at = start + Duration::from_millis(u64::from(i));
                controller.on_inbound_at(&inbound_ping(i), at)
            })
            .filter(|r| matches!(r, Reaction::Pong(_)))
            .count();
        assert_eq!(pongs, 1);

        let later = controller.on_inbound_at(&inbound_ping(301), start + Duration::from_secs(1));
        assert!(matches!(later, Reaction::Pong(_)));
    }

    #[test]
    fn test_suppressed_pong_note() {
        let controller = SessionController::default();
        let now = Instant::now();
        controller.on_inbound_at(&inbound_ping(1), now);
        let reaction = controller.on_inbound_at(&inbound_ping(2), now + Duration::from_millis(250));

        assert_eq!(
            reaction,
            Reaction::PongSuppressed {
                since_last: Duration::from_millis(250)
            }
        );
        assert!(reaction.reply().is_none());
        assert_eq!(
            reaction.note().as_deref(),
            Some("PONG suppressed (250 ms since last)")
        );
    }

    #[test]
    fn test_pong_is_not_answered() {
        let controller = SessionController::default();
        let pong = Telegram::life("EWM-MFS", "PLC-SIM", 1, LifeSignal::Pong);
        assert_eq!(controller.on_inbound(&pong), Reaction::Ignore);
        assert_eq!(controller.sequence().last(), 0);
    }

    #[test]
    fn test_move_order_confirmed_once() {
        let controller = SessionController::default();
        let (order, mo) = inbound_order();

        let cf = controller.on_inbound(&mo).into_reply().unwrap();
        assert_eq!(cf.kind(), TelegramKind::Confirmation);

        let Payload::Confirmation(confirmation) = cf.payload() else {
            panic!("expected confirmation payload");
        };
        assert_eq!(confirmation.transport_unit, order.transport_unit);
        assert_eq!(confirmation.bin, order.destination_bin);
        assert_eq!(confirmation.status, "DONE");
        assert_eq!(confirmation.timestamp.len(), 14);
        assert!(confirmation.timestamp.chars().all(|c| c.is_ascii_digit()));
    }

    #[test]
    fn test_auto_confirm_toggle() {
        let controller = SessionController::default();
        let (_, mo) = inbound_order();

        controller.set_auto_confirm(false);
        assert!(!controller.auto_confirm());
        assert_eq!(controller.on_inbound(&mo), Reaction::ConfirmDisabled);

        controller.set_auto_confirm(true);
        assert!(matches!(controller.on_inbound(&mo), Reaction::Confirm(_)));
    }

    #[test]
    fn test_other_kinds_ignored() {
        let controller = SessionController::default();
        let er = Telegram::error("EWM-MFS", "PLC-SIM", 1, &ErrorReport::new("E999", "x"));
        assert_eq!(controller.on_inbound(&er), Reaction::Ignore);
    }

    #[test]
    fn test_manual_builders() {
        let controller = SessionController::default();
        let (order, _) = inbound_order();

        let er = controller.error_for(&order);
        let Payload::Error(report) = er.payload() else {
            panic!("expected error payload");
        };
        assert_eq!(report.code, "E001");
        assert_eq!(report.message, "Manual error for TU TU00001");

        let ping = controller.ping();
        assert!(ping.is_ping());
        assert_eq!(ping.sequence(), er.sequence() + 1);

        let composed = controller.compose(TelegramKind::MoveOrder, "payload");
        assert_eq!(composed.source(), "PLC-SIM");
        assert_eq!(composed.destination(), "EWM-MFS");
        assert_eq!(composed.data(), "payload");
    }

    #[test]
    fn test_settings_round_trip() {
        let controller = SessionController::new(
            SessionConfig::new("CONV-01", "WMS").with_auto_heartbeat(true),
        );
        assert!(controller.auto_heartbeat());
        controller.set_auto_heartbeat(false);

        assert_eq!(
            controller.set_heartbeat_interval(Duration::ZERO),
            Duration::from_secs(1)
        );

        let config = controller.config();
        assert_eq!(config.device_id, "CONV-01");
        assert!(!config.auto_heartbeat);
        assert_eq!(config.heartbeat_interval, Duration::from_secs(1));
    }

    #[tokio::test(start_paused = true)]
    async fn test_heartbeat_restart_keeps_spacing() {
        let controller = Arc::new(SessionController::new(
            SessionConfig::default().with_auto_heartbeat(true),
        ));
        let (tx, mut rx) = mpsc::channel(4);

        let first = CancellationToken::new();
        let first_handle = controller.spawn_heartbeat(tx.clone(), first.clone());
        let start = tokio::time::Instant::now();
        assert!(rx.recv().await.unwrap().is_ping());

        tokio::time::sleep(Duration::from_millis(100)).await;
        first.cancel();
        first_handle.await.unwrap();
        controller.set_heartbeat_interval(Duration::from_secs(5));

        let second = CancellationToken::new();
        let handle = controller.spawn_heartbeat(tx, second.clone());
        let early = tokio::time::timeout(Duration::from_millis(400), rx.recv()).await;
        assert!(early.is_err(), "restart must not send a PING right away");

        assert!(rx.recv().await.unwrap().is_ping());
        assert!(start.elapsed() >= Duration::from_secs(5));

        second.cancel();
        handle.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_spawn_heartbeat_uses_session_identity() {
        let controller = Arc::new(SessionController::default());
        let (tx, mut rx) = mpsc::channel(4);
        let cancel = CancellationToken::new();

        let handle = controller.spawn_heartbeat(tx, cancel.clone());
        let first = rx.recv().await.unwrap();
        let second = rx.recv().await.unwrap();

        assert!(first.is_ping());
        assert_eq!(first.source(), "PLC-SIM");
        assert_eq!(second.sequence(), first.sequence() + 1);

        cancel.cancel();
        handle.await.unwrap();
    }
}
