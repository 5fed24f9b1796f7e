/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 16/10/26
******************************************************************************/

//! Heartbeat timing.
//!
//! This module handles both directions of the LIFE exchange:
//! - Originating PING telegrams on a cancellable periodic timer
//! - Rate limiting PONG replies to inbound PINGs

use parking_lot::Mutex;
use plcsim_core::telegram::Telegram;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Shortest allowed heartbeat interval.
pub const MIN_HEARTBEAT_INTERVAL: Duration = Duration::from_secs(1);

/// Shortest allowed spacing of PONG replies.
pub const MIN_PONG_GAP: Duration = Duration::from_secs(1);

/// Clamps a requested interval to [`MIN_HEARTBEAT_INTERVAL`].
#[inline]
#[must_use]
pub fn clamp_interval(interval: Duration) -> Duration {
    interval.max(MIN_HEARTBEAT_INTERVAL)
}

/// Clamps a requested PONG spacing to [`MIN_PONG_GAP`].
#[inline]
#[must_use]
pub fn clamp_pong_gap(gap: Duration) -> Duration {
    gap.max(MIN_PONG_GAP)
}

/// Returns when the next heartbeat may fire.
///
/// Immediately if none was sent yet, otherwise one interval after the last
/// one, and never before `now`.
#[must_use]
pub fn next_heartbeat_at(
    last: Option<tokio::time::Instant>,
    interval: Duration,
    now: tokio::time::Instant,
) -> tokio::time::Instant {
    last.map_or(now, |last| (last + clamp_interval(interval)).max(now))
}

/// Last-PONG bookkeeping for rate-limited heartbeat replies.
///
/// Uses the monotonic clock, so wall-clock jumps never release or block a reply.
#[derive(Debug)]
pub struct PongLimiter {
    min_gap: Duration,
    last_pong: Mutex<Option<Instant>>,
}

impl PongLimiter {
    /// Creates a limiter allowing one reply per `min_gap`, at least one second.
    #[must_use]
    pub fn new(min_gap: Duration) -> Self {
        Self {
            min_gap: clamp_pong_gap(min_gap),
            last_pong: Mutex::new(None),
        }
    }

    /// Claims the right to send a PONG now.
    ///
    /// # Errors
    /// Returns the time since the last PONG if it is shorter than the minimum gap.
    pub fn try_acquire(&self) -> Result<(), Duration> {
        self.try_acquire_at(Instant::now())
    }

    /// Claims the right to send a PONG at `now`.
    ///
    /// The check and the timestamp update happen under one lock.
    ///
    /// # Errors
    /// Returns the time since the last PONG if it is shorter than the minimum gap.
    pub fn try_acquire_at(&self, now: Instant) -> Result<(), Duration> {
        let mut last = self.last_pong.lock();
        if let Some(previous) = *last {
            let since = now.saturating_duration_since(previous);
            if since < self.min_gap {
                return Err(since);
            }
        }
        *last = Some(now);
        Ok(())
    }

    /// Returns the minimum gap between replies.
    #[must_use]
    pub const fn min_gap(&self) -> Duration {
        self.min_gap
    }

    /// Forgets the last reply.
    pub fn reset(&self) {
        *self.last_pong.lock() = None;
    }
}

/// Periodic PING originator.
#[derive(Debug, Clone, Copy)]
pub struct HeartbeatScheduler {
    interval: Duration,
}

impl HeartbeatScheduler {
    /// Creates a scheduler; the interval is clamped to one second.
    #[must_use]
    pub fn new(interval: Duration) -> Self {
        Self {
            interval: clamp_interval(interval),
        }
    }

    /// Returns the effective interval.
    #[must_use]
    pub const fn interval(&self) -> Duration {
        self.interval
    }

    /// Spawns the timer task with its first tick right away.
    ///
    /// See [`Self::spawn_at`].
    pub fn spawn<F>(
        self,
        outbound: mpsc::Sender<Telegram>,
        cancel: CancellationToken,
        make: F,
    ) -> JoinHandle<()>
    where
        F: FnMut() -> Telegram + Send + 'static,
    {
        self.spawn_at(tokio::time::Instant::now(), outbound, cancel, make)
    }

    /// Spawns the timer task.
    ///
    /// The first telegram is produced at `start`, later ones one interval
    /// apart. A late tick is delayed rather than fired in a burst. The task
    /// ends when `cancel` fires or the outbound queue closes.
    ///
    /// # Arguments
    /// * `start` - Time of the first tick
    /// * `outbound` - Queue feeding the connection's send loop
    /// * `cancel` - Stops the timer
    /// * `make` - Builds one heartbeat telegram per tick
    pub fn spawn_at<F>(
        self,
        start: tokio::time::Instant,
        outbound: mpsc::Sender<Telegram>,
        cancel: CancellationToken,
        mut make: F,
    ) -> JoinHandle<()>
    where
        F: FnMut() -> Telegram + Send + 'static,
    {
        let period = self.interval;
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval_at(start, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => break,
                    _ = ticker.tick() => {}
                }

                let telegram = make();
                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => break,
                    sent = outbound.send(telegram) => {
                        if sent.is_err() {
                            debug!("outbound queue closed, heartbeat stopped");
                            break;
                        }
                    }
                }
            }
            debug!(interval_ms = period.as_millis() as u64, "heartbeat timer exited");
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use plcsim_core::telegram::LifeSignal;

    fn ping() -> Telegram {
        Telegram::life("PLC-SIM", "EWM-MFS", 0, LifeSignal::Ping)
    }

    #[test]
    fn test_clamp_interval() {
        assert_eq!(clamp_interval(Duration::ZERO), MIN_HEARTBEAT_INTERVAL);
        assert_eq!(
            clamp_interval(Duration::from_millis(999)),
            MIN_HEARTBEAT_INTERVAL
        );
        assert_eq!(
            clamp_interval(Duration::from_secs(10)),
            Duration::from_secs(10)
        );
    }

    #[test]
    fn test_pong_limiter_collapses_burst() {
        let limiter = PongLimiter::new(Duration::from_secs(1));
        let start = Instant::now();

        assert!(limiter.try_acquire_at(start).is_ok());
        for ms in [0, 10, 500, 999] {
            let since = limiter
                .try_acquire_at(start + Duration::from_millis(ms))
                .unwrap_err();
            assert_eq!(since, Duration::from_millis(ms));
        }
        assert!(limiter.try_acquire_at(start + Duration::from_secs(1)).is_ok());
        assert!(
            limiter
                .try_acquire_at(start + Duration::from_millis(1500))
                .is_err()
        );
    }

    #[test]
    fn test_pong_limiter_reset() {
        let limiter = PongLimiter::new(Duration::from_secs(1));
        assert!(limiter.try_acquire().is_ok());
        assert!(limiter.try_acquire().is_err());
        limiter.reset();
        assert!(limiter.try_acquire().is_ok());
        assert_eq!(limiter.min_gap(), Duration::from_secs(1));
    }

    #[test]
    fn test_scheduler_clamps() {
        assert_eq!(
            HeartbeatScheduler::new(Duration::ZERO).interval(),
            MIN_HEARTBEAT_INTERVAL
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_scheduler_ticks_at_interval() {
        let (tx, mut rx) = mpsc::channel(16);
        let cancel = CancellationToken::new();
        let handle = HeartbeatScheduler::new(Duration::ZERO).spawn(tx, cancel.clone(), ping);

        let start = tokio::time::Instant::now();
        rx.recv().await.unwrap();
        assert!(start.elapsed() < MIN_HEARTBEAT_INTERVAL);

        rx.recv().await.unwrap();
        let second = start.elapsed();
        assert!(second >= MIN_HEARTBEAT_INTERVAL);

        rx.recv().await.unwrap();
        assert!(start.elapsed() - second >= MIN_HEARTBEAT_INTERVAL);

        cancel.cancel();
        handle.await.unwrap();
    }

    #[test]
    fn test_pong_gap_clamped() {
        assert_eq!(PongLimiter::new(Duration::ZERO).min_gap(), MIN_PONG_GAP);
        assert_eq!(
            PongLimiter::new(Duration::from_secs(3)).min_gap(),
            Duration::from_secs(3)
        );

        let limiter = PongLimiter::new(Duration::ZERO);
        let start = Instant::now();
        assert!(limiter.try_acquire_at(start).is_ok());
        assert!(
            limiter
                .try_acquire_at(start + Duration::from_millis(10))
                .is_err()
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_next_heartbeat_at() {
        let now = tokio::time::Instant::now();
        let interval = Duration::from_secs(5);

        assert_eq!(next_heartbeat_at(None, interval, now), now);
        assert_eq!(
            next_heartbeat_at(Some(now), interval, now),
            now + Duration::from_secs(5)
        );
        assert_eq!(
            next_heartbeat_at(Some(now), Duration::ZERO, now),
            now + MIN_HEARTBEAT_INTERVAL
        );

        let later = now + Duration::from_secs(60);
        assert_eq!(next_heartbeat_at(Some(now), interval, later), later);
    }

    #[tokio::test(start_paused = true)]
    async fn test_scheduler_spawn_at_waits_for_start() {
        let (tx, mut rx) = mpsc::channel(4);
        let cancel = CancellationToken::new();
        let start = tokio::time::Instant::now() + Duration::from_secs(2);
        let handle = HeartbeatScheduler::new(Duration::from_secs(1)).spawn_at(
            start,
            tx,
            cancel.clone(),
            ping,
        );

        rx.recv().await.unwrap();
        assert!(tokio::time::Instant::now() >= start);

        cancel.cancel();
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn test_scheduler_stops_when_queue_closes() {
        let (tx, rx) = mpsc::channel(1);
        drop(rx);
        let handle =
            HeartbeatScheduler::new(Duration::from_secs(1)).spawn(tx, CancellationToken::new(), ping);
        handle.await.unwrap();
    }
}
