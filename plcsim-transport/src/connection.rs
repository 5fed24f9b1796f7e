/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 16/10/26
******************************************************************************/

//! Connection manager.
//!
//! A [`ConnectionManager`] owns one TCP connection attempt for its whole life.
//! Its state only moves forward:
//!
//! ```text
//! Idle -> Connecting -> Active -> Stopping -> Stopped
//!              \______________________________/
//!                      (connect failure)
//! ```
//!
//! While `Active` two loops run concurrently: the receive loop feeds socket
//! bytes through a [`ReceiveBuffer`] and reports [`ConnectionEvent`]s, the
//! send loop drains the outbound queue through the [`TelegramCodec`]. The
//! first loop to exit cancels the other. The socket is closed exactly once
//! when both have exited, and the state reaches `Stopped` on every exit path,
//! including task abort.

use crate::buffer::ReceiveBuffer;
use crate::codec::{CodecError, TelegramCodec};
use crate::config::{Endpoint, TransportConfig};
use crate::event::ConnectionEvent;
use futures::SinkExt;
use parking_lot::Mutex;
use plcsim_core::error::{ConnectionError, EncodeError, SimError};
use plcsim_core::telegram::Telegram;
use plcsim_core::types::ConnectionState;
use plcsim_store::EventStore;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::sync::{mpsc, watch};
use tokio_util::codec::FramedWrite;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Why one of the connection loops returned.
#[derive(Debug)]
enum LoopExit {
    Cancelled,
    PeerClosed,
    Failed(ConnectionError),
    Fatal(EncodeError),
}

/// Sets `Stopped` when the connection task ends, however it ends.
struct Teardown(Arc<ConnectionManager>);

impl Drop for Teardown {
    fn drop(&mut self) {
        self.0.advance(ConnectionState::Stopped);
    }
}

/// One TCP connection attempt and its read/write loops.
///
/// An instance is single-use: once it leaves `Idle` it can never return. A
/// reconnect creates a new instance.
pub struct ConnectionManager {
    id: u64,
    config: TransportConfig,
    state: watch::Sender<ConnectionState>,
    cancel: CancellationToken,
    outbound_tx: mpsc::Sender<Telegram>,
    outbound_rx: Mutex<Option<mpsc::Receiver<Telegram>>>,
    terminal_reported: AtomicBool,
    log: Arc<dyn EventStore>,
}

impl std::fmt::Debug for ConnectionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionManager")
            .field("id", &self.id)
            .field("state", &self.state())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl ConnectionManager {
    /// Creates an idle connection.
    ///
    /// # Arguments
    /// * `id` - Identifier used in tracing output
    /// * `config` - Timeouts and queue sizes
    /// * `log` - Event log receiving an outbound entry per written telegram
    #[must_use]
    pub fn new(id: u64, config: TransportConfig, log: Arc<dyn EventStore>) -> Self {
        let (outbound_tx, outbound_rx) = mpsc::channel(config.outbound_capacity.max(1));
        let (state, _) = watch::channel(ConnectionState::Idle);
        Self {
            id,
            config,
            state,
            cancel: CancellationToken::new(),
            outbound_tx,
            outbound_rx: Mutex::new(Some(outbound_rx)),
            terminal_reported: AtomicBool::new(false),
            log,
        }
    }

    /// Returns the connection identifier.
    #[inline]
    #[must_use]
    pub const fn id(&self) -> u64 {
        self.id
    }

    /// Returns the transport configuration.
    #[must_use]
    pub const fn config(&self) -> &TransportConfig {
        &self.config
    }

    /// Returns the current state.
    #[must_use]
    pub fn state(&self) -> ConnectionState {
        *self.state.borrow()
    }

    /// Subscribes to state changes.
    #[must_use]
    pub fn subscribe_state(&self) -> watch::Receiver<ConnectionState> {
        self.state.subscribe()
    }

    /// Returns a handle to the outbound queue.
    ///
    /// Telegrams pushed directly are not checked against the state; they are
    /// dropped if the connection never becomes active.
    #[must_use]
    pub fn outbound_sender(&self) -> mpsc::Sender<Telegram> {
        self.outbound_tx.clone()
    }

    /// Returns a token cancelled when this connection is told to stop or fails.
    ///
    /// Tasks tied to the connection's lifetime, such as the heartbeat timer,
    /// should select on it.
    #[must_use]
    pub fn child_token(&self) -> CancellationToken {
        self.cancel.child_token()
    }

    /// Moves the state forward; backwards moves are ignored.
    fn advance(&self, next: ConnectionState) -> bool {
        let id = self.id;
        self.state.send_if_modified(|current| {
            if next > *current {
                debug!(connection_id = id, from = %current, to = %next, "state change");
                *current = next;
                true
            } else {
                false
            }
        })
    }

    /// Connects to `endpoint` and starts the read and write loops.
    ///
    /// # Returns
    /// The queue of events observed by the loops.
    ///
    /// # Errors
    /// Returns `ConnectionError::InvalidState` if this instance already left
    /// `Idle`, or a connect, timeout, or cancellation error. On error the
    /// state is `Stopped`.
    pub async fn start(
        self: &Arc<Self>,
        endpoint: &Endpoint,
    ) -> Result<mpsc::Receiver<ConnectionEvent>, ConnectionError> {
        let started = self.state.send_if_modified(|current| {
            if *current == ConnectionState::Idle {
                *current = ConnectionState::Connecting;
                true
            } else {
                false
            }
        });
        let outbound_rx = if started {
            self.outbound_rx.lock().take()
        } else {
            None
        };
        let Some(outbound_rx) = outbound_rx else {
            return Err(ConnectionError::InvalidState(self.state()));
        };

        let addr = endpoint.to_string();
        info!(connection_id = self.id, %addr, "connecting");

        let connect = TcpStream::connect((endpoint.host(), endpoint.port()));
        let outcome = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(ConnectionError::Cancelled { addr: addr.clone() }),
            result = tokio::time::timeout(self.config.connect_timeout, connect) => match result {
                Ok(Ok(stream)) => Ok(stream),
                Ok(Err(e)) => Err(ConnectionError::Connect {
                    addr: addr.clone(),
                    reason: e.to_string(),
                }),
                Err(_) => Err(ConnectionError::Timeout {
                    addr: addr.clone(),
                    after_ms: duration_ms(self.config.connect_timeout),
                }),
            },
        };

        let stream = match outcome {
            Ok(stream) => stream,
            Err(e) => {
                warn!(connection_id = self.id, error = %e, "connect failed");
                self.advance(ConnectionState::Stopped);
                return Err(e);
            }
        };
        if let Err(e) = stream.set_nodelay(true) {
            debug!(connection_id = self.id, error = %e, "set_nodelay failed");
        }

        let (events_tx, events_rx) = mpsc::channel(self.config.event_capacity.max(1));
        self.advance(ConnectionState::Active);
        info!(connection_id = self.id, %addr, "connected");

        let this = Arc::clone(self);
        tokio::spawn(async move { this.run(stream, outbound_rx, events_tx).await });
        Ok(events_rx)
    }

    /// Requests shutdown. Returns immediately; see [`Self::wait_stopped`].
    pub fn stop(&self) {
        self.cancel.cancel();
        let id = self.id;
        self.state.send_if_modified(|current| match *current {
            ConnectionState::Idle => {
                *current = ConnectionState::Stopped;
                true
            }
            ConnectionState::Connecting | ConnectionState::Active => {
                debug!(connection_id = id, from = %current, "stop requested");
                *current = ConnectionState::Stopping;
                true
            }
            ConnectionState::Stopping | ConnectionState::Stopped => false,
        });
    }

    /// Waits up to `timeout` for the state to reach `Stopped`.
    ///
    /// # Returns
    /// `true` if the connection stopped in time.
    pub async fn wait_stopped(&self, timeout: Duration) -> bool {
        let mut rx = self.state.subscribe();
        matches!(
            tokio::time::timeout(timeout, rx.wait_for(|state| state.is_terminal())).await,
            Ok(Ok(_))
        )
    }

    /// Gives up on a connection that did not stop in time.
    ///
    /// The state is forced to `Stopped`; the loops keep winding down on their
    /// own and still close the socket.
    pub fn abandon(&self) {
        self.cancel.cancel();
        if self.advance(ConnectionState::Stopped) {
            warn!(connection_id = self.id, "abandoned connection still tearing down");
        }
    }

    /// Queues a telegram for the send loop.
    ///
    /// The telegram is encoded once up front so an internal codec failure is
    /// reported to the caller instead of ending the connection.
    ///
    /// # Errors
    /// Returns `SimError::NotActive` unless the state is `Active`, and
    /// `SimError::Internal` if the telegram cannot be encoded.
    pub async fn enqueue(&self, telegram: Telegram) -> Result<(), SimError> {
        let state = self.state();
        if !state.can_send() {
            return Err(SimError::NotActive { state });
        }
        plcsim_wire::encode(&telegram)?;
        self.outbound_tx
            .send(telegram)
            .await
            .map_err(|_| SimError::NotActive {
                state: self.state(),
            })
    }

    async fn run(
        self: Arc<Self>,
        stream: TcpStream,
        outbound: mpsc::Receiver<Telegram>,
        events: mpsc::Sender<ConnectionEvent>,
    ) {
        let _teardown = Teardown(Arc::clone(&self));
        let (reader, mut writer) = stream.into_split();

        tokio::join!(
            async {
                let exit = self.receive_loop(reader, &events).await;
                self.loop_exited("receive", exit, &events).await;
            },
            async {
                let exit = self.send_loop(&mut writer, outbound).await;
                self.loop_exited("send", exit, &events).await;
            },
        );

        if let Err(e) = writer.shutdown().await {
            debug!(connection_id = self.id, error = %e, "socket shutdown failed");
        }
        drop(writer);
        info!(connection_id = self.id, "connection closed");
    }

    async fn receive_loop(
        &self,
        mut reader: OwnedReadHalf,
        events: &mpsc::Sender<ConnectionEvent>,
    ) -> LoopExit {
        let mut buffer = ReceiveBuffer::with_capacity(self.config.max_buffered);
        let mut chunk = vec![0u8; self.config.read_chunk_size.max(1)];

        loop {
            let read = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => return LoopExit::Cancelled,
                read = reader.read(&mut chunk) => read,
            };
            let n = match read {
                Ok(0) => return LoopExit::PeerClosed,
                Ok(n) => n,
                Err(e) => return LoopExit::Failed(e.into()),
            };

            let discarded = buffer.extend(&chunk[..n]);
            if discarded > 0 {
                warn!(connection_id = self.id, discarded, "receive buffer overflow");
                if !self
                    .emit(events, ConnectionEvent::BufferOverflow { discarded })
                    .await
                {
                    return LoopExit::Cancelled;
                }
            }

            while let Some(frame) = buffer.next_frame() {
                let event = match frame {
                    Ok(telegram) => ConnectionEvent::Received(telegram),
                    Err(failure) => {
                        debug!(connection_id = self.id, reason = %failure.error, "bad frame");
                        ConnectionEvent::ParseFailed(failure)
                    }
                };
                if !self.emit(events, event).await {
                    return LoopExit::Cancelled;
                }
            }
        }
    }

    async fn send_loop(
        &self,
        writer: &mut OwnedWriteHalf,
        mut outbound: mpsc::Receiver<Telegram>,
    ) -> LoopExit {
        let mut framed = FramedWrite::new(writer, TelegramCodec::new());

        loop {
            let telegram = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => return LoopExit::Cancelled,
                next = outbound.recv() => match next {
                    Some(telegram) => telegram,
                    None => return LoopExit::Cancelled,
                },
            };

            let written = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => return LoopExit::Cancelled,
                written = framed.send(&telegram) => written,
            };
            match written {
                Ok(()) => {
                    self.log.record_outbound(telegram);
                }
                Err(CodecError::Encode(e)) => return LoopExit::Fatal(e),
                Err(CodecError::Io(e)) => return LoopExit::Failed(ConnectionError::Io(e)),
            }
        }
    }

    /// Pushes an event unless the connection is being cancelled.
    async fn emit(&self, events: &mpsc::Sender<ConnectionEvent>, event: ConnectionEvent) -> bool {
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => false,
            sent = events.send(event) => sent.is_ok(),
        }
    }

    async fn loop_exited(
        &self,
        which: &'static str,
        exit: LoopExit,
        events: &mpsc::Sender<ConnectionEvent>,
    ) {
        self.cancel.cancel();
        self.advance(ConnectionState::Stopping);

        let event = match exit {
            LoopExit::Cancelled => {
                debug!(connection_id = self.id, which, "loop cancelled");
                return;
            }
            LoopExit::PeerClosed => {
                info!(connection_id = self.id, "peer closed connection");
                ConnectionEvent::PeerClosed
            }
            LoopExit::Failed(e) => {
                error!(connection_id = self.id, which, error = %e, "connection failed");
                ConnectionEvent::Failed(e)
            }
            LoopExit::Fatal(e) => {
                error!(connection_id = self.id, which, error = %e, "codec invariant violated");
                ConnectionEvent::Fatal(e)
            }
        };

        if !self.terminal_reported.swap(true, Ordering::SeqCst) {
            // A closed queue means nobody is listening any more.
            let _ = events.send(event).await;
        }
    }
}

fn duration_ms(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use plcsim_core::telegram::LifeSignal;
    use plcsim_core::types::Direction;
    use plcsim_store::MemoryEventLog;
    use plcsim_wire::TELEGRAM_LEN;
    use tokio::net::TcpListener;

    const WAIT: Duration = Duration::from_secs(3);

    fn ping(seq: u32) -> Telegram {
        Telegram::life("EWM-MFS", "PLC-SIM", seq, LifeSignal::Ping)
    }

    fn manager(log: Arc<MemoryEventLog>) -> Arc<ConnectionManager> {
        Arc::new(ConnectionManager::new(1, TransportConfig::default(), log))
    }

    async fn listener() -> (TcpListener, Endpoint) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        (listener, Endpoint::new("127.0.0.1", u32::from(port)).unwrap())
    }

    #[tokio::test]
    async fn test_connect_and_receive() {
        let (listener, endpoint) = listener().await;
        let conn = manager(Arc::new(MemoryEventLog::new()));

        let mut events = conn.start(&endpoint).await.unwrap();
        assert_eq!(conn.state(), ConnectionState::Active);

        let (mut peer, _) = listener.accept().await.unwrap();
        peer.write_all(&plcsim_wire::encode(&ping(7)).unwrap())
            .await
            .unwrap();

        match events.recv().await.unwrap() {
            ConnectionEvent::Received(t) => assert_eq!(t.sequence(), 7),
            other => panic!("unexpected event {other:?}"),
        }

        conn.stop();
        assert!(conn.wait_stopped(WAIT).await);
    }

    #[tokio::test]
    async fn test_send_writes_frame_and_logs() {
        let (listener, endpoint) = listener().await;
        let log = Arc::new(MemoryEventLog::new());
        let conn = manager(Arc::clone(&log));

        let _events = conn.start(&endpoint).await.unwrap();
        let (mut peer, _) = listener.accept().await.unwrap();

        let pong = Telegram::life("PLC-SIM", "EWM-MFS", 1, LifeSignal::Pong);
        conn.enqueue(pong.clone()).await.unwrap();

        let mut frame = [0u8; TELEGRAM_LEN];
        peer.read_exact(&mut frame).await.unwrap();
        assert_eq!(plcsim_wire::decode(&frame).unwrap(), pong);

        // the log entry is appended right after the write completes
        tokio::time::sleep(Duration::from_millis(50)).await;
        let entries = log.snapshot();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].direction, Direction::Outbound);

        conn.stop();
        assert!(conn.wait_stopped(WAIT).await);
    }

    #[tokio::test]
    async fn test_parse_failure_does_not_stop_loop() {
        let (listener, endpoint) = listener().await;
        let conn = manager(Arc::new(MemoryEventLog::new()));
        let mut events = conn.start(&endpoint).await.unwrap();
        let (mut peer, _) = listener.accept().await.unwrap();

        peer.write_all(&[b'Z'; TELEGRAM_LEN]).await.unwrap();
        peer.write_all(&plcsim_wire::encode(&ping(2)).unwrap())
            .await
            .unwrap();

        assert!(matches!(
            events.recv().await.unwrap(),
            ConnectionEvent::ParseFailed(_)
        ));
        assert!(matches!(
            events.recv().await.unwrap(),
            ConnectionEvent::Received(_)
        ));
        assert_eq!(conn.state(), ConnectionState::Active);

        conn.stop();
        assert!(conn.wait_stopped(WAIT).await);
    }

    #[tokio::test]
    async fn test_buffer_overflow_reported_and_connection_stays_active() {
        let (listener, endpoint) = listener().await;
        let config = TransportConfig::default()
            .with_max_buffered(TELEGRAM_LEN)
            .with_read_chunk_size(8192);
        let conn = Arc::new(ConnectionManager::new(
            1,
            config,
            Arc::new(MemoryEventLog::new()),
        ));
        let mut events = conn.start(&endpoint).await.unwrap();
        let (mut peer, _) = listener.accept().await.unwrap();

        let frame = plcsim_wire::encode(&ping(1)).unwrap();
        let burst: Vec<u8> = frame.iter().copied().cycle().take(TELEGRAM_LEN * 64).collect();
        peer.write_all(&burst).await.unwrap();

        let discarded = tokio::time::timeout(WAIT, async {
            loop {
                match events.recv().await.unwrap() {
                    ConnectionEvent::BufferOverflow { discarded } => break discarded,
                    other => assert!(!other.is_terminal(), "unexpected event {other:?}"),
                }
            }
        })
        .await
        .unwrap();
        assert!(discarded > 0);
        assert_eq!(conn.state(), ConnectionState::Active);

        // drain what the burst left behind, then the loop must still be reading
        while let Ok(Some(event)) =
            tokio::time::timeout(Duration::from_millis(300), events.recv()).await
        {
            assert!(!event.is_terminal(), "unexpected event {event:?}");
        }
        peer.write_all(&plcsim_wire::encode(&ping(2)).unwrap())
            .await
            .unwrap();
        let next = tokio::time::timeout(WAIT, events.recv())
            .await
            .unwrap()
            .unwrap();
        assert!(!next.is_terminal());
        assert_eq!(conn.state(), ConnectionState::Active);

        conn.stop();
        assert!(conn.wait_stopped(WAIT).await);
    }

    #[tokio::test]
    async fn test_peer_close_stops_connection() {
        let (listener, endpoint) = listener().await;
        let conn = manager(Arc::new(MemoryEventLog::new()));
        let mut events = conn.start(&endpoint).await.unwrap();

        let (peer, _) = listener.accept().await.unwrap();
        drop(peer);

        assert_eq!(events.recv().await, Some(ConnectionEvent::PeerClosed));
        assert!(conn.wait_stopped(WAIT).await);
        assert_eq!(events.recv().await, None);
    }

    #[tokio::test]
    async fn test_stop_closes_socket() {
        let (listener, endpoint) = listener().await;
        let conn = manager(Arc::new(MemoryEventLog::new()));
        let _events = conn.start(&endpoint).await.unwrap();
        let (mut peer, _) = listener.accept().await.unwrap();

        conn.stop();
        assert!(conn.wait_stopped(WAIT).await);
        assert_eq!(conn.state(), ConnectionState::Stopped);

        let mut buf = [0u8; 1];
        assert_eq!(peer.read(&mut buf).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_connect_refused() {
        let (listener, endpoint) = listener().await;
        drop(listener);
        let conn = manager(Arc::new(MemoryEventLog::new()));

        let err = conn.start(&endpoint).await.unwrap_err();
        assert!(matches!(err, ConnectionError::Connect { .. }));
        assert_eq!(conn.state(), ConnectionState::Stopped);
    }

    #[tokio::test]
    async fn test_start_is_single_use() {
        let (_listener, endpoint) = listener().await;
        let conn = manager(Arc::new(MemoryEventLog::new()));
        let _events = conn.start(&endpoint).await.unwrap();

        assert_eq!(
            conn.start(&endpoint).await.unwrap_err(),
            ConnectionError::InvalidState(ConnectionState::Active)
        );

        conn.stop();
        assert!(conn.wait_stopped(WAIT).await);
    }

    #[tokio::test]
    async fn test_enqueue_requires_active() {
        let conn = manager(Arc::new(MemoryEventLog::new()));
        let err = conn.enqueue(ping(1)).await.unwrap_err();
        assert!(matches!(
            err,
            SimError::NotActive {
                state: ConnectionState::Idle
            }
        ));
    }

    #[tokio::test]
    async fn test_stop_before_start() {
        let conn = manager(Arc::new(MemoryEventLog::new()));
        conn.stop();
        assert_eq!(conn.state(), ConnectionState::Stopped);
        assert!(conn.wait_stopped(Duration::from_millis(10)).await);
    }

    #[tokio::test]
    async fn test_abandon_forces_stopped() {
        let (_listener, endpoint) = listener().await;
        let conn = manager(Arc::new(MemoryEventLog::new()));
        let _events = conn.start(&endpoint).await.unwrap();

        conn.abandon();
        assert_eq!(conn.state(), ConnectionState::Stopped);
        assert!(conn.enqueue(ping(1)).await.is_err());
    }

    #[tokio::test]
    async fn test_state_never_moves_backwards() {
        let conn = manager(Arc::new(MemoryEventLog::new()));
        assert!(conn.advance(ConnectionState::Stopping));
        assert!(!conn.advance(ConnectionState::Active));
        assert_eq!(conn.state(), ConnectionState::Stopping);
    }
}
