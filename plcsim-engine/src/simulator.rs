/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 16/10/26
******************************************************************************/

//! Device simulator facade.
//!
//! A [`Simulator`] ties one [`SessionController`] and one event log to a
//! succession of [`ConnectionManager`] instances. Each connect creates a fresh
//! instance; the previous one is stopped and given a bounded time to finish
//! before the new one starts, so two instances are never active at once.
//!
//! A connect attempt in progress is visible to later `connect` and
//! `disconnect` calls, which cancel it instead of waiting for it to time out.
//!
//! Per connection the simulator runs an event pump, which applies the session
//! reactions to inbound telegrams in arrival order, and optionally a heartbeat
//! timer. Both end with the connection.

use crate::application::Observer;
use parking_lot::Mutex;
use plcsim_core::error::{ConnectionError, SimError, ValidationError};
use plcsim_core::telegram::{MoveOrder, Telegram};
use plcsim_core::types::{ConnectionState, TelegramKind};
use plcsim_session::config::SessionConfig;
use plcsim_session::controller::SessionController;
use plcsim_store::{EventLogEntry, EventStore, ExportError, MemoryEventLog};
use plcsim_transport::{ConnectionEvent, ConnectionManager, Endpoint, TransportConfig};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::{broadcast, mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// State shared between the facade and its per-connection tasks.
struct Shared {
    controller: Arc<SessionController>,
    log: Arc<MemoryEventLog>,
    observer: Arc<dyn Observer>,
}

impl Shared {
    async fn diagnostic(&self, detail: &str) {
        self.log.record_diagnostic(detail);
        self.observer.on_diagnostic(detail).await;
    }
}

/// A running heartbeat timer.
struct Heartbeat {
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

impl Heartbeat {
    fn start(controller: &Arc<SessionController>, connection: &ConnectionManager) -> Self {
        let cancel = connection.child_token();
        let handle = controller.spawn_heartbeat(connection.outbound_sender(), cancel.clone());
        Self { cancel, handle }
    }

    fn stop(self) {
        self.cancel.cancel();
        drop(self.handle);
    }

    fn is_running(&self) -> bool {
        !self.cancel.is_cancelled() && !self.handle.is_finished()
    }
}

/// The connection currently owned by the simulator and its tasks.
struct Session {
    connection: Arc<ConnectionManager>,
    endpoint: Endpoint,
    pump: JoinHandle<()>,
    heartbeat: Option<Heartbeat>,
}

/// Device simulator speaking the fixed-width telegram protocol to one host.
pub struct Simulator {
    shared: Arc<Shared>,
    transport: TransportConfig,
    stop_timeout: Duration,
    next_id: AtomicU64,
    ended: AtomicBool,
    epoch: AtomicU64,
    lifecycle: tokio::sync::Mutex<()>,
    connecting: Mutex<Option<Arc<ConnectionManager>>>,
    current: Mutex<Option<Session>>,
}

impl std::fmt::Debug for Simulator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Simulator")
            .field("device_id", &self.shared.controller.device_id())
            .field("host_id", &self.shared.controller.host_id())
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

impl Simulator {
    /// Creates a simulator. Use [`crate::SimulatorBuilder`] for the fluent form.
    ///
    /// # Arguments
    /// * `session` - Identities and automatic behaviour
    /// * `transport` - Settings applied to every connection instance
    /// * `stop_timeout` - Bound on waiting for a connection to stop
    /// * `log_capacity` - Number of event log entries retained
    /// * `observer` - Callback handler
    #[must_use]
    pub fn new(
        session: SessionConfig,
        transport: TransportConfig,
        stop_timeout: Duration,
        log_capacity: usize,
        observer: Arc<dyn Observer>,
    ) -> Self {
        Self {
            shared: Arc::new(Shared {
                controller: Arc::new(SessionController::new(session)),
                log: Arc::new(MemoryEventLog::with_capacity(log_capacity)),
                observer,
            }),
            transport,
            stop_timeout,
            next_id: AtomicU64::new(0),
            ended: AtomicBool::new(false),
            epoch: AtomicU64::new(0),
            lifecycle: tokio::sync::Mutex::new(()),
            connecting: Mutex::new(None),
            current: Mutex::new(None),
        }
    }

    /// Returns the session controller.
    #[must_use]
    pub fn controller(&self) -> &Arc<SessionController> {
        &self.shared.controller
    }

    /// Returns the event log.
    #[must_use]
    pub fn log(&self) -> &Arc<MemoryEventLog> {
        &self.shared.log
    }

    /// Subscribes to event log entries appended from now on.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<EventLogEntry> {
        self.shared.log.subscribe()
    }

    /// Returns the state of the current connection.
    ///
    /// `Idle` before the first connect attempt, `Stopped` after a failed
    /// attempt or a disconnect.
    #[must_use]
    pub fn state(&self) -> ConnectionState {
        if let Some(connection) = self.connecting.lock().as_ref() {
            return connection.state();
        }
        if let Some(session) = self.current.lock().as_ref() {
            return session.connection.state();
        }
        if self.ended.load(Ordering::Acquire) {
            ConnectionState::Stopped
        } else {
            ConnectionState::Idle
        }
    }

    /// Returns the endpoint of the current connection, if any.
    #[must_use]
    pub fn endpoint(&self) -> Option<Endpoint> {
        self.current
            .lock()
            .as_ref()
            .map(|session| session.endpoint.clone())
    }

    /// Connects to a host, replacing any existing connection.
    ///
    /// The inputs are validated before any I/O; on failure nothing changes.
    /// A connect attempt still in progress is cancelled. An existing
    /// connection is stopped first and given the stop timeout to finish,
    /// after which it is abandoned. Only then is the new connection attempted,
    /// so no two connections are ever active together.
    ///
    /// # Arguments
    /// * `host` - Host name or address, surrounding whitespace ignored
    /// * `port` - TCP port, `1..=65535`
    ///
    /// # Errors
    /// Returns `SimError::Validation` for a bad host or port, and
    /// `SimError::Connection` if the connect attempt fails or is cancelled by
    /// a later `connect` or `disconnect`. Both are also recorded as
    /// diagnostics.
    pub async fn connect(&self, host: &str, port: u32) -> Result<(), SimError> {
        let endpoint = match Endpoint::new(host, port) {
            Ok(endpoint) => endpoint,
            Err(e) => return Err(self.reject(e).await),
        };

        let ticket = self.cancel_pending();
        let _lifecycle = self.lifecycle.lock().await;
        self.shutdown_current().await;

        let id = self.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        self.ended.store(true, Ordering::Release);
        let log: Arc<dyn EventStore> = Arc::clone(&self.shared.log) as Arc<dyn EventStore>;
        let connection = Arc::new(ConnectionManager::new(id, self.transport.clone(), log));
        *self.connecting.lock() = Some(Arc::clone(&connection));
        self.shared
            .observer
            .on_state_changed(id, ConnectionState::Connecting)
            .await;

        let superseded = || self.epoch.load(Ordering::SeqCst) != ticket;
        let cancelled = || ConnectionError::Cancelled {
            addr: endpoint.to_string(),
        };
        let started = if superseded() {
            connection.stop();
            Err(cancelled())
        } else {
            // A stop landing before `start` leaves the instance Stopped.
            connection.start(&endpoint).await.map_err(|e| match e {
                ConnectionError::InvalidState(_) if superseded() => cancelled(),
                e => e,
            })
        };
        self.connecting.lock().take();
        let events = match started {
            Ok(events) => events,
            Err(e) => {
                self.shared
                    .diagnostic(&format!("Connection to {endpoint} failed: {e}"))
                    .await;
                self.shared
                    .observer
                    .on_state_changed(id, ConnectionState::Stopped)
                    .await;
                return Err(e.into());
            }
        };

        self.shared
            .diagnostic(&format!("Connected to {endpoint}"))
            .await;
        self.shared
            .observer
            .on_state_changed(id, ConnectionState::Active)
            .await;

        let pump = tokio::spawn(pump(
            Arc::clone(&self.shared),
            Arc::clone(&connection),
            events,
            connection.subscribe_state(),
        ));
        let heartbeat = self
            .shared
            .controller
            .auto_heartbeat()
            .then(|| Heartbeat::start(&self.shared.controller, &connection));

        info!(connection_id = id, %endpoint, "simulator connected");
        *self.current.lock() = Some(Session {
            connection,
            endpoint,
            pump,
            heartbeat,
        });
        Ok(())
    }

    /// Disconnects from the host.
    ///
    /// Waits up to the stop timeout for the connection to finish. Afterwards
    /// the state is `Stopped` in every case.
    pub async fn disconnect(&self) {
        self.cancel_pending();
        let _lifecycle = self.lifecycle.lock().await;
        self.ended.store(true, Ordering::Release);
        self.shutdown_current().await;
    }

    /// Queues a telegram for sending.
    ///
    /// # Errors
    /// Returns `SimError::NotActive` when no connection is active, recorded
    /// as a "Not connected" diagnostic, and `SimError::Internal` if the
    /// telegram cannot be encoded.
    pub async fn send_telegram(&self, telegram: Telegram) -> Result<(), SimError> {
        self.send_with(move |_| telegram).await
    }

    /// Sends a PING to the host.
    ///
    /// # Errors
    /// See [`Self::send_telegram`].
    pub async fn send_ping(&self) -> Result<(), SimError> {
        self.send_with(SessionController::ping).await
    }

    /// Sends a confirmation for a move order, regardless of auto-confirm.
    ///
    /// # Errors
    /// See [`Self::send_telegram`].
    pub async fn send_confirm_for(&self, order: &MoveOrder) -> Result<(), SimError> {
        self.send_with(|controller| controller.confirm_for(order))
            .await
    }

    /// Sends the manual error report for a move order.
    ///
    /// # Errors
    /// See [`Self::send_telegram`].
    pub async fn send_error_for(&self, order: &MoveOrder) -> Result<(), SimError> {
        self.send_with(|controller| controller.error_for(order))
            .await
    }

    /// Sends a telegram of any kind with free-form data.
    ///
    /// # Errors
    /// See [`Self::send_telegram`].
    pub async fn compose_and_send(&self, kind: TelegramKind, data: &str) -> Result<(), SimError> {
        self.send_with(|controller| controller.compose(kind, data))
            .await
    }

    /// Turns automatic confirmation of move orders on or off.
    pub fn set_auto_confirm(&self, enabled: bool) {
        self.shared.controller.set_auto_confirm(enabled);
    }

    /// Turns the automatic heartbeat on or off.
    ///
    /// Takes effect immediately on an active connection. Enabling a running
    /// heartbeat changes nothing.
    pub async fn set_auto_heartbeat(&self, enabled: bool) {
        self.shared.controller.set_auto_heartbeat(enabled);
        self.sync_heartbeat(false);
    }

    /// Changes the heartbeat interval, clamped to at least one second.
    ///
    /// A running heartbeat restarts with the new interval, keeping at least
    /// the new interval after its last PING.
    ///
    /// # Returns
    /// The interval actually applied.
    pub async fn set_heartbeat_interval(&self, interval: Duration) -> Duration {
        let applied = self.shared.controller.set_heartbeat_interval(interval);
        self.sync_heartbeat(true);
        applied
    }

    /// Empties the event log and resets its counters.
    pub fn clear_log(&self) {
        self.shared.log.clear();
    }

    /// Writes the event log as a tab-separated file into `dir`.
    ///
    /// # Returns
    /// The path written, or `None` when the log is empty.
    ///
    /// # Errors
    /// Returns `ExportError::Write` if the file cannot be written.
    pub async fn export_to_dir(&self, dir: &Path) -> Result<Option<PathBuf>, ExportError> {
        let written = plcsim_store::export_to_dir(self.shared.log.as_ref(), dir)?;
        match &written {
            Some(path) => {
                self.shared
                    .diagnostic(&format!("Exported log to {}", path.display()))
                    .await;
            }
            None => debug!("export skipped, event log is empty"),
        }
        Ok(written)
    }

    async fn reject(&self, error: ValidationError) -> SimError {
        self.shared
            .diagnostic(&format!("Invalid connection settings: {error}"))
            .await;
        error.into()
    }

    async fn send_with<F>(&self, build: F) -> Result<(), SimError>
    where
        F: FnOnce(&SessionController) -> Telegram,
    {
        let connection = self
            .current
            .lock()
            .as_ref()
            .map(|session| Arc::clone(&session.connection))
            .filter(|connection| connection.state().can_send());
        let result = match connection {
            Some(connection) => connection.enqueue(build(&self.shared.controller)).await,
            None => Err(SimError::NotActive {
                state: self.state(),
            }),
        };

        match &result {
            Ok(()) => {}
            Err(SimError::NotActive { .. }) => self.shared.diagnostic("Not connected").await,
            Err(e) => self.shared.diagnostic(&format!("Send failed: {e}")).await,
        }
        result
    }

    /// Starts, stops or, with `restart`, replaces the heartbeat to match the settings.
    fn sync_heartbeat(&self, restart: bool) {
        let controller = &self.shared.controller;
        let mut current = self.current.lock();
        let Some(session) = current.as_mut() else {
            return;
        };
        let wanted = controller.auto_heartbeat() && session.connection.state().can_send();
        let running = session.heartbeat.as_ref().is_some_and(Heartbeat::is_running);
        if wanted && running && !restart {
            return;
        }
        if let Some(heartbeat) = session.heartbeat.take() {
            heartbeat.stop();
        }
        if wanted {
            session.heartbeat = Some(Heartbeat::start(controller, &session.connection));
        }
    }

    /// Cancels a connect attempt in progress.
    ///
    /// # Returns
    /// The new epoch. A `connect` holding an older one stops its instance.
    fn cancel_pending(&self) -> u64 {
        let ticket = self.epoch.fetch_add(1, Ordering::SeqCst) + 1;
        if let Some(connection) = self.connecting.lock().as_ref() {
            debug!(connection_id = connection.id(), "cancelling connect in progress");
            connection.stop();
        }
        ticket
    }

    /// Stops the current connection and waits for its tasks.
    ///
    /// Must be called with the lifecycle lock held.
    async fn shutdown_current(&self) {
        let Some(session) = self.current.lock().take() else {
            return;
        };
        let Session {
            connection,
            mut pump,
            heartbeat,
            ..
        } = session;
        let deadline = Instant::now() + self.stop_timeout;

        if let Some(heartbeat) = heartbeat {
            heartbeat.stop();
        }
        connection.stop();

        if !connection.wait_stopped(self.stop_timeout).await {
            connection.abandon();
            warn!(connection_id = connection.id(), "connection did not stop in time");
            self.shared
                .diagnostic(&format!(
                    "Connection {} did not stop within {} ms, abandoned",
                    connection.id(),
                    self.stop_timeout.as_millis()
                ))
                .await;
        }

        let remaining = deadline.saturating_duration_since(Instant::now());
        if tokio::time::timeout(remaining, &mut pump).await.is_err() {
            pump.abort();
            self.shared.diagnostic("Disconnected").await;
        }
    }
}

/// Applies session reactions to connection events until the connection ends.
async fn pump(
    shared: Arc<Shared>,
    connection: Arc<ConnectionManager>,
    mut events: mpsc::Receiver<ConnectionEvent>,
    mut state: watch::Receiver<ConnectionState>,
) {
    let id = connection.id();
    let mut last_state = *state.borrow_and_update();
    let mut watching = true;

    loop {
        tokio::select! {
            event = events.recv() => match event {
                Some(event) => handle_event(&shared, &connection, event).await,
                None => break,
            },
            changed = state.changed(), if watching => {
                if changed.is_err() {
                    watching = false;
                    continue;
                }
                let now = *state.borrow_and_update();
                if now != last_state {
                    last_state = now;
                    shared.observer.on_state_changed(id, now).await;
                }
            }
        }
    }

    let final_state = connection.state();
    if final_state != last_state {
        shared.observer.on_state_changed(id, final_state).await;
    }
    shared.diagnostic("Disconnected").await;
    debug!(connection_id = id, "event pump finished");
}

async fn handle_event(shared: &Shared, connection: &ConnectionManager, event: ConnectionEvent) {
    match event {
        ConnectionEvent::Received(telegram) => {
            let reaction = shared.controller.on_inbound(&telegram);
            let mut entry = EventLogEntry::inbound(telegram.clone());
            if let Some(note) = reaction.note() {
                entry = entry.with_detail(note);
            }
            shared.log.append(entry);
            shared.observer.on_telegram(&telegram, &reaction).await;

            if let Some(reply) = reaction.into_reply() {
                match connection.enqueue(reply).await {
                    Ok(()) => {}
                    Err(SimError::NotActive { state }) => {
                        debug!(connection_id = connection.id(), %state, "reply dropped");
                    }
                    Err(e) => shared.diagnostic(&format!("Reply not sent: {e}")).await,
                }
            }
        }
        ConnectionEvent::ParseFailed(failure) => {
            shared
                .diagnostic(&format!("Parse failure: {failure}"))
                .await;
        }
        ConnectionEvent::BufferOverflow { discarded } => {
            shared
                .diagnostic(&format!(
                    "Receive buffer overflow, discarded {discarded} bytes"
                ))
                .await;
        }
        ConnectionEvent::PeerClosed => shared.diagnostic("Connection closed by host").await,
        ConnectionEvent::Failed(e) => shared.diagnostic(&format!("Connection error: {e}")).await,
        ConnectionEvent::Fatal(e) => shared.diagnostic(&format!("Internal error: {e}")).await,
    }
}
