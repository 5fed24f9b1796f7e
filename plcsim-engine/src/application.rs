/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 16/10/26
******************************************************************************/

//! Observer callback interface.
//!
//! This module defines the callbacks a presentation layer implements to follow
//! the simulator without polling. Callbacks run on the simulator's event pump
//! after the corresponding log entry is appended, so a slow observer delays
//! processing of later telegrams.

use async_trait::async_trait;
use plcsim_core::telegram::Telegram;
use plcsim_core::types::ConnectionState;
use plcsim_session::Reaction;

/// Callbacks for simulator activity.
#[async_trait]
pub trait Observer: Send + Sync {
    /// Called when a connection changes state.
    ///
    /// # Arguments
    /// * `connection_id` - Identifier of the connection instance
    /// * `state` - The new state
    async fn on_state_changed(&self, connection_id: u64, state: ConnectionState);

    /// Called for every decoded inbound telegram.
    ///
    /// # Arguments
    /// * `telegram` - The received telegram
    /// * `reaction` - What the session decided to do about it
    async fn on_telegram(&self, telegram: &Telegram, reaction: &Reaction);

    /// Called for every diagnostic entry.
    ///
    /// # Arguments
    /// * `detail` - The diagnostic text
    async fn on_diagnostic(&self, detail: &str);
}

/// Default no-op observer.
#[derive(Debug, Default)]
pub struct NoOpObserver;

#[async_trait]
impl Observer for NoOpObserver {
    async fn on_state_changed(&self, _connection_id: u64, _state: ConnectionState) {}

    async fn on_telegram(&self, _telegram: &Telegram, _reaction: &Reaction) {}

    async fn on_diagnostic(&self, _detail: &str) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use plcsim_core::telegram::LifeSignal;

    #[tokio::test]
    async fn test_noop_observer() {
        let observer = NoOpObserver;
        let ping = Telegram::life("EWM-MFS", "PLC-SIM", 1, LifeSignal::Ping);

        observer.on_state_changed(1, ConnectionState::Active).await;
        observer.on_telegram(&ping, &Reaction::Ignore).await;
        observer.on_diagnostic("hello").await;
    }
}
