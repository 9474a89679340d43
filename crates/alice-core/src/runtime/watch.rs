//! Tracks the connection the session is waiting on

use parking_lot::Mutex;
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::signal::SignalResolver;

/// Connection states that mean the handshake finished
const READY_STATES: &[&str] = &["completed", "response-sent", "active"];

const FAILED_STATES: &[&str] = &["abandoned"];

/// Holds at most one pending readiness resolver and the connection it
/// belongs to.
#[derive(Debug, Default)]
pub struct ConnectionWatch {
    inner: Mutex<WatchState>,
}

#[derive(Debug, Default)]
struct WatchState {
    pending: Option<SignalResolver>,
    connection_id: Option<String>,
}

impl ConnectionWatch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Arm the watch for a new invitation.
    ///
    /// Forgets the previously tracked connection. Fails if a resolver from an
    /// earlier invitation is still pending.
    pub fn arm(&self, resolver: SignalResolver) -> Result<()> {
        let mut state = self.inner.lock();
        if state.pending.is_some() {
            return Err(Error::SignalPending);
        }
        state.pending = Some(resolver);
        state.connection_id = None;
        Ok(())
    }

    /// Drop a pending resolver without resolving it
    pub fn disarm(&self) {
        self.inner.lock().pending = None;
    }

    /// Remember which connection the pending resolver waits for
    pub fn track(&self, connection_id: &str) {
        let mut state = self.inner.lock();
        if state.connection_id.as_deref() != Some(connection_id) {
            debug!("Tracking connection {}", connection_id);
            state.connection_id = Some(connection_id.to_string());
        }
    }

    pub fn connection_id(&self) -> Option<String> {
        self.inner.lock().connection_id.clone()
    }

    pub fn is_pending(&self) -> bool {
        self.inner.lock().pending.is_some()
    }

    /// Feed a connection state change from the agent.
    ///
    /// Returns `Some(outcome)` when this change resolved the pending signal.
    pub fn observe(&self, connection_id: &str, state: &str) -> Option<bool> {
        let mut watch = self.inner.lock();

        if watch.connection_id.is_none() && state == "invitation-received" {
            watch.connection_id = Some(connection_id.to_string());
        }

        if watch.connection_id.as_deref() != Some(connection_id) {
            return None;
        }

        let outcome = if READY_STATES.contains(&state) {
            true
        } else if FAILED_STATES.contains(&state) {
            false
        } else {
            return None;
        };

        let resolver = watch.pending.take()?;
        if outcome {
            info!("Connected: {}", connection_id);
        } else {
            info!("Connection {} was abandoned", connection_id);
        }
        resolver.resolve(outcome);
        Some(outcome)
    }
}
