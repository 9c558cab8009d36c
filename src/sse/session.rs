//! Per-connection stream state.
//!
//! A [`StreamSession`] is created for exactly one connection attempt and is
//! consumed by it. Other tasks observe or cancel it through a cloned
//! [`SessionHandle`].

use std::fmt;
use std::sync::{Arc, Mutex};

use tokio::sync::watch;
use uuid::Uuid;

use super::decoder::LineDecoder;

/// Lifecycle of one connection attempt.
///
/// `Idle -> Connecting -> Streaming -> {Completed | Aborted | Errored}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Idle,
    Connecting,
    Streaming,
    Completed,
    Aborted,
    Errored,
}

impl ConnectionState {
    /// Terminal states never transition again.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ConnectionState::Completed | ConnectionState::Aborted | ConnectionState::Errored
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ConnectionState::Idle => "idle",
            ConnectionState::Connecting => "connecting",
            ConnectionState::Streaming => "streaming",
            ConnectionState::Completed => "completed",
            ConnectionState::Aborted => "aborted",
            ConnectionState::Errored => "errored",
        }
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug)]
struct Shared {
    cancel: watch::Sender<bool>,
    state: Mutex<ConnectionState>,
}

impl Shared {
    fn state(&self) -> ConnectionState {
        *self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Move to `next` unless already terminal. Returns whether it moved.
    fn transition(&self, next: ConnectionState) -> bool {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        if state.is_terminal() {
            return false;
        }
        *state = next;
        true
    }
}

/// State owned by a single connection attempt.
#[derive(Debug)]
pub struct StreamSession {
    id: Uuid,
    shared: Arc<Shared>,
    cancel_rx: watch::Receiver<bool>,
    pub(crate) decoder: LineDecoder,
}

impl StreamSession {
    pub fn new() -> Self {
        let (cancel, cancel_rx) = watch::channel(false);
        Self {
            id: Uuid::new_v4(),
            shared: Arc::new(Shared {
                cancel,
                state: Mutex::new(ConnectionState::Idle),
            }),
            cancel_rx,
            decoder: LineDecoder::new(),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    /// A handle for aborting or observing this session from elsewhere.
    pub fn handle(&self) -> SessionHandle {
        SessionHandle {
            id: self.id,
            shared: Arc::clone(&self.shared),
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.shared.state()
    }

    pub fn is_cancelled(&self) -> bool {
        *self.cancel_rx.borrow()
    }

    pub(crate) fn transition(&self, next: ConnectionState) -> bool {
        self.shared.transition(next)
    }

    /// Resolves once `abort()` has been called on any handle.
    pub(crate) async fn cancelled(&mut self) {
        if self.cancel_rx.wait_for(|cancelled| *cancelled).await.is_err() {
            // The sender lives in `shared`, which we hold; this never resolves.
            std::future::pending::<()>().await;
        }
    }
}

impl Default for StreamSession {
    fn default() -> Self {
        Self::new()
    }
}

/// Cloneable control handle for a [`StreamSession`].
#[derive(Debug, Clone)]
pub struct SessionHandle {
    id: Uuid,
    shared: Arc<Shared>,
}

impl SessionHandle {
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn state(&self) -> ConnectionState {
        self.shared.state()
    }

    pub fn is_aborted(&self) -> bool {
        *self.shared.cancel.borrow()
    }

    /// Cancel the session. Safe to call any number of times, and a no-op
    /// once the session has already completed or errored.
    pub fn abort(&self) {
        let already = self.shared.cancel.send_replace(true);
        if already {
            return;
        }
        if self.shared.transition(ConnectionState::Aborted) {
            tracing::debug!(session = %self.id, "Stream aborted");
        }
    }
}
