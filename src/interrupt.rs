//! Per-turn cancellation driven by Ctrl+C.
//!
//! The signal handler runs on its own thread and cannot reach into the read
//! loop directly. Instead each turn arms a fresh [`CancellationToken`]; the
//! handler cancels whichever token is current. Tokens are single-use, so a
//! Ctrl+C that lands between turns cannot leak into the next one.

use std::sync::{Arc, Mutex};

use tokio_util::sync::CancellationToken;

/// Shared handle to the cancellation token of the turn in flight.
#[derive(Clone, Debug, Default)]
pub struct Interrupt {
    current: Arc<Mutex<CancellationToken>>,
}

impl Interrupt {
    /// Creates a new interrupt handle with an idle token.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the current token with a fresh one and returns it.
    pub fn arm(&self) -> CancellationToken {
        let token = CancellationToken::new();
        let mut current = self.current.lock().unwrap_or_else(|e| e.into_inner());
        *current = token.clone();
        token
    }

    /// Cancels the current token.
    pub fn trigger(&self) {
        let current = self.current.lock().unwrap_or_else(|e| e.into_inner());
        current.cancel();
    }
}
