//! In-process broadcast signals connecting the auth layer to its dependents.
//!
//! Two payload-less signals exist: `LogoutRequested`, raised when a request
//! is refused because the stored token has expired, and `UserLoggedOut`,
//! raised after the session has been torn down. Delivery is fire-and-forget
//! to every current subscriber; emitting with no subscribers is a no-op.

use tokio::sync::broadcast;

/// Capacity of the signal channel. Signals are rare (one per logout), so a
/// small buffer is plenty; a lagged subscriber just skips stale signals.
const SIGNAL_CAPACITY: usize = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthSignal {
    /// The stored token was found expired outside the session manager.
    /// The session manager reacts by running its logout procedure.
    LogoutRequested,
    /// The session has been torn down. Tenant selection and any other
    /// session-scoped state must reset; shells treat this as "go home".
    UserLoggedOut,
}

/// Clonable handle to the process-wide signal channel.
#[derive(Clone)]
pub struct SignalBus {
    tx: broadcast::Sender<AuthSignal>,
}

impl SignalBus {
    pub fn new() -> Self {
        let (tx, _rx) = broadcast::channel(SIGNAL_CAPACITY);
        Self { tx }
    }

    /// Emit a signal to all current subscribers.
    pub fn emit(&self, signal: AuthSignal) {
        // send() errors only when there are no subscribers, which is fine
        let _ = self.tx.send(signal);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<AuthSignal> {
        self.tx.subscribe()
    }
}

impl Default for SignalBus {
    fn default() -> Self {
        Self::new()
    }
}
