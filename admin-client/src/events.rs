use std::time::Duration;

use tokio::sync::broadcast;
use tracing::debug;

const EVENT_CAPACITY: usize = 32;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RedirectReason {
    SessionExpired,
    LoggedOut,
}

/// Process-wide notifications any UI layer may render.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientEvent {
    /// The backend answered 429. The request was not retried.
    RateLimited { retry_after: Option<Duration> },
    /// Full navigation the host must perform, e.g. back to `/login`.
    Redirect {
        to: &'static str,
        reason: RedirectReason,
    },
}

#[derive(Debug, Clone)]
pub struct EventBus {
    sender: broadcast::Sender<ClientEvent>,
}

impl EventBus {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(EVENT_CAPACITY);
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ClientEvent> {
        self.sender.subscribe()
    }

    /// Nobody listening is fine.
    pub fn emit(&self, event: ClientEvent) {
        debug!(?event, "client event");
        let _ = self.sender.send(event);
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}
