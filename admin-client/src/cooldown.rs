use std::sync::Mutex;
use std::time::Duration;

use tokio::time::Instant;

/// Rate limiter for a resend button: one action per window.
#[derive(Debug)]
pub struct ResendCooldown {
    window: Duration,
    last: Mutex<Option<Instant>>,
}

impl ResendCooldown {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            last: Mutex::new(None),
        }
    }

    pub fn remaining(&self) -> Duration {
        let guard = self.last.lock().expect("mutex poisoned");
        match *guard {
            Some(started) => self.window.saturating_sub(started.elapsed()),
            None => Duration::ZERO,
        }
    }

    /// Start a new window, or report how long is left of the current one.
    pub fn try_start(&self) -> Result<(), Duration> {
        let mut guard = self.last.lock().expect("mutex poisoned");
        if let Some(started) = *guard {
            let remaining = self.window.saturating_sub(started.elapsed());
            if !remaining.is_zero() {
                return Err(remaining);
            }
        }
        *guard = Some(Instant::now());
        Ok(())
    }

    /// Forget the current window, e.g. when the guarded call failed.
    pub fn reset(&self) {
        *self.last.lock().expect("mutex poisoned") = None;
    }
}
