//! Connection liveness tracking.
//!
//! Most console protocols are silent-by-default: a session that has gone
//! dead (half-open TCP, unplugged cable, crashed console firmware) looks
//! identical to a healthy idle one. [`LivenessWatchdog`] records when
//! inbound traffic was last seen and answers "is this connection still
//! healthy" against a fixed timeout, without any blocking round-trip.
//!
//! The watchdog is advisory: it never forces a disconnect. The caller is
//! responsible for sending periodic keep-alive frames on an interval
//! shorter than the console's own session timeout so there is traffic to
//! observe in the first place.

use std::sync::Mutex;
use std::time::{Duration, Instant};

/// Time source for the watchdog. Injected so tests can control time
/// instead of sleeping against the wall clock.
pub trait Clock: Send + Sync {
    /// The current instant.
    fn now(&self) -> Instant;
}

/// The real wall clock.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// Tracks the last-observed inbound traffic for one connection.
pub struct LivenessWatchdog {
    last_seen: Mutex<Option<Instant>>,
    timeout: Duration,
    clock: Box<dyn Clock>,
}

impl LivenessWatchdog {
    /// Create a watchdog using the system clock.
    pub fn new(timeout: Duration) -> Self {
        Self::with_clock(timeout, Box::new(SystemClock))
    }

    /// Create a watchdog with an injected clock (tests).
    pub fn with_clock(timeout: Duration, clock: Box<dyn Clock>) -> Self {
        LivenessWatchdog {
            last_seen: Mutex::new(None),
            timeout,
            clock,
        }
    }

    /// Record that inbound traffic was observed now.
    ///
    /// Called by the receive path for every decoded frame (ideally
    /// keep-alive frames, but any traffic proves the peer is alive).
    pub fn mark_seen(&self) {
        let now = self.clock.now();
        let mut last = self.last_seen.lock().unwrap_or_else(|e| e.into_inner());
        *last = Some(now);
    }

    /// Whether traffic has been seen within the timeout window.
    ///
    /// False until the first [`mark_seen`](LivenessWatchdog::mark_seen).
    pub fn is_healthy(&self) -> bool {
        let last = self.last_seen.lock().unwrap_or_else(|e| e.into_inner());
        match *last {
            Some(seen) => self.clock.now().duration_since(seen) < self.timeout,
            None => false,
        }
    }

    /// The instant traffic was last observed, if ever.
    pub fn last_seen(&self) -> Option<Instant> {
        *self.last_seen.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// The configured liveness timeout.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

impl std::fmt::Debug for LivenessWatchdog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LivenessWatchdog")
            .field("last_seen", &self.last_seen)
            .field("timeout", &self.timeout)
            .finish()
    }
}
