//! Request/response correlation.
//!
//! Console protocols answer requests asynchronously: the reply to "give me
//! the full state" arrives on the same stream as unsolicited fader moves
//! and metering, possibly out of order with replies to other requests.
//! [`RequestCorrelator`] keeps a pending set of predicate-matched requests;
//! the receive loop offers every decoded frame to the set, and the first
//! registered matching entry resolves with it.
//!
//! Resolution is exactly-once by construction: whichever party (matching
//! frame, cancellation, timeout, or connection teardown) removes the entry
//! from the pending set under the lock is the only one that sends the
//! outcome.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;

use mixlib_core::error::{Error, Result};
use mixlib_core::frame::Frame;

/// Predicate deciding whether an inbound frame answers a pending request.
pub type Matcher = Box<dyn Fn(&Frame) -> bool + Send + Sync>;

/// How a pending request ended.
#[derive(Debug, Clone)]
enum ReplyOutcome {
    /// A matching frame arrived.
    Matched(Frame),
    /// The caller cancelled or timed out.
    Cancelled,
    /// The connection was torn down with the request outstanding.
    ConnectionLost,
}

struct PendingEntry {
    id: u64,
    key: Option<String>,
    matcher: Matcher,
    /// Capacity-1 broadcast so a keyed re-registration can subscribe to an
    /// in-flight request and share its resolution.
    tx: broadcast::Sender<ReplyOutcome>,
}

/// Lock the pending set, recovering from a poisoned lock (a panic in a
/// matcher must not wedge the whole connection).
fn lock_set(pending: &Mutex<PendingSet>) -> std::sync::MutexGuard<'_, PendingSet> {
    pending.lock().unwrap_or_else(|e| e.into_inner())
}

#[derive(Default)]
struct PendingSet {
    /// Insertion order decides match priority.
    entries: Vec<PendingEntry>,
    next_id: u64,
}

impl PendingSet {
    /// Remove an entry by id, returning its sender if it was still pending.
    fn take(&mut self, id: u64) -> Option<broadcast::Sender<ReplyOutcome>> {
        let idx = self.entries.iter().position(|e| e.id == id)?;
        Some(self.entries.remove(idx).tx)
    }
}

/// Predicate-matched pending request collection for one connection.
///
/// Cheap to clone; clones share the same pending set. `offer` is
/// synchronous bookkeeping and never blocks the receive loop on anything
/// but the short-lived set lock.
#[derive(Clone, Default)]
pub struct RequestCorrelator {
    pending: Arc<Mutex<PendingSet>>,
}

impl RequestCorrelator {
    /// Create an empty correlator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a pending request resolved by the first frame `matcher`
    /// accepts.
    pub fn register(&self, matcher: Matcher) -> PendingReply {
        self.register_inner(None, matcher)
    }

    /// Register a pending request under a logical key, enforcing at most
    /// one in flight per key.
    ///
    /// If a request with the same key is already pending, the returned
    /// handle shares that request's resolution and
    /// [`newly_registered`](KeyedRegistration::newly_registered) is false
    /// -- the caller must not send the request bytes again.
    pub fn register_keyed(&self, key: &str, matcher: Matcher) -> KeyedRegistration {
        let mut set = lock_set(&self.pending);
        if let Some(existing) = set.entries.iter().find(|e| e.key.as_deref() == Some(key)) {
            tracing::debug!(key = %key, "joining request already in flight");
            return KeyedRegistration {
                reply: PendingReply {
                    id: existing.id,
                    rx: existing.tx.subscribe(),
                    pending: Arc::clone(&self.pending),
                    primary: false,
                },
                newly_registered: false,
            };
        }

        let id = set.next_id;
        set.next_id += 1;
        let (tx, rx) = broadcast::channel(1);
        set.entries.push(PendingEntry {
            id,
            key: Some(key.to_string()),
            matcher,
            tx,
        });
        KeyedRegistration {
            reply: PendingReply {
                id,
                rx,
                pending: Arc::clone(&self.pending),
                primary: true,
            },
            newly_registered: true,
        }
    }

    fn register_inner(&self, key: Option<String>, matcher: Matcher) -> PendingReply {
        let mut set = lock_set(&self.pending);
        let id = set.next_id;
        set.next_id += 1;
        let (tx, rx) = broadcast::channel(1);
        set.entries.push(PendingEntry {
            id,
            key,
            matcher,
            tx,
        });
        PendingReply {
            id,
            rx,
            pending: Arc::clone(&self.pending),
            primary: true,
        }
    }

    /// Offer an inbound frame to the pending set.
    ///
    /// The first registered entry whose matcher accepts the frame is
    /// removed and resolved with it. Returns whether any entry consumed
    /// the frame. Called from the receive path for every decoded frame.
    pub fn offer(&self, frame: &Frame) -> bool {
        let tx = {
            let mut set = lock_set(&self.pending);
            let Some(idx) = set.entries.iter().position(|e| (e.matcher)(frame)) else {
                return false;
            };
            set.entries.remove(idx).tx
        };
        let _ = tx.send(ReplyOutcome::Matched(frame.clone()));
        true
    }

    /// Whether a request with the given key is currently in flight.
    pub fn has_pending_key(&self, key: &str) -> bool {
        let set = lock_set(&self.pending);
        set.entries.iter().any(|e| e.key.as_deref() == Some(key))
    }

    /// Number of outstanding pending requests.
    pub fn pending_count(&self) -> usize {
        lock_set(&self.pending).entries.len()
    }

    /// Cancel every outstanding request (connection teardown).
    ///
    /// Waiters resolve with [`Error::ConnectionLost`] if `lost` is true,
    /// [`Error::Cancelled`] otherwise.
    pub fn fail_all(&self, lost: bool) {
        let drained: Vec<_> = {
            let mut set = lock_set(&self.pending);
            set.entries.drain(..).collect()
        };
        let outcome = if lost {
            ReplyOutcome::ConnectionLost
        } else {
            ReplyOutcome::Cancelled
        };
        for entry in drained {
            let _ = entry.tx.send(outcome.clone());
        }
    }
}

/// Handle to a pending request registered with [`RequestCorrelator`].
pub struct PendingReply {
    id: u64,
    rx: broadcast::Receiver<ReplyOutcome>,
    pending: Arc<Mutex<PendingSet>>,
    /// Only the handle that created the entry may remove it (drop, cancel,
    /// or timeout); handles joined to an in-flight keyed request detach
    /// without cancelling the original.
    primary: bool,
}

/// Result of a keyed registration.
pub struct KeyedRegistration {
    /// Handle awaiting the (possibly shared) reply.
    pub reply: PendingReply,
    /// False if an in-flight request with the same key was joined instead
    /// of registering a new one.
    pub newly_registered: bool,
}

impl PendingReply {
    /// Wait for the reply, giving up after `timeout`.
    ///
    /// On timeout the pending entry is removed, so the set never retains
    /// expired requests.
    pub async fn wait(mut self, timeout: Duration) -> Result<Frame> {
        match tokio::time::timeout(timeout, self.rx.recv()).await {
            Ok(outcome) => self.finish(outcome),
            Err(_) => {
                self.remove_entry();
                Err(Error::Timeout)
            }
        }
    }

    /// Wait for the reply, giving up on `timeout` or when `cancel` fires.
    pub async fn wait_cancellable(
        mut self,
        timeout: Duration,
        cancel: &CancellationToken,
    ) -> Result<Frame> {
        tokio::select! {
            outcome = tokio::time::timeout(timeout, self.rx.recv()) => {
                match outcome {
                    Ok(outcome) => self.finish(outcome),
                    Err(_) => {
                        self.remove_entry();
                        Err(Error::Timeout)
                    }
                }
            }
            _ = cancel.cancelled() => {
                self.remove_entry();
                Err(Error::Cancelled)
            }
        }
    }

    /// Cancel the pending request without waiting.
    ///
    /// On a handle joined to an in-flight keyed request this only detaches
    /// the caller; the request itself stays pending for its sender.
    pub fn cancel(mut self) {
        self.remove_entry();
    }

    fn finish(
        mut self,
        outcome: std::result::Result<ReplyOutcome, broadcast::error::RecvError>,
    ) -> Result<Frame> {
        // Entry was already removed by whoever resolved it.
        self.primary = false;
        match outcome {
            Ok(ReplyOutcome::Matched(frame)) => Ok(frame),
            Ok(ReplyOutcome::Cancelled) => Err(Error::Cancelled),
            Ok(ReplyOutcome::ConnectionLost) => Err(Error::ConnectionLost),
            // Sender dropped without resolving: the correlator itself went
            // away with the connection.
            Err(_) => Err(Error::ConnectionLost),
        }
    }

    /// Remove the entry from the pending set, resolving it as cancelled
    /// for any other handle sharing it. Safe to race against `offer`:
    /// only the remover sends, and at most one party removes.
    ///
    /// A joined handle (not primary) merely gave up waiting; the entry
    /// belongs to whoever sent the request, so it stays pending.
    fn remove_entry(&mut self) {
        if !self.primary {
            return;
        }
        self.primary = false;
        let tx = {
            let mut set = lock_set(&self.pending);
            set.take(self.id)
        };
        if let Some(tx) = tx {
            let _ = tx.send(ReplyOutcome::Cancelled);
        }
    }
}

impl Drop for PendingReply {
    fn drop(&mut self) {
        if self.primary {
            self.remove_entry();
        }
    }
}
