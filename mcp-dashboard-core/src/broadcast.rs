//! Fan-out of live events to connected viewers
//!
//! The [`BroadcastHub`] keeps one bounded outbound queue per viewer session.
//! Publishing never waits on a viewer: each payload is offered to every queue
//! with `try_send`, and a session whose queue is full is dropped on the spot.
//! Dropping the session's sender closes its queue, which the session's send
//! task sees as the signal to close the connection.
//!
//! Delivery is best-effort. A slow viewer loses its connection, everyone else
//! keeps receiving every payload in publish order.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::mpsc::{self, error::TrySendError};
use uuid::Uuid;

/// Default number of undelivered messages a viewer may fall behind by.
pub const DEFAULT_QUEUE_CAPACITY: usize = 256;

/// A serialized message, shared by every queue it is offered to.
pub type Payload = Arc<str>;

/// Identifier of one registered viewer session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SessionId(Uuid);

impl SessionId {
    fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

/// The receiving side of a registered session.
///
/// `receiver` yields payloads in publish order and returns `None` once the
/// hub has unregistered the session.
#[derive(Debug)]
pub struct Subscription {
    pub id: SessionId,
    pub receiver: mpsc::Receiver<Payload>,
}

/// Registry of live viewer sessions.
///
/// Cheap to clone; all clones share the same session set.
#[derive(Clone)]
pub struct BroadcastHub {
    inner: Arc<HubInner>,
}

struct HubInner {
    sessions: Mutex<HashMap<SessionId, mpsc::Sender<Payload>>>,
    queue_capacity: usize,
}

impl BroadcastHub {
    /// Create a hub whose sessions buffer up to `queue_capacity` messages.
    pub fn new(queue_capacity: usize) -> Self {
        Self {
            inner: Arc::new(HubInner {
                sessions: Mutex::new(HashMap::new()),
                queue_capacity: queue_capacity.max(1),
            }),
        }
    }

    pub fn queue_capacity(&self) -> usize {
        self.inner.queue_capacity
    }

    /// Add a new session and hand back its queue.
    pub fn register(&self) -> Subscription {
        let (sender, receiver) = mpsc::channel(self.inner.queue_capacity);
        let id = SessionId::new();

        let count = {
            let mut sessions = self.sessions();
            sessions.insert(id, sender);
            sessions.len()
        };
        tracing::debug!(session = %id, viewers = count, "Viewer registered");

        Subscription { id, receiver }
    }

    /// Remove a session and release its queue.
    ///
    /// Returns `false` if the session was already gone.
    pub fn unregister(&self, id: SessionId) -> bool {
        let (removed, count) = {
            let mut sessions = self.sessions();
            let removed = sessions.remove(&id).is_some();
            (removed, sessions.len())
        };
        if removed {
            tracing::debug!(session = %id, viewers = count, "Viewer unregistered");
        }
        removed
    }

    /// Offer `payload` to every session without blocking.
    ///
    /// Sessions whose queue is full, or whose receiving side is gone, are
    /// unregistered. Returns the number of sessions the payload was queued for.
    pub fn publish(&self, payload: impl Into<Payload>) -> usize {
        let payload = payload.into();
        let mut sessions = self.sessions();
        let mut delivered = 0;
        let mut dropped = Vec::new();

        for (id, sender) in sessions.iter() {
            match sender.try_send(Arc::clone(&payload)) {
                Ok(()) => delivered += 1,
                Err(TrySendError::Full(_)) => {
                    tracing::warn!(
                        session = %id,
                        capacity = self.inner.queue_capacity,
                        "Viewer queue full, disconnecting slow viewer"
                    );
                    dropped.push(*id);
                }
                Err(TrySendError::Closed(_)) => {
                    tracing::debug!(session = %id, "Viewer queue closed, removing session");
                    dropped.push(*id);
                }
            }
        }

        for id in dropped {
            sessions.remove(&id);
        }

        delivered
    }

    /// Number of currently registered sessions.
    pub fn session_count(&self) -> usize {
        self.sessions().len()
    }

    #[cfg(test)]
    fn is_registered(&self, id: SessionId) -> bool {
        self.sessions().contains_key(&id)
    }

    fn sessions(&self) -> std::sync::MutexGuard<'_, HashMap<SessionId, mpsc::Sender<Payload>>> {
        self.inner
            .sessions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for BroadcastHub {
    fn default() -> Self {
        Self::new(DEFAULT_QUEUE_CAPACITY)
    }
}

impl fmt::Debug for BroadcastHub {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BroadcastHub")
            .field("sessions", &self.session_count())
            .field("queue_capacity", &self.inner.queue_capacity)
            .finish()
    }
}
