// File: ./src/client/queue.rs
//! Requests parked behind an in-flight token refresh.
use crate::error::ClientError;
use tokio::sync::oneshot;

/// Outcome handed to every parked request: the new access token, or the
/// error that ended the refresh.
pub type RefreshOutcome = Result<String, ClientError>;

/// Receiving half held by a parked request.
pub type PendingTicket = oneshot::Receiver<RefreshOutcome>;

/// FIFO of single-use continuations.
///
/// Each entry is a `oneshot::Sender`, so it can be resolved or rejected
/// exactly once. Entries whose receiver was dropped are skipped on drain.
#[derive(Debug, Default)]
pub struct PendingQueue {
    waiters: Vec<oneshot::Sender<RefreshOutcome>>,
}

impl PendingQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parks a request. Unbounded: the queue only ever holds requests one
    /// client has in flight.
    pub fn enqueue(&mut self) -> PendingTicket {
        let (tx, rx) = oneshot::channel();
        self.waiters.push(tx);
        rx
    }

    /// Resolves or rejects every parked request in insertion order and
    /// leaves the queue empty. Returns how many waiters were still listening.
    pub fn drain(&mut self, outcome: &RefreshOutcome) -> usize {
        let mut delivered = 0;
        for waiter in self.waiters.drain(..) {
            if waiter.send(outcome.clone()).is_ok() {
                delivered += 1;
            }
        }
        delivered
    }

    pub fn len(&self) -> usize {
        self.waiters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.waiters.is_empty()
    }
}
