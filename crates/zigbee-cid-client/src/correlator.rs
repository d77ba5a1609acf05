//! Request/response correlation.
//!
//! A caller registers interest in a [`ResponseKind`] before writing its
//! request, then waits on the returned [`PendingReply`]. The ingest path
//! offers every decoded response to [`Correlator::offer`], which hands it to
//! the oldest waiter registered for that kind.
//!
//! The pending table lock is held while a reply is sent, so a waiter that
//! times out and finds its entry already removed knows the reply is sitting
//! in its channel.

use std::collections::{HashMap, VecDeque};
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::oneshot::{self, error::TryRecvError};
use tracing::trace;
use zigbee_cid_protocol::{Response, ResponseKind};

use crate::error::ClientError;

struct PendingEntry {
    id: u64,
    reply: oneshot::Sender<Response>,
}

#[derive(Default)]
struct PendingTable {
    next_id: u64,
    by_kind: HashMap<ResponseKind, VecDeque<PendingEntry>>,
}

impl PendingTable {
    fn remove(&mut self, kind: ResponseKind, id: u64) -> bool {
        let Some(queue) = self.by_kind.get_mut(&kind) else {
            return false;
        };
        let Some(pos) = queue.iter().position(|e| e.id == id) else {
            return false;
        };
        queue.remove(pos);
        if queue.is_empty() {
            self.by_kind.remove(&kind);
        }
        true
    }
}

/// Matches incoming responses to waiting requests, first come first served
/// per response kind.
#[derive(Default)]
pub struct Correlator {
    table: Mutex<PendingTable>,
}

impl Correlator {
    /// Create an empty correlator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a waiter for the next response of `kind`.
    pub fn register(&self, kind: ResponseKind) -> PendingReply<'_> {
        let (tx, rx) = oneshot::channel();
        let mut table = self.table.lock();
        let id = table.next_id;
        table.next_id += 1;
        table
            .by_kind
            .entry(kind)
            .or_default()
            .push_back(PendingEntry { id, reply: tx });
        trace!(%kind, id, "registered pending request");
        PendingReply {
            correlator: self,
            kind,
            id,
            rx,
        }
    }

    /// Deliver `response` to the oldest waiter for its kind.
    ///
    /// Returns whether a waiter took it. Never blocks.
    pub fn offer(&self, response: &Response) -> bool {
        let kind = response.kind();
        let mut table = self.table.lock();
        let Some(queue) = table.by_kind.get_mut(&kind) else {
            return false;
        };
        let mut delivered = false;
        while let Some(entry) = queue.pop_front() {
            if entry.reply.send(response.clone()).is_ok() {
                trace!(%kind, id = entry.id, "resolved pending request");
                delivered = true;
                break;
            }
        }
        if queue.is_empty() {
            table.by_kind.remove(&kind);
        }
        delivered
    }

    /// Number of registered waiters.
    pub fn pending_count(&self) -> usize {
        self.table.lock().by_kind.values().map(VecDeque::len).sum()
    }

    /// Drop every waiter. Each one fails with [`ClientError::Closed`].
    pub fn clear(&self) {
        self.table.lock().by_kind.clear();
    }

    fn deregister(&self, kind: ResponseKind, id: u64) -> bool {
        self.table.lock().remove(kind, id)
    }
}

/// A registered waiter.
///
/// Dropping it before a response arrives removes the registration.
pub struct PendingReply<'a> {
    correlator: &'a Correlator,
    kind: ResponseKind,
    id: u64,
    rx: oneshot::Receiver<Response>,
}

impl PendingReply<'_> {
    /// The kind being waited for.
    pub fn kind(&self) -> ResponseKind {
        self.kind
    }

    /// Wait up to `timeout` for the response.
    pub async fn wait(mut self, timeout: Duration) -> Result<Response, ClientError> {
        match tokio::time::timeout(timeout, &mut self.rx).await {
            Ok(Ok(response)) => Ok(response),
            Ok(Err(_)) => Err(ClientError::Closed),
            Err(_) => self.settle_after_timeout(timeout),
        }
    }

    /// Decide the outcome once the timer has fired.
    ///
    /// If the entry is still registered the call timed out. Otherwise `offer`
    /// took it under the table lock and the reply is already in the channel,
    /// or `clear` dropped the sender.
    fn settle_after_timeout(&mut self, timeout: Duration) -> Result<Response, ClientError> {
        let timed_out = ClientError::Timeout {
            kind: self.kind,
            after: timeout,
        };
        if self.correlator.deregister(self.kind, self.id) {
            return Err(timed_out);
        }
        match self.rx.try_recv() {
            Ok(response) => Ok(response),
            Err(TryRecvError::Closed) => Err(ClientError::Closed),
            Err(TryRecvError::Empty) => Err(timed_out),
        }
    }
}

impl Drop for PendingReply<'_> {
    fn drop(&mut self) {
        if self.correlator.deregister(self.kind, self.id) {
            trace!(kind = %self.kind, id = self.id, "abandoned pending request");
        }
    }
}
