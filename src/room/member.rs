//! Hub-side handle on one session's outbound queue.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;

use crate::domain::{ChatMessage, SessionId};

/// Default capacity of a session's outbound queue.
pub const DEFAULT_OUTBOUND_CAPACITY: usize = 256;

/// Receiving end of a session's outbound queue, drained by its outbound pump.
pub type Outbound = mpsc::Receiver<Arc<ChatMessage>>;

/// Outcome of offering a message to one member.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    /// The message was queued.
    Queued,
    /// The queue was full; this copy was dropped.
    Full,
    /// The outbound pump is gone; this copy was dropped.
    Closed,
}

/// A session as the hub sees it: an id and the only sender into the
/// session's outbound queue.
///
/// Dropping the `Member` closes the queue, which is how departure tells
/// the outbound pump to finish.
#[derive(Debug)]
pub struct Member {
    id: SessionId,
    outbound: mpsc::Sender<Arc<ChatMessage>>,
}

impl Member {
    /// Creates a member and the receiving end of its outbound queue.
    ///
    /// A capacity of zero is raised to one.
    #[must_use]
    pub fn open(id: SessionId, capacity: usize) -> (Self, Outbound) {
        let (outbound, rx) = mpsc::channel(capacity.max(1));
        (Self { id, outbound }, rx)
    }

    /// Returns the session id.
    #[must_use]
    pub const fn id(&self) -> SessionId {
        self.id
    }

    /// Queues `message` without waiting.
    pub(crate) fn offer(&self, message: &Arc<ChatMessage>) -> Delivery {
        match self.outbound.try_send(Arc::clone(message)) {
            Ok(()) => Delivery::Queued,
            Err(TrySendError::Full(_)) => Delivery::Full,
            Err(TrySendError::Closed(_)) => Delivery::Closed,
        }
    }
}
