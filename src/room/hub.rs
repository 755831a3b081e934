//! Serialized control loop for room membership and fan-out.
//!
//! [`Room`] is the loop; [`Hub`] is the handle every session holds. The
//! three intakes (admit, depart, broadcast) share one FIFO queue, so the
//! loop sees them in exactly the order they were submitted. A broadcast
//! is delivered to the membership as it stands when the loop reaches it.
//!
//! # Full outbound queues
//!
//! Delivery never waits on a member. When a member's outbound queue is
//! full the copy for that member is dropped, a warning is logged, and
//! fan-out continues with the next member. A slow consumer therefore
//! loses messages instead of stalling the room for everybody else.

use std::collections::HashMap;
use std::ops::ControlFlow;
use std::sync::Arc;

use tokio::sync::{mpsc, oneshot};

use super::member::{Delivery, Member};
use crate::domain::{ChatMessage, SessionId};
use crate::error::ChatError;
use crate::trace::Tracer;

/// Default capacity of the hub's event queue.
pub const DEFAULT_INTAKE_CAPACITY: usize = 1024;

/// Events processed by the room loop, one at a time.
#[derive(Debug)]
enum HubEvent {
    Admit(Member),
    Depart(SessionId),
    Broadcast(Arc<ChatMessage>),
    Members(oneshot::Sender<Vec<SessionId>>),
    Shutdown,
}

/// Cloneable handle for submitting events to a running [`Room`].
#[derive(Debug, Clone)]
pub struct Hub {
    events: mpsc::Sender<HubEvent>,
}

impl Hub {
    /// Registers a member.
    ///
    /// Admitting an id that is already a member is ignored.
    ///
    /// # Errors
    ///
    /// Returns [`ChatError::HubClosed`] if the room loop has stopped.
    pub async fn admit(&self, member: Member) -> Result<(), ChatError> {
        self.submit(HubEvent::Admit(member)).await
    }

    /// Removes a member and closes its outbound queue.
    ///
    /// Departing an id that is not a member is a no-op, so cleanup paths
    /// may call this more than once.
    ///
    /// # Errors
    ///
    /// Returns [`ChatError::HubClosed`] if the room loop has stopped.
    pub async fn depart(&self, id: SessionId) -> Result<(), ChatError> {
        self.submit(HubEvent::Depart(id)).await
    }

    /// Delivers `message` to every current member, the sender included.
    ///
    /// # Errors
    ///
    /// Returns [`ChatError::HubClosed`] if the room loop has stopped.
    pub async fn broadcast(&self, message: ChatMessage) -> Result<(), ChatError> {
        self.submit(HubEvent::Broadcast(Arc::new(message))).await
    }

    /// Returns the current member ids.
    ///
    /// The snapshot is taken in order with other events: everything
    /// submitted through this handle before the call has been processed.
    ///
    /// # Errors
    ///
    /// Returns [`ChatError::HubClosed`] if the room loop has stopped.
    pub async fn members(&self) -> Result<Vec<SessionId>, ChatError> {
        let (tx, rx) = oneshot::channel();
        self.submit(HubEvent::Members(tx)).await?;
        rx.await.map_err(|_| ChatError::HubClosed)
    }

    /// Stops the room loop, departing every member.
    ///
    /// # Errors
    ///
    /// Returns [`ChatError::HubClosed`] if the room loop had already stopped.
    pub async fn shutdown(&self) -> Result<(), ChatError> {
        self.submit(HubEvent::Shutdown).await
    }

    /// Returns `true` once the room loop has stopped.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.events.is_closed()
    }

    async fn submit(&self, event: HubEvent) -> Result<(), ChatError> {
        self.events
            .send(event)
            .await
            .map_err(|_| ChatError::HubClosed)
    }
}

/// The room control loop. Owns the membership set exclusively.
#[derive(Debug)]
pub struct Room {
    events: mpsc::Receiver<HubEvent>,
    members: HashMap<SessionId, Member>,
    tracer: Arc<dyn Tracer>,
}

impl Room {
    /// Creates a room and its handle.
    ///
    /// The room does nothing until [`Room::run`] is spawned. A capacity of
    /// zero is raised to one.
    #[must_use]
    pub fn new(intake_capacity: usize, tracer: Arc<dyn Tracer>) -> (Hub, Self) {
        let (tx, rx) = mpsc::channel(intake_capacity.max(1));
        let room = Self {
            events: rx,
            members: HashMap::new(),
            tracer,
        };
        (Hub { events: tx }, room)
    }

    /// Runs the loop until [`Hub::shutdown`] is called or every [`Hub`]
    /// handle has been dropped. All remaining members depart on exit.
    pub async fn run(mut self) {
        tracing::debug!("room loop started");
        while let Some(event) = self.events.recv().await {
            if self.handle(event).is_break() {
                break;
            }
        }
        self.events.close();
        self.depart_all();
        tracing::debug!("room loop stopped");
    }

    fn handle(&mut self, event: HubEvent) -> ControlFlow<()> {
        match event {
            HubEvent::Admit(member) => self.admit(member),
            HubEvent::Depart(id) => self.depart(id),
            HubEvent::Broadcast(message) => self.broadcast(&message),
            HubEvent::Members(reply) => {
                let _ = reply.send(self.members.keys().copied().collect());
            }
            HubEvent::Shutdown => return ControlFlow::Break(()),
        }
        ControlFlow::Continue(())
    }

    fn admit(&mut self, member: Member) {
        let id = member.id();
        if self.members.contains_key(&id) {
            tracing::warn!(session_id = %id, "session already a member; admit ignored");
            return;
        }
        self.members.insert(id, member);
        self.tracer.trace("client joined");
        tracing::debug!(session_id = %id, members = self.members.len(), "client joined");
    }

    fn depart(&mut self, id: SessionId) {
        // Dropping the member closes its outbound queue.
        if self.members.remove(&id).is_some() {
            self.tracer.trace("client left");
            tracing::debug!(session_id = %id, members = self.members.len(), "client left");
        }
    }

    fn broadcast(&self, message: &Arc<ChatMessage>) {
        self.tracer
            .trace(&format!("message received: {}", message.message));
        for member in self.members.values() {
            match member.offer(message) {
                Delivery::Queued => self.tracer.trace(" -- sent to client"),
                Delivery::Full => {
                    tracing::warn!(
                        session_id = %member.id(),
                        "outbound queue full; message dropped for this session"
                    );
                    self.tracer.trace(" -- dropped for client");
                }
                Delivery::Closed => {
                    tracing::debug!(
                        session_id = %member.id(),
                        "outbound queue closed; message dropped for this session"
                    );
                    self.tracer.trace(" -- dropped for client");
                }
            }
        }
    }

    fn depart_all(&mut self) {
        for (id, _member) in self.members.drain() {
            self.tracer.trace("client left");
            tracing::debug!(session_id = %id, "client left on room shutdown");
        }
    }
}
