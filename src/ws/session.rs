//! Per-session pump pair.
//!
//! Each accepted connection runs two tasks: the inbound pump reads frames
//! and submits messages to the [`Hub`], and the outbound pump drains the
//! session's queue back onto the connection. [`run_session`] supervises
//! both and makes sure the session departs exactly once, whichever pump
//! ends first.

use std::fmt::Display;
use std::time::Duration;

use axum::extract::ws::Message;
use futures_util::{Sink, SinkExt, Stream, StreamExt};
use tokio::task::JoinError;

use super::messages::{self, Inbound};
use crate::domain::{Author, SessionId};
use crate::error::ChatError;
use crate::room::{DEFAULT_OUTBOUND_CAPACITY, Hub, Member, Outbound};

/// Per-session tuning, shared by every connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionSettings {
    /// Capacity of each session's outbound queue.
    pub outbound_capacity: usize,
    /// End the session after this long without an inbound frame.
    /// `None` waits forever.
    pub idle_timeout: Option<Duration>,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            outbound_capacity: DEFAULT_OUTBOUND_CAPACITY,
            idle_timeout: None,
        }
    }
}

/// Reads frames until the connection ends, broadcasting each chat
/// message as written by `author`.
///
/// Returns `Ok(())` on a close frame or end of stream.
///
/// # Errors
///
/// Returns [`ChatError::Codec`] for an undecodable frame,
/// [`ChatError::Transport`] for a read error or idle timeout, and
/// [`ChatError::HubClosed`] if the room stopped.
pub async fn read_pump<S, E>(
    mut stream: S,
    hub: Hub,
    author: Author,
    idle_timeout: Option<Duration>,
) -> Result<(), ChatError>
where
    S: Stream<Item = Result<Message, E>> + Unpin,
    E: Display,
{
    loop {
        let next = match idle_timeout {
            Some(limit) => tokio::time::timeout(limit, stream.next())
                .await
                .map_err(|_| ChatError::Transport("idle timeout".to_string()))?,
            None => stream.next().await,
        };
        let frame = match next {
            Some(Ok(frame)) => frame,
            Some(Err(e)) => return Err(ChatError::Transport(e.to_string())),
            None => return Ok(()),
        };
        match messages::decode(&frame)? {
            Inbound::Chat(body) => hub.broadcast(author.compose(body)).await?,
            Inbound::Control => {}
            Inbound::Close => return Ok(()),
        }
    }
}

/// Writes queued messages to `sink` until the queue is closed.
///
/// On a clean finish the sink is closed once.
///
/// # Errors
///
/// Returns [`ChatError::Transport`] if a write fails.
pub async fn write_pump<K>(mut sink: K, mut outbound: Outbound) -> Result<(), ChatError>
where
    K: Sink<Message> + Unpin,
    K::Error: Display + Send,
{
    while let Some(message) = outbound.recv().await {
        let frame = messages::encode(&message)?;
        sink.send(frame)
            .await
            .map_err(|e| ChatError::Transport(e.to_string()))?;
    }
    if let Err(e) = sink.close().await {
        tracing::debug!(error = %e, "close after drain failed");
    }
    Ok(())
}

/// Runs one session from admission to departure.
///
/// Admits a fresh member, starts both pumps, and waits for the first to
/// end. If the inbound pump ends first the session departs and the
/// outbound pump is left to flush what was already queued. If the
/// outbound pump ends first the inbound pump is aborted. Either way the
/// hub sees exactly one departure.
pub async fn run_session<K, S, E>(
    sink: K,
    stream: S,
    hub: Hub,
    author: Author,
    settings: SessionSettings,
) where
    K: Sink<Message> + Send + Unpin + 'static,
    K::Error: Display + Send,
    S: Stream<Item = Result<Message, E>> + Send + Unpin + 'static,
    E: Display + Send + 'static,
{
    let id = SessionId::new();
    let (member, outbound) = Member::open(id, settings.outbound_capacity);
    if let Err(e) = hub.admit(member).await {
        tracing::warn!(session_id = %id, error = %e, "session refused");
        return;
    }
    tracing::info!(session_id = %id, name = %author.name, "session joined");

    let mut writer = tokio::spawn(write_pump(sink, outbound));
    let mut reader = tokio::spawn(read_pump(
        stream,
        hub.clone(),
        author,
        settings.idle_timeout,
    ));

    tokio::select! {
        ended = &mut reader => {
            log_pump_exit(id, "inbound", ended);
            depart(&hub, id).await;
            log_pump_exit(id, "outbound", writer.await);
        }
        ended = &mut writer => {
            log_pump_exit(id, "outbound", ended);
            reader.abort();
            depart(&hub, id).await;
        }
    }

    tracing::info!(session_id = %id, "session left");
}

async fn depart(hub: &Hub, id: SessionId) {
    if let Err(e) = hub.depart(id).await {
        tracing::debug!(session_id = %id, error = %e, "depart after room stopped");
    }
}

fn log_pump_exit(id: SessionId, pump: &str, ended: Result<Result<(), ChatError>, JoinError>) {
    match ended {
        Ok(Ok(())) => tracing::debug!(session_id = %id, pump, "pump finished"),
        Ok(Err(e)) => tracing::debug!(session_id = %id, pump, error = %e, "pump ended"),
        Err(e) => tracing::warn!(session_id = %id, pump, error = %e, "pump task failed"),
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use std::sync::Arc;

    use chrono::Utc;
    use futures::channel::mpsc as fmpsc;
    use tokio_test::assert_ok;

    use super::*;
    use crate::domain::ChatMessage;
    use crate::room::Room;
    use crate::trace::TracerOff;

    type Frames = fmpsc::UnboundedSender<Result<Message, axum::Error>>;

    fn start_room() -> Hub {
        let (hub, room) = Room::new(64, Arc::new(TracerOff));
        tokio::spawn(room.run());
        hub
    }

    fn alice() -> Author {
        Author::new("Alice", "//www.gravatar.com/avatar/abc")
    }

    fn text(body: &str) -> Result<Message, axum::Error> {
        Ok(Message::text(body.to_string()))
    }

    async fn wait_for_members(hub: &Hub, count: usize) {
        for _ in 0..200 {
            if hub.members().await.map(|m| m.len()).ok() == Some(count) {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("room never reached {count} members");
    }

    fn body_of(frame: Option<Message>) -> ChatMessage {
        let Some(Message::Text(text)) = frame else {
            panic!("expected a text frame");
        };
        let Ok(msg) = serde_json::from_str(text.as_str()) else {
            panic!("frame is not a chat message");
        };
        msg
    }

    #[tokio::test]
    async fn read_pump_stamps_and_broadcasts() {
        let hub = start_room();
        let (member, mut rx) = Member::open(SessionId::new(), 8);
        assert_ok!(hub.admit(member).await);
        let started = Utc::now();

        let frames = futures::stream::iter(vec![
            text(r#"{"message":"hi","name":"Mallory","when":"1999-01-01T00:00:00Z"}"#),
            Ok(Message::Ping(Vec::new().into())),
            text(r#"{"message":"again"}"#),
        ]);
        assert_ok!(read_pump(frames, hub.clone(), alice(), None).await);

        let Some(first) = rx.recv().await else {
            panic!("expected first message");
        };
        assert_eq!(first.message, "hi");
        assert_eq!(first.name, "Alice");
        assert_eq!(first.avatar_url, "//www.gravatar.com/avatar/abc");
        assert!(first.when >= started);

        let Some(second) = rx.recv().await else {
            panic!("expected second message");
        };
        assert_eq!(second.message, "again");
    }

    #[tokio::test]
    async fn read_pump_stops_on_decode_error() {
        let hub = start_room();
        let (member, mut rx) = Member::open(SessionId::new(), 8);
        assert_ok!(hub.admit(member).await);

        let frames = futures::stream::iter(vec![text("not json"), text(r#"{"message":"late"}"#)]);
        let result = read_pump(frames, hub.clone(), alice(), None).await;
        assert!(matches!(result, Err(ChatError::Codec(_))));

        let _ = hub.members().await;
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn read_pump_stops_on_close_frame() {
        let hub = start_room();
        let frames = futures::stream::iter(vec![
            Ok::<_, axum::Error>(Message::Close(None)),
            text(r#"{"message":"after close"}"#),
        ]);
        assert_ok!(read_pump(frames, hub, alice(), None).await);
    }

    #[tokio::test]
    async fn read_pump_reports_transport_error() {
        let hub = start_room();
        let frames = futures::stream::iter(vec![Err(axum::Error::new(std::io::Error::other(
            "connection reset",
        )))]);
        let result = read_pump(frames, hub, alice(), None).await;
        assert!(matches!(result, Err(ChatError::Transport(_))));
    }

    #[tokio::test]
    async fn read_pump_times_out_when_idle() {
        let hub = start_room();
        let (_tx, frames): (Frames, _) = fmpsc::unbounded();
        let result = read_pump(frames, hub, alice(), Some(Duration::from_millis(20))).await;
        assert!(matches!(result, Err(ChatError::Transport(_))));
    }

    #[tokio::test]
    async fn write_pump_drains_then_closes() {
        let (member, outbound) = Member::open(SessionId::new(), 8);
        let (sink, mut written) = fmpsc::unbounded::<Message>();
        let hub = start_room();
        assert_ok!(hub.admit(member).await);
        assert_ok!(hub.broadcast(ChatMessage::new("Alice", "one", "")).await);
        assert_ok!(hub.broadcast(ChatMessage::new("Alice", "two", "")).await);
        assert_ok!(hub.shutdown().await);

        assert_ok!(write_pump(sink, outbound).await);
        assert_eq!(body_of(written.next().await).message, "one");
        assert_eq!(body_of(written.next().await).message, "two");
        assert!(written.next().await.is_none());
    }

    #[tokio::test]
    async fn write_pump_reports_write_failure() {
        let (member, outbound) = Member::open(SessionId::new(), 8);
        let (sink, written) = fmpsc::unbounded::<Message>();
        drop(written);
        let hub = start_room();
        assert_ok!(hub.admit(member).await);
        assert_ok!(hub.broadcast(ChatMessage::new("Alice", "lost", "")).await);

        let result = write_pump(sink, outbound).await;
        assert!(matches!(result, Err(ChatError::Transport(_))));
    }

    #[tokio::test]
    async fn session_echoes_and_departs_when_client_leaves() {
        let hub = start_room();
        let (frames_tx, frames): (Frames, _) = fmpsc::unbounded();
        let (sink, mut written) = fmpsc::unbounded::<Message>();
        let session = tokio::spawn(run_session(
            sink,
            frames,
            hub.clone(),
            alice(),
            SessionSettings::default(),
        ));
        wait_for_members(&hub, 1).await;

        assert_ok!(frames_tx.unbounded_send(text(r#"{"message":"hi"}"#)));
        let echoed = body_of(written.next().await);
        assert_eq!(echoed.message, "hi");
        assert_eq!(echoed.name, "Alice");

        drop(frames_tx);
        assert_ok!(session.await);
        wait_for_members(&hub, 0).await;
        assert!(written.next().await.is_none());
    }

    #[tokio::test]
    async fn session_departs_when_writes_fail() {
        let hub = start_room();
        let (frames_tx, frames): (Frames, _) = fmpsc::unbounded();
        let (sink, written) = fmpsc::unbounded::<Message>();
        let session = tokio::spawn(run_session(
            sink,
            frames,
            hub.clone(),
            alice(),
            SessionSettings::default(),
        ));
        wait_for_members(&hub, 1).await;

        drop(written);
        assert_ok!(frames_tx.unbounded_send(text(r#"{"message":"into the void"}"#)));

        assert_ok!(session.await);
        wait_for_members(&hub, 0).await;
    }

    #[tokio::test]
    async fn session_is_refused_by_stopped_room() {
        let hub = start_room();
        assert_ok!(hub.shutdown().await);
        let frames = futures::stream::iter(Vec::<Result<Message, axum::Error>>::new());
        let (sink, mut written) = fmpsc::unbounded::<Message>();

        run_session(sink, frames, hub, alice(), SessionSettings::default()).await;
        assert!(written.next().await.is_none());
    }
}
