//! State of one live feed connection.
//!
//! Socket callbacks only forward [`SessionEvent`]s; the [`FeedSession`] loop is
//! the single owner of the connection state and its reload timer.

use std::io::Write;

use serde_json::Value;
use tokio::sync::mpsc::Receiver;
use tracing::{debug, error, info, warn};

use super::{
    decode::decode_arguments,
    emitter::EventEmitter,
    reload_timer::{ReloadTimer, ReloadTiming},
};
use crate::model::{LiveEvent, ReloadRequest};

#[derive(Debug)]
pub enum SessionEvent<E> {
    /// Handshake completed. `emitter` sends on the new connection.
    Connected { sid: Option<String>, emitter: E },
    Disconnected { reason: String },
    ConnectError { message: String, data: Option<Value> },
    /// Any server event, arguments still encoded
    Inbound { name: String, args: Vec<Value> },
}

#[derive(Debug, Default)]
enum ConnectionState {
    #[default]
    Disconnected,
    Connected { timer: ReloadTimer },
}

pub struct FeedSession<W> {
    request: ReloadRequest,
    timing: ReloadTiming,
    state: ConnectionState,
    /// Decoded events are written here, one JSON object per line
    output: W,
}

impl<W: Write> FeedSession<W> {
    pub fn new(request: ReloadRequest, timing: ReloadTiming, output: W) -> Self {
        FeedSession {
            request,
            timing,
            state: ConnectionState::Disconnected,
            output,
        }
    }

    pub fn is_connected(&self) -> bool {
        matches!(self.state, ConnectionState::Connected { .. })
    }

    /// Handles events until every sender is gone. The reload timer is disarmed on return.
    pub async fn run<E: EventEmitter>(mut self, mut events: Receiver<SessionEvent<E>>) {
        while let Some(event) = events.recv().await {
            self.handle(event);
        }

        info!("event channel closed");
        self.state = ConnectionState::Disconnected;
    }

    pub fn handle<E: EventEmitter>(&mut self, event: SessionEvent<E>) {
        match event {
            SessionEvent::Connected { sid, emitter } => {
                info!("connected: {}", sid.as_deref().unwrap_or("<unknown sid>"));

                if let ConnectionState::Connected { timer } =
                    std::mem::take(&mut self.state)
                {
                    warn!(armed = timer.is_armed(), "connected twice, replacing reload timer");
                    timer.disarm();
                }

                let timer = ReloadTimer::arm(emitter, self.request.clone(), self.timing);
                self.state = ConnectionState::Connected { timer };
            }
            SessionEvent::Disconnected { reason } => {
                info!("disconnected: {reason}");
                self.state = ConnectionState::Disconnected;
            }
            SessionEvent::ConnectError { message, data } => {
                error!(?data, "connect error: {message}");
            }
            SessionEvent::Inbound { name, args } => {
                let event = LiveEvent {
                    name,
                    args: decode_arguments(args),
                };
                info!(event = %event.name, args = event.args.len(), "received event");
                debug!(event = %event.name, args = ?event.args);
                self.write_event(&event);
            }
        }
    }

    fn write_event(&mut self, event: &LiveEvent) {
        let written = serde_json::to_writer(&mut self.output, event)
            .map_err(std::io::Error::from)
            .and_then(|_| writeln!(self.output))
            .and_then(|_| self.output.flush());

        if let Err(e) = written {
            warn!("couldn't write event {}: {e}", event.name);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use serde_json::json;
    use tokio::{sync::mpsc::channel, time::sleep};

    use super::*;
    use crate::live_feed::reload_timer::tests::FakeEmitter;

    fn session() -> FeedSession<Vec<u8>> {
        FeedSession::new(
            ReloadRequest {
                provider: "RKL".into(),
                route: "T5800".into(),
            },
            ReloadTiming::default(),
            vec![],
        )
    }

    fn connected(emitter: &FakeEmitter) -> SessionEvent<FakeEmitter> {
        SessionEvent::Connected {
            sid: Some("abc".into()),
            emitter: emitter.clone(),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn no_reloads_after_disconnect() {
        let emitter = FakeEmitter::default();
        let mut session = session();

        session.handle(connected(&emitter));
        assert!(session.is_connected());
        sleep(Duration::from_secs(25)).await;
        assert_eq!(emitter.sent_count(), 3);

        session.handle(SessionEvent::<FakeEmitter>::Disconnected {
            reason: "transport close".into(),
        });
        assert!(!session.is_connected());
        sleep(Duration::from_secs(60)).await;

        assert_eq!(emitter.sent_count(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn reconnect_replaces_timer() {
        let first = FakeEmitter::default();
        let second = FakeEmitter::default();
        let mut session = session();

        session.handle(connected(&first));
        sleep(Duration::from_secs(5)).await;
        session.handle(connected(&second));
        sleep(Duration::from_secs(27)).await;

        assert_eq!(first.sent_count(), 1);
        assert_eq!(second.sent_count(), 3);
    }

    #[tokio::test]
    async fn inbound_events_are_decoded_and_written() {
        let mut session = session();

        session.handle(SessionEvent::<FakeEmitter>::Inbound {
            name: "onFts-client".into(),
            args: vec![json!("H4sInot-gzip"), json!({"bus": "WA1234B"})],
        });

        let output = String::from_utf8(session.output.clone()).unwrap();
        let line: Value = serde_json::from_str(output.trim_end()).unwrap();
        assert_eq!(line["event"], json!("onFts-client"));
        assert!(line["args"][0]["__decodeError"].is_string());
        assert_eq!(line["args"][1], json!({"bus": "WA1234B"}));
        assert!(!session.is_connected());
    }

    #[tokio::test]
    async fn connect_error_keeps_session_alive() {
        let mut session = session();

        session.handle(SessionEvent::<FakeEmitter>::ConnectError {
            message: "websocket error".into(),
            data: Some(json!({"code": 1})),
        });

        assert!(!session.is_connected());
        assert!(session.output.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn closed_channel_disarms_timer() {
        let emitter = FakeEmitter::default();
        let (sender, receiver) = channel(8);

        sender.send(connected(&emitter)).await.unwrap();
        drop(sender);
        session().run(receiver).await;
        sleep(Duration::from_secs(60)).await;

        assert!(emitter.sent_count() <= 1);
    }
}
