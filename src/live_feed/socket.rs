//! socket.io wiring for the live feed.
//!
//! Every callback turns into a [`SessionEvent`] on the session channel.

use std::{
    sync::{Arc, Mutex},
    time::Duration,
};

use base64::{Engine, engine::general_purpose::STANDARD};
use futures::FutureExt;
use rust_socketio::{
    Event, Payload, TransportType,
    asynchronous::{Client, ClientBuilder},
};
use serde_json::Value;
use tokio::sync::{mpsc::Sender, oneshot};
use tracing::{debug, info};

use super::{
    emitter::{EmitError, EventEmitter},
    session::SessionEvent,
};

/// Default real-time server. socket.io's `/socket.io/` path is implied.
pub const LIVE_FEED_URL: &str = "https://rapidbus-socketio-avl.prasarana.com.my";
/// The server only accepts connections coming from the kiosk site.
pub const LIVE_FEED_ORIGIN: &str = "https://myrapidbus.prasarana.com.my";

/// [`EventEmitter`] over a connected socket.io client
#[derive(Clone)]
pub struct SocketHandle(Client);

impl EventEmitter for SocketHandle {
    async fn emit(
        &self,
        event: &str,
        payload: Value,
        ack_timeout: Duration,
    ) -> Result<oneshot::Receiver<Value>, EmitError> {
        let (ack_sender, ack) = oneshot::channel();
        let ack_sender = Arc::new(Mutex::new(Some(ack_sender)));

        self.0
            .emit_with_ack(event, payload, ack_timeout, move |payload: Payload, _| {
                let sender = ack_sender.lock().ok().and_then(|mut sender| sender.take());
                if let Some(sender) = sender {
                    _ = sender.send(ack_value(payload));
                }
                async {}.boxed()
            })
            .await?;

        Ok(ack)
    }
}

/// Connects to the live feed over websocket only.
#[tracing::instrument(err, skip(events))]
pub async fn connect(
    url: &str,
    origin: &str,
    events: Sender<SessionEvent<SocketHandle>>,
) -> Result<Client, rust_socketio::Error> {
    let on_connect = events.clone();
    let on_close = events.clone();
    let on_error = events.clone();
    let on_any = events;

    let client = ClientBuilder::new(url)
        .transport_type(TransportType::Websocket)
        .opening_header("Origin", origin.to_string())
        .on(Event::Connect, move |payload, client| {
            let events = on_connect.clone();
            async move {
                let event = SessionEvent::Connected {
                    sid: connection_id(payload),
                    emitter: SocketHandle(client),
                };
                forward(&events, event).await;
            }
            .boxed()
        })
        .on(Event::Close, move |payload, _| {
            let events = on_close.clone();
            async move {
                let reason = payload_args(payload)
                    .first()
                    .map(value_text)
                    .unwrap_or_else(|| "unknown".to_string());
                forward(&events, SessionEvent::Disconnected { reason }).await;
            }
            .boxed()
        })
        .on(Event::Error, move |payload, _| {
            let events = on_error.clone();
            async move {
                let mut args = payload_args(payload).into_iter();
                let message = args
                    .next()
                    .map(|arg| value_text(&arg))
                    .unwrap_or_else(|| "unknown error".to_string());
                let data = args.next();
                forward(&events, SessionEvent::ConnectError { message, data }).await;
            }
            .boxed()
        })
        .on_any(move |event, payload, _| {
            let events = on_any.clone();
            async move {
                let event = SessionEvent::Inbound {
                    name: event_name(&event),
                    args: payload_args(payload),
                };
                forward(&events, event).await;
            }
            .boxed()
        })
        .connect()
        .await?;

    info!("socket opened to {url}");

    Ok(client)
}

async fn forward(events: &Sender<SessionEvent<SocketHandle>>, event: SessionEvent<SocketHandle>) {
    if events.send(event).await.is_err() {
        debug!("session is gone, dropping socket event");
    }
}

fn event_name(event: &Event) -> String {
    match event {
        Event::Custom(name) => name.clone(),
        other => format!("{other:?}").to_lowercase(),
    }
}

/// Arguments of a socket.io payload as JSON. Binary attachments become base64 strings.
#[allow(deprecated)]
fn payload_args(payload: Payload) -> Vec<Value> {
    match payload {
        Payload::Text(values) => values,
        Payload::Binary(bytes) => vec![Value::String(STANDARD.encode(bytes))],
        Payload::String(text) => {
            vec![serde_json::from_str(&text).unwrap_or(Value::String(text))]
        }
    }
}

fn ack_value(payload: Payload) -> Value {
    let mut args = payload_args(payload);
    match args.len() {
        0 => Value::Null,
        1 => args.remove(0),
        _ => Value::Array(args),
    }
}

/// socket.io v4 puts `{"sid": ..}` in the connect packet.
fn connection_id(payload: Payload) -> Option<String> {
    payload_args(payload).iter().find_map(|arg| {
        arg.get("sid")
            .and_then(Value::as_str)
            .map(str::to_string)
    })
}

fn value_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
