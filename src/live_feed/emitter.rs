use std::{future::Future, time::Duration};

use serde_json::Value;
use tokio::{sync::oneshot, time::timeout};

use crate::model::AckOutcome;

/// The sending half of a live feed connection.
pub trait EventEmitter: Clone + Send + Sync + 'static {
    /// Hands `event` to the connection.
    ///
    /// The returned receiver resolves with the server's acknowledgement, if one
    /// ever arrives.
    fn emit(
        &self,
        event: &str,
        payload: Value,
        ack_timeout: Duration,
    ) -> impl Future<Output = Result<oneshot::Receiver<Value>, EmitError>> + Send;
}

#[derive(thiserror::Error, Debug)]
pub enum EmitError {
    #[error("socket error: {0}")]
    Socket(#[from] rust_socketio::Error),

    #[error("connection is closed")]
    Closed,
}

/// Emits `event` and waits at most `ack_timeout` for its acknowledgement.
///
/// Never fails, every problem ends up in the returned [`AckOutcome`].
pub async fn emit_with_ack<E: EventEmitter>(
    emitter: &E,
    event: &str,
    payload: Value,
    ack_timeout: Duration,
) -> AckOutcome {
    let ack = match emitter.emit(event, payload, ack_timeout).await {
        Ok(ack) => ack,
        Err(e) => return AckOutcome::failed(event, e),
    };

    match timeout(ack_timeout, ack).await {
        Ok(Ok(ack)) => AckOutcome::acked(event, ack),
        Ok(Err(_)) => AckOutcome::failed(event, "acknowledgement was dropped"),
        Err(_) => AckOutcome::failed(
            event,
            format!("operation has timed out after {}ms", ack_timeout.as_millis()),
        ),
    }
}
