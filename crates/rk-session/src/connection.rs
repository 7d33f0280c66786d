//! Per-socket write path (§4.3).
//!
//! Grounded on `client_connection.go`'s `ClientConnection`/`SafeWrite`: one
//! mutex around the socket, a write deadline applied around every send, and
//! a one-way transition to "closed" on failure so later writes become
//! no-ops instead of erroring repeatedly.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use axum::extract::ws::{Message, WebSocket};
use futures_util::stream::SplitSink;
use futures_util::SinkExt;
use tokio::sync::Mutex;

use rk_types::protocol::ServerEnvelope;

/// Wraps the sending half of a client's websocket. Reads happen on the
/// single dispatcher task that owns the receiving half and need no lock
/// (§4.3); only the write path is shared, since broadcasts come from the
/// dispatcher, the turn timer, and the tick loop concurrently.
pub struct Connection {
    sink: Mutex<Option<SplitSink<WebSocket, Message>>>,
    write_deadline: Duration,
    closed: AtomicBool,
}

impl Connection {
    pub fn new(sink: SplitSink<WebSocket, Message>, write_deadline: Duration) -> Self {
        Self {
            sink: Mutex::new(Some(sink)),
            write_deadline,
            closed: AtomicBool::new(false),
        }
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Relaxed)
    }

    /// Serialize one frame and send it under the write deadline. A failed
    /// or timed-out send marks the connection closed and drops the sink, so
    /// every later call becomes a silent no-op (§4.3) rather than a second
    /// failure.
    pub async fn safe_write(&self, envelope: &ServerEnvelope) {
        if self.is_closed() {
            return;
        }
        let text = match serde_json::to_string(envelope) {
            Ok(text) => text,
            Err(err) => {
                tracing::error!(%err, "failed to serialize server envelope");
                return;
            }
        };

        let mut guard = self.sink.lock().await;
        let Some(sink) = guard.as_mut() else {
            return;
        };

        let sent = tokio::time::timeout(self.write_deadline, sink.send(Message::Text(text.into()))).await;
        match sent {
            Ok(Ok(())) => {}
            Ok(Err(err)) => {
                tracing::warn!(%err, "websocket write failed, closing connection");
                self.closed.store(true, Ordering::Relaxed);
                *guard = None;
            }
            Err(_) => {
                tracing::warn!("websocket write deadline exceeded, closing connection");
                self.closed.store(true, Ordering::Relaxed);
                *guard = None;
            }
        }
    }
}
