//! Live aggregator connection: one registration frame on open, then
//! user-initiated sends and opaque inbound frames.

use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt, stream::SplitSink};
use tokio::net::TcpStream;
use tokio::sync::{Mutex, mpsc, watch};
use tokio::time::timeout;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async, tungstenite::Message};
use tracing::{debug, warn};
use url::Url;

use crate::error::{ClientError, Result};
use crate::role::Role;
use crate::session::SessionPhase;
use crate::wire::MessageRecord;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;
type WsWriter = SplitSink<WsStream, Message>;

/// One live bidirectional transport for a role.
///
/// Created only by a successful bootstrap; replaced wholesale on reconnect,
/// never merged.
pub struct Connection {
    role: Role,
    phase: watch::Sender<SessionPhase>,
    writer: Arc<Mutex<Option<WsWriter>>>,
    frames: Arc<Mutex<mpsc::UnboundedReceiver<String>>>,
    reader_task: Mutex<Option<tokio::task::JoinHandle<()>>>,
}

impl Connection {
    /// Open the transport, send the registration frame, and start the
    /// background receive loop. Publishes `Open` on `phase` once the
    /// registration frame is on the wire, and `Closed` when the transport
    /// goes away.
    pub(crate) async fn establish(
        role: Role,
        target: &Url,
        registration: &MessageRecord,
        connect_timeout: Duration,
        phase: watch::Sender<SessionPhase>,
    ) -> Result<Self> {
        let (stream, _response) = timeout(connect_timeout, connect_async(target.as_str()))
            .await
            .map_err(|_| ClientError::Timeout(format!("WebSocket handshake with {target}")))?
            .map_err(|error| ClientError::ConnectionFailed(error.to_string()))?;
        let (mut writer, mut reader) = stream.split();

        // Exactly one registration frame per successful open; everything
        // after this is user-initiated.
        let frame = serde_json::to_string(registration)?;
        writer
            .send(Message::Text(frame.into()))
            .await
            .map_err(|error| ClientError::ConnectionFailed(error.to_string()))?;
        debug!(role = %role, "registration frame sent");

        phase.send_replace(SessionPhase::Open);

        let (frames_tx, frames_rx) = mpsc::unbounded_channel();
        let phase_for_reader = phase.clone();
        let reader_task = tokio::spawn(async move {
            while let Some(frame) = reader.next().await {
                match frame {
                    Ok(Message::Text(text)) => {
                        if frames_tx.send(text.to_string()).is_err() {
                            break;
                        }
                    }
                    Ok(Message::Ping(payload)) => {
                        debug!(role = %role, "ping from aggregator ({} bytes)", payload.len());
                    }
                    Ok(Message::Pong(_)) => {}
                    Ok(Message::Close(_)) => break,
                    Ok(Message::Binary(_)) => {}
                    Ok(Message::Frame(_)) => {}
                    Err(error) => {
                        warn!(role = %role, "websocket read error: {error}");
                        break;
                    }
                }
            }
            phase_for_reader.send_replace(SessionPhase::Closed);
        });

        Ok(Self {
            role,
            phase,
            writer: Arc::new(Mutex::new(Some(writer))),
            frames: Arc::new(Mutex::new(frames_rx)),
            reader_task: Mutex::new(Some(reader_task)),
        })
    }

    pub fn role(&self) -> Role {
        self.role
    }

    /// Current lifecycle phase.
    pub fn phase(&self) -> SessionPhase {
        *self.phase.borrow()
    }

    /// Watch lifecycle transitions as they happen.
    pub fn watch_phase(&self) -> watch::Receiver<SessionPhase> {
        self.phase.subscribe()
    }

    /// Validate and send one user message.
    ///
    /// The sent record is returned so the caller can append it to history.
    /// A transport error after the frame leaves the local buffer is not
    /// distinguished from success; there is no acknowledgment protocol.
    pub async fn send(&self, request_type: &str, data_text: &str) -> Result<MessageRecord> {
        let request_type = request_type.trim();
        if request_type.is_empty() {
            return Err(ClientError::EmptyRequestType);
        }
        if self.phase() != SessionPhase::Open {
            return Err(ClientError::NotConnected);
        }
        let data = serde_json::from_str(data_text.trim())
            .map_err(|error| ClientError::InvalidPayload(error.to_string()))?;
        let record = MessageRecord {
            request_type: request_type.to_string(),
            data,
        };
        self.send_record(&record).await?;
        Ok(record)
    }

    /// Send an already-validated record, e.g. a history replay.
    pub async fn send_record(&self, record: &MessageRecord) -> Result<()> {
        if self.phase() != SessionPhase::Open {
            return Err(ClientError::NotConnected);
        }
        let text = serde_json::to_string(record)?;
        let mut guard = self.writer.lock().await;
        let writer = guard.as_mut().ok_or(ClientError::NotConnected)?;
        writer
            .send(Message::Text(text.into()))
            .await
            .map_err(|error| ClientError::ConnectionFailed(error.to_string()))
    }

    /// Next inbound frame, opaque text; `None` once the transport is gone.
    pub async fn recv(&self) -> Option<String> {
        self.frames.lock().await.recv().await
    }

    /// Shared handle to the inbound frame stream, for a consumer task.
    pub fn frames(&self) -> Arc<Mutex<mpsc::UnboundedReceiver<String>>> {
        Arc::clone(&self.frames)
    }

    /// Close the transport and stop the background receive loop.
    pub async fn close(&self) {
        if let Some(mut writer) = self.writer.lock().await.take() {
            let _ = writer.send(Message::Close(None)).await;
        }
        if let Some(task) = self.reader_task.lock().await.take() {
            task.abort();
        }
        self.phase.send_replace(SessionPhase::Closed);
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        if let Ok(mut guard) = self.reader_task.try_lock()
            && let Some(task) = guard.take()
        {
            task.abort();
        }
    }
}
