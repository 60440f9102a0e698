//! Long-lived feed subscription with automatic reconnect.
//!
//! The client runs as a tokio task that:
//! 1. Connects to the feed WebSocket endpoint.
//! 2. Sends the subscription handshake (credential, bounding boxes, message filter).
//! 3. Delivers every received frame to a handler.
//! 4. On any connection failure waits a fixed backoff and starts over at step 1.
//!
//! Shutdown is cooperative: a watch flag is checked before every reconnect
//! and before every frame is handed to the handler.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::sync::watch;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tracing::{debug, error, info, warn};

use crate::config::{BoundingBox, StreamConfig};
use crate::error::AisError;

/// Handler invoked for each received frame.
///
/// An `Err` is logged and the frame dropped; it never stops the stream.
pub type FrameHandler = Arc<dyn Fn(&str) -> anyhow::Result<()> + Send + Sync>;

/// Subscription handshake sent after every (re)connect.
#[derive(Clone)]
pub struct Subscription {
    pub api_key: String,
    pub bounding_boxes: Vec<BoundingBox>,
    pub message_types: Vec<String>,
}

impl Subscription {
    /// Serialize the handshake message.
    pub fn to_handshake(&self) -> String {
        serde_json::json!({
            "APIKey": self.api_key,
            "BoundingBoxes": self.bounding_boxes,
            "FilterMessageTypes": self.message_types,
        })
        .to_string()
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("api_key", &"<redacted>")
            .field("bounding_boxes", &self.bounding_boxes)
            .field("message_types", &self.message_types)
            .finish()
    }
}

/// Configuration for the feed connection.
#[derive(Debug, Clone)]
pub struct StreamClientConfig {
    /// Full WebSocket URL (e.g. `wss://stream.aisstream.io/v0/stream`).
    pub url: String,
    pub subscription: Subscription,
    /// Fixed wait between reconnect attempts.
    pub reconnect_backoff: Duration,
    /// Limit on the WebSocket upgrade of one attempt.
    pub connect_timeout: Duration,
}

impl StreamClientConfig {
    pub fn from_stream_config(stream: &StreamConfig, api_key: String) -> Self {
        Self {
            url: stream.url.clone(),
            subscription: Subscription {
                api_key,
                bounding_boxes: stream.bounding_boxes.clone(),
                message_types: stream.message_types.clone(),
            },
            reconnect_backoff: stream.reconnect_backoff(),
            connect_timeout: stream.connect_timeout(),
        }
    }
}

/// The feed subscription managed by a background tokio task.
pub struct StreamClient {
    config: StreamClientConfig,
    shutdown_tx: Option<watch::Sender<bool>>,
    task: Option<tokio::task::JoinHandle<()>>,
}

impl StreamClient {
    /// Create a new (not yet started) client.
    pub fn new(config: StreamClientConfig) -> Self {
        Self { config, shutdown_tx: None, task: None }
    }

    /// Start the connection task. Frames are forwarded to `on_frame`.
    pub fn start(&mut self, on_frame: FrameHandler) {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let config = self.config.clone();

        let task = tokio::spawn(async move {
            run_stream(config, on_frame, shutdown_rx).await;
        });

        self.shutdown_tx = Some(shutdown_tx);
        self.task = Some(task);
    }

    /// Whether the connection task has exited.
    pub fn is_finished(&self) -> bool {
        self.task.as_ref().is_none_or(|t| t.is_finished())
    }

    /// Request shutdown and wait for the task to finish.
    pub async fn stop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(true);
        }
        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
    }
}

/// How a single connected session ended.
enum SessionEnd {
    Shutdown,
    Disconnected,
}

/// Run feed sessions until shutdown is requested.
///
/// Returns only once `shutdown_rx` reads `true` (or its sender is dropped).
pub async fn run_stream(
    config: StreamClientConfig,
    on_frame: FrameHandler,
    mut shutdown_rx: watch::Receiver<bool>,
) {
    let backoff = config.reconnect_backoff;
    let handshake = config.subscription.to_handshake();
    let mut attempt: u64 = 0;

    loop {
        if *shutdown_rx.borrow() {
            info!("[stream] shutdown requested");
            return;
        }

        attempt += 1;
        info!("[stream] connecting to {} (attempt {attempt})", config.url);

        match run_session(&config, &handshake, &on_frame, &mut shutdown_rx).await {
            Ok(SessionEnd::Shutdown) => {
                info!("[stream] shutdown signal received");
                return;
            }
            Ok(SessionEnd::Disconnected) => warn!("[stream] disconnected"),
            Err(e) => error!("[stream] {e}"),
        }

        warn!("[stream] reconnecting in {backoff:?}");
        tokio::select! {
            _ = tokio::time::sleep(backoff) => {},
            _ = shutdown_rx.changed() => {
                info!("[stream] shutdown requested during backoff");
                return;
            }
        }
    }
}

/// One connect → handshake → receive cycle.
async fn run_session(
    config: &StreamClientConfig,
    handshake: &str,
    on_frame: &FrameHandler,
    shutdown_rx: &mut watch::Receiver<bool>,
) -> Result<SessionEnd, AisError> {
    let url = config.url.as_str();
    let request = url
        .into_client_request()
        .map_err(|e| AisError::Connection(format!("invalid request for {url}: {e}")))?;
    // A peer may accept TCP and never finish the upgrade.
    let connect = tokio::time::timeout(config.connect_timeout, tokio_tungstenite::connect_async(request));
    let (ws_stream, _response) = tokio::select! {
        res = connect => match res {
            Ok(res) => res.map_err(|e| AisError::Connection(format!("connect failed: {e}")))?,
            Err(_) => {
                return Err(AisError::Connection(format!("connect timed out after {:?}", config.connect_timeout)));
            }
        },
        _ = shutdown_rx.changed() => return Ok(SessionEnd::Shutdown),
    };
    info!("[stream] connected");

    let (mut ws_write, mut ws_read) = ws_stream.split();

    let sent = tokio::select! {
        res = ws_write.send(Message::Text(handshake.to_string().into())) => Some(res),
        _ = shutdown_rx.changed() => None,
    };
    match sent {
        Some(res) => res.map_err(|e| AisError::Connection(format!("subscription send failed: {e}")))?,
        None => {
            let _ = ws_write.close().await;
            return Ok(SessionEnd::Shutdown);
        }
    }
    debug!("[stream] subscription sent");

    loop {
        tokio::select! {
            biased;

            _ = shutdown_rx.changed() => {
                let _ = ws_write.close().await;
                return Ok(SessionEnd::Shutdown);
            }

            msg = ws_read.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        if *shutdown_rx.borrow() {
                            let _ = ws_write.close().await;
                            return Ok(SessionEnd::Shutdown);
                        }
                        deliver(on_frame, &text);
                    }
                    // Some feeds send JSON in binary frames.
                    Some(Ok(Message::Binary(data))) => {
                        if *shutdown_rx.borrow() {
                            let _ = ws_write.close().await;
                            return Ok(SessionEnd::Shutdown);
                        }
                        match std::str::from_utf8(&data) {
                            Ok(text) => deliver(on_frame, text),
                            Err(e) => warn!("[stream] dropping non-UTF-8 binary frame: {e}"),
                        }
                    }
                    Some(Ok(Message::Ping(data))) => {
                        if let Err(e) = ws_write.send(Message::Pong(data)).await {
                            return Err(AisError::Connection(format!("pong send failed: {e}")));
                        }
                    }
                    Some(Ok(Message::Close(frame))) => {
                        warn!("[stream] received close frame: {frame:?}");
                        return Ok(SessionEnd::Disconnected);
                    }
                    Some(Err(e)) => {
                        return Err(AisError::Connection(format!("read error: {e}")));
                    }
                    None => return Ok(SessionEnd::Disconnected),
                    _ => {} // Pong, Frame
                }
            }
        }
    }
}

#[inline]
fn deliver(on_frame: &FrameHandler, text: &str) {
    if let Err(e) = on_frame(text) {
        warn!("[stream] frame dropped: {e}");
    }
}
