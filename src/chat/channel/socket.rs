//! WebSocket transport for the event channel.
//!
//! Frames are JSON objects whose `type` field names the event; the whole
//! object is handed to the bus as the payload. The first frame after
//! connecting authenticates the connection with the bearer token. Lost
//! connections are retried with exponential backoff up to a fixed number of
//! attempts.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use futures::{SinkExt, StreamExt};
use serde_json::{Value, json};
use tokio::net::TcpStream;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message as Frame;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use tracing::{debug, error, info, warn};

use crate::chat::channel::EventSink;
use crate::chat::channel::bus::EventBus;
use crate::chat::core::config::SocketConfig;
use crate::chat::core::credentials::AuthToken;
use crate::chat::core::errors::{ChatError, ChatResult};
use crate::chat::events::OutboundEvent;

type Socket = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Why a connection ended.
enum Pump {
    /// The owning [`SocketChannel`] went away.
    Shutdown,
    /// The server or the network dropped the connection.
    Disconnected,
}

/// Event channel backed by a WebSocket connection.
///
/// Inbound frames are dispatched on the [`EventBus`] given at spawn time;
/// outbound events go through [`EventSink::emit`].
pub struct SocketChannel {
    outbound: UnboundedSender<String>,
    connected: Arc<AtomicBool>,
    task: JoinHandle<()>,
}

impl SocketChannel {
    /// Start the connection task.
    #[must_use]
    pub fn spawn(config: SocketConfig, token: AuthToken, bus: EventBus) -> Self {
        let (outbound, receiver) = mpsc::unbounded_channel();
        let connected = Arc::new(AtomicBool::new(false));
        let task = tokio::spawn(run(config, token, bus, receiver, Arc::clone(&connected)));

        Self {
            outbound,
            connected,
            task,
        }
    }

    /// Whether the socket is currently open and authenticated.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Acquire)
    }

    /// Whether the connection task is still alive (connected or retrying).
    #[must_use]
    pub fn is_running(&self) -> bool {
        !self.task.is_finished()
    }

    /// Close the connection and wait for the task to finish.
    pub async fn close(self) {
        let Self { outbound, task, .. } = self;
        drop(outbound);
        if let Err(err) = task.await {
            warn!(error = %err, "socket task ended abnormally");
        }
    }
}

impl EventSink for SocketChannel {
    fn emit(&self, event: &OutboundEvent) -> ChatResult<()> {
        if !self.is_connected() {
            return Err(ChatError::NotConnected);
        }
        let frame = event.to_frame()?;
        self.outbound
            .send(frame)
            .map_err(|_| ChatError::ChannelClosed)?;
        debug!(event = %event.name(), chat_id = %event.chat_id(), "event emitted");
        Ok(())
    }
}

async fn run(
    config: SocketConfig,
    token: AuthToken,
    bus: EventBus,
    mut outbound: UnboundedReceiver<String>,
    connected: Arc<AtomicBool>,
) {
    let mut attempts: u32 = 0;

    loop {
        match connect(&config, &token).await {
            Ok(socket) => {
                attempts = 0;
                connected.store(true, Ordering::Release);
                info!(url = %config.url, "socket connected");

                let outcome = pump(socket, &bus, &mut outbound).await;
                connected.store(false, Ordering::Release);
                match outcome {
                    Pump::Shutdown => {
                        debug!("socket channel shut down");
                        return;
                    }
                    Pump::Disconnected => info!("socket disconnected"),
                }
            }
            Err(err) if !err.is_retryable() => {
                error!(url = %config.url, error = %err, "socket cannot connect, giving up");
                return;
            }
            Err(err) => warn!(url = %config.url, error = %err, "socket connection failed"),
        }

        attempts += 1;
        if attempts > config.max_reconnect_attempts {
            error!(attempts = config.max_reconnect_attempts, "max reconnection attempts reached");
            return;
        }

        let delay = config.reconnect_delay(attempts);
        info!(attempt = attempts, ?delay, "reconnecting");
        tokio::select! {
            () = tokio::time::sleep(delay) => {}
            frame = outbound.recv() => {
                if frame.is_none() {
                    return;
                }
                warn!("dropping outbound frame queued before disconnect");
            }
        }
    }
}

async fn connect(config: &SocketConfig, token: &AuthToken) -> ChatResult<Socket> {
    let (mut socket, _response) = tokio_tungstenite::connect_async(config.url.as_str()).await?;
    socket.send(Frame::Text(auth_frame(token).into())).await?;
    Ok(socket)
}

async fn pump(socket: Socket, bus: &EventBus, outbound: &mut UnboundedReceiver<String>) -> Pump {
    let (mut sink, mut source) = socket.split();

    loop {
        tokio::select! {
            frame = outbound.recv() => match frame {
                Some(frame) => {
                    if let Err(err) = sink.send(Frame::Text(frame.into())).await {
                        warn!(error = %err, "failed to send frame");
                        return Pump::Disconnected;
                    }
                }
                None => {
                    let _ = sink.send(Frame::Close(None)).await;
                    return Pump::Shutdown;
                }
            },
            message = source.next() => match message {
                Some(Ok(Frame::Text(text))) => route_frame(bus, text.as_str()),
                Some(Ok(Frame::Close(close))) => {
                    debug!(?close, "server closed the socket");
                    return Pump::Disconnected;
                }
                Some(Ok(_)) => {}
                Some(Err(err)) => {
                    warn!(error = %err, "socket error");
                    return Pump::Disconnected;
                }
                None => return Pump::Disconnected,
            },
        }
    }
}

/// Authentication frame sent right after the handshake.
#[must_use]
pub fn auth_frame(token: &AuthToken) -> String {
    json!({ "type": "authentication", "token": token.expose() }).to_string()
}

/// Decode a text frame and dispatch it on `bus`.
pub fn route_frame(bus: &EventBus, text: &str) {
    let value: Value = match serde_json::from_str(text) {
        Ok(value) => value,
        Err(err) => {
            warn!(error = %err, "ignoring non-JSON frame");
            return;
        }
    };

    let Some(kind) = value.get("type").and_then(Value::as_str) else {
        warn!("ignoring frame without a `type` field");
        return;
    };

    if !bus.dispatch(kind, &value) {
        debug!(event = kind, "no listener for event");
    }
}
