//! WebSocket client for the TalkTagger game server
//!
//! A worker thread owns the socket and talks to the main loop through two
//! bounded channels. It reports a `Connected` status after every successful
//! (re)connect so the session can present its reconnection tokens again.

use crossbeam_channel::{bounded, Receiver, Sender, TryRecvError};
use std::net::TcpStream;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{debug, error, info, warn};
use tungstenite::stream::MaybeTlsStream;
use tungstenite::{connect, Message, WebSocket};

use super::config::ServerSettings;
use crate::core::io_traits::{CommandSender, ConnectionStatus, ServerEvent, ServerEventReceiver};
use crate::core::protocol::{ClientMessage, ServerMessage};

const CHANNEL_CAPACITY: usize = 128;
const INITIAL_RECONNECT_DELAY: Duration = Duration::from_secs(1);
const MAX_RECONNECT_DELAY: Duration = Duration::from_secs(30);

// =============================================================================
// TYPES
// =============================================================================

/// Outgoing messages (main thread -> WS thread)
#[derive(Debug)]
enum OutgoingMessage {
    Send(ClientMessage),
    Shutdown,
}

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("connect failed: {0}")]
    Connect(#[source] tungstenite::Error),
    #[error("send failed: {0}")]
    Send(#[source] tungstenite::Error),
    #[error("read failed: {0}")]
    Read(#[source] tungstenite::Error),
    #[error("failed to encode message: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("server closed the connection")]
    Closed,
    #[error("outgoing channel disconnected")]
    ChannelClosed,
}

// =============================================================================
// WEBSOCKET CLIENT
// =============================================================================

/// Thread-safe WebSocket client for the game server
pub struct GameWebSocketClient {
    settings: ServerSettings,
    tx: Option<Sender<OutgoingMessage>>,
    rx: Option<Receiver<ServerEvent>>,
    thread_handle: Option<JoinHandle<()>>,
    shutdown_flag: Arc<AtomicBool>,
    current_status: ConnectionStatus,
}

impl GameWebSocketClient {
    pub fn new(settings: ServerSettings) -> Self {
        Self {
            settings,
            tx: None,
            rx: None,
            thread_handle: None,
            shutdown_flag: Arc::new(AtomicBool::new(false)),
            current_status: ConnectionStatus::Disconnected,
        }
    }

    pub fn is_enabled(&self) -> bool {
        !self.settings.url.is_empty()
    }

    pub fn connect(&mut self) {
        if !self.is_enabled() {
            warn!("[WS] No server URL configured, not connecting");
            return;
        }

        if self.thread_handle.is_some() {
            warn!("[WS] Already running");
            return;
        }

        let (outgoing_tx, outgoing_rx) = bounded::<OutgoingMessage>(CHANNEL_CAPACITY);
        let (incoming_tx, incoming_rx) = bounded::<ServerEvent>(CHANNEL_CAPACITY);

        self.tx = Some(outgoing_tx);
        self.rx = Some(incoming_rx);
        self.shutdown_flag.store(false, Ordering::SeqCst);

        let shutdown_flag = Arc::clone(&self.shutdown_flag);
        let settings = self.settings.clone();

        let handle = thread::spawn(move || {
            let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
                websocket_thread(settings, outgoing_rx, incoming_tx.clone(), shutdown_flag);
            }));

            if let Err(panic_info) = result {
                let msg = if let Some(s) = panic_info.downcast_ref::<&str>() {
                    format!("WS thread panic: {}", s)
                } else {
                    "WS thread panic".to_string()
                };
                error!("{}", msg);
                let _ = incoming_tx.send(ServerEvent::Error(msg));
                let _ = incoming_tx.send(ServerEvent::StatusChanged(ConnectionStatus::Error));
            }
        });

        self.thread_handle = Some(handle);
        self.current_status = ConnectionStatus::Connecting;
    }

    pub fn disconnect(&mut self) {
        self.shutdown_flag.store(true, Ordering::SeqCst);
        if let Some(tx) = &self.tx {
            let _ = tx.send(OutgoingMessage::Shutdown);
        }
        if let Some(handle) = self.thread_handle.take() {
            let _ = handle.join();
        }
        self.tx = None;
        self.rx = None;
        self.current_status = ConnectionStatus::Disconnected;
    }
}

impl CommandSender for GameWebSocketClient {
    fn is_connected(&self) -> bool {
        self.current_status == ConnectionStatus::Connected
    }

    fn status(&self) -> ConnectionStatus {
        self.current_status
    }

    fn send(&self, message: ClientMessage) {
        if let Some(tx) = &self.tx {
            let kind = message.kind();
            if let Err(e) = tx.try_send(OutgoingMessage::Send(message)) {
                warn!(kind, "[WS] Failed to queue message: {}", e);
            }
        }
    }
}

impl ServerEventReceiver for GameWebSocketClient {
    fn poll_event(&mut self) -> Option<ServerEvent> {
        let rx = self.rx.as_ref()?;
        match rx.try_recv() {
            Ok(event) => {
                if let ServerEvent::StatusChanged(status) = &event {
                    self.current_status = *status;
                }
                Some(event)
            }
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => {
                self.current_status = ConnectionStatus::Disconnected;
                None
            }
        }
    }
}

impl Drop for GameWebSocketClient {
    fn drop(&mut self) {
        self.disconnect();
    }
}

// =============================================================================
// WEBSOCKET THREAD
// =============================================================================

fn websocket_thread(
    settings: ServerSettings,
    outgoing_rx: Receiver<OutgoingMessage>,
    incoming_tx: Sender<ServerEvent>,
    shutdown_flag: Arc<AtomicBool>,
) {
    let mut reconnect_delay = INITIAL_RECONNECT_DELAY;
    let url = settings.ws_url();

    loop {
        if shutdown_flag.load(Ordering::SeqCst) {
            break;
        }

        info!(url = %url, "[WS] Connecting...");
        let _ = incoming_tx.send(ServerEvent::StatusChanged(ConnectionStatus::Connecting));

        match connect(url.as_str()).map_err(TransportError::Connect) {
            Ok((mut socket, _)) => {
                info!("[WS] Connected");

                // Game actions queued while offline are not replayed
                let mut drained = 0u32;
                while let Ok(msg) = outgoing_rx.try_recv() {
                    if let OutgoingMessage::Shutdown = msg {
                        let _ = incoming_tx.send(ServerEvent::StatusChanged(
                            ConnectionStatus::Disconnected,
                        ));
                        return;
                    }
                    drained += 1;
                }
                if drained > 0 {
                    info!(count = drained, "[WS] Dropped stale outgoing messages");
                }

                let _ = incoming_tx.send(ServerEvent::StatusChanged(ConnectionStatus::Connected));
                reconnect_delay = INITIAL_RECONNECT_DELAY;

                let result = message_loop(&mut socket, &outgoing_rx, &incoming_tx, &shutdown_flag);
                if let Err(e) = &result {
                    info!(error = %e, "[WS] Disconnected");
                }
                let _ = socket.close(None);

                if result.is_err() && !shutdown_flag.load(Ordering::SeqCst) {
                    let next = if settings.auto_reconnect {
                        ConnectionStatus::Reconnecting
                    } else {
                        ConnectionStatus::Disconnected
                    };
                    let _ = incoming_tx.send(ServerEvent::StatusChanged(next));
                }
            }
            Err(e) => {
                error!(error = %e, "[WS] Connection failed");
                let _ = incoming_tx.send(ServerEvent::Error(e.to_string()));
                let _ = incoming_tx.send(ServerEvent::StatusChanged(ConnectionStatus::Error));
            }
        }

        if shutdown_flag.load(Ordering::SeqCst) || !settings.auto_reconnect {
            break;
        }

        info!(delay = reconnect_delay.as_secs(), "[WS] Reconnecting...");
        thread::sleep(reconnect_delay);
        reconnect_delay = next_delay(reconnect_delay);
    }

    let _ = incoming_tx.send(ServerEvent::StatusChanged(ConnectionStatus::Disconnected));
}

/// Exponential backoff, capped
fn next_delay(current: Duration) -> Duration {
    (current * 2).min(MAX_RECONNECT_DELAY)
}

fn send_message(
    socket: &mut WebSocket<MaybeTlsStream<TcpStream>>,
    msg: &ClientMessage,
) -> Result<(), TransportError> {
    let json = serde_json::to_string(msg)?;
    socket
        .send(Message::Text(json))
        .map_err(TransportError::Send)?;
    debug!(kind = msg.kind(), "[WS] Sent");
    Ok(())
}

/// Parse one text frame; unknown or malformed frames are skipped
fn parse_frame(text: &str) -> Option<ServerMessage> {
    match serde_json::from_str::<ServerMessage>(text) {
        Ok(msg) => Some(msg),
        Err(e) => {
            debug!(error = %e, "[WS] Ignoring unrecognised message");
            None
        }
    }
}

fn message_loop(
    socket: &mut WebSocket<MaybeTlsStream<TcpStream>>,
    outgoing_rx: &Receiver<OutgoingMessage>,
    incoming_tx: &Sender<ServerEvent>,
    shutdown_flag: &Arc<AtomicBool>,
) -> Result<(), TransportError> {
    match socket.get_ref() {
        MaybeTlsStream::Plain(tcp) => {
            let _ = tcp.set_nonblocking(true);
        }
        MaybeTlsStream::NativeTls(tls) => {
            let _ = tls.get_ref().set_nonblocking(true);
        }
        _ => {}
    }

    loop {
        if shutdown_flag.load(Ordering::SeqCst) {
            return Ok(());
        }

        match outgoing_rx.try_recv() {
            Ok(OutgoingMessage::Send(msg)) => send_message(socket, &msg)?,
            Ok(OutgoingMessage::Shutdown) => return Ok(()),
            Err(TryRecvError::Empty) => {}
            Err(TryRecvError::Disconnected) => return Err(TransportError::ChannelClosed),
        }

        match socket.read() {
            Ok(Message::Text(text)) => {
                if let Some(msg) = parse_frame(&text) {
                    debug!(kind = msg.kind(), "[WS] Received");
                    let _ = incoming_tx.send(ServerEvent::Message(msg));
                }
            }
            Ok(Message::Close(_)) => return Err(TransportError::Closed),
            Err(tungstenite::Error::Io(ref e)) if e.kind() == std::io::ErrorKind::WouldBlock => {}
            Err(e) => return Err(TransportError::Read(e)),
            _ => {}
        }

        thread::sleep(Duration::from_millis(10));
    }
}
