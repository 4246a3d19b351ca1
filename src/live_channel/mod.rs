//! LiveChannel - Push-Channel Connection
//!
//! ## Responsibilities
//!
//! - Hold exactly one Socket.IO connection to the backend
//! - Track connection status (disconnected -> connecting -> connected)
//! - Expose the latest frame / stats / error snapshot
//! - Fire-and-forget outbound sends
//!
//! Transport negotiation prefers a websocket and falls back to polling.
//! Reconnection after a drop is the Socket.IO client's own policy; this
//! module never re-implements it. The connection is closed unconditionally
//! when the owning value drops, so the socket cannot outlive its owner.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use rust_socketio::{client::Client, ClientBuilder, Event, Payload, RawClient, TransportType};

use crate::config::DashboardConfig;
use crate::error::{Error, Result};
use crate::models::{LiveFrame, StatsSnapshot};

/// Connection status
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelStatus {
    /// No connection (initial, or after a drop)
    Disconnected,
    /// Connection opened, handshake not yet confirmed
    Connecting,
    /// Handshake confirmed, events flowing
    Connected,
}

/// One event delivered by the underlying transport, in delivery order
#[derive(Debug, Clone, PartialEq)]
pub enum ChannelEvent {
    Connected,
    Disconnected,
    /// Inbound `detection` event
    Frame(LiveFrame),
    /// Inbound `stats` event
    Stats(StatsSnapshot),
    /// Inbound `error` event or transport error
    Error(String),
}

/// Snapshot of the channel state as rendered by the widgets
#[derive(Debug, Clone, Default)]
pub struct ChannelState {
    pub status: ChannelStatus,
    /// Last frame received; retained while disconnected (stale-but-present)
    pub last_frame: Option<LiveFrame>,
    /// Last stats snapshot received; retained while disconnected
    pub stats: Option<StatsSnapshot>,
    /// Last channel error message; cleared on reconnect
    pub last_error: Option<String>,
}

impl Default for ChannelStatus {
    fn default() -> Self {
        Self::Disconnected
    }
}

impl ChannelState {
    pub fn connected(&self) -> bool {
        self.status == ChannelStatus::Connected
    }

    /// Apply one channel event.
    ///
    /// Each transition is independent and idempotent. A disconnect leaves
    /// the last frame and stats in place: latest fact wins, stale data
    /// stays visible until replaced.
    pub fn apply(&mut self, event: ChannelEvent) {
        match event {
            ChannelEvent::Connected => {
                self.status = ChannelStatus::Connected;
                self.last_error = None;
            }
            ChannelEvent::Disconnected => {
                self.status = ChannelStatus::Disconnected;
            }
            ChannelEvent::Frame(frame) => {
                self.last_frame = Some(frame);
            }
            ChannelEvent::Stats(stats) => {
                self.stats = Some(stats);
            }
            ChannelEvent::Error(message) => {
                self.last_error = Some(message);
            }
        }
    }
}

/// State shared between the owning value and the transport callbacks
struct Shared {
    state: Mutex<ChannelState>,
    /// Bumped on every connect/frame/stats event; consumers treat any bump
    /// as a hint that server-side state may have changed
    signal_seq: AtomicU64,
}

impl Shared {
    fn lock_state(&self) -> MutexGuard<'_, ChannelState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn apply(&self, event: ChannelEvent) {
        let is_live_signal = matches!(
            event,
            ChannelEvent::Connected | ChannelEvent::Frame(_) | ChannelEvent::Stats(_)
        );
        self.lock_state().apply(event);
        if is_live_signal {
            self.signal_seq.fetch_add(1, Ordering::SeqCst);
        }
    }
}

/// Owned push-channel connection
pub struct LiveChannel {
    shared: Arc<Shared>,
    client: Option<Client>,
}

impl LiveChannel {
    /// Open the single underlying connection for this instance.
    ///
    /// Fails with `Error::Channel` if the initial handshake cannot be
    /// established and with `Error::Config` for an unsupported channel
    /// path (the Socket.IO client fixes its mount point).
    pub fn connect(config: &DashboardConfig) -> Result<Self> {
        if config.channel_path.trim_end_matches('/') != "/socket.io" {
            return Err(Error::Config(format!(
                "unsupported channel path {:?}: the Socket.IO client mounts at /socket.io/",
                config.channel_path
            )));
        }

        let shared = Arc::new(Shared {
            state: Mutex::new(ChannelState {
                status: ChannelStatus::Connecting,
                ..Default::default()
            }),
            signal_seq: AtomicU64::new(0),
        });

        let on_connect = {
            let shared = shared.clone();
            move |_: Payload, _: RawClient| {
                tracing::info!("Push channel connected");
                shared.apply(ChannelEvent::Connected);
            }
        };
        let on_close = {
            let shared = shared.clone();
            move |_: Payload, _: RawClient| {
                tracing::info!("Push channel disconnected");
                shared.apply(ChannelEvent::Disconnected);
            }
        };
        let on_error = {
            let shared = shared.clone();
            move |payload: Payload, _: RawClient| {
                let message = payload_message(payload)
                    .unwrap_or_else(|| "push channel error".to_string());
                tracing::warn!(error = %message, "Push channel error event");
                shared.apply(ChannelEvent::Error(message));
            }
        };
        let on_detection = {
            let shared = shared.clone();
            move |payload: Payload, _: RawClient| match decode_payload::<LiveFrame>(payload) {
                Ok(frame) => shared.apply(ChannelEvent::Frame(frame)),
                Err(e) => {
                    tracing::warn!(error = %e, "Undecodable detection payload");
                    shared.apply(ChannelEvent::Error(e.to_string()));
                }
            }
        };
        let on_stats = {
            let shared = shared.clone();
            move |payload: Payload, _: RawClient| match decode_payload::<StatsSnapshot>(payload) {
                Ok(stats) => shared.apply(ChannelEvent::Stats(stats)),
                Err(e) => {
                    tracing::warn!(error = %e, "Undecodable stats payload");
                    shared.apply(ChannelEvent::Error(e.to_string()));
                }
            }
        };
        let on_status = move |payload: Payload, _: RawClient| {
            if let Some(message) = payload_message(payload) {
                tracing::debug!(message = %message, "Server status greeting");
            }
        };

        let client = ClientBuilder::new(config.trimmed_base_url())
            .transport_type(TransportType::Any)
            .reconnect(true)
            .reconnect_on_disconnect(true)
            .on(Event::Connect, on_connect)
            .on(Event::Close, on_close)
            .on(Event::Error, on_error)
            .on("detection", on_detection)
            .on("stats", on_stats)
            .on("status", on_status)
            .connect()
            .map_err(|e| {
                shared.apply(ChannelEvent::Disconnected);
                Error::Channel(format!("failed to open push channel: {}", e))
            })?;

        Ok(Self {
            shared,
            client: Some(client),
        })
    }

    /// Clone of the current channel state for rendering
    pub fn snapshot(&self) -> ChannelState {
        self.shared.lock_state().clone()
    }

    pub fn status(&self) -> ChannelStatus {
        self.shared.lock_state().status
    }

    /// Monotonic live-signal counter (connect/frame/stats events)
    pub fn signal_seq(&self) -> u64 {
        self.shared.signal_seq.load(Ordering::SeqCst)
    }

    /// Outbound `message` event, fire-and-forget.
    ///
    /// Send failures are logged and swallowed; there is no acknowledgement
    /// tracking.
    pub fn send(&self, value: serde_json::Value) {
        if let Some(client) = &self.client {
            if let Err(e) = client.emit("message", value) {
                tracing::warn!(error = %e, "Outbound message dropped");
            }
        }
    }

    /// Close the underlying connection unconditionally
    pub fn close(&mut self) {
        if let Some(client) = self.client.take() {
            if let Err(e) = client.disconnect() {
                tracing::warn!(error = %e, "Error closing push channel");
            }
            self.shared.apply(ChannelEvent::Disconnected);
        }
    }
}

impl Drop for LiveChannel {
    fn drop(&mut self) {
        self.close();
    }
}

/// First JSON argument of an event payload, decoded to the target type
fn decode_payload<T: serde::de::DeserializeOwned>(payload: Payload) -> Result<T> {
    match payload {
        Payload::Text(mut values) => {
            if values.is_empty() {
                return Err(Error::Channel("empty event payload".to_string()));
            }
            serde_json::from_value(values.remove(0)).map_err(Error::from)
        }
        Payload::Binary(_) => Err(Error::Channel("unexpected binary payload".to_string())),
        _ => Err(Error::Channel("unsupported payload encoding".to_string())),
    }
}

/// Best-effort string message out of an event payload
fn payload_message(payload: Payload) -> Option<String> {
    match payload {
        Payload::Text(values) => values.first().map(|value| match value {
            serde_json::Value::String(s) => s.clone(),
            other => other
                .get("message")
                .and_then(|m| m.as_str())
                .map(str::to_string)
                .unwrap_or_else(|| other.to_string()),
        }),
        _ => None,
    }
}
