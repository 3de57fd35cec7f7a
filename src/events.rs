// =============================================================================
// Event Bus — bounded, thread-safe, drop-newest-on-full
// =============================================================================

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use crossbeam_channel::{bounded, Receiver, Sender, TryRecvError};
use serde::{Deserialize, Serialize};
use tracing::warn;

pub const DEFAULT_CAPACITY: usize = 1000;

/// The kinds of events the core emits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    Candle,
    FsmTransition,
    Entry,
    Exit,
    KillSwitch,
    RiskVeto,
    Snapshot,
    Alert,
    SessionStarted,
    SessionStopped,
    SessionFlatten,
}

/// A free-form key/value payload attached to an event.
pub type EventPayload = HashMap<String, serde_json::Value>;

/// An immutable trading event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TradingEvent {
    pub kind: EventKind,
    pub data: EventPayload,
    pub timestamp: DateTime<Utc>,
}

/// Bounded multi-producer multi-consumer event bus. Emission never blocks:
/// on overflow the newest event is dropped and a warning is logged.
pub struct EventBus {
    sender: Sender<TradingEvent>,
    receiver: Receiver<TradingEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, receiver) = bounded(capacity.max(1));
        Self { sender, receiver }
    }

    pub fn with_default_capacity() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }

    /// A cloneable producer handle, safe to use from any thread.
    pub fn sender(&self) -> Sender<TradingEvent> {
        self.sender.clone()
    }

    /// Emit an event, dropping it (with a warning) if the bus is full.
    pub fn emit(&self, kind: EventKind, data: EventPayload) {
        let event = TradingEvent {
            kind,
            data,
            timestamp: Utc::now(),
        };
        if self.sender.try_send(event).is_err() {
            warn!(?kind, "event bus full, dropping event");
        }
    }

    /// Non-blocking receive; `None` if the bus is currently empty.
    pub fn get_nowait(&self) -> Option<TradingEvent> {
        match self.receiver.try_recv() {
            Ok(event) => Some(event),
            Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => None,
        }
    }

    /// Blocking receive with a timeout; `None` if nothing arrives in time.
    pub fn get(&self, timeout: std::time::Duration) -> Option<TradingEvent> {
        self.receiver.recv_timeout(timeout).ok()
    }

    /// Drain everything currently queued without blocking.
    pub fn drain(&self) -> Vec<TradingEvent> {
        let mut out = Vec::new();
        while let Some(event) = self.get_nowait() {
            out.push(event);
        }
        out
    }
}

/// Small helper for building an event payload inline.
#[macro_export]
macro_rules! payload {
    ($($key:expr => $value:expr),* $(,)?) => {{
        #[allow(unused_mut)]
        let mut map: $crate::events::EventPayload = std::collections::HashMap::new();
        $(map.insert($key.to_string(), serde_json::json!($value));)*
        map
    }};
}
