use serde::{Deserialize, Serialize};

use crate::MdMode;

/// Connection / feed status change. Emitted by the adapter on connect,
/// disconnect, market-data mode changes, and adapter-level warnings.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StatusEvent {
    pub connected: bool,
    pub md_mode: MdMode,
    pub reason: Option<String>,
    /// Monotonic receipt time (ns).
    pub ts_recv_mono_ns: u64,
    /// Wall-clock receipt time (ms since epoch).
    pub ts_recv_unix_ms: i64,
}

/// L1 quote update (top-of-book bid/ask/last). No depth, no time-and-sales.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct QuoteEvent {
    /// Broker contract id; clears the NO_CONTRACT gate once observed.
    pub con_id: Option<i64>,
    pub bid: Option<f64>,
    pub ask: Option<f64>,
    pub last: Option<f64>,
    pub bid_size: Option<u64>,
    pub ask_size: Option<u64>,
    /// Monotonic receipt time (ns); the basis of all staleness math.
    pub ts_recv_mono_ns: u64,
    pub ts_recv_unix_ms: i64,
    /// Exchange timestamp when the adapter supplies one.
    pub ts_exch_unix_ms: Option<i64>,
}

/// Non-fatal adapter error surfaced as context. Fatal classes (client-id
/// collision, auth) abort startup instead of being enqueued.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AdapterErrorEvent {
    pub code: i32,
    pub message: String,
    pub ts_recv_mono_ns: u64,
    pub ts_recv_unix_ms: i64,
}

/// Normalized adapter→engine event envelope. Immutable once enqueued.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FeedEvent {
    Status(StatusEvent),
    Quote(QuoteEvent),
    AdapterError(AdapterErrorEvent),
}

impl FeedEvent {
    /// Monotonic receipt time of the underlying event.
    pub fn ts_recv_mono_ns(&self) -> u64 {
        match self {
            FeedEvent::Status(e) => e.ts_recv_mono_ns,
            FeedEvent::Quote(e) => e.ts_recv_mono_ns,
            FeedEvent::AdapterError(e) => e.ts_recv_mono_ns,
        }
    }
}
