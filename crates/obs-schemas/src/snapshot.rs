use serde::{Deserialize, Serialize};
use std::fmt;

use crate::{Intent, MdMode, ReasonCode};

// ---------------------------------------------------------------------------
// Nested sub-structures
// ---------------------------------------------------------------------------

/// Instrument identity. Exactly one instrument per run; `contract_key` is
/// `SYMBOL.YYYYMM`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Instrument {
    pub symbol: String,
    pub contract_key: String,
    pub con_id: Option<i64>,
    pub tick_size: f64,
}

/// Feed connection and market-data mode as of the cycle boundary.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FeedState {
    pub connected: bool,
    pub md_mode: MdMode,
    /// True iff disconnected or not in realtime mode.
    pub degraded: bool,
    pub status_reason_codes: Vec<String>,
    pub last_status_change_mono_ns: Option<u64>,
}

impl Default for FeedState {
    fn default() -> Self {
        Self {
            connected: false,
            md_mode: MdMode::None,
            degraded: true,
            status_reason_codes: Vec::new(),
            last_status_change_mono_ns: None,
        }
    }
}

/// The most recent L1 quote plus per-cycle derivations. The whole block is
/// absent until the first quote event arrives.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct QuoteView {
    pub bid: Option<f64>,
    pub ask: Option<f64>,
    pub last: Option<f64>,
    pub bid_size: Option<u64>,
    pub ask_size: Option<u64>,
    pub ts_recv_unix_ms: i64,
    pub ts_recv_mono_ns: u64,
    pub ts_exch_unix_ms: Option<i64>,
    /// Age of the quote at cycle start, clamped non-negative.
    pub staleness_ms: i64,
    /// `ceil((ask - bid) / tick_size)`; None when bid/ask are unusable.
    pub spread_ticks: Option<i64>,
}

/// Session phase derived from the local-time calendar.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SessionPhase {
    Operating,
    Break,
    Closed,
}

impl fmt::Display for SessionPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SessionPhase::Operating => "OPERATING",
            SessionPhase::Break => "BREAK",
            SessionPhase::Closed => "CLOSED",
        };
        f.write_str(s)
    }
}

/// Session window state at the cycle boundary.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SessionState {
    pub in_operating_window: bool,
    pub is_break_window: bool,
    pub session_phase: SessionPhase,
    /// Trading-session label (rolls forward at 17:00 local), ISO date.
    pub session_date_iso: String,
}

/// Operator controls and last-applied command identity.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Controls {
    pub intent: Intent,
    pub arm: bool,
    pub last_cmd_id: u64,
    pub last_cmd_ts_unix_ms: Option<i64>,
}

impl Default for Controls {
    fn default() -> Self {
        Self {
            intent: Intent::Flat,
            arm: false,
            last_cmd_id: 0,
            last_cmd_ts_unix_ms: None,
        }
    }
}

/// Loop health describes the last *completed* cycle: a snapshot cannot
/// carry its own cycle's duration because that is only known after publish.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LoopHealth {
    pub cycle_ms: f64,
    pub cycle_overrun: bool,
    pub engine_degraded: bool,
    pub last_cycle_start_mono_ns: u64,
}

/// The fixed-key metrics block attached to every gate evaluation. Keys are
/// always present; values may be null.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GateMetrics {
    pub staleness_ms: Option<i64>,
    pub spread_ticks: Option<i64>,
    pub md_mode: MdMode,
    pub connected: bool,
    pub in_operating_window: bool,
    pub is_break_window: bool,
    pub engine_degraded: bool,
    pub cycle_ms: Option<f64>,
}

/// Hard-gate outcome for the cycle.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GateReport {
    pub allowed: bool,
    pub reason_codes: Vec<ReasonCode>,
    pub gate_metrics: GateMetrics,
}

// ---------------------------------------------------------------------------
// Snapshot
// ---------------------------------------------------------------------------

/// Immutable engine state view, published atomically once per cycle.
///
/// Invariants:
/// - `snapshot_id` is strictly monotonic from 1 with no gaps within a run.
/// - `ready == gates.allowed` and `ready_reasons == gates.reason_codes`.
/// - Once published a snapshot is never mutated; readers may hold it
///   arbitrarily long.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub schema_version: String,
    pub app_version: String,
    pub config_hash: String,

    pub run_id: String,
    pub run_start_ts_unix_ms: i64,
    pub snapshot_id: u64,
    pub cycle_count: u64,
    pub ts_unix_ms: i64,
    pub ts_mono_ns: u64,

    pub instrument: Instrument,
    pub feed: FeedState,
    pub quote: Option<QuoteView>,
    pub session: SessionState,
    pub controls: Controls,
    #[serde(rename = "loop")]
    pub loop_health: LoopHealth,
    pub gates: GateReport,

    pub last_any_event_mono_ns: Option<u64>,
    pub last_quote_event_mono_ns: Option<u64>,
    pub quotes_received_count: u64,

    /// Mirror of `gates.allowed`.
    pub ready: bool,
    /// Mirror of `gates.reason_codes`.
    pub ready_reasons: Vec<ReasonCode>,
}

impl Snapshot {
    /// Check the ready/allowed mirror invariant.
    pub fn mirrors_consistent(&self) -> bool {
        self.ready == self.gates.allowed && self.ready_reasons == self.gates.reason_codes
    }
}
