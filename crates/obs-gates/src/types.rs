use obs_schemas::{GateMetrics, Intent, MdMode, ReasonCode};

/// Gate thresholds. All parameterized; the engine feeds these from config.
#[derive(Clone, Debug, PartialEq)]
pub struct GateConfig {
    /// Quote age above which STALE_DATA fires (ms).
    pub stale_threshold_ms: i64,

    /// Silence on the quote stream above which STALE_DATA fires (ms).
    pub feed_heartbeat_timeout_ms: i64,

    /// Spread above which SPREAD_WIDE fires (ticks).
    pub max_spread_ticks: i64,
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            stale_threshold_ms: 2_000,
            feed_heartbeat_timeout_ms: 5_000,
            max_spread_ticks: 8,
        }
    }
}

/// Inputs for one gate evaluation, captured at the cycle boundary.
///
/// The evaluator treats these as facts; no field is re-derived here.
#[derive(Clone, Debug, PartialEq)]
pub struct GateInputs {
    pub arm: bool,
    pub intent: Intent,
    pub in_operating_window: bool,
    pub is_break_window: bool,
    pub feed_connected: bool,
    pub md_mode: MdMode,
    pub con_id: Option<i64>,

    /// True once any quote event has been observed this run.
    pub quote_present: bool,
    pub bid: Option<f64>,
    pub ask: Option<f64>,
    /// Quote age at cycle start, when a quote is present.
    pub staleness_ms: Option<i64>,
    pub last_quote_event_mono_ns: Option<u64>,
    /// Cycle-start monotonic instant (heartbeat reference).
    pub now_mono_ns: u64,
    /// `ceil((ask - bid) / tick_size)`, when derivable.
    pub spread_ticks: Option<i64>,

    pub engine_degraded: bool,
    /// Previous cycle duration, echoed into the metrics block.
    pub cycle_ms: Option<f64>,
}

/// Result of one evaluation: `allowed` iff `reason_codes` is empty, with
/// reasons ordered per [`ReasonCode::ORDERED`].
#[derive(Clone, Debug, PartialEq)]
pub struct GateOutcome {
    pub allowed: bool,
    pub reason_codes: Vec<ReasonCode>,
    pub metrics: GateMetrics,
}
