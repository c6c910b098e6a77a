use std::fmt;

/// Counters and maxima accumulated across a run by the engine thread.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunMetrics {
    /// false→true connection transitions observed on the feed.
    pub reconnect_count: u64,
    /// Cycles whose gate outcome included STALE_DATA.
    pub staleness_events_count: u64,
    pub quotes_received_count: u64,
    pub cycle_count: u64,
    pub max_cycle_time_ms: f64,
}

/// Human-readable end-of-run report, emitted once on shutdown.
#[derive(Debug, Clone, PartialEq)]
pub struct RunSummary {
    pub run_id: String,
    pub run_start_ts_unix_ms: i64,
    pub run_end_ts_unix_ms: i64,
    pub uptime_s: f64,
    pub metrics: RunMetrics,
    pub trigger_logger_enabled: bool,
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "RunSummary {{")?;
        writeln!(f, "  run_id: {}", self.run_id)?;
        writeln!(f, "  run_start_ts_unix_ms: {}", self.run_start_ts_unix_ms)?;
        writeln!(f, "  run_end_ts_unix_ms: {}", self.run_end_ts_unix_ms)?;
        writeln!(f, "  uptime_s: {:.1}", self.uptime_s)?;
        writeln!(f, "  cycles: {}", self.metrics.cycle_count)?;
        writeln!(f, "  quotes_received: {}", self.metrics.quotes_received_count)?;
        writeln!(f, "  reconnects: {}", self.metrics.reconnect_count)?;
        writeln!(f, "  staleness_events: {}", self.metrics.staleness_events_count)?;
        writeln!(f, "  max_cycle_time_ms: {:.3}", self.metrics.max_cycle_time_ms)?;
        writeln!(f, "  trigger_logger_enabled: {}", self.trigger_logger_enabled)?;
        write!(f, "}}")
    }
}
