//! Deterministic mock L1 feed.
//!
//! Generates bid/ask/last on a sinusoidal drift around a base price,
//! prices snapped to the tick grid, at a fixed quote rate. Emits the same
//! event envelope a real adapter would, including status events on
//! connect/disconnect and `con_id` on every quote.

use std::f64::consts::TAU;
use std::sync::Arc;

use tracing::{debug, warn};

use obs_clock::Clock;
use obs_queues::{InboundQueue, PushError};
use obs_schemas::{FeedEvent, MdMode, QuoteEvent, StatusEvent};

use crate::{FeedError, L1Feed};

/// Mock feed tuning. Defaults mimic a quiet MNQ session.
#[derive(Debug, Clone)]
pub struct MockFeedConfig {
    pub base_price: f64,
    pub tick_size: f64,
    pub spread_ticks: i64,
    pub quote_rate_hz: f64,
    pub drift_amplitude: f64,
    pub drift_period_s: f64,
    pub con_id: i64,
}

impl Default for MockFeedConfig {
    fn default() -> Self {
        Self {
            base_price: 18_500.0,
            tick_size: 0.25,
            spread_ticks: 1,
            quote_rate_hz: 10.0,
            drift_amplitude: 5.0,
            drift_period_s: 60.0,
            con_id: 999_999,
        }
    }
}

pub struct MockL1Feed {
    cfg: MockFeedConfig,
    queue: InboundQueue,
    clock: Arc<dyn Clock>,

    connected: bool,
    start_mono_ns: u64,
    last_quote_mono_ns: Option<u64>,
    /// Quotes dropped on queue overflow (lossy by design).
    dropped: u64,
}

impl MockL1Feed {
    pub fn new(cfg: MockFeedConfig, queue: InboundQueue, clock: Arc<dyn Clock>) -> Self {
        Self {
            cfg,
            queue,
            clock,
            connected: false,
            start_mono_ns: 0,
            last_quote_mono_ns: None,
            dropped: 0,
        }
    }

    pub fn dropped(&self) -> u64 {
        self.dropped
    }

    fn quote_interval_ns(&self) -> u64 {
        (1_000_000_000f64 / self.cfg.quote_rate_hz) as u64
    }

    fn snap_to_tick(&self, price: f64) -> f64 {
        (price / self.cfg.tick_size).round() * self.cfg.tick_size
    }

    fn emit_status(&mut self, connected: bool, md_mode: MdMode, reason: &str) {
        let event = FeedEvent::Status(StatusEvent {
            connected,
            md_mode,
            reason: Some(reason.to_string()),
            ts_recv_mono_ns: self.clock.now_mono_ns(),
            ts_recv_unix_ms: self.clock.now_unix_ms(),
        });
        // Status events are the ones worth fighting for; overflow here is
        // logged loudly rather than silently counted.
        if let Err(e) = self.queue.push(event) {
            warn!(error = %e, "mock feed dropped a status event");
        }
    }

    fn emit_quote(&mut self, now_mono_ns: u64) {
        let elapsed_s = (now_mono_ns.saturating_sub(self.start_mono_ns)) as f64 / 1e9;
        let drift =
            self.cfg.drift_amplitude * (TAU * elapsed_s / self.cfg.drift_period_s).sin();
        let mid = self.cfg.base_price + drift;

        let spread = self.cfg.spread_ticks as f64 * self.cfg.tick_size;
        let bid = self.snap_to_tick(mid - spread / 2.0);
        let ask = bid + spread;
        let last = self.snap_to_tick(mid);

        let ts_unix_ms = self.clock.now_unix_ms();
        let event = FeedEvent::Quote(QuoteEvent {
            con_id: Some(self.cfg.con_id),
            bid: Some(bid),
            ask: Some(ask),
            last: Some(last),
            bid_size: Some(10),
            ask_size: Some(10),
            ts_recv_mono_ns: now_mono_ns,
            ts_recv_unix_ms: ts_unix_ms,
            ts_exch_unix_ms: Some(ts_unix_ms),
        });

        match self.queue.push(event) {
            Ok(()) => {}
            Err(PushError::QueueFull) => {
                self.dropped += 1;
                debug!(dropped = self.dropped, "inbound queue full; quote dropped");
            }
            Err(PushError::Closed) => {
                debug!("inbound queue closed; quote dropped");
            }
        }
    }
}

impl L1Feed for MockL1Feed {
    fn name(&self) -> &'static str {
        "mock"
    }

    fn connect(&mut self) -> Result<(), FeedError> {
        self.connected = true;
        self.start_mono_ns = self.clock.now_mono_ns();
        self.last_quote_mono_ns = None;
        self.emit_status(true, MdMode::Realtime, "mock feed connected");
        Ok(())
    }

    fn poll(&mut self) {
        if !self.connected {
            return;
        }

        let now = self.clock.now_mono_ns();
        if let Some(last) = self.last_quote_mono_ns {
            if now.saturating_sub(last) < self.quote_interval_ns() {
                return;
            }
        }
        self.emit_quote(now);
        self.last_quote_mono_ns = Some(now);
    }

    fn disconnect(&mut self) {
        if !self.connected {
            return;
        }
        self.connected = false;
        self.emit_status(false, MdMode::None, "mock feed disconnected");
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
