use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use anyhow::{anyhow, Result};
use tracing::{error, info, warn};
use uuid::Uuid;

use obs_clock::{Clock, SessionSchedule};
use obs_gates::{evaluate_gates, spread_in_ticks, GateConfig, GateInputs};
use obs_hub::DataHub;
use obs_queues::{CommandQueue, InboundQueue, DRAIN_CEILING};
use obs_schemas::{
    Controls, FeedEvent, FeedState, GateReport, Instrument, Intent, LoopHealth, MdMode, QuoteView,
    SessionState, Snapshot, SNAPSHOT_SCHEMA_VERSION,
};

use crate::{RunMetrics, RunSummary};

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Engine wiring parameters, assembled by the binary from the loaded
/// configuration.
#[derive(Clone, Debug)]
pub struct EngineConfig {
    pub instrument: Instrument,
    pub cycle_target_ms: u64,
    pub cycle_overrun_threshold_ms: u64,
    pub gates: GateConfig,
    pub schedule: SessionSchedule,
    pub app_version: String,
    pub config_hash: String,
    pub max_runtime_s: Option<u64>,
    pub trigger_logger_enabled: bool,
}

/// Run lifecycle. Re-entry into `run` is not permitted.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum RunState {
    Idle,
    Running,
    Stopping,
    Stopped,
}

// ---------------------------------------------------------------------------
// Internal quote state
// ---------------------------------------------------------------------------

/// Raw fields of the most recent quote event (last-wins within a cycle).
#[derive(Clone, Debug)]
struct QuoteFields {
    bid: Option<f64>,
    ask: Option<f64>,
    last: Option<f64>,
    bid_size: Option<u64>,
    ask_size: Option<u64>,
    ts_recv_unix_ms: i64,
    ts_recv_mono_ns: u64,
    ts_exch_unix_ms: Option<i64>,
}

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

/// The single writer. Owns all mutable state behind the snapshot; nothing
/// else may mutate anything a reader can observe.
pub struct Engine {
    cfg: EngineConfig,
    clock: Arc<dyn Clock>,
    inbound: InboundQueue,
    commands: CommandQueue,
    hub: Arc<DataHub>,

    run_id: String,
    run_start_ts_unix_ms: i64,
    run_start_mono_ns: u64,

    state: RunState,
    shutdown: Arc<AtomicBool>,

    snapshot_id: u64,
    cycle_count: u64,

    intent: Intent,
    arm: bool,
    last_cmd_id: u64,
    last_cmd_ts_unix_ms: Option<i64>,

    feed_connected: bool,
    md_mode: MdMode,
    adapter_reason: Option<String>,
    last_status_change_mono_ns: Option<u64>,

    quote: Option<QuoteFields>,
    con_id: Option<i64>,

    last_any_event_mono_ns: Option<u64>,
    last_quote_event_mono_ns: Option<u64>,

    /// Duration of the last completed cycle; feeds loop health, the
    /// degraded check, and pacing. None before the first cycle finishes.
    prev_cycle_ms: Option<f64>,
    last_cycle_start_mono_ns: u64,
    /// Set when a phase error was caught this cycle.
    internal_error: bool,

    metrics: RunMetrics,
}

impl Engine {
    pub fn new(
        cfg: EngineConfig,
        clock: Arc<dyn Clock>,
        inbound: InboundQueue,
        commands: CommandQueue,
        hub: Arc<DataHub>,
    ) -> Self {
        let run_id = Uuid::new_v4().to_string();
        let run_start_ts_unix_ms = clock.now_unix_ms();
        let run_start_mono_ns = clock.now_mono_ns();
        let con_id = cfg.instrument.con_id;

        Self {
            cfg,
            clock,
            inbound,
            commands,
            hub,
            run_id,
            run_start_ts_unix_ms,
            run_start_mono_ns,
            state: RunState::Idle,
            shutdown: Arc::new(AtomicBool::new(false)),
            snapshot_id: 0,
            cycle_count: 0,
            intent: Intent::Flat,
            arm: false,
            last_cmd_id: 0,
            last_cmd_ts_unix_ms: None,
            feed_connected: false,
            md_mode: MdMode::None,
            adapter_reason: None,
            last_status_change_mono_ns: None,
            quote: None,
            con_id,
            last_any_event_mono_ns: None,
            last_quote_event_mono_ns: None,
            prev_cycle_ms: None,
            last_cycle_start_mono_ns: 0,
            internal_error: false,
            metrics: RunMetrics::default(),
        }
    }

    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    /// Shared flag observed at the top of each cycle; setting it requests
    /// a graceful stop.
    pub fn shutdown_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.shutdown)
    }

    // -----------------------------------------------------------------------
    // Run loop
    // -----------------------------------------------------------------------

    /// Blocking run loop. Returns the run summary after a requested stop,
    /// an exceeded `max_runtime_s`, or an unrecoverable clock violation.
    pub fn run(&mut self) -> RunSummary {
        if self.state != RunState::Idle {
            error!(state = ?self.state, "engine re-entry refused");
            return self.finish();
        }
        self.state = RunState::Running;
        info!(run_id = %self.run_id, "engine running");

        loop {
            if self.shutdown.load(Ordering::Acquire) {
                self.state = RunState::Stopping;
            }
            if let Some(max_s) = self.cfg.max_runtime_s {
                let elapsed_ns = self.clock.now_mono_ns().saturating_sub(self.run_start_mono_ns);
                if elapsed_ns >= max_s.saturating_mul(1_000_000_000) {
                    info!(max_runtime_s = max_s, "max runtime reached");
                    self.state = RunState::Stopping;
                }
            }
            if self.state == RunState::Stopping {
                break;
            }

            // Monotonic time must not run backwards; that invariant broken
            // means no age computation can be trusted.
            let now_mono = self.clock.now_mono_ns();
            if now_mono < self.last_cycle_start_mono_ns {
                error!(
                    now_mono,
                    last = self.last_cycle_start_mono_ns,
                    "monotonic clock went backwards; stopping"
                );
                break;
            }

            self.cycle();

            let cycle_ms = self.prev_cycle_ms.unwrap_or(0.0);
            let sleep_ms = (self.cfg.cycle_target_ms as f64 - cycle_ms).max(0.0);
            if sleep_ms > 0.0 {
                thread::sleep(Duration::from_micros((sleep_ms * 1_000.0) as u64));
            }
        }

        self.finish()
    }

    fn finish(&mut self) -> RunSummary {
        self.state = RunState::Stopped;
        let run_end_ts_unix_ms = self.clock.now_unix_ms();
        let uptime_s = (self.clock.now_mono_ns().saturating_sub(self.run_start_mono_ns)) as f64 / 1e9;
        let summary = RunSummary {
            run_id: self.run_id.clone(),
            run_start_ts_unix_ms: self.run_start_ts_unix_ms,
            run_end_ts_unix_ms,
            uptime_s,
            metrics: self.metrics.clone(),
            trigger_logger_enabled: self.cfg.trigger_logger_enabled,
        };
        info!(run_id = %self.run_id, cycles = summary.metrics.cycle_count, "engine stopped");
        summary
    }

    // -----------------------------------------------------------------------
    // One cycle
    // -----------------------------------------------------------------------

    /// Execute exactly one cycle and publish its snapshot. Public so tests
    /// can drive the engine deterministically without the pacing loop.
    pub fn cycle(&mut self) {
        // Phase 1: cycle start.
        let cycle_start_mono_ns = self.clock.now_mono_ns();
        self.cycle_count += 1;
        self.internal_error = false;

        // Phase 2: event drain. A phase error is caught, logged, and
        // degrades this cycle; the engine never dies mid-run.
        if let Err(e) = self.drain_events() {
            error!(error = %e, "event drain failed; cycle degraded");
            self.internal_error = true;
        }

        // Phase 3: command apply at the boundary.
        self.apply_commands();

        // Phase 4: derivations.
        let staleness_ms = self.quote.as_ref().map(|q| {
            (cycle_start_mono_ns.saturating_sub(q.ts_recv_mono_ns) / 1_000_000) as i64
        });
        let spread_ticks = self.quote.as_ref().and_then(|q| match (q.bid, q.ask) {
            (Some(bid), Some(ask)) => spread_in_ticks(bid, ask, self.cfg.instrument.tick_size),
            _ => None,
        });

        let local = self.clock.now_local();
        let in_operating_window = self.cfg.schedule.in_operating_window(local);
        let is_break_window = SessionSchedule::is_break_window(local);
        let session_phase = self.cfg.schedule.session_phase(local);
        let session_date_iso = SessionSchedule::session_date_iso(local);

        // Phase 5: engine-degraded check (previous completed cycle).
        let prev_cycle_ms = self.prev_cycle_ms;
        let engine_degraded = prev_cycle_ms
            .map(|ms| ms > self.cfg.cycle_overrun_threshold_ms as f64)
            .unwrap_or(false)
            || self.internal_error;

        // Phase 6: gate evaluation.
        let gate_inputs = GateInputs {
            arm: self.arm,
            intent: self.intent,
            in_operating_window,
            is_break_window,
            feed_connected: self.feed_connected,
            md_mode: self.md_mode,
            con_id: self.con_id,
            quote_present: self.quote.is_some(),
            bid: self.quote.as_ref().and_then(|q| q.bid),
            ask: self.quote.as_ref().and_then(|q| q.ask),
            staleness_ms,
            last_quote_event_mono_ns: self.last_quote_event_mono_ns,
            now_mono_ns: cycle_start_mono_ns,
            spread_ticks,
            engine_degraded,
            cycle_ms: prev_cycle_ms,
        };
        let outcome = evaluate_gates(&self.cfg.gates, &gate_inputs);

        // Phase 7: snapshot construction.
        self.snapshot_id += 1;
        self.last_cycle_start_mono_ns = cycle_start_mono_ns;

        let feed_degraded = !self.feed_connected || self.md_mode != MdMode::Realtime;
        let mut status_reason_codes = Vec::new();
        if !self.feed_connected {
            status_reason_codes.push("FEED_DISCONNECTED".to_string());
        }
        if self.md_mode != MdMode::Realtime {
            status_reason_codes.push("MD_NOT_REALTIME".to_string());
        }
        if let Some(reason) = &self.adapter_reason {
            status_reason_codes.push(reason.clone());
        }
        if self.internal_error {
            status_reason_codes.push("ENGINE_INTERNAL_ERROR".to_string());
        }

        let quote_view = self.quote.as_ref().map(|q| QuoteView {
            bid: q.bid,
            ask: q.ask,
            last: q.last,
            bid_size: q.bid_size,
            ask_size: q.ask_size,
            ts_recv_unix_ms: q.ts_recv_unix_ms,
            ts_recv_mono_ns: q.ts_recv_mono_ns,
            ts_exch_unix_ms: q.ts_exch_unix_ms,
            staleness_ms: staleness_ms.unwrap_or(0),
            spread_ticks,
        });

        let snapshot = Snapshot {
            schema_version: SNAPSHOT_SCHEMA_VERSION.to_string(),
            app_version: self.cfg.app_version.clone(),
            config_hash: self.cfg.config_hash.clone(),
            run_id: self.run_id.clone(),
            run_start_ts_unix_ms: self.run_start_ts_unix_ms,
            snapshot_id: self.snapshot_id,
            cycle_count: self.cycle_count,
            ts_unix_ms: self.clock.now_unix_ms(),
            ts_mono_ns: self.clock.now_mono_ns(),
            instrument: Instrument {
                con_id: self.con_id,
                ..self.cfg.instrument.clone()
            },
            feed: FeedState {
                connected: self.feed_connected,
                md_mode: self.md_mode,
                degraded: feed_degraded,
                status_reason_codes,
                last_status_change_mono_ns: self.last_status_change_mono_ns,
            },
            quote: quote_view,
            session: SessionState {
                in_operating_window,
                is_break_window,
                session_phase,
                session_date_iso,
            },
            controls: Controls {
                intent: self.intent,
                arm: self.arm,
                last_cmd_id: self.last_cmd_id,
                last_cmd_ts_unix_ms: self.last_cmd_ts_unix_ms,
            },
            loop_health: LoopHealth {
                cycle_ms: prev_cycle_ms.unwrap_or(0.0),
                cycle_overrun: prev_cycle_ms
                    .map(|ms| ms > self.cfg.cycle_target_ms as f64)
                    .unwrap_or(false),
                engine_degraded,
                last_cycle_start_mono_ns: cycle_start_mono_ns,
            },
            gates: GateReport {
                allowed: outcome.allowed,
                reason_codes: outcome.reason_codes.clone(),
                gate_metrics: outcome.metrics,
            },
            last_any_event_mono_ns: self.last_any_event_mono_ns,
            last_quote_event_mono_ns: self.last_quote_event_mono_ns,
            quotes_received_count: self.metrics.quotes_received_count,
            ready: outcome.allowed,
            ready_reasons: outcome.reason_codes.clone(),
        };

        // Phase 8: atomic publication.
        self.hub.publish(snapshot);

        // Phase 9: metrics.
        let cycle_ms =
            (self.clock.now_mono_ns().saturating_sub(cycle_start_mono_ns)) as f64 / 1e6;
        self.prev_cycle_ms = Some(cycle_ms);
        if cycle_ms > self.metrics.max_cycle_time_ms {
            self.metrics.max_cycle_time_ms = cycle_ms;
        }
        self.metrics.cycle_count = self.cycle_count;
        if outcome
            .reason_codes
            .contains(&obs_schemas::ReasonCode::StaleData)
        {
            self.metrics.staleness_events_count += 1;
        }
        // Phase 10 (pacing sleep) lives in `run`; a driven cycle ends here.
    }

    // -----------------------------------------------------------------------
    // Phases
    // -----------------------------------------------------------------------

    /// Bounded drain of the inbound queue, FIFO, last-wins within the
    /// cycle for quote state.
    fn drain_events(&mut self) -> Result<()> {
        for event in self.inbound.drain(Some(DRAIN_CEILING)) {
            self.last_any_event_mono_ns = Some(event.ts_recv_mono_ns());
            match event {
                FeedEvent::Status(s) => {
                    let was_connected = self.feed_connected;
                    let changed = s.connected != self.feed_connected || s.md_mode != self.md_mode;
                    self.feed_connected = s.connected;
                    self.md_mode = s.md_mode;
                    if let Some(reason) = s.reason {
                        self.adapter_reason = Some(reason);
                    }
                    if changed {
                        self.last_status_change_mono_ns = Some(s.ts_recv_mono_ns);
                    }
                    if !was_connected && s.connected {
                        self.metrics.reconnect_count += 1;
                    }
                }
                FeedEvent::Quote(q) => {
                    if q.con_id.is_some() {
                        self.con_id = q.con_id;
                    }
                    self.last_quote_event_mono_ns = Some(q.ts_recv_mono_ns);
                    self.metrics.quotes_received_count += 1;
                    self.quote = Some(QuoteFields {
                        bid: q.bid,
                        ask: q.ask,
                        last: q.last,
                        bid_size: q.bid_size,
                        ask_size: q.ask_size,
                        ts_recv_unix_ms: q.ts_recv_unix_ms,
                        ts_recv_mono_ns: q.ts_recv_mono_ns,
                        ts_exch_unix_ms: q.ts_exch_unix_ms,
                    });
                }
                FeedEvent::AdapterError(e) => {
                    warn!(code = e.code, message = %e.message, "adapter error");
                    self.adapter_reason = Some(e.message);
                }
            }
        }
        Ok(())
    }

    /// Boundary-only command application with last-write-wins coalescing.
    fn apply_commands(&mut self) {
        let batch = self.commands.drain_coalesced();
        if let Some(intent) = batch.intent {
            self.intent = intent;
        }
        if let Some(arm) = batch.arm {
            self.arm = arm;
        }
        if batch.last_cmd_id > self.last_cmd_id {
            self.last_cmd_id = batch.last_cmd_id;
            self.last_cmd_ts_unix_ms = batch.last_cmd_ts_unix_ms;
        }
    }
}

// ---------------------------------------------------------------------------
// Handle
// ---------------------------------------------------------------------------

/// Handle to an engine running on its own thread.
pub struct EngineHandle {
    shutdown: Arc<AtomicBool>,
    handle: thread::JoinHandle<RunSummary>,
}

impl EngineHandle {
    /// Spawn the engine on a dedicated thread.
    pub fn spawn(mut engine: Engine) -> Result<Self> {
        let shutdown = engine.shutdown_flag();
        let handle = thread::Builder::new()
            .name("engine".to_string())
            .spawn(move || engine.run())
            .map_err(|e| anyhow!("spawn engine thread: {e}"))?;
        Ok(Self { shutdown, handle })
    }

    /// Request a graceful stop and wait for the summary. The in-flight
    /// cycle completes; there is no mid-cycle cancellation.
    pub fn stop(self) -> Result<RunSummary> {
        self.shutdown.store(true, Ordering::Release);
        self.handle
            .join()
            .map_err(|_| anyhow!("engine thread panicked"))
    }

    pub fn request_stop(&self) {
        self.shutdown.store(true, Ordering::Release);
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Wait for the engine to exit on its own (max-runtime bounded runs).
    pub fn join(self) -> Result<RunSummary> {
        self.handle
            .join()
            .map_err(|_| anyhow!("engine thread panicked"))
    }
}
