use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};
use std::sync::Arc;

use obs_clock::{Clock, FrozenClock, SessionSchedule};
use obs_engine::{Engine, EngineConfig};
use obs_gates::GateConfig;
use obs_hub::DataHub;
use obs_queues::{CommandQueue, InboundQueue};
use obs_schemas::{FeedEvent, Instrument, MdMode, QuoteEvent, ReasonCode, StatusEvent};

fn config() -> EngineConfig {
    EngineConfig {
        instrument: Instrument {
            symbol: "MNQ".to_string(),
            contract_key: "MNQ.202603".to_string(),
            con_id: None,
            tick_size: 0.25,
        },
        cycle_target_ms: 100,
        cycle_overrun_threshold_ms: 500,
        gates: GateConfig::default(),
        schedule: SessionSchedule::default(),
        app_version: "test".to_string(),
        config_hash: String::new(),
        max_runtime_s: None,
        trigger_logger_enabled: false,
    }
}

fn quote_at(clock: &FrozenClock) -> FeedEvent {
    FeedEvent::Quote(QuoteEvent {
        con_id: Some(42),
        bid: Some(18_499.75),
        ask: Some(18_500.00),
        last: Some(18_500.00),
        bid_size: Some(1),
        ask_size: Some(1),
        ts_recv_mono_ns: clock.now_mono_ns(),
        ts_recv_unix_ms: clock.now_unix_ms(),
        ts_exch_unix_ms: None,
    })
}

fn status_at(clock: &FrozenClock, connected: bool, md_mode: MdMode) -> FeedEvent {
    FeedEvent::Status(StatusEvent {
        connected,
        md_mode,
        reason: None,
        ts_recv_mono_ns: clock.now_mono_ns(),
        ts_recv_unix_ms: clock.now_unix_ms(),
    })
}

#[test]
fn scenario_heartbeat_silence_raises_stale_data() {
    let clock = Arc::new(FrozenClock::at_local(2026, 3, 2, 10, 0, 0));
    let inbound = InboundQueue::new();
    let hub = Arc::new(DataHub::new());
    let mut engine = Engine::new(
        config(),
        Arc::clone(&clock) as Arc<dyn Clock>,
        inbound.clone(),
        CommandQueue::new(),
        Arc::clone(&hub),
    );

    inbound.push(status_at(&clock, true, MdMode::Realtime)).unwrap();
    inbound.push(quote_at(&clock)).unwrap();
    engine.cycle();
    assert!(!hub
        .latest()
        .unwrap()
        .gates
        .reason_codes
        .contains(&ReasonCode::StaleData));

    // Quote stream goes silent; STALE_DATA must fire once the silence
    // passes the 5s heartbeat timeout.
    let mut stale_seen_at_ms = None;
    for elapsed_s in 1..=7 {
        clock.advance_ms(1_000);
        engine.cycle();
        let snap = hub.latest().unwrap();
        if snap.gates.reason_codes.contains(&ReasonCode::StaleData) {
            stale_seen_at_ms = Some(elapsed_s * 1_000);
            break;
        }
    }
    // 2s stale threshold trips first on the quote age.
    assert_eq!(stale_seen_at_ms, Some(3_000));

    let snap = hub.latest().unwrap();
    assert!(snap.quote.as_ref().unwrap().staleness_ms >= 2_000);
}

#[test]
fn scenario_staleness_events_counter_tracks_stale_cycles() {
    let clock = Arc::new(FrozenClock::at_local(2026, 3, 2, 10, 0, 0));
    let inbound = InboundQueue::new();
    let hub = Arc::new(DataHub::new());
    let mut engine = Engine::new(
        config(),
        Arc::clone(&clock) as Arc<dyn Clock>,
        inbound.clone(),
        CommandQueue::new(),
        Arc::clone(&hub),
    );

    // No quote ever arrives: every cycle is stale.
    for _ in 0..5 {
        clock.advance_ms(100);
        engine.cycle();
    }
    let handle = engine.shutdown_flag();
    handle.store(true, Ordering::Release);
    let summary = engine.run();
    assert_eq!(summary.metrics.staleness_events_count, 5);
    assert_eq!(summary.metrics.cycle_count, 5);
}

#[test]
fn scenario_reconnects_are_counted_per_false_to_true_transition() {
    let clock = Arc::new(FrozenClock::at_local(2026, 3, 2, 10, 0, 0));
    let inbound = InboundQueue::new();
    let hub = Arc::new(DataHub::new());
    let mut engine = Engine::new(
        config(),
        Arc::clone(&clock) as Arc<dyn Clock>,
        inbound.clone(),
        CommandQueue::new(),
        Arc::clone(&hub),
    );

    inbound.push(status_at(&clock, true, MdMode::Realtime)).unwrap();
    engine.cycle();
    inbound.push(status_at(&clock, false, MdMode::None)).unwrap();
    engine.cycle();
    inbound.push(status_at(&clock, true, MdMode::Realtime)).unwrap();
    inbound.push(status_at(&clock, true, MdMode::Realtime)).unwrap(); // no transition
    engine.cycle();

    let flag = engine.shutdown_flag();
    flag.store(true, Ordering::Release);
    let summary = engine.run();
    assert_eq!(summary.metrics.reconnect_count, 2);
}

#[test]
fn scenario_event_drain_is_bounded_per_cycle() {
    let clock = Arc::new(FrozenClock::at_local(2026, 3, 2, 10, 0, 0));
    let inbound = InboundQueue::with_capacity(2_000);
    let hub = Arc::new(DataHub::new());
    let mut engine = Engine::new(
        config(),
        Arc::clone(&clock) as Arc<dyn Clock>,
        inbound.clone(),
        CommandQueue::new(),
        Arc::clone(&hub),
    );

    for _ in 0..1_100 {
        inbound.push(quote_at(&clock)).unwrap();
    }
    engine.cycle();
    // Anti-starvation ceiling: one cycle consumes at most 1024 events.
    assert_eq!(hub.latest().unwrap().quotes_received_count, 1_024);
    assert_eq!(inbound.len(), 76);

    engine.cycle();
    assert_eq!(hub.latest().unwrap().quotes_received_count, 1_100);
}

/// Clock whose monotonic reading jumps a fixed step on every call,
/// simulating slow cycles without wall-clock sleeps.
struct SteppingClock {
    unix_ms: AtomicI64,
    mono_ns: AtomicU64,
    step_ns: u64,
}

impl Clock for SteppingClock {
    fn now_unix_ms(&self) -> i64 {
        self.unix_ms.load(Ordering::SeqCst)
    }

    fn now_mono_ns(&self) -> u64 {
        self.mono_ns.fetch_add(self.step_ns, Ordering::SeqCst) + self.step_ns
    }
}

#[test]
fn scenario_slow_previous_cycle_degrades_the_next_one() {
    // Three monotonic reads per cycle at 300ms each => measured cycle
    // duration of 600ms, past the 500ms overrun threshold.
    let clock = Arc::new(SteppingClock {
        unix_ms: AtomicI64::new(FrozenClock::at_local(2026, 3, 2, 10, 0, 0).now_unix_ms()),
        mono_ns: AtomicU64::new(0),
        step_ns: 300_000_000,
    });
    let hub = Arc::new(DataHub::new());
    let mut engine = Engine::new(
        config(),
        Arc::clone(&clock) as Arc<dyn Clock>,
        InboundQueue::new(),
        CommandQueue::new(),
        Arc::clone(&hub),
    );

    engine.cycle();
    let first = hub.latest().unwrap();
    // First cycle has no previous duration to report.
    assert_eq!(first.loop_health.cycle_ms, 0.0);
    assert!(!first.loop_health.engine_degraded);

    engine.cycle();
    let second = hub.latest().unwrap();
    assert_eq!(second.loop_health.cycle_ms, 600.0);
    assert!(second.loop_health.cycle_overrun);
    assert!(second.loop_health.engine_degraded);
    assert!(second
        .gates
        .reason_codes
        .contains(&ReasonCode::EngineDegraded));
    assert_eq!(second.gates.gate_metrics.cycle_ms, Some(600.0));
}
