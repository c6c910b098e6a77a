use obs_schemas::{GateMetrics, Intent, MdMode, ReasonCode};

use crate::{GateConfig, GateInputs, GateOutcome};

/// Spread in ticks, conservative ceiling: `ceil((ask - bid) / tick_size)`.
///
/// Returns `None` when the spread is undefined: bid/ask non-positive,
/// inverted or locked book (`ask <= bid`), or a non-positive tick size.
pub fn spread_in_ticks(bid: f64, ask: f64, tick_size: f64) -> Option<i64> {
    if tick_size <= 0.0 || bid <= 0.0 || ask <= 0.0 || ask <= bid {
        return None;
    }
    Some(((ask - bid) / tick_size).ceil() as i64)
}

/// Evaluate all hard gates in canonical order.
///
/// Every gate runs; failing reasons accumulate in [`ReasonCode::ORDERED`]
/// order. `allowed` is true only when no gate failed. The metrics block
/// always carries its full key set.
pub fn evaluate_gates(cfg: &GateConfig, inputs: &GateInputs) -> GateOutcome {
    let mut reasons: Vec<ReasonCode> = Vec::new();

    // 1. ARM_OFF
    if !inputs.arm {
        reasons.push(ReasonCode::ArmOff);
    }

    // 2. INTENT_FLAT
    if inputs.intent == Intent::Flat {
        reasons.push(ReasonCode::IntentFlat);
    }

    // 3. OUTSIDE_OPERATING_WINDOW
    if !inputs.in_operating_window {
        reasons.push(ReasonCode::OutsideOperatingWindow);
    }

    // 4. SESSION_BREAK
    if inputs.is_break_window {
        reasons.push(ReasonCode::SessionBreak);
    }

    // 5. FEED_DISCONNECTED
    if !inputs.feed_connected {
        reasons.push(ReasonCode::FeedDisconnected);
    }

    // 6. MD_NOT_REALTIME
    if inputs.md_mode != MdMode::Realtime {
        reasons.push(ReasonCode::MdNotRealtime);
    }

    // 7. NO_CONTRACT
    if inputs.con_id.is_none() {
        reasons.push(ReasonCode::NoContract);
    }

    // 8. STALE_DATA
    if is_stale(cfg, inputs) {
        reasons.push(ReasonCode::StaleData);
    }

    // 9. SPREAD_UNAVAILABLE / 10. SPREAD_WIDE
    // Gate 10 is skipped when gate 9 fires: a wide reading on an unusable
    // book is noise, not a second denial.
    if spread_unavailable(inputs) {
        reasons.push(ReasonCode::SpreadUnavailable);
    } else if let Some(ticks) = inputs.spread_ticks {
        if ticks > cfg.max_spread_ticks {
            reasons.push(ReasonCode::SpreadWide);
        }
    }

    // 11. ENGINE_DEGRADED
    if inputs.engine_degraded {
        reasons.push(ReasonCode::EngineDegraded);
    }

    let metrics = GateMetrics {
        staleness_ms: inputs.staleness_ms,
        spread_ticks: inputs.spread_ticks,
        md_mode: inputs.md_mode,
        connected: inputs.feed_connected,
        in_operating_window: inputs.in_operating_window,
        is_break_window: inputs.is_break_window,
        engine_degraded: inputs.engine_degraded,
        cycle_ms: inputs.cycle_ms,
    };

    GateOutcome {
        allowed: reasons.is_empty(),
        reason_codes: reasons,
        metrics,
    }
}

/// STALE_DATA fires on any of:
/// - no quote observed yet this run,
/// - quote age above the stale threshold,
/// - quote stream silent past the heartbeat timeout.
fn is_stale(cfg: &GateConfig, inputs: &GateInputs) -> bool {
    if !inputs.quote_present {
        return true;
    }

    if let Some(staleness_ms) = inputs.staleness_ms {
        if staleness_ms > cfg.stale_threshold_ms {
            return true;
        }
    }

    if let Some(last_quote_ns) = inputs.last_quote_event_mono_ns {
        let silence_ms = (inputs.now_mono_ns.saturating_sub(last_quote_ns) / 1_000_000) as i64;
        if silence_ms > cfg.feed_heartbeat_timeout_ms {
            return true;
        }
    }

    false
}

fn spread_unavailable(inputs: &GateInputs) -> bool {
    match (inputs.bid, inputs.ask) {
        (Some(bid), Some(ask)) => bid <= 0.0 || ask <= 0.0 || ask <= bid,
        _ => true,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
