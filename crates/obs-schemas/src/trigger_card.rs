use serde::{Deserialize, Serialize};

use crate::{GateMetrics, Intent, ReasonCode, Snapshot};

/// Durable audit record referencing one published snapshot.
///
/// One card == one JSON line in the trigger log. Every field required by a
/// post-mortem validator is carried inline so a single line stands alone.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TriggerCard {
    pub schema_version: String,
    pub app_version: String,
    pub config_hash: String,
    pub run_id: String,
    /// Monotonic per run, from 1. Independent of `snapshot_id`.
    pub seq: u64,
    pub snapshot_id: u64,
    pub log_ts_unix_ms: i64,
    pub log_ts_mono_ns: u64,
    pub intent: Intent,
    pub arm: bool,
    pub allowed: bool,
    pub reason_codes: Vec<ReasonCode>,
    pub gate_metrics: GateMetrics,
    /// Always "NONE": the observer never acts.
    pub action_taken: String,
    pub action_id: Option<String>,
}

impl TriggerCard {
    /// Build a card for `snapshot` at log time (`seq` assigned by the writer).
    pub fn from_snapshot(
        snapshot: &Snapshot,
        seq: u64,
        log_ts_unix_ms: i64,
        log_ts_mono_ns: u64,
    ) -> Self {
        Self {
            schema_version: crate::TRIGGERCARD_SCHEMA_VERSION.to_string(),
            app_version: snapshot.app_version.clone(),
            config_hash: snapshot.config_hash.clone(),
            run_id: snapshot.run_id.clone(),
            seq,
            snapshot_id: snapshot.snapshot_id,
            log_ts_unix_ms,
            log_ts_mono_ns,
            intent: snapshot.controls.intent,
            arm: snapshot.controls.arm,
            allowed: snapshot.gates.allowed,
            reason_codes: snapshot.gates.reason_codes.clone(),
            gate_metrics: snapshot.gates.gate_metrics.clone(),
            action_taken: "NONE".to_string(),
            action_id: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{MdMode, SNAPSHOT_SCHEMA_VERSION};

    #[test]
    fn card_carries_snapshot_reference_and_fixed_action() {
        let snapshot = Snapshot {
            schema_version: SNAPSHOT_SCHEMA_VERSION.to_string(),
            app_version: "0.4.0".to_string(),
            config_hash: "cafef00d".to_string(),
            run_id: "run-9".to_string(),
            run_start_ts_unix_ms: 0,
            snapshot_id: 17,
            cycle_count: 17,
            ts_unix_ms: 5,
            ts_mono_ns: 6,
            instrument: crate::Instrument {
                symbol: "MES".to_string(),
                contract_key: "MES.202606".to_string(),
                con_id: None,
                tick_size: 0.25,
            },
            feed: crate::FeedState::default(),
            quote: None,
            session: crate::SessionState {
                in_operating_window: true,
                is_break_window: false,
                session_phase: crate::SessionPhase::Operating,
                session_date_iso: "2026-06-15".to_string(),
            },
            controls: crate::Controls {
                intent: Intent::Long,
                arm: true,
                last_cmd_id: 2,
                last_cmd_ts_unix_ms: Some(4),
            },
            loop_health: crate::LoopHealth {
                cycle_ms: 1.5,
                cycle_overrun: false,
                engine_degraded: false,
                last_cycle_start_mono_ns: 1,
            },
            gates: crate::GateReport {
                allowed: false,
                reason_codes: vec![ReasonCode::StaleData],
                gate_metrics: GateMetrics {
                    staleness_ms: Some(9000),
                    spread_ticks: None,
                    md_mode: MdMode::Realtime,
                    connected: true,
                    in_operating_window: true,
                    is_break_window: false,
                    engine_degraded: false,
                    cycle_ms: Some(1.5),
                },
            },
            last_any_event_mono_ns: Some(3),
            last_quote_event_mono_ns: Some(3),
            quotes_received_count: 1,
            ready: false,
            ready_reasons: vec![ReasonCode::StaleData],
        };

        let card = TriggerCard::from_snapshot(&snapshot, 1, 10, 11);
        assert_eq!(card.schema_version, "triggercard.v1");
        assert_eq!(card.snapshot_id, 17);
        assert_eq!(card.seq, 1);
        assert_eq!(card.action_taken, "NONE");
        assert!(card.action_id.is_none());
        assert_eq!(card.reason_codes, vec![ReasonCode::StaleData]);

        let line = serde_json::to_string(&card).unwrap();
        let back: TriggerCard = serde_json::from_str(&line).unwrap();
        assert_eq!(back, card);
    }
}
