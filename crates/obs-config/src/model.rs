//! Typed configuration model with serde defaults and fail-fast validation.

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use obs_clock::SessionSchedule;

/// Effective application configuration. The `instrument` section is
/// required; everything else defaults to the documented values.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub instrument: InstrumentConfig,
    #[serde(default)]
    pub engine: LoopSettings,
    #[serde(default)]
    pub gates: GateSettings,
    #[serde(default)]
    pub session: SessionWindowConfig,
    #[serde(default)]
    pub trigger_log: TriggerLogSettings,
    #[serde(default)]
    pub feed: FeedSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstrumentConfig {
    pub symbol: String,
    /// `SYMBOL.YYYYMM`, e.g. `MNQ.202603`. Single contract only.
    pub contract_key: String,
    pub tick_size: f64,
    /// Optional broker contract id pin; otherwise adopted from the feed.
    #[serde(default)]
    pub con_id: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoopSettings {
    pub cycle_target_ms: u64,
    pub cycle_overrun_threshold_ms: u64,
    /// Bound the run on the monotonic clock; `None` runs until interrupted.
    pub max_runtime_s: Option<u64>,
}

impl Default for LoopSettings {
    fn default() -> Self {
        Self {
            cycle_target_ms: 100,
            cycle_overrun_threshold_ms: 500,
            max_runtime_s: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GateSettings {
    pub stale_threshold_ms: i64,
    pub feed_heartbeat_timeout_ms: i64,
    pub max_spread_ticks: i64,
}

impl Default for GateSettings {
    fn default() -> Self {
        Self {
            stale_threshold_ms: 2_000,
            feed_heartbeat_timeout_ms: 5_000,
            max_spread_ticks: 8,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionWindowConfig {
    /// Operating window start, local `HH:MM`.
    pub operating_start: String,
    /// Operating window end, local `HH:MM` (exclusive).
    pub operating_end: String,
}

impl Default for SessionWindowConfig {
    fn default() -> Self {
        Self {
            operating_start: "07:00".to_string(),
            operating_end: "16:00".to_string(),
        }
    }
}

impl SessionWindowConfig {
    pub fn schedule(&self) -> Result<SessionSchedule> {
        SessionSchedule::parse(&self.operating_start, &self.operating_end)
            .map_err(|e| anyhow::anyhow!("session window: {e}"))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TriggerLogSettings {
    pub enabled: bool,
    pub cadence_hz: f64,
    pub dir: PathBuf,
    /// Explicit flush every N records.
    pub flush_every: u32,
}

impl Default for TriggerLogSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            cadence_hz: 1.0,
            dir: PathBuf::from("logs/triggercards"),
            flush_every: 10,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeedKind {
    /// Deterministic in-process quote generator.
    Mock,
    /// No feed thread; events must come from elsewhere (tests).
    None,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FeedSettings {
    pub kind: FeedKind,
    pub quote_rate_hz: f64,
    pub base_price: f64,
    pub spread_ticks: i64,
    pub drift_amplitude: f64,
    pub drift_period_s: f64,
    pub con_id: i64,
}

impl Default for FeedSettings {
    fn default() -> Self {
        Self {
            kind: FeedKind::Mock,
            quote_rate_hz: 10.0,
            base_price: 18_500.0,
            spread_ticks: 1,
            drift_amplitude: 5.0,
            drift_period_s: 60.0,
            con_id: 999_999,
        }
    }
}

impl AppConfig {
    /// Fail-fast startup validation. Any error here is fatal by contract.
    pub fn validate(&self) -> Result<()> {
        let inst = &self.instrument;
        if inst.symbol.trim().is_empty() {
            bail!("instrument.symbol must be non-empty");
        }
        if !contract_key_is_valid(&inst.contract_key) {
            bail!(
                "instrument.contract_key '{}' must match SYMBOL.YYYYMM",
                inst.contract_key
            );
        }
        if !inst.contract_key.starts_with(&format!("{}.", inst.symbol)) {
            bail!(
                "instrument.contract_key '{}' does not belong to symbol '{}'",
                inst.contract_key,
                inst.symbol
            );
        }
        if !(inst.tick_size.is_finite() && inst.tick_size > 0.0) {
            bail!("instrument.tick_size must be > 0, got {}", inst.tick_size);
        }

        if self.engine.cycle_target_ms == 0 {
            bail!("engine.cycle_target_ms must be >= 1");
        }
        if self.gates.stale_threshold_ms <= 0
            || self.gates.feed_heartbeat_timeout_ms <= 0
            || self.gates.max_spread_ticks <= 0
        {
            bail!("gates thresholds must all be positive");
        }

        // Window strings must parse; the schedule itself enforces ordering.
        self.session.schedule()?;

        if !(self.trigger_log.cadence_hz.is_finite() && self.trigger_log.cadence_hz > 0.0) {
            bail!(
                "trigger_log.cadence_hz must be > 0, got {}",
                self.trigger_log.cadence_hz
            );
        }
        if self.trigger_log.flush_every == 0 {
            bail!("trigger_log.flush_every must be >= 1");
        }

        if self.feed.kind == FeedKind::Mock {
            if !(self.feed.quote_rate_hz.is_finite() && self.feed.quote_rate_hz > 0.0) {
                bail!("feed.quote_rate_hz must be > 0");
            }
            if self.feed.base_price <= 0.0 || self.feed.spread_ticks <= 0 {
                bail!("feed.base_price and feed.spread_ticks must be positive");
            }
        }

        Ok(())
    }
}

/// `^[A-Z]+\.\d{6}$` with a sane expiry month. Lists or multiple symbols
/// are forbidden; one process observes one contract.
pub fn contract_key_is_valid(key: &str) -> bool {
    let Some((symbol, expiry)) = key.split_once('.') else {
        return false;
    };
    if symbol.is_empty() || !symbol.chars().all(|c| c.is_ascii_uppercase()) {
        return false;
    }
    if expiry.len() != 6 || !expiry.chars().all(|c| c.is_ascii_digit()) {
        return false;
    }
    let month: u32 = expiry[4..].parse().unwrap_or(0);
    (1..=12).contains(&month)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid() -> AppConfig {
        AppConfig {
            instrument: InstrumentConfig {
                symbol: "MNQ".to_string(),
                contract_key: "MNQ.202603".to_string(),
                tick_size: 0.25,
                con_id: None,
            },
            engine: LoopSettings::default(),
            gates: GateSettings::default(),
            session: SessionWindowConfig::default(),
            trigger_log: TriggerLogSettings::default(),
            feed: FeedSettings::default(),
        }
    }

    #[test]
    fn valid_config_passes() {
        valid().validate().unwrap();
    }

    #[test]
    fn contract_key_grammar() {
        assert!(contract_key_is_valid("MNQ.202603"));
        assert!(contract_key_is_valid("ES.202612"));
        assert!(!contract_key_is_valid("MNQ202603"));
        assert!(!contract_key_is_valid("mnq.202603"));
        assert!(!contract_key_is_valid("MNQ.2026"));
        assert!(!contract_key_is_valid("MNQ.202613"));
        assert!(!contract_key_is_valid("MNQ.20260A"));
        assert!(!contract_key_is_valid(".202603"));
    }

    #[test]
    fn zero_tick_size_rejected() {
        let mut cfg = valid();
        cfg.instrument.tick_size = 0.0;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn contract_key_must_match_symbol() {
        let mut cfg = valid();
        cfg.instrument.contract_key = "MES.202603".to_string();
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn malformed_window_rejected() {
        let mut cfg = valid();
        cfg.session.operating_start = "7am".to_string();
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn inverted_window_rejected() {
        let mut cfg = valid();
        cfg.session.operating_start = "16:00".to_string();
        cfg.session.operating_end = "07:00".to_string();
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn non_positive_cadence_rejected() {
        let mut cfg = valid();
        cfg.trigger_log.cadence_hz = 0.0;
        assert!(cfg.validate().is_err());
    }
}
