use serde::{Deserialize, Serialize};
use std::fmt;

/// Gate denial reasons. Closed set with a fixed canonical order; snapshots
/// carry reasons as a subsequence of [`ReasonCode::ORDERED`].
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReasonCode {
    ArmOff,
    IntentFlat,
    OutsideOperatingWindow,
    SessionBreak,
    FeedDisconnected,
    MdNotRealtime,
    NoContract,
    StaleData,
    SpreadUnavailable,
    SpreadWide,
    EngineDegraded,
}

impl ReasonCode {
    /// Canonical gate evaluation order. The evaluator emits failing reasons
    /// in exactly this order, with no short-circuit.
    pub const ORDERED: [ReasonCode; 11] = [
        ReasonCode::ArmOff,
        ReasonCode::IntentFlat,
        ReasonCode::OutsideOperatingWindow,
        ReasonCode::SessionBreak,
        ReasonCode::FeedDisconnected,
        ReasonCode::MdNotRealtime,
        ReasonCode::NoContract,
        ReasonCode::StaleData,
        ReasonCode::SpreadUnavailable,
        ReasonCode::SpreadWide,
        ReasonCode::EngineDegraded,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ReasonCode::ArmOff => "ARM_OFF",
            ReasonCode::IntentFlat => "INTENT_FLAT",
            ReasonCode::OutsideOperatingWindow => "OUTSIDE_OPERATING_WINDOW",
            ReasonCode::SessionBreak => "SESSION_BREAK",
            ReasonCode::FeedDisconnected => "FEED_DISCONNECTED",
            ReasonCode::MdNotRealtime => "MD_NOT_REALTIME",
            ReasonCode::NoContract => "NO_CONTRACT",
            ReasonCode::StaleData => "STALE_DATA",
            ReasonCode::SpreadUnavailable => "SPREAD_UNAVAILABLE",
            ReasonCode::SpreadWide => "SPREAD_WIDE",
            ReasonCode::EngineDegraded => "ENGINE_DEGRADED",
        }
    }
}

impl fmt::Display for ReasonCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
