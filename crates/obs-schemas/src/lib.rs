//! obs-schemas
//!
//! Versioned value types shared across the workspace: the snapshot.v1
//! nested value object, the triggercard.v1 audit record, the feed event
//! envelope, the command envelope, and the closed reason-code set.
//!
//! Plain serde structs only. No IO, no clock, no logic beyond small
//! constructors and string mappings. Breaking changes to any serialized
//! shape require bumping the matching `*_SCHEMA_VERSION` suffix.

mod command;
mod event;
mod reason;
mod snapshot;
mod trigger_card;

pub use command::{Command, CommandKind};
pub use event::{AdapterErrorEvent, FeedEvent, QuoteEvent, StatusEvent};
pub use reason::ReasonCode;
pub use snapshot::{
    Controls, FeedState, GateMetrics, GateReport, Instrument, LoopHealth, QuoteView, SessionPhase,
    SessionState, Snapshot,
};
pub use trigger_card::TriggerCard;

use serde::{Deserialize, Serialize};
use std::fmt;

/// Snapshot wire-schema identifier.
pub const SNAPSHOT_SCHEMA_VERSION: &str = "snapshot.v1";

/// Trigger-card wire-schema identifier.
pub const TRIGGERCARD_SCHEMA_VERSION: &str = "triggercard.v1";

// ---------------------------------------------------------------------------
// Market-data mode
// ---------------------------------------------------------------------------

/// Normalized market-data mode reported by the feed adapter.
///
/// `None` is both the pre-connect default and what a disconnect maps to,
/// so `MD_NOT_REALTIME` fires alongside `FEED_DISCONNECTED`.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MdMode {
    Realtime,
    Delayed,
    Frozen,
    None,
}

impl MdMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            MdMode::Realtime => "REALTIME",
            MdMode::Delayed => "DELAYED",
            MdMode::Frozen => "FROZEN",
            MdMode::None => "NONE",
        }
    }
}

impl fmt::Display for MdMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Trade intent
// ---------------------------------------------------------------------------

/// Operator trade intent. `Flat` gates everything off regardless of arm.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Intent {
    Long,
    Short,
    Both,
    Flat,
}

impl Intent {
    pub fn as_str(&self) -> &'static str {
        match self {
            Intent::Long => "LONG",
            Intent::Short => "SHORT",
            Intent::Both => "BOTH",
            Intent::Flat => "FLAT",
        }
    }
}

impl fmt::Display for Intent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
