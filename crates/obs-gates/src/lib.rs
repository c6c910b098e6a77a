//! obs-gates
//!
//! Hard admission gates.
//!
//! Architectural decisions:
//! - Every gate is evaluated every cycle; no short-circuit. A denial is
//!   explained by *all* failing reasons, in a fixed order.
//! - Reason codes are a closed set ([`ReasonCode`]); strings only appear
//!   at the serialization boundary.
//! - Pure deterministic logic. No IO, no wall-clock. The engine provides
//!   `now_mono_ns` and every derived input.

mod engine;
mod types;

pub use engine::{evaluate_gates, spread_in_ticks};
pub use types::{GateConfig, GateInputs, GateOutcome};

pub use obs_schemas::ReasonCode;
