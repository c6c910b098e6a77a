use serde::{Deserialize, Serialize};

use crate::Intent;

/// What a command changes. Commands are idempotent; within one cycle only
/// the last-seen value per kind takes effect.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CommandKind {
    SetIntent { intent: Intent },
    SetArm { arm: bool },
}

/// A UI→engine control command. `cmd_id` is minted monotonically by the
/// producer; the engine records the maximum applied id per cycle.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Command {
    pub cmd_id: u64,
    pub ts_unix_ms: i64,
    #[serde(flatten)]
    pub kind: CommandKind,
}

impl Command {
    pub fn set_intent(cmd_id: u64, ts_unix_ms: i64, intent: Intent) -> Self {
        Self {
            cmd_id,
            ts_unix_ms,
            kind: CommandKind::SetIntent { intent },
        }
    }

    pub fn set_arm(cmd_id: u64, ts_unix_ms: i64, arm: bool) -> Self {
        Self {
            cmd_id,
            ts_unix_ms,
            kind: CommandKind::SetArm { arm },
        }
    }
}
