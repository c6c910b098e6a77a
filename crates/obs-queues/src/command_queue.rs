use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};

use obs_schemas::{Command, CommandKind, Intent};

use crate::{PushError, COMMAND_CAPACITY};

/// What one boundary drain resolved to after last-write-wins coalescing.
///
/// `None` fields mean "no command of that kind this cycle"; the engine
/// leaves the corresponding control untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CoalescedCommands {
    pub intent: Option<Intent>,
    pub arm: Option<bool>,
    /// Maximum drained command id (ids are minted monotonically, so this
    /// is the last-enqueued command). Zero when nothing was drained.
    pub last_cmd_id: u64,
    pub last_cmd_ts_unix_ms: Option<i64>,
}

impl CoalescedCommands {
    pub fn is_empty(&self) -> bool {
        self.intent.is_none() && self.arm.is_none()
    }
}

/// Bounded FIFO of operator commands, UI → engine. Applied only at the
/// cycle boundary; commands pushed after the boundary scan wait for the
/// next cycle.
#[derive(Clone)]
pub struct CommandQueue {
    tx: Sender<Command>,
    rx: Receiver<Command>,
}

impl CommandQueue {
    pub fn new() -> Self {
        Self::with_capacity(COMMAND_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let (tx, rx) = bounded(capacity);
        Self { tx, rx }
    }

    /// Non-blocking push from the UI side.
    pub fn push(&self, cmd: Command) -> Result<(), PushError> {
        self.tx.try_send(cmd).map_err(|e| match e {
            TrySendError::Full(_) => PushError::QueueFull,
            TrySendError::Disconnected(_) => PushError::Closed,
        })
    }

    /// Drain everything pending and coalesce with last-write-wins per
    /// command kind (engine only, once per cycle).
    pub fn drain_coalesced(&self) -> CoalescedCommands {
        let mut out = CoalescedCommands::default();
        while let Ok(cmd) = self.rx.try_recv() {
            match cmd.kind {
                CommandKind::SetIntent { intent } => out.intent = Some(intent),
                CommandKind::SetArm { arm } => out.arm = Some(arm),
            }
            if cmd.cmd_id > out.last_cmd_id {
                out.last_cmd_id = cmd.cmd_id;
                out.last_cmd_ts_unix_ms = Some(cmd.ts_unix_ms);
            }
        }
        out
    }

    pub fn len(&self) -> usize {
        self.rx.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rx.is_empty()
    }
}

impl Default for CommandQueue {
    fn default() -> Self {
        Self::new()
    }
}
