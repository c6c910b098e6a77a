//! obs-triggerlog
//!
//! Append-only trigger-card log. One card == one JSON line, written in a
//! single `write` call and fsynced every `flush_every` records and on
//! shutdown. The last line may be truncated after a crash; every complete
//! line parses on its own, so validators treat an invalid tail as
//! expected rather than as corruption.
//!
//! A background thread emits at a fixed cadence (default 1 Hz),
//! decoupled from the 10 Hz engine loop: it reads whatever snapshot the
//! DataHub currently holds and skips the tick when there is none yet.
//!
//! Files rotate when the local session date changes:
//! `triggercard_{YYYYMMDD}_{run_id}.jsonl`.

mod logger;
mod writer;

pub use logger::{TriggerLogConfig, TriggerLogger};
pub use writer::TriggerCardWriter;
