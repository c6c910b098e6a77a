//! obs-queues
//!
//! Bounded multi-producer / single-consumer queues between the feed
//! adapter, the UI, and the engine. Producers only ever `try_push`; the
//! engine drains at the cycle boundary. Nothing here blocks.
//!
//! Backed by `crossbeam-channel` bounded channels: FIFO per producer,
//! internally synchronized, non-blocking try ops on both ends.

mod command_queue;
mod inbound;

pub use command_queue::{CoalescedCommands, CommandQueue};
pub use inbound::InboundQueue;

use std::fmt;

/// Default inbound event queue capacity.
pub const INBOUND_CAPACITY: usize = 1000;

/// Default command queue capacity.
pub const COMMAND_CAPACITY: usize = 100;

/// The engine's per-cycle drain ceiling (anti-starvation).
pub const DRAIN_CEILING: usize = 1024;

/// Non-blocking push failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PushError {
    /// Queue at capacity; the item was dropped by the producer.
    QueueFull,
    /// Consumer side is gone (engine shut down first).
    Closed,
}

impl fmt::Display for PushError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PushError::QueueFull => f.write_str("queue full"),
            PushError::Closed => f.write_str("queue closed"),
        }
    }
}

impl std::error::Error for PushError {}
