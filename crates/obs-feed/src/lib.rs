//! obs-feed
//!
//! The feed adapter boundary. This crate defines **only** the adapter
//! trait, the error taxonomy, the background driver thread, and the
//! deterministic in-process mock. No brokerage client lives here; a real
//! adapter implements [`L1Feed`] in its own crate and plugs into the same
//! driver.
//!
//! Architecture invariant: adapter code never touches engine state or
//! published snapshots. It normalizes events and pushes them to the
//! inbound queue, nothing else.

mod driver;
mod mock;

pub use driver::FeedDriver;
pub use mock::{MockFeedConfig, MockL1Feed};

use std::fmt;

/// Adapter failure classes. Fatal classes abort startup; transient ones
/// surface as status events and keep the process alive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeedError {
    /// Broker-side "client id already in use". Fatal at startup.
    ClientIdCollision(String),
    /// Unrecoverable authentication/authorization failure. Fatal.
    Auth(String),
    /// Network or transport failure. Transient; the adapter backs off.
    Transport(String),
}

impl FeedError {
    /// Fatal errors abort startup with a non-zero exit instead of being
    /// converted into status events.
    pub fn is_fatal(&self) -> bool {
        matches!(self, FeedError::ClientIdCollision(_) | FeedError::Auth(_))
    }
}

impl fmt::Display for FeedError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FeedError::ClientIdCollision(msg) => write!(f, "client id collision: {msg}"),
            FeedError::Auth(msg) => write!(f, "auth failure: {msg}"),
            FeedError::Transport(msg) => write!(f, "transport failure: {msg}"),
        }
    }
}

impl std::error::Error for FeedError {}

/// A normalized L1 market-data source.
///
/// The driver calls `connect` once on the caller's thread (so fatal
/// startup errors propagate synchronously), then `poll` repeatedly from
/// the feed thread, then `disconnect` on shutdown. Implementations own
/// their backoff, storm control, and subscription idempotency.
pub trait L1Feed: Send {
    fn name(&self) -> &'static str;

    fn connect(&mut self) -> Result<(), FeedError>;

    /// One non-blocking iteration: pump the native client, normalize and
    /// push pending events. Must return promptly.
    fn poll(&mut self);

    fn disconnect(&mut self);
}
