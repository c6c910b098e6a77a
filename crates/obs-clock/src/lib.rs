//! obs-clock
//!
//! Canonical time semantics for the kernel:
//! - monotonic nanoseconds for every age/staleness calculation,
//! - wall-clock milliseconds for record timestamps,
//! - DST-safe local time in the canonical zone (America/Toronto),
//! - the futures session calendar (date rolls at 17:00 local, break
//!   window 17:00–18:00, configurable operating window).
//!
//! The [`Clock`] trait lets tests inject deterministic time; all session
//! logic is pure given a local `DateTime`.

mod session;

pub use session::{ScheduleError, SessionSchedule, BREAK_END_HOUR, BREAK_START_HOUR};

use chrono::{DateTime, TimeZone, Utc};
use chrono_tz::America::Toronto;
use chrono_tz::Tz;
use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Canonical local zone for session arithmetic.
pub const LOCAL_TZ: Tz = Toronto;

// ---------------------------------------------------------------------------
// Clock trait
// ---------------------------------------------------------------------------

/// Time source abstraction. Implementations must keep `now_mono_ns`
/// non-decreasing within one process.
pub trait Clock: Send + Sync {
    /// Wall-clock time in milliseconds since the Unix epoch (UTC).
    fn now_unix_ms(&self) -> i64;

    /// Monotonic time in nanoseconds. Only differences are meaningful.
    fn now_mono_ns(&self) -> u64;

    /// Current time in the canonical local zone, derived from wall time.
    fn now_local(&self) -> DateTime<Tz> {
        let utc = DateTime::<Utc>::from_timestamp_millis(self.now_unix_ms())
            .unwrap_or(DateTime::<Utc>::UNIX_EPOCH);
        utc.with_timezone(&LOCAL_TZ)
    }
}

// ---------------------------------------------------------------------------
// SystemClock
// ---------------------------------------------------------------------------

/// Real time source: `Instant` since construction for monotonic reads,
/// `Utc::now` for wall time.
#[derive(Debug)]
pub struct SystemClock {
    boot: Instant,
}

impl Default for SystemClock {
    fn default() -> Self {
        Self {
            boot: Instant::now(),
        }
    }
}

impl SystemClock {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Clock for SystemClock {
    fn now_unix_ms(&self) -> i64 {
        Utc::now().timestamp_millis()
    }

    fn now_mono_ns(&self) -> u64 {
        self.boot.elapsed().as_nanos() as u64
    }
}

// ---------------------------------------------------------------------------
// FrozenClock
// ---------------------------------------------------------------------------

/// Deterministic clock for tests: both timelines stand still until
/// explicitly advanced. Advancing moves wall and monotonic time together.
#[derive(Debug)]
pub struct FrozenClock {
    unix_ms: AtomicI64,
    mono_ns: AtomicU64,
}

impl FrozenClock {
    pub fn new(unix_ms: i64, mono_ns: u64) -> Self {
        Self {
            unix_ms: AtomicI64::new(unix_ms),
            mono_ns: AtomicU64::new(mono_ns),
        }
    }

    /// Start the frozen timeline at a given local date/time.
    ///
    /// Ambiguous or skipped local instants (DST transitions) resolve to the
    /// earliest valid mapping.
    pub fn at_local(year: i32, month: u32, day: u32, hour: u32, min: u32, sec: u32) -> Self {
        let local = LOCAL_TZ
            .with_ymd_and_hms(year, month, day, hour, min, sec)
            .earliest()
            .unwrap_or_else(|| LOCAL_TZ.with_ymd_and_hms(year, month, day, 12, 0, 0).unwrap());
        Self::new(local.timestamp_millis(), 0)
    }

    pub fn advance(&self, by: Duration) {
        self.unix_ms
            .fetch_add(by.as_millis() as i64, Ordering::SeqCst);
        self.mono_ns
            .fetch_add(by.as_nanos() as u64, Ordering::SeqCst);
    }

    pub fn advance_ms(&self, ms: u64) {
        self.advance(Duration::from_millis(ms));
    }

    /// Move only the wall clock (e.g. to simulate a date roll without
    /// aging any monotonic state).
    pub fn set_unix_ms(&self, unix_ms: i64) {
        self.unix_ms.store(unix_ms, Ordering::SeqCst);
    }
}

impl Clock for FrozenClock {
    fn now_unix_ms(&self) -> i64 {
        self.unix_ms.load(Ordering::SeqCst)
    }

    fn now_mono_ns(&self) -> u64 {
        self.mono_ns.load(Ordering::SeqCst)
    }
}
