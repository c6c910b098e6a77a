//! Futures session calendar.
//!
//! Pure logic over a zone-aware local `DateTime`; callers supply the
//! instant (usually `clock.now_local()`), so everything here is
//! deterministic and directly testable.
//!
//! Semantics:
//! - Session date rolls at 17:00 local: before 17:00 the session date is
//!   today, at or after 17:00 it is tomorrow's date.
//! - Break window is `[17:00, 18:00)` local, fixed.
//! - Operating window is configurable, `[start, end)` local, default
//!   `[07:00, 16:00)`.
//!
//! DST is handled by doing all comparisons on the tz-converted local time
//! rather than a fixed UTC offset.

use chrono::{DateTime, NaiveTime, Timelike};
use chrono_tz::Tz;
use std::fmt;

use obs_schemas::SessionPhase;

/// Break window start, local hour. Also the session-date roll boundary.
pub const BREAK_START_HOUR: u32 = 17;
/// Break window end, local hour (exclusive).
pub const BREAK_END_HOUR: u32 = 18;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Operating-window configuration errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScheduleError {
    /// A window bound was not `HH:MM`.
    BadTime(String),
    /// Window start was not strictly before its end.
    EmptyWindow,
}

impl fmt::Display for ScheduleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScheduleError::BadTime(raw) => write!(f, "invalid window time '{raw}' (want HH:MM)"),
            ScheduleError::EmptyWindow => write!(f, "operating window start must precede end"),
        }
    }
}

impl std::error::Error for ScheduleError {}

// ---------------------------------------------------------------------------
// SessionSchedule
// ---------------------------------------------------------------------------

/// Operating-window configuration plus the fixed session calendar.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSchedule {
    operating_start: NaiveTime,
    operating_end: NaiveTime,
}

impl Default for SessionSchedule {
    /// The default `[07:00, 16:00)` local operating window.
    fn default() -> Self {
        Self {
            operating_start: NaiveTime::from_hms_opt(7, 0, 0).unwrap(),
            operating_end: NaiveTime::from_hms_opt(16, 0, 0).unwrap(),
        }
    }
}

impl SessionSchedule {
    pub fn new(operating_start: NaiveTime, operating_end: NaiveTime) -> Result<Self, ScheduleError> {
        if operating_start >= operating_end {
            return Err(ScheduleError::EmptyWindow);
        }
        Ok(Self {
            operating_start,
            operating_end,
        })
    }

    /// Parse `HH:MM` window bounds, e.g. `("07:00", "16:00")`.
    pub fn parse(start: &str, end: &str) -> Result<Self, ScheduleError> {
        Self::new(parse_hhmm(start)?, parse_hhmm(end)?)
    }

    pub fn operating_start(&self) -> NaiveTime {
        self.operating_start
    }

    pub fn operating_end(&self) -> NaiveTime {
        self.operating_end
    }

    /// True when `local` falls in `[start, end)`.
    pub fn in_operating_window(&self, local: DateTime<Tz>) -> bool {
        let t = local.time();
        t >= self.operating_start && t < self.operating_end
    }

    /// True when `local` falls in the fixed `[17:00, 18:00)` break.
    pub fn is_break_window(local: DateTime<Tz>) -> bool {
        (BREAK_START_HOUR..BREAK_END_HOUR).contains(&local.hour())
    }

    /// Trading-session label for `local`, ISO `YYYY-MM-DD`.
    ///
    /// Rolls forward at the break start: Monday 16:59 belongs to Monday's
    /// session, Monday 17:00 already labels Tuesday's.
    pub fn session_date_iso(local: DateTime<Tz>) -> String {
        Self::session_date(local).format("%Y-%m-%d").to_string()
    }

    /// Session date as a naive date (see [`Self::session_date_iso`]).
    pub fn session_date(local: DateTime<Tz>) -> chrono::NaiveDate {
        let date = local.date_naive();
        if local.hour() >= BREAK_START_HOUR {
            date.succ_opt().unwrap_or(date)
        } else {
            date
        }
    }

    /// Operating / Break / Closed classification. Break wins over
    /// Operating for windows that are configured to overlap it.
    pub fn session_phase(&self, local: DateTime<Tz>) -> SessionPhase {
        if Self::is_break_window(local) {
            SessionPhase::Break
        } else if self.in_operating_window(local) {
            SessionPhase::Operating
        } else {
            SessionPhase::Closed
        }
    }
}

fn parse_hhmm(raw: &str) -> Result<NaiveTime, ScheduleError> {
    NaiveTime::parse_from_str(raw.trim(), "%H:%M")
        .map_err(|_| ScheduleError::BadTime(raw.to_string()))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
