//! Host clock abstraction and UTC calendar conversion
//!
//! The RTC only ever asks the host one question: "what is the current Unix
//! time in seconds?". Hosts that want deterministic behaviour (tests, movie
//! playback, netplay) supply a [`ManualClock`] instead of [`SystemClock`].

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Datelike, Timelike, Utc};

/// Source of host wall-clock time
pub trait TimeSource {
    /// Current time as Unix epoch seconds (UTC)
    fn now(&self) -> u64;
}

/// Host wall clock
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl TimeSource for SystemClock {
    fn now(&self) -> u64 {
        // Pre-1970 host clocks clamp to the epoch
        Utc::now().timestamp().max(0) as u64
    }
}

/// Settable clock shared between the host and the RTC.
/// Clones observe the same time value.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    seconds: Arc<AtomicU64>,
}

impl ManualClock {
    pub fn new(seconds: u64) -> Self {
        Self {
            seconds: Arc::new(AtomicU64::new(seconds)),
        }
    }

    pub fn set(&self, seconds: u64) {
        self.seconds.store(seconds, Ordering::SeqCst);
    }

    pub fn advance(&self, seconds: u64) {
        self.seconds.fetch_add(seconds, Ordering::SeqCst);
    }
}

impl TimeSource for ManualClock {
    fn now(&self) -> u64 {
        self.seconds.load(Ordering::SeqCst)
    }
}

/// Broken-down UTC civil time, laid out like C's `struct tm`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CalendarTime {
    /// Full year (e.g. 2000)
    pub year: i32,
    /// Month, 0-based (0 = January)
    pub month0: u8,
    /// Day of month (1-31)
    pub day: u8,
    /// Day of week, 0 = Sunday
    pub weekday: u8,
    pub hour: u8,
    pub minute: u8,
    pub second: u8,
}

impl CalendarTime {
    /// Convert Unix seconds to UTC calendar fields.
    /// Timestamps chrono cannot represent fall back to the Unix epoch.
    pub fn from_epoch(seconds: u64) -> Self {
        let dt: DateTime<Utc> = i64::try_from(seconds)
            .ok()
            .and_then(|s| DateTime::from_timestamp(s, 0))
            .unwrap_or_default();

        Self {
            year: dt.year(),
            month0: dt.month0() as u8,
            day: dt.day() as u8,
            weekday: dt.weekday().num_days_from_sunday() as u8,
            hour: dt.hour() as u8,
            minute: dt.minute() as u8,
            second: dt.second() as u8,
        }
    }
}
