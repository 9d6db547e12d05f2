//! Clock source for NOW() and TODAY()

use chrono::NaiveDateTime;
#[cfg(feature = "system-clock")]
use chrono::{Local, Utc};

/// Where the current date/time comes from.
/// Spreadsheet behavior: always the local wall clock.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ClockSpec {
    /// The system's local timezone (spreadsheet default behavior)
    #[cfg(feature = "system-clock")]
    Local,
    /// UTC wall clock
    #[cfg(feature = "system-clock")]
    Utc,
    /// A frozen instant, for reproducible evaluation and tests
    Fixed(NaiveDateTime),
}

impl Default for ClockSpec {
    #[cfg(feature = "system-clock")]
    fn default() -> Self {
        ClockSpec::Local
    }

    #[cfg(not(feature = "system-clock"))]
    fn default() -> Self {
        ClockSpec::Fixed(NaiveDateTime::default())
    }
}

impl ClockSpec {
    /// Get the current datetime according to this clock
    pub fn now(&self) -> NaiveDateTime {
        match self {
            #[cfg(feature = "system-clock")]
            ClockSpec::Local => Local::now().naive_local(),
            #[cfg(feature = "system-clock")]
            ClockSpec::Utc => Utc::now().naive_utc(),
            ClockSpec::Fixed(at) => *at,
        }
    }

    /// Get today's date according to this clock
    pub fn today(&self) -> chrono::NaiveDate {
        self.now().date()
    }
}
