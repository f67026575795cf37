use std::cell::Cell;

use chrono::{DateTime, Duration, Local};

/// Format used for every persisted timestamp: ISO-8601 local time, seconds precision.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// Source of wall-clock time.
///
/// Quiz timing is always recomputed from a stored start instant, so the only
/// thing the core needs is "what time is it now".
pub trait Clock {
    fn now(&self) -> DateTime<Local>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Local> {
        Local::now()
    }
}

/// A clock that only moves when told to.
#[derive(Debug, Clone)]
pub struct ManualClock {
    current: Cell<DateTime<Local>>,
}

impl ManualClock {
    pub fn new(start: DateTime<Local>) -> Self {
        Self {
            current: Cell::new(start),
        }
    }

    pub fn advance_secs(&self, secs: i64) {
        self.current.set(self.current.get() + Duration::seconds(secs));
    }

    pub fn advance_millis(&self, millis: i64) {
        self.current.set(self.current.get() + Duration::milliseconds(millis));
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new(Local::now())
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Local> {
        self.current.get()
    }
}

impl<C: Clock + ?Sized> Clock for &C {
    fn now(&self) -> DateTime<Local> {
        (**self).now()
    }
}

pub fn format_timestamp(instant: &DateTime<Local>) -> String {
    instant.format(TIMESTAMP_FORMAT).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn manual_clock_moves_only_when_advanced() {
        let start = Local.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap();
        let clock = ManualClock::new(start);

        assert_eq!(clock.now(), start);
        clock.advance_secs(5);
        assert_eq!(clock.now(), start + Duration::seconds(5));
    }

    #[test]
    fn timestamps_have_seconds_precision() {
        let instant = Local.with_ymd_and_hms(2024, 3, 1, 9, 5, 7).unwrap()
            + Duration::milliseconds(450);

        assert_eq!(format_timestamp(&instant), "2024-03-01T09:05:07");
    }
}
