//! A process-wide logical clock fixed to a single timezone offset.
//!
//! Every day-keyed aggregate in the system (daily stats, cache TTL windows,
//! cron firing times) must line up against the same zone regardless of the
//! host's local timezone, so all "now" and "start of day" calls route through
//! here instead of `chrono::Local`.

use chrono::{DateTime, FixedOffset, NaiveDate, TimeZone, Utc};

/// UTC+8, the system's default logical zone.
pub const DEFAULT_OFFSET_HOURS: i32 = 8;

#[derive(Debug, Clone, Copy)]
pub struct Clock {
    offset: FixedOffset,
}

impl Clock {
    pub fn new(offset_hours: i32) -> Self {
        let secs = offset_hours * 3600;
        Self {
            offset: FixedOffset::east_opt(secs).expect("offset in range"),
        }
    }

    /// The current instant, expressed in this clock's zone.
    pub fn now(&self) -> DateTime<FixedOffset> {
        Utc::now().with_timezone(&self.offset)
    }

    /// Midnight of the current day, in this clock's zone.
    pub fn today(&self) -> NaiveDate {
        self.now().date_naive()
    }

    /// Midnight of the given date, in this clock's zone, as a UTC instant.
    pub fn start_of_day(&self, date: NaiveDate) -> DateTime<Utc> {
        self.offset
            .from_local_datetime(&date.and_hms_opt(0, 0, 0).expect("valid midnight"))
            .single()
            .expect("unambiguous in a fixed offset")
            .with_timezone(&Utc)
    }
}

impl Default for Clock {
    fn default() -> Self {
        Self::new(DEFAULT_OFFSET_HOURS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Timelike;

    #[test]
    fn default_clock_uses_utc_plus_8() {
        let c = Clock::default();
        assert_eq!(c.offset.local_minus_utc(), 8 * 3600);
    }

    #[test]
    fn start_of_day_is_midnight_in_zone() {
        let c = Clock::default();
        let date = NaiveDate::from_ymd_opt(2024, 3, 15).unwrap();
        let start = c.start_of_day(date);
        let local = start.with_timezone(&c.offset);
        assert_eq!(local.date_naive(), date);
        assert_eq!((local.hour(), local.minute(), local.second()), (0, 0, 0));
    }

    #[test]
    fn today_matches_now_date() {
        let c = Clock::default();
        assert_eq!(c.today(), c.now().date_naive());
    }
}
