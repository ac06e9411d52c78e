//! Market calendar and wall clock.

use chrono::{DateTime, Datelike, FixedOffset, Local, NaiveDate, NaiveTime, TimeDelta, Weekday};

/// Source of "now" for the jobs, in the market's local offset.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<FixedOffset>;
}

/// The host's local clock.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<FixedOffset> {
        Local::now().fixed_offset()
    }
}

/// A clock frozen at one instant.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<FixedOffset>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<FixedOffset> {
        self.0
    }
}

/// Monday to Friday.
pub fn is_trading_day(date: NaiveDate) -> bool {
    !matches!(date.weekday(), Weekday::Sat | Weekday::Sun)
}

/// 15:00 to 16:00 inclusive, the hour after the close when daily figures settle.
pub fn in_daily_window(time: NaiveTime) -> bool {
    let open = NaiveTime::from_hms_opt(15, 0, 0);
    let close = NaiveTime::from_hms_opt(16, 0, 0);
    match (open, close) {
        (Some(open), Some(close)) => time >= open && time <= close,
        _ => false,
    }
}

/// Midnight at the start of `date` in `offset`.
pub fn day_start(date: NaiveDate, offset: FixedOffset) -> DateTime<FixedOffset> {
    let midnight_utc = date.and_time(NaiveTime::MIN) - TimeDelta::seconds(i64::from(offset.local_minus_utc()));
    DateTime::from_naive_utc_and_offset(midnight_utc, offset)
}

/// `[start, end)` epoch millis covering the calendar day of `now`.
pub fn day_bounds(now: &DateTime<FixedOffset>) -> (i64, i64) {
    let start = day_start(now.date_naive(), *now.offset()).timestamp_millis();
    (start, start + TimeDelta::days(1).num_milliseconds())
}

/// Text stored in the `date:date` column for a run at `at`.
pub fn format_run_time(at: &DateTime<FixedOffset>) -> String {
    at.format("%Y-%-m-%-d %H:%M:%S").to_string()
}

#[cfg(test)]
pub(crate) fn at(y: i32, m: u32, d: u32, h: u32, min: u32) -> DateTime<FixedOffset> {
    use chrono::TimeZone;
    FixedOffset::east_opt(8 * 3600)
        .unwrap()
        .with_ymd_and_hms(y, m, d, h, min, 0)
        .unwrap()
}
