//! Trading-day arithmetic over an externally supplied holiday set.
//!
//! Holiday data comes from an external calendar source; this module only
//! skips weekends and the dates it is handed.

use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveTime, TimeZone, Utc, Weekday};
use std::collections::HashSet;

pub fn is_weekend(d: NaiveDate) -> bool {
    matches!(d.weekday(), Weekday::Sat | Weekday::Sun)
}

/// Calendar days in `[from, to]` that are neither weekends nor holidays.
pub fn trading_days(from: NaiveDate, to: NaiveDate, holidays: &HashSet<NaiveDate>) -> Vec<NaiveDate> {
    let mut days = Vec::new();
    let mut current = from;
    while current <= to {
        if !is_weekend(current) && !holidays.contains(&current) {
            days.push(current);
        }
        current += Duration::days(1);
    }
    days
}

/// First trading day strictly after `after`, scanning at most 30 days ahead.
pub fn next_trading_day(after: NaiveDate, holidays: &HashSet<NaiveDate>) -> Option<NaiveDate> {
    trading_days(after + Duration::days(1), after + Duration::days(30), holidays)
        .into_iter()
        .next()
}

/// Last trading day strictly before `before`, scanning at most 30 days back.
pub fn prev_trading_day(before: NaiveDate, holidays: &HashSet<NaiveDate>) -> Option<NaiveDate> {
    trading_days(before - Duration::days(30), before - Duration::days(1), holidays)
        .into_iter()
        .last()
}

/// Next UTC instant a schedule with local run time `"HH:MM"` at the given
/// fixed UTC offset should fire, relative to `now`. Rolls to the next day
/// when the local run time has already passed.
pub fn next_run_utc(
    run_at_local: &str,
    tz_offset_minutes: i32,
    now: DateTime<Utc>,
) -> Option<DateTime<Utc>> {
    let time = NaiveTime::parse_from_str(run_at_local, "%H:%M").ok()?;
    let offset = chrono::FixedOffset::east_opt(tz_offset_minutes * 60)?;
    let local_now = now.with_timezone(&offset);
    let mut candidate = offset
        .from_local_datetime(&local_now.date_naive().and_time(time))
        .single()?;
    if candidate <= local_now {
        candidate += Duration::days(1);
    }
    Some(candidate.with_timezone(&Utc))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn skips_weekends_and_holidays() {
        // 2024-01-01 (Mon, holiday) .. 2024-01-07 (Sun)
        let holidays: HashSet<_> = [d(2024, 1, 1)].into_iter().collect();
        let days = trading_days(d(2024, 1, 1), d(2024, 1, 7), &holidays);
        assert_eq!(days, vec![d(2024, 1, 2), d(2024, 1, 3), d(2024, 1, 4), d(2024, 1, 5)]);
    }

    #[test]
    fn next_and_prev_trading_day() {
        let holidays = HashSet::new();
        // Friday 2024-01-05 -> next is Monday 2024-01-08
        assert_eq!(next_trading_day(d(2024, 1, 5), &holidays), Some(d(2024, 1, 8)));
        // Monday 2024-01-08 -> previous is Friday 2024-01-05
        assert_eq!(prev_trading_day(d(2024, 1, 8), &holidays), Some(d(2024, 1, 5)));
    }

    #[test]
    fn next_run_rolls_over_past_times() {
        // 10:00 UTC now; schedule at 09:00 Jakarta (UTC+7) = 02:00 UTC -> tomorrow
        let now = Utc.with_ymd_and_hms(2024, 6, 3, 10, 0, 0).unwrap();
        let next = next_run_utc("09:00", 7 * 60, now).unwrap();
        assert_eq!(next, Utc.with_ymd_and_hms(2024, 6, 4, 2, 0, 0).unwrap());

        // schedule later today stays today
        let next = next_run_utc("20:00", 7 * 60, now).unwrap();
        assert_eq!(next, Utc.with_ymd_and_hms(2024, 6, 3, 13, 0, 0).unwrap());
    }
}
