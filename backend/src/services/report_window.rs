//! Reporting windows and series helpers shared by the metrics queries.
//!
//! All boundaries are UTC. A window of "last N days" starts at midnight N
//! days before today and ends at the last millisecond of today, so it spans
//! N + 1 calendar dates. Daily series span exactly N dates ending today.

use std::collections::HashMap;

use chrono::{DateTime, Days, Duration, NaiveDate, NaiveTime, Utc};

/// A closed time interval used to filter rows by `created_at`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl DateWindow {
    /// The current UTC day, midnight to 23:59:59.999.
    pub fn today(now: DateTime<Utc>) -> Self {
        let start = start_of_day(now.date_naive());
        Self {
            start,
            end: end_of_day(start),
        }
    }

    /// From midnight `days` days ago through the end of today.
    pub fn last_days(now: DateTime<Utc>, days: u32) -> Self {
        let today = now.date_naive();
        let first = today
            .checked_sub_days(Days::new(days as u64))
            .unwrap_or(NaiveDate::MIN);
        Self {
            start: start_of_day(first),
            end: end_of_day(start_of_day(today)),
        }
    }

    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        at >= self.start && at <= self.end
    }
}

/// The standard windows reported side by side on the dashboard.
#[derive(Debug, Clone, Copy)]
pub struct StandardWindows {
    pub today: DateWindow,
    pub last_7d: DateWindow,
    pub last_30d: DateWindow,
}

impl StandardWindows {
    pub fn at(now: DateTime<Utc>) -> Self {
        Self {
            today: DateWindow::today(now),
            last_7d: DateWindow::last_days(now, 7),
            last_30d: DateWindow::last_days(now, 30),
        }
    }
}

fn start_of_day(date: NaiveDate) -> DateTime<Utc> {
    date.and_time(NaiveTime::MIN).and_utc()
}

fn end_of_day(start: DateTime<Utc>) -> DateTime<Utc> {
    start + Duration::days(1) - Duration::milliseconds(1)
}

/// The `days` calendar dates ending today, oldest first.
pub fn day_series(now: DateTime<Utc>, days: u32) -> Vec<NaiveDate> {
    let today = now.date_naive();
    (0..days)
        .rev()
        .filter_map(|offset| today.checked_sub_days(Days::new(offset as u64)))
        .collect()
}

/// Lay bucketed values over a date series, filling gaps with the default.
pub fn fill_series<T: Default + Clone>(
    dates: &[NaiveDate],
    buckets: &HashMap<NaiveDate, T>,
) -> Vec<(NaiveDate, T)> {
    dates
        .iter()
        .map(|date| (*date, buckets.get(date).cloned().unwrap_or_default()))
        .collect()
}

/// Round to two decimal places, half away from zero.
pub fn round2(value: f64) -> f64 {
    if !value.is_finite() {
        return 0.0;
    }
    (value * 100.0).round() / 100.0
}

/// `part / whole` as a percentage, 0 when there is nothing to divide by.
pub fn percentage(part: i64, whole: i64) -> f64 {
    if whole <= 0 {
        return 0.0;
    }
    part as f64 / whole as f64 * 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn noon(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, 12, 30, 0).unwrap()
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_today_window() {
        let w = DateWindow::today(noon(2025, 3, 10));
        assert_eq!(w.start, Utc.with_ymd_and_hms(2025, 3, 10, 0, 0, 0).unwrap());
        assert_eq!(
            w.end,
            Utc.with_ymd_and_hms(2025, 3, 10, 23, 59, 59).unwrap() + Duration::milliseconds(999)
        );
    }

    #[test]
    fn test_last_days_window_spans_n_plus_one_dates() {
        let w = DateWindow::last_days(noon(2025, 3, 10), 7);
        assert_eq!(w.start, Utc.with_ymd_and_hms(2025, 3, 3, 0, 0, 0).unwrap());
        assert_eq!(w.end, DateWindow::today(noon(2025, 3, 10)).end);
    }

    #[test]
    fn test_last_days_crosses_month_boundary() {
        let w = DateWindow::last_days(noon(2025, 3, 2), 30);
        assert_eq!(w.start.date_naive(), date(2025, 1, 31));
    }

    #[test]
    fn test_window_contains_is_inclusive() {
        let w = DateWindow::today(noon(2025, 3, 10));
        assert!(w.contains(w.start));
        assert!(w.contains(w.end));
        assert!(!w.contains(w.end + Duration::milliseconds(1)));
        assert!(!w.contains(w.start - Duration::milliseconds(1)));
    }

    #[test]
    fn test_standard_windows_nest() {
        let windows = StandardWindows::at(noon(2025, 6, 1));
        assert!(windows.last_30d.start < windows.last_7d.start);
        assert!(windows.last_7d.start < windows.today.start);
        assert_eq!(windows.today.end, windows.last_30d.end);
    }

    #[test]
    fn test_day_series_oldest_first() {
        let series = day_series(noon(2025, 1, 2), 4);
        assert_eq!(
            series,
            vec![date(2024, 12, 30), date(2024, 12, 31), date(2025, 1, 1), date(2025, 1, 2)]
        );
    }

    #[test]
    fn test_day_series_single_day() {
        assert_eq!(day_series(noon(2025, 1, 2), 1), vec![date(2025, 1, 2)]);
    }

    #[test]
    fn test_fill_series_zero_fills() {
        let dates = day_series(noon(2025, 1, 3), 3);
        let mut buckets = HashMap::new();
        buckets.insert(date(2025, 1, 2), 7_i64);
        buckets.insert(date(2024, 12, 1), 99_i64);

        let filled = fill_series(&dates, &buckets);
        assert_eq!(
            filled,
            vec![(date(2025, 1, 1), 0), (date(2025, 1, 2), 7), (date(2025, 1, 3), 0)]
        );
    }

    #[test]
    fn test_round2() {
        assert_eq!(round2(1.234), 1.23);
        assert_eq!(round2(0.125), 0.13);
        assert_eq!(round2(0.0), 0.0);
        assert_eq!(round2(2.0 / 3.0), 0.67);
        assert_eq!(round2(f64::NAN), 0.0);
    }

    #[test]
    fn test_percentage() {
        assert_eq!(percentage(0, 0), 0.0);
        assert_eq!(percentage(1, 4), 25.0);
        assert_eq!(round2(percentage(2, 3)), 66.67);
    }
}
