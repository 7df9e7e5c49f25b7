use chrono::{Days, Months, NaiveDate, NaiveDateTime, NaiveTime, TimeDelta};
use serde::Serialize;

use crate::models::Granularity;

/// Which edge of a window is closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Bounds {
    /// `start <= t < end` (day and week windows)
    StartInclusive,
    /// `start < t <= end` (month windows)
    EndInclusive,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Window {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
    pub bounds: Bounds,
}

impl Window {
    pub fn contains(&self, timestamp: NaiveDateTime) -> bool {
        match self.bounds {
            Bounds::StartInclusive => self.start <= timestamp && timestamp < self.end,
            Bounds::EndInclusive => self.start < timestamp && timestamp <= self.end,
        }
    }

    pub fn duration(&self) -> TimeDelta {
        self.end - self.start
    }

    /// Calendar days touched by the window, first and last inclusive.
    pub fn day_span(&self) -> (NaiveDate, NaiveDate) {
        let tick = TimeDelta::nanoseconds(1);
        let first = match self.bounds {
            Bounds::StartInclusive => self.start,
            Bounds::EndInclusive => self.start.checked_add_signed(tick).unwrap_or(self.start),
        };
        let last = match self.bounds {
            Bounds::StartInclusive => self.end.checked_sub_signed(tick).unwrap_or(self.end),
            Bounds::EndInclusive => self.end,
        };
        let (first, last) = (first.date(), last.date());
        (first, last.max(first))
    }
}

impl std::fmt::Display for Window {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let (open, close) = match self.bounds {
            Bounds::StartInclusive => ('[', ')'),
            Bounds::EndInclusive => ('(', ']'),
        };
        write!(
            f,
            "{open}{}, {}{close}",
            self.start.format("%Y-%m-%dT%H:%M"),
            self.end.format("%Y-%m-%dT%H:%M")
        )
    }
}

/// The selected period and the equally sized period right before it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ComparisonWindow {
    pub current: Window,
    pub previous: Window,
}

pub fn compute_window(reference: NaiveDate, granularity: Granularity) -> ComparisonWindow {
    let day_start = start_of_day(reference);

    match granularity {
        Granularity::Day => {
            let start = day_start;
            let end = start_of_day(add_days(reference, 1));
            let previous_start = start_of_day(sub_days(reference, 1));
            ComparisonWindow {
                current: Window {
                    start,
                    end,
                    bounds: Bounds::StartInclusive,
                },
                previous: Window {
                    start: previous_start,
                    end: start,
                    bounds: Bounds::StartInclusive,
                },
            }
        }
        Granularity::Week => {
            let first_day = sub_days(reference, 6);
            let start = start_of_day(first_day);
            let end = start_of_day(add_days(reference, 1));
            let previous_start = start_of_day(sub_days(first_day, 7));
            ComparisonWindow {
                current: Window {
                    start,
                    end,
                    bounds: Bounds::StartInclusive,
                },
                previous: Window {
                    start: previous_start,
                    end: start,
                    bounds: Bounds::StartInclusive,
                },
            }
        }
        Granularity::Month => {
            let month_ago = sub_month(reference);
            let start = start_of_day(month_ago);
            let previous_start = start_of_day(sub_month(month_ago));
            ComparisonWindow {
                current: Window {
                    start,
                    end: day_start,
                    bounds: Bounds::EndInclusive,
                },
                previous: Window {
                    start: previous_start,
                    end: start,
                    bounds: Bounds::EndInclusive,
                },
            }
        }
    }
}

pub fn start_of_day(date: NaiveDate) -> NaiveDateTime {
    date.and_time(NaiveTime::MIN)
}

// Date arithmetic saturates at the representable range so that every
// reference date yields a window pair.
fn add_days(date: NaiveDate, days: u64) -> NaiveDate {
    date.checked_add_days(Days::new(days)).unwrap_or(NaiveDate::MAX)
}

fn sub_days(date: NaiveDate, days: u64) -> NaiveDate {
    date.checked_sub_days(Days::new(days)).unwrap_or(NaiveDate::MIN)
}

/// One calendar month back, clamped to the last day of shorter months.
fn sub_month(date: NaiveDate) -> NaiveDate {
    date.checked_sub_months(Months::new(1)).unwrap_or(NaiveDate::MIN)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(y: i32, m: u32, d: u32, h: u32, min: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(h, min, 0)
            .unwrap()
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn day_window_covers_reference_day() {
        let pair = compute_window(date(2024, 7, 25), Granularity::Day);
        assert_eq!(pair.current.start, at(2024, 7, 25, 0, 0));
        assert_eq!(pair.current.end, at(2024, 7, 26, 0, 0));
        assert_eq!(pair.previous.start, at(2024, 7, 24, 0, 0));
        assert_eq!(pair.previous.end, at(2024, 7, 25, 0, 0));
        assert_eq!(pair.current.bounds, Bounds::StartInclusive);
    }

    #[test]
    fn week_window_trails_seven_days() {
        let pair = compute_window(date(2024, 7, 25), Granularity::Week);
        assert_eq!(pair.current.start, at(2024, 7, 19, 0, 0));
        assert_eq!(pair.current.end, at(2024, 7, 26, 0, 0));
        assert_eq!(pair.previous.start, at(2024, 7, 12, 0, 0));
        assert_eq!(pair.previous.end, pair.current.start);
        assert_eq!(pair.current.duration(), TimeDelta::days(7));
        assert_eq!(pair.previous.duration(), TimeDelta::days(7));
    }

    #[test]
    fn month_window_uses_calendar_months() {
        let pair = compute_window(date(2024, 3, 31), Granularity::Month);
        assert_eq!(pair.current.start, at(2024, 2, 29, 0, 0));
        assert_eq!(pair.current.end, at(2024, 3, 31, 0, 0));
        assert_eq!(pair.previous.start, at(2024, 1, 29, 0, 0));
        assert_eq!(pair.previous.end, pair.current.start);
        assert_eq!(pair.current.bounds, Bounds::EndInclusive);
    }

    #[test]
    fn pairs_are_adjacent_and_disjoint() {
        for granularity in [Granularity::Day, Granularity::Week, Granularity::Month] {
            for reference in [date(2024, 1, 1), date(2024, 2, 29), date(2023, 12, 31)] {
                let pair = compute_window(reference, granularity);
                assert_eq!(pair.previous.end, pair.current.start);
                assert!(pair.previous.start < pair.previous.end);
                assert!(pair.current.start < pair.current.end);

                let edge = pair.current.start;
                assert!(
                    pair.current.contains(edge) != pair.previous.contains(edge),
                    "boundary instant must belong to exactly one window"
                );
            }
        }
    }

    #[test]
    fn day_and_week_boundaries_are_start_inclusive() {
        let pair = compute_window(date(2024, 7, 25), Granularity::Day);
        assert!(pair.current.contains(at(2024, 7, 25, 0, 0)));
        assert!(!pair.previous.contains(at(2024, 7, 25, 0, 0)));
        assert!(!pair.current.contains(at(2024, 7, 26, 0, 0)));
        assert!(pair.current.contains(at(2024, 7, 25, 23, 59)));
    }

    #[test]
    fn month_boundaries_are_end_inclusive() {
        let pair = compute_window(date(2024, 7, 25), Granularity::Month);
        let edge = at(2024, 6, 25, 0, 0);
        assert!(!pair.current.contains(edge));
        assert!(pair.previous.contains(edge));
        assert!(pair.current.contains(at(2024, 7, 25, 0, 0)));
        assert!(!pair.current.contains(at(2024, 7, 25, 9, 0)));
    }

    #[test]
    fn day_span_lists_touched_dates() {
        let week = compute_window(date(2024, 7, 25), Granularity::Week);
        assert_eq!(week.current.day_span(), (date(2024, 7, 19), date(2024, 7, 25)));

        let month = compute_window(date(2024, 7, 25), Granularity::Month);
        assert_eq!(month.current.day_span(), (date(2024, 6, 25), date(2024, 7, 25)));
    }

    #[test]
    fn extreme_dates_still_produce_windows() {
        let pair = compute_window(NaiveDate::MIN, Granularity::Month);
        assert!(pair.previous.start <= pair.previous.end);
        let pair = compute_window(NaiveDate::MAX, Granularity::Day);
        assert!(pair.current.start <= pair.current.end);
    }
}
