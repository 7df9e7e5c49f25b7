use chrono::{Datelike, Timelike};

use crate::models::{Bucket, BucketSeries, LogRecord};

pub const WEEKDAY_LABELS: [&str; 7] = ["Sun", "Mon", "Tue", "Wed", "Thu", "Fri", "Sat"];
pub const TIME_OF_DAY_LABELS: [&str; 8] = [
    "0-3", "3-6", "6-9", "9-12", "12-15", "15-18", "18-21", "21-24",
];

const HOURS_PER_BAND: u32 = 3;

/// Average stress per weekday, Sunday first.
pub fn by_weekday(records: &[LogRecord]) -> BucketSeries {
    bucketize(&WEEKDAY_LABELS, records, |record| {
        record.timestamp.weekday().num_days_from_sunday() as usize
    })
}

/// Average stress per three-hour band of the day, midnight first.
pub fn by_time_of_day(records: &[LogRecord]) -> BucketSeries {
    bucketize(&TIME_OF_DAY_LABELS, records, |record| {
        (record.timestamp.hour() / HOURS_PER_BAND) as usize
    })
}

fn bucketize<F>(labels: &[&'static str], records: &[LogRecord], index_of: F) -> BucketSeries
where
    F: Fn(&LogRecord) -> usize,
{
    let mut totals = vec![(0usize, 0.0f64); labels.len()];

    for record in records {
        let index = index_of(record);
        if let Some(entry) = totals.get_mut(index) {
            entry.0 += 1;
            entry.1 += record.stress_level;
        }
    }

    let buckets = labels
        .iter()
        .copied()
        .zip(totals)
        .map(|(label, (count, total))| Bucket {
            label,
            average: total / count as f64,
            count,
        })
        .collect();

    BucketSeries::from_buckets(buckets)
}
