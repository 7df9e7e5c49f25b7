use crate::models::{AggregateResult, Extremum, LogRecord};

/// Arithmetic mean of the stress levels, NaN for an empty slice.
pub fn mean(records: &[LogRecord]) -> f64 {
    let total: f64 = records.iter().map(|record| record.stress_level).sum();
    total / records.len() as f64
}

/// `mean(current) / mean(previous) * 100`.
///
/// NaN propagates from either side. A zero previous mean yields an infinite
/// (or NaN for 0/0) percentage which callers render as "no data".
pub fn trend(current: &[LogRecord], previous: &[LogRecord]) -> f64 {
    percentage(mean(current), mean(previous))
}

pub fn percentage(current_mean: f64, previous_mean: f64) -> f64 {
    current_mean / previous_mean * 100.0
}

/// Record with the highest or lowest stress level. Ties go to the earliest
/// timestamp; input order does not matter.
pub fn extremum(records: &[LogRecord], kind: Extremum) -> Option<LogRecord> {
    let mut ordered = records.to_vec();
    ordered.sort_by(|a, b| a.timestamp.cmp(&b.timestamp));

    let mut best: Option<LogRecord> = None;
    for record in ordered {
        let replace = match best {
            None => true,
            Some(current) => {
                let ordering = record.stress_level.total_cmp(&current.stress_level);
                match kind {
                    Extremum::Max => ordering.is_gt(),
                    Extremum::Min => ordering.is_lt(),
                }
            }
        };
        if replace {
            best = Some(record);
        }
    }

    best
}

/// All statistics for `current`, with the trend measured against `previous`.
pub fn aggregate(current: &[LogRecord], previous: &[LogRecord]) -> AggregateResult {
    AggregateResult {
        mean: mean(current),
        trend_percent: trend(current, previous),
        max: extremum(current, Extremum::Max),
        min: extremum(current, Extremum::Min),
    }
}

/// Stable ascending sort by timestamp.
pub fn sort_by_time(records: &mut [LogRecord]) {
    records.sort_by(|a, b| a.timestamp.cmp(&b.timestamp));
}
