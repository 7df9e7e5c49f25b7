use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

/// A single stress observation. Timestamps are local wall-clock time.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LogRecord {
    pub timestamp: NaiveDateTime,
    pub stress_level: f64,
}

impl LogRecord {
    pub fn new(timestamp: NaiveDateTime, stress_level: f64) -> Self {
        Self {
            timestamp,
            stress_level,
        }
    }
}

/// The once-a-day entries logged alongside stress: sleep, activity, school load and a note.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyMetrics {
    pub date: NaiveDate,
    pub sleep_hours: f64,
    pub activity: f64,
    pub school: f64,
    pub note: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Granularity {
    Day,
    Week,
    Month,
}

impl Granularity {
    /// How the preceding period is referred to in trend captions.
    pub fn previous_period_label(&self) -> &'static str {
        match self {
            Granularity::Day => "yesterday",
            Granularity::Week => "last week",
            Granularity::Month => "last month",
        }
    }
}

impl std::fmt::Display for Granularity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Granularity::Day => "day",
            Granularity::Week => "week",
            Granularity::Month => "month",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Extremum {
    Max,
    Min,
}

/// Statistics over one window's logs. `mean` and `trend_percent` are NaN when
/// there is nothing to compute them from; `max`/`min` are absent for empty input.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct AggregateResult {
    pub mean: f64,
    pub trend_percent: f64,
    pub max: Option<LogRecord>,
    pub min: Option<LogRecord>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Bucket {
    pub label: &'static str,
    pub average: f64,
    pub count: usize,
}

/// Fixed-size, fixed-order sequence of buckets. Empty buckets stay in the
/// series with a NaN average.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct BucketSeries {
    buckets: Vec<Bucket>,
}

impl BucketSeries {
    pub(crate) fn from_buckets(buckets: Vec<Bucket>) -> Self {
        Self { buckets }
    }

    pub fn len(&self) -> usize {
        self.buckets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Bucket> {
        self.buckets.iter()
    }

    pub fn get(&self, label: &str) -> Option<&Bucket> {
        self.buckets.iter().find(|bucket| bucket.label == label)
    }

    pub fn labels(&self) -> Vec<&'static str> {
        self.buckets.iter().map(|bucket| bucket.label).collect()
    }
}

impl<'a> IntoIterator for &'a BucketSeries {
    type Item = &'a Bucket;
    type IntoIter = std::slice::Iter<'a, Bucket>;

    fn into_iter(self) -> Self::IntoIter {
        self.buckets.iter()
    }
}
