use anyhow::Context;
use chrono::NaiveDate;
use serde::Serialize;

use crate::buckets;
use crate::models::{AggregateResult, BucketSeries, DailyMetrics, Granularity, LogRecord};
use crate::stats;
use crate::store::LogStore;
use crate::window::{compute_window, ComparisonWindow, Window};

/// Everything the presentation layer needs for one period view.
#[derive(Debug, Clone, Serialize)]
pub struct PeriodAnalysis {
    pub reference: NaiveDate,
    pub granularity: Granularity,
    pub window: ComparisonWindow,
    /// Current-window logs, oldest first.
    pub current_logs: Vec<LogRecord>,
    pub previous_logs: Vec<LogRecord>,
    pub current: AggregateResult,
    /// The period before has no loaded predecessor, so its trend is NaN.
    pub previous: AggregateResult,
    pub by_weekday: BucketSeries,
    pub by_time_of_day: BucketSeries,
    pub daily_metrics: Vec<DailyMetrics>,
}

pub async fn analyze<S>(
    store: &S,
    reference: NaiveDate,
    granularity: Granularity,
) -> anyhow::Result<PeriodAnalysis>
where
    S: LogStore + ?Sized,
{
    let window = compute_window(reference, granularity);
    tracing::debug!(
        "analyzing {} of {}: current {}, previous {}",
        granularity,
        reference,
        window.current,
        window.previous
    );

    let current_logs = load_window(store, &window.current).await?;
    let previous_logs = load_window(store, &window.previous).await?;

    let (first_day, last_day) = window.current.day_span();
    let daily_metrics = store
        .fetch_daily_metrics(first_day, last_day)
        .await
        .context("failed to load daily metrics")?;

    tracing::info!(
        "{} logs in current {}, {} in previous",
        current_logs.len(),
        granularity,
        previous_logs.len()
    );

    Ok(PeriodAnalysis {
        reference,
        granularity,
        window,
        current: stats::aggregate(&current_logs, &previous_logs),
        previous: stats::aggregate(&previous_logs, &[]),
        by_weekday: buckets::by_weekday(&current_logs),
        by_time_of_day: buckets::by_time_of_day(&current_logs),
        current_logs,
        previous_logs,
        daily_metrics,
    })
}

/// Fetches a window and keeps only records that really fall inside it, sorted by time.
async fn load_window<S>(store: &S, window: &Window) -> anyhow::Result<Vec<LogRecord>>
where
    S: LogStore + ?Sized,
{
    let fetched = store
        .fetch_in_range(window)
        .await
        .with_context(|| format!("failed to load logs for {window}"))?;
    let fetched_count = fetched.len();

    let mut logs: Vec<LogRecord> = fetched
        .into_iter()
        .filter(|record| window.contains(record.timestamp))
        .collect();
    if logs.len() != fetched_count {
        tracing::warn!(
            "store returned {} records outside {}",
            fetched_count - logs.len(),
            window
        );
    }

    stats::sort_by_time(&mut logs);
    Ok(logs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use async_trait::async_trait;
    use chrono::NaiveDateTime;

    fn at(d: u32, h: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 7, d)
            .unwrap()
            .and_hms_opt(h, 0, 0)
            .unwrap()
    }

    fn reference() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 7, 25).unwrap()
    }

    #[tokio::test]
    async fn week_analysis_matches_worked_example() {
        let store = MemoryStore::with_logs(vec![
            LogRecord::new(at(23, 10), 2.0),
            LogRecord::new(at(22, 15), 8.0),
            LogRecord::new(at(22, 9), 4.0),
        ]);

        let analysis = analyze(&store, reference(), Granularity::Week).await.unwrap();

        let times: Vec<NaiveDateTime> =
            analysis.current_logs.iter().map(|r| r.timestamp).collect();
        assert_eq!(times, vec![at(22, 9), at(22, 15), at(23, 10)]);
        assert!((analysis.current.mean - 4.67).abs() < 0.01);
        assert!(analysis.current.trend_percent.is_nan());
        assert_eq!(analysis.current.max.unwrap().timestamp, at(22, 15));
        assert_eq!(analysis.by_weekday.get("Mon").unwrap().average, 6.0);
        assert_eq!(analysis.by_weekday.get("Tue").unwrap().average, 2.0);
        assert!(analysis.by_weekday.get("Wed").unwrap().average.is_nan());
        assert_eq!(analysis.by_time_of_day.len(), 8);
        assert!(analysis.previous.mean.is_nan());
    }

    #[tokio::test]
    async fn day_analysis_compares_against_yesterday() {
        let store = MemoryStore::with_logs(vec![
            LogRecord::new(at(24, 9), 4.0),
            LogRecord::new(at(25, 9), 6.0),
            LogRecord::new(at(25, 0), 2.0),
        ]);

        let analysis = analyze(&store, reference(), Granularity::Day).await.unwrap();
        assert_eq!(analysis.current_logs.len(), 2);
        assert_eq!(analysis.previous_logs.len(), 1);
        assert!((analysis.current.trend_percent - 100.0).abs() < 1e-9);
        assert!(analysis.previous.trend_percent.is_nan());
        assert_eq!(analysis.previous.mean, 4.0);
    }

    #[tokio::test]
    async fn empty_store_yields_no_data_everywhere() {
        let store = MemoryStore::new();
        let analysis = analyze(&store, reference(), Granularity::Month).await.unwrap();
        assert!(analysis.current.mean.is_nan());
        assert!(analysis.current.max.is_none());
        assert!(analysis.current.min.is_none());
        assert_eq!(analysis.by_weekday.len(), 7);
        assert!(analysis.by_time_of_day.iter().all(|b| b.average.is_nan()));
        assert!(analysis.daily_metrics.is_empty());
    }

    struct SloppyStore(Vec<LogRecord>);

    #[async_trait]
    impl LogStore for SloppyStore {
        async fn fetch_in_range(&self, _window: &Window) -> anyhow::Result<Vec<LogRecord>> {
            Ok(self.0.clone())
        }

        async fn insert(&self, _record: LogRecord) -> anyhow::Result<()> {
            Ok(())
        }

        async fn fetch_daily_metrics(
            &self,
            _from: NaiveDate,
            _to: NaiveDate,
        ) -> anyhow::Result<Vec<DailyMetrics>> {
            Ok(Vec::new())
        }

        async fn upsert_daily_metrics(&self, _metrics: DailyMetrics) -> anyhow::Result<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn records_outside_the_window_are_dropped() {
        let store = SloppyStore(vec![
            LogRecord::new(at(1, 9), 10.0),
            LogRecord::new(at(25, 9), 3.0),
        ]);
        let analysis = analyze(&store, reference(), Granularity::Day).await.unwrap();
        assert_eq!(analysis.current_logs.len(), 1);
        assert_eq!(analysis.current.max.unwrap().stress_level, 3.0);
        assert!(analysis.previous_logs.is_empty());
    }

    #[tokio::test]
    async fn daily_metrics_follow_the_current_window() {
        let store = MemoryStore::new();
        for (day, sleep) in [(18, 5.0), (19, 6.0), (25, 8.0), (26, 9.0)] {
            store
                .upsert_daily_metrics(DailyMetrics {
                    date: NaiveDate::from_ymd_opt(2024, 7, day).unwrap(),
                    sleep_hours: sleep,
                    activity: 1.0,
                    school: 1.0,
                    note: String::new(),
                })
                .await
                .unwrap();
        }

        let analysis = analyze(&store, reference(), Granularity::Week).await.unwrap();
        let sleeps: Vec<f64> = analysis.daily_metrics.iter().map(|m| m.sleep_hours).collect();
        assert_eq!(sleeps, vec![6.0, 8.0]);
    }
}
