use std::fmt::Write;

use crate::analysis::PeriodAnalysis;
use crate::models::{BucketSeries, DailyMetrics, Granularity, LogRecord};

const NO_DATA: &str = "No Data";

pub fn format_average(mean: f64) -> String {
    if mean.is_finite() {
        format!("{mean:.2}")
    } else {
        NO_DATA.to_string()
    }
}

pub fn format_trend(trend_percent: f64, granularity: Granularity) -> String {
    if trend_percent.is_finite() {
        format!(
            "{trend_percent:.2} % compared to {}",
            granularity.previous_period_label()
        )
    } else {
        NO_DATA.to_string()
    }
}

/// "8.00 at 15:00" for a single day, "8.00 on Mon, 22 Jul" for longer periods.
pub fn format_extremum(record: Option<&LogRecord>, granularity: Granularity) -> String {
    match record {
        Some(record) if granularity == Granularity::Day => format!(
            "{:.2} at {}",
            record.stress_level,
            record.timestamp.format("%H:%M")
        ),
        Some(record) => format!(
            "{:.2} on {}",
            record.stress_level,
            record.timestamp.format("%a, %-d %b")
        ),
        None => NO_DATA.to_string(),
    }
}

fn metric_average(metrics: &[DailyMetrics], value: impl Fn(&DailyMetrics) -> f64) -> f64 {
    let total: f64 = metrics.iter().map(value).sum();
    total / metrics.len() as f64
}

fn write_buckets(output: &mut String, title: &str, series: &BucketSeries) {
    let _ = writeln!(output, "## {title}");
    for bucket in series {
        let _ = writeln!(
            output,
            "- {}: {} ({} logs)",
            bucket.label,
            format_average(bucket.average),
            bucket.count
        );
    }
}

pub fn build_report(analysis: &PeriodAnalysis) -> String {
    let granularity = analysis.granularity;
    let current = &analysis.current;
    let (first_day, last_day) = analysis.window.current.day_span();
    let mut output = String::new();

    let _ = writeln!(output, "# Stress Report");
    let _ = writeln!(
        output,
        "Generated for the {} ending {} ({} to {})",
        granularity,
        analysis.reference,
        first_day,
        last_day
    );
    let _ = writeln!(output);

    let _ = writeln!(output, "## Summary");
    let _ = writeln!(output, "- Average: {}", format_average(current.mean));
    let _ = writeln!(
        output,
        "- Trend: {}",
        format_trend(current.trend_percent, granularity)
    );
    let _ = writeln!(
        output,
        "- Maximum: {}",
        format_extremum(current.max.as_ref(), granularity)
    );
    let _ = writeln!(
        output,
        "- Minimum: {}",
        format_extremum(current.min.as_ref(), granularity)
    );
    let _ = writeln!(
        output,
        "- Previous {} average: {}",
        granularity,
        format_average(analysis.previous.mean)
    );
    let _ = writeln!(output);

    write_buckets(
        &mut output,
        "Average Stress Level by Day of the Week",
        &analysis.by_weekday,
    );
    let _ = writeln!(output);
    write_buckets(
        &mut output,
        "Average Stress Level by Time of the Day",
        &analysis.by_time_of_day,
    );
    let _ = writeln!(output);

    let _ = writeln!(output, "## Daily Metrics");
    if analysis.daily_metrics.is_empty() {
        let _ = writeln!(output, "{NO_DATA}");
    } else {
        let metrics = &analysis.daily_metrics;
        let _ = writeln!(
            output,
            "- Sleep: {} hours",
            format_average(metric_average(metrics, |m| m.sleep_hours))
        );
        let _ = writeln!(
            output,
            "- Activity: {}",
            format_average(metric_average(metrics, |m| m.activity))
        );
        let _ = writeln!(
            output,
            "- School: {}",
            format_average(metric_average(metrics, |m| m.school))
        );
        for entry in metrics.iter().filter(|m| !m.note.is_empty()) {
            let _ = writeln!(output, "- {}: {}", entry.date, entry.note);
        }
    }
    let _ = writeln!(output);

    let _ = writeln!(output, "## Logs");
    if analysis.current_logs.is_empty() {
        let _ = writeln!(output, "{NO_DATA}");
    } else {
        for log in &analysis.current_logs {
            let _ = writeln!(
                output,
                "- {}: {:.0}",
                log.timestamp.format("%Y-%m-%d %H:%M"),
                log.stress_level
            );
        }
    }

    output
}

/// Compact terminal summary: the same figures as the report's summary block.
pub fn build_summary(analysis: &PeriodAnalysis) -> String {
    let granularity = analysis.granularity;
    let current = &analysis.current;
    let mut output = String::new();

    let _ = writeln!(output, "{} {}", granularity, analysis.window.current);
    let _ = writeln!(output, "Average: {}", format_average(current.mean));
    let _ = writeln!(
        output,
        "Trend:   {}",
        format_trend(current.trend_percent, granularity)
    );
    let _ = writeln!(
        output,
        "Maximum: {}",
        format_extremum(current.max.as_ref(), granularity)
    );
    let _ = writeln!(
        output,
        "Minimum: {}",
        format_extremum(current.min.as_ref(), granularity)
    );
    output
}

pub fn to_json(analysis: &PeriodAnalysis) -> anyhow::Result<String> {
    Ok(serde_json::to_string_pretty(analysis)?)
}
