use std::path::Path;

use anyhow::Context;
use async_trait::async_trait;
use chrono::{Datelike, NaiveDate, NaiveDateTime};
use sqlx::postgres::PgPoolOptions;
use sqlx::{PgPool, Row};
use uuid::Uuid;

use crate::models::{DailyMetrics, LogRecord};
use crate::store::{read_log_csv, LogStore};
use crate::window::{Bounds, Window};

pub struct PgLogStore {
    pool: PgPool,
}

impl PgLogStore {
    pub async fn connect(database_url: &str, max_connections: u32) -> anyhow::Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await
            .context("failed to connect to Postgres")?;
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl LogStore for PgLogStore {
    async fn fetch_in_range(&self, window: &Window) -> anyhow::Result<Vec<LogRecord>> {
        let query = match window.bounds {
            Bounds::StartInclusive => {
                "SELECT logged_at, stress_level FROM stress_journal.stress_logs \
                 WHERE logged_at >= $1 AND logged_at < $2 \
                 ORDER BY logged_at"
            }
            Bounds::EndInclusive => {
                "SELECT logged_at, stress_level FROM stress_journal.stress_logs \
                 WHERE logged_at > $1 AND logged_at <= $2 \
                 ORDER BY logged_at"
            }
        };

        let rows = sqlx::query(query)
            .bind(window.start)
            .bind(window.end)
            .fetch_all(&self.pool)
            .await
            .with_context(|| format!("failed to fetch logs in {window}"))?;

        let mut logs = Vec::with_capacity(rows.len());
        for row in rows {
            let timestamp: NaiveDateTime = row.get("logged_at");
            let stress_level: f64 = row.get("stress_level");
            logs.push(LogRecord::new(timestamp, stress_level));
        }

        tracing::debug!("fetched {} logs in {}", logs.len(), window);
        Ok(logs)
    }

    async fn insert(&self, record: LogRecord) -> anyhow::Result<()> {
        insert_log(&self.pool, record, &format!("cli-{}", Uuid::new_v4())).await?;
        Ok(())
    }

    async fn fetch_daily_metrics(
        &self,
        from: NaiveDate,
        to: NaiveDate,
    ) -> anyhow::Result<Vec<DailyMetrics>> {
        let rows = sqlx::query(
            r#"
            SELECT log_date, sleep_hours, activity, school, note
            FROM stress_journal.daily_metrics
            WHERE log_date >= $1 AND log_date <= $2
            ORDER BY log_date
            "#,
        )
        .bind(from)
        .bind(to)
        .fetch_all(&self.pool)
        .await
        .context("failed to fetch daily metrics")?;

        let mut metrics = Vec::with_capacity(rows.len());
        for row in rows {
            metrics.push(DailyMetrics {
                date: row.get("log_date"),
                sleep_hours: row.get("sleep_hours"),
                activity: row.get("activity"),
                school: row.get("school"),
                note: row.get("note"),
            });
        }

        Ok(metrics)
    }

    async fn upsert_daily_metrics(&self, metrics: DailyMetrics) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            INSERT INTO stress_journal.daily_metrics
            (log_date, sleep_hours, activity, school, note)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (log_date) DO UPDATE
            SET sleep_hours = EXCLUDED.sleep_hours,
                activity = EXCLUDED.activity,
                school = EXCLUDED.school,
                note = EXCLUDED.note
            "#,
        )
        .bind(metrics.date)
        .bind(metrics.sleep_hours)
        .bind(metrics.activity)
        .bind(metrics.school)
        .bind(&metrics.note)
        .execute(&self.pool)
        .await
        .with_context(|| format!("failed to save daily metrics for {}", metrics.date))?;
        Ok(())
    }
}

pub async fn init_db(pool: &PgPool) -> anyhow::Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

/// Inserts one log unless `source_key` was already imported. Returns whether a row was written.
async fn insert_log(pool: &PgPool, record: LogRecord, source_key: &str) -> anyhow::Result<bool> {
    let result = sqlx::query(
        r#"
        INSERT INTO stress_journal.stress_logs (id, logged_at, stress_level, source_key)
        VALUES ($1, $2, $3, $4)
        ON CONFLICT (source_key) DO NOTHING
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(record.timestamp)
    .bind(record.stress_level)
    .bind(source_key)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

/// A week of realistic entries ending on `reference`, plus the week before it
/// so that trends have something to compare against.
pub fn seed_logs(reference: NaiveDate) -> Vec<(String, LogRecord)> {
    const PATTERN: [(u32, f64); 3] = [(8, 4.0), (13, 6.0), (21, 3.0)];

    let mut logs = Vec::new();
    for days_back in 0..14u64 {
        let Some(day) = reference.checked_sub_days(chrono::Days::new(days_back)) else {
            continue;
        };
        for (slot, (hour, base)) in PATTERN.iter().enumerate() {
            let Some(timestamp) = day.and_hms_opt(*hour, 0, 0) else {
                continue;
            };
            // school days run a little hotter than weekends
            let bump = if day.weekday().number_from_monday() <= 5 {
                1.0
            } else {
                -1.0
            };
            let level = (base + bump + (days_back % 3) as f64).clamp(0.0, 10.0);
            logs.push((
                format!("seed-{}-{slot}", day.format("%Y%m%d")),
                LogRecord::new(timestamp, level),
            ));
        }
    }
    logs
}

pub async fn seed(pool: &PgPool, reference: NaiveDate) -> anyhow::Result<usize> {
    let mut inserted = 0usize;
    for (source_key, record) in seed_logs(reference) {
        if insert_log(pool, record, &source_key).await? {
            inserted += 1;
        }
    }

    let metrics = [
        (0u64, 6.5, 4.0, 7.0, "Exam prep all afternoon"),
        (1, 7.5, 6.0, 5.0, "Went for a run"),
        (2, 5.0, 2.0, 8.0, "Late night project"),
    ];
    for (days_back, sleep_hours, activity, school, note) in metrics {
        let Some(date) = reference.checked_sub_days(chrono::Days::new(days_back)) else {
            continue;
        };
        sqlx::query(
            r#"
            INSERT INTO stress_journal.daily_metrics
            (log_date, sleep_hours, activity, school, note)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (log_date) DO NOTHING
            "#,
        )
        .bind(date)
        .bind(sleep_hours)
        .bind(activity)
        .bind(school)
        .bind(note)
        .execute(pool)
        .await?;
    }

    Ok(inserted)
}

pub async fn import_csv(pool: &PgPool, csv_path: &Path) -> anyhow::Result<usize> {
    let rows = read_log_csv(csv_path)?;
    let mut inserted = 0usize;

    for row in rows {
        let source_key = row
            .source_key
            .unwrap_or_else(|| format!("import-{}", Uuid::new_v4()));

        if insert_log(pool, row.record, &source_key).await? {
            inserted += 1;
        }
    }

    Ok(inserted)
}
