use std::path::Path;
use std::sync::Mutex;

use anyhow::{anyhow, Context};
use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime};

use crate::models::{DailyMetrics, LogRecord};
use crate::window::Window;

const TIMESTAMP_FORMATS: [&str; 4] = [
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];

/// Where stress observations and daily metrics live. Range fetches may
/// return records in any order.
#[async_trait]
pub trait LogStore: Send + Sync {
    async fn fetch_in_range(&self, window: &Window) -> anyhow::Result<Vec<LogRecord>>;

    async fn insert(&self, record: LogRecord) -> anyhow::Result<()>;

    /// Daily metrics with `from <= date <= to`.
    async fn fetch_daily_metrics(
        &self,
        from: NaiveDate,
        to: NaiveDate,
    ) -> anyhow::Result<Vec<DailyMetrics>>;

    async fn upsert_daily_metrics(&self, metrics: DailyMetrics) -> anyhow::Result<()>;
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    logs: Mutex<Vec<LogRecord>>,
    metrics: Mutex<Vec<DailyMetrics>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_logs(logs: Vec<LogRecord>) -> Self {
        Self {
            logs: Mutex::new(logs),
            metrics: Mutex::new(Vec::new()),
        }
    }

    pub fn from_csv(path: &Path) -> anyhow::Result<Self> {
        let rows = read_log_csv(path)?;
        tracing::debug!("loaded {} logs from {}", rows.len(), path.display());
        Ok(Self::with_logs(rows.into_iter().map(|row| row.record).collect()))
    }

    pub fn len(&self) -> usize {
        self.logs.lock().map(|logs| logs.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl LogStore for MemoryStore {
    async fn fetch_in_range(&self, window: &Window) -> anyhow::Result<Vec<LogRecord>> {
        let logs = self
            .logs
            .lock()
            .map_err(|_| anyhow!("log store lock poisoned"))?;
        Ok(logs
            .iter()
            .filter(|record| window.contains(record.timestamp))
            .copied()
            .collect())
    }

    async fn insert(&self, record: LogRecord) -> anyhow::Result<()> {
        self.logs
            .lock()
            .map_err(|_| anyhow!("log store lock poisoned"))?
            .push(record);
        Ok(())
    }

    async fn fetch_daily_metrics(
        &self,
        from: NaiveDate,
        to: NaiveDate,
    ) -> anyhow::Result<Vec<DailyMetrics>> {
        let metrics = self
            .metrics
            .lock()
            .map_err(|_| anyhow!("metrics store lock poisoned"))?;
        let mut found: Vec<DailyMetrics> = metrics
            .iter()
            .filter(|entry| from <= entry.date && entry.date <= to)
            .cloned()
            .collect();
        found.sort_by(|a, b| a.date.cmp(&b.date));
        Ok(found)
    }

    async fn upsert_daily_metrics(&self, entry: DailyMetrics) -> anyhow::Result<()> {
        let mut metrics = self
            .metrics
            .lock()
            .map_err(|_| anyhow!("metrics store lock poisoned"))?;
        match metrics.iter_mut().find(|existing| existing.date == entry.date) {
            Some(existing) => *existing = entry,
            None => metrics.push(entry),
        }
        Ok(())
    }
}

/// One row of a stress log CSV export.
#[derive(Debug, Clone)]
pub struct ImportedLog {
    pub record: LogRecord,
    pub source_key: Option<String>,
}

/// Reads `timestamp,stress_level[,source_key]` rows.
pub fn read_log_csv(path: &Path) -> anyhow::Result<Vec<ImportedLog>> {
    #[derive(serde::Deserialize)]
    struct CsvRow {
        timestamp: String,
        stress_level: f64,
        #[serde(default)]
        source_key: Option<String>,
    }

    let mut reader = csv::Reader::from_path(path)
        .with_context(|| format!("failed to open {}", path.display()))?;
    let mut rows = Vec::new();

    for (line, result) in reader.deserialize::<CsvRow>().enumerate() {
        let row = result.with_context(|| format!("invalid CSV row {}", line + 1))?;
        let timestamp = parse_timestamp(&row.timestamp)
            .with_context(|| format!("invalid timestamp on CSV row {}", line + 1))?;
        rows.push(ImportedLog {
            record: LogRecord::new(timestamp, row.stress_level),
            source_key: row.source_key.filter(|key| !key.is_empty()),
        });
    }

    Ok(rows)
}

pub fn parse_timestamp(value: &str) -> anyhow::Result<NaiveDateTime> {
    let value = value.trim();
    TIMESTAMP_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(value, format).ok())
        .ok_or_else(|| anyhow!("unrecognised timestamp '{value}'"))
}
