use std::path::PathBuf;

use anyhow::Context;
use chrono::{Local, NaiveDate, NaiveDateTime};
use clap::{Parser, Subcommand, ValueEnum};

use stress_journal::analysis;
use stress_journal::db::{self, PgLogStore};
use stress_journal::models::{DailyMetrics, Granularity, LogRecord};
use stress_journal::report;
use stress_journal::store::{self, LogStore, MemoryStore};

#[derive(Parser)]
#[command(name = "stress-journal")]
#[command(about = "Stress journal with day, week and month trends", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Postgres connection string
    #[arg(long, env = "DATABASE_URL", global = true, hide_env_values = true)]
    database_url: Option<String>,

    #[arg(long, default_value_t = 5, global = true)]
    max_connections: u32,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Clone, Copy, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Create or upgrade the database schema
    InitDb,
    /// Load two weeks of sample logs ending on the given date
    Seed {
        #[arg(long)]
        date: Option<NaiveDate>,
    },
    /// Import stress logs from a CSV file
    Import {
        #[arg(long)]
        csv: PathBuf,
    },
    /// Record a stress observation
    Log {
        #[arg(long, value_parser = parse_scale)]
        stress: f64,
        /// Observation time, defaults to now
        #[arg(long, value_parser = parse_timestamp)]
        at: Option<NaiveDateTime>,
    },
    /// Record sleep, activity and school load for a day
    Daily {
        #[arg(long)]
        date: Option<NaiveDate>,
        #[arg(long, value_parser = parse_sleep)]
        sleep: f64,
        #[arg(long, value_parser = parse_scale)]
        activity: f64,
        #[arg(long, value_parser = parse_scale)]
        school: f64,
        #[arg(long, default_value = "")]
        note: String,
    },
    /// Print average, trend and extremes for a period
    Summary {
        #[arg(long, value_enum, default_value_t = Granularity::Week)]
        granularity: Granularity,
        /// Reference day, defaults to today
        #[arg(long)]
        date: Option<NaiveDate>,
        #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
        /// Read logs from a CSV file instead of Postgres
        #[arg(long)]
        csv: Option<PathBuf>,
    },
    /// Generate a markdown report
    Report {
        #[arg(long, value_enum, default_value_t = Granularity::Week)]
        granularity: Granularity,
        #[arg(long)]
        date: Option<NaiveDate>,
        #[arg(long)]
        csv: Option<PathBuf>,
        #[arg(long, default_value = "report.md")]
        out: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let today = Local::now().date_naive();
    let connection = Connection {
        database_url: cli.database_url,
        max_connections: cli.max_connections,
    };

    match cli.command {
        Commands::InitDb => {
            let store = connection.postgres().await?;
            db::init_db(store.pool()).await?;
            println!("Schema ready.");
        }
        Commands::Seed { date } => {
            let store = connection.postgres().await?;
            let inserted = db::seed(store.pool(), date.unwrap_or(today)).await?;
            println!("Seed data inserted ({inserted} new logs).");
        }
        Commands::Import { csv } => {
            let store = connection.postgres().await?;
            let inserted = db::import_csv(store.pool(), &csv).await?;
            println!("Inserted {inserted} logs from {}.", csv.display());
        }
        Commands::Log { stress, at } => {
            let store = connection.postgres().await?;
            let timestamp = at.unwrap_or_else(|| Local::now().naive_local());
            store.insert(LogRecord::new(timestamp, stress)).await?;
            println!("Logged stress {stress:.0} at {}.", timestamp.format("%Y-%m-%d %H:%M"));
        }
        Commands::Daily {
            date,
            sleep,
            activity,
            school,
            note,
        } => {
            let store = connection.postgres().await?;
            let date = date.unwrap_or(today);
            store
                .upsert_daily_metrics(DailyMetrics {
                    date,
                    sleep_hours: sleep,
                    activity,
                    school,
                    note,
                })
                .await?;
            println!("Saved daily log for {date}.");
        }
        Commands::Summary {
            granularity,
            date,
            format,
            csv,
        } => {
            let store = connection.open(csv.as_deref()).await?;
            let analysis =
                analysis::analyze(store.as_ref(), date.unwrap_or(today), granularity).await?;
            match format {
                OutputFormat::Text => print!("{}", report::build_summary(&analysis)),
                OutputFormat::Json => println!("{}", report::to_json(&analysis)?),
            }
        }
        Commands::Report {
            granularity,
            date,
            csv,
            out,
        } => {
            let store = connection.open(csv.as_deref()).await?;
            let analysis =
                analysis::analyze(store.as_ref(), date.unwrap_or(today), granularity).await?;
            std::fs::write(&out, report::build_report(&analysis))
                .with_context(|| format!("failed to write {}", out.display()))?;
            println!("Report written to {}.", out.display());
        }
    }

    Ok(())
}

struct Connection {
    database_url: Option<String>,
    max_connections: u32,
}

impl Connection {
    async fn postgres(&self) -> anyhow::Result<PgLogStore> {
        let database_url = self
            .database_url
            .as_deref()
            .context("DATABASE_URL must be set to a Postgres instance")?;
        PgLogStore::connect(database_url, self.max_connections).await
    }

    /// A CSV file when given, Postgres otherwise.
    async fn open(&self, csv: Option<&std::path::Path>) -> anyhow::Result<Box<dyn LogStore>> {
        match csv {
            Some(path) => Ok(Box::new(MemoryStore::from_csv(path)?)),
            None => Ok(Box::new(self.postgres().await?)),
        }
    }
}

fn init_logging(verbose: bool) {
    use tracing_subscriber::EnvFilter;

    let filter = if verbose {
        EnvFilter::new("stress_journal=debug")
    } else {
        EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new("stress_journal=warn"))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn parse_timestamp(value: &str) -> Result<NaiveDateTime, String> {
    store::parse_timestamp(value).map_err(|err| err.to_string())
}

fn parse_scale(value: &str) -> Result<f64, String> {
    parse_bounded(value, 10.0)
}

fn parse_sleep(value: &str) -> Result<f64, String> {
    parse_bounded(value, 24.0)
}

fn parse_bounded(value: &str, max: f64) -> Result<f64, String> {
    let number: f64 = value
        .parse()
        .map_err(|_| format!("'{value}' is not a number"))?;
    if (0.0..=max).contains(&number) {
        Ok(number)
    } else {
        Err(format!("{number} is outside 0 to {max}"))
    }
}
