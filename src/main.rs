use std::path::{Path, PathBuf};

use anyhow::Context;
use chrono::{Local, NaiveDateTime};
use clap::{ArgGroup, Parser, Subcommand};
use pet_feeder_analytics::{
    aggregate::aggregate,
    config::{log_json_from_env, Config},
    db::{self, PgStore},
    models::AggregationResult,
    report,
    snapshot,
    sync::{DashboardView, PublishDailyAverage},
    timestamp::FeedTimestamp,
    watch::{self, REFRESH_FLAG},
};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

#[derive(Parser)]
#[command(name = "feeder-analytics")]
#[command(about = "Feeding history analytics for the pet feeder", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Aggregate a database export without touching Postgres
    Analyze {
        #[arg(long)]
        export: PathBuf,
        /// Treat this moment as now, formatted MM/DD/YYYY - HH:MM
        #[arg(long)]
        now: Option<FeedTimestamp>,
        #[arg(long)]
        json: bool,
    },
    /// Create or upgrade the database schema
    InitDb,
    /// Load two weeks of sample feedings
    Seed,
    /// Import feedings from a database export or a CSV file
    #[command(group(
        ArgGroup::new("source")
            .args(["json", "csv"])
            .required(true)
            .multiple(false)
    ))]
    Import {
        #[arg(long)]
        json: Option<PathBuf>,
        #[arg(long)]
        csv: Option<PathBuf>,
    },
    /// Print today's feedings and weekly averages
    Summary {
        #[arg(long)]
        now: Option<FeedTimestamp>,
        #[arg(long)]
        json: bool,
        /// Write the daily average back to the shared store
        #[arg(long)]
        publish: bool,
    },
    /// Generate a markdown report
    Report {
        #[arg(long)]
        now: Option<FeedTimestamp>,
        #[arg(long, default_value = "report.md")]
        out: PathBuf,
    },
    /// Set a remote command flag
    SetCommand { name: String, value: String },
    /// Recompute and publish whenever the refresh flag changes
    Watch {
        #[arg(long)]
        interval_secs: Option<u64>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    dotenvy::dotenv().ok();
    init_logging(log_json_from_env());

    match cli.command {
        Commands::Analyze { export, now, json } => {
            let result = analyze_export(&export, now)?;
            print_result(&result, json)
        }
        command => run_with_database(command, &Config::from_env()?).await,
    }
}

fn analyze_export(export: &Path, now: Option<FeedTimestamp>) -> anyhow::Result<AggregationResult> {
    let events = snapshot::read_export(export)?;
    Ok(aggregate(&events, resolve_now(now)))
}

async fn run_with_database(command: Commands, config: &Config) -> anyhow::Result<()> {
    match command {
        Commands::Analyze { .. } => anyhow::bail!("analyze does not use the database"),
        Commands::InitDb => {
            let pool = connect(config).await?;
            db::init_db(&pool).await?;
            println!("Schema ready.");
        }
        Commands::Seed => {
            let pool = connect(config).await?;
            let inserted = db::seed(&pool, resolve_now(None)).await?;
            println!("Seeded {inserted} feedings.");
        }
        Commands::Import { json, csv } => {
            let (events, source) = match (json, csv) {
                (Some(path), _) => (snapshot::read_export(&path)?, path),
                (None, Some(path)) => (snapshot::read_csv(&path)?, path),
                (None, None) => anyhow::bail!("either --json or --csv is required"),
            };
            let pool = connect(config).await?;
            let inserted = db::import_events(&pool, &events).await?;
            println!(
                "Imported {} feedings ({inserted} new) from {}.",
                events.len(),
                source.display()
            );
        }
        Commands::Summary { now, json, publish } => {
            let pool = connect(config).await?;
            let now = resolve_now(now);
            let events = db::fetch_events(&pool).await?;
            let result = aggregate(&events, now);
            print_result(&result, json)?;

            if publish {
                let store = PgStore::new(pool);
                let mut view = DashboardView::default();
                let attempts = PublishDailyAverage::from_result(now.date(), &result)
                    .execute(&mut view, &store, config.retry_policy())
                    .await?;
                info!(attempts, average = view.daily_average, "daily average published");
            }
        }
        Commands::Report { now, out } => {
            let pool = connect(config).await?;
            let now = resolve_now(now);
            let events = db::fetch_events(&pool).await?;
            let report = report::build_report(&aggregate(&events, now), now);
            std::fs::write(&out, report)
                .with_context(|| format!("failed to write {}", out.display()))?;
            println!("Report written to {}.", out.display());
        }
        Commands::SetCommand { name, value } => {
            let pool = connect(config).await?;
            db::set_command(&pool, &name, &value).await?;
            println!("Set {name} = {value}.");
        }
        Commands::Watch { interval_secs } => {
            let pool = connect(config).await?;
            let period = interval_secs
                .map(std::time::Duration::from_secs)
                .unwrap_or(config.watch_interval);
            let policy = config.retry_policy();
            let store = PgStore::new(pool.clone());
            let view = std::cell::RefCell::new(DashboardView::default());
            info!(flag = REFRESH_FLAG, ?period, "watching refresh flag");

            watch::watch_flag(
                period,
                false,
                || {
                    let pool = pool.clone();
                    async move { db::read_command(&pool, REFRESH_FLAG).await }
                },
                |value| {
                    let pool = pool.clone();
                    let store = store.clone();
                    let view = &view;
                    async move {
                        info!(value = %value, "refresh flag changed");
                        let now = resolve_now(None);
                        let events = db::fetch_events(&pool).await?;
                        let result = aggregate(&events, now);
                        let command = PublishDailyAverage::from_result(now.date(), &result);
                        let mut local = view.borrow().clone();
                        let outcome = command.execute(&mut local, &store, policy).await;
                        info!(
                            day = ?local.day,
                            average = local.daily_average,
                            feedings_today = local.feedings_today,
                            persisted = outcome.is_ok(),
                            "dashboard updated"
                        );
                        *view.borrow_mut() = local;
                        outcome?;
                        Ok::<(), anyhow::Error>(())
                    }
                },
            )
            .await;
        }
    }

    Ok(())
}

fn resolve_now(now: Option<FeedTimestamp>) -> NaiveDateTime {
    now.map(|ts| ts.as_naive())
        .unwrap_or_else(|| Local::now().naive_local())
}

async fn connect(config: &Config) -> anyhow::Result<PgPool> {
    PgPoolOptions::new()
        .max_connections(5)
        .connect(config.database_url()?)
        .await
        .context("failed to connect to Postgres")
}

fn print_result(result: &AggregationResult, json: bool) -> anyhow::Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(result)?);
        return Ok(());
    }

    println!("Average fed per day: {:.2}gr", result.daily_average);
    if result.today_events.is_empty() {
        println!("You haven't fed your pet today.");
    } else {
        for event in result.today_events.iter() {
            println!("- {}: {}gr", event.timestamp, event.grams);
        }
    }

    println!();
    println!("Weekly averages:");
    if result.weekly_averages.is_empty() {
        println!("No feedings recorded yet.");
    } else {
        for week in result.weekly_averages.iter() {
            println!(
                "- {} ({} - {}): {:.2}gr across {} feedings",
                week.week, week.start_date, week.end_date, week.average, week.count
            );
        }
    }

    if !result.rejected.is_empty() {
        println!();
        println!("Skipped {} record(s) with unreadable timestamps.", result.rejected.len());
    }

    Ok(())
}

/// Logs go to stderr so `--json` output stays machine readable.
fn init_logging(json: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("pet_feeder_analytics=info,feeder_analytics=info,warn"));

    let format = if json {
        tracing_subscriber::fmt::layer()
            .json()
            .with_target(false)
            .with_writer(std::io::stderr)
            .boxed()
    } else {
        tracing_subscriber::fmt::layer()
            .with_target(false)
            .with_writer(std::io::stderr)
            .boxed()
    };

    tracing_subscriber::registry().with(filter).with(format).init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn analyze_parses_without_database_arguments() {
        let cli = Cli::try_parse_from([
            "feeder-analytics",
            "analyze",
            "--export",
            "dump.json",
            "--now",
            "01/05/2024 - 23:59",
        ])
        .unwrap();
        match cli.command {
            Commands::Analyze { export, now, json } => {
                assert_eq!(export, PathBuf::from("dump.json"));
                assert_eq!(now.unwrap().to_string(), "01/05/2024 - 23:59");
                assert!(!json);
            }
            _ => panic!("expected analyze"),
        }
    }

    #[test]
    fn analyze_ignores_malformed_database_settings() {
        std::env::set_var("FEEDER_PUBLISH_ATTEMPTS", "several");
        assert!(Config::from_env().is_err());

        let path = std::env::temp_dir().join(format!("feeder-{}.json", uuid::Uuid::new_v4()));
        std::fs::write(
            &path,
            r#"{"feedingData": {"dailyGrams": {
                "-Na": {"feedTimeId": "a", "date": "01/05/2024 - 08:00", "value": 100},
                "-Nb": {"feedTimeId": "b", "date": "01/05/2024 - 18:00", "value": 50}
            }}}"#,
        )
        .unwrap();
        let now = FeedTimestamp::parse("01/05/2024 - 23:59").unwrap();
        let result = analyze_export(&path, Some(now));
        std::fs::remove_file(&path).ok();
        std::env::remove_var("FEEDER_PUBLISH_ATTEMPTS");

        let result = result.unwrap();
        assert_eq!(result.daily_average, 75.0);
        assert_eq!(result.today_events.len(), 2);
    }
}
