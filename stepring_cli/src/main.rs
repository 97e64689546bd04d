use chrono::{DateTime, Duration, FixedOffset, Local, Utc};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use stepring_core::*;

#[derive(Parser)]
#[command(name = "stepring")]
#[command(about = "Daily step ring and calorie estimate", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Override data directory
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Load configuration from this file instead of the default location
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Evaluate "today" as of this instant (RFC 3339) instead of the clock
    #[arg(long, global = true)]
    now: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Show today's steps, calories and target progress (default)
    Show {
        /// Daily target to measure against (must be a configured option)
        #[arg(long)]
        target: Option<u64>,
    },

    /// Record a step sample
    Record {
        /// Number of steps in the sample
        #[arg(long)]
        steps: u64,

        /// Sample start time (RFC 3339); defaults to `minutes` before now
        #[arg(long)]
        at: Option<String>,

        /// Sample duration in minutes
        #[arg(long, default_value_t = 1)]
        minutes: u32,
    },

    /// Print the calorie estimate for a step count
    Estimate {
        steps: u64,
    },

    /// List the daily target options
    Targets,

    /// Print per-day totals
    History {
        /// Number of days, including today
        #[arg(long, default_value_t = 7, value_parser = clap::value_parser!(u32).range(1..=i64::from(MAX_HISTORY_DAYS)))]
        days: u32,

        /// Also export the totals to this CSV file
        #[arg(long)]
        csv: Option<PathBuf>,
    },
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    stepring_core::logging::init();

    match run(Cli::parse()).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::debug!("Command failed: {:?}", e);
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };
    config.validate()?;
    let data_dir = cli
        .data_dir
        .clone()
        .unwrap_or_else(|| config.data.data_dir.clone());
    let now = match &cli.now {
        Some(raw) => parse_time("--now", raw)?,
        None => Local::now().fixed_offset(),
    };

    match cli.command {
        Some(Commands::Show { target }) => cmd_show(data_dir, target, now, &config).await,
        Some(Commands::Record {
            steps,
            at,
            minutes,
        }) => cmd_record(data_dir, steps, at, minutes, now, &config),
        Some(Commands::Estimate { steps }) => {
            cmd_estimate(steps);
            Ok(())
        }
        Some(Commands::Targets) => cmd_targets(&config),
        Some(Commands::History { days, csv }) => cmd_history(data_dir, days, csv, now, &config),
        None => {
            // Default to "show" command
            cmd_show(data_dir, None, now, &config).await
        }
    }
}

fn parse_time(flag: &str, raw: &str) -> Result<DateTime<FixedOffset>> {
    DateTime::parse_from_rfc3339(raw)
        .map_err(|e| Error::Other(format!("Invalid {} time {:?}: {}", flag, raw, e)))
}

async fn cmd_show(
    data_dir: PathBuf,
    target: Option<u64>,
    now: DateTime<FixedOffset>,
    config: &Config,
) -> Result<()> {
    let store = JsonlHealthStore::from_config(config, Some(&data_dir));
    let mut controller = DashboardController::new(
        Arc::new(store),
        config.targets.to_options()?,
        config.health.query_timeout(),
    );

    if let Some(target) = target {
        controller.select_target(DailyTarget(target))?;
    }

    let activation = controller.activate(now).await;
    if let Ok(AuthorizationOutcome::Denied) | Err(_) = activation.authorization {
        eprintln!("Health data access not granted; step count may be incomplete.");
    }

    println!("{}", controller.view());
    Ok(())
}

fn cmd_record(
    data_dir: PathBuf,
    steps: u64,
    at: Option<String>,
    minutes: u32,
    now: DateTime<FixedOffset>,
    config: &Config,
) -> Result<()> {
    let duration = Duration::minutes(i64::from(minutes));
    let start = match at {
        Some(raw) => parse_time("--at", &raw)?.with_timezone(&Utc),
        None => now.with_timezone(&Utc) - duration,
    };

    let store = JsonlHealthStore::from_config(config, Some(&data_dir));
    let sample = StepSample::new(start, start + duration, steps).with_source("stepring-cli");
    store.append(&sample)?;
    tracing::info!(
        "Recorded sample {} ({} steps from {}) in {:?}",
        sample.id,
        steps,
        start,
        store.samples_path()
    );

    println!("✓ Recorded {} steps at {}", steps, start.with_timezone(&Local).to_rfc3339());
    Ok(())
}

fn cmd_estimate(steps: u64) {
    println!("{}", estimate_calories(StepCount(steps)));
}

fn cmd_targets(config: &Config) -> Result<()> {
    let targets = config.targets.to_options()?;
    for target in targets.options() {
        if *target == targets.default_target() {
            println!("{} (default)", target);
        } else {
            println!("{}", target);
        }
    }
    Ok(())
}

fn cmd_history(
    data_dir: PathBuf,
    days: u32,
    csv: Option<PathBuf>,
    now: DateTime<FixedOffset>,
    config: &Config,
) -> Result<()> {
    let store = JsonlHealthStore::from_config(config, Some(&data_dir));
    let samples = store.read_samples()?;
    let summaries = daily_summaries(&samples, days, now);
    tracing::debug!(
        "Summarized {} samples into {} days",
        samples.len(),
        summaries.len()
    );

    for summary in &summaries {
        println!("{}  {:>7} steps  {}", summary.date, summary.steps, summary.calories);
    }

    if let Some(path) = csv {
        let count = export_csv(&summaries, &path)?;
        println!("✓ Exported {} days to {}", count, path.display());
    }

    Ok(())
}
