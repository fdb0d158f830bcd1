use anyhow::{Context, Result};
use chrono::Local;
use clap::{Args, Parser, Subcommand};
use pacer_core::{Limiter, LimiterSnapshot, LimitsFile, RateConfig};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(name = "pacerctl", version, about = "Drive and inspect pacer limiters")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Validate a limits file and list its limiters.
    Check {
        #[arg(long)]
        config: PathBuf,
    },
    /// Push a burst of concurrent admissions through a limiter.
    Burst {
        #[command(flatten)]
        limiter: LimiterArgs,

        #[arg(long, default_value_t = 10)]
        count: usize,

        #[arg(long, default_value_t = 1)]
        weight: u64,

        #[arg(long, default_value_t = 1)]
        rounds: usize,

        #[arg(long)]
        json: bool,
    },
}

#[derive(Args, Debug)]
struct LimiterArgs {
    #[arg(long)]
    config: Option<PathBuf>,

    #[arg(long, requires = "config")]
    name: Option<String>,

    #[arg(long, conflicts_with = "config")]
    interval_ms: Option<u64>,

    #[arg(long, conflicts_with = "config")]
    max_limit: Option<u32>,

    #[arg(long, conflicts_with = "config")]
    max_weight: Option<u64>,
}

impl LimiterArgs {
    fn resolve(&self) -> Result<RateConfig> {
        if let Some(path) = &self.config {
            let file = LimitsFile::load(path)?;
            let name = self.name.as_deref().context("--name is required with --config")?;
            return Ok(file.get(name)?.clone());
        }
        let interval_ms = self.interval_ms.context("--interval-ms is required")?;
        let max_limit = self.max_limit.context("--max-limit is required")?;
        let config = RateConfig {
            interval_ms,
            max_limit,
            max_weight: self.max_weight,
        };
        config.validate()?;
        Ok(config)
    }
}

#[derive(Debug, Serialize)]
struct AdmissionReport {
    index: usize,
    weight: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    wait_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

#[derive(Debug, Serialize)]
struct RoundReport {
    round: usize,
    admissions: Vec<AdmissionReport>,
    snapshot: LimiterSnapshot,
}

#[derive(Debug, Serialize)]
struct BurstReport {
    config: RateConfig,
    rounds: Vec<RoundReport>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Check { config } => check(&config),
        Commands::Burst {
            limiter,
            count,
            weight,
            rounds,
            json,
        } => {
            let config = limiter.resolve()?;
            let report = run_burst(config, count, weight, rounds, json).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            }
            Ok(())
        }
    }
}

fn check(path: &Path) -> Result<()> {
    let file = LimitsFile::load(path)?;
    if file.limiters.is_empty() {
        warn!(path = %path.display(), "no limiters defined");
    }
    for (name, config) in &file.limiters {
        match config.max_weight {
            Some(max_weight) => println!(
                "{name}: {} per {}ms, max weight {max_weight}",
                config.max_limit, config.interval_ms
            ),
            None => println!("{name}: {} per {}ms", config.max_limit, config.interval_ms),
        }
    }
    Ok(())
}

async fn run_burst(
    config: RateConfig,
    count: usize,
    weight: u64,
    rounds: usize,
    quiet: bool,
) -> Result<BurstReport> {
    let limiter = Arc::new(Limiter::new(config.clone())?);
    info!(
        interval_ms = config.interval_ms,
        max_limit = config.max_limit,
        count,
        rounds,
        "starting burst"
    );

    let mut report = BurstReport {
        config: config.clone(),
        rounds: Vec::with_capacity(rounds),
    };
    for round in 1..=rounds {
        if round > 1 {
            // Let the last window lapse so the next round starts fresh.
            tokio::time::sleep(Duration::from_millis(config.interval_ms + 1)).await;
        }
        let admissions = run_round(&limiter, count, weight, quiet).await?;
        report.rounds.push(RoundReport {
            round,
            admissions,
            snapshot: limiter.snapshot(),
        });
    }
    Ok(report)
}

async fn run_round(
    limiter: &Arc<Limiter>,
    count: usize,
    weight: u64,
    quiet: bool,
) -> Result<Vec<AdmissionReport>> {
    let handles = (0..count)
        .map(|index| {
            let limiter = limiter.clone();
            tokio::spawn(async move { (index, limiter.admit_weighted(weight).await) })
        })
        .collect::<Vec<_>>();

    let mut out = Vec::with_capacity(count);
    for handle in handles {
        let (index, result) = handle.await.context("admission task")?;
        let entry = match result {
            Ok(wait) => {
                let wait_ms = u64::try_from(wait.as_millis()).unwrap_or(u64::MAX);
                if !quiet {
                    println!("{} #{index} waited {wait_ms}ms", ts());
                }
                AdmissionReport {
                    index,
                    weight,
                    wait_ms: Some(wait_ms),
                    error: None,
                }
            }
            Err(err) => {
                if err.is_invariant_violation() {
                    warn!(index, %err, "limiter invariant violated");
                }
                if !quiet {
                    println!("{} #{index} rejected: {err}", ts());
                }
                AdmissionReport {
                    index,
                    weight,
                    wait_ms: None,
                    error: Some(err.to_string()),
                }
            }
        };
        out.push(entry);
    }
    Ok(out)
}

fn ts() -> String {
    Local::now().format("%H:%M:%S%.3f").to_string()
}
