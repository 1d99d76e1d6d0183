//! Tool Wear Replay
//!
//! Drives the milling tool environment through a recorded PHM dataset or a
//! synthetic wear profile with a fixed baseline policy, printing an
//! episode summary and optionally streaming per-step telemetry.
//!
//! # Usage
//! ```bash
//! ./tool-wear-replay --data phm_c1.csv --episodes 5 --policy expert
//! ./tool-wear-replay --synthetic 2000 --seed 7 --telemetry steps.jsonl
//! ```

use anyhow::{bail, Context, Result};
use clap::{Parser, ValueEnum};
use std::fs::File;
use std::io::BufWriter;
use std::path::PathBuf;
use tracing::info;

use milling_tool_env::{
    Action, EnvConfig, Environment, JsonLinesTelemetry, MillingToolEnv, PhmDataset, RenderMode,
    StepTag, SyntheticWearProfile, TelemetryEntry, TelemetrySink, ToolWearSource,
};

// ============================================================================
// CLI Arguments
// ============================================================================

#[derive(Parser, Debug)]
#[command(name = "tool-wear-replay")]
#[command(about = "Replay milling tool wear data through the maintenance environment")]
#[command(version)]
struct Args {
    /// PHM CSV file with force/vibration, tool_wear, ACTION_CODE and RUL columns
    #[arg(long, conflicts_with = "synthetic")]
    data: Option<PathBuf>,

    /// Generate a synthetic wear profile with this many records instead
    #[arg(long)]
    synthetic: Option<usize>,

    /// Environment config TOML (default: MILLING_ENV_CONFIG, ./milling_env.toml, built-ins)
    #[arg(long, env = "MILLING_ENV_CONFIG")]
    config: Option<PathBuf>,

    /// Override the RUL termination threshold
    #[arg(long)]
    rul_threshold: Option<f64>,

    /// Number of episodes to run
    #[arg(short, long, default_value = "1")]
    episodes: u32,

    /// Seed for episode starts and synthetic data
    #[arg(long)]
    seed: Option<u64>,

    /// Baseline policy driving the environment
    #[arg(long, value_enum, default_value = "expert")]
    policy: Policy,

    /// Write one JSON object per step to this file
    #[arg(long)]
    telemetry: Option<PathBuf>,

    /// Print a line per step
    #[arg(long)]
    render: bool,

    /// Emit logs as JSON objects
    #[arg(long)]
    log_json: bool,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Policy {
    /// Follow the dataset's ACTION_CODE
    Expert,
    /// Never replace
    Continue,
}

// ============================================================================
// Episode Summary
// ============================================================================

#[derive(Debug, Default)]
struct EpisodeSummary {
    start: usize,
    steps: usize,
    total_reward: f64,
    replacements: u64,
    end: Option<StepTag>,
}

/// Counts steps per episode while forwarding to an optional JSON stream.
struct ReplaySink {
    stream: Option<JsonLinesTelemetry<BufWriter<File>>>,
    steps: usize,
}

impl TelemetrySink for ReplaySink {
    fn record(&mut self, entry: &TelemetryEntry) {
        self.steps += 1;
        if let Some(stream) = self.stream.as_mut() {
            stream.record(entry);
        }
    }

    fn reset(&mut self) {
        self.steps = 0;
    }

    fn flush(&mut self) -> Result<(), milling_tool_env::TelemetryError> {
        match self.stream.as_mut() {
            Some(stream) => stream.flush(),
            None => Ok(()),
        }
    }
}

fn load_source(args: &Args) -> Result<Box<dyn ToolWearSource>> {
    match (&args.data, args.synthetic) {
        (Some(path), _) => {
            let dataset = PhmDataset::load(path)
                .with_context(|| format!("loading dataset {}", path.display()))?;
            Ok(Box::new(dataset))
        }
        (None, Some(records)) => {
            let profile = SyntheticWearProfile {
                seed: args.seed,
                ..SyntheticWearProfile::with_records(records)
            };
            Ok(Box::new(profile.build().context("generating synthetic profile")?))
        }
        (None, None) => bail!("one of --data or --synthetic is required"),
    }
}

fn load_config(args: &Args) -> Result<EnvConfig> {
    let mut config = match &args.config {
        Some(path) => EnvConfig::load_from_file(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => EnvConfig::load(),
    };
    if let Some(threshold) = args.rul_threshold {
        config.environment.rul_threshold = threshold;
    }
    if args.seed.is_some() {
        config.environment.seed = args.seed;
    }
    if args.render {
        config.render.mode = RenderMode::Human;
    }
    Ok(config)
}

fn run_episode(
    env: &mut MillingToolEnv<ReplaySink>,
    policy: Policy,
) -> Result<EpisodeSummary> {
    env.telemetry_mut().reset();
    Environment::reset(env, None, None)?;

    let mut summary = EpisodeSummary {
        start: env.current_time_step(),
        ..EpisodeSummary::default()
    };
    let replacements_before = env.replacement_events();

    loop {
        let action = match policy {
            Policy::Continue => Action::Continue,
            Policy::Expert => {
                let t = env.current_time_step();
                if t < env.records() {
                    // unknown codes from the data fall back to continue
                    Action::try_from(env.read_auxiliary(t)?.recommended_action)
                        .unwrap_or(Action::Continue)
                } else {
                    Action::Continue
                }
            }
        };

        let step = env.step(action)?;
        summary.total_reward += step.reward;
        if step.done() {
            summary.end = Some(step.info.tag);
            break;
        }
    }

    summary.steps = env.telemetry().steps;
    summary.replacements = env.replacement_events() - replacements_before;
    Ok(summary)
}

// ============================================================================
// Main Entry Point
// ============================================================================

fn main() -> Result<()> {
    let args = Args::parse();

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    if args.log_json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_target(false)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .init();
    }

    let config = load_config(&args)?;
    let source = load_source(&args)?;

    let stream = match &args.telemetry {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("creating telemetry file {}", path.display()))?;
            Some(JsonLinesTelemetry::new(BufWriter::new(file)))
        }
        None => None,
    };

    let mut env = MillingToolEnv::with_telemetry(config, ReplaySink { stream, steps: 0 })
        .context("invalid environment config")?;
    let records = env.attach(source);
    info!(records, episodes = args.episodes, policy = ?args.policy, "Starting replay");

    let mut rewards = Vec::with_capacity(args.episodes as usize);
    for episode in 1..=args.episodes {
        let summary = run_episode(&mut env, args.policy)?;
        println!(
            "episode {:>3} | start {:>6} | steps {:>6} | replacements {:>3} | reward {:>12.3} | end: {}",
            episode,
            summary.start,
            summary.steps,
            summary.replacements,
            summary.total_reward,
            summary.end.map_or("-", StepTag::as_str),
        );
        rewards.push(summary.total_reward);
    }

    env.telemetry_mut().flush().context("flushing telemetry")?;

    if !rewards.is_empty() {
        let mean = rewards.iter().sum::<f64>() / rewards.len() as f64;
        info!(mean_reward = mean, "Replay complete");
    }
    Ok(())
}
