//! main.rs — Shot localization simulator entry point
//!
//! Two modes:
//!   1. Trials (default): draw seeded synthetic shots around a microphone array,
//!      push them through the capture impairments and the solver, and write one
//!      JSON report line per trial plus a run summary
//!   2. Replay (`--replay <file>`): solve a single recorded capture
//!
//! Solver failures are data: a non-converged trial is reported, never fatal.

mod acoustics;
mod layout;
mod replay;
mod report;
mod scenarios;

use anyhow::{bail, Context, Result};
use clap::Parser;
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::Deserialize;
use shot_locator::{locate, SolverConfig};
use tracing::{info, warn};

use acoustics::AcousticConfig;
use layout::ArrayLayout;
use report::{ReportSink, Summary, TrialReport};
use scenarios::ScenarioConfig;

// ── CLI ───────────────────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(name = "shot-sim", about = "Acoustic shot localization simulator")]
struct Args {
    /// Config file path
    #[arg(short, long, default_value = "config.toml")]
    config: String,
    /// Number of synthetic shots (overrides [trials].count)
    #[arg(short = 'n', long)]
    trials: Option<usize>,
    /// RNG seed (overrides [trials].seed)
    #[arg(long)]
    seed: Option<u64>,
    /// Scenario preset: clean, jitter, echo, field, hot_day
    #[arg(long)]
    preset: Option<String>,
    /// Write JSON-lines reports here instead of stdout
    #[arg(short, long)]
    output: Option<String>,
    /// Solve one recorded capture file and exit
    #[arg(long)]
    replay: Option<String>,
}

// ── Config structs ────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct FullConfig {
    /// Falls back to `SolverConfig::from_env()` when the table is absent
    solver: Option<SolverConfig>,
    #[serde(default)]
    array: ArrayLayout,
    #[serde(default)]
    acoustics: AcousticConfig,
    #[serde(default)]
    trials: TrialsConfig,
    #[serde(default)]
    scenario: ScenarioConfig,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct TrialsConfig {
    count: usize,
    seed: Option<u64>,
}

impl Default for TrialsConfig {
    fn default() -> Self {
        Self { count: 100, seed: None }
    }
}

const BUNDLED_CONFIG: &str = include_str!("../config.toml");

fn load_config(path: &str) -> Result<FullConfig> {
    let raw = match std::fs::read_to_string(path) {
        Ok(s) => s,
        Err(e) => {
            info!("config {path} not readable ({e}); using bundled defaults");
            BUNDLED_CONFIG.to_string()
        }
    };
    toml::from_str(&raw).with_context(|| format!("invalid config {path}"))
}

// ── Main ──────────────────────────────────────────────────────────────────────

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "shot_simulator=info,shot_locator=info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let cfg = load_config(&args.config)?;

    let solver_cfg = cfg.solver.clone().unwrap_or_else(SolverConfig::from_env);
    solver_cfg.validate().context("invalid [solver] config")?;

    if let Some(path) = &args.replay {
        let capture = replay::load_capture(path)?;
        let report = replay::replay(&capture, &solver_cfg)?;
        let mut sink = open_sink(args.output.as_deref())?;
        sink.emit(&report);
        sink.flush();
        return Ok(());
    }

    let scenario = match args.preset.as_deref() {
        Some(name) => match scenarios::preset(name) {
            Some(sc) => sc,
            None => bail!("unknown preset '{name}' (clean, jitter, echo, field, hot_day)"),
        },
        None => cfg.scenario.clone(),
    };

    run_trials(&args, &cfg, &solver_cfg, &scenario)
}

fn open_sink(output: Option<&str>) -> Result<ReportSink> {
    match output {
        Some(path) => ReportSink::file(path).with_context(|| format!("opening report file {path}")),
        None => Ok(ReportSink::stdout()),
    }
}

// ── Trial loop ────────────────────────────────────────────────────────────────

fn run_trials(
    args: &Args,
    cfg: &FullConfig,
    solver_cfg: &SolverConfig,
    scenario: &ScenarioConfig,
) -> Result<()> {
    let array = cfg.array.build();
    if array.is_empty() {
        bail!("[array] produced no microphones");
    }
    scenario.validate(array.len()).context("invalid [scenario] config")?;
    if cfg.array.is_planar() && cfg.acoustics.source_height_m != 0.0 {
        warn!("planar array cannot resolve source height; expect height errors");
    }

    let trials = args.trials.unwrap_or(cfg.trials.count);
    let seed = args.seed.or(cfg.trials.seed);
    let mut rng = match seed {
        Some(s) => StdRng::seed_from_u64(s),
        None => StdRng::from_entropy(),
    };

    info!(
        "🎯 shot-sim starting — {} mics, {} trials, seed {:?}, scenarios {:?}",
        array.len(), trials, seed, scenario.active
    );

    let mut sink = open_sink(args.output.as_deref())?;
    let mut reports = Vec::with_capacity(trials);

    for trial in 0..trials {
        let event = acoustics::generate_event(&array, &cfg.acoustics, scenario, &mut rng)
            .context("scenario noise distribution rejected")?;
        let result = locate(&array, &event.times, solver_cfg);
        let report = TrialReport::new(trial, event.truth, &result);
        sink.emit(&report);
        reports.push(report);

        if (trial + 1) % 20 == 0 {
            let s = Summary::from_reports(&reports);
            info!("⏱ {}/{} trials | converged {:.0}%", trial + 1, trials, 100.0 * s.convergence_rate());
        }
    }
    sink.flush();

    let summary = Summary::from_reports(&reports);
    info!(
        "✅ done — converged {}/{} | median error {} | mean iterations {} | worst azimuth {}",
        summary.converged,
        summary.trials,
        fmt_opt(summary.median_position_error_m, "m"),
        fmt_opt(summary.mean_iterations, ""),
        fmt_opt(summary.max_azimuth_error_rad.map(f64::to_degrees), "°"),
    );
    if summary.not_converged > 0 {
        warn!("{} trials did not converge", summary.not_converged);
    }
    Ok(())
}

fn fmt_opt(v: Option<f64>, unit: &str) -> String {
    match v {
        Some(x) => format!("{x:.4}{unit}"),
        None => "n/a".to_string(),
    }
}
