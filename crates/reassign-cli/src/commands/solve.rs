//! `reassign solve` — run the solver pipeline on one instance.

use std::path::PathBuf;

use anyhow::{Context, Result};
use tracing::info;

use reassign_core::{RunMode, SolverConfig, StrategyKind};
use reassign_solver::{ServiceInput, SolverError, SolverService};

/// Identifier printed by `--name`.
pub const SOLVER_NAME: &str = concat!("reassign ", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Default)]
pub struct SolveOptions {
    pub instance: Option<PathBuf>,
    pub baseline: Option<PathBuf>,
    pub output: Option<PathBuf>,
    pub time_limit: Option<u64>,
    pub seed: Option<u64>,
    pub config: Option<PathBuf>,
    pub strategy: Option<StrategyKind>,
    pub passthrough: bool,
    pub no_output: bool,
    pub name: bool,
}

pub fn solve(opts: SolveOptions) -> Result<()> {
    if opts.name {
        return Err(SolverError::Stop(SOLVER_NAME.to_string()).into());
    }

    let config = resolve_config(&opts)?;
    let instance = opts.instance.context("--instance is required")?;
    let baseline = opts.baseline.context("--baseline is required")?;
    // No-output mode never touches the destination.
    let output = opts.output.unwrap_or_default();

    info!(
        mode = ?config.run.mode,
        strategy = %config.search.strategy,
        time_limit_secs = config.search.time_limit_secs,
        "starting solve"
    );

    let mut service = SolverService::new(ServiceInput {
        instance,
        baseline,
        output,
        config,
    })?;
    let report = service.run()?;

    match (report.cost, &report.output) {
        (Some(cost), Some(path)) => {
            println!("✓ Wrote {}", path.display());
            println!("  baseline: {}", report.baseline_cost);
            println!("  solution: {cost}");
        }
        _ => println!("✓ Nothing written (no-output mode)"),
    }
    Ok(())
}

/// File settings first, then command-line overrides.
fn resolve_config(opts: &SolveOptions) -> Result<SolverConfig> {
    let mut config = match &opts.config {
        Some(path) => SolverConfig::from_file(path)?,
        None => SolverConfig::default(),
    };

    if let Some(secs) = opts.time_limit {
        config.search.time_limit_secs = secs;
    }
    if let Some(seed) = opts.seed {
        config.search.seed = seed;
    }
    if let Some(strategy) = opts.strategy {
        config.search.strategy = strategy;
    }
    if opts.passthrough {
        config.run.mode = RunMode::Passthrough;
    } else if opts.no_output {
        config.run.mode = RunMode::NoOutput;
    }

    if config.run.mode != RunMode::NoOutput && opts.output.is_none() {
        anyhow::bail!("--output is required unless running in no-output mode");
    }
    Ok(config)
}
