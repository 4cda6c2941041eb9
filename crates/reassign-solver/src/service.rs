//! SolverService — the run pipeline.
//!
//! The service is the only component with side effects:
//! - Loads the model and baseline from disk
//! - Invokes the configured strategy exactly once
//! - Validates and prices the candidate
//! - Writes the chosen assignment (or nothing, in no-output mode)

use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{debug, info, warn};

use reassign_core::{Assignment, ProblemModel, RunMode, SolverConfig};
use reassign_eval::{CostBreakdown, evaluate, validate};

use crate::error::{SolverError, SolverResult};
use crate::strategy::{OptimizerStrategy, build_strategy};

/// Lifecycle of a single run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunState {
    Initialized,
    Optimizing,
    ValidatedOk,
    ValidatedFailed,
    Written,
    /// No-output mode: nothing was optimized or written.
    Skipped,
    Aborted,
}

impl RunState {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Written | Self::Skipped | Self::Aborted)
    }
}

/// Paths and settings for one run.
#[derive(Debug, Clone)]
pub struct ServiceInput {
    pub instance: PathBuf,
    pub baseline: PathBuf,
    pub output: PathBuf,
    pub config: SolverConfig,
}

/// Outcome of a successful run.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub state: RunState,
    pub strategy: &'static str,
    pub baseline_cost: CostBreakdown,
    /// Cost of the written assignment, `None` when nothing was written.
    pub cost: Option<CostBreakdown>,
    pub output: Option<PathBuf>,
}

pub struct SolverService {
    model: ProblemModel,
    strategy: Box<dyn OptimizerStrategy>,
    mode: RunMode,
    output: PathBuf,
    history: Vec<RunState>,
}

impl SolverService {
    /// Load the model and baseline named by `input`.
    ///
    /// The strategy comes from `input.config.search`.
    pub fn new(input: ServiceInput) -> SolverResult<Self> {
        let strategy = build_strategy(&input.config.search);
        Self::with_strategy(input, strategy)
    }

    /// Like [`SolverService::new`], with a caller-supplied strategy.
    pub fn with_strategy(
        input: ServiceInput,
        strategy: Box<dyn OptimizerStrategy>,
    ) -> SolverResult<Self> {
        let model = ProblemModel::load(&input.instance, &input.baseline)?;
        info!(
            processes = model.num_processes(),
            machines = model.num_machines(),
            resources = model.num_resources(),
            services = model.num_services(),
            "problem loaded"
        );
        Ok(Self::with_model(
            model,
            strategy,
            input.config.run.mode,
            input.output,
        ))
    }

    /// Build a service around an already-constructed model.
    pub fn with_model(
        model: ProblemModel,
        strategy: Box<dyn OptimizerStrategy>,
        mode: RunMode,
        output: impl Into<PathBuf>,
    ) -> Self {
        Self {
            model,
            strategy,
            mode,
            output: output.into(),
            history: vec![RunState::Initialized],
        }
    }

    pub fn model(&self) -> &ProblemModel {
        &self.model
    }

    pub fn state(&self) -> RunState {
        *self.history.last().unwrap_or(&RunState::Initialized)
    }

    /// Every state the run passed through, in order.
    pub fn history(&self) -> &[RunState] {
        &self.history
    }

    pub fn output(&self) -> &Path {
        &self.output
    }

    /// Drive the run to a terminal state. A service runs at most once.
    pub fn run(&mut self) -> SolverResult<RunReport> {
        if self.state() != RunState::Initialized {
            return Err(SolverError::AlreadyRun(self.state()));
        }

        let baseline = self.model.baseline();
        let baseline_cost = evaluate(&self.model, baseline, baseline);
        info!(cost = %baseline_cost, "baseline cost");

        match self.mode {
            RunMode::NoOutput => {
                debug!("no-output mode, skipping optimization");
                self.transition(RunState::Skipped);
                Ok(RunReport {
                    state: RunState::Skipped,
                    strategy: self.strategy.name(),
                    baseline_cost,
                    cost: None,
                    output: None,
                })
            }
            RunMode::Passthrough => {
                debug!("passthrough mode, writing baseline unchanged");
                let baseline = self.model.baseline().clone();
                self.write(&baseline, baseline_cost, baseline_cost)
            }
            RunMode::Optimize => self.optimize(baseline_cost),
        }
    }

    fn optimize(&mut self, baseline_cost: CostBreakdown) -> SolverResult<RunReport> {
        self.transition(RunState::Optimizing);
        info!(strategy = self.strategy.name(), "optimization started");

        let candidate = match self.strategy.optimize(&self.model, self.model.baseline()) {
            Ok(candidate) => candidate,
            Err(e) => {
                self.transition(RunState::Aborted);
                return Err(e.into());
            }
        };
        info!(strategy = self.strategy.name(), "optimization finished");

        let report = validate(&self.model, &candidate);
        if !report.is_valid() {
            self.transition(RunState::ValidatedFailed);
            warn!(violations = report.len(), "candidate rejected");
            self.transition(RunState::Aborted);
            return Err(SolverError::InvalidSolution(report));
        }
        self.transition(RunState::ValidatedOk);

        let cost = evaluate(&self.model, &candidate, self.model.baseline());
        info!(
            cost = %cost,
            improvement = baseline_cost.total() - cost.total(),
            moved = candidate.moved_processes(self.model.baseline()).count(),
            "candidate accepted"
        );
        self.write(&candidate, baseline_cost, cost)
    }

    fn write(
        &mut self,
        assignment: &Assignment,
        baseline_cost: CostBreakdown,
        cost: CostBreakdown,
    ) -> SolverResult<RunReport> {
        if let Err(e) = assignment.write(&self.output) {
            self.transition(RunState::Aborted);
            return Err(e.into());
        }
        self.transition(RunState::Written);
        info!(path = %self.output.display(), "solution written");

        Ok(RunReport {
            state: RunState::Written,
            strategy: self.strategy.name(),
            baseline_cost,
            cost: Some(cost),
            output: Some(self.output.clone()),
        })
    }

    fn transition(&mut self, next: RunState) {
        debug!(from = ?self.state(), to = ?next, "state transition");
        self.history.push(next);
    }
}
