//! Solver error types.

use thiserror::Error;

use reassign_core::CoreError;
use reassign_eval::ValidationReport;

use crate::service::RunState;

/// Errors raised by an optimizer strategy.
#[derive(Debug, Error)]
pub enum StrategyError {
    #[error("strategy {strategy} failed: {reason}")]
    Failed {
        strategy: &'static str,
        reason: String,
    },
}

/// Errors that can end a solver run.
#[derive(Debug, Error)]
pub enum SolverError {
    /// Unreadable/unwritable files and malformed descriptions.
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error(transparent)]
    Strategy(#[from] StrategyError),

    /// The run completed but produced an infeasible assignment.
    #[error("the produced solution is not valid: {0}")]
    InvalidSolution(ValidationReport),

    #[error("solver already ran (state {0:?})")]
    AlreadyRun(RunState),

    /// Early, successful termination (e.g. an informational request).
    #[error("{0}")]
    Stop(String),
}

impl SolverError {
    /// Benign stops must not be reported as failures.
    pub fn is_benign(&self) -> bool {
        matches!(self, SolverError::Stop(_))
    }
}

pub type SolverResult<T> = Result<T, SolverError>;
