//! Optimizer strategy seam.
//!
//! A strategy receives the immutable model and the baseline, and returns
//! one owned candidate. It may use threads internally, but nothing it
//! shares crosses the boundary.

use reassign_core::{Assignment, ProblemModel, SearchConfig, StrategyKind};

use crate::error::StrategyError;
use crate::local_search::LocalSearch;

pub trait OptimizerStrategy: Send + Sync {
    fn name(&self) -> &'static str;

    fn optimize(
        &self,
        model: &ProblemModel,
        baseline: &Assignment,
    ) -> Result<Assignment, StrategyError>;
}

/// Returns the baseline unchanged.
#[derive(Debug, Clone, Copy, Default)]
pub struct Identity;

impl OptimizerStrategy for Identity {
    fn name(&self) -> &'static str {
        "identity"
    }

    fn optimize(
        &self,
        _model: &ProblemModel,
        baseline: &Assignment,
    ) -> Result<Assignment, StrategyError> {
        Ok(baseline.clone())
    }
}

/// Build the strategy selected by `search`.
pub fn build_strategy(search: &SearchConfig) -> Box<dyn OptimizerStrategy> {
    match search.strategy {
        StrategyKind::Identity => Box::new(Identity),
        StrategyKind::LocalSearch => Box::new(LocalSearch::from_config(search)),
    }
}
