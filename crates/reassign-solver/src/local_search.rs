//! Feasible single-move descent.
//!
//! Scans processes in a seed-dependent rotation. For each process, every
//! target machine is priced with the incremental state; the best strictly
//! improving feasible move is applied. Passes repeat until one pass makes
//! no move or the iteration/wall-clock budget runs out.

use std::time::{Duration, Instant};

use tracing::{debug, info};

use reassign_core::{Assignment, MachineId, ProblemModel, SearchConfig};
use reassign_eval::SearchState;

use crate::error::StrategyError;
use crate::strategy::OptimizerStrategy;

#[derive(Debug, Clone)]
pub struct LocalSearch {
    max_iterations: u64,
    time_limit: Duration,
    seed: u64,
}

impl LocalSearch {
    pub fn new(max_iterations: u64, time_limit: Duration, seed: u64) -> Self {
        Self {
            max_iterations,
            time_limit,
            seed,
        }
    }

    pub fn from_config(search: &SearchConfig) -> Self {
        Self::new(search.max_iterations, search.time_limit(), search.seed)
    }
}

impl OptimizerStrategy for LocalSearch {
    fn name(&self) -> &'static str {
        "local-search"
    }

    fn optimize(
        &self,
        model: &ProblemModel,
        baseline: &Assignment,
    ) -> Result<Assignment, StrategyError> {
        if baseline.num_processes() != model.num_processes()
            || baseline.num_machines() != model.num_machines()
        {
            return Err(StrategyError::Failed {
                strategy: self.name(),
                reason: "starting assignment does not match the model".to_string(),
            });
        }

        let started = Instant::now();
        let mut state = SearchState::new(model, baseline.clone());
        let initial = state.cost().total();
        let num_processes = model.num_processes();
        let num_machines = model.num_machines();
        if num_processes == 0 {
            return Ok(state.into_assignment());
        }

        let offset = (self.seed % num_processes as u64) as usize;
        let mut iterations = 0u64;
        let mut moves = 0u64;
        let mut passes = 0u64;

        'search: loop {
            passes += 1;
            let mut improved = false;

            for i in 0..num_processes {
                if started.elapsed() >= self.time_limit {
                    debug!(passes, "time limit reached");
                    break 'search;
                }
                let p = (offset + i) % num_processes;

                let mut best: Option<(MachineId, i64)> = None;
                for m in 0..num_machines {
                    if iterations >= self.max_iterations {
                        debug!(passes, "iteration limit reached");
                        if let Some((m, _)) = best {
                            state.apply_move(p, m);
                            moves += 1;
                        }
                        break 'search;
                    }
                    iterations += 1;

                    let delta = state.move_delta(p, m).total();
                    let threshold = best.map_or(0, |(_, d)| d);
                    if delta < threshold && state.is_move_feasible(p, m) {
                        best = Some((m, delta));
                    }
                }

                if let Some((m, delta)) = best {
                    state.apply_move(p, m);
                    moves += 1;
                    improved = true;
                    debug!(process = p, machine = m, delta, "applied move");
                }
            }

            if !improved {
                break;
            }
        }

        info!(
            passes,
            iterations,
            moves,
            initial,
            cost = state.cost().total(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "local search finished"
        );
        Ok(state.into_assignment())
    }
}
