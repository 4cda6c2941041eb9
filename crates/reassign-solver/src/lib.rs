//! reassign-solver — runs a reassignment strategy end to end.
//!
//! Takes a `ProblemModel` (from `reassign-core`), asks an
//! `OptimizerStrategy` for one candidate, and checks it with the
//! validator and cost evaluator (from `reassign-eval`). The service:
//!
//! - Loads the instance and baseline assignment
//! - Invokes the strategy exactly once, or skips it in passthrough/no-output mode
//! - Rejects infeasible candidates with the full violation report
//! - Writes the chosen assignment in the re-parseable solution format
//!
//! # Architecture
//!
//! ```text
//! SolverService
//!   ├── ProblemModel (immutable, shared read-only with the strategy)
//!   ├── Box<dyn OptimizerStrategy>
//!   │   ├── Identity (returns the baseline)
//!   │   └── LocalSearch (feasible improving moves via SearchState)
//!   └── validate + evaluate → output file
//! ```

pub mod error;
pub mod local_search;
pub mod service;
pub mod strategy;

pub use error::{SolverError, SolverResult, StrategyError};
pub use local_search::LocalSearch;
pub use service::{RunReport, RunState, ServiceInput, SolverService};
pub use strategy::{Identity, OptimizerStrategy, build_strategy};
