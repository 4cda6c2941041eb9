//! reassign-core — problem model for machine reassignment.
//!
//! Holds the immutable [`ProblemModel`] (resources, machines, services,
//! processes, balance objectives, move weights and the baseline
//! assignment), the mutable [`Assignment`], the instance parser, and the
//! run configuration.

pub mod assignment;
pub mod config;
pub mod error;
pub mod model;
pub mod parse;

pub use assignment::Assignment;
pub use config::{RunMode, SearchConfig, SolverConfig, StrategyKind};
pub use error::{CoreError, CoreResult};
pub use model::*;
pub use parse::parse_instance;
