//! reassign-eval — validation and cost evaluation of assignments.
//!
//! Everything here is pure and synchronous: no I/O, no shared mutable
//! state. Independent copies of a candidate may be checked concurrently.
//!
//! # Components
//!
//! - **`validator`** — hard constraints (capacity, conflict, spread, dependency)
//! - **`cost`** — weighted cost breakdown relative to the baseline
//! - **`incremental`** — single-move pricing and feasibility for search
//! - **`usage`** — per-machine resource usage tables

pub mod cost;
pub mod incremental;
pub mod usage;
pub mod validator;

pub use cost::{CostBreakdown, evaluate};
pub use incremental::SearchState;
pub use usage::Usage;
pub use validator::{ValidationReport, Violation, ViolationKind, validate};
