//! `reassign check` — validate and price an existing solution.

use std::path::Path;

use anyhow::Result;
use serde::Serialize;

use reassign_core::{Assignment, ProblemModel};
use reassign_eval::{CostBreakdown, ValidationReport, evaluate, validate};
use reassign_solver::SolverError;

#[derive(Debug, Serialize)]
struct CheckReport {
    valid: bool,
    moved: usize,
    cost: CostBreakdown,
    violations: ValidationReport,
}

pub fn check(instance: &Path, baseline: &Path, solution: &Path, json: bool) -> Result<()> {
    let model = ProblemModel::load(instance, baseline)?;
    let candidate = Assignment::load(solution, model.num_processes(), model.num_machines())?;
    let report = inspect(&model, &candidate);

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("{}", report.violations);
        println!("moved: {}", report.moved);
        println!("cost: {}", report.cost);
    }

    if report.valid {
        Ok(())
    } else {
        Err(SolverError::InvalidSolution(report.violations).into())
    }
}

fn inspect(model: &ProblemModel, candidate: &Assignment) -> CheckReport {
    let violations = validate(model, candidate);
    CheckReport {
        valid: violations.is_valid(),
        moved: candidate.moved_processes(model.baseline()).count(),
        cost: evaluate(model, candidate, model.baseline()),
        violations,
    }
}
