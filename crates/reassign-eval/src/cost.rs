//! Cost evaluation for candidate assignments.
//!
//! The objective is a weighted sum of five components:
//! - **Load**: usage above safety capacity, per machine and resource
//! - **Balance**: deviation from target ratios of available resources
//! - **Process move**: processes that left their baseline machine
//! - **Service move**: moved processes of a service beyond its move cap
//! - **Machine move**: resource units moved, times the move cost between the
//!   baseline and the new machine

use std::ops::{Add, AddAssign, Sub};

use serde::{Deserialize, Serialize};

use reassign_core::{
    Assignment, BalanceObjective, MachineId, ProblemModel, ResourceId, ServiceId,
};

use crate::usage::Usage;

/// Weighted cost components. Also used for signed deltas between two
/// assignments, so every field is signed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CostBreakdown {
    pub load: i64,
    pub balance: i64,
    pub process_move: i64,
    pub service_move: i64,
    pub machine_move: i64,
}

impl CostBreakdown {
    pub fn total(&self) -> i64 {
        self.load + self.balance + self.process_move + self.service_move + self.machine_move
    }

    pub fn is_zero(&self) -> bool {
        *self == Self::default()
    }
}

impl Add for CostBreakdown {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self {
            load: self.load + rhs.load,
            balance: self.balance + rhs.balance,
            process_move: self.process_move + rhs.process_move,
            service_move: self.service_move + rhs.service_move,
            machine_move: self.machine_move + rhs.machine_move,
        }
    }
}

impl AddAssign for CostBreakdown {
    fn add_assign(&mut self, rhs: Self) {
        *self = *self + rhs;
    }
}

impl Sub for CostBreakdown {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self {
        Self {
            load: self.load - rhs.load,
            balance: self.balance - rhs.balance,
            process_move: self.process_move - rhs.process_move,
            service_move: self.service_move - rhs.service_move,
            machine_move: self.machine_move - rhs.machine_move,
        }
    }
}

impl std::fmt::Display for CostBreakdown {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} (load={}, balance={}, process_move={}, service_move={}, machine_move={})",
            self.total(),
            self.load,
            self.balance,
            self.process_move,
            self.service_move,
            self.machine_move
        )
    }
}

/// Unweighted load excess of one machine/resource pair.
pub(crate) fn load_excess(model: &ProblemModel, m: MachineId, r: ResourceId, usage: u64) -> i64 {
    usage.saturating_sub(model.machine(m).safety_capacity(r)) as i64
}

/// Unweighted balance term of one machine for one objective, given the
/// usage of the objective's two resources on that machine.
pub(crate) fn balance_excess(
    model: &ProblemModel,
    m: MachineId,
    objective: &BalanceObjective,
    first_usage: u64,
    second_usage: u64,
) -> i64 {
    let machine = model.machine(m);
    let available_first = machine.capacity(objective.first) as i64 - first_usage as i64;
    let available_second = machine.capacity(objective.second) as i64 - second_usage as i64;
    (objective.target as i64 * available_first - available_second).max(0)
}

/// Unweighted service move term: moved processes of `s` beyond its cap.
pub(crate) fn service_excess(model: &ProblemModel, s: ServiceId, moved: u64) -> i64 {
    moved.saturating_sub(model.service(s).move_cap) as i64
}

/// Price `candidate` relative to `baseline`.
///
/// Both assignments must have the model's shape; run the validator first
/// on assignments of unknown origin.
pub fn evaluate(model: &ProblemModel, candidate: &Assignment, baseline: &Assignment) -> CostBreakdown {
    let usage = Usage::of(model, candidate);
    let weights = model.move_weights();

    let mut load = 0i64;
    for (r, resource) in model.resources().iter().enumerate() {
        let excess: i64 = (0..model.num_machines())
            .map(|m| load_excess(model, m, r, usage.get(m, r)))
            .sum();
        load += resource.load_cost_weight as i64 * excess;
    }

    let mut balance = 0i64;
    for objective in model.balance_objectives() {
        let excess: i64 = (0..model.num_machines())
            .map(|m| {
                balance_excess(
                    model,
                    m,
                    objective,
                    usage.get(m, objective.first),
                    usage.get(m, objective.second),
                )
            })
            .sum();
        balance += objective.weight as i64 * excess;
    }

    let mut process_move = 0i64;
    let mut machine_move = 0i64;
    let mut moved_per_service = vec![0u64; model.num_services()];
    for (p, process) in model.processes().iter().enumerate() {
        let from = baseline.machine_of(p);
        let to = candidate.machine_of(p);
        if from != to {
            process_move += process.move_cost as i64;
            moved_per_service[process.service] += 1;
            machine_move += (model.machine(from).move_cost_to(to) * process.units()) as i64;
        }
    }
    let service_move: i64 = moved_per_service
        .into_iter()
        .enumerate()
        .map(|(s, moved)| service_excess(model, s, moved))
        .sum();

    CostBreakdown {
        load,
        balance,
        process_move: weights.process_move as i64 * process_move,
        service_move: weights.service_move as i64 * service_move,
        machine_move: weights.machine_move as i64 * machine_move,
    }
}
