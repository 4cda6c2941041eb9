//! Incremental search state.
//!
//! Keeps usage, transient overhead, per-service move counts and per-service
//! location/neighborhood occupancy in step with an owned [`Assignment`], so
//! a single move can be priced and feasibility-checked by touching only the
//! two machines and the one service involved.

use std::collections::HashMap;
use std::hash::Hash;

use reassign_core::{
    Assignment, LocationId, MachineId, NeighborhoodId, ProblemModel, ProcessId,
};

use crate::cost::{CostBreakdown, balance_excess, evaluate, load_excess, service_excess};
use crate::usage::Usage;

pub struct SearchState<'a> {
    model: &'a ProblemModel,
    assignment: Assignment,
    usage: Usage,
    transient: Usage,
    moved_in_service: Vec<u64>,
    locations: Vec<HashMap<LocationId, u32>>,
    neighborhoods: Vec<HashMap<NeighborhoodId, u32>>,
    cost: CostBreakdown,
}

impl<'a> SearchState<'a> {
    /// Build the state for `assignment`, priced against the model's baseline.
    pub fn new(model: &'a ProblemModel, assignment: Assignment) -> Self {
        let baseline = model.baseline();
        let usage = Usage::of(model, &assignment);
        let transient = Usage::transient_of(model, &assignment);

        let mut moved_in_service = vec![0u64; model.num_services()];
        for p in assignment.moved_processes(baseline) {
            moved_in_service[model.process(p).service] += 1;
        }

        let mut locations = vec![HashMap::new(); model.num_services()];
        let mut neighborhoods = vec![HashMap::new(); model.num_services()];
        for (p, process) in model.processes().iter().enumerate() {
            let machine = model.machine(assignment.machine_of(p));
            *locations[process.service].entry(machine.location).or_insert(0) += 1;
            *neighborhoods[process.service]
                .entry(machine.neighborhood)
                .or_insert(0) += 1;
        }

        let cost = evaluate(model, &assignment, baseline);

        Self {
            model,
            assignment,
            usage,
            transient,
            moved_in_service,
            locations,
            neighborhoods,
            cost,
        }
    }

    pub fn model(&self) -> &'a ProblemModel {
        self.model
    }

    pub fn assignment(&self) -> &Assignment {
        &self.assignment
    }

    pub fn into_assignment(self) -> Assignment {
        self.assignment
    }

    /// Cost of the current assignment.
    pub fn cost(&self) -> CostBreakdown {
        self.cost
    }

    /// Exact change in every cost component if `p` moved to `target`.
    pub fn move_delta(&self, p: ProcessId, target: MachineId) -> CostBreakdown {
        let source = self.assignment.machine_of(p);
        if source == target {
            return CostBreakdown::default();
        }
        let model = self.model;
        let process = model.process(p);
        let home = model.baseline_machine(p);
        let weights = model.move_weights();

        let mut load = 0i64;
        for (r, resource) in model.resources().iter().enumerate() {
            let req = process.requirement(r);
            let src = self.usage.get(source, r);
            let dst = self.usage.get(target, r);
            let change = load_excess(model, source, r, src - req)
                - load_excess(model, source, r, src)
                + load_excess(model, target, r, dst + req)
                - load_excess(model, target, r, dst);
            load += resource.load_cost_weight as i64 * change;
        }

        let mut balance = 0i64;
        for objective in model.balance_objectives() {
            let (first, second) = (objective.first, objective.second);
            let (req_first, req_second) = (process.requirement(first), process.requirement(second));
            let src = (self.usage.get(source, first), self.usage.get(source, second));
            let dst = (self.usage.get(target, first), self.usage.get(target, second));
            let change = balance_excess(model, source, objective, src.0 - req_first, src.1 - req_second)
                - balance_excess(model, source, objective, src.0, src.1)
                + balance_excess(model, target, objective, dst.0 + req_first, dst.1 + req_second)
                - balance_excess(model, target, objective, dst.0, dst.1);
            balance += objective.weight as i64 * change;
        }

        let was_moved = source != home;
        let is_moved = target != home;
        let process_move = (is_moved as i64 - was_moved as i64) * process.move_cost as i64;

        let home_machine = model.machine(home);
        let machine_move = process.units() as i64
            * (home_machine.move_cost_to(target) as i64 - home_machine.move_cost_to(source) as i64);

        let s = process.service;
        let moved = self.moved_in_service[s];
        let service_move = match (was_moved, is_moved) {
            (false, true) => service_excess(model, s, moved + 1) - service_excess(model, s, moved),
            (true, false) => service_excess(model, s, moved - 1) - service_excess(model, s, moved),
            _ => 0,
        };

        CostBreakdown {
            load,
            balance,
            process_move: weights.process_move as i64 * process_move,
            service_move: weights.service_move as i64 * service_move,
            machine_move: weights.machine_move as i64 * machine_move,
        }
    }

    /// True when moving `p` to `target` keeps every hard constraint that
    /// currently holds.
    pub fn is_move_feasible(&self, p: ProcessId, target: MachineId) -> bool {
        let source = self.assignment.machine_of(p);
        if source == target {
            return true;
        }
        let model = self.model;
        let process = model.process(p);
        let s = process.service;
        let home = model.baseline_machine(p);
        let target_machine = model.machine(target);

        for (r, resource) in model.resources().iter().enumerate() {
            let req = process.requirement(r);
            let mut used = self.usage.get(target, r) + req;
            if resource.transient {
                used += self.transient.get(target, r);
                // Away from home the process carries its migration overhead.
                if target != home {
                    used += req;
                }
            }
            if used > target_machine.capacity(r) {
                return false;
            }
        }

        if self
            .assignment
            .processes_on(target)
            .iter()
            .any(|&q| model.in_conflict(s, model.process(q).service))
        {
            return false;
        }

        let source_machine = model.machine(source);
        if source_machine.location != target_machine.location {
            let here = &self.locations[s];
            let mut distinct = here.len() as u64;
            if count_of(here, &source_machine.location) == 1 {
                distinct -= 1;
            }
            if count_of(here, &target_machine.location) == 0 {
                distinct += 1;
            }
            if distinct < model.service(s).spread_min {
                return false;
            }
        }

        let (from, to) = (source_machine.neighborhood, target_machine.neighborhood);
        if from != to {
            for &dep in &model.service(s).dependencies {
                if dep != s && count_of(&self.neighborhoods[dep], &to) == 0 {
                    return false;
                }
            }
            if count_of(&self.neighborhoods[s], &from) == 1 {
                for &dependent in model.dependents(s) {
                    if dependent != s && count_of(&self.neighborhoods[dependent], &from) > 0 {
                        return false;
                    }
                }
            }
        }

        true
    }

    /// Move `p` to `target` and return the cost change applied.
    pub fn apply_move(&mut self, p: ProcessId, target: MachineId) -> CostBreakdown {
        let source = self.assignment.machine_of(p);
        if source == target {
            return CostBreakdown::default();
        }
        let delta = self.move_delta(p, target);

        let model = self.model;
        let process = model.process(p);
        let s = process.service;
        let home = model.baseline_machine(p);

        for (r, resource) in model.resources().iter().enumerate() {
            let req = process.requirement(r);
            self.usage.sub(source, r, req);
            self.usage.add(target, r, req);
            if resource.transient {
                if source != home {
                    self.transient.sub(source, r, req);
                }
                if target != home {
                    self.transient.add(target, r, req);
                }
            }
        }

        let was_moved = source != home;
        let is_moved = target != home;
        match (was_moved, is_moved) {
            (false, true) => self.moved_in_service[s] += 1,
            (true, false) => self.moved_in_service[s] -= 1,
            _ => {}
        }

        let (source_machine, target_machine) = (model.machine(source), model.machine(target));
        shift(&mut self.locations[s], source_machine.location, target_machine.location);
        shift(
            &mut self.neighborhoods[s],
            source_machine.neighborhood,
            target_machine.neighborhood,
        );

        self.assignment.move_process(p, target);
        self.cost += delta;
        delta
    }
}

fn count_of<K: Eq + Hash>(counts: &HashMap<K, u32>, key: &K) -> u32 {
    counts.get(key).copied().unwrap_or(0)
}

fn shift<K: Eq + Hash + Copy>(counts: &mut HashMap<K, u32>, from: K, to: K) {
    if from == to {
        return;
    }
    if let Some(count) = counts.get_mut(&from) {
        *count -= 1;
        if *count == 0 {
            counts.remove(&from);
        }
    }
    *counts.entry(to).or_insert(0) += 1;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validator::validate;

    const TOY_MODEL: &str = include_str!("../../../tests/fixtures/toy/model.txt");
    const TOY_BASELINE: &str = include_str!("../../../tests/fixtures/toy/assignment.txt");

    fn toy() -> ProblemModel {
        ProblemModel::parse(TOY_MODEL, TOY_BASELINE).unwrap()
    }

    #[test]
    fn initial_cost_matches_full_evaluation() {
        let model = toy();
        let state = SearchState::new(&model, model.baseline().clone());
        assert_eq!(
            state.cost(),
            evaluate(&model, model.baseline(), model.baseline())
        );
    }

    #[test]
    fn every_single_move_delta_is_exact() {
        let model = toy();
        let state = SearchState::new(&model, model.baseline().clone());
        let before = evaluate(&model, model.baseline(), model.baseline());

        for p in 0..model.num_processes() {
            for m in 0..model.num_machines() {
                let mut after = model.baseline().clone();
                after.move_process(p, m);
                let expected = evaluate(&model, &after, model.baseline()) - before;
                assert_eq!(state.move_delta(p, m), expected, "move p{p} -> m{m}");
            }
        }
    }

    #[test]
    fn cost_stays_exact_along_a_move_sequence() {
        let model = toy();
        let mut state = SearchState::new(&model, model.baseline().clone());
        // Includes moves away from home, between foreign machines, and back home.
        let moves = [(3, 0), (4, 1), (3, 1), (2, 3), (3, 2), (0, 2), (4, 3), (0, 0), (5, 2)];

        for (p, m) in moves {
            let before = state.cost();
            let delta = state.apply_move(p, m);
            let full = evaluate(&model, state.assignment(), model.baseline());
            assert_eq!(state.cost(), full, "after move p{p} -> m{m}");
            assert_eq!(full - before, delta);
        }
    }

    #[test]
    fn service_move_charges_only_beyond_cap() {
        let model = toy();
        let mut state = SearchState::new(&model, model.baseline().clone());
        // Service 2 has a cap of one free move.
        assert_eq!(state.apply_move(3, 0).service_move, 0);
        assert_eq!(state.apply_move(4, 1).service_move, 10);
        assert_eq!(state.cost().service_move, 10);

        // Back home: service 2 is within its cap again.
        let delta = state.apply_move(4, 3);
        assert_eq!(delta.service_move, -10);
        assert_eq!(state.cost().service_move, 0);
    }

    #[test]
    fn machine_move_delta_scales_with_units() {
        let model = toy();
        let state = SearchState::new(&model, model.baseline().clone());
        // Process 4 has 12 units; machine 3 to machine 2 is distance 1, weight 3.
        assert_eq!(state.move_delta(4, 2).machine_move, 36);
        assert_eq!(state.move_delta(4, 0).machine_move, 72);
    }

    /// One transient resource, three machines of capacity 10 in one
    /// neighborhood, services 0 and 1 excluded from each other.
    const EXCLUSIVE: &str = "\
1
1 1
3
0 0 10 10 0 1 1
0 1 10 10 1 0 1
0 2 10 10 1 1 0
3
1 0 0
1 0 0
1 0 0
1
0 1
4
0 4 1
1 3 1
2 3 1
2 2 1
0
1 1 1
";

    fn assert_feasibility_matches_validator(model: &ProblemModel, walk: &[(usize, usize)]) {
        let mut state = SearchState::new(model, model.baseline().clone());

        for step in 0..=walk.len() {
            for p in 0..model.num_processes() {
                for m in 0..model.num_machines() {
                    let mut after = state.assignment().clone();
                    after.move_process(p, m);
                    assert_eq!(
                        state.is_move_feasible(p, m),
                        validate(model, &after).is_valid(),
                        "step {step}: move p{p} -> m{m}"
                    );
                }
            }
            if let Some(&(p, m)) = walk.get(step) {
                assert!(state.is_move_feasible(p, m), "walk step {step}");
                state.apply_move(p, m);
            }
        }
    }

    #[test]
    fn feasibility_agrees_with_validator() {
        assert_feasibility_matches_validator(&toy(), &[(3, 0), (4, 1), (1, 3)]);
    }

    #[test]
    fn feasibility_agrees_with_validator_on_exclusions() {
        let model = ProblemModel::parse(EXCLUSIVE, "0 1 2 0").unwrap();
        assert_feasibility_matches_validator(&model, &[(3, 1), (2, 0)]);
    }

    #[test]
    fn excluded_services_may_not_meet() {
        let model = ProblemModel::parse(EXCLUSIVE, "0 1 2 0").unwrap();
        let state = SearchState::new(&model, model.baseline().clone());
        assert!(!state.is_move_feasible(1, 0));
        assert!(!state.is_move_feasible(0, 1));
        // Service 2 is not excluded from service 1.
        assert!(state.is_move_feasible(3, 1));
    }

    #[test]
    fn moved_in_process_pays_transient_overhead() {
        let model = ProblemModel::parse(EXCLUSIVE, "0 1 2 0").unwrap();
        let mut state = SearchState::new(&model, model.baseline().clone());
        // Machine 2 holds 3 units; process 0 needs 4 plus 4 overhead.
        assert!(!state.is_move_feasible(0, 2));
        // Machine 1 holds 3 units; process 3 needs 2 plus 2 overhead.
        assert!(state.is_move_feasible(3, 1));
        state.apply_move(3, 1);
        assert!(validate(&model, state.assignment()).is_valid());
        // Back home, process 3 needs only its own 2 units on machine 0.
        assert!(state.is_move_feasible(3, 0));
    }

    #[test]
    fn returning_home_drops_transient_overhead() {
        let model = toy();
        let mut state = SearchState::new(&model, model.baseline().clone());
        state.apply_move(2, 3);
        assert!(state.is_move_feasible(2, 0));
        state.apply_move(2, 0);
        assert_eq!(state.assignment(), model.baseline());
        assert_eq!(state.cost(), evaluate(&model, model.baseline(), model.baseline()));
    }
}
