//! Hard-constraint validation of candidate assignments.
//!
//! Checks, in this order:
//! 1. Shape: one machine per process, every machine known
//! 2. Capacity per machine and resource, including transient overhead
//! 3. Conflict: no two processes of a service on one machine, and no
//!    processes of an excluded service pair on one machine
//! 4. Spread: each service spans enough distinct locations
//! 5. Dependency: every process has its dependencies in its neighborhood

use std::collections::{BTreeMap, BTreeSet, HashSet};

use serde::Serialize;
use tracing::debug;

use reassign_core::{
    Assignment, LocationId, MachineId, NeighborhoodId, ProblemModel, ProcessId, ResourceId,
    ServiceId,
};

use crate::usage::Usage;

/// The constraint a violation breaks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ViolationKind {
    Shape,
    Capacity,
    Conflict,
    Spread,
    Dependency,
}

impl std::fmt::Display for ViolationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ViolationKind::Shape => write!(f, "shape"),
            ViolationKind::Capacity => write!(f, "capacity"),
            ViolationKind::Conflict => write!(f, "conflict"),
            ViolationKind::Spread => write!(f, "spread"),
            ViolationKind::Dependency => write!(f, "dependency"),
        }
    }
}

/// A single broken constraint, located and sized.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum Violation {
    ProcessCount {
        expected: usize,
        actual: usize,
    },
    UnknownMachine {
        process: ProcessId,
        machine: MachineId,
    },
    /// `usage` includes transient overhead.
    Capacity {
        machine: MachineId,
        resource: ResourceId,
        usage: u64,
        capacity: u64,
    },
    Conflict {
        service: ServiceId,
        machine: MachineId,
        processes: usize,
    },
    /// Processes of a conflict pair share `machine`. `processes` is the
    /// smaller of the two services' counts there.
    Exclusion {
        service: ServiceId,
        excluded: ServiceId,
        machine: MachineId,
        processes: usize,
    },
    Spread {
        service: ServiceId,
        locations: usize,
        required: u64,
    },
    /// `processes` of `service` sit in `neighborhood` with no process of
    /// `depends_on` there.
    Dependency {
        service: ServiceId,
        depends_on: ServiceId,
        neighborhood: NeighborhoodId,
        processes: usize,
    },
}

impl Violation {
    pub fn kind(&self) -> ViolationKind {
        match self {
            Violation::ProcessCount { .. } | Violation::UnknownMachine { .. } => {
                ViolationKind::Shape
            }
            Violation::Capacity { .. } => ViolationKind::Capacity,
            Violation::Conflict { .. } | Violation::Exclusion { .. } => ViolationKind::Conflict,
            Violation::Spread { .. } => ViolationKind::Spread,
            Violation::Dependency { .. } => ViolationKind::Dependency,
        }
    }

    /// How far the constraint is from being satisfied.
    pub fn magnitude(&self) -> u64 {
        match *self {
            Violation::ProcessCount { expected, actual } => expected.abs_diff(actual) as u64,
            Violation::UnknownMachine { .. } => 1,
            Violation::Capacity {
                usage, capacity, ..
            } => usage - capacity,
            Violation::Conflict { processes, .. } => processes as u64 - 1,
            Violation::Exclusion { processes, .. } => processes as u64,
            Violation::Spread {
                locations,
                required,
                ..
            } => required - locations as u64,
            Violation::Dependency { processes, .. } => processes as u64,
        }
    }
}

impl std::fmt::Display for Violation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Violation::ProcessCount { expected, actual } => {
                write!(f, "shape: expected {expected} processes, got {actual}")
            }
            Violation::UnknownMachine { process, machine } => {
                write!(f, "shape: process {process} on unknown machine {machine}")
            }
            Violation::Capacity {
                machine,
                resource,
                usage,
                capacity,
            } => write!(
                f,
                "capacity: machine {machine} resource {resource} uses {usage} of {capacity} (excess {})",
                self.magnitude()
            ),
            Violation::Conflict {
                service,
                machine,
                processes,
            } => write!(
                f,
                "conflict: service {service} has {processes} processes on machine {machine}"
            ),
            Violation::Exclusion {
                service,
                excluded,
                machine,
                ..
            } => write!(
                f,
                "conflict: services {service} and {excluded} share machine {machine}"
            ),
            Violation::Spread {
                service,
                locations,
                required,
            } => write!(
                f,
                "spread: service {service} spans {locations} locations, needs {required}"
            ),
            Violation::Dependency {
                service,
                depends_on,
                neighborhood,
                processes,
            } => write!(
                f,
                "dependency: {processes} process(es) of service {service} in neighborhood {neighborhood} without service {depends_on}"
            ),
        }
    }
}

/// Outcome of [`validate`]: empty means valid.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ValidationReport {
    violations: Vec<Violation>,
}

impl ValidationReport {
    pub fn is_valid(&self) -> bool {
        self.violations.is_empty()
    }

    pub fn violations(&self) -> &[Violation] {
        &self.violations
    }

    pub fn len(&self) -> usize {
        self.violations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.violations.is_empty()
    }

    pub fn of_kind(&self, kind: ViolationKind) -> impl Iterator<Item = &Violation> {
        self.violations.iter().filter(move |v| v.kind() == kind)
    }
}

impl std::fmt::Display for ValidationReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.is_valid() {
            return write!(f, "valid");
        }
        write!(f, "{} violation(s)", self.violations.len())?;
        for v in &self.violations {
            write!(f, "\n  {v}")?;
        }
        Ok(())
    }
}

/// Check every hard constraint of `model` against `candidate`.
pub fn validate(model: &ProblemModel, candidate: &Assignment) -> ValidationReport {
    let mut violations = check_shape(model, candidate);
    if violations.is_empty() {
        check_capacity(model, candidate, &mut violations);
        check_conflict(model, candidate, &mut violations);
        check_spread(model, candidate, &mut violations);
        check_dependency(model, candidate, &mut violations);
    }

    debug!(violations = violations.len(), "assignment validated");
    ValidationReport { violations }
}

fn check_shape(model: &ProblemModel, candidate: &Assignment) -> Vec<Violation> {
    if candidate.num_processes() != model.num_processes() {
        return vec![Violation::ProcessCount {
            expected: model.num_processes(),
            actual: candidate.num_processes(),
        }];
    }
    candidate
        .machines()
        .iter()
        .enumerate()
        .filter(|&(_, &m)| m >= model.num_machines())
        .map(|(process, &machine)| Violation::UnknownMachine { process, machine })
        .collect()
}

fn check_capacity(model: &ProblemModel, candidate: &Assignment, out: &mut Vec<Violation>) {
    let usage = Usage::of(model, candidate);
    let transient = Usage::transient_of(model, candidate);

    for (m, machine) in model.machines().iter().enumerate() {
        for r in 0..model.num_resources() {
            let used = usage.get(m, r) + transient.get(m, r);
            let capacity = machine.capacity(r);
            if used > capacity {
                out.push(Violation::Capacity {
                    machine: m,
                    resource: r,
                    usage: used,
                    capacity,
                });
            }
        }
    }
}

fn check_conflict(model: &ProblemModel, candidate: &Assignment, out: &mut Vec<Violation>) {
    let per_machine = |s: ServiceId| -> BTreeMap<MachineId, usize> {
        let mut counts = BTreeMap::new();
        for &p in model.service_processes(s) {
            *counts.entry(candidate.machine_of(p)).or_insert(0) += 1;
        }
        counts
    };

    for s in 0..model.num_services() {
        out.extend(
            per_machine(s)
                .into_iter()
                .filter(|&(_, count)| count > 1)
                .map(|(machine, processes)| Violation::Conflict {
                    service: s,
                    machine,
                    processes,
                }),
        );
    }

    for &(service, excluded) in model.conflict_pairs() {
        let theirs = per_machine(excluded);
        for (machine, ours) in per_machine(service) {
            if let Some(&other) = theirs.get(&machine) {
                out.push(Violation::Exclusion {
                    service,
                    excluded,
                    machine,
                    processes: ours.min(other),
                });
            }
        }
    }
}

fn check_spread(model: &ProblemModel, candidate: &Assignment, out: &mut Vec<Violation>) {
    for (s, service) in model.services().iter().enumerate() {
        let locations: HashSet<LocationId> = model
            .service_processes(s)
            .iter()
            .map(|&p| model.machine(candidate.machine_of(p)).location)
            .collect();
        if (locations.len() as u64) < service.spread_min {
            out.push(Violation::Spread {
                service: s,
                locations: locations.len(),
                required: service.spread_min,
            });
        }
    }
}

fn check_dependency(model: &ProblemModel, candidate: &Assignment, out: &mut Vec<Violation>) {
    let neighborhoods_of = |s: ServiceId| -> BTreeMap<NeighborhoodId, usize> {
        let mut counts = BTreeMap::new();
        for &p in model.service_processes(s) {
            let n = model.machine(candidate.machine_of(p)).neighborhood;
            *counts.entry(n).or_insert(0) += 1;
        }
        counts
    };

    for (s, service) in model.services().iter().enumerate() {
        if service.dependencies.is_empty() {
            continue;
        }
        let own = neighborhoods_of(s);
        let mut seen = BTreeSet::new();
        for &dep in &service.dependencies {
            if !seen.insert(dep) {
                continue;
            }
            let present = neighborhoods_of(dep);
            for (&neighborhood, &processes) in &own {
                if !present.contains_key(&neighborhood) {
                    out.push(Violation::Dependency {
                        service: s,
                        depends_on: dep,
                        neighborhood,
                        processes,
                    });
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reassign_core::{Instance, Machine, MoveWeights, Process, Resource, Service};

    const TOY_MODEL: &str = include_str!("../../../tests/fixtures/toy/model.txt");
    const TOY_BASELINE: &str = include_str!("../../../tests/fixtures/toy/assignment.txt");

    fn toy() -> ProblemModel {
        ProblemModel::parse(TOY_MODEL, TOY_BASELINE).unwrap()
    }

    fn machine(location: u32, capacity: u64) -> Machine {
        Machine {
            neighborhood: location,
            location,
            capacities: vec![capacity],
            safety_capacities: vec![capacity],
            move_costs: vec![0, 0],
        }
    }

    fn process(service: usize, requirement: u64) -> Process {
        Process {
            service,
            requirements: vec![requirement],
            move_cost: 1,
        }
    }

    fn service(spread_min: u64, dependencies: Vec<usize>) -> Service {
        Service {
            spread_min,
            move_cap: 0,
            dependencies,
        }
    }

    fn model(
        transient: bool,
        machines: Vec<Machine>,
        services: Vec<Service>,
        processes: Vec<Process>,
        baseline: Vec<usize>,
    ) -> ProblemModel {
        model_with_conflicts(transient, machines, services, vec![], processes, baseline)
    }

    fn model_with_conflicts(
        transient: bool,
        machines: Vec<Machine>,
        services: Vec<Service>,
        conflicts: Vec<(usize, usize)>,
        processes: Vec<Process>,
        baseline: Vec<usize>,
    ) -> ProblemModel {
        let num_machines = machines.len();
        let instance = Instance {
            resources: vec![Resource {
                transient,
                load_cost_weight: 1,
            }],
            machines,
            services,
            conflicts,
            processes,
            balance_objectives: vec![],
            move_weights: MoveWeights::default(),
        };
        ProblemModel::new(instance, Assignment::new(baseline, num_machines).unwrap()).unwrap()
    }

    #[test]
    fn baseline_is_valid() {
        let model = toy();
        let report = validate(&model, model.baseline());
        assert!(report.is_valid(), "{report}");
        assert_eq!(report.to_string(), "valid");
    }

    #[test]
    fn reports_capacity_excess() {
        // Capacity 10, two processes of 6 units on machine 0.
        let model = model(
            false,
            vec![machine(0, 10), machine(1, 10)],
            vec![service(0, vec![]), service(0, vec![])],
            vec![process(0, 6), process(1, 6)],
            vec![0, 1],
        );
        let mut candidate = model.baseline().clone();
        candidate.move_process(1, 0);

        let report = validate(&model, &candidate);
        assert_eq!(
            report.violations(),
            &[Violation::Capacity {
                machine: 0,
                resource: 0,
                usage: 12,
                capacity: 10,
            }]
        );
        assert_eq!(report.violations()[0].magnitude(), 2);
        assert_eq!(report.violations()[0].kind(), ViolationKind::Capacity);
    }

    #[test]
    fn transient_overhead_lands_on_target_machine() {
        // Process 0 (6 units) moves onto machine 1, which hosts process 1 (4 units).
        let model = model(
            true,
            vec![machine(0, 10), machine(1, 10)],
            vec![service(0, vec![]), service(0, vec![])],
            vec![process(0, 6), process(1, 4)],
            vec![0, 1],
        );
        let mut candidate = model.baseline().clone();
        candidate.move_process(0, 1);

        let report = validate(&model, &candidate);
        assert_eq!(
            report.violations(),
            &[Violation::Capacity {
                machine: 1,
                resource: 0,
                usage: 16,
                capacity: 10,
            }]
        );
        assert_eq!(report.violations()[0].magnitude(), 6);
    }

    #[test]
    fn non_transient_move_has_no_overhead() {
        let model = model(
            false,
            vec![machine(0, 10), machine(1, 10)],
            vec![service(0, vec![]), service(0, vec![])],
            vec![process(0, 6), process(1, 4)],
            vec![0, 1],
        );
        let mut candidate = model.baseline().clone();
        candidate.move_process(0, 1);
        assert!(validate(&model, &candidate).is_valid());
    }

    #[test]
    fn reports_excluded_services_sharing_a_machine() {
        let model = model_with_conflicts(
            false,
            vec![machine(0, 10), machine(1, 10)],
            vec![service(0, vec![]), service(0, vec![])],
            vec![(0, 1)],
            vec![process(0, 1), process(1, 1)],
            vec![0, 1],
        );
        assert!(validate(&model, model.baseline()).is_valid());

        let mut candidate = model.baseline().clone();
        candidate.move_process(1, 0);
        let report = validate(&model, &candidate);
        assert_eq!(
            report.violations(),
            &[Violation::Exclusion {
                service: 0,
                excluded: 1,
                machine: 0,
                processes: 1,
            }]
        );
        assert_eq!(report.violations()[0].kind(), ViolationKind::Conflict);
        assert_eq!(report.violations()[0].magnitude(), 1);
        assert!(report.to_string().contains("services 0 and 1 share machine 0"));
    }

    #[test]
    fn reports_spread_shortfall() {
        // Two machines at location 0, in different neighborhoods.
        let mut shared = machine(1, 10);
        shared.location = 0;
        let model = model(
            false,
            vec![machine(0, 10), shared],
            vec![service(2, vec![])],
            vec![process(0, 1), process(0, 1)],
            vec![0, 1],
        );

        let report = validate(&model, model.baseline());
        assert_eq!(
            report.violations(),
            &[Violation::Spread {
                service: 0,
                locations: 1,
                required: 2,
            }]
        );
        assert_eq!(report.violations()[0].magnitude(), 1);
    }

    #[test]
    fn reports_conflict() {
        let model = toy();
        let mut candidate = model.baseline().clone();
        // Process 4 joins process 3 (same service) on machine 2.
        candidate.move_process(4, 2);

        let report = validate(&model, &candidate);
        let conflicts: Vec<_> = report.of_kind(ViolationKind::Conflict).collect();
        assert_eq!(
            conflicts,
            vec![&Violation::Conflict {
                service: 2,
                machine: 2,
                processes: 2,
            }]
        );
        assert_eq!(conflicts[0].magnitude(), 1);
    }

    #[test]
    fn reports_missing_dependency() {
        let model = toy();
        let mut candidate = model.baseline().clone();
        // Process 2 (service 1, depends on service 0) moves to neighborhood 1.
        candidate.move_process(2, 2);

        let report = validate(&model, &candidate);
        assert_eq!(
            report.violations(),
            &[Violation::Dependency {
                service: 1,
                depends_on: 0,
                neighborhood: 1,
                processes: 1,
            }]
        );
    }

    #[test]
    fn report_order_is_deterministic() {
        let model = toy();
        let mut candidate = model.baseline().clone();
        candidate.move_process(2, 2);
        candidate.move_process(4, 2);
        candidate.move_process(1, 0);

        let first = validate(&model, &candidate);
        let second = validate(&model, &candidate);
        assert_eq!(first, second);

        let kinds: Vec<_> = first.violations().iter().map(Violation::kind).collect();
        let mut sorted = kinds.clone();
        sorted.sort_by_key(|k| *k as u8);
        assert_eq!(kinds, sorted);
    }

    #[test]
    fn wrong_shape_stops_other_checks() {
        let model = toy();
        let short = Assignment::new(vec![0, 1], 4).unwrap();
        let report = validate(&model, &short);
        assert_eq!(
            report.violations(),
            &[Violation::ProcessCount {
                expected: 6,
                actual: 2,
            }]
        );

        let wide = Assignment::new(vec![0, 1, 0, 2, 3, 7], 8).unwrap();
        let report = validate(&model, &wide);
        assert_eq!(
            report.violations(),
            &[Violation::UnknownMachine {
                process: 5,
                machine: 7,
            }]
        );
    }

    #[test]
    fn report_serializes_with_kind_tag() {
        let model = toy();
        let mut candidate = model.baseline().clone();
        candidate.move_process(4, 2);
        let json = serde_json::to_string(&validate(&model, &candidate)).unwrap();
        assert!(json.contains("\"kind\":\"conflict\""), "{json}");
    }
}
