//! Immutable problem model: resources, machines, services, processes.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::assignment::Assignment;
use crate::error::{CoreError, CoreResult};
use crate::parse::parse_instance;

pub type ResourceId = usize;
pub type MachineId = usize;
pub type ServiceId = usize;
pub type ProcessId = usize;
pub type LocationId = u32;
pub type NeighborhoodId = u32;

/// A capacity dimension tracked on every machine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resource {
    /// A process moved away from its baseline machine consumes this resource
    /// twice on the machine it moved onto: its requirement plus an equal
    /// migration overhead.
    pub transient: bool,
    /// Weight applied to usage above safety capacity.
    pub load_cost_weight: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Machine {
    pub neighborhood: NeighborhoodId,
    pub location: LocationId,
    /// Hard capacity, indexed by resource.
    pub capacities: Vec<u64>,
    /// Soft capacity above which load cost is charged, indexed by resource.
    pub safety_capacities: Vec<u64>,
    /// Cost of moving a process from this machine to each machine.
    pub move_costs: Vec<u64>,
}

impl Machine {
    pub fn capacity(&self, resource: ResourceId) -> u64 {
        self.capacities[resource]
    }

    pub fn safety_capacity(&self, resource: ResourceId) -> u64 {
        self.safety_capacities[resource]
    }

    pub fn move_cost_to(&self, target: MachineId) -> u64 {
        self.move_costs[target]
    }
}

/// A group of processes that must not share a machine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Service {
    /// Minimum number of distinct locations the processes must span.
    pub spread_min: u64,
    /// Moved processes of this service that carry no service move cost.
    pub move_cap: u64,
    /// Services that must be present in the neighborhood of every process.
    pub dependencies: Vec<ServiceId>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Process {
    pub service: ServiceId,
    /// Requirement per resource.
    pub requirements: Vec<u64>,
    /// Cost charged when the process leaves its baseline machine.
    pub move_cost: u64,
}

impl Process {
    pub fn requirement(&self, resource: ResourceId) -> u64 {
        self.requirements[resource]
    }

    /// Total requirement over all resources.
    pub fn units(&self) -> u64 {
        self.requirements.iter().sum()
    }
}

/// Penalize machines where `target * available(first) > available(second)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BalanceObjective {
    pub first: ResourceId,
    pub second: ResourceId,
    pub target: u64,
    pub weight: u64,
}

/// Global weights for the three migration cost components.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoveWeights {
    pub process_move: u64,
    pub service_move: u64,
    pub machine_move: u64,
}

/// Raw instance tables, as read from an instance description.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Instance {
    pub resources: Vec<Resource>,
    pub machines: Vec<Machine>,
    pub services: Vec<Service>,
    /// Pairs of services whose processes must never share a machine.
    pub conflicts: Vec<(ServiceId, ServiceId)>,
    pub processes: Vec<Process>,
    pub balance_objectives: Vec<BalanceObjective>,
    pub move_weights: MoveWeights,
}

/// The full problem: instance tables, the baseline assignment, and derived
/// indices. Immutable once built.
#[derive(Debug, Clone)]
pub struct ProblemModel {
    instance: Instance,
    baseline: Assignment,
    service_processes: Vec<Vec<ProcessId>>,
    dependents: Vec<Vec<ServiceId>>,
    excluded: Vec<Vec<ServiceId>>,
}

impl ProblemModel {
    /// Build a model after checking every cross reference.
    pub fn new(instance: Instance, baseline: Assignment) -> CoreResult<Self> {
        check_consistency(&instance, &baseline)?;

        let mut service_processes = vec![Vec::new(); instance.services.len()];
        for (p, process) in instance.processes.iter().enumerate() {
            service_processes[process.service].push(p);
        }

        let mut dependents = vec![Vec::new(); instance.services.len()];
        for (s, service) in instance.services.iter().enumerate() {
            for &dep in &service.dependencies {
                if !dependents[dep].contains(&s) {
                    dependents[dep].push(s);
                }
            }
        }

        let mut excluded = vec![Vec::new(); instance.services.len()];
        for &(a, b) in &instance.conflicts {
            if !excluded[a].contains(&b) {
                excluded[a].push(b);
                excluded[b].push(a);
            }
        }

        Ok(Self {
            instance,
            baseline,
            service_processes,
            dependents,
            excluded,
        })
    }

    /// Parse an instance and a baseline assignment from text.
    pub fn parse(instance_text: &str, baseline_text: &str) -> CoreResult<Self> {
        Self::parse_named("instance", instance_text, "baseline", baseline_text)
    }

    fn parse_named(
        instance_origin: &str,
        instance_text: &str,
        baseline_origin: &str,
        baseline_text: &str,
    ) -> CoreResult<Self> {
        let instance = parse_instance(instance_origin, instance_text)?;
        let baseline = Assignment::parse(
            baseline_origin,
            baseline_text,
            instance.processes.len(),
            instance.machines.len(),
        )?;
        Self::new(instance, baseline)
    }

    /// Read and parse an instance file and its baseline assignment file.
    pub fn load(instance_path: &Path, baseline_path: &Path) -> CoreResult<Self> {
        let instance_text = std::fs::read_to_string(instance_path)
            .map_err(|e| CoreError::io(instance_path, e))?;
        let baseline_text = std::fs::read_to_string(baseline_path)
            .map_err(|e| CoreError::io(baseline_path, e))?;

        let model = Self::parse_named(
            &instance_path.display().to_string(),
            &instance_text,
            &baseline_path.display().to_string(),
            &baseline_text,
        )?;
        debug!(
            instance = %instance_path.display(),
            processes = model.num_processes(),
            machines = model.num_machines(),
            "problem model loaded"
        );
        Ok(model)
    }

    pub fn instance(&self) -> &Instance {
        &self.instance
    }

    pub fn resources(&self) -> &[Resource] {
        &self.instance.resources
    }

    pub fn machines(&self) -> &[Machine] {
        &self.instance.machines
    }

    pub fn services(&self) -> &[Service] {
        &self.instance.services
    }

    pub fn processes(&self) -> &[Process] {
        &self.instance.processes
    }

    pub fn balance_objectives(&self) -> &[BalanceObjective] {
        &self.instance.balance_objectives
    }

    pub fn move_weights(&self) -> &MoveWeights {
        &self.instance.move_weights
    }

    pub fn resource(&self, r: ResourceId) -> &Resource {
        &self.instance.resources[r]
    }

    pub fn machine(&self, m: MachineId) -> &Machine {
        &self.instance.machines[m]
    }

    pub fn service(&self, s: ServiceId) -> &Service {
        &self.instance.services[s]
    }

    pub fn process(&self, p: ProcessId) -> &Process {
        &self.instance.processes[p]
    }

    pub fn num_resources(&self) -> usize {
        self.instance.resources.len()
    }

    pub fn num_machines(&self) -> usize {
        self.instance.machines.len()
    }

    pub fn num_services(&self) -> usize {
        self.instance.services.len()
    }

    pub fn num_processes(&self) -> usize {
        self.instance.processes.len()
    }

    /// The originally existing assignment, used to price migrations.
    pub fn baseline(&self) -> &Assignment {
        &self.baseline
    }

    pub fn baseline_machine(&self, p: ProcessId) -> MachineId {
        self.baseline.machine_of(p)
    }

    /// Processes belonging to service `s`, in index order.
    pub fn service_processes(&self, s: ServiceId) -> &[ProcessId] {
        &self.service_processes[s]
    }

    /// Services that declare a dependency on service `s`.
    pub fn dependents(&self, s: ServiceId) -> &[ServiceId] {
        &self.dependents[s]
    }

    /// Services paired with `s` by a conflict pair, in either order.
    pub fn excluded(&self, s: ServiceId) -> &[ServiceId] {
        &self.excluded[s]
    }

    pub fn conflict_pairs(&self) -> &[(ServiceId, ServiceId)] {
        &self.instance.conflicts
    }

    /// Whether processes of `a` and `b` may not share a machine.
    pub fn in_conflict(&self, a: ServiceId, b: ServiceId) -> bool {
        a == b || self.excluded[a].contains(&b)
    }
}

fn check_consistency(instance: &Instance, baseline: &Assignment) -> CoreResult<()> {
    let num_resources = instance.resources.len();
    let num_machines = instance.machines.len();
    let num_services = instance.services.len();

    for (m, machine) in instance.machines.iter().enumerate() {
        if machine.capacities.len() != num_resources
            || machine.safety_capacities.len() != num_resources
        {
            return Err(CoreError::Invalid(format!(
                "machine {m} must list {num_resources} capacities and safety capacities"
            )));
        }
        if machine.move_costs.len() != num_machines {
            return Err(CoreError::Invalid(format!(
                "machine {m} must list {num_machines} move costs"
            )));
        }
        if let Some(r) = (0..num_resources)
            .find(|&r| machine.safety_capacities[r] > machine.capacities[r])
        {
            return Err(CoreError::Invalid(format!(
                "machine {m}: safety capacity exceeds capacity for resource {r}"
            )));
        }
    }

    for (s, service) in instance.services.iter().enumerate() {
        if let Some(&dep) = service.dependencies.iter().find(|&&d| d >= num_services) {
            return Err(CoreError::Invalid(format!(
                "service {s} depends on unknown service {dep}"
            )));
        }
    }

    for &(a, b) in &instance.conflicts {
        if a >= num_services || b >= num_services {
            return Err(CoreError::Invalid(format!(
                "conflict pair ({a}, {b}) refers to an unknown service"
            )));
        }
        if a == b {
            return Err(CoreError::Invalid(format!(
                "conflict pair ({a}, {b}) names the same service twice"
            )));
        }
    }

    for (p, process) in instance.processes.iter().enumerate() {
        if process.service >= num_services {
            return Err(CoreError::Invalid(format!(
                "process {p} belongs to unknown service {}",
                process.service
            )));
        }
        if process.requirements.len() != num_resources {
            return Err(CoreError::Invalid(format!(
                "process {p} must list {num_resources} requirements"
            )));
        }
    }

    for (b, objective) in instance.balance_objectives.iter().enumerate() {
        if objective.first >= num_resources || objective.second >= num_resources {
            return Err(CoreError::Invalid(format!(
                "balance objective {b} refers to an unknown resource"
            )));
        }
    }

    if baseline.num_processes() != instance.processes.len() {
        return Err(CoreError::Invalid(format!(
            "baseline assigns {} processes, instance defines {}",
            baseline.num_processes(),
            instance.processes.len()
        )));
    }
    if baseline.num_machines() != num_machines {
        return Err(CoreError::Invalid(format!(
            "baseline spans {} machines, instance defines {num_machines}",
            baseline.num_machines()
        )));
    }

    Ok(())
}
