//! Per-machine resource usage tables.

use reassign_core::{Assignment, MachineId, ProblemModel, ResourceId};

/// A machine × resource table of consumed units.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Usage {
    num_resources: usize,
    values: Vec<u64>,
}

impl Usage {
    pub fn zeroed(num_machines: usize, num_resources: usize) -> Self {
        Self {
            num_resources,
            values: vec![0; num_machines * num_resources],
        }
    }

    /// Requirements of the processes currently on each machine.
    pub fn of(model: &ProblemModel, assignment: &Assignment) -> Self {
        let mut usage = Self::zeroed(model.num_machines(), model.num_resources());
        for (p, process) in model.processes().iter().enumerate() {
            let m = assignment.machine_of(p);
            for (r, &req) in process.requirements.iter().enumerate() {
                usage.add(m, r, req);
            }
        }
        usage
    }

    /// Migration overhead of transient resources: each process away from its
    /// baseline machine adds its requirement again on the machine it
    /// currently occupies.
    pub fn transient_of(model: &ProblemModel, assignment: &Assignment) -> Self {
        let mut usage = Self::zeroed(model.num_machines(), model.num_resources());
        for p in assignment.moved_processes(model.baseline()) {
            let m = assignment.machine_of(p);
            for (r, resource) in model.resources().iter().enumerate() {
                if resource.transient {
                    usage.add(m, r, model.process(p).requirement(r));
                }
            }
        }
        usage
    }

    pub fn get(&self, m: MachineId, r: ResourceId) -> u64 {
        self.values[m * self.num_resources + r]
    }

    pub fn add(&mut self, m: MachineId, r: ResourceId, units: u64) {
        self.values[m * self.num_resources + r] += units;
    }

    pub fn sub(&mut self, m: MachineId, r: ResourceId, units: u64) {
        self.values[m * self.num_resources + r] -= units;
    }
}
