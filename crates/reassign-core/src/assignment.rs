//! Process → machine mapping with a per-machine process index.

use std::fmt::Write as _;
use std::path::Path;

use crate::error::{CoreError, CoreResult};
use crate::model::{MachineId, ProcessId};
use crate::parse::TokenReader;

/// A total mapping from process to machine.
///
/// The reverse index (`processes_on`) is maintained on every move, so
/// callers never rebuild it themselves. Moves are purely structural: no
/// constraint is checked here.
#[derive(Debug, Clone)]
pub struct Assignment {
    machine_of: Vec<MachineId>,
    on_machine: Vec<Vec<ProcessId>>,
    // position of each process inside `on_machine[machine_of[p]]`
    slot: Vec<usize>,
}

impl Assignment {
    /// Build an assignment from a process-indexed machine list.
    pub fn new(machine_of: Vec<MachineId>, num_machines: usize) -> CoreResult<Self> {
        if let Some((p, &m)) = machine_of.iter().enumerate().find(|&(_, &m)| m >= num_machines) {
            return Err(CoreError::Invalid(format!(
                "process {p} assigned to unknown machine {m}"
            )));
        }

        let mut on_machine = vec![Vec::new(); num_machines];
        let mut slot = Vec::with_capacity(machine_of.len());
        for (p, &m) in machine_of.iter().enumerate() {
            slot.push(on_machine[m].len());
            on_machine[m].push(p);
        }

        Ok(Self {
            machine_of,
            on_machine,
            slot,
        })
    }

    /// Parse a solution description: exactly `num_processes` machine indices.
    pub fn parse(
        origin: &str,
        text: &str,
        num_processes: usize,
        num_machines: usize,
    ) -> CoreResult<Self> {
        let mut reader = TokenReader::new(origin, text);
        let mut machine_of = Vec::with_capacity(num_processes);
        for _ in 0..num_processes {
            machine_of.push(reader.next_index("machine", num_machines)?);
        }
        reader.finish()?;
        Self::new(machine_of, num_machines)
    }

    /// Read a solution file.
    pub fn load(path: &Path, num_processes: usize, num_machines: usize) -> CoreResult<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| CoreError::io(path, e))?;
        Self::parse(&path.display().to_string(), &text, num_processes, num_machines)
    }

    pub fn num_processes(&self) -> usize {
        self.machine_of.len()
    }

    pub fn num_machines(&self) -> usize {
        self.on_machine.len()
    }

    pub fn machine_of(&self, p: ProcessId) -> MachineId {
        self.machine_of[p]
    }

    /// The whole mapping, indexed by process.
    pub fn machines(&self) -> &[MachineId] {
        &self.machine_of
    }

    /// Processes currently on machine `m`, in no particular order.
    pub fn processes_on(&self, m: MachineId) -> &[ProcessId] {
        &self.on_machine[m]
    }

    /// Reassign `p` to `target` and return the machine it left.
    pub fn move_process(&mut self, p: ProcessId, target: MachineId) -> MachineId {
        let source = self.machine_of[p];
        if source == target {
            return source;
        }

        let idx = self.slot[p];
        self.on_machine[source].swap_remove(idx);
        if let Some(&swapped) = self.on_machine[source].get(idx) {
            self.slot[swapped] = idx;
        }

        self.slot[p] = self.on_machine[target].len();
        self.on_machine[target].push(p);
        self.machine_of[p] = target;
        source
    }

    pub fn is_moved(&self, p: ProcessId, baseline: &Assignment) -> bool {
        self.machine_of[p] != baseline.machine_of[p]
    }

    /// Processes whose machine differs from `baseline`.
    pub fn moved_processes<'a>(
        &'a self,
        baseline: &'a Assignment,
    ) -> impl Iterator<Item = ProcessId> + 'a {
        (0..self.machine_of.len()).filter(move |&p| self.is_moved(p, baseline))
    }

    /// The solution description: machine indices separated by spaces.
    pub fn to_record_string(&self) -> String {
        let mut out = String::with_capacity(self.machine_of.len() * 4);
        for (i, m) in self.machine_of.iter().enumerate() {
            if i > 0 {
                out.push(' ');
            }
            let _ = write!(out, "{m}");
        }
        out.push('\n');
        out
    }

    /// Write the solution description to `path`.
    pub fn write(&self, path: &Path) -> CoreResult<()> {
        std::fs::write(path, self.to_record_string()).map_err(|e| CoreError::io(path, e))
    }
}

impl PartialEq for Assignment {
    fn eq(&self, other: &Self) -> bool {
        self.machine_of == other.machine_of && self.on_machine.len() == other.on_machine.len()
    }
}

impl Eq for Assignment {}
