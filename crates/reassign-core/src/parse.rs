//! Instance description parser.
//!
//! Instances and assignments are flat streams of whitespace-separated
//! non-negative integers. The reader tracks line numbers so errors point at
//! the offending token.

use crate::error::{CoreError, CoreResult};
use crate::model::{
    BalanceObjective, Instance, Machine, MoveWeights, Process, Resource, Service,
};

/// Sequential reader over the integer tokens of one description.
pub(crate) struct TokenReader<'a> {
    origin: &'a str,
    tokens: Vec<(usize, &'a str)>,
    pos: usize,
}

impl<'a> TokenReader<'a> {
    pub(crate) fn new(origin: &'a str, text: &'a str) -> Self {
        let tokens = text
            .lines()
            .enumerate()
            .flat_map(|(idx, line)| line.split_whitespace().map(move |tok| (idx + 1, tok)))
            .collect();
        Self {
            origin,
            tokens,
            pos: 0,
        }
    }

    fn line(&self) -> usize {
        match self.tokens.get(self.pos) {
            Some(&(line, _)) => line,
            None => self.tokens.last().map_or(1, |&(line, _)| line),
        }
    }

    /// Build a parse error located at the current token.
    pub(crate) fn error(&self, message: impl Into<String>) -> CoreError {
        CoreError::Parse {
            origin: self.origin.to_string(),
            line: self.line(),
            message: message.into(),
        }
    }

    pub(crate) fn next_u64(&mut self, what: &str) -> CoreResult<u64> {
        let Some(&(_, tok)) = self.tokens.get(self.pos) else {
            return Err(self.error(format!("unexpected end of input while reading {what}")));
        };
        let value = match tok.parse::<u64>() {
            Ok(v) => v,
            Err(_) if tok.starts_with('-') && tok[1..].parse::<u64>().is_ok() => {
                return Err(self.error(format!("negative {what}: {tok}")));
            }
            Err(_) => {
                return Err(self.error(format!("expected integer for {what}, found {tok:?}")));
            }
        };
        self.pos += 1;
        Ok(value)
    }

    pub(crate) fn next_u32(&mut self, what: &str) -> CoreResult<u32> {
        let value = self.next_u64(what)?;
        u32::try_from(value).map_err(|_| {
            self.pos -= 1;
            self.error(format!("{what} out of range: {value}"))
        })
    }

    pub(crate) fn next_count(&mut self, what: &str) -> CoreResult<usize> {
        let value = self.next_u64(what)?;
        usize::try_from(value).map_err(|_| {
            self.pos -= 1;
            self.error(format!("{what} out of range: {value}"))
        })
    }

    /// Read an index that must refer to one of `bound` existing entities.
    pub(crate) fn next_index(&mut self, what: &str, bound: usize) -> CoreResult<usize> {
        let value = self.next_count(what)?;
        if value >= bound {
            self.pos -= 1;
            return Err(self.error(format!(
                "unknown {what} {value} (only {bound} defined)"
            )));
        }
        Ok(value)
    }

    pub(crate) fn next_flag(&mut self, what: &str) -> CoreResult<bool> {
        match self.next_u64(what)? {
            0 => Ok(false),
            1 => Ok(true),
            other => {
                self.pos -= 1;
                Err(self.error(format!("{what} must be 0 or 1, found {other}")))
            }
        }
    }

    /// Fail if any token is left over.
    pub(crate) fn finish(self) -> CoreResult<()> {
        let remaining = self.tokens.len() - self.pos;
        if remaining > 0 {
            return Err(self.error(format!("{remaining} unexpected trailing token(s)")));
        }
        Ok(())
    }
}

/// Parse an instance description into its raw [`Instance`] tables.
pub fn parse_instance(origin: &str, text: &str) -> CoreResult<Instance> {
    let mut reader = TokenReader::new(origin, text);

    let num_resources = reader.next_count("resource count")?;
    let mut resources = Vec::with_capacity(num_resources);
    for _ in 0..num_resources {
        let transient = reader.next_flag("transient flag")?;
        let load_cost_weight = reader.next_u64("load cost weight")?;
        resources.push(Resource {
            transient,
            load_cost_weight,
        });
    }

    let num_machines = reader.next_count("machine count")?;
    let mut machines = Vec::with_capacity(num_machines);
    for m in 0..num_machines {
        let neighborhood = reader.next_u32("neighborhood")?;
        let location = reader.next_u32("location")?;
        let capacities = read_vec(&mut reader, num_resources, "capacity")?;
        let safety_capacities = read_vec(&mut reader, num_resources, "safety capacity")?;
        let move_costs = read_vec(&mut reader, num_machines, "machine move cost")?;
        if move_costs[m] != 0 {
            return Err(reader.error(format!(
                "machine {m}: move cost to itself must be 0, found {}",
                move_costs[m]
            )));
        }
        machines.push(Machine {
            neighborhood,
            location,
            capacities,
            safety_capacities,
            move_costs,
        });
    }

    let num_services = reader.next_count("service count")?;
    let mut services = Vec::with_capacity(num_services);
    for _ in 0..num_services {
        let spread_min = reader.next_u64("spread minimum")?;
        let move_cap = reader.next_u64("service move cap")?;
        let num_deps = reader.next_count("dependency count")?;
        let mut dependencies = Vec::with_capacity(num_deps);
        for _ in 0..num_deps {
            dependencies.push(reader.next_index("service", num_services)?);
        }
        services.push(Service {
            spread_min,
            move_cap,
            dependencies,
        });
    }

    let num_conflicts = reader.next_count("conflict pair count")?;
    let mut conflicts = Vec::with_capacity(num_conflicts);
    for _ in 0..num_conflicts {
        let a = reader.next_index("service", num_services)?;
        let b = reader.next_index("service", num_services)?;
        conflicts.push((a, b));
    }

    let num_processes = reader.next_count("process count")?;
    let mut processes = Vec::with_capacity(num_processes);
    for _ in 0..num_processes {
        let service = reader.next_index("service", num_services)?;
        let requirements = read_vec(&mut reader, num_resources, "requirement")?;
        let move_cost = reader.next_u64("process move cost")?;
        processes.push(Process {
            service,
            requirements,
            move_cost,
        });
    }

    let num_balance = reader.next_count("balance objective count")?;
    let mut balance_objectives = Vec::with_capacity(num_balance);
    for _ in 0..num_balance {
        let first = reader.next_index("resource", num_resources)?;
        let second = reader.next_index("resource", num_resources)?;
        let target = reader.next_u64("balance target")?;
        let weight = reader.next_u64("balance weight")?;
        balance_objectives.push(BalanceObjective {
            first,
            second,
            target,
            weight,
        });
    }

    let move_weights = MoveWeights {
        process_move: reader.next_u64("process move weight")?,
        service_move: reader.next_u64("service move weight")?,
        machine_move: reader.next_u64("machine move weight")?,
    };

    reader.finish()?;

    Ok(Instance {
        resources,
        machines,
        services,
        conflicts,
        processes,
        balance_objectives,
        move_weights,
    })
}

fn read_vec(reader: &mut TokenReader<'_>, len: usize, what: &str) -> CoreResult<Vec<u64>> {
    (0..len).map(|_| reader.next_u64(what)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const SMALL: &str = "\
2
0 10
1 100
3
0 0 30 20 24 16 0 1 2
0 1 30 20 24 16 1 0 1
1 2 30 20 24 16 2 1 0
2
2 0 0
1 2 1 0
1
0 1
3
0 12 10 1000
0 10 8 100
1 6 4 1
1
0 1 2 10
1 10 100
";

    #[test]
    fn parses_all_sections() {
        let instance = parse_instance("small", SMALL).unwrap();
        assert_eq!(instance.resources.len(), 2);
        assert!(instance.resources[1].transient);
        assert_eq!(instance.resources[1].load_cost_weight, 100);
        assert_eq!(instance.machines.len(), 3);
        assert_eq!(instance.machines[2].location, 2);
        assert_eq!(instance.machines[1].move_costs, vec![1, 0, 1]);
        assert_eq!(instance.services[1].dependencies, vec![0]);
        assert_eq!(instance.services[1].move_cap, 2);
        assert_eq!(instance.conflicts, vec![(0, 1)]);
        assert_eq!(instance.processes[2].service, 1);
        assert_eq!(instance.processes[0].move_cost, 1000);
        assert_eq!(instance.balance_objectives[0].target, 2);
        assert_eq!(instance.move_weights.machine_move, 100);
    }

    #[test]
    fn rejects_negative_capacity() {
        let text = SMALL.replacen("0 0 30 20", "0 0 -30 20", 1);
        let err = parse_instance("small", &text).unwrap_err();
        assert!(err.is_parse());
        assert!(err.to_string().contains("negative capacity"), "{err}");
        assert!(err.to_string().starts_with("small:5:"), "{err}");
    }

    #[test]
    fn rejects_unknown_service_reference() {
        let text = SMALL.replacen("1 2 1 0\n", "1 2 1 7\n", 1);
        let err = parse_instance("small", &text).unwrap_err();
        assert!(err.to_string().contains("unknown service 7"), "{err}");
    }

    #[test]
    fn rejects_truncated_input() {
        let truncated = &SMALL[..SMALL.len() - 8];
        let err = parse_instance("small", truncated).unwrap_err();
        assert!(err.to_string().contains("unexpected end of input"), "{err}");
    }

    #[test]
    fn rejects_trailing_tokens() {
        let text = format!("{SMALL}42\n");
        let err = parse_instance("small", &text).unwrap_err();
        assert!(err.to_string().contains("trailing"), "{err}");
    }

    #[test]
    fn rejects_dangling_conflict_pair() {
        let text = SMALL.replacen("1\n0 1\n3\n", "1\n0 5\n3\n", 1);
        let err = parse_instance("small", &text).unwrap_err();
        assert!(err.is_parse());
        assert!(err.to_string().contains("unknown service 5"), "{err}");
        assert!(err.to_string().starts_with("small:12:"), "{err}");
    }

    #[test]
    fn rejects_missing_conflict_section() {
        let text = SMALL.replacen("1\n0 1\n3\n", "3\n", 1);
        assert!(parse_instance("small", &text).is_err());
    }

    #[test]
    fn rejects_non_binary_transient_flag() {
        let text = SMALL.replacen("1 100", "2 100", 1);
        let err = parse_instance("small", &text).unwrap_err();
        assert!(err.to_string().contains("must be 0 or 1"), "{err}");
    }
}
