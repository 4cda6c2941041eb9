use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand, ValueEnum};
use reassign_core::StrategyKind;
use reassign_solver::SolverError;

mod commands;

#[derive(Parser, Debug)]
#[command(
    name = "reassign",
    about = "Machine reassignment — optimize and check process placements",
    version,
    propagate_version = true,
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Optimize a baseline assignment and write the result.
    ///
    /// Settings come from --config (TOML) when given; flags override them.
    Solve(SolveArgs),
    /// Validate and price an existing solution file.
    Check(CheckArgs),
}

#[derive(Args, Debug)]
struct SolveArgs {
    /// Instance description
    #[arg(short = 'p', long, required_unless_present = "name")]
    instance: Option<PathBuf>,
    /// Baseline assignment
    #[arg(short = 'i', long, required_unless_present = "name")]
    baseline: Option<PathBuf>,
    /// Destination for the solution
    #[arg(short = 'o', long, required_unless_present_any = ["name", "no_output"])]
    output: Option<PathBuf>,
    /// Wall-clock budget in seconds
    #[arg(short = 't', long)]
    time_limit: Option<u64>,
    /// Seed for the search order
    #[arg(short = 's', long)]
    seed: Option<u64>,
    /// Solver configuration file (TOML)
    #[arg(long)]
    config: Option<PathBuf>,
    /// Optimizer strategy (identity, local-search)
    #[arg(long)]
    strategy: Option<StrategyKind>,
    /// Write the baseline unchanged without optimizing
    #[arg(long, conflicts_with = "no_output")]
    passthrough: bool,
    /// Optimize nothing and write nothing
    #[arg(long)]
    no_output: bool,
    /// Print the solver identifier and exit
    #[arg(long)]
    name: bool,
}

#[derive(Args, Debug)]
struct CheckArgs {
    /// Instance description
    #[arg(short = 'p', long)]
    instance: PathBuf,
    /// Baseline assignment
    #[arg(short = 'i', long)]
    baseline: PathBuf,
    /// Solution to check
    #[arg(short = 'x', long)]
    solution: PathBuf,
    /// Output format
    #[arg(short, long, value_enum, default_value_t = Format::Text)]
    format: Format,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum Format {
    Text,
    Json,
}

fn main() -> ExitCode {
    if let Err(e) = init_tracing() {
        eprintln!("error: {e:#}");
        return ExitCode::FAILURE;
    }

    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            // Help and version requests are not failures.
            let benign = !e.use_stderr();
            let _ = e.print();
            return if benign {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            };
        }
    };

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => match e.downcast_ref::<SolverError>() {
            Some(stop) if stop.is_benign() => {
                println!("{stop}");
                ExitCode::SUCCESS
            }
            _ => {
                eprintln!("error: {e:#}");
                ExitCode::FAILURE
            }
        },
    }
}

fn init_tracing() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("reassign=info".parse()?),
        )
        .with_writer(std::io::stderr)
        .init();
    Ok(())
}

fn run(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Commands::Solve(args) => commands::solve::solve(args.into()),
        Commands::Check(args) => commands::check::check(
            &args.instance,
            &args.baseline,
            &args.solution,
            args.format == Format::Json,
        ),
    }
}

impl From<SolveArgs> for commands::solve::SolveOptions {
    fn from(args: SolveArgs) -> Self {
        Self {
            instance: args.instance,
            baseline: args.baseline,
            output: args.output,
            time_limit: args.time_limit,
            seed: args.seed,
            config: args.config,
            strategy: args.strategy,
            passthrough: args.passthrough,
            no_output: args.no_output,
            name: args.name,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_solve_flags_parse() {
        let cli = Cli::try_parse_from([
            "reassign", "solve", "-p", "m.txt", "-i", "a.txt", "-o", "s.txt", "-t", "5", "-s",
            "7", "--strategy", "identity",
        ])
        .unwrap();
        let Commands::Solve(args) = cli.command else {
            panic!("expected solve");
        };
        assert_eq!(args.instance, Some(PathBuf::from("m.txt")));
        assert_eq!(args.time_limit, Some(5));
        assert_eq!(args.seed, Some(7));
        assert_eq!(args.strategy, Some(StrategyKind::Identity));
        assert!(!args.passthrough);
    }

    #[test]
    fn test_name_needs_no_paths() {
        let cli = Cli::try_parse_from(["reassign", "solve", "--name"]).unwrap();
        assert!(matches!(cli.command, Commands::Solve(SolveArgs { name: true, .. })));
    }

    #[test]
    fn test_missing_paths_rejected() {
        assert!(Cli::try_parse_from(["reassign", "solve", "-p", "m.txt"]).is_err());
    }

    #[test]
    fn test_modes_conflict() {
        let result = Cli::try_parse_from([
            "reassign",
            "solve",
            "-p",
            "m.txt",
            "-i",
            "a.txt",
            "-o",
            "s.txt",
            "--passthrough",
            "--no-output",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_help_is_benign() {
        let err = Cli::try_parse_from(["reassign", "--help"]).unwrap_err();
        assert!(!err.use_stderr());
    }

    #[test]
    fn test_check_format_json() {
        let cli = Cli::try_parse_from([
            "reassign", "check", "-p", "m.txt", "-i", "a.txt", "-x", "s.txt", "--format", "json",
        ])
        .unwrap();
        let Commands::Check(args) = cli.command else {
            panic!("expected check");
        };
        assert_eq!(args.format, Format::Json);
    }
}
