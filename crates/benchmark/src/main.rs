//! Autoclave nesting benchmark CLI

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use autoclave_nesting_benchmark::{RunnerConfig, Scenario, ScenarioRunner, SolverMode};

#[derive(Parser)]
#[command(name = "autoclave-nesting-bench")]
#[command(about = "Synthetic benchmark runner for the autoclave nesting engine")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the standard scenarios
    List {
        /// Workload seed
        #[arg(short, long, default_value = "42")]
        seed: u64,
    },

    /// Run the standard scenarios
    Run {
        /// Only run scenarios whose name contains this text
        #[arg(short, long)]
        filter: Option<String>,

        /// Solver modes to compare
        #[arg(short, long, value_enum, default_values_t = vec![ModeArg::Auto, ModeArg::Heuristic])]
        modes: Vec<ModeArg>,

        /// Time limit per run in milliseconds
        #[arg(short, long, default_value = "10000")]
        time_limit: u64,

        /// Number of runs per scenario and mode
        #[arg(short, long, default_value = "1")]
        runs: usize,

        /// Workload seed
        #[arg(short, long, default_value = "42")]
        seed: u64,

        /// Output format
        #[arg(long, value_enum, default_value = "table")]
        format: Format,

        /// Output file for results (JSON)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum ModeArg {
    /// Strategy chosen from problem size
    Auto,
    /// Bottom-left fill only
    Heuristic,
}

impl From<ModeArg> for SolverMode {
    fn from(arg: ModeArg) -> Self {
        match arg {
            ModeArg::Auto => SolverMode::Auto,
            ModeArg::Heuristic => SolverMode::Heuristic,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum Format {
    /// Summary table
    Table,
    /// Pretty JSON on stdout
    Json,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::List { seed } => {
            println!("Standard scenarios (seed {}):", seed);
            println!("============================");
            for scenario in Scenario::standard_set(seed) {
                println!(
                    "  - {:<18} {:>4} pieces in {}",
                    scenario.name,
                    scenario.pieces.len(),
                    scenario.container.id()
                );
            }
        }

        Commands::Run {
            filter,
            modes,
            time_limit,
            runs,
            seed,
            format,
            output,
        } => {
            let config = RunnerConfig::new()
                .with_modes(modes.into_iter().map(Into::into).collect())
                .with_time_limit(time_limit)
                .with_runs_per_scenario(runs)
                .with_seed(seed);

            let report = ScenarioRunner::new(config).run_standard(filter.as_deref());

            match format {
                Format::Table => report.print_summary(),
                Format::Json => println!("{}", report.to_json()?),
            }

            if let Some(path) = output {
                report.save_json(&path)?;
                println!("Results saved to: {}", path.display());
            }

            let invalid = report.invalid_runs().count();
            if invalid > 0 {
                anyhow::bail!("{} runs produced layouts that failed the consistency check", invalid);
            }
        }
    }

    Ok(())
}
