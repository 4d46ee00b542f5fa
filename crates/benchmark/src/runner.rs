//! Scenario runner for synthetic workloads.

use autoclave_nesting::{Container, Nester, Piece, SolverConfig};

use crate::result::{BenchmarkReport, RunRecord};
use crate::synthetic::{SyntheticContainers, SyntheticGenerator};

/// How the solver is configured for a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SolverMode {
    /// Strategy chosen from problem size, exact search allowed.
    Auto,
    /// Bottom-left fill only.
    Heuristic,
}

impl SolverMode {
    /// Label used in reports.
    pub fn label(self) -> &'static str {
        match self {
            Self::Auto => "auto",
            Self::Heuristic => "heuristic",
        }
    }
}

/// Configuration for benchmark runs.
#[derive(Debug, Clone)]
pub struct RunnerConfig {
    /// Solver modes to compare.
    pub modes: Vec<SolverMode>,
    /// Upper bound on the solve budget in milliseconds.
    pub time_limit_ms: u64,
    /// Number of runs per scenario and mode.
    pub runs_per_scenario: usize,
    /// Seed of the synthetic workloads.
    pub seed: u64,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            modes: vec![SolverMode::Auto, SolverMode::Heuristic],
            time_limit_ms: 10_000,
            runs_per_scenario: 1,
            seed: 42,
        }
    }
}

impl RunnerConfig {
    /// Creates a new runner configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the modes to compare.
    pub fn with_modes(mut self, modes: Vec<SolverMode>) -> Self {
        self.modes = modes;
        self
    }

    /// Sets the time limit per run.
    pub fn with_time_limit(mut self, ms: u64) -> Self {
        self.time_limit_ms = ms;
        self
    }

    /// Sets the number of runs per scenario.
    pub fn with_runs_per_scenario(mut self, n: usize) -> Self {
        self.runs_per_scenario = n;
        self
    }

    /// Sets the workload seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    fn solver_config(&self, mode: SolverMode) -> SolverConfig {
        let config = match mode {
            SolverMode::Auto => SolverConfig::default(),
            SolverMode::Heuristic => SolverConfig::heuristic_only(),
        };
        let min_ms = config.min_time_ms.min(self.time_limit_ms);
        config.with_time_bounds(min_ms, self.time_limit_ms)
    }
}

/// A named workload.
#[derive(Debug, Clone)]
pub struct Scenario {
    /// Scenario name.
    pub name: String,
    /// Pieces offered.
    pub pieces: Vec<Piece>,
    /// Target container.
    pub container: Container,
}

impl Scenario {
    /// Creates a scenario.
    pub fn new(name: impl Into<String>, pieces: Vec<Piece>, container: Container) -> Self {
        Self {
            name: name.into(),
            pieces,
            container,
        }
    }

    /// The standard scenario set generated from `seed`.
    pub fn standard_set(seed: u64) -> Vec<Scenario> {
        let mut generator = SyntheticGenerator::with_seed(seed);
        vec![
            Scenario::new("small-exact", generator.mixed(8), SyntheticContainers::small()),
            Scenario::new("mixed-50", generator.mixed(50), SyntheticContainers::large()),
            Scenario::new("mixed-120", generator.mixed(120), SyntheticContainers::large()),
            Scenario::new("heavy-two-level", generator.heavy(10), SyntheticContainers::two_level()),
            Scenario::new("tall-two-level", generator.tall(30), SyntheticContainers::two_level()),
        ]
    }
}

/// Runs scenarios and records their outcome.
pub struct ScenarioRunner {
    config: RunnerConfig,
}

impl ScenarioRunner {
    /// Creates a new runner.
    pub fn new(config: RunnerConfig) -> Self {
        Self { config }
    }

    /// Runs one scenario under every configured mode.
    pub fn run_scenario(&self, scenario: &Scenario) -> Vec<RunRecord> {
        let mut records = Vec::new();
        for &mode in &self.config.modes {
            let nester = Nester::new(self.config.solver_config(mode));
            for run in 0..self.config.runs_per_scenario {
                match nester.solve(&scenario.pieces, &scenario.container) {
                    Ok(solution) => records.push(RunRecord::from_solution(
                        &scenario.name,
                        mode.label(),
                        run,
                        scenario.pieces.len(),
                        &solution,
                    )),
                    Err(e) => log::error!("{} ({}): {}", scenario.name, mode.label(), e),
                }
            }
        }
        records
    }

    /// Runs the given scenarios, optionally restricted to names containing `filter`.
    pub fn run(&self, scenarios: &[Scenario], filter: Option<&str>) -> BenchmarkReport {
        let mut report = BenchmarkReport::new(self.config.seed);
        for scenario in scenarios {
            if filter.is_some_and(|f| !scenario.name.contains(f)) {
                continue;
            }
            log::info!(
                "Running {} ({} pieces in {})",
                scenario.name,
                scenario.pieces.len(),
                scenario.container.id()
            );
            for record in self.run_scenario(scenario) {
                report.add_run(record);
            }
        }
        report
    }

    /// Runs the standard scenario set.
    pub fn run_standard(&self, filter: Option<&str>) -> BenchmarkReport {
        self.run(&Scenario::standard_set(self.config.seed), filter)
    }
}
