//! Benchmark result types and recording.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use autoclave_nesting::NestingSolution;

/// Result of a single scenario run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunRecord {
    /// Scenario name
    pub scenario: String,
    /// Container id
    pub container: String,
    /// Solver mode ("auto" or "heuristic")
    pub mode: String,
    /// Run index within the scenario
    pub run: usize,
    /// Total pieces offered
    pub total_pieces: usize,
    /// Pieces placed
    pub placed: usize,
    /// Pieces placed on the upper level
    pub upper_level: usize,
    /// Stands used
    pub stands: usize,
    /// Area utilization (%)
    pub area_utilization_pct: f64,
    /// Efficiency score (0-100)
    pub efficiency_score: f64,
    /// Algorithm status code
    pub status: String,
    /// Checker verdict
    pub valid: bool,
    /// Exact search nodes, when the exact search ran
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nodes_explored: Option<u64>,
    /// Computation time in milliseconds
    pub time_ms: u64,
}

impl RunRecord {
    /// Builds a record from a solved scenario.
    pub fn from_solution(
        scenario: &str,
        mode: &str,
        run: usize,
        total_pieces: usize,
        solution: &NestingSolution,
    ) -> Self {
        Self {
            scenario: scenario.to_string(),
            container: solution.container_id.clone(),
            mode: mode.to_string(),
            run,
            total_pieces,
            placed: solution.metrics.placed_count,
            upper_level: solution.metrics.upper_level_count,
            stands: solution.metrics.stand_count,
            area_utilization_pct: solution.metrics.area_utilization_pct,
            efficiency_score: solution.metrics.efficiency_score,
            status: solution.algorithm_status.to_string(),
            valid: solution.valid,
            nodes_explored: solution.metrics.search.as_ref().map(|s| s.nodes_explored),
            time_ms: solution.metrics.computation_time_ms,
        }
    }
}

/// Collection of run records.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct BenchmarkReport {
    /// Individual runs
    pub runs: Vec<RunRecord>,
    /// Seed of the synthetic workloads
    pub seed: u64,
    /// Crate version that produced the report
    pub version: String,
}

impl BenchmarkReport {
    /// Creates an empty report.
    pub fn new(seed: u64) -> Self {
        Self {
            runs: Vec::new(),
            seed,
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }

    /// Adds a run record.
    pub fn add_run(&mut self, record: RunRecord) {
        self.runs.push(record);
    }

    /// Runs whose layout failed the consistency check.
    pub fn invalid_runs(&self) -> impl Iterator<Item = &RunRecord> {
        self.runs.iter().filter(|r| !r.valid)
    }

    /// Serializes the report as pretty JSON.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    /// Saves the report to a JSON file.
    pub fn save_json(&self, path: impl AsRef<Path>) -> std::io::Result<()> {
        let json = self.to_json()?;
        fs::write(path, json)
    }

    /// Prints a summary table to stdout.
    pub fn print_summary(&self) {
        println!("\n{:=<104}", "");
        println!("AUTOCLAVE NESTING BENCHMARK (seed {})", self.seed);
        println!("{:=<104}", "");
        println!(
            "{:<18} {:<8} {:<10} {:>8} {:>6} {:>7} {:>8} {:>8} {:<11} {:>9}",
            "Scenario", "AC", "Mode", "Placed", "L1", "Stands", "Area%", "Score", "Status", "Time(ms)"
        );
        println!("{:-<104}", "");

        for run in &self.runs {
            println!(
                "{:<18} {:<8} {:<10} {:>4}/{:<3} {:>6} {:>7} {:>8.1} {:>8.1} {:<11} {:>9}{}",
                run.scenario,
                run.container,
                run.mode,
                run.placed,
                run.total_pieces,
                run.upper_level,
                run.stands,
                run.area_utilization_pct,
                run.efficiency_score,
                run.status,
                run.time_ms,
                if run.valid { "" } else { "  INVALID" }
            );
        }

        println!("{:=<104}\n", "");
    }
}
