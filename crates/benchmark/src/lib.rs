//! Benchmark Suite for Autoclave Nesting
//!
//! This crate provides:
//! - Seeded synthetic workloads (mixed, heavy and tall tool batches)
//! - A scenario runner comparing solver modes
//! - Result recording as a table or JSON

mod result;
mod runner;
mod synthetic;

pub use result::{BenchmarkReport, RunRecord};
pub use runner::{RunnerConfig, Scenario, ScenarioRunner, SolverMode};
pub use synthetic::{SyntheticContainers, SyntheticGenerator};
