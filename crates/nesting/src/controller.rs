//! Time budget and strategy selection.

use std::time::{Duration, Instant};

use autoclave_nesting_core::{AlgorithmStatus, SolverConfig};

use crate::exact::BranchAndBound;
use crate::heuristic::BottomLeftFill;
use crate::strategy::{LevelLayout, LevelRequest, PlacementStrategy, Strategy};

/// Share of the time left before a caller deadline the budget may use.
const DEADLINE_SHARE: f64 = 0.9;

/// How a level will be solved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionPlan {
    /// Heuristic only.
    HeuristicOnly,
    /// Exact search within `budget`, heuristic as fallback and comparison.
    ExactFirst {
        /// Exact-search budget.
        budget: Duration,
    },
    /// Heuristic, then an exact refinement seeded with its layout.
    HeuristicFirst {
        /// Refinement budget.
        refinement: Duration,
    },
}

/// Sizes the time budget and runs the chosen strategies.
pub struct StrategyController<'a> {
    config: &'a SolverConfig,
}

impl<'a> StrategyController<'a> {
    /// Creates a controller.
    pub fn new(config: &'a SolverConfig) -> Self {
        Self { config }
    }

    /// Time budget for `pieces` pieces spread over `containers` containers.
    ///
    /// `calibration · n·log2(n) · containers`, clamped to the configured bounds
    /// and to 90% of the time left before `deadline`.
    pub fn time_budget(
        &self,
        pieces: usize,
        containers: usize,
        deadline: Option<Instant>,
    ) -> Duration {
        let n = pieces.max(2) as f64;
        let estimate = self.config.calibration_ms * n * n.log2() * containers.max(1) as f64;
        let min = self.config.min_time_ms as f64;
        let max = self.config.max_time_ms as f64;
        let mut budget = Duration::from_secs_f64(estimate.clamp(min, max) / 1000.0);

        if let Some(deadline) = deadline {
            let left = deadline.saturating_duration_since(Instant::now());
            budget = budget.min(left.mul_f64(DEADLINE_SHARE));
        }
        budget
    }

    /// Chooses the plan for a level of `pieces` pieces.
    pub fn plan(&self, pieces: usize, containers: usize, deadline: Option<Instant>) -> ExecutionPlan {
        if !self.config.exact_enabled {
            return ExecutionPlan::HeuristicOnly;
        }
        let budget = self.time_budget(pieces, containers, deadline);
        if budget.is_zero() {
            return ExecutionPlan::HeuristicOnly;
        }
        if pieces <= self.config.heuristic_threshold {
            ExecutionPlan::ExactFirst { budget }
        } else {
            ExecutionPlan::HeuristicFirst {
                refinement: budget.mul_f64(self.config.refinement_fraction),
            }
        }
    }

    /// Solves one level following the plan for its size.
    pub fn execute(&self, request: &LevelRequest<'_>, containers: usize) -> LevelLayout {
        let plan = self.plan(
            request.pieces.len(),
            containers,
            request.deadline.instant(),
        );
        log::info!(
            "Solving {} with {} pieces: {:?}",
            request.level,
            request.pieces.len(),
            plan
        );

        let heuristic = Strategy::Heuristic(BottomLeftFill::new(self.config));
        match plan {
            ExecutionPlan::HeuristicOnly => heuristic.place(request),
            ExecutionPlan::ExactFirst { budget } => {
                let exact =
                    Strategy::Exact(BranchAndBound::new(self.config).with_budget(budget));
                let exact_layout = exact.place(request);
                match exact_layout.status {
                    AlgorithmStatus::Optimal => exact_layout,
                    AlgorithmStatus::Infeasible | AlgorithmStatus::TimeoutNoSolution => {
                        log::warn!(
                            "Exact search ended {}, falling back to {}",
                            exact_layout.status,
                            heuristic.name()
                        );
                        with_stats(heuristic.place(request), &exact_layout)
                    }
                    _ => {
                        let heuristic_layout = heuristic.place(request);
                        self.better(request, exact_layout, heuristic_layout)
                    }
                }
            }
            ExecutionPlan::HeuristicFirst { refinement } => {
                let heuristic_layout = heuristic.place(request);
                if heuristic_layout.is_complete() || refinement.is_zero() {
                    return heuristic_layout;
                }
                let exact = Strategy::Exact(
                    BranchAndBound::new(self.config)
                        .with_budget(refinement)
                        .with_incumbent(heuristic_layout.placements.clone()),
                );
                let refined = exact.place(request);
                self.better(request, refined, heuristic_layout)
            }
        }
    }

    /// The layout with the higher objective; the heuristic keeps ties.
    fn better(
        &self,
        request: &LevelRequest<'_>,
        exact: LevelLayout,
        heuristic: LevelLayout,
    ) -> LevelLayout {
        let weights = &self.config.objective;
        let exact_value = request.objective(&exact.placements, weights);
        let heuristic_value = request.objective(&heuristic.placements, weights);
        if exact_value > heuristic_value + 1e-9 {
            log::debug!(
                "Exact layout kept ({:.3} over {:.3})",
                exact_value,
                heuristic_value
            );
            exact
        } else {
            with_stats(heuristic, &exact)
        }
    }
}

fn with_stats(mut layout: LevelLayout, exact: &LevelLayout) -> LevelLayout {
    layout.stats = exact.stats.clone();
    layout
}

#[cfg(test)]
mod tests {
    use super::*;
    use autoclave_nesting_core::{Container, Level, Piece};

    #[test]
    fn test_budget_clamped() {
        let config = SolverConfig::default();
        let controller = StrategyController::new(&config);

        assert_eq!(controller.time_budget(1, 1, None), Duration::from_millis(5_000));
        assert_eq!(
            controller.time_budget(10_000, 1, None),
            Duration::from_millis(60_000)
        );
        // 20 ms * 64 * log2(64) = 7.68 s
        let budget = controller.time_budget(64, 1, None);
        assert!((budget.as_secs_f64() - 7.68).abs() < 1e-6);
        assert!(controller.time_budget(64, 3, None) > budget);
    }

    #[test]
    fn test_budget_capped_by_deadline() {
        let config = SolverConfig::default();
        let controller = StrategyController::new(&config);
        let deadline = Instant::now() + Duration::from_secs(2);
        let budget = controller.time_budget(5, 1, Some(deadline));
        assert!(budget <= Duration::from_millis(1_800));
    }

    #[test]
    fn test_plan_selection() {
        let config = SolverConfig::default();
        let controller = StrategyController::new(&config);

        assert!(matches!(
            controller.plan(8, 1, None),
            ExecutionPlan::ExactFirst { .. }
        ));
        match controller.plan(40, 1, None) {
            ExecutionPlan::HeuristicFirst { refinement } => {
                let full = controller.time_budget(40, 1, None);
                assert!((refinement.as_secs_f64() - full.as_secs_f64() * 0.25).abs() < 1e-6);
            }
            other => panic!("unexpected plan {:?}", other),
        }

        let disabled = SolverConfig::heuristic_only();
        assert_eq!(
            StrategyController::new(&disabled).plan(3, 1, None),
            ExecutionPlan::HeuristicOnly
        );
        assert_eq!(
            controller.plan(3, 1, Some(Instant::now())),
            ExecutionPlan::HeuristicOnly
        );
    }

    #[test]
    fn test_execute_small_instance_is_exact() {
        let config = SolverConfig::default().with_time_bounds(100, 2_000);
        let controller = StrategyController::new(&config);
        let container = Container::new("AC", 1000.0, 1000.0);
        let pieces = vec![Piece::new("A", 400.0, 300.0), Piece::new("B", 500.0, 200.0)];
        let request = LevelRequest::new(Level::Base, pieces.iter().collect(), &container, &config);

        let layout = controller.execute(&request, 1);
        assert_eq!(layout.status, AlgorithmStatus::Optimal);
        assert_eq!(layout.placements.len(), 2);
    }

    #[test]
    fn test_execute_heuristic_only_when_disabled() {
        let config = SolverConfig::heuristic_only();
        let controller = StrategyController::new(&config);
        let container = Container::new("AC", 1000.0, 1000.0);
        let pieces = vec![Piece::new("A", 400.0, 300.0)];
        let request = LevelRequest::new(Level::Base, pieces.iter().collect(), &container, &config);

        let layout = controller.execute(&request, 1);
        assert_eq!(layout.status, AlgorithmStatus::Heuristic);
        assert!(layout.stats.is_none());
    }
}
