//! Algorithm status and search statistics.
//!
//! The exact strategy reports how its search ended through [`AlgorithmStatus`];
//! [`SearchStats`] carries the objective, the bound and the node count so the
//! caller can judge how far from proven optimality a layout is.
//!
//! # Example
//!
//! ```rust
//! use autoclave_nesting_core::exact::{AlgorithmStatus, SearchStats};
//!
//! let stats = SearchStats::timeout(Some(9.0), 10.0).with_nodes(4200);
//! assert_eq!(stats.status, AlgorithmStatus::TimeoutWithSolution);
//! assert!((stats.gap - 0.1111).abs() < 1e-3);
//! ```

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// How the layout of a level (or of a whole solution) was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum AlgorithmStatus {
    /// Proven optimal for the objective.
    #[default]
    Optimal,
    /// Feasible layout, optimality not proven.
    Feasible,
    /// No piece can be placed at all.
    Infeasible,
    /// The deadline or node budget expired; the best layout found is returned.
    TimeoutWithSolution,
    /// The deadline or node budget expired before any layout was found.
    TimeoutNoSolution,
    /// Produced by the deterministic heuristic.
    Heuristic,
}

impl AlgorithmStatus {
    /// Stable upper-case code.
    pub fn code(self) -> &'static str {
        match self {
            Self::Optimal => "OPTIMAL",
            Self::Feasible => "FEASIBLE",
            Self::Infeasible => "INFEASIBLE",
            Self::TimeoutWithSolution => "TIMEOUT_WITH_SOLUTION",
            Self::TimeoutNoSolution => "TIMEOUT_NO_SOLUTION",
            Self::Heuristic => "HEURISTIC",
        }
    }

    /// Returns true if the status carries a usable layout.
    pub fn has_solution(self) -> bool {
        !matches!(self, Self::Infeasible | Self::TimeoutNoSolution)
    }

    /// Returns true if the search stopped because time or nodes ran out.
    pub fn is_timeout(self) -> bool {
        matches!(self, Self::TimeoutWithSolution | Self::TimeoutNoSolution)
    }
}

impl std::fmt::Display for AlgorithmStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.code())
    }
}

/// Statistics reported by the exact search.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SearchStats {
    /// How the search ended.
    pub status: AlgorithmStatus,
    /// Best objective value found (higher is better).
    pub objective_value: f64,
    /// Upper bound on the optimal objective.
    pub best_bound: f64,
    /// Relative gap: (bound - objective) / bound.
    pub gap: f64,
    /// Number of search nodes explored.
    pub nodes_explored: u64,
    /// Wall-clock time spent searching (ms).
    pub elapsed_ms: u64,
}

impl SearchStats {
    /// Search proved the objective optimal.
    pub fn optimal(objective: f64) -> Self {
        Self {
            status: AlgorithmStatus::Optimal,
            objective_value: objective,
            best_bound: objective,
            gap: 0.0,
            ..Default::default()
        }
    }

    /// Search completed with a layout whose optimality is not proven.
    pub fn feasible(objective: f64, bound: f64) -> Self {
        Self {
            status: AlgorithmStatus::Feasible,
            objective_value: objective,
            best_bound: bound,
            gap: relative_gap(objective, bound),
            ..Default::default()
        }
    }

    /// Search completed and nothing can be placed.
    pub fn infeasible() -> Self {
        Self {
            status: AlgorithmStatus::Infeasible,
            objective_value: 0.0,
            best_bound: 0.0,
            gap: 0.0,
            ..Default::default()
        }
    }

    /// Search interrupted by the deadline or node budget.
    pub fn timeout(best_objective: Option<f64>, bound: f64) -> Self {
        match best_objective {
            Some(objective) => Self {
                status: AlgorithmStatus::TimeoutWithSolution,
                objective_value: objective,
                best_bound: bound,
                gap: relative_gap(objective, bound),
                ..Default::default()
            },
            None => Self {
                status: AlgorithmStatus::TimeoutNoSolution,
                objective_value: 0.0,
                best_bound: bound,
                gap: 1.0,
                ..Default::default()
            },
        }
    }

    /// Sets the node count.
    pub fn with_nodes(mut self, nodes: u64) -> Self {
        self.nodes_explored = nodes;
        self
    }

    /// Sets the elapsed time.
    pub fn with_elapsed(mut self, elapsed_ms: u64) -> Self {
        self.elapsed_ms = elapsed_ms;
        self
    }
}

fn relative_gap(objective: f64, bound: f64) -> f64 {
    if bound.abs() > 1e-10 {
        ((bound - objective) / bound).abs()
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(AlgorithmStatus::Optimal.to_string(), "OPTIMAL");
        assert_eq!(
            AlgorithmStatus::TimeoutNoSolution.to_string(),
            "TIMEOUT_NO_SOLUTION"
        );
        assert!(AlgorithmStatus::Heuristic.has_solution());
        assert!(!AlgorithmStatus::Infeasible.has_solution());
        assert!(AlgorithmStatus::TimeoutWithSolution.is_timeout());
    }

    #[test]
    fn test_stats_constructors() {
        let optimal = SearchStats::optimal(12.0);
        assert_eq!(optimal.gap, 0.0);
        assert_eq!(optimal.best_bound, 12.0);

        let feasible = SearchStats::feasible(9.5, 10.0);
        assert_eq!(feasible.status, AlgorithmStatus::Feasible);
        assert!((feasible.gap - 0.05).abs() < 1e-10);

        let none = SearchStats::timeout(None, 4.0);
        assert_eq!(none.status, AlgorithmStatus::TimeoutNoSolution);
        assert_eq!(none.gap, 1.0);
    }

    #[test]
    fn test_stats_builder() {
        let stats = SearchStats::optimal(1.0).with_nodes(77).with_elapsed(15);
        assert_eq!(stats.nodes_explored, 77);
        assert_eq!(stats.elapsed_ms, 15);
    }
}
