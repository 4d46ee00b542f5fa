//! Solver configuration.
//!
//! Every solve call receives one explicit [`SolverConfig`]; there are no
//! process-wide defaults.

use crate::{Error, Result};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Weights of the exact-search objective.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ObjectiveWeights {
    /// Weight of each placed piece.
    pub count: f64,
    /// Weight of the placed area, as a fraction of the plan.
    pub area: f64,
    /// How strongly priority scales the value of a piece.
    pub priority_scale: f64,
}

impl Default for ObjectiveWeights {
    fn default() -> Self {
        Self {
            count: 1.0,
            area: 0.5,
            priority_scale: 0.1,
        }
    }
}

impl ObjectiveWeights {
    /// Value of a placed piece of the given priority and area.
    pub fn piece_value(&self, priority: i32, area: f64, plan_area: f64) -> f64 {
        let priority_factor = (1.0 + self.priority_scale * priority as f64).max(0.1);
        let area_share = if plan_area > 0.0 { area / plan_area } else { 0.0 };
        self.count * priority_factor + self.area * area_share
    }
}

/// Configuration for one solve call.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SolverConfig {
    /// Minimum gap between two pieces on the same level (mm).
    pub margin: f64,

    /// Keep-out band along the container walls (mm).
    pub edge_clearance: f64,

    /// Scan step of the heuristic (mm).
    pub grid_step: f64,

    /// Whether the exact strategy may run.
    pub exact_enabled: bool,

    /// Worker threads for the exact search (0 = auto).
    pub workers: usize,

    /// Lower bound of the time budget (ms).
    pub min_time_ms: u64,

    /// Upper bound of the time budget (ms).
    pub max_time_ms: u64,

    /// Milliseconds granted per unit of `n log2 n`.
    pub calibration_ms: f64,

    /// Above this piece count the heuristic runs first.
    pub heuristic_threshold: usize,

    /// Share of the budget given to the exact refinement pass (0.0 - 1.0).
    pub refinement_fraction: f64,

    /// Optional node cap for the exact search.
    pub max_nodes: Option<u64>,

    /// Aspect ratio above which a rotatable piece gets a forced orientation.
    pub aspect_ratio_threshold: f64,

    /// Heaviest piece allowed on the elevated level (kg).
    pub upper_max_piece_weight: Option<f64>,

    /// Widest piece allowed on the elevated level (mm).
    pub upper_max_width: Option<f64>,

    /// Longest piece allowed on the elevated level (mm).
    pub upper_max_height: Option<f64>,

    /// Tallest piece allowed on the elevated level (mm).
    pub upper_max_clearance: Option<f64>,

    /// Fill level 0 completely before offering level 1.
    pub prefer_base_level: bool,

    /// Penalty applied to level-1 candidates when balancing (0.0 - 1.0).
    pub upper_level_penalty: f64,

    /// Width of a stand along the travel axis (mm).
    pub stand_width: f64,

    /// Exact-search objective weights.
    pub objective: ObjectiveWeights,

    /// Restrict the batch to one cure cycle.
    pub cure_cycle: Option<String>,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            margin: 5.0,
            edge_clearance: 0.0,
            grid_step: 10.0,
            exact_enabled: true,
            workers: 0,
            min_time_ms: 5_000,
            max_time_ms: 60_000,
            calibration_ms: 20.0,
            heuristic_threshold: 12,
            refinement_fraction: 0.25,
            max_nodes: None,
            aspect_ratio_threshold: 3.0,
            upper_max_piece_weight: None,
            upper_max_width: None,
            upper_max_height: None,
            upper_max_clearance: None,
            prefer_base_level: false,
            upper_level_penalty: 0.03,
            stand_width: 80.0,
            objective: ObjectiveWeights::default(),
            cure_cycle: None,
        }
    }
}

impl SolverConfig {
    /// Creates a new configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Deterministic heuristic-only configuration.
    pub fn heuristic_only() -> Self {
        Self::default().with_exact(false)
    }

    /// Sets the gap between pieces.
    pub fn with_margin(mut self, margin: f64) -> Self {
        self.margin = margin;
        self
    }

    /// Sets the keep-out band along the walls.
    pub fn with_edge_clearance(mut self, clearance: f64) -> Self {
        self.edge_clearance = clearance;
        self
    }

    /// Sets the heuristic scan step.
    pub fn with_grid_step(mut self, step: f64) -> Self {
        self.grid_step = step;
        self
    }

    /// Enables or disables the exact strategy.
    pub fn with_exact(mut self, enabled: bool) -> Self {
        self.exact_enabled = enabled;
        self
    }

    /// Sets the number of exact-search workers.
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    /// Sets the time budget bounds in milliseconds.
    pub fn with_time_bounds(mut self, min_ms: u64, max_ms: u64) -> Self {
        self.min_time_ms = min_ms;
        self.max_time_ms = max_ms;
        self
    }

    /// Sets the calibration constant.
    pub fn with_calibration_ms(mut self, ms: f64) -> Self {
        self.calibration_ms = ms;
        self
    }

    /// Sets the piece count above which the heuristic runs first.
    pub fn with_heuristic_threshold(mut self, threshold: usize) -> Self {
        self.heuristic_threshold = threshold;
        self
    }

    /// Sets the refinement share of the budget.
    pub fn with_refinement_fraction(mut self, fraction: f64) -> Self {
        self.refinement_fraction = fraction.clamp(0.0, 1.0);
        self
    }

    /// Caps the exact search at a number of nodes.
    pub fn with_max_nodes(mut self, nodes: u64) -> Self {
        self.max_nodes = Some(nodes);
        self
    }

    /// Sets the long/thin aspect ratio threshold.
    pub fn with_aspect_ratio_threshold(mut self, ratio: f64) -> Self {
        self.aspect_ratio_threshold = ratio;
        self
    }

    /// Sets the heaviest piece allowed on level 1.
    pub fn with_upper_max_piece_weight(mut self, weight: f64) -> Self {
        self.upper_max_piece_weight = Some(weight);
        self
    }

    /// Sets the largest footprint allowed on level 1.
    pub fn with_upper_max_footprint(mut self, width: f64, height: f64) -> Self {
        self.upper_max_width = Some(width);
        self.upper_max_height = Some(height);
        self
    }

    /// Sets the tallest piece allowed on level 1.
    pub fn with_upper_max_clearance(mut self, clearance: f64) -> Self {
        self.upper_max_clearance = Some(clearance);
        self
    }

    /// Fills level 0 before offering level 1.
    pub fn with_prefer_base_level(mut self, prefer: bool) -> Self {
        self.prefer_base_level = prefer;
        self
    }

    /// Sets the level-1 penalty.
    pub fn with_upper_level_penalty(mut self, penalty: f64) -> Self {
        self.upper_level_penalty = penalty;
        self
    }

    /// Sets the stand width.
    pub fn with_stand_width(mut self, width: f64) -> Self {
        self.stand_width = width;
        self
    }

    /// Sets the objective weights.
    pub fn with_objective(mut self, objective: ObjectiveWeights) -> Self {
        self.objective = objective;
        self
    }

    /// Restricts the batch to one cure cycle.
    pub fn with_cure_cycle(mut self, cure_cycle: impl Into<String>) -> Self {
        self.cure_cycle = Some(cure_cycle.into());
        self
    }

    /// Worker count with `0` resolved to the number of available cores.
    pub fn effective_workers(&self) -> usize {
        if self.workers > 0 {
            self.workers
        } else {
            std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1)
        }
    }

    /// Validates the configuration.
    pub fn validate(&self) -> Result<()> {
        let non_negative = [
            ("margin", self.margin),
            ("edge_clearance", self.edge_clearance),
            ("calibration_ms", self.calibration_ms),
            ("objective.count", self.objective.count),
            ("objective.area", self.objective.area),
            ("objective.priority_scale", self.objective.priority_scale),
        ];
        for (name, value) in non_negative {
            if !value.is_finite() || value < 0.0 {
                return Err(Error::ConfigError(format!(
                    "{} must be finite and non-negative (got {})",
                    name, value
                )));
            }
        }
        if !self.grid_step.is_finite() || self.grid_step <= 0.0 {
            return Err(Error::ConfigError(format!(
                "grid_step must be positive (got {})",
                self.grid_step
            )));
        }
        if !self.stand_width.is_finite() || self.stand_width <= 0.0 {
            return Err(Error::ConfigError(format!(
                "stand_width must be positive (got {})",
                self.stand_width
            )));
        }
        if self.min_time_ms > self.max_time_ms {
            return Err(Error::ConfigError(format!(
                "min_time_ms ({}) exceeds max_time_ms ({})",
                self.min_time_ms, self.max_time_ms
            )));
        }
        if !(0.0..=1.0).contains(&self.upper_level_penalty) {
            return Err(Error::ConfigError(format!(
                "upper_level_penalty must lie in [0, 1] (got {})",
                self.upper_level_penalty
            )));
        }
        if !(0.0..=1.0).contains(&self.refinement_fraction) {
            return Err(Error::ConfigError(format!(
                "refinement_fraction must lie in [0, 1] (got {})",
                self.refinement_fraction
            )));
        }
        if self.aspect_ratio_threshold.is_nan() || self.aspect_ratio_threshold < 1.0 {
            return Err(Error::ConfigError(
                "aspect_ratio_threshold must be at least 1".into(),
            ));
        }
        let limits = [
            ("upper_max_piece_weight", self.upper_max_piece_weight),
            ("upper_max_width", self.upper_max_width),
            ("upper_max_height", self.upper_max_height),
            ("upper_max_clearance", self.upper_max_clearance),
        ];
        for (name, limit) in limits {
            if let Some(value) = limit {
                if value.is_nan() || value < 0.0 {
                    return Err(Error::ConfigError(format!(
                        "{} must be non-negative (got {})",
                        name, value
                    )));
                }
            }
        }
        Ok(())
    }

    /// Parses a configuration from JSON.
    #[cfg(feature = "serde")]
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| Error::SerializationError(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Serializes the configuration to JSON.
    #[cfg(feature = "serde")]
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(|e| Error::SerializationError(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_permissive() {
        let config = SolverConfig::default();
        assert!(!config.prefer_base_level);
        assert!(config.upper_level_penalty <= 0.05);
        assert!(config.upper_max_piece_weight.is_none());
        assert!(config.upper_max_width.is_none());
        assert_eq!(config.grid_step, 10.0);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_builder() {
        let config = SolverConfig::new()
            .with_margin(2.0)
            .with_exact(false)
            .with_time_bounds(100, 900)
            .with_refinement_fraction(2.0)
            .with_upper_max_footprint(800.0, 600.0)
            .with_cure_cycle("CC-1");

        assert_eq!(config.margin, 2.0);
        assert!(!config.exact_enabled);
        assert_eq!(config.max_time_ms, 900);
        assert_eq!(config.refinement_fraction, 1.0);
        assert_eq!(config.upper_max_height, Some(600.0));
        assert_eq!(config.cure_cycle.as_deref(), Some("CC-1"));
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        assert!(SolverConfig::new().with_grid_step(0.0).validate().is_err());
        assert!(SolverConfig::new().with_margin(-1.0).validate().is_err());
        assert!(SolverConfig::new()
            .with_upper_level_penalty(1.5)
            .validate()
            .is_err());
        assert!(SolverConfig::new()
            .with_time_bounds(10, 5)
            .validate()
            .is_err());
        assert!(SolverConfig::new()
            .with_aspect_ratio_threshold(0.5)
            .validate()
            .is_err());
    }

    #[test]
    fn test_validate_rejects_bad_objective_weights() {
        let weights = |count: f64, area: f64, priority_scale: f64| ObjectiveWeights {
            count,
            area,
            priority_scale,
        };
        assert!(SolverConfig::new()
            .with_objective(weights(1.0, 0.0, 0.0))
            .validate()
            .is_ok());
        for bad in [
            weights(-1.0, 0.5, 0.1),
            weights(1.0, f64::NAN, 0.1),
            weights(1.0, 0.5, -0.2),
            weights(f64::INFINITY, 0.5, 0.1),
        ] {
            let result = SolverConfig::new().with_objective(bad).validate();
            assert!(matches!(result, Err(Error::ConfigError(msg)) if msg.contains("objective")));
        }
    }

    #[test]
    fn test_piece_value() {
        let weights = ObjectiveWeights::default();
        let base = weights.piece_value(0, 100.0, 1000.0);
        let urgent = weights.piece_value(5, 100.0, 1000.0);
        assert!((base - 1.05).abs() < 1e-9);
        assert!(urgent > base);
        assert!(weights.piece_value(-100, 0.0, 1000.0) > 0.0);
    }

    #[test]
    fn test_effective_workers() {
        assert_eq!(SolverConfig::new().with_workers(3).effective_workers(), 3);
        assert!(SolverConfig::new().effective_workers() >= 1);
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_json_round_trip() {
        let config = SolverConfig::new().with_margin(7.5).with_max_nodes(1000);
        let json = config.to_json().unwrap();
        let parsed = SolverConfig::from_json(&json).unwrap();
        assert_eq!(parsed, config);
    }
}
