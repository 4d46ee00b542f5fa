//! Container descriptors: the usable plan of a pressure vessel.

use crate::geometry::Rect;
use crate::{Error, Result};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// A container (autoclave) into which pieces are placed.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Container {
    id: String,
    plan_width: f64,
    plan_length: f64,
    max_weight: f64,
    line_capacity: u32,
    supports_two_level: bool,
    max_stands: Option<usize>,
    stand_weight_capacity: f64,
    stand_height: f64,
    min_clearance_between_stands: f64,
    max_weight_per_level: Option<f64>,
}

impl Container {
    /// Creates a single-level container with unbounded weight and line capacity.
    pub fn new(id: impl Into<String>, plan_width: f64, plan_length: f64) -> Self {
        Self {
            id: id.into(),
            plan_width,
            plan_length,
            max_weight: f64::MAX,
            line_capacity: u32::MAX,
            supports_two_level: false,
            max_stands: None,
            stand_weight_capacity: 0.0,
            stand_height: 0.0,
            min_clearance_between_stands: 0.0,
            max_weight_per_level: None,
        }
    }

    /// Sets the maximum load (kg).
    pub fn with_max_weight(mut self, max_weight: f64) -> Self {
        self.max_weight = max_weight;
        self
    }

    /// Sets the number of vacuum lines available.
    pub fn with_line_capacity(mut self, lines: u32) -> Self {
        self.line_capacity = lines;
        self
    }

    /// Enables the elevated level, supported by stands of the given rating and height.
    pub fn with_two_levels(mut self, stand_weight_capacity: f64, stand_height: f64) -> Self {
        self.supports_two_level = true;
        self.stand_weight_capacity = stand_weight_capacity;
        self.stand_height = stand_height;
        self
    }

    /// Caps the number of stands.
    pub fn with_max_stands(mut self, max_stands: usize) -> Self {
        self.max_stands = Some(max_stands);
        self
    }

    /// Sets the minimum free distance between two stands (mm).
    pub fn with_min_stand_clearance(mut self, clearance: f64) -> Self {
        self.min_clearance_between_stands = clearance;
        self
    }

    /// Caps the load carried by each individual level (kg).
    pub fn with_max_weight_per_level(mut self, max_weight: f64) -> Self {
        self.max_weight_per_level = Some(max_weight);
        self
    }

    /// Container identifier.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Plan extent along X (mm).
    pub fn plan_width(&self) -> f64 {
        self.plan_width
    }

    /// Plan extent along Y (mm).
    pub fn plan_length(&self) -> f64 {
        self.plan_length
    }

    /// Maximum total load (kg).
    pub fn max_weight(&self) -> f64 {
        self.max_weight
    }

    /// Vacuum lines available.
    pub fn line_capacity(&self) -> u32 {
        self.line_capacity
    }

    /// Whether an elevated level on stands is available.
    pub fn supports_two_level(&self) -> bool {
        self.supports_two_level
    }

    /// Optional cap on the number of stands.
    pub fn max_stands(&self) -> Option<usize> {
        self.max_stands
    }

    /// Rated load per stand (kg).
    pub fn stand_weight_capacity(&self) -> f64 {
        self.stand_weight_capacity
    }

    /// Height of the elevated plane above the base plan (mm).
    pub fn stand_height(&self) -> f64 {
        self.stand_height
    }

    /// Minimum free distance between two stands (mm).
    pub fn min_clearance_between_stands(&self) -> f64 {
        self.min_clearance_between_stands
    }

    /// Optional per-level load cap (kg).
    pub fn max_weight_per_level(&self) -> Option<f64> {
        self.max_weight_per_level
    }

    /// Load allowed on a single level.
    pub fn level_weight_cap(&self) -> f64 {
        self.max_weight_per_level
            .map_or(self.max_weight, |cap| cap.min(self.max_weight))
    }

    /// Plan area (mm²).
    pub fn plan_area(&self) -> f64 {
        self.plan_width * self.plan_length
    }

    /// The full plan as a rectangle anchored at the origin.
    pub fn plan(&self) -> Rect {
        Rect::from_size(self.plan_width, self.plan_length)
    }

    /// Returns true if the weight capacity is bounded.
    pub fn has_weight_limit(&self) -> bool {
        self.max_weight < f64::MAX
    }

    /// Returns true if the line capacity is bounded.
    pub fn has_line_limit(&self) -> bool {
        self.line_capacity < u32::MAX
    }

    /// Validates the descriptor.
    pub fn validate(&self) -> Result<()> {
        if self.id.is_empty() {
            return Err(Error::InvalidContainer("container id must not be empty".into()));
        }
        if !self.plan_width.is_finite()
            || !self.plan_length.is_finite()
            || self.plan_width <= 0.0
            || self.plan_length <= 0.0
        {
            return Err(Error::InvalidContainer(format!(
                "{}: plan dimensions must be positive and finite (got {} x {})",
                self.id, self.plan_width, self.plan_length
            )));
        }
        if self.max_weight.is_nan() || self.max_weight < 0.0 {
            return Err(Error::InvalidContainer(format!(
                "{}: maximum weight must be non-negative",
                self.id
            )));
        }
        if let Some(cap) = self.max_weight_per_level {
            if cap.is_nan() || cap < 0.0 {
                return Err(Error::InvalidContainer(format!(
                    "{}: per-level weight cap must be non-negative",
                    self.id
                )));
            }
        }
        if self.supports_two_level {
            if !self.stand_weight_capacity.is_finite() || self.stand_weight_capacity <= 0.0 {
                return Err(Error::InvalidContainer(format!(
                    "{}: stand weight capacity must be positive",
                    self.id
                )));
            }
            if !self.stand_height.is_finite() || self.stand_height < 0.0 {
                return Err(Error::InvalidContainer(format!(
                    "{}: stand height must be non-negative",
                    self.id
                )));
            }
            if !self.min_clearance_between_stands.is_finite()
                || self.min_clearance_between_stands < 0.0
            {
                return Err(Error::InvalidContainer(format!(
                    "{}: stand clearance must be non-negative",
                    self.id
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_container_defaults() {
        let container = Container::new("AC-1", 1000.0, 2000.0);
        assert!(!container.supports_two_level());
        assert!(!container.has_weight_limit());
        assert!(!container.has_line_limit());
        assert_eq!(container.plan_area(), 2_000_000.0);
        assert!(container.validate().is_ok());
    }

    #[test]
    fn test_two_level_builder() {
        let container = Container::new("AC-2", 1200.0, 3000.0)
            .with_max_weight(800.0)
            .with_line_capacity(12)
            .with_two_levels(250.0, 400.0)
            .with_max_stands(6)
            .with_min_stand_clearance(100.0)
            .with_max_weight_per_level(500.0);

        assert!(container.supports_two_level());
        assert_eq!(container.max_stands(), Some(6));
        assert_eq!(container.stand_weight_capacity(), 250.0);
        assert_eq!(container.level_weight_cap(), 500.0);
        assert!(container.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_container() {
        assert!(Container::new("X", 0.0, 100.0).validate().is_err());
        assert!(Container::new("X", 100.0, f64::INFINITY).validate().is_err());
        assert!(Container::new("", 100.0, 100.0).validate().is_err());
        assert!(Container::new("X", 100.0, 100.0)
            .with_two_levels(0.0, 300.0)
            .validate()
            .is_err());
    }
}
