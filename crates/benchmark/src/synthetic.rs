//! Synthetic workload generator.
//!
//! Produces reproducible batches of curing tools and autoclaves for stress
//! testing the solver at different scales.

use autoclave_nesting::{Container, Piece};
use rand::prelude::*;

/// Generator for synthetic nesting workloads.
#[derive(Debug, Clone)]
pub struct SyntheticGenerator {
    rng: StdRng,
}

impl SyntheticGenerator {
    /// Creates a new generator with a random seed.
    pub fn new() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }

    /// Creates a new generator with a specific seed for reproducibility.
    pub fn with_seed(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Mixed batch: roughly half small, a third medium and the rest large tools.
    ///
    /// Sizes and weights jitter around three families so that no two batches
    /// with different seeds share a layout.
    pub fn mixed(&mut self, count: usize) -> Vec<Piece> {
        (0..count)
            .map(|i| {
                let roll: f64 = self.rng.gen();
                let (prefix, w, h, kg) = if roll < 0.5 {
                    ("S", 150.0, 100.0, 5.0)
                } else if roll < 0.85 {
                    ("M", 250.0, 200.0, 15.0)
                } else {
                    ("L", 400.0, 250.0, 40.0)
                };
                let jitter = self.rng.gen_range(0.9..1.1);
                Piece::new(format!("{}{:03}", prefix, i), w * jitter, h * jitter)
                    .with_weight(kg * jitter)
                    .with_lines(self.rng.gen_range(1..=2))
                    .with_priority(self.rng.gen_range(0..=3))
                    .with_rotation(self.rng.gen_bool(0.8))
            })
            .collect()
    }

    /// Uniform heavy tools that push stand ratings and weight limits.
    pub fn heavy(&mut self, count: usize) -> Vec<Piece> {
        (0..count)
            .map(|i| {
                let w = self.rng.gen_range(340.0..420.0);
                let h = self.rng.gen_range(400.0..480.0);
                Piece::new(format!("H{:03}", i), w, h)
                    .with_weight(self.rng.gen_range(80.0..110.0))
                    .with_rotation(false)
            })
            .collect()
    }

    /// Tall tools, some of which exceed a typical stand height.
    pub fn tall(&mut self, count: usize) -> Vec<Piece> {
        (0..count)
            .map(|i| {
                Piece::new(
                    format!("T{:03}", i),
                    self.rng.gen_range(150.0..300.0),
                    self.rng.gen_range(150.0..300.0),
                )
                .with_weight(self.rng.gen_range(10.0..30.0))
                .with_height_clearance(self.rng.gen_range(100.0..500.0))
            })
            .collect()
    }
}

impl Default for SyntheticGenerator {
    fn default() -> Self {
        Self::new()
    }
}

/// Containers used by the scenario runner.
pub struct SyntheticContainers;

impl SyntheticContainers {
    /// Large single-level autoclave.
    pub fn large() -> Container {
        Container::new("AC-L", 1500.0, 2000.0)
            .with_max_weight(2_000.0)
            .with_line_capacity(60)
    }

    /// Compact autoclave with a second level on stands.
    pub fn two_level() -> Container {
        Container::new("AC-2L", 1200.0, 1500.0)
            .with_max_weight(1_500.0)
            .with_line_capacity(40)
            .with_two_levels(250.0, 300.0)
            .with_max_stands(12)
            .with_min_stand_clearance(50.0)
    }

    /// Small autoclave for exact-search sized problems.
    pub fn small() -> Container {
        Container::new("AC-S", 1000.0, 1000.0)
            .with_max_weight(300.0)
            .with_line_capacity(12)
    }
}
