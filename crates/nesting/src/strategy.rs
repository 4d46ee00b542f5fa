//! Placement strategy contract.
//!
//! A [`LevelRequest`] describes one level of one container; a
//! [`PlacementStrategy`] turns it into a [`LevelLayout`]. The two
//! implementations are wrapped in the [`Strategy`] enum so the controller can
//! pick one at call time.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use autoclave_nesting_core::{
    AlgorithmStatus, Container, Exclusion, ExclusionReason, Level, ObjectiveWeights, Piece,
    Placement, Rect, SearchStats, SolverConfig,
};

use crate::eligibility::usable_plan;
use crate::exact::BranchAndBound;
use crate::heuristic::BottomLeftFill;

/// Wall-clock deadline with an optional cancellation flag.
#[derive(Debug, Clone, Default)]
pub struct Deadline {
    at: Option<Instant>,
    cancelled: Option<Arc<AtomicBool>>,
}

impl Deadline {
    /// No deadline.
    pub fn none() -> Self {
        Self::default()
    }

    /// Deadline at a fixed instant.
    pub fn at(instant: Instant) -> Self {
        Self {
            at: Some(instant),
            cancelled: None,
        }
    }

    /// Deadline `duration` from now.
    pub fn after(duration: Duration) -> Self {
        Self::at(Instant::now() + duration)
    }

    /// Attaches a cancellation flag.
    pub fn with_cancel(mut self, flag: Arc<AtomicBool>) -> Self {
        self.cancelled = Some(flag);
        self
    }

    /// The earlier of this deadline and `instant`.
    pub fn tightened(&self, instant: Instant) -> Self {
        let at = match self.at {
            Some(current) => current.min(instant),
            None => instant,
        };
        Self {
            at: Some(at),
            cancelled: self.cancelled.clone(),
        }
    }

    /// The instant, if bounded.
    pub fn instant(&self) -> Option<Instant> {
        self.at
    }

    /// Time left, `None` when unbounded.
    pub fn remaining(&self) -> Option<Duration> {
        self.at
            .map(|at| at.saturating_duration_since(Instant::now()))
    }

    /// Returns true once the deadline has passed or the solve was cancelled.
    pub fn expired(&self) -> bool {
        if let Some(flag) = &self.cancelled {
            if flag.load(Ordering::Relaxed) {
                return true;
            }
        }
        self.at.is_some_and(|at| Instant::now() >= at)
    }
}

/// Regions forbidden only to pieces taller than a clearance.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Overhead {
    /// Clearance below the regions (mm).
    pub max_clearance: f64,
    /// Footprints of whatever hangs above this level.
    pub regions: Vec<Rect>,
}

/// One level of one container to be filled.
#[derive(Debug, Clone)]
pub struct LevelRequest<'a> {
    /// Level tag for the produced placements.
    pub level: Level,
    /// Pieces to place.
    pub pieces: Vec<&'a Piece>,
    /// Area pieces must stay inside.
    pub usable: Rect,
    /// Plan area used to normalise the area objective.
    pub plan_area: f64,
    /// Pieces already on this level (the margin applies to them).
    pub occupied: Vec<Rect>,
    /// Regions no piece may cover.
    pub obstacles: Vec<Rect>,
    /// Regions only low pieces may cover.
    pub overhead: Option<Overhead>,
    /// Load still available on this level (kg).
    pub weight_limit: f64,
    /// Lines still available.
    pub line_limit: u32,
    /// Deadline for the search.
    pub deadline: Deadline,
}

impl<'a> LevelRequest<'a> {
    /// Creates a request over the whole usable plan of `container`.
    pub fn new(
        level: Level,
        pieces: Vec<&'a Piece>,
        container: &Container,
        config: &SolverConfig,
    ) -> Self {
        let usable = usable_plan(container, config).unwrap_or(Rect::new(
            config.edge_clearance,
            config.edge_clearance,
            0.0,
            0.0,
        ));
        Self {
            level,
            pieces,
            usable,
            plan_area: container.plan_area(),
            occupied: Vec::new(),
            obstacles: Vec::new(),
            overhead: None,
            weight_limit: container.level_weight_cap(),
            line_limit: container.line_capacity(),
            deadline: Deadline::none(),
        }
    }

    /// Sets the rectangles already occupied on this level.
    pub fn with_occupied(mut self, occupied: Vec<Rect>) -> Self {
        self.occupied = occupied;
        self
    }

    /// Sets regions no piece may cover.
    pub fn with_obstacles(mut self, obstacles: Vec<Rect>) -> Self {
        self.obstacles = obstacles;
        self
    }

    /// Sets regions only low pieces may cover.
    pub fn with_overhead(mut self, overhead: Overhead) -> Self {
        self.overhead = Some(overhead);
        self
    }

    /// Sets the load still available.
    pub fn with_weight_limit(mut self, limit: f64) -> Self {
        self.weight_limit = limit;
        self
    }

    /// Sets the lines still available.
    pub fn with_line_limit(mut self, limit: u32) -> Self {
        self.line_limit = limit;
        self
    }

    /// Sets the deadline.
    pub fn with_deadline(mut self, deadline: Deadline) -> Self {
        self.deadline = deadline;
        self
    }

    /// Returns true if the overhead regions apply to `piece`.
    pub fn is_tall(&self, piece: &Piece) -> bool {
        self.overhead
            .as_ref()
            .is_some_and(|o| piece.height_clearance() > o.max_clearance)
    }

    /// Regions `piece` may not cover (no margin applies).
    pub fn blocked_for<'s>(&'s self, piece: &Piece) -> impl Iterator<Item = &'s Rect> + 's {
        let overhead: &[Rect] = match &self.overhead {
            Some(o) if piece.height_clearance() > o.max_clearance => &o.regions,
            _ => &[],
        };
        self.obstacles.iter().chain(overhead.iter())
    }

    /// Looks up a requested piece by id.
    pub fn piece(&self, piece_id: &str) -> Option<&'a Piece> {
        self.pieces.iter().copied().find(|p| p.id() == piece_id)
    }

    /// Objective value of a set of placements drawn from this request.
    pub fn objective(&self, placements: &[Placement], weights: &ObjectiveWeights) -> f64 {
        placements
            .iter()
            .filter_map(|p| self.piece(&p.piece_id))
            .map(|piece| weights.piece_value(piece.priority(), piece.area(), self.plan_area))
            .sum()
    }
}

/// Result of filling one level.
#[derive(Debug, Clone, PartialEq)]
pub struct LevelLayout {
    /// Placed pieces.
    pub placements: Vec<Placement>,
    /// Requested pieces that were not placed.
    pub unplaced: Vec<Exclusion>,
    /// How the layout was obtained.
    pub status: AlgorithmStatus,
    /// Exact-search statistics, if the exact strategy ran.
    pub stats: Option<SearchStats>,
}

impl LevelLayout {
    /// Layout with nothing placed.
    pub fn empty(status: AlgorithmStatus) -> Self {
        Self {
            placements: Vec::new(),
            unplaced: Vec::new(),
            status,
            stats: None,
        }
    }

    /// Returns true if nothing is left unplaced.
    pub fn is_complete(&self) -> bool {
        self.unplaced.is_empty()
    }

    /// Total weight of the placements (kg).
    pub fn placed_weight(&self, request: &LevelRequest<'_>) -> f64 {
        self.placements
            .iter()
            .filter_map(|p| request.piece(&p.piece_id))
            .map(|piece| piece.weight())
            .sum()
    }

    /// Total lines used by the placements.
    pub fn placed_lines(&self, request: &LevelRequest<'_>) -> u32 {
        self.placements
            .iter()
            .filter_map(|p| request.piece(&p.piece_id))
            .fold(0u32, |lines, piece| lines.saturating_add(piece.lines_required()))
    }
}

/// Reason for each requested piece missing from `placements`.
///
/// A piece that would push the running totals over a limit is reported with
/// the limit; anything else had no free position.
pub fn classify_unplaced(request: &LevelRequest<'_>, placements: &[Placement]) -> Vec<Exclusion> {
    let placed_weight: f64 = placements
        .iter()
        .filter_map(|p| request.piece(&p.piece_id))
        .map(|p| p.weight())
        .sum();
    let placed_lines = placements
        .iter()
        .filter_map(|p| request.piece(&p.piece_id))
        .fold(0u32, |lines, p| lines.saturating_add(p.lines_required()));

    request
        .pieces
        .iter()
        .filter(|piece| !placements.iter().any(|p| &p.piece_id == piece.id()))
        .map(|piece| {
            let reason = if placed_weight + piece.weight() > request.weight_limit + 1e-9 {
                ExclusionReason::WeightLimitExceeded
            } else if placed_lines
                .checked_add(piece.lines_required())
                .map_or(true, |lines| lines > request.line_limit)
            {
                ExclusionReason::LineCapacityExceeded
            } else {
                ExclusionReason::NoFreePosition
            };
            Exclusion::new(piece.id().clone(), reason)
        })
        .collect()
}

/// Common interface of the placement strategies.
pub trait PlacementStrategy {
    /// Short name for logs.
    fn name(&self) -> &'static str;

    /// Fills one level.
    fn place(&self, request: &LevelRequest<'_>) -> LevelLayout;
}

/// The available strategies.
#[derive(Debug, Clone)]
pub enum Strategy {
    /// Branch-and-bound search with a time budget.
    Exact(BranchAndBound),
    /// Deterministic bottom-left fill.
    Heuristic(BottomLeftFill),
}

impl PlacementStrategy for Strategy {
    fn name(&self) -> &'static str {
        match self {
            Self::Exact(s) => s.name(),
            Self::Heuristic(s) => s.name(),
        }
    }

    fn place(&self, request: &LevelRequest<'_>) -> LevelLayout {
        match self {
            Self::Exact(s) => s.place(request),
            Self::Heuristic(s) => s.place(request),
        }
    }
}
