//! Occupancy tracking for one level, backed by an R*-tree.
//!
//! The index answers "what blocks this candidate rectangle" for the
//! bottom-left scan. A candidate conflicts with a placed piece when it comes
//! closer than the margin, and with a blocked region when it overlaps it.

use rstar::{RTree, RTreeObject, AABB};

use autoclave_nesting_core::{ExclusionReason, Piece, Rect};

use crate::strategy::LevelRequest;

/// An occupied rectangle in the index.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OccupiedCell {
    /// Insertion ordinal.
    pub index: usize,
    /// Occupied footprint.
    pub rect: Rect,
}

impl RTreeObject for OccupiedCell {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        AABB::from_corners(
            [self.rect.min_x(), self.rect.min_y()],
            [self.rect.max_x(), self.rect.max_y()],
        )
    }
}

/// R*-tree of occupied rectangles.
#[derive(Debug, Default)]
pub struct OccupancyIndex {
    tree: RTree<OccupiedCell>,
    rects: Vec<Rect>,
}

impl OccupancyIndex {
    /// Creates an empty index.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an index holding `rects`.
    pub fn with_rects(rects: Vec<Rect>) -> Self {
        let cells = rects
            .iter()
            .enumerate()
            .map(|(index, &rect)| OccupiedCell { index, rect })
            .collect();
        Self {
            tree: RTree::bulk_load(cells),
            rects,
        }
    }

    /// Adds a rectangle.
    pub fn insert(&mut self, rect: Rect) {
        let index = self.rects.len();
        self.rects.push(rect);
        self.tree.insert(OccupiedCell { index, rect });
    }

    /// Number of rectangles.
    pub fn len(&self) -> usize {
        self.rects.len()
    }

    /// Returns true if nothing is occupied.
    pub fn is_empty(&self) -> bool {
        self.rects.is_empty()
    }

    /// Rectangles in insertion order.
    pub fn rects(&self) -> &[Rect] {
        &self.rects
    }

    /// Rectangles closer than `gap` to `candidate`.
    pub fn conflicts(&self, candidate: &Rect, gap: f64) -> Vec<&Rect> {
        let probe = candidate.expand(gap);
        let envelope = AABB::from_corners(
            [probe.min_x(), probe.min_y()],
            [probe.max_x(), probe.max_y()],
        );
        self.tree
            .locate_in_envelope_intersecting(&envelope)
            .map(|cell| &cell.rect)
            .filter(|rect| candidate.conflicts_with(rect, gap))
            .collect()
    }

    /// Returns true if nothing lies closer than `gap` to `candidate`.
    pub fn is_free(&self, candidate: &Rect, gap: f64) -> bool {
        self.conflicts(candidate, gap).is_empty()
    }
}

/// Running state of one level while pieces are added to it.
#[derive(Debug)]
pub struct LevelCanvas {
    usable: Rect,
    margin: f64,
    placed: OccupancyIndex,
    blocked: OccupancyIndex,
    overhead: OccupancyIndex,
    overhead_clearance: Option<f64>,
    weight_used: f64,
    weight_limit: f64,
    lines_used: u32,
    line_limit: u32,
}

impl LevelCanvas {
    /// Creates the canvas described by a request.
    pub fn from_request(request: &LevelRequest<'_>, margin: f64) -> Self {
        let (overhead, overhead_clearance) = match &request.overhead {
            Some(o) => (
                OccupancyIndex::with_rects(o.regions.clone()),
                Some(o.max_clearance),
            ),
            None => (OccupancyIndex::new(), None),
        };
        Self {
            usable: request.usable,
            margin,
            placed: OccupancyIndex::with_rects(request.occupied.clone()),
            blocked: OccupancyIndex::with_rects(request.obstacles.clone()),
            overhead,
            overhead_clearance,
            weight_used: 0.0,
            weight_limit: request.weight_limit,
            lines_used: 0,
            line_limit: request.line_limit,
        }
    }

    /// Area pieces must stay inside.
    pub fn usable(&self) -> Rect {
        self.usable
    }

    /// Piece-to-piece gap.
    pub fn margin(&self) -> f64 {
        self.margin
    }

    /// Rectangles placed so far, pre-occupied ones first.
    pub fn placed(&self) -> &[Rect] {
        self.placed.rects()
    }

    /// Load placed on this canvas (kg).
    pub fn weight_used(&self) -> f64 {
        self.weight_used
    }

    /// Lines used on this canvas.
    pub fn lines_used(&self) -> u32 {
        self.lines_used
    }

    /// Returns true if the overhead regions apply to `piece`.
    pub fn is_tall(&self, piece: &Piece) -> bool {
        self.overhead_clearance
            .is_some_and(|limit| piece.height_clearance() > limit)
    }

    /// Limit the piece would break, if any.
    pub fn budget_violation(&self, piece: &Piece) -> Option<ExclusionReason> {
        if self.weight_used + piece.weight() > self.weight_limit + 1e-9 {
            Some(ExclusionReason::WeightLimitExceeded)
        } else if self
            .lines_used
            .checked_add(piece.lines_required())
            .map_or(true, |lines| lines > self.line_limit)
        {
            Some(ExclusionReason::LineCapacityExceeded)
        } else {
            None
        }
    }

    /// Returns true if `candidate` lies inside the plan and touches nothing.
    pub fn is_free(&self, candidate: &Rect, tall: bool) -> bool {
        self.usable.contains(candidate) && self.blocking_end(candidate, tall).is_none()
    }

    /// Right edge the scan must pass to clear every current blocker of `candidate`.
    ///
    /// `None` when the candidate is free.
    pub fn blocking_end(&self, candidate: &Rect, tall: bool) -> Option<f64> {
        let margin = self.margin;
        let mut end: Option<f64> = None;
        let mut extend = |value: f64| {
            end = Some(end.map_or(value, |e: f64| e.max(value)));
        };

        for rect in self.placed.conflicts(candidate, margin) {
            extend(rect.max_x() + margin);
        }
        for rect in self.blocked.conflicts(candidate, 0.0) {
            extend(rect.max_x());
        }
        if tall {
            for rect in self.overhead.conflicts(candidate, 0.0) {
                extend(rect.max_x());
            }
        }
        end
    }

    /// X coordinates worth trying: the plan origin and every blocker edge.
    pub fn snap_xs(&self, tall: bool) -> Vec<f64> {
        let mut xs = vec![self.usable.min_x()];
        xs.extend(self.placed.rects().iter().map(|r| r.max_x() + self.margin));
        xs.extend(self.blocked.rects().iter().map(|r| r.max_x()));
        if tall {
            xs.extend(self.overhead.rects().iter().map(|r| r.max_x()));
        }
        xs
    }

    /// Y coordinates worth trying: the plan origin and every blocker edge.
    pub fn snap_ys(&self, tall: bool) -> Vec<f64> {
        let mut ys = vec![self.usable.min_y()];
        ys.extend(self.placed.rects().iter().map(|r| r.max_y() + self.margin));
        ys.extend(self.blocked.rects().iter().map(|r| r.max_y()));
        if tall {
            ys.extend(self.overhead.rects().iter().map(|r| r.max_y()));
        }
        ys
    }

    /// Records a placed piece.
    pub fn commit(&mut self, piece: &Piece, rect: Rect) {
        self.placed.insert(rect);
        self.weight_used += piece.weight();
        self.lines_used = self.lines_used.saturating_add(piece.lines_required());
    }

    /// Forbids `rect` to every piece.
    pub fn block(&mut self, rect: Rect) {
        self.blocked.insert(rect);
    }

    /// Forbids `rect` to tall pieces only.
    pub fn cover(&mut self, rect: Rect) {
        self.overhead.insert(rect);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use autoclave_nesting_core::{Container, Level, SolverConfig};

    use crate::strategy::Overhead;

    #[test]
    fn test_index_conflicts_respect_gap() {
        let mut index = OccupancyIndex::new();
        index.insert(Rect::new(0.0, 0.0, 100.0, 100.0));
        index.insert(Rect::new(300.0, 0.0, 100.0, 100.0));

        assert!(index.is_free(&Rect::new(105.0, 0.0, 50.0, 50.0), 5.0));
        assert!(!index.is_free(&Rect::new(103.0, 0.0, 50.0, 50.0), 5.0));
        assert_eq!(index.conflicts(&Rect::new(50.0, 0.0, 300.0, 10.0), 0.0).len(), 2);
        assert_eq!(index.len(), 2);
    }

    #[test]
    fn test_canvas_blocking_end() {
        let container = Container::new("AC", 1000.0, 1000.0);
        let config = SolverConfig::default();
        let piece = Piece::new("P", 100.0, 100.0);
        let request = LevelRequest::new(Level::Base, vec![&piece], &container, &config)
            .with_occupied(vec![Rect::new(0.0, 0.0, 200.0, 200.0)])
            .with_obstacles(vec![Rect::new(400.0, 0.0, 50.0, 1000.0)]);
        let canvas = LevelCanvas::from_request(&request, 5.0);

        assert_eq!(
            canvas.blocking_end(&Rect::new(100.0, 0.0, 100.0, 100.0), false),
            Some(205.0)
        );
        assert_eq!(
            canvas.blocking_end(&Rect::new(350.0, 0.0, 100.0, 100.0), false),
            Some(450.0)
        );
        assert!(canvas.is_free(&Rect::new(205.0, 0.0, 100.0, 100.0), false));
        assert!(!canvas.is_free(&Rect::new(950.0, 0.0, 100.0, 100.0), false));
    }

    #[test]
    fn test_canvas_overhead_applies_to_tall_only() {
        let container = Container::new("AC", 1000.0, 1000.0);
        let config = SolverConfig::default();
        let tall = Piece::new("T", 100.0, 100.0).with_height_clearance(400.0);
        let request = LevelRequest::new(Level::Base, vec![&tall], &container, &config)
            .with_overhead(Overhead {
                max_clearance: 300.0,
                regions: vec![Rect::new(0.0, 0.0, 500.0, 500.0)],
            });
        let canvas = LevelCanvas::from_request(&request, 5.0);
        let spot = Rect::new(10.0, 10.0, 100.0, 100.0);

        assert!(canvas.is_tall(&tall));
        assert!(!canvas.is_free(&spot, true));
        assert!(canvas.is_free(&spot, false));
        assert!(canvas.snap_xs(true).contains(&500.0));
    }

    #[test]
    fn test_canvas_budget() {
        let container = Container::new("AC", 1000.0, 1000.0).with_line_capacity(2);
        let config = SolverConfig::default();
        let a = Piece::new("A", 100.0, 100.0).with_weight(30.0).with_lines(2);
        let request = LevelRequest::new(Level::Base, vec![&a], &container, &config)
            .with_weight_limit(50.0);
        let mut canvas = LevelCanvas::from_request(&request, 5.0);

        assert!(canvas.budget_violation(&a).is_none());
        canvas.commit(&a, Rect::new(0.0, 0.0, 100.0, 100.0));
        assert_eq!(
            canvas.budget_violation(&Piece::new("B", 1.0, 1.0).with_weight(30.0)),
            Some(ExclusionReason::WeightLimitExceeded)
        );
        assert_eq!(
            canvas.budget_violation(&Piece::new("C", 1.0, 1.0)),
            Some(ExclusionReason::LineCapacityExceeded)
        );
    }
}
