//! Deterministic bottom-left fill.
//!
//! Pieces are taken in first-fit-decreasing order and each one goes to the
//! first free position of a row-major scan over a grid of candidate
//! coordinates, extended with the edges of everything already on the level.

use autoclave_nesting_core::{
    AlgorithmStatus, Exclusion, ExclusionReason, Level, Orientation, Piece, Placement, Rect,
    SolverConfig, EPSILON,
};

use crate::occupancy::LevelCanvas;
use crate::orientation::{OrientationChoice, OrientationPolicy};
use crate::strategy::{LevelLayout, LevelRequest, PlacementStrategy};

/// Bottom-left fill placement strategy.
#[derive(Debug, Clone)]
pub struct BottomLeftFill {
    config: SolverConfig,
}

impl BottomLeftFill {
    /// Creates the strategy.
    pub fn new(config: &SolverConfig) -> Self {
        Self {
            config: config.clone(),
        }
    }

    /// First free position for `piece` on `canvas`, without committing it.
    ///
    /// Primary orientations compete at each position; the fallback set is only
    /// scanned when no primary orientation fits anywhere.
    pub fn first_fit(
        &self,
        canvas: &LevelCanvas,
        piece: &Piece,
        choice: &OrientationChoice,
    ) -> Option<(Rect, Orientation)> {
        let tall = canvas.is_tall(piece);

        for set in [&choice.primary, &choice.fallback] {
            let mut best: Option<(Rect, Orientation)> = None;
            for &orientation in set.iter() {
                let (w, h) = piece.footprint(orientation);
                let Some(rect) = self.scan(canvas, w, h, tall) else {
                    continue;
                };
                let better = match &best {
                    None => true,
                    Some((current, _)) => precedes(&rect, current),
                };
                if better {
                    best = Some((rect, orientation));
                }
            }
            if best.is_some() {
                return best;
            }
        }
        None
    }

    /// Places `piece` on `canvas` if possible.
    pub fn place_into(
        &self,
        canvas: &mut LevelCanvas,
        piece: &Piece,
        policy: &OrientationPolicy,
        level: Level,
    ) -> Result<Placement, ExclusionReason> {
        if let Some(reason) = canvas.budget_violation(piece) {
            return Err(reason);
        }
        let (rect, orientation) = self
            .first_fit(canvas, piece, &policy.choices(piece))
            .ok_or(ExclusionReason::NoFreePosition)?;
        canvas.commit(piece, rect);
        Ok(Placement::new(
            piece.id().clone(),
            rect,
            orientation.is_rotated(),
            level,
        ))
    }

    /// Row-major scan for a free `w` x `h` rectangle.
    fn scan(&self, canvas: &LevelCanvas, w: f64, h: f64, tall: bool) -> Option<Rect> {
        let usable = canvas.usable();
        if !usable.can_hold(w, h) {
            return None;
        }
        let step = self.config.grid_step;
        let xs = candidates(
            usable.min_x(),
            usable.max_x() - w,
            step,
            canvas.snap_xs(tall),
        );
        let ys = candidates(
            usable.min_y(),
            usable.max_y() - h,
            step,
            canvas.snap_ys(tall),
        );

        for &y in &ys {
            let mut i = 0;
            while i < xs.len() {
                let rect = Rect::new(xs[i], y, w, h);
                match canvas.blocking_end(&rect, tall) {
                    None => return Some(rect),
                    Some(end) => {
                        // Every x short of the blocker's far edge still collides with it.
                        let next = xs.partition_point(|&x| x < end - EPSILON);
                        i = next.max(i + 1);
                    }
                }
            }
        }
        None
    }
}

impl PlacementStrategy for BottomLeftFill {
    fn name(&self) -> &'static str {
        "bottom-left-fill"
    }

    fn place(&self, request: &LevelRequest<'_>) -> LevelLayout {
        let policy = OrientationPolicy::new(&self.config, request.usable);
        let mut canvas = LevelCanvas::from_request(request, self.config.margin);
        let mut placements = Vec::new();
        let mut unplaced = Vec::new();

        for piece in placement_order(&request.pieces) {
            match self.place_into(&mut canvas, piece, &policy, request.level) {
                Ok(placement) => placements.push(placement),
                Err(reason) => unplaced.push(Exclusion::new(piece.id().clone(), reason)),
            }
        }

        log::debug!(
            "Bottom-left fill on {}: {} placed, {} unplaced",
            request.level,
            placements.len(),
            unplaced.len()
        );

        LevelLayout {
            placements,
            unplaced,
            status: AlgorithmStatus::Heuristic,
            stats: None,
        }
    }
}

/// First-fit-decreasing order: footprint area, then weight, then priority
/// (all descending), then id.
pub fn placement_order<'p>(pieces: &[&'p Piece]) -> Vec<&'p Piece> {
    let mut ordered = pieces.to_vec();
    ordered.sort_by(|a, b| {
        b.area()
            .total_cmp(&a.area())
            .then(b.weight().total_cmp(&a.weight()))
            .then(b.priority().cmp(&a.priority()))
            .then_with(|| a.id().cmp(b.id()))
    });
    ordered
}

/// Row-major precedence of two positions.
pub fn precedes(a: &Rect, b: &Rect) -> bool {
    a.y < b.y - EPSILON || ((a.y - b.y).abs() <= EPSILON && a.x < b.x - EPSILON)
}

/// Sorted grid coordinates in `[min, max]` merged with `snaps`.
fn candidates(min: f64, max: f64, step: f64, snaps: Vec<f64>) -> Vec<f64> {
    if max < min - EPSILON {
        return Vec::new();
    }
    let mut values = Vec::new();
    let mut k = 0u32;
    loop {
        let v = min + step * k as f64;
        if v > max + EPSILON {
            break;
        }
        values.push(v);
        k += 1;
    }
    values.extend(
        snaps
            .into_iter()
            .filter(|&v| v >= min - EPSILON && v <= max + EPSILON),
    );
    values.sort_by(|a, b| a.total_cmp(b));
    values.dedup_by(|a, b| (*a - *b).abs() <= EPSILON);
    values
}
