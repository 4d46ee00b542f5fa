//! Stand planning for the elevated level.
//!
//! A stand is a beam across the full plan length, so along the travel axis
//! (X) it is an interval. It carries every level-1 piece whose X interval it
//! overlaps. The planner enforces, for every stand:
//!
//! - it lies inside each piece it touches (no straddling a piece edge);
//! - the combined weight of the touched pieces is within its rating;
//! - when shared, it keeps one stand width away from every touched piece's edges;
//! - it keeps the minimum clearance to other stands, stays in the plan and
//!   does not pass over tall level-0 pieces.
//!
//! Every level-1 piece needs two distinct stands, one centred in each X half.
//! Pieces that cannot get such support are reverted.

use std::collections::HashMap;

use autoclave_nesting_core::{
    Container, Level, Piece, PieceId, Placement, SolverConfig, Span, Stand, EPSILON,
};

/// Outcome of stand planning.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StandPlan {
    /// Stands, ordered along the travel axis.
    pub stands: Vec<Stand>,
    /// Level-1 pieces that could not be supported, in revert order.
    pub reverted: Vec<PieceId>,
}

/// A level-1 piece as seen by the planner.
#[derive(Debug, Clone)]
struct Carried {
    id: PieceId,
    span: Span,
    weight: f64,
    priority: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Half {
    Lower,
    Upper,
}

/// Plans the stands under the elevated level.
pub struct StandPlanner<'a> {
    container: &'a Container,
    stand_width: f64,
    step: f64,
}

impl<'a> StandPlanner<'a> {
    /// Creates a planner.
    pub fn new(container: &'a Container, config: &SolverConfig) -> Self {
        Self {
            container,
            stand_width: config.stand_width,
            step: config.stand_width / 4.0,
        }
    }

    /// Plans stands for the level-1 placements among `placements`.
    pub fn plan<'p>(
        &self,
        pieces: impl IntoIterator<Item = &'p Piece>,
        placements: &[Placement],
    ) -> StandPlan {
        let lookup: HashMap<&str, &Piece> =
            pieces.into_iter().map(|p| (p.id().as_str(), p)).collect();

        let mut active: Vec<Carried> = placements
            .iter()
            .filter(|p| p.level == Level::Upper)
            .filter_map(|p| {
                lookup.get(p.piece_id.as_str()).map(|piece| Carried {
                    id: p.piece_id.clone(),
                    span: p.x_span(),
                    weight: piece.weight(),
                    priority: piece.priority(),
                })
            })
            .collect();
        active.sort_by(|a, b| {
            a.span
                .start
                .total_cmp(&b.span.start)
                .then_with(|| a.id.cmp(&b.id))
        });

        let tall: Vec<Span> = placements
            .iter()
            .filter(|p| p.level == Level::Base)
            .filter(|p| {
                lookup
                    .get(p.piece_id.as_str())
                    .is_some_and(|piece| piece.height_clearance() > self.container.stand_height())
            })
            .map(|p| p.x_span())
            .collect();

        let mut stands: Vec<Span> = Vec::new();
        let mut reverted: Vec<PieceId> = Vec::new();

        self.generate(&mut active, &mut stands, &mut reverted, &tall);
        self.merge(&active, &mut stands, &tall);
        self.reduce(&mut active, &mut stands, &mut reverted);

        stands.sort_by(|a, b| a.start.total_cmp(&b.start));
        let stands: Vec<Stand> = stands
            .iter()
            .enumerate()
            .map(|(i, span)| {
                let mut stand = Stand::new(span.start, span.length());
                let mut ids: Vec<PieceId> = touched(span, &active)
                    .into_iter()
                    .map(|t| active[t].id.clone())
                    .collect();
                ids.sort();
                stand.supported_piece_ids = ids;
                stand.sequence_index = i;
                stand
            })
            .collect();

        log::debug!(
            "Stand plan for {}: {} stands for {} pieces, {} reverted",
            self.container.id(),
            stands.len(),
            active.len(),
            reverted.len()
        );
        StandPlan { stands, reverted }
    }

    /// One stand per unsupported half, as close to its quarter point as allowed.
    fn generate(
        &self,
        active: &mut Vec<Carried>,
        stands: &mut Vec<Span>,
        reverted: &mut Vec<PieceId>,
        tall: &[Span],
    ) {
        let mut i = 0;
        while i < active.len() {
            let mut supported = true;
            for half in [Half::Lower, Half::Upper] {
                let piece = &active[i];
                if stands.iter().any(|s| serves(s, &piece.span, half)) {
                    continue;
                }
                match self.position_for(piece, half, active, stands, tall) {
                    Some(span) => stands.push(span),
                    None => {
                        supported = false;
                        break;
                    }
                }
            }

            if supported {
                i += 1;
            } else {
                let piece = active.remove(i);
                log::debug!("No admissible stand position under {}", piece.id);
                reverted.push(piece.id);
                stands.retain(|s| !touched(s, active).is_empty());
            }
        }
    }

    /// Nearest admissible stand for one half of `piece`.
    fn position_for(
        &self,
        piece: &Carried,
        half: Half,
        active: &[Carried],
        stands: &[Span],
        tall: &[Span],
    ) -> Option<Span> {
        let sw = self.stand_width;
        let mid = piece.span.center();
        let (lo, hi, target_center) = match half {
            Half::Lower => (
                piece.span.start,
                mid - sw / 2.0,
                piece.span.start + piece.span.length() / 4.0,
            ),
            Half::Upper => (
                mid - sw / 2.0,
                piece.span.end - sw,
                piece.span.start + piece.span.length() * 0.75,
            ),
        };
        if hi < lo - EPSILON {
            return None;
        }
        let target = (target_center - sw / 2.0).clamp(lo, hi);

        let mut starts = vec![target, lo, hi];
        let mut offset = self.step;
        while target - offset >= lo - EPSILON || target + offset <= hi + EPSILON {
            starts.push(target - offset);
            starts.push(target + offset);
            offset += self.step;
        }
        let clearance = self.container.min_clearance_between_stands();
        for s in stands {
            starts.push(s.end + clearance);
            starts.push(s.start - clearance - sw);
        }
        for t in tall {
            starts.push(t.end);
            starts.push(t.start - sw);
        }
        for other in active {
            starts.push(other.span.start + sw);
            starts.push(other.span.end - 2.0 * sw);
        }

        starts.retain(|&s| s >= lo - EPSILON && s <= hi + EPSILON);
        starts.sort_by(|a, b| (a - target).abs().total_cmp(&(b - target).abs()).then(a.total_cmp(b)));
        starts.dedup_by(|a, b| (*a - *b).abs() <= EPSILON);

        starts
            .into_iter()
            .map(|s| Span::with_length(s, sw))
            .find(|span| self.admissible(span, active, stands, tall))
    }

    /// Checks every stand rule for `span` against the other stands.
    fn admissible(&self, span: &Span, active: &[Carried], others: &[Span], tall: &[Span]) -> bool {
        let sw = self.stand_width;
        if span.start < -EPSILON || span.end > self.container.plan_width() + EPSILON {
            return false;
        }

        let touched = touched(span, active);
        if touched.is_empty() {
            return false;
        }
        let load: f64 = touched.iter().map(|&t| active[t].weight).sum();
        if load > self.container.stand_weight_capacity() + EPSILON {
            return false;
        }
        let shared = touched.len() > 1;
        for &t in &touched {
            let carried = &active[t].span;
            if !carried.contains(span) {
                return false;
            }
            if shared
                && (span.start < carried.start + sw - EPSILON || span.end > carried.end - sw + EPSILON)
            {
                return false;
            }
        }

        if tall.iter().any(|t| t.overlaps(span)) {
            return false;
        }
        let clearance = self.container.min_clearance_between_stands();
        !others
            .iter()
            .any(|o| o.overlaps(span) || o.gap_to(span) < clearance - EPSILON)
    }

    /// Replaces neighbouring stands less than one stand width apart by a single
    /// one where possible.
    fn merge(&self, active: &[Carried], stands: &mut Vec<Span>, tall: &[Span]) {
        let sw = self.stand_width;
        loop {
            stands.sort_by(|a, b| a.start.total_cmp(&b.start));
            let mut merged = false;
            for i in 0..stands.len().saturating_sub(1) {
                let (a, b) = (stands[i], stands[i + 1]);
                if a.gap_to(&b) >= sw {
                    continue;
                }
                let rest: Vec<Span> = stands
                    .iter()
                    .enumerate()
                    .filter(|&(j, _)| j != i && j != i + 1)
                    .map(|(_, s)| *s)
                    .collect();
                let middle = (a.center() + b.center()) / 2.0 - sw / 2.0;
                let replacement = [middle, a.start, b.start]
                    .into_iter()
                    .map(|s| Span::with_length(s, sw))
                    .find(|span| {
                        if !self.admissible(span, active, &rest, tall) {
                            return false;
                        }
                        let mut trial = rest.clone();
                        trial.push(*span);
                        active.iter().all(|c| balanced(&c.span, &trial))
                    });
                if let Some(span) = replacement {
                    log::debug!("Merged stands at {:.1} and {:.1} into {:.1}", a.start, b.start, span.start);
                    let mut next = rest;
                    next.push(span);
                    *stands = next;
                    merged = true;
                    break;
                }
            }
            if !merged {
                return;
            }
        }
    }

    /// Greedy reduction down to the stand limit.
    ///
    /// Stands are removed lowest priority first, as long as every piece stays
    /// balanced. When nothing can be removed the lowest-priority piece is
    /// reverted instead.
    fn reduce(&self, active: &mut Vec<Carried>, stands: &mut Vec<Span>, reverted: &mut Vec<PieceId>) {
        let Some(limit) = self.container.max_stands() else {
            return;
        };

        while stands.len() > limit {
            let mut order: Vec<usize> = (0..stands.len()).collect();
            order.sort_by(|&a, &b| {
                let (pa, la) = rank(&stands[a], active);
                let (pb, lb) = rank(&stands[b], active);
                pa.cmp(&pb).then(la.total_cmp(&lb)).then(a.cmp(&b))
            });

            let removable = order.into_iter().find(|&candidate| {
                let trial: Vec<Span> = stands
                    .iter()
                    .enumerate()
                    .filter(|&(j, _)| j != candidate)
                    .map(|(_, s)| *s)
                    .collect();
                active.iter().all(|c| balanced(&c.span, &trial))
            });

            match removable {
                Some(index) => {
                    stands.remove(index);
                }
                None => {
                    let Some(victim) = lowest_priority(active) else {
                        stands.clear();
                        return;
                    };
                    let piece = active.remove(victim);
                    log::warn!(
                        "Stand limit {} reached on {}, reverting {}",
                        limit,
                        self.container.id(),
                        piece.id
                    );
                    reverted.push(piece.id);
                    stands.retain(|s| !touched(s, active).is_empty());
                }
            }
        }
    }
}

/// Indices of the pieces a stand at `span` carries.
fn touched(span: &Span, active: &[Carried]) -> Vec<usize> {
    active
        .iter()
        .enumerate()
        .filter(|(_, c)| c.span.overlaps(span))
        .map(|(i, _)| i)
        .collect()
}

/// Returns true if `stand` carries `piece` and is centred in the given half.
fn serves(stand: &Span, piece: &Span, half: Half) -> bool {
    if !stand.overlaps(piece) {
        return false;
    }
    let mid = piece.center();
    match half {
        Half::Lower => stand.center() <= mid + EPSILON,
        Half::Upper => stand.center() >= mid - EPSILON,
    }
}

/// Two distinct stands under `piece`, one centred in each half.
pub fn balanced(piece: &Span, stands: &[Span]) -> bool {
    let under: Vec<&Span> = stands.iter().filter(|s| s.overlaps(piece)).collect();
    if under.len() < 2 {
        return false;
    }
    let lower = under.iter().filter(|s| serves(s, piece, Half::Lower)).count();
    let upper = under.iter().filter(|s| serves(s, piece, Half::Upper)).count();
    lower >= 1 && upper >= 1
}

/// Removal rank of a stand: highest priority it carries, then its load.
fn rank(stand: &Span, active: &[Carried]) -> (i32, f64) {
    let carried = touched(stand, active);
    let priority = carried
        .iter()
        .map(|&t| active[t].priority)
        .max()
        .unwrap_or(i32::MIN);
    let load = carried.iter().map(|&t| active[t].weight).sum();
    (priority, load)
}

/// Lowest-priority piece; ties go to the one furthest along the axis.
fn lowest_priority(active: &[Carried]) -> Option<usize> {
    active
        .iter()
        .enumerate()
        .min_by(|(_, a), (_, b)| {
            a.priority
                .cmp(&b.priority)
                .then(b.span.start.total_cmp(&a.span.start))
                .then_with(|| b.id.cmp(&a.id))
        })
        .map(|(i, _)| i)
}

#[cfg(test)]
mod tests {
    use super::*;
    use autoclave_nesting_core::Rect;

    fn two_level(max_stands: Option<usize>) -> Container {
        let container = Container::new("AC", 1200.0, 1000.0)
            .with_max_weight(2000.0)
            .with_two_levels(250.0, 300.0)
            .with_min_stand_clearance(50.0);
        match max_stands {
            Some(limit) => container.with_max_stands(limit),
            None => container,
        }
    }

    fn upper(id: &str, x: f64, y: f64, w: f64, h: f64) -> Placement {
        Placement::new(id, Rect::new(x, y, w, h), false, Level::Upper)
    }

    fn assert_rules(plan: &StandPlan, pieces: &[Piece], placements: &[Placement], container: &Container) {
        let spans: Vec<Span> = plan.stands.iter().map(|s| s.span()).collect();
        for p in placements.iter().filter(|p| p.level == Level::Upper) {
            if plan.reverted.contains(&p.piece_id) {
                continue;
            }
            assert!(balanced(&p.x_span(), &spans), "{} unbalanced", p.piece_id);
        }
        for stand in &plan.stands {
            let load: f64 = stand
                .supported_piece_ids
                .iter()
                .filter_map(|id| pieces.iter().find(|p| p.id() == id))
                .map(|p| p.weight())
                .sum();
            assert!(load <= container.stand_weight_capacity() + 1e-9);
            assert!(!stand.supported_piece_ids.is_empty());
        }
        for pair in spans.windows(2) {
            assert!(pair[0].gap_to(&pair[1]) >= container.min_clearance_between_stands() - 1e-9);
        }
    }

    #[test]
    fn test_each_piece_gets_two_balanced_stands() {
        let container = two_level(Some(6));
        let config = SolverConfig::default();
        let pieces: Vec<Piece> = (0..3)
            .map(|i| Piece::new(format!("U{}", i), 380.0, 450.0).with_weight(95.0))
            .collect();
        let placements: Vec<Placement> = (0..3)
            .map(|i| upper(&format!("U{}", i), i as f64 * 385.0, 0.0, 380.0, 450.0))
            .collect();

        let plan = StandPlanner::new(&container, &config).plan(&pieces, &placements);
        assert!(plan.reverted.is_empty());
        assert_eq!(plan.stands.len(), 6);
        assert_rules(&plan, &pieces, &placements, &container);
        assert_eq!(plan.stands[0].sequence_index, 0);
        assert!(plan.stands.windows(2).all(|w| w[0].x < w[1].x));
    }

    #[test]
    fn test_stacked_pieces_share_stands_away_from_edges() {
        let container = two_level(None);
        let config = SolverConfig::default();
        let pieces = vec![
            Piece::new("A", 400.0, 450.0).with_weight(95.0),
            Piece::new("B", 400.0, 450.0).with_weight(95.0),
        ];
        let placements = vec![upper("A", 0.0, 0.0, 400.0, 450.0), upper("B", 0.0, 455.0, 400.0, 450.0)];

        let plan = StandPlanner::new(&container, &config).plan(&pieces, &placements);
        assert_eq!(plan.stands.len(), 2);
        for stand in &plan.stands {
            assert!(stand.is_shared());
            assert!(stand.x >= 80.0 - 1e-9);
            assert!(stand.x + stand.width_along_axis <= 320.0 + 1e-9);
        }
        assert_rules(&plan, &pieces, &placements, &container);
    }

    #[test]
    fn test_overloaded_column_reverts_one_piece() {
        let container = two_level(None);
        let config = SolverConfig::default();
        let pieces: Vec<Piece> = ["A", "B", "C"]
            .iter()
            .map(|id| Piece::new(*id, 400.0, 300.0).with_weight(95.0))
            .collect();
        let placements = vec![
            upper("A", 0.0, 0.0, 400.0, 300.0),
            upper("B", 0.0, 305.0, 400.0, 300.0),
            upper("C", 0.0, 610.0, 400.0, 300.0),
        ];

        let plan = StandPlanner::new(&container, &config).plan(&pieces, &placements);
        assert_eq!(plan.reverted, vec!["A".to_string()]);
        assert_eq!(plan.stands.len(), 2);
        assert_rules(&plan, &pieces, &placements, &container);
    }

    #[test]
    fn test_stand_limit_reverts_lowest_priority() {
        let container = two_level(Some(4));
        let config = SolverConfig::default();
        let pieces = vec![
            Piece::new("HI", 380.0, 450.0).with_weight(95.0).with_priority(5),
            Piece::new("MID", 380.0, 450.0).with_weight(95.0).with_priority(3),
            Piece::new("LO", 380.0, 450.0).with_weight(95.0),
        ];
        let placements = vec![
            upper("LO", 0.0, 0.0, 380.0, 450.0),
            upper("HI", 385.0, 0.0, 380.0, 450.0),
            upper("MID", 770.0, 0.0, 380.0, 450.0),
        ];

        let plan = StandPlanner::new(&container, &config).plan(&pieces, &placements);
        assert_eq!(plan.reverted, vec!["LO".to_string()]);
        assert_eq!(plan.stands.len(), 4);
        assert_rules(&plan, &pieces, &placements, &container);
    }

    #[test]
    fn test_narrow_piece_cannot_be_balanced() {
        let container = two_level(None);
        let config = SolverConfig::default();
        let pieces = vec![Piece::new("N", 100.0, 400.0).with_weight(10.0)];
        let placements = vec![upper("N", 0.0, 0.0, 100.0, 400.0)];

        let plan = StandPlanner::new(&container, &config).plan(&pieces, &placements);
        assert_eq!(plan.reverted, vec!["N".to_string()]);
        assert!(plan.stands.is_empty());
    }

    #[test]
    fn test_stands_closer_than_stand_width_merge() {
        let container = Container::new("AC", 1200.0, 1000.0).with_two_levels(250.0, 300.0);
        let config = SolverConfig::default();
        let planner = StandPlanner::new(&container, &config);
        let active = vec![Carried {
            id: "U".to_string(),
            span: Span::new(0.0, 600.0),
            weight: 10.0,
            priority: 0,
        }];

        let mut close = vec![Span::new(100.0, 180.0), Span::new(200.0, 280.0), Span::new(400.0, 480.0)];
        planner.merge(&active, &mut close, &[]);
        close.sort_by(|a, b| a.start.total_cmp(&b.start));
        assert_eq!(close, vec![Span::new(150.0, 230.0), Span::new(400.0, 480.0)]);

        let mut apart = vec![Span::new(100.0, 180.0), Span::new(260.0, 340.0), Span::new(420.0, 500.0)];
        planner.merge(&active, &mut apart, &[]);
        assert_eq!(apart.len(), 3);
    }

    #[test]
    fn test_stands_avoid_tall_base_pieces() {
        let container = two_level(None);
        let config = SolverConfig::default();
        let pieces = vec![
            Piece::new("U", 600.0, 400.0).with_weight(50.0),
            Piece::new("T", 100.0, 100.0).with_height_clearance(500.0),
        ];
        let placements = vec![
            upper("U", 0.0, 0.0, 600.0, 400.0),
            Placement::new("T", Rect::new(100.0, 600.0, 100.0, 100.0), false, Level::Base),
        ];

        let plan = StandPlanner::new(&container, &config).plan(&pieces, &placements);
        assert!(plan.reverted.is_empty());
        let tall = Span::new(100.0, 200.0);
        assert!(plan.stands.iter().all(|s| !s.span().overlaps(&tall)));
        assert_rules(&plan, &pieces, &placements, &container);
    }
}
