//! Layout of one container on the base level and, where available, the
//! elevated level.
//!
//! In balanced mode a joint greedy pass decides which pieces are worth
//! deferring to level 1: each piece goes to the level where its first-fit
//! position ranks earlier, with a small penalty on level 1. Level 0 is then
//! solved by the strategy controller, level 1 by the heuristic, and deferred
//! pieces that found no room upstairs are offered to level 0 again.
//!
//! Stands are planned last. Level-1 pieces that cannot be supported are moved
//! to level 0 if they fit there, or excluded.

use std::collections::{HashMap, HashSet};

use autoclave_nesting_core::{
    AlgorithmStatus, Container, Exclusion, ExclusionReason, Level, Piece, PieceId, Placement,
    Rect, SearchStats, SolverConfig, Stand,
};

use crate::controller::StrategyController;
use crate::eligibility::EligiblePiece;
use crate::heuristic::{placement_order, BottomLeftFill};
use crate::occupancy::LevelCanvas;
use crate::orientation::OrientationPolicy;
use crate::stands::StandPlanner;
use crate::strategy::{Deadline, LevelLayout, LevelRequest, Overhead, PlacementStrategy};

/// Layout of one container before auditing.
#[derive(Debug, Clone, PartialEq)]
pub struct LayoutOutcome {
    /// Placements on both levels.
    pub placements: Vec<Placement>,
    /// Stands under level 1.
    pub stands: Vec<Stand>,
    /// Eligible pieces that were not placed.
    pub unplaced: Vec<Exclusion>,
    /// Status of the base-level solve.
    pub status: AlgorithmStatus,
    /// Exact-search statistics of the base-level solve.
    pub stats: Option<SearchStats>,
}

/// Lays out one container over one or two levels.
pub struct TwoLevelPlanner<'a> {
    config: &'a SolverConfig,
    container: &'a Container,
    containers: usize,
    deadline: Deadline,
}

impl<'a> TwoLevelPlanner<'a> {
    /// Creates a planner for `container`.
    pub fn new(config: &'a SolverConfig, container: &'a Container) -> Self {
        Self {
            config,
            container,
            containers: 1,
            deadline: Deadline::none(),
        }
    }

    /// Number of containers solved in the same batch (sizes the time budget).
    pub fn with_batch_size(mut self, containers: usize) -> Self {
        self.containers = containers.max(1);
        self
    }

    /// Sets the deadline.
    pub fn with_deadline(mut self, deadline: Deadline) -> Self {
        self.deadline = deadline;
        self
    }

    /// Lays out the eligible pieces.
    pub fn plan(&self, eligible: &[EligiblePiece]) -> LayoutOutcome {
        let all: Vec<&Piece> = eligible.iter().map(|e| &e.piece).collect();
        let upper_capable: HashSet<&str> = eligible
            .iter()
            .filter(|e| e.can_use_upper)
            .map(|e| e.piece.id().as_str())
            .collect();

        let mut book = Ledger::default();
        if !self.container.supports_two_level() || upper_capable.is_empty() {
            let base = StrategyController::new(self.config)
                .execute(&self.request(Level::Base, all.clone()), self.containers);
            book.record(&base.unplaced);
            return self.outcome(&all, base.placements, Vec::new(), book, base.status, base.stats);
        }

        let deferred = if self.config.prefer_base_level {
            HashSet::new()
        } else {
            self.defer(&all, &upper_capable)
        };
        log::debug!(
            "{}: {} of {} pieces deferred to {}",
            self.container.id(),
            deferred.len(),
            all.len(),
            Level::Upper
        );

        let base_pieces: Vec<&Piece> = all
            .iter()
            .copied()
            .filter(|p| !deferred.contains(p.id().as_str()))
            .collect();
        let base = StrategyController::new(self.config)
            .execute(&self.request(Level::Base, base_pieces), self.containers);
        book.record(&base.unplaced);
        let mut base_placements = base.placements;

        let upper_pool: Vec<&Piece> = all
            .iter()
            .copied()
            .filter(|p| {
                let id = p.id().as_str();
                deferred.contains(id)
                    || (upper_capable.contains(id) && book.reason.contains_key(id))
            })
            .collect();
        let upper = self.fill_upper(upper_pool, &base_placements, &all);
        book.record(&upper.unplaced);
        let mut upper_placements = upper.placements;

        let retry: Vec<&Piece> = all
            .iter()
            .copied()
            .filter(|p| deferred.contains(p.id().as_str()) && book.reason.contains_key(p.id().as_str()))
            .collect();
        if !retry.is_empty() {
            let overhead: Vec<Rect> = upper_placements.iter().map(|p| p.rect()).collect();
            let layout = self.fill_base(retry, &base_placements, &upper_placements, overhead, &all);
            book.record(&layout.unplaced);
            book.clear(&layout.placements);
            base_placements.extend(layout.placements);
        }

        // An optimal base level no longer proves the whole layout optimal.
        let status = match base.status {
            AlgorithmStatus::Optimal if !upper_placements.is_empty() => AlgorithmStatus::Feasible,
            other => other,
        };

        // Tall level-0 pieces constrain where stands may go.
        let mut laid_out = base_placements.clone();
        laid_out.extend(upper_placements.iter().cloned());
        let plan = StandPlanner::new(self.container, self.config).plan(all.iter().copied(), &laid_out);
        if !plan.reverted.is_empty() {
            let reverted: HashSet<&str> = plan.reverted.iter().map(|id| id.as_str()).collect();
            upper_placements.retain(|p| !reverted.contains(p.piece_id.as_str()));
            for id in &plan.reverted {
                book.reason
                    .insert(id.clone(), ExclusionReason::InsufficientPhysicalSupport);
            }

            let repair: Vec<&Piece> = all
                .iter()
                .copied()
                .filter(|p| reverted.contains(p.id().as_str()))
                .collect();
            let mut overhead: Vec<Rect> = upper_placements.iter().map(|p| p.rect()).collect();
            overhead.extend(plan.stands.iter().map(|s| s.footprint(self.container.plan_length())));
            let layout = self.fill_base(repair, &base_placements, &upper_placements, overhead, &all);
            book.clear(&layout.placements);
            for placement in &layout.placements {
                log::debug!("{} moved to {} for lack of support", placement.piece_id, Level::Base);
            }
            base_placements.extend(layout.placements);
        }

        let mut placements = base_placements;
        placements.extend(upper_placements);
        self.outcome(&all, placements, plan.stands, book, status, base.stats)
    }

    /// Pieces whose first-fit position ranks better on level 1.
    fn defer(&self, all: &[&Piece], upper_capable: &HashSet<&str>) -> HashSet<PieceId> {
        let base_request = self.request(Level::Base, all.to_vec()).with_overhead(Overhead {
            max_clearance: self.container.stand_height(),
            regions: Vec::new(),
        });
        let upper_request = self.request(Level::Upper, all.to_vec());
        let heuristic = BottomLeftFill::new(self.config);
        let policy = OrientationPolicy::new(self.config, base_request.usable);
        let margin = self.config.margin;
        let mut base = LevelCanvas::from_request(&base_request, margin);
        let mut upper = LevelCanvas::from_request(&upper_request, margin);

        let plan_w = self.container.plan_width();
        let rank = |rect: &Rect| (rect.y * plan_w + rect.x) / self.container.plan_area();
        let mut deferred = HashSet::new();

        for piece in placement_order(all) {
            let total = base.weight_used() + upper.weight_used() + piece.weight();
            let lines = base
                .lines_used()
                .checked_add(upper.lines_used())
                .and_then(|l| l.checked_add(piece.lines_required()));
            let over_lines = lines.map_or(true, |l| l > self.container.line_capacity());
            if total > self.container.max_weight() + 1e-9 || over_lines {
                continue;
            }
            let choice = policy.choices(piece);
            let on_base = base
                .budget_violation(piece)
                .is_none()
                .then(|| heuristic.first_fit(&base, piece, &choice))
                .flatten();
            let on_upper = (upper_capable.contains(piece.id().as_str())
                && upper.budget_violation(piece).is_none())
            .then(|| heuristic.first_fit(&upper, piece, &choice))
            .flatten();

            let go_upper = match (&on_base, &on_upper) {
                (None, Some(_)) => true,
                (Some((b, _)), Some((u, _))) => {
                    rank(u) + self.config.upper_level_penalty < rank(b)
                }
                _ => false,
            };

            if go_upper {
                if let Some((rect, _)) = on_upper {
                    upper.commit(piece, rect);
                    base.cover(rect);
                    deferred.insert(piece.id().clone());
                }
            } else if let Some((rect, _)) = on_base {
                base.commit(piece, rect);
                if base.is_tall(piece) {
                    upper.block(rect);
                }
            }
        }
        deferred
    }

    /// Level-1 heuristic pass above the given base layout.
    fn fill_upper(&self, pool: Vec<&Piece>, base: &[Placement], all: &[&Piece]) -> LevelLayout {
        if pool.is_empty() {
            return LevelLayout::empty(AlgorithmStatus::Heuristic);
        }
        let (weight, lines) = load(base, all);
        let obstacles: Vec<Rect> = base
            .iter()
            .filter(|p| self.is_tall(&p.piece_id, all))
            .map(|p| p.rect())
            .collect();
        let request = self
            .request(Level::Upper, pool)
            .with_obstacles(obstacles)
            .with_weight_limit(
                self.container
                    .level_weight_cap()
                    .min(self.container.max_weight() - weight),
            )
            .with_line_limit(self.container.line_capacity().saturating_sub(lines));
        BottomLeftFill::new(self.config).place(&request)
    }

    /// Level-0 heuristic pass around existing placements.
    fn fill_base(
        &self,
        pool: Vec<&Piece>,
        base: &[Placement],
        upper: &[Placement],
        overhead: Vec<Rect>,
        all: &[&Piece],
    ) -> LevelLayout {
        let (base_weight, base_lines) = load(base, all);
        let (upper_weight, upper_lines) = load(upper, all);
        let request = self
            .request(Level::Base, pool)
            .with_occupied(base.iter().map(|p| p.rect()).collect())
            .with_overhead(Overhead {
                max_clearance: self.container.stand_height(),
                regions: overhead,
            })
            .with_weight_limit(
                (self.container.level_weight_cap() - base_weight)
                    .min(self.container.max_weight() - base_weight - upper_weight),
            )
            .with_line_limit(
                self.container
                    .line_capacity()
                    .saturating_sub(base_lines.saturating_add(upper_lines)),
            );
        BottomLeftFill::new(self.config).place(&request)
    }

    fn request<'p>(&self, level: Level, pieces: Vec<&'p Piece>) -> LevelRequest<'p> {
        LevelRequest::new(level, pieces, self.container, self.config)
            .with_deadline(self.deadline.clone())
    }

    fn is_tall(&self, piece_id: &str, all: &[&Piece]) -> bool {
        all.iter()
            .find(|p| p.id() == piece_id)
            .is_some_and(|p| p.height_clearance() > self.container.stand_height())
    }

    fn outcome(
        &self,
        all: &[&Piece],
        placements: Vec<Placement>,
        stands: Vec<Stand>,
        book: Ledger,
        status: AlgorithmStatus,
        stats: Option<SearchStats>,
    ) -> LayoutOutcome {
        let placed: HashSet<&str> = placements.iter().map(|p| p.piece_id.as_str()).collect();
        let unplaced = all
            .iter()
            .filter(|p| !placed.contains(p.id().as_str()))
            .map(|p| {
                let reason = book
                    .reason
                    .get(p.id().as_str())
                    .copied()
                    .unwrap_or(ExclusionReason::NoFreePosition);
                Exclusion::new(p.id().clone(), reason)
            })
            .collect();
        LayoutOutcome {
            placements,
            stands,
            unplaced,
            status,
            stats,
        }
    }
}

/// Latest exclusion reason of every piece still unplaced.
#[derive(Debug, Default)]
struct Ledger {
    reason: HashMap<PieceId, ExclusionReason>,
}

impl Ledger {
    fn record(&mut self, unplaced: &[Exclusion]) {
        for exclusion in unplaced {
            self.reason
                .insert(exclusion.piece_id.clone(), exclusion.reason);
        }
    }

    fn clear(&mut self, placed: &[Placement]) {
        for placement in placed {
            self.reason.remove(&placement.piece_id);
        }
    }
}

/// Weight and lines of a set of placements.
fn load(placements: &[Placement], all: &[&Piece]) -> (f64, u32) {
    placements
        .iter()
        .filter_map(|p| all.iter().find(|piece| piece.id() == &p.piece_id))
        .fold((0.0, 0u32), |(w, l), piece| {
            (w + piece.weight(), l.saturating_add(piece.lines_required()))
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::eligibility::{EligibilityFilter, NoReservations};
    use crate::stands::balanced;

    fn eligible(pieces: &[Piece], container: &Container, config: &SolverConfig) -> Vec<EligiblePiece> {
        EligibilityFilter::new(config, &NoReservations)
            .filter(pieces, container)
            .eligible
    }

    fn scenario_c() -> (Container, Vec<Piece>) {
        let container = Container::new("AC-2L", 1200.0, 500.0)
            .with_max_weight(1000.0)
            .with_two_levels(250.0, 300.0)
            .with_max_stands(6)
            .with_min_stand_clearance(50.0);
        let pieces = (0..6)
            .map(|i| {
                Piece::new(format!("T{}", i), 380.0, 450.0)
                    .with_weight(95.0)
                    .with_rotation(false)
            })
            .collect();
        (container, pieces)
    }

    #[test]
    fn test_single_level_container_uses_base_only() {
        let container = Container::new("AC", 1000.0, 1000.0);
        let config = SolverConfig::default().with_time_bounds(100, 2_000);
        let pieces = vec![Piece::new("A", 400.0, 300.0), Piece::new("B", 500.0, 200.0)];
        let outcome = TwoLevelPlanner::new(&config, &container).plan(&eligible(&pieces, &container, &config));

        assert_eq!(outcome.placements.len(), 2);
        assert!(outcome.placements.iter().all(|p| p.level == Level::Base));
        assert!(outcome.stands.is_empty());
        assert_eq!(outcome.status, AlgorithmStatus::Optimal);
    }

    #[test]
    fn test_overflow_goes_to_upper_level_with_stands() {
        let (container, pieces) = scenario_c();
        let config = SolverConfig::default().with_time_bounds(100, 2_000);
        let outcome = TwoLevelPlanner::new(&config, &container).plan(&eligible(&pieces, &container, &config));

        let upper: Vec<&Placement> = outcome.placements.iter().filter(|p| p.level == Level::Upper).collect();
        assert_eq!(outcome.placements.len(), 6);
        assert_eq!(upper.len(), 3);
        assert!(outcome.unplaced.is_empty());
        assert!(outcome.stands.len() <= 6);

        let spans: Vec<_> = outcome.stands.iter().map(|s| s.span()).collect();
        for p in upper {
            assert!(balanced(&p.x_span(), &spans));
        }
        for stand in &outcome.stands {
            assert!(stand.supported_piece_ids.len() as f64 * 95.0 <= 250.0);
        }
    }

    #[test]
    fn test_prefer_base_level_fills_base_first() {
        let (container, pieces) = scenario_c();
        let config = SolverConfig::default()
            .with_time_bounds(100, 2_000)
            .with_prefer_base_level(true);
        let outcome = TwoLevelPlanner::new(&config, &container).plan(&eligible(&pieces, &container, &config));

        let base = outcome.placements.iter().filter(|p| p.level == Level::Base).count();
        assert_eq!(base, 3);
        assert_eq!(outcome.placements.len(), 6);
    }

    #[test]
    fn test_unsupported_piece_is_excluded() {
        let container = Container::new("AC-2L", 500.0, 500.0)
            .with_two_levels(250.0, 300.0);
        let config = SolverConfig::default().with_time_bounds(100, 2_000);
        // The second piece only fits upstairs and is too narrow for two stands.
        let pieces = vec![
            Piece::new("BIG", 500.0, 500.0).with_rotation(false),
            Piece::new("NARROW", 100.0, 400.0).with_rotation(false),
        ];
        let outcome = TwoLevelPlanner::new(&config, &container).plan(&eligible(&pieces, &container, &config));

        assert_eq!(outcome.placements.len(), 1);
        assert_eq!(outcome.unplaced.len(), 1);
        assert_eq!(outcome.unplaced[0].piece_id, "NARROW");
        assert_eq!(
            outcome.unplaced[0].reason,
            ExclusionReason::InsufficientPhysicalSupport
        );
        assert!(outcome.stands.is_empty());
    }

    #[test]
    fn test_upper_pieces_avoid_tall_base_pieces() {
        let container = Container::new("AC-2L", 1000.0, 400.0)
            .with_two_levels(250.0, 300.0);
        let config = SolverConfig::default().with_time_bounds(100, 2_000);
        let pieces = vec![
            Piece::new("TALL", 500.0, 400.0)
                .with_height_clearance(600.0)
                .with_rotation(false),
            Piece::new("LOW", 495.0, 400.0).with_rotation(false),
            Piece::new("UP", 400.0, 300.0).with_weight(20.0).with_rotation(false),
        ];
        let outcome = TwoLevelPlanner::new(&config, &container).plan(&eligible(&pieces, &container, &config));

        let tall = outcome.placements.iter().find(|p| p.piece_id == "TALL").unwrap();
        for p in outcome.placements.iter().filter(|p| p.level == Level::Upper) {
            assert!(!p.x_span().overlaps(&tall.x_span()));
        }
        for s in &outcome.stands {
            assert!(!s.span().overlaps(&tall.x_span()));
        }
    }

    #[test]
    fn test_stands_skip_tall_piece_in_another_row() {
        let container = Container::new("AC-2L", 1000.0, 1000.0)
            .with_two_levels(250.0, 300.0)
            .with_min_stand_clearance(50.0);
        let config = SolverConfig::heuristic_only().with_prefer_base_level(true);
        // TALL ends up behind BASE, under the X range UP covers upstairs.
        let pieces = vec![
            Piece::new("BASE", 1000.0, 795.0).with_rotation(false),
            Piece::new("UP", 1000.0, 700.0).with_weight(20.0).with_rotation(false),
            Piece::new("TALL", 400.0, 200.0)
                .with_height_clearance(500.0)
                .with_rotation(false),
        ];
        let outcome = TwoLevelPlanner::new(&config, &container).plan(&eligible(&pieces, &container, &config));

        let tall = outcome.placements.iter().find(|p| p.piece_id == "TALL").unwrap();
        let up = outcome.placements.iter().find(|p| p.piece_id == "UP").unwrap();
        assert_eq!(tall.level, Level::Base);
        assert_eq!(up.level, Level::Upper);
        assert!(up.x_span().overlaps(&tall.x_span()));
        assert!(!up.rect().intersects(&tall.rect()));

        assert_eq!(outcome.stands.len(), 2);
        for s in &outcome.stands {
            assert!(!s.span().overlaps(&tall.x_span()));
        }
        let spans: Vec<_> = outcome.stands.iter().map(|s| s.span()).collect();
        assert!(balanced(&up.x_span(), &spans));
    }
}
