//! Eligibility filter.
//!
//! Decides which pieces may enter a container at all and which of them may
//! also be offered to the elevated level.

use std::collections::{BTreeSet, HashSet};

use autoclave_nesting_core::{
    Container, Exclusion, ExclusionReason, Piece, PieceId, Rect, SolverConfig,
};

/// Answers whether a piece is already committed to another active solution.
pub trait ReservationOracle: Send + Sync {
    /// Returns true if the piece must not be placed by this solve.
    fn is_reserved(&self, piece_id: &PieceId) -> bool;
}

/// Oracle for callers without reservation state.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoReservations;

impl ReservationOracle for NoReservations {
    fn is_reserved(&self, _piece_id: &PieceId) -> bool {
        false
    }
}

impl ReservationOracle for HashSet<PieceId> {
    fn is_reserved(&self, piece_id: &PieceId) -> bool {
        self.contains(piece_id)
    }
}

impl ReservationOracle for BTreeSet<PieceId> {
    fn is_reserved(&self, piece_id: &PieceId) -> bool {
        self.contains(piece_id)
    }
}

/// A piece admitted to the container.
#[derive(Debug, Clone, PartialEq)]
pub struct EligiblePiece {
    /// The piece.
    pub piece: Piece,
    /// Whether the piece may be placed on level 1.
    pub can_use_upper: bool,
}

/// Partition of a request into admitted and excluded pieces.
#[derive(Debug, Clone, Default)]
pub struct EligibilityReport {
    /// Pieces admitted, in request order.
    pub eligible: Vec<EligiblePiece>,
    /// Pieces rejected, with reasons.
    pub excluded: Vec<Exclusion>,
}

impl EligibilityReport {
    /// Number of pieces allowed on level 1.
    pub fn upper_candidates(&self) -> usize {
        self.eligible.iter().filter(|e| e.can_use_upper).count()
    }
}

/// Eligibility filter for one container.
pub struct EligibilityFilter<'a> {
    config: &'a SolverConfig,
    reservations: &'a dyn ReservationOracle,
}

impl<'a> EligibilityFilter<'a> {
    /// Creates a filter.
    pub fn new(config: &'a SolverConfig, reservations: &'a dyn ReservationOracle) -> Self {
        Self {
            config,
            reservations,
        }
    }

    /// Splits `pieces` into eligible and excluded for `container`.
    pub fn filter(&self, pieces: &[Piece], container: &Container) -> EligibilityReport {
        let usable = usable_plan(container, self.config);
        let mut report = EligibilityReport::default();

        for piece in pieces {
            match self.rejection(piece, container, usable) {
                Some(reason) => {
                    log::debug!("{} excluded from {}: {}", piece.id(), container.id(), reason);
                    report.excluded.push(Exclusion::new(piece.id().clone(), reason));
                }
                None => report.eligible.push(EligiblePiece {
                    can_use_upper: self.can_use_upper(piece, container),
                    piece: piece.clone(),
                }),
            }
        }

        log::debug!(
            "Eligibility for {}: {} eligible ({} upper-capable), {} excluded",
            container.id(),
            report.eligible.len(),
            report.upper_candidates(),
            report.excluded.len()
        );
        report
    }

    /// First reason the piece cannot enter the container, if any.
    pub fn rejection(
        &self,
        piece: &Piece,
        container: &Container,
        usable: Option<Rect>,
    ) -> Option<ExclusionReason> {
        if let Some(cycle) = &self.config.cure_cycle {
            if piece.cure_cycle_id() != cycle {
                return Some(ExclusionReason::IncompatibleCureCycle);
            }
        }

        let fits = usable.is_some_and(|plan| {
            piece.allowed_orientations().into_iter().any(|o| {
                let (w, h) = piece.footprint(o);
                plan.can_hold(w, h)
            })
        });
        if !fits {
            return Some(ExclusionReason::DimensionExceedsContainer);
        }

        if piece.weight() > container.max_weight() {
            return Some(ExclusionReason::WeightLimitExceeded);
        }
        if piece.lines_required() > container.line_capacity() {
            return Some(ExclusionReason::LineCapacityExceeded);
        }
        if self.reservations.is_reserved(piece.id()) {
            return Some(ExclusionReason::AlreadyReserved);
        }
        None
    }

    /// Whether the piece may be offered to the elevated level.
    ///
    /// Every limit is optional; an unset limit never restricts.
    pub fn can_use_upper(&self, piece: &Piece, container: &Container) -> bool {
        if !container.supports_two_level() {
            return false;
        }
        if piece.weight() > container.stand_weight_capacity() {
            return false;
        }
        if self
            .config
            .upper_max_piece_weight
            .is_some_and(|limit| piece.weight() > limit)
        {
            return false;
        }
        if self
            .config
            .upper_max_clearance
            .is_some_and(|limit| piece.height_clearance() > limit)
        {
            return false;
        }

        let max_w = self.config.upper_max_width.unwrap_or(f64::INFINITY);
        let max_h = self.config.upper_max_height.unwrap_or(f64::INFINITY);
        piece.allowed_orientations().into_iter().any(|o| {
            let (w, h) = piece.footprint(o);
            w <= max_w && h <= max_h
        })
    }
}

/// Usable plan of the container after the wall keep-out band.
pub fn usable_plan(container: &Container, config: &SolverConfig) -> Option<Rect> {
    if config.edge_clearance > 0.0 {
        container.plan().inset(config.edge_clearance)
    } else {
        Some(container.plan())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn container() -> Container {
        Container::new("AC", 1200.0, 2000.0)
            .with_max_weight(100.0)
            .with_line_capacity(4)
    }

    #[test]
    fn test_dimension_exceeds_in_both_orientations() {
        let config = SolverConfig::default();
        let filter = EligibilityFilter::new(&config, &NoReservations);
        let report = filter.filter(&[Piece::new("BIG", 1300.0, 1300.0)], &container());

        assert!(report.eligible.is_empty());
        assert_eq!(
            report.excluded[0].reason,
            ExclusionReason::DimensionExceedsContainer
        );
    }

    #[test]
    fn test_rotation_rescues_oversized_width() {
        let config = SolverConfig::default();
        let filter = EligibilityFilter::new(&config, &NoReservations);
        let rotatable = Piece::new("R", 1500.0, 900.0);
        let fixed = Piece::new("F", 1500.0, 900.0).with_rotation(false);
        let report = filter.filter(&[rotatable, fixed], &container());

        assert_eq!(report.eligible.len(), 1);
        assert_eq!(report.eligible[0].piece.id(), "R");
        assert_eq!(report.excluded[0].piece_id, "F");
    }

    #[test]
    fn test_weight_lines_and_reservation() {
        let config = SolverConfig::default();
        let reserved: HashSet<PieceId> = ["R".to_string()].into_iter().collect();
        let filter = EligibilityFilter::new(&config, &reserved);
        let pieces = vec![
            Piece::new("W", 100.0, 100.0).with_weight(150.0),
            Piece::new("L", 100.0, 100.0).with_lines(5),
            Piece::new("R", 100.0, 100.0),
            Piece::new("OK", 100.0, 100.0),
        ];
        let report = filter.filter(&pieces, &container());

        let reasons: Vec<_> = report.excluded.iter().map(|e| e.reason).collect();
        assert_eq!(
            reasons,
            vec![
                ExclusionReason::WeightLimitExceeded,
                ExclusionReason::LineCapacityExceeded,
                ExclusionReason::AlreadyReserved,
            ]
        );
        assert_eq!(report.eligible.len(), 1);
    }

    #[test]
    fn test_cure_cycle_filter() {
        let config = SolverConfig::default().with_cure_cycle("CC-1");
        let filter = EligibilityFilter::new(&config, &NoReservations);
        let pieces = vec![
            Piece::new("A", 100.0, 100.0).with_cure_cycle("CC-1"),
            Piece::new("B", 100.0, 100.0).with_cure_cycle("CC-2"),
        ];
        let report = filter.filter(&pieces, &container());
        assert_eq!(report.eligible.len(), 1);
        assert_eq!(
            report.excluded[0].reason,
            ExclusionReason::IncompatibleCureCycle
        );
    }

    #[test]
    fn test_upper_level_defaults_are_permissive() {
        let config = SolverConfig::default();
        let filter = EligibilityFilter::new(&config, &NoReservations);
        let two_level = container().with_two_levels(250.0, 300.0);
        let piece = Piece::new("P", 1100.0, 1800.0).with_weight(90.0);

        assert!(filter.can_use_upper(&piece, &two_level));
        assert!(!filter.can_use_upper(&piece, &container()));
        assert!(!filter.can_use_upper(&piece.clone().with_weight(260.0), &two_level));
    }

    #[test]
    fn test_upper_level_configured_limits() {
        let config = SolverConfig::default()
            .with_upper_max_piece_weight(50.0)
            .with_upper_max_footprint(600.0, 600.0)
            .with_upper_max_clearance(200.0);
        let filter = EligibilityFilter::new(&config, &NoReservations);
        let two_level = container().with_two_levels(250.0, 300.0);

        assert!(filter.can_use_upper(&Piece::new("A", 500.0, 400.0), &two_level));
        assert!(!filter.can_use_upper(&Piece::new("B", 700.0, 400.0), &two_level));
        assert!(!filter.can_use_upper(
            &Piece::new("C", 500.0, 400.0).with_weight(60.0),
            &two_level
        ));
        assert!(!filter.can_use_upper(
            &Piece::new("D", 500.0, 400.0).with_height_clearance(250.0),
            &two_level
        ));
    }
}
