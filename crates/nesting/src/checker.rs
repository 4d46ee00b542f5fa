//! Independent audit of a finished layout.
//!
//! The checker only looks at the solution, the requested pieces and the
//! container. It shares no state with the strategies, so a bug in a solver
//! shows up here as a [`Violation`] instead of reaching the caller as a
//! physically unsafe layout.

use std::collections::{HashMap, HashSet};

use autoclave_nesting_core::{
    Container, Level, NestingSolution, Orientation, Piece, Placement, SolverConfig, Span, Stand,
    Violation, EPSILON,
};

use crate::stands::balanced;

/// Re-verifies every layout invariant.
pub struct ConsistencyChecker<'a> {
    config: &'a SolverConfig,
}

impl<'a> ConsistencyChecker<'a> {
    /// Creates a checker.
    pub fn new(config: &'a SolverConfig) -> Self {
        Self { config }
    }

    /// Runs the audit and records its verdict on the solution.
    ///
    /// Returns true if the layout is valid. Every violation is logged at
    /// error level: it means the producing solver has a defect.
    pub fn audit(&self, solution: &mut NestingSolution, pieces: &[Piece], container: &Container) -> bool {
        let violations = self.check(solution, pieces, container);
        for violation in &violations {
            log::error!(
                "Consistency check failed on {}: {}",
                container.id(),
                violation
            );
        }
        solution.valid = violations.is_empty();
        solution.metrics.violations = violations;
        solution.valid
    }

    /// Every violation found in `solution`.
    pub fn check(
        &self,
        solution: &NestingSolution,
        pieces: &[Piece],
        container: &Container,
    ) -> Vec<Violation> {
        let lookup: HashMap<&str, &Piece> = pieces.iter().map(|p| (p.id().as_str(), p)).collect();
        let mut violations = Vec::new();

        self.check_conservation(solution, &lookup, &mut violations);
        self.check_placements(solution, &lookup, container, &mut violations);
        self.check_overlaps(&solution.placements, &mut violations);
        self.check_capacity(&solution.placements, &lookup, container, &mut violations);
        self.check_stands(solution, &lookup, container, &mut violations);
        violations
    }

    fn check_conservation(
        &self,
        solution: &NestingSolution,
        lookup: &HashMap<&str, &Piece>,
        violations: &mut Vec<Violation>,
    ) {
        let mut seen: HashSet<&str> = HashSet::new();
        let reported = solution
            .placements
            .iter()
            .map(|p| p.piece_id.as_str())
            .chain(solution.excluded.iter().map(|e| e.piece_id.as_str()));

        for id in reported {
            if !lookup.contains_key(id) {
                violations.push(Violation::UnknownPiece {
                    piece_id: id.to_string(),
                });
            } else if !seen.insert(id) {
                violations.push(Violation::DuplicatePiece {
                    piece_id: id.to_string(),
                });
            }
        }

        let mut missing: Vec<&str> = lookup
            .keys()
            .copied()
            .filter(|id| !seen.contains(id))
            .collect();
        missing.sort_unstable();
        violations.extend(missing.into_iter().map(|id| Violation::MissingPiece {
            piece_id: id.to_string(),
        }));
    }

    fn check_placements(
        &self,
        solution: &NestingSolution,
        lookup: &HashMap<&str, &Piece>,
        container: &Container,
        violations: &mut Vec<Violation>,
    ) {
        let plan = container.plan();
        for placement in &solution.placements {
            let piece_id = placement.piece_id.clone();
            if !plan.contains(&placement.rect()) {
                violations.push(Violation::OutOfBounds {
                    piece_id: piece_id.clone(),
                });
            }
            if placement.level == Level::Upper && !container.supports_two_level() {
                violations.push(Violation::UpperLevelUnavailable {
                    piece_id: piece_id.clone(),
                });
            }

            let Some(piece) = lookup.get(placement.piece_id.as_str()) else {
                continue;
            };
            if placement.rotated && !piece.is_rotatable() {
                violations.push(Violation::RotationNotAllowed {
                    piece_id: piece_id.clone(),
                });
            }
            let orientation = if placement.rotated {
                Orientation::Rotated
            } else {
                Orientation::Declared
            };
            let (w, h) = piece.footprint(orientation);
            if (placement.width - w).abs() > EPSILON || (placement.height - h).abs() > EPSILON {
                violations.push(Violation::FootprintMismatch { piece_id });
            }
        }
    }

    fn check_overlaps(&self, placements: &[Placement], violations: &mut Vec<Violation>) {
        for level in Level::all() {
            let on_level: Vec<&Placement> = placements.iter().filter(|p| p.level == level).collect();
            for (i, a) in on_level.iter().enumerate() {
                for b in &on_level[i + 1..] {
                    if a.rect().conflicts_with(&b.rect(), self.config.margin) {
                        violations.push(Violation::Overlap {
                            level,
                            first: a.piece_id.clone(),
                            second: b.piece_id.clone(),
                        });
                    }
                }
            }
        }
    }

    fn check_capacity(
        &self,
        placements: &[Placement],
        lookup: &HashMap<&str, &Piece>,
        container: &Container,
        violations: &mut Vec<Violation>,
    ) {
        let mut total = 0.0;
        let mut lines: u64 = 0;
        for level in Level::all() {
            let mut load = 0.0;
            for piece in placements
                .iter()
                .filter(|p| p.level == level)
                .filter_map(|p| lookup.get(p.piece_id.as_str()))
            {
                load += piece.weight();
                lines += u64::from(piece.lines_required());
            }
            let limit = container.level_weight_cap();
            if load > limit + 1e-9 {
                violations.push(Violation::LevelWeightExceeded { level, load, limit });
            }
            total += load;
        }

        if total > container.max_weight() + 1e-9 {
            violations.push(Violation::WeightExceeded {
                load: total,
                limit: container.max_weight(),
            });
        }
        if lines > u64::from(container.line_capacity()) {
            violations.push(Violation::LineCapacityExceeded {
                used: u32::try_from(lines).unwrap_or(u32::MAX),
                capacity: container.line_capacity(),
            });
        }
    }

    fn check_stands(
        &self,
        solution: &NestingSolution,
        lookup: &HashMap<&str, &Piece>,
        container: &Container,
        violations: &mut Vec<Violation>,
    ) {
        let stands = &solution.stands;
        if let Some(limit) = container.max_stands() {
            if stands.len() > limit {
                violations.push(Violation::TooManyStands {
                    count: stands.len(),
                    limit,
                });
            }
        }

        let upper: Vec<&Placement> = solution
            .placements
            .iter()
            .filter(|p| p.level == Level::Upper)
            .collect();
        let tall: Vec<&Placement> = solution
            .placements
            .iter()
            .filter(|p| p.level == Level::Base)
            .filter(|p| {
                lookup
                    .get(p.piece_id.as_str())
                    .is_some_and(|piece| piece.height_clearance() > container.stand_height())
            })
            .collect();

        for (index, stand) in stands.iter().enumerate() {
            self.check_stand(index, stand, &upper, lookup, container, violations);
            for t in &tall {
                if t.x_span().overlaps(&stand.span()) {
                    violations.push(Violation::ClearanceViolation {
                        piece_id: t.piece_id.clone(),
                    });
                }
            }
        }

        let mut ordered: Vec<(usize, Span)> = stands.iter().map(|s| s.span()).enumerate().collect();
        ordered.sort_by(|a, b| a.1.start.total_cmp(&b.1.start));
        for pair in ordered.windows(2) {
            let (first, a) = pair[0];
            let (second, b) = pair[1];
            if a.overlaps(&b) || a.gap_to(&b) < container.min_clearance_between_stands() - EPSILON {
                violations.push(Violation::StandSpacing { first, second });
            }
        }

        let spans: Vec<Span> = stands.iter().map(|s| s.span()).collect();
        for p in &upper {
            let span = p.x_span();
            let under = spans.iter().filter(|s| s.overlaps(&span)).count();
            if under < 2 {
                violations.push(Violation::InsufficientSupport {
                    piece_id: p.piece_id.clone(),
                    stands: under,
                });
            } else if !balanced(&span, &spans) {
                violations.push(Violation::UnbalancedSupport {
                    piece_id: p.piece_id.clone(),
                });
            }

            for t in &tall {
                if t.rect().intersects(&p.rect()) {
                    violations.push(Violation::ClearanceViolation {
                        piece_id: t.piece_id.clone(),
                    });
                }
            }
        }
    }

    fn check_stand(
        &self,
        index: usize,
        stand: &Stand,
        upper: &[&Placement],
        lookup: &HashMap<&str, &Piece>,
        container: &Container,
        violations: &mut Vec<Violation>,
    ) {
        let span = stand.span();
        let sw = stand.width_along_axis;
        if span.start < -EPSILON || span.end > container.plan_width() + EPSILON {
            violations.push(Violation::StandOutOfBounds { stand: index });
        }

        let touched: Vec<&Placement> = upper
            .iter()
            .copied()
            .filter(|p| p.x_span().overlaps(&span))
            .collect();

        let mut geometric: Vec<&str> = touched.iter().map(|p| p.piece_id.as_str()).collect();
        let mut listed: Vec<&str> = stand.supported_piece_ids.iter().map(|id| id.as_str()).collect();
        geometric.sort_unstable();
        listed.sort_unstable();
        if geometric != listed || listed.is_empty() {
            violations.push(Violation::StandSupportMismatch { stand: index });
        }

        let load: f64 = touched
            .iter()
            .filter_map(|p| lookup.get(p.piece_id.as_str()))
            .map(|piece| piece.weight())
            .sum();
        if load > container.stand_weight_capacity() + 1e-9 {
            violations.push(Violation::StandOverloaded {
                stand: index,
                load,
                capacity: container.stand_weight_capacity(),
            });
        }

        let shared = touched.len() > 1;
        for p in &touched {
            let carried = p.x_span();
            if !carried.contains(&span) {
                violations.push(Violation::StandStraddlesPiece {
                    stand: index,
                    piece_id: p.piece_id.clone(),
                });
            } else if shared
                && (span.start < carried.start + sw - EPSILON || span.end > carried.end - sw + EPSILON)
            {
                violations.push(Violation::SharedStandAtEdge {
                    stand: index,
                    piece_id: p.piece_id.clone(),
                });
            }
        }
    }
}
