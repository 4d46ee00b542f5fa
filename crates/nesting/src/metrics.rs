//! Quality figures of a solution.

use std::collections::HashSet;

use autoclave_nesting_core::{Container, Level, Metrics, NestingSolution, ObjectiveWeights, Piece};

/// Share of the efficiency score given to the priority-weighted placed fraction.
const PLACED_SHARE: f64 = 0.6;
/// Share of the efficiency score given to area utilization.
const AREA_SHARE: f64 = 0.4;

/// Computes the metrics of `solution` for the requested `pieces`.
///
/// Timing, search statistics and violations are carried over from the
/// solution's current metrics.
pub fn measure(
    solution: &NestingSolution,
    pieces: &[Piece],
    container: &Container,
    weights: &ObjectiveWeights,
) -> Metrics {
    let placed: HashSet<&str> = solution
        .placements
        .iter()
        .map(|p| p.piece_id.as_str())
        .collect();
    let placed_pieces: Vec<&Piece> = pieces
        .iter()
        .filter(|p| placed.contains(p.id().as_str()))
        .collect();

    let levels_used = if solution.placements.iter().any(|p| p.level == Level::Upper) {
        2.0
    } else {
        1.0
    };
    let placed_area: f64 = solution.placements.iter().map(|p| p.area()).sum();
    let area_utilization = placed_area / (container.plan_area() * levels_used);

    let placed_weight: f64 = placed_pieces.iter().map(|p| p.weight()).sum();
    let weight_utilization_pct = if container.has_weight_limit() && container.max_weight() > 0.0 {
        placed_weight / container.max_weight() * 100.0
    } else {
        0.0
    };

    let placed_lines = placed_pieces
        .iter()
        .fold(0u32, |lines, p| lines.saturating_add(p.lines_required()));
    let line_utilization_pct = if container.has_line_limit() && container.line_capacity() > 0 {
        placed_lines as f64 / container.line_capacity() as f64 * 100.0
    } else {
        0.0
    };

    let efficiency_score = efficiency(pieces, &placed_pieces, area_utilization, weights);

    Metrics {
        area_utilization_pct: area_utilization * 100.0,
        weight_utilization_pct,
        line_utilization_pct,
        efficiency_score,
        placed_count: solution.placements.len(),
        excluded_count: solution.excluded.len(),
        upper_level_count: solution.placements_on(Level::Upper).count(),
        stand_count: solution.stands.len(),
        computation_time_ms: solution.metrics.computation_time_ms,
        search: solution.metrics.search.clone(),
        violations: solution.metrics.violations.clone(),
    }
}

/// `100 · (0.6 · weighted placed fraction + 0.4 · min(1, utilization))`.
///
/// Pieces are weighted by priority; a request without pieces scores zero.
fn efficiency(
    pieces: &[Piece],
    placed: &[&Piece],
    area_utilization: f64,
    weights: &ObjectiveWeights,
) -> f64 {
    let priority_weight = |p: &Piece| (1.0 + weights.priority_scale * p.priority() as f64).max(0.1);
    let requested: f64 = pieces.iter().map(priority_weight).sum();
    if requested <= 0.0 {
        return 0.0;
    }
    let achieved: f64 = placed.iter().map(|p| priority_weight(*p)).sum();
    let score = 100.0 * (PLACED_SHARE * achieved / requested + AREA_SHARE * area_utilization.min(1.0));
    score.clamp(0.0, 100.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use autoclave_nesting_core::{Placement, Rect};

    #[test]
    fn test_scenario_a_figures() {
        let container = Container::new("AC", 1000.0, 1000.0)
            .with_max_weight(50.0)
            .with_line_capacity(4);
        let pieces = vec![
            Piece::new("A", 400.0, 300.0).with_weight(10.0),
            Piece::new("B", 500.0, 200.0).with_weight(8.0),
        ];
        let mut solution = NestingSolution::empty("AC");
        solution.placements = vec![
            Placement::new("A", Rect::new(0.0, 0.0, 400.0, 300.0), false, Level::Base),
            Placement::new("B", Rect::new(405.0, 0.0, 500.0, 200.0), false, Level::Base),
        ];

        let metrics = measure(&solution, &pieces, &container, &ObjectiveWeights::default());
        assert!((metrics.area_utilization_pct - 22.0).abs() < 1e-9);
        assert!((metrics.weight_utilization_pct - 36.0).abs() < 1e-9);
        assert!((metrics.line_utilization_pct - 50.0).abs() < 1e-9);
        assert!((metrics.efficiency_score - 68.8).abs() < 1e-9);
        assert_eq!(metrics.placed_count, 2);
    }

    #[test]
    fn test_empty_request_scores_zero() {
        let container = Container::new("AC", 1000.0, 1000.0);
        let solution = NestingSolution::empty("AC");
        let metrics = measure(&solution, &[], &container, &ObjectiveWeights::default());
        assert_eq!(metrics.efficiency_score, 0.0);
        assert_eq!(metrics.area_utilization_pct, 0.0);
        assert_eq!(metrics.weight_utilization_pct, 0.0);
    }

    #[test]
    fn test_priority_weights_placed_fraction() {
        let container = Container::new("AC", 1000.0, 1000.0);
        let pieces = vec![
            Piece::new("HI", 10.0, 10.0).with_priority(10),
            Piece::new("LO", 10.0, 10.0),
        ];
        let mut solution = NestingSolution::empty("AC");
        solution.placements = vec![Placement::new("HI", Rect::new(0.0, 0.0, 10.0, 10.0), false, Level::Base)];

        let metrics = measure(&solution, &pieces, &container, &ObjectiveWeights::default());
        // HI weighs 2.0, LO weighs 1.0: two thirds of the requested weight is placed.
        let expected = 100.0 * (0.6 * 2.0 / 3.0 + 0.4 * 100.0 / 1_000_000.0);
        assert!((metrics.efficiency_score - expected).abs() < 1e-9);
    }

    #[test]
    fn test_two_levels_halve_utilization() {
        let container = Container::new("AC", 100.0, 100.0).with_two_levels(100.0, 300.0);
        let pieces = vec![Piece::new("A", 100.0, 100.0), Piece::new("B", 100.0, 100.0)];
        let mut solution = NestingSolution::empty("AC");
        solution.placements = vec![
            Placement::new("A", Rect::new(0.0, 0.0, 100.0, 100.0), false, Level::Base),
            Placement::new("B", Rect::new(0.0, 0.0, 100.0, 100.0), false, Level::Upper),
        ];

        let metrics = measure(&solution, &pieces, &container, &ObjectiveWeights::default());
        assert!((metrics.area_utilization_pct - 100.0).abs() < 1e-9);
        assert_eq!(metrics.upper_level_count, 1);
    }
}
