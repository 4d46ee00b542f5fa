//! Rotation policy.

use autoclave_nesting_core::{Orientation, Piece, Rect, SolverConfig};

/// Orientations to try for one piece, in order.
///
/// `primary` orientations are tried together at every scan position. The
/// `fallback` set is only scanned when no primary orientation fits anywhere.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrientationChoice {
    /// Orientations tried first.
    pub primary: Vec<Orientation>,
    /// Orientations retried if the primary set cannot be placed.
    pub fallback: Vec<Orientation>,
}

impl OrientationChoice {
    /// Every orientation in trial order.
    pub fn all(&self) -> impl Iterator<Item = Orientation> + '_ {
        self.primary.iter().chain(self.fallback.iter()).copied()
    }

    /// Returns true if no orientation fits the plan.
    pub fn is_empty(&self) -> bool {
        self.primary.is_empty() && self.fallback.is_empty()
    }
}

/// Chooses orientations for pieces on one level.
#[derive(Debug, Clone, Copy)]
pub struct OrientationPolicy {
    usable: Rect,
    margin: f64,
    aspect_ratio_threshold: f64,
}

impl OrientationPolicy {
    /// Creates the policy for a usable plan.
    pub fn new(config: &SolverConfig, usable: Rect) -> Self {
        Self {
            usable,
            margin: config.margin,
            aspect_ratio_threshold: config.aspect_ratio_threshold,
        }
    }

    /// Orientations to try for `piece`.
    pub fn choices(&self, piece: &Piece) -> OrientationChoice {
        let fitting: Vec<Orientation> = piece
            .allowed_orientations()
            .into_iter()
            .filter(|&o| {
                let (w, h) = piece.footprint(o);
                self.usable.can_hold(w, h)
            })
            .collect();

        match self.forced(piece, &fitting) {
            Some(forced) => OrientationChoice {
                primary: vec![forced],
                fallback: fitting.into_iter().filter(|&o| o != forced).collect(),
            },
            None => OrientationChoice {
                primary: fitting,
                fallback: Vec::new(),
            },
        }
    }

    /// Forced orientation of a long, thin piece.
    ///
    /// The winner leaves the smallest unused remainder at the end of a row of
    /// identical pieces; ties keep the declared orientation.
    fn forced(&self, piece: &Piece, fitting: &[Orientation]) -> Option<Orientation> {
        if fitting.len() < 2 || piece.aspect_ratio() < self.aspect_ratio_threshold {
            return None;
        }
        fitting.iter().copied().min_by(|&a, &b| {
            let ra = self.row_remainder(piece.footprint(a).0);
            let rb = self.row_remainder(piece.footprint(b).0);
            ra.total_cmp(&rb)
        })
    }

    /// Width left over after a row of `width`-wide footprints.
    fn row_remainder(&self, width: f64) -> f64 {
        let pitch = width + self.margin;
        let count = ((self.usable.width + self.margin) / pitch).floor().max(1.0);
        (self.usable.width - (count * width + (count - 1.0) * self.margin)).max(0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy(width: f64, length: f64) -> OrientationPolicy {
        OrientationPolicy::new(&SolverConfig::default(), Rect::from_size(width, length))
    }

    #[test]
    fn test_non_rotatable_stays_declared() {
        let piece = Piece::new("F", 900.0, 100.0).with_rotation(false);
        let choice = policy(1000.0, 1000.0).choices(&piece);
        assert_eq!(choice.primary, vec![Orientation::Declared]);
        assert!(choice.fallback.is_empty());
    }

    #[test]
    fn test_regular_piece_tries_both() {
        let piece = Piece::new("P", 400.0, 300.0);
        let choice = policy(1000.0, 1000.0).choices(&piece);
        assert_eq!(
            choice.primary,
            vec![Orientation::Declared, Orientation::Rotated]
        );
    }

    #[test]
    fn test_long_piece_forced_to_smaller_remainder() {
        // Declared 600 wide leaves 400 mm in a 1000 mm row; rotated 150 wide leaves 75.
        let piece = Piece::new("L", 600.0, 150.0);
        let choice = policy(1000.0, 1000.0).choices(&piece);
        assert_eq!(choice.primary, vec![Orientation::Rotated]);
        assert_eq!(choice.fallback, vec![Orientation::Declared]);
    }

    #[test]
    fn test_orientations_outside_plan_dropped() {
        let piece = Piece::new("T", 1500.0, 200.0);
        let choice = policy(1000.0, 2000.0).choices(&piece);
        assert_eq!(choice.primary, vec![Orientation::Rotated]);
        assert!(choice.fallback.is_empty());
        assert!(!choice.is_empty());
    }
}
