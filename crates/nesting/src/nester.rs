//! Autoclave nesting entry point.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Instant;

use rayon::prelude::*;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use autoclave_nesting_core::{
    Container, Error, NestingSolution, Piece, Result, SolutionSummary, SolverConfig,
};

use crate::checker::ConsistencyChecker;
use crate::eligibility::{EligibilityFilter, NoReservations, ReservationOracle};
use crate::metrics::measure;
use crate::strategy::Deadline;
use crate::two_level::TwoLevelPlanner;

/// One container and the pieces offered to it, for batch solving.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct BatchJob {
    /// Pieces offered to the container.
    pub pieces: Vec<Piece>,
    /// Target container.
    pub container: Container,
}

impl BatchJob {
    /// Creates a job.
    pub fn new(pieces: Vec<Piece>, container: Container) -> Self {
        Self { pieces, container }
    }
}

/// Autoclave nesting solver.
pub struct Nester {
    config: SolverConfig,
    reservations: Arc<dyn ReservationOracle>,
    /// Cancellation flags of the solves in flight.
    in_flight: Mutex<Vec<Arc<AtomicBool>>>,
}

impl Nester {
    /// Creates a new nester with the given configuration.
    pub fn new(config: SolverConfig) -> Self {
        Self {
            config,
            reservations: Arc::new(NoReservations),
            in_flight: Mutex::new(Vec::new()),
        }
    }

    /// Creates a nester with default configuration.
    pub fn default_config() -> Self {
        Self::new(SolverConfig::default())
    }

    /// Sets the collaborator answering whether a piece is already committed elsewhere.
    pub fn with_reservations(mut self, reservations: impl ReservationOracle + 'static) -> Self {
        self.reservations = Arc::new(reservations);
        self
    }

    /// The configuration in use.
    pub fn config(&self) -> &SolverConfig {
        &self.config
    }

    /// Asks running solves to stop; the exact search returns its best layout so far.
    ///
    /// Solves started afterwards are not affected.
    pub fn cancel(&self) {
        let in_flight = self.in_flight.lock().unwrap_or_else(|e| e.into_inner());
        for flag in in_flight.iter() {
            flag.store(true, Ordering::Relaxed);
        }
    }

    /// Registers a solve and hands out its cancellation flag.
    fn begin(&self) -> SolveToken<'_> {
        let flag = Arc::new(AtomicBool::new(false));
        self.in_flight
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(flag.clone());
        SolveToken {
            registry: &self.in_flight,
            flag,
        }
    }

    /// Lays out `pieces` in `container`.
    pub fn solve(&self, pieces: &[Piece], container: &Container) -> Result<NestingSolution> {
        self.solve_with_deadline(pieces, container, None)
    }

    /// Lays out `pieces` in `container`, returning by `deadline` at the latest.
    pub fn solve_with_deadline(
        &self,
        pieces: &[Piece],
        container: &Container,
        deadline: Option<Instant>,
    ) -> Result<NestingSolution> {
        let token = self.begin();
        self.run(pieces, container, deadline, 1, &token)
    }

    /// Solves independent containers in parallel.
    ///
    /// A failure on one job does not affect the others.
    pub fn solve_batch(&self, jobs: &[BatchJob]) -> Vec<Result<NestingSolution>> {
        let token = self.begin();
        log::info!("Solving batch of {} containers", jobs.len());
        jobs.par_iter()
            .map(|job| self.run(&job.pieces, &job.container, None, jobs.len(), &token))
            .collect()
    }

    /// Fills `containers` one after another, offering each one the pieces the
    /// previous ones left out.
    ///
    /// Stops early once every piece is placed. Pieces still unplaced at the end
    /// are reported on the last solution with that container's reason.
    pub fn solve_cascade(
        &self,
        pieces: &[Piece],
        containers: &[Container],
    ) -> Result<Vec<NestingSolution>> {
        let token = self.begin();
        validate_pieces(pieces)?;

        let mut remaining: Vec<Piece> = pieces.to_vec();
        let mut solutions = Vec::with_capacity(containers.len());
        for container in containers {
            if remaining.is_empty() {
                break;
            }
            let solution = self.run(&remaining, container, None, containers.len(), &token)?;
            let placed: HashSet<&str> = solution
                .placements
                .iter()
                .map(|p| p.piece_id.as_str())
                .collect();
            remaining.retain(|p| !placed.contains(p.id().as_str()));
            solutions.push(solution);
        }

        log::info!(
            "Cascade over {} containers used {}, {} pieces left out",
            containers.len(),
            solutions.len(),
            remaining.len()
        );
        Ok(solutions)
    }

    fn run(
        &self,
        pieces: &[Piece],
        container: &Container,
        deadline: Option<Instant>,
        containers: usize,
        token: &SolveToken<'_>,
    ) -> Result<NestingSolution> {
        let started = Instant::now();
        self.config.validate()?;
        container.validate()?;
        validate_pieces(pieces)?;

        let deadline = match deadline {
            Some(at) => Deadline::at(at),
            None => Deadline::none(),
        }
        .with_cancel(token.flag.clone());

        let report =
            EligibilityFilter::new(&self.config, self.reservations.as_ref()).filter(pieces, container);
        let outcome = TwoLevelPlanner::new(&self.config, container)
            .with_batch_size(containers)
            .with_deadline(deadline)
            .plan(&report.eligible);
        if token.is_cancelled() {
            log::warn!("{}: solve cancelled, keeping the best layout found", container.id());
        }

        let order: HashMap<&str, usize> = pieces
            .iter()
            .enumerate()
            .map(|(i, p)| (p.id().as_str(), i))
            .collect();

        let mut solution = NestingSolution::empty(container.id());
        solution.placements = outcome.placements;
        solution.placements.sort_by(|a, b| {
            a.level
                .cmp(&b.level)
                .then(a.y.total_cmp(&b.y))
                .then(a.x.total_cmp(&b.x))
                .then_with(|| a.piece_id.cmp(&b.piece_id))
        });
        solution.stands = outcome.stands;
        solution.excluded = report.excluded;
        solution.excluded.extend(outcome.unplaced);
        solution
            .excluded
            .sort_by_key(|e| order.get(e.piece_id.as_str()).copied().unwrap_or(usize::MAX));
        solution.algorithm_status = outcome.status;
        solution.metrics.search = outcome.stats;

        solution.metrics = measure(&solution, pieces, container, &self.config.objective);
        ConsistencyChecker::new(&self.config).audit(&mut solution, pieces, container);
        solution.metrics.computation_time_ms = started.elapsed().as_millis() as u64;

        let summary = SolutionSummary::from(&solution);
        log::info!(
            "{}: {} placed, {} excluded, {:.1}% area, efficiency {:.1}, {} ({}) in {} ms",
            summary.container_id,
            summary.placed,
            summary.excluded,
            summary.area_utilization_pct,
            summary.efficiency_score,
            summary.status,
            if summary.valid { "valid" } else { "INVALID" },
            summary.time_ms
        );
        Ok(solution)
    }
}

/// Cancellation flag of one solve, deregistered when the solve ends.
struct SolveToken<'a> {
    registry: &'a Mutex<Vec<Arc<AtomicBool>>>,
    flag: Arc<AtomicBool>,
}

impl SolveToken<'_> {
    fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
    }
}

impl Drop for SolveToken<'_> {
    fn drop(&mut self) {
        self.registry
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .retain(|flag| !Arc::ptr_eq(flag, &self.flag));
    }
}

fn validate_pieces(pieces: &[Piece]) -> Result<()> {
    let mut seen = HashSet::new();
    for piece in pieces {
        piece.validate()?;
        if !seen.insert(piece.id().as_str()) {
            return Err(Error::DuplicatePiece(piece.id().clone()));
        }
    }
    Ok(())
}
