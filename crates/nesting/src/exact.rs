//! Exact placement by branch and bound.
//!
//! The search assigns pieces one at a time, in first-fit-decreasing order.
//! Each piece either goes to a corner candidate (the plan origin or the far
//! edge, plus margin, of something already placed) in one of its allowed
//! orientations, or is skipped. Branches are pruned against the best layout
//! found so far with a fractional-knapsack bound on free area, load and lines.
//!
//! The top of the tree is expanded once and the resulting subtrees are
//! explored in parallel on a dedicated rayon pool. All workers share one
//! incumbent and stop at the deadline, at the node cap, or as soon as a
//! layout places every piece.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::{Duration, Instant};

use rayon::prelude::*;

use autoclave_nesting_core::{
    AlgorithmStatus, Level, Orientation, Piece, Placement, Rect, SearchStats, SolverConfig,
    EPSILON,
};

use crate::heuristic::precedes;
use crate::strategy::{classify_unplaced, Deadline, LevelLayout, LevelRequest, PlacementStrategy};

/// Depth of the tree expanded before the parallel phase.
const SPLIT_DEPTH: usize = 2;

/// Exact placement strategy.
#[derive(Debug, Clone)]
pub struct BranchAndBound {
    config: SolverConfig,
    budget: Option<Duration>,
    incumbent: Option<Vec<Placement>>,
}

impl BranchAndBound {
    /// Creates the strategy. Without a budget only the request deadline applies.
    pub fn new(config: &SolverConfig) -> Self {
        Self {
            config: config.clone(),
            budget: None,
            incumbent: None,
        }
    }

    /// Limits the search to `budget` of wall-clock time.
    pub fn with_budget(mut self, budget: Duration) -> Self {
        self.budget = Some(budget);
        self
    }

    /// Seeds the search with a known layout; only strictly better layouts replace it.
    pub fn with_incumbent(mut self, placements: Vec<Placement>) -> Self {
        self.incumbent = if placements.is_empty() {
            None
        } else {
            Some(placements)
        };
        self
    }

    fn deadline(&self, request: &LevelRequest<'_>) -> Deadline {
        match self.budget {
            Some(budget) => request.deadline.tightened(Instant::now() + budget),
            None => request.deadline.clone(),
        }
    }
}

impl PlacementStrategy for BranchAndBound {
    fn name(&self) -> &'static str {
        "branch-and-bound"
    }

    fn place(&self, request: &LevelRequest<'_>) -> LevelLayout {
        let start = Instant::now();
        let search = Search::new(self, request);
        let n = search.items.len();

        let seed_value = self
            .incumbent
            .as_ref()
            .map(|seed| request.objective(seed, &self.config.objective))
            .unwrap_or(0.0);
        if n == 0 {
            let mut layout = LevelLayout::empty(AlgorithmStatus::Optimal);
            layout.stats = Some(SearchStats::optimal(0.0));
            return layout;
        }
        if let Some(seed) = &self.incumbent {
            if seed.len() == n {
                let mut layout = LevelLayout::empty(AlgorithmStatus::Optimal);
                layout.placements = seed.clone();
                layout.stats = Some(SearchStats::optimal(seed_value));
                return layout;
            }
        }

        let shared = Shared::new(seed_value);
        let root = Node::new(n, &request.occupied);
        let root_bound = search.bound(&root, 0);

        log::info!(
            "Exact search on {}: {} pieces, root bound {:.3}, seed {:.3}",
            request.level,
            n,
            root_bound,
            seed_value
        );

        let tasks = search.frontier(root, &shared);
        let workers = self.config.effective_workers();
        match rayon::ThreadPoolBuilder::new().num_threads(workers).build() {
            Ok(pool) => pool.install(|| {
                tasks
                    .into_par_iter()
                    .for_each(|(mut node, k)| search.dfs(&mut node, k, &shared));
            }),
            Err(e) => {
                log::warn!("Exact search thread pool unavailable ({}), searching sequentially", e);
                for (mut node, k) in tasks {
                    search.dfs(&mut node, k, &shared);
                }
            }
        }

        let best_value = shared.best_value();
        let placements = match shared.take_best() {
            Some(slots) => search.placements(&slots),
            None => self.incumbent.clone().unwrap_or_default(),
        };
        let nodes = shared.nodes.load(Ordering::Relaxed);
        let elapsed_ms = start.elapsed().as_millis() as u64;

        let has_solution = !placements.is_empty();
        let stats = if shared.complete.load(Ordering::Relaxed) {
            SearchStats::optimal(best_value)
        } else if shared.interrupted.load(Ordering::Relaxed) {
            SearchStats::timeout(has_solution.then_some(best_value), root_bound)
        } else if !has_solution {
            SearchStats::infeasible()
        } else if best_value >= root_bound - 1e-9 {
            SearchStats::optimal(best_value)
        } else {
            SearchStats::feasible(best_value, root_bound)
        };
        let stats = stats.with_nodes(nodes).with_elapsed(elapsed_ms);

        log::info!(
            "Exact search finished: {} (objective {:.3}, bound {:.3}, {} nodes, {} ms)",
            stats.status,
            stats.objective_value,
            stats.best_bound,
            nodes,
            elapsed_ms
        );

        LevelLayout {
            unplaced: classify_unplaced(request, &placements),
            placements,
            status: stats.status,
            stats: Some(stats),
        }
    }
}

/// A piece as seen by the search.
struct Item<'a> {
    piece: &'a Piece,
    value: f64,
    area: f64,
    weight: f64,
    lines: u32,
    footprints: Vec<(Orientation, f64, f64)>,
    blocked: Vec<Rect>,
    /// Interchangeable with the previous item.
    twin_of_prev: bool,
}

type Slot = Option<(Rect, Orientation)>;

/// Partial layout along one branch.
#[derive(Clone)]
struct Node {
    slots: Vec<Slot>,
    placed: Vec<Rect>,
    value: f64,
    area: f64,
    weight: f64,
    lines: u32,
    count: usize,
}

impl Node {
    fn new(n: usize, occupied: &[Rect]) -> Self {
        Self {
            slots: vec![None; n],
            placed: occupied.to_vec(),
            value: 0.0,
            area: 0.0,
            weight: 0.0,
            lines: 0,
            count: 0,
        }
    }

    fn push(&mut self, k: usize, item: &Item<'_>, rect: Rect, orientation: Orientation) {
        self.slots[k] = Some((rect, orientation));
        self.placed.push(rect);
        self.value += item.value;
        self.area += item.area;
        self.weight += item.weight;
        self.lines += item.lines;
        self.count += 1;
    }

    fn pop(&mut self, k: usize, item: &Item<'_>) {
        self.slots[k] = None;
        self.placed.pop();
        self.value -= item.value;
        self.area -= item.area;
        self.weight -= item.weight;
        self.lines -= item.lines;
        self.count -= 1;
    }
}

/// State shared by all workers.
struct Shared {
    best_bits: AtomicU64,
    best: Mutex<Option<Vec<Slot>>>,
    nodes: AtomicU64,
    interrupted: AtomicBool,
    complete: AtomicBool,
}

impl Shared {
    fn new(seed_value: f64) -> Self {
        Self {
            best_bits: AtomicU64::new(seed_value.to_bits()),
            best: Mutex::new(None),
            nodes: AtomicU64::new(0),
            interrupted: AtomicBool::new(false),
            complete: AtomicBool::new(false),
        }
    }

    fn best_value(&self) -> f64 {
        f64::from_bits(self.best_bits.load(Ordering::Acquire))
    }

    fn should_stop(&self) -> bool {
        self.interrupted.load(Ordering::Relaxed) || self.complete.load(Ordering::Relaxed)
    }

    /// Records `node` if it beats the incumbent.
    fn offer(&self, node: &Node, n: usize) {
        if node.count == 0 || node.value <= self.best_value() + 1e-9 {
            return;
        }
        let mut best = self.best.lock().unwrap_or_else(|e| e.into_inner());
        if node.value > self.best_value() + 1e-9 {
            *best = Some(node.slots.clone());
            self.best_bits.store(node.value.to_bits(), Ordering::Release);
            if node.count == n {
                self.complete.store(true, Ordering::Relaxed);
            }
        }
    }

    fn take_best(&self) -> Option<Vec<Slot>> {
        self.best.lock().unwrap_or_else(|e| e.into_inner()).take()
    }
}

/// Immutable search problem.
struct Search<'a> {
    items: Vec<Item<'a>>,
    level: Level,
    usable: Rect,
    margin: f64,
    free_area: f64,
    weight_limit: f64,
    line_limit: u32,
    deadline: Deadline,
    max_nodes: Option<u64>,
    by_area: Vec<usize>,
    by_weight: Vec<usize>,
    by_lines: Vec<usize>,
}

impl<'a> Search<'a> {
    fn new(strategy: &BranchAndBound, request: &LevelRequest<'a>) -> Self {
        let config = &strategy.config;
        let mut pieces = request.pieces.clone();
        pieces.sort_by(|a, b| {
            b.area()
                .total_cmp(&a.area())
                .then(b.weight().total_cmp(&a.weight()))
                .then(b.priority().cmp(&a.priority()))
                .then(b.width().total_cmp(&a.width()))
                .then(b.lines_required().cmp(&a.lines_required()))
                .then(b.is_rotatable().cmp(&a.is_rotatable()))
                .then_with(|| a.id().cmp(b.id()))
        });

        let mut items: Vec<Item<'a>> = Vec::with_capacity(pieces.len());
        for piece in pieces {
            let footprints = piece
                .allowed_orientations()
                .into_iter()
                .map(|o| {
                    let (w, h) = piece.footprint(o);
                    (o, w, h)
                })
                .filter(|&(_, w, h)| request.usable.can_hold(w, h))
                .collect();
            let twin_of_prev = items.last().is_some_and(|prev| interchangeable(prev.piece, piece));
            items.push(Item {
                piece,
                value: config
                    .objective
                    .piece_value(piece.priority(), piece.area(), request.plan_area),
                area: piece.area(),
                weight: piece.weight(),
                lines: piece.lines_required(),
                footprints,
                blocked: request.blocked_for(piece).copied().collect(),
                twin_of_prev,
            });
        }

        let by_area = density_order(&items, |item| item.area);
        let by_weight = density_order(&items, |item| item.weight);
        let by_lines = density_order(&items, |item| item.lines as f64);

        let occupied_area: f64 = request.occupied.iter().map(|r| r.area()).sum();

        Self {
            level: request.level,
            usable: request.usable,
            margin: config.margin,
            free_area: (request.usable.area() - occupied_area).max(0.0),
            weight_limit: request.weight_limit,
            line_limit: request.line_limit,
            deadline: strategy.deadline(request),
            max_nodes: config.max_nodes,
            by_area,
            by_weight,
            by_lines,
            items,
        }
    }

    /// Upper bound on the value still obtainable from items `k..`.
    fn bound(&self, node: &Node, k: usize) -> f64 {
        let mut bound = self.fractional(&self.by_area, k, |i| i.area, self.free_area - node.area);
        if self.weight_limit < f64::MAX {
            bound = bound.min(self.fractional(
                &self.by_weight,
                k,
                |i| i.weight,
                self.weight_limit - node.weight,
            ));
        }
        if self.line_limit < u32::MAX {
            bound = bound.min(self.fractional(
                &self.by_lines,
                k,
                |i| i.lines as f64,
                self.line_limit.saturating_sub(node.lines) as f64,
            ));
        }
        node.value + bound
    }

    fn fractional(
        &self,
        order: &[usize],
        k: usize,
        size: impl Fn(&Item<'_>) -> f64,
        capacity: f64,
    ) -> f64 {
        let mut capacity = capacity.max(0.0);
        let mut total = 0.0;
        for &i in order.iter().filter(|&&i| i >= k) {
            let item = &self.items[i];
            if item.footprints.is_empty() {
                continue;
            }
            let s = size(item);
            if s <= 0.0 {
                total += item.value;
                continue;
            }
            if capacity <= 0.0 {
                break;
            }
            let take = (capacity / s).min(1.0);
            total += item.value * take;
            capacity -= s * take;
        }
        total
    }

    /// Moves available for item `k`: placements first, in row-major order, then skip.
    fn moves(&self, node: &Node, k: usize) -> Vec<Slot> {
        let item = &self.items[k];
        let mut moves = Vec::new();

        let previous = if item.twin_of_prev {
            Some(node.slots[k - 1])
        } else {
            None
        };
        // A skipped twin forces every later twin to be skipped too.
        let twin_skipped = matches!(previous, Some(None));
        let budget_ok = node.weight + item.weight <= self.weight_limit + 1e-9
            && node
                .lines
                .checked_add(item.lines)
                .is_some_and(|lines| lines <= self.line_limit);

        if !twin_skipped && budget_ok && !item.footprints.is_empty() {
            let floor = previous.flatten().map(|(rect, _)| rect);
            for (rect, orientation) in self.positions(node, item) {
                if floor.is_some_and(|f| !precedes(&f, &rect)) {
                    continue;
                }
                moves.push(Some((rect, orientation)));
            }
        }
        moves.push(None);
        moves
    }

    /// Free corner positions for `item`, row-major.
    fn positions(&self, node: &Node, item: &Item<'_>) -> Vec<(Rect, Orientation)> {
        let mut xs = vec![self.usable.min_x()];
        let mut ys = vec![self.usable.min_y()];
        for r in &node.placed {
            xs.push(r.max_x() + self.margin);
            ys.push(r.max_y() + self.margin);
        }
        for r in &item.blocked {
            xs.push(r.max_x());
            ys.push(r.max_y());
        }
        sort_dedup(&mut xs);
        sort_dedup(&mut ys);

        let mut out = Vec::new();
        for &y in &ys {
            for &x in &xs {
                for &(orientation, w, h) in &item.footprints {
                    let rect = Rect::new(x, y, w, h);
                    if !self.usable.contains(&rect) {
                        continue;
                    }
                    if node.placed.iter().any(|p| rect.conflicts_with(p, self.margin)) {
                        continue;
                    }
                    if item.blocked.iter().any(|b| rect.intersects(b)) {
                        continue;
                    }
                    out.push((rect, orientation));
                }
            }
        }
        out
    }

    /// Expands the top of the tree into independent subtrees.
    fn frontier(&self, root: Node, shared: &Shared) -> Vec<(Node, usize)> {
        let n = self.items.len();
        let mut layer = vec![(root, 0usize)];
        for _ in 0..SPLIT_DEPTH {
            let mut next = Vec::new();
            for (node, k) in layer {
                shared.offer(&node, n);
                if k == n {
                    next.push((node, k));
                    continue;
                }
                for slot in self.moves(&node, k) {
                    let mut child = node.clone();
                    if let Some((rect, orientation)) = slot {
                        child.push(k, &self.items[k], rect, orientation);
                    }
                    next.push((child, k + 1));
                }
            }
            layer = next;
        }
        layer
    }

    fn dfs(&self, node: &mut Node, k: usize, shared: &Shared) {
        if shared.should_stop() {
            return;
        }
        let visited = shared.nodes.fetch_add(1, Ordering::Relaxed) + 1;
        if self.max_nodes.is_some_and(|cap| visited > cap) || self.deadline.expired() {
            shared.interrupted.store(true, Ordering::Relaxed);
            return;
        }

        let n = self.items.len();
        shared.offer(node, n);
        if k == n || self.bound(node, k) <= shared.best_value() + 1e-9 {
            return;
        }

        for slot in self.moves(node, k) {
            match slot {
                Some((rect, orientation)) => {
                    node.push(k, &self.items[k], rect, orientation);
                    self.dfs(node, k + 1, shared);
                    node.pop(k, &self.items[k]);
                }
                None => self.dfs(node, k + 1, shared),
            }
            if shared.should_stop() {
                return;
            }
        }
    }

    fn placements(&self, slots: &[Slot]) -> Vec<Placement> {
        slots
            .iter()
            .zip(&self.items)
            .filter_map(|(slot, item)| {
                slot.map(|(rect, orientation)| {
                    Placement::new(
                        item.piece.id().clone(),
                        rect,
                        orientation.is_rotated(),
                        self.level,
                    )
                })
            })
            .collect()
    }
}

/// Returns true if swapping the two pieces cannot change the objective or feasibility.
fn interchangeable(a: &Piece, b: &Piece) -> bool {
    (a.width() - b.width()).abs() < EPSILON
        && (a.height() - b.height()).abs() < EPSILON
        && (a.weight() - b.weight()).abs() < EPSILON
        && a.lines_required() == b.lines_required()
        && a.is_rotatable() == b.is_rotatable()
        && a.priority() == b.priority()
        && (a.height_clearance() - b.height_clearance()).abs() < EPSILON
}

/// Item indices by decreasing value per unit of `size`.
fn density_order(items: &[Item<'_>], size: impl Fn(&Item<'_>) -> f64) -> Vec<usize> {
    let mut order: Vec<usize> = (0..items.len()).collect();
    order.sort_by(|&a, &b| {
        let da = density(items[a].value, size(&items[a]));
        let db = density(items[b].value, size(&items[b]));
        db.total_cmp(&da)
    });
    order
}

fn density(value: f64, size: f64) -> f64 {
    if size > 0.0 {
        value / size
    } else {
        f64::INFINITY
    }
}

fn sort_dedup(values: &mut Vec<f64>) {
    values.sort_by(|a, b| a.total_cmp(b));
    values.dedup_by(|a, b| (*a - *b).abs() <= EPSILON);
}

#[cfg(test)]
mod tests {
    use super::*;
    use autoclave_nesting_core::{Container, ExclusionReason};

    fn config() -> SolverConfig {
        SolverConfig::default().with_workers(2)
    }

    fn solve(pieces: &[Piece], container: &Container, strategy: &BranchAndBound) -> LevelLayout {
        let refs: Vec<&Piece> = pieces.iter().collect();
        let request = LevelRequest::new(Level::Base, refs, container, &config());
        strategy.place(&request)
    }

    fn assert_disjoint(layout: &LevelLayout, margin: f64) {
        for (i, a) in layout.placements.iter().enumerate() {
            for b in &layout.placements[i + 1..] {
                assert!(!a.rect().conflicts_with(&b.rect(), margin), "{:?} vs {:?}", a, b);
            }
        }
    }

    #[test]
    fn test_all_placed_is_optimal() {
        let container = Container::new("AC", 1000.0, 1000.0);
        let pieces = vec![
            Piece::new("A", 400.0, 300.0).with_weight(10.0),
            Piece::new("B", 500.0, 200.0).with_weight(8.0),
        ];
        let strategy = BranchAndBound::new(&config()).with_budget(Duration::from_secs(5));
        let layout = solve(&pieces, &container, &strategy);

        assert_eq!(layout.status, AlgorithmStatus::Optimal);
        assert_eq!(layout.placements.len(), 2);
        assert!(layout.unplaced.is_empty());
        assert_disjoint(&layout, 5.0);
    }

    #[test]
    fn test_identical_pieces_fill_rows() {
        let container = Container::new("AC", 1000.0, 600.0);
        let pieces: Vec<Piece> = (0..6)
            .map(|i| Piece::new(format!("T{}", i), 300.0, 250.0).with_rotation(false))
            .collect();
        let strategy = BranchAndBound::new(&config()).with_budget(Duration::from_secs(5));
        let layout = solve(&pieces, &container, &strategy);

        assert_eq!(layout.placements.len(), 6);
        assert_eq!(layout.status, AlgorithmStatus::Optimal);
        assert_disjoint(&layout, 5.0);
    }

    #[test]
    fn test_weight_knapsack() {
        let container = Container::new("AC", 1000.0, 1000.0).with_max_weight(20.0);
        let pieces = vec![
            Piece::new("A", 100.0, 100.0).with_weight(10.0),
            Piece::new("B", 100.0, 100.0).with_weight(15.0).with_priority(5),
            Piece::new("C", 100.0, 100.0).with_weight(10.0),
        ];
        let strategy = BranchAndBound::new(&config()).with_budget(Duration::from_secs(5));
        let layout = solve(&pieces, &container, &strategy);

        let mut placed: Vec<_> = layout.placements.iter().map(|p| p.piece_id.clone()).collect();
        placed.sort();
        assert_eq!(placed, vec!["A", "C"]);
        assert_eq!(layout.unplaced[0].reason, ExclusionReason::WeightLimitExceeded);
        assert!(layout.status.has_solution());
    }

    #[test]
    fn test_nothing_fits_is_infeasible() {
        let container = Container::new("AC", 500.0, 500.0);
        let pieces = vec![Piece::new("BIG", 600.0, 600.0)];
        let strategy = BranchAndBound::new(&config()).with_budget(Duration::from_secs(1));
        let layout = solve(&pieces, &container, &strategy);

        assert_eq!(layout.status, AlgorithmStatus::Infeasible);
        assert!(layout.placements.is_empty());
    }

    #[test]
    fn test_node_cap_reports_timeout() {
        let container = Container::new("AC", 1000.0, 1000.0);
        let pieces: Vec<Piece> = (0..12)
            .map(|i| Piece::new(format!("P{}", i), 230.0 + i as f64 * 7.0, 190.0 + i as f64 * 3.0))
            .collect();
        let strategy = BranchAndBound::new(&config().with_max_nodes(10));
        let layout = solve(&pieces, &container, &strategy);

        assert!(layout.status.is_timeout());
        assert_eq!(layout.stats.as_ref().map(|s| s.status), Some(layout.status));
        assert_disjoint(&layout, 5.0);
    }

    #[test]
    fn test_expired_deadline_keeps_seed() {
        let container = Container::new("AC", 1000.0, 1000.0);
        let pieces: Vec<Piece> = (0..12)
            .map(|i| Piece::new(format!("P{}", i), 300.0, 300.0 + i as f64))
            .collect();
        let seed = vec![Placement::new(
            "P0",
            Rect::new(0.0, 0.0, 300.0, 300.0),
            false,
            Level::Base,
        )];
        let refs: Vec<&Piece> = pieces.iter().collect();
        let request = LevelRequest::new(Level::Base, refs, &container, &config())
            .with_deadline(Deadline::at(Instant::now()));
        let layout = BranchAndBound::new(&config())
            .with_incumbent(seed)
            .place(&request);

        assert!(layout.status.is_timeout());
        assert!(!layout.placements.is_empty());
    }

    #[test]
    fn test_respects_obstacles() {
        let container = Container::new("AC", 1000.0, 500.0);
        let pieces = vec![Piece::new("A", 300.0, 300.0), Piece::new("B", 300.0, 300.0)];
        let refs: Vec<&Piece> = pieces.iter().collect();
        let obstacle = Rect::new(0.0, 0.0, 200.0, 500.0);
        let request = LevelRequest::new(Level::Upper, refs, &container, &config())
            .with_obstacles(vec![obstacle]);
        let layout = BranchAndBound::new(&config())
            .with_budget(Duration::from_secs(5))
            .place(&request);

        assert_eq!(layout.placements.len(), 2);
        assert!(layout
            .placements
            .iter()
            .all(|p| !p.rect().intersects(&obstacle) && p.level == Level::Upper));
    }
}
