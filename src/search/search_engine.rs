//! Iterative deepening best-move search with fail-soft alpha-beta negamax.
//!
//! Each iteration runs a fixed-depth negamax over the position model and
//! leaves its results in the transposition table, where the next iteration
//! picks them up for principal-variation-first move ordering and for bound
//! cutoffs. Only completed iterations count: an iteration abandoned at the
//! deadline is discarded and the deepest completed one is reported.
//!
//! Depth 1 always runs to completion, even with a deadline already in the
//! past, so a position with at least one legal move always yields a move.

use std::time::Instant;

use log::{debug, info};

use crate::cache::bounded_cache::CacheMetrics;
use crate::cache::transposition_table::{BoundType, TranspositionTable, TranspositionTableEntry};
use crate::errors::{PositionError, SearchResult};
use crate::position::position_model::{GameOutcome, GamePhase, PositionModel};
use crate::search::heuristic_weights::HeuristicWeights;
use crate::search::move_ranking::{best_ranking, sort_rankings, MoveRanking};
use crate::search::search_config::SearchConfig;

/// Score of a won position at the root; wins found deeper score `ply` less.
pub const WIN_SCORE: f64 = 1.0e9;
/// Hard ceiling on iteration depth regardless of configuration.
pub const MAX_SEARCH_DEPTH: u32 = 64;
/// Scores at or beyond this magnitude are proven wins or losses.
pub const DECISIVE_THRESHOLD: f64 = WIN_SCORE - 1000.0;

const MAX_HEURISTIC_SCORE: f64 = DECISIVE_THRESHOLD - 1.0;
const NODE_CHECK_INTERVAL: u64 = 256;
const ORDERING_PASS_MIN_DEPTH: u32 = 2;

#[derive(Debug, Clone, PartialEq)]
pub struct BestMove<M> {
    pub mv: M,
    pub score: f64,
    pub depth: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SearchOutcome<M> {
    Found(BestMove<M>),
    NoLegalMove,
}

impl<M> SearchOutcome<M> {
    pub fn best_move(&self) -> Option<&BestMove<M>> {
        match self {
            SearchOutcome::Found(best) => Some(best),
            SearchOutcome::NoLegalMove => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    NoLegalMove,
    SingleLegalMove,
    Deadline,
    DecisiveScore,
    TreeExhausted,
    DepthLimit,
}

#[derive(Debug, Clone)]
pub struct SearchReport<M> {
    pub outcome: SearchOutcome<M>,
    pub completed_depth: u32,
    pub stop_reason: StopReason,
    pub nodes: u64,
    pub elapsed_ms: u64,
    pub nps: u64,
    pub table_stats: CacheMetrics,
    /// Root candidates of the deepest completed iteration, best first.
    pub root_rankings: Vec<MoveRanking<M>>,
}

#[inline]
pub fn is_decisive(score: f64) -> bool {
    score.abs() >= DECISIVE_THRESHOLD
}

fn terminal_score(outcome: GameOutcome, ply: u32) -> f64 {
    match outcome {
        GameOutcome::SideToMoveWins => WIN_SCORE - f64::from(ply),
        GameOutcome::SideToMoveLoses => -(WIN_SCORE - f64::from(ply)),
        GameOutcome::Draw => 0.0,
    }
}

/// Decisive scores are stored relative to the node, not the root.
#[inline]
fn score_for_storage(score: f64, ply: u32) -> f64 {
    if score >= DECISIVE_THRESHOLD {
        score + f64::from(ply)
    } else if score <= -DECISIVE_THRESHOLD {
        score - f64::from(ply)
    } else {
        score
    }
}

#[inline]
fn score_from_storage(score: f64, ply: u32) -> f64 {
    if score >= DECISIVE_THRESHOLD {
        score - f64::from(ply)
    } else if score <= -DECISIVE_THRESHOLD {
        score + f64::from(ply)
    } else {
        score
    }
}

struct SearchContext {
    deadline: Instant,
    enforce_deadline: bool,
    nodes: u64,
    aborted: bool,
    frontier_reached: bool,
}

impl SearchContext {
    fn new(deadline: Instant) -> Self {
        Self {
            deadline,
            enforce_deadline: false,
            nodes: 0,
            aborted: false,
            frontier_reached: false,
        }
    }

    fn begin_iteration(&mut self, enforce_deadline: bool) {
        self.enforce_deadline = enforce_deadline;
        self.aborted = false;
        self.frontier_reached = false;
    }

    /// Count a node; `true` once the iteration must be abandoned.
    #[inline]
    fn visit(&mut self) -> bool {
        self.nodes += 1;
        if self.enforce_deadline
            && !self.aborted
            && self.nodes % NODE_CHECK_INTERVAL == 0
            && Instant::now() >= self.deadline
        {
            self.aborted = true;
        }
        self.aborted
    }
}

pub struct SearchEngine<P: PositionModel> {
    config: SearchConfig<P::Move>,
    start_weights: HeuristicWeights,
    end_weights: HeuristicWeights,
    tt: TranspositionTable<P::Move>,
}

impl<P: PositionModel> SearchEngine<P> {
    /// Build an engine, adopting the config's seed table if it carries one.
    pub fn new(mut config: SearchConfig<P::Move>) -> SearchResult<Self> {
        let tt = match config.take_seed_table() {
            Some(seed) => seed,
            None => TranspositionTable::with_budget(config.effective_cache_budget_bytes())?,
        };
        let start_weights = config
            .start_weights()
            .cloned()
            .unwrap_or_else(|| P::default_weights(GamePhase::Opening));
        let end_weights = config
            .end_weights()
            .cloned()
            .unwrap_or_else(|| P::default_weights(GamePhase::Endgame));
        Ok(Self {
            config,
            start_weights,
            end_weights,
            tt,
        })
    }

    pub fn config(&self) -> &SearchConfig<P::Move> {
        &self.config
    }

    pub fn table(&self) -> &TranspositionTable<P::Move> {
        &self.tt
    }

    pub fn table_mut(&mut self) -> &mut TranspositionTable<P::Move> {
        &mut self.tt
    }

    pub fn into_table(self) -> TranspositionTable<P::Move> {
        self.tt
    }

    pub fn new_game(&mut self) {
        self.tt.clear();
    }

    /// Apply a named option. Cache size options rebuild (and so empty) the
    /// table; weight options take effect on the next search. On error the
    /// engine keeps its previous configuration and table.
    pub fn set_option(&mut self, name: &str, value: &str) -> SearchResult<()> {
        let mut config = self.config.clone();
        config.set_option(name, value)?;
        if config.cache_budget_bytes() != self.config.cache_budget_bytes() {
            self.tt = TranspositionTable::with_budget(config.effective_cache_budget_bytes())?;
        }
        self.config = config;
        self.start_weights = self
            .config
            .start_weights()
            .cloned()
            .unwrap_or_else(|| P::default_weights(GamePhase::Opening));
        self.end_weights = self
            .config
            .end_weights()
            .cloned()
            .unwrap_or_else(|| P::default_weights(GamePhase::Endgame));
        Ok(())
    }

    /// Static score of `position` for its side to move.
    pub fn evaluate(&self, position: &P) -> SearchResult<f64> {
        let weights = match position.phase() {
            GamePhase::Opening => &self.start_weights,
            GamePhase::Endgame => &self.end_weights,
        };
        let score = weights.score(&position.features());
        if score.is_nan() {
            return Err(PositionError::Inconsistent("feature vector scored as NaN".to_owned()).into());
        }
        Ok(score.clamp(-MAX_HEURISTIC_SCORE, MAX_HEURISTIC_SCORE))
    }

    pub fn best_move(
        &mut self,
        position: &P,
        deadline: Instant,
    ) -> SearchResult<SearchOutcome<P::Move>> {
        Ok(self.search(position, deadline)?.outcome)
    }

    pub fn search(&mut self, position: &P, deadline: Instant) -> SearchResult<SearchReport<P::Move>> {
        self.search_with_depth(position, deadline, self.config.max_depth())
    }

    /// Search with an explicit depth ceiling in place of the configured one.
    pub fn search_with_depth(
        &mut self,
        position: &P,
        deadline: Instant,
        max_depth: Option<u32>,
    ) -> SearchResult<SearchReport<P::Move>> {
        let started_at = Instant::now();
        let mut root = position.clone();
        let legal = root.legal_moves();

        if root.outcome().is_some() || legal.is_empty() {
            info!("search skipped: no legal move");
            return Ok(self.report(
                started_at,
                SearchOutcome::NoLegalMove,
                0,
                StopReason::NoLegalMove,
                0,
                Vec::new(),
            ));
        }

        let ceiling = max_depth.unwrap_or(MAX_SEARCH_DEPTH).clamp(1, MAX_SEARCH_DEPTH);
        let mut ctx = SearchContext::new(deadline);
        let mut completed: Option<(u32, Vec<MoveRanking<P::Move>>)> = None;
        let mut stop_reason = StopReason::DepthLimit;

        for depth in 1..=ceiling {
            if depth > 1 && Instant::now() >= deadline {
                stop_reason = StopReason::Deadline;
                break;
            }

            ctx.begin_iteration(depth > 1);
            let Some(rankings) = self.search_root(&mut root, &legal, depth, &mut ctx)? else {
                debug!("depth {depth} abandoned at deadline after {} nodes", ctx.nodes);
                stop_reason = StopReason::Deadline;
                break;
            };

            let best_score = rankings.first().and_then(|r| r.score).unwrap_or(0.0);
            if let Some(best) = rankings.first() {
                debug!(
                    "depth {depth} best {} score {:.3} nodes {}",
                    best.mv, best_score, ctx.nodes
                );
            }
            let exhausted = !ctx.frontier_reached;
            completed = Some((depth, rankings));

            if legal.len() == 1 {
                stop_reason = StopReason::SingleLegalMove;
                break;
            }
            // Under a branching cap a decisive score only covers the searched replies.
            if is_decisive(best_score) && self.config.max_branching_factor().is_none() {
                stop_reason = StopReason::DecisiveScore;
                break;
            }
            if exhausted {
                stop_reason = StopReason::TreeExhausted;
                break;
            }
        }

        let Some((depth, rankings)) = completed else {
            return Err(PositionError::Inconsistent("no search iteration completed".to_owned()).into());
        };
        let outcome = match rankings.first() {
            Some(MoveRanking {
                mv,
                score: Some(score),
                ..
            }) => SearchOutcome::Found(BestMove {
                mv: mv.clone(),
                score: *score,
                depth,
            }),
            _ => SearchOutcome::NoLegalMove,
        };

        let report = self.report(started_at, outcome, depth, stop_reason, ctx.nodes, rankings);
        if let Some(best) = report.outcome.best_move() {
            info!(
                "search finished: best {} score {:.3} depth {} nodes {} time {}ms ({:?})",
                best.mv, best.score, best.depth, report.nodes, report.elapsed_ms, report.stop_reason
            );
        }
        Ok(report)
    }

    fn report(
        &self,
        started_at: Instant,
        outcome: SearchOutcome<P::Move>,
        completed_depth: u32,
        stop_reason: StopReason,
        nodes: u64,
        root_rankings: Vec<MoveRanking<P::Move>>,
    ) -> SearchReport<P::Move> {
        let elapsed_ms = started_at.elapsed().as_millis() as u64;
        SearchReport {
            outcome,
            completed_depth,
            stop_reason,
            nodes,
            elapsed_ms,
            nps: if elapsed_ms == 0 {
                0
            } else {
                nodes.saturating_mul(1000) / elapsed_ms
            },
            table_stats: self.tt.stats(),
            root_rankings,
        }
    }

    /// Full-window search of every root candidate; `None` if abandoned.
    fn search_root(
        &mut self,
        root: &mut P,
        legal: &[P::Move],
        depth: u32,
        ctx: &mut SearchContext,
    ) -> SearchResult<Option<Vec<MoveRanking<P::Move>>>> {
        ctx.nodes += 1;
        let key = root.fingerprint();
        let tt_move = self.tt.probe(key).and_then(|e| e.best_move.clone());
        let candidates = self.order_moves(root, legal.to_vec(), tt_move.as_ref(), depth)?;

        let mut alpha = f64::NEG_INFINITY;
        let beta = f64::INFINITY;
        let mut rankings = Vec::with_capacity(candidates.len());

        for mv in self.config.root_order().enumerate(&candidates) {
            root.make_move(mv)?;
            let child = self.negamax(root, depth - 1, -beta, -alpha, 1, ctx);
            root.unmake_move()?;
            let Some(child_score) = child? else {
                return Ok(None);
            };
            let score = -child_score;

            rankings.push(MoveRanking::evaluated(mv.clone(), score, depth));
            if score > alpha {
                alpha = score;
            }
        }

        if let Some(MoveRanking {
            mv,
            score: Some(score),
            ..
        }) = best_ranking(&rankings)
        {
            self.tt.store(
                key,
                TranspositionTableEntry {
                    bound: BoundType::Exact,
                    value: score_for_storage(*score, 0),
                    depth,
                    best_move: Some(mv.clone()),
                },
            );
        }
        sort_rankings(&mut rankings);
        Ok(Some(rankings))
    }

    fn negamax(
        &mut self,
        position: &mut P,
        depth: u32,
        mut alpha: f64,
        beta: f64,
        ply: u32,
        ctx: &mut SearchContext,
    ) -> SearchResult<Option<f64>> {
        if ctx.visit() {
            return Ok(None);
        }

        if let Some(outcome) = position.outcome() {
            return Ok(Some(terminal_score(outcome, ply)));
        }

        let alpha_orig = alpha;
        let key = position.fingerprint();
        let mut tt_move = None;

        if let Some(entry) = self.tt.probe(key) {
            let tt_score = score_from_storage(entry.value, ply);
            if entry.depth >= depth {
                let cutoff = match entry.bound {
                    BoundType::Exact => true,
                    BoundType::LowerBound => tt_score >= beta,
                    BoundType::UpperBound => tt_score <= alpha,
                };
                if cutoff {
                    // The stored subtree may extend past this iteration's horizon.
                    if !is_decisive(tt_score) {
                        ctx.frontier_reached = true;
                    }
                    return Ok(Some(tt_score));
                }
            }
            tt_move = entry.best_move.clone();
        }

        if depth == 0 {
            ctx.frontier_reached = true;
            return self.evaluate(position).map(Some);
        }

        let moves = position.legal_moves();
        if moves.is_empty() {
            return self.evaluate(position).map(Some);
        }
        let candidates = self.order_moves(position, moves, tt_move.as_ref(), depth)?;

        let mut best = f64::NEG_INFINITY;
        let mut best_move: Option<P::Move> = None;

        for mv in candidates {
            position.make_move(&mv)?;
            let child = self.negamax(position, depth - 1, -beta, -alpha, ply + 1, ctx);
            position.unmake_move()?;
            let Some(child_score) = child? else {
                return Ok(None);
            };
            let score = -child_score;

            if score > best {
                best = score;
                best_move = Some(mv);
            }
            if score > alpha {
                alpha = score;
            }
            if alpha >= beta {
                break;
            }
        }

        let bound = if best <= alpha_orig {
            BoundType::UpperBound
        } else if best >= beta {
            BoundType::LowerBound
        } else {
            BoundType::Exact
        };

        self.tt.store(
            key,
            TranspositionTableEntry {
                bound,
                value: score_for_storage(best, ply),
                depth,
                best_move,
            },
        );

        Ok(Some(best))
    }

    /// Order candidates for search and apply the branching cap.
    ///
    /// Deep nodes (and any node whose width exceeds the cap) get a heuristic
    /// pass scoring each child from the table or its static evaluation. The
    /// table's best move, when legal here, always goes first and survives
    /// truncation.
    fn order_moves(
        &self,
        position: &mut P,
        moves: Vec<P::Move>,
        tt_move: Option<&P::Move>,
        depth: u32,
    ) -> SearchResult<Vec<P::Move>> {
        let cap = self.config.max_branching_factor();
        let needs_pass = depth >= ORDERING_PASS_MIN_DEPTH || cap.is_some_and(|c| moves.len() > c);

        let mut ordered = if needs_pass {
            let mut rankings = Vec::with_capacity(moves.len());
            for mv in moves {
                position.make_move(&mv)?;
                let score = self.ordering_score(position);
                position.unmake_move()?;
                rankings.push(MoveRanking::evaluated(mv, score?, 0));
            }
            sort_rankings(&mut rankings);
            rankings.into_iter().map(|r| r.mv).collect::<Vec<_>>()
        } else {
            moves
        };

        if let Some(tt_mv) = tt_move {
            if let Some(idx) = ordered.iter().position(|m| m == tt_mv) {
                let pv = ordered.remove(idx);
                ordered.insert(0, pv);
            }
        }
        if let Some(cap) = cap {
            ordered.truncate(cap);
        }
        Ok(ordered)
    }

    /// Parent's view of a child position for move ordering.
    fn ordering_score(&self, child: &P) -> SearchResult<f64> {
        if let Some(outcome) = child.outcome() {
            return Ok(-terminal_score(outcome, 1));
        }
        if let Some(entry) = self.tt.peek(child.fingerprint()) {
            return Ok(-entry.value);
        }
        Ok(-self.evaluate(child)?)
    }

    /// Follow cached best moves from `position`, checking each against the
    /// live position's legal moves.
    pub fn principal_variation(&self, position: &P, max_len: usize) -> Vec<P::Move> {
        let mut pv = Vec::new();
        let mut state = position.clone();

        for _ in 0..max_len {
            let Some(entry) = self.tt.peek(state.fingerprint()) else {
                break;
            };
            let Some(best_move) = entry.best_move.clone() else {
                break;
            };
            if state.outcome().is_some() || !state.legal_moves().contains(&best_move) {
                break;
            }
            if state.make_move(&best_move).is_err() {
                break;
            }
            pv.push(best_move);
        }

        pv
    }
}

#[cfg(test)]
mod tests {
    use std::time::{Duration, Instant};

    use rand::{rngs::StdRng, Rng, SeedableRng};

    use super::{
        score_for_storage, score_from_storage, terminal_score, SearchEngine, SearchOutcome,
        StopReason, WIN_SCORE,
    };
    use crate::errors::{PositionError, PositionResult, SearchError};
    use crate::games::connect_four::{Column, ConnectFour};
    use crate::position::position_model::{FeatureVector, GameOutcome, GamePhase, PositionModel};
    use crate::search::enumeration_order::EnumerationOrder;
    use crate::search::heuristic_weights::HeuristicWeights;
    use crate::search::search_config::SearchConfig;

    #[derive(Debug, Clone)]
    struct TreeNode {
        children: Vec<usize>,
        value: f64,
        outcome: Option<GameOutcome>,
    }

    /// Explicit game tree; each node's value is its static score for the
    /// side to move there.
    #[derive(Debug, Clone)]
    struct TreeGame {
        nodes: Vec<TreeNode>,
        path: Vec<usize>,
        fail_on_make: bool,
        /// Sleep on every move that reaches ply 2 or deeper.
        deep_move_delay: Option<Duration>,
    }

    impl TreeGame {
        fn new(nodes: Vec<TreeNode>) -> Self {
            Self {
                nodes,
                path: vec![0],
                fail_on_make: false,
                deep_move_delay: None,
            }
        }

        fn current(&self) -> &TreeNode {
            &self.nodes[*self.path.last().unwrap_or(&0)]
        }

        fn random(seed: u64, height: u32) -> Self {
            let mut rng = StdRng::seed_from_u64(seed);
            let mut nodes = vec![TreeNode {
                children: Vec::new(),
                value: 0.0,
                outcome: None,
            }];
            let mut frontier = vec![0usize];
            for _ in 0..height {
                let mut next = Vec::new();
                for parent in frontier {
                    let width = rng.random_range(2..=4);
                    for _ in 0..width {
                        nodes.push(TreeNode {
                            children: Vec::new(),
                            value: rng.random_range(-100.0..100.0),
                            outcome: None,
                        });
                        let id = nodes.len() - 1;
                        nodes[parent].children.push(id);
                        next.push(id);
                    }
                }
                frontier = next;
            }
            Self::new(nodes)
        }
    }

    fn leaf(value: f64) -> TreeNode {
        TreeNode {
            children: Vec::new(),
            value,
            outcome: None,
        }
    }

    fn inner(children: Vec<usize>, value: f64) -> TreeNode {
        TreeNode {
            children,
            value,
            outcome: None,
        }
    }

    impl PositionModel for TreeGame {
        type Move = u8;

        fn fingerprint(&self) -> u64 {
            let id = *self.path.last().unwrap_or(&0) as u64;
            id.wrapping_add(1).wrapping_mul(0x9E37_79B9_7F4A_7C15)
        }

        fn legal_moves(&self) -> Vec<u8> {
            if self.current().outcome.is_some() {
                return Vec::new();
            }
            (0..self.current().children.len() as u8).collect()
        }

        fn make_move(&mut self, mv: &u8) -> PositionResult<()> {
            if self.fail_on_make {
                return Err(PositionError::Inconsistent("scripted failure".to_owned()));
            }
            let child = *self
                .current()
                .children
                .get(usize::from(*mv))
                .ok_or_else(|| PositionError::IllegalMove(mv.to_string()))?;
            self.path.push(child);
            if let Some(delay) = self.deep_move_delay.filter(|_| self.path.len() > 2) {
                std::thread::sleep(delay);
            }
            Ok(())
        }

        fn unmake_move(&mut self) -> PositionResult<()> {
            if self.path.len() <= 1 {
                return Err(PositionError::NothingToUndo);
            }
            self.path.pop();
            Ok(())
        }

        fn outcome(&self) -> Option<GameOutcome> {
            self.current().outcome
        }

        fn phase(&self) -> GamePhase {
            if self.path.len() < 3 {
                GamePhase::Opening
            } else {
                GamePhase::Endgame
            }
        }

        fn features(&self) -> FeatureVector {
            vec![("value", self.current().value)]
        }

        fn default_weights(_phase: GamePhase) -> HeuristicWeights {
            HeuristicWeights::from_pairs([("value", 1.0)]).unwrap_or_default()
        }
    }

    /// Plain depth-limited negamax without pruning or caching.
    fn reference_negamax(game: &TreeGame, node: usize, depth: u32, ply: u32) -> f64 {
        let n = &game.nodes[node];
        if let Some(outcome) = n.outcome {
            return terminal_score(outcome, ply);
        }
        if depth == 0 || n.children.is_empty() {
            return n.value;
        }
        n.children
            .iter()
            .map(|&child| -reference_negamax(game, child, depth - 1, ply + 1))
            .fold(f64::NEG_INFINITY, f64::max)
    }

    fn far_deadline() -> Instant {
        Instant::now() + Duration::from_secs(60)
    }

    fn engine_with(config: SearchConfig<u8>) -> SearchEngine<TreeGame> {
        SearchEngine::new(config.with_cache_budget_bytes(1 << 20).expect("budget is valid"))
            .expect("engine should build")
    }

    #[test]
    fn matches_plain_minimax_on_random_trees() {
        for seed in 0..12u64 {
            let game = TreeGame::random(seed, 4);
            let mut engine = engine_with(SearchConfig::new());
            let report = engine.search(&game, far_deadline()).expect("search should run");

            assert_eq!(report.stop_reason, StopReason::TreeExhausted, "seed {seed}");
            let best = report.outcome.best_move().expect("tree has moves").clone();
            let expected = reference_negamax(&game, 0, best.depth, 0);
            assert!((best.score - expected).abs() < 1e-9, "seed {seed}: {} vs {expected}", best.score);

            let chosen_child = game.nodes[0].children[usize::from(best.mv)];
            let chosen_value = -reference_negamax(&game, chosen_child, best.depth - 1, 1);
            assert!((chosen_value - expected).abs() < 1e-9, "seed {seed}: chosen move is not optimal");
        }
    }

    #[test]
    fn every_completed_depth_matches_reference() {
        let game = TreeGame::random(99, 5);
        for depth in 1..=5u32 {
            let mut engine = engine_with(SearchConfig::new().with_max_depth(depth).expect("depth > 0"));
            let best = engine
                .best_move(&game, far_deadline())
                .expect("search should run")
                .best_move()
                .cloned()
                .expect("tree has moves");
            assert_eq!(best.depth, depth);
            let expected = reference_negamax(&game, 0, depth, 0);
            assert!((best.score - expected).abs() < 1e-9, "depth {depth}");
        }
    }

    #[test]
    fn single_legal_move_returns_immediately() {
        let game = TreeGame::new(vec![
            inner(vec![1], 0.0),
            inner(vec![2, 3], 1.0),
            leaf(4.0),
            leaf(-4.0),
        ]);
        let mut engine = engine_with(SearchConfig::new());
        let report = engine
            .search(&game, Instant::now())
            .expect("search should run");

        assert_eq!(report.stop_reason, StopReason::SingleLegalMove);
        assert_eq!(report.completed_depth, 1);
        let best = report.outcome.best_move().expect("one move exists");
        assert_eq!(best.mv, 0);
        assert_eq!(best.depth, 1);
        assert_eq!(best.score, -1.0);
    }

    #[test]
    fn past_deadline_still_completes_depth_one() {
        let game = TreeGame::random(7, 6);
        let mut engine = engine_with(SearchConfig::new());
        let deadline = Instant::now();
        let report = engine.search(&game, deadline).expect("search should run");

        assert_eq!(report.completed_depth, 1);
        assert_eq!(report.stop_reason, StopReason::Deadline);
        let best = report.outcome.best_move().expect("a move must be returned");
        assert!(best.depth >= 1);
        assert!(game.legal_moves().contains(&best.mv));
    }

    #[test]
    fn iteration_cut_off_by_deadline_is_discarded() {
        // 300 root moves each with two replies; replies are slow, so depth 2
        // hits the deadline at a node check long before it can finish.
        let mut rng = StdRng::seed_from_u64(17);
        let mut nodes = vec![inner(Vec::new(), 0.0)];
        for _ in 0..300 {
            let child = nodes.len();
            nodes[0].children.push(child);
            nodes.push(inner(vec![child + 1, child + 2], rng.random_range(-100.0..100.0)));
            nodes.push(leaf(rng.random_range(-100.0..100.0)));
            nodes.push(leaf(rng.random_range(-100.0..100.0)));
        }
        let mut game = TreeGame::new(nodes);
        game.deep_move_delay = Some(Duration::from_millis(1));

        let mut engine = engine_with(SearchConfig::new());
        let report = engine
            .search(&game, Instant::now() + Duration::from_millis(50))
            .expect("search should run");

        assert_eq!(report.stop_reason, StopReason::Deadline);
        assert_eq!(report.completed_depth, 1);
        assert!(report.nodes >= 512, "depth 2 was not entered: {} nodes", report.nodes);
        let best = report.outcome.best_move().expect("a move must be returned");
        assert_eq!(best.depth, 1);
        let expected = reference_negamax(&game, 0, 1, 0);
        assert!((best.score - expected).abs() < 1e-9, "{} vs {expected}", best.score);
        assert_eq!(report.root_rankings.len(), 300);
        assert!(report.root_rankings.iter().all(|r| r.depth == 1));
    }

    #[test]
    fn no_legal_move_is_reported_not_raised() {
        let mut finished = TreeGame::new(vec![leaf(0.0)]);
        finished.nodes[0].outcome = Some(GameOutcome::SideToMoveLoses);
        let mut engine = engine_with(SearchConfig::new());
        assert_eq!(
            engine.best_move(&finished, far_deadline()).expect("search should run"),
            SearchOutcome::NoLegalMove
        );

        let stuck = TreeGame::new(vec![leaf(3.0)]);
        let report = engine.search(&stuck, far_deadline()).expect("search should run");
        assert_eq!(report.outcome, SearchOutcome::NoLegalMove);
        assert_eq!(report.stop_reason, StopReason::NoLegalMove);
    }

    #[test]
    fn immediate_win_stops_deepening() {
        let mut game = TreeGame::new(vec![
            inner(vec![1, 2], 0.0),
            inner(vec![3], 0.0),
            leaf(0.0),
            leaf(0.0),
        ]);
        game.nodes[2].outcome = Some(GameOutcome::SideToMoveLoses);
        let mut engine = engine_with(SearchConfig::new());
        let report = engine.search(&game, far_deadline()).expect("search should run");

        assert_eq!(report.stop_reason, StopReason::DecisiveScore);
        let best = report.outcome.best_move().expect("win exists");
        assert_eq!(best.mv, 1);
        assert_eq!(best.score, WIN_SCORE - 1.0);
    }

    #[test]
    fn capped_search_does_not_treat_a_win_as_proven() {
        let mut game = TreeGame::new(vec![
            inner(vec![1, 2], 0.0),
            inner(vec![3], 0.0),
            leaf(0.0),
            leaf(0.0),
        ]);
        game.nodes[2].outcome = Some(GameOutcome::SideToMoveLoses);
        let mut engine = engine_with(
            SearchConfig::new()
                .with_max_branching_factor(1)
                .expect("cap is valid"),
        );
        let report = engine.search(&game, far_deadline()).expect("search should run");

        // Only the capped tree is exhausted; the win is not reported as proven.
        assert_eq!(report.stop_reason, StopReason::TreeExhausted);
        let best = report.outcome.best_move().expect("win exists");
        assert_eq!(best.mv, 1);
        assert_eq!(best.score, WIN_SCORE - 1.0);
    }

    #[test]
    fn rejected_cache_budget_leaves_engine_unchanged() {
        let mut engine = engine_with(SearchConfig::new());
        let capacity = engine.table().capacity();

        for _ in 0..2 {
            let err = engine
                .set_option("TranspositionTableSizeBytes", "10")
                .expect_err("budget below one entry");
            assert!(matches!(err, SearchError::Cache(_)));
            assert_eq!(engine.config().cache_budget_bytes(), Some(1 << 20));
            assert_eq!(engine.table().capacity(), capacity);
        }

        engine
            .set_option("TranspositionTableSizeBytes", "4096")
            .expect("budget holds entries");
        assert_eq!(engine.config().cache_budget_bytes(), Some(4096));
        assert!(engine.table().capacity() < capacity);
    }

    #[test]
    fn branching_cap_limits_search_to_heuristic_favourites() {
        // Root children 1, 2, 3 look good, neutral and bad for the root, but
        // one ply deeper the order is reversed.
        let game = TreeGame::new(vec![
            inner(vec![1, 2, 3], 0.0),
            inner(vec![4], -5.0),
            inner(vec![5], 0.0),
            inner(vec![6], 5.0),
            leaf(-100.0),
            leaf(0.0),
            leaf(100.0),
        ]);

        let mut uncapped = engine_with(SearchConfig::new().with_max_depth(2).expect("depth > 0"));
        let best = uncapped
            .best_move(&game, far_deadline())
            .expect("search should run");
        assert_eq!(best.best_move().map(|b| b.mv), Some(2));

        let mut capped = engine_with(
            SearchConfig::new()
                .with_max_depth(2)
                .and_then(|c| c.with_max_branching_factor(1))
                .expect("config is valid"),
        );
        let report = capped.search(&game, far_deadline()).expect("search should run");
        assert_eq!(report.outcome.best_move().map(|b| b.mv), Some(0));
        assert_eq!(report.root_rankings.len(), 1);
    }

    #[test]
    fn root_order_does_not_change_the_value() {
        let game = TreeGame::random(3, 4);
        let mut plain = engine_with(SearchConfig::new());
        let mut skipping = engine_with(SearchConfig::new().with_root_order(EnumerationOrder::SkipOffset));
        let a = plain.best_move(&game, far_deadline()).expect("search should run");
        let b = skipping.best_move(&game, far_deadline()).expect("search should run");
        let (a, b) = (a.best_move().expect("move"), b.best_move().expect("move"));
        assert!((a.score - b.score).abs() < 1e-9);
    }

    #[test]
    fn seeded_table_is_reused_by_a_fresh_engine() {
        let game = TreeGame::random(21, 5);
        let config = || SearchConfig::new().with_max_depth(5).expect("depth > 0");

        let mut first = engine_with(config());
        let cold = first.search(&game, far_deadline()).expect("search should run");
        let table = first.into_table();

        let mut second = SearchEngine::<TreeGame>::new(config().with_seed_table(table))
            .expect("engine should build");
        let warm = second.search(&game, far_deadline()).expect("search should run");

        assert!(warm.nodes < cold.nodes, "warm {} vs cold {}", warm.nodes, cold.nodes);
        let (cold_best, warm_best) = (
            cold.outcome.best_move().expect("move"),
            warm.outcome.best_move().expect("move"),
        );
        assert_eq!(cold_best.mv, warm_best.mv);
        assert!((cold_best.score - warm_best.score).abs() < 1e-9);
    }

    #[test]
    fn position_errors_propagate() {
        let mut game = TreeGame::random(5, 2);
        game.fail_on_make = true;
        let mut engine = engine_with(SearchConfig::new());
        let err = engine
            .search(&game, far_deadline())
            .expect_err("make_move fails");
        assert!(matches!(err, SearchError::Position(PositionError::Inconsistent(_))));
    }

    #[test]
    fn start_and_end_weights_follow_phase() {
        let game = TreeGame::random(1, 3);
        let config = SearchConfig::new()
            .with_start_weights(HeuristicWeights::from_pairs([("value", 2.0)]).expect("finite"))
            .with_end_weights(HeuristicWeights::from_pairs([("value", -1.0)]).expect("finite"));
        let engine = engine_with(config);

        let root_value = game.current().value;
        assert_eq!(engine.evaluate(&game).expect("finite"), 2.0 * root_value);

        let mut deep = game.clone();
        deep.make_move(&0).expect("legal");
        deep.make_move(&0).expect("legal");
        assert_eq!(engine.evaluate(&deep).expect("finite"), -deep.current().value);
    }

    #[test]
    fn decisive_scores_survive_storage_round_trip() {
        for ply in [0u32, 1, 7, 40] {
            for score in [WIN_SCORE - 3.0, -(WIN_SCORE - 3.0), 12.5] {
                let stored = score_for_storage(score, ply);
                assert_eq!(score_from_storage(stored, ply), score);
            }
        }
        assert_eq!(terminal_score(GameOutcome::Draw, 9), 0.0);
    }

    #[test]
    fn principal_variation_follows_legal_table_moves() {
        let game = TreeGame::random(11, 4);
        let mut engine = engine_with(SearchConfig::new());
        let best = engine
            .best_move(&game, far_deadline())
            .expect("search should run")
            .best_move()
            .cloned()
            .expect("move");

        let pv = engine.principal_variation(&game, 8);
        assert_eq!(pv.first(), Some(&best.mv));
        assert!(pv.len() <= 4);
    }

    #[test]
    fn connect_four_takes_the_immediate_win() {
        // First player has three stacked discs in column d.
        let game = ConnectFour::from_moves("dcdcdg").expect("moves are legal");
        let mut engine = SearchEngine::<ConnectFour>::new(SearchConfig::new()).expect("engine should build");
        let best = engine
            .best_move(&game, far_deadline())
            .expect("search should run");
        let best = best.best_move().expect("moves exist");
        assert_eq!(best.mv, Column::new(3).expect("column d"));
        assert!(best.score >= super::DECISIVE_THRESHOLD);
    }

    #[test]
    fn connect_four_blocks_a_threat() {
        // Second player has three stacked in column a; nothing else saves first.
        let game = ConnectFour::from_moves("dadaga").expect("moves are legal");
        let mut engine = SearchEngine::<ConnectFour>::new(
            SearchConfig::new().with_max_depth(4).expect("depth > 0"),
        )
        .expect("engine should build");
        let best = engine
            .best_move(&game, far_deadline())
            .expect("search should run");
        assert_eq!(
            best.best_move().map(|b| b.mv),
            Some(Column::new(0).expect("column a"))
        );
    }

    #[test]
    fn connect_four_prefers_winning_to_blocking() {
        // Second player threatens column a, but first completes the bottom row.
        let game = ConnectFour::from_moves("daeaga").expect("moves are legal");
        let mut engine = SearchEngine::<ConnectFour>::new(
            SearchConfig::new().with_max_depth(4).expect("depth > 0"),
        )
        .expect("engine should build");
        let best = engine
            .best_move(&game, far_deadline())
            .expect("search should run");
        let best = best.best_move().expect("moves exist");
        assert_eq!(best.mv, Column::new(5).expect("column f"));
        assert!(best.score >= super::DECISIVE_THRESHOLD);
    }
}
