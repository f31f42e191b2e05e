// Copyright 2017-2019 Sean Gillespie.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use crate::eval::{mated_in, BoardEvaluator, Score, StandardEvaluator, DRAW};
use crate::moves::Move;
use crate::position::Position;
use crate::search::data::DataRecorder;
use crate::search::heuristics::Heuristics;
use crate::search::transposition_table::{clamp_i16, TranspositionTable, MOVE_MASK};
use crate::search::transposition_table::DEFAULT_TABLE_SIZE_MB;
use crate::search::worker::{format_pv, Worker};
use crate::types::Color;

pub const DEFAULT_CONTEMPT: Score = 20;

/// How far the previous root score must lean before draws are scored with contempt.
const CONTEMPT_THRESHOLD: Score = 150;

/// Conditions under which a search stops. With no limits at all the search runs until its
/// stop flag is raised.
#[derive(Clone, Debug, Default)]
pub struct SearchLimits {
    pub depth: Option<u32>,
    pub time: Option<Duration>,
    pub nodes: Option<u64>,
    /// Keep the search alive after the last iteration until it is stopped externally.
    pub infinite: bool,
}

impl SearchLimits {
    pub fn depth(depth: u32) -> SearchLimits {
        SearchLimits {
            depth: Some(depth),
            ..Default::default()
        }
    }

    pub fn time(time: Duration) -> SearchLimits {
        SearchLimits {
            time: Some(time),
            ..Default::default()
        }
    }
}

#[derive(Clone, Debug)]
pub struct SearchResult {
    /// The null move when the root has no legal moves.
    pub best_move: Move,
    pub score: Score,
    pub depth: u32,
    pub nodes: u64,
    pub pv: Vec<Move>,
    pub elapsed: Duration,
}

/// The deepest completed iteration of any worker, packed into one word as depth
/// (bits 40-47), score (bits 24-39) and move (bits 0-23).
#[derive(Debug, Default)]
pub struct BestCell(AtomicU64);

impl BestCell {
    fn pack(depth: u32, score: Score, mov: Move) -> u64 {
        u64::from(depth.min(255)) << 40
            | u64::from(clamp_i16(score) as u16) << 24
            | (u64::from(mov.bits()) & MOVE_MASK)
    }

    /// Replaces the recorded iteration if `depth` is strictly deeper. Returns whether it did.
    pub fn publish(&self, depth: u32, score: Score, mov: Move) -> bool {
        let packed = BestCell::pack(depth, score, mov);
        let mut current = self.0.load(Ordering::Acquire);
        loop {
            if (current >> 40) as u32 >= depth {
                return false;
            }

            match self
                .0
                .compare_exchange_weak(current, packed, Ordering::AcqRel, Ordering::Acquire)
            {
                Ok(_) => return true,
                Err(actual) => current = actual,
            }
        }
    }

    /// The recorded depth, score and move. Depth 0 means nothing was recorded.
    pub fn load(&self) -> (u32, Score, Move) {
        let packed = self.0.load(Ordering::Acquire);
        let depth = (packed >> 40) as u32 & 0xFF;
        let score = Score::from((packed >> 24) as u16 as i16);
        let mov = Move::from_bits((packed & MOVE_MASK) as u32);
        (depth, score, mov)
    }
}

/// Follows the table's best moves from `pos` after playing `first`, stopping at a missing,
/// illegal or repeated entry.
fn table_line(
    table: &TranspositionTable,
    pos: &Position,
    first: Move,
    max_len: usize,
) -> Vec<Move> {
    let mut line = vec![first];
    let mut seen = vec![pos.zobrist_hash()];
    let mut current = pos.apply(first);
    while line.len() < max_len {
        let hash = current.zobrist_hash();
        if seen.contains(&hash) {
            break;
        }
        seen.push(hash);

        let stored = match table.probe_move(hash) {
            Some(stored) => stored,
            None => break,
        };
        let mov = match current.legal_moves().iter().find(|m| m.same_action(stored)) {
            Some(&mov) => mov,
            None => break,
        };
        line.push(mov);
        current = current.apply(mov);
    }

    line
}

/// State shared by all workers of one search.
pub struct Shared<'a> {
    pub table: &'a TranspositionTable,
    pub evaluator: &'a dyn BoardEvaluator,
    pub limits: &'a SearchLimits,
    pub game: &'a [u64],
    pub stop: &'a AtomicBool,
    pub done: AtomicBool,
    pub nodes: AtomicU64,
    pub best: BestCell,
    pub start: Instant,
    pub root_side: Color,
    pub draw_score: Score,
    pub previous_score: Score,
}

impl<'a> Shared<'a> {
    /// Records a completed iteration if it is deeper than anything recorded so far.
    pub fn publish(&self, depth: u32, score: Score, best_move: Move) {
        self.best.publish(depth, score, best_move);
    }

    pub fn should_stop(&self) -> bool {
        if self.stop.load(Ordering::Relaxed) || self.done.load(Ordering::Relaxed) {
            return true;
        }

        let out_of_time = self
            .limits
            .time
            .map_or(false, |budget| self.start.elapsed() >= budget);
        let out_of_nodes = self
            .limits
            .nodes
            .map_or(false, |limit| self.nodes.load(Ordering::Relaxed) >= limit);
        if out_of_time || out_of_nodes {
            self.done.store(true, Ordering::Relaxed);
            return true;
        }

        false
    }
}

/// The search engine. Owns the transposition table and each thread's move ordering state;
/// `find_move` runs one Lazy SMP search across the configured number of threads.
pub struct Searcher {
    table: TranspositionTable,
    evaluator: Box<dyn BoardEvaluator>,
    heuristics: Vec<Heuristics>,
    stop: Arc<AtomicBool>,
    contempt: Score,
    last_score: Option<Score>,
}

impl Searcher {
    pub fn new() -> Searcher {
        Searcher::with_evaluator(StandardEvaluator::new())
    }

    pub fn with_evaluator<E: BoardEvaluator + 'static>(evaluator: E) -> Searcher {
        Searcher {
            table: TranspositionTable::new(DEFAULT_TABLE_SIZE_MB),
            evaluator: Box::new(evaluator),
            heuristics: vec![Heuristics::new()],
            stop: Arc::new(AtomicBool::new(false)),
            contempt: DEFAULT_CONTEMPT,
            last_score: None,
        }
    }

    /// The flag that halts a running search. The caller owns it: the searcher never lowers
    /// it, so it must be cleared before the next search starts.
    pub fn stop_handle(&self) -> Arc<AtomicBool> {
        self.stop.clone()
    }

    pub fn threads(&self) -> usize {
        self.heuristics.len()
    }

    pub fn set_threads(&mut self, threads: usize) {
        self.heuristics.resize_with(threads.max(1), Heuristics::new);
    }

    pub fn set_contempt(&mut self, contempt: Score) {
        self.contempt = contempt;
    }

    pub fn resize_table(&mut self, size_mb: usize) {
        self.table.resize(size_mb);
    }

    pub fn hashfull(&self) -> u32 {
        self.table.hashfull()
    }

    /// Forgets everything learned so far, as for a new game.
    pub fn clear(&mut self) {
        self.table.clear();
        for heuristics in self.heuristics.iter_mut() {
            heuristics.clear();
        }
        self.last_score = None;
    }

    fn draw_score(&self) -> Score {
        match self.last_score {
            Some(score) if score > CONTEMPT_THRESHOLD => -self.contempt,
            Some(score) if score < -CONTEMPT_THRESHOLD => self.contempt,
            _ => DRAW,
        }
    }

    /// Searches `pos` for the best move. `game` holds the hashes of the positions played
    /// before `pos` in the current game, oldest first, for repetition detection.
    pub fn find_move(
        &mut self,
        pos: &Position,
        limits: &SearchLimits,
        game: &[u64],
        recorder: &dyn DataRecorder,
    ) -> SearchResult {
        let start = Instant::now();
        let legal = pos.legal_moves();
        if legal.is_empty() {
            let score = if pos.in_check() { mated_in(0) } else { DRAW };
            return SearchResult {
                best_move: Move::null(),
                score,
                depth: 0,
                nodes: 0,
                pv: Vec::new(),
                elapsed: start.elapsed(),
            };
        }

        self.table.new_search();
        for heuristics in self.heuristics.iter_mut() {
            heuristics.age();
        }

        info!(
            "starting search: {} thread(s), limits {:?}, fen {}",
            self.heuristics.len(),
            limits,
            pos.as_fen()
        );

        let shared = Shared {
            table: &self.table,
            evaluator: &*self.evaluator,
            limits,
            game,
            stop: &*self.stop,
            done: AtomicBool::new(false),
            nodes: AtomicU64::new(0),
            best: BestCell::default(),
            start,
            root_side: pos.side_to_move(),
            draw_score: self.draw_score(),
            previous_score: self.last_score.unwrap_or(0),
        };

        let (main_heuristics, helper_heuristics) = self
            .heuristics
            .split_first_mut()
            .unwrap_or_else(|| unreachable!("searcher always has at least one thread"));
        let root_best = thread::scope(|scope| {
            for (index, heuristics) in helper_heuristics.iter_mut().enumerate() {
                let shared = &shared;
                scope.spawn(move || {
                    let mut worker = Worker::new(index + 1, shared, heuristics, None);
                    worker.run(pos);
                });
            }

            let mut main = Worker::new(0, &shared, main_heuristics, Some(recorder));
            main.run(pos);
            if limits.infinite {
                while !shared.stop.load(Ordering::Relaxed) {
                    thread::sleep(Duration::from_millis(2));
                }
            }

            // the main thread is done; helpers stop with it
            shared.done.store(true, Ordering::Relaxed);
            main.root_best()
        });

        let (depth, score, recorded) = shared.best.load();
        let nodes = shared.nodes.load(Ordering::Relaxed);
        let elapsed = start.elapsed();
        let (best_move, score, pv) = if depth > 0 {
            self.last_score = Some(score);
            let line = table_line(&self.table, pos, recorded, depth as usize);
            (recorded, score, line)
        } else {
            // not even the first iteration finished
            let mov = root_best.unwrap_or(legal[0]);
            (mov, 0, vec![mov])
        };

        info!(
            "search finished: bestmove {} score {} depth {} nodes {} in {}ms (pv {})",
            best_move,
            score,
            depth,
            nodes,
            elapsed.as_millis(),
            format_pv(&pv)
        );

        SearchResult {
            best_move,
            score,
            depth,
            nodes,
            pv,
            elapsed,
        }
    }
}

impl Default for Searcher {
    fn default() -> Searcher {
        Searcher::new()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::Ordering;
    use std::time::Duration;

    use super::{BestCell, SearchLimits, Searcher};
    use crate::eval::{mate_in, mated_in, DRAW, MATE};
    use crate::position::Position;
    use crate::search::data::NullDataRecorder;

    fn search(fen: &str, limits: SearchLimits) -> super::SearchResult {
        let mut searcher = Searcher::new();
        searcher.resize_table(1);
        let pos = Position::from_fen(fen).unwrap();
        searcher.find_move(&pos, &limits, &[], &NullDataRecorder)
    }

    #[test]
    fn legal_move_at_depth_one() {
        let pos = Position::from_start_position();
        let result = search(crate::position::START_FEN, SearchLimits::depth(1));
        assert!(pos.is_legal(result.best_move));
        assert_eq!(1, result.depth);
        assert!(result.nodes > 0);
    }

    #[test]
    fn finds_mate_in_one() {
        let result = search("6k1/5ppp/8/8/8/8/8/R5K1 w - - 0 1", SearchLimits::depth(3));
        assert_eq!("a1a8", result.best_move.as_uci());
        assert_eq!(mate_in(1), result.score);
    }

    #[test]
    fn finds_mate_in_two() {
        // 1. Kb6 Kb8 2. Rh8# (or 1. Kc7 Ka7 2. Ra1#); Rh8+ right away lets the king out
        let result = search("k7/8/2K5/8/8/8/8/7R w - - 0 1", SearchLimits::depth(5));
        assert_eq!(mate_in(3), result.score);
    }

    #[test]
    fn wins_hanging_queen() {
        let result = search("4k3/8/8/3q4/8/8/3R4/4K3 w - - 0 1", SearchLimits::depth(2));
        assert_eq!("d2d5", result.best_move.as_uci());
        assert!(result.score > 300);
    }

    #[test]
    fn checkmated_root() {
        let result = search(
            "rnb1kbnr/pppp1ppp/8/4p3/6Pq/5P2/PPPPP2P/RNBQKBNR w KQkq - 1 3",
            SearchLimits::depth(3),
        );
        assert!(result.best_move.is_null());
        assert_eq!(mated_in(0), result.score);
    }

    #[test]
    fn stalemated_root() {
        let result = search("7k/5Q2/6K1/8/8/8/8/8 b - - 0 1", SearchLimits::depth(3));
        assert!(result.best_move.is_null());
        assert_eq!(DRAW, result.score);
    }

    #[test]
    fn fifty_move_rule_scores_draw() {
        // every move is quiet, so every reply reaches the hundredth halfmove
        let result = search("7k/8/8/8/8/8/8/Q6K w - - 99 80", SearchLimits::depth(3));
        assert_eq!(DRAW, result.score);
    }

    #[test]
    fn mate_beats_fifty_move_rule() {
        let result = search("6k1/5ppp/8/8/8/8/8/R5K1 w - - 99 80", SearchLimits::depth(3));
        assert_eq!("a1a8", result.best_move.as_uci());
        assert_eq!(mate_in(1), result.score);
    }

    #[test]
    fn repetition_in_game_history() {
        // Shuffling the knights out and back twice repeats the start position. With that
        // history, going out once more and back would be the third occurrence.
        let start = Position::from_start_position();
        let mut game = Vec::new();
        let mut pos = start;
        for _ in 0..2 {
            for text in &["g1f3", "g8f6", "f3g1", "f6g8"] {
                game.push(pos.zobrist_hash());
                let mov = pos.parse_uci_move(text).unwrap();
                pos = pos.apply(mov);
            }
        }
        assert_eq!(start.zobrist_hash(), pos.zobrist_hash());

        let limits = SearchLimits::depth(4);
        let mut searcher = Searcher::new();
        searcher.resize_table(1);
        let result = searcher.find_move(&pos, &limits, &game, &NullDataRecorder);
        assert!(pos.is_legal(result.best_move));
    }

    #[test]
    fn contempt_follows_last_score() {
        let mut searcher = Searcher::new();
        assert_eq!(DRAW, searcher.draw_score());
        searcher.last_score = Some(400);
        assert_eq!(-20, searcher.draw_score());
        searcher.last_score = Some(-400);
        assert_eq!(20, searcher.draw_score());
        searcher.set_contempt(0);
        assert_eq!(0, searcher.draw_score());
        searcher.clear();
        assert_eq!(None, searcher.last_score);
    }

    #[test]
    fn best_cell_keeps_deepest_iteration() {
        let pos = Position::from_start_position();
        let e4 = pos.parse_uci_move("e2e4").unwrap();
        let d4 = pos.parse_uci_move("d2d4").unwrap();
        let cell = BestCell::default();
        assert_eq!(0, cell.load().0);

        assert!(cell.publish(3, -45, e4));
        assert!(!cell.publish(3, 80, d4));
        assert!(!cell.publish(2, 80, d4));
        assert_eq!((3, -45, e4), cell.load());

        assert!(cell.publish(5, -mate_in(3), d4));
        assert_eq!((5, -(MATE - 3), d4), cell.load());
    }

    #[test]
    fn principal_variation_follows_the_table() {
        let mut searcher = Searcher::new();
        searcher.resize_table(1);
        let pos = Position::from_fen("k7/8/2K5/8/8/8/8/7R w - - 0 1").unwrap();
        let result = searcher.find_move(&pos, &SearchLimits::depth(5), &[], &NullDataRecorder);
        assert_eq!(Some(&result.best_move), result.pv.first());
        assert!(result.pv.len() <= 5);

        let mut current = pos;
        for &mov in &result.pv {
            assert!(current.is_legal(mov));
            current = current.apply(mov);
        }
    }

    #[test]
    fn lazy_smp_agrees_on_mate() {
        let mut searcher = Searcher::new();
        searcher.resize_table(1);
        searcher.set_threads(3);
        assert_eq!(3, searcher.threads());
        let pos = Position::from_fen("6k1/5ppp/8/8/8/8/8/R5K1 w - - 0 1").unwrap();
        let result = searcher.find_move(&pos, &SearchLimits::depth(4), &[], &NullDataRecorder);
        assert_eq!("a1a8", result.best_move.as_uci());
        assert_eq!(mate_in(1), result.score);
    }

    #[test]
    fn node_limit_stops_search() {
        let limits = SearchLimits {
            nodes: Some(20_000),
            ..Default::default()
        };
        let result = search(crate::position::START_FEN, limits);
        let pos = Position::from_start_position();
        assert!(pos.is_legal(result.best_move));
        assert!(result.nodes < 20_000 + 2 * 4096);
    }

    #[test]
    fn time_limit_stops_search() {
        let result = search(
            crate::position::START_FEN,
            SearchLimits::time(Duration::from_millis(50)),
        );
        assert!(Position::from_start_position().is_legal(result.best_move));
        assert!(result.elapsed < Duration::from_secs(5));
    }

    #[test]
    fn raised_stop_flag_still_yields_a_move() {
        let mut searcher = Searcher::new();
        searcher.resize_table(1);
        searcher.stop_handle().store(true, Ordering::Relaxed);
        let pos = Position::from_start_position();
        let limits = SearchLimits {
            infinite: true,
            ..Default::default()
        };
        let result = searcher.find_move(&pos, &limits, &[], &NullDataRecorder);
        assert!(pos.is_legal(result.best_move));
    }
}
