// Copyright 2017-2019 Sean Gillespie.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! A single search thread. Every thread runs its own iterative deepening loop over the
//! same root position; threads cooperate only through the transposition table and the
//! shared best-line cell.
use std::sync::atomic::Ordering;

use crate::eval::{is_mate_score, mated_in, Score, INFINITY, MATE_BOUND, MAX_PLY};
use crate::move_generator::{MoveGenerator, MoveVec};
use crate::moves::Move;
use crate::position::Position;
use crate::search::data::{DataRecorder, Record};
use crate::search::heuristics::Heuristics;
use crate::search::ordering::OrderedMoves;
use crate::search::searcher::Shared;
use crate::search::transposition_table::{score_from_tt, score_to_tt, Bound};

const POLL_INTERVAL: u64 = 4096;

const ASPIRATION_MIN_DEPTH: u32 = 4;
const ASPIRATION_WINDOW: Score = 25;
const ASPIRATION_LIMIT: Score = 1000;

const NULL_MOVE_MIN_DEPTH: i32 = 3;
const FUTILITY_MARGIN: [Score; 4] = [0, 200, 400, 600];
const DELTA_MARGIN: Score = 1100;
const MAX_QUIESCENCE_DEPTH: u32 = 8;

lazy_static! {
    static ref LMR: [[i32; 64]; 64] = {
        let mut table = [[0; 64]; 64];
        for depth in 1..64 {
            for moves in 1..64 {
                let reduction = 0.5 + (depth as f64).ln() * (moves as f64).ln() / 2.0;
                table[depth][moves] = reduction.floor() as i32;
            }
        }

        table
    };
}

fn late_move_reduction(depth: i32, moves_searched: usize) -> i32 {
    LMR[(depth as usize).min(63)][moves_searched.min(63)]
}

/// One position on the current search path.
#[derive(Copy, Clone, Debug, Default)]
pub struct PathEntry {
    pub hash: u64,
    /// The position was reached by a null move, so nothing before it can repeat.
    pub after_null: bool,
}

/// Whether the position at `ply` repeats an earlier one. Earlier positions on the search
/// path need to match once; positions from the game itself need to match twice, since that
/// makes this the third occurrence. Only positions since the last irreversible move count.
pub fn is_repetition(path: &[PathEntry], game: &[u64], halfmove: u32, ply: usize) -> bool {
    let hash = path[ply].hash;
    let limit = halfmove as usize;
    let mut index = ply;
    while index > 0 {
        if path[index].after_null {
            return false;
        }

        index -= 1;
        let distance = ply - index;
        if distance > limit {
            return false;
        }
        if distance % 2 == 0 && path[index].hash == hash {
            return true;
        }
    }

    let mut occurrences = 0;
    for (back, &earlier) in game.iter().rev().enumerate() {
        let distance = ply + back + 1;
        if distance > limit {
            break;
        }
        if distance % 2 == 0 && earlier == hash {
            occurrences += 1;
            if occurrences >= 2 {
                return true;
            }
        }
    }

    false
}

pub struct Worker<'a> {
    id: usize,
    shared: &'a Shared<'a>,
    heuristics: &'a mut Heuristics,
    recorder: Option<&'a dyn DataRecorder>,
    generator: MoveGenerator,

    path: Vec<PathEntry>,
    pv: Vec<[Move; MAX_PLY + 1]>,
    pv_len: [usize; MAX_PLY + 1],

    unflushed_nodes: u64,
    since_poll: u64,
    seldepth: usize,
    stopped: bool,

    root_best: Option<Move>,
}

impl<'a> Worker<'a> {
    pub fn new(
        id: usize,
        shared: &'a Shared<'a>,
        heuristics: &'a mut Heuristics,
        recorder: Option<&'a dyn DataRecorder>,
    ) -> Worker<'a> {
        Worker {
            id,
            shared,
            heuristics,
            recorder,
            generator: MoveGenerator::new(),
            path: vec![PathEntry::default(); MAX_PLY + 2],
            pv: vec![[Move::null(); MAX_PLY + 1]; MAX_PLY + 1],
            pv_len: [0; MAX_PLY + 1],
            unflushed_nodes: 0,
            since_poll: 0,
            seldepth: 0,
            stopped: false,
            root_best: None,
        }
    }

    /// The best root move seen so far, including from an iteration that was cut short.
    pub fn root_best(&self) -> Option<Move> {
        self.root_best
    }

    /// Runs iterative deepening until the depth limit is reached or the search is stopped.
    pub fn run(&mut self, pos: &Position) {
        self.path[0] = PathEntry {
            hash: pos.zobrist_hash(),
            after_null: false,
        };

        let max_depth = self
            .shared
            .limits
            .depth
            .unwrap_or(MAX_PLY as u32 - 1)
            .min(MAX_PLY as u32 - 1)
            .max(1);
        let start_depth = (1 + (self.id % 2) as u32).min(max_depth);
        let mut score = self.shared.previous_score;
        for depth in start_depth..=max_depth {
            self.seldepth = 0;
            let result = self.aspiration(pos, depth, score);
            self.flush_nodes();
            score = match result {
                Some(score) => score,
                None => break,
            };

            let pv: Vec<Move> = self.pv[0][..self.pv_len[0]].to_vec();
            if pv.is_empty() {
                break;
            }

            debug!(
                "worker {} finished depth {} score {} pv {}",
                self.id,
                depth,
                score,
                format_pv(&pv)
            );
            self.shared.publish(depth, score, pv[0]);
            if self.id == 0 {
                self.report(pos, depth, score, &pv);
            }
        }

        self.flush_nodes();
    }

    fn report(&self, pos: &Position, depth: u32, score: Score, pv: &[Move]) {
        let recorder = match self.recorder {
            Some(recorder) => recorder,
            None => return,
        };

        let elapsed = self.shared.start.elapsed();
        let nodes = self.shared.nodes.load(Ordering::Relaxed);
        let elapsed_ms = elapsed.as_millis() as u64;
        let nps = if elapsed_ms == 0 {
            nodes * 1000
        } else {
            nodes * 1000 / elapsed_ms
        };
        let record = Record {
            fen: String::new(),
            depth,
            seldepth: self.seldepth as u32,
            score,
            nodes,
            elapsed_ms,
            nps,
            hashfull: self.shared.table.hashfull(),
            pv: format_pv(pv),
        };
        recorder.record(pos, &record);
    }

    fn aspiration(&mut self, pos: &Position, depth: u32, previous: Score) -> Option<Score> {
        let depth = depth as i32;
        if (depth as u32) < ASPIRATION_MIN_DEPTH || is_mate_score(previous) {
            let score = self.search(pos, -INFINITY, INFINITY, depth, 0, false);
            return if self.stopped { None } else { Some(score) };
        }

        let mut below = ASPIRATION_WINDOW;
        let mut above = ASPIRATION_WINDOW;
        loop {
            let alpha = if below > ASPIRATION_LIMIT {
                -INFINITY
            } else {
                previous - below
            };
            let beta = if above > ASPIRATION_LIMIT {
                INFINITY
            } else {
                previous + above
            };

            let score = self.search(pos, alpha, beta, depth, 0, false);
            if self.stopped {
                return None;
            }

            if score <= alpha {
                debug!("depth {} failed low at {}, widening", depth, alpha);
                below *= 2;
            } else if score >= beta {
                debug!("depth {} failed high at {}, widening", depth, beta);
                above *= 2;
            } else {
                return Some(score);
            }
        }
    }

    fn count_node(&mut self) {
        self.unflushed_nodes += 1;
        self.since_poll += 1;
        if self.since_poll >= POLL_INTERVAL {
            self.since_poll = 0;
            self.flush_nodes();
            if self.shared.should_stop() {
                self.stopped = true;
            }
        }
    }

    fn flush_nodes(&mut self) {
        if self.unflushed_nodes > 0 {
            self.shared
                .nodes
                .fetch_add(self.unflushed_nodes, Ordering::Relaxed);
            self.unflushed_nodes = 0;
        }
    }

    fn draw_score(&self, pos: &Position) -> Score {
        if pos.side_to_move() == self.shared.root_side {
            self.shared.draw_score
        } else {
            -self.shared.draw_score
        }
    }

    fn update_pv(&mut self, ply: usize, mov: Move) {
        let child_len = self.pv_len[ply + 1].max(ply + 1);
        self.pv[ply][ply] = mov;
        for i in ply + 1..child_len {
            self.pv[ply][i] = self.pv[ply + 1][i];
        }
        self.pv_len[ply] = child_len;
    }

    fn search(
        &mut self,
        pos: &Position,
        mut alpha: Score,
        mut beta: Score,
        depth: i32,
        ply: usize,
        allow_null: bool,
    ) -> Score {
        self.pv_len[ply] = ply;
        if depth <= 0 {
            return self.quiescence(pos, alpha, beta, ply, 0);
        }

        self.count_node();
        if self.stopped {
            return 0;
        }

        self.seldepth = self.seldepth.max(ply);
        let pv_node = beta - alpha > 1;
        if ply > 0 {
            if pos.halfmove_clock() >= 100 {
                // a mate delivered on the hundredth halfmove still stands
                if pos.in_check() && pos.legal_moves().is_empty() {
                    return mated_in(ply);
                }
                return self.draw_score(pos);
            }
            if is_repetition(&self.path, self.shared.game, pos.halfmove_clock(), ply) {
                return self.draw_score(pos);
            }

            // mate distance pruning
            alpha = alpha.max(mated_in(ply));
            beta = beta.min(-mated_in(ply + 1));
            if alpha >= beta {
                return alpha;
            }
        }

        if ply >= MAX_PLY - 1 {
            return self.shared.evaluator.evaluate(pos);
        }

        let in_check = pos.in_check();
        let key = pos.zobrist_hash();
        let entry = self.shared.table.probe(key);
        let tt_move = entry.and_then(|e| e.best_move);
        if let Some(entry) = entry {
            if !pv_node && ply > 0 && i32::from(entry.depth) >= depth {
                let score = score_from_tt(entry.score, ply);
                match entry.bound {
                    Bound::Exact => return score,
                    Bound::Lower if score >= beta => return score,
                    Bound::Upper if score <= alpha => return score,
                    _ => {}
                }
            }
        }

        let static_eval = match entry {
            Some(entry) => entry.static_eval,
            None => self.shared.evaluator.evaluate(pos),
        };

        let us = pos.side_to_move();
        if allow_null
            && !pv_node
            && !in_check
            && ply > 0
            && depth >= NULL_MOVE_MIN_DEPTH
            && pos.has_non_pawn_material(us)
        {
            let reduction = if depth > 6 { 4 } else { 3 };
            let child = pos.apply_null();
            self.path[ply + 1] = PathEntry {
                hash: child.zobrist_hash(),
                after_null: true,
            };
            let null_depth = depth - 1 - reduction;
            let score = -self.search(&child, -beta, -beta + 1, null_depth, ply + 1, false);
            if self.stopped {
                return 0;
            }
            if score >= beta {
                return if score >= MATE_BOUND { beta } else { score };
            }
        }

        let mut moves = MoveVec::new();
        self.generator.legal_moves(pos, &mut moves);
        if moves.is_empty() {
            return if in_check {
                mated_in(ply)
            } else {
                self.draw_score(pos)
            };
        }

        let futile = !pv_node
            && !in_check
            && depth <= 3
            && !is_mate_score(alpha)
            && static_eval + FUTILITY_MARGIN[depth as usize] <= alpha;

        let original_alpha = alpha;
        let killers = self.heuristics.killers(ply);
        let ordered = OrderedMoves::new(pos, moves, tt_move, killers, self.heuristics);
        let mut best_score = -INFINITY;
        let mut best_move = None;
        let mut moves_searched = 0;
        let mut quiets_tried = MoveVec::new();
        for mov in ordered {
            let quiet = mov.is_quiet() && !mov.gives_check();
            if futile && moves_searched > 0 && quiet {
                continue;
            }

            let child = pos.apply(mov);
            self.path[ply + 1] = PathEntry {
                hash: child.zobrist_hash(),
                after_null: false,
            };
            let extension = if mov.gives_check() { 1 } else { 0 };
            let new_depth = depth - 1 + extension;

            let score = if moves_searched == 0 {
                -self.search(&child, -beta, -alpha, new_depth, ply + 1, true)
            } else {
                let mut reduction = 0;
                if depth >= 3 && moves_searched > 4 && quiet && !in_check {
                    reduction = late_move_reduction(depth, moves_searched);
                    if self.heuristics.is_killer(ply, mov) {
                        reduction -= 1;
                    }
                    reduction = reduction.min(new_depth - 1).max(0);
                }

                let mut score = -self.search(
                    &child,
                    -alpha - 1,
                    -alpha,
                    new_depth - reduction,
                    ply + 1,
                    true,
                );
                if reduction > 0 && score > alpha {
                    score = -self.search(&child, -alpha - 1, -alpha, new_depth, ply + 1, true);
                }
                if score > alpha && score < beta {
                    score = -self.search(&child, -beta, -alpha, new_depth, ply + 1, true);
                }

                score
            };

            moves_searched += 1;
            if self.stopped {
                return 0;
            }

            if score > best_score {
                best_score = score;
                best_move = Some(mov);
                if ply == 0 {
                    self.root_best = Some(mov);
                }

                if score > alpha {
                    alpha = score;
                    self.update_pv(ply, mov);
                    if score >= beta {
                        if mov.is_quiet() {
                            self.heuristics.record_cutoff(ply, mov, depth);
                            for &tried in quiets_tried.iter() {
                                self.heuristics.record_failure(tried, depth);
                            }
                        }
                        break;
                    }
                }
            }

            if mov.is_quiet() {
                quiets_tried.push(mov);
            }
        }

        let bound = if best_score >= beta {
            Bound::Lower
        } else if alpha > original_alpha {
            Bound::Exact
        } else {
            Bound::Upper
        };
        let stored_move = if bound == Bound::Upper { None } else { best_move };
        self.shared.table.store(
            key,
            depth as u8,
            score_to_tt(best_score, ply),
            static_eval,
            bound,
            stored_move,
        );

        best_score
    }

    fn quiescence(
        &mut self,
        pos: &Position,
        mut alpha: Score,
        beta: Score,
        ply: usize,
        qdepth: u32,
    ) -> Score {
        self.pv_len[ply] = ply;
        self.count_node();
        if self.stopped {
            return 0;
        }

        self.seldepth = self.seldepth.max(ply);
        let stand_pat = self.shared.evaluator.evaluate(pos);
        if ply >= MAX_PLY - 1 {
            return stand_pat;
        }
        if stand_pat >= beta {
            return beta;
        }
        if stand_pat + DELTA_MARGIN < alpha {
            return alpha;
        }
        if stand_pat > alpha {
            alpha = stand_pat;
        }
        if qdepth >= MAX_QUIESCENCE_DEPTH {
            return alpha;
        }

        let mut captures = MoveVec::new();
        self.generator.legal_captures(pos, &mut captures);
        for mov in OrderedMoves::captures(pos, captures) {
            let child = pos.apply(mov);
            let score = -self.quiescence(&child, -beta, -alpha, ply + 1, qdepth + 1);
            if self.stopped {
                return 0;
            }
            if score >= beta {
                return beta;
            }
            if score > alpha {
                alpha = score;
            }
        }

        alpha
    }
}

pub fn format_pv(pv: &[Move]) -> String {
    pv.iter()
        .map(|m| m.as_uci())
        .collect::<Vec<_>>()
        .join(" ")
}
