// Copyright 2017-2019 Sean Gillespie.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Move ordering. Moves are scored once up front and handed out best-first by a lazy
//! selection sort, since a cutoff on one of the first few moves makes sorting the rest
//! wasted work.
use arrayvec::ArrayVec;

use crate::move_generator::MoveVec;
use crate::moves::Move;
use crate::position::Position;
use crate::search::heuristics::Heuristics;
use crate::types::PieceKind;

const TT_MOVE: i32 = 100_000;
const CAPTURE: i32 = 20_000;
const FIRST_KILLER: i32 = 15_000;
const SECOND_KILLER: i32 = 14_000;
const CHECK: i32 = 10_000;
const HISTORY_CAP: i32 = 9_999;

/// Most valuable victim, least valuable attacker. Victims dominate: any capture of a rook
/// sorts ahead of every capture of a knight.
pub fn mvv_lva(victim: PieceKind, attacker: PieceKind) -> i32 {
    (victim as i32 + 1) * 8 - attacker as i32
}

fn victim(pos: &Position, mov: Move) -> PieceKind {
    if mov.is_en_passant() {
        return PieceKind::Pawn;
    }

    pos.piece_at(mov.destination())
        .map(|piece| piece.kind)
        .unwrap_or(PieceKind::Pawn)
}

/// Capture-only ordering, for quiescence.
pub fn capture_score(pos: &Position, mov: Move) -> i32 {
    let mut score = CAPTURE;
    if mov.is_capture() {
        score += mvv_lva(victim(pos, mov), mov.piece());
    }
    if let Some(promoted) = mov.promotion_piece() {
        score += promoted as i32;
    }

    score
}

fn score_move(
    pos: &Position,
    mov: Move,
    tt_move: Option<Move>,
    killers: [Move; 2],
    heuristics: &Heuristics,
) -> i32 {
    if tt_move.map_or(false, |t| t.same_action(mov)) {
        return TT_MOVE;
    }

    if mov.is_capture() || mov.is_promotion() {
        return capture_score(pos, mov);
    }

    if !killers[0].is_null() && killers[0].same_action(mov) {
        return FIRST_KILLER;
    }

    if !killers[1].is_null() && killers[1].same_action(mov) {
        return SECOND_KILLER;
    }

    if mov.gives_check() {
        return CHECK;
    }

    heuristics.history(mov).max(0).min(HISTORY_CAP)
}

pub struct OrderedMoves {
    moves: MoveVec,
    scores: ArrayVec<[i32; 256]>,
    next: usize,
}

impl OrderedMoves {
    pub fn new(
        pos: &Position,
        moves: MoveVec,
        tt_move: Option<Move>,
        killers: [Move; 2],
        heuristics: &Heuristics,
    ) -> OrderedMoves {
        let scores = moves
            .iter()
            .map(|&mov| score_move(pos, mov, tt_move, killers, heuristics))
            .collect();
        OrderedMoves {
            moves,
            scores,
            next: 0,
        }
    }

    pub fn captures(pos: &Position, moves: MoveVec) -> OrderedMoves {
        let scores = moves.iter().map(|&mov| capture_score(pos, mov)).collect();
        OrderedMoves {
            moves,
            scores,
            next: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.moves.len()
    }

    pub fn is_empty(&self) -> bool {
        self.moves.is_empty()
    }
}

impl Iterator for OrderedMoves {
    type Item = Move;

    fn next(&mut self) -> Option<Move> {
        if self.next >= self.moves.len() {
            return None;
        }

        let mut best = self.next;
        for i in self.next + 1..self.moves.len() {
            if self.scores[i] > self.scores[best] {
                best = i;
            }
        }

        self.moves.swap(self.next, best);
        self.scores.swap(self.next, best);
        let mov = self.moves[self.next];
        self.next += 1;
        Some(mov)
    }
}
