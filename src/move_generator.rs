// Copyright 2017-2019 Sean Gillespie.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Move generation. `MoveGenerator` first produces pseudolegal moves piece by piece from
//! the attack tables, then filters them down to legal moves by applying each one and
//! checking whether the mover's king is left attacked. Moves that survive the filter and
//! attack the opponent's king get their check bit set.
use arrayvec::ArrayVec;

use crate::attacks;
use crate::bitboard::{Bitboard, BB_RANK_1, BB_RANK_2, BB_RANK_7, BB_RANK_8};
use crate::moves::Move;
use crate::position::Position;
use crate::types::{CastleStatus, Color, PieceKind, Square, PROMOTION_KINDS};

/// A list of moves. No legal chess position has more than 218 moves, and pseudolegal
/// generation stays comfortably below this capacity as well.
pub type MoveVec = ArrayVec<[Move; 256]>;

#[derive(Copy, Clone, Debug, Default)]
pub struct MoveGenerator;

impl MoveGenerator {
    pub fn new() -> MoveGenerator {
        MoveGenerator
    }

    /// Generates every pseudolegal move: moves that obey piece movement rules but may leave
    /// the mover's own king in check.
    pub fn generate_moves(&self, pos: &Position, moves: &mut MoveVec) {
        self.pawn_moves(pos, moves, false);
        self.step_moves(pos, moves, PieceKind::Knight, false);
        self.slider_moves(pos, moves, false);
        self.step_moves(pos, moves, PieceKind::King, false);
        self.castles(pos, moves);
    }

    /// Generates pseudolegal captures, including capturing promotions and en passant.
    pub fn generate_captures(&self, pos: &Position, moves: &mut MoveVec) {
        self.pawn_moves(pos, moves, true);
        self.step_moves(pos, moves, PieceKind::Knight, true);
        self.slider_moves(pos, moves, true);
        self.step_moves(pos, moves, PieceKind::King, true);
    }

    /// Generates the legal moves of the position, with check annotations. An empty result
    /// means the side to move is mated or stalemated.
    pub fn legal_moves(&self, pos: &Position, moves: &mut MoveVec) {
        let mut pseudolegal = MoveVec::new();
        self.generate_moves(pos, &mut pseudolegal);
        filter_legal(pos, &pseudolegal, moves);
    }

    /// Legal captures only; used by the quiescence search.
    pub fn legal_captures(&self, pos: &Position, moves: &mut MoveVec) {
        let mut pseudolegal = MoveVec::new();
        self.generate_captures(pos, &mut pseudolegal);
        filter_legal(pos, &pseudolegal, moves);
    }

    fn pawn_moves(&self, pos: &Position, moves: &mut MoveVec, captures_only: bool) {
        let us = pos.side_to_move();
        let enemies = pos.pieces(us.toggle());
        let occupied = pos.occupied();
        let (start_rank, promo_rank) = match us {
            Color::White => (BB_RANK_2, BB_RANK_8),
            Color::Black => (BB_RANK_7, BB_RANK_1),
        };

        for pawn in pos.pawns(us) {
            debug_assert!(!promo_rank.test(pawn), "pawn on its promotion rank");
            let pawn_bb = Bitboard::from_square(pawn);

            if !captures_only {
                let single = pawn_bb.forward(us == Color::White).without(occupied);
                if let Some(target) = single.first() {
                    if promo_rank.test(target) {
                        for &kind in PROMOTION_KINDS.iter() {
                            moves.push(Move::promotion(pawn, target, us, kind));
                        }
                    } else {
                        moves.push(Move::quiet(pawn, target, us, PieceKind::Pawn));
                    }

                    // Double pushes need both the intermediate and final squares empty.
                    if start_rank.test(pawn) {
                        let double = single.forward(us == Color::White).without(occupied);
                        if let Some(target) = double.first() {
                            moves.push(Move::double_pawn_push(pawn, target, us));
                        }
                    }
                }
            }

            let attacks = attacks::pawn_attacks(pawn, us);
            for target in attacks & enemies {
                if promo_rank.test(target) {
                    for &kind in PROMOTION_KINDS.iter() {
                        moves.push(Move::promotion_capture(pawn, target, us, kind));
                    }
                } else {
                    moves.push(Move::capture(pawn, target, us, PieceKind::Pawn));
                }
            }

            if let Some(target) = (attacks & pos.en_passant_mask()).first() {
                moves.push(Move::en_passant(pawn, target, us));
            }
        }
    }

    fn step_moves(
        &self,
        pos: &Position,
        moves: &mut MoveVec,
        kind: PieceKind,
        captures_only: bool,
    ) {
        let us = pos.side_to_move();
        let enemies = pos.pieces(us.toggle());
        let allies = pos.pieces(us);
        for source in pos.pieces_of_kind(us, kind) {
            let targets = match kind {
                PieceKind::Knight => attacks::knight_attacks(source),
                PieceKind::King => attacks::king_attacks(source),
                _ => unreachable!("{:?} is not a stepping piece", kind),
            };
            push_targets(moves, source, targets, allies, enemies, us, kind, captures_only);
        }
    }

    fn slider_moves(&self, pos: &Position, moves: &mut MoveVec, captures_only: bool) {
        let us = pos.side_to_move();
        let enemies = pos.pieces(us.toggle());
        let allies = pos.pieces(us);
        let occupied = pos.occupied();
        for &kind in &[PieceKind::Bishop, PieceKind::Rook, PieceKind::Queen] {
            for source in pos.pieces_of_kind(us, kind) {
                let targets = match kind {
                    PieceKind::Bishop => attacks::bishop_attacks(source, occupied),
                    PieceKind::Rook => attacks::rook_attacks(source, occupied),
                    _ => attacks::queen_attacks(source, occupied),
                };
                push_targets(moves, source, targets, allies, enemies, us, kind, captures_only);
            }
        }
    }

    fn castles(&self, pos: &Position, moves: &mut MoveVec) {
        let us = pos.side_to_move();
        let them = us.toggle();
        let home = Square::E1.relative_to(us);
        if !pos.kings(us).test(home) || !pos.castle_status().intersects(CastleStatus::both(us)) {
            return;
        }

        // Can't castle out of check.
        if pos.is_square_attacked(home, them) {
            return;
        }

        let occupied = pos.occupied();
        let rooks = pos.rooks(us);
        if pos.can_castle_kingside(us) && rooks.test(Square::H1.relative_to(us)) {
            let f = Square::F1.relative_to(us);
            let g = Square::G1.relative_to(us);
            if !occupied.test(f)
                && !occupied.test(g)
                && !pos.is_square_attacked(f, them)
                && !pos.is_square_attacked(g, them)
            {
                moves.push(Move::castle(home, g, us));
            }
        }

        if pos.can_castle_queenside(us) && rooks.test(Square::A1.relative_to(us)) {
            let d = Square::D1.relative_to(us);
            let c = Square::C1.relative_to(us);
            let b = Square::B1.relative_to(us);

            // b1 may be attacked but not occupied: the rook crosses it, the king doesn't.
            if !occupied.test(d)
                && !occupied.test(c)
                && !occupied.test(b)
                && !pos.is_square_attacked(d, them)
                && !pos.is_square_attacked(c, them)
            {
                moves.push(Move::castle(home, c, us));
            }
        }
    }
}

#[allow(clippy::too_many_arguments)]
fn push_targets(
    moves: &mut MoveVec,
    source: Square,
    targets: Bitboard,
    allies: Bitboard,
    enemies: Bitboard,
    side: Color,
    kind: PieceKind,
    captures_only: bool,
) {
    for target in targets & enemies {
        moves.push(Move::capture(source, target, side, kind));
    }

    if !captures_only {
        for target in targets.without(allies | enemies) {
            moves.push(Move::quiet(source, target, side, kind));
        }
    }
}

/// Keeps the moves that don't leave the mover in check, tagging the ones that give check.
fn filter_legal(pos: &Position, candidates: &MoveVec, moves: &mut MoveVec) {
    let us = pos.side_to_move();
    for &mov in candidates.iter() {
        let next = pos.apply(mov);
        if next.is_check(us) {
            continue;
        }

        if next.in_check() {
            moves.push(mov.with_check());
        } else {
            moves.push(mov);
        }
    }
}
