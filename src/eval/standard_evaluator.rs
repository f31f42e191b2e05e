// Copyright 2017-2019 Sean Gillespie.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.
use crate::attacks;
use crate::bitboard::{Bitboard, BB_FILES};
use crate::eval::{BoardEvaluator, Score};
use crate::position::Position;
use crate::types::{Color, PieceKind, Square, TableIndex};

const QUEEN_VALUE: Score = 1100;
const ROOK_VALUE: Score = 500;
const BISHOP_VALUE: Score = 350;
const KNIGHT_VALUE: Score = 325;
const PAWN_VALUE: Score = 100;

const DOUBLED_PAWN: Score = -10;
const BLOCKED_PAWN: Score = -30;
const PASSED_PAWN: Score = 20;
const ISOLATED_PAWN: Score = -10;
const CONNECTED_PAWN: Score = 10;
const BOARD_CONTROL: Score = 5;

// Piece-square tables, drawn from white's point of view with a8 in the top left.

#[rustfmt::skip]
const PAWN_PST: [Score; 64] = [
     0,  0,  0,  0,  0,  0,  0,  0,
    50, 50, 50, 50, 50, 50, 50, 50,
    10, 10, 20, 30, 30, 20, 10, 10,
     5,  5, 10, 25, 25, 10,  5,  5,
     0,  0,  0, 20, 20,  0,  0,  0,
     5, -5,-10,  0,  0,-10, -5,  5,
     5, 10, 10,-20,-20, 10, 10,  5,
     0,  0,  0,  0,  0,  0,  0,  0,
];

#[rustfmt::skip]
const KNIGHT_PST: [Score; 64] = [
    -50,-40,-30,-30,-30,-30,-40,-50,
    -40,-20,  0,  0,  0,  0,-20,-40,
    -30,  0, 10, 15, 15, 10,  0,-30,
    -30,  5, 15, 20, 20, 15,  5,-30,
    -30,  0, 15, 20, 20, 15,  0,-30,
    -30,  5, 10, 15, 15, 10,  5,-30,
    -40,-20,  0,  5,  5,  0,-20,-40,
    -50,-40,-30,-30,-30,-30,-40,-50,
];

#[rustfmt::skip]
const BISHOP_PST: [Score; 64] = [
    -20,-10,-10,-10,-10,-10,-10,-20,
    -10,  0,  0,  0,  0,  0,  0,-10,
    -10,  0,  5, 10, 10,  5,  0,-10,
    -10,  5,  5, 10, 10,  5,  5,-10,
    -10,  0, 10, 10, 10, 10,  0,-10,
    -10, 10, 10, 10, 10, 10, 10,-10,
    -10,  5,  0,  0,  0,  0,  5,-10,
    -20,-10,-10,-10,-10,-10,-10,-20,
];

#[rustfmt::skip]
const ROOK_PST: [Score; 64] = [
     0,  0,  0,  0,  0,  0,  0,  0,
     5, 10, 10, 10, 10, 10, 10,  5,
    -5,  0,  0,  0,  0,  0,  0, -5,
    -5,  0,  0,  0,  0,  0,  0, -5,
    -5,  0,  0,  0,  0,  0,  0, -5,
    -5,  0,  0,  0,  0,  0,  0, -5,
    -5,  0,  0,  0,  0,  0,  0, -5,
     0,  0,  0,  5,  5,  0,  0,  0,
];

#[rustfmt::skip]
const QUEEN_PST: [Score; 64] = [
    -20,-10,-10, -5, -5,-10,-10,-20,
    -10,  0,  0,  0,  0,  0,  0,-10,
    -10,  0,  5,  5,  5,  5,  0,-10,
     -5,  0,  5,  5,  5,  5,  0, -5,
      0,  0,  5,  5,  5,  5,  0, -5,
    -10,  5,  5,  5,  5,  5,  0,-10,
    -10,  0,  5,  0,  0,  0,  0,-10,
    -20,-10,-10, -5, -5,-10,-10,-20,
];

/// Material, piece placement, pawn structure and board control.
#[derive(Copy, Clone, Debug, Default)]
pub struct StandardEvaluator;

impl StandardEvaluator {
    pub fn new() -> StandardEvaluator {
        StandardEvaluator
    }
}

impl BoardEvaluator for StandardEvaluator {
    fn evaluate(&self, pos: &Position) -> Score {
        let white = material(pos, Color::White) + pawn_structure(pos, Color::White);
        let black = material(pos, Color::Black) + pawn_structure(pos, Color::Black);
        let control = BOARD_CONTROL
            * (attacked_squares(pos, Color::White).count() as Score
                - attacked_squares(pos, Color::Black).count() as Score);

        let score = white - black + control;
        match pos.side_to_move() {
            Color::White => score,
            Color::Black => -score,
        }
    }
}

/// Index into a table drawn from white's side, for a piece of the given color.
fn pst_index(square: Square, color: Color) -> usize {
    match color {
        Color::White => square.as_index() ^ 56,
        Color::Black => square.as_index(),
    }
}

fn material(pos: &Position, color: Color) -> Score {
    let tables: [(PieceKind, Score, &[Score; 64]); 4] = [
        (PieceKind::Knight, KNIGHT_VALUE, &KNIGHT_PST),
        (PieceKind::Bishop, BISHOP_VALUE, &BISHOP_PST),
        (PieceKind::Rook, ROOK_VALUE, &ROOK_PST),
        (PieceKind::Queen, QUEEN_VALUE, &QUEEN_PST),
    ];

    let mut score = 0;
    for &(kind, value, table) in tables.iter() {
        for square in pos.pieces_of_kind(color, kind) {
            score += value + table[pst_index(square, color)];
        }
    }

    score
}

fn adjacent_files(square: Square) -> Bitboard {
    let file = BB_FILES[square.file().as_index()];
    file.east() | file.west()
}

/// Squares strictly in front of `square` from `color`'s point of view, on the same file.
fn front_span(square: Square, color: Color) -> Bitboard {
    let mut span = Bitboard::none();
    let mut cursor = Bitboard::from_square(square).forward(color == Color::White);
    while !cursor.empty() {
        span |= cursor;
        cursor = cursor.forward(color == Color::White);
    }

    span
}

fn pawn_structure(pos: &Position, color: Color) -> Score {
    let pawns = pos.pawns(color);
    let enemy_pawns = pos.pawns(color.toggle());
    let blockers = pos.pieces(color).without(pawns | pos.kings(color));

    let mut score = 0;
    for pawn in pawns {
        score += PAWN_VALUE + PAWN_PST[pst_index(pawn, color)];

        let file = BB_FILES[pawn.file().as_index()];
        if (pawns & file).several() {
            score += DOUBLED_PAWN;
        }

        let ahead = front_span(pawn, color);
        let next_square = Bitboard::from_square(pawn).forward(color == Color::White);
        if !(next_square & blockers).empty() {
            score += BLOCKED_PAWN;
        }

        let passage = ahead | ahead.east() | ahead.west();
        if (passage & enemy_pawns).empty() {
            score += PASSED_PAWN;
        }

        if (adjacent_files(pawn) & pawns).empty() {
            score += ISOLATED_PAWN;
        } else {
            score += CONNECTED_PAWN;
        }
    }

    score
}

/// Every square attacked by at least one piece of the given color.
pub fn attacked_squares(pos: &Position, color: Color) -> Bitboard {
    let occupied = pos.occupied();
    let pawns = pos.pawns(color).forward(color == Color::White);
    let mut attacked = pawns.east() | pawns.west();
    for square in pos.knights(color) {
        attacked |= attacks::knight_attacks(square);
    }
    for square in pos.bishops(color) {
        attacked |= attacks::bishop_attacks(square, occupied);
    }
    for square in pos.rooks(color) {
        attacked |= attacks::rook_attacks(square, occupied);
    }
    for square in pos.queens(color) {
        attacked |= attacks::queen_attacks(square, occupied);
    }
    for square in pos.kings(color) {
        attacked |= attacks::king_attacks(square);
    }

    attacked
}
