// Copyright 2017-2019 Sean Gillespie.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Zobrist hashing. A position's hash is the XOR of one random key per feature: each
//! piece on its square, the current castling rights, the en-passant file (when a target is
//! set) and the side to move when it's black. Because XOR is its own inverse, making a
//! move only has to XOR the keys of the features that changed; `Position::apply` does
//! that through the `modify_*` functions below and `hash` recomputes from scratch.
use crate::position::Position;
use crate::types::{CastleStatus, Color, Piece, Square, TableIndex, COLORS, PIECE_KINDS};

/// xorshift64*, used only to generate the key set.
struct Xorshift64Star {
    state: u64,
}

impl Xorshift64Star {
    const fn new(seed: u64) -> Xorshift64Star {
        Xorshift64Star { state: seed }
    }

    fn next(&mut self) -> u64 {
        let mut x = self.state;
        x ^= x >> 12;
        x ^= x << 25;
        x ^= x >> 27;
        self.state = x;
        x.wrapping_mul(0x2545_f491_4f6c_dd1d)
    }
}

const ZOBRIST_SEED: u64 = 0x98f1_07a3_d5e8_b2c1;

struct ZobristKeys {
    pieces: [[[u64; 64]; 6]; 2],
    castling: [u64; 16],
    en_passant: [u64; 8],
    side: u64,
}

impl ZobristKeys {
    fn new(seed: u64) -> ZobristKeys {
        let mut rng = Xorshift64Star::new(seed);
        let mut keys = ZobristKeys {
            pieces: [[[0; 64]; 6]; 2],
            castling: [0; 16],
            en_passant: [0; 8],
            side: 0,
        };

        for color_keys in keys.pieces.iter_mut() {
            for kind_keys in color_keys.iter_mut() {
                for key in kind_keys.iter_mut() {
                    *key = rng.next();
                }
            }
        }
        for key in keys.castling.iter_mut() {
            *key = rng.next();
        }
        for key in keys.en_passant.iter_mut() {
            *key = rng.next();
        }
        keys.side = rng.next();
        keys
    }

    fn piece(&self, piece: Piece, square: Square) -> u64 {
        self.pieces[piece.color.as_index()][piece.kind.as_index()][square.as_index()]
    }

    fn castling(&self, status: CastleStatus) -> u64 {
        self.castling[status.bits() as usize]
    }

    fn en_passant(&self, target: Square) -> u64 {
        self.en_passant[target.file().as_index()]
    }
}

lazy_static! {
    static ref KEYS: ZobristKeys = ZobristKeys::new(ZOBRIST_SEED);
}

/// Computes the hash of a position from scratch.
pub fn hash(pos: &Position) -> u64 {
    let mut running_hash = 0u64;
    for &color in &COLORS {
        for &kind in &PIECE_KINDS {
            for square in pos.pieces_of_kind(color, kind) {
                running_hash ^= KEYS.piece(Piece::new(kind, color), square);
            }
        }
    }

    running_hash ^= KEYS.castling(pos.castle_status());
    if let Some(target) = pos.en_passant_square() {
        running_hash ^= KEYS.en_passant(target);
    }
    if pos.side_to_move() == Color::Black {
        running_hash ^= KEYS.side;
    }

    running_hash
}

pub fn modify_piece(hash: &mut u64, square: Square, piece: Piece) {
    *hash ^= KEYS.piece(piece, square);
}

pub fn modify_side_to_move(hash: &mut u64) {
    *hash ^= KEYS.side;
}

/// Swaps the castling key for `old` rights with the key for `new` rights.
pub fn modify_castle(hash: &mut u64, old: CastleStatus, new: CastleStatus) {
    if old != new {
        *hash ^= KEYS.castling(old) ^ KEYS.castling(new);
    }
}

pub fn modify_en_passant(hash: &mut u64, old: Option<Square>, new: Option<Square>) {
    if let Some(sq) = old {
        *hash ^= KEYS.en_passant(sq);
    }
    if let Some(sq) = new {
        *hash ^= KEYS.en_passant(sq);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::PieceKind;

    #[test]
    fn keys_are_reproducible() {
        let one = ZobristKeys::new(ZOBRIST_SEED);
        let two = ZobristKeys::new(ZOBRIST_SEED);
        assert_eq!(one.side, two.side);
        assert_eq!(one.castling, two.castling);
        assert_eq!(one.pieces[1][5][63], two.pieces[1][5][63]);
    }

    #[test]
    fn keys_are_distinct() {
        let keys = ZobristKeys::new(ZOBRIST_SEED);
        let mut all: Vec<u64> = keys
            .pieces
            .iter()
            .flat_map(|c| c.iter())
            .flat_map(|k| k.iter())
            .cloned()
            .collect();
        all.extend_from_slice(&keys.castling);
        all.extend_from_slice(&keys.en_passant);
        all.push(keys.side);
        assert_eq!(2 * 6 * 64 + 16 + 8 + 1, all.len());

        let count = all.len();
        all.sort();
        all.dedup();
        assert_eq!(count, all.len());
        assert!(!all.contains(&0));
    }

    #[test]
    fn piece_deltas_cancel() {
        let mut hash = 0x1234_5678u64;
        let piece = Piece::new(PieceKind::Rook, Color::Black);
        modify_piece(&mut hash, Square::A8, piece);
        modify_piece(&mut hash, Square::A8, piece);
        assert_eq!(0x1234_5678, hash);
    }

    #[test]
    fn castle_swap() {
        let mut hash = 0u64;
        modify_castle(&mut hash, CastleStatus::all(), CastleStatus::WHITE);
        modify_castle(&mut hash, CastleStatus::WHITE, CastleStatus::all());
        assert_eq!(0, hash);
    }
}
