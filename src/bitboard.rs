// Copyright 2017-2019 Sean Gillespie.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! The `Bitboard` type, a set of squares packed into a single 64-bit word with bit `n`
//! standing for square `n` (a1 = 0, h8 = 63).
//!
//! Everything in the engine that talks about "some squares" uses bitboards: piece
//! placement, attack sets, the en-passant target and the masks used by the move generator.
//! Set operations map directly onto bitwise operators, and the directional shifts below
//! mask off the files that would otherwise wrap around the board edge.
use std::fmt;
use std::ops;

use crate::types::{Rank, Square, TableIndex, FILES, RANKS};

/// A set of squares.
#[derive(Copy, Clone, Default, PartialEq, Eq, Hash)]
pub struct Bitboard(u64);

impl Bitboard {
    pub const fn from_bits(bits: u64) -> Bitboard {
        Bitboard(bits)
    }

    pub const fn from_square(square: Square) -> Bitboard {
        Bitboard(1u64 << (square as u8))
    }

    pub const fn all() -> Bitboard {
        Bitboard(!0)
    }

    pub const fn none() -> Bitboard {
        Bitboard(0)
    }

    pub const fn bits(self) -> u64 {
        self.0
    }

    pub const fn test(self, square: Square) -> bool {
        self.0 & (1u64 << (square as u8)) != 0
    }

    pub fn set(&mut self, square: Square) {
        self.0 |= 1u64 << (square as u8);
    }

    pub fn unset(&mut self, square: Square) {
        self.0 &= !(1u64 << (square as u8));
    }

    pub const fn and(self, other: Bitboard) -> Bitboard {
        Bitboard(self.0 & other.0)
    }

    pub const fn or(self, other: Bitboard) -> Bitboard {
        Bitboard(self.0 | other.0)
    }

    pub const fn xor(self, other: Bitboard) -> Bitboard {
        Bitboard(self.0 ^ other.0)
    }

    /// Set difference: the squares of `self` that are not in `other`.
    pub const fn without(self, other: Bitboard) -> Bitboard {
        Bitboard(self.0 & !other.0)
    }

    pub const fn count(self) -> u32 {
        self.0.count_ones()
    }

    pub const fn empty(self) -> bool {
        self.0 == 0
    }

    /// True when more than one square is set.
    pub const fn several(self) -> bool {
        self.0 & self.0.wrapping_sub(1) != 0
    }

    /// The lowest-numbered square in the set.
    pub fn first(self) -> Option<Square> {
        if self.0 == 0 {
            None
        } else {
            Some(Square::from_index(self.0.trailing_zeros() as usize))
        }
    }

    pub fn iter(self) -> BitboardIterator {
        BitboardIterator { bits: self.0 }
    }

    pub const fn rank(self, rank: Rank) -> Bitboard {
        self.and(BB_RANKS[rank as usize])
    }

    //
    // Directional shifts. Shifting east or west drops the squares that would wrap onto
    // the far file, shifting north or south drops squares that leave the board.
    //

    pub const fn north(self) -> Bitboard {
        Bitboard(self.0 << 8)
    }

    pub const fn south(self) -> Bitboard {
        Bitboard(self.0 >> 8)
    }

    pub const fn east(self) -> Bitboard {
        Bitboard((self.0 & !BB_FILE_H.0) << 1)
    }

    pub const fn west(self) -> Bitboard {
        Bitboard((self.0 & !BB_FILE_A.0) >> 1)
    }

    /// One step "forward" from the point of view of the given side.
    pub const fn forward(self, white: bool) -> Bitboard {
        if white {
            self.north()
        } else {
            self.south()
        }
    }
}

impl fmt::Debug for Bitboard {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Bitboard({:#018x})", self.0)
    }
}

impl fmt::Display for Bitboard {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        for &rank in RANKS.iter().rev() {
            for &file in &FILES {
                let mark = if self.test(Square::of(rank, file)) {
                    'x'
                } else {
                    '.'
                };
                write!(f, " {} ", mark)?;
            }

            writeln!(f, "| {}", rank)?;
        }

        writeln!(f, "{}", "---".repeat(8))?;
        for file in &FILES {
            write!(f, " {} ", file)?;
        }

        writeln!(f)
    }
}

impl ops::BitAnd for Bitboard {
    type Output = Bitboard;

    fn bitand(self, rhs: Bitboard) -> Bitboard {
        self.and(rhs)
    }
}

impl ops::BitAndAssign for Bitboard {
    fn bitand_assign(&mut self, rhs: Bitboard) {
        self.0 &= rhs.0;
    }
}

impl ops::BitOr for Bitboard {
    type Output = Bitboard;

    fn bitor(self, rhs: Bitboard) -> Bitboard {
        self.or(rhs)
    }
}

impl ops::BitOrAssign for Bitboard {
    fn bitor_assign(&mut self, rhs: Bitboard) {
        self.0 |= rhs.0;
    }
}

impl ops::BitXor for Bitboard {
    type Output = Bitboard;

    fn bitxor(self, rhs: Bitboard) -> Bitboard {
        self.xor(rhs)
    }
}

impl ops::BitXorAssign for Bitboard {
    fn bitxor_assign(&mut self, rhs: Bitboard) {
        self.0 ^= rhs.0;
    }
}

impl ops::Not for Bitboard {
    type Output = Bitboard;

    fn not(self) -> Bitboard {
        Bitboard(!self.0)
    }
}

/// Iterates the squares of a bitboard from a1 towards h8.
pub struct BitboardIterator {
    bits: u64,
}

impl Iterator for BitboardIterator {
    type Item = Square;

    fn next(&mut self) -> Option<Square> {
        if self.bits == 0 {
            return None;
        }

        let next = self.bits.trailing_zeros() as usize;
        self.bits &= self.bits - 1;
        Some(Square::from_index(next))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let len = self.bits.count_ones() as usize;
        (len, Some(len))
    }
}

impl IntoIterator for Bitboard {
    type Item = Square;
    type IntoIter = BitboardIterator;

    fn into_iter(self) -> BitboardIterator {
        self.iter()
    }
}

pub const BB_RANK_1: Bitboard = Bitboard(0x0000_0000_0000_00FF);
pub const BB_RANK_2: Bitboard = Bitboard(0x0000_0000_0000_FF00);
pub const BB_RANK_3: Bitboard = Bitboard(0x0000_0000_00FF_0000);
pub const BB_RANK_4: Bitboard = Bitboard(0x0000_0000_FF00_0000);
pub const BB_RANK_5: Bitboard = Bitboard(0x0000_00FF_0000_0000);
pub const BB_RANK_6: Bitboard = Bitboard(0x0000_FF00_0000_0000);
pub const BB_RANK_7: Bitboard = Bitboard(0x00FF_0000_0000_0000);
pub const BB_RANK_8: Bitboard = Bitboard(0xFF00_0000_0000_0000);

pub const BB_FILE_A: Bitboard = Bitboard(0x0101_0101_0101_0101);
pub const BB_FILE_B: Bitboard = Bitboard(0x0202_0202_0202_0202);
pub const BB_FILE_C: Bitboard = Bitboard(0x0404_0404_0404_0404);
pub const BB_FILE_D: Bitboard = Bitboard(0x0808_0808_0808_0808);
pub const BB_FILE_E: Bitboard = Bitboard(0x1010_1010_1010_1010);
pub const BB_FILE_F: Bitboard = Bitboard(0x2020_2020_2020_2020);
pub const BB_FILE_G: Bitboard = Bitboard(0x4040_4040_4040_4040);
pub const BB_FILE_H: Bitboard = Bitboard(0x8080_8080_8080_8080);

pub const BB_RANKS: [Bitboard; 8] = [
    BB_RANK_1, BB_RANK_2, BB_RANK_3, BB_RANK_4, BB_RANK_5, BB_RANK_6, BB_RANK_7, BB_RANK_8,
];

pub const BB_FILES: [Bitboard; 8] = [
    BB_FILE_A, BB_FILE_B, BB_FILE_C, BB_FILE_D, BB_FILE_E, BB_FILE_F, BB_FILE_G, BB_FILE_H,
];

/// The outer ring of the board, excluded from slider relevance masks.
pub const BB_EDGES: Bitboard = BB_RANK_1.or(BB_RANK_8).or(BB_FILE_A).or(BB_FILE_H);
