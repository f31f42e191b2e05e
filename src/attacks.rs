// Copyright 2017-2019 Sean Gillespie.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Attack tables. Step pieces (pawns, knights, kings) index a per-square table directly.
//! Sliding pieces use magic bitboards: the blockers relevant to a square are multiplied
//! by a per-square magic number and shifted down, producing a dense index into a table of
//! precomputed attack sets.
//!
//! Everything here is built once, on first use, and is read-only afterwards.
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::bitboard::{Bitboard, BB_EDGES, BB_FILE_A, BB_FILE_H, BB_RANK_1, BB_RANK_8};
use crate::types::{Color, Square, TableIndex};

/// Seed for the magic number search. Any seed works; a fixed one keeps start-up
/// deterministic.
const MAGIC_SEED: u64 = 0x6a09_e667_f3bc_c908;

/// Candidates whose multiplied mask puts fewer bits than this into the top byte rarely
/// produce a usable index and are skipped without verification.
const MIN_TOP_BYTE_BITS: u32 = 6;

struct StepTable {
    table: [Bitboard; 64],
}

impl StepTable {
    fn new<F>(step: F) -> StepTable
    where
        F: Fn(Bitboard) -> Bitboard,
    {
        let mut table = [Bitboard::none(); 64];
        for sq in Square::all() {
            table[sq.as_index()] = step(Bitboard::from_square(sq));
        }

        StepTable { table }
    }

    fn attacks(&self, sq: Square) -> Bitboard {
        self.table[sq.as_index()]
    }
}

fn king_step(bb: Bitboard) -> Bitboard {
    let sides = bb.east() | bb.west();
    let row = bb | sides;
    sides | row.north() | row.south()
}

fn knight_step(bb: Bitboard) -> Bitboard {
    let one = bb.east() | bb.west();
    let two = bb.east().east() | bb.west().west();
    one.north().north() | one.south().south() | two.north() | two.south()
}

fn pawn_step(bb: Bitboard, color: Color) -> Bitboard {
    let forward = bb.forward(color == Color::White);
    forward.east() | forward.west()
}

/// The direction vectors (rank delta, file delta) a slider moves along.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum Slider {
    Bishop,
    Rook,
}

impl Slider {
    fn directions(self) -> [(i32, i32); 4] {
        match self {
            Slider::Bishop => [(1, 1), (1, -1), (-1, 1), (-1, -1)],
            Slider::Rook => [(1, 0), (-1, 0), (0, 1), (0, -1)],
        }
    }

    /// Attacks by walking each ray until it leaves the board or hits a blocker. Slow, and
    /// only used to fill and verify the magic tables.
    fn walk(self, sq: Square, occupancy: Bitboard) -> Bitboard {
        let mut attacks = Bitboard::none();
        let rank = sq.rank().as_index() as i32;
        let file = sq.file().as_index() as i32;
        for &(dr, df) in self.directions().iter() {
            let (mut r, mut f) = (rank + dr, file + df);
            while r >= 0 && r < 8 && f >= 0 && f < 8 {
                let target = Square::from_index((r * 8 + f) as usize);
                attacks.set(target);
                if occupancy.test(target) {
                    break;
                }

                r += dr;
                f += df;
            }
        }

        attacks
    }

    /// The squares whose occupancy can change this slider's attacks from `sq`. The last
    /// square of each ray never matters, since it's attacked whether or not it's occupied.
    fn relevant_mask(self, sq: Square) -> Bitboard {
        let rays = self.walk(sq, Bitboard::none());
        match self {
            Slider::Bishop => rays.without(BB_EDGES),
            Slider::Rook => {
                let mut edges = Bitboard::none();
                if sq.rank().as_index() != 0 {
                    edges |= BB_RANK_1;
                }
                if sq.rank().as_index() != 7 {
                    edges |= BB_RANK_8;
                }
                if sq.file().as_index() != 0 {
                    edges |= BB_FILE_A;
                }
                if sq.file().as_index() != 7 {
                    edges |= BB_FILE_H;
                }
                rays.without(edges)
            }
        }
    }
}

#[derive(Copy, Clone, Default)]
struct Magic {
    mask: Bitboard,
    magic: u64,
    shift: u32,
    offset: usize,
}

impl Magic {
    fn index(&self, occupancy: Bitboard) -> usize {
        let blockers = occupancy.and(self.mask).bits();
        self.offset + (blockers.wrapping_mul(self.magic) >> self.shift) as usize
    }
}

struct MagicTable {
    magics: [Magic; 64],
    attacks: Vec<Bitboard>,
}

impl MagicTable {
    fn new(slider: Slider, rng: &mut StdRng) -> MagicTable {
        let mut magics = [Magic::default(); 64];
        let mut attacks = Vec::new();
        for sq in Square::all() {
            let mask = slider.relevant_mask(sq);
            let subsets = enumerate_subsets(mask);
            let references: Vec<Bitboard> =
                subsets.iter().map(|&occ| slider.walk(sq, occ)).collect();
            let shift = 64 - mask.count();
            let (magic, table) = find_magic(mask, shift, &subsets, &references, rng);
            magics[sq.as_index()] = Magic {
                mask,
                magic,
                shift,
                offset: attacks.len(),
            };
            attacks.extend(table);
        }

        MagicTable { magics, attacks }
    }

    fn attacks(&self, sq: Square, occupancy: Bitboard) -> Bitboard {
        self.attacks[self.magics[sq.as_index()].index(occupancy)]
    }
}

/// Every subset of `mask`, via the Carry-Rippler trick. The empty set comes first.
fn enumerate_subsets(mask: Bitboard) -> Vec<Bitboard> {
    let mut subsets = Vec::with_capacity(1 << mask.count());
    let mut subset = 0u64;
    loop {
        subsets.push(Bitboard::from_bits(subset));
        subset = subset.wrapping_sub(mask.bits()) & mask.bits();
        if subset == 0 {
            break;
        }
    }

    subsets
}

fn sparse_random(rng: &mut StdRng) -> u64 {
    rng.gen::<u64>() & rng.gen::<u64>() & rng.gen::<u64>()
}

/// Brute-force search for a multiplier that maps every occupancy subset of `mask` to a
/// slot holding its attack set. Two subsets may share a slot only if their attack sets are
/// equal.
fn find_magic(
    mask: Bitboard,
    shift: u32,
    subsets: &[Bitboard],
    references: &[Bitboard],
    rng: &mut StdRng,
) -> (u64, Vec<Bitboard>) {
    let size = 1usize << (64 - shift);
    let mut table = vec![Bitboard::none(); size];
    // `epoch[i] == attempt` marks slot i as filled during the current attempt, so the
    // table never needs clearing between candidates.
    let mut epoch = vec![0u32; size];
    let mut attempt = 0u32;
    loop {
        let magic = sparse_random(rng);
        if (mask.bits().wrapping_mul(magic) & 0xFF00_0000_0000_0000).count_ones()
            < MIN_TOP_BYTE_BITS
        {
            continue;
        }

        attempt += 1;
        let mut ok = true;
        for (&occ, &reference) in subsets.iter().zip(references) {
            let idx = (occ.bits().wrapping_mul(magic) >> shift) as usize;
            if epoch[idx] != attempt {
                epoch[idx] = attempt;
                table[idx] = reference;
            } else if table[idx] != reference {
                ok = false;
                break;
            }
        }

        if ok {
            return (magic, table);
        }
    }
}

struct AttackTables {
    king: StepTable,
    knight: StepTable,
    pawn: [StepTable; 2],
    bishop: MagicTable,
    rook: MagicTable,
}

impl AttackTables {
    fn new() -> AttackTables {
        let mut rng = StdRng::seed_from_u64(MAGIC_SEED);
        let bishop = MagicTable::new(Slider::Bishop, &mut rng);
        let rook = MagicTable::new(Slider::Rook, &mut rng);
        debug!(
            "magic tables ready: {} bishop entries, {} rook entries",
            bishop.attacks.len(),
            rook.attacks.len()
        );

        AttackTables {
            king: StepTable::new(king_step),
            knight: StepTable::new(knight_step),
            pawn: [
                StepTable::new(|bb| pawn_step(bb, Color::White)),
                StepTable::new(|bb| pawn_step(bb, Color::Black)),
            ],
            bishop,
            rook,
        }
    }
}

lazy_static! {
    static ref TABLES: AttackTables = AttackTables::new();
}

/// Forces construction of the attack tables, so the first search doesn't pay for it.
pub fn initialize() {
    lazy_static::initialize(&TABLES);
}

/// Squares attacked by a pawn of the given color standing on `sq`.
pub fn pawn_attacks(sq: Square, color: Color) -> Bitboard {
    TABLES.pawn[color.as_index()].attacks(sq)
}

pub fn knight_attacks(sq: Square) -> Bitboard {
    TABLES.knight.attacks(sq)
}

pub fn king_attacks(sq: Square) -> Bitboard {
    TABLES.king.attacks(sq)
}

pub fn bishop_attacks(sq: Square, occupancy: Bitboard) -> Bitboard {
    TABLES.bishop.attacks(sq, occupancy)
}

pub fn rook_attacks(sq: Square, occupancy: Bitboard) -> Bitboard {
    TABLES.rook.attacks(sq, occupancy)
}

pub fn queen_attacks(sq: Square, occupancy: Bitboard) -> Bitboard {
    bishop_attacks(sq, occupancy) | rook_attacks(sq, occupancy)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn board(squares: &[Square]) -> Bitboard {
        squares
            .iter()
            .fold(Bitboard::none(), |acc, &sq| acc | Bitboard::from_square(sq))
    }

    #[test]
    fn king_corner_and_center() {
        assert_eq!(
            board(&[Square::A2, Square::B1, Square::B2]),
            king_attacks(Square::A1)
        );
        assert_eq!(8, king_attacks(Square::E4).count());
    }

    #[test]
    fn knight_edges() {
        assert_eq!(board(&[Square::B3, Square::C2]), knight_attacks(Square::A1));
        assert_eq!(8, knight_attacks(Square::D5).count());
        assert_eq!(
            board(&[Square::F7, Square::G6]),
            knight_attacks(Square::H8)
        );
    }

    #[test]
    fn pawn_directions() {
        assert_eq!(
            board(&[Square::D5, Square::F5]),
            pawn_attacks(Square::E4, Color::White)
        );
        assert_eq!(
            board(&[Square::D3, Square::F3]),
            pawn_attacks(Square::E4, Color::Black)
        );
        assert_eq!(board(&[Square::B3]), pawn_attacks(Square::A2, Color::White));
        assert_eq!(board(&[Square::G6]), pawn_attacks(Square::H7, Color::Black));
    }

    #[test]
    fn rook_with_blockers() {
        let occ = board(&[Square::D6, Square::B4, Square::D2]);
        let expected = board(&[
            Square::D5,
            Square::D6,
            Square::C4,
            Square::B4,
            Square::E4,
            Square::F4,
            Square::G4,
            Square::H4,
            Square::D3,
            Square::D2,
        ]);
        assert_eq!(expected, rook_attacks(Square::D4, occ));
    }

    #[test]
    fn bishop_with_blockers() {
        let occ = board(&[Square::F6, Square::B2]);
        let expected = board(&[
            Square::E5,
            Square::F6,
            Square::C5,
            Square::B6,
            Square::A7,
            Square::E3,
            Square::F2,
            Square::G1,
            Square::C3,
            Square::B2,
        ]);
        assert_eq!(expected, bishop_attacks(Square::D4, occ));
    }

    #[test]
    fn queen_is_union() {
        let occ = board(&[Square::C3, Square::E7, Square::G4]);
        assert_eq!(
            bishop_attacks(Square::E5, occ) | rook_attacks(Square::E5, occ),
            queen_attacks(Square::E5, occ)
        );
    }

    #[test]
    fn relevant_masks() {
        assert_eq!(12, Slider::Rook.relevant_mask(Square::A1).count());
        assert_eq!(10, Slider::Rook.relevant_mask(Square::E4).count());
        assert_eq!(6, Slider::Bishop.relevant_mask(Square::A1).count());
        assert_eq!(9, Slider::Bishop.relevant_mask(Square::E4).count());
    }

    #[test]
    fn magic_lookup_matches_ray_walk() {
        // Every subset for a handful of squares, including corners and edges.
        for &sq in &[Square::A1, Square::H8, Square::D4, Square::E1, Square::B7] {
            for &slider in &[Slider::Bishop, Slider::Rook] {
                for occ in enumerate_subsets(slider.relevant_mask(sq)) {
                    let noisy = occ | board(&[Square::A8, Square::H1]);
                    let looked_up = match slider {
                        Slider::Bishop => bishop_attacks(sq, noisy),
                        Slider::Rook => rook_attacks(sq, noisy),
                    };
                    assert_eq!(slider.walk(sq, noisy), looked_up);
                }
            }
        }
    }
}
