// Copyright 2017-2019 Sean Gillespie.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! The transposition table, shared by every search thread without locks.
//!
//! Each slot is three atomic words. `data` and `meta` hold the entry itself and `check`
//! holds `key ^ data ^ meta`. Readers recompute the XOR and compare it with the key they
//! are probing for, so a slot that is being written by another thread at the same time
//! (and therefore holds words from two different entries) simply reads as a miss.
use std::mem;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::eval::{Score, MATE_BOUND};
use crate::moves::Move;

pub const DEFAULT_TABLE_SIZE_MB: usize = 64;
const MIN_SLOTS: usize = 1024;
const HASHFULL_SAMPLE: usize = 1000;
pub(crate) const MOVE_MASK: u64 = 0x00FF_FFFF;

/// What a stored score says about the node's true value.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Bound {
    None = 0,
    /// The score is exact (a PV node).
    Exact = 1,
    /// The search failed high; the true score is at least this.
    Lower = 2,
    /// The search failed low; the true score is at most this.
    Upper = 3,
}

impl Bound {
    fn from_bits(bits: u64) -> Bound {
        match bits & 0x3 {
            1 => Bound::Exact,
            2 => Bound::Lower,
            3 => Bound::Upper,
            _ => Bound::None,
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct TableEntry {
    pub key: u64,
    pub best_move: Option<Move>,
    pub score: Score,
    pub static_eval: Score,
    pub depth: u8,
    pub bound: Bound,
    pub generation: u8,
}

impl TableEntry {
    fn pack(&self) -> (u64, u64) {
        let move_bits = self.best_move.map_or(0, |m| u64::from(m.bits()) & MOVE_MASK);
        let data = u64::from(clamp_i16(self.score) as u16)
            | u64::from(clamp_i16(self.static_eval) as u16) << 16
            | move_bits << 32
            | u64::from(self.depth) << 56;
        let meta = self.bound as u64 | u64::from(self.generation) << 8;
        (data, meta)
    }

    fn unpack(key: u64, data: u64, meta: u64) -> TableEntry {
        let move_bits = ((data >> 32) & MOVE_MASK) as u32;
        TableEntry {
            key,
            best_move: if move_bits == 0 {
                None
            } else {
                Some(Move::from_bits(move_bits))
            },
            score: Score::from(data as u16 as i16),
            static_eval: Score::from((data >> 16) as u16 as i16),
            depth: (data >> 56) as u8,
            bound: Bound::from_bits(meta),
            generation: (meta >> 8) as u8,
        }
    }
}

pub(crate) fn clamp_i16(score: Score) -> i16 {
    score.max(Score::from(i16::min_value())).min(Score::from(i16::max_value())) as i16
}

#[derive(Default)]
struct Slot {
    check: AtomicU64,
    data: AtomicU64,
    meta: AtomicU64,
}

impl Slot {
    fn write(&self, key: u64, data: u64, meta: u64) {
        self.data.store(data, Ordering::Relaxed);
        self.meta.store(meta, Ordering::Relaxed);
        self.check.store(key ^ data ^ meta, Ordering::Relaxed);
    }

    /// Reads the slot regardless of which key it belongs to.
    fn read(&self) -> TableEntry {
        let check = self.check.load(Ordering::Relaxed);
        let data = self.data.load(Ordering::Relaxed);
        let meta = self.meta.load(Ordering::Relaxed);
        TableEntry::unpack(check ^ data ^ meta, data, meta)
    }

    fn clear(&self) {
        self.check.store(0, Ordering::Relaxed);
        self.data.store(0, Ordering::Relaxed);
        self.meta.store(0, Ordering::Relaxed);
    }
}

pub struct TranspositionTable {
    slots: Vec<Slot>,
    mask: usize,
    generation: u8,
}

impl TranspositionTable {
    pub fn new(size_mb: usize) -> TranspositionTable {
        let count = slot_count(size_mb);
        let mut slots = Vec::with_capacity(count);
        slots.resize_with(count, Slot::default);
        TranspositionTable {
            slots,
            mask: count - 1,
            generation: 0,
        }
    }

    /// Reallocates the table at a new size. All entries are lost.
    pub fn resize(&mut self, size_mb: usize) {
        info!("resizing transposition table to {}MB", size_mb);
        *self = TranspositionTable::new(size_mb);
    }

    pub fn clear(&mut self) {
        for slot in &self.slots {
            slot.clear();
        }

        self.generation = 0;
    }

    /// Ages every entry by one search. Called once at the start of every top-level search.
    pub fn new_search(&mut self) {
        self.generation = self.generation.wrapping_add(1);
    }

    pub fn generation(&self) -> u8 {
        self.generation
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    fn slot(&self, key: u64) -> &Slot {
        &self.slots[key as usize & self.mask]
    }

    pub fn probe(&self, key: u64) -> Option<TableEntry> {
        let entry = self.slot(key).read();
        if entry.key == key && entry.bound != Bound::None {
            Some(entry)
        } else {
            None
        }
    }

    pub fn probe_move(&self, key: u64) -> Option<Move> {
        self.probe(key).and_then(|entry| entry.best_move)
    }

    /// Stores a search result. A deeper result from the current search is only displaced by
    /// an exact score; otherwise the new result is dropped, though its move is kept if the
    /// existing entry for the same position has none.
    pub fn store(
        &self,
        key: u64,
        depth: u8,
        score: Score,
        static_eval: Score,
        bound: Bound,
        best_move: Option<Move>,
    ) {
        let slot = self.slot(key);
        let existing = slot.read();
        let occupied = existing.bound != Bound::None;
        if occupied
            && existing.generation == self.generation
            && existing.depth > depth
            && bound != Bound::Exact
        {
            if existing.key == key && existing.best_move.is_none() && best_move.is_some() {
                let backfilled = TableEntry {
                    best_move,
                    ..existing
                };
                let (data, meta) = backfilled.pack();
                slot.write(key, data, meta);
            }

            return;
        }

        // A result without a move shouldn't erase the move we already know for this position.
        let best_move = match best_move {
            None if occupied && existing.key == key => existing.best_move,
            mov => mov,
        };

        let entry = TableEntry {
            key,
            best_move,
            score,
            static_eval,
            depth,
            bound,
            generation: self.generation,
        };
        let (data, meta) = entry.pack();
        slot.write(key, data, meta);
    }

    /// Estimated fill, in per mille, counting entries written by the current search.
    pub fn hashfull(&self) -> u32 {
        let sample = HASHFULL_SAMPLE.min(self.slots.len());
        let used = self.slots[..sample]
            .iter()
            .map(Slot::read)
            .filter(|e| e.bound != Bound::None && e.generation == self.generation)
            .count();
        (used * 1000 / sample) as u32
    }
}

fn slot_count(size_mb: usize) -> usize {
    let bytes = size_mb.max(1) * 1024 * 1024;
    let wanted = (bytes / mem::size_of::<Slot>()).max(MIN_SLOTS);

    // round down to a power of two
    1 << (63 - (wanted as u64).leading_zeros())
}

/// Converts a score relative to the root into one relative to the node being stored, so
/// that a mate found at one ply can be reused at another.
pub fn score_to_tt(score: Score, ply: usize) -> Score {
    if score >= MATE_BOUND {
        score + ply as Score
    } else if score <= -MATE_BOUND {
        score - ply as Score
    } else {
        score
    }
}

/// Inverse of `score_to_tt`.
pub fn score_from_tt(score: Score, ply: usize) -> Score {
    if score >= MATE_BOUND {
        score - ply as Score
    } else if score <= -MATE_BOUND {
        score + ply as Score
    } else {
        score
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::eval::{mate_in, mated_in};
    use crate::types::{Color, PieceKind, Square};

    fn some_move() -> Move {
        Move::quiet(Square::G1, Square::F3, Color::White, PieceKind::Knight)
    }

    #[test]
    fn sizes_are_powers_of_two() {
        for &mb in &[1, 3, 64, 100] {
            let table = TranspositionTable::new(mb);
            assert!(table.len().is_power_of_two());
            assert!(table.len() * mem::size_of::<Slot>() <= mb * 1024 * 1024);
        }

        assert!(TranspositionTable::new(0).len() >= MIN_SLOTS);
    }

    #[test]
    fn store_then_probe() {
        let table = TranspositionTable::new(1);
        let key = 0xdead_beef_1234_5678;
        let mov = some_move().with_check();
        table.store(key, 7, -250, 40, Bound::Lower, Some(mov));

        let entry = table.probe(key).unwrap();
        assert_eq!(key, entry.key);
        assert_eq!(7, entry.depth);
        assert_eq!(-250, entry.score);
        assert_eq!(40, entry.static_eval);
        assert_eq!(Bound::Lower, entry.bound);
        assert_eq!(Some(mov), entry.best_move);
        assert_eq!(Some(mov), table.probe_move(key));
    }

    #[test]
    fn miss_on_other_key() {
        let table = TranspositionTable::new(1);
        let key = 0x1111;
        table.store(key, 3, 10, 10, Bound::Exact, None);
        assert!(table.probe(key + table.len() as u64).is_none());
        assert!(table.probe(0x2222).is_none());
    }

    #[test]
    fn torn_slot_reads_as_miss() {
        let table = TranspositionTable::new(1);
        let key = 0x4242;
        table.store(key, 3, 10, 10, Bound::Exact, Some(some_move()));

        // Simulate a racing writer that has only replaced the data word.
        table.slot(key).data.store(0x0102_0304, Ordering::Relaxed);
        assert!(table.probe(key).is_none());
    }

    #[test]
    fn deeper_entries_survive_shallow_bounds() {
        let table = TranspositionTable::new(1);
        let key = 0x77;
        table.store(key, 9, 100, 0, Bound::Lower, None);
        table.store(key, 2, -50, 0, Bound::Upper, Some(some_move()));

        let entry = table.probe(key).unwrap();
        assert_eq!(9, entry.depth);
        assert_eq!(100, entry.score);
        // the move was backfilled
        assert_eq!(Some(some_move()), entry.best_move);

        // exact scores always replace
        table.store(key, 2, 5, 0, Bound::Exact, None);
        let entry = table.probe(key).unwrap();
        assert_eq!(2, entry.depth);
        assert_eq!(Bound::Exact, entry.bound);
        assert_eq!(Some(some_move()), entry.best_move);
    }

    #[test]
    fn stale_entries_are_replaced() {
        let mut table = TranspositionTable::new(1);
        let key = 0x99;
        table.store(key, 12, 100, 0, Bound::Lower, None);
        table.new_search();
        table.store(key, 1, 30, 0, Bound::Upper, None);
        let entry = table.probe(key).unwrap();
        assert_eq!(1, entry.depth);
        assert_eq!(table.generation(), entry.generation);
    }

    #[test]
    fn hashfull_counts_current_generation() {
        let mut table = TranspositionTable::new(1);
        assert_eq!(0, table.hashfull());
        for key in 0..500u64 {
            table.store(key, 1, 0, 0, Bound::Exact, None);
        }
        assert_eq!(500, table.hashfull());

        table.new_search();
        assert_eq!(0, table.hashfull());

        table.clear();
        assert!(table.probe(3).is_none());
    }

    #[test]
    fn mate_scores_shift_with_ply() {
        // mate in 5 plies from the root, seen at ply 3, is mate in 2 from that node.
        let stored = score_to_tt(mate_in(5), 3);
        assert_eq!(mate_in(2), stored);
        assert_eq!(mate_in(5), score_from_tt(stored, 3));
        assert_eq!(mate_in(7), score_from_tt(stored, 5));

        let stored = score_to_tt(mated_in(6), 2);
        assert_eq!(mated_in(4), stored);
        assert_eq!(mated_in(6), score_from_tt(stored, 2));

        assert_eq!(123, score_to_tt(123, 10));
        assert_eq!(-123, score_from_tt(-123, 10));
    }
}
