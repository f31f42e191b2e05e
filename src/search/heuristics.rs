// Copyright 2017-2019 Sean Gillespie.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.
use crate::eval::MAX_PLY;
use crate::moves::Move;
use crate::types::TableIndex;

const HISTORY_LIMIT: i32 = 1 << 20;

/// Per-thread move ordering memory: two killer moves per ply and a history score per
/// (source, destination) pair. Survives between searches, aged at the start of each.
pub struct Heuristics {
    killers: [[Move; 2]; MAX_PLY],
    history: [[i32; 64]; 64],
}

impl Heuristics {
    pub fn new() -> Heuristics {
        Heuristics {
            killers: [[Move::null(); 2]; MAX_PLY],
            history: [[0; 64]; 64],
        }
    }

    /// Halves every history score and forgets all killers.
    pub fn age(&mut self) {
        for row in self.history.iter_mut() {
            for value in row.iter_mut() {
                *value /= 2;
            }
        }

        self.killers = [[Move::null(); 2]; MAX_PLY];
    }

    pub fn clear(&mut self) {
        *self = Heuristics::new();
    }

    pub fn killers(&self, ply: usize) -> [Move; 2] {
        self.killers[ply]
    }

    pub fn is_killer(&self, ply: usize, mov: Move) -> bool {
        self.killers[ply]
            .iter()
            .any(|k| !k.is_null() && k.same_action(mov))
    }

    pub fn history(&self, mov: Move) -> i32 {
        self.history[mov.source().as_index()][mov.destination().as_index()]
    }

    /// Credits a quiet move that caused a beta cutoff.
    pub fn record_cutoff(&mut self, ply: usize, mov: Move, depth: i32) {
        debug_assert!(mov.is_quiet());
        let killers = &mut self.killers[ply];
        if !killers[0].same_action(mov) {
            killers[1] = killers[0];
            killers[0] = mov;
        }

        self.adjust(mov, depth * depth);
    }

    /// Debits a quiet move that was searched without causing the cutoff.
    pub fn record_failure(&mut self, mov: Move, depth: i32) {
        self.adjust(mov, -(depth * depth));
    }

    fn adjust(&mut self, mov: Move, delta: i32) {
        let entry = &mut self.history[mov.source().as_index()][mov.destination().as_index()];
        *entry = (*entry + delta).max(-HISTORY_LIMIT).min(HISTORY_LIMIT);
    }
}

impl Default for Heuristics {
    fn default() -> Heuristics {
        Heuristics::new()
    }
}

#[cfg(test)]
mod tests {
    use super::{Heuristics, HISTORY_LIMIT};
    use crate::moves::Move;
    use crate::types::{Color, PieceKind, Square};

    fn knight(from: Square, to: Square) -> Move {
        Move::quiet(from, to, Color::White, PieceKind::Knight)
    }

    #[test]
    fn killers_shift() {
        let mut heuristics = Heuristics::new();
        let first = knight(Square::G1, Square::F3);
        let second = knight(Square::B1, Square::C3);
        heuristics.record_cutoff(3, first, 2);
        heuristics.record_cutoff(3, second, 2);
        assert_eq!([second, first], heuristics.killers(3));

        // recording the same killer twice doesn't push out the other one
        heuristics.record_cutoff(3, second, 2);
        assert_eq!([second, first], heuristics.killers(3));
        assert!(heuristics.is_killer(3, first.with_check()));
        assert!(!heuristics.is_killer(4, first));
    }

    #[test]
    fn history_accumulates_and_ages() {
        let mut heuristics = Heuristics::new();
        let mov = knight(Square::G1, Square::F3);
        heuristics.record_cutoff(0, mov, 4);
        heuristics.record_cutoff(0, mov, 2);
        assert_eq!(20, heuristics.history(mov));
        heuristics.record_failure(mov, 2);
        assert_eq!(16, heuristics.history(mov));

        heuristics.age();
        assert_eq!(8, heuristics.history(mov));
        assert!(heuristics.killers(0)[0].is_null());
    }

    #[test]
    fn history_is_clamped() {
        let mut heuristics = Heuristics::new();
        let mov = knight(Square::G1, Square::F3);
        for _ in 0..100 {
            heuristics.record_cutoff(0, mov, 200);
        }
        assert_eq!(HISTORY_LIMIT, heuristics.history(mov));

        for _ in 0..200 {
            heuristics.record_failure(mov, 200);
        }
        assert_eq!(-HISTORY_LIMIT, heuristics.history(mov));
    }
}
