// Copyright 2017-2019 Sean Gillespie.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.
use crate::moves::Move;
use crate::position::Position;

/// The positions of a game so far. Knows enough to detect draws by repetition and by the
/// fifty-move rule, and hands the search the hashes it needs for the same purpose.
#[derive(Clone, Debug)]
pub struct GameHistory {
    position: Position,
    /// Hash of every position reached, the current one last.
    hashes: Vec<u64>,
    /// Index into `hashes` of the last position reached by a capture or pawn move.
    last_irreversible: usize,
}

impl GameHistory {
    pub fn new(start: Position) -> GameHistory {
        GameHistory {
            position: start,
            hashes: vec![start.zobrist_hash()],
            last_irreversible: 0,
        }
    }

    pub fn position(&self) -> &Position {
        &self.position
    }

    /// Plays a move that must be legal in the current position.
    pub fn play(&mut self, mov: Move) {
        debug_assert!(self.position.is_legal(mov));
        self.position = self.position.apply(mov);
        self.hashes.push(self.position.zobrist_hash());
        if self.position.halfmove_clock() == 0 {
            self.last_irreversible = self.hashes.len() - 1;
        }
    }

    /// Hashes of every position before the current one, oldest first.
    pub fn prior_hashes(&self) -> &[u64] {
        &self.hashes[..self.hashes.len() - 1]
    }

    pub fn last_irreversible(&self) -> usize {
        self.last_irreversible
    }

    /// Number of half moves played since the game started from its first position.
    pub fn len(&self) -> usize {
        self.hashes.len() - 1
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// How many times the current position has occurred, including now.
    pub fn occurrences(&self) -> usize {
        let current = self.position.zobrist_hash();
        self.hashes[self.last_irreversible..]
            .iter()
            .rev()
            .step_by(2)
            .filter(|&&hash| hash == current)
            .count()
    }

    pub fn is_threefold(&self) -> bool {
        self.occurrences() >= 3
    }

    /// True once a hundred half moves pass without a capture or pawn move, unless the last
    /// of them delivered mate.
    pub fn is_fifty_move_draw(&self) -> bool {
        self.position.halfmove_clock() >= 100
            && !(self.position.in_check() && self.position.legal_moves().is_empty())
    }

    pub fn is_draw(&self) -> bool {
        self.is_threefold() || self.is_fifty_move_draw()
    }
}

impl Default for GameHistory {
    fn default() -> GameHistory {
        GameHistory::new(Position::from_start_position())
    }
}
