// Copyright 2017-2019 Sean Gillespie.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Scores are plain centipawn integers relative to the side to move. Mates are encoded as
//! scores near `MATE`: being mated `n` plies from the root scores `-MATE + n`, so that the
//! search prefers shorter wins and longer losses without any special casing.
use std::fmt;

pub type Score = i32;

pub const MATE: Score = 30000;
pub const INFINITY: Score = 100_000;
pub const DRAW: Score = 0;

/// Deepest ply the search will ever reach, including quiescence.
pub const MAX_PLY: usize = 64;

/// Scores at or beyond this magnitude are mate scores.
pub const MATE_BOUND: Score = MATE - MAX_PLY as Score;

/// The score of delivering mate `ply` plies from the root.
pub fn mate_in(ply: usize) -> Score {
    MATE - ply as Score
}

/// The score of being mated `ply` plies from the root.
pub fn mated_in(ply: usize) -> Score {
    -MATE + ply as Score
}

pub fn is_mate_score(score: Score) -> bool {
    score.abs() >= MATE_BOUND
}

/// A score formatted the way UCI's `info score` wants it: `cp 35` or `mate -3`, where mates
/// are counted in full moves.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct UciScore(pub Score);

impl fmt::Display for UciScore {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let score = self.0;
        if !is_mate_score(score) {
            return write!(f, "cp {}", score);
        }

        let plies = MATE - score.abs();
        let moves = (plies + 1) / 2;
        if score > 0 {
            write!(f, "mate {}", moves)
        } else {
            write!(f, "mate -{}", moves)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mate_ordering() {
        assert!(mate_in(1) > mate_in(3));
        assert!(mated_in(2) < mated_in(4));
        assert!(mated_in(10) < -2000);
        assert!(is_mate_score(mate_in(5)));
        assert!(is_mate_score(mated_in(5)));
        assert!(!is_mate_score(1500));
        assert_eq!(-mate_in(7), mated_in(7));
    }

    #[test]
    fn uci_format() {
        assert_eq!("cp 35", UciScore(35).to_string());
        assert_eq!("cp -120", UciScore(-120).to_string());
        assert_eq!("mate 1", UciScore(mate_in(1)).to_string());
        assert_eq!("mate 2", UciScore(mate_in(3)).to_string());
        assert_eq!("mate -1", UciScore(mated_in(2)).to_string());
    }
}
