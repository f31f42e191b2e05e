// Copyright 2017-2019 Sean Gillespie.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! An opening book keyed by position hash, so that transpositions into a known line are
//! recognized no matter which move order reached them.
use std::error::Error;
use std::fmt;
use std::io::{self, Read};

use hashbrown::HashMap;
use rand::seq::SliceRandom;
use rand::Rng;
use serde_derive::{Deserialize, Serialize};

use crate::moves::Move;
use crate::position::Position;

/// A line of play from the starting position. Only the last move is a book choice, with the
/// given weight; the moves before it just lead there.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub struct BookLine {
    pub moves: Vec<String>,
    pub weight: u32,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct BookMove {
    pub mov: Move,
    /// Relative likelihood of playing this move. Zero means the move is only known as a
    /// step towards a deeper line and is never chosen.
    pub weight: u32,
}

#[derive(Debug)]
pub enum BookError {
    Io(io::Error),
    Json(serde_json::Error),
    IllegalMove { line: Vec<String>, mov: String },
}

impl fmt::Display for BookError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            BookError::Io(err) => write!(f, "failed to read book: {}", err),
            BookError::Json(err) => write!(f, "malformed book: {}", err),
            BookError::IllegalMove { line, mov } => {
                write!(f, "illegal move {} in book line {}", mov, line.join(" "))
            }
        }
    }
}

impl Error for BookError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            BookError::Io(err) => Some(err),
            BookError::Json(err) => Some(err),
            BookError::IllegalMove { .. } => None,
        }
    }
}

impl From<io::Error> for BookError {
    fn from(err: io::Error) -> BookError {
        BookError::Io(err)
    }
}

impl From<serde_json::Error> for BookError {
    fn from(err: serde_json::Error) -> BookError {
        BookError::Json(err)
    }
}

#[rustfmt::skip]
const BUILTIN_LINES: &[(&[&str], u32)] = &[
    // London
    (&["d2d4"], 40),
    (&["d2d4", "d7d5", "g1f3"], 35),
    (&["d2d4", "d7d5", "g1f3", "g8f6", "c1f4"], 40),
    (&["d2d4", "d7d5", "g1f3", "g8f6", "c1f4", "e7e6", "e2e3"], 35),
    (&["d2d4", "d7d5", "g1f3", "g8f6", "c1f4", "c7c5", "e2e3"], 35),
    (&["d2d4", "g8f6", "g1f3"], 35),
    (&["d2d4", "g8f6", "g1f3", "e7e6", "c1f4"], 40),
    (&["d2d4", "g8f6", "g1f3", "g7g6", "c1f4"], 35),

    // Italian and Scotch
    (&["e2e4"], 35),
    (&["e2e4", "e7e5", "g1f3"], 40),
    (&["e2e4", "e7e5", "g1f3", "b8c6", "f1c4"], 35),
    (&["e2e4", "e7e5", "g1f3", "b8c6", "d2d4"], 30),
    (&["e2e4", "e7e5", "g1f3", "b8c6", "f1c4", "f8c5", "c2c3"], 35),
    (&["e2e4", "e7e5", "g1f3", "b8c6", "f1c4", "g8f6", "d2d3"], 30),
    (&["e2e4", "e7e5", "g1f3", "b8c6", "d2d4", "e5d4", "f3d4"], 35),
    (&["e2e4", "e7e5", "g1f3", "b8c6", "d2d4", "e5d4", "f3d4", "g8f6", "d4c6"], 30),
    (&["e2e4", "e7e5", "g1f3", "b8c6", "d2d4", "e5d4", "f3d4", "f8c5", "c1e3"], 30),

    // Sicilian, French and Caro-Kann as white
    (&["e2e4", "c7c5", "g1f3"], 30),
    (&["e2e4", "c7c5", "g1f3", "d7d6", "d2d4"], 35),
    (&["e2e4", "c7c5", "g1f3", "b8c6", "d2d4"], 35),
    (&["e2e4", "e7e6", "d2d4"], 35),
    (&["e2e4", "e7e6", "d2d4", "d7d5", "b1c3"], 30),
    (&["e2e4", "c7c6", "d2d4"], 35),
    (&["e2e4", "c7c6", "d2d4", "d7d5", "b1c3"], 30),

    // black replies
    (&["e2e4", "e7e5"], 35),
    (&["e2e4", "e7e5", "g1f3", "b8c6"], 35),
    (&["e2e4", "e7e5", "g1f3", "b8c6", "f1c4", "g8f6"], 30),
    (&["e2e4", "e7e5", "g1f3", "b8c6", "f1c4", "f8c5"], 30),
    (&["d2d4", "g8f6"], 35),
    (&["d2d4", "g8f6", "c2c4", "g7g6"], 30),
    (&["d2d4", "g8f6", "g1f3", "g7g6"], 25),
    (&["d2d4", "d7d5"], 30),
];

pub struct OpeningBook {
    entries: HashMap<u64, Vec<BookMove>>,
    enabled: bool,
}

impl OpeningBook {
    /// An empty, disabled book.
    pub fn new() -> OpeningBook {
        OpeningBook {
            entries: HashMap::new(),
            enabled: false,
        }
    }

    /// The built-in repertoire. Disabled until `set_enabled` is called.
    pub fn builtin() -> OpeningBook {
        let mut book = OpeningBook::new();
        for &(moves, weight) in BUILTIN_LINES {
            if let Err(err) = book.add_line(moves, weight) {
                unreachable!("built-in book line is broken: {}", err);
            }
        }

        book
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    /// Number of positions with at least one known move.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Replays `moves` from the starting position, recording each one as known in the
    /// position it is played from and the last one as a choice with `weight`.
    pub fn add_line<S: AsRef<str>>(
        &mut self,
        moves: &[S],
        weight: u32,
    ) -> Result<(), BookError> {
        let mut pos = Position::from_start_position();
        for (index, text) in moves.iter().enumerate() {
            let text = text.as_ref();
            let mov = pos
                .parse_uci_move(text)
                .map_err(|_| BookError::IllegalMove {
                    line: moves.iter().map(|m| m.as_ref().to_owned()).collect(),
                    mov: text.to_owned(),
                })?;

            let weight = if index + 1 == moves.len() { weight } else { 0 };
            let known = self.entries.entry(pos.zobrist_hash()).or_insert_with(Vec::new);
            match known.iter_mut().find(|m| m.mov.same_action(mov)) {
                Some(existing) => existing.weight = existing.weight.max(weight),
                None => known.push(BookMove { mov, weight }),
            }

            pos = pos.apply(mov);
        }

        Ok(())
    }

    /// Adds every line of a JSON book file, an array of `{"moves": [...], "weight": n}`.
    /// Returns the number of lines read.
    pub fn load_json<R: Read>(&mut self, reader: R) -> Result<usize, BookError> {
        let lines: Vec<BookLine> = serde_json::from_reader(reader)?;
        for line in &lines {
            self.add_line(line.moves.as_slice(), line.weight)?;
        }

        info!("loaded {} book lines ({} positions)", lines.len(), self.len());
        Ok(lines.len())
    }

    /// Every move known in this position, whether or not it can be chosen.
    pub fn moves(&self, pos: &Position) -> &[BookMove] {
        self.entries
            .get(&pos.zobrist_hash())
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Picks a book move for `pos` at random, in proportion to the weights, among those
    /// that are legal. Always `None` while the book is disabled.
    pub fn probe<R: Rng>(&self, pos: &Position, rng: &mut R) -> Option<Move> {
        if !self.enabled {
            return None;
        }

        let candidates: Vec<BookMove> = self
            .moves(pos)
            .iter()
            .filter(|m| m.weight > 0 && pos.is_legal(m.mov))
            .cloned()
            .collect();
        let choice = candidates.choose_weighted(rng, |m| m.weight).ok()?;
        info!("book move {} (weight {})", choice.mov, choice.weight);
        Some(choice.mov)
    }
}

impl Default for OpeningBook {
    fn default() -> OpeningBook {
        OpeningBook::new()
    }
}
