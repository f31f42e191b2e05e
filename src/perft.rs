// Copyright 2017-2019 Sean Gillespie.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.
use rayon::prelude::*;

use crate::move_generator::{MoveGenerator, MoveVec};
use crate::moves::Move;
use crate::position::Position;

/// Counts the leaf positions reachable in exactly `depth` plies. Root moves are searched
/// in parallel.
pub fn perft(pos: &Position, depth: u32) -> u64 {
    if depth == 0 {
        return 1;
    }

    let mut moves = MoveVec::new();
    MoveGenerator::new().legal_moves(pos, &mut moves);
    moves
        .par_iter()
        .map(|&mov| count(&pos.apply(mov), depth - 1))
        .sum()
}

/// Per-root-move leaf counts, sorted by the move's UCI text.
pub fn divide(pos: &Position, depth: u32) -> Vec<(Move, u64)> {
    if depth == 0 {
        return Vec::new();
    }

    let mut moves = MoveVec::new();
    MoveGenerator::new().legal_moves(pos, &mut moves);
    let mut counts: Vec<_> = moves
        .par_iter()
        .map(|&mov| (mov, count(&pos.apply(mov), depth - 1)))
        .collect();
    counts.sort_by_key(|(mov, _)| mov.as_uci());
    counts
}

fn count(pos: &Position, depth: u32) -> u64 {
    if depth == 0 {
        return 1;
    }

    let mut moves = MoveVec::new();
    MoveGenerator::new().legal_moves(pos, &mut moves);
    if depth == 1 {
        return moves.len() as u64;
    }

    moves
        .iter()
        .map(|&mov| count(&pos.apply(mov), depth - 1))
        .sum()
}
