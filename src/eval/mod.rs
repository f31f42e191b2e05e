// Copyright 2017-2019 Sean Gillespie.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.
use crate::position::Position;

mod score;
mod standard_evaluator;

pub use score::{is_mate_score, mate_in, mated_in, Score, UciScore};
pub use score::{DRAW, INFINITY, MATE, MATE_BOUND, MAX_PLY};
pub use standard_evaluator::StandardEvaluator;

/// A static evaluation function. Scores are in centipawns from the point of view of the
/// side to move. Evaluators are shared by every search thread.
pub trait BoardEvaluator: Send + Sync {
    fn evaluate(&self, pos: &Position) -> Score;
}
