// Copyright 2017-2019 Sean Gillespie.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.
use std::time::Duration;

use crate::types::Color;

const MOVE_OVERHEAD_MS: u64 = 50;
const MIN_MOVE_TIME_MS: u64 = 10;
const MAX_TIME_FRACTION: f64 = 0.7;

/// The clock parameters of a UCI `go` command. Times are in milliseconds.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TimeControl {
    pub wtime: Option<u64>,
    pub btime: Option<u64>,
    pub winc: Option<u64>,
    pub binc: Option<u64>,
    pub movestogo: Option<u64>,
    pub movetime: Option<u64>,
    pub depth: Option<u32>,
    pub nodes: Option<u64>,
    pub infinite: bool,
}

/// How long to think about the next move, or `None` to think until told to stop (or until
/// a depth or node limit is reached). `ply` is the number of half moves played so far.
pub fn allocate_time(tc: &TimeControl, side: Color, ply: u32) -> Option<Duration> {
    if let Some(movetime) = tc.movetime {
        let budget = movetime
            .saturating_sub(MOVE_OVERHEAD_MS)
            .max(MIN_MOVE_TIME_MS);
        return Some(Duration::from_millis(budget));
    }

    let (remaining, increment) = match side {
        Color::White => (tc.wtime, tc.winc),
        Color::Black => (tc.btime, tc.binc),
    };

    let remaining = match remaining {
        Some(remaining) if !tc.infinite => remaining,
        _ => return None,
    };

    let increment = increment.unwrap_or(0);
    let usable = remaining.saturating_sub(MOVE_OVERHEAD_MS);
    let base = match tc.movestogo {
        Some(moves) if moves > 0 => usable / (moves + 2),
        _ => {
            let moves_left = 25u64.saturating_sub(u64::from(ply) / 3).max(8);
            usable / moves_left
        }
    };

    let allocated = base + increment * 3 / 4;
    let ceiling = (usable as f64 * MAX_TIME_FRACTION) as u64;
    let budget = allocated.min(ceiling).max(MIN_MOVE_TIME_MS);
    Some(Duration::from_millis(budget))
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::{allocate_time, TimeControl};
    use crate::types::Color;

    fn millis(ms: u64) -> Option<Duration> {
        Some(Duration::from_millis(ms))
    }

    #[test]
    fn movetime_wins() {
        let tc = TimeControl {
            movetime: Some(1000),
            wtime: Some(5),
            ..Default::default()
        };
        assert_eq!(millis(950), allocate_time(&tc, Color::White, 0));

        let tiny = TimeControl {
            movetime: Some(30),
            ..Default::default()
        };
        assert_eq!(millis(10), allocate_time(&tiny, Color::Black, 0));
    }

    #[test]
    fn unbounded_searches() {
        let infinite = TimeControl {
            infinite: true,
            wtime: Some(60_000),
            ..Default::default()
        };
        assert_eq!(None, allocate_time(&infinite, Color::White, 10));

        let depth = TimeControl {
            depth: Some(8),
            ..Default::default()
        };
        assert_eq!(None, allocate_time(&depth, Color::White, 10));
    }

    #[test]
    fn sudden_death() {
        let tc = TimeControl {
            wtime: Some(60_050),
            btime: Some(10_050),
            ..Default::default()
        };
        // 25 moves left at the start of the game
        assert_eq!(millis(2400), allocate_time(&tc, Color::White, 0));
        assert_eq!(millis(400), allocate_time(&tc, Color::Black, 0));
        // and never fewer than 8
        assert_eq!(millis(7500), allocate_time(&tc, Color::White, 120));
    }

    #[test]
    fn increments_and_moves_to_go() {
        let tc = TimeControl {
            wtime: Some(30_050),
            winc: Some(1000),
            movestogo: Some(10),
            ..Default::default()
        };
        assert_eq!(millis(2500 + 750), allocate_time(&tc, Color::White, 40));
    }

    #[test]
    fn clamped_to_remaining_time() {
        let tc = TimeControl {
            btime: Some(1050),
            binc: Some(5000),
            ..Default::default()
        };
        assert_eq!(millis(700), allocate_time(&tc, Color::Black, 0));

        let flagging = TimeControl {
            wtime: Some(20),
            ..Default::default()
        };
        assert_eq!(millis(10), allocate_time(&flagging, Color::White, 0));
    }
}
