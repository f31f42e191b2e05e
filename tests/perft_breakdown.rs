// Copyright 2017-2019 Sean Gillespie.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.
use helios::Position;

/// Move counts broken down by kind, tallied over the moves made at the last ply.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PerftResults {
    pub nodes: u64,
    pub captures: u64,
    pub en_passants: u64,
    pub castles: u64,
    pub promotions: u64,
    pub checks: u64,
    pub checkmates: u64,
}

pub fn perft(fen: &str, depth: u32) -> PerftResults {
    let mut results = Default::default();
    let position = Position::from_fen(fen).unwrap();
    perft_impl(&position, depth, &mut results);
    results
}

fn perft_impl(pos: &Position, depth: u32, results: &mut PerftResults) {
    if depth == 0 {
        results.nodes += 1;
        return;
    }

    for mov in pos.legal_moves() {
        let child = pos.apply(mov);
        if depth == 1 {
            if mov.is_capture() {
                results.captures += 1;
            }
            if mov.is_en_passant() {
                results.en_passants += 1;
            }
            if mov.is_castle() {
                results.castles += 1;
            }
            if mov.is_promotion() {
                results.promotions += 1;
            }
            if child.in_check() {
                results.checks += 1;
                if child.legal_moves().is_empty() {
                    results.checkmates += 1;
                }
            }
        }

        perft_impl(&child, depth - 1, results);
    }
}

#[test]
fn initial_position_depth_3() {
    let results = perft("rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1", 3);
    assert_eq!(
        PerftResults {
            nodes: 8902,
            captures: 34,
            checks: 12,
            ..Default::default()
        },
        results
    );
}

#[test]
fn initial_position_depth_4_mates() {
    let results = perft("rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1", 4);
    assert_eq!(197_281, results.nodes);
    assert_eq!(1576, results.captures);
    assert_eq!(469, results.checks);
    assert_eq!(8, results.checkmates);
}

#[test]
fn kiwipete_depth_2() {
    let results = perft(
        "r3k2r/p1ppqpb1/bn2pnp1/3PN3/1p2P3/2N2Q1p/PPPBBPPP/R3K2R w KQkq - 0 1",
        2,
    );
    assert_eq!(
        PerftResults {
            nodes: 2039,
            captures: 351,
            en_passants: 1,
            castles: 91,
            checks: 3,
            ..Default::default()
        },
        results
    );
}

#[test]
fn rook_endgame_depth_3() {
    let results = perft("8/2p5/3p4/KP5r/1R3p1k/8/4P1P1/8 w - - 0 1", 3);
    assert_eq!(
        PerftResults {
            nodes: 2812,
            captures: 209,
            en_passants: 2,
            checks: 267,
            ..Default::default()
        },
        results
    );
}

#[test]
fn promotions_depth_2() {
    let results = perft(
        "r3k2r/Pppp1ppp/1b3nbN/nP6/BBP1P3/q4N2/Pp1P2PP/R2Q1RK1 w kq - 0 1",
        2,
    );
    assert_eq!(
        PerftResults {
            nodes: 264,
            captures: 87,
            castles: 6,
            promotions: 48,
            checks: 10,
            ..Default::default()
        },
        results
    );
}
