// Copyright 2017-2019 Sean Gillespie.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

#[macro_use]
extern crate criterion;

use criterion::black_box;
use criterion::Criterion;
use helios::attacks;
use helios::eval::{BoardEvaluator, StandardEvaluator};
use helios::search::{NullDataRecorder, SearchLimits, Searcher};
use helios::{Bitboard, MoveGenerator, MoveVec, Position, Square};

const KIWIPETE: &str = "r3k2r/p1ppqpb1/bn2pnp1/3PN3/1p2P3/2N2Q1p/PPPBBPPP/R3K2R w KQkq - 0 1";

fn criterion_benchmark(c: &mut Criterion) {
    c.bench_function("queen attacks f5 empty board", |b| {
        b.iter(|| attacks::queen_attacks(black_box(Square::F5), Bitboard::none()))
    });

    c.bench_function("knight attacks f5", |b| {
        b.iter(|| attacks::knight_attacks(black_box(Square::F5)))
    });

    c.bench_function("legal moves kiwipete", |b| {
        let pos = Position::from_fen(KIWIPETE).unwrap();
        let gen = MoveGenerator::new();
        b.iter(|| {
            let mut vec = MoveVec::default();
            gen.legal_moves(black_box(&pos), &mut vec);
            vec.len()
        });
    });

    c.bench_function("apply every legal move kiwipete", |b| {
        let pos = Position::from_fen(KIWIPETE).unwrap();
        let moves = pos.legal_moves();
        b.iter(|| {
            moves
                .iter()
                .map(|&mov| black_box(&pos).apply(mov).zobrist_hash())
                .fold(0, |acc, hash| acc ^ hash)
        });
    });

    c.bench_function("evaluate kiwipete", |b| {
        let pos = Position::from_fen(KIWIPETE).unwrap();
        let evaluator = StandardEvaluator::new();
        b.iter(|| evaluator.evaluate(black_box(&pos)))
    });

    c.bench_function("search start position depth 5", |b| {
        let pos = Position::from_start_position();
        b.iter(|| {
            let mut searcher = Searcher::new();
            searcher.resize_table(16);
            searcher.find_move(&pos, &SearchLimits::depth(5), &[], &NullDataRecorder)
        });
    });
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
