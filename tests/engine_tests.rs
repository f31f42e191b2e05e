// Copyright 2017-2019 Sean Gillespie.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.
use std::io::Cursor;
use std::sync::Arc;

use helios::book::OpeningBook;
use helios::eval::DRAW;
use helios::search::{NullDataRecorder, SearchLimits, Searcher};
use helios::uci::UciServer;
use helios::{GameHistory, Position};
use parking_lot::Mutex;

fn play(game: &mut GameHistory, moves: &[&str]) {
    for text in moves {
        let mov = game.position().parse_uci_move(text).unwrap();
        game.play(mov);
    }
}

#[test]
fn search_line_starts_with_best_move() {
    let pos = Position::from_start_position();
    let mut searcher = Searcher::new();
    searcher.resize_table(4);
    let result = searcher.find_move(&pos, &SearchLimits::depth(4), &[], &NullDataRecorder);
    assert!(pos.is_legal(result.best_move));
    assert_eq!(4, result.depth);
    assert_eq!(Some(&result.best_move), result.pv.first());
    assert!(result.score.abs() < 200);
}

#[test]
fn search_sees_repetition_from_game_history() {
    // black is a rook up and shouldn't walk back into the starting position a third time
    let start = Position::from_fen("6k1/8/8/8/8/8/r7/6K1 w - - 0 1").unwrap();
    let mut game = GameHistory::new(start);
    play(&mut game, &["g1h1", "g8h8", "h1g1", "h8g8", "g1h1", "g8h8", "h1g1"]);
    assert_eq!(2, game.occurrences());
    assert!(!game.is_draw());

    let mut searcher = Searcher::new();
    searcher.resize_table(4);
    let result = searcher.find_move(
        game.position(),
        &SearchLimits::depth(3),
        game.prior_hashes(),
        &NullDataRecorder,
    );
    assert!(game.position().is_legal(result.best_move));
    assert_ne!("h8g8", result.best_move.as_uci());
    assert!(result.score > DRAW);
}

#[test]
fn uci_game_session() {
    let output = Arc::new(Mutex::new(Vec::new()));
    let server = UciServer::with_shared_output(output.clone(), OpeningBook::builtin());
    let input = "uci\n\
                 setoption name Hash value 2\n\
                 setoption name Threads value 2\n\
                 isready\n\
                 ucinewgame\n\
                 position startpos moves e2e4 e7e5 g1f3\n\
                 go depth 4\n\
                 isready\n\
                 position startpos moves e2e4 e7e5 g1f3 b8c6\n\
                 go wtime 2000 btime 2000 winc 0 binc 0\n\
                 quit\n";
    server.run(Cursor::new(input)).unwrap();

    let text = String::from_utf8(output.lock().clone()).unwrap();
    assert!(text.contains("uciok"));
    assert_eq!(2, text.matches("readyok").count());
    let bestmoves: Vec<_> = text.lines().filter(|l| l.starts_with("bestmove")).collect();
    assert_eq!(2, bestmoves.len());
    assert!(text.contains("info depth 4 "));
}
