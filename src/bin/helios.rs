// Copyright 2017-2019 Sean Gillespie.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

#[macro_use]
extern crate clap;
#[macro_use]
extern crate log;

use std::fs::File;
use std::io::{self, BufReader};
use std::process;
use std::sync::Arc;
use std::time::{Duration, Instant};

use clap::{App, Arg, ArgMatches, SubCommand};
use helios::book::OpeningBook;
use helios::search::{CsvDataRecorder, DataRecorder, InfoRecorder, SearchLimits, Searcher};
use helios::uci::UciServer;
use helios::{divide, perft, Position};
use parking_lot::Mutex;

fn fen_arg() -> Arg<'static, 'static> {
    Arg::with_name("FEN")
        .help("FEN string for a board position")
        .required(true)
        .index(1)
}

fn depth_arg() -> Arg<'static, 'static> {
    Arg::with_name("depth")
        .help("Depth of move tree to search")
        .value_name("DEPTH")
        .short("-d")
        .long("--depth")
        .takes_value(true)
}

fn main() {
    env_logger::init();
    let matches = App::new(crate_name!())
        .version(crate_version!())
        .author(crate_authors!())
        .about(crate_description!())
        .arg(
            Arg::with_name("book")
                .help("JSON opening book to use in addition to the built-in lines")
                .value_name("FILE")
                .long("--book")
                .takes_value(true)
                .global(true),
        )
        .subcommand(
            SubCommand::with_name("perft")
                .about("PERFT analysis of board positions")
                .arg(fen_arg())
                .arg(depth_arg().required(true))
                .arg(
                    Arg::with_name("divide")
                        .help("Print the node count below each root move")
                        .long("--divide"),
                ),
        )
        .subcommand(
            SubCommand::with_name("analyze")
                .about("Search a board position and print the result")
                .arg(fen_arg())
                .arg(depth_arg())
                .arg(
                    Arg::with_name("movetime")
                        .help("Milliseconds to search for")
                        .value_name("MS")
                        .long("--movetime")
                        .takes_value(true),
                )
                .arg(
                    Arg::with_name("threads")
                        .help("Number of search threads")
                        .value_name("N")
                        .short("-t")
                        .long("--threads")
                        .takes_value(true),
                )
                .arg(
                    Arg::with_name("hash")
                        .help("Transposition table size in megabytes")
                        .value_name("MB")
                        .long("--hash")
                        .takes_value(true),
                )
                .arg(
                    Arg::with_name("csv")
                        .help("Write one row per completed iteration to this file")
                        .value_name("FILE")
                        .long("--csv")
                        .takes_value(true),
                ),
        )
        .get_matches();

    if let Some(matches) = matches.subcommand_matches("perft") {
        run_perft(matches);
    }

    if let Some(matches) = matches.subcommand_matches("analyze") {
        run_analyze(matches);
    }

    let book = load_book(&matches);
    let stdin = io::stdin();
    let server = UciServer::new(io::stdout(), book);
    if let Err(err) = server.run(stdin.lock()) {
        error!("uci session failed: {}", err);
        process::exit(1);
    }
}

fn load_book(matches: &ArgMatches) -> OpeningBook {
    let mut book = OpeningBook::builtin();
    if let Some(path) = matches.value_of("book") {
        let loaded = File::open(path)
            .map_err(Into::into)
            .and_then(|file| book.load_json(BufReader::new(file)));
        match loaded {
            Ok(lines) => info!("loaded {} book lines from {}", lines, path),
            Err(err) => {
                eprintln!("failed to load book {}: {}", path, err);
                process::exit(1);
            }
        }
    }

    book
}

fn parse_position(matches: &ArgMatches) -> Position {
    let fen = matches.value_of("FEN").unwrap_or_default();
    match Position::from_fen(fen) {
        Ok(pos) => pos,
        Err(err) => {
            eprintln!("invalid fen: {}", err);
            process::exit(1);
        }
    }
}

fn run_perft(matches: &ArgMatches) -> ! {
    let pos = parse_position(matches);
    let depth = value_t_or_exit!(matches, "depth", u32);

    println!("fen:   {}", pos.as_fen());
    println!("depth: {}", depth);
    println!();
    println!("{}", pos);
    println!();
    if matches.is_present("divide") {
        let mut total = 0;
        for (mov, count) in divide(&pos, depth) {
            println!("{}: {}", mov, count);
            total += count;
        }
        println!();
        println!("total: {}", total);
        process::exit(0);
    }

    for i in 1..=depth {
        let start = Instant::now();
        let results = perft(&pos, i);
        let ms = start.elapsed().as_millis();
        println!("perft({}) = {} ({} ms)", i, results, ms);
    }

    process::exit(0);
}

fn run_analyze(matches: &ArgMatches) -> ! {
    let pos = parse_position(matches);
    let mut limits = SearchLimits::default();
    if matches.is_present("depth") {
        limits.depth = Some(value_t_or_exit!(matches, "depth", u32));
    }
    if matches.is_present("movetime") {
        limits.time = Some(Duration::from_millis(value_t_or_exit!(
            matches, "movetime", u64
        )));
    }
    if limits.depth.is_none() && limits.time.is_none() {
        limits.depth = Some(8);
    }

    let mut searcher = Searcher::new();
    if matches.is_present("hash") {
        searcher.resize_table(value_t_or_exit!(matches, "hash", usize));
    }
    if matches.is_present("threads") {
        searcher.set_threads(value_t_or_exit!(matches, "threads", usize));
    }

    println!("{}", pos);
    println!();

    let recorder: Box<dyn DataRecorder> = match matches.value_of("csv") {
        Some(path) => match File::create(path) {
            Ok(file) => Box::new(CsvDataRecorder::new(file)),
            Err(err) => {
                eprintln!("failed to create {}: {}", path, err);
                process::exit(1);
            }
        },
        None => Box::new(InfoRecorder::new(Arc::new(Mutex::new(io::stdout())))),
    };

    let result = searcher.find_move(&pos, &limits, &[], recorder.as_ref());
    let pv: Vec<_> = result.pv.iter().map(|m| m.as_uci()).collect();
    println!("best move: {}", result.best_move);
    println!("    score: {}", result.score);
    println!("    depth: {}", result.depth);
    println!("    nodes: {}", result.nodes);
    println!("     time: {} ms", result.elapsed.as_millis());
    println!("       pv: {}", pv.join(" "));
    process::exit(0);
}
