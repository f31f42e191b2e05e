// Copyright 2017-2019 Sean Gillespie.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! The UCI protocol front-end. Commands are read on the caller's thread; `go` hands the
//! searcher to a background thread so that `stop` can be processed while it runs, and gets
//! it back when the search finishes.
use std::io::{self, BufRead, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use parking_lot::Mutex;

use crate::book::OpeningBook;
use crate::eval::Score;
use crate::game::GameHistory;
use crate::perft;
use crate::position::{Position, START_FEN};
use crate::search::{InfoRecorder, SearchLimits, Searcher, DEFAULT_CONTEMPT, DEFAULT_TABLE_SIZE_MB};
use crate::time_manager::{allocate_time, TimeControl};

/// Options settable through `setoption`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EngineOptions {
    pub hash_mb: usize,
    pub threads: usize,
    pub own_book: bool,
    pub contempt: Score,
}

impl Default for EngineOptions {
    fn default() -> EngineOptions {
        EngineOptions {
            hash_mb: DEFAULT_TABLE_SIZE_MB,
            threads: 1,
            own_book: false,
            contempt: DEFAULT_CONTEMPT,
        }
    }
}

impl EngineOptions {
    fn searcher(&self) -> Searcher {
        let mut searcher = Searcher::new();
        if self.hash_mb != DEFAULT_TABLE_SIZE_MB {
            searcher.resize_table(self.hash_mb);
        }
        searcher.set_threads(self.threads);
        searcher.set_contempt(self.contempt);
        searcher
    }
}

pub struct UciServer<W: Write + Send + 'static> {
    output: Arc<Mutex<W>>,
    game: GameHistory,
    options: EngineOptions,
    book: OpeningBook,
    /// `None` while a search thread owns it.
    searcher: Option<Searcher>,
    search: Option<JoinHandle<Searcher>>,
    stop: Arc<AtomicBool>,
}

impl<W: Write + Send + 'static> UciServer<W> {
    pub fn new(output: W, book: OpeningBook) -> UciServer<W> {
        UciServer::with_shared_output(Arc::new(Mutex::new(output)), book)
    }

    pub fn with_shared_output(output: Arc<Mutex<W>>, book: OpeningBook) -> UciServer<W> {
        let options = EngineOptions::default();
        let searcher = options.searcher();
        let stop = searcher.stop_handle();
        UciServer {
            output,
            game: GameHistory::default(),
            options,
            book,
            searcher: Some(searcher),
            search: None,
            stop,
        }
    }

    /// Reads commands until `quit` or the end of input.
    pub fn run<R: BufRead>(mut self, reader: R) -> io::Result<()> {
        for line in reader.lines() {
            let line = line?;
            debug!("uci <- {}", line);
            if !self.handle_line(&line)? {
                return Ok(());
            }
        }

        self.halt_search();
        Ok(())
    }

    fn send<D: AsRef<str>>(&self, line: D) -> io::Result<()> {
        let mut output = self.output.lock();
        writeln!(output, "{}", line.as_ref())?;
        output.flush()
    }

    /// Complains about a command we couldn't act on without giving up on the session.
    fn reject<D: AsRef<str>>(&self, message: D) -> io::Result<()> {
        warn!("{}", message.as_ref());
        self.send(format!("info string {}", message.as_ref()))
    }

    /// Handles one line of input. Returns false once the engine should exit.
    fn handle_line(&mut self, line: &str) -> io::Result<bool> {
        let components: Vec<_> = line.split_whitespace().collect();
        let (command, args) = match components.split_first() {
            Some((&command, args)) => (command, args),
            None => return Ok(true),
        };

        match (command, args) {
            ("uci", _) => self.handle_uci()?,
            ("isready", _) => self.send("readyok")?,
            ("ucinewgame", _) => {
                self.wait_for_search();
                self.idle_searcher().clear();
                self.game = GameHistory::default();
            }
            ("setoption", args) => {
                self.wait_for_search();
                self.handle_setoption(args)?;
            }
            ("position", args) => {
                self.wait_for_search();
                self.handle_position(args)?;
            }
            ("go", args) => {
                self.wait_for_search();
                self.handle_go(args)?;
            }
            ("stop", _) => self.halt_search(),
            ("quit", _) => {
                self.halt_search();
                return Ok(false);
            }
            ("d", _) => {
                self.wait_for_search();
                self.handle_display()?;
            }
            ("perft", args) => {
                self.wait_for_search();
                self.handle_perft(args)?;
            }
            ("debug", _) => {}
            (command, _) => self.reject(format!("unknown command: {}", command))?,
        }

        Ok(true)
    }

    fn handle_uci(&self) -> io::Result<()> {
        self.send(format!(
            "id name {} {}",
            env!("CARGO_PKG_NAME"),
            env!("CARGO_PKG_VERSION")
        ))?;
        self.send(format!("id author {}", env!("CARGO_PKG_AUTHORS")))?;
        self.send(format!(
            "option name Hash type spin default {} min 1 max 4096",
            DEFAULT_TABLE_SIZE_MB
        ))?;
        self.send("option name Threads type spin default 1 min 1 max 64")?;
        self.send("option name OwnBook type check default false")?;
        self.send(format!(
            "option name Contempt type spin default {} min 0 max 100",
            DEFAULT_CONTEMPT
        ))?;
        self.send("uciok")
    }

    fn wait_for_search(&mut self) {
        if let Some(handle) = self.search.take() {
            match handle.join() {
                Ok(searcher) => self.searcher = Some(searcher),
                Err(_) => warn!("search thread panicked; starting over with a fresh searcher"),
            }
        }
    }

    fn halt_search(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
        self.wait_for_search();
    }

    fn idle_searcher(&mut self) -> &mut Searcher {
        debug_assert!(self.search.is_none());
        let options = &self.options;
        self.searcher.get_or_insert_with(|| options.searcher())
    }

    fn handle_setoption(&mut self, args: &[&str]) -> io::Result<()> {
        let value_index = args.iter().position(|&a| a == "value");
        let name_end = value_index.unwrap_or_else(|| args.len());
        let name = match args.first() {
            Some(&"name") => args[1..name_end].join(" "),
            _ => return self.reject("malformed setoption command"),
        };
        let value = value_index.map(|i| args[i + 1..].join(" ")).unwrap_or_default();

        match name.to_lowercase().as_str() {
            "hash" => match value.parse::<usize>() {
                Ok(mb) => {
                    let mb = mb.max(1).min(4096);
                    self.options.hash_mb = mb;
                    self.idle_searcher().resize_table(mb);
                }
                Err(_) => return self.reject(format!("invalid Hash value: {}", value)),
            },
            "threads" => match value.parse::<usize>() {
                Ok(threads) => {
                    let threads = threads.max(1).min(64);
                    self.options.threads = threads;
                    self.idle_searcher().set_threads(threads);
                }
                Err(_) => return self.reject(format!("invalid Threads value: {}", value)),
            },
            "ownbook" => match value.parse::<bool>() {
                Ok(enabled) => {
                    self.options.own_book = enabled;
                    self.book.set_enabled(enabled);
                }
                Err(_) => return self.reject(format!("invalid OwnBook value: {}", value)),
            },
            "contempt" => match value.parse::<Score>() {
                Ok(contempt) => {
                    let contempt = contempt.max(0).min(100);
                    self.options.contempt = contempt;
                    self.idle_searcher().set_contempt(contempt);
                }
                Err(_) => return self.reject(format!("invalid Contempt value: {}", value)),
            },
            _ => return self.reject(format!("unknown option: {}", name)),
        }

        info!("option {} set to {}", name, value);
        Ok(())
    }

    fn handle_position(&mut self, args: &[&str]) -> io::Result<()> {
        let moves_index = args.iter().position(|&a| a == "moves");
        let setup_end = moves_index.unwrap_or_else(|| args.len());
        let fen = match args.first() {
            Some(&"startpos") => START_FEN.to_owned(),
            Some(&"fen") => args[1..setup_end].join(" "),
            _ => return self.reject("malformed position command"),
        };

        let start = match Position::from_fen(&fen) {
            Ok(pos) => pos,
            Err(err) => return self.reject(format!("invalid fen '{}': {}", fen, err)),
        };

        let mut game = GameHistory::new(start);
        let moves = moves_index.map_or(&[][..], |i| &args[i + 1..]);
        for text in moves {
            match game.position().parse_uci_move(text) {
                Ok(mov) => game.play(mov),
                Err(err) => {
                    self.game = game;
                    return self.reject(format!("stopped applying moves: {}", err));
                }
            }
        }

        self.game = game;
        Ok(())
    }

    fn parse_go(&self, args: &[&str]) -> io::Result<TimeControl> {
        let mut tc = TimeControl::default();
        let mut iter = args.iter();
        while let Some(&token) = iter.next() {
            if token == "infinite" {
                tc.infinite = true;
                continue;
            }

            let value = iter.next().and_then(|v| v.parse::<u64>().ok());
            let slot = match token {
                "wtime" => &mut tc.wtime,
                "btime" => &mut tc.btime,
                "winc" => &mut tc.winc,
                "binc" => &mut tc.binc,
                "movestogo" => &mut tc.movestogo,
                "movetime" => &mut tc.movetime,
                "nodes" => &mut tc.nodes,
                "depth" => {
                    tc.depth = value.map(|d| d as u32);
                    continue;
                }
                other => {
                    self.reject(format!("ignoring go parameter {}", other))?;
                    continue;
                }
            };

            if value.is_none() {
                self.reject(format!("missing or invalid value for {}", token))?;
            }
            *slot = value;
        }

        Ok(tc)
    }

    fn handle_go(&mut self, args: &[&str]) -> io::Result<()> {
        let tc = self.parse_go(args)?;
        let pos = *self.game.position();
        if !tc.infinite && tc.depth.is_none() {
            if let Some(mov) = self.book.probe(&pos, &mut rand::thread_rng()) {
                return self.send(format!("bestmove {}", mov));
            }
        }

        let ply = (pos.fullmove_clock().saturating_sub(1)) * 2 + pos.side_to_move() as u32;
        let limits = SearchLimits {
            depth: tc.depth,
            time: allocate_time(&tc, pos.side_to_move(), ply),
            nodes: tc.nodes,
            infinite: tc.infinite,
        };

        let game = self.game.prior_hashes().to_vec();
        let mut searcher = self.idle_searcher_owned();
        self.stop = searcher.stop_handle();
        self.stop.store(false, Ordering::Relaxed);
        let output = self.output.clone();
        let handle = thread::Builder::new()
            .name("search".to_owned())
            .spawn(move || {
                let recorder = InfoRecorder::new(output.clone());
                let result = searcher.find_move(&pos, &limits, &game, &recorder);
                let mut output = output.lock();
                if let Err(err) = writeln!(output, "bestmove {}", result.best_move)
                    .and_then(|_| output.flush())
                {
                    warn!("failed to write bestmove: {}", err);
                }

                searcher
            })?;

        self.search = Some(handle);
        Ok(())
    }

    fn idle_searcher_owned(&mut self) -> Searcher {
        let options = &self.options;
        self.searcher.take().unwrap_or_else(|| options.searcher())
    }

    fn handle_display(&self) -> io::Result<()> {
        let pos = self.game.position();
        self.send(format!("{}", pos))?;
        self.send(format!("Fen: {}", pos.as_fen()))?;
        self.send(format!("Key: {:016x}", pos.zobrist_hash()))
    }

    fn handle_perft(&self, args: &[&str]) -> io::Result<()> {
        let depth = match args.first().and_then(|d| d.parse::<u32>().ok()) {
            Some(depth) => depth,
            None => return self.reject("perft needs a depth"),
        };

        let mut total = 0;
        for (mov, count) in perft::divide(self.game.position(), depth) {
            self.send(format!("{}: {}", mov, count))?;
            total += count;
        }
        if depth == 0 {
            total = 1;
        }

        self.send("")?;
        self.send(format!("Nodes searched: {}", total))
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;
    use std::sync::Arc;
    use std::thread;
    use std::time::Duration;

    use parking_lot::Mutex;

    use super::{EngineOptions, UciServer};
    use crate::book::OpeningBook;
    use crate::position::Position;

    fn server() -> (UciServer<Vec<u8>>, Arc<Mutex<Vec<u8>>>) {
        let output = Arc::new(Mutex::new(Vec::new()));
        let mut server = UciServer::with_shared_output(output.clone(), OpeningBook::builtin());
        server.handle_line("setoption name Hash value 1").unwrap();
        (server, output)
    }

    fn text(output: &Arc<Mutex<Vec<u8>>>) -> String {
        String::from_utf8(output.lock().clone()).unwrap()
    }

    fn session(input: &str) -> String {
        let (server, output) = server();
        server.run(Cursor::new(input.to_owned())).unwrap();
        text(&output)
    }

    #[test]
    fn handshake() {
        let out = session("uci\nisready\n");
        assert!(out.contains("id name helios"));
        assert!(out.contains("option name Hash type spin default 64 min 1 max 4096"));
        assert!(out.contains("option name OwnBook type check default false"));
        assert!(out.contains("uciok\n"));
        assert!(out.ends_with("readyok\n"));
    }

    #[test]
    fn position_with_moves() {
        let out = session("position startpos moves e2e4 e7e5\nd\n");
        assert!(out.contains("Fen: rnbqkbnr/pppp1ppp/8/4p3/4P3/8/PPPP1PPP/RNBQKBNR w KQkq e6 0 2"));
    }

    #[test]
    fn illegal_moves_are_reported() {
        let (mut server, output) = server();
        server
            .handle_line("position startpos moves e2e4 e7e4 g1f3")
            .unwrap();
        assert!(text(&output).contains("info string stopped applying moves"));
        let expected = Position::from_start_position();
        let expected = expected.apply(expected.parse_uci_move("e2e4").unwrap());
        assert_eq!(expected.as_fen(), server.game.position().as_fen());
    }

    #[test]
    fn bad_fen_keeps_old_position() {
        let (mut server, output) = server();
        server.handle_line("position startpos moves d2d4").unwrap();
        let before = server.game.position().as_fen();
        server.handle_line("position fen 8/8/8 w - - 0 1").unwrap();
        assert!(text(&output).contains("info string invalid fen"));
        assert_eq!(before, server.game.position().as_fen());
    }

    #[test]
    fn go_depth_reports_and_finds_mate() {
        let out = session("position fen 6k1/5ppp/8/8/8/8/8/R5K1 w - - 0 1\ngo depth 3\nd\n");
        assert!(out.contains("info depth 1 "));
        assert!(out.contains("info depth 3 "));
        assert!(out.contains("score mate 1"));
        assert!(out.contains("bestmove a1a8\n"));
    }

    #[test]
    fn stop_ends_infinite_search() {
        let (mut server, output) = server();
        server.handle_line("position startpos").unwrap();
        server.handle_line("go infinite").unwrap();
        thread::sleep(Duration::from_millis(50));
        server.handle_line("stop").unwrap();
        let out = text(&output);
        let bestmove = out
            .lines()
            .find(|l| l.starts_with("bestmove"))
            .expect("no bestmove after stop");
        let mov = bestmove.split_whitespace().nth(1).unwrap();
        assert!(Position::from_start_position().parse_uci_move(mov).is_ok());
        assert!(server.searcher.is_some());
    }

    #[test]
    fn book_moves_skip_the_search() {
        let out = session("setoption name OwnBook value true\nposition startpos\ngo wtime 1000 btime 1000\nd\n");
        assert!(!out.contains("info depth"));
        assert!(out.contains("bestmove e2e4\n") || out.contains("bestmove d2d4\n"));
    }

    #[test]
    fn options() {
        let (mut server, output) = server();
        server.handle_line("setoption name Threads value 4").unwrap();
        server.handle_line("setoption name Contempt value 500").unwrap();
        server.handle_line("setoption name OwnBook value true").unwrap();
        server.handle_line("setoption name Hash value 0").unwrap();
        assert_eq!(
            EngineOptions {
                hash_mb: 1,
                threads: 4,
                own_book: true,
                contempt: 100,
            },
            server.options
        );
        assert!(server.book.is_enabled());
        assert_eq!(4, server.searcher.as_ref().unwrap().threads());

        server.handle_line("setoption name Threads value lots").unwrap();
        server.handle_line("setoption name Ponder value true").unwrap();
        let out = text(&output);
        assert!(out.contains("info string invalid Threads value: lots"));
        assert!(out.contains("info string unknown option: Ponder"));
    }

    #[test]
    fn perft_command() {
        let out = session("position startpos\nperft 2\n");
        assert!(out.contains("e2e4: 20\n"));
        assert!(out.contains("Nodes searched: 400\n"));
    }

    #[test]
    fn unknown_commands_keep_the_session_alive() {
        let out = session("frobnicate\nisready\nquit\nisready\n");
        assert!(out.contains("info string unknown command: frobnicate"));
        assert_eq!(1, out.matches("readyok").count());
    }

    #[test]
    fn mated_position_reports_null_move() {
        let out = session(
            "position fen rnb1kbnr/pppp1ppp/8/4p3/6Pq/5P2/PPPPP2P/RNBQKBNR w KQkq - 1 3\ngo depth 2\nd\n",
        );
        assert!(out.contains("bestmove 0000\n"));
    }
}
