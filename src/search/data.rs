// Copyright 2017-2019 Sean Gillespie.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.
use std::io::Write;
use std::sync::Arc;

use csv::Writer;
use parking_lot::Mutex;

use crate::eval::{Score, UciScore};
use crate::position::Position;

/// Statistics for one completed iteration of the search.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Record {
    pub fen: String,
    pub depth: u32,
    pub seldepth: u32,
    pub score: Score,
    pub nodes: u64,
    pub elapsed_ms: u64,
    pub nps: u64,
    pub hashfull: u32,
    pub pv: String,
}

pub trait DataRecorder {
    fn record(&self, pos: &Position, rec: &Record);
}

pub struct NullDataRecorder;

impl DataRecorder for NullDataRecorder {
    fn record(&self, _pos: &Position, _rec: &Record) {}
}

/// Appends every record as a row of a CSV file.
pub struct CsvDataRecorder<W: Write> {
    writer: Mutex<Writer<W>>,
}

impl<W: Write> CsvDataRecorder<W> {
    pub fn new(writer: W) -> CsvDataRecorder<W> {
        CsvDataRecorder {
            writer: Mutex::new(Writer::from_writer(writer)),
        }
    }

    pub fn into_inner(self) -> Option<W> {
        self.writer.into_inner().into_inner().ok()
    }
}

impl<W: Write> DataRecorder for CsvDataRecorder<W> {
    fn record(&self, pos: &Position, rec: &Record) {
        let mut copy = rec.clone();
        copy.fen = pos.as_fen();
        let mut writer = self.writer.lock();
        if let Err(err) = writer.serialize(&copy) {
            warn!("failed to write search record: {}", err);
            return;
        }
        if let Err(err) = writer.flush() {
            warn!("failed to flush search records: {}", err);
        }
    }
}

/// Writes records as UCI `info` lines to a shared output stream.
pub struct InfoRecorder<W: Write> {
    output: Arc<Mutex<W>>,
}

impl<W: Write> InfoRecorder<W> {
    pub fn new(output: Arc<Mutex<W>>) -> InfoRecorder<W> {
        InfoRecorder { output }
    }
}

pub fn info_line(rec: &Record) -> String {
    let mut line = format!(
        "info depth {} seldepth {} score {} nodes {} nps {} time {} hashfull {}",
        rec.depth,
        rec.seldepth,
        UciScore(rec.score),
        rec.nodes,
        rec.nps,
        rec.elapsed_ms,
        rec.hashfull
    );
    if !rec.pv.is_empty() {
        line.push_str(" pv ");
        line.push_str(&rec.pv);
    }

    line
}

impl<W: Write> DataRecorder for InfoRecorder<W> {
    fn record(&self, _pos: &Position, rec: &Record) {
        let mut output = self.output.lock();
        if let Err(err) = writeln!(output, "{}", info_line(rec)).and_then(|_| output.flush()) {
            warn!("failed to write info line: {}", err);
        }
    }
}
