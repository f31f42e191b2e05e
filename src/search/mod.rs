// Copyright 2017-2019 Sean Gillespie.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

mod data;
mod heuristics;
mod ordering;
mod searcher;
mod transposition_table;
mod worker;

pub use data::{info_line, CsvDataRecorder, DataRecorder, InfoRecorder, NullDataRecorder, Record};
pub use searcher::{SearchLimits, SearchResult, Searcher, DEFAULT_CONTEMPT};
pub use transposition_table::{score_from_tt, score_to_tt, Bound, TableEntry, TranspositionTable};
pub use transposition_table::DEFAULT_TABLE_SIZE_MB;
