//! Output module for run summaries and corpus reports
//!
//! This module handles:
//! - Printing the end-of-run summary
//! - Computing statistics over the persisted corpus
//! - Writing and printing the statistics report

pub mod stats;
mod summary;

pub use stats::{
    compute_statistics, load_corpus, print_statistics, write_statistics, CorpusStatistics,
};
pub use summary::print_run_summary;
