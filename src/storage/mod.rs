//! Storage module for persisting job records
//!
//! This module handles all on-disk state for the scraper, including:
//! - One whole-record file per job id
//! - Reconciliation of fresh records against the stored version
//! - The per-run failure log

mod json_store;
mod traits;

pub use json_store::JsonStore;
pub use traits::{Storage, StorageError, StorageResult};

use crate::config::OutputConfig;
use crate::HarvestError;
use std::path::Path;

/// Opens the storage backend described by the output configuration
///
/// # Arguments
///
/// * `config` - The output configuration
///
/// # Returns
///
/// * `Ok(JsonStore)` - Store rooted at the configured output directory
/// * `Err(HarvestError)` - The directory could not be created
pub fn open_storage(config: &OutputConfig) -> Result<JsonStore, HarvestError> {
    JsonStore::new(Path::new(&config.output_dir), &config.failure_log)
}
