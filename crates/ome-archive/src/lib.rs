//! Historical backfill from the Open-Meteo archive
//!
//! Brings stored data back to a configured floor date once at startup,
//! writing in bounded batches.

pub mod backfill;
pub mod batch;

pub use backfill::*;
pub use batch::*;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("Failed to look up the oldest stored record")]
    EarliestLookup(#[source] anyhow::Error),

    #[error("Failed to fetch archive data for {start}..={end}")]
    Fetch {
        start: chrono::NaiveDate,
        end: chrono::NaiveDate,
        #[source]
        source: anyhow::Error,
    },

    #[error("Invalid archive sample")]
    Build(#[from] ome_core::CoreError),

    #[error("Failed to write batch {batch} of {total}")]
    Write {
        batch: usize,
        total: usize,
        #[source]
        source: anyhow::Error,
    },

    #[error("Invalid batch size: {0}")]
    InvalidBatchSize(usize),
}

pub type ArchiveResult<T> = Result<T, ArchiveError>;
