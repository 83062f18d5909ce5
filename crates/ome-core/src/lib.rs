//! Core data types, record building, and pipeline seams for the
//! Open-Meteo exporter.
//!
//! Weather samples come in from a [`WeatherSource`], are turned into
//! [`TimeSeriesRecord`]s by the [`RecordBuilder`], and leave through a
//! [`RecordSink`].

pub mod pipeline;
pub mod records;
pub mod types;

pub use pipeline::*;
pub use records::*;
pub use types::*;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("Invalid sample timestamp '{value}'")]
    InvalidTimestamp {
        value: String,
        #[source]
        source: chrono::ParseError,
    },
}

pub type CoreResult<T> = Result<T, CoreError>;
