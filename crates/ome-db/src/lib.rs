//! InfluxDB v2 storage layer
//!
//! Writes records as line protocol over the HTTP API and answers the
//! "oldest stored point" question with a Flux query. No schema setup:
//! the bucket is expected to exist.

pub mod client;
pub mod line_protocol;
pub mod queries;

pub use client::*;
pub use line_protocol::*;
pub use queries::*;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum DbError {
    #[error("InfluxDB {operation} request failed")]
    Http {
        operation: &'static str,
        #[source]
        source: reqwest::Error,
    },

    #[error("InfluxDB {operation} returned {status}: {body}")]
    Status {
        operation: &'static str,
        status: reqwest::StatusCode,
        body: String,
    },

    #[error("Invalid InfluxDB URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("Invalid configuration: {0}")]
    ConfigError(String),

    #[error("Malformed CSV in query answer")]
    Csv(#[from] csv::Error),

    #[error("Invalid record time '{value}'")]
    InvalidTime {
        value: String,
        #[source]
        source: chrono::ParseError,
    },
}

pub type DbResult<T> = Result<T, DbError>;
