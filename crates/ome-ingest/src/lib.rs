//! Open-Meteo weather API client
//!
//! Fetches hourly cloud cover and radiation from the forecast and archive
//! endpoints and exposes them as [`ome_core::WeatherSample`]s.

pub mod client;
pub mod response;

pub use client::*;
pub use response::*;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("Request to {url} failed")]
    Http {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Unexpected response shape from {url}")]
    DataShape {
        url: String,
        #[source]
        source: serde_json::Error,
    },

    #[error(
        "Hourly arrays are not aligned: time={time}, cloud_cover={cloud_cover}, \
         direct_radiation={direct_radiation}, diffuse_radiation={diffuse_radiation}"
    )]
    MisalignedArrays {
        time: usize,
        cloud_cover: usize,
        direct_radiation: usize,
        diffuse_radiation: usize,
    },
}

pub type IngestResult<T> = Result<T, IngestError>;
