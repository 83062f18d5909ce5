use anyhow::Result;
use chrono::{DateTime, NaiveDate, Utc};

use crate::{TimeSeriesRecord, WeatherSample};

/// Where hourly weather samples come from
#[async_trait::async_trait]
pub trait WeatherSource: Send + Sync {
    /// Yesterday and today from the forecast endpoint
    async fn forecast(&self) -> Result<Vec<WeatherSample>>;

    /// Settled history for an inclusive date range
    async fn archive(&self, start: NaiveDate, end: NaiveDate) -> Result<Vec<WeatherSample>>;
}

/// Where records are written
#[async_trait::async_trait]
pub trait RecordSink: Send + Sync {
    async fn write(&self, records: &[TimeSeriesRecord]) -> Result<()>;
}

/// A sink that can also report what it already holds
#[async_trait::async_trait]
pub trait RecordStore: RecordSink {
    /// Time of the oldest stored record for a measurement and system tag
    async fn earliest_time(&self, measurement: &str, system: &str)
        -> Result<Option<DateTime<Utc>>>;
}
