//! Sample to record conversion with a settle-time cutoff
//!
//! The newest hours returned by the weather API may not carry final
//! radiation values yet, so only samples at or before `now - window`
//! are turned into records.

use chrono::{Duration, NaiveDateTime};
use tracing::debug;

use crate::{CoreError, CoreResult, RecordTags, TimeSeriesRecord, WeatherSample};

/// Settle window (hours) applied to forecast samples on every poll
pub const FORECAST_SETTLE_HOURS: i64 = 1;

/// Settle window (hours) applied when backfilling from the archive
pub const BACKFILL_SETTLE_HOURS: i64 = 2;

/// Latest sample time that is still accepted for a window of `hours`
pub fn cutoff(now: NaiveDateTime, hours: i64) -> NaiveDateTime {
    now - Duration::hours(hours)
}

/// Parse an API timestamp (`2024-10-07T13:00`)
///
/// Only minute precision is accepted, since the stored time is built by
/// appending `:00Z` to the original text.
pub fn parse_sample_time(value: &str) -> CoreResult<NaiveDateTime> {
    NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M").map_err(|source| {
        CoreError::InvalidTimestamp {
            value: value.to_string(),
            source,
        }
    })
}

/// Builds records for one measurement and system tag
#[derive(Debug, Clone)]
pub struct RecordBuilder {
    measurement: String,
    system: String,
}

impl RecordBuilder {
    pub fn new(measurement: impl Into<String>, system: impl Into<String>) -> Self {
        Self {
            measurement: measurement.into(),
            system: system.into(),
        }
    }

    pub fn measurement(&self) -> &str {
        &self.measurement
    }

    pub fn system(&self) -> &str {
        &self.system
    }

    /// Convert samples into records, skipping any sample strictly after `cutoff`
    ///
    /// Output order follows input order. A sample with an unparseable
    /// timestamp fails the whole batch.
    pub fn build(
        &self,
        samples: &[WeatherSample],
        cutoff: NaiveDateTime,
    ) -> CoreResult<Vec<TimeSeriesRecord>> {
        let mut records = Vec::with_capacity(samples.len());

        for sample in samples {
            debug!(
                time = %sample.timestamp,
                cloud_cover = ?sample.values.cloud_cover,
                direct_radiation = ?sample.values.direct_radiation,
                diffuse_radiation = ?sample.values.diffuse_radiation,
                "sample"
            );

            let sample_time = parse_sample_time(&sample.timestamp)?;
            if sample_time > cutoff {
                continue;
            }

            records.push(TimeSeriesRecord {
                measurement: self.measurement.clone(),
                tags: RecordTags {
                    system: self.system.clone(),
                },
                // API times carry no seconds or offset; they are stored as UTC
                time: format!("{}:00Z", sample.timestamp),
                fields: sample.values,
            });
        }

        Ok(records)
    }
}
