//! Forecast polling loop

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::NaiveDateTime;
use ome_core::{cutoff, RecordBuilder, RecordSink, WeatherSource, FORECAST_SETTLE_HOURS};
use tracing::{debug, info};

use crate::shutdown::ShutdownSignal;

/// Wall-clock "now" as local naive time, matching the API's local timestamps
pub fn local_now() -> NaiveDateTime {
    chrono::Local::now().naive_local()
}

/// Fetches the forecast, converts settled hours and writes them, once per interval
pub struct Poller {
    source: Arc<dyn WeatherSource>,
    sink: Arc<dyn RecordSink>,
    builder: RecordBuilder,
    interval: Duration,
    shutdown: ShutdownSignal,
    clock: fn() -> NaiveDateTime,
}

impl Poller {
    pub fn new(
        source: Arc<dyn WeatherSource>,
        sink: Arc<dyn RecordSink>,
        builder: RecordBuilder,
        interval: Duration,
        shutdown: ShutdownSignal,
    ) -> Self {
        Self {
            source,
            sink,
            builder,
            interval,
            shutdown,
            clock: local_now,
        }
    }

    pub fn with_clock(mut self, clock: fn() -> NaiveDateTime) -> Self {
        self.clock = clock;
        self
    }

    /// One fetch-convert-write cycle; returns the number of records written
    pub async fn ingest_once(&self) -> Result<usize> {
        let samples = self
            .source
            .forecast()
            .await
            .context("Failed to fetch forecast")?;

        let now = (self.clock)();
        let records = self
            .builder
            .build(&samples, cutoff(now, FORECAST_SETTLE_HOURS))
            .context("Failed to build records")?;

        info!(
            samples = samples.len(),
            records = records.len(),
            skipped = samples.len() - records.len(),
            "forecast converted"
        );

        self.sink
            .write(&records)
            .await
            .context("Failed to write records")?;

        info!("Successfully added data to influx");
        Ok(records.len())
    }

    /// Poll until shutdown is requested; returns the number of completed cycles
    ///
    /// A cycle in progress always finishes. Any cycle error ends the loop.
    pub async fn run(&self) -> Result<usize> {
        info!(interval_secs = self.interval.as_secs(), "poller started");

        let mut cycles = 0;
        while !self.shutdown.is_triggered() {
            let written = self.ingest_once().await?;
            cycles += 1;
            debug!(cycle = cycles, written, "cycle finished");

            if self.shutdown.wait_timeout(self.interval).await {
                break;
            }
        }

        info!(cycles, "poller stopped");
        Ok(cycles)
    }
}
