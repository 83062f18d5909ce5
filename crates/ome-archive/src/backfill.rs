//! One-shot historical backfill
//!
//! Looks up the oldest stored point and, when it is newer than the floor
//! date, imports the archive range between the two.

use std::sync::Arc;

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};
use ome_core::{
    cutoff, RecordBuilder, RecordSink, RecordStore, WeatherSource, BACKFILL_SETTLE_HOURS,
};
use tracing::{info, instrument};

use crate::{split_batches, ArchiveError, ArchiveResult, BACKFILL_BATCH_SIZE};

/// What a backfill check ended up doing
#[derive(Debug, Clone, PartialEq)]
pub enum BackfillOutcome {
    /// Nothing stored yet for this measurement and system
    NoStoredData,

    /// Stored data already reaches the floor date
    AlreadyComplete { earliest: DateTime<Utc> },

    /// Archive data was fetched and written
    Imported { records: usize, batches: usize },
}

pub struct Backfiller {
    source: Arc<dyn WeatherSource>,
    store: Arc<dyn RecordStore>,
    builder: RecordBuilder,
    floor_date: NaiveDate,
    batch_size: usize,
}

impl Backfiller {
    pub fn new(
        source: Arc<dyn WeatherSource>,
        store: Arc<dyn RecordStore>,
        builder: RecordBuilder,
        floor_date: NaiveDate,
    ) -> Self {
        Self {
            source,
            store,
            builder,
            floor_date,
            batch_size: BACKFILL_BATCH_SIZE,
        }
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    /// Run the backfill check once
    ///
    /// A failed write stops the run; earlier batches stay written.
    #[instrument(skip(self), fields(floor = %self.floor_date))]
    pub async fn run(&self, now: NaiveDateTime) -> ArchiveResult<BackfillOutcome> {
        let earliest = self
            .store
            .earliest_time(self.builder.measurement(), self.builder.system())
            .await
            .map_err(ArchiveError::EarliestLookup)?;

        let Some(earliest) = earliest else {
            info!("no stored records yet, skipping backfill");
            return Ok(BackfillOutcome::NoStoredData);
        };

        let floor = Utc.from_utc_datetime(&self.floor_date.and_time(NaiveTime::MIN));
        if earliest <= floor {
            info!(%earliest, "stored data already reaches the floor date");
            return Ok(BackfillOutcome::AlreadyComplete { earliest });
        }

        let start = self.floor_date;
        let end = earliest.date_naive();
        info!(%start, %end, "backfilling from archive");

        let samples = self
            .source
            .archive(start, end)
            .await
            .map_err(|source| ArchiveError::Fetch { start, end, source })?;

        // Archive rows get the 2h settle window as well
        let records = self
            .builder
            .build(&samples, cutoff(now, BACKFILL_SETTLE_HOURS))?;

        let mut batches = 0;
        for batch in split_batches(&records, self.batch_size)? {
            self.store
                .write(batch.items)
                .await
                .map_err(|source| ArchiveError::Write {
                    batch: batch.number,
                    total: batch.total,
                    source,
                })?;
            info!(
                batch = batch.number,
                total = batch.total,
                records = batch.items.len(),
                "wrote backfill batch"
            );
            batches += 1;
        }

        info!(records = records.len(), batches, "backfill finished");
        Ok(BackfillOutcome::Imported {
            records: records.len(),
            batches,
        })
    }
}
