//! Open-Meteo exporter daemon
//!
//! This binary coordinates:
//! - An optional one-shot archive backfill at startup
//! - Hourly forecast polling into InfluxDB
//! - Graceful shutdown on SIGINT/SIGTERM

mod config;
mod poller;
mod shutdown;

use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::info;

use ome_archive::Backfiller;
use ome_core::{RecordBuilder, RecordSink, RecordStore, WeatherSource};
use ome_db::InfluxClient;
use ome_ingest::OpenMeteoClient;

use crate::config::DaemonConfig;
use crate::poller::{local_now, Poller};
use crate::shutdown::{listen_for_signals, ShutdownSignal};

#[tokio::main]
async fn main() -> Result<()> {
    // A missing .env file is fine
    dotenvy::dotenv().ok();

    ome_obs::init("omexd", config::verbose_from_env());

    info!("Starting Open-Meteo exporter");

    let config = DaemonConfig::from_env().context("Invalid configuration")?;
    info!("Loaded configuration: {:?}", config);

    let source: Arc<dyn WeatherSource> = Arc::new(
        OpenMeteoClient::new(config.open_meteo.clone())
            .context("Failed to create Open-Meteo client")?,
    );

    let influx = Arc::new(
        InfluxClient::new(config.influx.clone()).context("Failed to create InfluxDB client")?,
    );
    influx.log_health().await;

    let builder = RecordBuilder::new(config.measurement.clone(), config.system_name.clone());

    // Installed before the backfill so a signal during it skips polling
    let shutdown = ShutdownSignal::new();
    listen_for_signals(shutdown.clone()).context("Failed to install signal handlers")?;

    if let Some(floor) = config.backfill_floor() {
        let backfiller = Backfiller::new(
            Arc::clone(&source),
            Arc::clone(&influx) as Arc<dyn RecordStore>,
            builder.clone(),
            floor,
        );
        let outcome = backfiller
            .run(local_now())
            .await
            .context("Backfill failed")?;
        info!(?outcome, "Backfill check done");
    }

    let poller = Poller::new(
        source,
        influx as Arc<dyn RecordSink>,
        builder,
        config.poll_interval,
        shutdown,
    );

    info!("Daemon running - press Ctrl+C to stop");

    poller.run().await.context("Polling stopped")?;

    info!("End of the program. Open-Meteo exporter stopped gracefully");
    Ok(())
}
