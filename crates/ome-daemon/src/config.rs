//! Daemon configuration from environment variables

use chrono::NaiveDate;
use ome_db::InfluxSettings;
use ome_ingest::OpenMeteoSettings;
use std::env;
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_FORECAST_URL: &str = "https://api.open-meteo.com/v1/forecast";
pub const DEFAULT_ARCHIVE_URL: &str = "https://archive-api.open-meteo.com/v1/archive";
pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 3600;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("INFLUXDB_HOST or INFLUXDB_ORG or INFLUXDB_BUCKET not defined!")]
    MissingStorage,

    #[error("{0} not defined")]
    Missing(&'static str),

    #[error("Invalid {name}: '{value}'")]
    Invalid { name: &'static str, value: String },
}

#[derive(Debug, Clone)]
pub struct DaemonConfig {
    /// Value of the `system` tag on every record
    pub system_name: String,

    /// Measurement records are written to
    pub measurement: String,

    pub open_meteo: OpenMeteoSettings,

    pub influx: InfluxSettings,

    /// Run the archive backfill once at startup
    pub check_old_data: bool,

    /// Oldest date the backfill should reach
    pub oldest_date: Option<NaiveDate>,

    pub poll_interval: Duration,
}

/// `true`/`1` in any case; anything else is false
fn parse_flag(value: Option<String>) -> bool {
    value
        .map(|v| matches!(v.to_lowercase().as_str(), "true" | "1"))
        .unwrap_or(false)
}

/// `VERBOSE` is read on its own so logging starts before the rest is validated
pub fn verbose_from_env() -> bool {
    parse_flag(env::var("VERBOSE").ok())
}

impl DaemonConfig {
    /// Load configuration from the process environment
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration through `lookup`; blank values count as unset
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let require = |key: &'static str| get(key).ok_or(ConfigError::Missing(key));

        let (host, org, bucket) = match (
            get("INFLUXDB_HOST"),
            get("INFLUXDB_ORG"),
            get("INFLUXDB_BUCKET"),
        ) {
            (Some(host), Some(org), Some(bucket)) => (host, org, bucket),
            _ => return Err(ConfigError::MissingStorage),
        };
        let port = get("INFLUXDB_PORT").unwrap_or_else(|| "8086".to_string());
        let token = get("INFLUXDB_TOKEN").unwrap_or_default();

        let open_meteo = OpenMeteoSettings {
            forecast_url: get("OPEN_METEO_BASE_URL_FORECAST")
                .unwrap_or_else(|| DEFAULT_FORECAST_URL.to_string()),
            archive_url: get("OPEN_METEO_BASE_URL_ARCHIVE")
                .unwrap_or_else(|| DEFAULT_ARCHIVE_URL.to_string()),
            latitude: require("OPEN_METEO_LATITUDE")?,
            longitude: require("OPEN_METEO_LONGITUDE")?,
            timezone: get("OPEN_METEO_TIMEZONE"),
        };

        let measurement = require("OPEN_METEO_INFLUXDB_MEASUREMENT")?;
        let system_name = get("SYSTEM_NAME").unwrap_or_else(|| "no_system".to_string());

        let check_old_data = parse_flag(get("OPEN_METEO_CHECK_OLD_DATA"));
        let oldest_date = get("OPEN_METEO_CHECK_OLDEST_DATE")
            .map(|v| {
                NaiveDate::parse_from_str(v.trim(), "%Y-%m-%d").map_err(|_| {
                    ConfigError::Invalid {
                        name: "OPEN_METEO_CHECK_OLDEST_DATE",
                        value: v,
                    }
                })
            })
            .transpose()?;
        if check_old_data && oldest_date.is_none() {
            return Err(ConfigError::Missing("OPEN_METEO_CHECK_OLDEST_DATE"));
        }

        let poll_secs = match get("OPEN_METEO_POLL_INTERVAL_SECS") {
            None => DEFAULT_POLL_INTERVAL_SECS,
            Some(v) => {
                let parsed = v.trim().parse::<u64>();
                match parsed {
                    Ok(secs) if secs > 0 => secs,
                    _ => {
                        return Err(ConfigError::Invalid {
                            name: "OPEN_METEO_POLL_INTERVAL_SECS",
                            value: v,
                        })
                    }
                }
            }
        };

        Ok(Self {
            system_name,
            measurement,
            open_meteo,
            influx: InfluxSettings::from_host_port(&host, &port, org, bucket, token),
            check_old_data,
            oldest_date,
            poll_interval: Duration::from_secs(poll_secs),
        })
    }

    /// Floor date when the startup backfill is enabled
    pub fn backfill_floor(&self) -> Option<NaiveDate> {
        if self.check_old_data {
            self.oldest_date
        } else {
            None
        }
    }
}
