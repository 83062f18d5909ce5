//! HTTP client for the forecast and archive endpoints

use chrono::NaiveDate;
use ome_core::{WeatherSample, WeatherSource, HOURLY_VARIABLES};
use reqwest::Client;
use tracing::{debug, error, info, instrument};

use crate::{HourlyResponse, IngestError, IngestResult};

/// Where and what to ask Open-Meteo for
#[derive(Debug, Clone)]
pub struct OpenMeteoSettings {
    pub forecast_url: String,
    pub archive_url: String,

    /// Passed through verbatim
    pub latitude: String,
    pub longitude: String,

    /// IANA zone name; the API answers in GMT when omitted
    pub timezone: Option<String>,
}

/// Open-Meteo client
///
/// One request per call, no retries, and the transport's default timeouts.
pub struct OpenMeteoClient {
    client: Client,
    settings: OpenMeteoSettings,
}

impl OpenMeteoClient {
    pub fn new(settings: OpenMeteoSettings) -> IngestResult<Self> {
        let client = Client::builder()
            .build()
            .map_err(|source| IngestError::Http {
                url: settings.forecast_url.clone(),
                source,
            })?;
        Ok(Self { client, settings })
    }

    fn base_params(&self) -> Vec<(&'static str, String)> {
        let mut params = vec![
            ("latitude", self.settings.latitude.clone()),
            ("longitude", self.settings.longitude.clone()),
            ("hourly", HOURLY_VARIABLES.join(",")),
        ];
        if let Some(tz) = &self.settings.timezone {
            params.push(("timezone", tz.clone()));
        }
        params
    }

    /// Fetch yesterday and today from the forecast endpoint
    #[instrument(skip(self))]
    pub async fn fetch_forecast(&self) -> IngestResult<Vec<WeatherSample>> {
        let mut params = self.base_params();
        params.push(("past_days", "1".to_string()));
        params.push(("forecast_days", "1".to_string()));

        self.fetch(&self.settings.forecast_url, &params).await
    }

    /// Fetch an inclusive date range from the archive endpoint
    #[instrument(skip(self))]
    pub async fn fetch_archive(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> IngestResult<Vec<WeatherSample>> {
        let mut params = self.base_params();
        params.push(("start_date", start.format("%Y-%m-%d").to_string()));
        params.push(("end_date", end.format("%Y-%m-%d").to_string()));

        self.fetch(&self.settings.archive_url, &params).await
    }

    async fn fetch(
        &self,
        url: &str,
        params: &[(&'static str, String)],
    ) -> IngestResult<Vec<WeatherSample>> {
        let http_err = |source| IngestError::Http {
            url: url.to_string(),
            source,
        };

        let resp = self
            .client
            .get(url)
            .query(params)
            .send()
            .await
            .map_err(http_err)?;

        let status = resp.status();
        if !status.is_success() {
            // Parsing still runs; an error body fails there as a shape error
            error!(%status, url, "weather API returned an error status");
        }

        let body = resp.text().await.map_err(http_err)?;
        debug!(url, body = %body, "weather API response");

        let response: HourlyResponse =
            serde_json::from_str(&body).map_err(|source| IngestError::DataShape {
                url: url.to_string(),
                source,
            })?;
        let samples = response.into_samples()?;

        info!(url, samples = samples.len(), "fetched hourly samples");
        Ok(samples)
    }
}

#[async_trait::async_trait]
impl WeatherSource for OpenMeteoClient {
    async fn forecast(&self) -> anyhow::Result<Vec<WeatherSample>> {
        Ok(self.fetch_forecast().await?)
    }

    async fn archive(&self, start: NaiveDate, end: NaiveDate) -> anyhow::Result<Vec<WeatherSample>> {
        Ok(self.fetch_archive(start, end).await?)
    }
}
