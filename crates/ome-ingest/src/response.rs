//! Open-Meteo JSON response body

use ome_core::{FieldValue, HourlyValues, WeatherSample};
use serde::Deserialize;

use crate::{IngestError, IngestResult};

/// Top-level forecast/archive response; only `hourly` is used
#[derive(Debug, Clone, Deserialize)]
pub struct HourlyResponse {
    pub hourly: HourlyBlock,
}

/// Parallel arrays, one entry per hour
#[derive(Debug, Clone, Deserialize)]
pub struct HourlyBlock {
    pub time: Vec<String>,
    pub cloud_cover: Vec<FieldValue>,
    pub direct_radiation: Vec<FieldValue>,
    pub diffuse_radiation: Vec<FieldValue>,
}

impl HourlyResponse {
    /// Zip the parallel arrays into samples
    pub fn into_samples(self) -> IngestResult<Vec<WeatherSample>> {
        let HourlyBlock {
            time,
            cloud_cover,
            direct_radiation,
            diffuse_radiation,
        } = self.hourly;

        let len = time.len();
        if cloud_cover.len() != len || direct_radiation.len() != len || diffuse_radiation.len() != len
        {
            return Err(IngestError::MisalignedArrays {
                time: len,
                cloud_cover: cloud_cover.len(),
                direct_radiation: direct_radiation.len(),
                diffuse_radiation: diffuse_radiation.len(),
            });
        }

        let samples = time
            .into_iter()
            .zip(cloud_cover)
            .zip(direct_radiation.into_iter().zip(diffuse_radiation))
            .map(
                |((timestamp, cloud_cover), (direct_radiation, diffuse_radiation))| WeatherSample {
                    timestamp,
                    values: HourlyValues {
                        cloud_cover,
                        direct_radiation,
                        diffuse_radiation,
                    },
                },
            )
            .collect();

        Ok(samples)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_forecast_body() {
        let json = r#"{
            "latitude": 51.54,
            "longitude": 7.69,
            "timezone": "Europe/Berlin",
            "hourly_units": {"time": "iso8601", "cloud_cover": "%"},
            "hourly": {
                "time": ["2024-01-01T00:00", "2024-01-01T01:00"],
                "cloud_cover": [80, 90],
                "direct_radiation": [0.0, 12.5],
                "diffuse_radiation": [0.0, null]
            }
        }"#;

        let response: HourlyResponse = serde_json::from_str(json).unwrap();
        let samples = response.into_samples().unwrap();

        assert_eq!(samples.len(), 2);
        assert_eq!(samples[0].timestamp, "2024-01-01T00:00");
        assert_eq!(samples[0].values.cloud_cover, FieldValue::Integer(80));
        assert_eq!(samples[1].values.direct_radiation, FieldValue::Float(12.5));
        assert_eq!(samples[1].values.diffuse_radiation, FieldValue::Null);
    }

    #[test]
    fn test_missing_array_is_a_shape_error() {
        let json = r#"{"hourly": {"time": ["2024-01-01T00:00"], "cloud_cover": [1]}}"#;
        assert!(serde_json::from_str::<HourlyResponse>(json).is_err());
    }

    #[test]
    fn test_misaligned_arrays_are_rejected() {
        let json = r#"{"hourly": {
            "time": ["2024-01-01T00:00", "2024-01-01T01:00"],
            "cloud_cover": [1, 2],
            "direct_radiation": [0],
            "diffuse_radiation": [0, 0]
        }}"#;

        let err = serde_json::from_str::<HourlyResponse>(json)
            .unwrap()
            .into_samples()
            .unwrap_err();

        assert!(matches!(
            err,
            IngestError::MisalignedArrays {
                time: 2,
                direct_radiation: 1,
                ..
            }
        ));
    }

    #[test]
    fn test_empty_arrays_give_no_samples() {
        let json = r#"{"hourly": {"time": [], "cloud_cover": [], "direct_radiation": [], "diffuse_radiation": []}}"#;
        let samples = serde_json::from_str::<HourlyResponse>(json)
            .unwrap()
            .into_samples()
            .unwrap();
        assert!(samples.is_empty());
    }
}
