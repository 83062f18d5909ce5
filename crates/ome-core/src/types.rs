//! Core data types for hourly weather samples and stored records

use serde::{Deserialize, Serialize};

/// Hourly variables requested from Open-Meteo, in request order
pub const HOURLY_VARIABLES: [&str; 3] = ["cloud_cover", "direct_radiation", "diffuse_radiation"];

/// A numeric value as it appeared in the API response
///
/// Integers and floats are kept apart so the stored field type matches
/// what the API sent (`cloud_cover` arrives as an integer percentage).
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum FieldValue {
    Integer(i64),
    Float(f64),
    Null,
}

impl FieldValue {
    pub fn is_null(&self) -> bool {
        matches!(self, FieldValue::Null)
    }
}

/// The three values reported for one hour
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct HourlyValues {
    /// Total cloud cover (%)
    pub cloud_cover: FieldValue,

    /// Direct solar radiation (W/m²)
    pub direct_radiation: FieldValue,

    /// Diffuse solar radiation (W/m²)
    pub diffuse_radiation: FieldValue,
}

impl HourlyValues {
    /// Field name/value pairs in request order
    pub fn fields(&self) -> [(&'static str, FieldValue); 3] {
        [
            ("cloud_cover", self.cloud_cover),
            ("direct_radiation", self.direct_radiation),
            ("diffuse_radiation", self.diffuse_radiation),
        ]
    }
}

/// One hourly observation from the weather API
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WeatherSample {
    /// Civil date-time without offset, e.g. `2024-10-07T13:00`
    pub timestamp: String,

    #[serde(flatten)]
    pub values: HourlyValues,
}

/// Tag set attached to every record
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RecordTags {
    pub system: String,
}

/// A point ready to be written to the time-series store
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TimeSeriesRecord {
    pub measurement: String,
    pub tags: RecordTags,

    /// UTC instant with minute precision, e.g. `2024-10-07T13:00:00Z`
    pub time: String,

    pub fields: HourlyValues,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_value_keeps_json_number_kind() {
        let values: Vec<FieldValue> = serde_json::from_str("[80, 12.5, 0.0, null]").unwrap();

        assert_eq!(
            values,
            vec![
                FieldValue::Integer(80),
                FieldValue::Float(12.5),
                FieldValue::Float(0.0),
                FieldValue::Null,
            ]
        );
        assert!(values[3].is_null());
    }

    #[test]
    fn test_record_serializes_like_a_point_dict() {
        let record = TimeSeriesRecord {
            measurement: "open_meteo".into(),
            tags: RecordTags {
                system: "roof".into(),
            },
            time: "2024-10-07T13:00:00Z".into(),
            fields: HourlyValues {
                cloud_cover: FieldValue::Integer(80),
                direct_radiation: FieldValue::Float(120.5),
                diffuse_radiation: FieldValue::Null,
            },
        };

        insta::assert_snapshot!(
            serde_json::to_string(&record).unwrap(),
            @r#"{"measurement":"open_meteo","tags":{"system":"roof"},"time":"2024-10-07T13:00:00Z","fields":{"cloud_cover":80,"direct_radiation":120.5,"diffuse_radiation":null}}"#
        );
    }
}
