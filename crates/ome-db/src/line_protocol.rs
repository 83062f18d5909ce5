//! Line protocol encoding for time-series records
//!
//! `<measurement>,system=<tag> cloud_cover=80i,direct_radiation=0 <epoch-seconds>`

use chrono::DateTime;
use ome_core::{FieldValue, TimeSeriesRecord};

use crate::{DbError, DbResult};

/// Escape a measurement name (commas and spaces)
pub fn escape_measurement(value: &str) -> String {
    escape(value, &[',', ' '])
}

/// Escape a tag key, tag value, or field key (commas, equals signs, spaces)
pub fn escape_key(value: &str) -> String {
    escape(value, &[',', '=', ' '])
}

fn escape(value: &str, special: &[char]) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        if c == '\\' || special.contains(&c) {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

fn encode_field(value: FieldValue) -> Option<String> {
    match value {
        FieldValue::Integer(i) => Some(format!("{}i", i)),
        FieldValue::Float(f) => Some(f.to_string()),
        FieldValue::Null => None,
    }
}

/// Encode one record, or `None` when every field is null
///
/// Null fields are left out of the line. The record time is written with
/// second precision, so the write must use `precision=s`.
pub fn encode_record(record: &TimeSeriesRecord) -> DbResult<Option<String>> {
    let fields: Vec<String> = record
        .fields
        .fields()
        .into_iter()
        .filter_map(|(key, value)| encode_field(value).map(|v| format!("{}={}", escape_key(key), v)))
        .collect();

    if fields.is_empty() {
        return Ok(None);
    }

    let time = DateTime::parse_from_rfc3339(&record.time).map_err(|source| {
        DbError::InvalidTime {
            value: record.time.clone(),
            source,
        }
    })?;

    Ok(Some(format!(
        "{},system={} {} {}",
        escape_measurement(&record.measurement),
        escape_key(&record.tags.system),
        fields.join(","),
        time.timestamp()
    )))
}
