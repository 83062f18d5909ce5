//! Write and query operations against InfluxDB

use chrono::{DateTime, Utc};
use ome_core::{RecordSink, RecordStore, TimeSeriesRecord};
use tracing::{debug, instrument};

use crate::{encode_record, DbError, DbResult, InfluxClient};

/// Quote a value as a Flux string literal
fn flux_string(value: &str) -> String {
    format!("\"{}\"", value.replace('\\', "\\\\").replace('"', "\\\""))
}

/// Flux query returning the oldest point for a measurement and system tag
pub fn earliest_record_query(bucket: &str, measurement: &str, system: &str) -> String {
    format!(
        "from(bucket: {})\n  \
         |> range(start: 0)\n  \
         |> filter(fn: (r) => r._measurement == {} and r.system == {})\n  \
         |> group()\n  \
         |> sort(columns: [\"_time\"], desc: false)\n  \
         |> limit(n: 1)",
        flux_string(bucket),
        flux_string(measurement),
        flux_string(system)
    )
}

/// Smallest `_time` value in an InfluxDB CSV query answer
///
/// Each table in the answer has its own header row (`,result,table,...`
/// or `,error,reference` for a failed query); annotation rows are skipped.
pub fn parse_earliest_time(body: &str) -> DbResult<Option<DateTime<Utc>>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .comment(Some(b'#'))
        .flexible(true)
        .from_reader(body.as_bytes());

    let mut time_column: Option<usize> = None;
    let mut earliest: Option<DateTime<Utc>> = None;

    for row in reader.records() {
        let row = row?;
        if row.iter().all(str::is_empty) {
            continue;
        }
        if matches!(row.get(1), Some("result" | "error")) {
            time_column = row.iter().position(|cell| cell == "_time");
            continue;
        }

        let Some(value) = time_column.and_then(|idx| row.get(idx)) else {
            continue;
        };
        let time = DateTime::parse_from_rfc3339(value)
            .map_err(|source| DbError::InvalidTime {
                value: value.to_string(),
                source,
            })?
            .with_timezone(&Utc);

        earliest = Some(earliest.map_or(time, |e| e.min(time)));
    }

    Ok(earliest)
}

impl InfluxClient {
    /// Write records as one line-protocol request
    ///
    /// Records whose fields are all null are skipped. Returns the number of
    /// lines sent; nothing is sent when that number is zero.
    #[instrument(skip(self, records), fields(records = records.len()))]
    pub async fn write_records(&self, records: &[TimeSeriesRecord]) -> DbResult<usize> {
        let mut lines = Vec::with_capacity(records.len());
        for record in records {
            match encode_record(record)? {
                Some(line) => lines.push(line),
                None => debug!(time = %record.time, "skipping record without values"),
            }
        }

        if lines.is_empty() {
            debug!("nothing to write");
            return Ok(0);
        }

        let url = self.endpoint(
            "api/v2/write",
            &[
                ("org", self.org.as_str()),
                ("bucket", self.bucket.as_str()),
                ("precision", "s"),
            ],
        )?;

        let resp = self
            .authorize(self.client.post(url))
            .header("Content-Type", "text/plain; charset=utf-8")
            .body(lines.join("\n"))
            .send()
            .await
            .map_err(|source| DbError::Http {
                operation: "write",
                source,
            })?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(DbError::Status {
                operation: "write",
                status,
                body,
            });
        }

        debug!(lines = lines.len(), "wrote records");
        Ok(lines.len())
    }

    /// Time of the oldest stored point for a measurement and system tag
    #[instrument(skip(self))]
    pub async fn query_earliest_time(
        &self,
        measurement: &str,
        system: &str,
    ) -> DbResult<Option<DateTime<Utc>>> {
        let url = self.endpoint("api/v2/query", &[("org", self.org.as_str())])?;
        let flux = earliest_record_query(&self.bucket, measurement, system);

        let resp = self
            .authorize(self.client.post(url))
            .header("Content-Type", "application/vnd.flux")
            .header("Accept", "application/csv")
            .body(flux)
            .send()
            .await
            .map_err(|source| DbError::Http {
                operation: "query",
                source,
            })?;

        let status = resp.status();
        let body = resp.text().await.map_err(|source| DbError::Http {
            operation: "query",
            source,
        })?;
        if !status.is_success() {
            return Err(DbError::Status {
                operation: "query",
                status,
                body,
            });
        }

        let earliest = parse_earliest_time(&body)?;
        debug!(?earliest, "earliest stored record");
        Ok(earliest)
    }
}

#[async_trait::async_trait]
impl RecordSink for InfluxClient {
    async fn write(&self, records: &[TimeSeriesRecord]) -> anyhow::Result<()> {
        self.write_records(records).await?;
        Ok(())
    }
}

#[async_trait::async_trait]
impl RecordStore for InfluxClient {
    async fn earliest_time(
        &self,
        measurement: &str,
        system: &str,
    ) -> anyhow::Result<Option<DateTime<Utc>>> {
        Ok(self.query_earliest_time(measurement, system).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::InfluxSettings;
    use axum::{
        extract::{Query, State},
        http::{HeaderMap, StatusCode},
        routing::post,
        Router,
    };
    use chrono::TimeZone;
    use ome_core::{FieldValue, HourlyValues, RecordTags};
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};
    use tokio::net::TcpListener;

    #[derive(Debug, Clone)]
    struct Captured {
        query: HashMap<String, String>,
        authorization: Option<String>,
        content_type: Option<String>,
        body: String,
    }

    #[derive(Clone, Default)]
    struct FakeInflux {
        requests: Arc<Mutex<Vec<Captured>>>,
        query_answer: Arc<Mutex<String>>,
        reject_writes: bool,
    }

    fn capture(query: HashMap<String, String>, headers: &HeaderMap, body: String) -> Captured {
        let header = |name: &str| {
            headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string)
        };
        Captured {
            query,
            authorization: header("authorization"),
            content_type: header("content-type"),
            body,
        }
    }

    async fn write(
        State(fake): State<FakeInflux>,
        Query(query): Query<HashMap<String, String>>,
        headers: HeaderMap,
        body: String,
    ) -> (StatusCode, String) {
        fake.requests
            .lock()
            .unwrap()
            .push(capture(query, &headers, body));
        if fake.reject_writes {
            (StatusCode::UNAUTHORIZED, "unauthorized access".into())
        } else {
            (StatusCode::NO_CONTENT, String::new())
        }
    }

    async fn query(
        State(fake): State<FakeInflux>,
        Query(query): Query<HashMap<String, String>>,
        headers: HeaderMap,
        body: String,
    ) -> String {
        fake.requests
            .lock()
            .unwrap()
            .push(capture(query, &headers, body));
        fake.query_answer.lock().unwrap().clone()
    }

    async fn serve(fake: FakeInflux) -> InfluxClient {
        let app = Router::new()
            .route("/api/v2/write", post(write))
            .route("/api/v2/query", post(query))
            .with_state(fake);

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        InfluxClient::new(InfluxSettings::from_host_port(
            "http://127.0.0.1",
            &addr.port().to_string(),
            "home",
            "weather",
            "secret-token",
        ))
        .unwrap()
    }

    fn record(time: &str, cloud: FieldValue) -> TimeSeriesRecord {
        TimeSeriesRecord {
            measurement: "open_meteo".into(),
            tags: RecordTags {
                system: "roof".into(),
            },
            time: time.into(),
            fields: HourlyValues {
                cloud_cover: cloud,
                direct_radiation: FieldValue::Null,
                diffuse_radiation: FieldValue::Null,
            },
        }
    }

    #[test]
    fn test_earliest_record_query_text() {
        insta::assert_snapshot!(earliest_record_query("weather", "open_meteo", "roof \"west\""), @r#"
        from(bucket: "weather")
          |> range(start: 0)
          |> filter(fn: (r) => r._measurement == "open_meteo" and r.system == "roof \"west\"")
          |> group()
          |> sort(columns: ["_time"], desc: false)
          |> limit(n: 1)
        "#);
    }

    #[test]
    fn test_parse_earliest_time_single_table() {
        let csv = ",result,table,_start,_stop,_time,_value,_field,_measurement,system\r\n\
                   ,_result,0,1970-01-01T00:00:00Z,2024-10-09T10:00:00Z,2023-05-01T00:00:00Z,80,cloud_cover,open_meteo,roof\r\n\
                   \r\n";

        let earliest = parse_earliest_time(csv).unwrap();

        assert_eq!(earliest, Some(Utc.with_ymd_and_hms(2023, 5, 1, 0, 0, 0).unwrap()));
    }

    #[test]
    fn test_parse_earliest_time_takes_minimum_across_tables() {
        let csv = "#datatype,string,long,dateTime:RFC3339\n\
                   ,result,table,_time\n\
                   ,_result,0,2023-06-01T10:00:00Z\n\
                   \n\
                   ,result,table,_time\n\
                   ,_result,1,2023-06-01T09:00:00Z\n";

        let earliest = parse_earliest_time(csv).unwrap();

        assert_eq!(earliest, Some(Utc.with_ymd_and_hms(2023, 6, 1, 9, 0, 0).unwrap()));
    }

    #[test]
    fn test_parse_earliest_time_quoted_cell_keeps_columns() {
        let csv = ",result,table,_time,_value\r\n\
                   ,\"daily,roof\",0,2023-05-01T00:00:00Z,80\r\n";

        let earliest = parse_earliest_time(csv).unwrap();

        assert_eq!(earliest, Some(Utc.with_ymd_and_hms(2023, 5, 1, 0, 0, 0).unwrap()));
    }

    #[test]
    fn test_parse_earliest_time_error_table_has_no_time() {
        let csv = ",result,table,_time\n\
                   ,_result,0,2023-06-01T10:00:00Z\n\
                   \n\
                   ,error,reference\n\
                   ,\"bucket \"\"weather\"\" not found\",\n";

        let earliest = parse_earliest_time(csv).unwrap();

        assert_eq!(earliest, Some(Utc.with_ymd_and_hms(2023, 6, 1, 10, 0, 0).unwrap()));
    }

    #[test]
    fn test_parse_earliest_time_bad_time_is_an_error() {
        let csv = ",result,table,_time\n,_result,0,yesterday\n";

        assert!(matches!(
            parse_earliest_time(csv),
            Err(DbError::InvalidTime { ref value, .. }) if value == "yesterday"
        ));
    }

    #[test]
    fn test_parse_earliest_time_empty_answer() {
        assert_eq!(parse_earliest_time("").unwrap(), None);
        assert_eq!(parse_earliest_time("\r\n").unwrap(), None);
    }

    #[tokio::test]
    async fn test_write_records_sends_line_protocol() {
        let fake = FakeInflux::default();
        let client = serve(fake.clone()).await;

        let records = vec![
            record("2024-01-01T00:00:00Z", FieldValue::Integer(80)),
            record("2024-01-01T01:00:00Z", FieldValue::Null),
            record("2024-01-01T02:00:00Z", FieldValue::Integer(90)),
        ];
        let written = client.write_records(&records).await.unwrap();

        assert_eq!(written, 2);
        let requests = fake.requests.lock().unwrap();
        assert_eq!(requests.len(), 1);
        let req = &requests[0];
        assert_eq!(req.query["org"], "home");
        assert_eq!(req.query["bucket"], "weather");
        assert_eq!(req.query["precision"], "s");
        assert_eq!(req.authorization.as_deref(), Some("Token secret-token"));
        insta::assert_snapshot!(req.body.as_str(), @r"
        open_meteo,system=roof cloud_cover=80i 1704067200
        open_meteo,system=roof cloud_cover=90i 1704074400
        ");
    }

    #[tokio::test]
    async fn test_empty_write_sends_nothing() {
        let fake = FakeInflux::default();
        let client = serve(fake.clone()).await;

        assert_eq!(client.write_records(&[]).await.unwrap(), 0);
        assert!(fake.requests.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_rejected_write_is_an_error() {
        let fake = FakeInflux {
            reject_writes: true,
            ..Default::default()
        };
        let client = serve(fake).await;

        let err = client
            .write_records(&[record("2024-01-01T00:00:00Z", FieldValue::Integer(1))])
            .await
            .unwrap_err();

        match err {
            DbError::Status { status, body, .. } => {
                assert_eq!(status, StatusCode::UNAUTHORIZED);
                assert_eq!(body, "unauthorized access");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_earliest_time_round_trip() {
        let fake = FakeInflux::default();
        *fake.query_answer.lock().unwrap() = ",result,table,_time,_value\r\n\
             ,_result,0,2022-12-31T23:00:00Z,12\r\n"
            .to_string();
        let client = serve(fake.clone()).await;

        let earliest = client.earliest_time("open_meteo", "roof").await.unwrap();

        assert_eq!(earliest, Some(Utc.with_ymd_and_hms(2022, 12, 31, 23, 0, 0).unwrap()));
        let requests = fake.requests.lock().unwrap();
        assert_eq!(requests[0].query["org"], "home");
        assert_eq!(requests[0].content_type.as_deref(), Some("application/vnd.flux"));
        assert!(requests[0].body.contains("r._measurement == \"open_meteo\""));
        assert!(requests[0].body.contains("r.system == \"roof\""));
    }

    #[tokio::test]
    async fn test_earliest_time_of_empty_bucket() {
        let fake = FakeInflux::default();
        let client = serve(fake).await;

        assert_eq!(client.earliest_time("open_meteo", "roof").await.unwrap(), None);
    }
}
