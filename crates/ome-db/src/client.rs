//! InfluxDB HTTP client and connection settings

use reqwest::{Client, RequestBuilder};
use std::fmt;
use tracing::{info, warn};
use url::Url;

use crate::{DbError, DbResult};

/// Connection parameters for an InfluxDB v2 instance
#[derive(Clone)]
pub struct InfluxSettings {
    /// Scheme, host and port, e.g. `http://localhost:8086`
    pub url: String,
    pub org: String,
    pub bucket: String,

    /// API token; sent only when non-empty
    pub token: String,
}

impl fmt::Debug for InfluxSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InfluxSettings")
            .field("url", &self.url)
            .field("org", &self.org)
            .field("bucket", &self.bucket)
            .field("token", &if self.token.is_empty() { "" } else { "<redacted>" })
            .finish()
    }
}

impl InfluxSettings {
    /// Build settings from a host (with scheme) and a separate port
    pub fn from_host_port(
        host: &str,
        port: &str,
        org: impl Into<String>,
        bucket: impl Into<String>,
        token: impl Into<String>,
    ) -> Self {
        Self {
            url: format!("{}:{}", host, port),
            org: org.into(),
            bucket: bucket.into(),
            token: token.into(),
        }
    }
}

/// InfluxDB client wrapping a reusable HTTP connection pool
#[derive(Clone)]
pub struct InfluxClient {
    pub(crate) client: Client,
    base_url: Url,
    pub(crate) org: String,
    pub(crate) bucket: String,
    token: String,
}

impl InfluxClient {
    pub fn new(settings: InfluxSettings) -> DbResult<Self> {
        if settings.org.is_empty() || settings.bucket.is_empty() {
            return Err(DbError::ConfigError("org and bucket must be set".into()));
        }

        // Trailing slash so relative joins keep any path prefix
        let mut base = settings.url;
        if !base.ends_with('/') {
            base.push('/');
        }
        let base_url = Url::parse(&base)?;
        if !matches!(base_url.scheme(), "http" | "https") {
            return Err(DbError::ConfigError(format!(
                "InfluxDB URL needs an http(s) scheme: {}",
                base_url
            )));
        }

        let client = Client::builder()
            .build()
            .map_err(|source| DbError::Http {
                operation: "client setup",
                source,
            })?;

        Ok(Self {
            client,
            base_url,
            org: settings.org,
            bucket: settings.bucket,
            token: settings.token,
        })
    }

    pub(crate) fn endpoint(&self, path: &str, query: &[(&str, &str)]) -> DbResult<Url> {
        let mut url = self.base_url.join(path)?;
        if !query.is_empty() {
            url.query_pairs_mut().extend_pairs(query);
        }
        Ok(url)
    }

    pub(crate) fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        if self.token.is_empty() {
            request
        } else {
            request.header("Authorization", format!("Token {}", self.token))
        }
    }

    /// Check the server's `/health` endpoint
    pub async fn health(&self) -> DbResult<()> {
        let url = self.endpoint("health", &[])?;
        let resp = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|source| DbError::Http {
                operation: "health",
                source,
            })?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(DbError::Status {
                operation: "health",
                status,
                body,
            });
        }
        Ok(())
    }

    /// Log the outcome of a health check without failing
    pub async fn log_health(&self) {
        match self.health().await {
            Ok(()) => info!(url = %self.base_url, "InfluxDB health check passed"),
            Err(e) => warn!(url = %self.base_url, error = %e, "InfluxDB health check failed"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings(url: &str) -> InfluxSettings {
        InfluxSettings {
            url: url.into(),
            org: "home".into(),
            bucket: "weather".into(),
            token: String::new(),
        }
    }

    #[test]
    fn test_host_and_port_are_joined() {
        let s = InfluxSettings::from_host_port("http://influx", "8086", "o", "b", "t");
        assert_eq!(s.url, "http://influx:8086");
    }

    #[test]
    fn test_debug_hides_token() {
        let s = InfluxSettings::from_host_port("http://influx", "8086", "o", "b", "s3cr3t");
        let printed = format!("{:?}", s);
        assert!(!printed.contains("s3cr3t"));
        assert!(printed.contains("<redacted>"));
    }

    #[test]
    fn test_endpoint_keeps_path_prefix() {
        let client = InfluxClient::new(settings("http://proxy:80/influx")).unwrap();
        let url = client
            .endpoint("api/v2/write", &[("org", "home"), ("bucket", "weather")])
            .unwrap();
        assert_eq!(
            url.as_str(),
            "http://proxy/influx/api/v2/write?org=home&bucket=weather"
        );
    }

    #[test]
    fn test_missing_bucket_is_rejected() {
        let mut s = settings("http://localhost:8086");
        s.bucket.clear();
        assert!(matches!(InfluxClient::new(s), Err(DbError::ConfigError(_))));
    }

    #[test]
    fn test_host_without_scheme_is_rejected() {
        let s = InfluxSettings::from_host_port("localhost", "8086", "o", "b", "");
        assert!(InfluxClient::new(s).is_err());
    }
}
