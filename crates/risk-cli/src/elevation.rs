//! HTTP client for the USGS Elevation Point Query Service.

use anyhow::{anyhow, Context, Result};
use reqwest::Client;
use risk_core::{ElevationQueryResult, ElevationSource};
use serde_json::Value;
use std::time::Duration;

use crate::backoff::RetryPolicy;
use crate::config::Config;

/// Values at or below this are the service's "no data" marker (-1,000,000).
const NO_DATA_THRESHOLD_FT: f64 = -999_999.0;

pub struct HttpElevationSource {
    client: Client,
    base_url: String,
    policy: RetryPolicy,
}

impl HttpElevationSource {
    /// `timeout` bounds each request, not the whole retry sequence.
    pub fn new(
        base_url: impl Into<String>,
        policy: RetryPolicy,
        timeout: Duration,
    ) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("failed to build elevation HTTP client")?;
        Ok(Self {
            client,
            base_url: base_url.into(),
            policy,
        })
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        Self::new(
            config.elevation_url.clone(),
            config.retry_policy(),
            config.elevation_timeout(),
        )
    }

    /// One request. `Ok(None)` means the service answered without data.
    async fn fetch_once(&self, lon: f64, lat: f64) -> Result<Option<f64>> {
        let url = build_query_url(&self.base_url, lon, lat);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .context("elevation request failed")?;

        if !response.status().is_success() {
            return Err(anyhow!("elevation service HTTP {}", response.status()));
        }

        let payload: Value = response
            .json()
            .await
            .context("elevation response is not JSON")?;
        parse_elevation(&payload)
    }
}

impl ElevationSource for HttpElevationSource {
    async fn elevation_ft(&self, lon: f64, lat: f64) -> ElevationQueryResult {
        let mut backoff = self.policy.backoff();
        for attempt in 1..=self.policy.max_attempts {
            match self.fetch_once(lon, lat).await {
                Ok(Some(feet)) => return ElevationQueryResult::from_feet(feet),
                Ok(None) => {
                    tracing::debug!("No elevation data at ({:.6}, {:.6})", lon, lat);
                    return ElevationQueryResult::Unavailable;
                }
                Err(err) if attempt < self.policy.max_attempts => {
                    let delay = backoff.fail();
                    tracing::debug!(
                        "Elevation lookup at ({:.6}, {:.6}) failed (attempt {}/{}): {:#}; retrying in {:?}",
                        lon,
                        lat,
                        attempt,
                        self.policy.max_attempts,
                        err,
                        delay
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(err) => {
                    tracing::warn!(
                        "Elevation lookup at ({:.6}, {:.6}) gave up after {} attempts: {:#}",
                        lon,
                        lat,
                        attempt,
                        err
                    );
                }
            }
        }
        ElevationQueryResult::Unavailable
    }
}

pub fn build_query_url(base: &str, lon: f64, lat: f64) -> String {
    let separator = if base.contains('?') { "&" } else { "?" };
    format!(
        "{}{}x={:.6}&y={:.6}&units=Feet&wkid=4326&includeDate=false",
        base, separator, lon, lat
    )
}

/// Extract elevation in feet from either the current (`value`) or the legacy
/// nested payload shape.
pub fn parse_elevation(payload: &Value) -> Result<Option<f64>> {
    let raw = payload.get("value").or_else(|| {
        payload
            .get("USGS_Elevation_Point_Query_Service")
            .and_then(|v| v.get("Elevation_Query"))
            .and_then(|v| v.get("Elevation"))
    });

    let feet = match raw {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
    .ok_or_else(|| anyhow!("elevation missing from response"))?;

    if !feet.is_finite() || feet <= NO_DATA_THRESHOLD_FT {
        return Ok(None);
    }
    Ok(Some(feet))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    #[test]
    fn parses_current_and_legacy_payloads() {
        assert_eq!(
            parse_elevation(&json!({"value": "312.75"})).unwrap(),
            Some(312.75)
        );
        assert_eq!(parse_elevation(&json!({"value": 88.0})).unwrap(), Some(88.0));
        let legacy = json!({
            "USGS_Elevation_Point_Query_Service": {
                "Elevation_Query": {"Elevation": 1024.5}
            }
        });
        assert_eq!(parse_elevation(&legacy).unwrap(), Some(1024.5));
    }

    #[test]
    fn no_data_marker_is_not_an_elevation() {
        assert_eq!(parse_elevation(&json!({"value": -1000000})).unwrap(), None);
        assert!(parse_elevation(&json!({"location": {}})).is_err());
    }

    #[test]
    fn query_url_appends_parameters() {
        let url = build_query_url("https://example.test/v1/json", -78.5, 35.25);
        assert_eq!(
            url,
            "https://example.test/v1/json?x=-78.500000&y=35.250000&units=Feet&wkid=4326&includeDate=false"
        );
        assert!(build_query_url("https://example.test/q?key=1", 0.0, 0.0).contains("?key=1&x="));
    }

    /// Serves canned HTTP responses in order, repeating the last one.
    async fn canned_server(responses: Vec<(u16, &'static str)>) -> (String, Arc<AtomicUsize>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = hits.clone();

        tokio::spawn(async move {
            loop {
                let Ok((mut socket, _)) = listener.accept().await else {
                    break;
                };
                let n = counter.fetch_add(1, Ordering::SeqCst);
                let (status, body) = responses[n.min(responses.len() - 1)];
                let mut buf = vec![0u8; 4096];
                let _ = socket.read(&mut buf).await;
                let reply = format!(
                    "HTTP/1.1 {} X\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                    status,
                    body.len(),
                    body
                );
                let _ = socket.write_all(reply.as_bytes()).await;
                let _ = socket.shutdown().await;
            }
        });

        (format!("http://{}/v1/json", addr), hits)
    }

    fn fast_policy(max_attempts: u32) -> RetryPolicy {
        RetryPolicy::new(
            max_attempts,
            Duration::from_millis(1),
            Duration::from_millis(5),
        )
    }

    #[test]
    fn builds_from_default_config() {
        let source = HttpElevationSource::from_config(&Config::default()).unwrap();
        assert_eq!(source.base_url, crate::config::DEFAULT_ELEVATION_URL);
        assert_eq!(source.policy.max_attempts, 5);
    }

    #[tokio::test]
    async fn retries_until_success() {
        let (url, hits) = canned_server(vec![(503, ""), (200, r#"{"value": "250.5"}"#)]).await;
        let source =
            HttpElevationSource::new(url, fast_policy(3), Duration::from_secs(5)).unwrap();

        let result = source.elevation_ft(-78.0, 35.0).await;
        assert_eq!(result, ElevationQueryResult::Available(250.5));
        assert_eq!(hits.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn exhausted_budget_is_unavailable() {
        let (url, hits) = canned_server(vec![(500, "")]).await;
        let source =
            HttpElevationSource::new(url, fast_policy(3), Duration::from_secs(5)).unwrap();

        let result = source.elevation_ft(-78.0, 35.0).await;
        assert_eq!(result, ElevationQueryResult::Unavailable);
        assert_eq!(hits.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn no_data_is_not_retried() {
        let (url, hits) = canned_server(vec![(200, r#"{"value": -1000000}"#)]).await;
        let source =
            HttpElevationSource::new(url, fast_policy(4), Duration::from_secs(5)).unwrap();

        let result = source.elevation_ft(-160.0, 10.0).await;
        assert_eq!(result, ElevationQueryResult::Unavailable);
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }
}
