//! Runtime configuration from environment.

use std::env;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, Result};
use risk_core::RiskThresholds;

use crate::backoff::RetryPolicy;

pub const DEFAULT_ELEVATION_URL: &str = "https://epqs.nationalmap.gov/v1/json";

#[derive(Debug, Clone)]
pub struct Config {
    pub elevation_url: String,
    pub elevation_max_attempts: u32,
    pub elevation_backoff_base_ms: u64,
    pub elevation_backoff_max_ms: u64,
    pub elevation_timeout_s: u64,
    /// Bound on concurrent elevation lookups, independent of point count.
    pub max_concurrent_lookups: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            elevation_url: DEFAULT_ELEVATION_URL.to_string(),
            elevation_max_attempts: 5,
            elevation_backoff_base_ms: 250,
            elevation_backoff_max_ms: 4_000,
            elevation_timeout_s: 10,
            max_concurrent_lookups: 16,
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            elevation_url: env::var("RISK_ELEVATION_URL")
                .ok()
                .filter(|s| !s.trim().is_empty())
                .unwrap_or(defaults.elevation_url),
            elevation_max_attempts: parse_or(
                env::var("RISK_ELEVATION_MAX_ATTEMPTS").ok(),
                defaults.elevation_max_attempts,
            ),
            elevation_backoff_base_ms: parse_or(
                env::var("RISK_ELEVATION_BACKOFF_BASE_MS").ok(),
                defaults.elevation_backoff_base_ms,
            ),
            elevation_backoff_max_ms: parse_or(
                env::var("RISK_ELEVATION_BACKOFF_MAX_MS").ok(),
                defaults.elevation_backoff_max_ms,
            ),
            elevation_timeout_s: parse_or(
                env::var("RISK_ELEVATION_TIMEOUT_S").ok(),
                defaults.elevation_timeout_s,
            ),
            max_concurrent_lookups: parse_or(
                env::var("RISK_MAX_CONCURRENT_LOOKUPS").ok(),
                defaults.max_concurrent_lookups,
            ),
        }
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(
            self.elevation_max_attempts,
            Duration::from_millis(self.elevation_backoff_base_ms),
            Duration::from_millis(self.elevation_backoff_max_ms),
        )
    }

    pub fn elevation_timeout(&self) -> Duration {
        Duration::from_secs(self.elevation_timeout_s.max(1))
    }
}

/// Rule thresholds from a JSON file; missing fields keep their defaults.
pub async fn load_thresholds(path: Option<&Path>) -> Result<RiskThresholds> {
    let Some(path) = path else {
        return Ok(RiskThresholds::default());
    };
    let text = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("failed to read {}", path.display()))?;
    parse_thresholds(&text).with_context(|| format!("failed to parse {}", path.display()))
}

pub fn parse_thresholds(text: &str) -> Result<RiskThresholds> {
    Ok(serde_json::from_str(text)?)
}

fn parse_or<T: FromStr>(value: Option<String>, default: T) -> T {
    value
        .and_then(|s| s.trim().parse().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_or_falls_back_on_garbage() {
        assert_eq!(parse_or(Some(" 8 ".to_string()), 3u32), 8);
        assert_eq!(parse_or(Some("eight".to_string()), 3u32), 3);
        assert_eq!(parse_or::<u32>(None, 3), 3);
    }

    #[test]
    fn retry_policy_reflects_config() {
        let config = Config {
            elevation_max_attempts: 2,
            elevation_backoff_base_ms: 50,
            elevation_backoff_max_ms: 100,
            ..Config::default()
        };
        let policy = config.retry_policy();
        assert_eq!(policy.max_attempts, 2);
        assert_eq!(policy.base_delay, Duration::from_millis(50));
        assert_eq!(policy.max_delay, Duration::from_millis(100));
    }

    #[test]
    fn partial_thresholds_keep_defaults() {
        let rules = parse_thresholds(r#"{"altitude_limit_ft": 400, "medium_allowed_classes": ["C", "D"]}"#)
            .unwrap();
        assert_eq!(rules.altitude_limit_ft, 400.0);
        assert_eq!(rules.urban_density, 100.0);
        assert_eq!(rules.medium_allowed_classes.len(), 2);
        assert!(parse_thresholds(r#"{"medium_allowed_classes": ["Z"]}"#).is_err());
    }

    #[tokio::test]
    async fn missing_thresholds_file_means_defaults() {
        let rules = load_thresholds(None).await.unwrap();
        assert_eq!(rules.aerodrome_radius_nm, 5.0);
    }
}
