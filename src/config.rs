//! Configuration types.

use std::time::Duration;

use crate::error::ConfigError;

/// Default backend base URL.
pub const DEFAULT_API_URL: &str = "http://localhost:5001";

const DELAY_SCALE_KEY: &str = "PARASARA_DELAY_SCALE";

/// Delays between dependent stage transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlowDelays {
    /// Birth-details confirmation → basic prompt.
    pub confirmation_to_analysis: Duration,
    /// Chart analysis received → topic selection.
    pub analysis_to_topics: Duration,
    /// Fallback chart analysis → topic selection.
    pub fallback_to_topics: Duration,
    /// Reply received → topic choices shown again.
    pub topics_reexpose: Duration,
}

impl Default for FlowDelays {
    fn default() -> Self {
        Self {
            confirmation_to_analysis: Duration::from_millis(1500),
            analysis_to_topics: Duration::from_millis(3000),
            fallback_to_topics: Duration::from_millis(2000),
            topics_reexpose: Duration::from_millis(1000),
        }
    }
}

impl FlowDelays {
    /// Multiply every delay by `factor`. Zero disables the pauses.
    ///
    /// Fails when `factor` is negative, not finite, or pushes a delay past
    /// what `Duration` can hold.
    pub fn scaled(self, factor: f64) -> Result<Self, ConfigError> {
        let scale = |d: Duration| {
            Duration::try_from_secs_f64(d.as_secs_f64() * factor).map_err(|e| {
                ConfigError::InvalidValue {
                    key: DELAY_SCALE_KEY.into(),
                    message: format!("cannot scale delays by {factor}: {e}"),
                }
            })
        };
        Ok(Self {
            confirmation_to_analysis: scale(self.confirmation_to_analysis)?,
            analysis_to_topics: scale(self.analysis_to_topics)?,
            fallback_to_topics: scale(self.fallback_to_topics)?,
            topics_reexpose: scale(self.topics_reexpose)?,
        })
    }
}

/// Client configuration.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Backend base URL, without trailing slash.
    pub api_base_url: String,
    /// Per-request timeout.
    pub request_timeout: Duration,
    /// Stage-transition delays.
    pub delays: FlowDelays,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_URL.to_string(),
            request_timeout: Duration::from_secs(60),
            delays: FlowDelays::default(),
        }
    }
}

impl ClientConfig {
    /// Build from `PARASARA_*` environment variables, defaulting anything unset.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let api_base_url = lookup("PARASARA_API_URL")
            .map(|s| s.trim().trim_end_matches('/').to_string())
            .filter(|s| !s.is_empty())
            .unwrap_or(defaults.api_base_url);

        let request_timeout = match lookup("PARASARA_REQUEST_TIMEOUT_SECS") {
            Some(raw) => {
                let secs: u64 = raw.trim().parse().map_err(|_| ConfigError::InvalidValue {
                    key: "PARASARA_REQUEST_TIMEOUT_SECS".into(),
                    message: format!("expected whole seconds, got {raw:?}"),
                })?;
                Duration::from_secs(secs)
            }
            None => defaults.request_timeout,
        };

        let delays = match lookup(DELAY_SCALE_KEY) {
            Some(raw) => {
                let factor: f64 = raw
                    .trim()
                    .parse()
                    .ok()
                    .filter(|f: &f64| f.is_finite() && *f >= 0.0)
                    .ok_or_else(|| ConfigError::InvalidValue {
                        key: DELAY_SCALE_KEY.into(),
                        message: format!("expected a non-negative number, got {raw:?}"),
                    })?;
                defaults.delays.scaled(factor)?
            }
            None => defaults.delays,
        };

        Ok(Self {
            api_base_url,
            request_timeout,
            delays,
        })
    }
}
