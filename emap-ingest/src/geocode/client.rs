//! Geocoding HTTP client
//!
//! Speaks the Google Geocoding API query format (`address`, `key`,
//! optional `region`). Any transport or provider failure is logged and
//! surfaces to callers as an empty response body.

use super::GeocodeClient;
use async_trait::async_trait;
use emap_common::config::GeocodeConfig;
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::sync::Mutex;

const USER_AGENT: &str = concat!("emap-ingest/", env!("CARGO_PKG_VERSION"));

/// Internal failure kinds, flattened to "" at the trait boundary
#[derive(Debug, Error)]
pub enum GeocodeHttpError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("API error {0}: {1}")]
    Api(u16, String),

    #[error("Invalid API key")]
    InvalidApiKey,
}

/// Enforces a minimum spacing between provider requests
struct RateLimiter {
    last_request: Mutex<Option<Instant>>,
    min_interval: Duration,
}

impl RateLimiter {
    fn new(min_interval_ms: u64) -> Self {
        Self {
            last_request: Mutex::new(None),
            min_interval: Duration::from_millis(min_interval_ms),
        }
    }

    async fn wait(&self) {
        let mut last = self.last_request.lock().await;

        if let Some(last_time) = *last {
            let elapsed = last_time.elapsed();
            if elapsed < self.min_interval {
                let wait_time = self.min_interval - elapsed;
                tracing::debug!("Geocode rate limiting: waiting {:?}", wait_time);
                tokio::time::sleep(wait_time).await;
            }
        }

        *last = Some(Instant::now());
    }
}

/// reqwest-backed geocoding client
pub struct HttpGeocodeClient {
    http_client: reqwest::Client,
    rate_limiter: Arc<RateLimiter>,
    endpoint: String,
    api_key: Option<String>,
    region: Option<String>,
}

impl HttpGeocodeClient {
    /// Build a client from configuration
    ///
    /// `api_key` is the already-resolved key (database → env → TOML).
    pub fn new(config: &GeocodeConfig, api_key: Option<String>) -> Result<Self, GeocodeHttpError> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| GeocodeHttpError::Network(e.to_string()))?;

        Ok(Self {
            http_client,
            rate_limiter: Arc::new(RateLimiter::new(config.min_interval_ms)),
            endpoint: config.endpoint.clone(),
            api_key,
            region: config.region.clone(),
        })
    }

    /// Query the provider and return the raw response body
    pub async fn lookup(&self, address: &str) -> Result<String, GeocodeHttpError> {
        self.rate_limiter.wait().await;

        let mut params: Vec<(&str, &str)> = vec![("address", address)];
        if let Some(key) = self.api_key.as_deref() {
            params.push(("key", key));
        }
        if let Some(region) = self.region.as_deref() {
            params.push(("region", region));
        }

        tracing::debug!(address = %address, "Querying geocode API");

        let response = self
            .http_client
            .get(&self.endpoint)
            .query(&params)
            .send()
            .await
            .map_err(|e| GeocodeHttpError::Network(e.to_string()))?;

        let status = response.status();

        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
            return Err(GeocodeHttpError::InvalidApiKey);
        }

        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(GeocodeHttpError::Api(status.as_u16(), error_text));
        }

        response
            .text()
            .await
            .map_err(|e| GeocodeHttpError::Network(e.to_string()))
    }
}

#[async_trait]
impl GeocodeClient for HttpGeocodeClient {
    async fn resolve(&self, address: &str) -> String {
        match self.lookup(address).await {
            Ok(body) => body,
            Err(e) => {
                tracing::warn!(address = %address, error = %e, "Geocode request failed");
                String::new()
            }
        }
    }
}
