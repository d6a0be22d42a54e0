//! Remote weather source.
//!
//! One operation: fetch the current weather for a fixed location. Transport
//! problems surface as [`ApiError::Http`]/[`ApiError::Status`]; a body that
//! cannot be decoded surfaces as [`ApiError::Decode`] so the repository can
//! classify it as a consistency failure rather than a provider outage.

use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;

use crate::error::ApiError;
use crate::types::RawWeather;

const MAX_ERROR_BODY: usize = 200;

/// Remote source of current weather data.
#[async_trait]
pub trait WeatherApi: Send + Sync {
    /// Fetch the current weather for the given location.
    async fn fetch_current(&self, location: &str) -> Result<RawWeather, ApiError>;
}

/// OpenWeather current-weather client.
#[derive(Debug, Clone)]
pub struct OpenWeatherApi {
    client: Client,
    base_url: String,
    api_key: String,
}

impl OpenWeatherApi {
    /// Build a client for the given endpoint.
    ///
    /// `base_url` is the full current-weather endpoint; it is injectable so
    /// tests can point it at a local server.
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, ApiError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.into(),
            api_key: api_key.into(),
        })
    }
}

#[async_trait]
impl WeatherApi for OpenWeatherApi {
    async fn fetch_current(&self, location: &str) -> Result<RawWeather, ApiError> {
        tracing::debug!(%location, "fetching current weather");

        let response = self
            .client
            .get(&self.base_url)
            .query(&[("q", location), ("appid", self.api_key.as_str())])
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(ApiError::Status {
                status: status.as_u16(),
                message: truncate_body(&body),
            });
        }

        serde_json::from_str(&body).map_err(|e| ApiError::Decode(e.to_string()))
    }
}

fn truncate_body(body: &str) -> String {
    if body.len() <= MAX_ERROR_BODY {
        body.to_string()
    } else {
        let mut end = MAX_ERROR_BODY;
        while !body.is_char_boundary(end) {
            end -= 1;
        }
        format!("{}...", &body[..end])
    }
}
