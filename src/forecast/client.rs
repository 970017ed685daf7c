//! HTTP client for the WeatherLens forecast API

use super::live::WeatherResponse;
use crate::config::ApiConfig;
use crate::models::{Coordinate, format_iso};
use crate::{Result, WeatherLensError};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::header::CONTENT_TYPE;
use reqwest_middleware::{ClientBuilder, ClientWithMiddleware};
use reqwest_retry::{RetryTransientMiddleware, policies::ExponentialBackoff};
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tracing::{debug, info, instrument};

const USER_AGENT: &str = concat!("WeatherLens/", env!("CARGO_PKG_VERSION"));

/// The remote operations the forecast service and exporter depend on
#[async_trait]
pub trait WeatherBackend: Send + Sync {
    /// Status line and body of the health endpoint
    async fn health(&self) -> Result<String>;

    async fn weather(&self, coordinate: Coordinate, datetime: DateTime<Utc>) -> Result<WeatherResponse>;

    /// Raw CSV bytes of the location's history
    async fn history_csv(&self, coordinate: Coordinate) -> Result<Vec<u8>>;

    /// Free-text question to the conversational endpoint
    async fn ask(&self, input: &str) -> Result<String>;
}

#[derive(Debug, Serialize)]
struct AskRequest<'a> {
    input: &'a str,
}

#[derive(Debug, Deserialize)]
struct AskResponse {
    #[serde(default)]
    response: String,
}

/// Forecast API client with transient-failure retries
#[derive(Debug, Clone)]
pub struct WeatherApiClient {
    client: ClientWithMiddleware,
    base_url: String,
    units: String,
}

impl WeatherApiClient {
    pub fn new(config: &ApiConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds.into()))
            .user_agent(USER_AGENT)
            .build()?;

        let retry_policy = ExponentialBackoff::builder().build_with_max_retries(config.max_retries);
        let client = ClientBuilder::new(http)
            .with(RetryTransientMiddleware::new_with_policy(retry_policy))
            .build();

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            units: config.units.clone(),
        })
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn weather_url(&self, coordinate: Coordinate, datetime: DateTime<Utc>) -> String {
        let datetime = format_iso(&datetime);
        format!(
            "{}/api/weather?latitude={}&longitude={}&datetime={}&units={}",
            self.base_url,
            coordinate.latitude,
            coordinate.longitude,
            urlencoding::encode(&datetime),
            urlencoding::encode(&self.units)
        )
    }

    fn history_url(&self, coordinate: Coordinate) -> String {
        format!(
            "{}/api/history.csv?latitude={}&longitude={}",
            self.base_url, coordinate.latitude, coordinate.longitude
        )
    }

    /// Fetch an arbitrary document as text, such as a country dataset
    #[instrument(skip(self))]
    pub async fn fetch_text(&self, url: &str) -> Result<String> {
        let response = self.get_ok(url, url).await?;
        Ok(response.text().await?)
    }

    /// Send a GET and fail on any non-success status
    async fn get_ok(&self, url: &str, endpoint: &str) -> Result<reqwest::Response> {
        debug!("GET {}", url);
        let start = Instant::now();
        let response = self.client.get(url).send().await?;
        let status = response.status();
        debug!("{} answered {} in {:?}", endpoint, status, start.elapsed());
        if !status.is_success() {
            return Err(WeatherLensError::status(status.as_u16(), endpoint));
        }
        Ok(response)
    }
}

#[async_trait]
impl WeatherBackend for WeatherApiClient {
    #[instrument(skip(self))]
    async fn health(&self) -> Result<String> {
        let url = format!("{}/api/health", self.base_url);
        let response = self.client.get(&url).send().await?;
        let status = response.status();
        let body = response.text().await?;
        Ok(format!(
            "{} {}\n{}",
            status.as_u16(),
            status.canonical_reason().unwrap_or_default(),
            body
        ))
    }

    #[instrument(skip(self), fields(lat = coordinate.latitude, lon = coordinate.longitude))]
    async fn weather(&self, coordinate: Coordinate, datetime: DateTime<Utc>) -> Result<WeatherResponse> {
        let url = self.weather_url(coordinate, datetime);
        let response = self.get_ok(&url, "/api/weather").await?;
        let weather: WeatherResponse = response.json().await?;
        info!("Received live forecast for {}", coordinate.format_coordinates());
        Ok(weather)
    }

    #[instrument(skip(self), fields(lat = coordinate.latitude, lon = coordinate.longitude))]
    async fn history_csv(&self, coordinate: Coordinate) -> Result<Vec<u8>> {
        let url = self.history_url(coordinate);
        let response = self.get_ok(&url, "/api/history.csv").await?;
        Ok(response.bytes().await?.to_vec())
    }

    #[instrument(skip(self, input))]
    async fn ask(&self, input: &str) -> Result<String> {
        let url = format!("{}/api/nasa", self.base_url);
        let body = serde_json::to_vec(&AskRequest { input })
            .map_err(|e| WeatherLensError::parse(e.to_string()))?;
        let response = self
            .client
            .post(&url)
            .header(CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            return Err(WeatherLensError::status(status.as_u16(), "/api/nasa"));
        }
        let answer: AskResponse = response.json().await?;
        Ok(answer.response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn client(base_url: &str) -> WeatherApiClient {
        WeatherApiClient::new(&ApiConfig {
            base_url: base_url.to_string(),
            ..ApiConfig::default()
        })
        .unwrap()
    }

    #[test]
    fn test_weather_url() {
        let c = client("https://example.test/");
        let dt = Utc.with_ymd_and_hms(2025, 10, 5, 14, 0, 0).unwrap();
        assert_eq!(
            c.weather_url(Coordinate::new(35.0, -100.0), dt),
            "https://example.test/api/weather?latitude=35&longitude=-100&datetime=2025-10-05T14%3A00%3A00.000Z&units=metric"
        );
    }

    #[test]
    fn test_history_url() {
        let c = client("http://localhost:5000");
        assert_eq!(
            c.history_url(Coordinate::new(-12.5, 130.25)),
            "http://localhost:5000/api/history.csv?latitude=-12.5&longitude=130.25"
        );
    }
}
