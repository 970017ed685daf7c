//! Forecast retrieval with a deterministic fallback
//!
//! [`ForecastService`] asks the remote API first. Any failure (transport,
//! non-success status, unparseable body) is reported once as an advisory and
//! answered with a locally synthesized forecast after a short delay.

pub mod client;
pub mod live;
pub mod session;
pub mod synthetic;

pub use client::{WeatherApiClient, WeatherBackend};
pub use live::WeatherResponse;
pub use session::{Completion, ForecastSession, SessionState, Update};

use crate::config::WeatherLensConfig;
use crate::models::{ForecastReport, Pin, Provenance, check_forecast_window};
use crate::{Result, WeatherLensError};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, instrument, warn};

/// Summary used when the server gives none, by total precipitation in mm
#[must_use]
pub fn precipitation_summary(total: f64) -> &'static str {
    if total > 20.0 {
        "Heavy precipitation expected"
    } else if total > 5.0 {
        "Moderate rain expected"
    } else {
        "Light or no rain expected"
    }
}

/// A report plus the error that forced the fallback, if any
#[derive(Debug)]
pub struct ForecastOutcome {
    pub report: ForecastReport,
    pub advisory: Option<WeatherLensError>,
}

#[derive(Clone)]
pub struct ForecastService {
    backend: Arc<dyn WeatherBackend>,
    fallback_delay: Duration,
}

impl std::fmt::Debug for ForecastService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ForecastService")
            .field("fallback_delay", &self.fallback_delay)
            .finish_non_exhaustive()
    }
}

impl ForecastService {
    pub fn new(backend: Arc<dyn WeatherBackend>, fallback_delay: Duration) -> Self {
        Self {
            backend,
            fallback_delay,
        }
    }

    /// Service backed by a [`WeatherApiClient`] built from the configuration
    pub fn from_config(config: &WeatherLensConfig) -> Result<Self> {
        let client = WeatherApiClient::new(&config.api)?;
        Ok(Self::new(Arc::new(client), config.fallback_delay()))
    }

    #[must_use]
    pub fn backend(&self) -> Arc<dyn WeatherBackend> {
        Arc::clone(&self.backend)
    }

    /// Fetch the forecast for the pin at `datetime`.
    ///
    /// Without a pin this fails with `MissingInput` before any request is
    /// made, and a datetime too late for the hourly window fails with
    /// `Validation`. Otherwise it always yields a report.
    pub async fn fetch(&self, pin: Option<&Pin>, datetime: DateTime<Utc>) -> Result<ForecastOutcome> {
        self.fetch_with_advisory(pin, datetime, |_| {}).await
    }

    /// Like [`fetch`](Self::fetch), but hands a transport failure to
    /// `on_advisory` as soon as it happens, before the fallback delay starts.
    #[instrument(skip(self, pin, on_advisory))]
    pub async fn fetch_with_advisory<F>(
        &self,
        pin: Option<&Pin>,
        datetime: DateTime<Utc>,
        on_advisory: F,
    ) -> Result<ForecastOutcome>
    where
        F: FnOnce(&WeatherLensError) + Send,
    {
        let pin = pin.ok_or_else(WeatherLensError::missing_pin)?;
        let datetime = check_forecast_window(datetime)?;
        let coordinate = pin.coordinate;

        match self.backend.weather(coordinate, datetime).await {
            Ok(response) => {
                let (forecast, model) = live::normalize(&response, datetime);
                info!("Live forecast for {}", coordinate.format_coordinates());
                Ok(ForecastOutcome {
                    report: ForecastReport {
                        coordinate,
                        datetime,
                        forecast,
                        model,
                        provenance: Provenance::Live,
                    },
                    advisory: None,
                })
            }
            Err(err) => {
                warn!(
                    "Forecast API failed for {}, using synthetic forecast: {}",
                    coordinate.format_coordinates(),
                    err
                );
                on_advisory(&err);
                let (forecast, model) = synthetic::synthesize(coordinate, datetime);
                tokio::time::sleep(self.fallback_delay).await;
                Ok(ForecastOutcome {
                    report: ForecastReport {
                        coordinate,
                        datetime,
                        forecast,
                        model,
                        provenance: Provenance::Synthetic,
                    },
                    advisory: Some(err),
                })
            }
        }
    }
}
