//! Forecast result model and the report handed back to the UI

use super::{Coordinate, ModelResult};
use crate::WeatherLensError;
use chrono::{DateTime, Duration, NaiveDateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

/// Number of hourly samples in every forecast
pub const FORECAST_HOURS: usize = 8;

/// One hourly precipitation sample
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq)]
pub struct HourlySample {
    pub timestamp: DateTime<Utc>,
    /// Precipitation in mm
    pub precipitation: f64,
}

impl HourlySample {
    /// Timestamp as `2025-10-05T14:00:00.000Z`
    #[must_use]
    pub fn format_timestamp(&self) -> String {
        format_iso(&self.timestamp)
    }
}

/// Millisecond-precision UTC timestamp with a `Z` suffix
#[must_use]
pub fn format_iso(timestamp: &DateTime<Utc>) -> String {
    timestamp.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Hourly series, its total and a free-text summary
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct ForecastResult {
    pub hours: Vec<HourlySample>,
    /// Sum of the hourly series, rounded to 0.1 mm
    pub total: f64,
    pub summary: String,
}

impl ForecastResult {
    #[must_use]
    pub fn new(hours: Vec<HourlySample>, summary: String) -> Self {
        let total = round_to(hours.iter().map(|h| h.precipitation).sum(), 1);
        Self {
            hours,
            total,
            summary,
        }
    }
}

/// Where a report came from
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Provenance {
    /// Normalized from the remote forecast API
    Live,
    /// Computed locally after the remote API failed
    Synthetic,
}

/// A complete forecast for one (pin, datetime) pair
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ForecastReport {
    pub coordinate: Coordinate,
    pub datetime: DateTime<Utc>,
    pub forecast: ForecastResult,
    pub model: ModelResult,
    pub provenance: Provenance,
}

impl ForecastReport {
    #[must_use]
    pub fn is_synthetic(&self) -> bool {
        self.provenance == Provenance::Synthetic
    }
}

/// Round half away from zero to `decimals` places
#[must_use]
pub fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10_f64.powi(decimals);
    (value * factor).round() / factor
}

/// Timestamp of the `hour`-th sample after `start`, saturating at chrono's upper bound
#[must_use]
pub fn sample_timestamp(start: DateTime<Utc>, hour: usize) -> DateTime<Utc> {
    i64::try_from(hour)
        .ok()
        .and_then(|h| start.checked_add_signed(Duration::hours(h)))
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}

/// Reject a start datetime whose forecast window runs past the representable range
pub fn check_forecast_window(datetime: DateTime<Utc>) -> crate::Result<DateTime<Utc>> {
    let last = Duration::hours(FORECAST_HOURS as i64 - 1);
    match datetime.checked_add_signed(last) {
        Some(_) => Ok(datetime),
        None => Err(WeatherLensError::validation(format!(
            "Datetime {datetime} is too late for a {FORECAST_HOURS}-hour forecast"
        ))),
    }
}

/// Parse an RFC 3339 timestamp or the time picker's `YYYY-MM-DDTHH:MM` form (taken as UTC)
pub fn parse_datetime(input: &str) -> crate::Result<DateTime<Utc>> {
    let input = input.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(input) {
        return check_forecast_window(dt.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%dT%H:%M", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(input, format) {
            return check_forecast_window(naive.and_utc());
        }
    }
    Err(WeatherLensError::validation(format!(
        "Unrecognized datetime '{input}'"
    )))
}
