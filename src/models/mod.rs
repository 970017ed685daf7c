//! Data models for WeatherLens
//!
//! This module contains the core domain models organized by concern:
//! - Location: Geographic coordinates and the map pin
//! - Forecast: Hourly precipitation series and the complete report
//! - Metrics: Headline metrics and probability tables

pub mod forecast;
pub mod location;
pub mod metrics;

// Re-export all public types for convenient access
pub use forecast::{
    FORECAST_HOURS, ForecastReport, ForecastResult, HourlySample, Provenance,
    check_forecast_window, format_iso, parse_datetime, round_to, sample_timestamp,
};
pub use location::{Coordinate, Pin, format_latitude, format_longitude};
pub use metrics::{
    ComfortIndices, ComfortKind, ExtremeKind, ExtremeProbabilities, MetricKind, ModelMetrics,
    ModelResult, Probabilities, ProbabilityKey, clamp_probability, format_number,
};
