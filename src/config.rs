//! Configuration management for `WeatherLens`
//!
//! Handles loading configuration from files, environment variables,
//! and provides validation for all configuration settings.

use crate::WeatherLensError;
use crate::interaction::{GestureClassifier, PanPolicy, ZoomState};
use crate::viewport::ViewBox;
use anyhow::{Context, Result};
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Root configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeatherLensConfig {
    /// Forecast API configuration
    #[serde(default)]
    pub api: ApiConfig,
    /// Map canvas and navigation limits
    #[serde(default)]
    pub map: MapConfig,
    /// Click vs drag thresholds
    #[serde(default)]
    pub gesture: GestureConfig,
    /// Synthetic forecast settings
    #[serde(default)]
    pub fallback: FallbackConfig,
    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Forecast API configuration settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Base URL for the forecast API
    #[serde(default = "default_api_base_url")]
    pub base_url: String,
    /// Request timeout in seconds
    #[serde(default = "default_api_timeout")]
    pub timeout_seconds: u32,
    /// Retries for transient failures before falling back
    #[serde(default)]
    pub max_retries: u32,
    /// Unit system sent with forecast requests
    #[serde(default = "default_units")]
    pub units: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MapConfig {
    /// Intrinsic canvas width
    #[serde(default = "default_map_width")]
    pub width: f64,
    /// Intrinsic canvas height
    #[serde(default = "default_map_height")]
    pub height: f64,
    /// Projection scale at zoom 1
    #[serde(default = "default_base_scale")]
    pub base_scale: f64,
    #[serde(default = "default_min_zoom")]
    pub min_zoom: f64,
    #[serde(default = "default_max_zoom")]
    pub max_zoom: f64,
    #[serde(default = "default_zoom_in_factor")]
    pub zoom_in_factor: f64,
    #[serde(default = "default_zoom_out_factor")]
    pub zoom_out_factor: f64,
    /// "unbounded" or "bounded"
    #[serde(default = "default_pan_policy")]
    pub pan_policy: String,
    /// Symmetric pan limit used by the bounded policy
    #[serde(default = "default_pan_limit")]
    pub pan_limit: f64,
    /// Country outlines: a GeoJSON or TopoJSON file path, or an http(s) URL
    #[serde(default = "default_countries_path")]
    pub countries_path: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GestureConfig {
    #[serde(default = "default_click_distance")]
    pub click_max_distance_px: f64,
    #[serde(default = "default_click_duration")]
    pub click_max_duration_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FallbackConfig {
    /// Artificial latency before a synthetic forecast is delivered
    #[serde(default = "default_fallback_delay")]
    pub delay_ms: u64,
}

/// Logging configuration settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (error, warn, info, debug, trace)
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Log format (pretty or json)
    #[serde(default = "default_log_format")]
    pub format: String,
}

// Default value functions
fn default_api_base_url() -> String {
    "https://nasa-hackathon-3dwe.onrender.com".to_string()
}

fn default_api_timeout() -> u32 {
    30
}

fn default_units() -> String {
    "metric".to_string()
}

fn default_map_width() -> f64 {
    800.0
}

fn default_map_height() -> f64 {
    600.0
}

fn default_base_scale() -> f64 {
    200.0
}

fn default_min_zoom() -> f64 {
    1.0
}

fn default_max_zoom() -> f64 {
    8.0
}

fn default_zoom_in_factor() -> f64 {
    1.2
}

fn default_zoom_out_factor() -> f64 {
    0.8
}

fn default_pan_policy() -> String {
    "unbounded".to_string()
}

fn default_pan_limit() -> f64 {
    200.0
}

/// Natural Earth 1:110m countries from the world-atlas package
pub const DEFAULT_COUNTRIES_URL: &str =
    "https://cdn.jsdelivr.net/npm/world-atlas@2/countries-110m.json";

fn default_countries_path() -> Option<String> {
    Some(DEFAULT_COUNTRIES_URL.to_string())
}

fn default_click_distance() -> f64 {
    6.0
}

fn default_click_duration() -> u64 {
    300
}

fn default_fallback_delay() -> u64 {
    600
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_api_base_url(),
            timeout_seconds: default_api_timeout(),
            max_retries: 0,
            units: default_units(),
        }
    }
}

impl Default for MapConfig {
    fn default() -> Self {
        Self {
            width: default_map_width(),
            height: default_map_height(),
            base_scale: default_base_scale(),
            min_zoom: default_min_zoom(),
            max_zoom: default_max_zoom(),
            zoom_in_factor: default_zoom_in_factor(),
            zoom_out_factor: default_zoom_out_factor(),
            pan_policy: default_pan_policy(),
            pan_limit: default_pan_limit(),
            countries_path: default_countries_path(),
        }
    }
}

impl Default for GestureConfig {
    fn default() -> Self {
        Self {
            click_max_distance_px: default_click_distance(),
            click_max_duration_ms: default_click_duration(),
        }
    }
}

impl Default for FallbackConfig {
    fn default() -> Self {
        Self {
            delay_ms: default_fallback_delay(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl Default for WeatherLensConfig {
    fn default() -> Self {
        Self {
            api: ApiConfig::default(),
            map: MapConfig::default(),
            gesture: GestureConfig::default(),
            fallback: FallbackConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl WeatherLensConfig {
    /// Load configuration from file and environment variables
    pub fn load() -> Result<Self> {
        Self::load_from_path(None)
    }

    /// Load configuration from specified path
    pub fn load_from_path(config_path: Option<PathBuf>) -> Result<Self> {
        let mut builder = Config::builder();

        let config_file = config_path.unwrap_or_else(|| {
            Self::get_config_path().unwrap_or_else(|| PathBuf::from("config.toml"))
        });

        if config_file.exists() {
            builder = builder.add_source(
                File::from(config_file.clone())
                    .required(false)
                    .format(config::FileFormat::Toml),
            );
        }

        builder = builder.add_source(Self::environment());

        let settings = builder
            .build()
            .with_context(|| "Failed to build configuration")?;

        let mut config: WeatherLensConfig = settings
            .try_deserialize()
            .with_context(|| "Failed to deserialize configuration")?;

        config.apply_defaults();
        config.validate()?;

        Ok(config)
    }

    // WEATHERLENS_API__BASE_URL, WEATHERLENS_MAP__PAN_POLICY, ...
    fn environment() -> Environment {
        Environment::with_prefix("WEATHERLENS")
            .prefix_separator("_")
            .separator("__")
            .try_parsing(true)
    }

    /// Get the default configuration file path
    #[must_use]
    pub fn get_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("weatherlens").join("config.toml"))
    }

    /// Apply default values to missing configuration fields
    pub fn apply_defaults(&mut self) {
        if self.api.base_url.is_empty() {
            self.api.base_url = default_api_base_url();
        }
        if self.api.timeout_seconds == 0 {
            self.api.timeout_seconds = default_api_timeout();
        }
        if self.api.units.is_empty() {
            self.api.units = default_units();
        }
        if self.map.width <= 0.0 {
            self.map.width = default_map_width();
        }
        if self.map.height <= 0.0 {
            self.map.height = default_map_height();
        }
        if self.map.base_scale <= 0.0 {
            self.map.base_scale = default_base_scale();
        }
        if self.map.pan_policy.is_empty() {
            self.map.pan_policy = default_pan_policy();
        }
        if self.gesture.click_max_distance_px <= 0.0 {
            self.gesture.click_max_distance_px = default_click_distance();
        }
        if self.gesture.click_max_duration_ms == 0 {
            self.gesture.click_max_duration_ms = default_click_duration();
        }
        if self.logging.level.is_empty() {
            self.logging.level = default_log_level();
        }
        if self.logging.format.is_empty() {
            self.logging.format = default_log_format();
        }
    }

    /// Validate all configuration settings
    pub fn validate(&self) -> Result<()> {
        self.validate_numeric_ranges()?;
        self.validate_string_values()?;
        Ok(())
    }

    fn validate_numeric_ranges(&self) -> Result<()> {
        if self.api.timeout_seconds > 300 {
            return Err(WeatherLensError::config("API timeout cannot exceed 300 seconds").into());
        }

        if self.api.max_retries > 10 {
            return Err(WeatherLensError::config("API max retries cannot exceed 10").into());
        }

        if !(self.map.min_zoom > 0.0 && self.map.min_zoom <= self.map.max_zoom) {
            return Err(WeatherLensError::config(format!(
                "Zoom bounds must satisfy 0 < min_zoom <= max_zoom (got {} and {})",
                self.map.min_zoom, self.map.max_zoom
            ))
            .into());
        }

        if self.map.zoom_in_factor <= 1.0 {
            return Err(WeatherLensError::config("zoom_in_factor must be greater than 1").into());
        }

        if !(self.map.zoom_out_factor > 0.0 && self.map.zoom_out_factor < 1.0) {
            return Err(
                WeatherLensError::config("zoom_out_factor must lie strictly between 0 and 1").into(),
            );
        }

        if self.map.pan_limit < 0.0 {
            return Err(WeatherLensError::config("pan_limit cannot be negative").into());
        }

        if self.fallback.delay_ms > 60_000 {
            return Err(WeatherLensError::config("Fallback delay cannot exceed 60 seconds").into());
        }

        Ok(())
    }

    fn validate_string_values(&self) -> Result<()> {
        let valid_log_levels = ["error", "warn", "info", "debug", "trace"];
        if !valid_log_levels.contains(&self.logging.level.as_str()) {
            return Err(WeatherLensError::config(format!(
                "Invalid log level '{}'. Must be one of: {}",
                self.logging.level,
                valid_log_levels.join(", ")
            ))
            .into());
        }

        let valid_log_formats = ["pretty", "json"];
        if !valid_log_formats.contains(&self.logging.format.as_str()) {
            return Err(WeatherLensError::config(format!(
                "Invalid log format '{}'. Must be one of: {}",
                self.logging.format,
                valid_log_formats.join(", ")
            ))
            .into());
        }

        let valid_pan_policies = ["unbounded", "bounded"];
        if !valid_pan_policies.contains(&self.map.pan_policy.as_str()) {
            return Err(WeatherLensError::config(format!(
                "Invalid pan policy '{}'. Must be one of: {}",
                self.map.pan_policy,
                valid_pan_policies.join(", ")
            ))
            .into());
        }

        if !self.api.base_url.starts_with("http://") && !self.api.base_url.starts_with("https://") {
            return Err(
                WeatherLensError::config("API base URL must be a valid HTTP or HTTPS URL").into(),
            );
        }

        Ok(())
    }

    #[must_use]
    pub fn view_box(&self) -> ViewBox {
        ViewBox::new(self.map.width, self.map.height)
    }

    #[must_use]
    pub fn pan_policy(&self) -> PanPolicy {
        match self.map.pan_policy.as_str() {
            "bounded" => PanPolicy::Bounded {
                limit: self.map.pan_limit,
            },
            _ => PanPolicy::Unbounded,
        }
    }

    #[must_use]
    pub fn zoom_state(&self) -> ZoomState {
        ZoomState::with_limits(
            self.map.min_zoom,
            self.map.max_zoom,
            self.map.zoom_in_factor,
            self.map.zoom_out_factor,
        )
    }

    #[must_use]
    pub fn gesture_classifier(&self) -> GestureClassifier {
        GestureClassifier::new(
            self.gesture.click_max_distance_px,
            Duration::from_millis(self.gesture.click_max_duration_ms),
        )
    }

    #[must_use]
    pub fn fallback_delay(&self) -> Duration {
        Duration::from_millis(self.fallback.delay_ms)
    }
}
