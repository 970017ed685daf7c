//! `WeatherLens` - pick a point on a world map and get a weather forecast for it
//!
//! This library provides the map interaction engine (viewport mapping,
//! rotating Mercator projection, drag/click/zoom handling, country lookup)
//! and forecast retrieval from the WeatherLens API with a deterministic
//! offline fallback and CSV export.

pub mod config;
pub mod country;
pub mod error;
pub mod export;
pub mod forecast;
pub mod interaction;
pub mod logging;
pub mod models;
pub mod projection;
pub mod scene;
pub mod viewport;

// Re-export core types for public API
pub use config::WeatherLensConfig;
pub use country::{CountryIndex, CountryMatch, CountryResolver};
pub use error::WeatherLensError;
pub use export::{CsvArtifact, CsvExporter, CsvSource};
pub use forecast::{
    ForecastOutcome, ForecastService, ForecastSession, SessionState, WeatherApiClient,
    WeatherBackend,
};
pub use interaction::{InteractionController, InteractionEvent, PointerEvent};
pub use models::{Coordinate, ForecastReport, Pin, Provenance};
pub use projection::Projection;
pub use scene::Scene;
pub use viewport::{CanvasPoint, ContainerRect, ViewBox};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Core result type used throughout the library
pub type Result<T> = std::result::Result<T, WeatherLensError>;
