//! CSV export of a pinned location's data
//!
//! The server's history CSV is preferred. When that request fails for any
//! reason the current forecast report is written out locally instead.

use crate::forecast::WeatherBackend;
use crate::models::{ForecastReport, Pin, ProbabilityKey, format_number};
use crate::{Result, WeatherLensError};
use chrono::Utc;
use csv::{QuoteStyle, Terminator, WriterBuilder};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, instrument, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CsvSource {
    /// History CSV returned by the server
    Remote,
    /// Built from the forecast report on hand
    Local,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CsvArtifact {
    pub filename: String,
    pub content: Vec<u8>,
    pub source: CsvSource,
}

impl CsvArtifact {
    /// Write the artifact into `dir` under its filename
    pub async fn write_to(&self, dir: &Path) -> Result<PathBuf> {
        tokio::fs::create_dir_all(dir).await?;
        let path = dir.join(&self.filename);
        tokio::fs::write(&path, &self.content).await?;
        info!("Wrote {} bytes to {}", self.content.len(), path.display());
        Ok(path)
    }
}

pub struct CsvExporter {
    backend: Arc<dyn WeatherBackend>,
}

impl CsvExporter {
    pub fn new(backend: Arc<dyn WeatherBackend>) -> Self {
        Self { backend }
    }

    /// Export CSV for the pin; `report` feeds the local fallback
    #[instrument(skip(self, pin, report))]
    pub async fn export(&self, pin: Option<&Pin>, report: Option<&ForecastReport>) -> Result<CsvArtifact> {
        let pin = pin.ok_or_else(WeatherLensError::missing_pin)?;

        match self.backend.history_csv(pin.coordinate).await {
            Ok(content) => {
                let millis = Utc::now().timestamp_millis();
                let (lat, lon) = pin.coordinate.rounded_coordinates(4);
                Ok(CsvArtifact {
                    filename: format!("history_{lat}_{lon}_{millis}.csv"),
                    content,
                    source: CsvSource::Remote,
                })
            }
            Err(err) => {
                warn!("History CSV unavailable, exporting local forecast: {}", err);
                local_artifact(report)
            }
        }
    }
}

/// Local CSV artifact named `forecast_<millis>.csv`
pub fn local_artifact(report: Option<&ForecastReport>) -> Result<CsvArtifact> {
    Ok(CsvArtifact {
        filename: format!("forecast_{}.csv", Utc::now().timestamp_millis()),
        content: build_local_csv(report)?,
        source: CsvSource::Local,
    })
}

/// Section separator: one empty cell, written as `""`
const BLANK: [&str; 1] = [""];

/// Render the local CSV; without a report only the section headers are written.
///
/// Every cell is quoted and rows end with `\n`. Record lengths vary by section.
pub fn build_local_csv(report: Option<&ForecastReport>) -> Result<Vec<u8>> {
    let mut writer = WriterBuilder::new()
        .quote_style(QuoteStyle::Always)
        .terminator(Terminator::Any(b'\n'))
        .flexible(true)
        .from_writer(Vec::new());

    writer.write_record(["time", "precip_mm"])?;
    if let Some(report) = report {
        for hour in &report.forecast.hours {
            writer.write_record([hour.format_timestamp(), format_number(hour.precipitation)])?;
        }
    }

    writer.write_record(BLANK)?;
    writer.write_record(["metric", "value"])?;

    if let Some(report) = report {
        let model = &report.model;
        for (kind, value) in model.metrics.entries() {
            writer.write_record([kind.key(), format_number(value).as_str()])?;
        }

        if !model.extremes.is_empty() {
            writer.write_record(BLANK)?;
            writer.write_record(["extreme", "probability"])?;
            for (kind, value) in model.extremes.iter() {
                writer.write_record([kind.key(), format_number(value).as_str()])?;
            }
        }

        if !model.comfort.is_empty() {
            writer.write_record(BLANK)?;
            writer.write_record(["comfort", "probability"])?;
            for (kind, value) in model.comfort.iter() {
                writer.write_record([kind.key(), format_number(value).as_str()])?;
            }
        }

        writer.write_record(BLANK)?;
        writer.write_record(["summary", report.forecast.summary.as_str()])?;
        writer.write_record(["description", model.description.as_str()])?;
    }

    writer
        .into_inner()
        .map_err(|e| WeatherLensError::from(e.into_error()))
}
