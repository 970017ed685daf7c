//! Normalization of `/api/weather` responses
//!
//! The server is loose about its payload: fields may be missing, numbers may
//! arrive as strings and probability tables may use keys we do not know.
//! Missing metrics become NaN, unknown probability keys are dropped and every
//! probability is clamped.

use super::precipitation_summary;
use crate::models::{
    ComfortIndices, ExtremeProbabilities, FORECAST_HOURS, ForecastResult, HourlySample,
    ModelMetrics, ModelResult, Probabilities, ProbabilityKey, sample_timestamp,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

/// Body of a successful `/api/weather` call
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WeatherResponse {
    #[serde(default)]
    pub data: Value,
}

impl WeatherResponse {
    #[must_use]
    pub fn new(data: Value) -> Self {
        Self { data }
    }
}

/// Turn a server response into the hourly series and model result
#[must_use]
pub fn normalize(response: &WeatherResponse, datetime: DateTime<Utc>) -> (ForecastResult, ModelResult) {
    let data = &response.data;

    // The server reports a single precipitation figure; it is spread over every hour.
    let precipitation = metric_value(data, "precipitation");
    let hourly = if precipitation.is_finite() { precipitation } else { 0.0 };
    let hours = (0..FORECAST_HOURS)
        .map(|i| HourlySample {
            timestamp: sample_timestamp(datetime, i),
            precipitation: hourly,
        })
        .collect::<Vec<_>>();

    let climate_description = data
        .get("climate_description")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty());

    let total: f64 = hours.iter().map(|h| h.precipitation).sum();
    let summary = climate_description
        .map(str::to_string)
        .unwrap_or_else(|| precipitation_summary(total).to_string());
    let forecast = ForecastResult::new(hours, summary);

    let metrics = ModelMetrics {
        temperature: metric_value(data, "temperature"),
        precipitation,
        humidity: metric_value(data, "humidity"),
        windspeed: metric_value(data, "windspeed"),
        air_quality: metric_value(data, "air_quality"),
    };

    let extremes: ExtremeProbabilities = probability_table(data.get("extreme_weather"));
    let comfort_source = data
        .get("comfort_index")
        .filter(|v| v.is_object())
        .or_else(|| data.get("comfort"));
    let comfort: ComfortIndices = probability_table(comfort_source);

    let description = match climate_description {
        Some(text) if text != forecast.summary => format!("{} {}", forecast.summary, text),
        _ => forecast.summary.clone(),
    };

    (
        forecast,
        ModelResult {
            metrics,
            extremes,
            comfort,
            description,
        },
    )
}

/// `data.<key>.value` as a number; numeric strings are accepted, anything else is NaN
fn metric_value(data: &Value, key: &str) -> f64 {
    data.get(key)
        .and_then(|metric| metric.get("value"))
        .and_then(as_number)
        .unwrap_or(f64::NAN)
}

fn as_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn probability_table<K: ProbabilityKey>(source: Option<&Value>) -> Probabilities<K> {
    let Some(object) = source.and_then(Value::as_object) else {
        return Probabilities::new();
    };
    object
        .iter()
        .filter_map(|(key, value)| {
            let Some(kind) = K::from_key(key) else {
                debug!("Ignoring unknown probability key '{}'", key);
                return None;
            };
            as_number(value).map(|v| (kind, v))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ComfortKind, ExtremeKind};
    use chrono::{Duration, TimeZone};
    use serde_json::json;

    fn start() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 10, 5, 14, 0, 0).unwrap()
    }

    #[test]
    fn test_full_payload() {
        let response = WeatherResponse::new(json!({
            "temperature": { "value": 21.5 },
            "precipitation": { "value": 1.5 },
            "humidity": { "value": "64" },
            "windspeed": { "value": 4.2 },
            "air_quality": { "value": 41 },
            "extreme_weather": {
                "heavy_rain_probability": 0.4,
                "thunderstorm": 1.7,
                "meteor_probability": 0.9
            },
            "comfort_index": { "very_wet": 0.537 },
            "comfort": { "very_hot": 0.9 },
            "climate_description": "Showers through the afternoon."
        }));

        let (forecast, model) = normalize(&response, start());
        assert_eq!(forecast.hours.len(), 8);
        assert!(forecast.hours.iter().all(|h| h.precipitation == 1.5));
        assert_eq!(forecast.hours[7].timestamp, start() + Duration::hours(7));
        assert_eq!(forecast.total, 12.0);
        assert_eq!(forecast.summary, "Showers through the afternoon.");

        assert_eq!(model.metrics.humidity, 64.0);
        assert_eq!(model.metrics.air_quality, 41.0);
        assert_eq!(model.extremes.len(), 2);
        assert_eq!(model.extremes.get(ExtremeKind::Thunderstorm), Some(1.0));
        assert_eq!(model.comfort.get(ComfortKind::VeryWet), Some(0.54));
        assert_eq!(model.comfort.get(ComfortKind::VeryHot), None);
        assert_eq!(model.description, "Showers through the afternoon.");
    }

    #[test]
    fn test_empty_payload() {
        let (forecast, model) = normalize(&WeatherResponse::default(), start());
        assert!(forecast.hours.iter().all(|h| h.precipitation == 0.0));
        assert_eq!(forecast.total, 0.0);
        assert_eq!(forecast.summary, "Light or no rain expected");
        assert!(model.metrics.temperature.is_nan());
        assert!(model.metrics.precipitation.is_nan());
        assert!(model.extremes.is_empty());
        assert!(model.comfort.is_empty());
    }

    #[test]
    fn test_threshold_summaries_and_comfort_fallback() {
        let response = WeatherResponse::new(json!({
            "precipitation": { "value": 3 },
            "comfort": { "very_cold": 0.25 }
        }));
        let (forecast, model) = normalize(&response, start());
        assert_eq!(forecast.total, 24.0);
        assert_eq!(forecast.summary, "Heavy precipitation expected");
        assert_eq!(model.comfort.get(ComfortKind::VeryCold), Some(0.25));

        let moderate = WeatherResponse::new(json!({ "precipitation": { "value": "0.75" } }));
        assert_eq!(normalize(&moderate, start()).0.summary, "Moderate rain expected");
    }

    #[test]
    fn test_garbage_values_are_nan() {
        let response = WeatherResponse::new(json!({
            "temperature": { "value": "warm" },
            "windspeed": 12,
            "precipitation": { "value": null }
        }));
        let (forecast, model) = normalize(&response, start());
        assert!(model.metrics.temperature.is_nan());
        assert!(model.metrics.windspeed.is_nan());
        assert_eq!(forecast.total, 0.0);
    }
}
