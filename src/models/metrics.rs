//! Model metrics and probability tables derived from a forecast

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Headline metrics shown next to a forecast
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq)]
pub struct ModelMetrics {
    /// Temperature in Celsius
    pub temperature: f64,
    /// Precipitation in mm
    pub precipitation: f64,
    /// Relative humidity in percent
    pub humidity: f64,
    /// Wind speed in m/s
    pub windspeed: f64,
    /// Air quality index
    pub air_quality: f64,
}

/// The five metric slots of [`ModelMetrics`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricKind {
    Temperature,
    Precipitation,
    Humidity,
    Windspeed,
    AirQuality,
}

impl MetricKind {
    pub const ALL: [MetricKind; 5] = [
        MetricKind::Temperature,
        MetricKind::Precipitation,
        MetricKind::Humidity,
        MetricKind::Windspeed,
        MetricKind::AirQuality,
    ];

    #[must_use]
    pub fn key(self) -> &'static str {
        match self {
            MetricKind::Temperature => "temperature",
            MetricKind::Precipitation => "precipitation",
            MetricKind::Humidity => "humidity",
            MetricKind::Windspeed => "windspeed",
            MetricKind::AirQuality => "air_quality",
        }
    }

    /// Display unit
    #[must_use]
    pub fn unit(self) -> &'static str {
        match self {
            MetricKind::Temperature => "°C",
            MetricKind::Precipitation => "mm",
            MetricKind::Humidity => "%",
            MetricKind::Windspeed => "m/s",
            MetricKind::AirQuality => "AQI",
        }
    }
}

impl ModelMetrics {
    /// Metrics with every slot set to NaN
    #[must_use]
    pub fn unknown() -> Self {
        Self {
            temperature: f64::NAN,
            precipitation: f64::NAN,
            humidity: f64::NAN,
            windspeed: f64::NAN,
            air_quality: f64::NAN,
        }
    }

    #[must_use]
    pub fn get(&self, kind: MetricKind) -> f64 {
        match kind {
            MetricKind::Temperature => self.temperature,
            MetricKind::Precipitation => self.precipitation,
            MetricKind::Humidity => self.humidity,
            MetricKind::Windspeed => self.windspeed,
            MetricKind::AirQuality => self.air_quality,
        }
    }

    /// `(kind, value)` pairs in display order
    pub fn entries(&self) -> impl Iterator<Item = (MetricKind, f64)> + '_ {
        MetricKind::ALL.into_iter().map(|kind| (kind, self.get(kind)))
    }

    /// Format a metric with its unit, e.g. `21.3 °C`
    #[must_use]
    pub fn format(&self, kind: MetricKind) -> String {
        format!("{} {}", format_number(self.get(kind)), kind.unit())
    }
}

/// Shortest decimal rendering; NaN renders as `NaN`
#[must_use]
pub fn format_number(value: f64) -> String {
    if value.is_nan() {
        "NaN".to_string()
    } else {
        format!("{value}")
    }
}

/// A fixed key set that probabilities can be reported against
pub trait ProbabilityKey: Copy + Ord + fmt::Debug + 'static {
    /// Every key in declaration order
    const ALL: &'static [Self];

    /// Wire name, e.g. `heavy_rain_probability`
    fn key(self) -> &'static str;

    /// Human label, e.g. `heavy rain`
    fn label(self) -> &'static str;

    fn from_key(key: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|k| k.key() == key)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ExtremeKind {
    Typhoon,
    Heatwave,
    ColdWave,
    HeavyRain,
    StrongWind,
    Thunderstorm,
}

impl ProbabilityKey for ExtremeKind {
    const ALL: &'static [Self] = &[
        ExtremeKind::Typhoon,
        ExtremeKind::Heatwave,
        ExtremeKind::ColdWave,
        ExtremeKind::HeavyRain,
        ExtremeKind::StrongWind,
        ExtremeKind::Thunderstorm,
    ];

    fn key(self) -> &'static str {
        match self {
            ExtremeKind::Typhoon => "typhoon_probability",
            ExtremeKind::Heatwave => "heatwave_probability",
            ExtremeKind::ColdWave => "cold_wave_probability",
            ExtremeKind::HeavyRain => "heavy_rain_probability",
            ExtremeKind::StrongWind => "strong_wind_probability",
            ExtremeKind::Thunderstorm => "thunderstorm_probability",
        }
    }

    fn label(self) -> &'static str {
        match self {
            ExtremeKind::Typhoon => "typhoon",
            ExtremeKind::Heatwave => "heatwave",
            ExtremeKind::ColdWave => "cold wave",
            ExtremeKind::HeavyRain => "heavy rain",
            ExtremeKind::StrongWind => "strong wind",
            ExtremeKind::Thunderstorm => "thunderstorm",
        }
    }

    // Servers report these both with and without the `_probability` suffix.
    fn from_key(key: &str) -> Option<Self> {
        let key = key.strip_suffix("_probability").unwrap_or(key);
        Self::ALL
            .iter()
            .copied()
            .find(|k| k.key().strip_suffix("_probability") == Some(key))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ComfortKind {
    VeryHot,
    VeryCold,
    VeryWindy,
    VeryWet,
    VeryUncomfortable,
}

impl ProbabilityKey for ComfortKind {
    const ALL: &'static [Self] = &[
        ComfortKind::VeryHot,
        ComfortKind::VeryCold,
        ComfortKind::VeryWindy,
        ComfortKind::VeryWet,
        ComfortKind::VeryUncomfortable,
    ];

    fn key(self) -> &'static str {
        match self {
            ComfortKind::VeryHot => "very_hot",
            ComfortKind::VeryCold => "very_cold",
            ComfortKind::VeryWindy => "very_windy",
            ComfortKind::VeryWet => "very_wet",
            ComfortKind::VeryUncomfortable => "very_uncomfortable",
        }
    }

    fn label(self) -> &'static str {
        match self {
            ComfortKind::VeryHot => "very hot",
            ComfortKind::VeryCold => "very cold",
            ComfortKind::VeryWindy => "very windy",
            ComfortKind::VeryWet => "very wet",
            ComfortKind::VeryUncomfortable => "very uncomfortable",
        }
    }
}

/// Probabilities keyed by a fixed key set, each held in [0, 1] at two decimals
#[derive(Debug, Clone, PartialEq)]
pub struct Probabilities<K: ProbabilityKey> {
    values: BTreeMap<K, f64>,
}

impl<K: ProbabilityKey> Default for Probabilities<K> {
    fn default() -> Self {
        Self {
            values: BTreeMap::new(),
        }
    }
}

impl<K: ProbabilityKey> Probabilities<K> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a value, clamped into [0, 1] and rounded to two decimals.
    /// NaN is stored as 0.
    pub fn set(&mut self, key: K, value: f64) {
        self.values.insert(key, clamp_probability(value));
    }

    #[must_use]
    pub fn get(&self, key: K) -> Option<f64> {
        self.values.get(&key).copied()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Entries in key declaration order
    pub fn iter(&self) -> impl Iterator<Item = (K, f64)> + '_ {
        self.values.iter().map(|(k, v)| (*k, *v))
    }

    /// Entries above `threshold`, highest first; ties keep declaration order
    #[must_use]
    pub fn notable(&self, threshold: f64) -> Vec<(K, f64)> {
        let mut entries: Vec<(K, f64)> = self.iter().filter(|(_, v)| *v > threshold).collect();
        entries.sort_by(|a, b| b.1.total_cmp(&a.1));
        entries
    }

    /// `heavy rain 100%, thunderstorm 85%`
    #[must_use]
    pub fn describe_notable(&self, threshold: f64) -> Option<String> {
        let parts: Vec<String> = self
            .notable(threshold)
            .into_iter()
            .map(|(k, v)| format!("{} {}%", k.label(), (v * 100.0).round()))
            .collect();
        if parts.is_empty() {
            None
        } else {
            Some(parts.join(", "))
        }
    }
}

impl<K: ProbabilityKey> FromIterator<(K, f64)> for Probabilities<K> {
    fn from_iter<I: IntoIterator<Item = (K, f64)>>(iter: I) -> Self {
        let mut probabilities = Self::new();
        for (k, v) in iter {
            probabilities.set(k, v);
        }
        probabilities
    }
}

impl<K: ProbabilityKey> Serialize for Probabilities<K> {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        use serde::ser::SerializeMap;
        let mut map = serializer.serialize_map(Some(self.values.len()))?;
        for (k, v) in &self.values {
            map.serialize_entry(k.key(), v)?;
        }
        map.end()
    }
}

pub type ExtremeProbabilities = Probabilities<ExtremeKind>;
pub type ComfortIndices = Probabilities<ComfortKind>;

/// Clamp into [0, 1] and round to two decimals
#[must_use]
pub fn clamp_probability(value: f64) -> f64 {
    if value.is_nan() {
        return 0.0;
    }
    (value.clamp(0.0, 1.0) * 100.0).round() / 100.0
}

/// Metrics, probability tables and the narrative built on top of a forecast
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModelResult {
    pub metrics: ModelMetrics,
    pub extremes: ExtremeProbabilities,
    pub comfort: ComfortIndices,
    pub description: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clamp_probability() {
        assert_eq!(clamp_probability(1.7), 1.0);
        assert_eq!(clamp_probability(-0.2), 0.0);
        assert_eq!(clamp_probability(0.123_456), 0.12);
        assert_eq!(clamp_probability(f64::NAN), 0.0);
    }

    #[test]
    fn test_notable_ordering() {
        let extremes: ExtremeProbabilities = [
            (ExtremeKind::Typhoon, 0.01),
            (ExtremeKind::HeavyRain, 0.5),
            (ExtremeKind::StrongWind, 0.3),
            (ExtremeKind::Thunderstorm, 0.5),
        ]
        .into_iter()
        .collect();

        let notable = extremes.notable(0.07);
        assert_eq!(
            notable,
            vec![
                (ExtremeKind::HeavyRain, 0.5),
                (ExtremeKind::Thunderstorm, 0.5),
                (ExtremeKind::StrongWind, 0.3),
            ]
        );
        assert_eq!(
            extremes.describe_notable(0.07).unwrap(),
            "heavy rain 50%, thunderstorm 50%, strong wind 30%"
        );
    }

    #[test]
    fn test_describe_notable_none() {
        let comfort: ComfortIndices = [(ComfortKind::VeryHot, 0.05)].into_iter().collect();
        assert!(comfort.describe_notable(0.07).is_none());
    }

    #[test]
    fn test_extreme_key_parsing() {
        assert_eq!(
            ExtremeKind::from_key("heavy_rain_probability"),
            Some(ExtremeKind::HeavyRain)
        );
        assert_eq!(ExtremeKind::from_key("heatwave"), Some(ExtremeKind::Heatwave));
        assert_eq!(ExtremeKind::from_key("meteor"), None);
        assert_eq!(ComfortKind::from_key("very_wet"), Some(ComfortKind::VeryWet));
    }

    #[test]
    fn test_probabilities_serialize_with_wire_keys() {
        let comfort: ComfortIndices = [(ComfortKind::VeryWet, 0.5)].into_iter().collect();
        let json = serde_json::to_string(&comfort).unwrap();
        assert_eq!(json, r#"{"very_wet":0.5}"#);
    }

    #[test]
    fn test_metric_units() {
        let metrics = ModelMetrics {
            temperature: 21.3,
            precipitation: 4.0,
            humidity: 60.0,
            windspeed: 3.5,
            air_quality: 85.0,
        };
        assert_eq!(metrics.format(MetricKind::Temperature), "21.3 °C");
        assert_eq!(metrics.format(MetricKind::AirQuality), "85 AQI");
        assert_eq!(ModelMetrics::unknown().format(MetricKind::Humidity), "NaN %");
        assert_eq!(metrics.entries().count(), 5);
    }
}
