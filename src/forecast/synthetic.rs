//! Deterministic offline forecast
//!
//! Every value is a closed-form function of the coordinate, the requested
//! datetime and the hour index, so the same pin always produces the same
//! report.

use super::precipitation_summary;
use crate::models::{
    ComfortIndices, ComfortKind, Coordinate, ExtremeKind, ExtremeProbabilities, FORECAST_HOURS,
    ForecastResult, HourlySample, ModelMetrics, ModelResult, round_to, sample_timestamp,
};
use chrono::{DateTime, Utc};

/// Probabilities at or below this are left out of the narrative
pub const NOTABLE_THRESHOLD: f64 = 0.07;

/// Build the fallback forecast and model result for one pin and datetime
#[must_use]
pub fn synthesize(coordinate: Coordinate, datetime: DateTime<Utc>) -> (ForecastResult, ModelResult) {
    let forecast = simulate_forecast(coordinate, datetime);
    let mut model = simulate_model(coordinate, &forecast.hours);
    model.description = format!("{} {}", forecast.summary, model.description)
        .trim()
        .to_string();
    (forecast, model)
}

#[must_use]
pub fn simulate_forecast(coordinate: Coordinate, datetime: DateTime<Utc>) -> ForecastResult {
    let Coordinate {
        latitude: lat,
        longitude: lon,
    } = coordinate;
    let base = (lat.abs() + lon.abs()) % 10.0;

    let hours: Vec<HourlySample> = (0..FORECAST_HOURS)
        .map(|i| {
            let seed = ((lat + lon + i as f64) * 0.12345).sin();
            let precipitation = round_to((seed + 1.0) * 5.0 + base % 3.0, 1).max(0.0);
            HourlySample {
                timestamp: sample_timestamp(datetime, i),
                precipitation,
            }
        })
        .collect();

    let total: f64 = hours.iter().map(|h| h.precipitation).sum();
    ForecastResult::new(hours, precipitation_summary(total).to_string())
}

#[must_use]
pub fn simulate_model(coordinate: Coordinate, hours: &[HourlySample]) -> ModelResult {
    let Coordinate {
        latitude: lat,
        longitude: lon,
    } = coordinate;

    let temperature = 20.0 + lat % 10.0 + (lon * 0.1).sin() * 5.0;
    let humidity = 50.0 + (lon % 20.0).abs();
    let windspeed = 3.0 + (lat % 5.0).abs();
    let precipitation: f64 = hours.iter().map(|h| h.precipitation).sum();
    let air_quality = (50.0 + lat.abs() % 50.0).round().max(10.0);

    let extremes: ExtremeProbabilities = [
        (ExtremeKind::Typhoon, if lon.abs() > 120.0 { 0.01 } else { 0.0 }),
        (ExtremeKind::Heatwave, (temperature - 28.0) / 50.0),
        (ExtremeKind::ColdWave, (5.0 - temperature) / 50.0),
        (ExtremeKind::HeavyRain, precipitation / 30.0),
        (ExtremeKind::StrongWind, windspeed / 20.0),
        (ExtremeKind::Thunderstorm, precipitation / 8.0),
    ]
    .into_iter()
    .collect();

    let comfort: ComfortIndices = [
        (ComfortKind::VeryHot, (temperature - 30.0) / 10.0),
        (ComfortKind::VeryCold, -temperature / 10.0),
        (ComfortKind::VeryWindy, (windspeed - 12.0) / 20.0),
        (ComfortKind::VeryWet, humidity / 120.0),
        (
            ComfortKind::VeryUncomfortable,
            (humidity / 100.0 + ((temperature - 28.0) / 10.0).max(0.0)) / 2.0,
        ),
    ]
    .into_iter()
    .collect();

    let mut description = format!(
        "Forecast: {} hourly steps, total precip {} mm.",
        hours.len(),
        round_to(precipitation, 1)
    );
    if let Some(notable) = extremes.describe_notable(NOTABLE_THRESHOLD) {
        description.push_str(&format!(" Notable extremes: {notable}."));
    }
    if let Some(notable) = comfort.describe_notable(NOTABLE_THRESHOLD) {
        description.push_str(&format!(" Comfort concerns: {notable}."));
    }

    ModelResult {
        metrics: ModelMetrics {
            temperature: round_to(temperature, 1),
            precipitation: round_to(precipitation, 1),
            humidity: round_to(humidity, 0),
            windspeed: round_to(windspeed, 1),
            air_quality,
        },
        extremes,
        comfort,
        description,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rstest::rstest;

    fn start() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 10, 5, 14, 0, 0).unwrap()
    }

    #[test]
    fn test_reference_pin_series() {
        // lat 35, lon -100: base = 135 % 10 = 5, base % 3 = 2.
        let forecast = simulate_forecast(Coordinate::new(35.0, -100.0), start());
        assert_eq!(forecast.hours.len(), 8);
        let expected: Vec<f64> = (0..8)
            .map(|i| {
                let seed = ((-65.0 + f64::from(i)) * 0.12345_f64).sin();
                round_to((seed + 1.0) * 5.0 + 2.0, 1)
            })
            .collect();
        let actual: Vec<f64> = forecast.hours.iter().map(|h| h.precipitation).collect();
        assert_eq!(actual, expected);
        assert_eq!(forecast.hours[0].format_timestamp(), "2025-10-05T14:00:00.000Z");
        assert_eq!(forecast.hours[7].format_timestamp(), "2025-10-05T21:00:00.000Z");
        assert_eq!(forecast.total, round_to(expected.iter().sum(), 1));
        assert!(!forecast.summary.is_empty());
    }

    #[test]
    fn test_reference_pin_metrics() {
        let coordinate = Coordinate::new(35.0, -100.0);
        let (forecast, model) = synthesize(coordinate, start());

        // 20 + 5 + 5 * sin(-10)
        let temperature = 25.0 + (-10.0_f64).sin() * 5.0;
        assert_eq!(model.metrics.temperature, round_to(temperature, 1));
        assert_eq!(model.metrics.humidity, 50.0);
        assert_eq!(model.metrics.windspeed, 3.0);
        assert_eq!(model.metrics.air_quality, 85.0);
        assert_eq!(model.extremes.get(ExtremeKind::Typhoon), Some(0.0));
        assert_eq!(model.extremes.get(ExtremeKind::StrongWind), Some(0.15));
        assert_eq!(model.comfort.get(ComfortKind::VeryWet), Some(0.42));
        assert_eq!(model.comfort.get(ComfortKind::VeryUncomfortable), Some(0.25));
        assert!(model.description.starts_with(&forecast.summary));
        assert!(model.description.contains("Forecast: 8 hourly steps"));
        assert!(model.description.contains("Notable extremes: "));
    }

    #[test]
    fn test_deterministic() {
        let c = Coordinate::new(-33.87, 151.21);
        assert_eq!(synthesize(c, start()), synthesize(c, start()));
    }

    #[test]
    fn test_far_east_typhoon_risk() {
        let (_, model) = synthesize(Coordinate::new(14.6, 121.0), start());
        assert_eq!(model.extremes.get(ExtremeKind::Typhoon), Some(0.01));
    }

    #[test]
    fn test_series_near_end_of_time() {
        let max = DateTime::<Utc>::MAX_UTC;
        let forecast = simulate_forecast(Coordinate::new(35.0, -100.0), max - chrono::Duration::hours(2));
        assert_eq!(forecast.hours.len(), 8);
        assert_eq!(forecast.hours[7].timestamp, max);
    }

    #[rstest]
    #[case(0.0, 0.0)]
    #[case(89.9, 179.9)]
    #[case(-89.9, -179.9)]
    #[case(47.3, -3.3)]
    fn test_values_in_range(#[case] lat: f64, #[case] lon: f64) {
        let (forecast, model) = synthesize(Coordinate::new(lat, lon), start());
        assert!(forecast.hours.iter().all(|h| h.precipitation >= 0.0));
        assert!(model.extremes.iter().all(|(_, v)| (0.0..=1.0).contains(&v)));
        assert!(model.comfort.iter().all(|(_, v)| (0.0..=1.0).contains(&v)));
        assert_eq!(model.extremes.len(), 6);
        assert_eq!(model.comfort.len(), 5);
    }
}
