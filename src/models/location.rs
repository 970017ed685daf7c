//! Geographic coordinate and pin models

use serde::{Deserialize, Serialize};

/// Geographic coordinate in decimal degrees
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq)]
pub struct Coordinate {
    /// Latitude in decimal degrees, [-90, 90]
    pub latitude: f64,
    /// Longitude in decimal degrees, conventionally [-180, 180]
    pub longitude: f64,
}

impl Coordinate {
    #[must_use]
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    #[must_use]
    pub fn is_finite(&self) -> bool {
        self.latitude.is_finite() && self.longitude.is_finite()
    }

    /// Format as the `lon , lat` readout shown under the map
    #[must_use]
    pub fn format_readout(&self) -> String {
        format!(
            "{} , {}",
            format_longitude(Some(self.longitude)),
            format_latitude(Some(self.latitude))
        )
    }

    /// Format as `lat, lon` with hemisphere letters
    #[must_use]
    pub fn format_coordinates(&self) -> String {
        format!(
            "{}, {}",
            format_latitude(Some(self.latitude)),
            format_longitude(Some(self.longitude))
        )
    }

    /// Round coordinates for request keys
    #[must_use]
    pub fn rounded_coordinates(&self, precision: u32) -> (f64, f64) {
        let multiplier = 10_f64.powi(i32::try_from(precision).unwrap_or(4));
        let lat = (self.latitude * multiplier).round() / multiplier;
        let lon = (self.longitude * multiplier).round() / multiplier;
        (lat, lon)
    }
}

/// The single location marker dropped by a click on the map
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq)]
pub struct Pin {
    pub coordinate: Coordinate,
}

impl Pin {
    #[must_use]
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            coordinate: Coordinate::new(latitude, longitude),
        }
    }

    #[must_use]
    pub fn latitude(&self) -> f64 {
        self.coordinate.latitude
    }

    #[must_use]
    pub fn longitude(&self) -> f64 {
        self.coordinate.longitude
    }
}

impl From<Coordinate> for Pin {
    fn from(coordinate: Coordinate) -> Self {
        Self { coordinate }
    }
}

/// `35.000°N`, or `--` when the value is missing or not a number
#[must_use]
pub fn format_latitude(latitude: Option<f64>) -> String {
    format_hemisphere(latitude, 'N', 'S')
}

/// `100.000°W`, or `--` when the value is missing or not a number
#[must_use]
pub fn format_longitude(longitude: Option<f64>) -> String {
    format_hemisphere(longitude, 'E', 'W')
}

fn format_hemisphere(value: Option<f64>, positive: char, negative: char) -> String {
    match value {
        Some(v) if !v.is_nan() => {
            let dir = if v >= 0.0 { positive } else { negative };
            format!("{:.3}°{dir}", v.abs())
        }
        _ => "--".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hemisphere_formatting() {
        assert_eq!(format_latitude(Some(35.0)), "35.000°N");
        assert_eq!(format_latitude(Some(-12.3456)), "12.346°S");
        assert_eq!(format_longitude(Some(-100.0)), "100.000°W");
        assert_eq!(format_longitude(Some(0.0)), "0.000°E");
        assert_eq!(format_longitude(None), "--");
        assert_eq!(format_latitude(Some(f64::NAN)), "--");
    }

    #[test]
    fn test_readout() {
        let coordinate = Coordinate::new(35.0, -100.0);
        assert_eq!(coordinate.format_readout(), "100.000°W , 35.000°N");
        assert_eq!(coordinate.format_coordinates(), "35.000°N, 100.000°W");
    }

    #[test]
    fn test_rounded_coordinates() {
        let coordinate = Coordinate::new(46.818_234, 8.227_456);
        let (lat, lon) = coordinate.rounded_coordinates(2);
        assert_eq!(lat, 46.82);
        assert_eq!(lon, 8.23);
    }

    #[test]
    fn test_pin_accessors() {
        let pin = Pin::new(35.0, -100.0);
        assert_eq!(pin.latitude(), 35.0);
        assert_eq!(pin.longitude(), -100.0);
        assert_eq!(Pin::from(Coordinate::new(35.0, -100.0)), pin);
    }
}
