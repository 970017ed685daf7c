//! Rotating, zooming Mercator projection
//!
//! Geographic -> canvas: rotate the central meridian by `rotation` degrees,
//! wrap the longitude back into [-180, 180), apply the spherical Mercator,
//! scale by `base_scale * zoom` and translate to the centre of the view box
//! (canvas y grows downwards).

use crate::models::Coordinate;
use crate::viewport::{CanvasPoint, ViewBox};
use std::f64::consts::{FRAC_PI_2, PI, TAU};

/// A projection frozen at one rotation and zoom
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Projection {
    view_box: ViewBox,
    scale: f64,
    rotation: f64,
    zoom: f64,
}

impl Projection {
    #[must_use]
    pub fn new(view_box: ViewBox, base_scale: f64, rotation: f64, zoom: f64) -> Self {
        Self {
            view_box,
            scale: base_scale * zoom,
            rotation,
            zoom,
        }
    }

    /// Rotation of the central meridian, degrees
    #[must_use]
    pub fn rotation(&self) -> f64 {
        self.rotation
    }

    #[must_use]
    pub fn zoom(&self) -> f64 {
        self.zoom
    }

    /// Pixels per radian
    #[must_use]
    pub fn scale(&self) -> f64 {
        self.scale
    }

    /// Project a coordinate onto the canvas; `None` if it is not representable
    #[must_use]
    pub fn forward(&self, coordinate: Coordinate) -> Option<CanvasPoint> {
        // Mercator sends the poles to infinity.
        if !coordinate.is_finite() || coordinate.latitude.abs() >= 90.0 {
            return None;
        }
        let lambda = wrap_radians(coordinate.longitude.to_radians() + self.rotation_radians());
        let phi = coordinate.latitude.to_radians();
        let y = ((FRAC_PI_2 + phi) / 2.0).tan().ln();

        let center = self.view_box.center();
        let point = CanvasPoint::new(center.x + self.scale * lambda, center.y - self.scale * y);
        point.is_finite().then_some(point)
    }

    /// Recover the coordinate under a canvas point; `None` if it is not representable
    #[must_use]
    pub fn invert(&self, point: CanvasPoint) -> Option<Coordinate> {
        if !point.is_finite() || self.scale == 0.0 {
            return None;
        }
        let center = self.view_box.center();
        let x = (point.x - center.x) / self.scale;
        let y = (center.y - point.y) / self.scale;

        let phi = 2.0 * y.exp().atan() - FRAC_PI_2;
        let lambda = wrap_radians(x - self.rotation_radians());

        let coordinate = Coordinate::new(phi.to_degrees(), lambda.to_degrees());
        coordinate.is_finite().then_some(coordinate)
    }

    fn rotation_radians(&self) -> f64 {
        (self.rotation % 360.0).to_radians()
    }
}

/// Wrap an angle into [-PI, PI)
fn wrap_radians(lambda: f64) -> f64 {
    (lambda + PI).rem_euclid(TAU) - PI
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    const EPS: f64 = 1e-6;

    fn projection(rotation: f64, zoom: f64) -> Projection {
        Projection::new(ViewBox::default(), 200.0, rotation, zoom)
    }

    #[test]
    fn test_origin_maps_to_centre() {
        let p = projection(0.0, 1.0).forward(Coordinate::new(0.0, 0.0)).unwrap();
        assert!((p.x - 400.0).abs() < EPS);
        assert!((p.y - 300.0).abs() < EPS);
    }

    #[test]
    fn test_rotation_moves_meridian_to_centre() {
        // Rotating by +100 brings longitude -100 under the centre.
        let p = projection(100.0, 1.0).forward(Coordinate::new(0.0, -100.0)).unwrap();
        assert!((p.x - 400.0).abs() < EPS);
    }

    #[test]
    fn test_north_is_up() {
        let p = projection(0.0, 1.0).forward(Coordinate::new(45.0, 0.0)).unwrap();
        assert!(p.y < 300.0);
    }

    #[test]
    fn test_zoom_scales_distance_from_centre() {
        let c = Coordinate::new(10.0, 20.0);
        let a = projection(0.0, 1.0).forward(c).unwrap();
        let b = projection(0.0, 2.0).forward(c).unwrap();
        assert!(((b.x - 400.0) - 2.0 * (a.x - 400.0)).abs() < EPS);
        assert!(((b.y - 300.0) - 2.0 * (a.y - 300.0)).abs() < EPS);
    }

    #[test]
    fn test_poles_are_not_representable() {
        assert!(projection(0.0, 1.0).forward(Coordinate::new(90.0, 0.0)).is_none());
        assert!(projection(0.0, 1.0).forward(Coordinate::new(-90.0, 0.0)).is_none());
        assert!(projection(0.0, 1.0).forward(Coordinate::new(f64::NAN, 0.0)).is_none());
        assert!(projection(0.0, 1.0).invert(CanvasPoint::new(f64::INFINITY, 0.0)).is_none());
    }

    #[test]
    fn test_inverted_longitude_is_wrapped() {
        let c = projection(170.0, 1.0).invert(CanvasPoint::new(400.0, 300.0)).unwrap();
        assert!((c.longitude + 170.0).abs() < EPS);
        let c = projection(-170.0, 1.0).invert(CanvasPoint::new(400.0, 300.0)).unwrap();
        assert!((c.longitude - 170.0).abs() < EPS);
    }

    #[rstest]
    #[case(0.0, 1.0, 35.0, -100.0)]
    #[case(45.0, 1.0, -33.9, 151.2)]
    #[case(-720.5, 3.5, 60.0, 10.0)]
    #[case(1234.0, 8.0, -75.0, -179.0)]
    #[case(17.25, 1.44, 0.0, 179.5)]
    fn test_round_trip(
        #[case] rotation: f64,
        #[case] zoom: f64,
        #[case] latitude: f64,
        #[case] longitude: f64,
    ) {
        let proj = projection(rotation, zoom);
        let c = Coordinate::new(latitude, longitude);
        let back = proj.invert(proj.forward(c).unwrap()).unwrap();
        assert!((back.latitude - latitude).abs() < EPS, "{back:?}");
        assert!((back.longitude - longitude).abs() < EPS, "{back:?}");
    }

    #[test]
    fn test_round_trip_sweep() {
        for rotation in [-400.0, -90.0, 0.0, 33.3, 180.0, 725.0] {
            for zoom in [1.0, 2.0, 8.0] {
                let proj = projection(rotation, zoom);
                for lat in (-80..=80).step_by(20) {
                    for lon in (-170..=170).step_by(34) {
                        let c = Coordinate::new(f64::from(lat), f64::from(lon));
                        let back = proj.invert(proj.forward(c).unwrap()).unwrap();
                        assert!((back.latitude - c.latitude).abs() < EPS);
                        assert!((back.longitude - c.longitude).abs() < EPS);
                    }
                }
            }
        }
    }
}
