//! Canvas geometry for one frame of the map
//!
//! Everything here is in view box units and already shifted by the vertical
//! pan, so a renderer only has to draw it.

use crate::country::CountryIndex;
use crate::interaction::InteractionController;
use crate::models::{Coordinate, Pin};
use crate::projection::Projection;
use crate::viewport::{CanvasPoint, canvas_to_client};
use serde::Serialize;

/// Edge length of the pin marker, canvas units
pub const PIN_MARKER_SIZE: f64 = 28.0;
/// Gap between the marker's bottom edge and its caption baseline
const PIN_CAPTION_GAP: f64 = 12.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RegionLabel {
    pub name: &'static str,
    pub coordinate: Coordinate,
}

const fn label(name: &'static str, longitude: f64, latitude: f64) -> RegionLabel {
    RegionLabel {
        name,
        coordinate: Coordinate {
            latitude,
            longitude,
        },
    }
}

pub const REGION_LABELS: [RegionLabel; 6] = [
    label("NORTH AMERICA", -100.0, 35.0),
    label("SOUTH AMERICA", -58.0, -10.0),
    label("EUROPE", 20.0, 50.0),
    label("AFRICA", 27.0, 0.0),
    label("ASIA", 90.0, 46.5),
    label("OCEANIA", 133.5, -28.0),
];

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlacedLabel {
    pub name: &'static str,
    pub position: CanvasPoint,
}

/// Pin marker whose bottom-centre tip sits on the pinned coordinate
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PinMarker {
    pub tip: CanvasPoint,
    /// Top-left corner of the square marker
    pub origin: CanvasPoint,
    pub size: f64,
    pub caption: String,
    pub caption_position: CanvasPoint,
}

impl PinMarker {
    #[must_use]
    pub fn place(pin: &Pin, projection: &Projection, pan: f64) -> Option<Self> {
        let tip = projection.forward(pin.coordinate)?.offset_y(pan);
        let half = PIN_MARKER_SIZE / 2.0;
        let origin = CanvasPoint::new(tip.x - half, tip.y - PIN_MARKER_SIZE);
        Some(Self {
            tip,
            origin,
            size: PIN_MARKER_SIZE,
            caption: pin.coordinate.format_readout(),
            caption_position: CanvasPoint::new(origin.x + half, origin.y + PIN_MARKER_SIZE + PIN_CAPTION_GAP),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Outline {
    pub name: Option<String>,
    pub rings: Vec<Vec<CanvasPoint>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Scene {
    pub pan: f64,
    pub zoom: f64,
    /// Allowed zoom range, for disabling the zoom buttons at either end
    pub zoom_limits: (f64, f64),
    pub labels: Vec<PlacedLabel>,
    pub outlines: Vec<Outline>,
    pub pin: Option<PinMarker>,
    /// Client position of the pin's tip; `None` without a pin or a mounted container
    pub pin_on_screen: Option<(f64, f64)>,
    pub readout: String,
}

impl Scene {
    /// Lay out labels, outlines and the pin under the controller's live projection
    #[must_use]
    pub fn build(controller: &InteractionController) -> Self {
        let projection = controller.projection();
        let pan = controller.pan();
        let outlines = controller
            .countries()
            .index()
            .map(|index| project_outlines(index, &projection, pan))
            .unwrap_or_default();

        let pin = controller
            .pin()
            .and_then(|pin| PinMarker::place(pin, &projection, pan));
        let pin_on_screen = pin.as_ref().and_then(|marker| {
            canvas_to_client(controller.view_box(), controller.container(), marker.tip)
        });

        Self {
            pan,
            zoom: projection.zoom(),
            zoom_limits: controller.zoom_limits(),
            labels: place_labels(&projection, pan),
            outlines,
            pin,
            pin_on_screen,
            readout: controller.readout_text(),
        }
    }
}

/// Region labels that project; the rest are dropped
#[must_use]
pub fn place_labels(projection: &Projection, pan: f64) -> Vec<PlacedLabel> {
    REGION_LABELS
        .iter()
        .filter_map(|label| {
            projection
                .forward(label.coordinate)
                .map(|p| PlacedLabel {
                    name: label.name,
                    position: p.offset_y(pan),
                })
        })
        .collect()
}

/// Country rings in canvas space; vertices that do not project are skipped
#[must_use]
pub fn project_outlines(index: &CountryIndex, projection: &Projection, pan: f64) -> Vec<Outline> {
    index
        .features()
        .iter()
        .filter(|f| f.has_geometry())
        .map(|feature| Outline {
            name: feature.name.clone(),
            rings: feature
                .rings()
                .map(|ring| {
                    ring.into_iter()
                        .filter_map(|(lon, lat)| projection.forward(Coordinate::new(lat, lon)))
                        .map(|p| p.offset_y(pan))
                        .collect::<Vec<_>>()
                })
                .filter(|ring| ring.len() > 2)
                .collect(),
        })
        .collect()
}
