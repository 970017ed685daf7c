//! Client pixel <-> intrinsic canvas mapping
//!
//! The map is authored on a fixed canvas (the view box) and displayed
//! crop-to-fill: it is scaled until it covers the container on both axes,
//! centred, and the overflow on the longer axis is cropped symmetrically.

use serde::{Deserialize, Serialize};

/// Fixed intrinsic canvas size
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ViewBox {
    pub width: f64,
    pub height: f64,
}

impl Default for ViewBox {
    fn default() -> Self {
        Self::new(800.0, 600.0)
    }
}

impl ViewBox {
    #[must_use]
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    #[must_use]
    pub fn center(&self) -> CanvasPoint {
        CanvasPoint::new(self.width / 2.0, self.height / 2.0)
    }
}

/// On-screen bounding rectangle of the map container, in client pixels
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ContainerRect {
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
}

impl ContainerRect {
    #[must_use]
    pub fn new(left: f64, top: f64, width: f64, height: f64) -> Self {
        Self {
            left,
            top,
            width,
            height,
        }
    }
}

/// A point in view box coordinates
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CanvasPoint {
    pub x: f64,
    pub y: f64,
}

impl CanvasPoint {
    #[must_use]
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Shift vertically, used to move between panned and unpanned space
    #[must_use]
    pub fn offset_y(self, dy: f64) -> Self {
        Self::new(self.x, self.y + dy)
    }

    #[must_use]
    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

/// Scale and centring offsets of the crop-to-fill layout
#[derive(Debug, Clone, Copy, PartialEq)]
struct FillLayout {
    scale: f64,
    offset_x: f64,
    offset_y: f64,
}

fn fill_layout(view_box: ViewBox, rect: &ContainerRect) -> Option<FillLayout> {
    if !(rect.width > 0.0 && rect.height > 0.0 && view_box.width > 0.0 && view_box.height > 0.0) {
        return None;
    }
    let scale = (rect.width / view_box.width).max(rect.height / view_box.height);
    Some(FillLayout {
        scale,
        offset_x: (rect.width - view_box.width * scale) / 2.0,
        offset_y: (rect.height - view_box.height * scale) / 2.0,
    })
}

/// Map a client-space point into the view box.
///
/// Returns `None` when the container is not mounted (`rect` is `None`) or has
/// no area.
#[must_use]
pub fn client_to_canvas(
    view_box: ViewBox,
    rect: Option<&ContainerRect>,
    client_x: f64,
    client_y: f64,
) -> Option<CanvasPoint> {
    let rect = rect?;
    let layout = fill_layout(view_box, rect)?;
    let point = CanvasPoint::new(
        (client_x - rect.left - layout.offset_x) / layout.scale,
        (client_y - rect.top - layout.offset_y) / layout.scale,
    );
    point.is_finite().then_some(point)
}

/// Inverse of [`client_to_canvas`]: where a canvas point lands on screen
#[must_use]
pub fn canvas_to_client(
    view_box: ViewBox,
    rect: Option<&ContainerRect>,
    point: CanvasPoint,
) -> Option<(f64, f64)> {
    let rect = rect?;
    let layout = fill_layout(view_box, rect)?;
    Some((
        point.x * layout.scale + layout.offset_x + rect.left,
        point.y * layout.scale + layout.offset_y + rect.top,
    ))
}
