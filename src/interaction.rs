//! Pointer and wheel handling for the map
//!
//! The controller is a two-state machine. `Idle` moves report the coordinate
//! under the cursor; a press enters `Dragging` and freezes the projection as
//! it was at that moment, so that rotation and pan are always measured from
//! the press point and never accumulate rounding drift. Release classifies
//! the gesture: a short, nearly stationary press is a click and replaces the
//! pin.

use crate::country::CountryResolver;
use crate::models::{Coordinate, Pin};
use crate::projection::Projection;
use crate::viewport::{CanvasPoint, ContainerRect, ViewBox, client_to_canvas};
use std::time::{Duration, Instant};
use tracing::{debug, trace};

pub const DEFAULT_MIN_ZOOM: f64 = 1.0;
pub const DEFAULT_MAX_ZOOM: f64 = 8.0;
pub const DEFAULT_ZOOM_IN_FACTOR: f64 = 1.2;
pub const DEFAULT_ZOOM_OUT_FACTOR: f64 = 0.8;
pub const DEFAULT_BASE_SCALE: f64 = 200.0;

/// Zoom factor clamped to `[min, max]`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ZoomState {
    value: f64,
    min: f64,
    max: f64,
    in_factor: f64,
    out_factor: f64,
}

impl Default for ZoomState {
    fn default() -> Self {
        Self::with_limits(
            DEFAULT_MIN_ZOOM,
            DEFAULT_MAX_ZOOM,
            DEFAULT_ZOOM_IN_FACTOR,
            DEFAULT_ZOOM_OUT_FACTOR,
        )
    }
}

impl ZoomState {
    /// Start at `min` with the given step factors
    #[must_use]
    pub fn with_limits(min: f64, max: f64, in_factor: f64, out_factor: f64) -> Self {
        Self {
            value: min,
            min,
            max,
            in_factor,
            out_factor,
        }
    }

    #[must_use]
    pub fn value(&self) -> f64 {
        self.value
    }

    #[must_use]
    pub fn limits(&self) -> (f64, f64) {
        (self.min, self.max)
    }

    pub fn set(&mut self, value: f64) {
        if value.is_finite() {
            self.value = value.clamp(self.min, self.max);
        }
    }

    pub fn zoom_in(&mut self) -> f64 {
        self.set(self.value * self.in_factor);
        self.value
    }

    pub fn zoom_out(&mut self) -> f64 {
        self.set(self.value * self.out_factor);
        self.value
    }

    /// Negative delta (wheel up) zooms in, anything else zooms out
    pub fn apply_wheel(&mut self, delta_y: f64) -> f64 {
        if delta_y < 0.0 {
            self.zoom_in()
        } else {
            self.zoom_out()
        }
    }
}

/// Whether vertical pan is limited
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum PanPolicy {
    #[default]
    Unbounded,
    /// Pan stays within `[-limit, limit]` canvas units
    Bounded { limit: f64 },
}

impl PanPolicy {
    #[must_use]
    pub fn apply(&self, pan: f64) -> f64 {
        match *self {
            PanPolicy::Unbounded => pan,
            PanPolicy::Bounded { limit } => pan.clamp(-limit.abs(), limit.abs()),
        }
    }
}

/// A pointer position in client pixels at a point in time
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointerEvent {
    pub client_x: f64,
    pub client_y: f64,
    pub at: Instant,
}

impl PointerEvent {
    #[must_use]
    pub fn new(client_x: f64, client_y: f64, at: Instant) -> Self {
        Self {
            client_x,
            client_y,
            at,
        }
    }

    /// Pointer event stamped with the current instant
    #[must_use]
    pub fn now(client_x: f64, client_y: f64) -> Self {
        Self::new(client_x, client_y, Instant::now())
    }

    #[must_use]
    pub fn distance_to(&self, other: &PointerEvent) -> f64 {
        (other.client_x - self.client_x).hypot(other.client_y - self.client_y)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Gesture {
    Click,
    Drag,
}

/// Click vs drag thresholds
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GestureClassifier {
    max_distance_px: f64,
    max_duration: Duration,
}

impl Default for GestureClassifier {
    fn default() -> Self {
        Self::new(6.0, Duration::from_millis(300))
    }
}

impl GestureClassifier {
    #[must_use]
    pub fn new(max_distance_px: f64, max_duration: Duration) -> Self {
        Self {
            max_distance_px,
            max_duration,
        }
    }

    /// Both thresholds are exclusive
    #[must_use]
    pub fn classify(&self, down: &PointerEvent, up: &PointerEvent) -> Gesture {
        let distance = down.distance_to(up);
        let elapsed = up.at.saturating_duration_since(down.at);
        if distance < self.max_distance_px && elapsed < self.max_duration {
            Gesture::Click
        } else {
            Gesture::Drag
        }
    }
}

/// Everything captured when a drag begins
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DragStart {
    pub pointer: PointerEvent,
    pub canvas: CanvasPoint,
    pub rotation: f64,
    pub pan: f64,
    /// Longitude under the press point, if the press landed on the map
    pub longitude: Option<f64>,
    pub projection: Projection,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum InteractionState {
    Idle,
    Dragging(DragStart),
}

/// Pointer affordance shown over the map
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cursor {
    Grab,
    Grabbing,
}

#[derive(Debug, Clone, PartialEq)]
pub enum InteractionEvent {
    Hover {
        coordinate: Coordinate,
        country: Option<String>,
    },
    Dragged {
        rotation: f64,
        pan: f64,
        readout: Option<Coordinate>,
    },
    PinPlaced {
        pin: Pin,
        country: Option<String>,
    },
    Zoomed {
        zoom: f64,
    },
}

/// Map navigation state driven by pointer and wheel input
#[derive(Debug, Clone)]
pub struct InteractionController {
    view_box: ViewBox,
    base_scale: f64,
    container: Option<ContainerRect>,
    state: InteractionState,
    rotation: f64,
    pan: f64,
    zoom: ZoomState,
    pan_policy: PanPolicy,
    classifier: GestureClassifier,
    countries: CountryResolver,
    pin: Option<Pin>,
    readout: Option<Coordinate>,
    country: Option<String>,
}

impl Default for InteractionController {
    fn default() -> Self {
        Self::new(
            ViewBox::default(),
            DEFAULT_BASE_SCALE,
            ZoomState::default(),
            PanPolicy::default(),
            GestureClassifier::default(),
        )
    }
}

impl InteractionController {
    #[must_use]
    pub fn new(
        view_box: ViewBox,
        base_scale: f64,
        zoom: ZoomState,
        pan_policy: PanPolicy,
        classifier: GestureClassifier,
    ) -> Self {
        Self {
            view_box,
            base_scale,
            container: None,
            state: InteractionState::Idle,
            rotation: 0.0,
            pan: 0.0,
            zoom,
            pan_policy,
            classifier,
            countries: CountryResolver::new(),
            pin: None,
            readout: None,
            country: None,
        }
    }

    /// Build a controller from the `[map]` and `[gesture]` settings
    #[must_use]
    pub fn from_config(config: &crate::WeatherLensConfig) -> Self {
        Self::new(
            config.view_box(),
            config.map.base_scale,
            config.zoom_state(),
            config.pan_policy(),
            config.gesture_classifier(),
        )
    }

    #[must_use]
    pub fn with_countries(mut self, countries: CountryResolver) -> Self {
        self.countries = countries;
        self
    }

    pub fn set_countries(&mut self, countries: CountryResolver) {
        self.countries = countries;
    }

    #[must_use]
    pub fn countries(&self) -> &CountryResolver {
        &self.countries
    }

    /// Mount, resize or (with `None`) unmount the map container
    pub fn set_container(&mut self, rect: Option<ContainerRect>) {
        self.container = rect;
    }

    #[must_use]
    pub fn view_box(&self) -> ViewBox {
        self.view_box
    }

    #[must_use]
    pub fn state(&self) -> &InteractionState {
        &self.state
    }

    #[must_use]
    pub fn is_dragging(&self) -> bool {
        matches!(self.state, InteractionState::Dragging(_))
    }

    #[must_use]
    pub fn cursor(&self) -> Cursor {
        if self.is_dragging() {
            Cursor::Grabbing
        } else {
            Cursor::Grab
        }
    }

    #[must_use]
    pub fn rotation(&self) -> f64 {
        self.rotation
    }

    #[must_use]
    pub fn pan(&self) -> f64 {
        self.pan
    }

    #[must_use]
    pub fn zoom(&self) -> f64 {
        self.zoom.value()
    }

    /// `(min, max)` zoom allowed by the configuration
    #[must_use]
    pub fn zoom_limits(&self) -> (f64, f64) {
        self.zoom.limits()
    }

    #[must_use]
    pub fn container(&self) -> Option<&ContainerRect> {
        self.container.as_ref()
    }

    #[must_use]
    pub fn pin(&self) -> Option<&Pin> {
        self.pin.as_ref()
    }

    pub fn clear_pin(&mut self) {
        self.pin = None;
    }

    /// Last coordinate under the pointer, or the pin's after a click
    #[must_use]
    pub fn readout(&self) -> Option<Coordinate> {
        self.readout
    }

    #[must_use]
    pub fn country(&self) -> Option<&str> {
        self.country.as_deref()
    }

    /// `100.000°W , 35.000°N`, or `-- , --` before the pointer has been over the map
    #[must_use]
    pub fn readout_text(&self) -> String {
        match self.readout {
            Some(c) => c.format_readout(),
            None => "-- , --".to_string(),
        }
    }

    /// Jump to a saved view; pan goes through the pan policy
    pub fn restore_view(&mut self, rotation: f64, zoom: f64, pan: f64) {
        self.rotation = rotation;
        self.zoom.set(zoom);
        self.pan = self.pan_policy.apply(pan);
    }

    /// Projection at the current rotation and zoom
    #[must_use]
    pub fn projection(&self) -> Projection {
        Projection::new(self.view_box, self.base_scale, self.rotation, self.zoom.value())
    }

    fn to_canvas(&self, pointer: &PointerEvent) -> Option<CanvasPoint> {
        client_to_canvas(
            self.view_box,
            self.container.as_ref(),
            pointer.client_x,
            pointer.client_y,
        )
    }

    /// Coordinate under a canvas point, taking the vertical pan into account
    fn locate(&self, projection: &Projection, canvas: CanvasPoint, pan: f64) -> Option<Coordinate> {
        projection.invert(canvas.offset_y(-pan))
    }

    fn update_readout(&mut self, coordinate: Coordinate) {
        self.readout = Some(coordinate);
        self.country = self.countries.resolve(coordinate).into_name();
    }

    pub fn pointer_down(&mut self, pointer: PointerEvent) {
        let Some(canvas) = self.to_canvas(&pointer) else {
            trace!("Pointer down without a mounted container");
            return;
        };
        let projection = self.projection();
        let longitude = self
            .locate(&projection, canvas, self.pan)
            .map(|c| c.longitude);
        self.state = InteractionState::Dragging(DragStart {
            pointer,
            canvas,
            rotation: self.rotation,
            pan: self.pan,
            longitude,
            projection,
        });
    }

    pub fn pointer_move(&mut self, pointer: PointerEvent) -> Option<InteractionEvent> {
        let canvas = self.to_canvas(&pointer)?;
        match self.state {
            InteractionState::Idle => {
                let coordinate = self.locate(&self.projection(), canvas, self.pan)?;
                self.update_readout(coordinate);
                Some(InteractionEvent::Hover {
                    coordinate,
                    country: self.country.clone(),
                })
            }
            InteractionState::Dragging(start) => {
                let current = self.locate(&start.projection, canvas, start.pan);
                if let (Some(current), Some(start_longitude)) = (current, start.longitude) {
                    self.rotation = start.rotation + (current.longitude - start_longitude);
                }
                self.pan = self.pan_policy.apply(start.pan + (canvas.y - start.canvas.y));

                if let Some(coordinate) = self.locate(&self.projection(), canvas, self.pan) {
                    self.update_readout(coordinate);
                }
                Some(InteractionEvent::Dragged {
                    rotation: self.rotation,
                    pan: self.pan,
                    readout: self.readout,
                })
            }
        }
    }

    pub fn pointer_up(&mut self, pointer: PointerEvent) -> Option<InteractionEvent> {
        let InteractionState::Dragging(start) =
            std::mem::replace(&mut self.state, InteractionState::Idle)
        else {
            return None;
        };

        if self.classifier.classify(&start.pointer, &pointer) == Gesture::Drag {
            debug!("Drag ended at rotation {:.2}, pan {:.2}", self.rotation, self.pan);
            return None;
        }

        let canvas = self.to_canvas(&pointer)?;
        let coordinate = self.locate(&self.projection(), canvas, self.pan)?;
        let pin = Pin::from(coordinate);
        self.pin = Some(pin);
        self.update_readout(coordinate);
        debug!("Pin placed at {}", coordinate.format_coordinates());
        Some(InteractionEvent::PinPlaced {
            pin,
            country: self.country.clone(),
        })
    }

    pub fn wheel(&mut self, delta_y: f64) -> InteractionEvent {
        InteractionEvent::Zoomed {
            zoom: self.zoom.apply_wheel(delta_y),
        }
    }
}
