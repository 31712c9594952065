//! Input abstraction layer.
//!
//! Raw pointer events arrive from the host in container-relative terms and
//! are normalized by the input surface into `DrawEvent`s carrying the
//! geographic point under the cursor. Those are what mode machines consume.

use kurbo::{Point, Vec2};
use mapdraw_core::GeoPoint;
use smallvec::SmallVec;

/// Mouse button identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Button {
    #[default]
    Primary,
    Middle,
    Secondary,
}

impl Button {
    /// Map a DOM `MouseEvent.button` value.
    pub fn from_dom(button: i16) -> Self {
        match button {
            1 => Self::Middle,
            2 => Self::Secondary,
            _ => Self::Primary,
        }
    }
}

/// A keyboard key as reported by the host (`KeyboardEvent.key`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Key(pub String);

impl Key {
    pub fn escape() -> Self {
        Self("Escape".to_string())
    }

    pub fn is_escape(&self) -> bool {
        matches!(self.0.as_str(), "Escape" | "Esc")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerKind {
    Down,
    Move,
    Up,
    Click,
    DoubleClick,
}

/// A pointer event as delivered by the host.
#[derive(Debug, Clone, PartialEq)]
pub struct RawPointerEvent {
    pub kind: PointerKind,
    /// Viewport (client) position; drives click de-duplication.
    pub client: Point,
    /// Position relative to the element that received the event.
    pub local: Point,
    /// Offsets of each nested container between the target and the map
    /// container, innermost first.
    pub offsets: SmallVec<[Vec2; 4]>,
    pub button: Button,
}

impl RawPointerEvent {
    /// An event received directly by the map container, so client, local and
    /// container coordinates coincide.
    pub fn at(kind: PointerKind, x: f64, y: f64) -> Self {
        Self {
            kind,
            client: Point::new(x, y),
            local: Point::new(x, y),
            offsets: SmallVec::new(),
            button: Button::Primary,
        }
    }

    pub fn with_button(mut self, button: Button) -> Self {
        self.button = button;
        self
    }

    /// Pointer position in map-container pixels.
    pub fn container_pixel(&self) -> Point {
        self.offsets.iter().fold(self.local, |p, offset| p + *offset)
    }
}

/// A semantic drawing event.
#[derive(Debug, Clone, PartialEq)]
pub enum DrawEvent {
    Press { point: GeoPoint, pixel: Point, button: Button },
    Move { point: GeoPoint, pixel: Point },
    Release { point: GeoPoint, pixel: Point, button: Button },
    Click { point: GeoPoint, pixel: Point },
    DoubleClick { point: GeoPoint, pixel: Point },
    KeyUp { key: Key },
}

impl DrawEvent {
    /// Geographic position, if this is a pointer event.
    pub fn point(&self) -> Option<GeoPoint> {
        match self {
            Self::Press { point, .. }
            | Self::Move { point, .. }
            | Self::Release { point, .. }
            | Self::Click { point, .. }
            | Self::DoubleClick { point, .. } => Some(*point),
            Self::KeyUp { .. } => None,
        }
    }

    /// Whether this event means "abort the gesture": a secondary-button
    /// release or an Escape key-up.
    pub fn is_cancel_signal(&self) -> bool {
        match self {
            Self::Release { button, .. } => *button == Button::Secondary,
            Self::KeyUp { key } => key.is_escape(),
            _ => false,
        }
    }
}
