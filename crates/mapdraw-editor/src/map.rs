//! The rendering collaborator: what the drawing engine needs from a map.
//!
//! Mode machines never touch the map directly; they emit `MapCommand`s that
//! the session applies through `MapView`. Overlays are owned by the map and
//! referenced by `OverlayId`.

use kurbo::{Point, Size, Vec2};
use mapdraw_core::{DrawingMode, GeoPoint, LabelStyle, MarkerStyle, OverlayId, ShapeStyle};
use serde::{Deserialize, Serialize};

/// How a label is displaced from its anchor point.
///
/// The variants other than `Fixed` depend on the rendered label size, which
/// only the map knows.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum LabelOffset {
    Fixed { offset: Vec2 },
    /// Shift up and left by the label size: its bottom-right corner sits on the anchor.
    BottomRightOnAnchor,
    /// Shift up by the label height plus `gap` pixels.
    Above { gap: f64 },
}

impl LabelOffset {
    pub fn fixed(dx: f64, dy: f64) -> Self {
        Self::Fixed {
            offset: Vec2::new(dx, dy),
        }
    }

    /// Resolve against a rendered label size.
    pub fn resolve(self, label: Size) -> Vec2 {
        match self {
            Self::Fixed { offset } => offset,
            Self::BottomRightOnAnchor => Vec2::new(-label.width, -label.height),
            Self::Above { gap } => Vec2::new(0.0, -label.height - gap),
        }
    }
}

/// A renderable overlay description.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Overlay {
    Marker {
        point: GeoPoint,
        style: MarkerStyle,
    },
    Circle {
        center: GeoPoint,
        radius: f64,
        style: ShapeStyle,
    },
    Polyline {
        path: Vec<GeoPoint>,
        style: ShapeStyle,
    },
    Polygon {
        path: Vec<GeoPoint>,
        style: ShapeStyle,
    },
    Label {
        content: String,
        position: GeoPoint,
        offset: LabelOffset,
        style: LabelStyle,
    },
}

/// A change to the map requested by a mode machine.
#[derive(Debug, Clone, PartialEq)]
pub enum MapCommand {
    Add { id: OverlayId, overlay: Overlay },
    Remove { id: OverlayId },
    SetRadius { id: OverlayId, radius: f64 },
    SetPath { id: OverlayId, path: Vec<GeoPoint> },
    SetPositionAt { id: OverlayId, index: usize, point: GeoPoint },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Cursor {
    Crosshair,
    Default,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum WidgetKind {
    CaptureLayer,
    Toolbar,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ControlAnchor {
    #[default]
    TopLeft,
    TopRight,
    BottomLeft,
    BottomRight,
}

/// Which toolbar entry is highlighted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase", tag = "type", content = "mode")]
pub enum ToolbarItem {
    /// Plain map dragging; no drawing.
    Hand,
    Mode(DrawingMode),
}

/// Non-overlay UI mounted on top of the map.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Widget {
    /// Full-viewport transparent layer that owns all pointer input while drawing.
    CaptureLayer {
        origin: Point,
        size: Size,
        cursor: Cursor,
    },
    Toolbar {
        items: Vec<ToolbarItem>,
        active: ToolbarItem,
        anchor: ControlAnchor,
        offset: Vec2,
        scale: f64,
    },
}

impl Widget {
    pub fn kind(&self) -> WidgetKind {
        match self {
            Self::CaptureLayer { .. } => WidgetKind::CaptureLayer,
            Self::Toolbar { .. } => WidgetKind::Toolbar,
        }
    }
}

/// The map/viewport the drawing engine renders into.
pub trait MapView {
    /// Whether the rendering context exists; sessions refuse to start otherwise.
    fn is_ready(&self) -> bool;

    /// Container pixel → geographic point.
    fn pixel_to_geo(&self, pixel: Point) -> GeoPoint;
    /// Geographic point → container pixel.
    fn geo_to_pixel(&self, point: GeoPoint) -> Point;
    fn viewport_size(&self) -> Size;
    /// Great-circle distance in meters.
    fn distance(&self, a: GeoPoint, b: GeoPoint) -> f64;

    fn add_overlay(&mut self, id: OverlayId, overlay: Overlay);
    /// Removing an unknown id is a no-op.
    fn remove_overlay(&mut self, id: OverlayId);
    fn set_circle_radius(&mut self, id: OverlayId, radius: f64);
    fn set_path(&mut self, id: OverlayId, path: &[GeoPoint]);
    fn set_position_at(&mut self, id: OverlayId, index: usize, point: GeoPoint);

    fn pan_by(&mut self, dx: f64, dy: f64);
    fn enable_double_click_zoom(&mut self);
    fn disable_double_click_zoom(&mut self);

    /// Mount (or replace) a widget of the same kind.
    fn mount_widget(&mut self, widget: Widget);
    fn unmount_widget(&mut self, kind: WidgetKind);
}

/// Apply one command to the map.
pub fn apply_command(map: &mut dyn MapView, command: MapCommand) {
    match command {
        MapCommand::Add { id, overlay } => map.add_overlay(id, overlay),
        MapCommand::Remove { id } => map.remove_overlay(id),
        MapCommand::SetRadius { id, radius } => map.set_circle_radius(id, radius),
        MapCommand::SetPath { id, path } => map.set_path(id, &path),
        MapCommand::SetPositionAt { id, index, point } => map.set_position_at(id, index, point),
    }
}

/// Something that lives on the map for a while: mounted, redrawn on
/// viewport changes, and unmounted.
pub trait RenderableOverlay {
    fn attach(&mut self, map: &mut dyn MapView);
    fn draw(&mut self, map: &mut dyn MapView);
    fn detach(&mut self, map: &mut dyn MapView);
}
