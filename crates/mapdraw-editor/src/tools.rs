//! Per-mode drawing state machines.
//!
//! Each tool turns `DrawEvent`s into `ToolEffect`s: map commands for the
//! overlays it manages, autopan toggles, and at most one completion per
//! gesture. Tools never touch the map directly; they read it through a
//! `ToolContext` and the session applies their effects.
//!
//! ## Gestures
//!
//! | Tool | Start | Update | Finish |
//! |------|-------|--------|--------|
//! | **Marker** | - | - | click |
//! | **Circle** | primary press (center) | move (radius) | release |
//! | **Polyline / Polygon** | click (first vertex) | click adds, move drags the rubber band | double-click |
//! | **Rectangle** | primary press (corner) | move (opposite corner) | release |
//!
//! With right-cancel enabled, a secondary release or Escape mid-gesture
//! discards the gesture instead.

use crate::input::{Button, DrawEvent};
use crate::map::{LabelOffset, MapCommand, MapView, Overlay};
use crate::metrics::GeoMetrics;
use crate::options::{CalculateDisplayOptions, CircleDisplay, RectangleDisplay, TipTexts};
use mapdraw_core::geometry::rectangle_corners;
use mapdraw_core::measure::{circle_label_anchor, format_value};
use mapdraw_core::{
    CalculateData, DisplayFormat, DrawingMode, DrawnOverlay, GeoPoint, LabelStyle, MarkerStyle,
    OverlayId, OverlayShape, OverlayStyle, ShapeStyle, clamp_measurement,
};
use smallvec::SmallVec;
use std::f64::consts::PI;

// ─── Effects & context ───────────────────────────────────────────────────

/// Measurement attached to a completed shape.
#[derive(Debug, Clone, PartialEq)]
pub struct Calculation {
    pub data: CalculateData,
    /// Labels left on the map showing the measurement.
    pub labels: SmallVec<[OverlayId; 2]>,
}

/// A finished gesture.
#[derive(Debug, Clone, PartialEq)]
pub struct Completion {
    pub overlay: DrawnOverlay,
    /// Present only when calculation is enabled.
    pub calculation: Option<Calculation>,
}

/// What a tool asks the session to do.
#[derive(Debug, Clone, PartialEq)]
pub enum ToolEffect {
    Map(MapCommand),
    /// Turn edge-autopan on or off.
    EdgeMove(bool),
    Complete(Completion),
}

/// Read-only view of the session a tool runs in.
pub struct ToolContext<'a> {
    pub map: &'a dyn MapView,
    /// `None` until the measurement collaborator is ready.
    pub metrics: Option<&'a dyn GeoMetrics>,
    pub calculate: bool,
    pub right_cancel: bool,
    pub display: &'a CalculateDisplayOptions,
    pub tips: &'a TipTexts,
    pub tip_style: &'a LabelStyle,
    pub label_style: &'a LabelStyle,
}

impl ToolContext<'_> {
    fn is_cancel(&self, event: &DrawEvent) -> bool {
        self.right_cancel && event.is_cancel_signal()
    }

    fn live_labels(&self) -> bool {
        self.calculate && self.display.is_real_time
    }

    fn label(&self, content: String, position: GeoPoint, offset: LabelOffset) -> Overlay {
        Overlay::Label {
            content,
            position,
            offset,
            style: self.label_style.clone(),
        }
    }
}

/// Trait for tools that consume drawing events and produce effects.
pub trait Tool {
    fn kind(&self) -> DrawingMode;

    /// Handle a drawing event, returning zero or more effects.
    fn handle(&mut self, event: &DrawEvent, ctx: &ToolContext<'_>) -> Vec<ToolEffect>;

    /// Drop any in-progress gesture and its transient overlays without
    /// completing. Leaves the tool idle.
    fn discard(&mut self) -> Vec<ToolEffect>;

    /// Whether a gesture is in progress.
    fn is_drawing(&self) -> bool;

    fn style(&self) -> OverlayStyle;
}

// ─── Transient labels ────────────────────────────────────────────────────

/// The hover tip and live measurement labels a tool keeps on the map.
///
/// Labels are never edited in place: every update removes the old ones and
/// adds fresh ones.
#[derive(Debug, Default)]
struct Labels {
    tip: Option<OverlayId>,
    measure: SmallVec<[OverlayId; 2]>,
}

impl Labels {
    fn show_tip(
        &mut self,
        fx: &mut Vec<ToolEffect>,
        ctx: &ToolContext<'_>,
        text: String,
        at: GeoPoint,
    ) {
        self.hide_tip(fx);
        let id = OverlayId::with_prefix("tip");
        fx.push(ToolEffect::Map(MapCommand::Add {
            id,
            overlay: Overlay::Label {
                content: text,
                position: at,
                offset: LabelOffset::fixed(10.0, 10.0),
                style: ctx.tip_style.clone(),
            },
        }));
        self.tip = Some(id);
    }

    fn hide_tip(&mut self, fx: &mut Vec<ToolEffect>) {
        if let Some(id) = self.tip.take() {
            fx.push(ToolEffect::Map(MapCommand::Remove { id }));
        }
    }

    fn clear_measure(&mut self, fx: &mut Vec<ToolEffect>) {
        for id in self.measure.drain(..) {
            fx.push(ToolEffect::Map(MapCommand::Remove { id }));
        }
    }

    fn show_measure(&mut self, fx: &mut Vec<ToolEffect>, labels: Vec<Overlay>) {
        self.clear_measure(fx);
        for overlay in labels {
            let id = OverlayId::with_prefix("label");
            fx.push(ToolEffect::Map(MapCommand::Add { id, overlay }));
            self.measure.push(id);
        }
    }

    /// Hand the current measurement labels over to a completion.
    fn release_measure(&mut self) -> SmallVec<[OverlayId; 2]> {
        std::mem::take(&mut self.measure)
    }

    fn clear(&mut self, fx: &mut Vec<ToolEffect>) {
        self.hide_tip(fx);
        self.clear_measure(fx);
    }
}

/// A measurement and the labels that display it.
struct Measured {
    data: CalculateData,
    labels: Vec<Overlay>,
}

/// Compose a labelled measurement and finish a gesture with it.
fn complete(
    labels: &mut Labels,
    fx: &mut Vec<ToolEffect>,
    ctx: &ToolContext<'_>,
    overlay: DrawnOverlay,
    measure: impl FnOnce() -> Measured,
) {
    let calculation = ctx.calculate.then(|| {
        let Measured { data, labels: shown } = measure();
        labels.show_measure(fx, shown);
        Calculation {
            data,
            labels: labels.release_measure(),
        }
    });
    labels.clear(fx);
    log::debug!("completed {:?}", overlay.id);
    fx.push(ToolEffect::Complete(Completion {
        overlay,
        calculation,
    }));
}

fn labelled(prefix: &str, value: f64, format: Option<&DisplayFormat>) -> String {
    format!("{prefix}{}", format_value(value, format))
}

// ─── Marker Tool ─────────────────────────────────────────────────────────

pub struct MarkerTool {
    style: MarkerStyle,
}

impl MarkerTool {
    pub fn new(style: MarkerStyle) -> Self {
        Self { style }
    }
}

impl Tool for MarkerTool {
    fn kind(&self) -> DrawingMode {
        DrawingMode::Marker
    }

    fn handle(&mut self, event: &DrawEvent, _ctx: &ToolContext<'_>) -> Vec<ToolEffect> {
        let DrawEvent::Click { point, .. } = event else {
            return vec![];
        };
        let id = OverlayId::with_prefix("marker");
        vec![
            ToolEffect::Map(MapCommand::Add {
                id,
                overlay: Overlay::Marker {
                    point: *point,
                    style: self.style.clone(),
                },
            }),
            ToolEffect::Complete(Completion {
                overlay: DrawnOverlay {
                    id,
                    shape: OverlayShape::Marker { point: *point },
                },
                calculation: None,
            }),
        ]
    }

    fn discard(&mut self) -> Vec<ToolEffect> {
        vec![]
    }

    fn is_drawing(&self) -> bool {
        false
    }

    fn style(&self) -> OverlayStyle {
        OverlayStyle::Marker(self.style.clone())
    }
}

// ─── Circle Tool ─────────────────────────────────────────────────────────

struct CircleGesture {
    id: OverlayId,
    center: GeoPoint,
    /// Radius in meters.
    radius: f64,
    /// Radius in pixels, for placing the label.
    radius_px: f64,
}

pub struct CircleTool {
    style: ShapeStyle,
    gesture: Option<CircleGesture>,
    labels: Labels,
}

impl CircleTool {
    pub fn new(style: ShapeStyle) -> Self {
        Self {
            style,
            gesture: None,
            labels: Labels::default(),
        }
    }

    fn measure(g: &CircleGesture, ctx: &ToolContext<'_>) -> Measured {
        let display = ctx.display;
        let value = match display.circle_display_type {
            CircleDisplay::Radius => g.radius,
            CircleDisplay::Area if ctx.metrics.is_some() => PI * g.radius * g.radius,
            CircleDisplay::Area => 0.0,
        };
        let value = clamp_measurement(value);
        let center_px = ctx.map.geo_to_pixel(g.center);
        let anchor = ctx.map.pixel_to_geo(circle_label_anchor(center_px, g.radius_px));
        let text = labelled(
            display.circle_prefix(),
            value,
            display.circle_display_format.as_ref(),
        );
        Measured {
            data: CalculateData::Scalar(value),
            labels: vec![ctx.label(text, anchor, LabelOffset::BottomRightOnAnchor)],
        }
    }
}

impl Tool for CircleTool {
    fn kind(&self) -> DrawingMode {
        DrawingMode::Circle
    }

    fn handle(&mut self, event: &DrawEvent, ctx: &ToolContext<'_>) -> Vec<ToolEffect> {
        if self.is_drawing() && ctx.is_cancel(event) {
            log::debug!("circle cancelled");
            return self.discard();
        }
        let mut fx = Vec::new();
        match event {
            DrawEvent::Press {
                point,
                button: Button::Primary,
                ..
            } if self.gesture.is_none() => {
                let id = OverlayId::with_prefix("circle");
                fx.push(ToolEffect::Map(MapCommand::Add {
                    id,
                    overlay: Overlay::Circle {
                        center: *point,
                        radius: 0.0,
                        style: self.style.clone(),
                    },
                }));
                fx.push(ToolEffect::EdgeMove(true));
                self.gesture = Some(CircleGesture {
                    id,
                    center: *point,
                    radius: 0.0,
                    radius_px: 0.0,
                });
                self.labels
                    .show_tip(&mut fx, ctx, ctx.tips.release_to_finish.clone(), *point);
                log::debug!("circle started at {point:?}");
            }
            DrawEvent::Move { point, pixel } => match self.gesture.as_mut() {
                Some(g) => {
                    g.radius = ctx.map.distance(g.center, *point);
                    g.radius_px = ctx.map.geo_to_pixel(g.center).distance(*pixel);
                    fx.push(ToolEffect::Map(MapCommand::SetRadius {
                        id: g.id,
                        radius: g.radius,
                    }));
                    log::trace!("circle radius {}", g.radius);
                    self.labels
                        .show_tip(&mut fx, ctx, ctx.tips.release_to_finish.clone(), *point);
                    if ctx.live_labels() {
                        let shown = Self::measure(g, ctx).labels;
                        self.labels.show_measure(&mut fx, shown);
                    }
                }
                None => self
                    .labels
                    .show_tip(&mut fx, ctx, ctx.tips.circle_start.clone(), *point),
            },
            DrawEvent::Release { .. } => {
                let Some(g) = self.gesture.take() else {
                    return fx;
                };
                fx.push(ToolEffect::EdgeMove(false));
                let overlay = DrawnOverlay {
                    id: g.id,
                    shape: OverlayShape::Circle {
                        center: g.center,
                        radius: g.radius,
                    },
                };
                complete(&mut self.labels, &mut fx, ctx, overlay, || Self::measure(&g, ctx));
            }
            _ => {}
        }
        fx
    }

    fn discard(&mut self) -> Vec<ToolEffect> {
        let mut fx = Vec::new();
        if let Some(g) = self.gesture.take() {
            fx.push(ToolEffect::Map(MapCommand::Remove { id: g.id }));
            fx.push(ToolEffect::EdgeMove(false));
        }
        self.labels.clear(&mut fx);
        fx
    }

    fn is_drawing(&self) -> bool {
        self.gesture.is_some()
    }

    fn style(&self) -> OverlayStyle {
        OverlayStyle::Shape(self.style.clone())
    }
}

// ─── Path Tool (polyline / polygon) ──────────────────────────────────────

struct PathGesture {
    id: OverlayId,
    /// Placed vertices, without the rubber-band point.
    vertices: Vec<GeoPoint>,
}

impl PathGesture {
    fn with_rubber_band(&self, at: GeoPoint) -> Vec<GeoPoint> {
        let mut path = self.vertices.clone();
        path.push(at);
        path
    }

    fn has_two_distinct_vertices(&self) -> bool {
        match self.vertices.split_first() {
            Some((first, rest)) => rest.iter().any(|p| p != first),
            None => false,
        }
    }
}

/// Shared machine for open (polyline) and closed (polygon) paths.
pub struct PathTool {
    closed: bool,
    style: ShapeStyle,
    gesture: Option<PathGesture>,
    labels: Labels,
}

impl PathTool {
    pub fn polyline(style: ShapeStyle) -> Self {
        Self::new(false, style)
    }

    pub fn polygon(style: ShapeStyle) -> Self {
        Self::new(true, style)
    }

    fn new(closed: bool, style: ShapeStyle) -> Self {
        Self {
            closed,
            style,
            gesture: None,
            labels: Labels::default(),
        }
    }

    fn overlay(&self, path: Vec<GeoPoint>) -> Overlay {
        let style = self.style.clone();
        if self.closed {
            Overlay::Polygon { path, style }
        } else {
            Overlay::Polyline { path, style }
        }
    }

    fn shape(&self, path: Vec<GeoPoint>) -> OverlayShape {
        if self.closed {
            OverlayShape::Polygon { path }
        } else {
            OverlayShape::Polyline { path }
        }
    }

    fn continue_tip(ctx: &ToolContext<'_>) -> String {
        if ctx.right_cancel {
            format!("{}{}", ctx.tips.path_continue, ctx.tips.right_cancel_hint)
        } else {
            ctx.tips.path_continue.clone()
        }
    }

    fn measure(&self, path: &[GeoPoint], ctx: &ToolContext<'_>) -> Measured {
        let display = ctx.display;
        let (raw, prefix, format) = if self.closed {
            (
                ctx.metrics.map(|m| m.polygon_area(path)),
                display.polygon_prefix(),
                display.polygon_display_format.as_ref(),
            )
        } else {
            (
                ctx.metrics.map(|m| m.polyline_length(path)),
                display.polyline_prefix(),
                display.polyline_display_format.as_ref(),
            )
        };
        let value = clamp_measurement(raw.unwrap_or(0.0));
        let anchor = path.first().copied().unwrap_or_default();
        Measured {
            data: CalculateData::Scalar(value),
            labels: vec![ctx.label(
                labelled(prefix, value, format),
                anchor,
                LabelOffset::Above { gap: 5.0 },
            )],
        }
    }
}

impl Tool for PathTool {
    fn kind(&self) -> DrawingMode {
        if self.closed {
            DrawingMode::Polygon
        } else {
            DrawingMode::Polyline
        }
    }

    fn handle(&mut self, event: &DrawEvent, ctx: &ToolContext<'_>) -> Vec<ToolEffect> {
        if self.is_drawing() && ctx.is_cancel(event) {
            log::debug!("{} cancelled", self.kind());
            return self.discard();
        }
        let mut fx = Vec::new();
        match event {
            DrawEvent::Click { point, .. } => {
                match self.gesture.as_mut() {
                    Some(g) => {
                        g.vertices.push(*point);
                        let path = g.with_rubber_band(*point);
                        fx.push(ToolEffect::Map(MapCommand::SetPath { id: g.id, path }));
                    }
                    None => {
                        let g = PathGesture {
                            id: OverlayId::with_prefix(self.kind().as_str()),
                            vertices: vec![*point],
                        };
                        fx.push(ToolEffect::Map(MapCommand::Add {
                            id: g.id,
                            overlay: self.overlay(g.with_rubber_band(*point)),
                        }));
                        fx.push(ToolEffect::EdgeMove(true));
                        log::debug!("{} started at {point:?}", self.kind());
                        self.gesture = Some(g);
                    }
                }
                self.labels
                    .show_tip(&mut fx, ctx, Self::continue_tip(ctx), *point);
            }
            DrawEvent::Move { point, .. } => match self.gesture.as_ref() {
                Some(g) => {
                    fx.push(ToolEffect::Map(MapCommand::SetPositionAt {
                        id: g.id,
                        index: g.vertices.len(),
                        point: *point,
                    }));
                    self.labels
                        .show_tip(&mut fx, ctx, Self::continue_tip(ctx), *point);
                    if ctx.live_labels() {
                        let shown = self.measure(&g.with_rubber_band(*point), ctx).labels;
                        self.labels.show_measure(&mut fx, shown);
                    }
                }
                None => self
                    .labels
                    .show_tip(&mut fx, ctx, ctx.tips.path_start.clone(), *point),
            },
            DrawEvent::DoubleClick { .. } => {
                let Some(g) = self.gesture.take() else {
                    return fx;
                };
                fx.push(ToolEffect::EdgeMove(false));
                if !self.closed && !g.has_two_distinct_vertices() {
                    log::debug!("polyline discarded: fewer than two distinct vertices");
                    fx.push(ToolEffect::Map(MapCommand::Remove { id: g.id }));
                    self.labels.clear(&mut fx);
                    return fx;
                }
                fx.push(ToolEffect::Map(MapCommand::SetPath {
                    id: g.id,
                    path: g.vertices.clone(),
                }));
                let overlay = DrawnOverlay {
                    id: g.id,
                    shape: self.shape(g.vertices.clone()),
                };
                let measured = self.measure(&g.vertices, ctx);
                complete(&mut self.labels, &mut fx, ctx, overlay, || measured);
            }
            _ => {}
        }
        fx
    }

    fn discard(&mut self) -> Vec<ToolEffect> {
        let mut fx = Vec::new();
        if let Some(g) = self.gesture.take() {
            fx.push(ToolEffect::Map(MapCommand::Remove { id: g.id }));
            fx.push(ToolEffect::EdgeMove(false));
        }
        self.labels.clear(&mut fx);
        fx
    }

    fn is_drawing(&self) -> bool {
        self.gesture.is_some()
    }

    fn style(&self) -> OverlayStyle {
        OverlayStyle::Shape(self.style.clone())
    }
}

// ─── Rectangle Tool ──────────────────────────────────────────────────────

struct RectGesture {
    id: OverlayId,
    start: GeoPoint,
    end: GeoPoint,
}

impl RectGesture {
    fn corners(&self) -> [GeoPoint; 4] {
        rectangle_corners(self.start, self.end)
    }
}

pub struct RectangleTool {
    style: ShapeStyle,
    gesture: Option<RectGesture>,
    labels: Labels,
}

impl RectangleTool {
    pub fn new(style: ShapeStyle) -> Self {
        Self {
            style,
            gesture: None,
            labels: Labels::default(),
        }
    }

    fn measure(corners: &[GeoPoint; 4], ctx: &ToolContext<'_>) -> Measured {
        let display = ctx.display;
        let prefix = display.rectangle_prefix();
        let format = display.rectangle_display_format.as_ref();
        match display.rectangle_display_type {
            RectangleDisplay::Area => {
                let area = clamp_measurement(
                    ctx.metrics.map(|m| m.polygon_area(corners)).unwrap_or(0.0),
                );
                Measured {
                    data: CalculateData::Scalar(area),
                    labels: vec![ctx.label(
                        labelled(prefix, area, format),
                        corners[0],
                        LabelOffset::BottomRightOnAnchor,
                    )],
                }
            }
            RectangleDisplay::SideLength => {
                let width = clamp_measurement(ctx.map.distance(corners[0], corners[1]));
                let height = clamp_measurement(ctx.map.distance(corners[0], corners[3]));
                Measured {
                    data: CalculateData::Pair(width, height),
                    labels: vec![
                        ctx.label(
                            labelled(prefix, width, format),
                            corners[0],
                            LabelOffset::Above { gap: 5.0 },
                        ),
                        ctx.label(
                            labelled(prefix, height, format),
                            corners[1],
                            LabelOffset::fixed(5.0, 0.0),
                        ),
                    ],
                }
            }
        }
    }
}

impl Tool for RectangleTool {
    fn kind(&self) -> DrawingMode {
        DrawingMode::Rectangle
    }

    fn handle(&mut self, event: &DrawEvent, ctx: &ToolContext<'_>) -> Vec<ToolEffect> {
        if self.is_drawing() && ctx.is_cancel(event) {
            log::debug!("rectangle cancelled");
            return self.discard();
        }
        let mut fx = Vec::new();
        match event {
            DrawEvent::Press {
                point,
                button: Button::Primary,
                ..
            } if self.gesture.is_none() => {
                let g = RectGesture {
                    id: OverlayId::with_prefix("rectangle"),
                    start: *point,
                    end: *point,
                };
                fx.push(ToolEffect::Map(MapCommand::Add {
                    id: g.id,
                    overlay: Overlay::Polygon {
                        path: g.corners().to_vec(),
                        style: self.style.clone(),
                    },
                }));
                fx.push(ToolEffect::EdgeMove(true));
                self.labels
                    .show_tip(&mut fx, ctx, ctx.tips.release_to_finish.clone(), *point);
                log::debug!("rectangle started at {point:?}");
                self.gesture = Some(g);
            }
            DrawEvent::Move { point, .. } => match self.gesture.as_mut() {
                Some(g) => {
                    g.end = *point;
                    let corners = g.corners();
                    fx.push(ToolEffect::Map(MapCommand::SetPath {
                        id: g.id,
                        path: corners.to_vec(),
                    }));
                    self.labels
                        .show_tip(&mut fx, ctx, ctx.tips.release_to_finish.clone(), *point);
                    if ctx.live_labels() {
                        let shown = Self::measure(&corners, ctx).labels;
                        self.labels.show_measure(&mut fx, shown);
                    }
                }
                None => self
                    .labels
                    .show_tip(&mut fx, ctx, ctx.tips.rectangle_start.clone(), *point),
            },
            DrawEvent::Release { .. } => {
                let Some(g) = self.gesture.take() else {
                    return fx;
                };
                fx.push(ToolEffect::EdgeMove(false));
                let corners = g.corners();
                let overlay = DrawnOverlay {
                    id: g.id,
                    shape: OverlayShape::Polygon {
                        path: corners.to_vec(),
                    },
                };
                complete(&mut self.labels, &mut fx, ctx, overlay, || {
                    Self::measure(&corners, ctx)
                });
            }
            _ => {}
        }
        fx
    }

    fn discard(&mut self) -> Vec<ToolEffect> {
        let mut fx = Vec::new();
        if let Some(g) = self.gesture.take() {
            fx.push(ToolEffect::Map(MapCommand::Remove { id: g.id }));
            fx.push(ToolEffect::EdgeMove(false));
        }
        self.labels.clear(&mut fx);
        fx
    }

    fn is_drawing(&self) -> bool {
        self.gesture.is_some()
    }

    fn style(&self) -> OverlayStyle {
        OverlayStyle::Shape(self.style.clone())
    }
}
