//! Deterministic collaborators for tests and offline tooling.
//!
//! `HeadlessMap` is a flat world: a linear, axis-aligned projection
//! (`geo = origin + pixel * scale`) where one coordinate unit is one meter.
//! It records every overlay, pan and widget so callers can inspect what a
//! session did. `FlatMetrics` measures in the same plane.

use crate::map::{MapView, Overlay, Widget, WidgetKind};
use crate::metrics::GeoMetrics;
use kurbo::{BezPath, Line, ParamCurveNearest, Point, Shape, Size, Vec2};
use mapdraw_core::{GeoBounds, GeoPoint, OverlayId};

pub struct HeadlessMap {
    ready: bool,
    /// Geographic point under container pixel (0, 0).
    origin: GeoPoint,
    /// Coordinate units per pixel.
    scale: f64,
    size: Size,
    overlays: Vec<(OverlayId, Overlay)>,
    pans: Vec<Vec2>,
    widgets: Vec<Widget>,
    double_click_zoom: bool,
}

impl HeadlessMap {
    pub fn new(size: Size) -> Self {
        Self {
            ready: true,
            origin: GeoPoint::new(0.0, 0.0),
            scale: 1.0,
            size,
            overlays: Vec::new(),
            pans: Vec::new(),
            widgets: Vec::new(),
            double_click_zoom: true,
        }
    }

    /// A map whose rendering context does not exist yet.
    pub fn unready(size: Size) -> Self {
        Self {
            ready: false,
            ..Self::new(size)
        }
    }

    pub fn with_projection(mut self, origin: GeoPoint, scale: f64) -> Self {
        self.origin = origin;
        self.scale = scale;
        self
    }

    pub fn set_ready(&mut self, ready: bool) {
        self.ready = ready;
    }

    pub fn resize(&mut self, size: Size) {
        self.size = size;
    }

    pub fn overlay(&self, id: OverlayId) -> Option<&Overlay> {
        self.overlays.iter().find(|(k, _)| *k == id).map(|(_, o)| o)
    }

    pub fn overlays(&self) -> impl Iterator<Item = (OverlayId, &Overlay)> {
        self.overlays.iter().map(|(id, o)| (*id, o))
    }

    /// Overlays other than labels.
    pub fn shape_count(&self) -> usize {
        self.overlays
            .iter()
            .filter(|(_, o)| !matches!(o, Overlay::Label { .. }))
            .count()
    }

    /// Contents of all labels, in insertion order.
    pub fn label_texts(&self) -> Vec<&str> {
        self.overlays
            .iter()
            .filter_map(|(_, o)| match o {
                Overlay::Label { content, .. } => Some(content.as_str()),
                _ => None,
            })
            .collect()
    }

    pub fn pans(&self) -> &[Vec2] {
        &self.pans
    }

    pub fn widget(&self, kind: WidgetKind) -> Option<&Widget> {
        self.widgets.iter().find(|w| w.kind() == kind)
    }

    pub fn double_click_zoom_enabled(&self) -> bool {
        self.double_click_zoom
    }

    fn path_mut(&mut self, id: OverlayId) -> Option<&mut Vec<GeoPoint>> {
        self.overlays
            .iter_mut()
            .find(|(k, _)| *k == id)
            .and_then(|(_, o)| match o {
                Overlay::Polyline { path, .. } | Overlay::Polygon { path, .. } => Some(path),
                _ => None,
            })
    }
}

impl MapView for HeadlessMap {
    fn is_ready(&self) -> bool {
        self.ready
    }

    fn pixel_to_geo(&self, pixel: Point) -> GeoPoint {
        GeoPoint::new(
            self.origin.lng + pixel.x * self.scale,
            self.origin.lat + pixel.y * self.scale,
        )
    }

    fn geo_to_pixel(&self, point: GeoPoint) -> Point {
        Point::new(
            (point.lng - self.origin.lng) / self.scale,
            (point.lat - self.origin.lat) / self.scale,
        )
    }

    fn viewport_size(&self) -> Size {
        self.size
    }

    fn distance(&self, a: GeoPoint, b: GeoPoint) -> f64 {
        a.projected().distance(b.projected())
    }

    fn add_overlay(&mut self, id: OverlayId, overlay: Overlay) {
        self.remove_overlay(id);
        self.overlays.push((id, overlay));
    }

    fn remove_overlay(&mut self, id: OverlayId) {
        self.overlays.retain(|(k, _)| *k != id);
    }

    fn set_circle_radius(&mut self, id: OverlayId, radius: f64) {
        if let Some((_, Overlay::Circle { radius: r, .. })) =
            self.overlays.iter_mut().find(|(k, _)| *k == id)
        {
            *r = radius;
        }
    }

    fn set_path(&mut self, id: OverlayId, path: &[GeoPoint]) {
        if let Some(p) = self.path_mut(id) {
            *p = path.to_vec();
        }
    }

    fn set_position_at(&mut self, id: OverlayId, index: usize, point: GeoPoint) {
        match self.path_mut(id) {
            Some(p) if index < p.len() => p[index] = point,
            Some(p) if index == p.len() => p.push(point),
            _ => log::trace!("set_position_at ignored for {id:?}[{index}]"),
        }
    }

    fn pan_by(&mut self, dx: f64, dy: f64) {
        self.origin.lng -= dx * self.scale;
        self.origin.lat -= dy * self.scale;
        self.pans.push(Vec2::new(dx, dy));
    }

    fn enable_double_click_zoom(&mut self) {
        self.double_click_zoom = true;
    }

    fn disable_double_click_zoom(&mut self) {
        self.double_click_zoom = false;
    }

    fn mount_widget(&mut self, widget: Widget) {
        self.unmount_widget(widget.kind());
        self.widgets.push(widget);
    }

    fn unmount_widget(&mut self, kind: WidgetKind) {
        self.widgets.retain(|w| w.kind() != kind);
    }
}

// ─── Planar metrics ──────────────────────────────────────────────────────

/// Tolerance for `point_on_polyline`, in coordinate units.
const ON_LINE_TOLERANCE: f64 = 1e-6;

/// Measurements in the projected plane; lengths in coordinate units, areas
/// in squared units.
#[derive(Debug, Clone, Copy, Default)]
pub struct FlatMetrics;

fn ring(path: &[GeoPoint]) -> BezPath {
    let mut ring = BezPath::new();
    let mut points = path.iter().map(|p| p.projected());
    if let Some(first) = points.next() {
        ring.move_to(first);
        for p in points {
            ring.line_to(p);
        }
        ring.close_path();
    }
    ring
}

impl GeoMetrics for FlatMetrics {
    fn polyline_length(&self, path: &[GeoPoint]) -> f64 {
        path.windows(2)
            .map(|w| w[0].projected().distance(w[1].projected()))
            .sum()
    }

    fn polygon_area(&self, path: &[GeoPoint]) -> f64 {
        if path.len() < 3 {
            return 0.0;
        }
        ring(path).area().abs()
    }

    fn point_in_circle(&self, point: GeoPoint, center: GeoPoint, radius: f64) -> bool {
        point.projected().distance(center.projected()) <= radius
    }

    fn point_in_polygon(&self, point: GeoPoint, path: &[GeoPoint]) -> bool {
        path.len() >= 3 && ring(path).contains(point.projected())
    }

    fn point_in_rect(&self, point: GeoPoint, bounds: &GeoBounds) -> bool {
        bounds.contains(point)
    }

    fn point_on_polyline(&self, point: GeoPoint, path: &[GeoPoint]) -> bool {
        let q = point.projected();
        path.windows(2).any(|w| {
            let seg = Line::new(w[0].projected(), w[1].projected());
            seg.nearest(q, 1e-9).distance_sq <= ON_LINE_TOLERANCE * ON_LINE_TOLERANCE
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mapdraw_core::ShapeStyle;
    use pretty_assertions::assert_eq;

    fn square() -> Vec<GeoPoint> {
        vec![
            GeoPoint::new(0.0, 0.0),
            GeoPoint::new(4.0, 0.0),
            GeoPoint::new(4.0, 4.0),
            GeoPoint::new(0.0, 4.0),
        ]
    }

    #[test]
    fn projection_roundtrips_and_follows_pans() {
        let mut map = HeadlessMap::new(Size::new(800.0, 600.0))
            .with_projection(GeoPoint::new(100.0, 30.0), 0.5);
        let p = map.pixel_to_geo(Point::new(10.0, 20.0));
        assert_eq!(p, GeoPoint::new(105.0, 40.0));
        assert_eq!(map.geo_to_pixel(p), Point::new(10.0, 20.0));

        map.pan_by(8.0, 0.0);
        assert_eq!(map.geo_to_pixel(p), Point::new(18.0, 20.0));
        assert_eq!(map.pans(), &[Vec2::new(8.0, 0.0)]);
    }

    #[test]
    fn path_edits_apply_to_recorded_overlays() {
        let mut map = HeadlessMap::new(Size::new(100.0, 100.0));
        let id = OverlayId::intern("headless_poly");
        map.add_overlay(
            id,
            Overlay::Polyline {
                path: vec![GeoPoint::new(0.0, 0.0)],
                style: ShapeStyle::default(),
            },
        );
        map.set_position_at(id, 1, GeoPoint::new(1.0, 1.0));
        map.set_position_at(id, 1, GeoPoint::new(2.0, 2.0));
        let Some(Overlay::Polyline { path, .. }) = map.overlay(id) else {
            panic!("polyline missing");
        };
        assert_eq!(path, &vec![GeoPoint::new(0.0, 0.0), GeoPoint::new(2.0, 2.0)]);
        map.remove_overlay(id);
        assert_eq!(map.shape_count(), 0);
    }

    #[test]
    fn flat_metrics_measure_in_plane() {
        let m = FlatMetrics;
        assert_eq!(m.polygon_area(&square()), 16.0);
        assert_eq!(m.polyline_length(&square()), 12.0);
        assert_eq!(m.polygon_area(&square()[..2]), 0.0);
        assert!(m.point_in_polygon(GeoPoint::new(2.0, 2.0), &square()));
        assert!(!m.point_in_polygon(GeoPoint::new(5.0, 2.0), &square()));
        assert!(m.point_on_polyline(GeoPoint::new(2.0, 0.0), &square()));
        assert!(!m.point_on_polyline(GeoPoint::new(2.0, 1.0), &square()));
        assert!(m.point_in_circle(GeoPoint::new(3.0, 4.0), GeoPoint::new(0.0, 0.0), 5.0));
    }
}
