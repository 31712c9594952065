//! Collaborators backed by methods on plain JavaScript objects.
//!
//! Geometry crosses the boundary as JSON strings (`{"lng":..,"lat":..}`
//! points, paths as arrays of points); scalars are passed as numbers.

use js_sys::{Array, Function, Reflect};
use kurbo::{Point, Size};
use mapdraw_core::{GeoBounds, GeoPoint, OverlayId};
use mapdraw_editor::map::{MapView, Overlay, Widget, WidgetKind};
use mapdraw_editor::{GeoMetrics, LoadStatus, MetricsLoader};
use serde::Serialize;
use wasm_bindgen::{JsCast, JsValue};

/// Call `target[name](...args)`. Missing methods and thrown exceptions are
/// logged and yield `None`.
fn invoke(target: &JsValue, name: &str, args: &[JsValue]) -> Option<JsValue> {
    let method = Reflect::get(target, &JsValue::from_str(name)).ok()?;
    let Some(func) = method.dyn_ref::<Function>() else {
        log::warn!("host object has no method {name}");
        return None;
    };
    let args: Array = args.iter().collect();
    match func.apply(target, &args) {
        Ok(value) => Some(value),
        Err(err) => {
            log::warn!("host method {name} threw: {err:?}");
            None
        }
    }
}

fn number_field(value: &JsValue, name: &str) -> f64 {
    Reflect::get(value, &JsValue::from_str(name))
        .ok()
        .and_then(|v| v.as_f64())
        .unwrap_or(0.0)
}

fn json<T: Serialize + ?Sized>(value: &T) -> JsValue {
    match serde_json::to_string(value) {
        Ok(text) => JsValue::from_str(&text),
        Err(err) => {
            log::warn!("failed to serialize host argument: {err}");
            JsValue::NULL
        }
    }
}

fn id(id: OverlayId) -> JsValue {
    JsValue::from_str(&id.to_string())
}

pub(crate) fn widget_kind_name(kind: WidgetKind) -> &'static str {
    match kind {
        WidgetKind::CaptureLayer => "captureLayer",
        WidgetKind::Toolbar => "toolbar",
    }
}

// ─── Map ─────────────────────────────────────────────────────────────────

/// The host map. Expected methods: `isReady`, `pixelToPoint(x, y)`,
/// `pointToPixel(lng, lat)`, `getSize`, `getDistance(lng1, lat1, lng2, lat2)`,
/// `addOverlay(id, json)`, `removeOverlay(id)`, `setRadius(id, r)`,
/// `setPath(id, json)`, `setPositionAt(id, index, lng, lat)`, `panBy(dx, dy)`,
/// `enableDoubleClickZoom`, `disableDoubleClickZoom`, `mountWidget(json)`,
/// `unmountWidget(kind)`.
pub struct JsMap {
    host: JsValue,
}

impl JsMap {
    pub fn new(host: JsValue) -> Self {
        Self { host }
    }

    fn call(&self, name: &str, args: &[JsValue]) -> Option<JsValue> {
        invoke(&self.host, name, args)
    }
}

impl MapView for JsMap {
    fn is_ready(&self) -> bool {
        self.call("isReady", &[])
            .and_then(|v| v.as_bool())
            .unwrap_or(false)
    }

    fn pixel_to_geo(&self, pixel: Point) -> GeoPoint {
        self.call("pixelToPoint", &[pixel.x.into(), pixel.y.into()])
            .map(|p| GeoPoint::new(number_field(&p, "lng"), number_field(&p, "lat")))
            .unwrap_or_default()
    }

    fn geo_to_pixel(&self, point: GeoPoint) -> Point {
        self.call("pointToPixel", &[point.lng.into(), point.lat.into()])
            .map(|p| Point::new(number_field(&p, "x"), number_field(&p, "y")))
            .unwrap_or(Point::ZERO)
    }

    fn viewport_size(&self) -> Size {
        self.call("getSize", &[])
            .map(|s| Size::new(number_field(&s, "width"), number_field(&s, "height")))
            .unwrap_or(Size::ZERO)
    }

    fn distance(&self, a: GeoPoint, b: GeoPoint) -> f64 {
        self.call(
            "getDistance",
            &[a.lng.into(), a.lat.into(), b.lng.into(), b.lat.into()],
        )
        .and_then(|v| v.as_f64())
        .unwrap_or(0.0)
    }

    fn add_overlay(&mut self, overlay_id: OverlayId, overlay: Overlay) {
        self.call("addOverlay", &[id(overlay_id), json(&overlay)]);
    }

    fn remove_overlay(&mut self, overlay_id: OverlayId) {
        self.call("removeOverlay", &[id(overlay_id)]);
    }

    fn set_circle_radius(&mut self, overlay_id: OverlayId, radius: f64) {
        self.call("setRadius", &[id(overlay_id), radius.into()]);
    }

    fn set_path(&mut self, overlay_id: OverlayId, path: &[GeoPoint]) {
        self.call("setPath", &[id(overlay_id), json(path)]);
    }

    fn set_position_at(&mut self, overlay_id: OverlayId, index: usize, point: GeoPoint) {
        self.call(
            "setPositionAt",
            &[
                id(overlay_id),
                (index as f64).into(),
                point.lng.into(),
                point.lat.into(),
            ],
        );
    }

    fn pan_by(&mut self, dx: f64, dy: f64) {
        self.call("panBy", &[dx.into(), dy.into()]);
    }

    fn enable_double_click_zoom(&mut self) {
        self.call("enableDoubleClickZoom", &[]);
    }

    fn disable_double_click_zoom(&mut self) {
        self.call("disableDoubleClickZoom", &[]);
    }

    fn mount_widget(&mut self, widget: Widget) {
        self.call("mountWidget", &[json(&widget)]);
    }

    fn unmount_widget(&mut self, kind: WidgetKind) {
        self.call("unmountWidget", &[JsValue::from_str(widget_kind_name(kind))]);
    }
}

// ─── Metrics ─────────────────────────────────────────────────────────────

/// Host-provided measurement library. Expected methods: `polylineLength`,
/// `polygonArea`, `isPointInCircle`, `isPointInPolygon`, `isPointInRect`,
/// `isPointOnPolyline`, each taking JSON geometry.
pub struct JsMetrics {
    host: JsValue,
}

impl JsMetrics {
    pub fn new(host: JsValue) -> Self {
        Self { host }
    }

    fn number(&self, name: &str, args: &[JsValue]) -> f64 {
        invoke(&self.host, name, args)
            .and_then(|v| v.as_f64())
            .unwrap_or(0.0)
    }

    fn test(&self, name: &str, args: &[JsValue]) -> bool {
        invoke(&self.host, name, args)
            .and_then(|v| v.as_bool())
            .unwrap_or(false)
    }
}

impl GeoMetrics for JsMetrics {
    fn polyline_length(&self, path: &[GeoPoint]) -> f64 {
        self.number("polylineLength", &[json(path)])
    }

    fn polygon_area(&self, path: &[GeoPoint]) -> f64 {
        self.number("polygonArea", &[json(path)])
    }

    fn point_in_circle(&self, point: GeoPoint, center: GeoPoint, radius: f64) -> bool {
        self.test(
            "isPointInCircle",
            &[json(&point), json(&center), radius.into()],
        )
    }

    fn point_in_polygon(&self, point: GeoPoint, path: &[GeoPoint]) -> bool {
        self.test("isPointInPolygon", &[json(&point), json(path)])
    }

    fn point_in_rect(&self, point: GeoPoint, bounds: &GeoBounds) -> bool {
        self.test("isPointInRect", &[json(&point), json(bounds)])
    }

    fn point_on_polyline(&self, point: GeoPoint, path: &[GeoPoint]) -> bool {
        self.test("isPointOnPolyline", &[json(&point), json(path)])
    }
}

/// Loader for metrics the host supplies later through `setMetrics`.
pub struct HostMetrics;

impl MetricsLoader for HostMetrics {
    fn load(&mut self) -> LoadStatus {
        log::debug!("waiting for the host to call setMetrics");
        LoadStatus::Pending
    }
}
