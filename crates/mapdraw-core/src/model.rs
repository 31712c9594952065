//! Data model shared by the drawing engine and its embedders.
//!
//! Geographic coordinates are `GeoPoint`s. Geometry checks treat them as a
//! projected plane (`x = lng`, `y = lat`); pixel positions use `kurbo::Point`.

use crate::error::DrawError;
use crate::id::OverlayId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

// ─── Coordinates ─────────────────────────────────────────────────────────

/// Geographic coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lng: f64,
    pub lat: f64,
}

impl GeoPoint {
    pub const fn new(lng: f64, lat: f64) -> Self {
        Self { lng, lat }
    }

    /// Projected plane coordinate used by the geometry engine.
    pub fn projected(self) -> kurbo::Point {
        kurbo::Point::new(self.lng, self.lat)
    }
}

/// Axis-aligned geographic bounds (south-west / north-east corners).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoBounds {
    pub south_west: GeoPoint,
    pub north_east: GeoPoint,
}

impl GeoBounds {
    /// Bounds of a point set, `None` when empty.
    pub fn of(points: &[GeoPoint]) -> Option<Self> {
        let (first, rest) = points.split_first()?;
        let mut sw = *first;
        let mut ne = *first;
        for p in rest {
            sw.lng = sw.lng.min(p.lng);
            sw.lat = sw.lat.min(p.lat);
            ne.lng = ne.lng.max(p.lng);
            ne.lat = ne.lat.max(p.lat);
        }
        Some(Self {
            south_west: sw,
            north_east: ne,
        })
    }

    pub fn contains(&self, p: GeoPoint) -> bool {
        p.lng >= self.south_west.lng
            && p.lng <= self.north_east.lng
            && p.lat >= self.south_west.lat
            && p.lat <= self.north_east.lat
    }
}

// ─── Modes & state ───────────────────────────────────────────────────────

/// What a drawing session produces from pointer gestures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DrawingMode {
    #[default]
    Marker,
    Circle,
    Polyline,
    Polygon,
    Rectangle,
}

impl DrawingMode {
    pub const ALL: [DrawingMode; 5] = [
        DrawingMode::Marker,
        DrawingMode::Circle,
        DrawingMode::Polyline,
        DrawingMode::Polygon,
        DrawingMode::Rectangle,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Marker => "marker",
            Self::Circle => "circle",
            Self::Polyline => "polyline",
            Self::Polygon => "polygon",
            Self::Rectangle => "rectangle",
        }
    }
}

impl fmt::Display for DrawingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DrawingMode {
    type Err = DrawError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        DrawingMode::ALL
            .into_iter()
            .find(|m| m.as_str() == s)
            .ok_or_else(|| DrawError::UnknownMode(s.to_string()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionState {
    #[default]
    Closed,
    Open,
}

// ─── Styles ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StrokeStyle {
    Solid,
    Dashed,
}

/// Style of circle, polyline, polygon and rectangle overlays.
///
/// Unset fields fall back to the renderer's defaults.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ShapeStyle {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stroke_color: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stroke_weight: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stroke_opacity: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stroke_style: Option<StrokeStyle>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fill_color: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fill_opacity: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct MarkerStyle {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Pixel offset of the icon from the anchored point.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub offset: Option<(f64, f64)>,
}

/// CSS-like label properties (`color`, `border`, `fontSize`, ...), applied verbatim.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LabelStyle(pub BTreeMap<String, String>);

impl LabelStyle {
    pub fn with(mut self, property: &str, value: &str) -> Self {
        self.0.insert(property.to_string(), value.to_string());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Style of whichever overlay kind a mode produces.
#[derive(Debug, Clone, PartialEq)]
pub enum OverlayStyle {
    Marker(MarkerStyle),
    Shape(ShapeStyle),
}

// ─── Finished shapes ─────────────────────────────────────────────────────

/// Geometry of a finished overlay.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum OverlayShape {
    Marker { point: GeoPoint },
    Circle { center: GeoPoint, radius: f64 },
    Polyline { path: Vec<GeoPoint> },
    Polygon { path: Vec<GeoPoint> },
}

impl OverlayShape {
    pub fn path(&self) -> &[GeoPoint] {
        match self {
            Self::Polyline { path } | Self::Polygon { path } => path,
            Self::Marker { point } => std::slice::from_ref(point),
            Self::Circle { center, .. } => std::slice::from_ref(center),
        }
    }
}

/// A completed overlay: the map's handle plus its final geometry.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DrawnOverlay {
    pub id: OverlayId,
    pub shape: OverlayShape,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn drawing_mode_names_roundtrip() {
        for mode in DrawingMode::ALL {
            assert_eq!(mode.as_str().parse::<DrawingMode>(), Ok(mode));
        }
        assert_eq!(
            "hander".parse::<DrawingMode>(),
            Err(DrawError::UnknownMode("hander".to_string()))
        );
    }

    #[test]
    fn bounds_cover_all_points() {
        let pts = [
            GeoPoint::new(3.0, -1.0),
            GeoPoint::new(-2.0, 4.0),
            GeoPoint::new(1.0, 1.0),
        ];
        let b = GeoBounds::of(&pts).unwrap();
        assert_eq!(b.south_west, GeoPoint::new(-2.0, -1.0));
        assert_eq!(b.north_east, GeoPoint::new(3.0, 4.0));
        assert!(b.contains(GeoPoint::new(0.0, 0.0)));
        assert!(!b.contains(GeoPoint::new(3.5, 0.0)));
        assert!(GeoBounds::of(&[]).is_none());
    }

    #[test]
    fn shape_style_reads_camel_case_json() {
        let style: ShapeStyle = serde_json::from_str(
            r##"{"strokeColor":"#f00","strokeWeight":3,"strokeStyle":"dashed","fillOpacity":0.4}"##,
        )
        .unwrap();
        assert_eq!(
            style,
            ShapeStyle {
                stroke_color: Some("#f00".into()),
                stroke_weight: Some(3.0),
                stroke_style: Some(StrokeStyle::Dashed),
                fill_opacity: Some(0.4),
                ..ShapeStyle::default()
            }
        );
    }
}
