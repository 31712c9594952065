//! Session configuration.
//!
//! `DrawingOptions` is what the embedding application passes at
//! construction. It deserializes from camelCase JSON, and every field has a
//! default, so `{}` is a valid configuration. Label number formatters are
//! closures and can only be attached from Rust.

use crate::map::ControlAnchor;
use mapdraw_core::{
    DisplayFormat, DrawError, DrawingMode, LabelStyle, MarkerStyle, ShapeStyle,
};
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DrawingOptions {
    pub drawing_mode: DrawingMode,
    /// Mount the mode toolbar on the map.
    pub enable_drawing_tool: bool,
    pub drawing_tool_options: ToolbarOptions,
    pub enable_calculate: bool,
    /// Right-button release / Escape aborts the current gesture.
    pub enable_right_cancel: bool,
    /// Also close the session when a gesture is aborted by right-click/Escape.
    pub close_on_cancel: bool,
    /// Open the session right after construction.
    pub is_open: bool,
    pub marker_options: MarkerStyle,
    pub circle_options: ShapeStyle,
    pub polyline_options: ShapeStyle,
    pub polygon_options: ShapeStyle,
    pub rectangle_options: ShapeStyle,
    pub tip_label_options: LabelStyle,
    pub calculate_label_options: LabelStyle,
    pub calculate_display_options: CalculateDisplayOptions,
    pub tips: TipTexts,
    pub autopan: AutopanOptions,
    /// Delay before double-click zoom is re-enabled after closing.
    pub zoom_restore_delay_ms: u64,
}

impl Default for DrawingOptions {
    fn default() -> Self {
        Self {
            drawing_mode: DrawingMode::Marker,
            enable_drawing_tool: false,
            drawing_tool_options: ToolbarOptions::default(),
            enable_calculate: false,
            enable_right_cancel: false,
            close_on_cancel: false,
            is_open: false,
            marker_options: MarkerStyle::default(),
            circle_options: ShapeStyle::default(),
            polyline_options: ShapeStyle::default(),
            polygon_options: ShapeStyle::default(),
            rectangle_options: ShapeStyle::default(),
            tip_label_options: LabelStyle::default(),
            calculate_label_options: LabelStyle::default(),
            calculate_display_options: CalculateDisplayOptions::default(),
            tips: TipTexts::default(),
            autopan: AutopanOptions::default(),
            zoom_restore_delay_ms: 2000,
        }
    }
}

impl DrawingOptions {
    pub fn from_json(json: &str) -> Result<Self, DrawError> {
        serde_json::from_str(json).map_err(|e| DrawError::InvalidOptions(e.to_string()))
    }

    pub fn zoom_restore_delay(&self) -> Duration {
        Duration::from_millis(self.zoom_restore_delay_ms)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CircleDisplay {
    #[default]
    Radius,
    Area,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RectangleDisplay {
    #[default]
    SideLength,
    Area,
}

/// What measurement labels show and how.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CalculateDisplayOptions {
    /// Recompute and redraw the label on every pointer move.
    pub is_real_time: bool,
    pub circle_display_type: CircleDisplay,
    pub rectangle_display_type: RectangleDisplay,
    pub circle_display_prefix: Option<String>,
    pub polyline_display_prefix: Option<String>,
    pub polygon_display_prefix: Option<String>,
    pub rectangle_display_prefix: Option<String>,
    #[serde(skip)]
    pub circle_display_format: Option<DisplayFormat>,
    #[serde(skip)]
    pub polyline_display_format: Option<DisplayFormat>,
    #[serde(skip)]
    pub polygon_display_format: Option<DisplayFormat>,
    #[serde(skip)]
    pub rectangle_display_format: Option<DisplayFormat>,
}

impl CalculateDisplayOptions {
    pub fn circle_prefix(&self) -> &str {
        match (&self.circle_display_prefix, self.circle_display_type) {
            (Some(p), _) => p,
            (None, CircleDisplay::Area) => "Area: ",
            (None, CircleDisplay::Radius) => "Radius: ",
        }
    }

    pub fn polyline_prefix(&self) -> &str {
        self.polyline_display_prefix.as_deref().unwrap_or("Length: ")
    }

    pub fn polygon_prefix(&self) -> &str {
        self.polygon_display_prefix.as_deref().unwrap_or("Area: ")
    }

    pub fn rectangle_prefix(&self) -> &str {
        match (&self.rectangle_display_prefix, self.rectangle_display_type) {
            (Some(p), _) => p,
            (None, RectangleDisplay::Area) => "Area: ",
            (None, RectangleDisplay::SideLength) => "Side: ",
        }
    }
}

/// Texts of the tip label that follows the pointer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TipTexts {
    pub circle_start: String,
    pub rectangle_start: String,
    pub path_start: String,
    pub release_to_finish: String,
    pub path_continue: String,
    pub right_cancel_hint: String,
}

impl Default for TipTexts {
    fn default() -> Self {
        Self {
            circle_start: "Press to set the center, drag to set the radius".into(),
            rectangle_start: "Press to set the start point, drag to draw".into(),
            path_start: "Click to set the start point".into(),
            release_to_finish: "Release to finish".into(),
            path_continue: "Click to continue, double-click to finish".into(),
            right_cancel_hint: ", right-click to cancel".into(),
        }
    }
}

/// Pixel margins around the viewport that trigger edge-autopan.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EdgeMargins {
    pub left: f64,
    pub right: f64,
    pub top: f64,
    pub bottom: f64,
}

impl Default for EdgeMargins {
    fn default() -> Self {
        Self {
            left: 20.0,
            right: 20.0,
            top: 50.0,
            bottom: 10.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AutopanOptions {
    pub margins: EdgeMargins,
    /// Pixels panned per tick.
    pub step: f64,
    pub period_ms: u64,
}

impl Default for AutopanOptions {
    fn default() -> Self {
        Self {
            margins: EdgeMargins::default(),
            step: 8.0,
            period_ms: 30,
        }
    }
}

impl AutopanOptions {
    pub fn period(&self) -> Duration {
        Duration::from_millis(self.period_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ToolbarOptions {
    /// Modes offered, in display order.
    pub drawing_modes: Vec<DrawingMode>,
    pub anchor: ControlAnchor,
    pub offset: (f64, f64),
    pub scale: f64,
}

impl Default for ToolbarOptions {
    fn default() -> Self {
        Self {
            drawing_modes: DrawingMode::ALL.to_vec(),
            anchor: ControlAnchor::TopLeft,
            offset: (10.0, 10.0),
            scale: 1.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn empty_json_yields_defaults() {
        let opts = DrawingOptions::from_json("{}").unwrap();
        assert_eq!(opts.drawing_mode, DrawingMode::Marker);
        assert_eq!(opts.zoom_restore_delay_ms, 2000);
        assert_eq!(opts.autopan, AutopanOptions::default());
        assert_eq!(opts.drawing_tool_options.drawing_modes.len(), 5);
    }

    #[test]
    fn camel_case_json_is_read() {
        let opts = DrawingOptions::from_json(
            r##"{
                "drawingMode": "polygon",
                "enableCalculate": true,
                "enableRightCancel": true,
                "polygonOptions": { "strokeColor": "#00f", "fillOpacity": 0.3 },
                "calculateDisplayOptions": { "isRealTime": true, "rectangleDisplayType": "area" },
                "autopan": { "step": 12, "margins": { "top": 80 } }
            }"##,
        )
        .unwrap();
        assert_eq!(opts.drawing_mode, DrawingMode::Polygon);
        assert!(opts.enable_calculate && opts.enable_right_cancel);
        assert_eq!(opts.polygon_options.stroke_color.as_deref(), Some("#00f"));
        assert!(opts.calculate_display_options.is_real_time);
        assert_eq!(
            opts.calculate_display_options.rectangle_display_type,
            RectangleDisplay::Area
        );
        assert_eq!(opts.autopan.step, 12.0);
        assert_eq!(opts.autopan.margins.top, 80.0);
        assert_eq!(opts.autopan.margins.left, 20.0);
    }

    #[test]
    fn malformed_json_is_an_options_error() {
        let err = DrawingOptions::from_json(r#"{"drawingMode": "hexagon"}"#).unwrap_err();
        assert!(matches!(err, DrawError::InvalidOptions(_)));
    }

    #[test]
    fn prefixes_follow_display_type() {
        let mut display = CalculateDisplayOptions::default();
        assert_eq!(display.circle_prefix(), "Radius: ");
        assert_eq!(display.rectangle_prefix(), "Side: ");
        display.circle_display_type = CircleDisplay::Area;
        assert_eq!(display.circle_prefix(), "Area: ");
        display.polyline_display_prefix = Some("Total: ".into());
        assert_eq!(display.polyline_prefix(), "Total: ");
    }
}
