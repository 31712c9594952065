//! Measurement values and their label formatting.

use kurbo::{Point, Vec2};
use serde::Serialize;
use std::fmt;
use std::rc::Rc;

/// Normalize a raw measurement.
///
/// Non-finite or negative results come from degenerate shapes and become 0;
/// everything else is rounded to two decimals.
pub fn clamp_measurement(value: f64) -> f64 {
    if !value.is_finite() || value <= 0.0 {
        return 0.0;
    }
    (value * 100.0).round() / 100.0
}

/// The measured value(s) reported with a completed shape.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(untagged)]
pub enum CalculateData {
    /// Length, area or radius.
    Scalar(f64),
    /// Independent side lengths of a rectangle, each passed through
    /// [`clamp_measurement`] so both are rounded to two decimals.
    Pair(f64, f64),
}

/// Caller-supplied number formatter for measurement labels.
#[derive(Clone)]
pub struct DisplayFormat(Rc<dyn Fn(f64) -> String>);

impl DisplayFormat {
    pub fn new(f: impl Fn(f64) -> String + 'static) -> Self {
        Self(Rc::new(f))
    }

    pub fn apply(&self, value: f64) -> String {
        (self.0)(value)
    }
}

impl fmt::Debug for DisplayFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("DisplayFormat(..)")
    }
}

/// Render a measurement, using `format` when given.
pub fn format_value(value: f64, format: Option<&DisplayFormat>) -> String {
    match format {
        Some(format) => format.apply(value),
        None => value.to_string(),
    }
}

/// Label anchor for a circle: the point on the circle 35° counter-clockwise
/// from the top, in pixel space (y grows downwards).
pub fn circle_label_anchor(center: Point, radius_px: f64) -> Point {
    let angle = 35f64.to_radians();
    center - Vec2::new(angle.sin() * radius_px, angle.cos() * radius_px)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn degenerate_measurements_clamp_to_zero() {
        assert_eq!(clamp_measurement(f64::NAN), 0.0);
        assert_eq!(clamp_measurement(f64::INFINITY), 0.0);
        assert_eq!(clamp_measurement(-12.5), 0.0);
        assert_eq!(clamp_measurement(0.0), 0.0);
    }

    #[test]
    fn measurements_round_to_two_decimals() {
        assert_eq!(clamp_measurement(1234.5678), 1234.57);
        assert_eq!(clamp_measurement(0.004), 0.0);
    }

    #[test]
    fn custom_format_is_applied() {
        let km = DisplayFormat::new(|v| format!("{:.1} km", v / 1000.0));
        assert_eq!(format_value(2500.0, Some(&km)), "2.5 km");
        assert_eq!(format_value(12.5, None), "12.5");
    }

    #[test]
    fn circle_anchor_sits_on_circle_left_of_top() {
        let center = Point::new(100.0, 100.0);
        let anchor = circle_label_anchor(center, 50.0);
        assert!((anchor.distance(center) - 50.0).abs() < 1e-9);
        assert!(anchor.x < center.x);
        assert!(anchor.y < center.y);
    }
}
