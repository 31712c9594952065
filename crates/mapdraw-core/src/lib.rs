pub mod error;
pub mod geometry;
pub mod id;
pub mod measure;
pub mod model;

pub use error::DrawError;
pub use geometry::{IntersectionVerdict, Segment, is_overlapping, is_polygon, rectangle_corners};
pub use id::{ListenerKey, OverlayId};
pub use measure::{CalculateData, DisplayFormat, clamp_measurement};
pub use model::*;

// Re-export kurbo's pixel-space types so downstream crates share one definition
pub use kurbo::{Point, Size, Vec2};
