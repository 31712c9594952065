//! Polygon geometry engine: segment relationships and self-intersection checks.
//!
//! All functions are pure and work on the projected plane (`x = lng`,
//! `y = lat`). A polygon is considered valid when none of its edges touches
//! more than two other edges, i.e. each edge only meets its two neighbours.

use crate::model::GeoPoint;
use kurbo::{Line, Point};

/// A directionless segment between two projected points.
pub type Segment = Line;

/// Tolerance for "zero" cross products and slope differences.
const EPSILON: f64 = 2e-10;

/// Where a point lies relative to a segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntersectionVerdict {
    /// On the segment itself, endpoints included.
    OnSegment,
    /// Off the carrying line, on its upper side (left of it when vertical).
    AboveLine,
    /// Off the carrying line, on its lower side (right of it when vertical).
    BelowLine,
    /// On the carrying line but outside the segment.
    OnLineExtension,
}

impl IntersectionVerdict {
    /// +1 above, -1 below, 0 otherwise.
    fn side(self) -> i8 {
        match self {
            Self::AboveLine => 1,
            Self::BelowLine => -1,
            Self::OnSegment | Self::OnLineExtension => 0,
        }
    }
}

/// Build a segment between two geographic points.
pub fn segment(start: GeoPoint, end: GeoPoint) -> Segment {
    Line::new(start.projected(), end.projected())
}

/// Slope of the carrying line; `+inf` when vertical, NaN when degenerate.
fn slope(seg: &Segment) -> f64 {
    let dx = seg.p0.x - seg.p1.x;
    let dy = seg.p0.y - seg.p1.y;
    if dx == 0.0 && dy != 0.0 {
        return f64::INFINITY;
    }
    dy / dx
}

/// Whether two segments have the same slope (within tolerance).
pub fn same_slope(a: &Segment, b: &Segment) -> bool {
    let ka = slope(a);
    let kb = slope(b);
    ka == kb || (ka - kb).abs() < EPSILON
}

/// Classify `point` against segment `seg`.
pub fn classify_point(point: Point, seg: &Segment) -> IntersectionVerdict {
    let (s, e) = (seg.p0, seg.p1);
    let cross = (point - s).cross(e - s);
    if cross.abs() < EPSILON {
        let inside = point.x >= s.x.min(e.x)
            && point.x <= s.x.max(e.x)
            && point.y >= s.y.min(e.y)
            && point.y <= s.y.max(e.y);
        return if inside {
            IntersectionVerdict::OnSegment
        } else {
            IntersectionVerdict::OnLineExtension
        };
    }

    if s.x == e.x {
        return if point.x < s.x {
            IntersectionVerdict::AboveLine
        } else {
            IntersectionVerdict::BelowLine
        };
    }

    let k = slope(seg);
    let b = s.y - k * s.x;
    if k * point.x + b > point.y {
        IntersectionVerdict::BelowLine
    } else {
        IntersectionVerdict::AboveLine
    }
}

/// Whether two segments touch or cross.
///
/// Any endpoint lying on the other segment counts as overlapping. Collinear
/// segments that do not touch never overlap. Otherwise the segments overlap
/// when each one's endpoints straddle the other.
pub fn is_overlapping(a: &Segment, b: &Segment) -> bool {
    let verdicts = [
        classify_point(a.p0, b),
        classify_point(a.p1, b),
        classify_point(b.p0, a),
        classify_point(b.p1, a),
    ];
    if verdicts.contains(&IntersectionVerdict::OnSegment) {
        return true;
    }
    if verdicts.contains(&IntersectionVerdict::OnLineExtension) {
        return false;
    }
    verdicts[0].side() * verdicts[1].side() < 1 && verdicts[2].side() * verdicts[3].side() < 1
}

/// Edges of the closed ring through `points`, closing edge last.
fn ring_edges(points: &[GeoPoint]) -> impl Iterator<Item = (GeoPoint, Segment)> + '_ {
    points.iter().enumerate().map(move |(i, p)| {
        let next = points[(i + 1) % points.len()];
        (*p, segment(*p, next))
    })
}

/// Whether `points` (in drawing order) form a non self-intersecting polygon.
///
/// Fewer than three points is never a polygon. Each edge may meet at most two
/// non-parallel edges, which for a simple polygon are its two neighbours.
pub fn is_polygon(points: &[GeoPoint]) -> bool {
    if points.len() < 3 {
        return false;
    }
    for (start, edge) in ring_edges(points) {
        let touching = ring_edges(points)
            .filter(|(other_start, _)| *other_start != start)
            .filter(|(_, other)| is_overlapping(&edge, other) && !same_slope(&edge, other))
            .count();
        if touching > 2 {
            log::trace!("edge from {start:?} meets {touching} other edges");
            return false;
        }
    }
    true
}

/// The four corners of the axis-aligned rectangle spanned by two points,
/// in drawing order starting at `start`.
pub fn rectangle_corners(start: GeoPoint, end: GeoPoint) -> [GeoPoint; 4] {
    [
        GeoPoint::new(start.lng, start.lat),
        GeoPoint::new(end.lng, start.lat),
        GeoPoint::new(end.lng, end.lat),
        GeoPoint::new(start.lng, end.lat),
    ]
}
