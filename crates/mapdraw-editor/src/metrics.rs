//! The measurement collaborator and its on-demand resolution.
//!
//! Length/area formulas on the ellipsoid live outside this crate. A session
//! asks its `MetricsLoader` for them the first time calculation is enabled;
//! the loader may answer immediately or later through
//! `DrawingSession::resolve_metrics`.

use mapdraw_core::{GeoBounds, GeoPoint};
use std::fmt;
use std::rc::Rc;

/// Geodesic measurements and containment tests.
pub trait GeoMetrics {
    /// Total length of an open path, in meters.
    fn polyline_length(&self, path: &[GeoPoint]) -> f64;
    /// Area enclosed by a closed ring, in square meters.
    fn polygon_area(&self, path: &[GeoPoint]) -> f64;

    fn point_in_circle(&self, point: GeoPoint, center: GeoPoint, radius: f64) -> bool;
    fn point_in_polygon(&self, point: GeoPoint, path: &[GeoPoint]) -> bool;
    fn point_in_rect(&self, point: GeoPoint, bounds: &GeoBounds) -> bool;
    fn point_on_polyline(&self, point: GeoPoint, path: &[GeoPoint]) -> bool;
}

/// Outcome of asking a loader for the metrics collaborator.
pub enum LoadStatus {
    Ready(Rc<dyn GeoMetrics>),
    /// The host will call `resolve_metrics` once loading finishes.
    Pending,
    Failed(String),
}

/// Source of the metrics collaborator.
pub trait MetricsLoader {
    fn load(&mut self) -> LoadStatus;
}

/// A loader that hands out an already-constructed collaborator.
pub struct Preloaded(pub Rc<dyn GeoMetrics>);

impl MetricsLoader for Preloaded {
    fn load(&mut self) -> LoadStatus {
        LoadStatus::Ready(Rc::clone(&self.0))
    }
}

/// A loader with nothing to offer; calculation stays at zero.
pub struct Unavailable;

impl MetricsLoader for Unavailable {
    fn load(&mut self) -> LoadStatus {
        LoadStatus::Failed("no measurement collaborator configured".to_string())
    }
}

/// Resolution state of an optional collaborator.
#[derive(Clone)]
pub enum Dependency<T> {
    Absent,
    Pending,
    Ready(T),
    Failed(String),
}

impl<T> Dependency<T> {
    pub fn ready(&self) -> Option<&T> {
        match self {
            Self::Ready(value) => Some(value),
            _ => None,
        }
    }

    /// Whether a new load should be started (nothing requested yet, or the
    /// previous attempt failed).
    pub fn needs_load(&self) -> bool {
        matches!(self, Self::Absent | Self::Failed(_))
    }
}

impl<T> fmt::Debug for Dependency<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Absent => f.write_str("Absent"),
            Self::Pending => f.write_str("Pending"),
            Self::Ready(_) => f.write_str("Ready"),
            Self::Failed(reason) => write!(f, "Failed({reason})"),
        }
    }
}

/// Drives a `Dependency` through its states with a loader.
pub struct MetricsSlot {
    loader: Box<dyn MetricsLoader>,
    state: Dependency<Rc<dyn GeoMetrics>>,
}

impl MetricsSlot {
    pub fn new(loader: Box<dyn MetricsLoader>) -> Self {
        Self {
            loader,
            state: Dependency::Absent,
        }
    }

    /// Start loading unless already pending or ready.
    pub fn ensure(&mut self) {
        if !self.state.needs_load() {
            return;
        }
        self.state = match self.loader.load() {
            LoadStatus::Ready(metrics) => Dependency::Ready(metrics),
            LoadStatus::Pending => Dependency::Pending,
            LoadStatus::Failed(reason) => {
                log::warn!("measurement collaborator unavailable: {reason}");
                Dependency::Failed(reason)
            }
        };
        log::debug!("metrics dependency -> {:?}", self.state);
    }

    /// Complete a pending load.
    pub fn resolve(&mut self, result: Result<Rc<dyn GeoMetrics>, String>) {
        self.state = match result {
            Ok(metrics) => Dependency::Ready(metrics),
            Err(reason) => {
                log::warn!("measurement collaborator failed to load: {reason}");
                Dependency::Failed(reason)
            }
        };
    }

    pub fn get(&self) -> Option<&dyn GeoMetrics> {
        self.state.ready().map(|m| m.as_ref())
    }

    pub fn state(&self) -> &Dependency<Rc<dyn GeoMetrics>> {
        &self.state
    }
}
