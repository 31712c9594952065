//! Session events and their listeners.

use mapdraw_core::{CalculateData, DrawError, DrawingMode, DrawnOverlay, ListenerKey, OverlayId};
use serde::Serialize;
use smallvec::SmallVec;
use std::fmt;
use std::rc::Rc;
use std::str::FromStr;

/// The closed set of events a session emits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionEventKind {
    MarkerComplete,
    CircleComplete,
    PolylineComplete,
    PolygonComplete,
    RectangleComplete,
    OverlayComplete,
    Cancel,
}

impl SessionEventKind {
    pub const ALL: [SessionEventKind; 7] = [
        Self::MarkerComplete,
        Self::CircleComplete,
        Self::PolylineComplete,
        Self::PolygonComplete,
        Self::RectangleComplete,
        Self::OverlayComplete,
        Self::Cancel,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::MarkerComplete => "markercomplete",
            Self::CircleComplete => "circlecomplete",
            Self::PolylineComplete => "polylinecomplete",
            Self::PolygonComplete => "polygoncomplete",
            Self::RectangleComplete => "rectanglecomplete",
            Self::OverlayComplete => "overlaycomplete",
            Self::Cancel => "cancel",
        }
    }

    /// The mode-specific completion event.
    pub fn completed(mode: DrawingMode) -> Self {
        match mode {
            DrawingMode::Marker => Self::MarkerComplete,
            DrawingMode::Circle => Self::CircleComplete,
            DrawingMode::Polyline => Self::PolylineComplete,
            DrawingMode::Polygon => Self::PolygonComplete,
            DrawingMode::Rectangle => Self::RectangleComplete,
        }
    }
}

impl fmt::Display for SessionEventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SessionEventKind {
    type Err = DrawError;

    /// Accepts `overlaycomplete` as well as `onoverlaycomplete`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.strip_prefix("on").unwrap_or(s);
        Self::ALL
            .into_iter()
            .find(|k| k.as_str() == name)
            .ok_or_else(|| DrawError::UnknownEvent(s.to_string()))
    }
}

/// Payload of `overlaycomplete`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OverlayComplete {
    pub overlay: DrawnOverlay,
    pub drawing_mode: DrawingMode,
    /// Measurement; only when calculation is enabled.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub calculate: Option<CalculateData>,
    /// Measurement labels left on the map; only when calculation is enabled.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<SmallVec<[OverlayId; 2]>>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    /// `markercomplete`, `circlecomplete`, ... carrying the finished overlay.
    ModeComplete {
        mode: DrawingMode,
        overlay: DrawnOverlay,
    },
    OverlayComplete(OverlayComplete),
    /// A gesture was aborted, or the session closed, by a cancel signal.
    Cancel,
}

impl SessionEvent {
    pub fn kind(&self) -> SessionEventKind {
        match self {
            Self::ModeComplete { mode, .. } => SessionEventKind::completed(*mode),
            Self::OverlayComplete(_) => SessionEventKind::OverlayComplete,
            Self::Cancel => SessionEventKind::Cancel,
        }
    }
}

pub type Listener = Rc<dyn Fn(&SessionEvent)>;

/// Keyed listener lists, invoked in registration order.
#[derive(Default)]
pub struct EventEmitter {
    listeners: Vec<(SessionEventKind, ListenerKey, Listener)>,
}

impl EventEmitter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a listener under a generated key.
    pub fn on(
        &mut self,
        kind: SessionEventKind,
        handler: impl Fn(&SessionEvent) + 'static,
    ) -> ListenerKey {
        let key = ListenerKey::generated();
        self.listeners.push((kind, key, Rc::new(handler)));
        key
    }

    /// Register a listener under a caller-chosen key, replacing any listener
    /// already registered for `kind` under that key.
    pub fn on_keyed(
        &mut self,
        kind: SessionEventKind,
        key: &str,
        handler: impl Fn(&SessionEvent) + 'static,
    ) -> Result<ListenerKey, DrawError> {
        let key = ListenerKey::parse(key)?;
        let handler: Listener = Rc::new(handler);
        match self
            .listeners
            .iter_mut()
            .find(|(k, existing, _)| *k == kind && *existing == key)
        {
            Some(entry) => entry.2 = handler,
            None => self.listeners.push((kind, key, handler)),
        }
        Ok(key)
    }

    /// Remove the listener registered for `kind` under `key`.
    pub fn off(&mut self, kind: SessionEventKind, key: ListenerKey) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(k, existing, _)| !(*k == kind && *existing == key));
        self.listeners.len() != before
    }

    /// Snapshot of the listeners for `kind`, so they can run without the
    /// emitter borrowed.
    pub fn listeners(&self, kind: SessionEventKind) -> Vec<Listener> {
        self.listeners
            .iter()
            .filter(|(k, _, _)| *k == kind)
            .map(|(_, _, handler)| Rc::clone(handler))
            .collect()
    }

    pub fn emit(&self, event: &SessionEvent) {
        for handler in self.listeners(event.kind()) {
            handler(event);
        }
    }

    pub fn len(&self) -> usize {
        self.listeners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }
}
