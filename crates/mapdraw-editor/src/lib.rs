pub mod events;
pub mod headless;
pub mod input;
pub mod map;
pub mod mask;
pub mod metrics;
pub mod options;
pub mod registry;
pub mod session;
pub mod timer;
pub mod toolbar;
pub mod tools;

pub use events::{EventEmitter, OverlayComplete, SessionEvent, SessionEventKind};
pub use headless::{FlatMetrics, HeadlessMap};
pub use input::{Button, DrawEvent, Key, PointerKind, RawPointerEvent};
pub use map::{MapView, Overlay, ToolbarItem, Widget, WidgetKind};
pub use metrics::{GeoMetrics, LoadStatus, MetricsLoader, Preloaded};
pub use options::DrawingOptions;
pub use registry::{SessionId, SessionRegistry};
pub use session::DrawingSession;
