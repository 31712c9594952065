//! Drawing sessions.
//!
//! A `DrawingSession` owns one tool per mode, the input surface, an optional
//! toolbar and the listeners for its events. The state lives behind
//! `Rc<RefCell<..>>` so the registry can close a session when another one
//! opens. Events are collected while the state is borrowed and emitted after
//! the borrow ends, so listeners may call back into the session.

use crate::events::{EventEmitter, OverlayComplete, SessionEvent, SessionEventKind};
use crate::input::{DrawEvent, Key, RawPointerEvent};
use crate::map::{MapView, RenderableOverlay, ToolbarItem, apply_command};
use crate::mask::InputSurface;
use crate::metrics::{Dependency, GeoMetrics, MetricsLoader, MetricsSlot, Unavailable};
use crate::options::DrawingOptions;
use crate::registry::{SessionId, SessionRegistry};
use crate::timer::Deferred;
use crate::toolbar::Toolbar;
use crate::tools::{
    CircleTool, Completion, MarkerTool, PathTool, RectangleTool, Tool, ToolContext, ToolEffect,
};
use kurbo::Size;
use mapdraw_core::{
    DrawError, DrawingMode, GeoBounds, GeoPoint, ListenerKey, OverlayShape, OverlayStyle,
    SessionState,
};
use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

// ─── Tools ───────────────────────────────────────────────────────────────

/// One tool instance per mode, kept for the lifetime of the session.
struct Tools {
    marker: MarkerTool,
    circle: CircleTool,
    polyline: PathTool,
    polygon: PathTool,
    rectangle: RectangleTool,
}

impl Tools {
    fn new(options: &DrawingOptions) -> Self {
        Self {
            marker: MarkerTool::new(options.marker_options.clone()),
            circle: CircleTool::new(options.circle_options.clone()),
            polyline: PathTool::polyline(options.polyline_options.clone()),
            polygon: PathTool::polygon(options.polygon_options.clone()),
            rectangle: RectangleTool::new(options.rectangle_options.clone()),
        }
    }

    fn get(&self, mode: DrawingMode) -> &dyn Tool {
        match mode {
            DrawingMode::Marker => &self.marker,
            DrawingMode::Circle => &self.circle,
            DrawingMode::Polyline => &self.polyline,
            DrawingMode::Polygon => &self.polygon,
            DrawingMode::Rectangle => &self.rectangle,
        }
    }

    fn get_mut(&mut self, mode: DrawingMode) -> &mut dyn Tool {
        match mode {
            DrawingMode::Marker => &mut self.marker,
            DrawingMode::Circle => &mut self.circle,
            DrawingMode::Polyline => &mut self.polyline,
            DrawingMode::Polygon => &mut self.polygon,
            DrawingMode::Rectangle => &mut self.rectangle,
        }
    }
}

// ─── Core ────────────────────────────────────────────────────────────────

pub(crate) struct SessionCore {
    id: SessionId,
    registry: SessionRegistry,
    map: Rc<RefCell<dyn MapView>>,
    options: DrawingOptions,
    state: SessionState,
    mode: DrawingMode,
    calculate: bool,
    right_cancel: bool,
    /// Escape / secondary-release handling is live (open with right-cancel on).
    cancel_armed: bool,
    tools: Tools,
    /// Created on first open, reused afterwards.
    surface: Option<InputSurface>,
    toolbar: Option<Toolbar>,
    metrics: MetricsSlot,
    zoom_restore: Option<Deferred>,
    disposed: bool,
}

impl SessionCore {
    pub(crate) fn is_open(&self) -> bool {
        self.state == SessionState::Open
    }

    fn open(&mut self) -> bool {
        if self.disposed || self.is_open() {
            return false;
        }
        self.registry.close_all_except(self.id);
        self.state = SessionState::Open;
        self.registry.set_open(self.id, true);
        self.zoom_restore = None;
        self.cancel_armed = self.right_cancel;

        let autopan = self.options.autopan;
        let surface = self
            .surface
            .get_or_insert_with(|| InputSurface::new(autopan));
        let mut map = self.map.borrow_mut();
        surface.attach(&mut *map);
        map.disable_double_click_zoom();
        if let Some(toolbar) = self.toolbar.as_mut() {
            toolbar.highlight(ToolbarItem::Mode(self.mode), &mut *map);
        }
        log::debug!("{:?} open in {} mode", self.id, self.mode);
        true
    }

    /// Close the session; `false` if it was already closed.
    pub(crate) fn close(&mut self) -> bool {
        if !self.is_open() {
            return false;
        }
        self.discard_gesture();
        self.state = SessionState::Closed;
        self.registry.set_open(self.id, false);
        self.cancel_armed = false;

        let mut map = self.map.borrow_mut();
        if let Some(surface) = self.surface.as_mut() {
            surface.detach(&mut *map);
        }
        if let Some(toolbar) = self.toolbar.as_mut() {
            toolbar.highlight(ToolbarItem::Hand, &mut *map);
        }
        self.zoom_restore = Some(Deferred::after(self.options.zoom_restore_delay()));
        log::debug!("{:?} closed", self.id);
        true
    }

    /// Drop the gesture of the current tool. Discarding never completes an
    /// overlay.
    fn discard_gesture(&mut self) {
        let effects = self.tools.get_mut(self.mode).discard();
        let events = self.apply(effects);
        if !events.is_empty() {
            log::warn!(
                "{:?} dropped {} event(s) while discarding a {} gesture",
                self.id,
                events.len(),
                self.mode
            );
        }
    }

    fn set_mode(&mut self, mode: DrawingMode) {
        if mode == self.mode {
            return;
        }
        self.registry.close_all_except(self.id);
        self.discard_gesture();
        log::debug!("{:?} mode {} -> {mode}", self.id, self.mode);
        self.mode = mode;
        if self.is_open()
            && let Some(toolbar) = self.toolbar.as_mut()
        {
            toolbar.highlight(ToolbarItem::Mode(mode), &mut *self.map.borrow_mut());
        }
    }

    fn select(&mut self, item: ToolbarItem) {
        match item {
            ToolbarItem::Hand => {
                self.close();
                self.zoom_restore = None;
                self.map.borrow_mut().enable_double_click_zoom();
            }
            ToolbarItem::Mode(mode) => {
                self.set_mode(mode);
                self.open();
                self.map.borrow_mut().disable_double_click_zoom();
            }
        }
    }

    fn mount_toolbar(&mut self) {
        let mut toolbar = Toolbar::new(self.options.drawing_tool_options.clone());
        toolbar.attach(&mut *self.map.borrow_mut());
        self.toolbar = Some(toolbar);
    }

    fn set_right_cancel(&mut self, enabled: bool) {
        self.right_cancel = enabled;
        self.cancel_armed = enabled && self.is_open();
    }

    // ─── Input ───────────────────────────────────────────────────────────

    fn handle_pointer(&mut self, raw: &RawPointerEvent) -> Vec<SessionEvent> {
        if !self.is_open() {
            return vec![];
        }
        let event = {
            let map = self.map.borrow();
            let Some(surface) = self.surface.as_mut() else {
                return vec![];
            };
            surface.normalize(raw, &*map)
        };
        match event {
            Some(event) => self.dispatch(event),
            None => vec![],
        }
    }

    fn handle_key_up(&mut self, key: Key) -> Vec<SessionEvent> {
        if !self.is_open() {
            return vec![];
        }
        self.dispatch(DrawEvent::KeyUp { key })
    }

    fn dispatch(&mut self, event: DrawEvent) -> Vec<SessionEvent> {
        let cancel = self.cancel_armed && event.is_cancel_signal();
        let was_drawing = self.tools.get(self.mode).is_drawing();

        let effects = self.run_tool(&event);
        let mut events = self.apply(effects);

        if cancel {
            let aborted = was_drawing && !self.tools.get(self.mode).is_drawing();
            let closed = self.options.close_on_cancel && self.close();
            if aborted || closed {
                log::debug!("{:?} cancel (aborted: {aborted}, closed: {closed})", self.id);
                events.push(SessionEvent::Cancel);
            }
        }
        events
    }

    fn run_tool(&mut self, event: &DrawEvent) -> Vec<ToolEffect> {
        let map = self.map.borrow();
        let ctx = ToolContext {
            map: &*map,
            metrics: self.metrics.get(),
            calculate: self.calculate,
            right_cancel: self.right_cancel,
            display: &self.options.calculate_display_options,
            tips: &self.options.tips,
            tip_style: &self.options.tip_label_options,
            label_style: &self.options.calculate_label_options,
        };
        self.tools.get_mut(self.mode).handle(event, &ctx)
    }

    fn apply(&mut self, effects: Vec<ToolEffect>) -> Vec<SessionEvent> {
        let mut events = Vec::new();
        for effect in effects {
            match effect {
                ToolEffect::Map(command) => apply_command(&mut *self.map.borrow_mut(), command),
                ToolEffect::EdgeMove(enabled) => {
                    if let Some(surface) = self.surface.as_mut() {
                        surface.set_edge_move(enabled);
                    }
                }
                ToolEffect::Complete(done) => self.complete(done, &mut events),
            }
        }
        events
    }

    /// Mode-specific event first, then `overlaycomplete`.
    fn complete(&self, done: Completion, events: &mut Vec<SessionEvent>) {
        let Completion {
            overlay,
            calculation,
        } = done;
        events.push(SessionEvent::ModeComplete {
            mode: self.mode,
            overlay: overlay.clone(),
        });
        let (calculate, label) = match calculation.filter(|_| self.calculate) {
            Some(calc) => (Some(calc.data), Some(calc.labels)),
            None => (None, None),
        };
        events.push(SessionEvent::OverlayComplete(OverlayComplete {
            overlay,
            drawing_mode: self.mode,
            calculate,
            label,
        }));
    }

    fn advance(&mut self, dt: Duration) {
        let mut map = self.map.borrow_mut();
        if let Some(surface) = self.surface.as_mut() {
            surface.advance(dt, &mut *map);
        }
        let due = self.zoom_restore.as_mut().is_some_and(|d| d.advance(dt));
        if due {
            self.zoom_restore = None;
            if self.registry.open_count() == 0 {
                log::debug!("{:?} restoring double-click zoom", self.id);
                map.enable_double_click_zoom();
            }
        }
    }

    fn resize(&mut self, size: Size) {
        if let Some(surface) = self.surface.as_mut() {
            surface.resize(size, &mut *self.map.borrow_mut());
        }
    }

    fn is_point_in_shape(&self, mode: DrawingMode, point: GeoPoint, shape: &OverlayShape) -> bool {
        if !self.calculate {
            return false;
        }
        let Some(metrics) = self.metrics.get() else {
            return false;
        };
        match (mode, shape) {
            (DrawingMode::Circle, OverlayShape::Circle { center, radius }) => {
                metrics.point_in_circle(point, *center, *radius)
            }
            (DrawingMode::Polygon, OverlayShape::Polygon { path }) => {
                metrics.point_in_polygon(point, path)
            }
            (DrawingMode::Rectangle, shape) => GeoBounds::of(shape.path())
                .is_some_and(|bounds| metrics.point_in_rect(point, &bounds)),
            (DrawingMode::Polyline, OverlayShape::Polyline { path }) => {
                metrics.point_on_polyline(point, path)
            }
            _ => false,
        }
    }

    fn dispose(&mut self) {
        if self.disposed {
            return;
        }
        self.close();
        self.zoom_restore = None;
        if let Some(mut toolbar) = self.toolbar.take() {
            toolbar.detach(&mut *self.map.borrow_mut());
        }
        self.registry.unregister(self.id);
        self.disposed = true;
        log::debug!("{:?} disposed", self.id);
    }
}

// ─── Public handle ───────────────────────────────────────────────────────

/// A drawing manager bound to one map.
///
/// Dropping the session disposes it.
pub struct DrawingSession {
    core: Rc<RefCell<SessionCore>>,
    emitter: RefCell<EventEmitter>,
}

impl DrawingSession {
    /// Create a session without a measurement collaborator.
    pub fn new(
        registry: &SessionRegistry,
        map: Rc<RefCell<dyn MapView>>,
        options: DrawingOptions,
    ) -> Result<Self, DrawError> {
        Self::with_metrics(registry, map, options, Box::new(Unavailable))
    }

    /// Create a session whose measurements come from `loader`, consulted the
    /// first time calculation is enabled.
    pub fn with_metrics(
        registry: &SessionRegistry,
        map: Rc<RefCell<dyn MapView>>,
        options: DrawingOptions,
        loader: Box<dyn MetricsLoader>,
    ) -> Result<Self, DrawError> {
        if !map.borrow().is_ready() {
            log::warn!("drawing session requested before the map is ready");
            return Err(DrawError::MapNotReady);
        }
        let id = SessionId::next();
        let core = SessionCore {
            id,
            registry: registry.clone(),
            map,
            state: SessionState::Closed,
            mode: options.drawing_mode,
            calculate: options.enable_calculate,
            right_cancel: options.enable_right_cancel,
            cancel_armed: false,
            tools: Tools::new(&options),
            surface: None,
            toolbar: None,
            metrics: MetricsSlot::new(loader),
            zoom_restore: None,
            disposed: false,
            options,
        };
        let core = Rc::new(RefCell::new(core));
        registry.register(id, &core);
        {
            let mut core = core.borrow_mut();
            if core.options.enable_drawing_tool {
                core.mount_toolbar();
            }
            if core.calculate {
                core.metrics.ensure();
            }
            if core.options.is_open {
                core.open();
            }
        }
        log::debug!("{id:?} created");
        Ok(Self {
            core,
            emitter: RefCell::new(EventEmitter::new()),
        })
    }

    pub fn id(&self) -> SessionId {
        self.core.borrow().id
    }

    /// Start drawing; closes every other session in the registry.
    pub fn open(&self) {
        self.core.borrow_mut().open();
        self.settle();
    }

    /// Stop drawing, discarding any gesture in progress.
    pub fn close(&self) {
        self.core.borrow_mut().close();
    }

    pub fn set_mode(&self, mode: DrawingMode) {
        self.core.borrow_mut().set_mode(mode);
        self.settle();
    }

    pub fn mode(&self) -> DrawingMode {
        self.core.borrow().mode
    }

    pub fn state(&self) -> SessionState {
        self.core.borrow().state
    }

    pub fn is_open(&self) -> bool {
        self.core.borrow().is_open()
    }

    /// Whether the active tool has a gesture in progress.
    pub fn is_drawing(&self) -> bool {
        let core = self.core.borrow();
        core.tools.get(core.mode).is_drawing()
    }

    /// Style the tool for `mode` applies to new overlays.
    pub fn style(&self, mode: DrawingMode) -> OverlayStyle {
        self.core.borrow().tools.get(mode).style()
    }

    pub fn enable_calculate(&self) {
        let mut core = self.core.borrow_mut();
        core.calculate = true;
        core.metrics.ensure();
    }

    pub fn disable_calculate(&self) {
        self.core.borrow_mut().calculate = false;
    }

    pub fn is_calculating(&self) -> bool {
        self.core.borrow().calculate
    }

    pub fn enable_right_cancel(&self) {
        self.core.borrow_mut().set_right_cancel(true);
    }

    pub fn disable_right_cancel(&self) {
        self.core.borrow_mut().set_right_cancel(false);
    }

    /// Complete a metrics load the loader reported as pending.
    pub fn resolve_metrics(&self, result: Result<Rc<dyn GeoMetrics>, String>) {
        self.core.borrow_mut().metrics.resolve(result);
    }

    pub fn metrics_ready(&self) -> bool {
        matches!(self.core.borrow().metrics.state(), Dependency::Ready(_))
    }

    /// Containment test for a finished shape. Always `false` unless
    /// calculation is enabled and the measurement collaborator is ready.
    pub fn is_point_in_shape(
        &self,
        mode: DrawingMode,
        point: GeoPoint,
        shape: &OverlayShape,
    ) -> bool {
        self.core.borrow().is_point_in_shape(mode, point, shape)
    }

    // ─── Toolbar ───────────────────────────────────────────────────────

    pub fn toolbar_items(&self) -> Option<Vec<ToolbarItem>> {
        self.core.borrow().toolbar.as_ref().map(|t| t.items().to_vec())
    }

    pub fn active_toolbar_item(&self) -> Option<ToolbarItem> {
        self.core.borrow().toolbar.as_ref().map(|t| t.active())
    }

    /// React to a toolbar selection: the hand closes the session, a mode
    /// switches to it and opens.
    pub fn select_tool(&self, item: ToolbarItem) {
        self.core.borrow_mut().select(item);
        self.settle();
    }

    // ─── Events ────────────────────────────────────────────────────────

    pub fn on(
        &self,
        kind: SessionEventKind,
        handler: impl Fn(&SessionEvent) + 'static,
    ) -> ListenerKey {
        self.emitter.borrow_mut().on(kind, handler)
    }

    pub fn on_keyed(
        &self,
        kind: SessionEventKind,
        key: &str,
        handler: impl Fn(&SessionEvent) + 'static,
    ) -> Result<ListenerKey, DrawError> {
        self.emitter.borrow_mut().on_keyed(kind, key, handler)
    }

    pub fn off(&self, kind: SessionEventKind, key: ListenerKey) -> bool {
        self.emitter.borrow_mut().off(kind, key)
    }

    /// Register by event name (`overlaycomplete`, `oncancel`, ...).
    pub fn add_event_listener(
        &self,
        name: &str,
        key: Option<&str>,
        handler: impl Fn(&SessionEvent) + 'static,
    ) -> Result<ListenerKey, DrawError> {
        let kind: SessionEventKind = name.parse()?;
        match key {
            Some(key) => self.on_keyed(kind, key, handler),
            None => Ok(self.on(kind, handler)),
        }
    }

    pub fn remove_event_listener(&self, name: &str, key: &str) -> Result<bool, DrawError> {
        let kind: SessionEventKind = name.parse()?;
        Ok(self.off(kind, ListenerKey::parse(key)?))
    }

    /// Apply a close that another session requested while this one was
    /// borrowed.
    fn settle(&self) {
        let Ok(mut core) = self.core.try_borrow_mut() else {
            return;
        };
        if core.registry.take_close_pending(core.id) && core.close() {
            log::debug!("{:?} closed after dispatch", core.id);
        }
    }

    fn emit_all(&self, events: Vec<SessionEvent>) {
        for event in events {
            let listeners = self.emitter.borrow().listeners(event.kind());
            for handler in listeners {
                handler(&event);
            }
        }
    }

    // ─── Host input ────────────────────────────────────────────────────

    pub fn handle_pointer(&self, raw: RawPointerEvent) {
        let events = self.core.borrow_mut().handle_pointer(&raw);
        self.settle();
        self.emit_all(events);
    }

    pub fn handle_key_up(&self, key: Key) {
        let events = self.core.borrow_mut().handle_key_up(key);
        self.settle();
        self.emit_all(events);
    }

    pub fn handle_viewport_resize(&self, size: Size) {
        self.core.borrow_mut().resize(size);
        self.settle();
    }

    /// Drive timers by `elapsed` wall-clock time.
    pub fn advance(&self, elapsed: Duration) {
        self.core.borrow_mut().advance(elapsed);
        self.settle();
    }

    /// Whether edge-autopan is currently panning the map.
    pub fn is_autopanning(&self) -> bool {
        self.core
            .borrow()
            .surface
            .as_ref()
            .is_some_and(|s| s.is_autopanning())
    }

    /// Close, unmount and leave the registry. Idempotent.
    pub fn dispose(&self) {
        if let Ok(mut core) = self.core.try_borrow_mut() {
            core.dispose();
        }
    }
}

impl Drop for DrawingSession {
    fn drop(&mut self) {
        self.dispose();
    }
}
