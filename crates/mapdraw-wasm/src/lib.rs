//! WASM bridge for mapdraw: exposes drawing sessions to a JavaScript map host.
//!
//! Compiled via `wasm-pack build --target web`. The host hands over an object
//! implementing the map methods (see [`host::JsMap`]) and receives session
//! events as JSON strings through callbacks.

mod host;

use host::{HostMetrics, JsMap, JsMetrics};
use js_sys::Function;
use kurbo::{Size, Vec2};
use mapdraw_core::{DrawError, DrawingMode, GeoPoint, OverlayShape, OverlayStyle, SessionState};
use mapdraw_editor::map::{MapView, ToolbarItem};
use mapdraw_editor::{
    Button, DrawingOptions, DrawingSession, Key, PointerKind, RawPointerEvent, SessionEvent,
    SessionEventKind, SessionRegistry,
};
use serde_json::json;
use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;
use wasm_bindgen::prelude::*;

fn to_js(err: DrawError) -> JsValue {
    JsValue::from_str(&err.to_string())
}

/// Set of sessions that exclude each other. Managers created against the
/// same registry never draw at the same time.
#[wasm_bindgen]
#[derive(Clone, Default)]
pub struct WasmRegistry {
    inner: SessionRegistry,
}

#[wasm_bindgen]
impl WasmRegistry {
    #[wasm_bindgen(constructor)]
    pub fn new() -> Self {
        Self::default()
    }

    #[wasm_bindgen(js_name = openCount)]
    pub fn open_count(&self) -> usize {
        self.inner.open_count()
    }

    #[wasm_bindgen(js_name = sessionCount)]
    pub fn session_count(&self) -> usize {
        self.inner.len()
    }
}

/// One drawing session bound to a host map.
///
/// All methods take `&self` so event callbacks may call back into the
/// manager while an event is being delivered.
#[wasm_bindgen]
pub struct WasmDrawingManager {
    session: DrawingSession,
}

#[wasm_bindgen]
impl WasmDrawingManager {
    /// Create a manager. `options` is a JSON `DrawingOptions` object; an
    /// empty string selects the defaults.
    #[wasm_bindgen(constructor)]
    pub fn new(
        registry: &WasmRegistry,
        host: JsValue,
        options: &str,
    ) -> Result<WasmDrawingManager, JsValue> {
        console_error_panic_hook_setup();
        install_console_logger();

        let options = if options.trim().is_empty() {
            DrawingOptions::default()
        } else {
            DrawingOptions::from_json(options).map_err(to_js)?
        };
        let map: Rc<RefCell<dyn MapView>> = Rc::new(RefCell::new(JsMap::new(host)));
        let session =
            DrawingSession::with_metrics(&registry.inner, map, options, Box::new(HostMetrics))
                .map_err(to_js)?;
        Ok(Self { session })
    }

    // ─── Lifecycle ───────────────────────────────────────────────────────

    pub fn open(&self) {
        self.session.open();
    }

    pub fn close(&self) {
        self.session.close();
    }

    pub fn dispose(&self) {
        self.session.dispose();
    }

    #[wasm_bindgen(js_name = isOpen)]
    pub fn is_open(&self) -> bool {
        self.session.is_open()
    }

    #[wasm_bindgen(js_name = isDrawing)]
    pub fn is_drawing(&self) -> bool {
        self.session.is_drawing()
    }

    pub fn state(&self) -> String {
        match self.session.state() {
            SessionState::Open => "open",
            SessionState::Closed => "closed",
        }
        .to_string()
    }

    #[wasm_bindgen(js_name = setMode)]
    pub fn set_mode(&self, mode: &str) -> Result<(), JsValue> {
        let mode: DrawingMode = mode.parse().map_err(to_js)?;
        self.session.set_mode(mode);
        Ok(())
    }

    pub fn mode(&self) -> String {
        self.session.mode().as_str().to_string()
    }

    /// Configured style of `mode`'s overlays, as JSON.
    pub fn style(&self, mode: &str) -> Result<String, JsValue> {
        let mode: DrawingMode = mode.parse().map_err(to_js)?;
        let text = match self.session.style(mode) {
            OverlayStyle::Marker(style) => serde_json::to_string(&style),
            OverlayStyle::Shape(style) => serde_json::to_string(&style),
        };
        text.map_err(|e| JsValue::from_str(&e.to_string()))
    }

    // ─── Calculation & cancel ────────────────────────────────────────────

    #[wasm_bindgen(js_name = enableCalculate)]
    pub fn enable_calculate(&self) {
        self.session.enable_calculate();
    }

    #[wasm_bindgen(js_name = disableCalculate)]
    pub fn disable_calculate(&self) {
        self.session.disable_calculate();
    }

    #[wasm_bindgen(js_name = enableRightCancel)]
    pub fn enable_right_cancel(&self) {
        self.session.enable_right_cancel();
    }

    #[wasm_bindgen(js_name = disableRightCancel)]
    pub fn disable_right_cancel(&self) {
        self.session.disable_right_cancel();
    }

    /// Supply the measurement library (see [`host::JsMetrics`]).
    #[wasm_bindgen(js_name = setMetrics)]
    pub fn set_metrics(&self, metrics: JsValue) {
        self.session
            .resolve_metrics(Ok(Rc::new(JsMetrics::new(metrics))));
    }

    /// Report that the measurement library failed to load.
    #[wasm_bindgen(js_name = metricsFailed)]
    pub fn metrics_failed(&self, reason: &str) {
        self.session.resolve_metrics(Err(reason.to_string()));
    }

    /// `shape` is a JSON `OverlayShape` (`{"type":"circle","center":..,"radius":..}`).
    #[wasm_bindgen(js_name = isPointInShape)]
    pub fn is_point_in_shape(
        &self,
        mode: &str,
        lng: f64,
        lat: f64,
        shape: &str,
    ) -> Result<bool, JsValue> {
        let mode: DrawingMode = mode.parse().map_err(to_js)?;
        let shape: OverlayShape =
            serde_json::from_str(shape).map_err(|e| JsValue::from_str(&e.to_string()))?;
        Ok(self
            .session
            .is_point_in_shape(mode, GeoPoint::new(lng, lat), &shape))
    }

    // ─── Toolbar ─────────────────────────────────────────────────────────

    /// JSON array of toolbar items, or `null` without a toolbar.
    #[wasm_bindgen(js_name = toolbarItems)]
    pub fn toolbar_items(&self) -> String {
        serde_json::to_string(&self.session.toolbar_items()).unwrap_or_else(|_| "null".to_string())
    }

    #[wasm_bindgen(js_name = activeToolbarItem)]
    pub fn active_toolbar_item(&self) -> String {
        serde_json::to_string(&self.session.active_toolbar_item())
            .unwrap_or_else(|_| "null".to_string())
    }

    /// `item` is `"hand"` or a drawing mode name.
    #[wasm_bindgen(js_name = selectTool)]
    pub fn select_tool(&self, item: &str) -> Result<(), JsValue> {
        let item = parse_toolbar_item(item).map_err(to_js)?;
        self.session.select_tool(item);
        Ok(())
    }

    // ─── Events ──────────────────────────────────────────────────────────

    /// Register `callback` for the named event. Returns the listener key.
    #[wasm_bindgen(js_name = addEventListener)]
    pub fn add_event_listener(
        &self,
        name: &str,
        key: Option<String>,
        callback: Function,
    ) -> Result<String, JsValue> {
        let key = self
            .session
            .add_event_listener(name, key.as_deref(), move |event| {
                deliver(&callback, event)
            })
            .map_err(to_js)?;
        Ok(key.to_string())
    }

    #[wasm_bindgen(js_name = removeEventListener)]
    pub fn remove_event_listener(&self, name: &str, key: &str) -> Result<bool, JsValue> {
        self.session.remove_event_listener(name, key).map_err(to_js)
    }

    /// Register `callback` for every event kind.
    #[wasm_bindgen(js_name = onAnyEvent)]
    pub fn on_any_event(&self, callback: Function) {
        for kind in SessionEventKind::ALL {
            let callback = callback.clone();
            self.session
                .on(kind, move |event| deliver(&callback, event));
        }
    }

    // ─── Host input ──────────────────────────────────────────────────────

    /// Forward a pointer event. `offsets` holds the `(x, y)` offsets of the
    /// containers between the event target and the map, innermost first.
    #[wasm_bindgen(js_name = pointerEvent)]
    #[allow(clippy::too_many_arguments)]
    pub fn pointer_event(
        &self,
        kind: &str,
        client_x: f64,
        client_y: f64,
        local_x: f64,
        local_y: f64,
        button: i16,
        offsets: Vec<f64>,
    ) -> Result<(), JsValue> {
        let mut raw = RawPointerEvent::at(parse_pointer_kind(kind)?, local_x, local_y)
            .with_button(Button::from_dom(button));
        raw.client = kurbo::Point::new(client_x, client_y);
        raw.offsets = offsets
            .chunks_exact(2)
            .map(|pair| Vec2::new(pair[0], pair[1]))
            .collect();
        self.session.handle_pointer(raw);
        Ok(())
    }

    /// Forward a pointer event received directly by the map container.
    #[wasm_bindgen(js_name = pointerAt)]
    pub fn pointer_at(&self, kind: &str, x: f64, y: f64, button: i16) -> Result<(), JsValue> {
        let raw = RawPointerEvent::at(parse_pointer_kind(kind)?, x, y)
            .with_button(Button::from_dom(button));
        self.session.handle_pointer(raw);
        Ok(())
    }

    #[wasm_bindgen(js_name = keyUp)]
    pub fn key_up(&self, key: String) {
        self.session.handle_key_up(Key(key));
    }

    pub fn resize(&self, width: f64, height: f64) {
        self.session
            .handle_viewport_resize(Size::new(width, height));
    }

    /// Drive timers; call from `requestAnimationFrame` with the elapsed
    /// milliseconds.
    pub fn advance(&self, elapsed_ms: f64) {
        self.session.advance(frame_duration(elapsed_ms));
    }

    #[wasm_bindgen(js_name = isAutopanning)]
    pub fn is_autopanning(&self) -> bool {
        self.session.is_autopanning()
    }
}

// ─── Wire helpers ────────────────────────────────────────────────────────

fn parse_pointer_kind(kind: &str) -> Result<PointerKind, JsValue> {
    pointer_kind(kind).ok_or_else(|| JsValue::from_str(&format!("unknown pointer event: {kind:?}")))
}

fn pointer_kind(kind: &str) -> Option<PointerKind> {
    Some(match kind {
        "down" | "mousedown" => PointerKind::Down,
        "move" | "mousemove" => PointerKind::Move,
        "up" | "mouseup" => PointerKind::Up,
        "click" => PointerKind::Click,
        "dblclick" => PointerKind::DoubleClick,
        _ => return None,
    })
}

/// Host frame time in milliseconds. Negative, NaN and non-finite values
/// advance nothing.
fn frame_duration(elapsed_ms: f64) -> Duration {
    if !elapsed_ms.is_finite() || elapsed_ms <= 0.0 {
        if !elapsed_ms.is_finite() {
            log::warn!("ignoring non-finite frame time {elapsed_ms}");
        }
        return Duration::ZERO;
    }
    Duration::try_from_secs_f64(elapsed_ms / 1000.0).unwrap_or(Duration::MAX)
}

fn parse_toolbar_item(item: &str) -> Result<ToolbarItem, DrawError> {
    match item {
        "hand" => Ok(ToolbarItem::Hand),
        mode => mode.parse().map(ToolbarItem::Mode),
    }
}

/// `{"type": <event name>, "payload": ...}`; `cancel` carries no payload.
fn event_json(event: &SessionEvent) -> serde_json::Value {
    let kind = event.kind().as_str();
    match event {
        SessionEvent::ModeComplete { overlay, .. } => json!({ "type": kind, "payload": overlay }),
        SessionEvent::OverlayComplete(payload) => json!({ "type": kind, "payload": payload }),
        SessionEvent::Cancel => json!({ "type": kind }),
    }
}

fn deliver(callback: &Function, event: &SessionEvent) {
    let text = event_json(event).to_string();
    if let Err(err) = callback.call1(&JsValue::NULL, &JsValue::from_str(&text)) {
        log::warn!("{} listener threw: {err:?}", event.kind());
    }
}

// ─── Console logging ─────────────────────────────────────────────────────

#[cfg_attr(not(target_arch = "wasm32"), allow(dead_code))]
struct ConsoleLogger;

impl log::Log for ConsoleLogger {
    fn enabled(&self, metadata: &log::Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &log::Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let msg = JsValue::from_str(&format!("[{}] {}", record.target(), record.args()));
        match record.level() {
            log::Level::Error => web_sys::console::error_1(&msg),
            log::Level::Warn => web_sys::console::warn_1(&msg),
            log::Level::Info => web_sys::console::info_1(&msg),
            log::Level::Debug | log::Level::Trace => web_sys::console::debug_1(&msg),
        }
    }

    fn flush(&self) {}
}

fn install_console_logger() {
    #[cfg(target_arch = "wasm32")]
    {
        static LOGGER: ConsoleLogger = ConsoleLogger;
        if log::set_logger(&LOGGER).is_ok() {
            log::set_max_level(log::LevelFilter::Warn);
        }
    }
}

/// Set the console log level (`"off"`, `"error"`, ... `"trace"`).
#[wasm_bindgen(js_name = setLogLevel)]
pub fn set_log_level(level: &str) -> Result<(), JsValue> {
    let filter: log::LevelFilter = level
        .parse()
        .map_err(|_| JsValue::from_str(&format!("unknown log level: {level:?}")))?;
    install_console_logger();
    log::set_max_level(filter);
    Ok(())
}

/// Install a panic hook that logs to the browser console.
fn console_error_panic_hook_setup() {
    #[cfg(target_arch = "wasm32")]
    {
        use std::sync::Once;
        static SET_HOOK: Once = Once::new();
        SET_HOOK.call_once(|| {
            std::panic::set_hook(Box::new(|info| {
                let msg = format!("mapdraw WASM panic: {info}");
                web_sys::console::error_1(&msg.into());
            }));
        });
    }
}
