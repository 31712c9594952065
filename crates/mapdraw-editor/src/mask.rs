//! Transparent input surface.
//!
//! While a session is open, a capture layer covers the whole viewport and
//! owns pointer input. The surface turns raw host events into `DrawEvent`s,
//! filters the clicks a drag or double-click would otherwise produce, and
//! pans the map when the pointer lingers near an edge mid-gesture.

use crate::input::{DrawEvent, PointerKind, RawPointerEvent};
use crate::map::{Cursor, MapView, RenderableOverlay, Widget, WidgetKind};
use crate::options::AutopanOptions;
use crate::timer::IntervalTimer;
use kurbo::{Point, Size, Vec2};
use std::time::Duration;

/// Pointer travel, per axis, below which a press/click pair counts as a click.
const CLICK_SLOP: f64 = 5.0;

fn within_slop(a: Point, b: Point) -> bool {
    (a.x - b.x).abs() < CLICK_SLOP && (a.y - b.y).abs() < CLICK_SLOP
}

/// Stateful normalizer and autopan driver behind the capture layer.
#[derive(Debug)]
pub struct InputSurface {
    autopan: AutopanOptions,
    attached: bool,
    origin: Point,
    size: Size,
    /// Client position of the last press.
    last_press: Option<Point>,
    /// Client position of the last dispatched click.
    last_click: Option<Point>,
    edge_move: bool,
    pan: Vec2,
    timer: Option<IntervalTimer>,
}

impl InputSurface {
    pub fn new(autopan: AutopanOptions) -> Self {
        Self {
            autopan,
            attached: false,
            origin: Point::ZERO,
            size: Size::ZERO,
            last_press: None,
            last_click: None,
            edge_move: false,
            pan: Vec2::ZERO,
            timer: None,
        }
    }

    pub fn is_attached(&self) -> bool {
        self.attached
    }

    pub fn size(&self) -> Size {
        self.size
    }

    pub fn is_autopanning(&self) -> bool {
        self.timer.is_some()
    }

    /// Translate a host event. `None` means the event is swallowed.
    pub fn normalize(&mut self, raw: &RawPointerEvent, map: &dyn MapView) -> Option<DrawEvent> {
        let pixel = raw.container_pixel();
        let point = map.pixel_to_geo(pixel);
        let event = match raw.kind {
            PointerKind::Down => {
                self.last_press = Some(raw.client);
                DrawEvent::Press {
                    point,
                    pixel,
                    button: raw.button,
                }
            }
            PointerKind::Move => {
                if self.edge_move {
                    self.check_edges(pixel);
                }
                DrawEvent::Move { point, pixel }
            }
            PointerKind::Up => DrawEvent::Release {
                point,
                pixel,
                button: raw.button,
            },
            PointerKind::Click => {
                if !self.accept_click(raw.client) {
                    return None;
                }
                DrawEvent::Click { point, pixel }
            }
            PointerKind::DoubleClick => DrawEvent::DoubleClick { point, pixel },
        };
        Some(event)
    }

    fn accept_click(&mut self, client: Point) -> bool {
        if let Some(press) = self.last_press
            && !within_slop(press, client)
        {
            log::trace!("click swallowed: pointer travelled since press");
            return false;
        }
        match self.last_click {
            Some(last) if within_slop(last, client) => {
                log::trace!("click swallowed: repeat at {client:?}");
                self.last_click = None;
                false
            }
            _ => {
                self.last_click = Some(client);
                true
            }
        }
    }

    // ─── Edge autopan ────────────────────────────────────────────────────

    /// Enable or disable edge-autopan. Disabling always stops the timer.
    pub fn set_edge_move(&mut self, enabled: bool) {
        self.edge_move = enabled;
        if !enabled {
            self.stop_autopan();
        }
    }

    fn check_edges(&mut self, pixel: Point) {
        let m = self.autopan.margins;
        let step = self.autopan.step;
        let mut pan = Vec2::ZERO;
        if pixel.x <= m.left {
            pan.x = step;
        } else if pixel.x >= self.size.width - m.right {
            pan.x = -step;
        }
        if pixel.y <= m.top {
            pan.y = step;
        } else if pixel.y >= self.size.height - m.bottom {
            pan.y = -step;
        }

        if pan == Vec2::ZERO {
            self.stop_autopan();
            return;
        }
        self.pan = pan;
        if self.timer.is_none() {
            log::trace!("autopan start {pan:?}");
            self.timer = Some(IntervalTimer::new(self.autopan.period()));
        }
    }

    fn stop_autopan(&mut self) {
        if self.timer.take().is_some() {
            log::trace!("autopan stop");
        }
        self.pan = Vec2::ZERO;
    }

    /// Drive the autopan timer; pans once per elapsed period.
    pub fn advance(&mut self, dt: Duration, map: &mut dyn MapView) {
        let Some(timer) = self.timer.as_mut() else {
            return;
        };
        for _ in 0..timer.advance(dt) {
            map.pan_by(self.pan.x, self.pan.y);
        }
    }

    /// Follow a viewport resize.
    pub fn resize(&mut self, size: Size, map: &mut dyn MapView) {
        self.size = size;
        if self.attached {
            self.draw(map);
        }
    }
}

impl RenderableOverlay for InputSurface {
    fn attach(&mut self, map: &mut dyn MapView) {
        self.size = map.viewport_size();
        self.attached = true;
        self.draw(map);
    }

    fn draw(&mut self, map: &mut dyn MapView) {
        let corner = map.pixel_to_geo(Point::ZERO);
        self.origin = map.geo_to_pixel(corner);
        map.mount_widget(Widget::CaptureLayer {
            origin: self.origin,
            size: self.size,
            cursor: Cursor::Crosshair,
        });
    }

    fn detach(&mut self, map: &mut dyn MapView) {
        self.set_edge_move(false);
        self.attached = false;
        self.last_press = None;
        self.last_click = None;
        map.unmount_widget(WidgetKind::CaptureLayer);
    }
}
