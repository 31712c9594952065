//! Integration tests: pointer gestures through a full session, from raw host
//! events to emitted completion events.

use kurbo::{Size, Vec2};
use mapdraw_core::{
    CalculateData, DrawingMode, GeoPoint, OverlayShape, OverlayStyle, ShapeStyle, StrokeStyle,
};
use mapdraw_editor::{
    Button, DrawingOptions, DrawingSession, FlatMetrics, HeadlessMap, Key, LoadStatus,
    MetricsLoader, PointerKind, Preloaded, RawPointerEvent, SessionEvent, SessionEventKind,
    SessionRegistry,
};
use pretty_assertions::assert_eq;
use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

struct Rig {
    map: Rc<RefCell<HeadlessMap>>,
    _registry: SessionRegistry,
    session: DrawingSession,
    events: Rc<RefCell<Vec<SessionEvent>>>,
}

fn rig(options: DrawingOptions) -> Rig {
    let registry = SessionRegistry::new();
    let map = Rc::new(RefCell::new(HeadlessMap::new(Size::new(800.0, 600.0))));
    let session = DrawingSession::with_metrics(
        &registry,
        map.clone(),
        options,
        Box::new(Preloaded(Rc::new(FlatMetrics))),
    )
    .unwrap();
    let events = Rc::new(RefCell::new(Vec::new()));
    for kind in SessionEventKind::ALL {
        let events = Rc::clone(&events);
        session.on(kind, move |e| events.borrow_mut().push(e.clone()));
    }
    session.open();
    Rig {
        map,
        _registry: registry,
        session,
        events,
    }
}

fn open_in(mode: DrawingMode) -> Rig {
    rig(DrawingOptions {
        drawing_mode: mode,
        ..DrawingOptions::default()
    })
}

impl Rig {
    fn pointer(&self, kind: PointerKind, x: f64, y: f64) {
        self.session.handle_pointer(RawPointerEvent::at(kind, x, y));
    }

    /// Press, release and the click the host reports after them.
    fn tap(&self, x: f64, y: f64) {
        self.pointer(PointerKind::Down, x, y);
        self.pointer(PointerKind::Up, x, y);
        self.pointer(PointerKind::Click, x, y);
    }

    /// The host's event sequence for a double-click.
    fn double_tap(&self, x: f64, y: f64) {
        self.tap(x, y);
        self.tap(x, y);
        self.pointer(PointerKind::DoubleClick, x, y);
    }

    fn drag(&self, from: (f64, f64), to: (f64, f64)) {
        self.pointer(PointerKind::Down, from.0, from.1);
        self.pointer(PointerKind::Move, to.0, to.1);
        self.pointer(PointerKind::Up, to.0, to.1);
        self.pointer(PointerKind::Click, to.0, to.1);
    }

    fn kinds(&self) -> Vec<SessionEventKind> {
        self.events.borrow().iter().map(|e| e.kind()).collect()
    }

    fn overlay_complete(&self) -> mapdraw_editor::OverlayComplete {
        self.events
            .borrow()
            .iter()
            .find_map(|e| match e {
                SessionEvent::OverlayComplete(payload) => Some(payload.clone()),
                _ => None,
            })
            .expect("no overlaycomplete event")
    }
}

fn pt(x: f64, y: f64) -> GeoPoint {
    GeoPoint::new(x, y)
}

// ─── Completion protocol ────────────────────────────────────────────────

#[test]
fn marker_emits_mode_event_then_overlaycomplete() {
    let r = open_in(DrawingMode::Marker);
    r.tap(120.0, 80.0);
    assert_eq!(
        r.kinds(),
        vec![SessionEventKind::MarkerComplete, SessionEventKind::OverlayComplete]
    );
    let payload = r.overlay_complete();
    assert_eq!(payload.drawing_mode, DrawingMode::Marker);
    assert_eq!(payload.overlay.shape, OverlayShape::Marker { point: pt(120.0, 80.0) });
    assert_eq!(payload.calculate, None);
    assert_eq!(payload.label, None);
    assert_eq!(r.map.borrow().shape_count(), 1);
}

#[test]
fn polygon_by_clicks_and_double_click() {
    let r = rig(DrawingOptions {
        drawing_mode: DrawingMode::Polygon,
        enable_calculate: true,
        ..DrawingOptions::default()
    });
    r.tap(100.0, 100.0);
    r.pointer(PointerKind::Move, 150.0, 100.0);
    r.tap(200.0, 100.0);
    r.double_tap(200.0, 200.0);

    let payload = r.overlay_complete();
    assert_eq!(
        payload.overlay.shape,
        OverlayShape::Polygon {
            path: vec![pt(100.0, 100.0), pt(200.0, 100.0), pt(200.0, 200.0)]
        }
    );
    assert_eq!(payload.calculate, Some(CalculateData::Scalar(5000.0)));
    assert_eq!(payload.label.as_ref().map(|l| l.len()), Some(1));
    assert_eq!(r.map.borrow().label_texts(), vec!["Area: 5000"]);
    assert!(!r.session.is_drawing());
}

#[test]
fn polyline_without_two_distinct_vertices_is_dropped() {
    let r = open_in(DrawingMode::Polyline);
    r.double_tap(300.0, 300.0);
    assert!(r.events.borrow().is_empty());
    assert_eq!(r.map.borrow().shape_count(), 0);
}

#[test]
fn click_ending_a_drag_adds_no_vertex() {
    let r = open_in(DrawingMode::Polyline);
    r.tap(100.0, 100.0);
    r.drag((200.0, 100.0), (260.0, 100.0));
    r.double_tap(300.0, 300.0);
    let payload = r.overlay_complete();
    assert_eq!(
        payload.overlay.shape,
        OverlayShape::Polyline {
            path: vec![pt(100.0, 100.0), pt(300.0, 300.0)]
        }
    );
}

#[test]
fn rectangle_reports_both_side_lengths() {
    let r = rig(DrawingOptions {
        drawing_mode: DrawingMode::Rectangle,
        enable_calculate: true,
        ..DrawingOptions::default()
    });
    r.drag((100.0, 100.0), (140.0, 130.0));
    assert_eq!(
        r.kinds(),
        vec![SessionEventKind::RectangleComplete, SessionEventKind::OverlayComplete]
    );
    let payload = r.overlay_complete();
    assert_eq!(payload.calculate, Some(CalculateData::Pair(40.0, 30.0)));
    assert_eq!(r.map.borrow().label_texts(), vec!["Side: 40", "Side: 30"]);

    let json = serde_json::to_value(&payload).unwrap();
    assert_eq!(json["drawingMode"], "rectangle");
    assert_eq!(json["calculate"], serde_json::json!([40.0, 30.0]));
    assert_eq!(json["overlay"]["shape"]["type"], "polygon");
}

#[test]
fn circle_radius_follows_the_drag() {
    let r = rig(DrawingOptions {
        drawing_mode: DrawingMode::Circle,
        enable_calculate: true,
        ..DrawingOptions::default()
    });
    r.drag((300.0, 300.0), (330.0, 340.0));
    let payload = r.overlay_complete();
    assert_eq!(
        payload.overlay.shape,
        OverlayShape::Circle { center: pt(300.0, 300.0), radius: 50.0 }
    );
    assert_eq!(payload.calculate, Some(CalculateData::Scalar(50.0)));
}

#[test]
fn listeners_may_call_back_into_the_session() {
    let registry = SessionRegistry::new();
    let map = Rc::new(RefCell::new(HeadlessMap::new(Size::new(800.0, 600.0))));
    let session = Rc::new(DrawingSession::new(&registry, map.clone(), DrawingOptions::default()).unwrap());
    let weak = Rc::downgrade(&session);
    session.on(SessionEventKind::OverlayComplete, move |_| {
        if let Some(s) = weak.upgrade() {
            s.close();
        }
    });
    session.open();
    session.handle_pointer(RawPointerEvent::at(PointerKind::Click, 50.0, 50.0));
    assert!(!session.is_open());
}

// ─── Discarding ─────────────────────────────────────────────────────────

#[test]
fn mode_switch_discards_gesture_in_progress() {
    let r = open_in(DrawingMode::Circle);
    r.pointer(PointerKind::Down, 200.0, 200.0);
    r.pointer(PointerKind::Move, 230.0, 240.0);
    assert!(r.session.is_drawing());
    assert_eq!(r.map.borrow().shape_count(), 1);

    r.session.set_mode(DrawingMode::Polygon);
    assert!(!r.session.is_drawing());
    assert_eq!(r.map.borrow().shape_count(), 0);
    assert!(r.map.borrow().label_texts().is_empty());
    assert!(r.events.borrow().is_empty());

    // The abandoned release does not resurrect the circle.
    r.pointer(PointerKind::Up, 230.0, 240.0);
    assert!(r.events.borrow().is_empty());
}

#[test]
fn close_discards_gesture_and_tips() {
    let r = open_in(DrawingMode::Polyline);
    r.tap(100.0, 100.0);
    r.pointer(PointerKind::Move, 180.0, 120.0);
    assert!(!r.map.borrow().label_texts().is_empty());
    r.session.close();
    assert_eq!(r.map.borrow().shape_count(), 0);
    assert!(r.map.borrow().label_texts().is_empty());
    assert!(r.events.borrow().is_empty());
}

// ─── Cancel ─────────────────────────────────────────────────────────────

#[test]
fn cancel_is_idempotent() {
    let r = rig(DrawingOptions {
        drawing_mode: DrawingMode::Rectangle,
        enable_right_cancel: true,
        ..DrawingOptions::default()
    });
    r.pointer(PointerKind::Down, 100.0, 100.0);
    r.pointer(PointerKind::Move, 150.0, 150.0);

    r.session.handle_key_up(Key::escape());
    assert_eq!(r.kinds(), vec![SessionEventKind::Cancel]);
    assert_eq!(r.map.borrow().shape_count(), 0);

    r.session.handle_key_up(Key::escape());
    r.session
        .handle_pointer(RawPointerEvent::at(PointerKind::Up, 150.0, 150.0).with_button(Button::Secondary));
    assert_eq!(r.kinds(), vec![SessionEventKind::Cancel]);
    assert!(r.session.is_open());
}

#[test]
fn secondary_release_cancels_circle() {
    let r = rig(DrawingOptions {
        drawing_mode: DrawingMode::Circle,
        enable_right_cancel: true,
        ..DrawingOptions::default()
    });
    r.pointer(PointerKind::Down, 100.0, 100.0);
    r.pointer(PointerKind::Move, 150.0, 150.0);
    r.session
        .handle_pointer(RawPointerEvent::at(PointerKind::Up, 150.0, 150.0).with_button(Button::Secondary));
    assert_eq!(r.kinds(), vec![SessionEventKind::Cancel]);
    assert_eq!(r.map.borrow().shape_count(), 0);
}

#[test]
fn escape_cancels_polyline_and_polygon_mid_gesture() {
    for mode in [DrawingMode::Polyline, DrawingMode::Polygon] {
        let r = rig(DrawingOptions {
            drawing_mode: mode,
            enable_right_cancel: true,
            ..DrawingOptions::default()
        });
        r.tap(100.0, 100.0);
        r.tap(200.0, 120.0);
        r.pointer(PointerKind::Move, 260.0, 180.0);
        assert!(r.session.is_drawing());

        r.session.handle_key_up(Key::escape());
        assert_eq!(r.kinds(), vec![SessionEventKind::Cancel], "{mode}");
        assert_eq!(r.map.borrow().shape_count(), 0, "{mode}");
        assert!(r.map.borrow().label_texts().is_empty(), "{mode}");
        assert!(!r.session.is_drawing());
        assert!(r.session.is_open());

        // The next click starts a fresh path.
        r.tap(300.0, 300.0);
        r.double_tap(400.0, 300.0);
        let payload = r.overlay_complete();
        assert_eq!(payload.drawing_mode, mode);
    }
}

#[test]
fn escape_is_ignored_without_right_cancel() {
    let r = open_in(DrawingMode::Rectangle);
    r.pointer(PointerKind::Down, 100.0, 100.0);
    r.session.handle_key_up(Key::escape());
    assert!(r.session.is_drawing());
    assert!(r.events.borrow().is_empty());
}

#[test]
fn close_on_cancel_closes_even_when_idle() {
    let r = rig(DrawingOptions {
        enable_right_cancel: true,
        close_on_cancel: true,
        ..DrawingOptions::default()
    });
    r.session.handle_key_up(Key::escape());
    assert!(!r.session.is_open());
    assert_eq!(r.kinds(), vec![SessionEventKind::Cancel]);

    r.session.handle_key_up(Key::escape());
    assert_eq!(r.kinds(), vec![SessionEventKind::Cancel]);
}

#[test]
fn right_cancel_can_be_toggled_while_open() {
    let r = open_in(DrawingMode::Rectangle);
    r.session.enable_right_cancel();
    r.pointer(PointerKind::Down, 100.0, 100.0);
    r.session.handle_key_up(Key::escape());
    assert_eq!(r.kinds(), vec![SessionEventKind::Cancel]);

    r.session.disable_right_cancel();
    r.pointer(PointerKind::Down, 100.0, 100.0);
    r.session.handle_key_up(Key::escape());
    assert!(r.session.is_drawing());
}

// ─── Autopan ────────────────────────────────────────────────────────────

#[test]
fn autopan_runs_only_while_a_gesture_is_near_the_edge() {
    let r = open_in(DrawingMode::Circle);
    r.pointer(PointerKind::Move, 5.0, 300.0);
    r.session.advance(Duration::from_millis(100));
    assert!(r.map.borrow().pans().is_empty(), "idle pointer never pans");

    r.pointer(PointerKind::Down, 300.0, 300.0);
    r.pointer(PointerKind::Move, 5.0, 300.0);
    assert!(r.session.is_autopanning());
    r.session.advance(Duration::from_millis(90));
    assert_eq!(r.map.borrow().pans(), &[Vec2::new(8.0, 0.0); 3]);

    r.pointer(PointerKind::Up, 5.0, 300.0);
    assert!(!r.session.is_autopanning());
    r.session.advance(Duration::from_millis(300));
    assert_eq!(r.map.borrow().pans().len(), 3);
}

#[test]
fn autopan_keeps_one_timer_across_margin_reentry() {
    let r = open_in(DrawingMode::Rectangle);
    r.pointer(PointerKind::Down, 300.0, 300.0);
    for round in 1..=4 {
        r.pointer(PointerKind::Move, 5.0, 300.0);
        r.session.advance(Duration::from_millis(15));
        r.pointer(PointerKind::Move, 10.0, 320.0);
        r.session.advance(Duration::from_millis(15));
        assert_eq!(r.map.borrow().pans().len(), round);

        r.pointer(PointerKind::Move, 400.0, 300.0);
        assert!(!r.session.is_autopanning());
        r.session.advance(Duration::from_millis(60));
        assert_eq!(r.map.borrow().pans().len(), round);
    }
}

#[test]
fn moving_the_tip_keeps_a_single_label() {
    let r = open_in(DrawingMode::Polyline);
    r.tap(100.0, 100.0);
    r.pointer(PointerKind::Move, 150.0, 200.0);
    let overlays = r.map.borrow().overlays().count();
    for i in 0..500 {
        r.pointer(PointerKind::Move, 150.0 + f64::from(i % 50), 200.0);
    }
    assert_eq!(r.map.borrow().label_texts().len(), 1);
    assert_eq!(r.map.borrow().overlays().count(), overlays);
}

#[test]
fn closing_stops_autopan() {
    let r = open_in(DrawingMode::Rectangle);
    r.pointer(PointerKind::Down, 300.0, 300.0);
    r.pointer(PointerKind::Move, 790.0, 595.0);
    assert!(r.session.is_autopanning());
    r.session.close();
    assert!(!r.session.is_autopanning());
    r.session.advance(Duration::from_secs(1));
    assert!(r.map.borrow().pans().is_empty());
}

// ─── Styles & measurement collaborator ──────────────────────────────────

#[test]
fn configured_styles_round_trip() {
    let polygon = ShapeStyle {
        stroke_color: Some("#ff6600".into()),
        stroke_style: Some(StrokeStyle::Dashed),
        fill_opacity: Some(0.25),
        ..ShapeStyle::default()
    };
    let r = rig(DrawingOptions {
        polygon_options: polygon.clone(),
        ..DrawingOptions::default()
    });
    assert_eq!(r.session.style(DrawingMode::Polygon), OverlayStyle::Shape(polygon));
    assert_eq!(
        r.session.style(DrawingMode::Circle),
        OverlayStyle::Shape(ShapeStyle::default())
    );
}

#[test]
fn point_in_shape_requires_calculation() {
    let r = open_in(DrawingMode::Polygon);
    let square = OverlayShape::Polygon {
        path: vec![pt(0.0, 0.0), pt(10.0, 0.0), pt(10.0, 10.0), pt(0.0, 10.0)],
    };
    assert!(!r.session.is_point_in_shape(DrawingMode::Polygon, pt(5.0, 5.0), &square));
    r.session.enable_calculate();
    assert!(r.session.is_point_in_shape(DrawingMode::Polygon, pt(5.0, 5.0), &square));
    assert!(r.session.is_point_in_shape(DrawingMode::Rectangle, pt(5.0, 5.0), &square));
    assert!(!r.session.is_point_in_shape(DrawingMode::Polygon, pt(15.0, 5.0), &square));
    assert!(!r.session.is_point_in_shape(DrawingMode::Circle, pt(5.0, 5.0), &square));
}

struct Later;

impl MetricsLoader for Later {
    fn load(&mut self) -> LoadStatus {
        LoadStatus::Pending
    }
}

#[test]
fn pending_metrics_resolve_later() {
    let registry = SessionRegistry::new();
    let map = Rc::new(RefCell::new(HeadlessMap::new(Size::new(800.0, 600.0))));
    let options = DrawingOptions {
        drawing_mode: DrawingMode::Polyline,
        enable_calculate: true,
        is_open: true,
        ..DrawingOptions::default()
    };
    let s = DrawingSession::with_metrics(&registry, map.clone(), options, Box::new(Later)).unwrap();
    let circle = OverlayShape::Circle { center: pt(0.0, 0.0), radius: 10.0 };
    assert!(!s.metrics_ready());
    assert!(!s.is_point_in_shape(DrawingMode::Circle, pt(1.0, 1.0), &circle));

    s.resolve_metrics(Ok(Rc::new(FlatMetrics)));
    assert!(s.metrics_ready());
    assert!(s.is_point_in_shape(DrawingMode::Circle, pt(1.0, 1.0), &circle));
}

#[test]
fn measurement_without_metrics_is_zero() {
    let registry = SessionRegistry::new();
    let map = Rc::new(RefCell::new(HeadlessMap::new(Size::new(800.0, 600.0))));
    let options = DrawingOptions {
        drawing_mode: DrawingMode::Polyline,
        enable_calculate: true,
        is_open: true,
        ..DrawingOptions::default()
    };
    let s = DrawingSession::new(&registry, map.clone(), options).unwrap();
    let payloads = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&payloads);
    s.add_event_listener("onoverlaycomplete", Some("sink"), move |e| {
        if let SessionEvent::OverlayComplete(p) = e {
            sink.borrow_mut().push(p.calculate);
        }
    })
    .unwrap();
    s.handle_pointer(RawPointerEvent::at(PointerKind::Click, 100.0, 100.0));
    s.handle_pointer(RawPointerEvent::at(PointerKind::Click, 200.0, 200.0));
    s.handle_pointer(RawPointerEvent::at(PointerKind::DoubleClick, 200.0, 200.0));
    assert_eq!(*payloads.borrow(), vec![Some(CalculateData::Scalar(0.0))]);
}
