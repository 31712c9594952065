//! Scripted replay of host input against a headless map.
//!
//! A script is a JSON document with the session options, the viewport size
//! and an ordered list of steps. Replaying it drives one `DrawingSession`
//! over `HeadlessMap` + `FlatMetrics` and collects every `overlaycomplete`
//! payload.

use kurbo::Size;
use mapdraw_core::{DrawError, DrawingMode};
use mapdraw_editor::{
    Button, DrawingOptions, DrawingSession, FlatMetrics, HeadlessMap, Key, OverlayComplete,
    PointerKind, Preloaded, RawPointerEvent, SessionEvent, SessionEventKind, SessionRegistry,
};
use serde::Deserialize;
use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct Viewport {
    pub width: f64,
    pub height: f64,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            width: 800.0,
            height: 600.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "step", rename_all = "camelCase")]
pub enum Step {
    Press {
        x: f64,
        y: f64,
        #[serde(default)]
        secondary: bool,
    },
    Move {
        x: f64,
        y: f64,
    },
    Release {
        x: f64,
        y: f64,
        #[serde(default)]
        secondary: bool,
    },
    Click {
        x: f64,
        y: f64,
    },
    #[serde(rename = "dblclick")]
    DoubleClick {
        x: f64,
        y: f64,
    },
    #[serde(rename = "keyup")]
    KeyUp {
        key: String,
    },
    Advance {
        ms: u64,
    },
    Open,
    Close,
    SetMode {
        mode: DrawingMode,
    },
}

#[derive(Debug, Deserialize)]
pub struct Script {
    #[serde(default)]
    pub options: DrawingOptions,
    #[serde(default)]
    pub viewport: Viewport,
    pub steps: Vec<Step>,
}

impl Script {
    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }
}

fn button(secondary: bool) -> Button {
    if secondary {
        Button::Secondary
    } else {
        Button::Primary
    }
}

fn apply(session: &DrawingSession, step: &Step) {
    let pointer = |kind, x, y, button| {
        session.handle_pointer(RawPointerEvent::at(kind, x, y).with_button(button));
    };
    match *step {
        Step::Press { x, y, secondary } => pointer(PointerKind::Down, x, y, button(secondary)),
        Step::Move { x, y } => pointer(PointerKind::Move, x, y, Button::Primary),
        Step::Release { x, y, secondary } => pointer(PointerKind::Up, x, y, button(secondary)),
        Step::Click { x, y } => pointer(PointerKind::Click, x, y, Button::Primary),
        Step::DoubleClick { x, y } => pointer(PointerKind::DoubleClick, x, y, Button::Primary),
        Step::KeyUp { ref key } => session.handle_key_up(Key(key.clone())),
        Step::Advance { ms } => session.advance(Duration::from_millis(ms)),
        Step::Open => session.open(),
        Step::Close => session.close(),
        Step::SetMode { mode } => session.set_mode(mode),
    }
}

/// Run `script` and return the `overlaycomplete` payloads in order.
pub fn replay(script: &Script) -> Result<Vec<OverlayComplete>, DrawError> {
    let registry = SessionRegistry::new();
    let viewport = Size::new(script.viewport.width, script.viewport.height);
    let map = Rc::new(RefCell::new(HeadlessMap::new(viewport)));
    let session = DrawingSession::with_metrics(
        &registry,
        map.clone(),
        script.options.clone(),
        Box::new(Preloaded(Rc::new(FlatMetrics))),
    )?;

    let completed = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&completed);
    session.on(SessionEventKind::OverlayComplete, move |event| {
        if let SessionEvent::OverlayComplete(payload) = event {
            sink.borrow_mut().push(payload.clone());
        }
    });
    session.on(SessionEventKind::Cancel, |_| log::info!("gesture cancelled"));

    for (index, step) in script.steps.iter().enumerate() {
        log::debug!("step {index}: {step:?}");
        apply(&session, step);
    }
    log::info!(
        "replayed {} steps, {} overlays on the map",
        script.steps.len(),
        map.borrow().shape_count()
    );
    Ok(completed.take())
}
