//! mapdraw replay: feed a recorded input script through a headless session.
//!
//! Usage: `mapdraw-replay <script.json>` (`-` reads stdin). Prints one JSON
//! line per completed overlay. Logging follows `RUST_LOG`.

use mapdraw_replay::{Script, replay};
use std::error::Error;
use std::io::{self, Write};

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let path = std::env::args()
        .nth(1)
        .ok_or("usage: mapdraw-replay <script.json>")?;
    let text = if path == "-" {
        io::read_to_string(io::stdin())?
    } else {
        std::fs::read_to_string(&path)?
    };
    let script = Script::from_json(&text)?;
    log::debug!("loaded {} steps from {path}", script.steps.len());

    let completed = replay(&script)?;
    let mut out = io::stdout().lock();
    for payload in &completed {
        writeln!(out, "{}", serde_json::to_string(payload)?)?;
    }
    Ok(())
}
