//! Errors surfaced to the embedding application.
//!
//! Only contract violations become errors. Degenerate geometry and a missing
//! measurement collaborator are absorbed and produce zero/empty results.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DrawError {
    /// The map's rendering context does not exist yet.
    #[error("map rendering context is not ready yet")]
    MapNotReady,

    /// Listener keys are used for targeted removal and must be identifiers.
    #[error("nonstandard listener key: {0:?}")]
    InvalidListenerKey(String),

    #[error("unknown event name: {0:?}")]
    UnknownEvent(String),

    #[error("unknown drawing mode: {0:?}")]
    UnknownMode(String),

    #[error("invalid drawing options: {0}")]
    InvalidOptions(String),
}
