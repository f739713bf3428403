use std::{io, result::Result as StdResult, sync::mpsc};

use thiserror::Error;

use crate::geom;

/// Result type for arbor operations.
pub type Result<T> = StdResult<T, Error>;

/// Core error type.
#[derive(PartialEq, Eq, Error, Debug, Clone)]
pub enum Error {
    #[error("out of range: {0}")]
    /// A focus or position that doesn't exist, or an empty container.
    OutOfRange(String),
    #[error("sizing: {0}")]
    /// A widget broke the box/flow/fixed sizing contract.
    Sizing(String),
    #[error("canvas: {0}")]
    /// Invalid canvas construction.
    Canvas(String),
    #[error("listbox: {0}")]
    /// ListBox bookkeeping failure.
    ListBox(String),
    #[error("backend: {0}")]
    /// Display backend I/O failure.
    Backend(String),
    #[error("runloop: {0}")]
    /// Event loop failure.
    RunLoop(String),
    #[error("geometry: {0}")]
    /// Geometry failure.
    Geometry(String),
    #[error("invalid: {0}")]
    /// Invalid argument.
    Invalid(String),
    /// Sentinel used to unwind the main loop cleanly.
    #[error("exit")]
    Exit,
}

impl From<mpsc::RecvError> for Error {
    fn from(e: mpsc::RecvError) -> Self {
        Self::RunLoop(e.to_string())
    }
}

impl From<io::Error> for Error {
    fn from(e: io::Error) -> Self {
        Self::Backend(e.to_string())
    }
}

impl From<geom::Error> for Error {
    fn from(e: geom::Error) -> Self {
        Self::Geometry(e.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Self::Invalid(e.to_string())
    }
}
