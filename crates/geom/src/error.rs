use std::{error, fmt, result};

/// Geometry error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// A geometric operation produced an impossible shape.
    Geometry(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Geometry(s) => write!(f, "{s}"),
        }
    }
}

impl error::Error for Error {}

/// Result alias for geometry operations.
pub type Result<T> = result::Result<T, Error>;
