use std::path::PathBuf;

use crate::geometry::TupleError;

/// Everything that can go wrong while loading the layout or placing a window.
#[derive(Debug, thiserror::Error)]
pub enum OrganizerError {
    #[error("could not read config {}: {source}", path.display())]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed config {}: {source}", path.display())]
    ConfigSyntax {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("program '{program}': invalid {field} {input:?}: {source}")]
    InvalidTuple {
        program: String,
        field: &'static str,
        input: String,
        #[source]
        source: TupleError,
    },

    #[error("program #{index}: {reason}")]
    InvalidProgram { index: usize, reason: String },

    #[error("no window matching '{name}' after {attempts} retries")]
    WindowNotFound { name: String, attempts: u32 },

    #[error("could not launch {}: {source}", path.display())]
    Launch {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{operation} failed: {message}")]
    Platform {
        operation: &'static str,
        message: String,
    },
}

impl OrganizerError {
    pub fn platform(operation: &'static str, err: impl std::fmt::Display) -> Self {
        Self::Platform {
            operation,
            message: err.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, OrganizerError>;
