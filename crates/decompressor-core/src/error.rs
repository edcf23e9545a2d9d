use std::path::PathBuf;

use thiserror::Error;

/// Failure to turn a compressed blob back into an event set.
#[derive(Error, Debug)]
pub enum DecodeError {
    #[error("blob is not binary-safe: char {ch:?} at offset {offset} is outside the byte range")]
    NotBinarySafe { offset: usize, ch: char },

    #[error("payload is not valid DEFLATE data: {0}")]
    Inflate(String),

    #[error("decompressed payload is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("decompressed payload is a JSON {0}, expected an object of event categories")]
    NotAnObject(&'static str),
}

/// Errors raised while transforming or exporting a single session.
#[derive(Error, Debug)]
pub enum SessionError {
    #[error("Decode error: {0}")]
    Decode(#[from] DecodeError),

    #[error("Session file is not valid JSON: {0}")]
    InvalidInput(#[source] serde_json::Error),

    #[error("Format error: {0}")]
    Format(#[source] serde_json::Error),

    #[error("Serialization error: {0}")]
    Serialize(#[source] serde_json::Error),

    #[error("State error: {0}")]
    State(&'static str),

    #[error("Error when saving the session file {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl SessionError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
