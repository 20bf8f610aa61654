use thiserror::Error;

use crate::backend::BackendKind;

#[derive(Error, Debug)]
pub enum PlayerError {
    /// Any command issued after `dispose()`.
    #[error("Player session has been disposed")]
    Disposed,
    /// The media carries nothing the engine could possibly play.
    #[error("No playable source: {0}")]
    NoPlayableSource(String),
    #[error("Open failed: {0}")]
    Open(String),
    /// The adapter has the capability but not this particular operation.
    #[error("Operation '{operation}' is not supported by the {backend} backend")]
    Unsupported {
        operation: String,
        backend: BackendKind,
    },
    #[error("Property '{name}' rejected by engine: {reason}")]
    Property { name: String, reason: String },
    #[error("Engine IPC error: {0}")]
    Ipc(String),
    #[error("Timed out waiting for {0}")]
    Timeout(String),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl PlayerError {
    pub fn unsupported(operation: &str, backend: BackendKind) -> Self {
        PlayerError::Unsupported {
            operation: operation.to_string(),
            backend,
        }
    }

    pub fn property(name: &str, reason: impl Into<String>) -> Self {
        PlayerError::Property {
            name: name.to_string(),
            reason: reason.into(),
        }
    }

    pub fn ipc(message: impl Into<String>) -> Self {
        PlayerError::Ipc(message.into())
    }

    pub fn is_disposed(&self) -> bool {
        matches!(self, PlayerError::Disposed)
    }

    pub fn is_unsupported(&self) -> bool {
        matches!(self, PlayerError::Unsupported { .. })
    }
}
