//! Error taxonomy shared by the API client, the local store and the sync engine.

use thiserror::Error;

use crate::api::RequestError;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    /// Non-2xx response to a GET or PUT
    #[error(transparent)]
    Transport(#[from] RequestError),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// The server accepted a POST but answered with an `errors` payload
    #[error("Rejected by server: {message}")]
    RemoteValidation {
        message: String,
        errors: serde_json::Value,
    },

    #[error("Invalid settings: {0}")]
    InvalidSettings(String),

    #[error("Location unavailable: {0}")]
    LocationUnavailable(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Receipt is not valid base64: {0}")]
    Receipt(#[from] base64::DecodeError),

    #[error("Store I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Store schema version {found} is newer than supported version {supported}")]
    SchemaTooNew { found: u64, supported: u32 },

    #[error("Storage error: {0}")]
    Storage(String),
}

impl Error {
    pub fn invalid_response(message: impl Into<String>) -> Self {
        Self::InvalidResponse(message.into())
    }

    pub fn location_unavailable(message: impl Into<String>) -> Self {
        Self::LocationUnavailable(message.into())
    }

    /// Whether the failure came from the remote side rather than local state.
    pub fn is_remote(&self) -> bool {
        matches!(
            self,
            Self::Transport(_)
                | Self::Network(_)
                | Self::RemoteValidation { .. }
                | Self::InvalidResponse(_)
        )
    }
}
