//! Google Drive v3 client.
//!
//! Async HTTP client using `reqwest`, authenticated either with a
//! service-account key (OAuth2 JWT bearer grant) or a ready access token.
//! Covers what the mirror needs: paged folder and shared-with-me listings
//! and streamed media downloads.

pub mod auth;
pub mod client;
pub mod types;

#[cfg(test)]
mod mock;

pub use auth::{DRIVE_READONLY_SCOPE, ServiceAccountAuth};
pub use client::{Client, MediaDownload};
pub use types::{DriveFile, FOLDER_MIME_TYPE, FileList, Owner, ServiceAccountKey};

/// Errors from the Drive client.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error {status}: {body}")]
    Api { status: u16, body: String },

    #[error("token request failed {status}: {body}")]
    Auth { status: u16, body: String },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid service account key: {0}")]
    InvalidKey(String),

    #[error("cannot read key file {path}: {source}")]
    KeyFile {
        path: String,
        source: std::io::Error,
    },
}

impl Error {
    /// HTTP status of an API or token failure.
    pub fn status(&self) -> Option<u16> {
        match self {
            Error::Api { status, .. } | Error::Auth { status, .. } => Some(*status),
            Error::Http(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    /// True when the item does not exist (or is not visible to the account).
    pub fn is_not_found(&self) -> bool {
        self.status() == Some(404)
    }

    /// True for authentication and permission failures.
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, Error::Auth { .. } | Error::InvalidKey(_) | Error::KeyFile { .. })
            || matches!(self.status(), Some(401 | 403))
    }
}
