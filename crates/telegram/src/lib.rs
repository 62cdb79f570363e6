//! Telegram Bot API client.
//!
//! Uploads local files to a fixed chat with `sendDocument`, streaming the
//! file from disk. Works against `api.telegram.org` or a self-hosted Bot
//! API server, which lifts the 50 MB upload cap.

pub mod client;
pub mod types;

#[cfg(test)]
mod mock;

pub use client::{Client, DEFAULT_API_URL, DEFAULT_MAX_FLOOD_WAITS};
pub use types::{MAX_CAPTION_CHARS, Message, clamp_caption};

/// Errors from the Bot API client.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error {code}: {description}")]
    Api {
        code: u16,
        description: String,
        retry_after: Option<u64>,
    },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Seconds Telegram asked us to wait before retrying, for 429 replies.
    pub fn retry_after(&self) -> Option<u64> {
        match self {
            Error::Api {
                code: 429,
                retry_after,
                ..
            } => *retry_after,
            _ => None,
        }
    }
}
