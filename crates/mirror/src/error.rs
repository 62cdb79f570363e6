//! Error taxonomy of the mirror pipeline.
//!
//! Only [`EnumerationError`] ends a run. Everything raised while fetching,
//! splitting or sending is folded into an [`ItemError`] for that descriptor.

use drivegram_transfer::TransferError;

/// Failure reported by a [`StorageSource`](crate::StorageSource).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SourceError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("not authorized: {0}")]
    Unauthorized(String),

    #[error("transport error: {0}")]
    Transport(String),
}

/// Listing failure during traversal. Fatal to the run.
#[derive(Debug, thiserror::Error)]
pub enum EnumerationError {
    #[error("failed to list folder {folder_id}: {source}")]
    Folder {
        folder_id: String,
        source: SourceError,
    },

    #[error("failed to list shared items: {0}")]
    Shared(#[source] SourceError),
}

/// Failure materializing a remote file locally.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("remote read failed: {0}")]
    Source(#[from] SourceError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0} is a folder")]
    NotAFile(String),

    #[error("download incomplete: expected {expected} bytes, got {actual}")]
    Incomplete { expected: u64, actual: u64 },
}

/// Failure cutting an artifact into parts.
#[derive(Debug, thiserror::Error)]
pub enum SplitError {
    #[error("{0}")]
    Transfer(#[from] TransferError),

    #[error("split task failed: {0}")]
    Task(String),
}

/// Failure reported by a [`MessageSink`](crate::MessageSink) for one document.
#[derive(Debug, thiserror::Error)]
pub enum SendError {
    #[error("rejected: {0}")]
    Rejected(String),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Why a single descriptor was not fully delivered.
#[derive(Debug, thiserror::Error)]
pub enum ItemError {
    #[error("fetch failed: {0}")]
    Fetch(#[from] FetchError),

    #[error("split failed after {parts_attempted} part(s), {sends_failed} of them not sent: {source}")]
    Split {
        parts_attempted: u32,
        sends_failed: u32,
        source: SplitError,
    },

    #[error("{failed} of {total} send(s) failed, {attempted} attempted: {first}")]
    Send {
        total: u32,
        attempted: u32,
        failed: u32,
        #[source]
        first: SendError,
    },
}

impl ItemError {
    /// Short label used in logs and the run summary.
    pub fn stage(&self) -> &'static str {
        match self {
            ItemError::Fetch(_) => "fetch",
            ItemError::Split { .. } => "split",
            ItemError::Send { .. } => "send",
        }
    }
}
