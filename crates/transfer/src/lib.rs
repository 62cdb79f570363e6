//! Local scratch-file handling for the mirror pipeline.
//!
//! Splits oversized artifacts into size-bounded parts, turns remote
//! display names into safe scratch file names and tracks download
//! progress.

mod naming;
mod progress;
mod split;

pub use naming::{part_file_name, scratch_file_name};
pub use progress::{DownloadProgress, format_mib};
pub use split::{PartArtifact, PartSplitter, checksum_bytes, part_count};

/// Buffer size used when copying a slice of an artifact into a part file.
/// Independent of the part size.
pub const COPY_BUFFER_SIZE: usize = 4 * 1024 * 1024;

/// Default maximum payload per message: 1900 MiB.
pub const DEFAULT_MAX_PART_SIZE: u64 = 1900 * 1024 * 1024;

/// Errors produced by the transfer crate.
#[derive(Debug, thiserror::Error)]
pub enum TransferError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid part size: {0}")]
    InvalidPartSize(u64),

    #[error("artifact changed while splitting: expected {expected} bytes, read {actual}")]
    Truncated { expected: u64, actual: u64 },
}
