//! Mirror pipeline: copies every file of a storage account into a
//! messaging channel, one document per file.
//!
//! The crate holds the **business logic** only. Storage and messaging
//! providers are reached through the [`StorageSource`] and [`MessageSink`]
//! traits; the binary bridges them to the real HTTP clients.
//!
//! # Pipeline
//!
//! 1. **Enumerate**: walk the own namespace, then everything shared with
//!    the account, into an ordered list of file descriptors
//! 2. **Fetch**: stream each file into a scratch artifact
//! 3. **Split**: cut artifacts above the send bound into numbered parts
//! 4. **Deliver**: send the artifact or each part, deleting scratch files
//!    as soon as they have been attempted

pub mod enumerate;
pub mod error;
pub mod fetch;
pub mod pipeline;
pub mod report;
pub mod sink;
pub mod source;
pub mod types;

#[cfg(any(test, feature = "test-util"))]
pub mod testing;

// Re-export primary types for convenience.
pub use enumerate::{ROOT_FOLDER_ID, enumerate_all, enumerate_folder, enumerate_shared};
pub use error::{EnumerationError, FetchError, ItemError, SendError, SourceError, SplitError};
pub use fetch::{LocalArtifact, fetch_to_artifact};
pub use pipeline::{MirrorPipeline, PartFailurePolicy, PipelineOptions};
pub use report::{Delivery, ItemReport, RunSummary};
pub use sink::MessageSink;
pub use source::{ByteStream, RemoteContent, SourceFuture, StorageSource};
pub use types::{FileDescriptor, ItemKind, Origin, RemoteItem};
