//! Storage capability consumed by the pipeline.

use std::future::Future;
use std::pin::Pin;

use futures_util::Stream;

use crate::error::SourceError;
use crate::types::RemoteItem;

/// Boxed future returned by [`StorageSource`] methods.
pub type SourceFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, SourceError>> + Send + 'a>>;

/// Remote file bytes, delivered in bounded chunks.
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Vec<u8>, SourceError>> + Send>>;

/// An opened remote file.
pub struct RemoteContent {
    /// Total length if the provider reported one.
    pub size: Option<u64>,
    pub stream: ByteStream,
}

/// Abstract access to a hierarchical storage account.
///
/// The binary implements this on top of the Drive client. Using a trait
/// keeps traversal and delivery testable with in-memory fakes.
pub trait StorageSource: Send + Sync {
    /// Lists the direct children of `folder_id`, in provider order.
    fn list_children<'a>(&'a self, folder_id: &'a str) -> SourceFuture<'a, Vec<RemoteItem>>;

    /// Lists every item shared with the account that it does not own.
    fn list_shared_with_me(&self) -> SourceFuture<'_, Vec<RemoteItem>>;

    /// Opens a file for streaming download.
    fn open_file<'a>(&'a self, file_id: &'a str) -> SourceFuture<'a, RemoteContent>;
}
