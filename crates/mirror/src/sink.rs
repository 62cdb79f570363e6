//! Messaging capability consumed by the pipeline.

use std::future::Future;
use std::path::Path;
use std::pin::Pin;

use crate::error::SendError;

/// Abstract connection to the destination channel.
///
/// The channel target is bound when the implementation is built, so the
/// pipeline only hands over a file and its caption.
pub trait MessageSink: Send + Sync {
    /// Sends the file at `path` as one document with `caption`.
    fn send_document<'a>(
        &'a self,
        path: &'a Path,
        caption: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<(), SendError>> + Send + 'a>>;
}
