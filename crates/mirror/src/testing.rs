//! In-memory storage and messaging fakes.
//!
//! Available behind the `test-util` feature or in `#[cfg(test)]` within
//! this crate.

use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::Mutex;

use futures_util::stream;

use crate::error::{SendError, SourceError};
use crate::sink::MessageSink;
use crate::source::{RemoteContent, SourceFuture, StorageSource};
use crate::types::RemoteItem;

const DEFAULT_CHUNK: usize = 4;

/// A storage account held in memory.
#[derive(Default)]
pub struct FakeSource {
    children: HashMap<String, Vec<RemoteItem>>,
    shared: Vec<RemoteItem>,
    contents: HashMap<String, Vec<u8>>,
    failing_folders: HashSet<String>,
    failing_opens: HashMap<String, SourceError>,
    failing_streams: HashSet<String>,
    fail_shared: bool,
    chunk_size: usize,
    listed: Mutex<Vec<String>>,
}

impl FakeSource {
    pub fn new() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK,
            ..Default::default()
        }
    }

    /// Sets the children of `folder_id`.
    pub fn with_children(mut self, folder_id: &str, items: Vec<RemoteItem>) -> Self {
        self.children.insert(folder_id.to_string(), items);
        self
    }

    /// Sets the shared-with-me listing.
    pub fn with_shared(mut self, items: Vec<RemoteItem>) -> Self {
        self.shared = items;
        self
    }

    /// Registers the bytes served for `file_id`.
    pub fn with_content(mut self, file_id: &str, data: Vec<u8>) -> Self {
        self.contents.insert(file_id.to_string(), data);
        self
    }

    /// Sets how many bytes each streamed chunk carries.
    pub fn with_chunk_size(mut self, size: usize) -> Self {
        self.chunk_size = size.max(1);
        self
    }

    /// Makes listing `folder_id` fail.
    pub fn fail_listing(mut self, folder_id: &str) -> Self {
        self.failing_folders.insert(folder_id.to_string());
        self
    }

    /// Makes the shared-with-me listing fail.
    pub fn fail_shared_listing(mut self) -> Self {
        self.fail_shared = true;
        self
    }

    /// Makes opening `file_id` fail with `error`.
    pub fn fail_open(mut self, file_id: &str, error: SourceError) -> Self {
        self.failing_opens.insert(file_id.to_string(), error);
        self
    }

    /// Makes the download of `file_id` break after its first chunk.
    pub fn fail_mid_stream(mut self, file_id: &str) -> Self {
        self.failing_streams.insert(file_id.to_string());
        self
    }

    /// Folder ids listed so far, in call order.
    pub fn listed_folders(&self) -> Vec<String> {
        self.listed.lock().unwrap().clone()
    }
}

impl StorageSource for FakeSource {
    fn list_children<'a>(&'a self, folder_id: &'a str) -> SourceFuture<'a, Vec<RemoteItem>> {
        Box::pin(async move {
            self.listed.lock().unwrap().push(folder_id.to_string());
            if self.failing_folders.contains(folder_id) {
                return Err(SourceError::Transport(format!("listing {folder_id} timed out")));
            }
            Ok(self.children.get(folder_id).cloned().unwrap_or_default())
        })
    }

    fn list_shared_with_me(&self) -> SourceFuture<'_, Vec<RemoteItem>> {
        Box::pin(async move {
            if self.fail_shared {
                return Err(SourceError::Unauthorized("shared listing denied".into()));
            }
            Ok(self.shared.clone())
        })
    }

    fn open_file<'a>(&'a self, file_id: &'a str) -> SourceFuture<'a, RemoteContent> {
        Box::pin(async move {
            if let Some(err) = self.failing_opens.get(file_id) {
                return Err(err.clone());
            }
            let data = self
                .contents
                .get(file_id)
                .ok_or_else(|| SourceError::NotFound(file_id.to_string()))?;

            let mut chunks: Vec<Result<Vec<u8>, SourceError>> = data
                .chunks(self.chunk_size.max(1))
                .map(|c| Ok(c.to_vec()))
                .collect();
            if self.failing_streams.contains(file_id) {
                chunks.truncate(1);
                chunks.push(Err(SourceError::Transport("connection reset".into())));
            }

            Ok(RemoteContent {
                size: Some(data.len() as u64),
                stream: Box::pin(stream::iter(chunks)),
            })
        })
    }
}

/// A document received by [`FakeSink`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentDocument {
    pub caption: String,
    pub file_name: String,
    pub data: Vec<u8>,
}

/// A channel that records every send attempt.
#[derive(Default)]
pub struct FakeSink {
    failing_captions: HashSet<String>,
    attempts: Mutex<Vec<String>>,
    sent: Mutex<Vec<SentDocument>>,
}

impl FakeSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rejects any send whose caption equals `caption`.
    pub fn fail_caption(mut self, caption: &str) -> Self {
        self.failing_captions.insert(caption.to_string());
        self
    }

    /// Captions of every attempt, failed ones included.
    pub fn attempts(&self) -> Vec<String> {
        self.attempts.lock().unwrap().clone()
    }

    /// Successfully delivered documents.
    pub fn sent(&self) -> Vec<SentDocument> {
        self.sent.lock().unwrap().clone()
    }
}

impl MessageSink for FakeSink {
    fn send_document<'a>(
        &'a self,
        path: &'a Path,
        caption: &'a str,
    ) -> std::pin::Pin<Box<dyn std::future::Future<Output = Result<(), SendError>> + Send + 'a>>
    {
        Box::pin(async move {
            self.attempts.lock().unwrap().push(caption.to_string());
            let data = tokio::fs::read(path).await?;
            if self.failing_captions.contains(caption) {
                return Err(SendError::Rejected(format!("channel refused {caption}")));
            }
            let file_name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            self.sent.lock().unwrap().push(SentDocument {
                caption: caption.to_string(),
                file_name,
                data,
            });
            Ok(())
        })
    }
}
