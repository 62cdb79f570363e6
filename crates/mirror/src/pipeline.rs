//! Delivery pipeline.
//!
//! Processes descriptors strictly one after another:
//! `pending → fetching → (sending-whole | splitting → sending-parts) → done`,
//! with any fetch, split or send fault ending that descriptor as failed.
//! Scratch files never outlive the descriptor that created them.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use drivegram_transfer::{DEFAULT_MAX_PART_SIZE, PartArtifact, PartSplitter, format_mib};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::enumerate::enumerate_all;
use crate::error::{EnumerationError, ItemError, SendError, SplitError};
use crate::fetch::{LocalArtifact, fetch_to_artifact};
use crate::report::{Delivery, ItemReport, RunSummary};
use crate::sink::MessageSink;
use crate::source::StorageSource;
use crate::types::FileDescriptor;

/// What to do with the remaining parts of a file once one part fails to send.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PartFailurePolicy {
    /// Attempt every part regardless. The channel may end up with gaps.
    #[default]
    Continue,
    /// Stop sending this file's parts after the first failure.
    Abort,
}

impl FromStr for PartFailurePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "continue" => Ok(PartFailurePolicy::Continue),
            "abort" => Ok(PartFailurePolicy::Abort),
            other => Err(format!(
                "unknown part failure policy {other:?} (expected \"continue\" or \"abort\")"
            )),
        }
    }
}

impl fmt::Display for PartFailurePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PartFailurePolicy::Continue => f.write_str("continue"),
            PartFailurePolicy::Abort => f.write_str("abort"),
        }
    }
}

/// Tunables of the pipeline.
#[derive(Debug, Clone)]
pub struct PipelineOptions {
    /// Where artifacts and parts are written.
    pub scratch_dir: PathBuf,
    /// Largest payload sent as one document. Bigger artifacts are split.
    pub max_part_size: u64,
    pub part_failure_policy: PartFailurePolicy,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            scratch_dir: PathBuf::from("."),
            max_part_size: DEFAULT_MAX_PART_SIZE,
            part_failure_policy: PartFailurePolicy::default(),
        }
    }
}

/// Mirrors a storage account into a channel.
pub struct MirrorPipeline<'a> {
    source: &'a dyn StorageSource,
    sink: &'a dyn MessageSink,
    options: PipelineOptions,
    cancel: CancellationToken,
}

impl<'a> MirrorPipeline<'a> {
    pub fn new(
        source: &'a dyn StorageSource,
        sink: &'a dyn MessageSink,
        options: PipelineOptions,
    ) -> Self {
        Self {
            source,
            sink,
            options,
            cancel: CancellationToken::new(),
        }
    }

    /// Returns a token that stops the run before the next descriptor.
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Enumerates the account and delivers every file.
    ///
    /// Only an enumeration fault is returned as an error; per-file faults
    /// are reported in the summary.
    pub async fn run(&self) -> Result<RunSummary, EnumerationError> {
        let descriptors = enumerate_all(self.source).await?;
        info!(total = descriptors.len(), "total files to process: {}", descriptors.len());
        Ok(self.deliver_all(&descriptors).await)
    }

    /// Delivers `descriptors` in order, isolating failures per descriptor.
    pub async fn deliver_all(&self, descriptors: &[FileDescriptor]) -> RunSummary {
        let mut summary = RunSummary {
            considered: descriptors.len(),
            ..Default::default()
        };

        for descriptor in descriptors {
            if self.cancel.is_cancelled() {
                warn!(
                    remaining = descriptors.len() - summary.reports.len(),
                    "run cancelled"
                );
                summary.cancelled = true;
                break;
            }
            summary.reports.push(self.deliver(descriptor).await);
        }

        summary
    }

    /// Fetches, splits if needed, and sends one descriptor.
    pub async fn deliver(&self, descriptor: &FileDescriptor) -> ItemReport {
        info!(file = %descriptor.name, id = %descriptor.id, "processing {}", descriptor.name);

        let result = self.deliver_inner(descriptor).await;
        match &result {
            Ok(Delivery::Whole { bytes }) => {
                info!(file = %descriptor.name, bytes, "delivered");
            }
            Ok(Delivery::Split { bytes, parts }) => {
                info!(file = %descriptor.name, bytes, parts, "delivered in parts");
            }
            Err(e) => {
                error!(
                    file = %descriptor.name,
                    id = %descriptor.id,
                    stage = e.stage(),
                    error = %e,
                    "error with {}",
                    descriptor.name
                );
            }
        }

        ItemReport::new(descriptor, result)
    }

    async fn deliver_inner(&self, descriptor: &FileDescriptor) -> Result<Delivery, ItemError> {
        let artifact =
            fetch_to_artifact(self.source, descriptor, &self.options.scratch_dir).await?;
        let bytes = artifact.size();

        if bytes <= self.options.max_part_size {
            let sent = self
                .sink
                .send_document(artifact.path(), &descriptor.caption())
                .await;
            discard_artifact(artifact);
            return match sent {
                Ok(()) => Ok(Delivery::Whole { bytes }),
                Err(first) => Err(ItemError::Send {
                    total: 1,
                    attempted: 1,
                    failed: 1,
                    first,
                }),
            };
        }

        warn!(
            file = %descriptor.name,
            bytes,
            max = self.options.max_part_size,
            "file too big ({}), splitting",
            format_mib(bytes)
        );
        let result = self.send_parts(descriptor, &artifact).await;
        discard_artifact(artifact);
        result
    }

    /// Splits `artifact` lazily and sends each part, deleting it right after
    /// its attempt.
    async fn send_parts(
        &self,
        descriptor: &FileDescriptor,
        artifact: &LocalArtifact,
    ) -> Result<Delivery, ItemError> {
        let mut attempted: u32 = 0;
        let mut failed: u32 = 0;
        let mut first_error: Option<SendError> = None;
        let split_failed = |attempted: u32, failed: u32, source: SplitError| ItemError::Split {
            parts_attempted: attempted,
            sends_failed: failed,
            source,
        };

        let mut splitter = PartSplitter::new(artifact.path(), self.options.max_part_size)
            .map_err(|e| split_failed(attempted, failed, e.into()))?;
        let total = splitter.part_count();

        loop {
            let (returned, next) = tokio::task::spawn_blocking(move || {
                let next = splitter.next_part();
                (splitter, next)
            })
            .await
            .map_err(|e| split_failed(attempted, failed, SplitError::Task(e.to_string())))?;
            splitter = returned;

            let part = match next {
                Ok(Some(part)) => part,
                Ok(None) => break,
                Err(e) => {
                    if let Some(first) = &first_error {
                        warn!(file = %descriptor.name, failed, error = %first, "parts already failed before split error");
                    }
                    return Err(split_failed(attempted, failed, e.into()));
                }
            };

            let index = part.index();
            let caption = descriptor.part_caption(index);
            attempted += 1;

            let sent = self.sink.send_document(part.path(), &caption).await;
            discard_part(part);

            match sent {
                Ok(()) => {
                    info!(file = %descriptor.name, part = index, total, "sent part {index}/{total}");
                }
                Err(e) => {
                    failed += 1;
                    error!(file = %descriptor.name, part = index, total, error = %e, "failed to send part");
                    first_error.get_or_insert(e);
                    if self.options.part_failure_policy == PartFailurePolicy::Abort {
                        warn!(
                            file = %descriptor.name,
                            skipped = total - index,
                            "aborting remaining parts"
                        );
                        break;
                    }
                }
            }
        }

        match first_error {
            Some(first) => Err(ItemError::Send {
                total,
                attempted,
                failed,
                first,
            }),
            None => Ok(Delivery::Split {
                bytes: artifact.size(),
                parts: total,
            }),
        }
    }
}

fn discard_artifact(artifact: LocalArtifact) {
    let path = artifact.path().to_path_buf();
    if let Err(e) = artifact.remove() {
        warn!(path = %path.display(), error = %e, "failed to delete artifact");
    }
}

fn discard_part(part: PartArtifact) {
    let path = part.path().to_path_buf();
    if let Err(e) = part.remove() {
        warn!(path = %path.display(), error = %e, "failed to delete part");
    }
}
