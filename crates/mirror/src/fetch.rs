//! Content fetching into scratch artifacts.

use std::path::{Path, PathBuf};

use drivegram_transfer::{DownloadProgress, format_mib, scratch_file_name};
use futures_util::StreamExt;
use tokio::io::{AsyncWriteExt, BufWriter};
use tracing::{info, warn};

use crate::error::FetchError;
use crate::source::StorageSource;
use crate::types::{FileDescriptor, ItemKind};

/// A downloaded file in the scratch directory.
///
/// Owned by the delivery of one descriptor. The file is deleted when the
/// handle is dropped unless [`remove`](Self::remove) already did it.
#[derive(Debug)]
pub struct LocalArtifact {
    path: PathBuf,
    size: u64,
    removed: bool,
}

impl LocalArtifact {
    /// Location of the artifact.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Size in bytes.
    pub fn size(&self) -> u64 {
        self.size
    }

    /// Deletes the artifact now, reporting any failure.
    pub fn remove(mut self) -> std::io::Result<()> {
        self.removed = true;
        match std::fs::remove_file(&self.path) {
            Err(e) if e.kind() != std::io::ErrorKind::NotFound => Err(e),
            _ => Ok(()),
        }
    }
}

impl Drop for LocalArtifact {
    fn drop(&mut self) {
        if self.removed {
            return;
        }
        if let Err(e) = std::fs::remove_file(&self.path)
            && e.kind() != std::io::ErrorKind::NotFound
        {
            warn!(path = %self.path.display(), error = %e, "failed to delete artifact");
        }
    }
}

/// Streams a remote file into `scratch_dir`, named after its display name.
///
/// Memory use is bounded by the provider's chunk size. A partially written
/// artifact is deleted before the error is returned.
pub async fn fetch_to_artifact(
    source: &dyn StorageSource,
    descriptor: &FileDescriptor,
    scratch_dir: &Path,
) -> Result<LocalArtifact, FetchError> {
    if descriptor.kind == ItemKind::Folder {
        return Err(FetchError::NotAFile(descriptor.id.clone()));
    }

    let content = source.open_file(&descriptor.id).await?;
    let path = scratch_dir.join(scratch_file_name(&descriptor.name));
    let file = tokio::fs::File::create(&path).await?;

    // Declared before the writer so the file is closed before deletion.
    let mut artifact = LocalArtifact {
        path,
        size: 0,
        removed: false,
    };
    let mut writer = BufWriter::new(file);
    let mut progress = DownloadProgress::new(content.size);
    let mut stream = content.stream;

    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        writer.write_all(&chunk).await?;
        artifact.size += chunk.len() as u64;

        if let Some(percent) = progress.record(chunk.len() as u64) {
            info!(file = %descriptor.name, percent, "downloading {} {percent}%", descriptor.name);
        }
    }
    writer.flush().await?;
    drop(writer);

    if let Some(expected) = content.size
        && expected != artifact.size
    {
        return Err(FetchError::Incomplete {
            expected,
            actual: artifact.size,
        });
    }

    info!(
        file = %descriptor.name,
        bytes = artifact.size,
        elapsed_ms = progress.elapsed().as_millis() as u64,
        rate = %format!("{}/s", format_mib(progress.bytes_per_second() as u64)),
        "downloaded {} ({})",
        descriptor.name,
        format_mib(artifact.size)
    );

    Ok(artifact)
}
