use std::fs::File;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};

use crate::naming::part_file_name;
use crate::{COPY_BUFFER_SIZE, TransferError};

/// Computes SHA-256 of `data` and returns the hex-encoded digest.
pub fn checksum_bytes(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

/// Number of parts an artifact of `size` bytes splits into: `ceil(size / max)`.
pub fn part_count(size: u64, max_part_size: u64) -> u32 {
    if max_part_size == 0 {
        return 0;
    }
    u32::try_from(size.div_ceil(max_part_size)).unwrap_or(u32::MAX)
}

// ---------------------------------------------------------------------------
// PartArtifact
// ---------------------------------------------------------------------------

/// One size-bounded slice of an artifact, written to its own file.
///
/// The file is deleted when the handle is dropped unless [`remove`](Self::remove)
/// already did it.
#[derive(Debug)]
pub struct PartArtifact {
    index: u32,
    path: PathBuf,
    size: u64,
    checksum: String,
    removed: bool,
}

impl PartArtifact {
    /// 1-based position of this part.
    pub fn index(&self) -> u32 {
        self.index
    }

    /// Location of the part file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Size in bytes.
    pub fn size(&self) -> u64 {
        self.size
    }

    /// SHA-256 hex digest of the part's bytes.
    pub fn checksum(&self) -> &str {
        &self.checksum
    }

    /// Deletes the part file now, reporting any failure.
    pub fn remove(mut self) -> std::io::Result<()> {
        self.removed = true;
        match std::fs::remove_file(&self.path) {
            Err(e) if e.kind() != std::io::ErrorKind::NotFound => Err(e),
            _ => Ok(()),
        }
    }
}

impl Drop for PartArtifact {
    fn drop(&mut self) {
        if self.removed {
            return;
        }
        if let Err(e) = std::fs::remove_file(&self.path)
            && e.kind() != std::io::ErrorKind::NotFound
        {
            tracing::warn!(path = %self.path.display(), error = %e, "failed to delete part file");
        }
    }
}

// ---------------------------------------------------------------------------
// PartSplitter
// ---------------------------------------------------------------------------

/// Lazily partitions a file into consecutive parts of at most `max_part_size`
/// bytes, named `<file>.part1`, `<file>.part2`, ... next to the source.
///
/// Parts are produced one at a time so the caller can send and delete each
/// before the next one is written.
pub struct PartSplitter {
    file: File,
    dir: PathBuf,
    base_name: String,
    max_part_size: u64,
    file_size: u64,
    offset: u64,
    next_index: u32,
    buffer_size: usize,
}

impl PartSplitter {
    /// Opens `path` for splitting into parts of at most `max_part_size` bytes.
    pub fn new(path: &Path, max_part_size: u64) -> Result<Self, TransferError> {
        if max_part_size == 0 {
            return Err(TransferError::InvalidPartSize(max_part_size));
        }

        let file = File::open(path)?;
        let file_size = file.metadata()?.len();
        let dir = path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));
        let base_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| {
                std::io::Error::new(
                    std::io::ErrorKind::InvalidInput,
                    format!("not a file path: {}", path.display()),
                )
            })?;

        Ok(Self {
            file,
            dir,
            base_name,
            max_part_size,
            file_size,
            offset: 0,
            next_index: 1,
            buffer_size: COPY_BUFFER_SIZE,
        })
    }

    #[cfg(test)]
    fn with_buffer_size(mut self, size: usize) -> Self {
        self.buffer_size = size;
        self
    }

    /// Writes the next part to disk. Returns `None` once the source is exhausted.
    ///
    /// On error the partially written part file is removed.
    pub fn next_part(&mut self) -> Result<Option<PartArtifact>, TransferError> {
        let remaining = self.file_size - self.offset;
        if remaining == 0 {
            return Ok(None);
        }

        let part_size = remaining.min(self.max_part_size);
        let path = self
            .dir
            .join(part_file_name(&self.base_name, self.next_index));

        // Declared before `out` so an early return closes the file, then deletes it.
        let mut part = PartArtifact {
            index: self.next_index,
            path,
            size: part_size,
            checksum: String::new(),
            removed: false,
        };
        let mut out = File::create(&part.path)?;

        let buf_len = (self.buffer_size as u64).min(part_size) as usize;
        let mut buf = vec![0u8; buf_len];
        let mut hasher = Sha256::new();
        let mut copied: u64 = 0;

        while copied < part_size {
            let want = ((part_size - copied) as usize).min(buf.len());
            let n = self.file.read(&mut buf[..want])?;
            if n == 0 {
                return Err(TransferError::Truncated {
                    expected: self.file_size,
                    actual: self.offset + copied,
                });
            }
            out.write_all(&buf[..n])?;
            hasher.update(&buf[..n]);
            copied += n as u64;
        }
        out.flush()?;

        part.checksum = hex::encode(hasher.finalize());
        self.offset += part_size;
        self.next_index = self.next_index.saturating_add(1);

        tracing::debug!(
            part = part.index,
            bytes = part.size,
            checksum = %part.checksum,
            "wrote part"
        );

        Ok(Some(part))
    }

    /// Total number of parts this splitter produces.
    pub fn part_count(&self) -> u32 {
        part_count(self.file_size, self.max_part_size)
    }

    /// Size of the source file in bytes.
    pub fn file_size(&self) -> u64 {
        self.file_size
    }
}
