//! Source tree enumeration.
//!
//! Produces the flat, ordered list of files to deliver: the own namespace
//! first, then everything shared with the account. Traversal is depth-first
//! pre-order over an explicit worklist, so arbitrarily deep trees never grow
//! the call stack. No de-duplication: an item reachable through several
//! paths is emitted once per path.

use tracing::{debug, info};

use crate::error::EnumerationError;
use crate::source::StorageSource;
use crate::types::{FileDescriptor, ItemKind, Origin, RemoteItem};

/// Well-known identifier of the account's own root folder.
pub const ROOT_FOLDER_ID: &str = "root";

struct Pending {
    item: RemoteItem,
    depth: usize,
}

/// Enumerates the own namespace followed by all shared items.
pub async fn enumerate_all(
    source: &dyn StorageSource,
) -> Result<Vec<FileDescriptor>, EnumerationError> {
    info!("scanning own namespace");
    let mut files = enumerate_folder(source, ROOT_FOLDER_ID, Origin::Owned).await?;
    let owned = files.len();

    info!("scanning items shared with the account");
    files.extend(enumerate_shared(source).await?);

    info!(owned, shared = files.len() - owned, "enumeration complete");
    Ok(files)
}

/// Enumerates every file below `folder_id`, tagging descriptors with `origin`.
pub async fn enumerate_folder(
    source: &dyn StorageSource,
    folder_id: &str,
    origin: Origin,
) -> Result<Vec<FileDescriptor>, EnumerationError> {
    let mut worklist = Vec::new();
    push_children(source, folder_id, 0, &mut worklist).await?;

    let mut files = Vec::new();
    drain(source, worklist, origin, &mut files).await?;
    Ok(files)
}

/// Enumerates items shared with the account.
///
/// Shared folders are walked transitively; shared files are emitted as-is.
pub async fn enumerate_shared(
    source: &dyn StorageSource,
) -> Result<Vec<FileDescriptor>, EnumerationError> {
    let shared = source
        .list_shared_with_me()
        .await
        .map_err(EnumerationError::Shared)?;

    let worklist = shared
        .into_iter()
        .rev()
        .map(|item| Pending { item, depth: 0 })
        .collect();

    let mut files = Vec::new();
    drain(source, worklist, Origin::Shared, &mut files).await?;
    Ok(files)
}

/// Pops entries until the worklist is empty, expanding folders in place.
async fn drain(
    source: &dyn StorageSource,
    mut worklist: Vec<Pending>,
    origin: Origin,
    files: &mut Vec<FileDescriptor>,
) -> Result<(), EnumerationError> {
    while let Some(Pending { item, depth }) = worklist.pop() {
        match item.kind {
            ItemKind::Folder => {
                info!(
                    depth,
                    %origin,
                    id = %item.id,
                    owner = item.owner.as_deref().unwrap_or("-"),
                    "folder {}",
                    item.name
                );
                push_children(source, &item.id, depth + 1, &mut worklist).await?;
            }
            ItemKind::File => {
                info!(
                    depth,
                    %origin,
                    id = %item.id,
                    owner = item.owner.as_deref().unwrap_or("-"),
                    "file {}",
                    item.name
                );
                files.push(FileDescriptor::from_item(item, origin));
            }
        }
    }
    Ok(())
}

/// Lists `folder_id` and pushes its children so they pop in listing order.
async fn push_children(
    source: &dyn StorageSource,
    folder_id: &str,
    depth: usize,
    worklist: &mut Vec<Pending>,
) -> Result<(), EnumerationError> {
    let children = source
        .list_children(folder_id)
        .await
        .map_err(|e| EnumerationError::Folder {
            folder_id: folder_id.to_string(),
            source: e,
        })?;

    debug!(folder = %folder_id, children = children.len(), "listed folder");
    worklist.extend(
        children
            .into_iter()
            .rev()
            .map(|item| Pending { item, depth }),
    );
    Ok(())
}
