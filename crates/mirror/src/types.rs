//! Data types shared across the pipeline.

use std::fmt;

/// Whether a listed item is a container or a leaf.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemKind {
    Folder,
    File,
}

/// Which traversal entry point reached a descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    /// The account's own namespace, rooted at the root marker.
    Owned,
    /// An item shared with the account, or something inside a shared folder.
    Shared,
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Origin::Owned => f.write_str("owned"),
            Origin::Shared => f.write_str("shared"),
        }
    }
}

/// One entry as reported by a storage listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteItem {
    /// Source-assigned identifier, unique within the account.
    pub id: String,
    /// Display name. Not unique.
    pub name: String,
    pub kind: ItemKind,
    /// Owner shown for shared items (e-mail address or display name).
    pub owner: Option<String>,
    pub mime_type: Option<String>,
    /// Size reported by the listing; absent for folders and native documents.
    pub size: Option<u64>,
}

impl RemoteItem {
    /// A file entry with only the required fields set.
    pub fn file(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            kind: ItemKind::File,
            owner: None,
            mime_type: None,
            size: None,
        }
    }

    /// A folder entry with only the required fields set.
    pub fn folder(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            kind: ItemKind::Folder,
            ..Self::file(id, name)
        }
    }

    /// Sets the owner hint.
    pub fn with_owner(mut self, owner: impl Into<String>) -> Self {
        self.owner = Some(owner.into());
        self
    }

    pub fn is_folder(&self) -> bool {
        self.kind == ItemKind::Folder
    }
}

/// A remote file scheduled for delivery.
///
/// Identity is `id`; `name` only feeds captions, logs and scratch names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileDescriptor {
    pub id: String,
    pub name: String,
    pub kind: ItemKind,
    pub owner_hint: Option<String>,
    pub origin: Origin,
    pub mime_type: Option<String>,
    pub size: Option<u64>,
}

impl FileDescriptor {
    /// Builds a descriptor from a listed item reached through `origin`.
    pub fn from_item(item: RemoteItem, origin: Origin) -> Self {
        Self {
            id: item.id,
            name: item.name,
            kind: item.kind,
            owner_hint: item.owner,
            origin,
            mime_type: item.mime_type,
            size: item.size,
        }
    }

    /// Caption for the whole file.
    pub fn caption(&self) -> String {
        self.name.clone()
    }

    /// Caption for part `index` (1-based) of a split file.
    pub fn part_caption(&self, index: u32) -> String {
        format!("{} (part {index})", self.name)
    }
}
