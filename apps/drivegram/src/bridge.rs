//! Adapters from the concrete API clients to the mirror capabilities.

use std::future::Future;
use std::path::Path;
use std::pin::Pin;

use drivegram_drive::DriveFile;
use drivegram_mirror::{
    ItemKind, MessageSink, RemoteContent, RemoteItem, SendError, SourceError, SourceFuture,
    StorageSource,
};
use futures_util::StreamExt;
use tracing::{debug, info};

/// [`StorageSource`] backed by the Drive v3 API.
pub struct DriveSource {
    client: drivegram_drive::Client,
}

impl DriveSource {
    pub fn new(client: drivegram_drive::Client) -> Self {
        Self { client }
    }
}

impl StorageSource for DriveSource {
    fn list_children<'a>(&'a self, folder_id: &'a str) -> SourceFuture<'a, Vec<RemoteItem>> {
        Box::pin(async move {
            let files = self
                .client
                .list_children(folder_id)
                .await
                .map_err(source_error)?;
            Ok(remote_items(files))
        })
    }

    fn list_shared_with_me(&self) -> SourceFuture<'_, Vec<RemoteItem>> {
        Box::pin(async move {
            let files = self
                .client
                .list_shared_with_me()
                .await
                .map_err(source_error)?;
            Ok(remote_items(files))
        })
    }

    fn open_file<'a>(&'a self, file_id: &'a str) -> SourceFuture<'a, RemoteContent> {
        Box::pin(async move {
            let download = self.client.download(file_id).await.map_err(source_error)?;
            let size = download.size;
            let stream = download
                .into_stream()
                .map(|chunk| chunk.map_err(source_error));
            Ok(RemoteContent {
                size,
                stream: Box::pin(stream),
            })
        })
    }
}

/// [`MessageSink`] posting documents through the Bot API.
pub struct TelegramSink {
    client: drivegram_telegram::Client,
}

impl TelegramSink {
    pub fn new(client: drivegram_telegram::Client) -> Self {
        Self { client }
    }
}

impl MessageSink for TelegramSink {
    fn send_document<'a>(
        &'a self,
        path: &'a Path,
        caption: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<(), SendError>> + Send + 'a>> {
        Box::pin(async move {
            let message = self
                .client
                .send_document(path, caption)
                .await
                .map_err(send_error)?;
            debug!(message_id = message.message_id, chat = %self.client.chat_id(), "document posted");
            Ok(())
        })
    }
}

/// Converts a listing, leaving out Google-native documents: they have no
/// binary content and `alt=media` rejects them.
fn remote_items(files: Vec<DriveFile>) -> Vec<RemoteItem> {
    files
        .into_iter()
        .filter(|file| {
            if file.is_native_document() {
                info!(id = %file.id, mime_type = %file.mime_type, "skipping native document {}", file.name);
                return false;
            }
            true
        })
        .map(remote_item)
        .collect()
}

fn remote_item(file: DriveFile) -> RemoteItem {
    let kind = if file.is_folder() {
        ItemKind::Folder
    } else {
        ItemKind::File
    };
    let owner = file.owner_label().map(str::to_string);
    let size = file.size_bytes();
    let mime_type = (!file.mime_type.is_empty()).then_some(file.mime_type);

    RemoteItem {
        id: file.id,
        name: file.name,
        kind,
        owner,
        mime_type,
        size,
    }
}

fn source_error(e: drivegram_drive::Error) -> SourceError {
    if e.is_not_found() {
        SourceError::NotFound(e.to_string())
    } else if e.is_unauthorized() {
        SourceError::Unauthorized(e.to_string())
    } else {
        SourceError::Transport(e.to_string())
    }
}

fn send_error(e: drivegram_telegram::Error) -> SendError {
    match e {
        drivegram_telegram::Error::Io(io) => SendError::Io(io),
        e @ drivegram_telegram::Error::Api { .. } => SendError::Rejected(e.to_string()),
        e => SendError::Transport(e.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use drivegram_drive::Owner;

    use super::*;

    #[test]
    fn folder_conversion() {
        let item = remote_item(DriveFile {
            id: "f1".into(),
            name: "Photos".into(),
            mime_type: drivegram_drive::FOLDER_MIME_TYPE.into(),
            ..Default::default()
        });
        assert!(item.is_folder());
        assert_eq!(item.id, "f1");
        assert_eq!(item.size, None);
    }

    #[test]
    fn file_conversion_keeps_hints() {
        let item = remote_item(DriveFile {
            id: "x".into(),
            name: "clip.mp4".into(),
            mime_type: "video/mp4".into(),
            size: Some("1024".into()),
            owners: vec![Owner {
                email_address: Some("alice@example.com".into()),
                display_name: None,
            }],
        });
        assert_eq!(item.kind, ItemKind::File);
        assert_eq!(item.size, Some(1024));
        assert_eq!(item.owner.as_deref(), Some("alice@example.com"));
        assert_eq!(item.mime_type.as_deref(), Some("video/mp4"));
    }

    #[test]
    fn native_documents_are_left_out() {
        let file = |id: &str, mime: &str| DriveFile {
            id: id.into(),
            name: id.into(),
            mime_type: mime.into(),
            ..Default::default()
        };
        let items = remote_items(vec![
            file("sheet", "application/vnd.google-apps.spreadsheet"),
            file("dir", drivegram_drive::FOLDER_MIME_TYPE),
            file("photo", "image/jpeg"),
            file("doc", "application/vnd.google-apps.document"),
        ]);

        let ids: Vec<&str> = items.iter().map(|i| i.id.as_str()).collect();
        assert_eq!(ids, vec!["dir", "photo"]);
        assert!(items[0].is_folder());
    }

    #[test]
    fn missing_mime_type_is_none() {
        let item = remote_item(DriveFile {
            id: "x".into(),
            ..Default::default()
        });
        assert_eq!(item.mime_type, None);
    }

    #[test]
    fn drive_error_mapping() {
        let api = |status| drivegram_drive::Error::Api {
            status,
            body: String::new(),
        };
        assert!(matches!(source_error(api(404)), SourceError::NotFound(_)));
        assert!(matches!(source_error(api(401)), SourceError::Unauthorized(_)));
        assert!(matches!(source_error(api(403)), SourceError::Unauthorized(_)));
        assert!(matches!(source_error(api(500)), SourceError::Transport(_)));
        assert!(matches!(
            source_error(drivegram_drive::Error::InvalidKey("bad".into())),
            SourceError::Unauthorized(_)
        ));
    }

    #[test]
    fn telegram_error_mapping() {
        let rejected = send_error(drivegram_telegram::Error::Api {
            code: 400,
            description: "Bad Request: chat not found".into(),
            retry_after: None,
        });
        assert!(matches!(rejected, SendError::Rejected(ref m) if m.contains("chat not found")));

        let io = send_error(drivegram_telegram::Error::Io(std::io::Error::other("gone")));
        assert!(matches!(io, SendError::Io(_)));
    }
}
