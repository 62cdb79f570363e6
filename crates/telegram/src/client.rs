//! `sendDocument` client with flood-wait handling.

use std::path::Path;
use std::time::Duration;

use reqwest::multipart::{Form, Part};
use tokio_util::io::ReaderStream;
use tracing::{debug, warn};

use crate::Error;
use crate::types::{ApiResponse, Message, clamp_caption};

/// Public Bot API endpoint.
pub const DEFAULT_API_URL: &str = "https://api.telegram.org";

/// How many 429 replies are waited out per document before giving up.
pub const DEFAULT_MAX_FLOOD_WAITS: u32 = 3;

/// Bot API client bound to one destination chat.
pub struct Client {
    http: reqwest::Client,
    api_url: String,
    token: String,
    chat_id: String,
    max_flood_waits: u32,
}

impl std::fmt::Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("api_url", &self.api_url)
            .field("token", &"[hidden]")
            .field("chat_id", &self.chat_id)
            .field("max_flood_waits", &self.max_flood_waits)
            .finish()
    }
}

impl Client {
    /// Creates a client for `chat_id` (numeric id or `@channel` username).
    pub fn new(token: impl Into<String>, chat_id: impl Into<String>) -> Result<Self, Error> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("drivegram/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            http,
            api_url: DEFAULT_API_URL.to_string(),
            token: token.into(),
            chat_id: chat_id.into(),
            max_flood_waits: DEFAULT_MAX_FLOOD_WAITS,
        })
    }

    /// Points the client at another Bot API server.
    pub fn with_api_url(mut self, url: impl Into<String>) -> Self {
        self.api_url = url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_max_flood_waits(mut self, max: u32) -> Self {
        self.max_flood_waits = max;
        self
    }

    pub fn chat_id(&self) -> &str {
        &self.chat_id
    }

    /// Uploads the file at `path` as a document.
    ///
    /// Captions over the Bot API limit are truncated. A `429 Too Many
    /// Requests` reply is slept off and retried up to the configured number
    /// of times; any other failure is returned immediately.
    pub async fn send_document(&self, path: &Path, caption: &str) -> Result<Message, Error> {
        let clamped = clamp_caption(caption);
        if clamped.len() < caption.len() {
            warn!(file = %path.display(), "caption truncated to Telegram's limit");
        }

        let mut flood_waits = 0;
        loop {
            match self.upload(path, clamped).await {
                Err(e) if flood_waits < self.max_flood_waits && e.retry_after().is_some() => {
                    let secs = e.retry_after().unwrap_or_default();
                    flood_waits += 1;
                    warn!(
                        file = %path.display(),
                        retry_after = secs,
                        attempt = flood_waits,
                        "rate limited, waiting"
                    );
                    tokio::time::sleep(Duration::from_secs(secs)).await;
                }
                other => return other,
            }
        }
    }

    async fn upload(&self, path: &Path, caption: &str) -> Result<Message, Error> {
        let file = tokio::fs::File::open(path).await?;
        let len = file.metadata().await?.len();
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "document".to_string());

        let body = reqwest::Body::wrap_stream(ReaderStream::new(file));
        let document = Part::stream_with_length(body, len)
            .file_name(file_name)
            .mime_str("application/octet-stream")?;
        let form = Form::new()
            .text("chat_id", self.chat_id.clone())
            .text("caption", caption.to_string())
            .part("document", document);

        let url = format!("{}/bot{}/sendDocument", self.api_url, self.token);
        debug!(file = %path.display(), bytes = len, "uploading document");

        let resp = self.http.post(&url).multipart(form).send().await?;
        let status = resp.status();
        let body = resp.bytes().await?;

        let parsed: ApiResponse<Message> = match serde_json::from_slice(&body) {
            Ok(parsed) => parsed,
            Err(_) if !status.is_success() => {
                return Err(Error::Api {
                    code: status.as_u16(),
                    description: String::from_utf8_lossy(&body).into_owned(),
                    retry_after: None,
                });
            }
            Err(e) => return Err(e.into()),
        };

        match parsed {
            ApiResponse {
                ok: true,
                result: Some(message),
                ..
            } => Ok(message),
            other => Err(Error::Api {
                code: other.error_code.unwrap_or(status.as_u16()),
                description: other.description.unwrap_or_else(|| "no description".into()),
                retry_after: other.parameters.and_then(|p| p.retry_after),
            }),
        }
    }
}
