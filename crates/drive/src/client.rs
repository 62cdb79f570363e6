//! Drive v3 `files` endpoint client.

use futures_util::{Stream, StreamExt};
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use reqwest::Response;
use tracing::debug;

use crate::Error;
use crate::auth::ServiceAccountAuth;
use crate::types::{DriveFile, FileList};

const DEFAULT_BASE_URL: &str = "https://www.googleapis.com/drive/v3";

/// Metadata requested for every listed file.
const LIST_FIELDS: &str = "nextPageToken, files(id, name, mimeType, size, owners(emailAddress, displayName))";

/// Maximum page size accepted by `files.list`.
const PAGE_SIZE: &str = "1000";

/// File ids are URL-safe already; anything else is escaped.
const ID_ENCODE_SET: &AsciiSet = &NON_ALPHANUMERIC.remove(b'-').remove(b'_').remove(b'.');

enum Credentials {
    Static(String),
    ServiceAccount(ServiceAccountAuth),
}

/// Google Drive API client.
pub struct Client {
    http: reqwest::Client,
    base_url: String,
    credentials: Credentials,
}

/// An open media download.
pub struct MediaDownload {
    /// `Content-Length` of the body, when the server sent one.
    pub size: Option<u64>,
    response: Response,
}

impl MediaDownload {
    /// The body as a stream of byte chunks.
    pub fn into_stream(self) -> impl Stream<Item = Result<Vec<u8>, Error>> + Send + 'static {
        self.response
            .bytes_stream()
            .map(|chunk| chunk.map(|b| b.to_vec()).map_err(Error::from))
    }
}

impl Client {
    /// Creates a client that authenticates with a service account.
    pub fn new(auth: ServiceAccountAuth) -> Result<Self, Error> {
        Self::with_credentials(Credentials::ServiceAccount(auth))
    }

    /// Creates a client using a pre-obtained OAuth2 access token.
    pub fn with_access_token(token: impl Into<String>) -> Result<Self, Error> {
        Self::with_credentials(Credentials::Static(token.into()))
    }

    fn with_credentials(credentials: Credentials) -> Result<Self, Error> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("drivegram/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            http,
            base_url: DEFAULT_BASE_URL.to_string(),
            credentials,
        })
    }

    #[cfg(test)]
    pub(crate) fn with_base_url(mut self, url: String) -> Self {
        self.base_url = url;
        self
    }

    /// Lists the non-trashed direct children of a folder, following pages.
    pub async fn list_children(&self, folder_id: &str) -> Result<Vec<DriveFile>, Error> {
        let query = format!("'{}' in parents and trashed=false", escape_query(folder_id));
        self.list_all(&query).await
    }

    /// Lists every non-trashed item shared with the account.
    pub async fn list_shared_with_me(&self) -> Result<Vec<DriveFile>, Error> {
        self.list_all("sharedWithMe and trashed=false").await
    }

    /// Opens a file's binary content.
    pub async fn download(&self, file_id: &str) -> Result<MediaDownload, Error> {
        let url = format!("{}/files/{}", self.base_url, encode_id(file_id));
        let response = self
            .get(&url, &[("alt", "media"), ("supportsAllDrives", "true")])
            .await?;

        Ok(MediaDownload {
            size: response.content_length(),
            response,
        })
    }

    async fn list_all(&self, query: &str) -> Result<Vec<DriveFile>, Error> {
        let url = format!("{}/files", self.base_url);
        let mut files = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut params = vec![
                ("q", query),
                ("fields", LIST_FIELDS),
                ("pageSize", PAGE_SIZE),
                ("supportsAllDrives", "true"),
                ("includeItemsFromAllDrives", "true"),
            ];
            if let Some(token) = page_token.as_deref() {
                params.push(("pageToken", token));
            }

            let body = self.get(&url, &params).await?.bytes().await?;
            let page: FileList = serde_json::from_slice(&body)?;
            debug!(query, count = page.files.len(), "listed page");
            files.extend(page.files);

            match page.next_page_token {
                Some(token) if !token.is_empty() => page_token = Some(token),
                _ => break,
            }
        }

        Ok(files)
    }

    async fn get(&self, url: &str, params: &[(&str, &str)]) -> Result<Response, Error> {
        let token = self.access_token().await?;
        let resp = self
            .http
            .get(url)
            .bearer_auth(token)
            .query(params)
            .send()
            .await?;
        let status = resp.status();

        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(Error::Api {
                status: status.as_u16(),
                body,
            });
        }

        Ok(resp)
    }

    async fn access_token(&self) -> Result<String, Error> {
        match &self.credentials {
            Credentials::Static(token) => Ok(token.clone()),
            Credentials::ServiceAccount(auth) => auth.access_token().await,
        }
    }
}

/// Escapes a value for use inside a single-quoted `q` string literal.
fn escape_query(value: &str) -> String {
    value.replace('\\', "\\\\").replace('\'', "\\'")
}

fn encode_id(id: &str) -> String {
    utf8_percent_encode(id, ID_ENCODE_SET).to_string()
}
