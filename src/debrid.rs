use std::future::Future;
use std::time::Duration;

use reqwest::{Client, RequestBuilder, Response};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::http::error_body;
use crate::selector::{NO_FILE, TorrentFile};

pub const DEFAULT_BASE_URL: &str = "https://api.real-debrid.com/rest/1.0";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(45);

#[derive(Error, Debug)]
pub enum UnlockError {
    #[error("unlock service request failed ({status}): {body}")]
    Remote { status: u16, body: String },
    #[error("unlock service unreachable: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("unlock service returned an empty torrent id")]
    EmptyHandle,
    #[error("no file could be selected for unlocking")]
    InvalidSelection,
    #[error("torrent metadata did not become available")]
    MetadataTimeout,
    #[error("timeout waiting for unlocked links")]
    LinksTimeout,
    #[error("unlock service returned an empty download link")]
    EmptyDownloadUrl,
    #[error("cancelled")]
    Cancelled,
}

/// How often and how many times to poll a torrent's status
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    pub attempts: u32,
    pub interval: Duration,
}

/// Reading the file manifest is quick once the service has seen the magnet
pub const METADATA_POLL: PollPolicy = PollPolicy {
    attempts: 8,
    interval: Duration::from_millis(1200),
};

/// Links appear only after the service has cached the selected content
pub const LINKS_POLL: PollPolicy = PollPolicy {
    attempts: 30,
    interval: Duration::from_millis(1500),
};

/// A torrent registered with the unlock service for one resolution attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TorrentHandle {
    pub id: String,
}

#[derive(Debug, Deserialize)]
struct AddMagnetResponse {
    #[serde(default)]
    id: String,
}

#[derive(Debug, Default, Deserialize)]
struct TorrentInfo {
    #[serde(default)]
    status: String,
    #[serde(default)]
    files: Vec<RemoteFile>,
    #[serde(default)]
    links: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct RemoteFile {
    id: u32,
    #[serde(default)]
    path: String,
    #[serde(default)]
    bytes: u64,
}

#[derive(Debug, Deserialize)]
struct UnrestrictResponse {
    #[serde(default)]
    download: String,
}

/// Client for the Real-Debrid torrent unlock API
#[derive(Clone)]
pub struct DebridClient {
    client: Client,
    token: String,
    base_url: String,
    metadata_poll: PollPolicy,
    links_poll: PollPolicy,
}

impl DebridClient {
    /// Create a client from a shared HTTP client and an access token.
    /// Returns None if the token is blank, which means unlocking is disabled.
    pub fn new(client: Client, token: Option<&str>) -> Option<Self> {
        Self::with_base_url(client, token, DEFAULT_BASE_URL)
    }

    /// Create a client with a custom base URL (for testing)
    pub fn with_base_url(client: Client, token: Option<&str>, base_url: &str) -> Option<Self> {
        let token = token.map(str::trim).filter(|t| !t.is_empty())?;

        Some(Self {
            client,
            token: token.to_string(),
            base_url: base_url.trim_end_matches('/').to_string(),
            metadata_poll: METADATA_POLL,
            links_poll: LINKS_POLL,
        })
    }

    /// Override the polling budgets
    pub fn with_poll_policies(mut self, metadata: PollPolicy, links: PollPolicy) -> Self {
        self.metadata_poll = metadata;
        self.links_poll = links;
        self
    }

    /// Register a magnet with the service
    pub async fn add_magnet(
        &self,
        magnet: &str,
        cancel: &CancellationToken,
    ) -> Result<TorrentHandle, UnlockError> {
        let request = self.post("/torrents/addMagnet").form(&[("magnet", magnet)]);
        let payload: AddMagnetResponse = with_cancel(cancel, self.send_json(request)).await?;

        if payload.id.is_empty() {
            return Err(UnlockError::EmptyHandle);
        }

        info!(torrent_id = %payload.id, "magnet registered");
        Ok(TorrentHandle { id: payload.id })
    }

    /// Poll until the torrent's file manifest is known
    pub async fn await_metadata(
        &self,
        handle: &TorrentHandle,
        cancel: &CancellationToken,
    ) -> Result<Vec<TorrentFile>, UnlockError> {
        let files = self
            .poll(handle, self.metadata_poll, cancel, |info| {
                (!info.files.is_empty()).then_some(info.files)
            })
            .await?
            .ok_or(UnlockError::MetadataTimeout)?;

        info!(files = files.len(), "metadata received");

        Ok(files
            .into_iter()
            .enumerate()
            .map(|(local_index, f)| TorrentFile {
                local_index,
                remote_id: f.id,
                path: f.path,
                size_bytes: f.bytes,
            })
            .collect())
    }

    /// Select the single file to unlock
    pub async fn select_file(
        &self,
        handle: &TorrentHandle,
        file_id: u32,
        cancel: &CancellationToken,
    ) -> Result<(), UnlockError> {
        if file_id == NO_FILE {
            return Err(UnlockError::InvalidSelection);
        }

        let route = format!("/torrents/selectFiles/{}", urlencoding::encode(&handle.id));
        let request = self.post(&route).form(&[("files", file_id.to_string())]);
        with_cancel(cancel, self.send(request)).await?;

        debug!(torrent_id = %handle.id, file_id, "file selected");
        Ok(())
    }

    /// Poll until the service exposes at least one link for the selected file
    pub async fn await_ready_links(
        &self,
        handle: &TorrentHandle,
        cancel: &CancellationToken,
    ) -> Result<Vec<String>, UnlockError> {
        let links = self
            .poll(handle, self.links_poll, cancel, |info| {
                (!info.links.is_empty()).then_some(info.links)
            })
            .await?
            .ok_or(UnlockError::LinksTimeout)?;

        info!(links = links.len(), "links ready");
        Ok(links)
    }

    /// Turn a hoster or ready link into a direct download URL
    pub async fn unrestrict(
        &self,
        link: &str,
        cancel: &CancellationToken,
    ) -> Result<String, UnlockError> {
        let request = self.post("/unrestrict/link").form(&[("link", link)]);
        let payload: UnrestrictResponse = with_cancel(cancel, self.send_json(request)).await?;

        if payload.download.is_empty() {
            return Err(UnlockError::EmptyDownloadUrl);
        }

        Ok(payload.download)
    }

    /// Fetch the torrent status up to `policy.attempts` times. Returns Ok(None)
    /// when the budget runs out. Request errors are returned immediately.
    async fn poll<T>(
        &self,
        handle: &TorrentHandle,
        policy: PollPolicy,
        cancel: &CancellationToken,
        ready: impl Fn(TorrentInfo) -> Option<T>,
    ) -> Result<Option<T>, UnlockError> {
        let route = format!("/torrents/info/{}", urlencoding::encode(&handle.id));

        for attempt in 1..=policy.attempts {
            let request = self.get(&route);
            let info: TorrentInfo = with_cancel(cancel, self.send_json(request)).await?;
            let status = info.status.clone();

            if let Some(value) = ready(info) {
                return Ok(Some(value));
            }

            debug!(torrent_id = %handle.id, attempt, status = %status, "torrent not ready");

            if attempt < policy.attempts {
                with_cancel(cancel, async {
                    tokio::time::sleep(policy.interval).await;
                    Ok::<(), UnlockError>(())
                })
                .await?;
            }
        }

        Ok(None)
    }

    fn get(&self, route: &str) -> RequestBuilder {
        self.authorize(self.client.get(format!("{}{}", self.base_url, route)))
    }

    fn post(&self, route: &str) -> RequestBuilder {
        self.authorize(self.client.post(format!("{}{}", self.base_url, route)))
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        request
            .bearer_auth(&self.token)
            .header(reqwest::header::ACCEPT, "application/json")
            .timeout(REQUEST_TIMEOUT)
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response, UnlockError> {
        let response = request.send().await?;
        let status = response.status();

        if !status.is_success() {
            let body = error_body(response).await;
            return Err(UnlockError::Remote {
                status: status.as_u16(),
                body,
            });
        }

        Ok(response)
    }

    async fn send_json<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, UnlockError> {
        let response = self.send(request).await?;
        Ok(response.json().await?)
    }
}

/// Run `fut` unless `cancel` fires first
async fn with_cancel<T, F>(cancel: &CancellationToken, fut: F) -> Result<T, UnlockError>
where
    F: Future<Output = Result<T, UnlockError>>,
{
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(UnlockError::Cancelled),
        result = fut => result,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_token_disables_client() {
        assert!(DebridClient::new(Client::new(), None).is_none());
        assert!(DebridClient::new(Client::new(), Some("")).is_none());
        assert!(DebridClient::new(Client::new(), Some("   ")).is_none());
        assert!(DebridClient::new(Client::new(), Some("token")).is_some());
    }

    #[test]
    fn test_base_url_trailing_slash() {
        let client =
            DebridClient::with_base_url(Client::new(), Some("t"), "http://localhost:1234/").unwrap();
        assert_eq!(client.base_url, "http://localhost:1234");
        assert_eq!(client.token, "t");
    }

    #[test]
    fn test_default_budgets() {
        assert_eq!(METADATA_POLL.attempts, 8);
        assert_eq!(METADATA_POLL.interval, Duration::from_millis(1200));
        assert_eq!(LINKS_POLL.attempts, 30);
        assert_eq!(LINKS_POLL.interval, Duration::from_millis(1500));
    }

    #[test]
    fn test_torrent_info_tolerates_missing_fields() {
        let info: TorrentInfo = serde_json::from_str(r#"{"status":"magnet_conversion"}"#).unwrap();
        assert!(info.files.is_empty());
        assert!(info.links.is_empty());

        let info: TorrentInfo = serde_json::from_str(
            r#"{"status":"downloaded","files":[{"id":1,"path":"/a.mkv","bytes":42}],"links":["https://l/1"]}"#,
        )
        .unwrap();
        assert_eq!(info.files[0].id, 1);
        assert_eq!(info.files[0].bytes, 42);
        assert_eq!(info.links, vec!["https://l/1"]);
    }
}
