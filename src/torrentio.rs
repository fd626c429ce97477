//! Torrentio addon client
//!
//! Lists stream candidates for a movie or an episode. Each candidate is either
//! a direct link, a magnet, or an info-hash with tracker hints.

use std::time::Duration;

use reqwest::Client;
use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

use crate::cinemeta::MediaItem;
use crate::descriptor::StreamDescriptor;
use crate::http::error_body;

pub const DEFAULT_BASE_URL: &str = "https://torrentio.strem.fun";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Error, Debug)]
pub enum SourceError {
    #[error("request failed: {0}")]
    RequestError(#[from] reqwest::Error),
    #[error("stream source request failed ({status}): {body}")]
    Status { status: u16, body: String },
    #[error("missing media id")]
    MissingId,
    #[error("unsupported media type: {0}")]
    UnsupportedType(String),
}

#[derive(Debug, Deserialize)]
struct StreamsResponse {
    #[serde(default)]
    streams: Vec<RawStream>,
}

#[derive(Debug, Deserialize)]
struct RawStream {
    #[serde(default)]
    name: String,
    #[serde(default)]
    title: String,
    #[serde(default)]
    url: String,
    #[serde(rename = "infoHash", default)]
    info_hash: String,
    #[serde(rename = "fileIdx", default)]
    file_idx: Option<serde_json::Value>,
    #[serde(default)]
    sources: Vec<String>,
}

impl RawStream {
    fn into_descriptor(self) -> StreamDescriptor {
        StreamDescriptor {
            name: self.name.trim().to_string(),
            title: self.title.trim().to_string(),
            url: self.url.trim().to_string(),
            info_hash: self.info_hash.trim().to_string(),
            file_idx: self.file_idx.as_ref().and_then(parse_file_idx),
            sources: self.sources,
        }
    }
}

pub struct TorrentioClient {
    client: Client,
    base_url: String,
}

impl TorrentioClient {
    pub fn new(client: Client) -> Self {
        Self::with_base_url(client, DEFAULT_BASE_URL)
    }

    /// Create a client with a custom base URL (for testing)
    pub fn with_base_url(client: Client, base_url: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Stream candidates for a catalog item. Season and episode are only used for series.
    pub async fn streams(
        &self,
        item: &MediaItem,
        season: u32,
        episode: u32,
    ) -> Result<Vec<StreamDescriptor>, SourceError> {
        if item.id.is_empty() {
            return Err(SourceError::MissingId);
        }

        let id = urlencoding::encode(&item.id);
        let stream_path = match item.media_type.as_str() {
            "movie" => format!("/stream/movie/{}.json", id),
            "series" => format!("/stream/series/{}:{}:{}.json", id, season, episode),
            other => return Err(SourceError::UnsupportedType(other.to_string())),
        };

        debug!(id = %item.id, path = %stream_path, "fetching streams");

        let response = self
            .client
            .get(format!("{}{}", self.base_url, stream_path))
            .header(reqwest::header::ACCEPT, "application/json")
            .header(reqwest::header::ACCEPT_LANGUAGE, "en-US,en;q=0.9")
            .timeout(REQUEST_TIMEOUT)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(SourceError::Status {
                status: status.as_u16(),
                body: error_body(response).await,
            });
        }

        let payload: StreamsResponse = response.json().await?;

        let streams: Vec<StreamDescriptor> = payload
            .streams
            .into_iter()
            .map(RawStream::into_descriptor)
            .filter(StreamDescriptor::is_playable)
            .collect();

        debug!(streams = streams.len(), "streams received");
        Ok(streams)
    }
}

/// `fileIdx` shows up as an integer, a float or a numeric string
fn parse_file_idx(value: &serde_json::Value) -> Option<usize> {
    match value {
        serde_json::Value::Number(n) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| *f >= 0.0).map(|f| f as u64))
            .and_then(|idx| usize::try_from(idx).ok()),
        serde_json::Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}
