use std::collections::BTreeMap;
use std::time::Duration;

use reqwest::Client;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::debug;

use crate::http::error_body;

pub const DEFAULT_BASE_URL: &str = "https://v3-cinemeta.strem.io";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(20);
const MAX_SEARCH_RESULTS: usize = 60;

#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("request failed: {0}")]
    RequestError(#[from] reqwest::Error),
    #[error("catalog request failed ({status}): {body}")]
    Status { status: u16, body: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaItem {
    pub id: String,
    pub name: String,
    /// "movie" or "series"
    pub media_type: String,
    pub year: Option<u16>,
    pub poster: Option<String>,
}

impl MediaItem {
    pub fn is_series(&self) -> bool {
        self.media_type == "series"
    }

    /// Format as "Name (2010)"
    pub fn display_title(&self) -> String {
        match self.year {
            Some(year) => format!("{} ({})", self.name, year),
            None => self.name.clone(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct CatalogResponse {
    #[serde(default)]
    metas: Vec<RawMeta>,
}

#[derive(Debug, Deserialize)]
struct RawMeta {
    #[serde(default)]
    id: String,
    #[serde(default)]
    name: String,
    #[serde(rename = "type", default)]
    media_type: String,
    #[serde(default)]
    year: Option<serde_json::Value>,
    poster: Option<String>,
}

#[derive(Debug, Deserialize)]
struct MetaResponse {
    meta: SeriesMeta,
}

#[derive(Debug, Deserialize)]
struct SeriesMeta {
    #[serde(default)]
    videos: Vec<Video>,
}

#[derive(Debug, Deserialize)]
struct Video {
    #[serde(default)]
    season: i64,
    #[serde(default)]
    episode: i64,
}

/// Episodes per season, both sorted ascending
pub type EpisodeMap = BTreeMap<u32, Vec<u32>>;

pub struct CinemetaClient {
    client: Client,
    base_url: String,
}

impl CinemetaClient {
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

    /// Top movies and top series
    pub async fn popular(&self) -> Result<(Vec<MediaItem>, Vec<MediaItem>), CatalogError> {
        debug!("fetching popular catalogs");

        let movies = self.fetch_catalog("movie", "top").await?;
        let shows = self.fetch_catalog("series", "top").await?;

        Ok((movies, shows))
    }

    /// Search movies and series concurrently.
    ///
    /// Both queries always run to completion; if either fails its error is
    /// returned afterwards, movies first.
    pub async fn search(&self, query: &str) -> Result<Vec<MediaItem>, CatalogError> {
        let query = query.trim();
        if query.is_empty() {
            return Ok(Vec::new());
        }

        debug!(query, "searching catalogs");

        let path = format!("top/search={}", urlencoding::encode(query));
        let (movies, shows) = tokio::join!(
            self.fetch_catalog("movie", &path),
            self.fetch_catalog("series", &path)
        );

        let mut results = movies?;
        results.extend(shows?);
        results.truncate(MAX_SEARCH_RESULTS);

        Ok(results)
    }

    /// Seasons and episode numbers of a series
    pub async fn series_episodes(&self, id: &str) -> Result<EpisodeMap, CatalogError> {
        let url = format!(
            "{}/meta/series/{}.json",
            self.base_url,
            urlencoding::encode(id)
        );

        debug!(id, "fetching series episodes");

        let response: MetaResponse = self.get_json(&url).await?;

        let mut by_season = EpisodeMap::new();
        for video in response.meta.videos {
            let (Ok(season), Ok(episode)) = (u32::try_from(video.season), u32::try_from(video.episode))
            else {
                continue;
            };
            if season < 1 || episode < 1 {
                continue;
            }
            by_season.entry(season).or_default().push(episode);
        }

        for episodes in by_season.values_mut() {
            episodes.sort_unstable();
            episodes.dedup();
        }

        if by_season.is_empty() {
            by_season.insert(1, vec![1]);
        }

        Ok(by_season)
    }

    async fn fetch_catalog(
        &self,
        media_type: &str,
        catalog_path: &str,
    ) -> Result<Vec<MediaItem>, CatalogError> {
        let url = format!(
            "{}/catalog/{}/{}.json",
            self.base_url, media_type, catalog_path
        );

        let response: CatalogResponse = self.get_json(&url).await?;

        Ok(response
            .metas
            .into_iter()
            .filter(|meta| !meta.id.is_empty() && !meta.name.is_empty())
            .map(|meta| MediaItem {
                media_type: if meta.media_type.is_empty() {
                    media_type.to_string()
                } else {
                    meta.media_type
                },
                year: meta.year.as_ref().and_then(parse_year),
                id: meta.id,
                name: meta.name,
                poster: meta.poster.filter(|p| !p.is_empty()),
            })
            .collect())
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T, CatalogError> {
        let response = self
            .client
            .get(url)
            .header(reqwest::header::ACCEPT, "application/json")
            .header(reqwest::header::ACCEPT_LANGUAGE, "en-US,en;q=0.9")
            .timeout(REQUEST_TIMEOUT)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(CatalogError::Status {
                status: status.as_u16(),
                body: error_body(response).await,
            });
        }

        Ok(response.json().await?)
    }
}

/// Cinemeta reports years as numbers or as strings like "2008–2013"
fn parse_year(value: &serde_json::Value) -> Option<u16> {
    let year: Option<u16> = match value {
        serde_json::Value::Number(n) => n
            .as_u64()
            .or_else(|| n.as_f64().map(|f| f as u64))
            .and_then(|y| u16::try_from(y).ok()),
        serde_json::Value::String(s) => {
            let digits: String = s.trim().chars().take_while(|c| c.is_ascii_digit()).collect();
            digits.parse().ok()
        }
        _ => None,
    };

    year.filter(|year| *year > 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_year() {
        assert_eq!(parse_year(&json!(1999)), Some(1999));
        assert_eq!(parse_year(&json!(2001.0)), Some(2001));
        assert_eq!(parse_year(&json!("2010")), Some(2010));
        assert_eq!(parse_year(&json!("2008–2013")), Some(2008));
        assert_eq!(parse_year(&json!("")), None);
        assert_eq!(parse_year(&json!("unknown")), None);
        assert_eq!(parse_year(&json!(null)), None);
        assert_eq!(parse_year(&json!(0)), None);
    }

    #[test]
    fn test_display_title() {
        let mut item = MediaItem {
            id: "tt0133093".to_string(),
            name: "The Matrix".to_string(),
            media_type: "movie".to_string(),
            year: Some(1999),
            poster: None,
        };
        assert_eq!(item.display_title(), "The Matrix (1999)");
        assert!(!item.is_series());

        item.year = None;
        assert_eq!(item.display_title(), "The Matrix");
    }
}
