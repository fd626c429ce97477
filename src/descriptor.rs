use itertools::Itertools;

const TRACKER_PREFIX: &str = "tracker:";

/// A playback candidate as reported by a stream source, before resolution.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StreamDescriptor {
    pub name: String,
    pub title: String,
    pub url: String,
    pub info_hash: String,
    /// 0-based position inside the torrent's file manifest
    pub file_idx: Option<usize>,
    /// Free-form source hints, trackers are prefixed with `tracker:`
    pub sources: Vec<String>,
}

impl StreamDescriptor {
    /// First line of the source name, e.g. "Torrentio\n1080p" -> "Torrentio"
    pub fn label(&self) -> &str {
        self.name.lines().next().unwrap_or_default()
    }

    /// Whether resolution can start at all
    pub fn is_playable(&self) -> bool {
        !self.url.is_empty() || !self.info_hash.is_empty()
    }
}

/// How a descriptor can be played
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamKind {
    /// Plain http(s) link, usable as-is
    Direct(String),
    /// Magnet URI supplied by the source
    MagnetUri(String),
    /// Magnet built from the info-hash and tracker hints. Empty when there is no info-hash.
    HashSynthesized(String),
}

impl StreamKind {
    /// The URL or magnet carried by this kind
    pub fn target(&self) -> &str {
        match self {
            StreamKind::Direct(url) => url,
            StreamKind::MagnetUri(magnet) | StreamKind::HashSynthesized(magnet) => magnet,
        }
    }
}

pub fn classify(descriptor: &StreamDescriptor) -> StreamKind {
    let url = descriptor.url.as_str();

    if starts_with_ignore_case(url, "http") {
        return StreamKind::Direct(url.to_string());
    }

    if starts_with_ignore_case(url, "magnet:") {
        return StreamKind::MagnetUri(url.to_string());
    }

    StreamKind::HashSynthesized(build_magnet(&descriptor.info_hash, &descriptor.sources))
}

/// Build `magnet:?xt=urn:btih:<hash>&tr=...` from an info-hash and source hints.
///
/// Only sources literally prefixed with `tracker:` contribute a `tr` parameter,
/// in first-seen order and without duplicates. Returns an empty string when the
/// info-hash is empty.
pub fn build_magnet(info_hash: &str, sources: &[String]) -> String {
    if info_hash.is_empty() {
        return String::new();
    }

    let mut magnet = format!("magnet:?xt=urn:btih:{}", info_hash.to_lowercase());

    let trackers = sources
        .iter()
        .filter_map(|source| source.strip_prefix(TRACKER_PREFIX))
        .map(str::trim)
        .filter(|tracker| !tracker.is_empty())
        .unique();

    for tracker in trackers {
        magnet.push_str("&tr=");
        magnet.push_str(&urlencoding::encode(tracker));
    }

    magnet
}

fn starts_with_ignore_case(value: &str, prefix: &str) -> bool {
    value
        .get(..prefix.len())
        .is_some_and(|head| head.eq_ignore_ascii_case(prefix))
}
