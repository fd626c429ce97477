const VIDEO_EXTENSIONS: &[&str] = &[".mkv", ".mp4", ".avi", ".mov", ".m4v", ".wmv", ".webm", ".ts"];

/// Remote id meaning "no file available"
pub const NO_FILE: u32 = 0;

/// One entry of a torrent's file manifest as reported by the unlock service
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TorrentFile {
    /// Position in the manifest
    pub local_index: usize,
    /// Id assigned by the service, starting at 1
    pub remote_id: u32,
    pub path: String,
    pub size_bytes: u64,
}

/// Check if a path looks like a playable video based on extension
pub fn is_likely_video(path: &str) -> bool {
    let lower = path.to_lowercase();
    VIDEO_EXTENSIONS.iter().any(|ext| lower.ends_with(ext))
}

/// Choose the remote id of the file to unlock.
///
/// A valid explicit index always wins. Otherwise the largest video file is
/// picked (first one on a tie), then the first file of any type. Returns
/// [`NO_FILE`] for an empty manifest.
pub fn pick_file(files: &[TorrentFile], explicit_index: Option<usize>) -> u32 {
    let Some(first) = files.first() else {
        return NO_FILE;
    };

    if let Some(file) = explicit_index.and_then(|idx| files.get(idx)) {
        return file.remote_id;
    }

    let mut best: Option<&TorrentFile> = None;
    for file in files.iter().filter(|f| is_likely_video(&f.path)) {
        if best.is_none_or(|b| file.size_bytes > b.size_bytes) {
            best = Some(file);
        }
    }

    best.unwrap_or(first).remote_id
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manifest(entries: &[(u32, &str, u64)]) -> Vec<TorrentFile> {
        entries
            .iter()
            .enumerate()
            .map(|(idx, (id, path, bytes))| TorrentFile {
                local_index: idx,
                remote_id: *id,
                path: path.to_string(),
                size_bytes: *bytes,
            })
            .collect()
    }

    fn sample() -> Vec<TorrentFile> {
        manifest(&[(1, "a.txt", 999_999), (2, "b.mkv", 500), (3, "c.mp4", 700)])
    }

    #[test]
    fn test_largest_video_wins_over_larger_non_video() {
        assert_eq!(pick_file(&sample(), None), 3);
    }

    #[test]
    fn test_explicit_index_overrides_heuristic() {
        assert_eq!(pick_file(&sample(), Some(0)), 1);
        assert_eq!(pick_file(&sample(), Some(1)), 2);
    }

    #[test]
    fn test_out_of_range_index_uses_heuristic() {
        assert_eq!(pick_file(&sample(), Some(3)), 3);
        assert_eq!(pick_file(&sample(), Some(usize::MAX)), 3);
    }

    #[test]
    fn test_empty_manifest() {
        assert_eq!(pick_file(&[], None), NO_FILE);
        assert_eq!(pick_file(&[], Some(0)), NO_FILE);
    }

    #[test]
    fn test_tie_keeps_first() {
        let files = manifest(&[(4, "x.MKV", 100), (5, "y.mp4", 100), (6, "z.avi", 50)]);
        assert_eq!(pick_file(&files, None), 4);
    }

    #[test]
    fn test_zero_sized_video_still_counts() {
        let files = manifest(&[(1, "readme.nfo", 10), (2, "sample.webm", 0)]);
        assert_eq!(pick_file(&files, None), 2);
    }

    #[test]
    fn test_no_video_falls_back_to_first() {
        let files = manifest(&[(7, "cover.jpg", 10), (8, "album.flac", 9_000)]);
        assert_eq!(pick_file(&files, None), 7);
    }

    #[test]
    fn test_is_likely_video() {
        assert!(is_likely_video("Movie.2024.1080p.BluRay.MKV"));
        assert!(is_likely_video("/Season 1/ep01.m4v"));
        assert!(is_likely_video("stream.ts"));

        assert!(!is_likely_video("movie.srt"));
        assert!(!is_likely_video("movie.mkv.part"));
        assert!(!is_likely_video("mkv"));
    }
}
