//! Candidate distribution entries and artifact-kind classification.

use crate::error::ResolveError;
use url::Url;

/// Distribution-archive extensions accepted by the mirror.
const VALID_DIST_EXTENSIONS: [&str; 3] = [".whl", ".tar.gz", ".zip"];

/// One downloadable distribution candidate produced by a resolver.
///
/// Entries are ephemeral: they exist between resolution and download and are
/// never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DistEntry {
    /// Fully resolved download URL.
    pub url: Url,
    /// Basename of the URL path, query and fragment stripped.
    pub filename: String,
}

impl DistEntry {
    /// Build an entry from a resolved URL, deriving the filename from the
    /// final path segment.
    pub fn from_url(url: Url) -> std::result::Result<Self, ResolveError> {
        let filename = url
            .path_segments()
            .and_then(|mut segments| segments.next_back())
            .filter(|segment| !segment.is_empty())
            .map(str::to_string)
            .ok_or_else(|| ResolveError::InvalidUrl {
                url: url.to_string(),
                reason: "URL has no filename path segment".to_string(),
            })?;
        Ok(Self { url, filename })
    }

    /// Classify this entry by its filename.
    pub fn kind(&self) -> ArtifactKind {
        ArtifactKind::classify(&self.filename)
    }
}

/// Distribution kind, derived from the filename extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactKind {
    /// Primary binary artifact (`.whl`); the only kind uploaded by default.
    Wheel,
    /// Source distribution (`.tar.gz`).
    Sdist,
    /// Zip archive.
    Archive,
    /// Anything outside the distribution allow-list.
    Other,
}

impl ArtifactKind {
    /// Classify a filename.
    pub fn classify(filename: &str) -> Self {
        let lower = filename.to_ascii_lowercase();
        if lower.ends_with(".whl") {
            ArtifactKind::Wheel
        } else if lower.ends_with(".tar.gz") {
            ArtifactKind::Sdist
        } else if lower.ends_with(".zip") {
            ArtifactKind::Archive
        } else {
            ArtifactKind::Other
        }
    }

    /// Whether this kind is on the distribution allow-list at all.
    pub fn is_distribution(self) -> bool {
        !matches!(self, ArtifactKind::Other)
    }
}

/// Keep only entries on the distribution allow-list.
///
/// Returns the retained entries and the count of silently dropped ones.
pub fn filter_distributions(entries: Vec<DistEntry>) -> (Vec<DistEntry>, usize) {
    let before = entries.len();
    let kept: Vec<DistEntry> = entries
        .into_iter()
        .filter(|entry| {
            let lower = entry.filename.to_ascii_lowercase();
            VALID_DIST_EXTENSIONS.iter().any(|ext| lower.ends_with(ext))
        })
        .collect();
    let dropped = before - kept.len();
    (kept, dropped)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(url: &str) -> DistEntry {
        DistEntry::from_url(Url::parse(url).unwrap()).unwrap()
    }

    #[test]
    fn filename_strips_query_and_fragment() {
        let e = entry("https://pkgs.example.com/files/pkg-1.0-py3.whl?sig=abc#sha256=def");
        assert_eq!(e.filename, "pkg-1.0-py3.whl");
    }

    #[test]
    fn url_without_filename_is_rejected() {
        let url = Url::parse("https://pkgs.example.com/").unwrap();
        assert!(DistEntry::from_url(url).is_err());
    }

    #[test]
    fn classification_by_extension() {
        assert_eq!(ArtifactKind::classify("pkg-1.0-py3.whl"), ArtifactKind::Wheel);
        assert_eq!(ArtifactKind::classify("pkg-1.0.tar.gz"), ArtifactKind::Sdist);
        assert_eq!(ArtifactKind::classify("pkg-1.0.zip"), ArtifactKind::Archive);
        assert_eq!(ArtifactKind::classify("pkg-1.0.exe"), ArtifactKind::Other);
        assert_eq!(ArtifactKind::classify("PKG-1.0-PY3.WHL"), ArtifactKind::Wheel);
    }

    #[test]
    fn filter_keeps_allow_list_and_counts_drops() {
        let entries = vec![
            entry("https://x.example/pkg-1.0-py3.whl"),
            entry("https://x.example/pkg-1.0.tar.gz"),
            entry("https://x.example/pkg-1.0.exe"),
        ];
        let (kept, dropped) = filter_distributions(entries);
        assert_eq!(dropped, 1);
        let names: Vec<&str> = kept.iter().map(|e| e.filename.as_str()).collect();
        assert_eq!(names, vec!["pkg-1.0-py3.whl", "pkg-1.0.tar.gz"]);
    }
}
