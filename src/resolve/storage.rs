//! Storage-API listing: structured file enumeration for a repository.

use super::entry::DistEntry;
use crate::error::ResolveError;
use serde::Deserialize;
use url::Url;

/// File-listing response from the storage endpoint.
#[derive(Debug, Deserialize)]
struct StorageListing {
    #[serde(default)]
    files: Vec<StorageFile>,
}

/// One file record in a storage listing. Unknown fields are ignored so the
/// endpoint can grow without breaking us.
#[derive(Debug, Deserialize)]
struct StorageFile {
    uri: String,
    #[serde(default)]
    folder: bool,
}

/// Resolver over a repository storage API.
///
/// Calls `GET {base}/api/storage/{repo}?list&deep=1&listFolders=0` and maps
/// each file record to `{base}/{repo}{uri}`. The listing covers the whole
/// repository, so records are narrowed to the requested package by a
/// normalized `{package}-` filename prefix.
#[derive(Debug, Clone)]
pub struct StorageSource {
    base: Url,
    repo: String,
    client: reqwest::Client,
}

impl StorageSource {
    /// Create a source for one repository under the storage base URL.
    pub fn new(base: Url, repo: impl Into<String>, client: reqwest::Client) -> Self {
        Self {
            base,
            repo: repo.into(),
            client,
        }
    }

    /// Enumerate distribution entries for `package`.
    pub async fn list_entries(
        &self,
        package: &str,
    ) -> std::result::Result<Vec<DistEntry>, ResolveError> {
        let base = self.base.to_string();
        let base = base.trim_end_matches('/');
        let api_url = format!("{base}/api/storage/{}", self.repo);
        log::debug!("listing repository '{}' via {api_url}", self.repo);

        let response = self
            .client
            .get(&api_url)
            .query(&[("list", "1"), ("deep", "1"), ("listFolders", "0")])
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            return Err(ResolveError::ListingStatus {
                package: package.to_string(),
                status: status.as_u16(),
                url: api_url,
            });
        }
        let listing: StorageListing =
            response
                .json()
                .await
                .map_err(|e| ResolveError::ListingParse {
                    package: package.to_string(),
                    reason: e.to_string(),
                })?;

        // Normalization folds '-' into '_', so the version separator in a
        // distribution filename normalizes to '_' as well.
        let prefix = format!("{}_", normalize(package));
        let mut entries = Vec::new();
        for file in listing.files {
            if file.folder {
                continue;
            }
            let filename = file.uri.rsplit('/').next().unwrap_or(&file.uri);
            if !normalize(filename).starts_with(&prefix) {
                continue;
            }
            let raw = format!("{base}/{}{}", self.repo, file.uri);
            let url = Url::parse(&raw).map_err(|e| ResolveError::InvalidUrl {
                url: raw,
                reason: e.to_string(),
            })?;
            entries.push(DistEntry::from_url(url)?);
        }
        Ok(entries)
    }
}

/// Normalize a package name or filename for prefix matching: lowercase with
/// `-` and `_` treated as equivalent, the way distribution filenames are.
fn normalize(name: &str) -> String {
    name.to_ascii_lowercase().replace('-', "_")
}
