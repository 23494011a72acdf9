//! Filename-addressed local cache of downloaded distributions.
//!
//! A cache hit returns without touching the network; this is the primary
//! reuse mechanism across runs, independent of the ledger. Misses stream the
//! body to a `.part` sibling and atomically rename on success, so a reader
//! never observes partial bytes at the final name.

use crate::error::CacheError;
use crate::resolve::DistEntry;
use crate::retry::Backoff;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;

/// Local download cache rooted at a flat directory.
#[derive(Debug, Clone)]
pub struct DownloadCache {
    root: PathBuf,
    client: reqwest::Client,
    backoff: Backoff,
}

impl DownloadCache {
    /// Create a cache, creating the root directory if needed.
    pub fn new(
        root: impl Into<PathBuf>,
        client: reqwest::Client,
        backoff: Backoff,
    ) -> std::result::Result<Self, CacheError> {
        let root = root.into();
        std::fs::create_dir_all(&root).map_err(|source| CacheError::CreateRoot {
            path: root.clone(),
            source,
        })?;
        Ok(Self {
            root,
            client,
            backoff,
        })
    }

    /// Cache root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Final on-disk path for a cached filename.
    pub fn path_for(&self, filename: &str) -> PathBuf {
        self.root.join(filename)
    }

    /// Ensure the entry's bytes exist locally, downloading if absent.
    ///
    /// Any failure during a streamed download is treated as transient and
    /// retried under the configured backoff; exhaustion surfaces as a
    /// `CacheError` for this entry only.
    pub async fn ensure(&self, entry: &DistEntry) -> std::result::Result<PathBuf, CacheError> {
        let final_path = self.path_for(&entry.filename);
        if final_path.exists() {
            log::debug!("cache hit for {}", entry.filename);
            return Ok(final_path);
        }

        log::info!("downloading {} from {}", entry.filename, entry.url);
        self.backoff
            .run(&format!("download {}", entry.filename), || {
                self.download_once(entry, &final_path)
            })
            .await
            .map_err(|err| CacheError::DownloadFailed {
                url: entry.url.to_string(),
                attempts: self.backoff.max_attempts(),
                reason: err.to_string(),
            })?;
        Ok(final_path)
    }

    /// One download attempt: stream to `.part`, rename into place.
    async fn download_once(
        &self,
        entry: &DistEntry,
        final_path: &Path,
    ) -> std::result::Result<(), anyhow::Error> {
        let part_path = part_path_for(final_path);
        let result = self.stream_to_part(entry, &part_path).await;
        match result {
            Ok(()) => {
                tokio::fs::rename(&part_path, final_path).await?;
                Ok(())
            }
            Err(err) => {
                // Best effort; a stale .part is overwritten on the next attempt.
                let _ = tokio::fs::remove_file(&part_path).await;
                Err(err)
            }
        }
    }

    async fn stream_to_part(
        &self,
        entry: &DistEntry,
        part_path: &Path,
    ) -> std::result::Result<(), anyhow::Error> {
        let response = self
            .client
            .get(entry.url.clone())
            .send()
            .await?
            .error_for_status()?;

        let mut file = tokio::fs::File::create(part_path).await?;
        let mut response = response;
        while let Some(chunk) = response.chunk().await? {
            file.write_all(&chunk).await?;
        }
        file.flush().await?;
        Ok(())
    }
}

fn part_path_for(final_path: &Path) -> PathBuf {
    let mut name = final_path.as_os_str().to_os_string();
    name.push(".part");
    PathBuf::from(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use url::Url;

    fn entry(url: &str) -> DistEntry {
        DistEntry::from_url(Url::parse(url).unwrap()).unwrap()
    }

    fn quick_backoff() -> Backoff {
        Backoff::new(2, std::time::Duration::from_millis(1))
    }

    #[tokio::test]
    async fn existing_file_short_circuits_without_network() {
        let dir = tempfile::tempdir().unwrap();
        let cache =
            DownloadCache::new(dir.path(), reqwest::Client::new(), quick_backoff()).unwrap();
        tokio::fs::write(cache.path_for("pkg-1.0-py3-none-any.whl"), b"cached bytes")
            .await
            .unwrap();

        // URL points at a closed port; a network attempt would fail.
        let e = entry("http://127.0.0.1:9/files/pkg-1.0-py3-none-any.whl");
        let path = cache.ensure(&e).await.unwrap();
        assert_eq!(
            tokio::fs::read(&path).await.unwrap(),
            b"cached bytes".to_vec()
        );
    }

    #[tokio::test]
    async fn successful_download_lands_at_final_path() {
        let server = httpmock::MockServer::start();
        server.mock(|when, then| {
            when.method(httpmock::Method::GET)
                .path("/files/pkg-1.0-py3-none-any.whl");
            then.status(200).body("wheel bytes");
        });

        let dir = tempfile::tempdir().unwrap();
        let cache =
            DownloadCache::new(dir.path(), reqwest::Client::new(), quick_backoff()).unwrap();
        let e = entry(&format!("{}/files/pkg-1.0-py3-none-any.whl", server.url("")));

        let path = cache.ensure(&e).await.unwrap();
        assert_eq!(
            tokio::fs::read(&path).await.unwrap(),
            b"wheel bytes".to_vec()
        );
        assert!(!part_path_for(&path).exists());
    }

    #[tokio::test]
    async fn failed_download_leaves_nothing_at_final_path() {
        let server = httpmock::MockServer::start();
        server.mock(|when, then| {
            when.method(httpmock::Method::GET)
                .path("/files/pkg-1.0-py3-none-any.whl");
            then.status(503).body("unavailable");
        });

        let dir = tempfile::tempdir().unwrap();
        let cache =
            DownloadCache::new(dir.path(), reqwest::Client::new(), quick_backoff()).unwrap();
        let e = entry(&format!("{}/files/pkg-1.0-py3-none-any.whl", server.url("")));

        let err = cache.ensure(&e).await.unwrap_err();
        assert!(matches!(err, CacheError::DownloadFailed { attempts: 2, .. }));
        let final_path = cache.path_for("pkg-1.0-py3-none-any.whl");
        assert!(!final_path.exists());
        assert!(!part_path_for(&final_path).exists());
    }

    #[tokio::test]
    async fn truncated_body_removes_the_part_file() {
        use tokio::io::AsyncReadExt;

        // A raw socket that sends 200 headers promising 100 bytes, writes a
        // short body, and hangs up. The client accepts the status, starts
        // streaming, then hits an unexpected EOF mid-body.
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            loop {
                let Ok((mut socket, _)) = listener.accept().await else {
                    return;
                };
                let mut buf = [0u8; 1024];
                let _ = socket.read(&mut buf).await;
                let _ = socket
                    .write_all(b"HTTP/1.1 200 OK\r\ncontent-length: 100\r\n\r\ntruncated")
                    .await;
            }
        });

        let dir = tempfile::tempdir().unwrap();
        let cache =
            DownloadCache::new(dir.path(), reqwest::Client::new(), quick_backoff()).unwrap();
        let e = entry(&format!("http://{addr}/files/pkg-1.0-py3-none-any.whl"));

        let err = cache.ensure(&e).await.unwrap_err();
        assert!(matches!(err, CacheError::DownloadFailed { attempts: 2, .. }));
        let final_path = cache.path_for("pkg-1.0-py3-none-any.whl");
        assert!(!final_path.exists());
        assert!(!part_path_for(&final_path).exists());
    }

    #[tokio::test]
    async fn download_retries_then_succeeds() {
        // First attempt fails, second serves the body.
        let server = httpmock::MockServer::start();
        let mut failing = server.mock(|when, then| {
            when.method(httpmock::Method::GET)
                .path("/files/pkg-1.0-py3-none-any.whl");
            then.status(500);
        });

        let dir = tempfile::tempdir().unwrap();
        let cache =
            DownloadCache::new(dir.path(), reqwest::Client::new(), quick_backoff()).unwrap();
        let e = entry(&format!("{}/files/pkg-1.0-py3-none-any.whl", server.url("")));

        // Exhaust the failing mock's single hit expectation, then swap it.
        let first = cache.ensure(&e).await;
        assert!(first.is_err());
        failing.delete();
        server.mock(|when, then| {
            when.method(httpmock::Method::GET)
                .path("/files/pkg-1.0-py3-none-any.whl");
            then.status(200).body("wheel bytes");
        });

        let path = cache.ensure(&e).await.unwrap();
        assert!(path.exists());
    }
}
