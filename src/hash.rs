//! Streaming content digests for local artifact files.

use crate::error::Result;
use sha2::{Digest, Sha256};
use std::path::Path;
use tokio::fs::File;
use tokio::io::AsyncReadExt;

/// Chunk size for streaming file reads.
const CHUNK_SIZE: usize = 8192;

/// Compute the hex-encoded SHA-256 digest of a file.
///
/// Reads in bounded chunks so arbitrarily large artifacts never land fully
/// in memory. Read failures propagate: local-disk errors are not transient
/// and are never retried.
pub async fn sha256_of_file(path: &Path) -> Result<String> {
    let mut file = File::open(path).await?;
    let mut hasher = Sha256::new();
    let mut buf = vec![0u8; CHUNK_SIZE];
    loop {
        let n = file.read(&mut buf).await?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(hex::encode(hasher.finalize()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn digest_matches_known_vector() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("hello.txt");
        tokio::fs::write(&path, b"hello world").await.unwrap();

        let digest = sha256_of_file(&path).await.unwrap();
        assert_eq!(
            digest,
            "b94d27b9934d3e08a52e52d7da7dabfac484efe37a5380ee9088f7ace2efcde9"
        );
    }

    #[tokio::test]
    async fn digest_of_large_file_is_stable() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("large.bin");
        // Spans many read chunks.
        let data: Vec<u8> = (0..100_000u32).map(|i| (i % 251) as u8).collect();
        tokio::fs::write(&path, &data).await.unwrap();

        let first = sha256_of_file(&path).await.unwrap();
        let second = sha256_of_file(&path).await.unwrap();
        assert_eq!(first, second);
        assert_eq!(first.len(), 64);
    }

    #[tokio::test]
    async fn missing_file_propagates_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.whl");
        assert!(sha256_of_file(&missing).await.is_err());
    }
}
