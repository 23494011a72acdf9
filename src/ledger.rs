//! Durable, content-addressed record of what has already been uploaded.
//!
//! The ledger is the sole idempotency authority: a record with
//! `uploaded = true` and a matching digest means no future run re-uploads
//! that `(package, filename, sha256)` triple. Persistence is atomic
//! (write-to-temp plus rename) and happens synchronously after every
//! mutation, so a crash can lose tracking for at most one artifact.

use crate::error::LedgerError;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::io::Write;
use std::path::{Path, PathBuf};

/// One mirrored-artifact record, keyed externally by `"{package}:{filename}"`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MirrorRecord {
    /// Hex SHA-256 of the artifact at upload time.
    pub sha256: String,
    /// Whether the upload completed successfully.
    pub uploaded: bool,
    /// Server metadata captured from the upload response.
    #[serde(default)]
    pub upload_meta: serde_json::Value,
    /// Unix timestamp of the upload.
    #[serde(default)]
    pub ts: i64,
    /// Unknown fields from newer writers, preserved across load/save.
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

/// The full mirror ledger, persisted as one JSON document.
#[derive(Debug)]
pub struct MirrorLedger {
    path: PathBuf,
    records: HashMap<String, MirrorRecord>,
}

impl MirrorLedger {
    /// Load the ledger from disk.
    ///
    /// A missing or unreadable file is never fatal: the ledger starts empty
    /// and a warning is logged, matching the recovery policy for corrupt
    /// state.
    pub fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let records = match std::fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str(&contents) {
                Ok(records) => records,
                Err(err) => {
                    log::warn!(
                        "could not parse ledger {}: {err}; starting fresh",
                        path.display()
                    );
                    HashMap::new()
                }
            },
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => HashMap::new(),
            Err(err) => {
                log::warn!(
                    "could not read ledger {}: {err}; starting fresh",
                    path.display()
                );
                HashMap::new()
            }
        };
        Self { path, records }
    }

    /// Ledger file path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Number of records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the ledger holds no records.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// True only if a record exists for this package/filename with a
    /// matching digest and `uploaded = true`.
    ///
    /// A same-named file with a different digest is a new artifact version;
    /// presence of the key alone never suppresses an upload.
    pub fn is_uploaded(&self, package: &str, filename: &str, sha256: &str) -> bool {
        self.records
            .get(&key(package, filename))
            .map(|record| record.uploaded && record.sha256 == sha256)
            .unwrap_or(false)
    }

    /// Look up the record for a package/filename pair.
    pub fn record(&self, package: &str, filename: &str) -> Option<&MirrorRecord> {
        self.records.get(&key(package, filename))
    }

    /// Upsert an uploaded record and persist the whole ledger synchronously.
    pub fn mark_uploaded(
        &mut self,
        package: &str,
        filename: &str,
        sha256: &str,
        upload_meta: serde_json::Value,
    ) -> std::result::Result<(), LedgerError> {
        self.records.insert(
            key(package, filename),
            MirrorRecord {
                sha256: sha256.to_string(),
                uploaded: true,
                upload_meta,
                ts: chrono::Utc::now().timestamp(),
                extra: BTreeMap::new(),
            },
        );
        self.save()
    }

    /// Persist the ledger atomically: serialize, write a temp sibling,
    /// rename over the final path.
    pub fn save(&self) -> std::result::Result<(), LedgerError> {
        let serialized =
            serde_json::to_string_pretty(&self.records).map_err(|e| LedgerError::Serialize {
                reason: e.to_string(),
            })?;

        let temp_path = self.path.with_extension("tmp");
        let write_result = (|| -> std::io::Result<()> {
            if let Some(parent) = self.path.parent()
                && !parent.as_os_str().is_empty()
            {
                std::fs::create_dir_all(parent)?;
            }
            let mut file = std::fs::File::create(&temp_path)?;
            file.write_all(serialized.as_bytes())?;
            file.sync_all()?;
            std::fs::rename(&temp_path, &self.path)
        })();

        write_result.map_err(|e| LedgerError::SaveFailed {
            path: self.path.clone(),
            reason: e.to_string(),
        })
    }
}

fn key(package: &str, filename: &str) -> String {
    format!("{package}:{filename}")
}
