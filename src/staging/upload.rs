//! Artifact upload to the environment staging area.

use super::client::StagingClient;
use crate::retry::Backoff;
use std::fmt;
use std::path::Path;

/// Outcome of an upload. Always a value: the uploader never lets an error
/// escape its boundary.
#[derive(Debug, Clone)]
pub struct UploadReport {
    /// Whether the artifact was accepted into staging.
    pub success: bool,
    /// Failure detail when `success` is false.
    pub error: Option<String>,
    /// HTTP status of the final attempt, when one was received.
    pub status_code: Option<u16>,
    /// Server message on success.
    pub message: Option<String>,
    /// Artifact filename.
    pub filename: String,
}

impl UploadReport {
    fn accepted(filename: String, status_code: u16) -> Self {
        Self {
            success: true,
            error: None,
            status_code: Some(status_code),
            message: Some(format!("Library {filename} uploaded to staging")),
            filename,
        }
    }

    fn rejected(filename: String, error: String, status_code: Option<u16>) -> Self {
        Self {
            success: false,
            error: Some(error),
            status_code,
            message: None,
            filename,
        }
    }

    /// Serialize for the ledger's `upload_meta` field.
    pub fn to_meta(&self) -> serde_json::Value {
        serde_json::json!({
            "message": self.message,
            "status_code": self.status_code,
        })
    }
}

impl fmt::Display for UploadReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.error, self.status_code) {
            (Some(error), _) => write!(f, "{error}"),
            (None, Some(status)) => write!(f, "HTTP {status}"),
            (None, None) => write!(f, "upload pending"),
        }
    }
}

impl StagingClient {
    /// Upload one artifact file to staging with bounded retries.
    ///
    /// Transport errors and error statuses are retried under the client's
    /// backoff; exhaustion returns the last failure as a report. The default
    /// retry bound can be overridden per call.
    pub async fn upload(&self, path: &Path, retries: Option<u32>) -> UploadReport {
        let filename = match path.file_name().and_then(|n| n.to_str()) {
            Some(name) => name.to_string(),
            None => {
                return UploadReport::rejected(
                    path.display().to_string(),
                    format!("invalid artifact path: {}", path.display()),
                    None,
                );
            }
        };
        if !path.exists() {
            return UploadReport::rejected(
                filename,
                format!("artifact file not found: {}", path.display()),
                None,
            );
        }

        let backoff = match retries {
            Some(bound) => Backoff::new(bound, std::time::Duration::from_secs(1)),
            None => self.backoff,
        };

        log::info!("uploading {filename} to staging (workspace={})", self.workspace_id);
        let attempts = backoff
            .run(&format!("upload {filename}"), || {
                self.attempt_upload(path, &filename)
            })
            .await;
        match attempts {
            Ok(report) => report,
            Err(report) => report,
        }
    }

    /// Single upload attempt. A failure report is returned as `Err` so the
    /// shared retry primitive drives the backoff.
    async fn attempt_upload(
        &self,
        path: &Path,
        filename: &str,
    ) -> std::result::Result<UploadReport, UploadReport> {
        let bytes = tokio::fs::read(path).await.map_err(|e| {
            UploadReport::rejected(
                filename.to_string(),
                format!("could not read artifact: {e}"),
                None,
            )
        })?;

        let part = reqwest::multipart::Part::bytes(bytes)
            .file_name(filename.to_string())
            .mime_str(content_type_for(filename))
            .map_err(|e| {
                UploadReport::rejected(filename.to_string(), e.to_string(), None)
            })?;
        let form = reqwest::multipart::Form::new().part("file", part);

        let response = self
            .client
            .post(self.endpoint("staging/libraries"))
            .multipart(form)
            .send()
            .await
            .map_err(|e| UploadReport::rejected(filename.to_string(), e.to_string(), None))?;

        let status = response.status();
        if status.is_success() {
            return Ok(UploadReport::accepted(filename.to_string(), status.as_u16()));
        }

        let detail = response
            .text()
            .await
            .map(|body| truncate(&body, 200))
            .unwrap_or_default();
        Err(UploadReport::rejected(
            filename.to_string(),
            format!("Upload failed: HTTP {status} - {detail}"),
            Some(status.as_u16()),
        ))
    }
}

/// MIME type for the multipart transfer, derived from the filename.
/// Unknown extensions fall back to a generic octet stream.
fn content_type_for(filename: &str) -> &'static str {
    let lower = filename.to_ascii_lowercase();
    if lower.ends_with(".zip") {
        "application/zip"
    } else if lower.ends_with(".tar.gz") || lower.ends_with(".tgz") {
        "application/gzip"
    } else {
        "application/octet-stream"
    }
}

fn truncate(body: &str, limit: usize) -> String {
    if body.len() <= limit {
        body.to_string()
    } else {
        let mut end = limit;
        while !body.is_char_boundary(end) {
            end -= 1;
        }
        format!("{}...", &body[..end])
    }
}
