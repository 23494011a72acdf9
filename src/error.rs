//! Comprehensive error types for pkgmirror operations.
//!
//! This module defines all error types with actionable error messages and recovery suggestions.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for pkgmirror operations
pub type Result<T> = std::result::Result<T, MirrorError>;

/// Main error type for all pkgmirror operations
#[derive(Error, Debug)]
pub enum MirrorError {
    /// Registry resolution errors
    #[error("Resolve error: {0}")]
    Resolve(#[from] ResolveError),

    /// Local download cache errors
    #[error("Cache error: {0}")]
    Cache(#[from] CacheError),

    /// Mirror ledger errors
    #[error("Ledger error: {0}")]
    Ledger(#[from] LedgerError),

    /// Staging and publish errors
    #[error("Staging error: {0}")]
    Staging(#[from] StagingError),

    /// CLI argument errors
    #[error("CLI error: {0}")]
    Cli(#[from] CliError),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// HTTP transport errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Generic errors from anyhow
    #[error("{0}")]
    Anyhow(#[from] anyhow::Error),
}

/// Registry resolution errors
#[derive(Error, Debug)]
pub enum ResolveError {
    /// Listing endpoint returned an error status
    #[error("Listing request for '{package}' failed: HTTP {status} from {url}")]
    ListingStatus {
        /// Package being resolved
        package: String,
        /// HTTP status code returned
        status: u16,
        /// URL that was requested
        url: String,
    },

    /// Listing document could not be parsed
    #[error("Could not parse listing for '{package}': {reason}")]
    ListingParse {
        /// Package being resolved
        package: String,
        /// Reason for the error
        reason: String,
    },

    /// Package not present in the feed
    #[error("Package '{package}' not found in feed '{feed}'")]
    NotInFeed {
        /// Package being resolved
        package: String,
        /// Feed that was enumerated
        feed: String,
    },

    /// A distribution URL could not be interpreted
    #[error("Invalid distribution URL '{url}': {reason}")]
    InvalidUrl {
        /// Offending URL
        url: String,
        /// Reason for the error
        reason: String,
    },

    /// Transport failure while talking to the registry
    #[error("Registry request failed: {0}")]
    Transport(#[from] reqwest::Error),
}

/// Local download cache errors
#[derive(Error, Debug)]
pub enum CacheError {
    /// Cache root could not be created
    #[error("Could not create cache directory {path}: {source}")]
    CreateRoot {
        /// Cache root path
        path: PathBuf,
        /// Underlying IO error
        source: std::io::Error,
    },

    /// Download failed after exhausting retries
    #[error("Download of {url} failed after {attempts} attempts: {reason}")]
    DownloadFailed {
        /// URL that was downloaded
        url: String,
        /// Number of attempts made
        attempts: u32,
        /// Last failure reason
        reason: String,
    },
}

/// Mirror ledger errors
#[derive(Error, Debug)]
pub enum LedgerError {
    /// Ledger could not be serialized for saving
    #[error("Could not serialize ledger: {reason}")]
    Serialize {
        /// Reason for the error
        reason: String,
    },

    /// Ledger save failed
    #[error("Could not save ledger to {path}: {reason}")]
    SaveFailed {
        /// Ledger file path
        path: PathBuf,
        /// Reason for the error
        reason: String,
    },
}

/// Staging and publish errors
#[derive(Error, Debug)]
pub enum StagingError {
    /// No usable credential for the staging service
    #[error("No staging credential provided. Supply --staging-token or set PKGMIRROR_STAGING_TOKEN.")]
    MissingCredential,

    /// Staging client could not be constructed
    #[error("Could not construct staging client: {reason}")]
    ClientConstruction {
        /// Reason for the error
        reason: String,
    },
}

/// CLI argument errors
#[derive(Error, Debug)]
pub enum CliError {
    /// Invalid argument combination or value
    #[error("Invalid arguments: {reason}")]
    InvalidArguments {
        /// Reason for the error
        reason: String,
    },

    /// Package list file could not be read
    #[error("Could not read package list {path}: {reason}")]
    PackageList {
        /// Package list file path
        path: PathBuf,
        /// Reason for the error
        reason: String,
    },
}

impl MirrorError {
    /// Get actionable recovery suggestions for this error
    pub fn recovery_suggestions(&self) -> Vec<String> {
        match self {
            MirrorError::Staging(StagingError::MissingCredential) => vec![
                "Pass a bearer token with --staging-token".to_string(),
                "Or export PKGMIRROR_STAGING_TOKEN in the environment".to_string(),
            ],
            MirrorError::Resolve(ResolveError::NotInFeed { package, feed }) => vec![
                format!("Check that '{package}' is published to feed '{feed}'"),
                "Verify the feed name and registry URL".to_string(),
            ],
            MirrorError::Resolve(ResolveError::ListingStatus { status: 401, .. })
            | MirrorError::Resolve(ResolveError::ListingStatus { status: 403, .. }) => vec![
                "Check registry credentials (--registry-pat / --registry-token / --registry-api-key)".to_string(),
                "Verify the credential has read access to the feed or repository".to_string(),
            ],
            MirrorError::Cache(CacheError::DownloadFailed { .. }) => vec![
                "Check network connectivity to the registry".to_string(),
                "Increase the retry bound with --retries or PKGMIRROR_RETRY_DOWNLOADS".to_string(),
            ],
            _ => vec!["Check the error message above for specific details".to_string()],
        }
    }
}
