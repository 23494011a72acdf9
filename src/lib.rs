//! pkgmirror: mirror package distributions from a remote registry into an
//! environment's staging area, then publish the environment.
//!
//! The pipeline, per package: resolve distribution entries from the registry
//! (three strategies with fallback), download them into a local cache, hash
//! each artifact, consult the mirror ledger to skip anything already staged,
//! upload the rest, record the result, and optionally publish once at the end
//! of the batch. One artifact's failure never aborts the batch.
//!
//! # Example
//!
//! ```no_run
//! use pkgmirror::cache::DownloadCache;
//! use pkgmirror::ledger::MirrorLedger;
//! use pkgmirror::pipeline::{MirrorPipeline, UploadPolicy};
//! use pkgmirror::resolve::{RegistrySource, SimpleIndexSource};
//! use pkgmirror::retry::Backoff;
//! use pkgmirror::staging::{StagingClient, StagingConfig};
//! use url::Url;
//!
//! # async fn example() -> pkgmirror::error::Result<()> {
//! let client = reqwest::Client::new();
//! let index = SimpleIndexSource::new(
//!     Url::parse("https://pkgs.example.com/simple").unwrap(),
//!     client.clone(),
//! );
//! let cache = DownloadCache::new("cache", client, Backoff::default())?;
//! let ledger = MirrorLedger::load("cache/mirror_state.json");
//! let staging = StagingClient::new(StagingConfig::new(
//!     Url::parse("https://api.fabric.microsoft.com/v1").unwrap(),
//!     "workspace-id",
//!     "environment-id",
//!     Some("token".to_string()),
//! ))?;
//!
//! let mut pipeline = MirrorPipeline::new(
//!     vec![RegistrySource::SimpleIndex(index)],
//!     cache,
//!     ledger,
//!     staging,
//!     UploadPolicy::PrimaryBinaryOnly,
//! );
//! let summary = pipeline.run(&["mypkg".to_string()], true).await;
//! println!("uploaded {}", summary.total_uploaded());
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

pub mod auth;
pub mod cache;
pub mod cli;
pub mod error;
pub mod hash;
pub mod ledger;
pub mod pipeline;
pub mod resolve;
pub mod retry;
pub mod staging;

pub use error::{MirrorError, Result};
pub use ledger::{MirrorLedger, MirrorRecord};
pub use pipeline::{BatchSummary, MirrorPipeline, PackageReport, UploadPolicy};
pub use resolve::{ArtifactKind, DistEntry, RegistrySource};
pub use staging::{PublishOutcome, StagingClient, StagingConfig, UploadReport};
