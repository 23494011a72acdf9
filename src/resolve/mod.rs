//! Registry resolution: enumerating candidate distribution entries.
//!
//! Three interchangeable strategies hide the per-registry listing shapes
//! behind one `RegistrySource` facade:
//!
//! - [`SimpleIndexSource`] scrapes hyperlinks out of a simple-index listing
//!   document at `{base}/{package}/`.
//! - [`StorageSource`] calls a structured file-listing endpoint and joins
//!   each record against the repository base URL.
//! - [`FeedSource`] confirms the package exists in a feed via a packaging
//!   API, then retries the simple-index listing.
//!
//! Strategies are attempted in priority order; when every strategy fails the
//! package resolves to zero entries and the pipeline logs a skip. That is
//! never fatal for the batch.

mod entry;
mod feed;
mod simple_index;
mod storage;

pub use entry::{ArtifactKind, DistEntry, filter_distributions};
pub use feed::FeedSource;
pub use simple_index::SimpleIndexSource;
pub use storage::StorageSource;

use crate::error::ResolveError;

/// One configured resolution strategy.
#[derive(Debug, Clone)]
pub enum RegistrySource {
    /// Simple-index HTML listing.
    SimpleIndex(SimpleIndexSource),
    /// Structured storage/catalog listing.
    Storage(StorageSource),
    /// Feed-enumeration existence check with simple-index retry.
    Feed(FeedSource),
}

impl RegistrySource {
    /// Enumerate candidate distribution entries for one package.
    pub async fn list_entries(
        &self,
        package: &str,
    ) -> std::result::Result<Vec<DistEntry>, ResolveError> {
        match self {
            RegistrySource::SimpleIndex(source) => source.list_entries(package).await,
            RegistrySource::Storage(source) => source.list_entries(package).await,
            RegistrySource::Feed(source) => source.list_entries(package).await,
        }
    }

    /// Short name for log lines.
    pub fn strategy_name(&self) -> &'static str {
        match self {
            RegistrySource::SimpleIndex(_) => "simple-index",
            RegistrySource::Storage(_) => "storage",
            RegistrySource::Feed(_) => "feed",
        }
    }
}

/// Try each source in priority order, returning the first non-empty listing.
///
/// Strategy failures are logged and swallowed; an empty vec means every
/// strategy failed or produced nothing, and the caller should skip the
/// package rather than abort the batch.
pub async fn resolve_with_fallback(sources: &[RegistrySource], package: &str) -> Vec<DistEntry> {
    for source in sources {
        match source.list_entries(package).await {
            Ok(entries) if !entries.is_empty() => {
                log::info!(
                    "resolved {} entries for '{package}' via {}",
                    entries.len(),
                    source.strategy_name()
                );
                return entries;
            }
            Ok(_) => {
                log::warn!(
                    "{} listing for '{package}' returned no entries, trying next strategy",
                    source.strategy_name()
                );
            }
            Err(err) => {
                log::warn!(
                    "{} listing for '{package}' failed ({err}), trying next strategy",
                    source.strategy_name()
                );
            }
        }
    }
    log::warn!("all resolution strategies failed for '{package}'");
    Vec::new()
}
