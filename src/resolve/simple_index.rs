//! Simple-index listing: hyperlink scraping from an HTML-like document.

use super::entry::DistEntry;
use crate::error::ResolveError;
use regex::Regex;
use std::sync::OnceLock;
use url::Url;

/// Matches `href="..."` / `href='...'` targets in a listing document.
fn href_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r#"(?i)href=["']([^"']+)["']"#).expect("href pattern is valid")
    })
}

/// Resolver over a PyPI-style simple index.
///
/// The listing document for a package lives at `{base}/{package}/`; each
/// hyperlink target in it is one distribution, with relative targets
/// resolved against the listing URL.
#[derive(Debug, Clone)]
pub struct SimpleIndexSource {
    base: Url,
    client: reqwest::Client,
}

impl SimpleIndexSource {
    /// Create a source rooted at the simple-index base URL.
    pub fn new(base: Url, client: reqwest::Client) -> Self {
        Self { base, client }
    }

    /// Listing URL for one package: `{base}/{package}/`.
    fn listing_url(&self, package: &str) -> std::result::Result<Url, ResolveError> {
        let mut base = self.base.to_string();
        if !base.ends_with('/') {
            base.push('/');
        }
        let raw = format!("{base}{package}/");
        Url::parse(&raw).map_err(|e| ResolveError::InvalidUrl {
            url: raw,
            reason: e.to_string(),
        })
    }

    /// Fetch the listing document and return one entry per hyperlink target.
    pub async fn list_entries(
        &self,
        package: &str,
    ) -> std::result::Result<Vec<DistEntry>, ResolveError> {
        let listing_url = self.listing_url(package)?;
        log::debug!("fetching simple index {listing_url}");

        let response = self.client.get(listing_url.clone()).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(ResolveError::ListingStatus {
                package: package.to_string(),
                status: status.as_u16(),
                url: listing_url.to_string(),
            });
        }
        let html = response.text().await?;

        let mut entries = Vec::new();
        for capture in href_pattern().captures_iter(&html) {
            let target = &capture[1];
            let resolved =
                listing_url
                    .join(target)
                    .map_err(|e| ResolveError::ListingParse {
                        package: package.to_string(),
                        reason: format!("unresolvable link '{target}': {e}"),
                    })?;
            entries.push(DistEntry::from_url(resolved)?);
        }
        Ok(entries)
    }
}
