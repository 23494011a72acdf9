//! Packaging-API fallback: feed enumeration plus simple-index retry.

use super::entry::DistEntry;
use super::simple_index::SimpleIndexSource;
use crate::error::ResolveError;
use serde::Deserialize;
use url::Url;

/// Feed package-enumeration response.
#[derive(Debug, Deserialize)]
struct FeedPackages {
    #[serde(default)]
    value: Vec<FeedPackage>,
}

/// One package record in a feed. The name lives in `name` or
/// `normalizedName` depending on API version.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FeedPackage {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    normalized_name: Option<String>,
}

/// Fallback resolver for registries whose simple index is flaky.
///
/// Confirms the package is registered in the feed via the packaging
/// management API, then retries the simple-index listing. A package absent
/// from the feed resolves to an error so the pipeline can log a skip.
#[derive(Debug, Clone)]
pub struct FeedSource {
    api_base: Url,
    feed: String,
    client: reqwest::Client,
    index: SimpleIndexSource,
}

impl FeedSource {
    /// Create a fallback source.
    ///
    /// `api_base` is the feed-management API root (the `_apis/packaging`
    /// convention is appended here); `index` is the simple-index source to
    /// retry once existence is confirmed.
    pub fn new(
        api_base: Url,
        feed: impl Into<String>,
        client: reqwest::Client,
        index: SimpleIndexSource,
    ) -> Self {
        Self {
            api_base,
            feed: feed.into(),
            client,
            index,
        }
    }

    /// List package names registered in the feed.
    async fn feed_package_names(&self) -> std::result::Result<Vec<String>, ResolveError> {
        let base = self.api_base.to_string();
        let base = base.trim_end_matches('/');
        let api_url = format!("{base}/_apis/packaging/feeds/{}/packages", self.feed);
        log::debug!("listing feed packages via {api_url}");

        let response = self
            .client
            .get(&api_url)
            .query(&[("api-version", "6.0-preview.1"), ("protocolType", "pypi")])
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            return Err(ResolveError::ListingStatus {
                package: String::new(),
                status: status.as_u16(),
                url: api_url,
            });
        }
        let packages: FeedPackages =
            response.json().await.map_err(|e| ResolveError::ListingParse {
                package: String::new(),
                reason: e.to_string(),
            })?;

        Ok(packages
            .value
            .into_iter()
            .filter_map(|p| p.name.or(p.normalized_name))
            .collect())
    }

    /// Confirm the package exists in the feed, then retry the simple index.
    pub async fn list_entries(
        &self,
        package: &str,
    ) -> std::result::Result<Vec<DistEntry>, ResolveError> {
        let names = self.feed_package_names().await?;
        let wanted = package.to_ascii_lowercase();
        if !names.iter().any(|n| n.to_ascii_lowercase() == wanted) {
            return Err(ResolveError::NotInFeed {
                package: package.to_string(),
                feed: self.feed.clone(),
            });
        }
        self.index.list_entries(package).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mock_feed(server: &httpmock::MockServer, names: &[&str]) {
        let value: Vec<serde_json::Value> = names
            .iter()
            .map(|n| serde_json::json!({"name": n, "protocolType": "pypi"}))
            .collect();
        server.mock(|when, then| {
            when.method(httpmock::Method::GET)
                .path("/_apis/packaging/feeds/my-feed/packages")
                .query_param("protocolType", "pypi");
            then.status(200).json_body(serde_json::json!({"count": value.len(), "value": value}));
        });
    }

    #[tokio::test]
    async fn package_in_feed_retries_simple_index() {
        let server = httpmock::MockServer::start();
        mock_feed(&server, &["demo", "unrelated"]);
        server.mock(|when, then| {
            when.method(httpmock::Method::GET).path("/simple/demo/");
            then.status(200)
                .body(r#"<a href="demo-1.0-py3-none-any.whl">demo</a>"#);
        });

        let client = reqwest::Client::new();
        let index = SimpleIndexSource::new(
            Url::parse(&format!("{}/simple", server.url(""))).unwrap(),
            client.clone(),
        );
        let source = FeedSource::new(Url::parse(&server.url("")).unwrap(), "my-feed", client, index);

        let entries = source.list_entries("Demo").await.unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].filename, "demo-1.0-py3-none-any.whl");
    }

    #[tokio::test]
    async fn package_missing_from_feed_is_an_error() {
        let server = httpmock::MockServer::start();
        mock_feed(&server, &["unrelated"]);

        let client = reqwest::Client::new();
        let index = SimpleIndexSource::new(
            Url::parse(&format!("{}/simple", server.url(""))).unwrap(),
            client.clone(),
        );
        let source = FeedSource::new(Url::parse(&server.url("")).unwrap(), "my-feed", client, index);

        let err = source.list_entries("demo").await.unwrap_err();
        assert!(matches!(err, ResolveError::NotInFeed { .. }));
    }
}
