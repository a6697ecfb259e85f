//! npm registry fetcher

use std::collections::HashMap;

use serde::Deserialize;
use tracing::debug;

use crate::config::TargetConfig;
use crate::version::error::FetchError;
use crate::version::fetcher::Fetcher;
use crate::version::fetchers::check_status;

/// Default base URL for npm registry
const DEFAULT_BASE_URL: &str = "https://registry.npmjs.org";

/// Abbreviated package document from the npm registry
#[derive(Debug, Deserialize)]
struct NpmPackageResponse {
    #[serde(rename = "dist-tags", default)]
    dist_tags: HashMap<String, String>,
}

/// Fetcher for `npm = "<package>"` targets (defaults to the target name).
///
/// Reports the `latest` dist-tag.
pub struct NpmFetcher {
    client: reqwest::Client,
    base_url: String,
}

impl NpmFetcher {
    /// Creates a new NpmFetcher with a custom base URL
    pub fn new(client: reqwest::Client, base_url: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn with_client(client: reqwest::Client) -> Self {
        Self::new(client, DEFAULT_BASE_URL)
    }

    /// Encode package name for URL (handles scoped packages)
    fn encode_package_name(package_name: &str) -> String {
        if package_name.starts_with('@') {
            // Scoped package: @scope/name -> @scope%2Fname
            package_name.replace('/', "%2F")
        } else {
            package_name.to_string()
        }
    }
}

#[async_trait::async_trait]
impl Fetcher for NpmFetcher {
    fn source(&self) -> &'static str {
        "npm"
    }

    async fn fetch_version(&self, name: &str, config: &TargetConfig) -> Result<String, FetchError> {
        let package = config.get("npm").unwrap_or(name);
        let url = format!("{}/{}", self.base_url, Self::encode_package_name(package));
        debug!("Fetching npm package: {}", url);

        let response = self
            .client
            .get(&url)
            .header("Accept", "application/vnd.npm.install-v1+json")
            .send()
            .await?;
        let response = check_status(response, package)?;

        let mut document: NpmPackageResponse = response
            .json()
            .await
            .map_err(|e| FetchError::InvalidResponse(e.to_string()))?;

        document
            .dist_tags
            .remove("latest")
            .ok_or_else(|| FetchError::NoVersion(format!("{package} has no `latest` dist-tag")))
    }
}
