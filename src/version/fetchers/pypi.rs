//! PyPI JSON API fetcher

use std::collections::HashMap;
use std::str::FromStr;

use async_trait::async_trait;
use pep508_rs::pep440_rs::Version;
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

use crate::config::TargetConfig;
use crate::version::error::FetchError;
use crate::version::fetcher::Fetcher;
use crate::version::fetchers::check_status;

const DEFAULT_PYPI_REGISTRY: &str = "https://pypi.org";

/// PyPI fetcher for `pypi = "<project>"` targets (defaults to the target name).
///
/// Reports `info.version`. With `use_pre_release = true` the greatest PEP 440
/// release key wins instead, pre-releases included.
pub struct PypiFetcher {
    client: Client,
    base_url: String,
}

impl PypiFetcher {
    pub fn new(client: Client, base_url: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn with_client(client: Client) -> Self {
        Self::new(client, DEFAULT_PYPI_REGISTRY)
    }
}

/// PyPI JSON API response structure
#[derive(Debug, Deserialize)]
struct PypiResponse {
    info: PypiInfo,
    #[serde(default)]
    releases: HashMap<String, serde_json::Value>,
}

/// Package information from PyPI
#[derive(Debug, Deserialize)]
struct PypiInfo {
    /// Latest version (according to PyPI)
    version: String,
}

fn greatest_release(releases: &HashMap<String, serde_json::Value>) -> Option<String> {
    releases
        .keys()
        .filter_map(|key| Version::from_str(key).ok().map(|parsed| (key, parsed)))
        .max_by(|(_, a), (_, b)| a.cmp(b))
        .map(|(key, _)| key.clone())
}

#[async_trait]
impl Fetcher for PypiFetcher {
    fn source(&self) -> &'static str {
        "pypi"
    }

    async fn fetch_version(&self, name: &str, config: &TargetConfig) -> Result<String, FetchError> {
        let project = config.get("pypi").unwrap_or(name);
        let url = format!("{}/pypi/{}/json", self.base_url, project);
        debug!("Fetching PyPI package: {}", url);

        let response = check_status(self.client.get(&url).send().await?, project)?;
        let pypi_response: PypiResponse = response
            .json()
            .await
            .map_err(|e| FetchError::InvalidResponse(e.to_string()))?;

        if config.flag("use_pre_release") {
            greatest_release(&pypi_response.releases)
                .ok_or_else(|| FetchError::NoVersion(format!("{project} has no valid releases")))
        } else {
            Ok(pypi_response.info.version)
        }
    }
}
