//! Arch User Repository RPC fetcher

use serde::Deserialize;
use tracing::debug;
use urlencoding::encode;

use crate::config::TargetConfig;
use crate::version::error::FetchError;
use crate::version::fetcher::Fetcher;
use crate::version::fetchers::check_status;

const DEFAULT_BASE_URL: &str = "https://aur.archlinux.org";

#[derive(Debug, Deserialize)]
struct AurResponse {
    #[serde(default)]
    results: Vec<AurEntry>,
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AurEntry {
    #[serde(rename = "Name")]
    name: String,
    #[serde(rename = "Version")]
    version: String,
}

/// Fetcher for `aur = "<package>"` targets (defaults to the target name).
///
/// With `strip_release = true` the trailing `-pkgrel` is dropped.
pub struct AurFetcher {
    client: reqwest::Client,
    base_url: String,
}

impl AurFetcher {
    pub fn new(client: reqwest::Client, base_url: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn with_client(client: reqwest::Client) -> Self {
        Self::new(client, DEFAULT_BASE_URL)
    }

    fn compose_url(&self, package: &str) -> String {
        format!(
            "{}/rpc/?v=5&type=info&arg[]={}",
            self.base_url,
            encode(package)
        )
    }
}

#[async_trait::async_trait]
impl Fetcher for AurFetcher {
    fn source(&self) -> &'static str {
        "aur"
    }

    async fn fetch_version(&self, name: &str, config: &TargetConfig) -> Result<String, FetchError> {
        let package = config.get("aur").unwrap_or(name);
        let url = self.compose_url(package);
        debug!("Fetching AUR package: {}", url);

        let response = check_status(self.client.get(&url).send().await?, package)?;
        let payload: AurResponse = response
            .json()
            .await
            .map_err(|e| FetchError::InvalidResponse(e.to_string()))?;

        if let Some(error) = payload.error {
            return Err(FetchError::InvalidResponse(format!(
                "AUR responded with error: {error}"
            )));
        }

        let entry = payload
            .results
            .into_iter()
            .find(|entry| entry.name == package)
            .ok_or_else(|| FetchError::NotFound(package.to_string()))?;

        if config.flag("strip_release") {
            if let Some((version, _pkgrel)) = entry.version.rsplit_once('-') {
                return Ok(version.to_string());
            }
        }
        Ok(entry.version)
    }
}
