//! crates.io fetcher

use semver::Version;
use serde::Deserialize;
use tracing::debug;

use crate::config::TargetConfig;
use crate::version::error::FetchError;
use crate::version::fetcher::Fetcher;
use crate::version::fetchers::check_status;

const DEFAULT_BASE_URL: &str = "https://crates.io";

#[derive(Debug, Deserialize)]
struct CrateResponse {
    versions: Vec<CrateVersion>,
}

#[derive(Debug, Deserialize)]
struct CrateVersion {
    num: String,
    #[serde(default)]
    yanked: bool,
}

/// Fetcher for `cratesio = "<crate>"` targets (defaults to the target name).
///
/// Reports the greatest non-yanked version. Pre-releases are skipped unless
/// `use_pre_release = true`.
pub struct CratesIoFetcher {
    client: reqwest::Client,
    base_url: String,
}

impl CratesIoFetcher {
    pub fn new(client: reqwest::Client, base_url: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn with_client(client: reqwest::Client) -> Self {
        Self::new(client, DEFAULT_BASE_URL)
    }
}

fn select_version(versions: &[CrateVersion], use_pre_release: bool) -> Option<String> {
    versions
        .iter()
        .filter(|v| !v.yanked)
        .filter_map(|v| Version::parse(&v.num).ok().map(|parsed| (v, parsed)))
        .filter(|(_, parsed)| use_pre_release || parsed.pre.is_empty())
        .max_by(|(_, a), (_, b)| a.cmp(b))
        .map(|(v, _)| v.num.clone())
}

#[async_trait::async_trait]
impl Fetcher for CratesIoFetcher {
    fn source(&self) -> &'static str {
        "cratesio"
    }

    async fn fetch_version(&self, name: &str, config: &TargetConfig) -> Result<String, FetchError> {
        let krate = config.get("cratesio").unwrap_or(name);
        let url = format!("{}/api/v1/crates/{}", self.base_url, krate);
        debug!("Fetching crate: {}", url);

        let response = check_status(self.client.get(&url).send().await?, krate)?;
        let body: CrateResponse = response
            .json()
            .await
            .map_err(|e| FetchError::InvalidResponse(e.to_string()))?;

        select_version(&body.versions, config.flag("use_pre_release"))
            .ok_or_else(|| FetchError::NoVersion(format!("{krate} has no usable versions")))
    }
}
