//! Fixed version taken straight from the configuration

use crate::config::TargetConfig;
use crate::version::error::FetchError;
use crate::version::fetcher::Fetcher;

/// Reports the `manual` option as the version
pub struct ManualFetcher;

#[async_trait::async_trait]
impl Fetcher for ManualFetcher {
    fn source(&self) -> &'static str {
        "manual"
    }

    async fn fetch_version(
        &self,
        _name: &str,
        config: &TargetConfig,
    ) -> Result<String, FetchError> {
        config.require("manual").map(|v| v.trim().to_string())
    }
}
