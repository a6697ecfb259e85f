//! Version scraped from a web page with a regular expression

use ::regex::Regex;
use tracing::debug;

use crate::config::TargetConfig;
use crate::version::compare::max_version;
use crate::version::error::FetchError;
use crate::version::fetcher::Fetcher;
use crate::version::fetchers::check_status;

/// Fetches `url` and matches `regex` against the body.
///
/// Each match contributes its first capture group, or the whole match when
/// the pattern has no groups. The greatest candidate wins.
pub struct RegexFetcher {
    client: reqwest::Client,
}

impl RegexFetcher {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }
}

fn extract_version(pattern: &Regex, body: &str) -> Option<String> {
    let candidates: Vec<&str> = pattern
        .captures_iter(body)
        .filter_map(|caps| caps.get(1).or_else(|| caps.get(0)))
        .map(|m| m.as_str())
        .collect();

    max_version(candidates).map(str::to_string)
}

#[async_trait::async_trait]
impl Fetcher for RegexFetcher {
    fn source(&self) -> &'static str {
        "regex"
    }

    async fn fetch_version(&self, name: &str, config: &TargetConfig) -> Result<String, FetchError> {
        let url = config.require("url")?;
        let pattern = Regex::new(config.require("regex")?).map_err(|e| {
            FetchError::InvalidOption {
                key: "regex",
                reason: e.to_string(),
            }
        })?;

        debug!("{}: fetching {}", name, url);
        let response = check_status(self.client.get(url).send().await?, url)?;
        let body = response.text().await?;

        extract_version(&pattern, &body)
            .ok_or_else(|| FetchError::NoVersion(format!("`{}` matched nothing at {}", pattern, url)))
    }
}
