//! GitHub releases and tags

use reqwest::RequestBuilder;
use serde::Deserialize;
use tracing::debug;

use crate::config::TargetConfig;
use crate::version::compare::max_version;
use crate::version::error::FetchError;
use crate::version::fetcher::Fetcher;
use crate::version::fetchers::check_status;

/// Default base URL for GitHub API
const DEFAULT_BASE_URL: &str = "https://api.github.com";

/// Response from GitHub latest release API
#[derive(Debug, Deserialize)]
struct Release {
    tag_name: String,
}

/// Entry of the GitHub tags API
#[derive(Debug, Deserialize)]
struct Tag {
    name: String,
}

/// Fetcher for `github = "owner/repo"` targets.
///
/// Reports the latest release tag, or the greatest tag when
/// `use_max_tag = true`. A `token` option, or `GITHUB_TOKEN` in the
/// environment, is sent for authentication.
pub struct GitHubFetcher {
    client: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

impl GitHubFetcher {
    /// Creates a new GitHubFetcher with a custom base URL
    pub fn new(client: reqwest::Client, base_url: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token: None,
        }
    }

    pub fn with_client(client: reqwest::Client) -> Self {
        let mut fetcher = Self::new(client, DEFAULT_BASE_URL);
        fetcher.token = std::env::var("GITHUB_TOKEN").ok().filter(|t| !t.is_empty());
        fetcher
    }

    fn request(&self, url: &str, config: &TargetConfig) -> RequestBuilder {
        let request = self
            .client
            .get(url)
            .header("Accept", "application/vnd.github+json");
        match config.get("token").or(self.token.as_deref()) {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn latest_release(&self, repo: &str, config: &TargetConfig) -> Result<String, FetchError> {
        let url = format!("{}/repos/{}/releases/latest", self.base_url, repo);
        let response = check_status(self.request(&url, config).send().await?, repo)?;

        let release: Release = response
            .json()
            .await
            .map_err(|e| FetchError::InvalidResponse(e.to_string()))?;
        Ok(release.tag_name)
    }

    async fn max_tag(&self, repo: &str, config: &TargetConfig) -> Result<String, FetchError> {
        let url = format!("{}/repos/{}/tags?per_page=100", self.base_url, repo);
        let response = check_status(self.request(&url, config).send().await?, repo)?;

        let tags: Vec<Tag> = response
            .json()
            .await
            .map_err(|e| FetchError::InvalidResponse(e.to_string()))?;
        max_version(tags.iter().map(|t| t.name.as_str()))
            .map(str::to_string)
            .ok_or_else(|| FetchError::NoVersion(format!("{repo} has no tags")))
    }
}

#[async_trait::async_trait]
impl Fetcher for GitHubFetcher {
    fn source(&self) -> &'static str {
        "github"
    }

    async fn fetch_version(&self, name: &str, config: &TargetConfig) -> Result<String, FetchError> {
        let repo = config.require("github")?;
        debug!("{}: querying GitHub repository {}", name, repo);

        if config.flag("use_max_tag") {
            self.max_tag(repo, config).await
        } else {
            self.latest_release(repo, config).await
        }
    }
}
