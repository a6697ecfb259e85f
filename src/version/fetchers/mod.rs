//! Built-in fetcher implementations

pub mod aur;
pub mod cmd;
pub mod crates_io;
pub mod github;
pub mod htmlparser;
pub mod manual;
pub mod npm;
pub mod pypi;
pub mod regex;

pub use aur::AurFetcher;
pub use cmd::CmdFetcher;
pub use crates_io::CratesIoFetcher;
pub use github::GitHubFetcher;
pub use htmlparser::HtmlParserFetcher;
pub use manual::ManualFetcher;
pub use npm::NpmFetcher;
pub use pypi::PypiFetcher;
pub use regex::RegexFetcher;

use reqwest::{Response, StatusCode};
use tracing::warn;

use crate::config::USER_AGENT;
use crate::version::error::FetchError;

/// HTTP client shared by every built-in fetcher
pub fn build_client() -> Result<reqwest::Client, reqwest::Error> {
    reqwest::Client::builder().user_agent(USER_AGENT).build()
}

/// Map the common failure statuses of an upstream response
pub(crate) fn check_status(response: Response, what: &str) -> Result<Response, FetchError> {
    let status = response.status();

    if status == StatusCode::NOT_FOUND {
        return Err(FetchError::NotFound(what.to_string()));
    }

    if status == StatusCode::TOO_MANY_REQUESTS {
        let retry_after = response
            .headers()
            .get("retry-after")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse().ok());
        return Err(FetchError::RateLimited {
            retry_after_secs: retry_after,
        });
    }

    if !status.is_success() {
        warn!("{} returned status {}", response.url(), status);
        return Err(FetchError::InvalidResponse(format!(
            "Unexpected status: {}",
            status
        )));
    }

    Ok(response)
}
