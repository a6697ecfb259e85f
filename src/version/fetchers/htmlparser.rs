//! Version scraped from a web page with an XPath expression

use sxd_document::parser;
use sxd_xpath::{Value, evaluate_xpath};
use tracing::debug;

use crate::config::TargetConfig;
use crate::version::error::FetchError;
use crate::version::fetcher::Fetcher;
use crate::version::fetchers::check_status;

/// Fetches `url` and evaluates `xpath` against the page.
///
/// The expression may select text nodes (`.../a/text()`) or elements, in
/// which case the element's text content is used. The first match in
/// document order wins. The page has to be well-formed markup.
pub struct HtmlParserFetcher {
    client: reqwest::Client,
}

impl HtmlParserFetcher {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }
}

fn extract_version(body: &str, xpath: &str) -> Result<Option<String>, FetchError> {
    let package = parser::parse(body).map_err(|e| {
        FetchError::InvalidResponse(format!("page is not well-formed markup: {e:?}"))
    })?;
    let document = package.as_document();
    let value = evaluate_xpath(&document, xpath).map_err(|e| FetchError::InvalidOption {
        key: "xpath",
        reason: format!("{e:?}"),
    })?;

    let text = match value {
        Value::Nodeset(nodes) => nodes
            .document_order()
            .first()
            .map(|node| node.string_value()),
        other => Some(other.string()),
    };

    Ok(text
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty()))
}

#[async_trait::async_trait]
impl Fetcher for HtmlParserFetcher {
    fn source(&self) -> &'static str {
        "htmlparser"
    }

    async fn fetch_version(&self, name: &str, config: &TargetConfig) -> Result<String, FetchError> {
        let url = config.require("url")?;
        let xpath = config.require("xpath")?;

        debug!("{}: fetching {}", name, url);
        let response = check_status(self.client.get(url).send().await?, url)?;
        let body = response.text().await?;

        extract_version(&body, xpath)?
            .ok_or_else(|| FetchError::NoVersion(format!("`{}` matched nothing at {}", xpath, url)))
    }
}
