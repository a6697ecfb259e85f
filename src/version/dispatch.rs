//! Fetch dispatch: pick a fetcher by `source` and run it as a local task

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tracing::debug;

use crate::config::{ConfigError, Target, TargetConfig};
use crate::version::error::FetchError;
use crate::version::fetcher::Fetcher;
use crate::version::fetchers::{
    AurFetcher, CmdFetcher, CratesIoFetcher, GitHubFetcher, HtmlParserFetcher, ManualFetcher,
    NpmFetcher, PypiFetcher, RegexFetcher,
};

/// Terminal result of one lookup
pub type FetchOutcome = Result<String, FetchError>;

/// Fetchers keyed by the `source` value they handle
#[derive(Default, Clone)]
pub struct FetcherRegistry {
    fetchers: HashMap<&'static str, Arc<dyn Fetcher>>,
}

impl FetcherRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding every built-in fetcher, sharing one HTTP client
    pub fn with_defaults(client: reqwest::Client) -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(ManualFetcher));
        registry.register(Arc::new(CmdFetcher));
        registry.register(Arc::new(RegexFetcher::new(client.clone())));
        registry.register(Arc::new(HtmlParserFetcher::new(client.clone())));
        registry.register(Arc::new(GitHubFetcher::with_client(client.clone())));
        registry.register(Arc::new(PypiFetcher::with_client(client.clone())));
        registry.register(Arc::new(NpmFetcher::with_client(client.clone())));
        registry.register(Arc::new(CratesIoFetcher::with_client(client.clone())));
        registry.register(Arc::new(AurFetcher::with_client(client)));
        registry
    }

    /// Add a fetcher, replacing any previous one for the same source
    pub fn register(&mut self, fetcher: Arc<dyn Fetcher>) -> Option<Arc<dyn Fetcher>> {
        self.fetchers.insert(fetcher.source(), fetcher)
    }

    pub fn get(&self, source: &str) -> Option<Arc<dyn Fetcher>> {
        self.fetchers.get(source).cloned()
    }

    /// Registered source names, sorted
    pub fn sources(&self) -> Vec<&'static str> {
        let mut sources: Vec<_> = self.fetchers.keys().copied().collect();
        sources.sort_unstable();
        sources
    }
}

/// Starts lookups and reports each outcome exactly once
#[derive(Clone)]
pub struct Dispatcher {
    registry: FetcherRegistry,
    timeout: Option<Duration>,
}

impl Dispatcher {
    pub fn new(registry: FetcherRegistry, timeout: Option<Duration>) -> Self {
        Self { registry, timeout }
    }

    /// Fetcher for a target, or a configuration error for an unknown source
    pub fn resolve(&self, target: &Target) -> Result<Arc<dyn Fetcher>, ConfigError> {
        let source = target
            .config
            .source()
            .ok_or_else(|| ConfigError::MissingSource(target.name.clone()))?;

        self.registry
            .get(source)
            .ok_or_else(|| ConfigError::UnknownSource {
                target: target.name.clone(),
                source_kind: source.to_string(),
            })
    }

    /// Check every target up front so bad sources fail before any lookup starts
    pub fn validate(&self, targets: &[Target]) -> Result<(), ConfigError> {
        targets.iter().try_for_each(|t| self.resolve(t).map(|_| ()))
    }

    /// Spawn the lookup for `target` on the current `LocalSet`.
    ///
    /// `on_result` runs exactly once with the outcome. If the source is
    /// unknown it is dropped without running and the error is returned.
    pub fn dispatch<F>(&self, target: &Target, on_result: F) -> Result<(), ConfigError>
    where
        F: FnOnce(&str, FetchOutcome) + 'static,
    {
        let fetcher = self.resolve(target)?;
        let name = target.name.clone();
        let config = target.config.clone();
        let timeout = self.timeout;

        debug!("Dispatching {} via {}", name, fetcher.source());
        tokio::task::spawn_local(async move {
            let outcome = fetch_with_timeout(fetcher.as_ref(), &name, &config, timeout).await;
            on_result(&name, outcome);
        });

        Ok(())
    }
}

fn timeout_error(limit: Duration) -> FetchError {
    FetchError::Timeout(u64::try_from(limit.as_millis()).unwrap_or(u64::MAX))
}

async fn fetch_with_timeout(
    fetcher: &dyn Fetcher,
    name: &str,
    config: &TargetConfig,
    timeout: Option<Duration>,
) -> FetchOutcome {
    let lookup = fetcher.fetch_version(name, config);
    let result = match timeout {
        Some(limit) => tokio::time::timeout(limit, lookup)
            .await
            .unwrap_or_else(|_| Err(timeout_error(limit))),
        None => lookup.await,
    };

    result.and_then(|version| {
        let version = version.trim();
        if version.is_empty() {
            Err(FetchError::EmptyVersion)
        } else if version.contains(['\n', '\r']) {
            Err(FetchError::InvalidResponse(format!(
                "version spans several lines: {version:?}"
            )))
        } else {
            Ok(version.to_string())
        }
    })
}
