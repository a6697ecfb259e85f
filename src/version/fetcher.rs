//! Fetcher trait for resolving a target to its upstream version

#[cfg(test)]
use mockall::automock;

use crate::config::TargetConfig;
use crate::version::error::FetchError;

/// Trait for looking up the current upstream version of a target
#[cfg_attr(test, automock)]
#[async_trait::async_trait]
pub trait Fetcher: Send + Sync {
    /// The `source` value this fetcher answers to
    fn source(&self) -> &'static str;

    /// Fetches the current version for a target
    ///
    /// # Arguments
    /// * `name` - The target name (section name in the configuration)
    /// * `config` - The target's options; their meaning is up to the fetcher
    ///
    /// # Returns
    /// * `Ok(String)` - The version string
    /// * `Err(FetchError)` - If the lookup fails
    async fn fetch_version(&self, name: &str, config: &TargetConfig)
    -> Result<String, FetchError>;
}
