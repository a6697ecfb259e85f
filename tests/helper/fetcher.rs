//! Fetcher and notification test utilities

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;

use vercheck::check::notifier::{NotificationSink, NotifyError};
use vercheck::check::orchestrator::Orchestrator;
use vercheck::config::{Target, TargetConfig};
use vercheck::version::dispatch::{Dispatcher, FetcherRegistry};
use vercheck::version::error::FetchError;
use vercheck::version::fetcher::Fetcher;

pub const SCRIPTED_SOURCE: &str = "scripted";

struct Answer {
    delay: Duration,
    result: Result<String, String>,
}

/// Fetcher answering each target with a fixed result after a fixed delay
#[derive(Default)]
pub struct ScriptedFetcher {
    answers: HashMap<String, Answer>,
    calls: Arc<AtomicUsize>,
}

impl ScriptedFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_version(mut self, name: &str, version: &str, delay_ms: u64) -> Self {
        self.answers.insert(
            name.to_string(),
            Answer {
                delay: Duration::from_millis(delay_ms),
                result: Ok(version.to_string()),
            },
        );
        self
    }

    pub fn with_failure(mut self, name: &str, message: &str, delay_ms: u64) -> Self {
        self.answers.insert(
            name.to_string(),
            Answer {
                delay: Duration::from_millis(delay_ms),
                result: Err(message.to_string()),
            },
        );
        self
    }

    /// Counter of lookups started, shared with the fetcher
    pub fn calls(&self) -> Arc<AtomicUsize> {
        self.calls.clone()
    }
}

#[async_trait]
impl Fetcher for ScriptedFetcher {
    fn source(&self) -> &'static str {
        SCRIPTED_SOURCE
    }

    async fn fetch_version(
        &self,
        name: &str,
        _config: &TargetConfig,
    ) -> Result<String, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let Some(answer) = self.answers.get(name) else {
            return Err(FetchError::NotFound(name.to_string()));
        };

        tokio::time::sleep(answer.delay).await;
        answer
            .result
            .clone()
            .map_err(FetchError::InvalidResponse)
    }
}

/// Sink keeping every notification body it was shown
#[derive(Clone, Default)]
pub struct RecordingSink {
    bodies: Rc<RefCell<Vec<String>>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bodies(&self) -> Vec<String> {
        self.bodies.borrow().clone()
    }
}

impl NotificationSink for RecordingSink {
    fn show(&self, _summary: &str, body: &str) -> Result<(), NotifyError> {
        self.bodies.borrow_mut().push(body.to_string());
        Ok(())
    }
}

/// Target handled by [`ScriptedFetcher`]
pub fn scripted_target(name: &str) -> Target {
    Target::new(name, TargetConfig::new().with("source", SCRIPTED_SOURCE))
}

pub fn create_orchestrator(fetcher: ScriptedFetcher, timeout: Option<Duration>) -> Orchestrator {
    let mut registry = FetcherRegistry::new();
    registry.register(Arc::new(fetcher));
    Orchestrator::new(Dispatcher::new(registry, timeout))
}
