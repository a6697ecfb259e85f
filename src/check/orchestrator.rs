//! One check run: load the baseline, look up every target, record updates,
//! persist the new table once all lookups have finished.

use std::cell::RefCell;
use std::fmt;
use std::path::PathBuf;
use std::rc::Rc;

use thiserror::Error;
use tokio::sync::oneshot;
use tokio::task::LocalSet;
use tracing::{debug, error, info};

use crate::check::barrier::CompletionBarrier;
use crate::check::notifier::Notifier;
use crate::config::{ConfigError, Target};
use crate::snapshot::{SnapshotError, SnapshotWriter, VersionTable, load_snapshot};
use crate::version::compare::is_newer;
use crate::version::dispatch::{Dispatcher, FetchOutcome};

#[derive(Debug, Error)]
pub enum RunError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Snapshot(#[from] SnapshotError),

    #[error("Run stopped before every lookup completed")]
    Interrupted,
}

/// A target whose version moved past its baseline
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateEvent {
    pub name: String,
    pub version: String,
}

impl fmt::Display for UpdateEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} updated to version {}", self.name, self.version)
    }
}

/// Per-run inputs besides the targets
#[derive(Default)]
pub struct RunOptions {
    /// Baseline snapshot; a missing path means every target is new
    pub oldver: Option<PathBuf>,
    /// Where the resulting table is written
    pub newver: Option<PathBuf>,
    /// Receives update notifications when set
    pub notifier: Option<Notifier>,
}

/// Outcome of a finished run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunReport {
    /// Updates in the order they were observed
    pub updates: Vec<UpdateEvent>,
    /// Targets whose lookup failed, in completion order
    pub failed: Vec<String>,
    /// Baseline merged with every update
    pub current: VersionTable,
    /// Number of targets looked up
    pub checked: usize,
}

struct RunState {
    baseline: VersionTable,
    current: VersionTable,
    updates: Vec<UpdateEvent>,
    failed: Vec<String>,
    notifier: Option<Notifier>,
}

impl RunState {
    fn record(&mut self, name: &str, outcome: FetchOutcome) {
        match outcome {
            Ok(version) if is_newer(self.baseline.get(name), &version) => {
                info!("{}: updated version {}", name, version);
                self.current.insert(name, &version);
                let event = UpdateEvent {
                    name: name.to_string(),
                    version,
                };
                if let Some(notifier) = self.notifier.as_mut() {
                    notifier.push(&event);
                }
                self.updates.push(event);
            }
            Ok(version) => info!("{}: current version {}", name, version),
            Err(e) => {
                error!("{}: {}", name, e);
                self.failed.push(name.to_string());
            }
        }
    }
}

/// Runs checks over a set of targets
pub struct Orchestrator {
    dispatcher: Dispatcher,
}

impl Orchestrator {
    pub fn new(dispatcher: Dispatcher) -> Self {
        Self { dispatcher }
    }

    /// Check every target concurrently on the current thread.
    ///
    /// Configuration and baseline problems abort the run before any lookup
    /// starts. Lookup failures are logged and reported but never abort it.
    /// The new table is written exactly once, after the last lookup. With no
    /// targets that is a plain copy of the baseline.
    pub async fn run(&self, targets: &[Target], options: RunOptions) -> Result<RunReport, RunError> {
        let RunOptions {
            oldver,
            newver,
            notifier,
        } = options;

        let baseline = match oldver.as_deref() {
            Some(path) => load_snapshot(path)?,
            None => VersionTable::new(),
        };
        self.dispatcher.validate(targets)?;
        if targets.is_empty() {
            info!("No targets configured");
        }

        let state = Rc::new(RefCell::new(RunState {
            current: baseline.clone(),
            baseline,
            updates: Vec::new(),
            failed: Vec::new(),
            notifier,
        }));

        let (done_tx, done_rx) = oneshot::channel();
        let barrier = {
            let state = state.clone();
            let writer = SnapshotWriter::new(newver);
            CompletionBarrier::new(move || {
                debug!("All lookups finished");
                let result = writer.write(&state.borrow().current);
                let _ = done_tx.send(result);
            })
        };

        LocalSet::new()
            .run_until(async {
                let phase = barrier.acquire();
                for target in targets {
                    let guard = barrier.acquire();
                    let state = state.clone();
                    let dispatched = self.dispatcher.dispatch(target, move |name, outcome| {
                        state.borrow_mut().record(name, outcome);
                        guard.release();
                    });
                    if let Err(e) = dispatched {
                        // Nothing gets written for an aborted run.
                        barrier.cancel();
                        return Err(RunError::from(e));
                    }
                }
                debug!("Dispatched {} lookups", targets.len());
                phase.release();

                let written = done_rx.await.map_err(|_| RunError::Interrupted)?;
                written?;
                Ok::<(), RunError>(())
            })
            .await?;

        let mut state = state.borrow_mut();
        Ok(RunReport {
            updates: std::mem::take(&mut state.updates),
            failed: std::mem::take(&mut state.failed),
            current: std::mem::take(&mut state.current),
            checked: targets.len(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::check::notifier::MockNotificationSink;
    use crate::config::TargetConfig;
    use crate::version::dispatch::FetcherRegistry;
    use crate::version::error::FetchError;
    use crate::version::fetcher::MockFetcher;
    use std::sync::Arc;
    use tempfile::TempDir;

    fn target(name: &str) -> Target {
        Target::new(name, TargetConfig::new().with("source", "mock"))
    }

    fn orchestrator(fetcher: MockFetcher) -> Orchestrator {
        let mut registry = FetcherRegistry::new();
        registry.register(Arc::new(fetcher));
        Orchestrator::new(Dispatcher::new(registry, None))
    }

    fn mock_fetcher() -> MockFetcher {
        let mut fetcher = MockFetcher::new();
        fetcher.expect_source().return_const("mock");
        fetcher
    }

    #[tokio::test]
    async fn run_records_update_over_baseline_and_notifies_once() {
        let dir = TempDir::new().unwrap();
        let oldver = dir.path().join("old.txt");
        let newver = dir.path().join("new.txt");
        std::fs::write(&oldver, "foo: 1.0\n").unwrap();

        let mut fetcher = mock_fetcher();
        fetcher
            .expect_fetch_version()
            .times(1)
            .returning(|_, _| Ok("1.1".to_string()));

        let mut sink = MockNotificationSink::new();
        sink.expect_show()
            .withf(|summary, body| summary == "vercheck" && body == "foo updated to version 1.1")
            .times(1)
            .returning(|_, _| Ok(()));

        let report = orchestrator(fetcher)
            .run(
                &[target("foo")],
                RunOptions {
                    oldver: Some(oldver),
                    newver: Some(newver.clone()),
                    notifier: Some(Notifier::new(Box::new(sink))),
                },
            )
            .await
            .unwrap();

        assert_eq!(
            report.updates,
            vec![UpdateEvent {
                name: "foo".to_string(),
                version: "1.1".to_string(),
            }]
        );
        assert_eq!(report.current.get("foo"), Some("1.1"));
        assert_eq!(std::fs::read_to_string(newver).unwrap(), "foo: 1.1\n");
    }

    #[tokio::test]
    async fn run_keeps_going_when_a_lookup_fails() {
        let dir = TempDir::new().unwrap();
        let newver = dir.path().join("new.txt");

        let mut fetcher = mock_fetcher();
        fetcher
            .expect_fetch_version()
            .times(2)
            .returning(|name, _| match name {
                "a" => Ok("2.0".to_string()),
                _ => Err(FetchError::NotFound(name.to_string())),
            });

        let report = orchestrator(fetcher)
            .run(
                &[target("a"), target("b")],
                RunOptions {
                    newver: Some(newver.clone()),
                    ..RunOptions::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(report.failed, vec!["b".to_string()]);
        assert_eq!(report.updates.len(), 1);
        assert_eq!(report.checked, 2);
        assert_eq!(std::fs::read_to_string(newver).unwrap(), "a: 2.0\n");
    }

    #[tokio::test]
    async fn run_leaves_table_alone_when_version_is_not_newer() {
        let dir = TempDir::new().unwrap();
        let oldver = dir.path().join("old.txt");
        std::fs::write(&oldver, "foo: 1.1\nstale: 0.1\n").unwrap();

        let mut fetcher = mock_fetcher();
        fetcher
            .expect_fetch_version()
            .times(1)
            .returning(|_, _| Ok("1.0".to_string()));

        let mut sink = MockNotificationSink::new();
        sink.expect_show().times(0);

        let report = orchestrator(fetcher)
            .run(
                &[target("foo")],
                RunOptions {
                    oldver: Some(oldver),
                    newver: None,
                    notifier: Some(Notifier::new(Box::new(sink))),
                },
            )
            .await
            .unwrap();

        assert!(report.updates.is_empty());
        assert_eq!(report.current.get("foo"), Some("1.1"));
        assert_eq!(report.current.get("stale"), Some("0.1"));
    }

    #[tokio::test]
    async fn run_rejects_unknown_source_before_any_lookup() {
        let dir = TempDir::new().unwrap();
        let newver = dir.path().join("new.txt");

        let mut fetcher = mock_fetcher();
        fetcher.expect_fetch_version().times(0);

        let result = orchestrator(fetcher)
            .run(
                &[
                    target("foo"),
                    Target::new("bar", TargetConfig::new().with("source", "gitlab")),
                ],
                RunOptions {
                    newver: Some(newver.clone()),
                    ..RunOptions::default()
                },
            )
            .await;

        assert!(matches!(
            result,
            Err(RunError::Config(ConfigError::UnknownSource { .. }))
        ));
        assert!(!newver.exists());
    }

    #[tokio::test]
    async fn run_fails_when_requested_baseline_is_missing() {
        let dir = TempDir::new().unwrap();

        let mut fetcher = mock_fetcher();
        fetcher.expect_fetch_version().times(0);

        let result = orchestrator(fetcher)
            .run(
                &[target("foo")],
                RunOptions {
                    oldver: Some(dir.path().join("missing.txt")),
                    ..RunOptions::default()
                },
            )
            .await;

        assert!(matches!(
            result,
            Err(RunError::Snapshot(SnapshotError::Read { .. }))
        ));
    }

    #[tokio::test]
    async fn run_with_no_targets_copies_baseline_to_new_snapshot() {
        let dir = TempDir::new().unwrap();
        let oldver = dir.path().join("old.txt");
        let newver = dir.path().join("new.txt");
        std::fs::write(&oldver, "zlib: 1.3
bash : 5.2
").unwrap();

        let mut fetcher = mock_fetcher();
        fetcher.expect_fetch_version().times(0);

        let report = orchestrator(fetcher)
            .run(
                &[],
                RunOptions {
                    oldver: Some(oldver),
                    newver: Some(newver.clone()),
                    notifier: None,
                },
            )
            .await
            .unwrap();

        assert_eq!(report.checked, 0);
        assert!(report.updates.is_empty());
        assert_eq!(
            std::fs::read_to_string(newver).unwrap(),
            "bash: 5.2\nzlib: 1.3\n"
        );
    }

    #[tokio::test]
    async fn run_with_no_targets_and_no_destination_succeeds() {
        let mut fetcher = mock_fetcher();
        fetcher.expect_fetch_version().times(0);

        let report = orchestrator(fetcher)
            .run(&[], RunOptions::default())
            .await
            .unwrap();

        assert_eq!(report, RunReport::default());
    }

    #[tokio::test]
    async fn run_reports_snapshot_write_failure() {
        let dir = TempDir::new().unwrap();
        let newver = dir.path().join("missing-dir").join("new.txt");

        let mut fetcher = mock_fetcher();
        fetcher
            .expect_fetch_version()
            .times(1)
            .returning(|_, _| Ok("1.0".to_string()));

        let result = orchestrator(fetcher)
            .run(
                &[target("foo")],
                RunOptions {
                    newver: Some(newver),
                    ..RunOptions::default()
                },
            )
            .await;

        assert!(matches!(
            result,
            Err(RunError::Snapshot(SnapshotError::Write { .. }))
        ));
    }

    #[test]
    fn update_event_displays_notification_text() {
        let event = UpdateEvent {
            name: "python-requests".to_string(),
            version: "2.31.0".to_string(),
        };

        assert_eq!(event.to_string(), "python-requests updated to version 2.31.0");
    }
}
