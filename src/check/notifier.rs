//! Desktop notifications for detected updates

use std::io;

#[cfg(test)]
use mockall::automock;
use thiserror::Error;
use tracing::debug;

use crate::check::orchestrator::UpdateEvent;

/// Summary line of every notification
pub const NOTIFICATION_SUMMARY: &str = "vercheck";

/// Program launched by [`DesktopNotifier`]
pub const NOTIFY_PROGRAM: &str = "notify-send";

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("Failed to launch {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },
}

/// Where notifications end up
#[cfg_attr(test, automock)]
pub trait NotificationSink {
    fn show(&self, summary: &str, body: &str) -> Result<(), NotifyError>;
}

/// Sink that hands each notification to `notify-send`.
///
/// The process is not waited for; the runtime reaps it in the background.
#[derive(Debug, Clone)]
pub struct DesktopNotifier {
    program: String,
}

impl DesktopNotifier {
    pub fn new() -> Self {
        Self::with_program(NOTIFY_PROGRAM)
    }

    pub fn with_program(program: &str) -> Self {
        Self {
            program: program.to_string(),
        }
    }
}

impl Default for DesktopNotifier {
    fn default() -> Self {
        Self::new()
    }
}

impl NotificationSink for DesktopNotifier {
    fn show(&self, summary: &str, body: &str) -> Result<(), NotifyError> {
        tokio::process::Command::new(&self.program)
            .arg(summary)
            .arg(body)
            .stdin(std::process::Stdio::null())
            .stdout(std::process::Stdio::null())
            .stderr(std::process::Stdio::null())
            .spawn()
            .map(drop)
            .map_err(|source| NotifyError::Spawn {
                program: self.program.clone(),
                source,
            })
    }
}

/// Accumulates update messages for the current run.
///
/// Each update re-sends everything collected so far, so the latest
/// notification always lists every update of the run. Delivery failures
/// never affect the run.
pub struct Notifier {
    sink: Box<dyn NotificationSink>,
    messages: Vec<String>,
}

impl Notifier {
    pub fn new(sink: Box<dyn NotificationSink>) -> Self {
        Self {
            sink,
            messages: Vec::new(),
        }
    }

    pub fn desktop() -> Self {
        Self::new(Box::new(DesktopNotifier::new()))
    }

    pub fn push(&mut self, event: &UpdateEvent) {
        self.messages.push(event.to_string());
        let body = self.messages.join("\n");
        if let Err(e) = self.sink.show(NOTIFICATION_SUMMARY, &body) {
            debug!("Notification not delivered: {}", e);
        }
    }

    pub fn messages(&self) -> &[String] {
        &self.messages
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockall::Sequence;

    fn event(name: &str, version: &str) -> UpdateEvent {
        UpdateEvent {
            name: name.to_string(),
            version: version.to_string(),
        }
    }

    #[test]
    fn push_resends_all_messages_of_the_run() {
        let mut sink = MockNotificationSink::new();
        let mut seq = Sequence::new();
        sink.expect_show()
            .withf(|summary, body| summary == "vercheck" && body == "foo updated to version 1.1")
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _| Ok(()));
        sink.expect_show()
            .withf(|_, body| body == "foo updated to version 1.1\nbar updated to version 2.0")
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _| Ok(()));

        let mut notifier = Notifier::new(Box::new(sink));
        notifier.push(&event("foo", "1.1"));
        notifier.push(&event("bar", "2.0"));

        assert_eq!(notifier.messages().len(), 2);
    }

    #[test]
    fn push_swallows_sink_failures() {
        let mut sink = MockNotificationSink::new();
        sink.expect_show().times(2).returning(|_, _| {
            Err(NotifyError::Spawn {
                program: "notify-send".to_string(),
                source: io::Error::from(io::ErrorKind::NotFound),
            })
        });

        let mut notifier = Notifier::new(Box::new(sink));
        notifier.push(&event("foo", "1.1"));
        notifier.push(&event("bar", "2.0"));

        assert_eq!(
            notifier.messages(),
            ["foo updated to version 1.1", "bar updated to version 2.0"]
        );
    }

    #[tokio::test]
    async fn desktop_notifier_reports_missing_program() {
        let sink = DesktopNotifier::with_program("/nonexistent/vercheck-notify");

        let result = sink.show("vercheck", "foo updated to version 1.1");

        assert!(matches!(result, Err(NotifyError::Spawn { .. })));
    }
}
