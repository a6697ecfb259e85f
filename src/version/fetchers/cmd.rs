//! Version printed by a shell command

use std::process::Stdio;

use tokio::process::Command;
use tracing::debug;

use crate::config::TargetConfig;
use crate::version::error::FetchError;
use crate::version::fetcher::Fetcher;

/// Runs the `cmd` option through `sh -c` and reports its trimmed stdout
pub struct CmdFetcher;

#[async_trait::async_trait]
impl Fetcher for CmdFetcher {
    fn source(&self) -> &'static str {
        "cmd"
    }

    async fn fetch_version(&self, name: &str, config: &TargetConfig) -> Result<String, FetchError> {
        let cmd = config.require("cmd")?;
        debug!("{}: running `{}`", name, cmd);

        let output = Command::new("sh")
            .arg("-c")
            .arg(cmd)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output()
            .await?;

        if !output.status.success() {
            return Err(FetchError::Command {
                command: cmd.to_string(),
                status: output.status.code().unwrap_or(-1),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }
}
