// # Command Reload Trigger
//
// Runs an external executable synchronously and reports its exit status.
//
// ## Behavior
//
// - Standard output is captured and returned on success
// - A non-zero exit is an error carrying the status and standard error
// - A spawn failure (missing binary, permissions) is an error
// - The child is killed if the future is dropped (shutdown mid-reload)
// - An optional timeout kills a hung command; without one, a command that
//   never exits stalls the cycle until shutdown

use async_trait::async_trait;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;

use crate::Error;
use crate::config::ReloadConfig;
use crate::traits::{ReloadOutput, ReloadTrigger};

/// Reload trigger that executes a fixed command line
#[derive(Debug, Clone)]
pub struct CommandReloadTrigger {
    /// Executable path
    command: PathBuf,

    /// Fixed arguments
    args: Vec<String>,

    /// Kill the command if it runs longer than this
    timeout: Option<Duration>,
}

impl CommandReloadTrigger {
    /// Create a trigger for `command` with fixed `args`
    ///
    /// # Parameters
    ///
    /// - `command`: Executable path (e.g., "/usr/sbin/ufw")
    /// - `args`: Arguments passed unchanged on every reload (e.g., ["reload"])
    pub fn new(command: impl Into<PathBuf>, args: Vec<String>) -> Self {
        Self {
            command: command.into(),
            args,
            timeout: None,
        }
    }

    /// Kill the command after `timeout`
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Create from configuration (`timeout_secs = 0` means no timeout)
    pub fn from_config(config: &ReloadConfig) -> Self {
        let trigger = Self::new(&config.command, config.args.clone());
        if config.timeout_secs > 0 {
            trigger.with_timeout(Duration::from_secs(config.timeout_secs))
        } else {
            trigger
        }
    }

    async fn run(&self) -> Result<ReloadOutput, Error> {
        let output = Command::new(&self.command)
            .args(&self.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| Error::reload(format!("Failed to spawn {}: {}", self.describe(), e)))?;

        let stdout = String::from_utf8_lossy(&output.stdout).trim().to_string();

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            return Err(Error::reload(format!(
                "{} exited with {}: {}",
                self.describe(),
                output.status,
                if stderr.is_empty() { &stdout } else { &stderr }
            )));
        }

        Ok(ReloadOutput { stdout })
    }
}

#[async_trait]
impl ReloadTrigger for CommandReloadTrigger {
    async fn fire(&self) -> Result<ReloadOutput, Error> {
        match self.timeout {
            Some(limit) => tokio::time::timeout(limit, self.run())
                .await
                .map_err(|_| Error::reload(format!("{} timed out after {:?}", self.describe(), limit)))?,
            None => self.run().await,
        }
    }

    fn describe(&self) -> String {
        let mut line = self.command.display().to_string();
        for arg in &self.args {
            line.push(' ');
            line.push_str(arg);
        }
        line
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_captures_stdout() {
        let trigger = CommandReloadTrigger::new("echo", vec!["Firewall".into(), "reloaded".into()]);

        let output = trigger.fire().await.unwrap();
        assert_eq!(output.stdout, "Firewall reloaded");
    }

    #[tokio::test]
    async fn test_non_zero_exit_is_error() {
        let trigger = CommandReloadTrigger::new("false", vec![]);

        let result = trigger.fire().await;
        assert!(matches!(result, Err(Error::Reload(_))));
    }

    #[tokio::test]
    async fn test_stderr_reported_on_failure() {
        let trigger = CommandReloadTrigger::new(
            "sh",
            vec!["-c".into(), "echo 'ERROR: not enabled' >&2; exit 1".into()],
        );

        let err = trigger.fire().await.unwrap_err();
        assert!(err.to_string().contains("ERROR: not enabled"), "{}", err);
    }

    #[tokio::test]
    async fn test_spawn_failure_is_error() {
        let trigger = CommandReloadTrigger::new("/nonexistent/nodesync-reload", vec![]);

        let result = trigger.fire().await;
        assert!(matches!(result, Err(Error::Reload(_))));
    }

    #[tokio::test]
    async fn test_timeout_kills_hung_command() {
        let trigger = CommandReloadTrigger::new("sleep", vec!["30".into()])
            .with_timeout(Duration::from_millis(100));

        let started = std::time::Instant::now();
        let result = trigger.fire().await;

        assert!(matches!(result, Err(Error::Reload(_))));
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[test]
    fn test_from_config() {
        let config = ReloadConfig {
            command: "/bin/systemctl".to_string(),
            args: vec!["reload".to_string(), "nginx".to_string()],
            timeout_secs: 0,
        };

        let trigger = CommandReloadTrigger::from_config(&config);
        assert_eq!(trigger.describe(), "/bin/systemctl reload nginx");
        assert_eq!(trigger.timeout, None);
    }
}
