//! Running assembled commands.
//!
//! Foreground commands are spawned directly and waited on; their exit status is
//! not inspected, callers read it from the captured output. Background commands
//! are handed to a shell and only the launch is observed.

use std::path::PathBuf;
use std::process::Stdio;

use serde::{Deserialize, Serialize};
use tokio::process::Command;

use crate::assemble::CommandVector;
use crate::error::{DispatchError, Result};

/// Default shell used for background commands.
pub const DEFAULT_SHELL: &str = "/bin/sh";

/// Captured streams of a finished command.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessOutput {
    pub stderr: String,
    pub stdin: String,
    pub stdout: String,
}

impl ProcessOutput {
    /// Drop the orchestrator's startup logging from `stdout`.
    ///
    /// See [`crate::filter_loading_messages`] for the heuristic and its limits.
    pub fn without_loading_messages(mut self) -> Self {
        self.stdout = crate::filter::filter_loading_messages(&self.stdout);
        self
    }
}

/// Runs command vectors as child processes.
#[derive(Debug, Clone)]
pub struct Executor {
    shell: PathBuf,
}

impl Default for Executor {
    fn default() -> Self {
        Self::new(DEFAULT_SHELL)
    }
}

impl Executor {
    pub fn new(shell: impl Into<PathBuf>) -> Self {
        Self {
            shell: shell.into(),
        }
    }

    /// Run `command` in the mode it was assembled for.
    pub async fn execute(&self, command: &CommandVector) -> Result<ProcessOutput> {
        if command.is_background() {
            self.execute_background(command).await
        } else {
            self.execute_foreground(command).await
        }
    }

    /// Spawn the command, wait for it, and capture both output streams.
    ///
    /// There is no timeout: a child that never exits holds the caller.
    pub async fn execute_foreground(&self, command: &CommandVector) -> Result<ProcessOutput> {
        tracing::info!(command = %command.display(), "Executing command");

        let output = Command::new(command.program())
            .args(command.args())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|source| DispatchError::Spawn {
                program: command.program().to_string(),
                source,
            })?;

        let result = ProcessOutput {
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            stdin: String::new(),
        };

        if !output.status.success() {
            tracing::debug!(
                command = %command.display(),
                status = ?output.status.code(),
                "Command exited unsuccessfully"
            );
        }

        Ok(result)
    }

    /// Hand the command to the shell and return once the shell has accepted it.
    ///
    /// `stdout` carries `exit_code: <n>` for the shell invocation only; the
    /// detached process is not tracked.
    pub async fn execute_background(&self, command: &CommandVector) -> Result<ProcessOutput> {
        let script = command.to_shell_command();
        tracing::info!(command = %script, "Executing command in the background");

        let status = Command::new(&self.shell)
            .arg("-c")
            .arg(&script)
            .stdin(Stdio::null())
            .status()
            .await
            .map_err(|source| DispatchError::Spawn {
                program: self.shell.display().to_string(),
                source,
            })?;

        Ok(ProcessOutput {
            stdout: format!("exit_code: {}", status.code().unwrap_or(-1)),
            ..ProcessOutput::default()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vector(tokens: &[&str], background: bool) -> CommandVector {
        CommandVector::new(tokens.iter().map(|t| t.to_string()).collect(), background)
    }

    #[tokio::test]
    async fn test_foreground_captures_stdout() {
        let output = Executor::default()
            .execute(&vector(&["echo", "pause", "sample_dag"], false))
            .await
            .unwrap();
        assert_eq!(output.stdout, "pause sample_dag\n");
        assert_eq!(output.stderr, "");
        assert_eq!(output.stdin, "");
    }

    #[tokio::test]
    async fn test_foreground_nonzero_exit_is_not_an_error() {
        let output = Executor::default()
            .execute(&vector(&["sh", "-c", "echo oops >&2; exit 3"], false))
            .await
            .unwrap();
        assert_eq!(output.stderr, "oops\n");
    }

    #[tokio::test]
    async fn test_foreground_spawn_failure() {
        let err = Executor::default()
            .execute(&vector(&["definitely-not-a-real-binary-7f3a", "version"], false))
            .await
            .unwrap_err();
        assert!(matches!(err, DispatchError::Spawn { ref program, .. } if program == "definitely-not-a-real-binary-7f3a"));
    }

    #[tokio::test]
    async fn test_background_reports_launch_exit_code() {
        let dir = tempfile::tempdir().unwrap();
        let log = dir.path().join("echo.log");
        let command = vector(&["echo", "hello"], true).with_log_redirect(log);
        let output = Executor::default().execute(&command).await.unwrap();
        assert_eq!(output.stdout, "exit_code: 0");
        assert!(output.stderr.is_empty());
    }

    #[tokio::test]
    async fn test_background_tokens_are_not_interpreted_by_the_shell() {
        let dir = tempfile::tempdir().unwrap();
        let log = dir.path().join("echo.log");
        let marker = dir.path().join("injected");
        let marker_arg = marker.display().to_string();
        let command = vector(&["echo", "&", "touch", marker_arg.as_str(), ";"], true)
            .with_log_redirect(log.clone());

        let output = Executor::default().execute(&command).await.unwrap();
        assert_eq!(output.stdout, "exit_code: 0");

        let expected = format!("& touch {} ;\n", marker_arg);
        for _ in 0..50 {
            if std::fs::read_to_string(&log).is_ok_and(|text| text == expected) {
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        }
        assert_eq!(std::fs::read_to_string(&log).unwrap(), expected);
        assert!(!marker.exists());
    }

    #[tokio::test]
    async fn test_background_with_missing_shell() {
        let err = Executor::new("/nonexistent/shell")
            .execute(&vector(&["echo", "&"], true))
            .await
            .unwrap_err();
        assert!(matches!(err, DispatchError::Spawn { .. }));
    }

    #[test]
    fn test_without_loading_messages() {
        let output = ProcessOutput {
            stdout: "[2017-04-19 10:04:34,927] {__init__.py:36} INFO - Using executor\nv1.8.0".into(),
            ..Default::default()
        };
        assert_eq!(output.without_loading_messages().stdout, "v1.8.0");
    }
}
