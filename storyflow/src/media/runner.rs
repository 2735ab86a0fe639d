//! External process execution.

use async_trait::async_trait;
use std::process::Stdio;

use crate::errors::ToolError;

/// Captured output of a finished process.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    /// Standard output, lossily decoded.
    pub stdout: String,
    /// Standard error, lossily decoded.
    pub stderr: String,
    /// Exit code; `None` when terminated by a signal.
    pub code: Option<i32>,
}

impl CommandOutput {
    /// A successful output with the given stdout.
    #[must_use]
    pub fn success(stdout: impl Into<String>) -> Self {
        Self {
            stdout: stdout.into(),
            stderr: String::new(),
            code: Some(0),
        }
    }

    /// A failed output with the given exit code and stderr.
    #[must_use]
    pub fn failure(code: i32, stderr: impl Into<String>) -> Self {
        Self {
            stdout: String::new(),
            stderr: stderr.into(),
            code: Some(code),
        }
    }

    /// Returns true for exit code zero.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.code == Some(0)
    }

    /// Converts a non-zero exit into a [`ToolError`].
    pub fn check(self, program: &str) -> Result<Self, ToolError> {
        if self.is_success() {
            Ok(self)
        } else {
            Err(ToolError::failed(program, self.code, &self.stderr))
        }
    }
}

/// Runs external programs to completion.
#[async_trait]
pub trait CommandRunner: Send + Sync {
    /// Runs `program` with `args` and captures its output.
    ///
    /// Only a failure to start the process is an error; a non-zero exit is
    /// reported through [`CommandOutput::code`].
    async fn run(&self, program: &str, args: &[String]) -> Result<CommandOutput, ToolError>;
}

/// [`CommandRunner`] backed by `tokio::process`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessRunner;

#[async_trait]
impl CommandRunner for ProcessRunner {
    async fn run(&self, program: &str, args: &[String]) -> Result<CommandOutput, ToolError> {
        tracing::debug!(program, args = ?args, "Running command");

        let output = tokio::process::Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| ToolError::launch(program, e.to_string()))?;

        Ok(CommandOutput {
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            code: output.status.code(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_maps_exit_codes() {
        assert!(CommandOutput::success("ok").check("ffprobe").is_ok());

        let err = CommandOutput::failure(1, "Invalid data found when processing input")
            .check("ffmpeg")
            .unwrap_err();
        assert!(matches!(err, ToolError::Failed { code: Some(1), .. }));
        assert!(err.to_string().contains("Invalid data"));
    }

    #[tokio::test]
    async fn test_missing_program_is_launch_error() {
        let err = ProcessRunner
            .run("storyflow-definitely-not-a-real-binary", &[])
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::Launch { .. }));
    }
}
