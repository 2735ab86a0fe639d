//! Error types for the storyflow pipeline.
//!
//! Errors fall into two groups. Story-level errors (missing inputs, service
//! failures, toolkit failures, filesystem trouble) are caught at the story
//! boundary by the orchestrator and counted. Fatal configuration errors abort
//! a run before any story is touched.

use std::path::PathBuf;
use thiserror::Error;

use crate::core::{ArtifactKind, StageKind};

/// Convenience alias used across the crate.
pub type Result<T, E = StoryflowError> = std::result::Result<T, E>;

/// The main error type for storyflow operations.
#[derive(Debug, Error)]
pub enum StoryflowError {
    /// A predecessor artifact required by a stage is absent.
    #[error("{0}")]
    MissingInput(#[from] MissingInputError),

    /// A remote collaborator (speech or image service) failed.
    #[error("{0}")]
    Service(#[from] ServiceError),

    /// The media toolkit failed.
    #[error("{0}")]
    Tool(#[from] ToolError),

    /// A story's content cannot be processed (for example it has no text).
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// The run cannot start: credentials, tools or configuration are missing.
    #[error("Configuration error: {0}")]
    FatalConfiguration(String),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl StoryflowError {
    /// Creates a fatal configuration error.
    #[must_use]
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::FatalConfiguration(message.into())
    }

    /// Creates an invalid input error.
    #[must_use]
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput(message.into())
    }

    /// Returns true if this error must abort the whole run.
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::FatalConfiguration(_))
    }

    /// Short type name used in failure records and diagnostics.
    #[must_use]
    pub fn error_type(&self) -> &'static str {
        match self {
            Self::MissingInput(_) => "MissingInputArtifact",
            Self::Service(e) if e.is_retryable() => "TransientServiceError",
            Self::Service(_) => "ServiceError",
            Self::Tool(_) => "ToolInvocationError",
            Self::InvalidInput(_) => "InvalidInputError",
            Self::FatalConfiguration(_) => "FatalConfigurationError",
            Self::Io(_) => "IoError",
        }
    }
}

/// Raised when a stage precondition finds its input missing.
#[derive(Debug, Clone, Error)]
#[error("{stage}: {input} not found: {}", path.display())]
pub struct MissingInputError {
    /// Stage whose precondition failed.
    pub stage: StageKind,
    /// What was expected: an artifact kind or the story script.
    pub input: String,
    /// Where it was expected.
    pub path: PathBuf,
}

impl MissingInputError {
    /// Creates an error for a missing predecessor artifact.
    #[must_use]
    pub fn new(stage: StageKind, artifact: ArtifactKind, path: impl Into<PathBuf>) -> Self {
        Self {
            stage,
            input: artifact.to_string(),
            path: path.into(),
        }
    }

    /// Creates an error for a missing story script.
    #[must_use]
    pub fn story(stage: StageKind, path: impl Into<PathBuf>) -> Self {
        Self {
            stage,
            input: "story".to_string(),
            path: path.into(),
        }
    }
}

/// Errors returned by the remote speech and image collaborators.
#[derive(Debug, Clone, Error)]
pub enum ServiceError {
    /// A recoverable failure: rate limiting, server errors, timeouts.
    #[error("{service} transient failure: {message}")]
    Transient {
        /// Service name.
        service: String,
        /// Error detail.
        message: String,
    },

    /// The service rejected the request; retrying will not help.
    #[error("{service} rejected request: {message}")]
    Rejected {
        /// Service name.
        service: String,
        /// Error detail.
        message: String,
    },

    /// The response could not be interpreted.
    #[error("{service} returned an invalid response: {message}")]
    InvalidResponse {
        /// Service name.
        service: String,
        /// Error detail.
        message: String,
    },
}

impl ServiceError {
    /// Creates a transient error.
    #[must_use]
    pub fn transient(service: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Transient {
            service: service.into(),
            message: message.into(),
        }
    }

    /// Creates a rejected error.
    #[must_use]
    pub fn rejected(service: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Rejected {
            service: service.into(),
            message: message.into(),
        }
    }

    /// Creates an invalid response error.
    #[must_use]
    pub fn invalid_response(service: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidResponse {
            service: service.into(),
            message: message.into(),
        }
    }

    /// Classifies an HTTP status: 429 and 5xx are worth retrying.
    #[must_use]
    pub fn from_status(service: impl Into<String>, status: u16, body: &str) -> Self {
        let message = format!("HTTP {status}: {}", truncate(body, 300));
        if status == 429 || (500..600).contains(&status) {
            Self::transient(service, message)
        } else {
            Self::rejected(service, message)
        }
    }

    /// Returns true if the failure is transient.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Transient { .. })
    }
}

/// Errors raised by the media toolkit. Never retried.
#[derive(Debug, Clone, Error)]
pub enum ToolError {
    /// The tool could not be started at all.
    #[error("failed to launch {program}: {reason}")]
    Launch {
        /// Program name.
        program: String,
        /// OS error text.
        reason: String,
    },

    /// The tool ran and exited non-zero.
    #[error("{program} exited with {}: {stderr}", code.map_or_else(|| "signal".to_string(), |c| format!("status {c}")))]
    Failed {
        /// Program name.
        program: String,
        /// Exit code, absent when killed by a signal.
        code: Option<i32>,
        /// Tail of the tool's stderr.
        stderr: String,
    },

    /// The tool succeeded but its output made no sense.
    #[error("{program} produced unexpected output: {output}")]
    UnexpectedOutput {
        /// Program name.
        program: String,
        /// The offending output.
        output: String,
    },
}

impl ToolError {
    /// Creates a launch error.
    #[must_use]
    pub fn launch(program: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Launch {
            program: program.into(),
            reason: reason.into(),
        }
    }

    /// Creates an exit-status error, keeping only the tail of stderr.
    #[must_use]
    pub fn failed(program: impl Into<String>, code: Option<i32>, stderr: &str) -> Self {
        Self::Failed {
            program: program.into(),
            code,
            stderr: tail(stderr.trim(), 500).to_string(),
        }
    }

    /// Creates an unexpected output error.
    #[must_use]
    pub fn unexpected_output(program: impl Into<String>, output: impl Into<String>) -> Self {
        Self::UnexpectedOutput {
            program: program.into(),
            output: output.into(),
        }
    }
}

fn truncate(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

fn tail(text: &str, max_chars: usize) -> &str {
    let count = text.chars().count();
    if count <= max_chars {
        return text;
    }
    match text.char_indices().nth(count - max_chars) {
        Some((idx, _)) => &text[idx..],
        None => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_classification() {
        assert!(ServiceError::from_status("openai", 429, "slow down").is_retryable());
        assert!(ServiceError::from_status("openai", 503, "").is_retryable());
        assert!(!ServiceError::from_status("openai", 400, "input too long").is_retryable());
        assert!(!ServiceError::from_status("openai", 401, "bad key").is_retryable());
    }

    #[test]
    fn test_error_type_names() {
        let transient: StoryflowError = ServiceError::transient("tts", "timeout").into();
        assert_eq!(transient.error_type(), "TransientServiceError");

        let rejected: StoryflowError = ServiceError::rejected("tts", "bad").into();
        assert_eq!(rejected.error_type(), "ServiceError");

        let tool: StoryflowError = ToolError::failed("ffmpeg", Some(1), "boom").into();
        assert_eq!(tool.error_type(), "ToolInvocationError");

        let missing: StoryflowError =
            MissingInputError::new(StageKind::Mix, ArtifactKind::Narration, "narrations/fox.mp3")
                .into();
        assert_eq!(missing.error_type(), "MissingInputArtifact");
    }

    #[test]
    fn test_only_configuration_is_fatal() {
        assert!(StoryflowError::configuration("OPENAI_API_KEY not set").is_fatal());
        assert!(!StoryflowError::from(ToolError::launch("ffmpeg", "not found")).is_fatal());
    }

    #[test]
    fn test_missing_input_message() {
        let err = MissingInputError::new(StageKind::Mix, ArtifactKind::Narration, "narrations/fox.mp3");
        assert_eq!(err.to_string(), "mix: narration not found: narrations/fox.mp3");
    }

    #[test]
    fn test_missing_story_message() {
        let err = MissingInputError::story(StageKind::Narration, "stories/fox.md");
        assert_eq!(err.to_string(), "narration: story not found: stories/fox.md");
    }

    #[test]
    fn test_tool_error_keeps_stderr_tail() {
        let long = "x".repeat(1000) + "the end";
        let err = ToolError::failed("ffmpeg", Some(1), &long);
        match err {
            ToolError::Failed { stderr, .. } => {
                assert_eq!(stderr.chars().count(), 500);
                assert!(stderr.ends_with("the end"));
            }
            other => panic!("unexpected variant: {other:?}"),
        }
    }

    #[test]
    fn test_truncate_is_char_safe() {
        assert_eq!(truncate("小红帽的故事", 3), "小红帽");
        assert_eq!(truncate("abc", 10), "abc");
    }
}
