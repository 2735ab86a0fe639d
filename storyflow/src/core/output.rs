//! Result of running one stage for one story.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use super::StageStatus;

/// How a (story, stage) pair ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum StageOutcome {
    /// The stage ran and produced its artifact.
    Completed {
        /// The artifact path.
        artifact: PathBuf,
    },
    /// The artifact already existed; nothing ran.
    Skipped {
        /// The existing artifact path.
        artifact: PathBuf,
    },
    /// The stage failed.
    Failed {
        /// Error type name.
        error_type: String,
        /// Error message.
        error: String,
    },
}

impl StageOutcome {
    /// Creates a completed outcome.
    #[must_use]
    pub fn completed(artifact: impl Into<PathBuf>) -> Self {
        Self::Completed {
            artifact: artifact.into(),
        }
    }

    /// Creates a skipped outcome.
    #[must_use]
    pub fn skipped(artifact: impl Into<PathBuf>) -> Self {
        Self::Skipped {
            artifact: artifact.into(),
        }
    }

    /// Creates a failed outcome.
    #[must_use]
    pub fn failed(error_type: impl Into<String>, error: impl Into<String>) -> Self {
        Self::Failed {
            error_type: error_type.into(),
            error: error.into(),
        }
    }

    /// Terminal status in the stage state machine.
    #[must_use]
    pub fn status(&self) -> StageStatus {
        match self {
            Self::Completed { .. } | Self::Skipped { .. } => StageStatus::Done,
            Self::Failed { .. } => StageStatus::Failed,
        }
    }

    /// The artifact path when the stage is done.
    #[must_use]
    pub fn artifact(&self) -> Option<&Path> {
        match self {
            Self::Completed { artifact } | Self::Skipped { artifact } => Some(artifact),
            Self::Failed { .. } => None,
        }
    }

    /// Returns true for an idempotent skip.
    #[must_use]
    pub fn is_skipped(&self) -> bool {
        matches!(self, Self::Skipped { .. })
    }

    /// Returns true for a failure.
    #[must_use]
    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Failed { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_skip_counts_as_done() {
        let skipped = StageOutcome::skipped("videos/fox.mp4");
        assert_eq!(skipped.status(), StageStatus::Done);
        assert!(skipped.is_skipped());
        assert_eq!(skipped.artifact(), Some(Path::new("videos/fox.mp4")));
    }

    #[test]
    fn test_failed_has_no_artifact() {
        let failed = StageOutcome::failed("ToolInvocationError", "ffmpeg exited with status 1");
        assert_eq!(failed.status(), StageStatus::Failed);
        assert!(failed.artifact().is_none());
    }

    #[test]
    fn test_serialization_is_tagged() {
        let json = serde_json::to_value(StageOutcome::completed("mixed/fox.mp3")).unwrap();
        assert_eq!(json["outcome"], "completed");
        assert_eq!(json["artifact"], "mixed/fox.mp3");
    }
}
