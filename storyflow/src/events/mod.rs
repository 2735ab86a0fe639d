//! Pipeline lifecycle events.
//!
//! The orchestrator describes everything it does as a [`PipelineEvent`] and
//! hands it to an [`EventSink`]. The CLI logs events; tests collect them.

mod sink;

pub use sink::{CollectingEventSink, EventSink, LoggingEventSink, NoOpEventSink};

use serde::Serialize;
use std::path::PathBuf;
use uuid::Uuid;

use crate::core::StageKind;

/// Something that happened during a run.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PipelineEvent {
    /// A run began.
    RunStarted {
        /// Run identifier.
        run_id: Uuid,
        /// Number of stories in the batch.
        stories: usize,
        /// Selected stages.
        stages: Vec<StageKind>,
    },
    /// A stage pass over the batch began.
    StagePassStarted {
        /// The stage.
        stage: StageKind,
    },
    /// A stage started for one story.
    StageStarted {
        /// Story name.
        story: String,
        /// The stage.
        stage: StageKind,
    },
    /// The artifact already existed.
    StageSkipped {
        /// Story name.
        story: String,
        /// The stage.
        stage: StageKind,
        /// Existing artifact.
        artifact: PathBuf,
    },
    /// A stage produced its artifact.
    StageCompleted {
        /// Story name.
        story: String,
        /// The stage.
        stage: StageKind,
        /// Published artifact.
        artifact: PathBuf,
        /// Wall time in milliseconds.
        duration_ms: u64,
    },
    /// A stage failed for one story.
    StageFailed {
        /// Story name.
        story: String,
        /// The stage.
        stage: StageKind,
        /// Error type name.
        error_type: String,
        /// Error message.
        error: String,
    },
    /// A stage pass over the batch finished.
    StagePassCompleted {
        /// The stage.
        stage: StageKind,
        /// Stories that produced the artifact.
        succeeded: usize,
        /// Stories that already had it.
        skipped: usize,
        /// Stories that failed.
        failed: usize,
    },
    /// A run finished.
    RunCompleted {
        /// Run identifier.
        run_id: Uuid,
        /// Number of failed (story, stage) pairs.
        failures: usize,
    },
}

impl PipelineEvent {
    /// Dotted event type name.
    #[must_use]
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::RunStarted { .. } => "run.started",
            Self::StagePassStarted { .. } => "stage_pass.started",
            Self::StageStarted { .. } => "stage.started",
            Self::StageSkipped { .. } => "stage.skipped",
            Self::StageCompleted { .. } => "stage.completed",
            Self::StageFailed { .. } => "stage.failed",
            Self::StagePassCompleted { .. } => "stage_pass.completed",
            Self::RunCompleted { .. } => "run.completed",
        }
    }

    /// Returns true for failure events.
    #[must_use]
    pub fn is_failure(&self) -> bool {
        matches!(self, Self::StageFailed { .. })
    }

    /// Event payload as JSON.
    #[must_use]
    pub fn data(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }

    /// A human-readable line for the event.
    #[must_use]
    pub fn message(&self) -> String {
        match self {
            Self::RunStarted { stories, stages, .. } => {
                format!("Processing {stories} stories through {} stages", stages.len())
            }
            Self::StagePassStarted { stage } => format!("{} stage", stage.label()),
            Self::StageStarted { story, stage } => format!("[{story}] {} started", stage.label()),
            Self::StageSkipped { story, artifact, .. } => {
                format!("[{story}] Already exists: {}", artifact.display())
            }
            Self::StageCompleted { story, artifact, .. } => {
                format!("[{story}] Saved: {}", artifact.display())
            }
            Self::StageFailed { story, stage, error, .. } => {
                format!("[{story}] {} failed: {error}", stage.label())
            }
            Self::StagePassCompleted {
                stage,
                succeeded,
                skipped,
                failed,
            } => format!(
                "{} done: {succeeded} ok, {skipped} skipped, {failed} failed",
                stage.label()
            ),
            Self::RunCompleted { failures, .. } => format!("Run finished with {failures} failures"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_data_is_tagged() {
        let event = PipelineEvent::StageFailed {
            story: "fox".to_string(),
            stage: StageKind::Mix,
            error_type: "ToolInvocationError".to_string(),
            error: "ffmpeg exited with status 1".to_string(),
        };
        let data = event.data();
        assert_eq!(data["type"], "stage_failed");
        assert_eq!(data["story"], "fox");
        assert!(event.is_failure());
        assert_eq!(event.event_type(), "stage.failed");
    }

    #[test]
    fn test_pass_summary_message() {
        let event = PipelineEvent::StagePassCompleted {
            stage: StageKind::Narration,
            succeeded: 2,
            skipped: 1,
            failed: 0,
        };
        assert_eq!(event.message(), "Narration done: 2 ok, 1 skipped, 0 failed");
    }
}
