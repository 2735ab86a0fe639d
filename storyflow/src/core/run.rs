//! A single pipeline invocation.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::StageKind;

/// Which stages a run executes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageSelection {
    /// All four stages, stage-major.
    #[default]
    All,
    /// A single stage.
    Only(StageKind),
}

impl StageSelection {
    /// The selected stages in pipeline order.
    #[must_use]
    pub fn stages(self) -> Vec<StageKind> {
        match self {
            Self::All => StageKind::ORDER.to_vec(),
            Self::Only(kind) => vec![kind],
        }
    }

    /// True if `kind` is part of the selection.
    #[must_use]
    pub fn includes(self, kind: StageKind) -> bool {
        match self {
            Self::All => true,
            Self::Only(only) => only == kind,
        }
    }
}

/// An ordered batch of stories plus a stage selection. Never persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineRun {
    /// Identifier used to correlate log lines.
    pub run_id: Uuid,
    /// Stories in processing order.
    pub stories: Vec<String>,
    /// Stages to execute.
    pub selection: StageSelection,
}

impl PipelineRun {
    /// Creates a run over `stories`.
    #[must_use]
    pub fn new(stories: impl IntoIterator<Item = impl Into<String>>, selection: StageSelection) -> Self {
        Self {
            run_id: Uuid::now_v7(),
            stories: stories.into_iter().map(Into::into).collect(),
            selection,
        }
    }

    /// Convenience for a full-pipeline run.
    #[must_use]
    pub fn full(stories: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self::new(stories, StageSelection::All)
    }

    /// Number of stories in the batch.
    #[must_use]
    pub fn len(&self) -> usize {
        self.stories.len()
    }

    /// True if the batch has no stories.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.stories.is_empty()
    }
}
