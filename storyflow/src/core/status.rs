//! Stage kind and status enums.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::ArtifactKind;

/// One of the four fixed pipeline stages, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageKind {
    /// Speech synthesis of the story text.
    Narration,
    /// Narration mixed with the background music bed.
    Mix,
    /// Thumbnail image provisioning.
    Thumbnail,
    /// Still image plus mixed audio rendered to video.
    Video,
}

impl StageKind {
    /// All stages in pipeline order.
    pub const ORDER: [Self; 4] = [Self::Narration, Self::Mix, Self::Thumbnail, Self::Video];

    /// The artifact this stage produces.
    #[must_use]
    pub fn output(self) -> ArtifactKind {
        match self {
            Self::Narration => ArtifactKind::Narration,
            Self::Mix => ArtifactKind::MixedAudio,
            Self::Thumbnail => ArtifactKind::Image,
            Self::Video => ArtifactKind::Video,
        }
    }

    /// Capitalised label for summaries.
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Narration => "Narration",
            Self::Mix => "Mix",
            Self::Thumbnail => "Thumbnail",
            Self::Video => "Video",
        }
    }
}

impl fmt::Display for StageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Narration => write!(f, "narration"),
            Self::Mix => write!(f, "mix"),
            Self::Thumbnail => write!(f, "thumbnail"),
            Self::Video => write!(f, "video"),
        }
    }
}

/// Lifecycle of one (story, stage) pair.
///
/// `Pending -> Running -> Done` or `Pending -> Running -> Failed`. An
/// idempotent skip goes straight from `Pending` to `Done`, and a failed
/// precondition from `Pending` to `Failed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageStatus {
    /// Not yet attempted.
    #[default]
    Pending,
    /// Currently executing.
    Running,
    /// Output artifact is present.
    Done,
    /// The stage failed for this story.
    Failed,
}

impl fmt::Display for StageStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Running => write!(f, "running"),
            Self::Done => write!(f, "done"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

impl StageStatus {
    /// Returns true if the status represents a terminal state.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done | Self::Failed)
    }

    /// Returns true if moving from `self` to `next` is a legal transition.
    #[must_use]
    pub fn can_transition_to(&self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::Running | Self::Done | Self::Failed)
                | (Self::Running, Self::Done | Self::Failed)
        )
    }
}

/// The statuses one (story, stage) pair passed through, starting at `Pending`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusTrail {
    steps: Vec<StageStatus>,
}

impl StatusTrail {
    /// Starts a trail at `Pending`.
    #[must_use]
    pub fn new() -> Self {
        Self {
            steps: vec![StageStatus::Pending],
        }
    }

    /// The latest status.
    #[must_use]
    pub fn current(&self) -> StageStatus {
        self.steps.last().copied().unwrap_or_default()
    }

    /// Moves to `next` if the transition is legal. Returns false and leaves
    /// the trail unchanged otherwise.
    #[must_use]
    pub fn advance(&mut self, next: StageStatus) -> bool {
        if !self.current().can_transition_to(next) {
            return false;
        }
        self.steps.push(next);
        true
    }

    /// Every status visited, in order.
    #[must_use]
    pub fn steps(&self) -> &[StageStatus] {
        &self.steps
    }
}

impl Default for StatusTrail {
    fn default() -> Self {
        Self::new()
    }
}
