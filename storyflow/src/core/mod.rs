//! Core domain model types for storyflow.
//!
//! This module contains the fundamental types used throughout the crate:
//! - Stage kinds and the per-(story, stage) status machine
//! - Artifact kinds and the filesystem-backed artifact registry
//! - Stories and pipeline runs

mod artifact;
mod output;
mod run;
mod status;
mod story;

pub use artifact::{ArtifactKind, ArtifactStore};
pub use output::StageOutcome;
pub use run::{PipelineRun, StageSelection};
pub use status::{StageKind, StageStatus, StatusTrail};
pub use story::{extract_title, validate_story_name, Story};
