//! Pipeline building and execution.
//!
//! This module provides:
//! - The [`Stage`] trait and the four stage descriptors
//! - A builder that validates collaborators against the stage selection
//! - The stage-major [`Orchestrator`]
//! - Retry policy, scratch guard and run summary

mod builder;
mod orchestrator;
mod retry;
mod scratch;
mod stages;
mod summary;

pub use builder::PipelineBuilder;
pub use orchestrator::Orchestrator;
pub use retry::{
    should_retry, with_retry, BackoffStrategy, JitterStrategy, RetryConfig, RetryDecision,
    RetryState, Retryable,
};
pub use scratch::ScratchSpace;
pub use stages::{MixStage, NarrationStage, Stage, StageContext, ThumbnailStage, VideoStage};
pub use summary::{FailureRecord, RunSummary, StageTally};
