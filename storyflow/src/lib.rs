//! # Storyflow
//!
//! A resumable story-to-video pipeline.
//!
//! Each story script under `stories/` flows through four stages, run
//! stage-major over the batch:
//!
//! - **Narration**: the cleaned script is chunked and synthesized to speech
//! - **Mix**: the narration is laid over a looped background music bed
//! - **Thumbnail**: a still image is generated from the story title
//! - **Video**: the still and the mixed audio are rendered to an MP4
//!
//! Every stage's output is a file whose existence means "done", so re-running
//! the pipeline only does the work that is missing.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use storyflow::prelude::*;
//!
//! let config = PipelineConfig::load(root, None)?;
//! let orchestrator = PipelineBuilder::new(root, config, Arc::new(Ffmpeg::new()))
//!     .with_remote_clients(&Credentials::from_env(), StageSelection::All)?
//!     .with_sink(Arc::new(LoggingEventSink::default()))
//!     .build(StageSelection::All)?;
//!
//! let summary = orchestrator.run(&PipelineRun::full(stories)).await?;
//! ```

#![forbid(unsafe_code)]
#![warn(
    clippy::all,
    clippy::pedantic,
    missing_docs,
    rust_2018_idioms
)]
#![allow(
    clippy::module_name_repetitions,
    clippy::must_use_candidate,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc
)]

pub mod config;
pub mod core;
pub mod errors;
pub mod events;
pub mod media;
pub mod mixer;
pub mod narration;
pub mod observability;
pub mod pipeline;
pub mod report;
#[cfg(any(test, feature = "testing"))]
pub mod testing;
pub mod thumbnail;
pub mod video;

#[cfg(feature = "providers")]
mod http;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::config::{Credentials, PipelineConfig, SpeechProvider};
    pub use crate::core::{
        ArtifactKind, ArtifactStore, PipelineRun, StageKind, StageOutcome, StageSelection,
        StageStatus, Story,
    };
    pub use crate::errors::{Result, StoryflowError};
    pub use crate::events::{EventSink, LoggingEventSink, NoOpEventSink, PipelineEvent};
    pub use crate::media::{Ffmpeg, MediaToolkit};
    pub use crate::pipeline::{Orchestrator, PipelineBuilder, RetryConfig, RunSummary, Stage};
    pub use crate::report::{StatusReport, StoryListing};
}
