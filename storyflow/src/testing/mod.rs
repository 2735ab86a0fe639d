//! Testing utilities for storyflow pipelines.
//!
//! This module provides:
//! - In-memory doubles for the media toolkit and the remote collaborators
//! - A project fixture that lays out stories and artifacts on disk
//! - Assertions over run summaries

mod assertions;
mod fixtures;
mod mocks;

pub use assertions::{assert_artifacts, assert_stage_tally, assert_status};
pub use fixtures::ProjectFixture;
pub use mocks::{FakeImageGenerator, FakeToolkit, ScriptedSpeech, DEFAULT_FAKE_DURATION};
