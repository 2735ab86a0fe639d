//! Test assertions for run summaries and artifact trees.

use crate::core::{ArtifactKind, ArtifactStore, StageKind, StageStatus};
use crate::pipeline::{RunSummary, StageTally};

/// Asserts the final status of a (story, stage) pair.
pub fn assert_status(summary: &RunSummary, story: &str, stage: StageKind, expected: StageStatus) {
    let actual = summary.status(story, stage);
    assert_eq!(
        actual, expected,
        "Expected {story}/{stage} to be {expected:?}, got {actual:?} ({:?})",
        summary.outcome(story, stage)
    );
}

/// Asserts the succeeded/skipped/failed counts of a stage.
pub fn assert_stage_tally(summary: &RunSummary, stage: StageKind, succeeded: usize, skipped: usize, failed: usize) {
    let expected = StageTally {
        succeeded,
        skipped,
        failed,
    };
    let actual = summary.tally(stage);
    assert_eq!(
        actual, expected,
        "Unexpected {stage} tally; failures: {:?}",
        summary.failures()
    );
}

/// Asserts which artifacts of `story` are present.
pub fn assert_artifacts(store: &ArtifactStore, story: &str, expected: &[ArtifactKind]) {
    let present: Vec<ArtifactKind> = ArtifactKind::ALL
        .into_iter()
        .filter(|kind| store.exists(story, *kind))
        .collect();
    let mut wanted: Vec<ArtifactKind> = ArtifactKind::ALL
        .into_iter()
        .filter(|kind| expected.contains(kind))
        .collect();
    wanted.dedup();
    assert_eq!(present, wanted, "Unexpected artifacts for story '{story}'");
}
