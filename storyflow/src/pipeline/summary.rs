//! Per-run bookkeeping of stage outcomes and failures.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use uuid::Uuid;

use crate::core::{StageKind, StageOutcome, StageStatus, StatusTrail};

/// Record of one (story, stage) failure.
#[derive(Debug, Clone, Serialize)]
pub struct FailureRecord {
    /// Story name.
    pub story: String,
    /// Stage that failed.
    pub stage: StageKind,
    /// Error type name.
    pub error_type: String,
    /// Error message.
    pub error: String,
    /// When the failure was recorded.
    pub timestamp: DateTime<Utc>,
}

impl FailureRecord {
    /// Creates a failure record stamped with the current time.
    #[must_use]
    pub fn new(
        story: impl Into<String>,
        stage: StageKind,
        error_type: impl Into<String>,
        error: impl Into<String>,
    ) -> Self {
        Self {
            story: story.into(),
            stage,
            error_type: error_type.into(),
            error: error.into(),
            timestamp: Utc::now(),
        }
    }
}

/// Counts for one stage pass over the batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StageTally {
    /// Artifacts produced in this run.
    pub succeeded: usize,
    /// Artifacts that already existed.
    pub skipped: usize,
    /// Stories for which the stage failed.
    pub failed: usize,
}

impl StageTally {
    /// Adds one outcome to the counts.
    pub fn record(&mut self, outcome: &StageOutcome) {
        match outcome {
            StageOutcome::Completed { .. } => self.succeeded += 1,
            StageOutcome::Skipped { .. } => self.skipped += 1,
            StageOutcome::Failed { .. } => self.failed += 1,
        }
    }

    /// Total stories visited.
    #[must_use]
    pub fn total(&self) -> usize {
        self.succeeded + self.skipped + self.failed
    }
}

/// Everything that happened in one run.
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    /// Run identifier.
    pub run_id: Uuid,
    tallies: BTreeMap<StageKind, StageTally>,
    #[serde(skip)]
    outcomes: BTreeMap<(String, StageKind), StageOutcome>,
    #[serde(skip)]
    trails: BTreeMap<(String, StageKind), StatusTrail>,
    failures: Vec<FailureRecord>,
}

impl RunSummary {
    /// Creates an empty summary.
    #[must_use]
    pub fn new(run_id: Uuid) -> Self {
        Self {
            run_id,
            tallies: BTreeMap::new(),
            outcomes: BTreeMap::new(),
            trails: BTreeMap::new(),
            failures: Vec::new(),
        }
    }

    /// Records the outcome of a (story, stage) pair.
    pub fn record(&mut self, story: &str, stage: StageKind, outcome: StageOutcome) {
        self.tallies.entry(stage).or_default().record(&outcome);
        if let StageOutcome::Failed { error_type, error } = &outcome {
            self.failures
                .push(FailureRecord::new(story, stage, error_type.clone(), error.clone()));
        }
        self.outcomes.insert((story.to_string(), stage), outcome);
    }

    /// Records the statuses a (story, stage) pair passed through.
    pub fn record_trail(&mut self, story: &str, stage: StageKind, trail: StatusTrail) {
        self.trails.insert((story.to_string(), stage), trail);
    }

    /// Marks a stage as visited even if the batch was empty.
    pub fn open_stage(&mut self, stage: StageKind) {
        self.tallies.entry(stage).or_default();
    }

    /// Counts for `stage`; zeros if it never ran.
    #[must_use]
    pub fn tally(&self, stage: StageKind) -> StageTally {
        self.tallies.get(&stage).copied().unwrap_or_default()
    }

    /// Stages visited, in pipeline order.
    #[must_use]
    pub fn stages(&self) -> Vec<StageKind> {
        self.tallies.keys().copied().collect()
    }

    /// Outcome of a (story, stage) pair, if it was visited.
    #[must_use]
    pub fn outcome(&self, story: &str, stage: StageKind) -> Option<&StageOutcome> {
        self.outcomes.get(&(story.to_string(), stage))
    }

    /// Statuses a (story, stage) pair passed through, if it was visited.
    #[must_use]
    pub fn trail(&self, story: &str, stage: StageKind) -> Option<&StatusTrail> {
        self.trails.get(&(story.to_string(), stage))
    }

    /// Final status of a (story, stage) pair; `Pending` if never visited.
    #[must_use]
    pub fn status(&self, story: &str, stage: StageKind) -> StageStatus {
        self.outcome(story, stage)
            .map_or(StageStatus::Pending, StageOutcome::status)
    }

    /// All recorded failures in order.
    #[must_use]
    pub fn failures(&self) -> &[FailureRecord] {
        &self.failures
    }

    /// Returns true if any (story, stage) pair failed.
    #[must_use]
    pub fn has_failures(&self) -> bool {
        !self.failures.is_empty()
    }

    /// One summary line per visited stage.
    #[must_use]
    pub fn lines(&self) -> Vec<String> {
        self.tallies
            .iter()
            .map(|(stage, t)| {
                format!(
                    "{} done: {} ok, {} skipped, {} failed",
                    stage.label(),
                    t.succeeded,
                    t.skipped,
                    t.failed
                )
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_tallies_and_failures() {
        let mut summary = RunSummary::new(Uuid::now_v7());
        summary.record("a", StageKind::Narration, StageOutcome::completed("narrations/a.mp3"));
        summary.record("b", StageKind::Narration, StageOutcome::skipped("narrations/b.mp3"));
        summary.record(
            "c",
            StageKind::Narration,
            StageOutcome::failed("MissingInputArtifact", "narration: story not found"),
        );

        let tally = summary.tally(StageKind::Narration);
        assert_eq!(tally, StageTally { succeeded: 1, skipped: 1, failed: 1 });
        assert_eq!(tally.total(), 3);
        assert!(summary.has_failures());
        assert_eq!(summary.failures()[0].story, "c");
        assert_eq!(summary.status("c", StageKind::Narration), StageStatus::Failed);
        assert_eq!(summary.status("a", StageKind::Video), StageStatus::Pending);
    }

    #[test]
    fn test_lines_follow_pipeline_order() {
        let mut summary = RunSummary::new(Uuid::now_v7());
        summary.open_stage(StageKind::Video);
        summary.record("a", StageKind::Mix, StageOutcome::completed("mixed/a.mp3"));

        assert_eq!(
            summary.lines(),
            vec![
                "Mix done: 1 ok, 0 skipped, 0 failed".to_string(),
                "Video done: 0 ok, 0 skipped, 0 failed".to_string(),
            ]
        );
        assert_eq!(summary.stages(), vec![StageKind::Mix, StageKind::Video]);
    }
}
