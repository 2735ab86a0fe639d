//! Stage-major execution over a batch of stories.
//!
//! For every selected stage, in pipeline order, every story is visited once.
//! A (story, stage) pair whose artifact already exists is skipped; a pair
//! whose inputs are missing, or whose story name cannot be a file stem, fails
//! without running; anything else runs. Errors are isolated per story except
//! fatal configuration errors, which stop the run.

use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, trace, warn, Instrument};

use super::{RunSummary, Stage, StageContext};
use crate::core::{
    validate_story_name, ArtifactStore, PipelineRun, StageKind, StageOutcome, StageStatus,
    StatusTrail,
};
use crate::errors::{Result, StoryflowError};
use crate::events::{EventSink, NoOpEventSink, PipelineEvent};
use crate::observability::{run_span, stage_span, SpanTimer};

/// Drives registered stages over a batch.
pub struct Orchestrator {
    store: ArtifactStore,
    stages: HashMap<StageKind, Arc<dyn Stage>>,
    sink: Arc<dyn EventSink>,
}

impl Orchestrator {
    /// Creates an orchestrator with no stages and a no-op event sink.
    #[must_use]
    pub fn new(store: ArtifactStore) -> Self {
        Self {
            store,
            stages: HashMap::new(),
            sink: Arc::new(NoOpEventSink),
        }
    }

    /// Registers a stage, replacing any stage of the same kind.
    #[must_use]
    pub fn with_stage(mut self, stage: Arc<dyn Stage>) -> Self {
        self.stages.insert(stage.kind(), stage);
        self
    }

    /// Sets the event sink.
    #[must_use]
    pub fn with_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.sink = sink;
        self
    }

    /// The artifact store.
    #[must_use]
    pub fn store(&self) -> &ArtifactStore {
        &self.store
    }

    /// Registered stage kinds in pipeline order.
    #[must_use]
    pub fn registered(&self) -> Vec<StageKind> {
        StageKind::ORDER
            .into_iter()
            .filter(|kind| self.stages.contains_key(kind))
            .collect()
    }

    /// Executes `run`.
    ///
    /// Returns `Err` only for fatal errors. Per-story failures are recorded in
    /// the returned summary.
    pub async fn run(&self, run: &PipelineRun) -> Result<RunSummary> {
        let span = run_span(run.run_id);
        self.run_inner(run).instrument(span).await
    }

    async fn run_inner(&self, run: &PipelineRun) -> Result<RunSummary> {
        let selected = run.selection.stages();
        for kind in &selected {
            if !self.stages.contains_key(kind) {
                return Err(StoryflowError::configuration(format!(
                    "no {kind} stage registered"
                )));
            }
        }
        self.store.ensure_dirs()?;

        self.sink
            .emit(&PipelineEvent::RunStarted {
                run_id: run.run_id,
                stories: run.len(),
                stages: selected.clone(),
            })
            .await;

        let mut summary = RunSummary::new(run.run_id);
        for kind in selected {
            let stage = &self.stages[&kind];
            summary.open_stage(kind);
            self.sink.emit(&PipelineEvent::StagePassStarted { stage: kind }).await;

            for story in &run.stories {
                let (outcome, trail) = self
                    .visit(run, stage.as_ref(), story)
                    .instrument(stage_span(run.run_id, story, kind))
                    .await?;
                summary.record(story, kind, outcome);
                summary.record_trail(story, kind, trail);
            }

            let tally = summary.tally(kind);
            self.sink
                .emit(&PipelineEvent::StagePassCompleted {
                    stage: kind,
                    succeeded: tally.succeeded,
                    skipped: tally.skipped,
                    failed: tally.failed,
                })
                .await;
        }

        match self.store.tidy_temp_dir() {
            Ok(true) => debug!("Removed empty scratch directory"),
            Ok(false) => {}
            Err(e) => debug!(error = %e, "Could not tidy scratch directory"),
        }

        self.sink
            .emit(&PipelineEvent::RunCompleted {
                run_id: run.run_id,
                failures: summary.failures().len(),
            })
            .await;
        info!(failures = summary.failures().len(), "Run finished");
        Ok(summary)
    }

    /// Runs one (story, stage) pair through its state machine.
    async fn visit(
        &self,
        run: &PipelineRun,
        stage: &dyn Stage,
        story: &str,
    ) -> Result<(StageOutcome, StatusTrail)> {
        let kind = stage.kind();
        let mut trail = StatusTrail::new();

        if let Err(e) = validate_story_name(story) {
            step(&mut trail, story, kind, StageStatus::Failed);
            return Ok((self.fail(story, kind, &e).await, trail));
        }
        let ctx = StageContext::new(story, &self.store);

        if let Some(existing) = self.store.find(story, kind.output()) {
            step(&mut trail, story, kind, StageStatus::Done);
            self.sink
                .emit(&PipelineEvent::StageSkipped {
                    story: story.to_string(),
                    stage: kind,
                    artifact: existing.clone(),
                })
                .await;
            return Ok((StageOutcome::skipped(existing), trail));
        }

        if let Err(missing) = stage.check_inputs(&ctx) {
            step(&mut trail, story, kind, StageStatus::Failed);
            return Ok((self.fail(story, kind, &missing.into()).await, trail));
        }

        step(&mut trail, story, kind, StageStatus::Running);
        self.sink
            .emit(&PipelineEvent::StageStarted {
                story: story.to_string(),
                stage: kind,
            })
            .await;
        let timer = SpanTimer::start(format!("{story}/{kind}"));

        match stage.execute(&ctx).await {
            Ok(artifact) => {
                let duration_ms = timer.finish();
                step(&mut trail, story, kind, StageStatus::Done);
                self.sink
                    .emit(&PipelineEvent::StageCompleted {
                        story: story.to_string(),
                        stage: kind,
                        artifact: artifact.clone(),
                        duration_ms,
                    })
                    .await;
                Ok((StageOutcome::completed(artifact), trail))
            }
            Err(e) if e.is_fatal() => {
                debug!(run_id = %run.run_id, error = %e, "Fatal error, aborting run");
                Err(e)
            }
            Err(e) => {
                step(&mut trail, story, kind, StageStatus::Failed);
                Ok((self.fail(story, kind, &e).await, trail))
            }
        }
    }

    async fn fail(&self, story: &str, kind: StageKind, error: &StoryflowError) -> StageOutcome {
        let outcome = StageOutcome::failed(error.error_type(), error.to_string());
        self.sink
            .emit(&PipelineEvent::StageFailed {
                story: story.to_string(),
                stage: kind,
                error_type: error.error_type().to_string(),
                error: error.to_string(),
            })
            .await;
        outcome
    }
}

fn step(trail: &mut StatusTrail, story: &str, stage: StageKind, next: StageStatus) {
    let from = trail.current();
    if trail.advance(next) {
        trace!(story, %stage, %from, to = %next, "Stage status changed");
    } else {
        warn!(story, %stage, %from, to = %next, "Ignoring illegal stage transition");
    }
}

impl std::fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Orchestrator")
            .field("store", &self.store)
            .field("stages", &self.registered())
            .finish_non_exhaustive()
    }
}
