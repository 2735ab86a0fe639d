//! Observability utilities: spans and timers for stage execution.

use std::time::{Duration, Instant};
use tracing::Span;
use uuid::Uuid;

use crate::core::StageKind;

/// Span covering one (story, stage) execution. Log lines emitted inside it
/// carry the run id, story and stage.
#[must_use]
pub fn stage_span(run_id: Uuid, story: &str, stage: StageKind) -> Span {
    tracing::info_span!("stage", %run_id, story, stage = %stage)
}

/// Span covering a whole run.
#[must_use]
pub fn run_span(run_id: Uuid) -> Span {
    tracing::info_span!("run", %run_id)
}

/// Measures how long a stage took.
#[derive(Debug)]
pub struct SpanTimer {
    start: Instant,
    name: String,
}

impl SpanTimer {
    /// Starts a timer.
    #[must_use]
    pub fn start(name: impl Into<String>) -> Self {
        Self {
            start: Instant::now(),
            name: name.into(),
        }
    }

    /// Elapsed time so far.
    #[must_use]
    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }

    /// Elapsed whole milliseconds.
    #[must_use]
    pub fn elapsed_ms(&self) -> u64 {
        u64::try_from(self.elapsed().as_millis()).unwrap_or(u64::MAX)
    }

    /// The timer name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Stops the timer and returns elapsed milliseconds.
    #[must_use]
    pub fn finish(self) -> u64 {
        let elapsed = self.elapsed_ms();
        tracing::trace!(timer = %self.name, elapsed_ms = elapsed, "Timer finished");
        elapsed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_span_timer() {
        let timer = SpanTimer::start("fox/narration");
        std::thread::sleep(Duration::from_millis(10));
        assert_eq!(timer.name(), "fox/narration");
        assert!(timer.finish() >= 10);
    }

    #[test]
    fn test_spans_can_be_entered() {
        let run = run_span(Uuid::now_v7());
        let _run = run.enter();
        let stage = stage_span(Uuid::now_v7(), "fox", StageKind::Mix);
        let _stage = stage.enter();
    }
}
