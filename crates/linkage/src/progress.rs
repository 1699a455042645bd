//! Progress notifications. Purely observational: reporters never influence results.

use crate::model::StageSummary;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Primary rows run through the exact-match cascade.
    ExactCascade,
    /// Distinct unmatched keys scored by the approximate matcher.
    Fuzzy,
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ExactCascade => write!(f, "exact"),
            Self::Fuzzy => write!(f, "fuzzy"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgressEvent<'a> {
    pub stage: &'a str,
    pub phase: Phase,
    pub processed: usize,
    pub total: usize,
}

pub trait ProgressReporter {
    fn on_progress(&mut self, event: &ProgressEvent<'_>);

    fn on_stage_complete(&mut self, _summary: &StageSummary) {}
}

/// Discards every notification.
#[derive(Debug, Default)]
pub struct NoopReporter;

impl ProgressReporter for NoopReporter {
    fn on_progress(&mut self, _event: &ProgressEvent<'_>) {}
}

/// Forwards notifications to the `log` facade at info level.
#[derive(Debug, Default)]
pub struct LogReporter;

impl ProgressReporter for LogReporter {
    fn on_progress(&mut self, event: &ProgressEvent<'_>) {
        log::info!(
            "stage '{}' [{}]: processed {} of {}",
            event.stage,
            event.phase,
            event.processed,
            event.total
        );
    }

    fn on_stage_complete(&mut self, summary: &StageSummary) {
        log::info!(
            "stage '{}': {} of {} rows matched ({:.1}%)",
            summary.stage,
            summary.matched(),
            summary.total_rows,
            summary.matched_pct
        );
    }
}

/// Emits checkpoints every `every` items plus a final one at `total`.
pub(crate) struct Checkpoints<'a> {
    stage: &'a str,
    phase: Phase,
    total: usize,
    every: usize,
}

impl<'a> Checkpoints<'a> {
    pub(crate) fn new(stage: &'a str, phase: Phase, total: usize, every: usize) -> Self {
        Self {
            stage,
            phase,
            total,
            every: every.max(1),
        }
    }

    pub(crate) fn tick(&self, processed: usize, reporter: &mut dyn ProgressReporter) {
        if processed % self.every == 0 || processed == self.total {
            reporter.on_progress(&ProgressEvent {
                stage: self.stage,
                phase: self.phase,
                processed,
                total: self.total,
            });
        }
    }
}

/// Records every event. Test helper.
#[cfg(test)]
#[derive(Debug, Default)]
pub(crate) struct RecordingReporter {
    pub events: Vec<(String, Phase, usize, usize)>,
    pub stages: Vec<String>,
}

#[cfg(test)]
impl ProgressReporter for RecordingReporter {
    fn on_progress(&mut self, event: &ProgressEvent<'_>) {
        self.events
            .push((event.stage.to_string(), event.phase, event.processed, event.total));
    }

    fn on_stage_complete(&mut self, summary: &StageSummary) {
        self.stages.push(summary.stage.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn checkpoints_fire_on_interval_and_end() {
        let mut rec = RecordingReporter::default();
        let cp = Checkpoints::new("s", Phase::Fuzzy, 5, 2);
        for i in 1..=5 {
            cp.tick(i, &mut rec);
        }
        let processed: Vec<usize> = rec.events.iter().map(|e| e.2).collect();
        assert_eq!(processed, vec![2, 4, 5]);
        assert!(rec.events.iter().all(|e| e.3 == 5 && e.1 == Phase::Fuzzy));
    }
}
