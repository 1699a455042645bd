use crate::config::{KeyColumn, StrategyConfig};
use crate::dedup::Lookup;
use crate::model::{MatchOutcome, Record, Table};
use crate::normalize::extract_key;
use crate::progress::{Checkpoints, Phase, ProgressReporter};

/// An exact-match strategy bound to its deduplicated secondary lookup.
#[derive(Debug, Clone)]
pub struct JoinStrategy {
    pub id: String,
    pub primary_key: Vec<KeyColumn>,
    pub lookup: Lookup,
}

impl JoinStrategy {
    /// Deduplicate `secondary` by `secondary_key` and bind it to `primary_key`.
    pub fn build(
        id: impl Into<String>,
        primary_key: Vec<KeyColumn>,
        secondary_key: &[KeyColumn],
        secondary: &Table,
    ) -> Self {
        let lookup = Lookup::build(secondary, |r| extract_key(r, secondary_key));
        Self {
            id: id.into(),
            primary_key,
            lookup,
        }
    }

    pub fn from_config(config: &StrategyConfig, secondary: &Table) -> Self {
        Self::build(
            config.id.clone(),
            config.primary_key.clone(),
            &config.secondary_key,
            secondary,
        )
    }

    /// Secondary row for `record`, if its key is present and indexed.
    pub fn probe(&self, record: &Record) -> Option<usize> {
        let key = extract_key(record, &self.primary_key)?;
        self.lookup.get(&key)
    }
}

/// First strategy (in list order) that links `record`; priority is the only tie-break.
pub fn resolve_row(record: &Record, strategies: &[JoinStrategy]) -> MatchOutcome {
    for strategy in strategies {
        if let Some(row) = strategy.probe(record) {
            return MatchOutcome::Exact {
                strategy: strategy.id.clone(),
                row,
            };
        }
    }
    MatchOutcome::Unmatched
}

/// Run the cascade over every primary row. Output is parallel to `primary.rows`.
pub fn resolve_cascade(
    stage: &str,
    primary: &Table,
    strategies: &[JoinStrategy],
    progress_every: usize,
    reporter: &mut dyn ProgressReporter,
) -> Vec<MatchOutcome> {
    let prior = vec![MatchOutcome::Unmatched; primary.len()];
    extend_cascade(stage, primary, prior, strategies, progress_every, reporter)
}

/// Try `strategies` only on rows still `Unmatched` in `prior`.
///
/// Committed matches are carried through untouched.
pub fn extend_cascade(
    stage: &str,
    primary: &Table,
    prior: Vec<MatchOutcome>,
    strategies: &[JoinStrategy],
    progress_every: usize,
    reporter: &mut dyn ProgressReporter,
) -> Vec<MatchOutcome> {
    debug_assert_eq!(prior.len(), primary.len());
    let checkpoints = Checkpoints::new(stage, Phase::ExactCascade, primary.len(), progress_every);

    prior
        .into_iter()
        .zip(&primary.rows)
        .enumerate()
        .map(|(i, (outcome, record))| {
            let outcome = if outcome.is_unmatched() {
                resolve_row(record, strategies)
            } else {
                outcome
            };
            checkpoints.tick(i + 1, reporter);
            outcome
        })
        .collect()
}
