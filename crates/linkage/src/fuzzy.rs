//! Approximate (edit-distance) fallback for rows the exact cascade left unmatched.
//!
//! Cost is bounded by distinct keys, not rows: every distinct unmatched
//! primary key is scored against the distinct secondary keys exactly once,
//! and the cached result is broadcast to each row carrying that key.
//!
//! No threshold is applied here. Every scored row gets its best candidate,
//! however weak; acceptance is left to whoever reads the scores.

use std::collections::{HashMap, HashSet};

use crate::config::{FuzzyConfig, KeyColumn};
use crate::dedup::Lookup;
use crate::model::{JoinKey, MatchOutcome, SimilarityScore, Table};
use crate::normalize::{extract_key, normalize_text};
use crate::progress::{Checkpoints, Phase, ProgressReporter};

/// `1 - levenshtein(a, b) / max(len(a), len(b))`, lengths in chars, denominator floored at 1.
pub fn similarity(a: &str, b: &str) -> SimilarityScore {
    let longest = a.chars().count().max(b.chars().count()).max(1);
    let distance = strsim::levenshtein(a, b);
    1.0 - distance as f64 / longest as f64
}

#[derive(Debug, Clone, PartialEq)]
pub struct FuzzyCandidate {
    pub key: String,
    pub score: SimilarityScore,
}

/// Best-candidate search over a fixed set of secondary keys, cached per query key.
#[derive(Debug, Default)]
pub struct ApproximateMatcher {
    candidates: Vec<String>,
    cache: HashMap<String, Option<FuzzyCandidate>>,
    comparisons: usize,
}

impl ApproximateMatcher {
    /// Candidate keys are deduplicated, keeping first-encounter order.
    pub fn new<I, S>(keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut seen = HashSet::new();
        let candidates = keys
            .into_iter()
            .map(Into::into)
            .filter(|k: &String| seen.insert(k.clone()))
            .collect();
        Self {
            candidates,
            cache: HashMap::new(),
            comparisons: 0,
        }
    }

    pub fn candidates(&self) -> &[String] {
        &self.candidates
    }

    /// Highest-similarity candidate for `key`. Ties go to the earliest candidate.
    pub fn best_match(&mut self, key: &str) -> Option<FuzzyCandidate> {
        if let Some(hit) = self.cache.get(key) {
            return hit.clone();
        }
        let best = self.score_all(key);
        self.cache.insert(key.to_string(), best.clone());
        best
    }

    fn score_all(&mut self, key: &str) -> Option<FuzzyCandidate> {
        let mut best: Option<(usize, SimilarityScore)> = None;
        for (i, candidate) in self.candidates.iter().enumerate() {
            let score = similarity(key, candidate);
            self.comparisons += 1;
            match best {
                Some((_, top)) if score <= top => {}
                _ => best = Some((i, score)),
            }
        }
        best.map(|(i, score)| FuzzyCandidate {
            key: self.candidates[i].clone(),
            score,
        })
    }

    /// Number of similarity evaluations performed so far.
    pub fn comparisons(&self) -> usize {
        self.comparisons
    }

    /// Number of distinct query keys scored so far.
    pub fn cached_keys(&self) -> usize {
        self.cache.len()
    }
}

/// Fill `Unmatched` entries of `prior` with fuzzy matches against `secondary`.
///
/// Rows already matched, and rows whose fuzzy key is missing, are left as-is.
/// A fuzzy match points at the first secondary row carrying the winning key.
pub fn resolve_fuzzy(
    stage: &str,
    primary: &Table,
    prior: Vec<MatchOutcome>,
    config: &FuzzyConfig,
    secondary: &Table,
    progress_every: usize,
    reporter: &mut dyn ProgressReporter,
) -> Vec<MatchOutcome> {
    debug_assert_eq!(prior.len(), primary.len());

    let secondary_key: [KeyColumn; 1] = [config.secondary.clone()];
    let lookup = Lookup::build(secondary, |r| extract_key(r, &secondary_key));
    let mut matcher = ApproximateMatcher::new(lookup.kept_rows().iter().filter_map(|&i| {
        normalize_text(secondary.rows[i].value(&config.secondary.column), config.secondary.kind)
    }));

    let keys: Vec<Option<String>> = prior
        .iter()
        .zip(&primary.rows)
        .map(|(outcome, record)| {
            if outcome.is_unmatched() {
                normalize_text(record.value(&config.primary.column), config.primary.kind)
            } else {
                None
            }
        })
        .collect();

    let mut seen = HashSet::new();
    let distinct: Vec<&str> = keys
        .iter()
        .flatten()
        .map(String::as_str)
        .filter(|k| seen.insert(*k))
        .collect();

    let checkpoints = Checkpoints::new(stage, Phase::Fuzzy, distinct.len(), progress_every);
    for (i, key) in distinct.iter().enumerate() {
        matcher.best_match(key);
        checkpoints.tick(i + 1, reporter);
    }

    log::debug!(
        "stage '{stage}': fuzzy scored {} distinct key(s) against {} candidate(s), {} comparison(s)",
        matcher.cached_keys(),
        matcher.candidates().len(),
        matcher.comparisons()
    );

    prior
        .into_iter()
        .zip(keys)
        .map(|(outcome, key)| {
            let Some(key) = key else {
                return outcome;
            };
            let Some(best) = matcher.best_match(&key) else {
                return outcome;
            };
            let row = lookup.get(&JoinKey::from_parts(&[best.key.as_str()]));
            match row {
                Some(row) => MatchOutcome::Fuzzy {
                    score: best.score,
                    key: best.key,
                    row,
                },
                None => outcome,
            }
        })
        .collect()
}
