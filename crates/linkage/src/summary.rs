use std::collections::{BTreeMap, HashSet};

use crate::model::{MatchOutcome, StageSummary, StrategyCount, Table, Value};

/// Label used in breakdowns for missing or empty values.
pub const UNMATCHED_LABEL: &str = "(unmatched/empty)";

/// Match-rate statistics for one stage.
pub fn compute_stage_summary(
    stage: &str,
    source: &str,
    strategy_ids: &[String],
    outcomes: &[MatchOutcome],
) -> StageSummary {
    let mut exact: Vec<StrategyCount> = strategy_ids
        .iter()
        .map(|id| StrategyCount {
            strategy: id.clone(),
            matched: 0,
        })
        .collect();
    let mut fuzzy_matched = 0;
    let mut fuzzy_total = 0.0;
    let mut unmatched = 0;

    for outcome in outcomes {
        match outcome {
            MatchOutcome::Unmatched => unmatched += 1,
            MatchOutcome::Exact { strategy, .. } => {
                if let Some(count) = exact.iter_mut().find(|c| &c.strategy == strategy) {
                    count.matched += 1;
                }
            }
            MatchOutcome::Fuzzy { score, .. } => {
                fuzzy_matched += 1;
                fuzzy_total += score;
            }
        }
    }

    let total_rows = outcomes.len();
    let matched = total_rows - unmatched;

    StageSummary {
        stage: stage.to_string(),
        source: source.to_string(),
        total_rows,
        exact,
        fuzzy_matched,
        mean_fuzzy_score: (fuzzy_matched > 0).then(|| fuzzy_total / fuzzy_matched as f64),
        unmatched,
        matched_pct: percent(matched, total_rows),
    }
}

/// Value counts per column, keys sorted. Missing and empty values share one label.
pub fn compute_breakdown(table: &Table, columns: &[String]) -> BTreeMap<String, BTreeMap<String, usize>> {
    let mut out = BTreeMap::new();
    for column in columns {
        if !table.has_column(column) {
            log::warn!("breakdown column '{column}' not in output; skipping");
            continue;
        }
        let mut counts: BTreeMap<String, usize> = BTreeMap::new();
        for record in &table.rows {
            let label = match record.value(column) {
                Value::Missing => UNMATCHED_LABEL.to_string(),
                v => {
                    let text = v.render("");
                    if text.is_empty() {
                        UNMATCHED_LABEL.to_string()
                    } else {
                        text.into_owned()
                    }
                }
            };
            *counts.entry(label).or_insert(0) += 1;
        }
        out.insert(column.clone(), counts);
    }
    out
}

/// Distinct non-missing values per column.
pub fn compute_distinct(table: &Table, columns: &[String]) -> BTreeMap<String, usize> {
    let mut out = BTreeMap::new();
    for column in columns {
        if !table.has_column(column) {
            log::warn!("distinct column '{column}' not in output; skipping");
            continue;
        }
        let distinct: HashSet<String> = table
            .rows
            .iter()
            .map(|r| r.value(column))
            .filter(|v| !v.is_missing())
            .map(|v| v.render("").into_owned())
            .collect();
        out.insert(column.clone(), distinct.len());
    }
    out
}

pub(crate) fn percent(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        0.0
    } else {
        100.0 * part as f64 / whole as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Record;

    fn exact(id: &str) -> MatchOutcome {
        MatchOutcome::Exact {
            strategy: id.into(),
            row: 0,
        }
    }

    #[test]
    fn stage_counts() {
        let outcomes = vec![
            exact("isin"),
            exact("symbol"),
            exact("isin"),
            MatchOutcome::Fuzzy {
                score: 0.5,
                key: "k".into(),
                row: 0,
            },
            MatchOutcome::Fuzzy {
                score: 1.0,
                key: "k".into(),
                row: 0,
            },
            MatchOutcome::Unmatched,
        ];
        let ids = vec!["isin".to_string(), "symbol".to_string()];
        let s = compute_stage_summary("mc", "master", &ids, &outcomes);
        assert_eq!(s.total_rows, 6);
        assert_eq!(s.exact[0].matched, 2);
        assert_eq!(s.exact[1].matched, 1);
        assert_eq!(s.exact_matched(), 3);
        assert_eq!(s.fuzzy_matched, 2);
        assert_eq!(s.mean_fuzzy_score, Some(0.75));
        assert_eq!(s.unmatched, 1);
        assert_eq!(s.matched(), 5);
        assert!((s.matched_pct - 500.0 / 6.0).abs() < 1e-9);
    }

    #[test]
    fn empty_stage() {
        let s = compute_stage_summary("mc", "master", &[], &[]);
        assert_eq!(s.matched_pct, 0.0);
        assert_eq!(s.mean_fuzzy_score, None);
    }

    #[test]
    fn breakdown_groups_missing_and_empty() {
        let table = Table::with_rows(
            "out",
            vec!["Status".into()],
            vec![
                Record::from_pairs([("Status", Value::text("Listed"))]),
                Record::from_pairs([("Status", Value::text(""))]),
                Record::from_pairs([("Status", Value::Missing)]),
                Record::from_pairs([("Status", Value::text("Listed"))]),
            ],
        );
        let b = compute_breakdown(&table, &["Status".to_string(), "Nope".to_string()]);
        assert_eq!(b.len(), 1);
        let counts = &b["Status"];
        assert_eq!(counts["Listed"], 2);
        assert_eq!(counts[UNMATCHED_LABEL], 2);
    }

    #[test]
    fn distinct_ignores_missing() {
        let table = Table::with_rows(
            "out",
            vec!["Gcode".into()],
            vec![
                Record::from_pairs([("Gcode", Value::text("g1"))]),
                Record::from_pairs([("Gcode", Value::text("g1"))]),
                Record::from_pairs([("Gcode", Value::text("g2"))]),
                Record::from_pairs([("Gcode", Value::Missing)]),
            ],
        );
        let d = compute_distinct(&table, &["Gcode".to_string()]);
        assert_eq!(d["Gcode"], 2);
    }
}
