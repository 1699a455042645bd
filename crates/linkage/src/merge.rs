use std::collections::HashSet;

use crate::error::LinkageError;
use crate::model::{MatchOutcome, Record, Table, Value};

/// Column block a stage appends to every primary row.
#[derive(Debug, Clone)]
pub struct MergePlan {
    pub prefix: String,
    /// Allow-listed columns present in the secondary schema, in allow-list order.
    pub columns: Vec<String>,
    pub provenance: bool,
}

impl MergePlan {
    /// Keep the allow-listed columns that exist in `secondary`; absent ones are skipped.
    pub fn new(prefix: &str, allow_list: &[String], secondary: &Table, provenance: bool) -> Self {
        let mut columns: Vec<String> = Vec::with_capacity(allow_list.len());
        for column in allow_list {
            if !secondary.has_column(column) {
                log::warn!(
                    "source '{}' has no column '{column}'; skipping it",
                    secondary.name
                );
                continue;
            }
            if !columns.contains(column) {
                columns.push(column.clone());
            }
        }
        Self {
            prefix: prefix.to_string(),
            columns,
            provenance,
        }
    }

    /// Output column names in the order they are appended.
    pub fn output_columns(&self) -> Vec<String> {
        let mut out: Vec<String> = self
            .columns
            .iter()
            .map(|c| format!("{}{c}", self.prefix))
            .collect();
        if self.provenance {
            out.push(format!("{}match_method", self.prefix));
            out.push(format!("{}match_score", self.prefix));
        }
        out
    }

    /// Values to append for one primary row.
    ///
    /// Unmatched rows get `Missing` for every column, so the schema is uniform.
    pub fn values(&self, outcome: &MatchOutcome, secondary: &Table) -> Vec<(String, Value)> {
        let matched = outcome.secondary_row().and_then(|row| secondary.rows.get(row));

        let mut out: Vec<(String, Value)> = self
            .columns
            .iter()
            .map(|c| {
                let value = matched.map(|r| r.value(c).clone()).unwrap_or(Value::Missing);
                (format!("{}{c}", self.prefix), value)
            })
            .collect();

        if self.provenance {
            let (method, score) = match outcome {
                MatchOutcome::Unmatched => (Value::Missing, Value::Missing),
                MatchOutcome::Exact { strategy, .. } => {
                    (Value::text(strategy.as_str()), Value::Number(1.0))
                }
                MatchOutcome::Fuzzy { score, .. } => (Value::text("fuzzy"), Value::Number(*score)),
            };
            out.push((format!("{}match_method", self.prefix), method));
            out.push((format!("{}match_score", self.prefix), score));
        }

        out
    }
}

/// Left-preserving merge: one output row per primary row, same order, columns appended.
pub fn merge_stage(
    stage: &str,
    primary: &Table,
    outcomes: &[MatchOutcome],
    secondary: &Table,
    plan: &MergePlan,
) -> Result<Table, LinkageError> {
    let added = plan.output_columns();
    let mut seen = HashSet::new();
    if let Some(column) = added
        .iter()
        .find(|c| primary.has_column(c) || !seen.insert(c.as_str()))
    {
        return Err(LinkageError::ColumnCollision {
            stage: stage.to_string(),
            column: column.clone(),
        });
    }

    let mut columns = primary.columns.clone();
    columns.extend(added);

    let rows: Vec<Record> = primary
        .rows
        .iter()
        .zip(outcomes)
        .map(|(record, outcome)| record.extended(plan.values(outcome, secondary)))
        .collect();

    Ok(Table::with_rows(primary.name.clone(), columns, rows))
}
