use std::borrow::Cow;
use std::collections::BTreeMap;

use serde::Serialize;

use crate::normalize::format_number;

// ---------------------------------------------------------------------------
// Values + Records
// ---------------------------------------------------------------------------

/// A single cell. `Missing` is distinct from an empty string.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Value {
    Text(String),
    Number(f64),
    Missing,
}

static MISSING: Value = Value::Missing;

impl Value {
    pub fn text(s: impl Into<String>) -> Self {
        Self::Text(s.into())
    }

    pub fn is_missing(&self) -> bool {
        matches!(self, Self::Missing)
    }

    /// Render for output. `Missing` renders as the supplied marker text.
    pub fn render<'a>(&'a self, missing: &'a str) -> Cow<'a, str> {
        match self {
            Self::Text(s) => Cow::Borrowed(s.as_str()),
            Self::Number(n) => Cow::Owned(format_number(*n)),
            Self::Missing => Cow::Borrowed(missing),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Self::Number(n)
    }
}

/// An ordered mapping from column name to value.
///
/// Stages never mutate a record in place; `extended` returns a new one.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Record {
    fields: Vec<(String, Value)>,
}

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_pairs<K, V, I>(pairs: I) -> Self
    where
        K: Into<String>,
        V: Into<Value>,
        I: IntoIterator<Item = (K, V)>,
    {
        Self {
            fields: pairs.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
        }
    }

    pub fn get(&self, column: &str) -> Option<&Value> {
        self.fields.iter().find(|(c, _)| c == column).map(|(_, v)| v)
    }

    /// Value for `column`, or `Missing` when the column is absent.
    pub fn value(&self, column: &str) -> &Value {
        self.get(column).unwrap_or(&MISSING)
    }

    pub fn contains(&self, column: &str) -> bool {
        self.fields.iter().any(|(c, _)| c == column)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(c, _)| c.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.fields.iter().map(|(c, v)| (c.as_str(), v))
    }

    /// A copy of this record with `extra` appended after the existing fields.
    pub fn extended(&self, extra: Vec<(String, Value)>) -> Record {
        let mut fields = Vec::with_capacity(self.fields.len() + extra.len());
        fields.extend(self.fields.iter().cloned());
        fields.extend(extra);
        Record { fields }
    }
}

// ---------------------------------------------------------------------------
// Tables
// ---------------------------------------------------------------------------

/// An ordered sequence of records with a declared schema.
#[derive(Debug, Clone, Default)]
pub struct Table {
    pub name: String,
    pub columns: Vec<String>,
    pub rows: Vec<Record>,
}

impl Table {
    pub fn new(name: impl Into<String>, columns: Vec<String>) -> Self {
        Self {
            name: name.into(),
            columns,
            rows: Vec::new(),
        }
    }

    pub fn with_rows(name: impl Into<String>, columns: Vec<String>, rows: Vec<Record>) -> Self {
        Self {
            name: name.into(),
            columns,
            rows,
        }
    }

    pub fn push(&mut self, record: Record) {
        self.rows.push(record);
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn has_column(&self, column: &str) -> bool {
        self.columns.iter().any(|c| c == column)
    }
}

// ---------------------------------------------------------------------------
// Join keys
// ---------------------------------------------------------------------------

/// Separator between composite key parts. Not expected in source data.
pub const KEY_DELIMITER: char = '\u{1f}';

/// One or more normalized, non-missing values joined by [`KEY_DELIMITER`].
///
/// A missing key is represented as `None` wherever keys are extracted, so a
/// `JoinKey` never compares equal to another record's missing key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct JoinKey(String);

impl JoinKey {
    pub fn from_parts<S: AsRef<str>>(parts: &[S]) -> Self {
        let mut key = String::new();
        for (i, part) in parts.iter().enumerate() {
            if i > 0 {
                key.push(KEY_DELIMITER);
            }
            key.push_str(part.as_ref());
        }
        Self(key)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

// ---------------------------------------------------------------------------
// Match outcomes
// ---------------------------------------------------------------------------

/// Similarity in [0, 1]; 1 means identical normalized strings.
pub type SimilarityScore = f64;

/// Result of linking one primary row in one stage.
///
/// `row` is the index of the matched record in the stage's secondary table.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MatchOutcome {
    Unmatched,
    Exact { strategy: String, row: usize },
    Fuzzy { score: SimilarityScore, key: String, row: usize },
}

impl MatchOutcome {
    pub fn is_unmatched(&self) -> bool {
        matches!(self, Self::Unmatched)
    }

    pub fn secondary_row(&self) -> Option<usize> {
        match self {
            Self::Unmatched => None,
            Self::Exact { row, .. } | Self::Fuzzy { row, .. } => Some(*row),
        }
    }
}

// ---------------------------------------------------------------------------
// Summary + Output
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StrategyCount {
    pub strategy: String,
    pub matched: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct StageSummary {
    pub stage: String,
    pub source: String,
    pub total_rows: usize,
    pub exact: Vec<StrategyCount>,
    pub fuzzy_matched: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mean_fuzzy_score: Option<f64>,
    pub unmatched: usize,
    pub matched_pct: f64,
}

impl StageSummary {
    pub fn exact_matched(&self) -> usize {
        self.exact.iter().map(|s| s.matched).sum()
    }

    pub fn matched(&self) -> usize {
        self.exact_matched() + self.fuzzy_matched
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub total_rows: usize,
    pub total_columns: usize,
    pub stages: Vec<StageSummary>,
    pub breakdown: BTreeMap<String, BTreeMap<String, usize>>,
    pub distinct: BTreeMap<String, usize>,
}

#[derive(Debug, Clone, Serialize)]
pub struct LinkMeta {
    pub config_name: String,
    pub engine_version: String,
    pub run_at: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct LinkReport {
    pub meta: LinkMeta,
    pub summary: RunSummary,
}

/// Pre-loaded tables: the primary table plus secondary tables by source name.
pub struct LinkInput {
    pub primary: Table,
    pub sources: std::collections::HashMap<String, Table>,
}

/// Final merged table, per-stage outcomes (one per primary row), and report.
pub struct LinkResult {
    pub table: Table,
    pub outcomes: Vec<Vec<MatchOutcome>>,
    pub report: LinkReport,
}
