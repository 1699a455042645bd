//! Key normalization: raw cell values into comparable keys.
//!
//! Every function here is pure and idempotent. Anything that is empty after
//! trimming, or that fails to parse for its kind, becomes `Value::Missing`.

use serde::{Deserialize, Serialize};

use crate::config::KeyColumn;
use crate::model::{JoinKey, Record, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum KeyKind {
    /// Trim only. Identifiers such as ISINs or internal IDs.
    #[default]
    Text,
    /// Trim + lowercase. Company and security names.
    Name,
    /// Trim + uppercase. Tickers and exchange symbols.
    Code,
    /// Canonical number string. Non-numeric input is missing.
    Numeric,
}

impl std::fmt::Display for KeyKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Text => write!(f, "text"),
            Self::Name => write!(f, "name"),
            Self::Code => write!(f, "code"),
            Self::Numeric => write!(f, "numeric"),
        }
    }
}

/// Normalize a single value for use as (part of) a key.
pub fn normalize(value: &Value, kind: KeyKind) -> Value {
    let raw = match value {
        Value::Missing => return Value::Missing,
        Value::Number(n) if !n.is_finite() => return Value::Missing,
        Value::Number(n) => format_number(*n),
        Value::Text(s) => s.clone(),
    };

    let normalized = match kind {
        KeyKind::Text => Some(raw.trim().to_string()),
        KeyKind::Name => Some(raw.trim().to_lowercase().trim().to_string()),
        KeyKind::Code => Some(raw.trim().to_uppercase().trim().to_string()),
        KeyKind::Numeric => canonical_number(&raw),
    };

    match normalized {
        Some(s) if !s.is_empty() => Value::Text(s),
        _ => Value::Missing,
    }
}

/// Normalized key text, or `None` when the value is missing.
pub fn normalize_text(value: &Value, kind: KeyKind) -> Option<String> {
    match normalize(value, kind) {
        Value::Text(s) => Some(s),
        _ => None,
    }
}

/// Extract a (possibly composite) join key from a record.
///
/// Returns `None` if any component is missing: partial composite keys never match.
pub fn extract_key(record: &Record, columns: &[KeyColumn]) -> Option<JoinKey> {
    if columns.is_empty() {
        return None;
    }
    let mut parts = Vec::with_capacity(columns.len());
    for col in columns {
        parts.push(normalize_text(record.value(&col.column), col.kind)?);
    }
    Some(JoinKey::from_parts(&parts))
}

/// Canonical string form of a numeric identifier.
///
/// Works on the decimal text itself, so every significant digit survives:
/// leading integer zeros and trailing fractional zeros are dropped, `-0`
/// becomes `0`. Anything not shaped like `-?digits(.digits)?` is rejected.
pub fn canonical_number(raw: &str) -> Option<String> {
    let s = raw.trim();
    let (negative, unsigned) = match s.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, s),
    };
    let (int_part, frac_part) = match unsigned.split_once('.') {
        Some((int_part, frac_part)) => (int_part, Some(frac_part)),
        None => (unsigned, None),
    };

    let all_digits = |part: &str| !part.is_empty() && part.bytes().all(|b| b.is_ascii_digit());
    if !all_digits(int_part) || !frac_part.map_or(true, all_digits) {
        return None;
    }

    let int_part = match int_part.trim_start_matches('0') {
        "" => "0",
        trimmed => trimmed,
    };
    let frac_part = frac_part.map_or("", |f| f.trim_end_matches('0'));

    let mut out = String::with_capacity(int_part.len() + frac_part.len() + 2);
    if negative && !(int_part == "0" && frac_part.is_empty()) {
        out.push('-');
    }
    out.push_str(int_part);
    if !frac_part.is_empty() {
        out.push('.');
        out.push_str(frac_part);
    }
    Some(out)
}

/// Format a float without a trailing `.0` when it holds an integer.
pub fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{n}")
    }
}
