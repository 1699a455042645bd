//! String-level CSV helpers for loaders and writers. No filesystem access.

use std::collections::HashSet;

use crate::error::LinkageError;
use crate::model::{Record, Table, Value};

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// Decode file bytes: UTF-8 (BOM stripped), falling back to Windows-1252.
pub fn decode_bytes(bytes: &[u8]) -> String {
    let bytes = bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes);
    match std::str::from_utf8(bytes) {
        Ok(s) => s.to_string(),
        Err(_) => {
            let (decoded, _, _) = encoding_rs::WINDOWS_1252.decode(bytes);
            decoded.into_owned()
        }
    }
}

/// Parse CSV text with a header row. Every cell loads as text.
///
/// Short rows are padded with `Missing`; extra cells beyond the header are dropped.
pub fn load_csv_table(name: &str, csv_data: &str) -> Result<Table, LinkageError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(csv_data.as_bytes());

    let headers: Vec<String> = reader
        .headers()
        .map_err(|e| LinkageError::Csv(format!("{name}: {e}")))?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();

    let mut seen = HashSet::new();
    if let Some(dup) = headers.iter().find(|h| !seen.insert(h.as_str())) {
        return Err(LinkageError::Csv(format!("{name}: duplicate column '{dup}'")));
    }

    let mut table = Table::new(name, headers.clone());
    for record in reader.records() {
        let record = record.map_err(|e| LinkageError::Csv(format!("{name}: {e}")))?;
        let row = Record::from_pairs(headers.iter().enumerate().map(|(i, h)| {
            let value = record
                .get(i)
                .map(Value::text)
                .unwrap_or(Value::Missing);
            (h.clone(), value)
        }));
        table.push(row);
    }

    Ok(table)
}

/// Serialize `columns` of `table` as CSV. Missing values are written as `missing`.
pub fn write_csv_table(table: &Table, columns: &[String], missing: &str) -> Result<String, LinkageError> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer
        .write_record(columns)
        .map_err(|e| LinkageError::Csv(e.to_string()))?;
    for record in &table.rows {
        writer
            .write_record(columns.iter().map(|c| record.value(c).render(missing).into_owned()))
            .map_err(|e| LinkageError::Csv(e.to_string()))?;
    }
    let bytes = writer
        .into_inner()
        .map_err(|e| LinkageError::Csv(e.to_string()))?;
    String::from_utf8(bytes).map_err(|e| LinkageError::Csv(e.to_string()))
}

/// Preferred columns that exist (in order), then the rest of the schema, minus `exclude`.
pub fn select_output_columns(table: &Table, preferred: &[String], exclude: &[String]) -> Vec<String> {
    let excluded: HashSet<&str> = exclude.iter().map(String::as_str).collect();
    let mut chosen: Vec<String> = Vec::with_capacity(table.columns.len());
    let mut taken = HashSet::new();

    let ordered = preferred
        .iter()
        .filter(|c| table.has_column(c))
        .chain(table.columns.iter());
    for column in ordered {
        if excluded.contains(column.as_str()) || !taken.insert(column.as_str()) {
            continue;
        }
        chosen.push(column.clone());
    }
    chosen
}
