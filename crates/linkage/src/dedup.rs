use std::collections::hash_map::Entry;
use std::collections::HashMap;

use crate::model::{JoinKey, Record, Table};

/// First-occurrence index of a table by join key.
///
/// Rows whose key is missing are never indexed; later rows repeating a key
/// are unreachable through the lookup.
#[derive(Debug, Clone, Default)]
pub struct Lookup {
    index: HashMap<JoinKey, usize>,
    kept: Vec<usize>,
}

impl Lookup {
    /// Single pass over `table` in input order.
    pub fn build<F>(table: &Table, mut key_of: F) -> Self
    where
        F: FnMut(&Record) -> Option<JoinKey>,
    {
        let mut index = HashMap::with_capacity(table.len());
        let mut kept = Vec::new();

        for (i, record) in table.rows.iter().enumerate() {
            let Some(key) = key_of(record) else {
                continue;
            };
            if let Entry::Vacant(slot) = index.entry(key) {
                slot.insert(i);
                kept.push(i);
            }
        }

        Self { index, kept }
    }

    /// Row index (in the source table) of the first record bearing `key`.
    pub fn get(&self, key: &JoinKey) -> Option<usize> {
        self.index.get(key).copied()
    }

    /// Source row indices that survived deduplication, in input order.
    pub fn kept_rows(&self) -> &[usize] {
        &self.kept
    }

    pub fn len(&self) -> usize {
        self.kept.len()
    }

    pub fn is_empty(&self) -> bool {
        self.kept.is_empty()
    }
}

/// The reduced table: the first record for each distinct non-missing key.
pub fn dedup_table<F>(table: &Table, key_of: F) -> Table
where
    F: FnMut(&Record) -> Option<JoinKey>,
{
    let lookup = Lookup::build(table, key_of);
    let rows = lookup
        .kept_rows()
        .iter()
        .map(|&i| table.rows[i].clone())
        .collect();
    Table::with_rows(table.name.clone(), table.columns.clone(), rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::KeyColumn;
    use crate::normalize::{extract_key, KeyKind};

    fn isin_table(rows: &[(&str, &str)]) -> Table {
        Table::with_rows(
            "master",
            vec!["ISIN".into(), "Name".into()],
            rows.iter()
                .map(|(isin, name)| Record::from_pairs([("ISIN", *isin), ("Name", *name)]))
                .collect(),
        )
    }

    fn isin_key() -> Vec<KeyColumn> {
        vec![KeyColumn::new("ISIN", KeyKind::Text)]
    }

    #[test]
    fn keeps_first_occurrence() {
        let table = isin_table(&[
            ("AU000002", "a"),
            ("AU000003", "b"),
            ("AU000001", "row 3"),
            ("AU000004", "c"),
            ("AU000001", "row 9"),
        ]);
        let key = isin_key();
        let lookup = Lookup::build(&table, |r| extract_key(r, &key));
        assert_eq!(lookup.len(), 4);
        let hit = lookup.get(&JoinKey::from_parts(&["AU000001"])).unwrap();
        assert_eq!(hit, 2);
        assert_eq!(table.rows[hit].value("Name"), &"row 3".into());
    }

    #[test]
    fn missing_keys_are_dropped() {
        let table = isin_table(&[("", "blank"), ("  ", "space"), ("AU1", "ok")]);
        let key = isin_key();
        let reduced = dedup_table(&table, |r| extract_key(r, &key));
        assert_eq!(reduced.len(), 1);
        assert_eq!(reduced.rows[0].value("Name"), &"ok".into());
        assert_eq!(reduced.columns, table.columns);
    }

    #[test]
    fn whitespace_variants_collapse_to_first() {
        let table = isin_table(&[(" AU1", "first"), ("AU1 ", "second")]);
        let key = isin_key();
        let reduced = dedup_table(&table, |r| extract_key(r, &key));
        assert_eq!(reduced.len(), 1);
        assert_eq!(reduced.rows[0].value("Name"), &"first".into());
    }

    #[test]
    fn empty_table() {
        let table = isin_table(&[]);
        let key = isin_key();
        let lookup = Lookup::build(&table, |r| extract_key(r, &key));
        assert!(lookup.is_empty());
    }
}
