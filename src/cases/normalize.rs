//! Row normalization: loosely-typed spreadsheet rows to strict `TestCase`s.
//!
//! Column names are matched case-insensitively, ignoring surrounding spaces
//! and treating `_` like a space, against a fixed priority list of synonyms.
//! The first synonym with a non-empty value wins.

use std::collections::BTreeMap;

use super::types::{DEFAULT_ACTION, TestCase};

/// Synonyms for the action column, highest priority first
pub const ACTION_COLUMNS: &[&str] = &["action", "step", "test step", "description"];

/// Synonyms for the description column
pub const DESCRIPTION_COLUMNS: &[&str] = &["description", "test case"];

/// Synonyms for the expected-outcome column
pub const EXPECTED_COLUMNS: &[&str] = &["expected result", "expected", "result", "value"];

/// A source row keyed by normalized column name
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawRow {
    cells: BTreeMap<String, String>,
}

impl RawRow {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a cell; a repeated column keeps its first non-empty value
    pub fn insert(&mut self, column: &str, value: impl Into<String>) {
        let value = value.into().trim().to_string();
        let key = normalize_column(column);
        match self.cells.get(&key) {
            Some(existing) if !existing.is_empty() => {}
            _ => {
                self.cells.insert(key, value);
            }
        }
    }

    pub fn get(&self, column: &str) -> Option<&str> {
        self.cells.get(&normalize_column(column)).map(String::as_str)
    }

    /// First non-empty value among `columns`
    pub fn first_of(&self, columns: &[&str]) -> Option<&str> {
        columns
            .iter()
            .filter_map(|c| self.get(c))
            .find(|v| !v.is_empty())
    }

    pub fn is_blank(&self) -> bool {
        self.cells.values().all(|v| v.is_empty())
    }
}

impl<K: AsRef<str>, V: Into<String>> FromIterator<(K, V)> for RawRow {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut row = RawRow::new();
        for (k, v) in iter {
            row.insert(k.as_ref(), v);
        }
        row
    }
}

/// Canonical form of a column header
pub fn normalize_column(name: &str) -> String {
    name.trim()
        .to_lowercase()
        .replace('_', " ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Build a test case from a row; `None` for blank rows
pub fn normalize_row(row: &RawRow) -> Option<TestCase> {
    if row.is_blank() {
        return None;
    }

    Some(TestCase {
        description: row.first_of(DESCRIPTION_COLUMNS).unwrap_or_default().to_string(),
        action: row.first_of(ACTION_COLUMNS).unwrap_or(DEFAULT_ACTION).to_string(),
        expected: row.first_of(EXPECTED_COLUMNS).unwrap_or_default().to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_normalize_column() {
        assert_eq!(normalize_column("  Expected_Result "), "expected result");
        assert_eq!(normalize_column("Test   Case"), "test case");
        assert_eq!(normalize_column("ACTION"), "action");
    }

    #[test]
    fn test_action_defaults_to_tap() {
        let row: RawRow = [("Test Case", "Open lobby"), ("Expected", "lobby shown")]
            .into_iter()
            .collect();
        assert_eq!(
            normalize_row(&row),
            Some(TestCase::new("Open lobby", "tap", "lobby shown"))
        );
    }

    #[test]
    fn test_action_priority_and_description_fallback() {
        let row: RawRow = [
            ("Description", "Spin once"),
            ("Test_Step", "tap spin"),
            ("Step", ""),
            ("Expected Result", "reels spin"),
            ("Expected", "ignored"),
        ]
        .into_iter()
        .collect();

        let case = normalize_row(&row).unwrap();
        assert_eq!(case.action, "tap spin");
        assert_eq!(case.description, "Spin once");
        assert_eq!(case.expected, "reels spin");
    }

    #[test]
    fn test_description_doubles_as_action() {
        let row: RawRow = [("description", "Tap the collect button")].into_iter().collect();
        let case = normalize_row(&row).unwrap();
        assert_eq!(case.action, "Tap the collect button");
        assert_eq!(case.expected, "");
    }

    #[test]
    fn test_blank_row_is_skipped() {
        let row: RawRow = [("action", " "), ("expected", "")].into_iter().collect();
        assert_eq!(normalize_row(&row), None);
    }
}
