use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

/// Verb used when a row does not name an action
pub const DEFAULT_ACTION: &str = "tap";

/// One normalized test case
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestCase {
    /// Human-readable label
    pub description: String,

    /// Normalized verb ("tap" when the source row has none)
    pub action: String,

    /// Expected outcome; carried into the report, only checked for crashes
    pub expected: String,
}

impl TestCase {
    pub fn new(
        description: impl Into<String>,
        action: impl Into<String>,
        expected: impl Into<String>,
    ) -> Self {
        Self {
            description: description.into(),
            action: action.into(),
            expected: expected.into(),
        }
    }

    /// Whether the action verb asks for a tap (case-insensitive substring)
    pub fn wants_tap(&self) -> bool {
        self.action.to_lowercase().contains("tap")
    }
}

/// Named group of cases (a sheet of a workbook)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestGroup {
    /// `None` for ungrouped sources
    pub name: Option<String>,
    pub cases: Vec<TestCase>,
}

impl TestGroup {
    pub fn named(name: impl Into<String>, cases: Vec<TestCase>) -> Self {
        Self {
            name: Some(name.into()),
            cases,
        }
    }

    pub fn ungrouped(cases: Vec<TestCase>) -> Self {
        Self { name: None, cases }
    }
}

/// All groups of a source, in source order
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestSuite {
    pub groups: Vec<TestGroup>,
}

impl TestSuite {
    pub fn flat(cases: Vec<TestCase>) -> Self {
        Self {
            groups: vec![TestGroup::ungrouped(cases)],
        }
    }

    pub fn grouped(groups: Vec<TestGroup>) -> Self {
        Self { groups }
    }

    pub fn len(&self) -> usize {
        self.groups.iter().map(|g| g.cases.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Result type for test-case ingestion
pub type SourceResult<T> = Result<T, SourceError>;

/// Ingestion failures. Any of these aborts the run before a case executes.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("cannot read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid CSV in {path}: {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("invalid JSON in {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("cannot read workbook {path}: {source}")]
    Workbook {
        path: PathBuf,
        #[source]
        source: calamine::Error,
    },

    #[error("{path}: {reason}")]
    Layout { path: PathBuf, reason: String },

    #[error("unsupported test-case format: {0} (use .xlsx/.xls/.ods, .csv, .json or a directory of .csv files)")]
    UnsupportedFormat(PathBuf),

    #[error("no test cases found in {0}")]
    Empty(PathBuf),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wants_tap_is_case_insensitive_substring() {
        assert!(TestCase::new("a", "Tap", "").wants_tap());
        assert!(TestCase::new("a", "double-TAP the reels", "").wants_tap());
        assert!(!TestCase::new("a", "swipe left", "").wants_tap());
    }

    #[test]
    fn test_suite_len() {
        let suite = TestSuite::grouped(vec![
            TestGroup::named("Lobby", vec![TestCase::new("a", "tap", "")]),
            TestGroup::named("Slots", vec![TestCase::new("b", "tap", ""), TestCase::new("c", "tap", "")]),
        ]);
        assert_eq!(suite.len(), 3);
        assert!(!suite.is_empty());
        assert!(TestSuite::default().is_empty());
    }
}
