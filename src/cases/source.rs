//! Test-case sources.
//!
//! - spreadsheet (`.xlsx`, `.xlsm`, `.xlsb`, `.xls`, `.ods`): every worksheet
//!   is a group named after the sheet, in workbook order; the first row of a
//!   sheet holds the headers
//! - `.csv` file: one ungrouped sequence
//! - `.json` file: an array of row objects (ungrouped) or an object mapping
//!   group names to arrays of rows (grouped, in file order)
//! - directory: every `*.csv` inside is a group named after its file stem,
//!   ordered by file name, like the sheets of a workbook

use std::fs;
use std::path::{Path, PathBuf};

use calamine::{Data, Reader, open_workbook_auto};
use serde_json::Value;
use tracing::{debug, info};

use super::normalize::{RawRow, normalize_row};
use super::types::{SourceError, SourceResult, TestCase, TestGroup, TestSuite};

/// Load and normalize every test case at `path`
pub fn load(path: &Path) -> SourceResult<TestSuite> {
    let suite = if path.is_dir() {
        load_directory(path)?
    } else {
        match extension(path).as_deref() {
            Some("xlsx" | "xlsm" | "xlsb" | "xls" | "ods") => load_workbook(path)?,
            Some("csv") => TestSuite::flat(load_csv(path)?),
            Some("json") => load_json(path)?,
            _ => return Err(SourceError::UnsupportedFormat(path.to_path_buf())),
        }
    };

    if suite.is_empty() {
        return Err(SourceError::Empty(path.to_path_buf()));
    }

    info!(
        path = %path.display(),
        groups = suite.groups.len(),
        cases = suite.len(),
        "loaded test cases"
    );
    Ok(suite)
}

fn extension(path: &Path) -> Option<String> {
    path.extension().map(|e| e.to_string_lossy().to_lowercase())
}

/// Rows of one CSV file (header row required)
pub fn load_csv(path: &Path) -> SourceResult<Vec<TestCase>> {
    let csv_err = |source| SourceError::Csv {
        path: path.to_path_buf(),
        source,
    };

    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(csv_err)?;
    let headers = reader.headers().map_err(csv_err)?.clone();

    let mut cases = Vec::new();
    for record in reader.records() {
        let record = record.map_err(csv_err)?;
        let row: RawRow = headers.iter().zip(record.iter()).collect();
        cases.extend(normalize_row(&row));
    }

    debug!(path = %path.display(), cases = cases.len(), "read CSV");
    Ok(cases)
}

/// One group per worksheet, in workbook order
pub fn load_workbook(path: &Path) -> SourceResult<TestSuite> {
    let workbook_err = |source| SourceError::Workbook {
        path: path.to_path_buf(),
        source,
    };

    let mut workbook = open_workbook_auto(path).map_err(workbook_err)?;
    let mut groups = Vec::new();
    for name in workbook.sheet_names() {
        let range = workbook.worksheet_range(&name).map_err(workbook_err)?;
        let mut rows = range.rows();
        let Some(header) = rows.next() else {
            debug!(sheet = %name, "skipping empty sheet");
            continue;
        };
        let headers: Vec<String> = header.iter().map(sheet_cell_text).collect();

        let mut cases = Vec::new();
        for row in rows {
            let raw: RawRow = headers
                .iter()
                .zip(row.iter().map(sheet_cell_text))
                .collect();
            cases.extend(normalize_row(&raw));
        }
        debug!(sheet = %name, cases = cases.len(), "read worksheet");
        groups.push(TestGroup::named(name, cases));
    }
    Ok(TestSuite::grouped(groups))
}

/// Spreadsheet cell as text; whole numbers lose their `.0`
fn sheet_cell_text(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) => s.clone(),
        Data::Float(f) if f.fract() == 0.0 && f.abs() < 1e15 => format!("{}", *f as i64),
        other => other.to_string(),
    }
}

fn load_json(path: &Path) -> SourceResult<TestSuite> {
    let text = fs::read_to_string(path).map_err(|source| SourceError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let value: Value = serde_json::from_str(&text).map_err(|source| SourceError::Json {
        path: path.to_path_buf(),
        source,
    })?;

    match value {
        Value::Array(rows) => Ok(TestSuite::flat(json_rows(path, &rows)?)),
        Value::Object(groups) => {
            let mut out = Vec::with_capacity(groups.len());
            for (name, rows) in groups {
                let rows = rows.as_array().ok_or_else(|| SourceError::Layout {
                    path: path.to_path_buf(),
                    reason: format!("group '{}' is not an array of rows", name),
                })?;
                out.push(TestGroup::named(name, json_rows(path, rows)?));
            }
            Ok(TestSuite::grouped(out))
        }
        _ => Err(SourceError::Layout {
            path: path.to_path_buf(),
            reason: "expected an array of rows or an object of groups".to_string(),
        }),
    }
}

fn json_rows(path: &Path, rows: &[Value]) -> SourceResult<Vec<TestCase>> {
    let mut cases = Vec::with_capacity(rows.len());
    for (idx, row) in rows.iter().enumerate() {
        let obj = row.as_object().ok_or_else(|| SourceError::Layout {
            path: path.to_path_buf(),
            reason: format!("row {} is not an object", idx + 1),
        })?;
        let raw: RawRow = obj
            .iter()
            .map(|(k, v)| (k.as_str(), cell_text(v)))
            .collect();
        cases.extend(normalize_row(&raw));
    }
    Ok(cases)
}

/// Spreadsheet-style text for a JSON cell; null is an empty cell
fn cell_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn load_directory(dir: &Path) -> SourceResult<TestSuite> {
    let io_err = |source| SourceError::Io {
        path: dir.to_path_buf(),
        source,
    };

    let mut files: Vec<PathBuf> = Vec::new();
    for entry in fs::read_dir(dir).map_err(io_err)? {
        let path = entry.map_err(io_err)?.path();
        if path.is_file() && extension(&path).as_deref() == Some("csv") {
            files.push(path);
        }
    }
    files.sort();

    let mut groups = Vec::with_capacity(files.len());
    for file in files {
        let name = file
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_default();
        groups.push(TestGroup::named(name, load_csv(&file)?));
    }
    Ok(TestSuite::grouped(groups))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn write(dir: &Path, name: &str, contents: &str) -> PathBuf {
        let path = dir.join(name);
        fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn test_load_csv_flat() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(
            dir.path(),
            "cases.csv",
            "Test Case,Action,Expected Result\n\
             Spin once,tap,reels spin\n\
             ,,\n\
             Open shop,,shop opens\n",
        );

        let suite = load(&path).unwrap();
        assert_eq!(
            suite,
            TestSuite::flat(vec![
                TestCase::new("Spin once", "tap", "reels spin"),
                TestCase::new("Open shop", "tap", "shop opens"),
            ])
        );
    }

    #[test]
    fn test_load_json_grouped_keeps_order() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(
            dir.path(),
            "cases.json",
            r#"{
                "Zeta": [{"description": "z1", "expected": null}],
                "Alpha": [{"description": "a1", "action": "wait", "expected": 3}]
            }"#,
        );

        let suite = load(&path).unwrap();
        let names: Vec<_> = suite.groups.iter().map(|g| g.name.clone().unwrap()).collect();
        assert_eq!(names, vec!["Zeta", "Alpha"]);
        assert_eq!(suite.groups[1].cases[0], TestCase::new("a1", "wait", "3"));
        assert_eq!(suite.groups[0].cases[0], TestCase::new("z1", "z1", ""));
    }

    #[test]
    fn test_load_json_flat() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(dir.path(), "cases.json", r#"[{"Test Case": "Spin", "Step": "tap spin"}]"#);
        let suite = load(&path).unwrap();
        assert_eq!(suite.groups.len(), 1);
        assert!(suite.groups[0].name.is_none());
        assert_eq!(suite.groups[0].cases[0].action, "tap spin");
    }

    #[test]
    fn test_load_directory_as_groups() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "02_slots.csv", "description\nSpin\n");
        write(dir.path(), "01_lobby.csv", "description\nOpen lobby\nClaim bonus\n");
        write(dir.path(), "notes.txt", "ignored");

        let suite = load(dir.path()).unwrap();
        assert_eq!(suite.groups.len(), 2);
        assert_eq!(suite.groups[0].name.as_deref(), Some("01_lobby"));
        assert_eq!(suite.groups[0].cases.len(), 2);
        assert_eq!(suite.groups[1].name.as_deref(), Some("02_slots"));
    }

    #[test]
    fn test_unsupported_and_empty_sources() {
        let dir = tempfile::tempdir().unwrap();
        let txt = write(dir.path(), "cases.txt", "Spin");
        assert!(matches!(load(&txt), Err(SourceError::UnsupportedFormat(_))));

        let broken = write(dir.path(), "broken.xlsx", "PK");
        assert!(matches!(load(&broken), Err(SourceError::Workbook { .. })));

        let empty = write(dir.path(), "empty.csv", "description,expected\n");
        assert!(matches!(load(&empty), Err(SourceError::Empty(_))));

        let missing = dir.path().join("missing.csv");
        assert!(matches!(load(&missing), Err(SourceError::Csv { .. })));

        let bad = write(dir.path(), "bad.json", r#"{"Lobby": "nope"}"#);
        assert!(matches!(load(&bad), Err(SourceError::Layout { .. })));
    }

    #[test]
    fn test_workbook_sheets_become_groups() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/cases.xlsx");
        let suite = load(&path).unwrap();

        let names: Vec<_> = suite.groups.iter().map(|g| g.name.clone().unwrap()).collect();
        assert_eq!(names, vec!["Lobby", "Slots"]);

        // The blank row between the two lobby cases is skipped
        assert_eq!(
            suite.groups[0].cases,
            vec![
                TestCase::new("Open lobby", "tap lobby button", "Lobby is shown"),
                TestCase::new("Claim bonus", "tap", "100"),
            ]
        );
        assert_eq!(
            suite.groups[1].cases,
            vec![TestCase::new("Spin once", "Tap spin", "Reels spin")]
        );
    }

    #[test]
    fn test_sheet_cell_text() {
        assert_eq!(sheet_cell_text(&Data::Empty), "");
        assert_eq!(sheet_cell_text(&Data::Float(100.0)), "100");
        assert_eq!(sheet_cell_text(&Data::Float(2.5)), "2.5");
        assert_eq!(sheet_cell_text(&Data::Int(7)), "7");
        assert_eq!(sheet_cell_text(&Data::String("Spin".to_string())), "Spin");
    }
}
