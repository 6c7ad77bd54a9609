pub mod normalize;
pub mod source;
pub mod types;

pub use normalize::{RawRow, normalize_column, normalize_row};
pub use source::{load, load_csv, load_workbook};
pub use types::{DEFAULT_ACTION, SourceError, SourceResult, TestCase, TestGroup, TestSuite};
