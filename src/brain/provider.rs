use super::types::{BrainResult, BugReport, Classification};
use crate::device::ScreenshotRef;

/// Pluggable screenshot interpreter.
///
/// Implementations may fail freely; `ScreenClassifier` turns every error
/// into a safe default before the navigation loop sees it.
pub trait ClassificationProvider {
    /// Interpret a screenshot
    fn classify(&self, shot: &ScreenshotRef) -> BrainResult<Classification>;

    /// Look for crashes, freezes and visual glitches.
    ///
    /// `expected_state` is the test case's expected-outcome text.
    fn detect_bug(&self, shot: &ScreenshotRef, expected_state: &str) -> BrainResult<BugReport>;

    /// Short name for logs
    fn name(&self) -> &str;
}
