//! Types for test run results.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::brain::BugReport;

/// Result of running one test case
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Outcome {
    /// Description of the test case
    pub test_case: String,

    /// Group (sheet) the case came from
    pub group: Option<String>,

    /// Action verb, as annotation
    pub action: String,

    /// Expected outcome text, as annotation
    pub expected: String,

    pub timestamp: DateTime<Utc>,

    /// False only when the verification screen was a crash
    pub success: bool,

    pub bug_found: bool,

    /// Present only when `bug_found`
    pub bug_details: Option<BugReport>,

    /// Screen type of the verification classification
    pub screen_type: String,

    /// Verification screenshot
    pub screenshot: Option<PathBuf>,

    /// Whether blocker clearing reached the ready screen first
    pub reached_ready: bool,
}

/// A case that stopped on a device error and produced no outcome
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaseFailure {
    pub test_case: String,
    pub group: Option<String>,
    pub error: String,
    pub timestamp: DateTime<Utc>,
}

/// Run-level aggregates
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSummary {
    /// Outcomes recorded
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub bugs_found: usize,
    /// Cases lost to device errors
    pub errored: usize,
}

impl RunSummary {
    pub fn from_results(outcomes: &[Outcome], failures: &[CaseFailure]) -> Self {
        Self {
            total: outcomes.len(),
            passed: outcomes.iter().filter(|o| o.success).count(),
            failed: outcomes.iter().filter(|o| !o.success).count(),
            bugs_found: outcomes.iter().filter(|o| o.bug_found).count(),
            errored: failures.len(),
        }
    }
}

/// Everything the report renderer needs
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    pub generated_at: DateTime<Utc>,

    /// Device description (e.g. "adb:emulator-5554")
    pub device: String,

    pub ai_enabled: bool,

    pub summary: RunSummary,

    /// Outcomes in execution order
    pub outcomes: Vec<Outcome>,

    /// Cases lost to device errors, in execution order
    pub failures: Vec<CaseFailure>,

    /// Whether the run stopped early
    pub aborted: bool,
}

impl RunReport {
    /// Group names in first-seen order; `None` stands for ungrouped cases
    pub fn group_names(&self) -> Vec<Option<String>> {
        let mut names: Vec<Option<String>> = Vec::new();
        let seen = self
            .outcomes
            .iter()
            .map(|o| &o.group)
            .chain(self.failures.iter().map(|f| &f.group));
        for group in seen {
            if !names.contains(group) {
                names.push(group.clone());
            }
        }
        names
    }
}
