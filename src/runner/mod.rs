//! Run orchestration: sequences groups and cases, owns the result log and
//! decides what a device failure means for the rest of the run.

pub mod types;

pub use types::{CaseFailure, Outcome, RunReport, RunSummary};

use chrono::Utc;
use tracing::{error, info};

use crate::brain::ScreenClassifier;
use crate::cases::{TestCase, TestSuite};
use crate::device::DeviceBridge;
use crate::executor::{ExecutionSettings, Executor};
use crate::pacing::{Pacer, ThreadPacer};

/// What to do when a device failure ends a test case
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FailurePolicy {
    /// Log, record the failure and move on to the next case
    #[default]
    Continue,
    /// Stop the run, keeping the outcomes gathered so far
    Abort,
}

/// Owns the collaborators of a run and its result log
pub struct Runner<D: DeviceBridge, P: Pacer = ThreadPacer> {
    device: D,
    classifier: ScreenClassifier,
    pacer: P,
    settings: ExecutionSettings,
    policy: FailurePolicy,
    outcomes: Vec<Outcome>,
    failures: Vec<CaseFailure>,
    aborted: bool,
}

impl<D: DeviceBridge> Runner<D, ThreadPacer> {
    pub fn new(device: D, classifier: ScreenClassifier) -> Self {
        Self::with_pacer(device, classifier, ThreadPacer)
    }
}

impl<D: DeviceBridge, P: Pacer> Runner<D, P> {
    pub fn with_pacer(device: D, classifier: ScreenClassifier, pacer: P) -> Self {
        Self {
            device,
            classifier,
            pacer,
            settings: ExecutionSettings::default(),
            policy: FailurePolicy::default(),
            outcomes: Vec::new(),
            failures: Vec::new(),
            aborted: false,
        }
    }

    pub fn settings(mut self, settings: ExecutionSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn policy(mut self, policy: FailurePolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn device(&self) -> &D {
        &self.device
    }

    pub fn pacer(&self) -> &P {
        &self.pacer
    }

    /// Run every group in source order, each case in source order.
    ///
    /// The result log is reset first, so the returned slice covers this
    /// invocation only.
    pub fn run_all(&mut self, suite: &TestSuite) -> &[Outcome] {
        self.outcomes.clear();
        self.failures.clear();
        self.aborted = false;

        info!(
            device = %self.device.describe(),
            ai = self.classifier.ai_enabled(),
            cases = suite.len(),
            "test run started"
        );

        'groups: for group in &suite.groups {
            if let Some(name) = &group.name {
                info!(group = %name, cases = group.cases.len(), "testing group");
            }
            for case in &group.cases {
                if !self.run_one(case, group.name.as_deref()) {
                    self.aborted = true;
                    break 'groups;
                }
            }
        }

        let summary = self.summary();
        info!(
            total = summary.total,
            passed = summary.passed,
            failed = summary.failed,
            bugs = summary.bugs_found,
            errored = summary.errored,
            aborted = self.aborted,
            "test run complete"
        );
        &self.outcomes
    }

    /// Run an ungrouped sequence of cases
    pub fn run_cases(&mut self, cases: &[TestCase]) -> &[Outcome] {
        self.run_all(&TestSuite::flat(cases.to_vec()))
    }

    /// Returns false when the run must stop
    fn run_one(&mut self, case: &TestCase, group: Option<&str>) -> bool {
        let result = Executor::new(
            &mut self.device,
            &self.classifier,
            &mut self.pacer,
            &self.settings,
        )
        .run(case);

        match result {
            Ok(mut outcome) => {
                outcome.group = group.map(str::to_string);
                self.outcomes.push(outcome);
                true
            }
            Err(err) => {
                error!(test_case = %case.description, %err, "device failure, no outcome recorded");
                self.failures.push(CaseFailure {
                    test_case: case.description.clone(),
                    group: group.map(str::to_string),
                    error: err.to_string(),
                    timestamp: Utc::now(),
                });
                self.policy == FailurePolicy::Continue
            }
        }
    }

    /// Outcomes of the last run, in execution order
    pub fn outcomes(&self) -> &[Outcome] {
        &self.outcomes
    }

    /// Cases of the last run that ended on a device error
    pub fn failures(&self) -> &[CaseFailure] {
        &self.failures
    }

    pub fn aborted(&self) -> bool {
        self.aborted
    }

    pub fn summary(&self) -> RunSummary {
        RunSummary::from_results(&self.outcomes, &self.failures)
    }

    /// Snapshot of the run for the report renderer
    pub fn report(&self) -> RunReport {
        RunReport {
            generated_at: Utc::now(),
            device: self.device.describe(),
            ai_enabled: self.classifier.ai_enabled(),
            summary: self.summary(),
            outcomes: self.outcomes.clone(),
            failures: self.failures.clone(),
            aborted: self.aborted,
        }
    }
}
