//! Per-test-case execution cycle.
//!
//! For every case, in this fixed order:
//! 1. clear blockers (best effort, the result only gets logged)
//! 2. for tap verbs: classify the screen and tap where the brain points
//! 3. capture and classify a verification screen (crash check)
//! 4. capture a separate frame and run the bug check
//! 5. build the `Outcome`
//!
//! Device failures are not handled here; they end the case with an error.

use std::time::Duration;

use chrono::Utc;
use tracing::{debug, info, warn};

use crate::brain::{CRASH_SCREEN, ScreenClassifier};
use crate::cases::TestCase;
use crate::config::NavigatorDefaults;
use crate::device::{DeviceBridge, DeviceResult};
use crate::navigator::{Navigator, NavigatorSettings};
use crate::pacing::Pacer;
use crate::runner::Outcome;

pub const BEFORE_ACTION_LABEL: &str = "before_action";
pub const VERIFICATION_LABEL: &str = "verification";
pub const AFTER_ACTION_LABEL: &str = "after_action";

/// Tunables for the execution cycle
#[derive(Debug, Clone)]
pub struct ExecutionSettings {
    pub navigator: NavigatorSettings,
    /// Pause after the action tap
    pub action_settle: Duration,
    /// Verification screen type that fails a case
    pub crash_screen: String,
}

impl Default for ExecutionSettings {
    fn default() -> Self {
        Self::from_defaults(&NavigatorDefaults::defaults())
    }
}

impl ExecutionSettings {
    pub fn from_defaults(defaults: &NavigatorDefaults) -> Self {
        Self {
            navigator: NavigatorSettings::from_defaults(defaults),
            action_settle: defaults.action_settle(),
            crash_screen: CRASH_SCREEN.to_string(),
        }
    }
}

/// Runs single test cases against a device
pub struct Executor<'a> {
    device: &'a mut dyn DeviceBridge,
    classifier: &'a ScreenClassifier,
    pacer: &'a mut dyn Pacer,
    settings: &'a ExecutionSettings,
}

impl<'a> Executor<'a> {
    pub fn new(
        device: &'a mut dyn DeviceBridge,
        classifier: &'a ScreenClassifier,
        pacer: &'a mut dyn Pacer,
        settings: &'a ExecutionSettings,
    ) -> Self {
        Self {
            device,
            classifier,
            pacer,
            settings,
        }
    }

    /// Run one case. Returns an error only when the device fails.
    pub fn run(&mut self, case: &TestCase) -> DeviceResult<Outcome> {
        info!(test_case = %case.description, action = %case.action, "running test case");

        let reached_ready = Navigator::new(
            &mut *self.device,
            self.classifier,
            &mut *self.pacer,
            &self.settings.navigator,
        )
        .clear_blockers()?;
        if !reached_ready {
            warn!(test_case = %case.description, "ready screen not reached, proceeding anyway");
        }

        if case.wants_tap() {
            let shot = self.device.capture(BEFORE_ACTION_LABEL)?;
            let decision = self.classifier.classify(&shot);
            match decision.coordinates() {
                Some(at) => {
                    info!(x = at.x, y = at.y, target = ?decision.target, "tapping");
                    self.device.tap(at.x, at.y)?;
                    self.pacer.pause(self.settings.action_settle);
                }
                None => debug!(screen = %decision.screen_type, "no tap target suggested, skipping action"),
            }
        }

        let verification_shot = self.device.capture(VERIFICATION_LABEL)?;
        let verification = self.classifier.classify(&verification_shot);
        let success = !verification.is_screen(&self.settings.crash_screen);

        let after_shot = self.device.capture(AFTER_ACTION_LABEL)?;
        let bug_check = self.classifier.detect_bug(&after_shot, &case.expected);

        let outcome = Outcome {
            test_case: case.description.clone(),
            group: None,
            action: case.action.clone(),
            expected: case.expected.clone(),
            timestamp: Utc::now(),
            success,
            bug_found: bug_check.has_bug,
            bug_details: bug_check.has_bug.then_some(bug_check),
            screen_type: verification.screen_type,
            screenshot: Some(verification_shot.path),
            reached_ready,
        };

        info!(
            test_case = %outcome.test_case,
            success = outcome.success,
            bug = outcome.bug_found,
            "test case finished"
        );
        Ok(outcome)
    }
}
