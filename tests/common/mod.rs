//! Scripted brains and small fixtures shared by the integration tests

#![allow(dead_code)]

use std::collections::HashMap;

use droid_vision::brain::{
    BrainError, BrainResult, parse_classification,
};
use droid_vision::{
    Blocker, BugReport, Classification, ClassificationProvider, Point, ScreenshotRef,
    SuggestedAction,
};

/// Answers by capture label, with a default for unknown labels
pub struct ScriptedProvider {
    by_label: HashMap<String, Classification>,
    default: Classification,
    bug: BugReport,
}

impl ScriptedProvider {
    pub fn new(default: Classification) -> Self {
        Self {
            by_label: HashMap::new(),
            default,
            bug: BugReport::none(),
        }
    }

    pub fn on(mut self, label: &str, classification: Classification) -> Self {
        self.by_label.insert(label.to_string(), classification);
        self
    }

    pub fn bug(mut self, report: BugReport) -> Self {
        self.bug = report;
        self
    }
}

impl ClassificationProvider for ScriptedProvider {
    fn classify(&self, shot: &ScreenshotRef) -> BrainResult<Classification> {
        Ok(self
            .by_label
            .get(&shot.label)
            .cloned()
            .unwrap_or_else(|| self.default.clone()))
    }

    fn detect_bug(&self, _shot: &ScreenshotRef, _expected_state: &str) -> BrainResult<BugReport> {
        Ok(self.bug.clone())
    }

    fn name(&self) -> &str {
        "scripted"
    }
}

/// Replies with text the reply parser rejects
pub struct GarbageProvider;

impl ClassificationProvider for GarbageProvider {
    fn classify(&self, _shot: &ScreenshotRef) -> BrainResult<Classification> {
        parse_classification("I think this is a lobby screen, maybe?")
    }

    fn detect_bug(&self, _shot: &ScreenshotRef, _expected_state: &str) -> BrainResult<BugReport> {
        Err(BrainError::Malformed("not json".to_string()))
    }

    fn name(&self) -> &str {
        "garbage"
    }
}

pub fn screen(screen_type: &str) -> Classification {
    Classification {
        screen_type: screen_type.to_string(),
        action: SuggestedAction::Wait,
        target: None,
        blocking_elements: Vec::new(),
        bug: None,
        rationale: "scripted".to_string(),
    }
}

pub fn tap_on(screen_type: &str, x: i32, y: i32) -> Classification {
    Classification {
        action: SuggestedAction::Tap(Point::new(x, y)),
        target: Some("spin_button".to_string()),
        ..screen(screen_type)
    }
}

pub fn blocked_by(kind: &str, x: i32, y: i32) -> Classification {
    Classification {
        blocking_elements: vec![Blocker {
            kind: kind.to_string(),
            at: Point::new(x, y),
        }],
        ..screen("popup")
    }
}

pub fn glitch() -> BugReport {
    BugReport {
        has_bug: true,
        bug_type: Some("visual_glitch".to_string()),
        severity: Some("high".to_string()),
        description: Some("reels overlap the balance bar".to_string()),
    }
}
