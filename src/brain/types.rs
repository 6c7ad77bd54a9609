//! Screen interpretation types.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// Screen type reported when the application has crashed
pub const CRASH_SCREEN: &str = "crash";

/// Screen type reported when the game is ready for testing
pub const READY_SCREEN: &str = "game_ready";

/// Screen type used when nothing useful is known
pub const UNKNOWN_SCREEN: &str = "unknown";

/// Pixel position on the device screen
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

impl From<(i32, i32)> for Point {
    fn from((x, y): (i32, i32)) -> Self {
        Self { x, y }
    }
}

/// What the brain suggests doing on the current screen.
///
/// A tap always carries its coordinates, so a tap suggestion without a
/// position cannot be represented.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SuggestedAction {
    Tap(Point),
    Wait,
    None,
    /// Any verb the backend invents that we do not act on
    Other { verb: String },
}

impl SuggestedAction {
    pub fn name(&self) -> &str {
        match self {
            SuggestedAction::Tap(_) => "tap",
            SuggestedAction::Wait => "wait",
            SuggestedAction::None => "none",
            SuggestedAction::Other { verb } => verb,
        }
    }
}

/// An overlay that must be dismissed before the screen is usable
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Blocker {
    /// Kind of overlay (e.g. "sale_popup", "rate_us")
    pub kind: String,
    /// Where to tap to dismiss it
    pub at: Point,
}

/// Details of a suspected bug
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BugDetails {
    pub kind: String,
    pub severity: String,
    pub description: String,
}

/// Interpretation of one screenshot
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Classification {
    /// Open tag such as "game_loaded", "game_ready", "unknown", "crash"
    pub screen_type: String,

    pub action: SuggestedAction,

    /// Semantic label of the element to act on
    pub target: Option<String>,

    /// Overlays in the order they should be dismissed
    pub blocking_elements: Vec<Blocker>,

    /// Present only when the screen shows a bug
    pub bug: Option<BugDetails>,

    /// Diagnostic only
    pub rationale: String,
}

impl Classification {
    /// Result used whenever no AI backend is configured
    pub fn fallback() -> Self {
        Self::unknown("AI not configured, using fallback")
    }

    /// Result used when the backend fails or replies with garbage
    pub fn safe_default(reason: impl std::fmt::Display) -> Self {
        Self::unknown(format!("classification unavailable: {}", reason))
    }

    fn unknown(rationale: impl Into<String>) -> Self {
        Self {
            screen_type: UNKNOWN_SCREEN.to_string(),
            action: SuggestedAction::Wait,
            target: None,
            blocking_elements: Vec::new(),
            bug: None,
            rationale: rationale.into(),
        }
    }

    pub fn coordinates(&self) -> Option<Point> {
        match self.action {
            SuggestedAction::Tap(point) => Some(point),
            _ => None,
        }
    }

    pub fn is_bug(&self) -> bool {
        self.bug.is_some()
    }

    pub fn is_screen(&self, marker: &str) -> bool {
        self.screen_type == marker
    }
}

/// Verdict of a dedicated bug check
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BugReport {
    pub has_bug: bool,
    pub bug_type: Option<String>,
    pub severity: Option<String>,
    pub description: Option<String>,
}

impl BugReport {
    /// The "no bug" verdict
    pub fn none() -> Self {
        Self {
            has_bug: false,
            bug_type: None,
            severity: None,
            description: None,
        }
    }
}

impl Default for BugReport {
    fn default() -> Self {
        Self::none()
    }
}

/// Result type for brain backend operations
pub type BrainResult<T> = Result<T, BrainError>;

/// Backend failures. These never leave the `ScreenClassifier`.
#[derive(Debug, Error)]
pub enum BrainError {
    /// Could not reach the backend
    #[error("connection failed: {0}")]
    ConnectionFailed(String),

    /// Backend took too long
    #[error("no response within {0:?}")]
    Timeout(Duration),

    /// Backend answered with an HTTP error
    #[error("backend returned HTTP {status}: {body}")]
    Backend { status: u16, body: String },

    /// Reply could not be understood
    #[error("malformed reply: {0}")]
    Malformed(String),

    /// Reply is missing a field we cannot default
    #[error("reply is missing required field '{0}'")]
    MissingField(&'static str),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fallback_is_unknown_wait() {
        let c = Classification::fallback();
        assert_eq!(c.screen_type, UNKNOWN_SCREEN);
        assert_eq!(c.action, SuggestedAction::Wait);
        assert!(c.coordinates().is_none());
        assert!(c.blocking_elements.is_empty());
        assert!(!c.is_bug());
    }

    #[test]
    fn test_tap_carries_coordinates() {
        let mut c = Classification::fallback();
        c.action = SuggestedAction::Tap(Point::new(720, 2800));
        assert_eq!(c.coordinates(), Some(Point::new(720, 2800)));
        assert_eq!(c.action.name(), "tap");
    }

    #[test]
    fn test_action_serializes_with_kind_tag() {
        let json = serde_json::to_value(SuggestedAction::Tap(Point::new(1, 2))).unwrap();
        assert_eq!(json, serde_json::json!({"kind": "tap", "x": 1, "y": 2}));

        let json = serde_json::to_value(SuggestedAction::Other { verb: "swipe".into() }).unwrap();
        assert_eq!(json, serde_json::json!({"kind": "other", "verb": "swipe"}));
    }
}
