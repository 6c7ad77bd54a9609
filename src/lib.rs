//! droid-vision - Android game UI testing driven by a vision model.
//!
//! This crate provides:
//! - A screen classifier ("brain") with AI-backed and fallback modes
//! - A blocker-clearing state machine that dismisses popups until the game is ready
//! - A per-test-case executor (act, verify, bug-check)
//! - A run orchestrator with grouped test suites and HTML/JSON reports
//! - Device bridges for adb and an in-memory mock device
//!
//! # Example
//!
//! ```rust,no_run
//! use droid_vision::{MockDevice, Runner, ScreenClassifier, TestCase};
//!
//! let device = MockDevice::new("/tmp/droid-vision/demo");
//! let mut runner = Runner::new(device, ScreenClassifier::fallback());
//! let outcomes = runner.run_cases(&[TestCase::new("Spin once", "tap", "reels spin")]);
//! assert_eq!(outcomes.len(), 1);
//! ```

pub mod brain;
pub mod cases;
pub mod config;
pub mod device;
pub mod executor;
pub mod logging;
pub mod navigator;
pub mod pacing;
pub mod process;
pub mod report;
pub mod runner;
pub mod session;

// Re-export brain types
pub use brain::{
    Blocker, BugDetails, BugReport, Classification, ClassificationProvider, Point,
    ScreenClassifier, SuggestedAction, VlmConfig, VlmProvider,
};

// Re-export test-case types
pub use cases::{SourceError, TestCase, TestGroup, TestSuite};

// Re-export device bridges
pub use device::{AdbBridge, AdbConfig, DeviceBridge, DeviceError, MockDevice, ScreenshotRef};

// Re-export the navigation loop
pub use executor::{ExecutionSettings, Executor};
pub use navigator::{ClearReport, Navigator, NavigatorSettings};
pub use pacing::{Pacer, RecordingPacer, ThreadPacer};
pub use runner::{CaseFailure, FailurePolicy, Outcome, RunReport, RunSummary, Runner};

// Re-export session management
pub use session::{Session, cleanup_old_sessions, list_sessions};
