//! Blocker clearing: dismiss loading screens, sale offers, rate-us prompts,
//! permission dialogs and messages of the day until the game is ready.
//!
//! ```text
//!            +-----------+   ready marker    +-------+
//!   start -> | Scanning  | ----------------> | Ready |
//!            +-----------+                   +-------+
//!              |   ^   | budget spent   +-----------+
//!   blockers   |   |   +--------------> | Exhausted |
//!   reported   v   |                    +-----------+
//!          Clearing / Guessing (no blockers reported)
//! ```
//!
//! A tap on a guessed close position that hit nothing is indistinguishable
//! from a dismissed popup; both go back to scanning.

use std::time::Duration;

use tracing::{debug, info};

use crate::brain::{Blocker, Classification, Point, READY_SCREEN, ScreenClassifier};
use crate::config::NavigatorDefaults;
use crate::device::{DeviceBridge, DeviceResult, ScreenshotRef};
use crate::pacing::Pacer;

/// Where close buttons usually sit on a 1440-wide portrait screen
pub const DEFAULT_CLOSE_GUESSES: [Point; 3] = [
    Point::new(1320, 180),
    Point::new(1380, 100),
    Point::new(720, 200),
];

/// Capture label used while scanning for blockers
pub const SCAN_LABEL: &str = "navigator_screen";

/// Tunables for blocker clearing
#[derive(Debug, Clone)]
pub struct NavigatorSettings {
    /// Scan attempts before giving up
    pub max_attempts: u32,
    /// Screen type that ends clearing successfully
    pub ready_screen: String,
    /// Taps tried, in order, when no blocker is reported
    pub close_guesses: Vec<Point>,
    /// Pause after each reported-blocker tap
    pub clear_settle: Duration,
    /// Pause after each guessed tap
    pub guess_settle: Duration,
}

impl Default for NavigatorSettings {
    fn default() -> Self {
        Self::from_defaults(&NavigatorDefaults::defaults())
    }
}

impl NavigatorSettings {
    pub fn from_defaults(defaults: &NavigatorDefaults) -> Self {
        Self {
            max_attempts: defaults.max_attempts,
            ready_screen: READY_SCREEN.to_string(),
            close_guesses: DEFAULT_CLOSE_GUESSES.to_vec(),
            clear_settle: defaults.clear_settle(),
            guess_settle: defaults.guess_settle(),
        }
    }

    pub fn max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts;
        self
    }

    pub fn close_guesses(mut self, guesses: impl IntoIterator<Item = Point>) -> Self {
        self.close_guesses = guesses.into_iter().collect();
        self
    }
}

/// States of the clearing loop
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClearState {
    Scanning,
    Clearing(Vec<Blocker>),
    Guessing,
    Ready,
    Exhausted,
}

/// What happened during one clearing run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClearReport {
    /// Whether the ready marker was seen
    pub ready: bool,
    /// Screens captured and classified
    pub scans: u32,
    /// Taps injected (reported blockers and guesses)
    pub taps: u32,
}

/// Drives the device out of popups and overlays
pub struct Navigator<'a> {
    device: &'a mut dyn DeviceBridge,
    classifier: &'a ScreenClassifier,
    pacer: &'a mut dyn Pacer,
    settings: &'a NavigatorSettings,
}

impl<'a> Navigator<'a> {
    pub fn new(
        device: &'a mut dyn DeviceBridge,
        classifier: &'a ScreenClassifier,
        pacer: &'a mut dyn Pacer,
        settings: &'a NavigatorSettings,
    ) -> Self {
        Self {
            device,
            classifier,
            pacer,
            settings,
        }
    }

    /// Keep clearing until the game is ready (`true`) or the budget is spent (`false`).
    ///
    /// Device failures are returned as errors; nothing else is.
    pub fn clear_blockers(&mut self) -> DeviceResult<bool> {
        Ok(self.clear_blockers_report()?.ready)
    }

    /// Same as [`Navigator::clear_blockers`] with scan and tap counts
    pub fn clear_blockers_report(&mut self) -> DeviceResult<ClearReport> {
        let mut report = ClearReport {
            ready: false,
            scans: 0,
            taps: 0,
        };
        let settings = self.settings;
        let mut attempts = 0u32;
        let mut state = ClearState::Scanning;

        loop {
            state = match state {
                ClearState::Scanning if attempts >= settings.max_attempts => {
                    ClearState::Exhausted
                }
                ClearState::Scanning => {
                    let (_, classification) = self.observe(SCAN_LABEL)?;
                    report.scans += 1;
                    self.next_state(classification)
                }
                ClearState::Clearing(blockers) => {
                    for blocker in &blockers {
                        info!(blocker = %blocker.kind, x = blocker.at.x, y = blocker.at.y, "clearing blocker");
                        self.tap_and_settle(blocker.at, settings.clear_settle)?;
                        report.taps += 1;
                    }
                    attempts += 1;
                    ClearState::Scanning
                }
                ClearState::Guessing => {
                    debug!(attempt = attempts + 1, "no blocker reported, trying common close positions");
                    for &point in &settings.close_guesses {
                        self.tap_and_settle(point, settings.guess_settle)?;
                        report.taps += 1;
                    }
                    attempts += 1;
                    ClearState::Scanning
                }
                ClearState::Ready => {
                    info!(scans = report.scans, "game ready for testing");
                    report.ready = true;
                    return Ok(report);
                }
                ClearState::Exhausted => {
                    info!(
                        attempts,
                        taps = report.taps,
                        "blocker budget exhausted, continuing without ready screen"
                    );
                    return Ok(report);
                }
            };
        }
    }

    /// Capture a screen and classify it
    pub fn observe(&mut self, label: &str) -> DeviceResult<(ScreenshotRef, Classification)> {
        let shot = self.device.capture(label)?;
        let classification = self.classifier.classify(&shot);
        Ok((shot, classification))
    }

    fn next_state(&self, classification: Classification) -> ClearState {
        if classification.is_screen(&self.settings.ready_screen) {
            ClearState::Ready
        } else if !classification.blocking_elements.is_empty() {
            ClearState::Clearing(classification.blocking_elements)
        } else {
            ClearState::Guessing
        }
    }

    fn tap_and_settle(&mut self, at: Point, settle: Duration) -> DeviceResult<()> {
        self.device.tap(at.x, at.y)?;
        self.pacer.pause(settle);
        Ok(())
    }
}
