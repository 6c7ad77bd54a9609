use tracing::{debug, warn};

use super::provider::ClassificationProvider;
use super::types::{BugReport, Classification};
use super::vlm::{VlmConfig, VlmProvider};
use crate::config::VlmSettings;
use crate::device::ScreenshotRef;

/// Screen interpreter used by the navigation loop.
///
/// Never fails: without a provider it returns the fallback classification,
/// and provider errors degrade to a safe default. A fallback classifier
/// proposes no action, so callers cannot expect progress without AI.
pub struct ScreenClassifier {
    provider: Option<Box<dyn ClassificationProvider>>,
}

impl ScreenClassifier {
    /// Classifier with no backend
    pub fn fallback() -> Self {
        Self { provider: None }
    }

    pub fn with_provider(provider: impl ClassificationProvider + 'static) -> Self {
        Self {
            provider: Some(Box::new(provider)),
        }
    }

    /// AI mode when a credential is configured, fallback otherwise
    pub fn from_settings(settings: &VlmSettings) -> Self {
        if settings.ai_enabled() {
            Self::with_provider(VlmProvider::new(VlmConfig::from_settings(settings)))
        } else {
            Self::fallback()
        }
    }

    pub fn ai_enabled(&self) -> bool {
        self.provider.is_some()
    }

    /// Interpret a screenshot
    pub fn classify(&self, shot: &ScreenshotRef) -> Classification {
        let Some(provider) = &self.provider else {
            return Classification::fallback();
        };

        match provider.classify(shot) {
            Ok(classification) => {
                debug!(
                    label = %shot.label,
                    screen = %classification.screen_type,
                    action = classification.action.name(),
                    blockers = classification.blocking_elements.len(),
                    "classified screen"
                );
                classification
            }
            Err(err) => {
                warn!(provider = provider.name(), label = %shot.label, %err, "classification failed, using safe default");
                Classification::safe_default(err)
            }
        }
    }

    /// Look for bugs on a screenshot; "no bug" when the backend is missing or fails
    pub fn detect_bug(&self, shot: &ScreenshotRef, expected_state: &str) -> BugReport {
        let Some(provider) = &self.provider else {
            return BugReport::none();
        };

        provider.detect_bug(shot, expected_state).unwrap_or_else(|err| {
            warn!(provider = provider.name(), label = %shot.label, %err, "bug check failed, assuming no bug");
            BugReport::none()
        })
    }
}

impl Default for ScreenClassifier {
    fn default() -> Self {
        Self::fallback()
    }
}
