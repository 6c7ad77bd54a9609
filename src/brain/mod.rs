pub mod classifier;
pub mod provider;
pub mod reply;
pub mod types;
pub mod vlm;

pub use classifier::ScreenClassifier;
pub use provider::ClassificationProvider;
pub use reply::{extract_json_object, parse_bug_report, parse_classification};
pub use types::{
    Blocker, BrainError, BrainResult, BugDetails, BugReport, CRASH_SCREEN, Classification, Point,
    READY_SCREEN, SuggestedAction, UNKNOWN_SCREEN,
};
pub use vlm::{VlmConfig, VlmProvider, analyze_image, check_health};
