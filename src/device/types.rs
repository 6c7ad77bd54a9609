// Core types shared by every device bridge

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Handle to one captured device frame.
///
/// Every capture produces a distinct artifact; later steps refer back to a
/// frame through this handle only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScreenshotRef {
    /// PNG file on disk
    pub path: PathBuf,

    /// Step label the capture was taken for (e.g. "verification")
    pub label: String,

    /// Capture sequence number within the session (1-based)
    pub sequence: u64,

    /// When the frame was captured
    pub captured_at: DateTime<Utc>,
}

impl ScreenshotRef {
    pub fn new(path: PathBuf, label: impl Into<String>, sequence: u64) -> Self {
        Self {
            path,
            label: label.into(),
            sequence,
            captured_at: Utc::now(),
        }
    }

    /// Reference an existing file that was not captured in this session
    pub fn from_file(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let label = path
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| "external".to_string());
        Self::new(path, label, 0)
    }

    /// Read the PNG bytes of this frame
    pub fn read_bytes(&self) -> std::io::Result<Vec<u8>> {
        std::fs::read(&self.path)
    }
}

/// Result type for device operations
pub type DeviceResult<T> = Result<T, DeviceError>;

/// Failures talking to the device. None of these are recovered inside a
/// test case.
#[derive(Debug, Error)]
pub enum DeviceError {
    /// The bridge executable could not be started
    #[error("failed to start '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// The bridge command ran but reported failure
    #[error("'{command}' failed: {detail}")]
    CommandFailed { command: String, detail: String },

    /// The bridge command did not finish in time
    #[error("'{command}' timed out after {timeout:?}")]
    Timeout { command: String, timeout: Duration },

    /// Capture output was not a PNG image
    #[error("invalid screenshot: {0}")]
    InvalidScreenshot(String),

    /// Device is not reachable
    #[error("device disconnected: {0}")]
    Disconnected(String),

    /// I/O error writing or reading artifacts
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// A device that can be observed and poked.
///
/// Implementations:
/// - `AdbBridge` drives a real Android device through `adb`
/// - `MockDevice` renders synthetic frames for dry runs and tests
pub trait DeviceBridge {
    /// Capture the current screen into a new, uniquely named artifact
    fn capture(&mut self, label: &str) -> DeviceResult<ScreenshotRef>;

    /// Inject a tap at pixel coordinates
    fn tap(&mut self, x: i32, y: i32) -> DeviceResult<()>;

    /// Short identifier used in logs (e.g. "adb:emulator-5554", "mock")
    fn describe(&self) -> String;
}

impl<D: DeviceBridge + ?Sized> DeviceBridge for Box<D> {
    fn capture(&mut self, label: &str) -> DeviceResult<ScreenshotRef> {
        (**self).capture(label)
    }

    fn tap(&mut self, x: i32, y: i32) -> DeviceResult<()> {
        (**self).tap(x, y)
    }

    fn describe(&self) -> String {
        (**self).describe()
    }
}

/// PNG file signature
pub const PNG_SIGNATURE: [u8; 8] = [0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A];

/// Check whether a byte buffer starts with the PNG signature
pub fn is_png(data: &[u8]) -> bool {
    data.len() > PNG_SIGNATURE.len() && data[..PNG_SIGNATURE.len()] == PNG_SIGNATURE
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_png() {
        let mut data = PNG_SIGNATURE.to_vec();
        data.extend_from_slice(&[0, 0, 0, 13]);
        assert!(is_png(&data));
        assert!(!is_png(b"error: no devices/emulators found"));
        assert!(!is_png(&PNG_SIGNATURE));
    }

    #[test]
    fn test_screenshot_ref_from_file() {
        let shot = ScreenshotRef::from_file("/tmp/shots/lobby.png");
        assert_eq!(shot.label, "lobby");
        assert_eq!(shot.sequence, 0);
    }

    #[test]
    fn test_error_display() {
        let err = DeviceError::Timeout {
            command: "adb exec-out screencap -p".to_string(),
            timeout: Duration::from_secs(20),
        };
        assert_eq!(err.to_string(), "'adb exec-out screencap -p' timed out after 20s");
    }
}
