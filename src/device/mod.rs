pub mod adb;
pub mod mock;
pub mod types;

pub use adb::{AdbBridge, AdbConfig};
pub use mock::{MOCK_SCREEN_HEIGHT, MOCK_SCREEN_WIDTH, MockDevice, MockFramebuffer};
pub use types::{DeviceBridge, DeviceError, DeviceResult, PNG_SIGNATURE, ScreenshotRef, is_png};
