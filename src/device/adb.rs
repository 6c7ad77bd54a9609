//! Android device bridge over `adb`.
//!
//! Screenshots come from `adb exec-out screencap -p` (raw PNG on stdout) and
//! taps from `adb shell input tap x y`. Every invocation is bounded by the
//! configured command timeout.

use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use tracing::debug;

use super::types::{DeviceBridge, DeviceError, DeviceResult, ScreenshotRef, is_png};
use crate::config::DeviceSettings;
use crate::process::{ProcessError, ProcessOutput, display_command, run_with_timeout};
use crate::session::capture_file_name;

/// Configuration for the adb bridge
#[derive(Debug, Clone)]
pub struct AdbConfig {
    /// adb executable
    pub adb_path: String,
    /// Target device serial (`adb -s`), `None` for the only attached device
    pub serial: Option<String>,
    /// Package of the game under test
    pub package: String,
    /// Timeout for one adb command
    pub command_timeout: Duration,
    /// Directory screenshots are written to
    pub output_dir: PathBuf,
}

impl AdbConfig {
    pub fn new(settings: &DeviceSettings, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            adb_path: settings.adb_path.clone(),
            serial: settings.serial.clone(),
            package: settings.package.clone(),
            command_timeout: Duration::from_secs(settings.command_timeout),
            output_dir: output_dir.into(),
        }
    }

    pub fn serial(mut self, serial: Option<String>) -> Self {
        self.serial = serial;
        self
    }
}

/// Device bridge backed by the adb command-line tool
pub struct AdbBridge {
    config: AdbConfig,
    captures: u64,
}

impl AdbBridge {
    pub fn new(config: AdbConfig) -> Self {
        Self {
            config,
            captures: 0,
        }
    }

    /// Bring the configured package to the foreground
    pub fn launch_app(&mut self) -> DeviceResult<()> {
        let package = self.config.package.clone();
        self.run(&[
            "shell",
            "monkey",
            "-p",
            &package,
            "-c",
            "android.intent.category.LAUNCHER",
            "1",
        ])?;
        Ok(())
    }

    /// Base arguments selecting the device
    fn base_args(&self) -> Vec<String> {
        match &self.config.serial {
            Some(serial) => vec!["-s".to_string(), serial.clone()],
            None => Vec::new(),
        }
    }

    fn run(&self, args: &[&str]) -> DeviceResult<ProcessOutput> {
        let mut full_args = self.base_args();
        full_args.extend(args.iter().map(|s| s.to_string()));
        let command = display_command(&self.config.adb_path, &full_args);
        debug!(%command, "adb");

        let output = run_with_timeout(
            &self.config.adb_path,
            &full_args,
            None,
            self.config.command_timeout,
        )
        .map_err(|err| match err {
            ProcessError::Spawn { program, source } => DeviceError::Spawn { program, source },
            ProcessError::Timeout(timeout) => DeviceError::Timeout {
                command: command.clone(),
                timeout,
            },
            ProcessError::Io(e) => DeviceError::Io(e),
        })?;

        if !output.success() {
            return Err(classify_failure(&command, &output.diagnostic()));
        }

        Ok(output)
    }
}

impl DeviceBridge for AdbBridge {
    fn capture(&mut self, label: &str) -> DeviceResult<ScreenshotRef> {
        let output = self.run(&["exec-out", "screencap", "-p"])?;
        if !is_png(&output.stdout) {
            return Err(DeviceError::InvalidScreenshot(format!(
                "screencap returned {} bytes without a PNG header: {}",
                output.stdout.len(),
                output.diagnostic()
            )));
        }

        self.captures += 1;
        fs::create_dir_all(&self.config.output_dir)?;
        let path = self
            .config
            .output_dir
            .join(capture_file_name(self.captures, label));
        fs::write(&path, &output.stdout)?;
        debug!(path = %path.display(), "captured screenshot");

        Ok(ScreenshotRef::new(path, label, self.captures))
    }

    fn tap(&mut self, x: i32, y: i32) -> DeviceResult<()> {
        self.run(&["shell", "input", "tap", &x.to_string(), &y.to_string()])?;
        Ok(())
    }

    fn describe(&self) -> String {
        match &self.config.serial {
            Some(serial) => format!("adb:{}", serial),
            None => "adb".to_string(),
        }
    }
}

/// Map adb's diagnostic text onto an error variant
fn classify_failure(command: &str, detail: &str) -> DeviceError {
    let lower = detail.to_lowercase();
    if lower.contains("no devices")
        || lower.contains("device offline")
        || lower.contains("not found")
        || lower.contains("unauthorized")
    {
        DeviceError::Disconnected(detail.to_string())
    } else {
        DeviceError::CommandFailed {
            command: command.to_string(),
            detail: detail.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DeviceSettings;

    #[test]
    fn test_base_args_with_serial() {
        let config = AdbConfig::new(&DeviceSettings::defaults(), "/tmp/out")
            .serial(Some("emulator-5554".to_string()));
        let bridge = AdbBridge::new(config);
        assert_eq!(bridge.base_args(), vec!["-s", "emulator-5554"]);
        assert_eq!(bridge.describe(), "adb:emulator-5554");
    }

    #[test]
    fn test_base_args_without_serial() {
        let bridge = AdbBridge::new(AdbConfig::new(&DeviceSettings::defaults(), "/tmp/out"));
        assert!(bridge.base_args().is_empty());
        assert_eq!(bridge.describe(), "adb");
    }

    #[test]
    fn test_classify_failure() {
        let err = classify_failure("adb shell input tap 1 2", "error: no devices/emulators found");
        assert!(matches!(err, DeviceError::Disconnected(_)));

        let err = classify_failure("adb shell input tap 1 2", "Killed");
        assert!(matches!(err, DeviceError::CommandFailed { .. }));
    }

    #[test]
    fn test_missing_adb_is_spawn_error() {
        let mut settings = DeviceSettings::defaults();
        settings.adb_path = "definitely-not-adb-xyz".to_string();
        let dir = tempfile::tempdir().unwrap();
        let mut bridge = AdbBridge::new(AdbConfig::new(&settings, dir.path()));

        let err = bridge.capture("screen").unwrap_err();
        assert!(matches!(err, DeviceError::Spawn { .. }));
        assert!(bridge.tap(10, 20).is_err());
    }
}
