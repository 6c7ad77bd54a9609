//! Configuration management with environment variable support.
//!
//! This module provides centralized configuration for droid-vision, supporting:
//! - Environment variables for all configurable values
//! - Defaults for every setting, so an empty environment is a valid setup
//! - Builder-style overrides applied by the CLI
//!
//! # Environment Variables
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `DROID_VISION_API_KEY` | Vision model credential (enables AI mode) | unset |
//! | `DROID_VISION_VLM_ENDPOINT` | VLM API endpoint URL | `https://api.openai.com/v1/chat/completions` |
//! | `DROID_VISION_VLM_MODEL` | Model name for VLM | `gpt-4o-mini` |
//! | `DROID_VISION_VLM_MAX_TOKENS` | Maximum tokens in VLM response | `600` |
//! | `DROID_VISION_VLM_TIMEOUT` | VLM request timeout in seconds | `60` |
//! | `DROID_VISION_VLM_CONNECT_TIMEOUT` | VLM connection timeout in seconds | `10` |
//! | `DROID_VISION_ADB` | Path to the adb executable | `adb` |
//! | `DROID_VISION_SERIAL` | Device serial passed to `adb -s` | unset |
//! | `DROID_VISION_PACKAGE` | Package name of the game under test | `com.zynga.hititrich` |
//! | `DROID_VISION_ADB_TIMEOUT` | Timeout for a single adb command (seconds) | `20` |
//! | `DROID_VISION_SESSION_DIR` | Base directory for run sessions | `/tmp/droid-vision` |
//! | `DROID_VISION_MAX_ATTEMPTS` | Blocker-clearing attempt budget | `10` |
//!
//! # Example
//!
//! ```bash
//! # Enable AI mode against a local OpenAI-compatible server
//! export DROID_VISION_API_KEY="sk-local"
//! export DROID_VISION_VLM_ENDPOINT="http://127.0.0.1:8080/v1/chat/completions"
//! export DROID_VISION_VLM_MODEL="qwen2.5-vl"
//! ```

use std::env;
use std::sync::OnceLock;
use std::time::Duration;

// ============================================================================
// Default Values
// ============================================================================

/// Default VLM API endpoint
pub const DEFAULT_VLM_ENDPOINT: &str = "https://api.openai.com/v1/chat/completions";

/// Default VLM model name
pub const DEFAULT_VLM_MODEL: &str = "gpt-4o-mini";

/// Default max tokens for VLM responses
pub const DEFAULT_VLM_MAX_TOKENS: u32 = 600;

/// Default VLM connection timeout (seconds)
pub const DEFAULT_VLM_CONNECT_TIMEOUT: u64 = 10;

/// Default VLM request timeout (seconds)
pub const DEFAULT_VLM_REQUEST_TIMEOUT: u64 = 60;

/// Default adb executable
pub const DEFAULT_ADB_PATH: &str = "adb";

/// Default package under test
pub const DEFAULT_PACKAGE: &str = "com.zynga.hititrich";

/// Default timeout for one adb invocation (seconds)
pub const DEFAULT_ADB_TIMEOUT: u64 = 20;

/// Default session base directory
pub const DEFAULT_SESSION_DIR: &str = "/tmp/droid-vision";

/// Default blocker-clearing attempt budget
pub const DEFAULT_MAX_CLEAR_ATTEMPTS: u32 = 10;

/// Pause after tapping a reported blocker (milliseconds)
pub const DEFAULT_CLEAR_SETTLE_MS: u64 = 2000;

/// Pause after tapping a guessed close button (milliseconds)
pub const DEFAULT_GUESS_SETTLE_MS: u64 = 1000;

/// Pause after the test-case action tap (milliseconds)
pub const DEFAULT_ACTION_SETTLE_MS: u64 = 3000;

// ============================================================================
// Environment Variable Names
// ============================================================================

pub const ENV_API_KEY: &str = "DROID_VISION_API_KEY";
pub const ENV_VLM_ENDPOINT: &str = "DROID_VISION_VLM_ENDPOINT";
pub const ENV_VLM_MODEL: &str = "DROID_VISION_VLM_MODEL";
pub const ENV_VLM_MAX_TOKENS: &str = "DROID_VISION_VLM_MAX_TOKENS";
pub const ENV_VLM_REQUEST_TIMEOUT: &str = "DROID_VISION_VLM_TIMEOUT";
pub const ENV_VLM_CONNECT_TIMEOUT: &str = "DROID_VISION_VLM_CONNECT_TIMEOUT";
pub const ENV_ADB_PATH: &str = "DROID_VISION_ADB";
pub const ENV_SERIAL: &str = "DROID_VISION_SERIAL";
pub const ENV_PACKAGE: &str = "DROID_VISION_PACKAGE";
pub const ENV_ADB_TIMEOUT: &str = "DROID_VISION_ADB_TIMEOUT";
pub const ENV_SESSION_DIR: &str = "DROID_VISION_SESSION_DIR";
pub const ENV_MAX_ATTEMPTS: &str = "DROID_VISION_MAX_ATTEMPTS";

/// Credential fallback for OpenAI-compatible endpoints
pub const ENV_API_KEY_LEGACY: &str = "OPENAI_API_KEY";

// ============================================================================
// Configuration Getters (with caching)
// ============================================================================

static CONFIG: OnceLock<Config> = OnceLock::new();

/// Get the global configuration (initialized from environment on first access)
pub fn get() -> &'static Config {
    CONFIG.get_or_init(Config::from_env)
}

/// Centralized configuration for droid-vision
#[derive(Debug, Clone)]
pub struct Config {
    pub vlm: VlmSettings,
    pub device: DeviceSettings,
    pub session: SessionSettings,
    pub navigator: NavigatorDefaults,
}

/// VLM-related settings
#[derive(Clone)]
pub struct VlmSettings {
    /// Credential; `None` puts the classifier in fallback mode
    pub api_key: Option<String>,
    /// API endpoint URL
    pub endpoint: String,
    /// Model name
    pub model: String,
    /// Maximum tokens in response
    pub max_tokens: u32,
    /// Connection timeout (seconds)
    pub connect_timeout: u64,
    /// Whole-request timeout (seconds)
    pub request_timeout: u64,
}

// Keeps the credential out of debug logs.
impl std::fmt::Debug for VlmSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VlmSettings")
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("endpoint", &self.endpoint)
            .field("model", &self.model)
            .field("max_tokens", &self.max_tokens)
            .field("connect_timeout", &self.connect_timeout)
            .field("request_timeout", &self.request_timeout)
            .finish()
    }
}

/// Device bridge settings
#[derive(Debug, Clone)]
pub struct DeviceSettings {
    pub adb_path: String,
    pub serial: Option<String>,
    pub package: String,
    /// Timeout for one adb command (seconds)
    pub command_timeout: u64,
}

/// Session-related settings
#[derive(Debug, Clone)]
pub struct SessionSettings {
    /// Base directory for session storage
    pub base_dir: String,
}

/// Blocker-clearing and settle defaults
#[derive(Debug, Clone)]
pub struct NavigatorDefaults {
    pub max_attempts: u32,
    pub clear_settle_ms: u64,
    pub guess_settle_ms: u64,
    pub action_settle_ms: u64,
}

impl Config {
    /// Create configuration from environment variables, falling back to defaults
    pub fn from_env() -> Self {
        Self {
            vlm: VlmSettings::from_env(),
            device: DeviceSettings::from_env(),
            session: SessionSettings::from_env(),
            navigator: NavigatorDefaults::from_env(),
        }
    }

    /// Create configuration with all defaults (ignoring environment)
    pub fn defaults() -> Self {
        Self {
            vlm: VlmSettings::defaults(),
            device: DeviceSettings::defaults(),
            session: SessionSettings::defaults(),
            navigator: NavigatorDefaults::defaults(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_env()
    }
}

impl VlmSettings {
    pub fn from_env() -> Self {
        Self {
            api_key: non_empty_var(ENV_API_KEY).or_else(|| non_empty_var(ENV_API_KEY_LEGACY)),
            endpoint: env::var(ENV_VLM_ENDPOINT)
                .unwrap_or_else(|_| DEFAULT_VLM_ENDPOINT.to_string()),
            model: env::var(ENV_VLM_MODEL).unwrap_or_else(|_| DEFAULT_VLM_MODEL.to_string()),
            max_tokens: parsed_var(ENV_VLM_MAX_TOKENS).unwrap_or(DEFAULT_VLM_MAX_TOKENS),
            connect_timeout: parsed_var(ENV_VLM_CONNECT_TIMEOUT)
                .unwrap_or(DEFAULT_VLM_CONNECT_TIMEOUT),
            request_timeout: parsed_var(ENV_VLM_REQUEST_TIMEOUT)
                .unwrap_or(DEFAULT_VLM_REQUEST_TIMEOUT),
        }
    }

    pub fn defaults() -> Self {
        Self {
            api_key: None,
            endpoint: DEFAULT_VLM_ENDPOINT.to_string(),
            model: DEFAULT_VLM_MODEL.to_string(),
            max_tokens: DEFAULT_VLM_MAX_TOKENS,
            connect_timeout: DEFAULT_VLM_CONNECT_TIMEOUT,
            request_timeout: DEFAULT_VLM_REQUEST_TIMEOUT,
        }
    }

    /// Whether a credential is configured
    pub fn ai_enabled(&self) -> bool {
        self.api_key.is_some()
    }
}

impl DeviceSettings {
    pub fn from_env() -> Self {
        Self {
            adb_path: env::var(ENV_ADB_PATH).unwrap_or_else(|_| DEFAULT_ADB_PATH.to_string()),
            serial: non_empty_var(ENV_SERIAL),
            package: env::var(ENV_PACKAGE).unwrap_or_else(|_| DEFAULT_PACKAGE.to_string()),
            command_timeout: parsed_var(ENV_ADB_TIMEOUT).unwrap_or(DEFAULT_ADB_TIMEOUT),
        }
    }

    pub fn defaults() -> Self {
        Self {
            adb_path: DEFAULT_ADB_PATH.to_string(),
            serial: None,
            package: DEFAULT_PACKAGE.to_string(),
            command_timeout: DEFAULT_ADB_TIMEOUT,
        }
    }
}

impl SessionSettings {
    pub fn from_env() -> Self {
        Self {
            base_dir: env::var(ENV_SESSION_DIR).unwrap_or_else(|_| DEFAULT_SESSION_DIR.to_string()),
        }
    }

    pub fn defaults() -> Self {
        Self {
            base_dir: DEFAULT_SESSION_DIR.to_string(),
        }
    }
}

impl NavigatorDefaults {
    pub fn from_env() -> Self {
        Self {
            max_attempts: parsed_var(ENV_MAX_ATTEMPTS).unwrap_or(DEFAULT_MAX_CLEAR_ATTEMPTS),
            ..Self::defaults()
        }
    }

    pub fn defaults() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_CLEAR_ATTEMPTS,
            clear_settle_ms: DEFAULT_CLEAR_SETTLE_MS,
            guess_settle_ms: DEFAULT_GUESS_SETTLE_MS,
            action_settle_ms: DEFAULT_ACTION_SETTLE_MS,
        }
    }

    pub fn clear_settle(&self) -> Duration {
        Duration::from_millis(self.clear_settle_ms)
    }

    pub fn guess_settle(&self) -> Duration {
        Duration::from_millis(self.guess_settle_ms)
    }

    pub fn action_settle(&self) -> Duration {
        Duration::from_millis(self.action_settle_ms)
    }
}

// ============================================================================
// Helper Functions
// ============================================================================

fn non_empty_var(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

fn parsed_var<T: std::str::FromStr>(name: &str) -> Option<T> {
    env::var(name).ok().and_then(|s| s.trim().parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults() {
        let config = Config::defaults();
        assert_eq!(config.vlm.endpoint, DEFAULT_VLM_ENDPOINT);
        assert_eq!(config.vlm.model, DEFAULT_VLM_MODEL);
        assert!(!config.vlm.ai_enabled());
        assert_eq!(config.device.adb_path, DEFAULT_ADB_PATH);
        assert_eq!(config.session.base_dir, DEFAULT_SESSION_DIR);
        assert_eq!(config.navigator.max_attempts, 10);
    }

    #[test]
    fn test_settle_durations() {
        let nav = NavigatorDefaults::defaults();
        assert_eq!(nav.clear_settle(), Duration::from_secs(2));
        assert_eq!(nav.guess_settle(), Duration::from_secs(1));
        assert_eq!(nav.action_settle(), Duration::from_secs(3));
    }

    #[test]
    fn test_debug_redacts_api_key() {
        let mut vlm = VlmSettings::defaults();
        vlm.api_key = Some("sk-secret".to_string());
        let printed = format!("{:?}", vlm);
        assert!(!printed.contains("sk-secret"));
        assert!(printed.contains("<redacted>"));
    }
}
