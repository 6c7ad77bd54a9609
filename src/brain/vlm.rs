//! Vision Language Model (VLM) client.
//!
//! Talks to any OpenAI-compatible chat-completions endpoint by spawning
//! `curl`, sending the screenshot as a base64 data URL next to an
//! instruction prompt that asks for a JSON object.
//!
//! # Configuration
//!
//! See [`crate::config`]: the credential (`DROID_VISION_API_KEY`) turns AI
//! mode on; endpoint, model, token limit and timeouts have defaults.

use base64::Engine;
use std::io::Write;
use std::process::Command;
use std::time::Duration;

use tracing::debug;

use super::provider::ClassificationProvider;
use super::reply::{parse_bug_report, parse_classification};
use super::types::{BrainError, BrainResult, BugReport, Classification};
use crate::config::VlmSettings;
use crate::device::ScreenshotRef;
use crate::process::{ProcessError, run_with_timeout};

/// Extra time granted to curl beyond its own `--max-time`
const PROCESS_GRACE: Duration = Duration::from_secs(5);

/// curl exit code for an operation timeout
const CURL_TIMEOUT_EXIT: i32 = 28;

/// Prompt for screen classification
pub const CLASSIFY_PROMPT: &str = "You are driving a mobile slot game for automated UI testing. \
Look at this Android screenshot and answer with ONE JSON object and nothing else:\n\
{\n\
  \"screen_type\": \"game_ready\" | \"game_loaded\" | \"loading\" | \"popup\" | \"crash\" | \"unknown\",\n\
  \"action\": \"tap\" | \"wait\" | \"none\",\n\
  \"target\": \"<element to act on or null>\",\n\
  \"coords\": [x, y] or null (required when action is tap, in screen pixels),\n\
  \"blocking_elements\": [{\"type\": \"<popup kind>\", \"coords\": [x, y]}],\n\
  \"is_bug\": true | false,\n\
  \"bug_details\": {\"type\": \"...\", \"severity\": \"low|medium|high\", \"description\": \"...\"} or null,\n\
  \"reasoning\": \"<one sentence>\"\n\
}\n\
List every dialog, sale offer, rate-us prompt, permission prompt or message of the day that \
covers the game in blocking_elements, with the position of its close button. \
Use game_ready only when nothing blocks the main game screen.";

/// Prompt for the dedicated bug check
pub const BUG_PROMPT: &str = "You are a QA engineer reviewing a screenshot of a mobile slot game. \
Check for crashes, frozen or black screens, error dialogs, missing textures, overlapping or \
clipped UI and garbled text. Answer with ONE JSON object and nothing else:\n\
{\"has_bug\": true | false, \"bug_type\": \"...\" or null, \"severity\": \"low|medium|high\" or null, \
\"description\": \"...\" or null}";

/// Configuration for VLM client
#[derive(Clone)]
pub struct VlmConfig {
    /// API endpoint URL
    pub endpoint: String,
    /// Model name to use
    pub model: String,
    /// Bearer credential
    pub api_key: Option<String>,
    /// Maximum tokens in response
    pub max_tokens: u32,
    /// Timeout for initial connection (seconds)
    pub connection_timeout: u64,
    /// Timeout for the whole request (seconds)
    pub request_timeout: u64,
}

impl std::fmt::Debug for VlmConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VlmConfig")
            .field("endpoint", &self.endpoint)
            .field("model", &self.model)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("max_tokens", &self.max_tokens)
            .finish()
    }
}

impl VlmConfig {
    pub fn from_settings(settings: &VlmSettings) -> Self {
        Self {
            endpoint: settings.endpoint.clone(),
            model: settings.model.clone(),
            api_key: settings.api_key.clone(),
            max_tokens: settings.max_tokens,
            connection_timeout: settings.connect_timeout,
            request_timeout: settings.request_timeout,
        }
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    pub fn max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn request_timeout(mut self, seconds: u64) -> Self {
        self.request_timeout = seconds;
        self
    }
}

/// Check if a VLM endpoint is reachable (connection-only check).
///
/// Any HTTP status counts as reachable; only a failed connection does not.
pub fn check_health(endpoint: &str, timeout_secs: u64) -> BrainResult<bool> {
    let output = Command::new("curl")
        .args([
            "-s",
            "-o", "/dev/null",
            "-w", "%{http_code}",
            "--connect-timeout", &timeout_secs.to_string(),
            "--max-time", &timeout_secs.to_string(),
            "-I",
            endpoint,
        ])
        .output()?;

    let status = String::from_utf8_lossy(&output.stdout);
    // 000 means the connection failed entirely
    let code: u16 = status.trim().parse().unwrap_or(0);
    Ok(code > 0)
}

/// Build the chat-completions request body
pub fn build_request(config: &VlmConfig, image_data: &[u8], prompt: &str) -> serde_json::Value {
    let img_base64 = base64::engine::general_purpose::STANDARD.encode(image_data);

    serde_json::json!({
        "model": config.model,
        "messages": [{
            "role": "user",
            "content": [
                {
                    "type": "image_url",
                    "image_url": {
                        "url": format!("data:image/png;base64,{}", img_base64)
                    }
                },
                {
                    "type": "text",
                    "text": prompt
                }
            ]
        }],
        "max_tokens": config.max_tokens,
        "temperature": 0
    })
}

/// Send one image + prompt and return the model's text reply
pub fn analyze_image(config: &VlmConfig, image_data: &[u8], prompt: &str) -> BrainResult<String> {
    let request = build_request(config, image_data, prompt);
    let body = serde_json::to_vec(&request).map_err(|e| BrainError::Malformed(e.to_string()))?;

    let mut args: Vec<String> = vec![
        "-s".into(),
        "-S".into(),
        "-X".into(),
        "POST".into(),
        config.endpoint.clone(),
        "-H".into(),
        "Content-Type: application/json".into(),
        // No 100-continue round trip for large image bodies
        "-H".into(),
        "Expect:".into(),
        "--data-binary".into(),
        "@-".into(),
        "--connect-timeout".into(),
        config.connection_timeout.to_string(),
        "--max-time".into(),
        config.request_timeout.to_string(),
        "-w".into(),
        "\n%{http_code}".into(),
    ];
    // Kept alive until curl has finished reading it
    let auth = config.api_key.as_deref().map(auth_config).transpose()?;
    if let Some(file) = &auth {
        args.push("-K".into());
        args.push(file.path().display().to_string());
    }

    debug!(endpoint = %config.endpoint, model = %config.model, bytes = body.len(), "VLM request");

    let timeout = Duration::from_secs(config.request_timeout) + PROCESS_GRACE;
    let output = run_with_timeout("curl", &args, Some(body), timeout).map_err(|e| match e {
        ProcessError::Timeout(d) => BrainError::Timeout(d),
        ProcessError::Spawn { source, .. } => BrainError::ConnectionFailed(source.to_string()),
        ProcessError::Io(e) => BrainError::Io(e),
    })?;

    if !output.success() {
        if output.status.code() == Some(CURL_TIMEOUT_EXIT) {
            return Err(BrainError::Timeout(Duration::from_secs(config.request_timeout)));
        }
        return Err(BrainError::ConnectionFailed(output.diagnostic()));
    }

    let stdout = String::from_utf8_lossy(&output.stdout);
    let (body, status) = split_status(&stdout)?;
    if status >= 400 {
        return Err(BrainError::Backend {
            status,
            body: body.chars().take(300).collect(),
        });
    }

    extract_content(body)
}

/// curl config file carrying the credential header, so it never shows up
/// in the process list. The file is owner-only and removed on drop.
fn auth_config(key: &str) -> BrainResult<tempfile::NamedTempFile> {
    let mut file = tempfile::Builder::new().prefix("droid-vision-curl-").tempfile()?;
    let escaped = key.replace('\\', "\\\\").replace('"', "\\\"");
    writeln!(file, "header = \"Authorization: Bearer {}\"", escaped)?;
    file.flush()?;
    Ok(file)
}

/// Split curl's `-w "\n%{http_code}"` trailer off the body
fn split_status(stdout: &str) -> BrainResult<(&str, u16)> {
    let (body, code) = stdout
        .trim_end()
        .rsplit_once('\n')
        .ok_or_else(|| BrainError::Malformed("missing HTTP status trailer".to_string()))?;
    let status = code
        .trim()
        .parse()
        .map_err(|_| BrainError::Malformed(format!("bad HTTP status '{}'", code.trim())))?;
    Ok((body, status))
}

/// Text content of the first choice of a chat-completions response
fn extract_content(body: &str) -> BrainResult<String> {
    let response: serde_json::Value =
        serde_json::from_str(body).map_err(|e| BrainError::Malformed(e.to_string()))?;

    let message = &response["choices"][0]["message"];
    let content = message["content"]
        .as_str()
        .filter(|s| !s.trim().is_empty())
        // Thinking models sometimes only fill reasoning_content
        .or_else(|| message["reasoning_content"].as_str())
        .ok_or_else(|| BrainError::Malformed("response has no message content".to_string()))?;

    Ok(content.to_string())
}

/// Screen classifier backed by a VLM endpoint
#[derive(Debug, Clone)]
pub struct VlmProvider {
    config: VlmConfig,
}

impl VlmProvider {
    pub fn new(config: VlmConfig) -> Self {
        Self { config }
    }

    fn ask(&self, shot: &ScreenshotRef, prompt: &str) -> BrainResult<String> {
        let image = shot.read_bytes()?;
        analyze_image(&self.config, &image, prompt)
    }
}

impl ClassificationProvider for VlmProvider {
    fn classify(&self, shot: &ScreenshotRef) -> BrainResult<Classification> {
        let reply = self.ask(shot, CLASSIFY_PROMPT)?;
        debug!(label = %shot.label, %reply, "classification reply");
        parse_classification(&reply)
    }

    fn detect_bug(&self, shot: &ScreenshotRef, _expected_state: &str) -> BrainResult<BugReport> {
        // The expected outcome is not part of the verdict yet
        let reply = self.ask(shot, BUG_PROMPT)?;
        debug!(label = %shot.label, %reply, "bug-check reply");
        parse_bug_report(&reply)
    }

    fn name(&self) -> &str {
        "vlm"
    }
}
