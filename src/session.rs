//! Session management for run artifacts.
//!
//! Every run gets its own directory under a base location holding:
//! - screenshots captured during the run
//! - the HTML report
//! - a `.session.json` metadata file

use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

/// A run session with organized file management
#[derive(Debug, Clone)]
pub struct Session {
    /// Unique session ID
    pub id: String,
    /// Root directory for this session
    pub dir: PathBuf,
}

impl Session {
    /// Create a session with a name prefix under an explicit base directory
    pub fn with_name_in(base: impl AsRef<Path>, name: &str) -> Self {
        let id = format!("{}_{}", sanitize_name(name), generate_timestamp_suffix());
        let dir = base.as_ref().join(&id);
        Self { id, dir }
    }

    /// Use a specific directory as the session
    pub fn in_dir(dir: impl Into<PathBuf>) -> Self {
        let dir = dir.into();
        let id = dir
            .file_name()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| format!("session_{}", generate_timestamp_suffix()));
        Self { id, dir }
    }

    /// Create the session directory and write its metadata
    pub fn init(&self, device: &str, ai_enabled: bool) -> std::io::Result<()> {
        fs::create_dir_all(&self.dir)?;

        let metadata = serde_json::json!({
            "id": self.id,
            "created": chrono::Utc::now().to_rfc3339(),
            "device": device,
            "ai_enabled": ai_enabled,
        });

        let metadata_path = self.dir.join(".session.json");
        fs::write(metadata_path, serde_json::to_string_pretty(&metadata)?)?;

        Ok(())
    }

    /// HTML and JSON report paths for one run, sharing a single timestamp
    pub fn report_paths(&self) -> (PathBuf, PathBuf) {
        let stamp = chrono::Local::now().format("%Y%m%d_%H%M%S").to_string();
        (
            self.dir.join(format!("report_{}.html", stamp)),
            self.dir.join(format!("report_{}.json", stamp)),
        )
    }

    /// List all PNG files in the session
    pub fn list_captures(&self) -> std::io::Result<Vec<PathBuf>> {
        let mut captures = Vec::new();
        if self.dir.exists() {
            for entry in fs::read_dir(&self.dir)? {
                let path = entry?.path();
                if path.extension().map(|e| e == "png").unwrap_or(false) {
                    captures.push(path);
                }
            }
        }
        captures.sort();
        Ok(captures)
    }
}

/// File name for the `sequence`-th capture of a session.
///
/// The sequence prefix keeps names unique even when two captures share a
/// label and land in the same second.
pub fn capture_file_name(sequence: u64, label: &str) -> String {
    let stamp = chrono::Local::now().format("%H%M%S");
    format!("{:04}_{}_{}.png", sequence, sanitize_name(label), stamp)
}

/// Generate a timestamp suffix
fn generate_timestamp_suffix() -> String {
    chrono::Utc::now().format("%Y%m%d_%H%M%S").to_string()
}

/// Sanitize a name for use in filenames
pub fn sanitize_name(name: &str) -> String {
    name.chars()
        .map(|c| match c {
            'a'..='z' | 'A'..='Z' | '0'..='9' | '-' | '_' => c,
            _ => '_',
        })
        .collect()
}

/// Remove session directories older than `max_age`; returns how many were removed
pub fn cleanup_old_sessions(base: &Path, max_age: std::time::Duration) -> std::io::Result<usize> {
    if !base.exists() {
        return Ok(0);
    }

    let now = SystemTime::now();
    let mut cleaned = 0;

    for entry in fs::read_dir(base)? {
        let entry = entry?;
        let path = entry.path();
        if !path.is_dir() {
            continue;
        }

        let age = entry
            .metadata()
            .and_then(|m| m.modified())
            .ok()
            .and_then(|modified| now.duration_since(modified).ok());

        if let Some(age) = age {
            if age > max_age && fs::remove_dir_all(&path).is_ok() {
                cleaned += 1;
            }
        }
    }

    Ok(cleaned)
}

/// List all existing sessions under `base`
pub fn list_sessions(base: &Path) -> std::io::Result<Vec<PathBuf>> {
    if !base.exists() {
        return Ok(Vec::new());
    }

    let mut sessions = Vec::new();
    for entry in fs::read_dir(base)? {
        let path = entry?.path();
        if path.is_dir() {
            sessions.push(path);
        }
    }
    sessions.sort();
    Ok(sessions)
}
