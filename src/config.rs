use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_API_URL: &str = "http://localhost:8000";
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;
pub const DEFAULT_SESSION_PATH: &str = ".prompt-wizard/session.json";

/// Resolved runtime settings. CLI flags win over environment variables
/// (both handled by clap), which win over the defaults above.
#[derive(Debug, Clone)]
pub struct Settings {
    pub api_url: String,
    pub timeout: Duration,
    pub session_path: PathBuf,
}

impl Settings {
    pub fn new(api_url: Option<String>, timeout_secs: Option<u64>, session_path: Option<PathBuf>) -> Self {
        Self {
            api_url: normalize_base_url(api_url.as_deref().unwrap_or(DEFAULT_API_URL)),
            timeout: Duration::from_secs(timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS).max(1)),
            session_path: session_path.unwrap_or_else(|| PathBuf::from(DEFAULT_SESSION_PATH)),
        }
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self::new(None, None, None)
    }
}

/// Endpoints carry their own `/api` prefix, so a base URL that already ends
/// with it is cut back to the service root.
pub fn normalize_base_url(raw: &str) -> String {
    let trimmed = raw.trim().trim_end_matches('/');
    let root = trimmed.strip_suffix("/api").unwrap_or(trimmed);
    root.trim_end_matches('/').to_string()
}
