//! Runtime configuration read from the environment; binaries layer CLI flags on top.

use std::env;
use std::path::PathBuf;
use std::time::Duration;

pub const ENV_API_URL: &str = "CAMPUS_PORTAL_API_URL";
pub const ENV_TOKEN_DIR: &str = "CAMPUS_PORTAL_TOKEN_DIR";
pub const ENV_HTTP_TIMEOUT_SECS: &str = "CAMPUS_PORTAL_HTTP_TIMEOUT_SECS";
pub const ENV_VERIFY_ON_START: &str = "CAMPUS_PORTAL_VERIFY_ON_START";

pub const DEFAULT_API_URL: &str = "http://127.0.0.1:7880";
pub const DEFAULT_TOKEN_DIR: &str = ".campus_portal";
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 15;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortalConfig {
    pub api_base_url: String,
    pub token_dir: PathBuf,
    pub request_timeout: Duration,
    /// Confirm a persisted token with the backend before trusting it.
    pub verify_on_start: bool,
}

impl Default for PortalConfig {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_URL.to_string(),
            token_dir: PathBuf::from(DEFAULT_TOKEN_DIR),
            request_timeout: Duration::from_secs(DEFAULT_HTTP_TIMEOUT_SECS),
            verify_on_start: true,
        }
    }
}

pub fn parse_bool(s: &str) -> Option<bool> {
    match s.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

impl PortalConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|k| env::var(k).ok())
    }

    /// Same as `from_env` with an injectable lookup; unparsable values fall back to defaults.
    pub fn from_lookup<F: Fn(&str) -> Option<String>>(lookup: F) -> Self {
        let mut cfg = Self::default();
        if let Some(url) = lookup(ENV_API_URL).filter(|s| !s.trim().is_empty()) {
            cfg.api_base_url = url.trim().to_string();
        }
        if let Some(dir) = lookup(ENV_TOKEN_DIR).filter(|s| !s.trim().is_empty()) {
            cfg.token_dir = PathBuf::from(dir);
        }
        match lookup(ENV_HTTP_TIMEOUT_SECS).map(|s| s.trim().parse::<u64>()) {
            Some(Ok(secs)) if secs > 0 => cfg.request_timeout = Duration::from_secs(secs),
            Some(_) => tracing::warn!("ignoring invalid {}", ENV_HTTP_TIMEOUT_SECS),
            None => {}
        }
        if let Some(b) = lookup(ENV_VERIFY_ON_START).and_then(|s| parse_bool(&s)) {
            cfg.verify_on_start = b;
        }
        cfg
    }
}
