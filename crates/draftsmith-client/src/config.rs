//! Client configuration for the drafting agent endpoint.
//!
//! Priority: `~/.config/draftsmith/config.toml` > environment variables
//! (`DRAFTSMITH_API_URL`, `DRAFTSMITH_TURN_DELAY_MS`) > built-in defaults.

use draftsmith_infrastructure::paths;
use serde::Deserialize;
use std::env;
use std::fs;
use std::time::Duration;
use tracing::debug;

/// Default agent endpoint, matching the service's local deployment.
pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:8080/apcontract";

/// Cooperative backoff before each conversational turn, to stay inside the
/// upstream rate limits. Not a retry mechanism.
pub const DEFAULT_TURN_DELAY: Duration = Duration::from_secs(1);

/// Resolved client configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    pub base_url: String,
    pub turn_delay: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            turn_delay: DEFAULT_TURN_DELAY,
        }
    }
}

/// On-disk shape of `config.toml`; every field is optional.
#[derive(Debug, Default, Deserialize)]
struct ConfigFile {
    #[serde(default)]
    base_url: Option<String>,
    #[serde(default)]
    turn_delay_ms: Option<u64>,
}

impl ClientConfig {
    /// Loads the configuration with the documented priority chain. A missing
    /// or unreadable config file falls through to environment variables and
    /// defaults; a present-but-invalid file is reported via tracing and
    /// otherwise ignored.
    pub fn load() -> Self {
        let file = load_config_file().unwrap_or_default();

        let base_url = file
            .base_url
            .or_else(|| env::var("DRAFTSMITH_API_URL").ok())
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());

        let turn_delay = file
            .turn_delay_ms
            .or_else(|| {
                env::var("DRAFTSMITH_TURN_DELAY_MS")
                    .ok()
                    .and_then(|v| v.parse().ok())
            })
            .map(Duration::from_millis)
            .unwrap_or(DEFAULT_TURN_DELAY);

        Self {
            base_url,
            turn_delay,
        }
    }
}

fn load_config_file() -> Option<ConfigFile> {
    let path = paths::config_file_path().ok()?;
    if !path.exists() {
        return None;
    }
    let content = fs::read_to_string(&path).ok()?;
    match toml::from_str(&content) {
        Ok(file) => Some(file),
        Err(e) => {
            debug!(path = %path.display(), error = %e, "ignoring invalid config file");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sensible() {
        let config = ClientConfig::default();
        assert_eq!(config.base_url, DEFAULT_BASE_URL);
        assert_eq!(config.turn_delay, Duration::from_secs(1));
    }

    #[test]
    fn config_file_fields_are_optional() {
        let file: ConfigFile = toml::from_str("base_url = \"http://agent:9000/apcontract\"").unwrap();
        assert_eq!(file.base_url.as_deref(), Some("http://agent:9000/apcontract"));
        assert!(file.turn_delay_ms.is_none());
        let empty: ConfigFile = toml::from_str("").unwrap();
        assert!(empty.base_url.is_none());
    }
}
