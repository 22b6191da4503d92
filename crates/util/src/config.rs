//! Configuration for the intake pipeline.
//!
//! Settings live in a small JSON document written to the standard
//! configuration directory (`~/.config/intake/config.json` on most
//! platforms). A missing file yields [`IntakeConfig::default`]; a file that
//! fails to parse is reported and ignored so a stray edit cannot block the
//! intake flow.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use dirs_next::{config_dir, home_dir};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};
use url::Url;

/// Environment variable allowing callers to override the configuration file path.
pub const CONFIG_PATH_ENV: &str = "INTAKE_CONFIG_PATH";

/// Default filename for the JSON payload.
pub const CONFIG_FILE_NAME: &str = "config.json";

/// Error surfaced when reading configuration fails.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// I/O failure (for example, permissions on the config directory).
    #[error("config I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// `hostUrl` is not an absolute URL with an origin.
    #[error("invalid host url '{url}': {reason}")]
    InvalidHostUrl { url: String, reason: String },
}

/// Tunables for the checkout popup and its message protocol.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase", default)]
pub struct CheckoutSettings {
    /// Prefix of every handshake message type (`<namespace>-<source>-success`).
    pub namespace: String,
    /// Interval between checks for a user-closed popup.
    pub poll_interval_ms: u64,
    pub popup_width: u32,
    pub popup_height: u32,
    /// Target name passed when opening the popup.
    pub window_name: String,
}

impl Default for CheckoutSettings {
    fn default() -> Self {
        Self {
            namespace: "intake".to_string(),
            poll_interval_ms: 500,
            popup_width: 500,
            popup_height: 700,
            window_name: "checkout".to_string(),
        }
    }
}

impl CheckoutSettings {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(1))
    }
}

/// Root configuration document.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase", default)]
pub struct IntakeConfig {
    /// URL of the host page. Only handshake messages from its origin are accepted.
    pub host_url: String,
    pub checkout: CheckoutSettings,
}

impl Default for IntakeConfig {
    fn default() -> Self {
        Self {
            host_url: "http://localhost:3000".to_string(),
            checkout: CheckoutSettings::default(),
        }
    }
}

impl IntakeConfig {
    /// Loads configuration from `$INTAKE_CONFIG_PATH` or the default config directory.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&default_config_path())
    }

    /// Loads configuration from an explicit path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let config = match fs::read_to_string(path) {
            Ok(data) => match serde_json::from_str(&data) {
                Ok(config) => config,
                Err(error) => {
                    warn!(
                        path = %path.display(),
                        error = %error,
                        "Failed to parse intake config; using defaults"
                    );
                    IntakeConfig::default()
                }
            },
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "No intake config found; using defaults");
                IntakeConfig::default()
            }
            Err(error) => return Err(ConfigError::Io(error)),
        };
        config.host_origin()?;
        Ok(config)
    }

    /// Serialized origin (`scheme://host[:port]`) of [`IntakeConfig::host_url`].
    pub fn host_origin(&self) -> Result<String, ConfigError> {
        let invalid = |reason: String| ConfigError::InvalidHostUrl {
            url: self.host_url.clone(),
            reason,
        };
        let url = Url::parse(self.host_url.trim()).map_err(|error| invalid(error.to_string()))?;
        let origin = url.origin();
        if !origin.is_tuple() {
            return Err(invalid("url has an opaque origin".to_string()));
        }
        Ok(origin.ascii_serialization())
    }
}

/// Resolves the configuration path, honoring [`CONFIG_PATH_ENV`].
pub fn default_config_path() -> PathBuf {
    if let Ok(path) = env::var(CONFIG_PATH_ENV) {
        let trimmed = path.trim();
        if !trimmed.is_empty() {
            return expand_tilde(trimmed);
        }
    }

    config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("intake")
        .join(CONFIG_FILE_NAME)
}

/// Expands a leading `~` to the user's home directory.
pub fn expand_tilde(path: &str) -> PathBuf {
    let trimmed = path.trim();
    let home = || home_dir().unwrap_or_else(|| PathBuf::from("~"));
    if trimmed == "~" {
        return home();
    }
    match trimmed.strip_prefix("~/").or_else(|| trimmed.strip_prefix("~\\")) {
        Some(rest) => home().join(rest),
        None => PathBuf::from(trimmed),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempdir().unwrap();
        let config = IntakeConfig::load_from(&dir.path().join("absent.json")).unwrap();
        assert_eq!(config, IntakeConfig::default());
        assert_eq!(config.host_origin().unwrap(), "http://localhost:3000");
    }

    #[test]
    fn partial_file_merges_with_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);
        fs::write(
            &path,
            r#"{ "hostUrl": "https://firm.example/portal/register", "checkout": { "namespace": "lexpay" } }"#,
        )
        .unwrap();

        let config = IntakeConfig::load_from(&path).unwrap();
        assert_eq!(config.checkout.namespace, "lexpay");
        assert_eq!(config.checkout.poll_interval_ms, 500);
        assert_eq!(config.host_origin().unwrap(), "https://firm.example");
    }

    #[test]
    fn malformed_file_falls_back_to_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);
        fs::write(&path, "{ not json").unwrap();

        let config = IntakeConfig::load_from(&path).unwrap();
        assert_eq!(config, IntakeConfig::default());
    }

    #[test]
    fn rejects_host_url_without_origin() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);
        fs::write(&path, r#"{ "hostUrl": "not a url" }"#).unwrap();

        let error = IntakeConfig::load_from(&path).unwrap_err();
        assert!(matches!(error, ConfigError::InvalidHostUrl { .. }), "unexpected error: {error}");
    }

    #[test]
    fn env_override_selects_config_path() {
        temp_env::with_var(CONFIG_PATH_ENV, Some("/tmp/intake-test/config.json"), || {
            assert_eq!(default_config_path(), PathBuf::from("/tmp/intake-test/config.json"));
        });
    }

    #[test]
    fn poll_interval_never_zero() {
        let settings = CheckoutSettings {
            poll_interval_ms: 0,
            ..CheckoutSettings::default()
        };
        assert_eq!(settings.poll_interval(), Duration::from_millis(1));
    }
}
