// Configuration module for the TalkTagger client

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::core::pipeline::Platform;

// =============================================================================
// CONFIGURATION STRUCTURES
// =============================================================================

/// Game server settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerSettings {
    /// Base URL of the server (http/https)
    #[serde(default = "default_url")]
    pub url: String,
    /// WebSocket endpoint path appended to the base URL
    #[serde(default = "default_ws_path")]
    pub ws_path: String,
    #[serde(default = "default_auto_reconnect")]
    pub auto_reconnect: bool,
}

fn default_url() -> String {
    "http://localhost:5000".to_string()
}
fn default_ws_path() -> String {
    "/ws".to_string()
}
fn default_auto_reconnect() -> bool {
    true
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            url: default_url(),
            ws_path: default_ws_path(),
            auto_reconnect: default_auto_reconnect(),
        }
    }
}

impl ServerSettings {
    /// Base URL without trailing slash
    pub fn http_base(&self) -> &str {
        self.url.trim_end_matches('/')
    }

    /// WebSocket URL derived from the HTTP base
    pub fn ws_url(&self) -> String {
        let base = self.http_base();
        let ws_base = if let Some(rest) = base.strip_prefix("https://") {
            format!("wss://{}", rest)
        } else if let Some(rest) = base.strip_prefix("http://") {
            format!("ws://{}", rest)
        } else {
            base.to_string()
        };
        let path = self.ws_path.trim_start_matches('/');
        if path.is_empty() {
            ws_base
        } else {
            format!("{}/{}", ws_base, path)
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingSettings {
    /// Mirror logs to stderr
    #[serde(default)]
    pub console: bool,
    /// Log file path (relative to the config file or absolute). Empty = no file logging.
    #[serde(default = "default_log_file")]
    pub log_file: String,
}

fn default_log_file() -> String {
    "talktagger.log".to_string()
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            console: false,
            log_file: default_log_file(),
        }
    }
}

/// Where reconnection tokens are persisted
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageSettings {
    #[serde(default = "default_token_file")]
    pub token_file: String,
}

fn default_token_file() -> String {
    "talktagger_tokens.toml".to_string()
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            token_file: default_token_file(),
        }
    }
}

/// Chat upload defaults
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UploadSettings {
    #[serde(default)]
    pub platform: Platform,
}

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub server: ServerSettings,
    #[serde(default)]
    pub logging: LoggingSettings,
    #[serde(default)]
    pub storage: StorageSettings,
    #[serde(default)]
    pub upload: UploadSettings,
    /// Directory relative paths are resolved against
    #[serde(skip)]
    base_dir: PathBuf,
}

// =============================================================================
// CONFIG LOADING
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Could not determine config file path")]
    PathError,
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),
    #[error("Failed to parse config file: {0}")]
    ParseError(#[from] toml::de::Error),
}

impl Config {
    pub const CONFIG_FILENAME: &'static str = "talktagger.toml";
    pub const CONFIG_ENV_VAR: &'static str = "TALKTAGGER_CONFIG";

    /// Locate the config file: env override, then next to the executable,
    /// then the working directory
    pub fn find_config_path() -> Result<PathBuf, ConfigError> {
        if let Ok(path) = std::env::var(Self::CONFIG_ENV_VAR) {
            if !path.is_empty() {
                return Ok(PathBuf::from(path));
            }
        }

        let exe_candidate = std::env::current_exe()
            .ok()
            .and_then(|exe| exe.parent().map(|dir| dir.join(Self::CONFIG_FILENAME)));
        if let Some(candidate) = exe_candidate.filter(|p| p.exists()) {
            return Ok(candidate);
        }

        let cwd = std::env::current_dir().map_err(|_| ConfigError::PathError)?;
        Ok(cwd.join(Self::CONFIG_FILENAME))
    }

    /// Load from the default location
    pub fn load_default() -> Result<Self, ConfigError> {
        Self::load(&Self::find_config_path()?)
    }

    /// Load from a file; a missing file yields defaults
    pub fn load(config_path: &Path) -> Result<Self, ConfigError> {
        debug!(path = %config_path.display(), "[config] Looking for config");

        let base_dir = config_path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();

        let mut config: Config = if config_path.exists() {
            let contents = fs::read_to_string(config_path)?;
            let config: Config = toml::from_str(&contents)?;
            info!(path = %config_path.display(), "[config] Loaded config");
            config
        } else {
            debug!("[config] No config found, using defaults");
            Config::default()
        };

        config.base_dir = base_dir;
        Ok(config)
    }

    fn resolve(&self, path: &str) -> PathBuf {
        let path = Path::new(path);
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.base_dir.join(path)
        }
    }

    pub fn log_file_path(&self) -> Option<PathBuf> {
        if self.logging.log_file.is_empty() {
            None
        } else {
            Some(self.resolve(&self.logging.log_file))
        }
    }

    pub fn token_file_path(&self) -> PathBuf {
        self.resolve(&self.storage.token_file)
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    fn write_config(dir: &TempDir, contents: &str) -> PathBuf {
        let path = dir.path().join(Config::CONFIG_FILENAME);
        let mut file = fs::File::create(&path).unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        path
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let dir = TempDir::new().unwrap();
        let config = Config::load(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(config.server.url, "http://localhost:5000");
        assert!(config.server.auto_reconnect);
        assert!(!config.logging.console);
        assert_eq!(config.upload.platform, Platform::Discord);
        assert_eq!(
            config.token_file_path(),
            dir.path().join("talktagger_tokens.toml")
        );
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let dir = TempDir::new().unwrap();
        let path = write_config(
            &dir,
            r#"
[server]
url = "https://talktagger.example.com/"

[upload]
platform = "wp"
"#,
        );
        let config = Config::load(&path).unwrap();
        assert_eq!(config.server.http_base(), "https://talktagger.example.com");
        assert_eq!(config.server.ws_url(), "wss://talktagger.example.com/ws");
        assert_eq!(config.upload.platform, Platform::WhatsApp);
        assert_eq!(config.storage.token_file, "talktagger_tokens.toml");
    }

    #[test]
    fn test_invalid_file_is_parse_error() {
        let dir = TempDir::new().unwrap();
        let path = write_config(&dir, "[server\nurl = ");
        assert!(matches!(
            Config::load(&path),
            Err(ConfigError::ParseError(_))
        ));
    }

    #[test]
    fn test_empty_log_file_disables_file_logging() {
        let dir = TempDir::new().unwrap();
        let path = write_config(&dir, "[logging]\nlog_file = \"\"\n");
        let config = Config::load(&path).unwrap();
        assert!(config.log_file_path().is_none());
    }

    #[test]
    fn test_absolute_paths_kept() {
        let dir = TempDir::new().unwrap();
        let tokens = dir.path().join("elsewhere").join("tokens.toml");
        let path = write_config(
            &dir,
            &format!("[storage]\ntoken_file = {:?}\n", tokens.display().to_string()),
        );
        let config = Config::load(&path).unwrap();
        assert_eq!(config.token_file_path(), tokens);
    }

    #[test]
    fn test_ws_url_conversion() {
        let mut server = ServerSettings::default();
        assert_eq!(server.ws_url(), "ws://localhost:5000/ws");
        server.ws_path = String::new();
        assert_eq!(server.ws_url(), "ws://localhost:5000");
        server.url = "wss://already.example".to_string();
        assert_eq!(server.ws_url(), "wss://already.example");
    }
}
