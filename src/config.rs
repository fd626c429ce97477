use directories::ProjectDirs;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

use crate::{cinemeta, debrid, resolver, torrentio};

/// Environment variable holding the unlock service access token
pub const TOKEN_ENV: &str = "REALDEBRID";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("config directory not found")]
    NoConfigDir,
    #[error("config file not found at {0}")]
    NotFound(PathBuf),
    #[error("failed to read config: {0}")]
    ReadError(#[from] std::io::Error),
    #[error("failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),
    #[error("validation failed: {0}")]
    ValidationError(String),
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub debrid: DebridConfig,
    #[serde(default)]
    pub player: PlayerConfig,
    #[serde(default)]
    pub endpoints: EndpointsConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DebridConfig {
    pub token: Option<String>,
    #[serde(default = "default_debrid_url")]
    pub base_url: String,
    #[serde(default = "default_resolve_timeout")]
    pub resolve_timeout_secs: u64,
}

impl Default for DebridConfig {
    fn default() -> Self {
        Self {
            token: None,
            base_url: default_debrid_url(),
            resolve_timeout_secs: default_resolve_timeout(),
        }
    }
}

impl DebridConfig {
    /// Token with surrounding whitespace removed, None if blank
    pub fn token(&self) -> Option<&str> {
        self.token.as_deref().map(str::trim).filter(|t| !t.is_empty())
    }

    pub fn resolve_timeout(&self) -> Duration {
        Duration::from_secs(self.resolve_timeout_secs)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct PlayerConfig {
    #[serde(default = "default_player_command")]
    pub command: String,
    #[serde(default)]
    pub args: Vec<String>,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            command: default_player_command(),
            args: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct EndpointsConfig {
    #[serde(default = "default_cinemeta_url")]
    pub cinemeta: String,
    #[serde(default = "default_torrentio_url")]
    pub torrentio: String,
}

impl Default for EndpointsConfig {
    fn default() -> Self {
        Self {
            cinemeta: default_cinemeta_url(),
            torrentio: default_torrentio_url(),
        }
    }
}

fn default_player_command() -> String {
    "mpv".to_string()
}

fn default_debrid_url() -> String {
    debrid::DEFAULT_BASE_URL.to_string()
}

fn default_cinemeta_url() -> String {
    cinemeta::DEFAULT_BASE_URL.to_string()
}

fn default_torrentio_url() -> String {
    torrentio::DEFAULT_BASE_URL.to_string()
}

fn default_resolve_timeout() -> u64 {
    resolver::DEFAULT_RESOLVE_TIMEOUT.as_secs()
}

impl Config {
    /// Load from the default location. A missing file means defaults.
    /// The `REALDEBRID` environment variable overrides the configured token.
    pub fn load() -> Result<Self, ConfigError> {
        let path = Self::config_path()?;
        let config = match Self::load_from(&path) {
            Ok(config) => config,
            Err(ConfigError::NotFound(_)) => Config::default(),
            Err(e) => return Err(e),
        };
        Ok(config.with_env_token(std::env::var(TOKEN_ENV).ok()))
    }

    /// Load an explicit config file, which must exist
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::NotFound(path.to_path_buf()));
        }

        let contents = std::fs::read_to_string(path)?;
        Self::parse(&contents)
    }

    pub fn parse(contents: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    pub fn config_path() -> Result<PathBuf, ConfigError> {
        ProjectDirs::from("", "", "magplay")
            .map(|dirs| dirs.config_dir().join("config.toml"))
            .ok_or(ConfigError::NoConfigDir)
    }

    /// Replace the token with a non-blank environment value
    pub fn with_env_token(mut self, token: Option<String>) -> Self {
        if let Some(token) = token.filter(|t| !t.trim().is_empty()) {
            self.debrid.token = Some(token);
        }
        self
    }

    fn validate(&self) -> Result<(), ConfigError> {
        validate_url("debrid.base_url", &self.debrid.base_url)?;
        validate_url("endpoints.cinemeta", &self.endpoints.cinemeta)?;
        validate_url("endpoints.torrentio", &self.endpoints.torrentio)?;

        if self.debrid.resolve_timeout_secs == 0 {
            return Err(ConfigError::ValidationError(
                "debrid.resolve_timeout_secs must be greater than 0".to_string(),
            ));
        }

        if self.player.command.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "player.command cannot be empty".to_string(),
            ));
        }

        Ok(())
    }
}

fn validate_url(field: &str, value: &str) -> Result<(), ConfigError> {
    let parsed = url::Url::parse(value)
        .map_err(|e| ConfigError::ValidationError(format!("{} is not a valid URL: {}", field, e)))?;

    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(ConfigError::ValidationError(format!(
            "{} must start with http:// or https://",
            field
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = Config::parse("").unwrap();
        assert_eq!(config.player.command, "mpv");
        assert!(config.player.args.is_empty());
        assert_eq!(config.debrid.token(), None);
        assert_eq!(config.debrid.base_url, debrid::DEFAULT_BASE_URL);
        assert_eq!(config.debrid.resolve_timeout(), Duration::from_secs(120));
        assert_eq!(config.endpoints.cinemeta, cinemeta::DEFAULT_BASE_URL);
        assert_eq!(config.endpoints.torrentio, torrentio::DEFAULT_BASE_URL);
    }

    #[test]
    fn test_full_config() {
        let config = Config::parse(
            r#"
[debrid]
token = "  abc123  "
resolve_timeout_secs = 60

[player]
command = "vlc"
args = ["--fullscreen"]

[endpoints]
cinemeta = "http://localhost:8080/"
"#,
        )
        .unwrap();

        assert_eq!(config.debrid.token(), Some("abc123"));
        assert_eq!(config.debrid.resolve_timeout(), Duration::from_secs(60));
        assert_eq!(config.player.command, "vlc");
        assert_eq!(config.player.args, vec!["--fullscreen"]);
        assert_eq!(config.endpoints.cinemeta, "http://localhost:8080/");
        assert_eq!(config.endpoints.torrentio, torrentio::DEFAULT_BASE_URL);
    }

    #[test]
    fn test_blank_token_is_disabled() {
        let config = Config::parse("[debrid]\ntoken = \"   \"\n").unwrap();
        assert_eq!(config.debrid.token(), None);
    }

    #[test]
    fn test_env_token_overrides() {
        let config = Config::parse("[debrid]\ntoken = \"from-file\"\n").unwrap();

        let config = config.with_env_token(Some("from-env".to_string()));
        assert_eq!(config.debrid.token(), Some("from-env"));

        let config = config.with_env_token(Some("  ".to_string()));
        assert_eq!(config.debrid.token(), Some("from-env"));

        let config = config.with_env_token(None);
        assert_eq!(config.debrid.token(), Some("from-env"));
    }

    #[test]
    fn test_rejects_bad_urls() {
        let err = Config::parse("[endpoints]\ntorrentio = \"ftp://example.com\"\n").unwrap_err();
        assert!(matches!(err, ConfigError::ValidationError(_)));

        let err = Config::parse("[debrid]\nbase_url = \"not a url\"\n").unwrap_err();
        assert!(matches!(err, ConfigError::ValidationError(_)));
    }

    #[test]
    fn test_rejects_zero_timeout() {
        let err = Config::parse("[debrid]\nresolve_timeout_secs = 0\n").unwrap_err();
        assert!(matches!(err, ConfigError::ValidationError(_)));
    }

    #[test]
    fn test_parse_error() {
        let err = Config::parse("[player\ncommand = 1").unwrap_err();
        assert!(matches!(err, ConfigError::ParseError(_)));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[player]\ncommand = \"iina\"").unwrap();

        let config = Config::load_from(file.path()).unwrap();
        assert_eq!(config.player.command, "iina");

        let missing = file.path().with_extension("missing");
        assert!(matches!(
            Config::load_from(&missing),
            Err(ConfigError::NotFound(_))
        ));
    }
}
