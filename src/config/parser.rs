use std::path::{Path, PathBuf};

use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{CONFIG_FILE, ConfigError, EnvLookup, config_dir};
use crate::output::OutputFormat;

pub const DEFAULT_BASE_URL: &str = "https://slack.com/api";

/// Non-secret settings. Tokens live in the credential store, never here.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub oauth: OAuthConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ApiConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct OutputConfig {
    #[serde(default = "default_output_format")]
    pub format: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            format: default_output_format(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct OAuthConfig {
    #[serde(default)]
    pub client_id: Option<String>,
    /// Only ever populated from the environment.
    #[serde(skip)]
    pub client_secret: Option<SecretString>,
    #[serde(default = "default_oauth_port")]
    pub port: u16,
}

impl Default for OAuthConfig {
    fn default() -> Self {
        Self {
            client_id: None,
            client_secret: None,
            port: default_oauth_port(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    #[serde(alias = "console", default = "default_log_level")]
    pub level: String,
    #[serde(default = "default_log_format")]
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl Config {
    /// Explicit path, else `SLCK_CONFIG`, else `<config dir>/config.yaml`.
    pub fn resolve_path(explicit: Option<&Path>, env: &EnvLookup) -> Option<PathBuf> {
        if let Some(path) = explicit {
            return Some(path.to_path_buf());
        }
        if let Some(path) = env("SLCK_CONFIG").filter(|value| !value.trim().is_empty()) {
            return Some(PathBuf::from(path));
        }
        config_dir(env).map(|dir| dir.join(CONFIG_FILE))
    }

    pub fn load(explicit: Option<&Path>, env: &EnvLookup) -> Result<Self, ConfigError> {
        let mut config = match Self::resolve_path(explicit, env) {
            Some(path) if path.exists() => Self::load_from_file(&path)?,
            Some(path) => {
                debug!("no config file at {}, using defaults", path.display());
                Self::default()
            }
            None => Self::default(),
        };
        config.apply_env_overrides(env);
        config.normalize();
        config.validate()?;
        Ok(config)
    }

    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(&content).map_err(|source| ConfigError::Yaml {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.api.timeout_secs == 0 {
            return Err(ConfigError::InvalidConfig(
                "api.timeout_secs must be greater than 0".to_string(),
            ));
        }

        let base_url = url::Url::parse(&self.api.base_url).map_err(|err| {
            ConfigError::InvalidConfig(format!(
                "api.base_url {:?} is not a valid URL: {err}",
                self.api.base_url
            ))
        })?;
        if !matches!(base_url.scheme(), "http" | "https") {
            return Err(ConfigError::InvalidConfig(format!(
                "api.base_url must use http or https, got {:?}",
                base_url.scheme()
            )));
        }

        if self.output.format.parse::<OutputFormat>().is_err() {
            return Err(ConfigError::InvalidConfig(format!(
                "output.format must be one of text, json, table, got {:?}",
                self.output.format
            )));
        }

        if self.oauth.port == 0 {
            return Err(ConfigError::InvalidConfig(
                "oauth.port must be between 1 and 65535".to_string(),
            ));
        }

        if !matches!(self.logging.format.as_str(), "pretty" | "json") {
            return Err(ConfigError::InvalidConfig(format!(
                "logging.format must be pretty or json, got {:?}",
                self.logging.format
            )));
        }

        Ok(())
    }

    pub fn output_format(&self) -> OutputFormat {
        self.output.format.parse().unwrap_or_default()
    }

    fn normalize(&mut self) {
        let trimmed = self.api.base_url.trim().trim_end_matches('/').to_string();
        self.api.base_url = trimmed;
        self.output.format = self.output.format.trim().to_ascii_lowercase();
        self.logging.format = self.logging.format.trim().to_ascii_lowercase();
        if self
            .oauth
            .client_id
            .as_deref()
            .is_some_and(|id| id.trim().is_empty())
        {
            self.oauth.client_id = None;
        }
    }

    fn apply_env_overrides(&mut self, env: &EnvLookup) {
        let non_empty = |name: &str| env(name).filter(|value| !value.trim().is_empty());

        if let Some(value) = non_empty("SLCK_BASE_URL") {
            self.api.base_url = value;
        }
        if let Some(value) = non_empty("SLCK_OUTPUT") {
            self.output.format = value;
        }
        if let Some(value) = non_empty("SLACK_CLIENT_ID") {
            self.oauth.client_id = Some(value);
        }
        if let Some(value) = non_empty("SLACK_CLIENT_SECRET") {
            self.oauth.client_secret = Some(SecretString::from(value));
        }
    }
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_output_format() -> String {
    "text".to_string()
}

fn default_oauth_port() -> u16 {
    crate::oauth::DEFAULT_PORT
}

fn default_log_level() -> String {
    "warn".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

#[cfg(test)]
mod tests {
    use secrecy::ExposeSecret;
    use tempfile::TempDir;

    use super::*;
    use crate::config::fixed_env;

    fn write_config(dir: &TempDir, content: &str) -> PathBuf {
        let path = dir.path().join("config.yaml");
        std::fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn missing_file_yields_defaults_without_creating_it() {
        let dir = TempDir::new().unwrap();
        let env = fixed_env(&[("XDG_CONFIG_HOME", dir.path().to_str().unwrap())]);

        let config = Config::load(None, &env).unwrap();
        assert_eq!(config.api.base_url, DEFAULT_BASE_URL);
        assert_eq!(config.api.timeout_secs, 30);
        assert_eq!(config.oauth.port, 8085);
        assert_eq!(config.output_format(), OutputFormat::Text);
        assert_eq!(config.logging.level, "warn");
        assert!(!dir.path().join("slck").exists());
    }

    #[test]
    fn partial_file_keeps_defaults_for_missing_keys() {
        let dir = TempDir::new().unwrap();
        let path = write_config(
            &dir,
            "api:\n  base_url: http://localhost:9000/api/\noutput:\n  format: TABLE\n",
        );

        let config = Config::load(Some(&path), &fixed_env(&[])).unwrap();
        assert_eq!(config.api.base_url, "http://localhost:9000/api");
        assert_eq!(config.api.timeout_secs, 30);
        assert_eq!(config.output_format(), OutputFormat::Table);
    }

    #[test]
    fn env_overrides_file_values() {
        let dir = TempDir::new().unwrap();
        let path = write_config(&dir, "oauth:\n  client_id: from-file\n  port: 9999\n");
        let env = fixed_env(&[
            ("SLCK_CONFIG", path.to_str().unwrap()),
            ("SLCK_OUTPUT", "json"),
            ("SLACK_CLIENT_ID", "from-env"),
            ("SLACK_CLIENT_SECRET", "shh"),
        ]);

        let config = Config::load(None, &env).unwrap();
        assert_eq!(config.output_format(), OutputFormat::Json);
        assert_eq!(config.oauth.client_id.as_deref(), Some("from-env"));
        assert_eq!(config.oauth.port, 9999);
        assert_eq!(
            config.oauth.client_secret.as_ref().unwrap().expose_secret(),
            "shh"
        );
    }

    #[test]
    fn client_secret_is_never_read_from_file() {
        let dir = TempDir::new().unwrap();
        let path = write_config(&dir, "oauth:\n  client_secret: leaked\n");

        let config = Config::load(Some(&path), &fixed_env(&[])).unwrap();
        assert!(config.oauth.client_secret.is_none());
    }

    #[test]
    fn malformed_yaml_is_an_error() {
        let dir = TempDir::new().unwrap();
        let path = write_config(&dir, "api: [unclosed\n");

        let err = Config::load(Some(&path), &fixed_env(&[])).unwrap_err();
        assert!(matches!(err, ConfigError::Yaml { .. }));
    }

    #[test]
    fn validation_rejects_bad_values() {
        let cases = [
            "api:\n  timeout_secs: 0\n",
            "api:\n  base_url: ftp://slack.com/api\n",
            "output:\n  format: xml\n",
            "oauth:\n  port: 0\n",
            "logging:\n  format: syslog\n",
        ];
        for content in cases {
            let dir = TempDir::new().unwrap();
            let path = write_config(&dir, content);
            let err = Config::load(Some(&path), &fixed_env(&[])).unwrap_err();
            assert!(
                matches!(err, ConfigError::InvalidConfig(_)),
                "expected rejection for {content:?}, got {err}"
            );
        }
    }
}
