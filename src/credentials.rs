use std::fmt;
use std::path::PathBuf;

use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, warn};

use crate::config::{self, EnvLookup};

pub mod file_store;
#[cfg(target_os = "macos")]
pub mod keychain;

pub use self::file_store::FileBackend;
#[cfg(target_os = "macos")]
pub use self::keychain::KeychainBackend;

pub const SERVICE_NAME: &str = "slck";
pub const CREDENTIALS_FILE: &str = "credentials";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    Bot,
    User,
}

impl TokenKind {
    pub const ALL: [TokenKind; 2] = [TokenKind::Bot, TokenKind::User];

    pub fn as_str(self) -> &'static str {
        match self {
            TokenKind::Bot => "bot",
            TokenKind::User => "user",
        }
    }

    pub fn account(self) -> &'static str {
        match self {
            TokenKind::Bot => "api_token",
            TokenKind::User => "user_token",
        }
    }

    pub fn env_var(self) -> &'static str {
        match self {
            TokenKind::Bot => "SLACK_API_TOKEN",
            TokenKind::User => "SLACK_USER_TOKEN",
        }
    }

    fn prefix(self) -> &'static str {
        match self {
            TokenKind::Bot => "xoxb-",
            TokenKind::User => "xoxp-",
        }
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classifies a token by its prefix: `xoxb-` is a bot token, `xoxp-` a user token.
pub fn detect_kind(token: &str) -> Option<TokenKind> {
    TokenKind::ALL
        .into_iter()
        .find(|kind| token.starts_with(kind.prefix()))
}

pub fn detect_kind_label(token: &str) -> &'static str {
    detect_kind(token).map_or("unknown", TokenKind::as_str)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialSource {
    SecureStore,
    ConfigFile,
    Environment,
    Absent,
}

impl CredentialSource {
    pub fn label(self) -> &'static str {
        match self {
            CredentialSource::SecureStore => "Keychain",
            CredentialSource::ConfigFile => "config file",
            CredentialSource::Environment => "environment variable",
            CredentialSource::Absent => "",
        }
    }
}

impl fmt::Display for CredentialSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone)]
pub struct Credential {
    pub value: SecretString,
    pub source: CredentialSource,
}

#[derive(Error, Debug)]
pub enum CredentialError {
    #[error(
        "no {kind} token found - run 'slck config set-token' or set {}",
        kind.env_var()
    )]
    NotFound { kind: TokenKind },

    #[error("token cannot be empty")]
    EmptyToken,

    #[error("credential file error: {0}")]
    Io(#[from] std::io::Error),

    #[error("keychain error: {0}")]
    SecureStore(String),

    #[error("cannot determine config directory: neither XDG_CONFIG_HOME nor HOME is set")]
    NoConfigDir,
}

/// Persistent storage for the per-kind secrets.
pub trait SecretBackend: Send + Sync {
    fn source(&self) -> CredentialSource;

    fn location(&self) -> String;

    fn read(&self, account: &str) -> Result<Option<String>, CredentialError>;

    fn write(&self, account: &str, value: &str) -> Result<(), CredentialError>;

    /// Returns whether an entry existed.
    fn remove(&self, account: &str) -> Result<bool, CredentialError>;
}

pub struct CredentialStore {
    backend: Box<dyn SecretBackend>,
    env: EnvLookup,
}

impl CredentialStore {
    pub fn new(backend: Box<dyn SecretBackend>) -> Self {
        Self {
            backend,
            env: config::process_env(),
        }
    }

    pub fn with_env(mut self, env: EnvLookup) -> Self {
        self.env = env;
        self
    }

    /// Keychain on macOS, the permission-restricted credentials file elsewhere.
    pub fn platform_default(env: &EnvLookup) -> Result<Self, CredentialError> {
        Ok(Self::new(default_backend(env)?).with_env(env.clone()))
    }

    pub fn is_secure_storage(&self) -> bool {
        self.backend.source() == CredentialSource::SecureStore
    }

    pub fn location(&self) -> String {
        self.backend.location()
    }

    /// Persisted value first, then the environment override.
    pub fn lookup(&self, kind: TokenKind) -> Result<Option<Credential>, CredentialError> {
        if let Some(value) = self.persisted(kind)? {
            return Ok(Some(Credential {
                value: SecretString::from(value),
                source: self.backend.source(),
            }));
        }

        if let Some(value) = self.env_value(kind) {
            debug!("using {} token from {}", kind, kind.env_var());
            return Ok(Some(Credential {
                value: SecretString::from(value),
                source: CredentialSource::Environment,
            }));
        }

        Ok(None)
    }

    pub fn get(&self, kind: TokenKind) -> Result<SecretString, CredentialError> {
        self.lookup(kind)?
            .map(|credential| credential.value)
            .ok_or(CredentialError::NotFound { kind })
    }

    pub fn set(&self, kind: TokenKind, value: &str) -> Result<(), CredentialError> {
        let value = value.trim();
        if value.is_empty() {
            return Err(CredentialError::EmptyToken);
        }
        self.backend.write(kind.account(), value)?;
        debug!("stored {} token in {}", kind, self.backend.source());
        Ok(())
    }

    pub fn delete(&self, kind: TokenKind) -> Result<bool, CredentialError> {
        let removed = self.backend.remove(kind.account())?;
        debug!("delete {} token removed={}", kind, removed);
        Ok(removed)
    }

    /// True when a value is persisted, regardless of the environment.
    pub fn has(&self, kind: TokenKind) -> bool {
        match self.persisted(kind) {
            Ok(value) => value.is_some(),
            Err(err) => {
                warn!("failed to read stored {} token: {}", kind, err);
                false
            }
        }
    }

    pub fn source(&self, kind: TokenKind) -> CredentialSource {
        match self.lookup(kind) {
            Ok(Some(credential)) => credential.source,
            Ok(None) => CredentialSource::Absent,
            Err(err) => {
                warn!("failed to resolve {} token source: {}", kind, err);
                if self.env_value(kind).is_some() {
                    CredentialSource::Environment
                } else {
                    CredentialSource::Absent
                }
            }
        }
    }

    pub fn env_value(&self, kind: TokenKind) -> Option<String> {
        (self.env)(kind.env_var()).filter(|value| !value.trim().is_empty())
    }

    fn persisted(&self, kind: TokenKind) -> Result<Option<String>, CredentialError> {
        Ok(self
            .backend
            .read(kind.account())?
            .filter(|value| !value.is_empty()))
    }
}

pub fn credentials_path(env: &EnvLookup) -> Result<PathBuf, CredentialError> {
    config::config_dir(env)
        .map(|dir| dir.join(CREDENTIALS_FILE))
        .ok_or(CredentialError::NoConfigDir)
}

#[cfg(target_os = "macos")]
fn default_backend(_env: &EnvLookup) -> Result<Box<dyn SecretBackend>, CredentialError> {
    Ok(Box::new(KeychainBackend::new(SERVICE_NAME)))
}

#[cfg(not(target_os = "macos"))]
fn default_backend(env: &EnvLookup) -> Result<Box<dyn SecretBackend>, CredentialError> {
    Ok(Box::new(FileBackend::new(credentials_path(env)?)))
}

/// Renders a token as `xoxb-123...abcd` so it can be shown without leaking it.
pub fn mask_token(token: &SecretString) -> String {
    let token = token.expose_secret();
    let chars: Vec<char> = token.chars().collect();
    if chars.len() <= 12 {
        return "*".repeat(chars.len());
    }
    let head: String = chars[..8].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{head}...{tail}")
}
