use std::path::PathBuf;
use std::sync::Arc;

pub use self::parser::{Config, DEFAULT_BASE_URL};
pub use self::validator::ConfigError;

mod parser;
mod validator;

pub const APP_NAME: &str = "slck";
pub const CONFIG_FILE: &str = "config.yaml";

/// Environment accessor; injected so resolution rules can be tested without
/// touching the process environment.
pub type EnvLookup = Arc<dyn Fn(&str) -> Option<String> + Send + Sync>;

pub fn process_env() -> EnvLookup {
    Arc::new(|name| std::env::var(name).ok())
}

/// `$XDG_CONFIG_HOME/slck`, else `$HOME/.config/slck`.
pub fn config_dir(env: &EnvLookup) -> Option<PathBuf> {
    let non_empty = |name: &str| env(name).filter(|value| !value.trim().is_empty());

    if let Some(xdg) = non_empty("XDG_CONFIG_HOME") {
        return Some(PathBuf::from(xdg).join(APP_NAME));
    }
    non_empty("HOME")
        .map(PathBuf::from)
        .or_else(dirs::home_dir)
        .map(|home| home.join(".config").join(APP_NAME))
}

#[cfg(test)]
pub fn fixed_env(pairs: &[(&str, &str)]) -> EnvLookup {
    let pairs: Vec<(String, String)> = pairs
        .iter()
        .map(|(key, value)| (key.to_string(), value.to_string()))
        .collect();
    Arc::new(move |name| {
        pairs
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.clone())
    })
}
