use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::EnvLookup;

pub const LOG_ENV: &str = "SLCK_LOG";

/// `SLCK_LOG` wins, then `--verbose`, then the configured level.
pub fn filter_directive(env: &EnvLookup, verbose: bool, configured: &str) -> String {
    if let Some(directive) = env(LOG_ENV).filter(|value| !value.trim().is_empty()) {
        return directive;
    }
    if verbose {
        return "debug".to_string();
    }
    let configured = configured.trim();
    if configured.is_empty() {
        "warn".to_string()
    } else {
        configured.to_string()
    }
}

/// Installs the global subscriber; logs go to stderr so stdout stays parseable.
pub fn init_tracing(directive: &str, format: &str, ansi: bool) {
    let filter = EnvFilter::try_new(directive).unwrap_or_else(|_| EnvFilter::new("warn"));
    let subscriber = tracing_subscriber::registry().with(filter);

    let result = if format == "json" {
        subscriber
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(std::io::stderr),
            )
            .try_init()
    } else {
        subscriber
            .with(
                tracing_subscriber::fmt::layer()
                    .compact()
                    .with_target(false)
                    .with_ansi(ansi)
                    .with_writer(std::io::stderr),
            )
            .try_init()
    };

    if let Err(err) = result {
        eprintln!("failed to initialize logging: {err}");
    }
}
