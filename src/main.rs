#![forbid(unsafe_code)]

use std::io::{self, IsTerminal};
use std::process::ExitCode;

use anyhow::Result;
use clap::Parser;
use tracing::debug;

mod cli;
mod commands;
mod config;
mod credentials;
mod oauth;
mod output;
mod query;
mod slack;
mod utils;
mod validate;

use cli::Cli;
use commands::Context;
use config::Config;
use credentials::CredentialStore;
use output::Output;
use slack::HintedError;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("Error: {}", error_message(&err));
            if let Some(hinted) = hinted(&err) {
                debug!("{} failed", hinted.operation());
                if let Some(hint) = hinted.hint() {
                    eprintln!("Hint: {hint}");
                }
            }
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    let env = config::process_env();
    let config = Config::load(cli.config.as_deref(), &env)?;

    let color = !cli.no_color && env("NO_COLOR").is_none();
    let directive = utils::logging::filter_directive(&env, cli.verbose, &config.logging.level);
    utils::logging::init_tracing(&directive, &config.logging.format, color && io::stderr().is_terminal());

    let format = cli.output_format().unwrap_or_else(|| config.output_format());
    let out = Output::stdout(format, color && io::stdout().is_terminal());
    let store = CredentialStore::platform_default(&env)?;
    debug!("credentials stored in {}", store.location());

    let input = Box::new(io::BufReader::new(io::stdin()));
    let mut ctx = Context::new(config, store, out, input);
    commands::run(&mut ctx, cli.command).await
}

/// The cause chain on one line. Causes whose text is already embedded in the
/// previous message are skipped.
fn error_message(err: &anyhow::Error) -> String {
    let mut message = String::new();
    for cause in err.chain() {
        let text = cause.to_string();
        if message.ends_with(&text) {
            continue;
        }
        if !message.is_empty() {
            message.push_str(": ");
        }
        message.push_str(&text);
    }
    message
}

fn hinted(err: &anyhow::Error) -> Option<&HintedError> {
    err.chain().find_map(|cause| cause.downcast_ref::<HintedError>())
}
