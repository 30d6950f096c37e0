use std::io::{self, BufRead};
use std::time::Duration;

use anyhow::Result;
use secrecy::SecretString;
use serde::Serialize;

use crate::cli::Commands;
use crate::config::Config;
use crate::credentials::{CredentialStore, TokenKind};
use crate::output::Output;
use crate::slack::{SlackClient, SlackError, http_client};

mod auth;
mod channels;
mod config;
mod init;
mod messages;
mod search;
mod users;
mod whoami;
mod workspace;

/// Everything a command handler needs: settings, secrets, stdout and stdin.
pub struct Context {
    pub config: Config,
    pub store: CredentialStore,
    pub out: Output,
    input: Box<dyn BufRead + Send>,
}

impl Context {
    pub fn new(
        config: Config,
        store: CredentialStore,
        out: Output,
        input: Box<dyn BufRead + Send>,
    ) -> Self {
        Self {
            config,
            store,
            out,
            input,
        }
    }

    /// Transport bound to the stored (or environment) token of `kind`.
    pub fn client(&self, kind: TokenKind) -> Result<SlackClient, SlackError> {
        SlackClient::for_kind(kind, &self.store, &self.config)
    }

    /// Transport for a token that has not been stored yet.
    pub fn client_with_token(&self, token: &str) -> Result<SlackClient, SlackError> {
        let http = http_client(Duration::from_secs(self.config.api.timeout_secs))?;
        SlackClient::new(
            self.config.api.base_url.clone(),
            SecretString::from(token.to_string()),
            Some(http),
        )
    }

    /// One line from stdin without its line ending; `None` at end of input.
    pub fn read_line(&mut self) -> io::Result<Option<String>> {
        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            return Ok(None);
        }
        Ok(Some(line.trim_end_matches(['\r', '\n']).to_string()))
    }

    /// The rest of stdin, lines rejoined with `\n` and no trailing newline.
    pub fn read_to_end(&mut self) -> io::Result<String> {
        let mut lines = Vec::new();
        while let Some(line) = self.read_line()? {
            lines.push(line);
        }
        Ok(lines.join("\n"))
    }

    pub fn prompt(&mut self, label: &str) -> io::Result<String> {
        self.out.prompt(format_args!("{label}: "))?;
        Ok(self.read_line()?.unwrap_or_default().trim().to_string())
    }

    /// `[y/N]` question; anything but `y`/`yes` (including end of input) is a no.
    pub fn confirm(&mut self, question: &str) -> io::Result<bool> {
        self.out.prompt(format_args!("{question} [y/N]: "))?;
        let answer = self.read_line()?.unwrap_or_default();
        Ok(matches!(
            answer.trim().to_ascii_lowercase().as_str(),
            "y" | "yes"
        ))
    }

    /// Prints `value` in JSON mode, otherwise the human line.
    pub fn report<T: Serialize + ?Sized>(&mut self, value: &T, line: &str) -> io::Result<()> {
        if self.out.is_json() {
            self.out.json(value)
        } else {
            self.out.line(line)
        }
    }
}

pub async fn run(ctx: &mut Context, command: Commands) -> Result<()> {
    match command {
        Commands::Channels(command) => channels::run(ctx, command).await,
        Commands::Users(command) => users::run(ctx, command).await,
        Commands::Messages(command) => messages::run(ctx, command).await,
        Commands::Search(command) => search::run(ctx, command).await,
        Commands::Workspace(command) => workspace::run(ctx, command).await,
        Commands::Whoami => whoami::run(ctx).await,
        Commands::Config(command) => config::run(ctx, command).await,
        Commands::Init(args) => init::run(ctx, args).await,
        Commands::Auth(command) => auth::run(ctx, command).await,
    }
}
