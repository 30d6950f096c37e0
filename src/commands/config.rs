use anyhow::{Context as _, Result, bail};
use serde::Serialize;
use serde_json::json;
use tracing::warn;

use super::Context;
use crate::cli::{ConfigCommand, TokenSelector};
use crate::credentials::{CredentialSource, TokenKind, detect_kind, mask_token};
use crate::slack::AuthIdentity;

pub async fn run(ctx: &mut Context, command: ConfigCommand) -> Result<()> {
    match command {
        ConfigCommand::SetToken { token } => set_token(ctx, token),
        ConfigCommand::DeleteToken { kind, force } => delete_token(ctx, kind, force),
        ConfigCommand::Show => show(ctx),
        ConfigCommand::Test => test_tokens(ctx).await,
        ConfigCommand::Clear => clear(ctx),
    }
}

fn title(kind: TokenKind) -> &'static str {
    match kind {
        TokenKind::Bot => "Bot",
        TokenKind::User => "User",
    }
}

fn storage_label(ctx: &Context) -> &'static str {
    if ctx.store.is_secure_storage() {
        "Keychain"
    } else {
        "config file"
    }
}

fn set_token(ctx: &mut Context, token: Option<String>) -> Result<()> {
    if !ctx.store.is_secure_storage() {
        ctx.out.line(format_args!(
            "Warning: the token will be stored in {} with restricted permissions (0600).",
            ctx.store.location()
        ))?;
        ctx.out
            .line("         This is less secure than macOS Keychain storage.")?;
        ctx.out.blank()?;
    }

    let token = match token {
        Some(token) => token.trim().to_string(),
        None => ctx
            .prompt("Enter Slack API token")
            .context("failed to read input")?,
    };
    if token.is_empty() {
        bail!("token cannot be empty");
    }
    let Some(kind) = detect_kind(&token) else {
        bail!("unrecognized token format (expected xoxb-* for bot or xoxp-* for user)");
    };

    ctx.store
        .set(kind, &token)
        .with_context(|| format!("failed to store {kind} token"))?;

    if ctx.store.is_secure_storage() {
        ctx.out
            .line(format_args!("{} token stored securely in Keychain", title(kind)))?;
    } else {
        ctx.out.line(format_args!(
            "{} token stored in {}",
            title(kind),
            ctx.store.location()
        ))?;
    }
    if kind == TokenKind::User {
        ctx.out
            .line("Note: This token will be used for search commands.")?;
    }
    Ok(())
}

fn delete_token(ctx: &mut Context, selector: TokenSelector, force: bool) -> Result<()> {
    let stored: Vec<TokenKind> = selector
        .kinds()
        .iter()
        .copied()
        .filter(|kind| ctx.store.has(*kind))
        .collect();

    if stored.is_empty() {
        match selector {
            TokenSelector::Bot | TokenSelector::User => {
                let kind = selector.kinds()[0];
                ctx.out
                    .line(format_args!("No {kind} token stored to delete."))?;
                if ctx.store.env_value(kind).is_some() {
                    ctx.out.line(format_args!(
                        "Note: {} token is set via {} environment variable.",
                        title(kind),
                        kind.env_var()
                    ))?;
                }
            }
            TokenSelector::All => {
                ctx.out.line("No tokens stored to delete.")?;
                if TokenKind::ALL
                    .iter()
                    .any(|kind| ctx.store.env_value(*kind).is_some())
                {
                    ctx.out
                        .line("Note: Tokens may be set via environment variables.")?;
                }
            }
        }
        return Ok(());
    }

    if !force {
        let description = match stored.as_slice() {
            [kind] => format!("{kind} token"),
            _ => "bot and user tokens".to_string(),
        };
        ctx.out
            .line(format_args!("About to delete the stored {description}."))?;
        if !ctx.confirm("Are you sure?")? {
            ctx.out.line("Cancelled.")?;
            return Ok(());
        }
    }

    let location = storage_label(ctx);
    for kind in stored {
        ctx.store
            .delete(kind)
            .with_context(|| format!("failed to delete {kind} token"))?;
        ctx.out.line(format_args!(
            "{} token deleted from {location}",
            title(kind)
        ))?;
    }
    Ok(())
}

#[derive(Debug, Serialize)]
struct TokenStatus {
    kind: TokenKind,
    configured: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    token: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    source: Option<String>,
}

fn show(ctx: &mut Context) -> Result<()> {
    let mut statuses = Vec::new();
    for kind in TokenKind::ALL {
        let status = match ctx.store.lookup(kind) {
            Ok(Some(credential)) => TokenStatus {
                kind,
                configured: true,
                token: Some(mask_token(&credential.value)),
                source: Some(credential.source.label().to_string()),
            },
            Ok(None) => TokenStatus {
                kind,
                configured: false,
                token: None,
                source: None,
            },
            Err(err) => return Err(err).with_context(|| format!("failed to read {kind} token")),
        };
        statuses.push(status);
    }

    if ctx.out.is_json() {
        ctx.out.json(&json!({
            "storage": ctx.store.location(),
            "tokens": statuses,
        }))?;
        return Ok(());
    }

    for status in &statuses {
        let label = format!("{} token:", title(status.kind));
        match (&status.token, &status.source) {
            (Some(token), Some(source)) => ctx
                .out
                .line(format_args!("{label:<12}{token} (from {source})"))?,
            _ => ctx.out.line(format_args!("{label:<12}Not configured"))?,
        }
    }
    ctx.out
        .line(format_args!("{:<12}{}", "Storage:", ctx.store.location()))?;
    if statuses.iter().all(|status| !status.configured) {
        ctx.out.blank()?;
        ctx.out.line("Run 'slck config set-token' to configure")?;
    }
    Ok(())
}

#[derive(Debug, Serialize)]
struct TokenCheck {
    kind: TokenKind,
    ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    identity: Option<AuthIdentity>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

fn configured(ctx: &Context, kind: TokenKind) -> bool {
    ctx.store.source(kind) != CredentialSource::Absent
}

async fn check(ctx: &Context, kind: TokenKind) -> TokenCheck {
    let result = match ctx.client(kind) {
        Ok(client) => client.auth_test().await,
        Err(err) => Err(err),
    };
    match result {
        Ok(identity) => TokenCheck {
            kind,
            ok: true,
            identity: Some(identity),
            error: None,
        },
        Err(err) => {
            warn!("{} token check failed: {}", kind, err);
            TokenCheck {
                kind,
                ok: false,
                identity: None,
                error: Some(err.to_string()),
            }
        }
    }
}

async fn test_tokens(ctx: &mut Context) -> Result<()> {
    let mut checks = Vec::new();
    for kind in TokenKind::ALL {
        checks.push(check(ctx, kind).await);
    }

    if ctx.out.is_json() {
        ctx.out.json(&checks)?;
        return Ok(());
    }

    ctx.out.line("Testing Slack authentication...")?;
    for check in &checks {
        ctx.out.blank()?;
        ctx.out.line(format_args!("{} Token:", title(check.kind)))?;
        match (&check.identity, &check.error) {
            (Some(identity), _) => {
                ctx.out.line("  Authentication successful")?;
                ctx.out
                    .line(format_args!("    Workspace: {}", identity.team))?;
                ctx.out.line(format_args!("    User: {}", identity.user))?;
                if let Some(bot_id) = identity.bot_id.as_deref().filter(|id| !id.is_empty()) {
                    ctx.out.line(format_args!("    Bot ID: {bot_id}"))?;
                }
            }
            (None, Some(error)) if !configured(ctx, check.kind) => {
                ctx.out.line(format_args!("  Not configured: {error}"))?;
            }
            (None, error) => {
                ctx.out.line(format_args!(
                    "  Authentication failed: {}",
                    error.as_deref().unwrap_or("unknown error")
                ))?;
            }
        }
    }

    if checks.iter().all(|check| !check.ok) {
        ctx.out.blank()?;
        ctx.out.line(
            "No valid tokens configured. Run 'slck config set-token' to configure.",
        )?;
    }
    Ok(())
}

fn clear(ctx: &mut Context) -> Result<()> {
    let mut cleared = false;
    for kind in TokenKind::ALL {
        if ctx
            .store
            .delete(kind)
            .with_context(|| format!("failed to clear {kind} token"))?
        {
            ctx.out.line(format_args!("Cleared {kind} token"))?;
            cleared = true;
        }
    }
    if !cleared {
        ctx.out.line("No stored tokens to clear.")?;
    }

    if TokenKind::ALL
        .iter()
        .any(|kind| ctx.store.env_value(*kind).is_some())
    {
        ctx.out.blank()?;
        ctx.out.line(
            "Note: Environment variable SLACK_API_TOKEN and/or SLACK_USER_TOKEN will still be used if set.",
        )?;
    }
    Ok(())
}
