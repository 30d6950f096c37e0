use anyhow::{Context as _, Result, bail};
use tracing::info;

use super::Context;
use crate::cli::InitArgs;
use crate::credentials::{TokenKind, detect_kind, detect_kind_label};
use crate::slack::wrap_error;

pub async fn run(ctx: &mut Context, args: InitArgs) -> Result<()> {
    ctx.out.line("Slack CLI Setup")?;
    ctx.out.blank()?;

    let interactive = args.bot_token.is_none() && args.user_token.is_none();
    if interactive && TokenKind::ALL.iter().any(|kind| ctx.store.has(*kind)) {
        ctx.out.line("Existing configuration detected.")?;
        if !ctx.confirm("Overwrite existing configuration?")? {
            ctx.out.line("Setup cancelled.")?;
            return Ok(());
        }
        ctx.out.blank()?;
    }

    ctx.out
        .line("This CLI supports both bot tokens (xoxb-*) and user tokens (xoxp-*).")?;
    ctx.out
        .line("Bot tokens are recommended for most use cases.")?;
    ctx.out.blank()?;

    let bot_token = match args.bot_token {
        Some(token) => token.trim().to_string(),
        None if interactive => ctx
            .prompt("Bot Token (xoxb-...)")
            .context("failed to read input")?,
        None => String::new(),
    };
    let bot_saved = !bot_token.is_empty();
    if bot_saved {
        setup_token(ctx, TokenKind::Bot, &bot_token, args.no_verify).await?;
    }

    let mut user_token = args.user_token.map(|token| token.trim().to_string());
    if user_token.is_none() && interactive {
        ctx.out.blank()?;
        if ctx.confirm("Would you like to add a user token as well? (needed for search)")? {
            user_token = Some(
                ctx.prompt("User Token (xoxp-...)")
                    .context("failed to read input")?,
            );
        }
    }
    let user_token = user_token.unwrap_or_default();
    let user_saved = !user_token.is_empty();
    if user_saved {
        setup_token(ctx, TokenKind::User, &user_token, args.no_verify).await?;
    }

    if !bot_saved && !user_saved {
        ctx.out.line("No tokens provided. Setup cancelled.")?;
        return Ok(());
    }

    ctx.out.blank()?;
    ctx.out.line("Configuration saved. Try it out:")?;
    if bot_saved {
        ctx.out.line("  slck channels list")?;
        ctx.out.line("  slck users list")?;
    }
    if user_saved {
        ctx.out.line("  slck search messages \"hello\"")?;
    }
    Ok(())
}

/// Checks the prefix, optionally verifies with `auth.test`, then stores.
async fn setup_token(ctx: &mut Context, kind: TokenKind, token: &str, no_verify: bool) -> Result<()> {
    if detect_kind(token) != Some(kind) {
        let expected = match kind {
            TokenKind::Bot => "xoxb-*",
            TokenKind::User => "xoxp-*",
        };
        bail!(
            "expected {kind} token ({expected}), got {} token",
            detect_kind_label(token)
        );
    }

    if !no_verify {
        ctx.out.blank()?;
        ctx.out.line("Testing connection...")?;
        let identity = ctx
            .client_with_token(token)?
            .auth_test()
            .await
            .map_err(|err| wrap_error(format!("verify {kind} token"), err))?;
        ctx.out.line(format_args!("  {} token valid", capitalized(kind)))?;
        ctx.out
            .line(format_args!("  Connected to workspace: {}", identity.team))?;
        ctx.out.line(format_args!("  User: {}", identity.user))?;
        if let Some(bot_id) = identity.bot_id.as_deref().filter(|id| !id.is_empty()) {
            ctx.out.line(format_args!("  Bot ID: {bot_id}"))?;
        }
    }

    ctx.store
        .set(kind, token)
        .with_context(|| format!("failed to store {kind} token"))?;
    info!("stored {} token during init", kind);
    ctx.out.blank()?;
    ctx.out
        .line(format_args!("{} token saved.", capitalized(kind)))?;
    Ok(())
}

fn capitalized(kind: TokenKind) -> &'static str {
    match kind {
        TokenKind::Bot => "Bot",
        TokenKind::User => "User",
    }
}
