use anyhow::Result;
use serde::Serialize;
use tracing::warn;

use super::Context;
use crate::credentials::{CredentialSource, TokenKind};
use crate::slack::AuthIdentity;

#[derive(Debug, Clone, PartialEq, Serialize)]
struct Identity {
    name: String,
    id: String,
}

#[derive(Debug, Default, Serialize)]
struct WhoamiReport {
    #[serde(skip_serializing_if = "Option::is_none")]
    bot: Option<Identity>,
    #[serde(skip_serializing_if = "Option::is_none")]
    user: Option<Identity>,
    workspace: Option<Identity>,
}

/// `auth.test` for one kind; `None` when the token is absent or rejected.
async fn identify(ctx: &Context, kind: TokenKind) -> Option<AuthIdentity> {
    if ctx.store.source(kind) == CredentialSource::Absent {
        return None;
    }
    let result = match ctx.client(kind) {
        Ok(client) => client.auth_test().await,
        Err(err) => Err(err),
    };
    match result {
        Ok(identity) => Some(identity),
        Err(err) => {
            warn!("{} token check failed: {}", kind, err);
            None
        }
    }
}

pub async fn run(ctx: &mut Context) -> Result<()> {
    let mut report = WhoamiReport::default();

    if let Some(identity) = identify(ctx, TokenKind::Bot).await {
        report.bot = Some(Identity {
            name: identity.user.clone(),
            id: identity.bot_id.clone().unwrap_or_default(),
        });
        report.workspace = Some(Identity {
            name: identity.team,
            id: identity.team_id,
        });
    }
    if let Some(identity) = identify(ctx, TokenKind::User).await {
        report.user = Some(Identity {
            name: identity.user,
            id: identity.user_id,
        });
        report.workspace.get_or_insert(Identity {
            name: identity.team,
            id: identity.team_id,
        });
    }

    if report.bot.is_none() && report.user.is_none() {
        ctx.out.line("No valid tokens configured.")?;
        ctx.out
            .line("Run 'slck config set-token' to configure authentication.")?;
        return Ok(());
    }

    if ctx.out.is_json() {
        ctx.out.json(&report)?;
        return Ok(());
    }
    if let Some(bot) = &report.bot {
        if bot.id.is_empty() {
            ctx.out.line(format_args!("Bot: {}", bot.name))?;
        } else {
            ctx.out.line(format_args!("Bot: {} ({})", bot.name, bot.id))?;
        }
    }
    if let Some(user) = &report.user {
        ctx.out.line(format_args!("User: {}", user.name))?;
    }
    if let Some(workspace) = &report.workspace {
        ctx.out.line(format_args!("Workspace: {}", workspace.name))?;
    }
    Ok(())
}
