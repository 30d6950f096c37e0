use anyhow::{Context as _, Result, bail};
use serde_json::{Value, json};

use super::Context;
use crate::cli::{ComposeArgs, MessagesCommand};
use crate::credentials::TokenKind;
use crate::slack::{Message, OutgoingMessage, wrap_error};
use crate::utils::formatting::{format_slack_ts, truncate_text};
use crate::validate::{canonical_timestamp, normalize_emoji, validate_channel_id, validate_limit};

const LINE_WIDTH: usize = 80;

pub async fn run(ctx: &mut Context, command: MessagesCommand) -> Result<()> {
    match command {
        MessagesCommand::Send {
            channel,
            text,
            thread,
            compose,
        } => send(ctx, &channel, text, thread.as_deref(), &compose).await,
        MessagesCommand::Update {
            channel,
            ts,
            text,
            compose,
        } => update(ctx, &channel, &ts, text, &compose).await,
        MessagesCommand::Delete { channel, ts, force } => delete(ctx, &channel, &ts, force).await,
        MessagesCommand::History {
            channel,
            limit,
            oldest,
            latest,
        } => history(ctx, &channel, limit, oldest.as_deref(), latest.as_deref()).await,
        MessagesCommand::Thread { channel, ts, limit } => thread(ctx, &channel, &ts, limit).await,
        MessagesCommand::React { channel, ts, emoji } => {
            react(ctx, &channel, &ts, &emoji, true).await
        }
        MessagesCommand::Unreact { channel, ts, emoji } => {
            react(ctx, &channel, &ts, &emoji, false).await
        }
    }
}

/// zsh and bash history expansion leave `\!` behind in quoted text.
fn unescape_shell_chars(text: &str) -> String {
    text.replace("\\!", "!")
}

/// A single mrkdwn section carrying the whole text.
fn default_blocks(text: &str) -> Vec<Value> {
    vec![json!({
        "type": "section",
        "text": {"type": "mrkdwn", "text": text}
    })]
}

fn parse_blocks(source: &str) -> Result<Vec<Value>> {
    serde_json::from_str::<Vec<Value>>(source)
        .context("invalid blocks JSON: expected an array of Block Kit blocks")
}

/// Resolves text and blocks from arguments, files and stdin into a payload.
/// Runs before any transport is built so bad input never reaches the network.
fn compose(
    ctx: &mut Context,
    text: Option<String>,
    thread_ts: Option<String>,
    args: &ComposeArgs,
) -> Result<OutgoingMessage> {
    let source = &args.blocks;
    let sources = [
        source.blocks.is_some(),
        source.blocks_file.is_some(),
        source.blocks_stdin,
    ];
    if sources.iter().filter(|given| **given).count() > 1 {
        bail!("only one of --blocks, --blocks-file, or --blocks-stdin can be specified");
    }

    let mut text = text.unwrap_or_default();
    if text == "-" {
        if source.blocks_stdin {
            bail!("cannot use '-' for text and --blocks-stdin together; stdin can only be used for one");
        }
        text = ctx.read_to_end().context("reading stdin")?;
    }
    let text = unescape_shell_chars(&text);

    let blocks_json = if let Some(inline) = &source.blocks {
        Some(inline.clone())
    } else if let Some(path) = &source.blocks_file {
        Some(
            std::fs::read_to_string(path)
                .with_context(|| format!("reading blocks file {}", path.display()))?,
        )
    } else if source.blocks_stdin {
        Some(ctx.read_to_end().context("reading blocks from stdin")?)
    } else {
        None
    };
    let blocks_json = blocks_json.filter(|json| !json.trim().is_empty());

    if text.is_empty() && blocks_json.is_none() {
        bail!(
            "message text cannot be empty (or provide blocks via --blocks, --blocks-file, or --blocks-stdin)"
        );
    }

    let blocks = match blocks_json {
        Some(json) => Some(parse_blocks(&json)?),
        None if !args.simple && !text.is_empty() => Some(default_blocks(&text)),
        None => None,
    };

    Ok(OutgoingMessage {
        text,
        blocks,
        thread_ts,
        unfurl: !args.no_unfurl,
    })
}

async fn send(
    ctx: &mut Context,
    channel_id: &str,
    text: Option<String>,
    thread_ts: Option<&str>,
    args: &ComposeArgs,
) -> Result<()> {
    validate_channel_id(channel_id)?;
    let thread_ts = thread_ts.map(canonical_timestamp).transpose()?;
    let message = compose(ctx, text, thread_ts, args)?;

    let client = ctx.client(TokenKind::Bot)?;
    let sent = client
        .send_message(channel_id, &message)
        .await
        .map_err(|err| wrap_error("send message", err))?;

    let line = format!("Message sent (ts: {})", sent.ts);
    ctx.report(&sent, &line)?;
    Ok(())
}

async fn update(
    ctx: &mut Context,
    channel_id: &str,
    ts: &str,
    text: Option<String>,
    args: &ComposeArgs,
) -> Result<()> {
    validate_channel_id(channel_id)?;
    let ts = canonical_timestamp(ts)?;
    let message = compose(ctx, text, None, args)?;

    let client = ctx.client(TokenKind::Bot)?;
    let updated = client
        .update_message(channel_id, &ts, &message)
        .await
        .map_err(|err| wrap_error(format!("update message {ts}"), err))?;

    ctx.report(&updated, "Message updated")?;
    Ok(())
}

async fn delete(ctx: &mut Context, channel_id: &str, ts: &str, force: bool) -> Result<()> {
    validate_channel_id(channel_id)?;
    let ts = canonical_timestamp(ts)?;

    if !force {
        ctx.out.line(format_args!(
            "About to delete message {ts} in channel {channel_id}"
        ))?;
        if !ctx.confirm("Are you sure?")? {
            ctx.out.line("Cancelled.")?;
            return Ok(());
        }
    }

    let client = ctx.client(TokenKind::Bot)?;
    client
        .delete_message(channel_id, &ts)
        .await
        .map_err(|err| wrap_error(format!("delete message {ts}"), err))?;

    ctx.report(
        &json!({"channel": channel_id, "ts": ts, "deleted": true}),
        "Message deleted",
    )?;
    Ok(())
}

fn render_messages(ctx: &mut Context, messages: &[Message], empty: &str) -> Result<()> {
    if ctx.out.is_json() {
        ctx.out.json(messages)?;
        return Ok(());
    }
    if messages.is_empty() {
        ctx.out.line(empty)?;
        return Ok(());
    }
    for message in messages {
        ctx.out.line(format_args!(
            "[{}] {}: {}",
            format_slack_ts(&message.ts),
            message.user_id,
            truncate_text(&message.text, LINE_WIDTH)
        ))?;
    }
    Ok(())
}

async fn history(
    ctx: &mut Context,
    channel_id: &str,
    limit: i64,
    oldest: Option<&str>,
    latest: Option<&str>,
) -> Result<()> {
    validate_channel_id(channel_id)?;
    let limit = validate_limit(limit)?;
    let oldest = oldest.map(canonical_timestamp).transpose()?;
    let latest = latest.map(canonical_timestamp).transpose()?;

    let client = ctx.client(TokenKind::Bot)?;
    let messages = client
        .channel_history(channel_id, limit, oldest.as_deref(), latest.as_deref())
        .await
        .map_err(|err| wrap_error(format!("read history of {channel_id}"), err))?;

    render_messages(ctx, &messages, "No messages found")
}

async fn thread(ctx: &mut Context, channel_id: &str, ts: &str, limit: i64) -> Result<()> {
    validate_channel_id(channel_id)?;
    let ts = canonical_timestamp(ts)?;
    let limit = validate_limit(limit)?;

    let client = ctx.client(TokenKind::Bot)?;
    let replies = client
        .thread_replies(channel_id, &ts, limit)
        .await
        .map_err(|err| wrap_error(format!("read thread {ts}"), err))?;

    render_messages(ctx, &replies, "No replies found")
}

async fn react(ctx: &mut Context, channel_id: &str, ts: &str, emoji: &str, add: bool) -> Result<()> {
    validate_channel_id(channel_id)?;
    let ts = canonical_timestamp(ts)?;
    let emoji = normalize_emoji(emoji);
    if emoji.is_empty() {
        bail!("emoji name cannot be empty");
    }

    let client = ctx.client(TokenKind::Bot)?;
    let (result, operation, line) = if add {
        (
            client.add_reaction(channel_id, &ts, &emoji).await,
            "add reaction",
            format!("Added :{emoji}: reaction"),
        )
    } else {
        (
            client.remove_reaction(channel_id, &ts, &emoji).await,
            "remove reaction",
            format!("Removed :{emoji}: reaction"),
        )
    };
    result.map_err(|err| wrap_error(operation, err))?;

    ctx.report(
        &json!({"channel": channel_id, "ts": ts, "emoji": emoji, "added": add}),
        &line,
    )?;
    Ok(())
}
