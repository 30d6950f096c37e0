use anyhow::{Result, bail};
use serde_json::json;
use tracing::info;

use super::Context;
use crate::cli::ChannelsCommand;
use crate::credentials::TokenKind;
use crate::slack::{Channel, wrap_error};
use crate::utils::formatting::yes_no;
use crate::validate::{validate_channel_id, validate_limit, validate_user_id};

pub async fn run(ctx: &mut Context, command: ChannelsCommand) -> Result<()> {
    match command {
        ChannelsCommand::List {
            types,
            exclude_archived,
            limit,
        } => list(ctx, &types, exclude_archived, limit).await,
        ChannelsCommand::Get { channel } => get(ctx, &channel).await,
        ChannelsCommand::Create { name, private } => create(ctx, &name, private).await,
        ChannelsCommand::Archive { channel, force } => archive(ctx, &channel, force).await,
        ChannelsCommand::Unarchive { channel } => unarchive(ctx, &channel).await,
        ChannelsCommand::SetTopic { channel, topic } => set_topic(ctx, &channel, &topic).await,
        ChannelsCommand::SetPurpose { channel, purpose } => {
            set_purpose(ctx, &channel, &purpose).await
        }
        ChannelsCommand::Invite { channel, users } => invite(ctx, &channel, &users).await,
    }
}

fn display_name(channel: &Channel) -> String {
    if channel.is_private {
        format!("{} (private)", channel.name)
    } else {
        channel.name.clone()
    }
}

async fn list(ctx: &mut Context, types: &str, exclude_archived: bool, limit: i64) -> Result<()> {
    let limit = validate_limit(limit)?;
    let client = ctx.client(TokenKind::Bot)?;
    let channels = client
        .list_channels(types, exclude_archived, limit)
        .await
        .map_err(|err| wrap_error("list channels", err))?;

    if ctx.out.is_json() {
        ctx.out.json(&channels)?;
        return Ok(());
    }
    if channels.is_empty() {
        ctx.out.line("No channels found")?;
        return Ok(());
    }

    let rows: Vec<Vec<String>> = channels
        .iter()
        .map(|channel| {
            vec![
                channel.id.clone(),
                display_name(channel),
                channel.member_count.to_string(),
            ]
        })
        .collect();
    ctx.out.table(&["ID", "NAME", "MEMBERS"], &rows)?;
    Ok(())
}

async fn get(ctx: &mut Context, channel_id: &str) -> Result<()> {
    validate_channel_id(channel_id)?;
    let client = ctx.client(TokenKind::Bot)?;
    let channel = client
        .channel_info(channel_id)
        .await
        .map_err(|err| wrap_error(format!("get channel {channel_id}"), err))?;

    if ctx.out.is_json() {
        ctx.out.json(&channel)?;
        return Ok(());
    }
    ctx.out.fields(&[
        ("ID", channel.id.clone()),
        ("Name", channel.name.clone()),
        ("Private", yes_no(channel.is_private).to_string()),
        ("Archived", yes_no(channel.is_archived).to_string()),
        ("Members", channel.member_count.to_string()),
        ("Topic", channel.topic.value.clone()),
        ("Purpose", channel.purpose.value.clone()),
    ])?;
    Ok(())
}

async fn create(ctx: &mut Context, name: &str, private: bool) -> Result<()> {
    let name = name.trim().trim_start_matches('#');
    if name.is_empty() {
        bail!("channel name cannot be empty");
    }

    let client = ctx.client(TokenKind::Bot)?;
    let channel = client
        .create_channel(name, private)
        .await
        .map_err(|err| wrap_error(format!("create channel {name}"), err))?;
    info!("created channel {} ({})", channel.name, channel.id);

    let line = format!("Created channel: {} ({})", channel.name, channel.id);
    ctx.report(&channel, &line)?;
    Ok(())
}

async fn archive(ctx: &mut Context, channel_id: &str, force: bool) -> Result<()> {
    validate_channel_id(channel_id)?;

    if !force {
        ctx.out
            .line(format_args!("About to archive channel: {channel_id}"))?;
        if !ctx.confirm("Are you sure?")? {
            ctx.out.line("Cancelled.")?;
            return Ok(());
        }
    }

    let client = ctx.client(TokenKind::Bot)?;
    client
        .archive_channel(channel_id)
        .await
        .map_err(|err| wrap_error(format!("archive channel {channel_id}"), err))?;

    ctx.report(
        &json!({"channel": channel_id, "archived": true}),
        &format!("Archived channel: {channel_id}"),
    )?;
    Ok(())
}

async fn unarchive(ctx: &mut Context, channel_id: &str) -> Result<()> {
    validate_channel_id(channel_id)?;

    if !ctx.out.is_json() {
        ctx.out.line(
            "Note: Slack usually rejects unarchive with bot tokens (not_in_channel); a user token may be required.",
        )?;
    }

    let client = ctx.client(TokenKind::Bot)?;
    client
        .unarchive_channel(channel_id)
        .await
        .map_err(|err| wrap_error(format!("unarchive channel {channel_id}"), err))?;

    ctx.report(
        &json!({"channel": channel_id, "archived": false}),
        &format!("Unarchived channel: {channel_id}"),
    )?;
    Ok(())
}

async fn set_topic(ctx: &mut Context, channel_id: &str, topic: &str) -> Result<()> {
    validate_channel_id(channel_id)?;
    let client = ctx.client(TokenKind::Bot)?;
    client
        .set_channel_topic(channel_id, topic)
        .await
        .map_err(|err| wrap_error(format!("set topic for channel {channel_id}"), err))?;

    ctx.report(
        &json!({"channel": channel_id, "topic": topic}),
        &format!("Set topic for channel {channel_id}"),
    )?;
    Ok(())
}

async fn set_purpose(ctx: &mut Context, channel_id: &str, purpose: &str) -> Result<()> {
    validate_channel_id(channel_id)?;
    let client = ctx.client(TokenKind::Bot)?;
    client
        .set_channel_purpose(channel_id, purpose)
        .await
        .map_err(|err| wrap_error(format!("set purpose for channel {channel_id}"), err))?;

    ctx.report(
        &json!({"channel": channel_id, "purpose": purpose}),
        &format!("Set purpose for channel {channel_id}"),
    )?;
    Ok(())
}

async fn invite(ctx: &mut Context, channel_id: &str, users: &[String]) -> Result<()> {
    validate_channel_id(channel_id)?;
    if users.is_empty() {
        bail!("at least one user ID is required");
    }
    for user in users {
        validate_user_id(user)?;
    }

    let client = ctx.client(TokenKind::Bot)?;
    let channel = client
        .invite_to_channel(channel_id, users)
        .await
        .map_err(|err| wrap_error(format!("invite to channel {channel_id}"), err))?;

    let line = format!(
        "Invited {} user(s) to channel {channel_id}",
        users.len()
    );
    ctx.report(&channel, &line)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use wiremock::matchers::{body_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;
    use crate::commands::test_support::{BOT_TOKEN, Harness};
    use crate::output::OutputFormat;
    use crate::slack::{HintedError, SlackError};

    fn ok(mut body: serde_json::Value) -> ResponseTemplate {
        body["ok"] = json!(true);
        ResponseTemplate::new(200).set_body_json(body)
    }

    #[tokio::test]
    async fn list_renders_table_with_private_marker() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/conversations.list"))
            .and(header("authorization", format!("Bearer {BOT_TOKEN}").as_str()))
            .and(query_param("exclude_archived", "true"))
            .and(query_param("limit", "100"))
            .respond_with(ok(json!({
                "channels": [
                    {"id": "C1", "name": "general", "num_members": 42},
                    {"id": "G2", "name": "secret", "is_private": true, "num_members": 3}
                ],
                "response_metadata": {"next_cursor": ""}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let mut harness = Harness::new(&server.uri(), OutputFormat::Text, "");
        list(&mut harness.ctx, "public_channel,private_channel", true, 100)
            .await
            .unwrap();

        assert_eq!(
            harness.output(),
            "ID  NAME              MEMBERS\nC1  general           42\nG2  secret (private)  3\n"
        );
    }

    #[tokio::test]
    async fn list_rejects_bad_limit_before_any_request() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ok(json!({})))
            .expect(0)
            .mount(&server)
            .await;

        let mut harness = Harness::new(&server.uri(), OutputFormat::Text, "");
        let err = list(&mut harness.ctx, "public_channel", true, 0)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("invalid limit 0"));
    }

    #[tokio::test]
    async fn declined_archive_makes_no_request() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ok(json!({})))
            .expect(0)
            .mount(&server)
            .await;

        let mut harness = Harness::new(&server.uri(), OutputFormat::Text, "n\n");
        archive(&mut harness.ctx, "C123", false).await.unwrap();

        assert_eq!(
            harness.output(),
            "About to archive channel: C123\nAre you sure? [y/N]: Cancelled.\n"
        );
    }

    #[tokio::test]
    async fn forced_archive_skips_prompt() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/conversations.archive"))
            .and(body_json(json!({"channel": "C123"})))
            .respond_with(ok(json!({})))
            .expect(1)
            .mount(&server)
            .await;

        let mut harness = Harness::new(&server.uri(), OutputFormat::Text, "");
        archive(&mut harness.ctx, "C123", true).await.unwrap();
        assert_eq!(harness.output(), "Archived channel: C123\n");
    }

    #[tokio::test]
    async fn archive_failure_carries_operation_and_hint() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/conversations.archive"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"ok": false, "error": "not_in_channel"})),
            )
            .mount(&server)
            .await;

        let mut harness = Harness::new(&server.uri(), OutputFormat::Text, "y\n");
        let err = archive(&mut harness.ctx, "C123", false).await.unwrap_err();

        let hinted = err.downcast_ref::<HintedError>().unwrap();
        assert_eq!(hinted.operation(), "archive channel C123");
        assert!(hinted.hint().unwrap().contains("invited"));
        let cause = std::error::Error::source(hinted)
            .and_then(|source| source.downcast_ref::<SlackError>())
            .unwrap();
        assert_eq!(cause.code(), Some("not_in_channel"));
    }

    #[tokio::test]
    async fn unarchive_prints_banner_and_surfaces_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/conversations.unarchive"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"ok": false, "error": "not_in_channel"})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let mut harness = Harness::new(&server.uri(), OutputFormat::Text, "");
        let err = unarchive(&mut harness.ctx, "C123").await.unwrap_err();

        assert!(harness.output().starts_with("Note: "));
        assert_eq!(
            err.to_string(),
            "unarchive channel C123: slack API error: not_in_channel"
        );
    }

    #[tokio::test]
    async fn invite_validates_every_user_first() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ok(json!({})))
            .expect(0)
            .mount(&server)
            .await;

        let mut harness = Harness::new(&server.uri(), OutputFormat::Text, "");
        let users = vec!["U1".to_string(), "alice".to_string()];
        let err = invite(&mut harness.ctx, "C123", &users).await.unwrap_err();
        assert!(err.to_string().contains("invalid user ID \"alice\""));
    }

    #[tokio::test]
    async fn invite_joins_users() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/conversations.invite"))
            .and(body_json(json!({"channel": "C123", "users": "U1,W2"})))
            .respond_with(ok(json!({"channel": {"id": "C123", "name": "general"}})))
            .expect(1)
            .mount(&server)
            .await;

        let mut harness = Harness::new(&server.uri(), OutputFormat::Text, "");
        let users = vec!["U1".to_string(), "W2".to_string()];
        invite(&mut harness.ctx, "C123", &users).await.unwrap();
        assert_eq!(harness.output(), "Invited 2 user(s) to channel C123\n");
    }

    #[tokio::test]
    async fn get_prints_fields_or_json() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/conversations.info"))
            .and(query_param("channel", "C123"))
            .respond_with(ok(json!({"channel": {
                "id": "C123",
                "name": "general",
                "num_members": 5,
                "topic": {"value": "Company news"},
                "purpose": {"value": ""}
            }})))
            .mount(&server)
            .await;

        let mut harness = Harness::new(&server.uri(), OutputFormat::Text, "");
        get(&mut harness.ctx, "C123").await.unwrap();
        let text = harness.output();
        assert!(text.contains("Name:     general\n"));
        assert!(text.contains("Members:  5\n"));
        assert!(text.contains("Topic:    Company news\n"));

        let mut harness = Harness::new(&server.uri(), OutputFormat::Json, "");
        get(&mut harness.ctx, "C123").await.unwrap();
        let value: serde_json::Value = serde_json::from_str(&harness.output()).unwrap();
        assert_eq!(value["num_members"], 5);
    }

    #[tokio::test]
    async fn missing_token_is_reported_without_request() {
        let mut harness = Harness::with_env("http://127.0.0.1:9", OutputFormat::Text, "", &[]);
        let err = get(&mut harness.ctx, "C123").await.unwrap_err();
        assert!(err.to_string().contains("no bot token found"));
    }
}
