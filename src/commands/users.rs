use anyhow::Result;

use super::Context;
use crate::cli::{UserField, UsersCommand};
use crate::credentials::TokenKind;
use crate::slack::{User, wrap_error};
use crate::utils::formatting::yes_no;
use crate::validate::{validate_limit, validate_user_id};

const HEADERS: [&str; 4] = ["ID", "USERNAME", "REAL NAME", "EMAIL"];

pub async fn run(ctx: &mut Context, command: UsersCommand) -> Result<()> {
    match command {
        UsersCommand::List { limit } => list(ctx, limit).await,
        UsersCommand::Get { user } => get(ctx, &user).await,
        UsersCommand::Search {
            query,
            field,
            include_bots,
            limit,
        } => search(ctx, &query, field, include_bots, limit).await,
    }
}

fn row(user: &User) -> Vec<String> {
    vec![
        user.id.clone(),
        user.name.clone(),
        user.real_name.clone(),
        user.profile.email.clone(),
    ]
}

async fn list(ctx: &mut Context, limit: i64) -> Result<()> {
    let limit = validate_limit(limit)?;
    let client = ctx.client(TokenKind::Bot)?;
    let users = client
        .list_users(limit)
        .await
        .map_err(|err| wrap_error("list users", err))?;

    if ctx.out.is_json() {
        ctx.out.json(&users)?;
        return Ok(());
    }
    if users.is_empty() {
        ctx.out.line("No users found")?;
        return Ok(());
    }

    let rows: Vec<Vec<String>> = users.iter().filter(|user| !user.is_bot).map(row).collect();
    ctx.out.table(&HEADERS, &rows)?;
    Ok(())
}

async fn get(ctx: &mut Context, user_id: &str) -> Result<()> {
    validate_user_id(user_id)?;
    let client = ctx.client(TokenKind::Bot)?;
    let user = client
        .user_info(user_id)
        .await
        .map_err(|err| wrap_error(format!("get user {user_id}"), err))?;

    if ctx.out.is_json() {
        ctx.out.json(&user)?;
        return Ok(());
    }

    let mut fields = vec![
        ("ID", user.id.clone()),
        ("Username", user.name.clone()),
        ("Real Name", user.real_name.clone()),
        ("Display Name", user.profile.display_name.clone()),
        ("Email", user.profile.email.clone()),
        ("Admin", yes_no(user.is_admin).to_string()),
        ("Bot", yes_no(user.is_bot).to_string()),
    ];
    let status = format!("{} {}", user.profile.status_emoji, user.profile.status_text);
    if !status.trim().is_empty() {
        fields.push(("Status", status.trim().to_string()));
    }
    ctx.out.fields(&fields)?;
    Ok(())
}

/// Case-insensitive substring match of an already-lowercased `needle`.
fn matches_query(user: &User, needle: &str, field: UserField) -> bool {
    let contains = |haystack: &str| haystack.to_lowercase().contains(needle);
    match field {
        UserField::Name => contains(&user.name),
        UserField::Email => contains(&user.profile.email),
        UserField::DisplayName => contains(&user.profile.display_name) || contains(&user.real_name),
        UserField::All => {
            contains(&user.name)
                || contains(&user.real_name)
                || contains(&user.profile.display_name)
                || contains(&user.profile.email)
        }
    }
}

async fn search(
    ctx: &mut Context,
    query: &str,
    field: UserField,
    include_bots: bool,
    limit: i64,
) -> Result<()> {
    let limit = validate_limit(limit)?;
    let client = ctx.client(TokenKind::Bot)?;
    let users = client
        .list_users(limit)
        .await
        .map_err(|err| wrap_error("search users", err))?;

    let needle = query.to_lowercase();
    let matches: Vec<User> = users
        .into_iter()
        .filter(|user| include_bots || !user.is_bot)
        .filter(|user| matches_query(user, &needle, field))
        .collect();

    if ctx.out.is_json() {
        ctx.out.json(&matches)?;
        return Ok(());
    }
    if matches.is_empty() {
        ctx.out
            .line(format_args!("No users found matching \"{query}\""))?;
        return Ok(());
    }

    ctx.out.line(format_args!(
        "Found {} users matching \"{query}\"",
        matches.len()
    ))?;
    ctx.out.blank()?;
    let rows: Vec<Vec<String>> = matches.iter().map(row).collect();
    ctx.out.table(&HEADERS, &rows)?;
    Ok(())
}
