use anyhow::Result;

use super::Context;
use crate::cli::{FileSearchArgs, MessageSearchArgs, SearchArgs, SearchCommand};
use crate::credentials::TokenKind;
use crate::query::{QueryOptions, build_query};
use crate::slack::{FileMatch, MessageMatch, SearchGroup, SearchKind, SearchRequest, wrap_error};
use crate::utils::formatting::{format_slack_ts, format_unix, truncate_text};

const MESSAGE_HEADERS: [&str; 4] = ["CHANNEL", "USER", "TIMESTAMP", "TEXT"];
const FILE_HEADERS: [&str; 5] = ["NAME", "TYPE", "USER", "CREATED", "TITLE"];

pub async fn run(ctx: &mut Context, command: SearchCommand) -> Result<()> {
    let (kind, search_args) = match command {
        SearchCommand::Messages(args) => (SearchKind::Messages, message_request(&args)?),
        SearchCommand::Files(args) => (SearchKind::Files, file_request(&args)?),
        SearchCommand::All(args) => (SearchKind::All, message_request(&args)?),
    };
    search(ctx, kind, search_args).await
}

/// Raw user text, kept for messages; the request carries the assembled query.
struct Search {
    text: String,
    request: SearchRequest,
}

fn base_options(args: &SearchArgs) -> QueryOptions {
    QueryOptions {
        scope: args.scope.clone(),
        in_channel: args.in_channel.clone(),
        from_user: args.from_user.clone(),
        after: args.after.clone(),
        before: args.before.clone(),
        ..QueryOptions::default()
    }
}

fn build(args: &SearchArgs, options: &QueryOptions) -> Result<Search> {
    options.validate()?;
    let query = build_query(&args.query, options)?;

    let request = SearchRequest {
        query,
        count: args.count,
        page: args.page,
        sort: args.sort,
        sort_dir: args.sort_dir,
        highlight: args.highlight,
        include_bots: args.include_bots,
    };
    request.validate()?;

    Ok(Search {
        text: args.query.clone(),
        request,
    })
}

fn message_request(args: &MessageSearchArgs) -> Result<Search> {
    let options = QueryOptions {
        has_link: args.has_link,
        has_reaction: args.has_reaction,
        ..base_options(&args.common)
    };
    build(&args.common, &options)
}

fn file_request(args: &FileSearchArgs) -> Result<Search> {
    let options = QueryOptions {
        file_type: args.file_type.clone(),
        has_pin: args.has_pin,
        ..base_options(&args.common)
    };
    build(&args.common, &options)
}

fn message_rows(group: &SearchGroup<MessageMatch>) -> Vec<Vec<String>> {
    group
        .matches
        .iter()
        .map(|found| {
            vec![
                found.channel.name.clone(),
                found.username.clone(),
                format_slack_ts(&found.ts),
                truncate_text(&found.text, 60),
            ]
        })
        .collect()
}

fn file_rows(group: &SearchGroup<FileMatch>) -> Vec<Vec<String>> {
    group
        .matches
        .iter()
        .map(|file| {
            vec![
                truncate_text(&file.name, 30),
                file.filetype.clone(),
                file.user_id.clone(),
                format_unix(file.created_unix).unwrap_or_default(),
                truncate_text(&file.title, 40),
            ]
        })
        .collect()
}

fn non_empty<T>(group: &Option<SearchGroup<T>>) -> Option<&SearchGroup<T>> {
    group.as_ref().filter(|group| !group.matches.is_empty())
}

fn paging_line<T>(ctx: &mut Context, group: &SearchGroup<T>, noun: &str) -> Result<()> {
    ctx.out.blank()?;
    ctx.out.line(format_args!(
        "Page {} of {} (showing {} of {} {noun})",
        group.paging.page,
        group.paging.pages,
        group.matches.len(),
        group.paging.total
    ))?;
    Ok(())
}

async fn search(ctx: &mut Context, kind: SearchKind, search: Search) -> Result<()> {
    let client = ctx.client(TokenKind::User)?;
    let result = client
        .search(kind, &search.request)
        .await
        .map_err(|err| wrap_error(format!("search {}", kind_label(kind)), err))?;

    if ctx.out.is_json() {
        ctx.out.json(&result)?;
        return Ok(());
    }

    let query = &search.text;
    let messages = non_empty(&result.messages);
    let files = non_empty(&result.files);

    match kind {
        SearchKind::Messages => {
            let Some(group) = messages else {
                ctx.out
                    .line(format_args!("No messages found for \"{query}\""))?;
                return Ok(());
            };
            ctx.out.line(format_args!(
                "Found {} messages matching \"{query}\"",
                group.total
            ))?;
            ctx.out.blank()?;
            ctx.out.table(&MESSAGE_HEADERS, &message_rows(group))?;
            paging_line(ctx, group, "results")?;
        }
        SearchKind::Files => {
            let Some(group) = files else {
                ctx.out.line(format_args!("No files found for \"{query}\""))?;
                return Ok(());
            };
            ctx.out.line(format_args!(
                "Found {} files matching \"{query}\"",
                group.total
            ))?;
            ctx.out.blank()?;
            ctx.out.table(&FILE_HEADERS, &file_rows(group))?;
            paging_line(ctx, group, "results")?;
        }
        SearchKind::All => {
            if messages.is_none() && files.is_none() {
                ctx.out
                    .line(format_args!("No results found for \"{query}\""))?;
                return Ok(());
            }
            if let Some(group) = messages {
                ctx.out
                    .line(format_args!("=== Messages ({} total) ===", group.total))?;
                ctx.out.blank()?;
                ctx.out.table(&MESSAGE_HEADERS, &message_rows(group))?;
                paging_line(ctx, group, "messages")?;
            }
            if let Some(group) = files {
                if messages.is_some() {
                    ctx.out.blank()?;
                }
                ctx.out
                    .line(format_args!("=== Files ({} total) ===", group.total))?;
                ctx.out.blank()?;
                ctx.out.table(&FILE_HEADERS, &file_rows(group))?;
                paging_line(ctx, group, "files")?;
            }
        }
    }
    Ok(())
}

fn kind_label(kind: SearchKind) -> &'static str {
    match kind {
        SearchKind::Messages => "messages",
        SearchKind::Files => "files",
        SearchKind::All => "all",
    }
}
