use anyhow::Result;

use super::Context;
use crate::cli::WorkspaceCommand;
use crate::credentials::TokenKind;
use crate::slack::wrap_error;

pub async fn run(ctx: &mut Context, command: WorkspaceCommand) -> Result<()> {
    match command {
        WorkspaceCommand::Info => info(ctx).await,
    }
}

async fn info(ctx: &mut Context) -> Result<()> {
    let client = ctx.client(TokenKind::Bot)?;
    let team = client
        .team_info()
        .await
        .map_err(|err| wrap_error("get workspace info", err))?;

    if ctx.out.is_json() {
        ctx.out.json(&team)?;
        return Ok(());
    }
    ctx.out.fields(&[
        ("ID", team.id.clone()),
        ("Name", team.name.clone()),
        ("Domain", format!("{}.slack.com", team.domain)),
    ])?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;
    use crate::commands::test_support::Harness;
    use crate::output::OutputFormat;

    #[tokio::test]
    async fn info_prints_domain() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/team.info"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "ok": true,
                "team": {"id": "T1", "name": "Acme", "domain": "acme"}
            })))
            .mount(&server)
            .await;

        let mut harness = Harness::new(&server.uri(), OutputFormat::Text, "");
        info(&mut harness.ctx).await.unwrap();
        assert_eq!(
            harness.output(),
            "ID:     T1\nName:   Acme\nDomain: acme.slack.com\n"
        );
    }

    #[tokio::test]
    async fn info_wraps_auth_failure() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/team.info"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"ok": false, "error": "invalid_auth"})),
            )
            .mount(&server)
            .await;

        let mut harness = Harness::new(&server.uri(), OutputFormat::Text, "");
        let err = info(&mut harness.ctx).await.unwrap_err();
        assert_eq!(
            err.to_string(),
            "get workspace info: slack API error: invalid_auth"
        );
        let hinted = err.downcast_ref::<crate::slack::HintedError>().unwrap();
        assert!(hinted.hint().unwrap().contains("config set-token"));
    }
}
