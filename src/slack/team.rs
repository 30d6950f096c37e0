use serde::Deserialize;
use serde_json::json;

use super::models::{AuthIdentity, Team};
use super::{SlackClient, SlackError};

#[derive(Debug, Deserialize)]
struct TeamEnvelope {
    team: Team,
}

impl SlackClient {
    pub async fn team_info(&self) -> Result<Team, SlackError> {
        let response: TeamEnvelope = self.get("team.info", &[]).await?;
        Ok(response.team)
    }

    /// Identity behind the bound token.
    pub async fn auth_test(&self) -> Result<AuthIdentity, SlackError> {
        self.post("auth.test", &json!({})).await
    }
}
