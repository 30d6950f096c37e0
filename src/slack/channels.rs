use serde::Deserialize;
use serde::de::IgnoredAny;
use serde_json::json;

use super::models::{Channel, ChannelPage};
use super::{SlackClient, SlackError};

pub const DEFAULT_TYPES: &str = "public_channel,private_channel";

#[derive(Debug, Deserialize)]
struct ChannelEnvelope {
    channel: Channel,
}

impl SlackClient {
    pub async fn list_channels(
        &self,
        types: &str,
        exclude_archived: bool,
        limit: u32,
    ) -> Result<Vec<Channel>, SlackError> {
        let params = [
            ("exclude_archived", exclude_archived.to_string()),
            ("types", types.to_string()),
        ];
        self.paginate::<ChannelPage>("conversations.list", &params, limit)
            .await
    }

    pub async fn channel_info(&self, channel_id: &str) -> Result<Channel, SlackError> {
        let response: ChannelEnvelope = self
            .get("conversations.info", &[("channel", channel_id.to_string())])
            .await?;
        Ok(response.channel)
    }

    pub async fn create_channel(&self, name: &str, is_private: bool) -> Result<Channel, SlackError> {
        let response: ChannelEnvelope = self
            .post(
                "conversations.create",
                &json!({"name": name, "is_private": is_private}),
            )
            .await?;
        Ok(response.channel)
    }

    pub async fn archive_channel(&self, channel_id: &str) -> Result<(), SlackError> {
        let _: IgnoredAny = self
            .post("conversations.archive", &json!({"channel": channel_id}))
            .await?;
        Ok(())
    }

    pub async fn unarchive_channel(&self, channel_id: &str) -> Result<(), SlackError> {
        let _: IgnoredAny = self
            .post("conversations.unarchive", &json!({"channel": channel_id}))
            .await?;
        Ok(())
    }

    pub async fn set_channel_topic(&self, channel_id: &str, topic: &str) -> Result<(), SlackError> {
        let _: IgnoredAny = self
            .post(
                "conversations.setTopic",
                &json!({"channel": channel_id, "topic": topic}),
            )
            .await?;
        Ok(())
    }

    pub async fn set_channel_purpose(
        &self,
        channel_id: &str,
        purpose: &str,
    ) -> Result<(), SlackError> {
        let _: IgnoredAny = self
            .post(
                "conversations.setPurpose",
                &json!({"channel": channel_id, "purpose": purpose}),
            )
            .await?;
        Ok(())
    }

    /// Slack takes the invitees as one comma-separated string.
    pub async fn invite_to_channel(
        &self,
        channel_id: &str,
        user_ids: &[String],
    ) -> Result<Channel, SlackError> {
        let response: ChannelEnvelope = self
            .post(
                "conversations.invite",
                &json!({"channel": channel_id, "users": user_ids.join(",")}),
            )
            .await?;
        Ok(response.channel)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use wiremock::matchers::{body_json, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use crate::slack::test_support::client_for;

    fn ok(body: serde_json::Value) -> ResponseTemplate {
        let mut body = body;
        body["ok"] = json!(true);
        ResponseTemplate::new(200).set_body_json(body)
    }

    #[tokio::test]
    async fn list_sends_filters_and_follows_cursor() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/conversations.list"))
            .and(query_param("exclude_archived", "true"))
            .and(query_param("types", "public_channel"))
            .and(query_param("limit", "3"))
            .respond_with(ok(json!({
                "channels": [
                    {"id": "C1", "name": "a"},
                    {"id": "C2", "name": "b"},
                    {"id": "C3", "name": "c"}
                ],
                "response_metadata": {"next_cursor": "k"}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server).await;
        let channels = client.list_channels("public_channel", true, 3).await.unwrap();
        let names: Vec<_> = channels.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, ["a", "b", "c"]);
    }

    #[tokio::test]
    async fn info_decodes_channel() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/conversations.info"))
            .and(query_param("channel", "C123"))
            .respond_with(ok(json!({
                "channel": {"id": "C123", "name": "general", "num_members": 7}
            })))
            .mount(&server)
            .await;

        let client = client_for(&server).await;
        let channel = client.channel_info("C123").await.unwrap();
        assert_eq!(channel.name, "general");
        assert_eq!(channel.member_count, 7);
    }

    #[tokio::test]
    async fn create_posts_name_and_privacy() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/conversations.create"))
            .and(body_json(json!({"name": "launch", "is_private": true})))
            .respond_with(ok(json!({
                "channel": {"id": "G9", "name": "launch", "is_private": true}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server).await;
        let channel = client.create_channel("launch", true).await.unwrap();
        assert_eq!(channel.id, "G9");
        assert!(channel.is_private);
    }

    #[tokio::test]
    async fn archive_surfaces_slack_error_code() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/conversations.archive"))
            .and(body_json(json!({"channel": "C123"})))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"ok": false, "error": "already_archived"})),
            )
            .mount(&server)
            .await;

        let client = client_for(&server).await;
        let err = client.archive_channel("C123").await.unwrap_err();
        assert!(err.to_string().contains("already_archived"));
    }

    #[tokio::test]
    async fn topic_and_purpose_send_their_fields() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/conversations.setTopic"))
            .and(body_json(json!({"channel": "C1", "topic": "release day"})))
            .respond_with(ok(json!({})))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/conversations.setPurpose"))
            .and(body_json(json!({"channel": "C1", "purpose": "ship it"})))
            .respond_with(ok(json!({})))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server).await;
        client.set_channel_topic("C1", "release day").await.unwrap();
        client.set_channel_purpose("C1", "ship it").await.unwrap();
    }

    #[tokio::test]
    async fn invite_joins_user_ids_with_commas() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/conversations.invite"))
            .and(body_json(json!({"channel": "C1", "users": "U1,U2,W3"})))
            .respond_with(ok(json!({"channel": {"id": "C1", "name": "team"}})))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server).await;
        let users = ["U1", "U2", "W3"].map(String::from);
        let channel = client.invite_to_channel("C1", &users).await.unwrap();
        assert_eq!(channel.name, "team");
    }

    #[tokio::test]
    async fn unarchive_reports_not_in_channel() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/conversations.unarchive"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"ok": false, "error": "not_in_channel"})),
            )
            .mount(&server)
            .await;

        let client = client_for(&server).await;
        let err = client.unarchive_channel("C1").await.unwrap_err();
        assert_eq!(err.code(), Some("not_in_channel"));
    }
}
