use serde::Deserialize;

use super::models::{MemberPage, User};
use super::{SlackClient, SlackError};

#[derive(Debug, Deserialize)]
struct UserEnvelope {
    user: User,
}

impl SlackClient {
    pub async fn list_users(&self, limit: u32) -> Result<Vec<User>, SlackError> {
        self.paginate::<MemberPage>("users.list", &[], limit).await
    }

    pub async fn user_info(&self, user_id: &str) -> Result<User, SlackError> {
        let response: UserEnvelope = self
            .get("users.info", &[("user", user_id.to_string())])
            .await?;
        Ok(response.user)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use crate::slack::test_support::client_for;

    #[tokio::test]
    async fn list_reads_members_across_pages() {
        let server = MockServer::start().await;
        let members: Vec<_> = (0..200)
            .map(|i| json!({"id": format!("U{i}"), "name": format!("user{i}")}))
            .collect();
        Mock::given(method("GET"))
            .and(path("/users.list"))
            .and(query_param("limit", "200"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "ok": true,
                "members": members,
                "response_metadata": {"next_cursor": "p2"}
            })))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/users.list"))
            .and(query_param("cursor", "p2"))
            .and(query_param("limit", "100"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "ok": true,
                "members": [{"id": "W1", "name": "last", "is_bot": true}],
                "response_metadata": {"next_cursor": ""}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server).await;
        let users = client.list_users(300).await.unwrap();
        assert_eq!(users.len(), 201);
        assert!(users[200].is_bot);
    }

    #[tokio::test]
    async fn info_decodes_profile() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/users.info"))
            .and(query_param("user", "U1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "ok": true,
                "user": {
                    "id": "U1",
                    "name": "jdoe",
                    "real_name": "Jane Doe",
                    "is_admin": true,
                    "profile": {"email": "jane@example.com", "display_name": "jane"}
                }
            })))
            .mount(&server)
            .await;

        let client = client_for(&server).await;
        let user = client.user_info("U1").await.unwrap();
        assert!(user.is_admin);
        assert_eq!(user.profile.email, "jane@example.com");
    }

    #[tokio::test]
    async fn unknown_user_is_api_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/users.info"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"ok": false, "error": "user_not_found"})),
            )
            .mount(&server)
            .await;

        let client = client_for(&server).await;
        let err = client.user_info("U404").await.unwrap_err();
        assert_eq!(err.code(), Some("user_not_found"));
    }
}
