use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::debug;

use crate::config::{Config, DEFAULT_BASE_URL};
use crate::credentials::{CredentialStore, TokenKind};

pub mod channels;
pub mod error;
pub mod messages;
pub mod models;
pub mod search;
pub mod team;
pub mod users;

pub use self::error::{HintedError, SlackError, wrap_error};
pub use self::messages::OutgoingMessage;
pub use self::models::{
    AuthIdentity, Channel, FileMatch, Message, MessageMatch, SearchGroup, User,
};
pub use self::search::{SearchKind, SearchRequest, SortDirection, SortOrder};

use self::models::CursorPage;

/// Largest page Slack recommends for cursor-paginated reads.
pub const PAGE_SIZE: u32 = 200;
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

pub fn user_agent() -> String {
    format!("slck/{}", env!("CARGO_PKG_VERSION"))
}

/// Web API transport bound to one token for its whole lifetime.
#[derive(Clone)]
pub struct SlackClient {
    http: reqwest::Client,
    base_url: String,
    token: SecretString,
}

impl SlackClient {
    pub fn new(
        base_url: impl Into<String>,
        token: SecretString,
        http: Option<reqwest::Client>,
    ) -> Result<Self, SlackError> {
        let http = match http {
            Some(http) => http,
            None => http_client(DEFAULT_TIMEOUT)?,
        };
        let base_url = base_url.into().trim_end_matches('/').to_string();

        Ok(Self {
            http,
            base_url,
            token,
        })
    }

    /// Resolves the token for `kind` and binds the configured endpoint.
    pub fn for_kind(
        kind: TokenKind,
        store: &CredentialStore,
        config: &Config,
    ) -> Result<Self, SlackError> {
        let timeout = Duration::from_secs(config.api.timeout_secs);
        let client = if config.api.base_url == DEFAULT_BASE_URL && timeout == DEFAULT_TIMEOUT {
            Self::new_default(kind, store)?
        } else {
            let http = http_client(timeout)?;
            Self::new(config.api.base_url.clone(), store.get(kind)?, Some(http))?
        };
        debug!("using {} token against {}", kind, client.base_url());
        Ok(client)
    }

    /// Default endpoint and timeout, token resolved from the store.
    pub fn new_default(kind: TokenKind, store: &CredentialStore) -> Result<Self, SlackError> {
        Self::new(DEFAULT_BASE_URL, store.get(kind)?, None)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn endpoint(&self, method: &str) -> String {
        format!("{}/{}", self.base_url, method)
    }

    pub(crate) async fn get<T>(&self, method: &str, params: &[(&str, String)]) -> Result<T, SlackError>
    where
        T: DeserializeOwned,
    {
        debug!("GET {}", method);
        let response = self
            .http
            .get(self.endpoint(method))
            .bearer_auth(self.token.expose_secret())
            .query(params)
            .send()
            .await
            .map_err(|source| SlackError::Http {
                method: method.to_string(),
                source,
            })?;
        decode_response(method, response).await
    }

    pub(crate) async fn post<T>(&self, method: &str, payload: &Value) -> Result<T, SlackError>
    where
        T: DeserializeOwned,
    {
        debug!("POST {}", method);
        let response = self
            .http
            .post(self.endpoint(method))
            .bearer_auth(self.token.expose_secret())
            .json(payload)
            .send()
            .await
            .map_err(|source| SlackError::Http {
                method: method.to_string(),
                source,
            })?;
        decode_response(method, response).await
    }

    /// Follows `next_cursor` until `limit` items are collected or the
    /// collection ends. The result is a prefix of the server ordering.
    pub(crate) async fn paginate<P>(
        &self,
        method: &str,
        params: &[(&str, String)],
        limit: u32,
    ) -> Result<Vec<P::Item>, SlackError>
    where
        P: CursorPage + DeserializeOwned,
    {
        let mut remaining = limit;
        let mut cursor = String::new();
        let mut items = Vec::new();

        while remaining > 0 {
            let mut query = params.to_vec();
            query.push(("limit", remaining.min(PAGE_SIZE).to_string()));
            if !cursor.is_empty() {
                query.push(("cursor", cursor.clone()));
            }

            let page: P = self.get(method, &query).await?;
            let (batch, next_cursor) = page.into_parts();
            remaining = remaining.saturating_sub(u32::try_from(batch.len()).unwrap_or(u32::MAX));
            items.extend(batch);

            if next_cursor.is_empty() {
                break;
            }
            cursor = next_cursor;
        }

        items.truncate(limit as usize);
        debug!("{} returned {} items", method, items.len());
        Ok(items)
    }
}

pub fn http_client(timeout: Duration) -> Result<reqwest::Client, SlackError> {
    reqwest::Client::builder()
        .user_agent(user_agent())
        .timeout(timeout)
        .build()
        .map_err(SlackError::Client)
}

/// Reads the whole body, checks the `{ok, error}` envelope, then decodes `T`
/// from the same document.
async fn decode_response<T>(method: &str, response: reqwest::Response) -> Result<T, SlackError>
where
    T: DeserializeOwned,
{
    let status = response.status();
    let body = response.bytes().await.map_err(|source| SlackError::Http {
        method: method.to_string(),
        source,
    })?;
    debug!("{} responded with status {}", method, status);

    let value: Value = serde_json::from_slice(&body).map_err(|source| SlackError::Decode {
        method: method.to_string(),
        source,
    })?;

    if !value.get("ok").and_then(Value::as_bool).unwrap_or(false) {
        let code = value
            .get("error")
            .and_then(Value::as_str)
            .unwrap_or("unknown_error")
            .to_string();
        return Err(SlackError::Api {
            method: method.to_string(),
            code,
        });
    }

    serde_json::from_value(value).map_err(|source| SlackError::Decode {
        method: method.to_string(),
        source,
    })
}
