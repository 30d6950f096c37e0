use std::time::Duration;

use once_cell::sync::Lazy;
use rand::RngCore;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, info};
use url::Url;

use crate::credentials::{CredentialError, CredentialStore, TokenKind};

mod callback;

pub use self::callback::CALLBACK_PATH;
use self::callback::CallbackServer;

pub const DEFAULT_PORT: u16 = 8085;
pub const LOGIN_TIMEOUT: Duration = Duration::from_secs(5 * 60);
pub const SCOPES: &str = "channels:read,channels:write,chat:write,users:read,reactions:write,search:read,team:read,groups:read,im:read,mpim:read";

static AUTHORIZE_URL: Lazy<Url> = Lazy::new(|| {
    Url::parse("https://slack.com/oauth/v2/authorize").expect("valid authorize url")
});

#[derive(Error, Debug)]
pub enum OAuthError {
    #[error("state mismatch in OAuth callback: possible CSRF attack")]
    StateMismatch,

    #[error("authorization was rejected: {0}")]
    Rejected(String),

    #[error("no authorization code in OAuth callback")]
    MissingCode,

    #[error("timed out after {} seconds waiting for authorization", .0.as_secs())]
    Timeout(Duration),

    #[error("failed to start callback listener on port {port}: {message}")]
    Listener { port: u16, message: String },

    #[error("token exchange failed: {0}")]
    TokenExchange(String),

    #[error("failed to store token: {0}")]
    Storage(#[from] CredentialError),
}

/// One authorization attempt's parameters.
#[derive(Debug, Clone)]
pub struct LoginOptions {
    pub client_id: String,
    pub client_secret: SecretString,
    pub port: u16,
    /// Base of the Web API; the token endpoint is `<api_base>/oauth.v2.access`.
    pub api_base: String,
    pub timeout: Duration,
}

impl LoginOptions {
    pub fn redirect_uri(&self) -> String {
        redirect_uri(self.port)
    }
}

pub fn redirect_uri(port: u16) -> String {
    format!("http://localhost:{port}/{CALLBACK_PATH}")
}

/// 16 random bytes, hex encoded.
pub fn generate_state() -> String {
    let mut bytes = [0u8; 16];
    rand::rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

pub fn authorize_url(client_id: &str, redirect_uri: &str, state: &str) -> Url {
    let mut url = AUTHORIZE_URL.clone();
    url.query_pairs_mut()
        .append_pair("client_id", client_id)
        .append_pair("scope", SCOPES)
        .append_pair("redirect_uri", redirect_uri)
        .append_pair("state", state);
    url
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    #[serde(default)]
    ok: bool,
    #[serde(default)]
    access_token: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

/// Trades an authorization code for a bot token at `oauth.v2.access`.
pub async fn exchange_code(
    http: &reqwest::Client,
    options: &LoginOptions,
    code: &str,
) -> Result<SecretString, OAuthError> {
    let token_url = format!("{}/oauth.v2.access", options.api_base.trim_end_matches('/'));
    let redirect_uri = options.redirect_uri();
    let form = [
        ("client_id", options.client_id.as_str()),
        ("client_secret", options.client_secret.expose_secret()),
        ("code", code),
        ("redirect_uri", redirect_uri.as_str()),
    ];

    let response = http
        .post(&token_url)
        .form(&form)
        .send()
        .await
        .map_err(|err| OAuthError::TokenExchange(err.to_string()))?;
    debug!("oauth.v2.access responded with status {}", response.status());

    let body: TokenResponse = response
        .json()
        .await
        .map_err(|err| OAuthError::TokenExchange(format!("invalid response: {err}")))?;

    if !body.ok {
        return Err(OAuthError::TokenExchange(
            body.error.unwrap_or_else(|| "unknown_error".to_string()),
        ));
    }
    body.access_token
        .filter(|token| !token.is_empty())
        .map(SecretString::from)
        .ok_or_else(|| OAuthError::TokenExchange("response carried no access token".to_string()))
}

/// Runs the full authorization-code flow and stores the result as the bot token.
///
/// `open_browser` receives the authorization URL once the listener is up.
pub async fn login<F>(
    options: &LoginOptions,
    store: &CredentialStore,
    http: &reqwest::Client,
    open_browser: F,
) -> Result<SecretString, OAuthError>
where
    F: FnOnce(&Url),
{
    let state = generate_state();
    let server = CallbackServer::start(options.port, state.clone()).await?;

    let url = authorize_url(&options.client_id, &options.redirect_uri(), &state);
    open_browser(&url);

    let code = server.wait(options.timeout).await?;
    info!("received authorization code, exchanging for token");

    let token = exchange_code(http, options, &code).await?;
    store.set(TokenKind::Bot, token.expose_secret())?;
    info!("stored bot token from oauth login");
    Ok(token)
}
