use std::error::Error as StdError;
use std::fmt;

use thiserror::Error;

use crate::credentials::CredentialError;
use crate::validate::ValidationError;

type BoxError = Box<dyn StdError + Send + Sync + 'static>;

#[derive(Error, Debug)]
pub enum SlackError {
    /// Slack answered with `ok: false`.
    #[error("slack API error: {code}")]
    Api { method: String, code: String },

    #[error("request to {method} failed: {source}")]
    Http {
        method: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("failed to decode {method} response: {source}")]
    Decode {
        method: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to construct HTTP client: {0}")]
    Client(#[source] reqwest::Error),

    #[error(transparent)]
    Credential(#[from] CredentialError),

    #[error(transparent)]
    Validation(#[from] ValidationError),
}

impl SlackError {
    /// The Slack error code when the API itself rejected the call.
    pub fn code(&self) -> Option<&str> {
        match self {
            SlackError::Api { code, .. } => Some(code),
            _ => None,
        }
    }
}

/// Slack error codes with an operator-facing hint, most specific first.
const HINTS: &[(&str, &str)] = &[
    (
        "channel_not_found",
        "Verify the channel ID is correct. Use 'slck channels list' to find channel IDs.",
    ),
    (
        "not_in_channel",
        "The bot must be invited to the channel. Use /invite @yourbot in Slack.",
    ),
    (
        "invalid_auth",
        "Token is invalid or expired. Run 'slck config set-token' to set a new token.",
    ),
    (
        "token_revoked",
        "Token has been revoked. Run 'slck config set-token' to set a new token.",
    ),
    ("ratelimited", "Rate limit exceeded. Wait a moment and try again."),
    (
        "user_not_found",
        "Verify the user ID is correct. Use 'slck users list' to find user IDs.",
    ),
    (
        "message_not_found",
        "Message not found. Verify the channel ID and timestamp are correct.",
    ),
    (
        "cant_delete_message",
        "Cannot delete this message. You can only delete messages sent by the bot.",
    ),
    (
        "cant_update_message",
        "Cannot update this message. You can only update messages sent by the bot.",
    ),
    ("already_archived", "Channel is already archived."),
    ("not_archived", "Channel is not archived."),
    ("name_taken", "A channel with this name already exists."),
    (
        "invalid_name",
        "Invalid channel name. Use lowercase letters, numbers, and hyphens only.",
    ),
    (
        "no_permission",
        "The bot lacks permission for this action. Check the app's OAuth scopes.",
    ),
    (
        "missing_scope",
        "Missing required OAuth scope. Update your app's permissions at api.slack.com/apps.",
    ),
    ("account_inactive", "The user account is inactive or disabled."),
    ("is_archived", "Cannot perform this action on an archived channel."),
    (
        "too_many_attachments",
        "Message has too many attachments. Reduce and try again.",
    ),
    (
        "msg_too_long",
        "Message is too long. Maximum is 40,000 characters.",
    ),
];

/// Looks up a hint for any known error code embedded in `message`.
pub fn hint_for(message: &str) -> Option<&'static str> {
    HINTS
        .iter()
        .find(|(code, _)| message.contains(code))
        .map(|(_, hint)| *hint)
}

/// An error annotated with the operation that produced it and, when the
/// underlying Slack code is known, a hint for the operator.
#[derive(Debug)]
pub struct HintedError {
    operation: String,
    hint: Option<&'static str>,
    source: BoxError,
}

impl HintedError {
    pub fn operation(&self) -> &str {
        &self.operation
    }

    pub fn hint(&self) -> Option<&'static str> {
        self.hint
    }
}

impl fmt::Display for HintedError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.operation, self.source)
    }
}

impl StdError for HintedError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        Some(&*self.source)
    }
}

pub fn wrap_error<E>(operation: impl Into<String>, err: E) -> HintedError
where
    E: Into<BoxError>,
{
    let source = err.into();
    let hint = chain_text(&*source).and_then(|text| hint_for(&text));
    HintedError {
        operation: operation.into(),
        hint,
        source,
    }
}

fn chain_text(err: &(dyn StdError + 'static)) -> Option<String> {
    let mut text = err.to_string();
    let mut current = err.source();
    while let Some(cause) = current {
        text.push('\n');
        text.push_str(&cause.to_string());
        current = cause.source();
    }
    (!text.is_empty()).then_some(text)
}
