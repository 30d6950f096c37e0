use serde::Deserialize;
use serde::de::IgnoredAny;
use serde_json::{Map, Value, json};

use super::models::{Message, MessagePage};
use super::{SlackClient, SlackError};
use crate::validate::ValidationError;

/// Payload shared by `chat.postMessage` and `chat.update`.
#[derive(Debug, Clone, Default)]
pub struct OutgoingMessage {
    pub text: String,
    pub blocks: Option<Vec<Value>>,
    pub thread_ts: Option<String>,
    pub unfurl: bool,
}

impl OutgoingMessage {
    #[cfg(test)]
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            unfurl: true,
            ..Self::default()
        }
    }

    fn has_blocks(&self) -> bool {
        self.blocks.as_ref().is_some_and(|blocks| !blocks.is_empty())
    }

    /// Builds the JSON body; `text` is left out when only blocks are sent.
    fn payload(&self, channel_id: &str, ts: Option<&str>) -> Result<Value, ValidationError> {
        if self.text.is_empty() && !self.has_blocks() {
            return Err(ValidationError::Input(
                "message text or blocks are required".to_string(),
            ));
        }

        let mut body = Map::new();
        body.insert("channel".into(), json!(channel_id));
        if let Some(ts) = ts {
            body.insert("ts".into(), json!(ts));
        }
        if !self.text.is_empty() {
            body.insert("text".into(), json!(self.text));
        }
        if let Some(blocks) = self.blocks.as_ref().filter(|blocks| !blocks.is_empty()) {
            body.insert("blocks".into(), json!(blocks));
        }
        if let Some(thread_ts) = &self.thread_ts {
            body.insert("thread_ts".into(), json!(thread_ts));
        }
        body.insert("unfurl_links".into(), json!(self.unfurl));
        body.insert("unfurl_media".into(), json!(self.unfurl));
        Ok(Value::Object(body))
    }
}

#[derive(Debug, Deserialize)]
struct PostedMessage {
    #[serde(default)]
    ts: String,
    #[serde(default)]
    message: Option<Message>,
}

impl PostedMessage {
    /// The envelope's top-level `ts` is authoritative.
    fn into_message(self, outgoing: &OutgoingMessage) -> Message {
        let mut message = self.message.unwrap_or_else(|| Message {
            kind: "message".to_string(),
            text: outgoing.text.clone(),
            thread_ts: outgoing.thread_ts.clone(),
            ..Message::default()
        });
        if !self.ts.is_empty() {
            message.ts = self.ts;
        }
        message
    }
}

impl SlackClient {
    pub async fn send_message(
        &self,
        channel_id: &str,
        message: &OutgoingMessage,
    ) -> Result<Message, SlackError> {
        let payload = message.payload(channel_id, None)?;
        let response: PostedMessage = self.post("chat.postMessage", &payload).await?;
        Ok(response.into_message(message))
    }

    pub async fn update_message(
        &self,
        channel_id: &str,
        ts: &str,
        message: &OutgoingMessage,
    ) -> Result<Message, SlackError> {
        let payload = message.payload(channel_id, Some(ts))?;
        let response: PostedMessage = self.post("chat.update", &payload).await?;
        Ok(response.into_message(message))
    }

    pub async fn delete_message(&self, channel_id: &str, ts: &str) -> Result<(), SlackError> {
        let _: IgnoredAny = self
            .post("chat.delete", &json!({"channel": channel_id, "ts": ts}))
            .await?;
        Ok(())
    }

    pub async fn channel_history(
        &self,
        channel_id: &str,
        limit: u32,
        oldest: Option<&str>,
        latest: Option<&str>,
    ) -> Result<Vec<Message>, SlackError> {
        let mut params = vec![("channel", channel_id.to_string())];
        if let Some(oldest) = oldest {
            params.push(("oldest", oldest.to_string()));
        }
        if let Some(latest) = latest {
            params.push(("latest", latest.to_string()));
        }
        self.paginate::<MessagePage>("conversations.history", &params, limit)
            .await
    }

    pub async fn thread_replies(
        &self,
        channel_id: &str,
        thread_ts: &str,
        limit: u32,
    ) -> Result<Vec<Message>, SlackError> {
        let params = [
            ("channel", channel_id.to_string()),
            ("ts", thread_ts.to_string()),
        ];
        self.paginate::<MessagePage>("conversations.replies", &params, limit)
            .await
    }

    pub async fn add_reaction(
        &self,
        channel_id: &str,
        ts: &str,
        emoji: &str,
    ) -> Result<(), SlackError> {
        self.react("reactions.add", channel_id, ts, emoji).await
    }

    pub async fn remove_reaction(
        &self,
        channel_id: &str,
        ts: &str,
        emoji: &str,
    ) -> Result<(), SlackError> {
        self.react("reactions.remove", channel_id, ts, emoji).await
    }

    async fn react(
        &self,
        method: &str,
        channel_id: &str,
        ts: &str,
        emoji: &str,
    ) -> Result<(), SlackError> {
        let _: IgnoredAny = self
            .post(
                method,
                &json!({"channel": channel_id, "timestamp": ts, "name": emoji}),
            )
            .await?;
        Ok(())
    }
}
