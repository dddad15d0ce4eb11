//! Telegram Bot API client.

use super::{Menu, MenuScope, Notifier, NotifyError, UpdateSource};
use crate::domain::ChatId;
use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, warn};

/// A text message received from a chat.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IncomingMessage {
    pub update_id: i64,
    pub chat_id: ChatId,
    /// Sender's user id, absent for channel posts.
    pub user_id: Option<i64>,
    pub first_name: Option<String>,
    pub text: String,
}

/// Messages from one `getUpdates` call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UpdateBatch {
    pub messages: Vec<IncomingMessage>,
    /// Highest update id seen, including updates that carried no text.
    pub last_update_id: Option<i64>,
}

impl UpdateBatch {
    /// Offset that acknowledges this batch.
    pub fn next_offset(&self, current: i64) -> i64 {
        self.last_update_id
            .map_or(current, |id| (id + 1).max(current))
    }
}

#[derive(Debug, Deserialize)]
struct ApiResponse<T> {
    ok: bool,
    result: Option<T>,
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawUpdate {
    update_id: i64,
    message: Option<RawMessage>,
}

#[derive(Debug, Deserialize)]
struct RawMessage {
    chat: RawChat,
    from: Option<RawUser>,
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawChat {
    id: i64,
}

#[derive(Debug, Deserialize)]
struct RawUser {
    id: i64,
    first_name: Option<String>,
}

#[derive(Debug, Clone)]
pub struct TelegramClient {
    client: Client,
    base_url: String,
    token: String,
}

impl TelegramClient {
    pub fn new(base_url: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            client: Client::builder()
                .timeout(Duration::from_secs(30))
                .build()
                .unwrap_or_default(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: token.into(),
        }
    }

    fn method_url(&self, method: &str) -> String {
        format!("{}/bot{}/{}", self.base_url, self.token, method)
    }

    async fn call<T: DeserializeOwned>(
        &self,
        method: &str,
        payload: serde_json::Value,
    ) -> Result<T, NotifyError> {
        let response = self
            .client
            .post(self.method_url(method))
            .json(&payload)
            .send()
            .await
            .map_err(|e| NotifyError::Network(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| NotifyError::Network(e.to_string()))?;

        if !status.is_success() {
            warn!(method = method, status = status.as_u16(), body = %body, "telegram API error");
        }

        decode_response(status.as_u16(), &body)
    }

    /// Send an HTML message without link previews.
    pub async fn send_message(&self, chat_id: ChatId, text: &str) -> Result<(), NotifyError> {
        let _: serde_json::Value = self
            .call(
                "sendMessage",
                serde_json::json!({
                    "chat_id": chat_id.as_i64(),
                    "text": text,
                    "parse_mode": "HTML",
                    "disable_web_page_preview": true,
                }),
            )
            .await?;
        Ok(())
    }

    /// Fetch text messages with `update_id >= offset`.
    pub async fn get_updates(
        &self,
        offset: i64,
        timeout_secs: u64,
    ) -> Result<UpdateBatch, NotifyError> {
        let updates: Vec<RawUpdate> = self
            .call(
                "getUpdates",
                serde_json::json!({
                    "offset": offset,
                    "timeout": timeout_secs,
                    "allowed_updates": ["message"],
                }),
            )
            .await?;
        Ok(into_batch(updates))
    }

    pub async fn set_my_commands(&self, scope: MenuScope, menu: Menu) -> Result<(), NotifyError> {
        let commands: Vec<serde_json::Value> = menu
            .commands()
            .iter()
            .map(|(command, description)| {
                serde_json::json!({ "command": command, "description": description })
            })
            .collect();
        let scope = match scope {
            MenuScope::AllPrivateChats => serde_json::json!({ "type": "all_private_chats" }),
            MenuScope::Chat(chat_id) => {
                serde_json::json!({ "type": "chat", "chat_id": chat_id.as_i64() })
            }
        };
        let _: bool = self
            .call(
                "setMyCommands",
                serde_json::json!({ "commands": commands, "scope": scope }),
            )
            .await?;
        Ok(())
    }
}

#[async_trait]
impl Notifier for TelegramClient {
    async fn send_text(&self, chat_id: ChatId, text: &str) -> Result<(), NotifyError> {
        debug!(chat_id = %chat_id, len = text.len(), "Sending message");
        self.send_message(chat_id, text).await
    }

    async fn set_menu(&self, scope: MenuScope, menu: Menu) -> Result<(), NotifyError> {
        self.set_my_commands(scope, menu).await
    }
}

#[async_trait]
impl UpdateSource for TelegramClient {
    async fn fetch_updates(&self, offset: i64) -> Result<UpdateBatch, NotifyError> {
        self.get_updates(offset, 0).await
    }
}

fn decode_response<T: DeserializeOwned>(status: u16, body: &str) -> Result<T, NotifyError> {
    let parsed: ApiResponse<T> =
        serde_json::from_str(body).map_err(|e| NotifyError::Decode(e.to_string()))?;
    if !parsed.ok {
        return Err(NotifyError::Api {
            status,
            description: parsed.description.unwrap_or_default(),
        });
    }
    parsed
        .result
        .ok_or_else(|| NotifyError::Decode("missing result".to_string()))
}

fn into_batch(updates: Vec<RawUpdate>) -> UpdateBatch {
    let last_update_id = updates.iter().map(|u| u.update_id).max();
    let messages = updates
        .into_iter()
        .filter_map(|update| {
            let message = update.message?;
            let text = message.text?;
            Some(IncomingMessage {
                update_id: update.update_id,
                chat_id: ChatId::new(message.chat.id),
                user_id: message.from.as_ref().map(|u| u.id),
                first_name: message.from.and_then(|u| u.first_name),
                text,
            })
        })
        .collect();
    UpdateBatch {
        messages,
        last_update_id,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_updates_keeps_text_messages() {
        let body = r#"{
            "ok": true,
            "result": [
                {"update_id": 10, "message": {"chat": {"id": 42}, "from": {"id": 7, "first_name": "Ann"}, "text": "/balance"}},
                {"update_id": 11, "message": {"chat": {"id": 42}, "from": {"id": 7}, "sticker": {}}},
                {"update_id": 12, "edited_message": {"chat": {"id": 42}, "text": "x"}}
            ]
        }"#;
        let updates: Vec<RawUpdate> = decode_response(200, body).unwrap();
        assert_eq!(updates.len(), 3);

        let batch = into_batch(updates);
        assert_eq!(batch.last_update_id, Some(12));
        assert_eq!(batch.next_offset(0), 13);
        let messages = batch.messages;
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].chat_id, ChatId::new(42));
        assert_eq!(messages[0].user_id, Some(7));
        assert_eq!(messages[0].first_name.as_deref(), Some("Ann"));
        assert_eq!(messages[0].text, "/balance");
    }

    #[test]
    fn test_decode_api_error() {
        let body = r#"{"ok": false, "error_code": 403, "description": "Forbidden: bot was blocked by the user"}"#;
        let err = decode_response::<serde_json::Value>(403, body).unwrap_err();
        match err {
            NotifyError::Api {
                status,
                description,
            } => {
                assert_eq!(status, 403);
                assert!(description.contains("blocked"));
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_decode_garbage() {
        assert!(matches!(
            decode_response::<bool>(502, "<html>Bad Gateway</html>"),
            Err(NotifyError::Decode(_))
        ));
    }

    #[test]
    fn test_next_offset() {
        assert_eq!(UpdateBatch::default().next_offset(7), 7);
        let batch = UpdateBatch {
            messages: Vec::new(),
            last_update_id: Some(5),
        };
        assert_eq!(batch.next_offset(0), 6);
        assert_eq!(batch.next_offset(20), 20);
    }

    #[test]
    fn test_method_url_trims_trailing_slash() {
        let client = TelegramClient::new("http://localhost:9000/", "T0K");
        assert_eq!(
            client.method_url("sendMessage"),
            "http://localhost:9000/botT0K/sendMessage"
        );
    }
}
