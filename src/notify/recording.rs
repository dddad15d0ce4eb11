//! In-memory notifier that records everything it is asked to send.

use super::{Menu, MenuScope, Notifier, NotifyError};
use crate::domain::ChatId;
use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::Mutex;

#[derive(Debug, Default)]
pub struct RecordingNotifier {
    sent: Mutex<Vec<(ChatId, String)>>,
    menus: Mutex<Vec<(MenuScope, Menu)>>,
    failing: Mutex<HashSet<ChatId>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every send to `chat_id` fail.
    pub fn fail_for(&self, chat_id: ChatId) {
        self.failing
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(chat_id);
    }

    /// Successfully delivered messages, in send order.
    pub fn sent(&self) -> Vec<(ChatId, String)> {
        self.sent.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// Messages delivered to one chat.
    pub fn sent_to(&self, chat_id: ChatId) -> Vec<String> {
        self.sent()
            .into_iter()
            .filter(|(id, _)| *id == chat_id)
            .map(|(_, text)| text)
            .collect()
    }

    pub fn menus(&self) -> Vec<(MenuScope, Menu)> {
        self.menus.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn clear(&self) {
        self.sent.lock().unwrap_or_else(|e| e.into_inner()).clear();
        self.menus.lock().unwrap_or_else(|e| e.into_inner()).clear();
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send_text(&self, chat_id: ChatId, text: &str) -> Result<(), NotifyError> {
        let failing = self
            .failing
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .contains(&chat_id);
        if failing {
            return Err(NotifyError::Api {
                status: 403,
                description: "Forbidden: bot was blocked by the user".to_string(),
            });
        }
        self.sent
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push((chat_id, text.to_string()));
        Ok(())
    }

    async fn set_menu(&self, scope: MenuScope, menu: Menu) -> Result<(), NotifyError> {
        self.menus
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push((scope, menu));
        Ok(())
    }
}
