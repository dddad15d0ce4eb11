//! Outbound chat delivery.
//!
//! This module provides the `Notifier` trait with two implementations:
//! - `TelegramClient` - Telegram Bot API over HTTP
//! - `RecordingNotifier` - in-memory recorder for tests

mod recording;
mod telegram;

pub use recording::RecordingNotifier;
pub use telegram::{IncomingMessage, TelegramClient, UpdateBatch};

use crate::domain::ChatId;
use async_trait::async_trait;
use thiserror::Error;
use tracing::{debug, warn};

/// Errors from chat delivery.
#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("API error (status {status}): {description}")]
    Api { status: u16, description: String },

    #[error("Decode error: {0}")]
    Decode(String),
}

/// Where a command menu applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuScope {
    AllPrivateChats,
    Chat(ChatId),
}

/// Command menus shown by the chat client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Menu {
    Guest,
    Investor,
    Admin,
}

impl Menu {
    /// `(command, description)` pairs.
    pub fn commands(&self) -> &'static [(&'static str, &'static str)] {
        match self {
            Menu::Guest => &[("start", "How to get started")],
            Menu::Investor => &[
                ("start", "How to get started"),
                ("about", "About this bot"),
                ("myname", "Set your name"),
                ("wallet", "My payout wallet"),
                ("setwallet", "Change payout wallet"),
                ("add_deposit", "Request a deposit top-up"),
                ("add_from_bonus", "Top up from bonus"),
                ("withdraw_bonus", "Withdraw bonus"),
                ("withdraw_all", "Withdraw everything"),
                ("balance", "Balance"),
            ],
            Menu::Admin => &[
                ("help", "Admin commands"),
                ("list", "List investors"),
                ("adduser", "Add investor"),
                ("setdep", "Set pending deposit"),
                ("setname", "Rename investor"),
                ("remove", "Deactivate investor"),
                ("requests", "Open requests"),
                ("approve", "Approve request"),
                ("reject", "Reject request"),
            ],
        }
    }
}

/// Chat delivery backend.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Send one HTML-formatted text message.
    async fn send_text(&self, chat_id: ChatId, text: &str) -> Result<(), NotifyError>;

    /// Install a command menu. Backends without menus accept and ignore it.
    async fn set_menu(&self, _scope: MenuScope, _menu: Menu) -> Result<(), NotifyError> {
        Ok(())
    }
}

/// Source of incoming chat messages.
#[async_trait]
pub trait UpdateSource: Send + Sync {
    /// Updates with `update_id >= offset`.
    async fn fetch_updates(&self, offset: i64) -> Result<UpdateBatch, NotifyError>;
}

/// Outcome of a best-effort broadcast.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SendReport {
    pub sent: usize,
    pub failed: usize,
}

/// Send every message, logging and counting failures instead of aborting.
pub async fn send_all(notifier: &dyn Notifier, messages: Vec<(ChatId, String)>) -> SendReport {
    let mut report = SendReport::default();
    for (chat_id, text) in messages {
        if text.trim().is_empty() {
            continue;
        }
        match notifier.send_text(chat_id, &text).await {
            Ok(()) => {
                debug!(chat_id = %chat_id, "Message delivered");
                report.sent += 1;
            }
            Err(e) => {
                warn!(chat_id = %chat_id, error = %e, "Failed to deliver message");
                report.failed += 1;
            }
        }
    }
    report
}

/// Install a menu, logging failures.
pub async fn set_menu_logged(notifier: &dyn Notifier, scope: MenuScope, menu: Menu) {
    if let Err(e) = notifier.set_menu(scope, menu).await {
        warn!(scope = ?scope, menu = ?menu, error = %e, "Failed to install command menu");
    }
}
