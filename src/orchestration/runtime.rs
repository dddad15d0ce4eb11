//! Main loop: poll timer and chat updates on one task.
//!
//! Poll cycles and command handlers run from the same `select!` loop, so they
//! never interleave.

use super::poller::Poller;
use crate::commands::CommandHandler;
use crate::db::Repository;
use crate::domain::ChatId;
use crate::notify::{
    send_all, set_menu_logged, IncomingMessage, Menu, MenuScope, Notifier, UpdateSource,
};
use std::collections::BTreeSet;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{interval, interval_at, Instant, MissedTickBehavior};
use tracing::{debug, error, info, warn};

const TEMPORARY_ERROR: &str = "⚠️ Temporary error, please try again later.";

#[derive(Debug, Clone)]
pub struct RuntimeSettings {
    pub poll_interval: Duration,
    pub first_poll_delay: Duration,
    pub updates_interval: Duration,
}

impl RuntimeSettings {
    pub fn new(poll_interval: Duration) -> Self {
        Self {
            poll_interval,
            first_poll_delay: Duration::from_secs(5),
            updates_interval: Duration::from_secs(1),
        }
    }
}

pub struct Runtime {
    poller: Poller,
    commands: CommandHandler,
    updates: Arc<dyn UpdateSource>,
    notifier: Arc<dyn Notifier>,
    settings: RuntimeSettings,
}

impl Runtime {
    pub fn new(
        poller: Poller,
        commands: CommandHandler,
        updates: Arc<dyn UpdateSource>,
        notifier: Arc<dyn Notifier>,
        settings: RuntimeSettings,
    ) -> Self {
        Self {
            poller,
            commands,
            updates,
            notifier,
            settings,
        }
    }

    /// Run until `shutdown` resolves.
    pub async fn run<F>(self, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        let mut poll_timer = interval_at(
            Instant::now() + self.settings.first_poll_delay,
            self.settings.poll_interval,
        );
        poll_timer.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut updates_timer = interval(self.settings.updates_interval);
        updates_timer.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut offset: i64 = 0;

        tokio::pin!(shutdown);
        info!(
            poll_interval_secs = self.settings.poll_interval.as_secs(),
            "Runtime started"
        );

        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    info!("Shutdown requested, stopping runtime");
                    break;
                }
                _ = poll_timer.tick() => {
                    match self.poller.poll_once().await {
                        Ok(report) => debug!(?report, "Poll cycle finished"),
                        Err(e) => error!(error = %e, "Poll cycle failed, cursor unchanged"),
                    }
                }
                _ = updates_timer.tick() => {
                    match self.updates.fetch_updates(offset).await {
                        Ok(batch) => {
                            offset = batch.next_offset(offset);
                            for message in &batch.messages {
                                self.dispatch(message).await;
                            }
                        }
                        Err(e) => warn!(error = %e, "Failed to poll chat updates"),
                    }
                }
            }
        }
    }

    /// Handle one incoming message and send the reply, if any.
    pub async fn dispatch(&self, message: &IncomingMessage) {
        debug!(chat_id = %message.chat_id, update_id = message.update_id, "Incoming message");
        let reply = match self.commands.handle(message).await {
            Ok(Some(reply)) => reply,
            Ok(None) => return,
            Err(e) => {
                error!(chat_id = %message.chat_id, error = %e, "Command failed");
                TEMPORARY_ERROR.to_string()
            }
        };
        send_all(self.notifier.as_ref(), vec![(message.chat_id, reply)]).await;
    }
}

/// Install command menus: the guest menu for all private chats, the admin
/// menu for each admin and the investor menu for each active investor.
/// Failures are logged and ignored.
pub async fn install_menus(
    notifier: &dyn Notifier,
    repo: &Repository,
    admin_ids: &BTreeSet<i64>,
) {
    set_menu_logged(notifier, MenuScope::AllPrivateChats, Menu::Guest).await;
    for id in admin_ids {
        set_menu_logged(notifier, MenuScope::Chat(ChatId::new(*id)), Menu::Admin).await;
    }
    match repo.list_investors(true).await {
        Ok(investors) => {
            for investor in investors
                .iter()
                .filter(|inv| !admin_ids.contains(&inv.chat_id.as_i64()))
            {
                set_menu_logged(notifier, MenuScope::Chat(investor.chat_id), Menu::Investor)
                    .await;
            }
            info!(investors = investors.len(), "Command menus installed");
        }
        Err(e) => warn!(error = %e, "Failed to load investors for menus"),
    }
}
