//! Executes parsed commands against the roster store.

use super::approval::apply_request;
use super::parser::{parse, Command, ParseError, WithdrawAmount};
use super::replies::{self, BalanceView};
use crate::db::Repository;
use crate::domain::{
    ChatId, Decimal, Investor, LedgerEntry, LedgerKind, RequestKind, RequestStatus,
};
use crate::notify::{send_all, set_menu_logged, IncomingMessage, Menu, MenuScope, Notifier};
use chrono::Utc;
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info};

#[derive(Debug, Error)]
pub enum CommandError {
    #[error("Store error: {0}")]
    Store(#[from] sqlx::Error),
}

/// Static settings the command surface needs.
#[derive(Debug, Clone, Default)]
pub struct CommandSettings {
    pub admin_ids: BTreeSet<i64>,
    pub deposit_address: Option<String>,
    pub deposit_network: String,
}

pub struct CommandHandler {
    repo: Arc<Repository>,
    notifier: Arc<dyn Notifier>,
    settings: CommandSettings,
}

impl CommandHandler {
    pub fn new(
        repo: Arc<Repository>,
        notifier: Arc<dyn Notifier>,
        settings: CommandSettings,
    ) -> Self {
        Self {
            repo,
            notifier,
            settings,
        }
    }

    /// Sender's user id or the chat id is listed as admin.
    pub fn is_admin(&self, message: &IncomingMessage) -> bool {
        message
            .user_id
            .is_some_and(|id| self.settings.admin_ids.contains(&id))
            || self.settings.admin_ids.contains(&message.chat_id.as_i64())
    }

    /// Handle one incoming message and return the reply for the sender.
    ///
    /// Plain text, unknown commands and admin commands from non-admins get
    /// no reply.
    pub async fn handle(&self, message: &IncomingMessage) -> Result<Option<String>, CommandError> {
        let admin = self.is_admin(message);
        let command = match parse(&message.text) {
            Ok(Some(command)) => command,
            Ok(None) => return Ok(None),
            Err(e) if e.is_admin() && !admin => return Ok(None),
            Err(ParseError::Usage { usage, .. }) => return Ok(Some(replies::usage(usage))),
            Err(ParseError::NonPositiveAmount) => {
                return Ok(Some(replies::AMOUNT_NOT_POSITIVE.to_string()))
            }
        };

        if command.is_admin() && !admin {
            debug!(chat_id = %message.chat_id, "Ignoring admin command from non-admin");
            return Ok(None);
        }

        let chat_id = message.chat_id;
        let reply = match command {
            Command::Start => {
                set_menu_logged(self.notifier.as_ref(), MenuScope::Chat(chat_id), Menu::Investor)
                    .await;
                replies::start(
                    self.settings.deposit_address.as_deref(),
                    &self.settings.deposit_network,
                )
            }
            Command::About => replies::ABOUT.to_string(),
            Command::MyName(name) => self.set_own_name(chat_id, name).await?,
            Command::Wallet => match self.repo.get_investor(chat_id).await? {
                Some(investor) => replies::wallet(&investor),
                None => replies::NOT_REGISTERED.to_string(),
            },
            Command::SetWallet { address, network } => {
                let mut investor = self
                    .repo
                    .investor_or_new(chat_id, &chat_id.to_string())
                    .await?;
                investor.wallet = address;
                investor.network = network;
                investor.updated_at = Utc::now();
                self.repo.upsert_investor(&investor).await?;
                replies::WALLET_UPDATED.to_string()
            }
            Command::AddDeposit(amount) => {
                let fallback_name = message
                    .first_name
                    .clone()
                    .unwrap_or_else(|| chat_id.to_string());
                let investor = match self.repo.get_investor(chat_id).await? {
                    Some(investor) => investor,
                    None => {
                        let investor = Investor::new(chat_id, fallback_name);
                        self.repo.upsert_investor(&investor).await?;
                        investor
                    }
                };
                self.file_request(&investor, RequestKind::AddDeposit, amount)
                    .await?
            }
            Command::AddFromBonus(amount) => match self.repo.get_investor(chat_id).await? {
                None => replies::NOT_REGISTERED.to_string(),
                Some(investor) if amount > investor.available_bonus() => {
                    replies::NOT_ENOUGH_BONUS.to_string()
                }
                Some(investor) => {
                    self.file_request(&investor, RequestKind::AddFromBonus, amount)
                        .await?
                }
            },
            Command::WithdrawBonus(requested) => {
                let Some(investor) = self.repo.get_investor(chat_id).await? else {
                    return Ok(Some(replies::NOT_REGISTERED.to_string()));
                };
                let available = investor.available_bonus();
                let amount = match requested {
                    None => return Ok(Some(replies::available_to_withdraw(available))),
                    Some(WithdrawAmount::All) => available,
                    Some(WithdrawAmount::Amount(amount)) => amount,
                };
                if !amount.is_positive() || amount > available {
                    replies::INVALID_AMOUNT.to_string()
                } else {
                    self.file_request(&investor, RequestKind::WithdrawBonus, amount)
                        .await?
                }
            }
            Command::WithdrawAll => match self.repo.get_investor(chat_id).await? {
                None => replies::NOT_REGISTERED.to_string(),
                Some(investor) => {
                    match investor.deposit.checked_add(investor.available_bonus()) {
                        Some(total) => {
                            self.file_request(&investor, RequestKind::WithdrawAll, total)
                                .await?
                        }
                        None => replies::INVALID_AMOUNT.to_string(),
                    }
                }
            },
            Command::Balance => self.balance(chat_id).await?,

            Command::Help => replies::ADMIN_HELP.to_string(),
            Command::List => {
                let investors = self.repo.list_investors(false).await?;
                if investors.is_empty() {
                    replies::EMPTY_ROSTER.to_string()
                } else {
                    investors
                        .iter()
                        .map(replies::roster_line)
                        .collect::<Vec<_>>()
                        .join("\n")
                }
            }
            Command::AddUser {
                chat_id: target,
                name,
                deposit,
            } => self.add_user(target, name, deposit).await?,
            Command::SetDeposit {
                chat_id: target,
                amount,
            } => match self.repo.get_investor(target).await? {
                None => replies::unknown_investor(target),
                Some(mut investor) => {
                    investor.pending_deposit = amount;
                    investor.updated_at = Utc::now();
                    self.repo.upsert_investor(&investor).await?;
                    info!(chat_id = %target, pending = %amount, "Pending deposit set");
                    replies::pending_set(target, amount)
                }
            },
            Command::SetName {
                chat_id: target,
                name,
            } => {
                let name = name.trim().to_string();
                if name.is_empty() {
                    replies::EMPTY_NAME.to_string()
                } else {
                    match self.repo.get_investor(target).await? {
                        None => replies::unknown_investor(target),
                        Some(mut investor) => {
                            investor.name = name;
                            investor.updated_at = Utc::now();
                            self.repo.upsert_investor(&investor).await?;
                            replies::NAME_UPDATED.to_string()
                        }
                    }
                }
            }
            Command::Remove(target) => match self.repo.get_investor(target).await? {
                None => replies::unknown_investor(target),
                Some(mut investor) => {
                    investor.active = false;
                    investor.updated_at = Utc::now();
                    self.repo.upsert_investor(&investor).await?;
                    info!(chat_id = %target, "Investor deactivated");
                    set_menu_logged(self.notifier.as_ref(), MenuScope::Chat(target), Menu::Guest)
                        .await;
                    replies::USER_REMOVED.to_string()
                }
            },
            Command::Requests => self.open_requests().await?,
            Command::Approve(id) => self.resolve(id, true).await?,
            Command::Reject(id) => self.resolve(id, false).await?,
        };
        Ok(Some(reply))
    }

    async fn set_own_name(&self, chat_id: ChatId, name: String) -> Result<String, CommandError> {
        let mut investor = self.repo.investor_or_new(chat_id, &name).await?;
        investor.name = name;
        investor.active = true;
        investor.updated_at = Utc::now();
        self.repo.upsert_investor(&investor).await?;
        set_menu_logged(self.notifier.as_ref(), MenuScope::Chat(chat_id), Menu::Investor).await;
        Ok(replies::name_saved(&investor.name))
    }

    async fn file_request(
        &self,
        investor: &Investor,
        kind: RequestKind,
        amount: Decimal,
    ) -> Result<String, CommandError> {
        let id = self.repo.create_request(investor, kind, amount).await?;
        info!(
            request_id = id,
            chat_id = %investor.chat_id,
            kind = %kind,
            amount = %amount,
            "Request filed"
        );

        let text = replies::admin_new_request(investor, id, kind, amount);
        self.notify_admins(&text).await;
        Ok(replies::request_filed(kind, id))
    }

    async fn notify_admins(&self, text: &str) {
        let messages = self
            .settings
            .admin_ids
            .iter()
            .map(|id| (ChatId::new(*id), text.to_string()))
            .collect();
        send_all(self.notifier.as_ref(), messages).await;
    }

    async fn balance(&self, chat_id: ChatId) -> Result<String, CommandError> {
        let investor = match self.repo.get_investor(chat_id).await? {
            Some(investor) if investor.active => investor,
            _ => return Ok(replies::NOT_REGISTERED.to_string()),
        };
        let state = self.repo.load_poll_state().await?;
        let total_deposit = self.repo.total_active_deposit().await?;
        let indicative_share = state
            .profit_total
            .checked_mul(investor.deposit)
            .and_then(|scaled| scaled.checked_div(total_deposit))
            .unwrap_or_else(Decimal::zero);
        Ok(replies::balance(&BalanceView {
            investor: &investor,
            indicative_share,
            start_at: state.start_at,
        }))
    }

    async fn add_user(
        &self,
        chat_id: ChatId,
        name: String,
        deposit: Decimal,
    ) -> Result<String, CommandError> {
        let mut investor = self.repo.investor_or_new(chat_id, &name).await?;
        investor.name = name;
        investor.deposit = deposit;
        investor.pending_deposit = Decimal::zero();
        investor.active = true;
        investor.updated_at = Utc::now();
        self.repo.upsert_investor(&investor).await?;
        info!(chat_id = %chat_id, deposit = %deposit, "Investor added");

        set_menu_logged(self.notifier.as_ref(), MenuScope::Chat(chat_id), Menu::Investor).await;
        send_all(
            self.notifier.as_ref(),
            vec![(chat_id, replies::welcome(&investor.name, deposit))],
        )
        .await;
        Ok(replies::user_added(&investor.name, chat_id, deposit))
    }

    async fn open_requests(&self) -> Result<String, CommandError> {
        let requests = self.repo.list_requests(RequestStatus::New).await?;
        if requests.is_empty() {
            return Ok(replies::NO_OPEN_REQUESTS.to_string());
        }
        let names: HashMap<ChatId, String> = self
            .repo
            .list_investors(false)
            .await?
            .into_iter()
            .map(|inv| (inv.chat_id, inv.display_name()))
            .collect();
        Ok(requests
            .iter()
            .map(|r| replies::request_line(r, names.get(&r.chat_id).map(String::as_str)))
            .collect::<Vec<_>>()
            .join("\n"))
    }

    async fn resolve(&self, id: i64, approve: bool) -> Result<String, CommandError> {
        let Some(request) = self.repo.get_request(id).await? else {
            return Ok(replies::unknown_request(id));
        };
        if request.status != RequestStatus::New {
            return Ok(replies::request_already_resolved(id));
        }
        let Some(mut investor) = self.repo.get_investor(request.chat_id).await? else {
            return Ok(replies::unknown_investor(request.chat_id));
        };

        let (status, kind, updated) = if approve {
            if let Err(e) = apply_request(&mut investor, &request) {
                return Ok(replies::request_cannot_apply(id, &e.to_string()));
            }
            (RequestStatus::Approved, LedgerKind::RequestApproved, Some(&investor))
        } else {
            (RequestStatus::Rejected, LedgerKind::RequestRejected, None)
        };

        let entry = LedgerEntry::new(
            investor.chat_id,
            investor.name.clone(),
            kind,
            request.amount,
            format!("request #{} {}", request.id, request.kind),
        );
        if !self
            .repo
            .resolve_request(id, status, updated, &[entry])
            .await?
        {
            return Ok(replies::request_already_resolved(id));
        }
        info!(request_id = id, status = status.as_str(), "Request resolved");

        if approve && !investor.active {
            set_menu_logged(
                self.notifier.as_ref(),
                MenuScope::Chat(investor.chat_id),
                Menu::Guest,
            )
            .await;
        }
        send_all(
            self.notifier.as_ref(),
            vec![(
                investor.chat_id,
                replies::request_resolved_investor(&request, approve),
            )],
        )
        .await;
        Ok(replies::request_resolved_admin(&request, approve))
    }
}
