//! Pure replay of event-log rows over roster and cohort state.
//!
//! `Replayer` performs no I/O: it takes a roster snapshot, the cohort book and
//! the profit counter, consumes rows in log order and yields the new state
//! together with the side effects (roster changes, ledger entries, outgoing
//! messages) the caller must apply.

use super::cohort::{CohortBook, OpenPosition};
use super::forecast::{annual_forecast, tier_icon};
use super::notices::{self, ClosedNotice};
use crate::domain::{ChatId, Decimal, EventKind, Investor, LedgerEntry, LedgerKind, LogRow};
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use tracing::{debug, warn};

/// Fixed parameters of one replay run.
#[derive(Debug, Clone)]
pub struct ReplaySettings {
    /// Nominal capital used for "percent of bank" figures.
    pub reference_bank: Decimal,
    /// Fraction of realized PnL distributed to investors.
    pub share_fraction: Decimal,
    /// Accounting start, for annualized estimates.
    pub start_at: DateTime<Utc>,
    pub now: DateTime<Utc>,
}

/// A roster mutation caused by the log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RosterChange {
    /// Pending deposit became the deposit; pending reset to zero.
    CommitPending { chat_id: ChatId, deposit: Decimal },
    /// Profit share credited to `bonus_accrued`.
    AccrueBonus { chat_id: ChatId, amount: Decimal },
}

/// Messages queued per recipient, in the order they were produced.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Outbox {
    messages: BTreeMap<ChatId, Vec<String>>,
}

impl Outbox {
    pub fn push(&mut self, chat_id: ChatId, text: String) {
        if text.trim().is_empty() {
            return;
        }
        self.messages.entry(chat_id).or_default().push(text);
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Number of distinct recipients.
    pub fn recipients(&self) -> usize {
        self.messages.len()
    }

    pub fn parts_for(&self, chat_id: ChatId) -> &[String] {
        self.messages
            .get(&chat_id)
            .map(|v| v.as_slice())
            .unwrap_or(&[])
    }

    /// One message per recipient, parts separated by a blank line.
    pub fn into_messages(self) -> Vec<(ChatId, String)> {
        self.messages
            .into_iter()
            .map(|(chat_id, parts)| (chat_id, parts.join("\n\n")))
            .collect()
    }
}

/// Summary of one close, kept for logging and the status API.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CloseSummary {
    pub row_number: u64,
    pub signal_id: String,
    pub pnl: Decimal,
    pub pool: Decimal,
    pub distributed: Decimal,
    pub recovered: bool,
}

/// Result of a replay run.
#[derive(Debug, Clone)]
pub struct ReplayOutcome {
    pub book: CohortBook,
    pub roster: BTreeMap<ChatId, Investor>,
    pub changes: Vec<RosterChange>,
    pub ledger: Vec<LedgerEntry>,
    pub outbox: Outbox,
    pub profit_total: Decimal,
    pub closes: Vec<CloseSummary>,
    pub rows_applied: usize,
}

pub struct Replayer {
    settings: ReplaySettings,
    roster: BTreeMap<ChatId, Investor>,
    book: CohortBook,
    profit_total: Decimal,
    changes: Vec<RosterChange>,
    ledger: Vec<LedgerEntry>,
    outbox: Outbox,
    closes: Vec<CloseSummary>,
    rows_applied: usize,
}

impl Replayer {
    pub fn new(
        settings: ReplaySettings,
        roster: Vec<Investor>,
        book: CohortBook,
        profit_total: Decimal,
    ) -> Self {
        Self {
            settings,
            roster: roster.into_iter().map(|inv| (inv.chat_id, inv)).collect(),
            book,
            profit_total,
            changes: Vec::new(),
            ledger: Vec::new(),
            outbox: Outbox::default(),
            closes: Vec::new(),
            rows_applied: 0,
        }
    }

    /// Apply one row. Rows must be fed in log order.
    pub fn apply(&mut self, row: &LogRow) {
        match &row.kind {
            EventKind::Open => self.handle_open(row),
            kind if kind.is_add() => self.handle_add(row),
            kind if kind.is_close() => self.handle_close(row),
            kind => {
                if !kind.as_str().is_empty() {
                    debug!(row = row.row_number, kind = %kind, "Skipping unknown event kind");
                }
                return;
            }
        }
        self.rows_applied += 1;
    }

    pub fn finish(self) -> ReplayOutcome {
        ReplayOutcome {
            book: self.book,
            roster: self.roster,
            changes: self.changes,
            ledger: self.ledger,
            outbox: self.outbox,
            profit_total: self.profit_total,
            closes: self.closes,
            rows_applied: self.rows_applied,
        }
    }

    fn used_pct(&self, cum_margin: Decimal) -> Decimal {
        cum_margin
            .checked_mul(Decimal::hundred())
            .and_then(|scaled| scaled.checked_div(self.settings.reference_bank))
            .unwrap_or_else(Decimal::zero)
    }

    fn handle_open(&mut self, row: &LogRow) {
        for inv in self.roster.values_mut() {
            if inv.active && inv.pending_deposit.is_positive() {
                let deposit = inv.pending_deposit;
                inv.deposit = deposit;
                inv.pending_deposit = Decimal::zero();
                inv.updated_at = self.settings.now;
                self.changes.push(RosterChange::CommitPending {
                    chat_id: inv.chat_id,
                    deposit,
                });
                self.ledger.push(LedgerEntry::new(
                    inv.chat_id,
                    inv.display_name(),
                    LedgerKind::DepositCommitted,
                    deposit,
                    format!("signal {}", row.signal_id),
                ));
            }
        }

        let position = OpenPosition::open(
            row.signal_id.clone(),
            row.cum_margin,
            row.row_number,
            self.roster.values(),
        );
        let text = notices::position_opened(self.used_pct(row.cum_margin), row.cum_margin);
        for chat_id in position.recipients() {
            self.outbox.push(chat_id, text.clone());
        }

        if let Some(previous) = self.book.insert(position) {
            warn!(
                signal_id = %row.signal_id,
                previous_row = previous.opened_row,
                row = row.row_number,
                "OPEN for a signal that is already open, replacing its cohort"
            );
        }
    }

    fn handle_add(&mut self, row: &LogRow) {
        if !self.book.contains(&row.signal_id) {
            warn!(
                signal_id = %row.signal_id,
                row = row.row_number,
                "No cohort for ADD, falling back to all active investors"
            );
            let recovered = OpenPosition::recovered(
                row.signal_id.clone(),
                row.cum_margin,
                row.row_number,
                self.roster.values(),
            );
            self.book.insert(recovered);
        }

        let recipients = match self.book.get_mut(&row.signal_id) {
            Some(position) => {
                position.cum_margin = row.cum_margin;
                position.recipients()
            }
            None => Vec::new(),
        };

        let text = notices::position_added(
            &row.base_asset(),
            self.used_pct(row.cum_margin),
            row.cum_margin,
        );
        for chat_id in recipients {
            self.outbox.push(chat_id, text.clone());
        }
    }

    fn handle_close(&mut self, row: &LogRow) {
        let position = match self.book.remove(&row.signal_id) {
            Some(position) => position,
            None => {
                warn!(
                    signal_id = %row.signal_id,
                    row = row.row_number,
                    kind = %row.kind,
                    "No cohort for close, falling back to all active investors"
                );
                OpenPosition::recovered(
                    row.signal_id.clone(),
                    row.cum_margin,
                    row.row_number,
                    self.roster.values(),
                )
            }
        };

        let margin = position.cum_margin;
        let pnl = row.pnl;
        let used_pct = self.used_pct(margin);
        let profit_pct = if margin.is_positive() {
            pnl.checked_mul(Decimal::hundred())
                .and_then(|scaled| scaled.checked_div(margin))
                .unwrap_or_else(Decimal::zero)
        } else {
            Decimal::zero()
        };
        let icon = tier_icon(pnl, profit_pct);

        let Some(pool) = pnl.checked_mul(self.settings.share_fraction) else {
            warn!(
                row = row.row_number,
                signal_id = %row.signal_id,
                pnl = %pnl,
                "Pool overflows, close ignored"
            );
            return;
        };
        self.profit_total = match self.profit_total.checked_add(pool) {
            Some(total) => total,
            None => {
                warn!(row = row.row_number, "Profit total overflows, keeping previous value");
                self.profit_total
            }
        };

        let mut distributed = Decimal::zero();
        for (chat_id, share) in position.split(pool) {
            let Some(inv) = self.roster.get_mut(&chat_id) else {
                warn!(
                    chat_id = %chat_id,
                    signal_id = %row.signal_id,
                    "Cohort member missing from roster, share not credited"
                );
                continue;
            };

            let Some(accrued) = inv.bonus_accrued.checked_add(share) else {
                warn!(chat_id = %chat_id, "Bonus total overflows, share not credited");
                continue;
            };
            inv.bonus_accrued = accrued;
            inv.updated_at = self.settings.now;
            distributed += share;
            self.changes.push(RosterChange::AccrueBonus {
                chat_id,
                amount: share,
            });
            if !share.is_zero() {
                self.ledger.push(LedgerEntry::new(
                    chat_id,
                    inv.display_name(),
                    LedgerKind::BonusAccrued,
                    share,
                    format!("signal {} {}", row.signal_id, row.kind),
                ));
            }

            let (annual_pct, annual_usd) = annual_forecast(
                inv.bonus_accrued,
                inv.deposit,
                self.settings.start_at,
                self.settings.now,
            );
            let text = notices::position_closed(&ClosedNotice {
                icon,
                used_pct,
                cum_margin: margin,
                pnl,
                profit_pct,
                share_pct: self.settings.share_fraction * Decimal::hundred(),
                share,
                bonus_total: inv.bonus_accrued,
                annual_pct,
                annual_usd,
            });
            self.outbox.push(chat_id, text);
        }

        self.closes.push(CloseSummary {
            row_number: row.row_number,
            signal_id: row.signal_id.to_string(),
            pnl,
            pool,
            distributed,
            recovered: position.recovered,
        });
    }
}

/// Replay `rows` in order and return the resulting state and effects.
pub fn replay(
    settings: ReplaySettings,
    roster: Vec<Investor>,
    book: CohortBook,
    profit_total: Decimal,
    rows: &[LogRow],
) -> ReplayOutcome {
    let mut replayer = Replayer::new(settings, roster, book, profit_total);
    for row in rows {
        replayer.apply(row);
    }
    replayer.finish()
}
