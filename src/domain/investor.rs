//! Investor roster record.

use crate::domain::{ChatId, Decimal};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One investor in the roster.
///
/// Records are never deleted; `active = false` takes an investor out of new
/// cohorts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Investor {
    pub chat_id: ChatId,
    pub name: String,
    /// Capital committed to trading.
    pub deposit: Decimal,
    /// Target deposit that replaces `deposit` on the next OPEN. Zero when
    /// nothing is queued.
    pub pending_deposit: Decimal,
    /// Lifetime profit share credited.
    pub bonus_accrued: Decimal,
    /// Profit share already paid out.
    pub bonus_paid: Decimal,
    /// Profit share converted into deposit.
    pub bonus_to_deposit: Decimal,
    pub wallet: String,
    pub network: String,
    pub active: bool,
    pub updated_at: DateTime<Utc>,
}

impl Investor {
    /// A fresh active record with zero balances.
    pub fn new(chat_id: ChatId, name: impl Into<String>) -> Self {
        Self {
            chat_id,
            name: name.into(),
            deposit: Decimal::zero(),
            pending_deposit: Decimal::zero(),
            bonus_accrued: Decimal::zero(),
            bonus_paid: Decimal::zero(),
            bonus_to_deposit: Decimal::zero(),
            wallet: String::new(),
            network: String::new(),
            active: true,
            updated_at: Utc::now(),
        }
    }

    /// `max(0, accrued - paid - reinvested)`.
    pub fn available_bonus(&self) -> Decimal {
        (self.bonus_accrued - self.bonus_paid - self.bonus_to_deposit).clamp_non_negative()
    }

    /// Name for messages; falls back to the chat id.
    pub fn display_name(&self) -> String {
        if self.name.trim().is_empty() {
            self.chat_id.to_string()
        } else {
            self.name.clone()
        }
    }

    /// The deposit figure a new top-up builds on: the queued target if any,
    /// otherwise the committed deposit.
    pub fn deposit_base(&self) -> Decimal {
        if self.pending_deposit.is_positive() {
            self.pending_deposit
        } else {
            self.deposit
        }
    }

    /// Whether this investor joins the cohort of a position opened now.
    pub fn is_participating(&self) -> bool {
        self.active && self.deposit.is_positive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(s: &str) -> Decimal {
        Decimal::from_str_canonical(s).unwrap()
    }

    #[test]
    fn test_available_bonus_never_negative() {
        let mut inv = Investor::new(ChatId::new(1), "A");
        inv.bonus_accrued = d("10");
        inv.bonus_paid = d("8");
        inv.bonus_to_deposit = d("5");
        assert_eq!(inv.available_bonus(), Decimal::zero());

        inv.bonus_paid = d("2");
        inv.bonus_to_deposit = d("3");
        assert_eq!(inv.available_bonus(), d("5"));
    }

    #[test]
    fn test_display_name_falls_back_to_chat_id() {
        let inv = Investor::new(ChatId::new(77), "  ");
        assert_eq!(inv.display_name(), "77");
    }

    #[test]
    fn test_deposit_base_prefers_pending() {
        let mut inv = Investor::new(ChatId::new(1), "A");
        inv.deposit = d("100");
        assert_eq!(inv.deposit_base(), d("100"));
        inv.pending_deposit = d("250");
        assert_eq!(inv.deposit_base(), d("250"));
    }

    #[test]
    fn test_participation_requires_active_and_deposit() {
        let mut inv = Investor::new(ChatId::new(1), "A");
        assert!(!inv.is_participating());
        inv.deposit = d("1");
        assert!(inv.is_participating());
        inv.active = false;
        assert!(!inv.is_participating());
    }
}
