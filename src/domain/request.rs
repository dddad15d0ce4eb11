//! Investor requests awaiting admin approval, and the audit ledger.

use crate::domain::{ChatId, Decimal};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestKind {
    AddDeposit,
    AddFromBonus,
    WithdrawBonus,
    WithdrawAll,
}

impl RequestKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RequestKind::AddDeposit => "add_deposit",
            RequestKind::AddFromBonus => "add_from_bonus",
            RequestKind::WithdrawBonus => "withdraw_bonus",
            RequestKind::WithdrawAll => "withdraw_all",
        }
    }
}

impl fmt::Display for RequestKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RequestKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "add_deposit" => Ok(RequestKind::AddDeposit),
            "add_from_bonus" => Ok(RequestKind::AddFromBonus),
            "withdraw_bonus" => Ok(RequestKind::WithdrawBonus),
            "withdraw_all" => Ok(RequestKind::WithdrawAll),
            other => Err(format!("unknown request kind: {}", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestStatus {
    New,
    Approved,
    Rejected,
}

impl RequestStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RequestStatus::New => "new",
            RequestStatus::Approved => "approved",
            RequestStatus::Rejected => "rejected",
        }
    }
}

impl FromStr for RequestStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "new" => Ok(RequestStatus::New),
            "approved" => Ok(RequestStatus::Approved),
            "rejected" => Ok(RequestStatus::Rejected),
            other => Err(format!("unknown request status: {}", other)),
        }
    }
}

/// A money movement an investor asked for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Request {
    pub id: i64,
    pub chat_id: ChatId,
    pub kind: RequestKind,
    pub amount: Decimal,
    pub status: RequestStatus,
    pub created_at: DateTime<Utc>,
    pub resolved_at: Option<DateTime<Utc>>,
}

/// Ledger entry types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LedgerKind {
    RequestAddDeposit,
    RequestAddFromBonus,
    RequestWithdrawBonus,
    RequestWithdrawAll,
    RequestApproved,
    RequestRejected,
    DepositCommitted,
    BonusAccrued,
}

impl LedgerKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            LedgerKind::RequestAddDeposit => "REQUEST_ADD_DEPOSIT",
            LedgerKind::RequestAddFromBonus => "REQUEST_ADD_FROM_BONUS",
            LedgerKind::RequestWithdrawBonus => "REQUEST_WITHDRAW_BONUS",
            LedgerKind::RequestWithdrawAll => "REQUEST_WITHDRAW_ALL",
            LedgerKind::RequestApproved => "REQUEST_APPROVED",
            LedgerKind::RequestRejected => "REQUEST_REJECTED",
            LedgerKind::DepositCommitted => "DEPOSIT_COMMITTED",
            LedgerKind::BonusAccrued => "BONUS_ACCRUED",
        }
    }

    pub fn for_request(kind: RequestKind) -> Self {
        match kind {
            RequestKind::AddDeposit => LedgerKind::RequestAddDeposit,
            RequestKind::AddFromBonus => LedgerKind::RequestAddFromBonus,
            RequestKind::WithdrawBonus => LedgerKind::RequestWithdrawBonus,
            RequestKind::WithdrawAll => LedgerKind::RequestWithdrawAll,
        }
    }
}

/// Append-only audit row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LedgerEntry {
    pub at: DateTime<Utc>,
    pub chat_id: ChatId,
    pub name: String,
    pub kind: LedgerKind,
    pub amount: Decimal,
    pub note: String,
}

impl LedgerEntry {
    pub fn new(
        chat_id: ChatId,
        name: impl Into<String>,
        kind: LedgerKind,
        amount: Decimal,
        note: impl Into<String>,
    ) -> Self {
        Self {
            at: Utc::now(),
            chat_id,
            name: name.into(),
            kind,
            amount,
            note: note.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_kind_roundtrip_strings() {
        for kind in [
            RequestKind::AddDeposit,
            RequestKind::AddFromBonus,
            RequestKind::WithdrawBonus,
            RequestKind::WithdrawAll,
        ] {
            assert_eq!(kind.as_str().parse::<RequestKind>().unwrap(), kind);
        }
        assert!("nope".parse::<RequestKind>().is_err());
    }

    #[test]
    fn test_request_status_parse() {
        assert_eq!("new".parse::<RequestStatus>().unwrap(), RequestStatus::New);
        assert!("pending".parse::<RequestStatus>().is_err());
    }

    #[test]
    fn test_ledger_kind_for_request() {
        assert_eq!(
            LedgerKind::for_request(RequestKind::WithdrawAll).as_str(),
            "REQUEST_WITHDRAW_ALL"
        );
    }
}
