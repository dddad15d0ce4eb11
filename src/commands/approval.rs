//! Balance effects of approving an investor request.

use crate::domain::{Decimal, Investor, Request, RequestKind};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApprovalError {
    #[error("not enough available bonus: requested {requested}, available {available}")]
    InsufficientBonus {
        requested: Decimal,
        available: Decimal,
    },
    #[error("amount {0} is out of range")]
    AmountOutOfRange(Decimal),
}

/// Apply an approved request to the investor record.
///
/// Deposit top-ups only queue a new pending target; the deposit itself
/// changes at the next position open.
pub fn apply_request(investor: &mut Investor, request: &Request) -> Result<(), ApprovalError> {
    let amount = request.amount;
    if !amount.is_within_amount_bound() {
        return Err(ApprovalError::AmountOutOfRange(amount));
    }
    match request.kind {
        RequestKind::AddDeposit => {
            investor.pending_deposit = add(investor.deposit_base(), amount)?;
        }
        RequestKind::AddFromBonus => {
            ensure_available(investor, amount)?;
            let pending = add(investor.deposit_base(), amount)?;
            investor.bonus_to_deposit = add(investor.bonus_to_deposit, amount)?;
            investor.pending_deposit = pending;
        }
        RequestKind::WithdrawBonus => {
            ensure_available(investor, amount)?;
            investor.bonus_paid = add(investor.bonus_paid, amount)?;
        }
        RequestKind::WithdrawAll => {
            investor.bonus_paid = add(investor.bonus_paid, investor.available_bonus())?;
            investor.deposit = Decimal::zero();
            investor.pending_deposit = Decimal::zero();
            investor.active = false;
        }
    }
    investor.updated_at = chrono::Utc::now();
    Ok(())
}

fn add(balance: Decimal, amount: Decimal) -> Result<Decimal, ApprovalError> {
    balance
        .checked_add(amount)
        .filter(Decimal::is_within_amount_bound)
        .ok_or(ApprovalError::AmountOutOfRange(amount))
}

fn ensure_available(investor: &Investor, amount: Decimal) -> Result<(), ApprovalError> {
    let available = investor.available_bonus();
    if amount > available {
        return Err(ApprovalError::InsufficientBonus {
            requested: amount,
            available,
        });
    }
    Ok(())
}
