//! Reply texts (Telegram HTML).

use crate::domain::{ChatId, Decimal, Investor, Request, RequestKind};
use chrono::{DateTime, Utc};

pub const NOT_REGISTERED: &str = "You are not registered yet. Start with /start";
pub const NOT_ENOUGH_BONUS: &str = "Not enough available bonus.";
pub const INVALID_AMOUNT: &str = "Invalid amount.";
pub const AMOUNT_NOT_POSITIVE: &str = "Amount must be greater than zero.";
pub const WALLET_UPDATED: &str = "✅ Wallet updated.";
pub const EMPTY_ROSTER: &str = "The investor list is empty.";
pub const NO_OPEN_REQUESTS: &str = "No open requests.";

pub fn start(deposit_address: Option<&str>, deposit_network: &str) -> String {
    let transfer = match deposit_address {
        Some(address) => format!(
            "2) Transfer USDT to:\n   <code>{}</code>\n   (network <b>{}</b>).\n",
            address, deposit_network
        ),
        None => format!(
            "2) Transfer USDT to the address the administrator gives you (network <b>{}</b>).\n",
            deposit_network
        ),
    };
    format!(
        "👋 <b>Hello!</b>\n\n\
         <b>To get started:</b>\n\
         1) Set your name: <code>/myname First Last</code>\n\
         {}\
         3) Report the amount: <code>/add_deposit 500</code>\n\
         4) Wait for confirmation. The deposit becomes active with the next trade.\n\
         5) Check your status: <code>/balance</code>\n\n\
         <b>Also:</b>\n\
         • Top up from bonus: <code>/add_from_bonus 100</code>\n\
         • Withdraw bonus: <code>/withdraw_bonus 100</code> (or <code>all</code>)\n\
         • Withdraw the whole deposit: <code>/withdraw_all</code>\n\
         • Payout wallet: <code>/setwallet address TRC20</code> | view: <code>/wallet</code>",
        transfer
    )
}

pub const ABOUT: &str = "🤖 <b>About</b>\n\n\
    This bot follows an algorithmic strategy trading EUR against USD through stablecoins \
    (<b>EURC/USDT</b>). The algorithm manages entries, additions and exits, sends notifications \
    and keeps the books.\n\n\
    📈 <b>Income model</b>\n\
    Reports count profit of closed trades only; your part of it is your bonus. \
    It can be withdrawn (<code>/withdraw_bonus</code>) or reinvested (<code>/add_from_bonus</code>).\n\n\
    ⚠️ <b>Risk disclaimer</b>\n\
    Trading, including with leverage, is volatile and may lead to partial or total loss of funds. \
    Past results do not guarantee future returns. By using the bot you confirm that you understand \
    and accept these risks.";

pub const ADMIN_HELP: &str = "Admin commands:\n\
    /list - investors\n\
    /adduser &lt;chat_id&gt; &lt;name&gt; &lt;deposit&gt;\n\
    /setdep &lt;chat_id&gt; &lt;deposit&gt;   (pending, applied with the next trade)\n\
    /setname &lt;chat_id&gt; &lt;name&gt;\n\
    /remove &lt;chat_id&gt;\n\
    /requests - open requests\n\
    /approve &lt;request_id&gt;\n\
    /reject &lt;request_id&gt;";

pub fn usage(usage: &str) -> String {
    format!("Usage: <code>{}</code>", escape(usage))
}

pub fn name_saved(name: &str) -> String {
    format!("✅ Name saved: <b>{}</b>", escape(name))
}

pub fn wallet(investor: &Investor) -> String {
    let or_dash = |s: &str| {
        if s.is_empty() {
            "—".to_string()
        } else {
            escape(s)
        }
    };
    format!(
        "👛 <b>Payout wallet</b>\nAddress: <code>{}</code>\nNetwork: <b>{}</b>",
        or_dash(&investor.wallet),
        or_dash(&investor.network)
    )
}

pub fn request_filed(kind: RequestKind, id: i64) -> String {
    let what = match kind {
        RequestKind::AddDeposit => {
            "Deposit top-up request sent to the administrator. Once confirmed it becomes active with the next trade."
        }
        RequestKind::AddFromBonus => {
            "Request to top up from bonus sent to the administrator. It applies with the next trade."
        }
        RequestKind::WithdrawBonus => "Bonus withdrawal request sent to the administrator.",
        RequestKind::WithdrawAll => "Full withdrawal request sent to the administrator.",
    };
    format!("📝 {} (request #{})", what, id)
}

pub fn available_to_withdraw(available: Decimal) -> String {
    format!(
        "Available to withdraw: <b>${}</b>\n\
         Usage: <code>/withdraw_bonus 100</code> or <code>/withdraw_bonus all</code>",
        available.to_usd_string()
    )
}

/// Admin notification for a newly filed request.
pub fn admin_new_request(investor: &Investor, id: i64, kind: RequestKind, amount: Decimal) -> String {
    let title = match kind {
        RequestKind::AddDeposit => "Deposit top-up request",
        RequestKind::AddFromBonus => "Top-up from bonus request",
        RequestKind::WithdrawBonus => "Bonus withdrawal request",
        RequestKind::WithdrawAll => "Full withdrawal request",
    };
    let detail = if kind == RequestKind::WithdrawAll {
        format!(
            "Deposit: <b>${}</b>  |  Bonus: <b>${}</b>\nTotal: <b>${}</b>",
            investor.deposit.to_usd_string(),
            investor.available_bonus().to_usd_string(),
            amount.to_usd_string()
        )
    } else {
        format!("Amount: <b>${}</b>", amount.to_usd_string())
    };
    format!(
        "🆕 <b>{}</b> #{}\nID: <code>{}</code>\nName: <b>{}</b>\n{}\nStatus: <b>new</b>\n\
         <code>/approve {}</code>  |  <code>/reject {}</code>",
        title,
        id,
        investor.chat_id,
        escape(&investor.display_name()),
        detail,
        id,
        id
    )
}

pub struct BalanceView<'a> {
    pub investor: &'a Investor,
    pub indicative_share: Decimal,
    pub start_at: DateTime<Utc>,
}

pub fn balance(view: &BalanceView<'_>) -> String {
    let inv = view.investor;
    let pending = if inv.pending_deposit.is_positive() {
        format!(
            "Pending deposit (next trade): <b>${}</b>\n",
            inv.pending_deposit.to_usd_string()
        )
    } else {
        String::new()
    };
    format!(
        "🧰 <b>Balance</b>\n\n\
         Name: <b>{}</b>\n\
         Deposit: <b>${}</b>\n\
         {}\
         Bonus (accrued): <b>${}</b>\n\
         Available to withdraw: <b>${}</b>\n\
         Share of the overall model (indicative): <b>${}</b>\n\
         Accounting since: <code>{}</code>\n",
        escape(&inv.display_name()),
        inv.deposit.to_usd_string(),
        pending,
        inv.bonus_accrued.to_usd_string(),
        inv.available_bonus().to_usd_string(),
        view.indicative_share.to_usd_string(),
        view.start_at.format("%Y-%m-%d %H:%M:%S"),
    )
}

pub fn roster_line(inv: &Investor) -> String {
    let status = if inv.active { "✅ active" } else { "⛔️ disabled" };
    format!(
        "{}  {}  |  id={}  |  dep=${}  |  pend=${}  |  avail=${}",
        status,
        escape(&inv.display_name()),
        inv.chat_id,
        inv.deposit.to_usd_string(),
        inv.pending_deposit.to_usd_string(),
        inv.available_bonus().to_usd_string()
    )
}

pub fn request_line(request: &Request, name: Option<&str>) -> String {
    format!(
        "#{}  {}  |  {} (id={})  |  ${}  |  {}",
        request.id,
        request.kind,
        escape(name.unwrap_or("?")),
        request.chat_id,
        request.amount.to_usd_string(),
        request.created_at.format("%Y-%m-%d %H:%M")
    )
}

pub fn user_added(name: &str, chat_id: ChatId, deposit: Decimal) -> String {
    format!(
        "OK. {} (id={}) added, deposit ${}.",
        escape(name),
        chat_id,
        deposit.to_usd_string()
    )
}

pub fn welcome(name: &str, deposit: Decimal) -> String {
    format!(
        "👋 Welcome, <b>{}</b>! Your deposit: <b>${}</b>.",
        escape(name),
        deposit.to_usd_string()
    )
}

pub fn pending_set(chat_id: ChatId, amount: Decimal) -> String {
    format!(
        "Pending deposit for id={} set to ${}.\nIt applies with the next trade.",
        chat_id,
        amount.to_usd_string()
    )
}

pub fn unknown_investor(chat_id: ChatId) -> String {
    format!("Unknown investor id={}.", chat_id)
}

pub const NAME_UPDATED: &str = "OK. Name updated.";
pub const USER_REMOVED: &str = "OK. Investor deactivated.";
pub const EMPTY_NAME: &str = "Empty name.";

pub fn unknown_request(id: i64) -> String {
    format!("Request #{} not found.", id)
}

pub fn request_already_resolved(id: i64) -> String {
    format!("Request #{} is already resolved.", id)
}

pub fn request_cannot_apply(id: i64, reason: &str) -> String {
    format!("Request #{} cannot be approved: {}", id, reason)
}

pub fn request_resolved_admin(request: &Request, approved: bool) -> String {
    format!(
        "Request #{} ({}, ${}) {}.",
        request.id,
        request.kind,
        request.amount.to_usd_string(),
        if approved { "approved" } else { "rejected" }
    )
}

pub fn request_resolved_investor(request: &Request, approved: bool) -> String {
    if approved {
        let effect = match request.kind {
            RequestKind::AddDeposit | RequestKind::AddFromBonus => {
                " The new deposit becomes active with the next trade."
            }
            RequestKind::WithdrawBonus | RequestKind::WithdrawAll => {
                " The payout will be sent to your wallet."
            }
        };
        format!(
            "✅ Your request #{} (${}) was approved.{}",
            request.id,
            request.amount.to_usd_string(),
            effect
        )
    } else {
        format!(
            "❌ Your request #{} (${}) was rejected.",
            request.id,
            request.amount.to_usd_string()
        )
    }
}

/// Escape text for Telegram HTML.
pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '&' => out.push_str("&amp;"),
            other => out.push(other),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape() {
        assert_eq!(escape("A & <B>"), "A &amp; &lt;B&gt;");
        assert_eq!(
            usage("/remove <chat_id>"),
            "Usage: <code>/remove &lt;chat_id&gt;</code>"
        );
        assert!(!ADMIN_HELP.contains('<'));
    }

    #[test]
    fn test_start_mentions_configured_address() {
        let text = start(Some("TADDR"), "TRON / TRC-20");
        assert!(text.contains("<code>TADDR</code>"));
        assert!(text.contains("TRON / TRC-20"));
        assert!(!start(None, "TRC-20").contains("<code>TADDR</code>"));
    }

    #[test]
    fn test_wallet_placeholders() {
        let inv = Investor::new(ChatId::new(1), "A");
        assert!(wallet(&inv).contains("<code>—</code>"));
    }

    #[test]
    fn test_balance_hides_zero_pending() {
        let mut inv = Investor::new(ChatId::new(1), "A");
        inv.deposit = Decimal::from_i64(600);
        let view = BalanceView {
            investor: &inv,
            indicative_share: Decimal::from_i64(9),
            start_at: Utc::now(),
        };
        let text = balance(&view);
        assert!(text.contains("Deposit: <b>$600.00</b>"));
        assert!(!text.contains("Pending"));

        inv.pending_deposit = Decimal::from_i64(700);
        let view = BalanceView {
            investor: &inv,
            indicative_share: Decimal::zero(),
            start_at: Utc::now(),
        };
        assert!(balance(&view).contains("$700.00"));
    }
}
