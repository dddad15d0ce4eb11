//! Notification texts produced by replay (Telegram HTML).

use crate::domain::Decimal;

pub fn position_opened(used_pct: Decimal, cum_margin: Decimal) -> String {
    format!(
        "📊 Position opened. {}% of the bank in use (<b>${}</b>).",
        used_pct.to_fixed(1),
        cum_margin.to_usd_string()
    )
}

pub fn position_added(base_asset: &str, used_pct: Decimal, cum_margin: Decimal) -> String {
    let asset = if base_asset.is_empty() {
        String::new()
    } else {
        format!(" on {}", base_asset)
    };
    format!(
        "➕ Added to position{}. Now {}% of the bank in the trade (<b>${}</b>).",
        asset,
        used_pct.to_fixed(1),
        cum_margin.to_usd_string()
    )
}

pub struct ClosedNotice {
    pub icon: &'static str,
    pub used_pct: Decimal,
    pub cum_margin: Decimal,
    pub pnl: Decimal,
    pub profit_pct: Decimal,
    pub share_pct: Decimal,
    pub share: Decimal,
    pub bonus_total: Decimal,
    pub annual_pct: Decimal,
    pub annual_usd: Decimal,
}

pub fn position_closed(n: &ClosedNotice) -> String {
    format!(
        "{} Position closed. {}% of the bank was used (<b>${}</b>). \
         P&L: <b>${}</b> ({}%).\n\
         Your share ({}% model): <b>${}</b>, accrued in total: <b>${}</b> \
         | indicative yearly: ~{}% (≈${}/year).",
        n.icon,
        n.used_pct.to_fixed(1),
        n.cum_margin.to_usd_string(),
        n.pnl.to_usd_string(),
        n.profit_pct.to_signed_fixed(2),
        n.share_pct.to_fixed(0),
        n.share.to_usd_string(),
        n.bonus_total.to_usd_string(),
        n.annual_pct.to_fixed(1),
        n.annual_usd.to_usd_string(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(s: &str) -> Decimal {
        Decimal::from_str_canonical(s).unwrap()
    }

    #[test]
    fn test_opened_text() {
        assert_eq!(
            position_opened(d("20"), d("200")),
            "📊 Position opened. 20.0% of the bank in use (<b>$200.00</b>)."
        );
    }

    #[test]
    fn test_added_text_names_asset() {
        let text = position_added("EUR", d("35"), d("350"));
        assert!(text.contains("on EUR"));
        assert!(text.contains("35.0%"));
        assert!(!position_added("", d("35"), d("350")).contains(" on "));
    }
}
