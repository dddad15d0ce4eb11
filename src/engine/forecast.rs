use crate::domain::Decimal;
use chrono::{DateTime, Utc};

const SECONDS_PER_DAY: i64 = 86_400;

/// Indicative annualized return of `bonus` on `deposit` since `start`.
///
/// Returns `(percent_per_year, dollars_per_year)`. Elapsed time is floored at
/// one day; a non-positive deposit yields zeros.
pub fn annual_forecast(
    bonus: Decimal,
    deposit: Decimal,
    start: DateTime<Utc>,
    now: DateTime<Utc>,
) -> (Decimal, Decimal) {
    if !deposit.is_positive() {
        return (Decimal::zero(), Decimal::zero());
    }

    let elapsed = Decimal::from_i64((now - start).num_seconds())
        .checked_div(Decimal::from_i64(SECONDS_PER_DAY))
        .unwrap_or_else(Decimal::zero);
    let days = std::cmp::max(elapsed, Decimal::from_i64(1));

    let pct = bonus
        .checked_div(deposit)
        .and_then(|ratio| ratio.checked_mul(Decimal::from_i64(365)))
        .and_then(|scaled| scaled.checked_div(days))
        .and_then(|yearly| yearly.checked_mul(Decimal::hundred()))
        .unwrap_or_else(Decimal::zero);
    let usd = deposit
        .checked_mul(pct)
        .and_then(|scaled| scaled.checked_div(Decimal::hundred()))
        .unwrap_or_else(Decimal::zero);
    (pct, usd)
}

/// Icon for a closed trade, tiered by profit percent of margin.
pub fn tier_icon(pnl: Decimal, profit_pct: Decimal) -> &'static str {
    if pnl.is_negative() {
        return "🛑";
    }
    let at_least = |n: i64| profit_pct >= Decimal::from_i64(n);
    if at_least(90) {
        "🚀"
    } else if at_least(80) {
        "🛩️"
    } else if at_least(70) {
        "🏎️"
    } else if at_least(50) {
        "🏍️"
    } else {
        "✅"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn d(s: &str) -> Decimal {
        Decimal::from_str_canonical(s).unwrap()
    }

    #[test]
    fn test_forecast_over_full_year() {
        let start = Utc::now();
        let now = start + Duration::days(365);
        let (pct, usd) = annual_forecast(d("100"), d("1000"), start, now);
        assert_eq!(pct.to_fixed(4), "10.0000");
        assert_eq!(usd.to_fixed(2), "100.00");
    }

    #[test]
    fn test_forecast_floors_elapsed_at_one_day() {
        let start = Utc::now();
        let (pct, _) = annual_forecast(d("1"), d("365"), start, start);
        assert_eq!(pct.to_fixed(2), "100.00");
    }

    #[test]
    fn test_forecast_zero_deposit() {
        let start = Utc::now();
        let (pct, usd) = annual_forecast(d("50"), Decimal::zero(), start, start);
        assert!(pct.is_zero());
        assert!(usd.is_zero());
    }

    #[test]
    fn test_tier_icons() {
        assert_eq!(tier_icon(d("-1"), d("95")), "🛑");
        assert_eq!(tier_icon(d("1"), d("95")), "🚀");
        assert_eq!(tier_icon(d("1"), d("85")), "🛩️");
        assert_eq!(tier_icon(d("1"), d("75")), "🏎️");
        assert_eq!(tier_icon(d("1"), d("50")), "🏍️");
        assert_eq!(tier_icon(d("1"), d("25")), "✅");
        assert_eq!(tier_icon(Decimal::zero(), Decimal::zero()), "✅");
    }
}
