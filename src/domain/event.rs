//! Rows of the trading system's append-only event log.

use crate::domain::{Decimal, SignalId};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind of a log row.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventKind {
    Open,
    Add,
    RetestAdd,
    TpHit,
    SlHit,
    ManualClose,
    /// Anything else the trading system writes; ignored by replay.
    Other(String),
}

impl EventKind {
    pub fn parse(raw: &str) -> Self {
        match raw.trim() {
            "OPEN" => EventKind::Open,
            "ADD" => EventKind::Add,
            "RETEST_ADD" => EventKind::RetestAdd,
            "TP_HIT" => EventKind::TpHit,
            "SL_HIT" => EventKind::SlHit,
            "MANUAL_CLOSE" => EventKind::ManualClose,
            other => EventKind::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            EventKind::Open => "OPEN",
            EventKind::Add => "ADD",
            EventKind::RetestAdd => "RETEST_ADD",
            EventKind::TpHit => "TP_HIT",
            EventKind::SlHit => "SL_HIT",
            EventKind::ManualClose => "MANUAL_CLOSE",
            EventKind::Other(s) => s.as_str(),
        }
    }

    pub fn is_add(&self) -> bool {
        matches!(self, EventKind::Add | EventKind::RetestAdd)
    }

    pub fn is_close(&self) -> bool {
        matches!(
            self,
            EventKind::TpHit | EventKind::SlHit | EventKind::ManualClose
        )
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One data row of the event log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogRow {
    /// 1-based sheet row number; the header is row 1, data starts at 2.
    pub row_number: u64,
    pub kind: EventKind,
    pub signal_id: SignalId,
    /// Margin committed to the position so far.
    pub cum_margin: Decimal,
    /// Realized PnL; only meaningful on close kinds.
    pub pnl: Decimal,
    /// Trading pair such as `EURC/USDT`, when the log carries one.
    pub pair: String,
}

impl LogRow {
    /// Stable digest of the row content, used to detect a rewritten log.
    ///
    /// Hex of the first 16 bytes of SHA-256 over length-prefixed fields.
    pub fn fingerprint(&self) -> String {
        use sha2::{Digest, Sha256};

        fn hash_var(hasher: &mut Sha256, data: &str) {
            hasher.update((data.len() as u32).to_le_bytes());
            hasher.update(data.as_bytes());
        }

        let mut hasher = Sha256::new();
        hasher.update(self.row_number.to_le_bytes());
        hash_var(&mut hasher, self.kind.as_str());
        hash_var(&mut hasher, self.signal_id.as_str());
        hash_var(&mut hasher, &self.cum_margin.to_canonical_string());
        hash_var(&mut hasher, &self.pnl.to_canonical_string());
        hash_var(&mut hasher, &self.pair);

        let hash = hasher.finalize();
        hex::encode(&hash[..16])
    }

    /// Base asset of the pair: `EURC/USDT` gives `EUR`, `BTC/USDT:USDT` gives `BTC`.
    ///
    /// A trailing `C` (stablecoin suffix) is dropped from bases longer than
    /// three letters.
    pub fn base_asset(&self) -> String {
        let base = self
            .pair
            .split('/')
            .next()
            .unwrap_or("")
            .split(':')
            .next()
            .unwrap_or("")
            .trim()
            .to_uppercase();
        if base.len() > 3 && base.ends_with('C') {
            base[..base.len() - 1].to_string()
        } else {
            base
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(pair: &str) -> LogRow {
        LogRow {
            row_number: 2,
            kind: EventKind::Open,
            signal_id: SignalId::new("S1"),
            cum_margin: Decimal::from_i64(200),
            pnl: Decimal::zero(),
            pair: pair.to_string(),
        }
    }

    #[test]
    fn test_event_kind_parse() {
        assert_eq!(EventKind::parse(" OPEN "), EventKind::Open);
        assert_eq!(EventKind::parse("RETEST_ADD"), EventKind::RetestAdd);
        assert_eq!(EventKind::parse("MANUAL_CLOSE"), EventKind::ManualClose);
        assert_eq!(
            EventKind::parse("HEARTBEAT"),
            EventKind::Other("HEARTBEAT".to_string())
        );
        assert!(EventKind::SlHit.is_close());
        assert!(EventKind::RetestAdd.is_add());
        assert!(!EventKind::Open.is_close());
    }

    #[test]
    fn test_base_asset() {
        assert_eq!(row("EURC/USDT").base_asset(), "EUR");
        assert_eq!(row("btc/usdt:usdt").base_asset(), "BTC");
        assert_eq!(row("ETH/USDC").base_asset(), "ETH");
        assert_eq!(row("").base_asset(), "");
    }

    #[test]
    fn test_fingerprint_tracks_content() {
        let a = row("EURC/USDT");
        let mut b = a.clone();
        assert_eq!(a.fingerprint(), b.fingerprint());
        b.cum_margin = Decimal::from_i64(300);
        assert_ne!(a.fingerprint(), b.fingerprint());
        assert_eq!(a.fingerprint().len(), 32);
    }
}
