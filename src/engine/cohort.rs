use crate::domain::{ChatId, Decimal, Investor, SignalId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A cohort member and the deposit they held when the position opened.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CohortMember {
    pub chat_id: ChatId,
    pub entry_deposit: Decimal,
}

/// State of one open position.
///
/// Membership and entry deposits are fixed when the entry is created; only
/// `cum_margin` moves afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpenPosition {
    pub signal_id: SignalId,
    pub cum_margin: Decimal,
    /// Log row that created the entry.
    pub opened_row: u64,
    pub members: Vec<CohortMember>,
    /// True when the entry was rebuilt from the current roster because the
    /// OPEN row was never seen.
    pub recovered: bool,
}

impl OpenPosition {
    /// Snapshot active investors with a positive deposit.
    pub fn open<'a>(
        signal_id: SignalId,
        cum_margin: Decimal,
        opened_row: u64,
        roster: impl IntoIterator<Item = &'a Investor>,
    ) -> Self {
        let members = roster
            .into_iter()
            .filter(|inv| inv.is_participating())
            .map(|inv| CohortMember {
                chat_id: inv.chat_id,
                entry_deposit: inv.deposit,
            })
            .collect();
        Self {
            signal_id,
            cum_margin,
            opened_row,
            members,
            recovered: false,
        }
    }

    /// Approximate entry built from every currently active investor.
    pub fn recovered<'a>(
        signal_id: SignalId,
        cum_margin: Decimal,
        row: u64,
        roster: impl IntoIterator<Item = &'a Investor>,
    ) -> Self {
        let members = roster
            .into_iter()
            .filter(|inv| inv.active)
            .map(|inv| CohortMember {
                chat_id: inv.chat_id,
                entry_deposit: inv.deposit,
            })
            .collect();
        Self {
            signal_id,
            cum_margin,
            opened_row: row,
            members,
            recovered: true,
        }
    }

    pub fn total_entry_deposit(&self) -> Decimal {
        self.members.iter().map(|m| m.entry_deposit).sum()
    }

    pub fn recipients(&self) -> Vec<ChatId> {
        self.members.iter().map(|m| m.chat_id).collect()
    }

    pub fn entry_deposit_of(&self, chat_id: ChatId) -> Option<Decimal> {
        self.members
            .iter()
            .find(|m| m.chat_id == chat_id)
            .map(|m| m.entry_deposit)
    }

    /// Split `pool` across members by entry deposit.
    ///
    /// Every member gets zero when the cohort's total entry deposit is not
    /// positive.
    pub fn split(&self, pool: Decimal) -> Vec<(ChatId, Decimal)> {
        let total = self.total_entry_deposit();
        self.members
            .iter()
            .map(|m| {
                let share = if total.is_positive() {
                    pool.checked_mul(m.entry_deposit)
                        .and_then(|scaled| scaled.checked_div(total))
                        .or_else(|| {
                            m.entry_deposit
                                .checked_div(total)
                                .and_then(|weight| pool.checked_mul(weight))
                        })
                        .unwrap_or_else(Decimal::zero)
                } else {
                    Decimal::zero()
                };
                (m.chat_id, share)
            })
            .collect()
    }
}

/// Open positions keyed by signal id.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CohortBook {
    positions: BTreeMap<SignalId, OpenPosition>,
}

impl CohortBook {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_positions(positions: impl IntoIterator<Item = OpenPosition>) -> Self {
        Self {
            positions: positions
                .into_iter()
                .map(|p| (p.signal_id.clone(), p))
                .collect(),
        }
    }

    /// Insert a position, returning the entry it replaced.
    pub fn insert(&mut self, position: OpenPosition) -> Option<OpenPosition> {
        self.positions.insert(position.signal_id.clone(), position)
    }

    pub fn get(&self, signal_id: &SignalId) -> Option<&OpenPosition> {
        self.positions.get(signal_id)
    }

    pub fn get_mut(&mut self, signal_id: &SignalId) -> Option<&mut OpenPosition> {
        self.positions.get_mut(signal_id)
    }

    pub fn remove(&mut self, signal_id: &SignalId) -> Option<OpenPosition> {
        self.positions.remove(signal_id)
    }

    pub fn contains(&self, signal_id: &SignalId) -> bool {
        self.positions.contains_key(signal_id)
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &OpenPosition> {
        self.positions.values()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(s: &str) -> Decimal {
        Decimal::from_str_canonical(s).unwrap()
    }

    fn investor(id: i64, deposit: &str, active: bool) -> Investor {
        let mut inv = Investor::new(ChatId::new(id), format!("u{}", id));
        inv.deposit = d(deposit);
        inv.active = active;
        inv
    }

    #[test]
    fn test_open_snapshots_only_funded_active_investors() {
        let roster = vec![
            investor(1, "600", true),
            investor(2, "0", true),
            investor(3, "400", false),
        ];
        let pos = OpenPosition::open(SignalId::new("S1"), d("200"), 2, &roster);
        assert_eq!(pos.recipients(), vec![ChatId::new(1)]);
        assert!(!pos.recovered);
    }

    #[test]
    fn test_recovered_takes_all_active() {
        let roster = vec![
            investor(1, "600", true),
            investor(2, "0", true),
            investor(3, "400", false),
        ];
        let pos = OpenPosition::recovered(SignalId::new("S1"), d("200"), 9, &roster);
        assert_eq!(pos.recipients(), vec![ChatId::new(1), ChatId::new(2)]);
        assert!(pos.recovered);
    }

    #[test]
    fn test_split_by_entry_deposit() {
        let roster = vec![investor(1, "600", true), investor(2, "400", true)];
        let pos = OpenPosition::open(SignalId::new("S1"), d("200"), 2, &roster);
        let shares = pos.split(d("15"));
        assert_eq!(shares, vec![(ChatId::new(1), d("9")), (ChatId::new(2), d("6"))]);
    }

    #[test]
    fn test_split_with_zero_total_gives_zero_shares() {
        let roster = vec![investor(1, "0", true)];
        let pos = OpenPosition::recovered(SignalId::new("S1"), d("200"), 2, &roster);
        assert_eq!(pos.split(d("15")), vec![(ChatId::new(1), Decimal::zero())]);
    }

    #[test]
    fn test_book_insert_replace_remove() {
        let roster = vec![investor(1, "100", true)];
        let mut book = CohortBook::new();
        assert!(book
            .insert(OpenPosition::open(SignalId::new("S1"), d("1"), 2, &roster))
            .is_none());
        assert!(book
            .insert(OpenPosition::open(SignalId::new("S1"), d("2"), 3, &roster))
            .is_some());
        assert_eq!(book.len(), 1);
        assert_eq!(book.get(&SignalId::new("S1")).unwrap().cum_margin, d("2"));
        assert!(book.remove(&SignalId::new("S1")).is_some());
        assert!(book.is_empty());
    }
}
