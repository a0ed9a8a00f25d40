use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::platform::UserId;

/// Win counter per user, in first-win order.
///
/// Serialized as a flat JSON object: `{"<user id>": <wins>, ...}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ScoreLedger {
    entries: IndexMap<String, u64>,
}

/// One leaderboard row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerEntry {
    /// Ledger key of the user.
    pub user_key: String,
    /// Passed quizzes.
    pub wins: u64,
}

impl ScoreLedger {
    /// Empty ledger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Absent users have zero wins.
    pub fn wins(&self, user: UserId) -> u64 {
        self.entries.get(&user.ledger_key()).copied().unwrap_or(0)
    }

    /// Add one win for `user`, returning the new total.
    pub fn record_win(&mut self, user: UserId) -> u64 {
        let wins = self.entries.entry(user.ledger_key()).or_insert(0);
        *wins += 1;
        *wins
    }

    /// Whether nobody has won yet.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of users with at least one win.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Highest win counts first; ties keep insertion order.
    pub fn top(&self, limit: usize) -> Vec<LedgerEntry> {
        let mut rows: Vec<LedgerEntry> = self
            .entries
            .iter()
            .map(|(user_key, wins)| LedgerEntry {
                user_key: user_key.clone(),
                wins: *wins,
            })
            .collect();
        // `sort_by` is stable, which keeps ties in insertion order.
        rows.sort_by(|a, b| b.wins.cmp(&a.wins));
        rows.truncate(limit);
        rows
    }
}

impl FromIterator<(String, u64)> for ScoreLedger {
    fn from_iter<I: IntoIterator<Item = (String, u64)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn leaderboard_sorts_descending_with_stable_ties() {
        let ledger: ScoreLedger = serde_json::from_str(r#"{"a":2,"b":5,"c":5}"#).unwrap();
        let order: Vec<_> = ledger.top(10).into_iter().map(|row| row.user_key).collect();
        assert_eq!(order, ["b", "c", "a"]);
    }

    #[test]
    fn leaderboard_is_truncated() {
        let ledger: ScoreLedger = (0..15u64).map(|i| (format!("u{i}"), i)).collect();
        let top = ledger.top(10);
        assert_eq!(top.len(), 10);
        assert_eq!(top[0].wins, 14);
        assert_eq!(top[9].wins, 5);
    }

    #[test]
    fn record_win_starts_from_zero() {
        let mut ledger = ScoreLedger::new();
        assert_eq!(ledger.wins(UserId(7)), 0);
        assert_eq!(ledger.record_win(UserId(7)), 1);
        assert_eq!(ledger.record_win(UserId(7)), 2);
        assert_eq!(
            serde_json::to_string(&ledger).unwrap(),
            r#"{"7":2}"#
        );
    }
}
