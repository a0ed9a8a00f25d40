use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

/// Query parameters accepted by the leaderboard endpoint.
#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct LeaderboardQuery {
    /// Number of rows to return (default 10, at most 100).
    pub limit: Option<usize>,
}

/// One ranked player.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct LeaderboardRow {
    /// 1-based rank.
    pub rank: usize,
    /// Platform user id as stored in the ledger.
    pub user_id: String,
    /// Last known display name, or a placeholder for users never seen.
    pub name: String,
    /// Number of passed quizzes.
    pub wins: u64,
}

#[derive(Debug, Serialize, ToSchema)]
/// Leaderboard sorted by wins, ties in first-win order.
pub struct LeaderboardResponse {
    /// Rows, best first.
    pub entries: Vec<LeaderboardRow>,
}
