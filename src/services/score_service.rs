use tracing::info;

use crate::{
    dto::scores::LeaderboardRow,
    error::ServiceError,
    platform::{ChannelId, Embed, OutboundMessage, UserId, colors},
    state::SharedState,
};

/// Rows shown by the chat leaderboard.
pub const CHAT_LEADERBOARD_SIZE: usize = 10;

/// Load the ledger and rank its top `limit` players, resolving names from the directory.
pub async fn leaderboard(state: &SharedState, limit: usize) -> Vec<LeaderboardRow> {
    let ledger = state.scores().load().await;
    ledger
        .top(limit)
        .into_iter()
        .enumerate()
        .map(|(index, entry)| {
            let name = entry
                .user_key
                .parse::<UserId>()
                .ok()
                .and_then(|user| state.directory().user_name(user))
                .unwrap_or_else(|| format!("Mysterious player (ID: {})", entry.user_key));
            LeaderboardRow {
                rank: index + 1,
                user_id: entry.user_key,
                name,
                wins: entry.wins,
            }
        })
        .collect()
}

/// Add a win for `user`: reload, increment and rewrite the ledger under the process-wide gate.
pub async fn record_win(state: &SharedState, user: UserId) -> Result<u64, ServiceError> {
    let _gate = state.ledger_gate().lock().await;
    let mut ledger = state.scores().load().await;
    let wins = ledger.record_win(user);
    state.scores().save(ledger).await?;
    info!(user = %user, wins, "quiz win recorded");
    Ok(wins)
}

/// Post the top players to `channel`.
pub async fn post_leaderboard(state: &SharedState, channel: ChannelId) -> Result<(), ServiceError> {
    let rows = leaderboard(state, CHAT_LEADERBOARD_SIZE).await;
    if rows.is_empty() {
        state
            .chat()
            .send(
                channel,
                OutboundMessage::text("Nobody has a score yet. Go play a round!"),
            )
            .await?;
        return Ok(());
    }

    let embed = rows.iter().fold(
        Embed::new(
            "🏆 Top Quiz Players 🏆",
            "Here are the quiz champions of the server!",
            colors::GOLD,
        ),
        |embed, row| {
            embed.field(
                format!("#{} - {}", row.rank, row.name),
                format!("**{}** wins", row.wins),
                false,
            )
        },
    );
    state
        .chat()
        .send(channel, OutboundMessage::embed(embed))
        .await?;
    Ok(())
}
