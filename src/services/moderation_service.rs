use tracing::info;

use crate::{
    dto::bridge::{Author, InboundMessage},
    error::ServiceError,
    platform::{ChannelId, GuildId, ModerationAction, OutboundMessage},
    state::SharedState,
};

/// Permission bit for kicking members.
pub const KICK_MEMBERS: u64 = 1 << 1;
/// Permission bit for banning members.
pub const BAN_MEMBERS: u64 = 1 << 2;
/// Grants every permission.
pub const ADMINISTRATOR: u64 = 1 << 3;
/// Permission bit for moving members between voice channels.
pub const MOVE_MEMBERS: u64 = 1 << 24;

/// Whether `permissions` grants `required`, administrators being granted everything.
pub fn has_permission(permissions: u64, required: u64) -> bool {
    permissions & ADMINISTRATOR != 0 || permissions & required == required
}

/// `kick @user [reason]`.
pub async fn kick(
    state: &SharedState,
    message: &InboundMessage,
    args: &str,
) -> Result<(), ServiceError> {
    let (guild, target) = authorize(state, message, KICK_MEMBERS, "Kick Members", "kick", args)?;
    let reason = reason_from(args);
    state
        .chat()
        .moderate(ModerationAction::Kick {
            guild,
            user: target.id,
            reason: reason.clone(),
        })
        .await?;
    info!(guild = %guild, target = %target.id, by = %message.author.id, "member kicked");
    confirm(state, message.channel, format!("{} has been kicked.", target.shown_name()), reason)
        .await
}

/// `ban @user [reason]`.
pub async fn ban(
    state: &SharedState,
    message: &InboundMessage,
    args: &str,
) -> Result<(), ServiceError> {
    let (guild, target) = authorize(state, message, BAN_MEMBERS, "Ban Members", "ban", args)?;
    let reason = reason_from(args);
    state
        .chat()
        .moderate(ModerationAction::Ban {
            guild,
            user: target.id,
            reason: reason.clone(),
        })
        .await?;
    info!(guild = %guild, target = %target.id, by = %message.author.id, "member banned");
    confirm(state, message.channel, format!("{} has been banned.", target.shown_name()), reason)
        .await
}

/// `move @user <voice channel id>`; the channel may also be given as a `<#id>` mention.
pub async fn move_member(
    state: &SharedState,
    message: &InboundMessage,
    args: &str,
) -> Result<(), ServiceError> {
    let (guild, target) =
        authorize(state, message, MOVE_MEMBERS, "Move Members", "move", args)?;
    let channel = args
        .split_whitespace()
        .nth(1)
        .map(|raw| raw.trim_start_matches("<#").trim_end_matches('>'))
        .and_then(|raw| raw.parse::<ChannelId>().ok())
        .ok_or_else(|| usage(state, "move"))?;

    state
        .chat()
        .moderate(ModerationAction::Move {
            guild,
            user: target.id,
            channel,
        })
        .await?;
    info!(guild = %guild, target = %target.id, channel = %channel, "member moved");
    state
        .chat()
        .send(
            message.channel,
            OutboundMessage::text(format!(
                "{} has been moved to <#{channel}>.",
                target.shown_name()
            )),
        )
        .await?;
    Ok(())
}

fn authorize<'m>(
    state: &SharedState,
    message: &'m InboundMessage,
    required: u64,
    permission: &'static str,
    command: &str,
    args: &str,
) -> Result<(GuildId, &'m Author), ServiceError> {
    let guild = message
        .guild
        .ok_or_else(|| ServiceError::InvalidInput("This command only works in a server.".into()))?;
    if !has_permission(message.permissions, required) {
        return Err(ServiceError::PermissionDenied(permission));
    }
    if args.trim().is_empty() {
        return Err(usage(state, command));
    }
    let target = message.mentions.first().ok_or_else(|| usage(state, command))?;
    Ok((guild, target))
}

fn usage(state: &SharedState, command: &str) -> ServiceError {
    let prefix = &state.config().command_prefix;
    let hint = match command {
        "move" => "@user <voice channel id>",
        _ => "@user [reason]",
    };
    ServiceError::InvalidInput(format!("Usage: `{prefix}{command} {hint}`"))
}

/// Everything after the mention token.
fn reason_from(args: &str) -> Option<String> {
    let mut parts = args.trim().splitn(2, char::is_whitespace);
    parts.next();
    parts
        .next()
        .map(str::trim)
        .filter(|reason| !reason.is_empty())
        .map(str::to_string)
}

async fn confirm(
    state: &SharedState,
    channel: ChannelId,
    text: String,
    reason: Option<String>,
) -> Result<(), ServiceError> {
    let text = match reason {
        Some(reason) => format!("{text} Reason: {reason}"),
        None => text,
    };
    state
        .chat()
        .send(channel, OutboundMessage::text(text))
        .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{platform::UserId, testing::harness};

    fn author(id: u64, name: &str) -> Author {
        Author {
            id: UserId(id),
            name: name.into(),
            display_name: None,
        }
    }

    fn message(permissions: u64, mentions: Vec<Author>) -> InboundMessage {
        InboundMessage {
            guild: Some(GuildId(1)),
            channel: ChannelId(2),
            author: author(10, "mod"),
            content: String::new(),
            voice_channel: None,
            permissions,
            mentions,
        }
    }

    #[test]
    fn administrator_implies_everything() {
        assert!(has_permission(ADMINISTRATOR, BAN_MEMBERS));
        assert!(has_permission(KICK_MEMBERS | MOVE_MEMBERS, MOVE_MEMBERS));
        assert!(!has_permission(KICK_MEMBERS, BAN_MEMBERS));
    }

    #[test]
    fn reason_is_what_follows_the_mention() {
        assert_eq!(reason_from("<@5> spamming links").as_deref(), Some("spamming links"));
        assert_eq!(reason_from("<@5>"), None);
    }

    #[tokio::test]
    async fn kick_requires_permission() {
        let h = harness().build();
        let err = kick(&h.state, &message(0, vec![author(5, "spammer")]), "<@5>")
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::PermissionDenied("Kick Members")));
        assert!(h.chat.moderation.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn ban_forwards_reason() {
        let h = harness().build();
        ban(
            &h.state,
            &message(BAN_MEMBERS, vec![author(5, "spammer")]),
            "<@5> spam",
        )
        .await
        .unwrap();

        assert_eq!(
            *h.chat.moderation.lock().unwrap(),
            [ModerationAction::Ban {
                guild: GuildId(1),
                user: UserId(5),
                reason: Some("spam".into()),
            }]
        );
        assert_eq!(h.chat.texts(), ["spammer has been banned. Reason: spam"]);
    }

    #[tokio::test]
    async fn move_parses_channel_mentions() {
        let h = harness().build();
        move_member(
            &h.state,
            &message(ADMINISTRATOR, vec![author(5, "afk")]),
            "<@5> <#77>",
        )
        .await
        .unwrap();

        assert_eq!(
            *h.chat.moderation.lock().unwrap(),
            [ModerationAction::Move {
                guild: GuildId(1),
                user: UserId(5),
                channel: ChannelId(77),
            }]
        );
    }

    #[tokio::test]
    async fn missing_target_is_a_usage_error() {
        let h = harness().build();
        let err = kick(&h.state, &message(KICK_MEMBERS, vec![]), "")
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::InvalidInput(hint) if hint.contains("!kick @user")));
    }
}
