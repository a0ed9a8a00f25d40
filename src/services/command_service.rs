//! Prefix command parsing and dispatch for inbound chat messages.

use time::{OffsetDateTime, macros::format_description};
use tracing::{debug, info};

use crate::{
    dto::bridge::InboundMessage,
    error::ServiceError,
    platform::{ChannelId, Embed, GuildId, OutboundMessage, colors},
    services::{
        adventure_service, ask_service, moderation_service, reactions, score_service,
        track_resolver,
    },
    state::{SharedState, playback::EnqueueOutcome},
};

/// Tracks listed by the `queue` command.
const QUEUE_LISTING_SIZE: usize = 10;

/// Commands understood after the prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// `quiz`: start the adventure.
    Quiz,
    /// `skor`: show the leaderboard.
    Score,
    /// `serverinfo`
    ServerInfo,
    /// `tanya`: ask the text generator.
    Ask,
    /// `join`
    Join,
    /// `play`
    Play,
    /// `skip`
    Skip,
    /// `pause`
    Pause,
    /// `resume`
    Resume,
    /// `stop`
    Stop,
    /// `queue`
    Queue,
    /// `kick`
    Kick,
    /// `ban`
    Ban,
    /// `move`
    Move,
}

impl Command {
    fn from_word(word: &str) -> Option<Self> {
        let command = match word {
            "quiz" => Command::Quiz,
            "skor" => Command::Score,
            "serverinfo" => Command::ServerInfo,
            "tanya" => Command::Ask,
            "join" => Command::Join,
            "play" => Command::Play,
            "skip" => Command::Skip,
            "pause" => Command::Pause,
            "resume" => Command::Resume,
            "stop" => Command::Stop,
            "queue" => Command::Queue,
            "kick" => Command::Kick,
            "ban" => Command::Ban,
            "move" => Command::Move,
            _ => return None,
        };
        Some(command)
    }
}

/// Split `content` into a command and its argument text.
pub fn parse<'a>(prefix: &str, content: &'a str) -> Option<(Command, &'a str)> {
    let rest = content.trim_start().strip_prefix(prefix)?;
    let (word, args) = match rest.split_once(char::is_whitespace) {
        Some((word, args)) => (word, args.trim()),
        None => (rest, ""),
    };
    Command::from_word(word).map(|command| (command, args))
}

/// Run the command carried by `message`, if any, reporting failures to its channel.
pub async fn handle_message(state: SharedState, message: InboundMessage) {
    for user in std::iter::once(&message.author).chain(&message.mentions) {
        state.directory().remember_user(user.id, user.shown_name());
    }

    let Some((command, args)) = parse(&state.config().command_prefix, &message.content) else {
        return;
    };
    info!(command = ?command, user = %message.author.id, channel = %message.channel, "command received");

    if let Err(err) = dispatch(&state, command, args, &message).await {
        reactions::report_error(&state, message.channel, &err).await;
    }
}

async fn dispatch(
    state: &SharedState,
    command: Command,
    args: &str,
    message: &InboundMessage,
) -> Result<(), ServiceError> {
    let channel = message.channel;
    match command {
        Command::Quiz => adventure_service::start(state, message.author.id, channel).await,
        Command::Score => score_service::post_leaderboard(state, channel).await,
        Command::ServerInfo => server_info(state, message).await,
        Command::Ask => ask_service::ask(state, channel, args).await,
        Command::Join => join(state, message).await,
        Command::Play => play(state, message, args).await,
        Command::Skip => {
            state.playback().skip(guild_of(message)?).await?;
            say(state, channel, "Skipped ⏭️").await
        }
        Command::Pause => {
            state.voice().pause(guild_of(message)?)?;
            say(state, channel, "Paused ⏸️").await
        }
        Command::Resume => {
            state.voice().resume(guild_of(message)?)?;
            say(state, channel, "Resumed ▶️").await
        }
        Command::Stop => {
            let dropped = state.playback().stop(guild_of(message)?).await?;
            say(
                state,
                channel,
                &format!("Stopped and cleared {dropped} queued track(s). Bye! 👋"),
            )
            .await
        }
        Command::Queue => show_queue(state, message).await,
        Command::Kick => moderation_service::kick(state, message, args).await,
        Command::Ban => moderation_service::ban(state, message, args).await,
        Command::Move => moderation_service::move_member(state, message, args).await,
    }
}

fn guild_of(message: &InboundMessage) -> Result<GuildId, ServiceError> {
    message
        .guild
        .ok_or_else(|| ServiceError::InvalidInput("This command only works in a server.".into()))
}

async fn say(state: &SharedState, channel: ChannelId, text: &str) -> Result<(), ServiceError> {
    state
        .chat()
        .send(channel, OutboundMessage::text(text))
        .await?;
    Ok(())
}

async fn server_info(state: &SharedState, message: &InboundMessage) -> Result<(), ServiceError> {
    let guild = guild_of(message)?;
    let snapshot = state
        .directory()
        .guild(guild)
        .ok_or_else(|| ServiceError::NotFound("I don't know this server yet.".into()))?;

    let created = OffsetDateTime::from_unix_timestamp(snapshot.created_at)
        .ok()
        .and_then(|at| {
            at.format(format_description!(
                "[day] [month repr:long] [year], [hour]:[minute]"
            ))
            .ok()
        })
        .unwrap_or_else(|| "unknown".to_string());

    let mut embed = Embed::new(
        format!("Server Info: {}", snapshot.name),
        "Here are the details of this server.",
        colors::BLUE,
    )
    .field("Server Name", snapshot.name.clone(), true)
    .field("Server ID", snapshot.id.to_string(), true)
    .field("Owner", snapshot.owner_id.mention(), false)
    .field("Members", snapshot.member_count.to_string(), true)
    .field(
        "Channels",
        (snapshot.text_channels + snapshot.voice_channels).to_string(),
        true,
    )
    .field("Created on", created, false);
    embed.thumbnail = snapshot.icon_url;
    embed.footer = Some(format!("Requested by: {}", message.author.name));

    state
        .chat()
        .send(message.channel, OutboundMessage::embed(embed))
        .await?;
    Ok(())
}

async fn join(state: &SharedState, message: &InboundMessage) -> Result<(), ServiceError> {
    let guild = guild_of(message)?;
    let target = message.voice_channel.ok_or_else(|| {
        ServiceError::InvalidInput("You need to be in a voice channel first!".into())
    })?;
    state.voice().connect(guild, target).await?;
    info!(guild = %guild, channel = %target, "joined voice channel");
    say(state, message.channel, &format!("Joined <#{target}> 🎧")).await
}

async fn play(
    state: &SharedState,
    message: &InboundMessage,
    query: &str,
) -> Result<(), ServiceError> {
    let guild = guild_of(message)?;
    if !state.voice().status(guild).is_connected() {
        let target = message.voice_channel.ok_or_else(|| {
            ServiceError::InvalidInput("You need to be in a voice channel first!".into())
        })?;
        state.voice().connect(guild, target).await?;
        debug!(guild = %guild, channel = %target, "joined voice channel for playback");
    }

    let track = track_resolver::resolve(state, query).await?;
    let title = track.title.clone();
    match state
        .playback()
        .enqueue(guild, message.channel, track)
        .await?
    {
        // The scheduler announces started tracks itself.
        EnqueueOutcome::Started => Ok(()),
        EnqueueOutcome::Queued { position } => {
            say(
                state,
                message.channel,
                &format!("Added to queue (#{position}): **{title}**"),
            )
            .await
        }
    }
}

async fn show_queue(state: &SharedState, message: &InboundMessage) -> Result<(), ServiceError> {
    let snapshot = state.playback().snapshot(guild_of(message)?).await?;
    if snapshot.pending.is_empty() {
        return say(state, message.channel, "The queue is empty.").await;
    }

    let mut listing: Vec<String> = snapshot
        .pending
        .iter()
        .take(QUEUE_LISTING_SIZE)
        .enumerate()
        .map(|(index, track)| format!("{}. {}", index + 1, track.title))
        .collect();
    if snapshot.pending.len() > QUEUE_LISTING_SIZE {
        listing.push(format!(
            "...and {} more",
            snapshot.pending.len() - QUEUE_LISTING_SIZE
        ));
    }

    state
        .chat()
        .send(
            message.channel,
            OutboundMessage::embed(Embed::new("Queue", listing.join("\n"), colors::BLUE)),
        )
        .await?;
    Ok(())
}
