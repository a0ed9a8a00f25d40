//! The branching adventure: crossroads, forest and village, driven by button clicks.

use tracing::{debug, info, warn};

use crate::{
    dto::{
        bridge::ButtonClick,
        sse::{AdventureEndedEvent, AdventureEnding, ServerEvent},
    },
    error::ServiceError,
    platform::{
        Button, ButtonStyle, ChannelId, Embed, MessageRef, OutboundMessage, UserId, colors,
    },
    services::{quiz_service, reactions},
    state::{
        SharedState,
        adventure::{AdventureChoice, AdventureOutcome, AdventureStage, QuizLanguage},
        session::Session,
        views::ChoiceView,
    },
};

/// Start a new adventure for `user` and post the crossroads choice.
pub async fn start(
    state: &SharedState,
    user: UserId,
    channel: ChannelId,
) -> Result<(), ServiceError> {
    let stage = AdventureStage::Crossroads;
    state
        .sessions()
        .start(user, Session::Adventure(stage))?;
    info!(user = %user, "adventure started");

    let message = match state.chat().send(channel, stage_message(stage, user)).await {
        Ok(message) => message,
        Err(err) => {
            state.sessions().end(user);
            return Err(err.into());
        }
    };
    open_view(state, message, user, channel, stage);
    Ok(())
}

/// Apply a button press on an adventure message.
pub async fn handle_click(state: &SharedState, click: ButtonClick) -> Result<(), ServiceError> {
    let Ok(choice) = click.custom_id.parse::<AdventureChoice>() else {
        debug!(custom_id = %click.custom_id, "ignoring unknown button");
        return Ok(());
    };
    let user = click.user.id;

    let view = match state.views().claim(click.message_ref, user) {
        Ok(view) => view,
        Err(err) => {
            let err = ServiceError::from(err);
            debug!(user = %user, error = %err, "choice rejected");
            state
                .chat()
                .reply_ephemeral(click.interaction_id, err.user_message())
                .await?;
            return Ok(());
        }
    };

    let outcome = match view.stage.transition(choice) {
        Ok(outcome) => outcome,
        Err(err) => {
            warn!(user = %user, error = %err, "choice does not match the view");
            state
                .chat()
                .reply_ephemeral(
                    click.interaction_id,
                    ServiceError::ChoiceExpired.user_message(),
                )
                .await?;
            return Ok(());
        }
    };
    info!(user = %user, from = ?view.stage, choice = %choice, "adventure choice");

    match outcome {
        AdventureOutcome::Continue(next) => {
            if !state.sessions().advance_adventure(user, view.stage, next) {
                state
                    .chat()
                    .reply_ephemeral(
                        click.interaction_id,
                        ServiceError::ChoiceExpired.user_message(),
                    )
                    .await?;
                return Ok(());
            }
            state
                .chat()
                .edit(view.channel, click.message_ref, stage_message(next, user))
                .await?;
            open_view(state, click.message_ref, user, view.channel, next);
        }
        AdventureOutcome::Defeated | AdventureOutcome::Escaped => {
            state.sessions().end_if_at_stage(user, view.stage);
            let (ending, embed, gifs) = if outcome == AdventureOutcome::Defeated {
                (
                    AdventureEnding::Defeated,
                    Embed::new(
                        "UTTERLY DEFEATED!",
                        "You took on the bear with your bare hands. Of course it tore you \
                         to shreds. Your adventure ends tragically.",
                        colors::RED,
                    ),
                    &state.config().gifs.fight,
                )
            } else {
                (
                    AdventureEnding::Escaped,
                    Embed::new(
                        "SAFE!",
                        "You ran as fast as you could and got away from the bear. You're \
                         safe, but now you're lost deep in the forest. Your adventure ends here.",
                        colors::LIGHT_GREY,
                    ),
                    &state.config().gifs.flee,
                )
            };
            state
                .chat()
                .edit(view.channel, click.message_ref, OutboundMessage::embed(embed))
                .await?;
            reactions::post_random_gif(state, view.channel, gifs).await;
            broadcast_ending(state, user, ending);
        }
        AdventureOutcome::StartQuiz(language) => {
            state
                .chat()
                .edit(
                    view.channel,
                    click.message_ref,
                    OutboundMessage::text(format!(
                        "Okay, the old man is thinking up questions in {}... hang on.",
                        language.display_name()
                    )),
                )
                .await?;
            if let Err(err) = quiz_service::start_quiz(state, user, view.channel, language).await
            {
                reactions::report_error(state, view.channel, &err).await;
            }
        }
    }

    Ok(())
}

/// Register the choice view and schedule its expiry.
fn open_view(
    state: &SharedState,
    message: MessageRef,
    owner: UserId,
    channel: ChannelId,
    stage: AdventureStage,
) {
    state.views().register(
        message,
        ChoiceView {
            owner,
            channel,
            stage,
        },
    );

    let state = state.clone();
    let limit = state.config().choice_timeout;
    tokio::spawn(async move {
        tokio::time::sleep(limit).await;
        expire_view(&state, message, stage).await;
    });
}

/// Remove the buttons of an un-acted view and end the adventure if it is still waiting there.
async fn expire_view(state: &SharedState, message: MessageRef, stage: AdventureStage) {
    let Some(view) = state.views().expire(message, stage) else {
        return;
    };

    let mut frozen = stage_message(stage, view.owner);
    frozen.buttons.clear();
    if let Err(err) = state.chat().edit(view.channel, message, frozen).await {
        warn!(message = %message, error = %err, "failed to clear expired choice buttons");
    }

    if state.sessions().end_if_at_stage(view.owner, stage) {
        info!(user = %view.owner, stage = ?stage, "adventure abandoned");
        broadcast_ending(state, view.owner, AdventureEnding::Abandoned);
    }
}

fn broadcast_ending(state: &SharedState, user: UserId, ending: AdventureEnding) {
    if let Ok(event) = ServerEvent::json(
        Some("adventure_ended".to_string()),
        &AdventureEndedEvent { user, ending },
    ) {
        state.activity().broadcast(event);
    }
}

/// Embed and buttons shown while waiting at `stage`.
fn stage_message(stage: AdventureStage, owner: UserId) -> OutboundMessage {
    let embed = match stage {
        AdventureStage::Crossroads => Embed::new(
            "The Adventure Begins!",
            format!(
                "Hi {}, you got lost and now you're standing at a crossroads. \
                 Which way do you go?",
                owner.mention()
            ),
            colors::PURPLE,
        ),
        AdventureStage::Forest => Embed::new(
            "Into the Dark Forest",
            "You chose the forest. It's eerie and full of strange noises. Suddenly a huge, \
             angry bear bursts out of the bushes!",
            colors::DARK_GREEN,
        ),
        AdventureStage::Village => Embed::new(
            "Heading to the Village...",
            "You took the road to the village and met an old man. Before asking his \
             questions, he wants to know which language you'd like the quiz in.",
            colors::GOLD,
        ),
    };

    OutboundMessage::embed(embed).with_buttons(stage.choices().iter().map(button).collect())
}

fn button(choice: &AdventureChoice) -> Button {
    let (label, emoji, style) = match choice {
        AdventureChoice::EnterForest => ("Enter the Forest", "🌳", ButtonStyle::Danger),
        AdventureChoice::GoToVillage => ("Go to the Village", "🏘️", ButtonStyle::Success),
        AdventureChoice::FightBear => ("Fight the Bear", "⚔️", ButtonStyle::Primary),
        AdventureChoice::FleeBear => ("Run!", "🏃", ButtonStyle::Secondary),
        AdventureChoice::Language(QuizLanguage::Indonesian) => {
            ("Bahasa Indonesia", "🇮🇩", ButtonStyle::Primary)
        }
        AdventureChoice::Language(QuizLanguage::English) => {
            ("English", "🇬🇧", ButtonStyle::Secondary)
        }
    };
    Button::new(choice.custom_id(), label, style).with_emoji(emoji)
}
