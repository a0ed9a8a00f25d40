//! Quiz generation and the ask, wait, grade loop.

use tracing::{info, warn};

use crate::{
    dto::sse::{QuizFinishedEvent, ServerEvent},
    error::ServiceError,
    platform::{ChannelId, Embed, OutboundMessage, UserId, colors},
    services::{reactions, score_service},
    state::{
        SharedState,
        adventure::{AdventureStage, QuizLanguage},
        quiz::{QuizOutcome, QuizQuestion, QuizSession, QuizStep},
    },
};

/// Prompt asking the generator for `count` short general-knowledge questions.
pub fn build_prompt(language: QuizLanguage, count: usize) -> String {
    format!(
        "Create {count} short general knowledge questions from the categories \
         (Geography, History, Science, Technology and Literature) in {language}. \
         Keep the answers short as well (one or two words). \
         The output must be a JSON array of objects, where every object has the key 'q' \
         for the question and 'a' for the answer. \
         Answers must be all lowercase. Example: [{{\"q\": \"Capital of France?\", \"a\": \"paris\"}}]",
        language = language.display_name(),
    )
}

/// Parse generator output into questions, tolerating markdown code fences around the JSON.
pub fn parse_questions(raw: &str) -> Result<Vec<QuizQuestion>, ServiceError> {
    let cleaned = raw.trim().replace("```json", "").replace("```", "");
    serde_json::from_str(cleaned.trim()).map_err(|err| ServiceError::MalformedOutput(err.to_string()))
}

/// Ask the text generator for a fresh question set.
pub async fn generate_questions(
    state: &SharedState,
    language: QuizLanguage,
) -> Result<Vec<QuizQuestion>, ServiceError> {
    let generator = state
        .text_generator()
        .ok_or(ServiceError::ServiceUnavailable("question generator API key"))?;
    let prompt = build_prompt(language, state.config().question_count);
    let raw = generator.generate(prompt).await?;
    parse_questions(&raw)
}

/// Replace the user's village-stage adventure with a generated quiz and run it to the end.
///
/// Generation failures end the adventure and are returned to the caller untouched; the
/// session is never left half-created.
pub async fn start_quiz(
    state: &SharedState,
    user: UserId,
    channel: ChannelId,
    language: QuizLanguage,
) -> Result<Option<QuizOutcome>, ServiceError> {
    let questions = match generate_questions(state, language).await {
        Ok(questions) => questions,
        Err(err) => {
            state
                .sessions()
                .end_if_at_stage(user, AdventureStage::Village);
            return Err(err);
        }
    };

    info!(user = %user, questions = questions.len(), language = language.display_name(), "quiz started");
    let total = questions.len();
    state.sessions().begin_quiz(
        user,
        QuizSession::with_passing_score(questions, state.config().passing_score),
    );

    state
        .chat()
        .send(
            channel,
            OutboundMessage::embed(Embed::new(
                "The Old Man's Quiz Begins!",
                format!("Answer the {total} questions below as fast as you can!"),
                colors::GOLD,
            )),
        )
        .await?;

    run_quiz(state, user, channel).await
}

/// Ask every remaining question in order.
///
/// An unanswered question ends the session with [`ServiceError::Timeout`]; `None` means the
/// session vanished underneath the loop.
pub async fn run_quiz(
    state: &SharedState,
    user: UserId,
    channel: ChannelId,
) -> Result<Option<QuizOutcome>, ServiceError> {
    let limit = state.config().answer_timeout;

    loop {
        let Some(step) = state.sessions().quiz_step(user) else {
            return Ok(None);
        };

        let (number, prompt) = match step {
            QuizStep::Ask { number, prompt } => (number, prompt),
            QuizStep::Finished(outcome) => {
                finish_quiz(state, user, channel, outcome).await?;
                return Ok(Some(outcome));
            }
        };

        state
            .chat()
            .send(
                channel,
                OutboundMessage::embed(Embed::new(
                    format!("Question #{number}"),
                    prompt,
                    colors::ORANGE,
                )),
            )
            .await?;

        let Some(reply) = state.replies().wait_for(user, channel, limit).await else {
            state.sessions().end(user);
            info!(user = %user, question = number, "quiz abandoned after timeout");
            return Err(ServiceError::Timeout);
        };

        let Some(grade) = state.sessions().answer_quiz(user, &reply) else {
            return Ok(None);
        };
        let feedback = if grade.correct {
            "Correct answer! 🎉".to_string()
        } else {
            format!("Wrong! The right answer was: **{}**", grade.expected)
        };
        state
            .chat()
            .send(channel, OutboundMessage::text(feedback))
            .await?;
    }
}

async fn finish_quiz(
    state: &SharedState,
    user: UserId,
    channel: ChannelId,
    outcome: QuizOutcome,
) -> Result<(), ServiceError> {
    let recorded = if outcome.passed {
        score_service::record_win(state, user).await.map(Some)
    } else {
        Ok(None)
    };
    state.sessions().end(user);
    info!(user = %user, score = outcome.score, total = outcome.total, passed = outcome.passed, "quiz finished");

    if let Ok(event) = ServerEvent::json(
        Some("quiz_finished".to_string()),
        &QuizFinishedEvent {
            user,
            score: outcome.score,
            total: outcome.total,
            passed: outcome.passed,
        },
    ) {
        state.activity().broadcast(event);
    }

    if let Err(err) = recorded {
        warn!(user = %user, error = %err, "failed to record quiz win");
        return Err(err);
    }

    let gifs = &state.config().gifs;
    let (embed, gifs) = if outcome.passed {
        (
            Embed::new(
                "Quiz Over! You Win!",
                format!(
                    "Nice! You got {} out of {} questions right.\n**Your score went up by 1!**",
                    outcome.score, outcome.total
                ),
                colors::GREEN,
            ),
            &gifs.win,
        )
    } else {
        (
            Embed::new(
                "Quiz Over! You Lose!",
                format!(
                    "Aw, you only got {} out of {} right. Better luck next time!",
                    outcome.score, outcome.total
                ),
                colors::DARK_RED,
            ),
            &gifs.fail,
        )
    };

    state
        .chat()
        .send(channel, OutboundMessage::embed(embed))
        .await?;
    reactions::post_random_gif(state, channel, gifs).await;
    Ok(())
}
