use tracing::{info, warn};

use crate::{
    error::ServiceError,
    platform::{ChannelId, OutboundMessage},
    state::SharedState,
};

/// Longest message the platform accepts.
pub const MESSAGE_LIMIT: usize = 2000;
/// Size of the pieces a long answer is split into.
pub const CHUNK_SIZE: usize = 1990;

/// Split `text` into pieces of at most `size` characters, never inside a character.
pub fn chunk_text(text: &str, size: usize) -> Vec<String> {
    let chars: Vec<char> = text.chars().collect();
    chars
        .chunks(size.max(1))
        .map(|chunk| chunk.iter().collect())
        .collect()
}

/// Messages needed to post `answer` under `header`, none longer than [`MESSAGE_LIMIT`].
///
/// A header that is itself too long (a very long question) is chunked like the answer.
pub fn answer_messages(header: &str, answer: &str) -> Vec<String> {
    if header.chars().count() + answer.chars().count() <= MESSAGE_LIMIT {
        return vec![format!("{header}{answer}")];
    }
    let mut messages = chunk_text(header, CHUNK_SIZE);
    messages.extend(chunk_text(answer, CHUNK_SIZE));
    messages
}

/// Relay `question` to the text generator and post the answer.
///
/// Upstream failures are written into the "thinking" message rather than returned.
pub async fn ask(
    state: &SharedState,
    channel: ChannelId,
    question: &str,
) -> Result<(), ServiceError> {
    let question = question.trim();
    if question.is_empty() {
        return Err(ServiceError::InvalidInput(format!(
            "Usage: `{}tanya <question>`",
            state.config().command_prefix
        )));
    }
    let generator = state
        .text_generator()
        .ok_or(ServiceError::ServiceUnavailable("AI API key"))?;

    let thinking = state
        .chat()
        .send(channel, OutboundMessage::text("Hang on, I'm thinking..."))
        .await?;

    match generator.generate(question.to_string()).await {
        Ok(answer) => {
            state.chat().delete(channel, thinking).await?;
            let header = format!("**Your question:**\n> {question}\n\n**My answer:**\n");
            let messages = answer_messages(&header, &answer);
            info!(channel = %channel, parts = messages.len(), "answer relayed");
            for message in messages {
                state
                    .chat()
                    .send(channel, OutboundMessage::text(message))
                    .await?;
            }
        }
        Err(err) => {
            let err = ServiceError::from(err);
            warn!(channel = %channel, error = %err, "ask failed");
            state
                .chat()
                .edit(channel, thinking, OutboundMessage::text(err.user_message()))
                .await?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        clients::error::GenerationError,
        testing::{ScriptedGenerator, harness},
    };

    #[test]
    fn short_answers_fit_one_message() {
        assert_eq!(answer_messages("Q: ", "A"), ["Q: A"]);
    }

    #[test]
    fn long_answers_are_chunked_after_the_header() {
        let answer = "x".repeat(4000);
        let messages = answer_messages("header", &answer);
        assert_eq!(messages.len(), 4);
        assert_eq!(messages[0], "header");
        assert_eq!(messages[1].len(), CHUNK_SIZE);
        assert_eq!(messages[3].len(), 4000 - 2 * CHUNK_SIZE);
    }

    #[test]
    fn oversized_question_header_is_chunked_too() {
        let header = format!("**Your question:**\n> {}\n\n**My answer:**\n", "?".repeat(2500));
        let messages = answer_messages(&header, "short");
        assert!(messages.iter().all(|m| m.chars().count() <= MESSAGE_LIMIT));
        assert_eq!(messages.last().unwrap(), "short");
        assert_eq!(messages[..messages.len() - 1].concat(), header);
    }

    #[test]
    fn chunks_respect_character_boundaries() {
        let chunks = chunk_text("ééé", 2);
        assert_eq!(chunks, ["éé", "é"]);
    }

    #[tokio::test]
    async fn answer_replaces_thinking_message() {
        let h = harness()
            .generator(ScriptedGenerator::replying("Jakarta."))
            .build();

        ask(&h.state, ChannelId(3), "capital of Indonesia?")
            .await
            .unwrap();

        assert_eq!(h.chat.deleted.lock().unwrap().len(), 1);
        let texts = h.chat.texts();
        assert_eq!(
            texts.last().unwrap(),
            "**Your question:**\n> capital of Indonesia?\n\n**My answer:**\nJakarta."
        );
    }

    #[tokio::test]
    async fn upstream_error_is_written_into_thinking_message() {
        let h = harness()
            .generator(ScriptedGenerator::scripted(vec![Err(
                GenerationError::RequestStatus {
                    status: reqwest::StatusCode::BAD_REQUEST,
                    body: "bad key".into(),
                },
            )]))
            .build();

        ask(&h.state, ChannelId(3), "hello").await.unwrap();

        let edits = h.chat.edits.lock().unwrap();
        assert_eq!(edits.len(), 1);
        assert!(edits[0].1.content.as_deref().unwrap().contains("bad key"));
    }

    #[tokio::test]
    async fn missing_key_is_reported_before_posting() {
        let h = harness().build();
        let err = ask(&h.state, ChannelId(3), "hello").await.unwrap_err();
        assert!(matches!(err, ServiceError::ServiceUnavailable(_)));
        assert!(h.chat.texts().is_empty());
    }
}
