use std::sync::Arc;

use futures::future::BoxFuture;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{TextGenerator, error::GenerationError};

/// Public Gemini API root.
pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
/// Model used when none is configured.
pub const DEFAULT_MODEL: &str = "gemini-2.5-flash-preview-05-20";

/// Connection settings for the Gemini `generateContent` endpoint.
#[derive(Debug, Clone)]
pub struct GeminiConfig {
    /// API key sent as a query parameter.
    pub api_key: String,
    /// Model name.
    pub model: String,
    /// API root, overridable for tests.
    pub base_url: String,
}

impl GeminiConfig {
    /// Default model and endpoint.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: DEFAULT_MODEL.into(),
            base_url: DEFAULT_BASE_URL.into(),
        }
    }

    /// Use `model` instead of the default.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }
}

/// [`TextGenerator`] backed by Gemini.
#[derive(Clone)]
pub struct GeminiClient {
    client: Client,
    endpoint: Arc<str>,
    api_key: Arc<str>,
}

impl GeminiClient {
    /// Client posting to `config`'s endpoint.
    pub fn new(client: Client, config: GeminiConfig) -> Self {
        let endpoint = format!(
            "{}/models/{}:generateContent",
            config.base_url.trim_end_matches('/'),
            config.model
        );
        Self {
            client,
            endpoint: Arc::from(endpoint),
            api_key: Arc::from(config.api_key),
        }
    }

    async fn request(&self, prompt: String) -> Result<String, GenerationError> {
        let body = GenerateRequest {
            contents: vec![Content {
                parts: vec![Part { text: prompt }],
            }],
        };

        let response = self
            .client
            .post(self.endpoint.as_ref())
            .query(&[("key", self.api_key.as_ref())])
            .json(&body)
            .send()
            .await
            .map_err(|source| GenerationError::RequestSend { source })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            debug!(%status, "text generation request rejected");
            return Err(GenerationError::RequestStatus { status, body });
        }

        let payload = response
            .json::<GenerateResponse>()
            .await
            .map_err(|source| GenerationError::DecodeResponse { source })?;
        payload.first_text().ok_or(GenerationError::EmptyResponse)
    }
}

impl TextGenerator for GeminiClient {
    fn generate(&self, prompt: String) -> BoxFuture<'static, Result<String, GenerationError>> {
        let client = self.clone();
        Box::pin(async move { client.request(prompt).await })
    }
}

#[derive(Debug, Serialize)]
struct GenerateRequest {
    contents: Vec<Content>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Part {
    #[serde(default)]
    text: String,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<Content>,
}

impl GenerateResponse {
    /// `candidates[0].content.parts[0].text`
    fn first_text(self) -> Option<String> {
        self.candidates
            .into_iter()
            .next()?
            .content?
            .parts
            .into_iter()
            .next()
            .map(|part| part.text)
    }
}
