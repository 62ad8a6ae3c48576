use serde::{Deserialize, Serialize};

use super::{CodeModel, ModelError};

const API_KEY_ENV: &str = "OPENAI_API_KEY";
const DEFAULT_API_BASE: &str = "https://api.openai.com/v1";

/// Chat-completions client. Works against any OpenAI-compatible endpoint;
/// the core does not depend on a particular model identity.
#[derive(Debug)]
pub struct OpenAiModel {
    client: reqwest::Client,
    api_base: String,
    api_key: String,
    model: String,
}

impl OpenAiModel {
    pub fn new(
        api_base: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_base: api_base.into(),
            api_key: api_key.into(),
            model: model.into(),
        }
    }

    /// Reads the credential from the environment; a missing key is the
    /// `UpstreamUnavailable` condition, surfaced before any request.
    pub fn from_env(model: impl Into<String>) -> Result<Self, ModelError> {
        let api_key = std::env::var(API_KEY_ENV).map_err(|_| ModelError::MissingCredential {
            env_var: API_KEY_ENV,
        })?;
        Ok(Self::new(DEFAULT_API_BASE, api_key, model))
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    messages: [ChatMessage<'a>; 2],
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Deserialize)]
struct ChatResponseMessage {
    content: Option<String>,
}

#[async_trait::async_trait]
impl CodeModel for OpenAiModel {
    async fn complete(
        &self,
        system_prompt: &str,
        user_prompt: &str,
        max_tokens: u32,
    ) -> Result<String, ModelError> {
        let body = ChatRequest {
            model: &self.model,
            max_tokens,
            messages: [
                ChatMessage {
                    role: "system",
                    content: system_prompt,
                },
                ChatMessage {
                    role: "user",
                    content: user_prompt,
                },
            ],
        };

        let response = self
            .client
            .post(format!("{}/chat/completions", self.api_base))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| ModelError::Transport { msg: e.to_string() })?;

        let status = response.status();
        if !status.is_success() {
            let msg = response.text().await.unwrap_or_default();
            return Err(ModelError::Api {
                status: status.as_u16(),
                msg,
            });
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| ModelError::Transport { msg: e.to_string() })?;
        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .filter(|content| !content.trim().is_empty())
            .ok_or(ModelError::EmptyCompletion)
    }
}
