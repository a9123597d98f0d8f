//! Client for OpenAI-compatible chat-completion endpoints.
//!
//! Covers the Hugging Face router, OpenAI itself and self-hosted servers that
//! expose `POST {base}/chat/completions`.

use crate::backend::{
    LlmBackend, LlmBackendConfig, LlmMessage, LlmProvider, LlmRequest, LlmResponse, TokenUsage,
};
use crate::error::LlmError;
use async_trait::async_trait;
use reqwest::StatusCode;
use reqwest::header::RETRY_AFTER;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, instrument, warn};

/// Chat-completion backend over HTTP.
#[derive(Debug, Clone)]
pub struct OpenAiCompatBackend {
    client: reqwest::Client,
    config: LlmBackendConfig,
    url: String,
}

impl OpenAiCompatBackend {
    /// Builds a client whose requests give up after `request_timeout`.
    ///
    /// # Errors
    ///
    /// Returns [`LlmError::InvalidConfig`] if the base URL is not http(s) or
    /// the HTTP client cannot be built.
    pub fn new(config: LlmBackendConfig, request_timeout: Duration) -> Result<Self, LlmError> {
        let endpoint = config.endpoint();
        if !(endpoint.starts_with("http://") || endpoint.starts_with("https://")) {
            return Err(LlmError::InvalidConfig {
                reason: format!("base URL must be http(s): {endpoint}"),
            });
        }
        if config.model.trim().is_empty() {
            return Err(LlmError::InvalidConfig {
                reason: "model must not be empty".to_string(),
            });
        }

        let client = reqwest::Client::builder()
            .timeout(request_timeout)
            .build()
            .map_err(|e| LlmError::InvalidConfig {
                reason: e.to_string(),
            })?;

        if config.api_key.as_deref().is_none_or(|key| key.trim().is_empty()) {
            warn!(
                provider = %config.provider,
                "no API key configured; requests will be sent unauthenticated"
            );
        }

        Ok(Self {
            url: format!("{endpoint}/chat/completions"),
            client,
            config,
        })
    }

    fn body<'a>(&'a self, request: &LlmRequest, messages: &'a [LlmMessage]) -> ChatBody<'a> {
        ChatBody {
            model: &self.config.model,
            messages,
            max_tokens: request.max_tokens,
            temperature: request.temperature,
        }
    }
}

#[async_trait]
impl LlmBackend for OpenAiCompatBackend {
    #[instrument(skip_all, fields(provider = %self.config.provider, model = %self.config.model))]
    async fn generate(&self, request: &LlmRequest) -> Result<LlmResponse, LlmError> {
        let messages = request.to_messages();
        let mut builder = self
            .client
            .post(&self.url)
            .json(&self.body(request, &messages));
        if let Some(key) = self.config.api_key.as_deref().filter(|k| !k.trim().is_empty()) {
            builder = builder.bearer_auth(key);
        }

        let response = builder.send().await.map_err(|e| self.transport_error(&e))?;
        let status = response.status();

        if status == StatusCode::TOO_MANY_REQUESTS {
            let retry_after_secs = response
                .headers()
                .get(RETRY_AFTER)
                .and_then(|value| value.to_str().ok())
                .and_then(|value| value.trim().parse().ok());
            return Err(LlmError::RateLimited { retry_after_secs });
        }
        if status.is_server_error() {
            return Err(LlmError::ProviderUnavailable {
                provider: self.config.provider.to_string(),
                reason: format!("HTTP {status}"),
            });
        }
        if !status.is_success() {
            let text = response
                .text()
                .await
                .unwrap_or_else(|_| "unknown error".to_string());
            return Err(LlmError::RequestFailed {
                reason: format!("HTTP {status}: {}", truncate(&text, 200)),
            });
        }

        let data: ChatCompletion = response.json().await.map_err(|e| {
            if e.is_timeout() {
                LlmError::Timeout
            } else {
                LlmError::ResponseParseFailed {
                    reason: e.to_string(),
                }
            }
        })?;

        let choice = data
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| LlmError::ResponseParseFailed {
                reason: "no choices in response".to_string(),
            })?;
        let usage = data.usage.unwrap_or_default();

        debug!(
            input_tokens = usage.prompt_tokens,
            output_tokens = usage.completion_tokens,
            "chat completion returned"
        );

        Ok(LlmResponse {
            content: choice.message.content.unwrap_or_default(),
            usage: TokenUsage {
                input_tokens: usage.prompt_tokens,
                output_tokens: usage.completion_tokens,
            },
            model: data.model.unwrap_or_else(|| self.config.model.clone()),
        })
    }

    fn provider(&self) -> LlmProvider {
        self.config.provider
    }

    fn model(&self) -> &str {
        &self.config.model
    }
}

impl OpenAiCompatBackend {
    fn transport_error(&self, err: &reqwest::Error) -> LlmError {
        if err.is_timeout() {
            LlmError::Timeout
        } else if err.is_connect() {
            LlmError::ProviderUnavailable {
                provider: self.config.provider.to_string(),
                reason: err.to_string(),
            }
        } else {
            LlmError::RequestFailed {
                reason: err.to_string(),
            }
        }
    }
}

fn truncate(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((index, _)) => &text[..index],
        None => text,
    }
}

#[derive(Serialize)]
struct ChatBody<'a> {
    model: &'a str,
    messages: &'a [LlmMessage],
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

#[derive(Deserialize)]
struct ChatCompletion {
    #[serde(default)]
    choices: Vec<ChatChoice>,
    #[serde(default)]
    usage: Option<ChatUsage>,
    #[serde(default)]
    model: Option<String>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Deserialize)]
struct ChatMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Deserialize, Default)]
struct ChatUsage {
    #[serde(default)]
    prompt_tokens: u32,
    #[serde(default)]
    completion_tokens: u32,
}
