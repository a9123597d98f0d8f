//! The honeypot reply agent.
//!
//! Wraps one [`LlmBackend`] call per inbound message. The call runs under a
//! deadline and every failure mode maps to an in-character fallback line, so
//! [`HoneypotAgent::reply`] always yields non-empty text and never errors.

use crate::backend::{LlmBackend, LlmRequest};
use crate::error::LlmError;
use crate::prompt::PromptTemplate;
use scambait_core::InvocationId;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{Instant, timeout};
use tracing::{debug, warn};

/// Default deadline for one completion call.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(25);
/// Default generation budget.
pub const DEFAULT_MAX_TOKENS: u32 = 100;
/// Default sampling temperature.
pub const DEFAULT_TEMPERATURE: f32 = 0.8;
/// Reply used when the completion call misses its deadline.
pub const DEFAULT_TIMEOUT_FALLBACK: &str =
    "Oh dear, I'm a bit confused right now. Can you explain that again slowly?";
/// Reply used when the completion call fails or returns nothing.
pub const DEFAULT_ERROR_FALLBACK: &str =
    "Sorry dear, my phone is acting up again. What was it you wanted me to do?";

const EMPTY_CONTEXT: &str = "(no previous messages)";

/// Agent tuning.
#[derive(Debug, Clone, PartialEq)]
pub struct AgentConfig {
    /// Deadline for one completion call, measured around the backend call.
    pub timeout: Duration,
    /// Generation budget passed to the backend.
    pub max_tokens: u32,
    /// Sampling temperature passed to the backend.
    pub temperature: f32,
    /// Reply when the deadline passes or the backend reports a timeout.
    pub timeout_fallback: String,
    /// Reply when the backend fails or produces blank text.
    pub error_fallback: String,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
            max_tokens: DEFAULT_MAX_TOKENS,
            temperature: DEFAULT_TEMPERATURE,
            timeout_fallback: DEFAULT_TIMEOUT_FALLBACK.to_string(),
            error_fallback: DEFAULT_ERROR_FALLBACK.to_string(),
        }
    }
}

impl AgentConfig {
    /// Sets the completion deadline.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    // A blank fallback would break the non-empty reply guarantee.
    fn normalized(mut self) -> Self {
        if self.timeout_fallback.trim().is_empty() {
            self.timeout_fallback = DEFAULT_TIMEOUT_FALLBACK.to_string();
        }
        if self.error_fallback.trim().is_empty() {
            self.error_fallback = DEFAULT_ERROR_FALLBACK.to_string();
        }
        self
    }
}

/// Why a fallback line was used instead of generated text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FallbackReason {
    /// The deadline passed, or the backend itself timed out.
    Timeout,
    /// The backend returned an error.
    BackendError,
    /// The backend answered with nothing usable after cleanup.
    EmptyResponse,
}

impl FallbackReason {
    /// Stable label used in logs; matches the serialized form.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Timeout => "timeout",
            Self::BackendError => "backend_error",
            Self::EmptyResponse => "empty_response",
        }
    }
}

/// Where a reply came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ReplySource {
    /// Cleaned backend output.
    Generated,
    /// A configured fallback line.
    Fallback { reason: FallbackReason },
}

/// The agent's reply to one message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplyOutcome {
    /// Reply text; never empty.
    pub text: String,
    /// Whether the text was generated or a fallback.
    pub source: ReplySource,
    /// Wall time spent waiting on the backend.
    pub latency_ms: u64,
}

impl ReplyOutcome {
    /// True when the text is a fallback line.
    #[must_use]
    pub fn is_fallback(&self) -> bool {
        matches!(self.source, ReplySource::Fallback { .. })
    }

    /// Consumes the outcome, keeping only the reply text.
    #[must_use]
    pub fn into_text(self) -> String {
        self.text
    }
}

/// Generates persona replies through an injected backend.
#[derive(Clone)]
pub struct HoneypotAgent {
    backend: Arc<dyn LlmBackend>,
    config: AgentConfig,
    template: PromptTemplate,
}

impl std::fmt::Debug for HoneypotAgent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HoneypotAgent")
            .field("provider", &self.backend.provider())
            .field("model", &self.backend.model())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl HoneypotAgent {
    /// Creates an agent using the built-in persona.
    #[must_use]
    pub fn new(backend: Arc<dyn LlmBackend>, config: AgentConfig) -> Self {
        Self {
            backend,
            config: config.normalized(),
            template: PromptTemplate::honeypot_persona(),
        }
    }

    /// Builds the completion request for `latest` given the rendered
    /// conversation `context`.
    #[must_use]
    pub fn build_request(&self, context: &str, latest: &str) -> LlmRequest {
        let context = if context.trim().is_empty() {
            EMPTY_CONTEXT
        } else {
            context
        };
        let variables = HashMap::from([("context", context), ("message", latest)]);

        let mut request = LlmRequest::new(self.template.render(&variables))
            .with_temperature(self.config.temperature)
            .with_max_tokens(self.config.max_tokens);
        if let Some(system) = self.template.render_system_prompt(&variables) {
            request = request.with_system(system);
        }
        request
    }

    /// Produces a reply to `latest`. Never fails and never returns empty text.
    pub async fn reply(&self, context: &str, latest: &str) -> ReplyOutcome {
        let invocation = InvocationId::new();
        let request = self.build_request(context, latest);

        let started = Instant::now();
        let result = timeout(self.config.timeout, self.backend.generate(&request)).await;
        let latency_ms = saturating_millis(started.elapsed());

        match result {
            Ok(Ok(response)) => match clean_reply(&response.content) {
                Some(text) => {
                    debug!(
                        %invocation,
                        latency_ms,
                        tokens = response.usage.total(),
                        "generated reply"
                    );
                    ReplyOutcome {
                        text,
                        source: ReplySource::Generated,
                        latency_ms,
                    }
                }
                None => {
                    warn!(%invocation, latency_ms, "backend returned a blank reply");
                    self.fallback(FallbackReason::EmptyResponse, latency_ms)
                }
            },
            Ok(Err(LlmError::Timeout)) | Err(_) => {
                warn!(
                    %invocation,
                    latency_ms,
                    timeout_ms = saturating_millis(self.config.timeout),
                    "reply generation timed out"
                );
                self.fallback(FallbackReason::Timeout, latency_ms)
            }
            Ok(Err(err)) => {
                warn!(%invocation, latency_ms, kind = err.kind(), error = %err, "reply generation failed");
                self.fallback(FallbackReason::BackendError, latency_ms)
            }
        }
    }

    fn fallback(&self, reason: FallbackReason, latency_ms: u64) -> ReplyOutcome {
        debug!(reason = reason.as_str(), "using fallback reply");
        let text = match reason {
            FallbackReason::Timeout => &self.config.timeout_fallback,
            FallbackReason::BackendError | FallbackReason::EmptyResponse => {
                &self.config.error_fallback
            }
        };
        ReplyOutcome {
            text: text.trim().to_string(),
            source: ReplySource::Fallback { reason },
            latency_ms,
        }
    }
}

fn saturating_millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

/// Trims whitespace and one layer of wrapping quotes.
fn clean_reply(raw: &str) -> Option<String> {
    let mut text = raw.trim();
    for (open, close) in [('"', '"'), ('\'', '\''), ('“', '”')] {
        if text.len() > 1 && text.starts_with(open) && text.ends_with(close) {
            text = text[open.len_utf8()..text.len() - close.len_utf8()].trim();
            break;
        }
    }
    (!text.is_empty()).then(|| text.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{LlmProvider, LlmResponse, MessageRole, TokenUsage};
    use async_trait::async_trait;
    use std::sync::Mutex;

    enum Script {
        Reply(&'static str),
        Fail(LlmError),
        Hang,
    }

    struct ScriptedBackend {
        script: Script,
        requests: Mutex<Vec<LlmRequest>>,
    }

    impl ScriptedBackend {
        fn new(script: Script) -> Arc<Self> {
            Arc::new(Self {
                script,
                requests: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl LlmBackend for ScriptedBackend {
        async fn generate(&self, request: &LlmRequest) -> Result<LlmResponse, LlmError> {
            self.requests.lock().expect("lock").push(request.clone());
            match &self.script {
                Script::Reply(text) => Ok(LlmResponse {
                    content: (*text).to_string(),
                    usage: TokenUsage::default(),
                    model: "scripted".to_string(),
                }),
                Script::Fail(err) => Err(err.clone()),
                Script::Hang => std::future::pending().await,
            }
        }

        fn provider(&self) -> LlmProvider {
            LlmProvider::OpenAiCompatible
        }

        fn model(&self) -> &str {
            "scripted"
        }
    }

    fn agent(backend: Arc<ScriptedBackend>) -> HoneypotAgent {
        HoneypotAgent::new(backend, AgentConfig::default())
    }

    #[tokio::test]
    async fn generated_reply_is_cleaned() {
        let backend = ScriptedBackend::new(Script::Reply("  \"Oh my, which bank is that dear?\"\n"));
        let outcome = agent(backend).reply("", "your account is blocked").await;

        assert_eq!(outcome.text, "Oh my, which bank is that dear?");
        assert_eq!(outcome.source, ReplySource::Generated);
        assert!(!outcome.is_fallback());
    }

    #[tokio::test]
    async fn request_carries_persona_and_context() {
        let backend = ScriptedBackend::new(Script::Reply("Which parcel?"));
        let agent = agent(Arc::clone(&backend));
        agent
            .reply("scammer: hello\nagent: hi dear", "pay the customs fee")
            .await;

        let requests = backend.requests.lock().expect("lock");
        let request = &requests[0];
        assert_eq!(request.max_tokens, Some(DEFAULT_MAX_TOKENS));
        assert_eq!(request.temperature, Some(DEFAULT_TEMPERATURE));

        let messages = request.to_messages();
        assert_eq!(messages[0].role, MessageRole::System);
        assert!(messages[0].content.contains("gullible"));
        assert_eq!(messages[1].role, MessageRole::User);
        assert!(messages[1].content.contains("agent: hi dear"));
        assert!(messages[1].content.contains("pay the customs fee"));
    }

    #[test]
    fn empty_context_gets_placeholder() {
        let agent = agent(ScriptedBackend::new(Script::Reply("ok")));
        let request = agent.build_request("  ", "hello");
        assert!(request.messages[0].content.contains(EMPTY_CONTEXT));
    }

    #[tokio::test(start_paused = true)]
    async fn slow_backend_falls_back_at_the_deadline() {
        let agent = agent(ScriptedBackend::new(Script::Hang));
        let outcome = agent.reply("", "send OTP now").await;

        assert_eq!(outcome.text, DEFAULT_TIMEOUT_FALLBACK);
        assert_eq!(
            outcome.source,
            ReplySource::Fallback {
                reason: FallbackReason::Timeout
            }
        );
        assert!(outcome.latency_ms >= 25_000);
        assert!(outcome.latency_ms <= 25_100);
    }

    #[tokio::test]
    async fn backend_timeout_error_uses_timeout_fallback() {
        let agent = agent(ScriptedBackend::new(Script::Fail(LlmError::Timeout)));
        let outcome = agent.reply("", "hello").await;
        assert_eq!(outcome.text, DEFAULT_TIMEOUT_FALLBACK);
    }

    #[tokio::test]
    async fn backend_error_falls_back() {
        let agent = agent(ScriptedBackend::new(Script::Fail(LlmError::ProviderUnavailable {
            provider: "hugging_face".to_string(),
            reason: "HTTP 503".to_string(),
        })));
        let outcome = agent.reply("", "hello").await;

        assert_eq!(outcome.text, DEFAULT_ERROR_FALLBACK);
        assert_eq!(
            outcome.source,
            ReplySource::Fallback {
                reason: FallbackReason::BackendError
            }
        );
    }

    #[tokio::test]
    async fn blank_output_falls_back() {
        for blank in ["", "   ", "\"\"", "\" \""] {
            let agent = agent(ScriptedBackend::new(Script::Reply(blank)));
            let outcome = agent.reply("", "hello").await;
            assert!(!outcome.text.is_empty());
            assert_eq!(
                outcome.source,
                ReplySource::Fallback {
                    reason: FallbackReason::EmptyResponse
                }
            );
        }
    }

    #[tokio::test]
    async fn blank_configured_fallbacks_are_replaced() {
        let config = AgentConfig {
            timeout_fallback: " ".to_string(),
            error_fallback: String::new(),
            ..AgentConfig::default()
        };
        let backend = ScriptedBackend::new(Script::Fail(LlmError::RequestFailed {
            reason: "HTTP 400".to_string(),
        }));
        let outcome = HoneypotAgent::new(backend, config).reply("", "hi").await;
        assert_eq!(outcome.text, DEFAULT_ERROR_FALLBACK);
    }

    #[test]
    fn clean_reply_strips_one_layer_of_quotes() {
        assert_eq!(clean_reply("'hello'"), Some("hello".to_string()));
        assert_eq!(clean_reply("“hi there”"), Some("hi there".to_string()));
        assert_eq!(clean_reply("\"a\" and \"b\""), Some("a\" and \"b".to_string()));
        assert_eq!(clean_reply("\""), Some("\"".to_string()));
        assert_eq!(clean_reply("  "), None);
    }

    #[tokio::test(start_paused = true)]
    async fn oversized_deadline_still_generates() {
        let config = AgentConfig::default().with_timeout(Duration::MAX);
        let agent = HoneypotAgent::new(ScriptedBackend::new(Script::Reply("Who is this?")), config);
        let outcome = agent.reply("", "hello").await;
        assert_eq!(outcome.text, "Who is this?");
    }

    #[test]
    fn millis_saturate_for_huge_durations() {
        assert_eq!(saturating_millis(Duration::from_millis(1_500)), 1_500);
        assert_eq!(saturating_millis(Duration::MAX), u64::MAX);
    }

    #[test]
    fn fallback_labels_match_wire_names() {
        for reason in [
            FallbackReason::Timeout,
            FallbackReason::BackendError,
            FallbackReason::EmptyResponse,
        ] {
            let json = serde_json::to_string(&reason).expect("serialize");
            assert_eq!(json, format!("\"{}\"", reason.as_str()));
        }
    }

    #[test]
    fn reply_source_serde() {
        let json = serde_json::to_string(&ReplySource::Fallback {
            reason: FallbackReason::Timeout,
        })
        .expect("serialize");
        assert_eq!(json, r#"{"kind":"fallback","reason":"timeout"}"#);
    }
}
