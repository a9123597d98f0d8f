//! Centralized server configuration.
//!
//! Loaded via the `config` crate from `SCAMBAIT__`-prefixed environment
//! variables, with `__` separating nested keys (`SCAMBAIT__AGENT__TIMEOUT_SECS`
//! sets `agent.timeout_secs`). Every key has a default, so an empty
//! environment yields a working configuration.

use crate::error::ConfigError;
use scambait_ai::{AgentConfig, LlmBackendConfig};
use scambait_conversation::DEFAULT_MAX_TURNS;
use scambait_detection::{DEFAULT_THRESHOLD, PatternConfig, PatternError, PatternLibrary};
use serde::Deserialize;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

/// Environment variable consulted when `SCAMBAIT__LLM__API_KEY` is unset.
pub const HF_TOKEN_VAR: &str = "HF_TOKEN";

/// Server configuration composed from the library configs.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Address to listen on.
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    /// Shared secret expected in the `x-api-key` header. Unset disables the
    /// check.
    #[serde(default)]
    pub api_key: Option<String>,

    /// Completion backend.
    #[serde(default)]
    pub llm: LlmBackendConfig,

    #[serde(default)]
    pub agent: AgentSettings,

    #[serde(default)]
    pub memory: MemorySettings,

    #[serde(default)]
    pub detection: DetectionSettings,
}

fn default_bind_addr() -> String {
    "0.0.0.0:8000".to_string()
}

/// Reply-agent settings.
#[derive(Debug, Clone, Deserialize)]
pub struct AgentSettings {
    /// Deadline for one completion call, in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
}

fn default_timeout_secs() -> u64 {
    25
}

fn default_max_tokens() -> u32 {
    100
}

fn default_temperature() -> f32 {
    0.8
}

impl Default for AgentSettings {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
            max_tokens: default_max_tokens(),
            temperature: default_temperature(),
        }
    }
}

impl AgentSettings {
    /// The agent configuration these settings describe.
    #[must_use]
    pub fn agent_config(&self) -> AgentConfig {
        AgentConfig {
            max_tokens: self.max_tokens,
            temperature: self.temperature,
            ..AgentConfig::default()
        }
        .with_timeout(self.timeout())
    }

    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Conversation-memory settings.
#[derive(Debug, Clone, Deserialize)]
pub struct MemorySettings {
    /// Number of turns retained in the context window.
    #[serde(default = "default_max_turns")]
    pub max_turns: usize,
}

fn default_max_turns() -> usize {
    DEFAULT_MAX_TURNS
}

impl Default for MemorySettings {
    fn default() -> Self {
        Self {
            max_turns: default_max_turns(),
        }
    }
}

/// Scam-detection settings.
#[derive(Debug, Clone, Deserialize)]
pub struct DetectionSettings {
    /// Confidence at or above which a message is flagged.
    #[serde(default = "default_threshold")]
    pub threshold: f64,

    /// JSON pattern configuration replacing the built-in patterns.
    #[serde(default)]
    pub patterns_file: Option<PathBuf>,
}

fn default_threshold() -> f64 {
    DEFAULT_THRESHOLD
}

impl Default for DetectionSettings {
    fn default() -> Self {
        Self {
            threshold: default_threshold(),
            patterns_file: None,
        }
    }
}

impl DetectionSettings {
    /// Loads the pattern library: the custom file when configured, the
    /// built-in library otherwise.
    ///
    /// # Errors
    ///
    /// Returns an error if the pattern file cannot be read, parsed or
    /// compiled.
    pub fn pattern_library(&self) -> scambait_core::Result<Arc<PatternLibrary>, PatternError> {
        let Some(path) = &self.patterns_file else {
            return Ok(PatternLibrary::builtin());
        };
        let config = PatternConfig::from_json_file(path)?;
        let library = PatternLibrary::from_config(&config)?;
        tracing::info!(
            path = %path.display(),
            signals = library.signals().len(),
            "loaded custom detection patterns"
        );
        Ok(Arc::new(library))
    }
}

impl ServerConfig {
    /// Loads configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if a variable cannot be parsed or a value is out of
    /// range.
    pub fn from_env() -> scambait_core::Result<Self, ConfigError> {
        Self::load(None, std::env::var(HF_TOKEN_VAR).ok())
    }

    /// Loads from an explicit variable map instead of the process
    /// environment.
    fn load(
        vars: Option<config::Map<String, String>>,
        hf_token: Option<String>,
    ) -> scambait_core::Result<Self, ConfigError> {
        let mut config: Self = config::Config::builder()
            .add_source(
                config::Environment::with_prefix("SCAMBAIT")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true)
                    .source(vars),
            )
            .build()
            .and_then(config::Config::try_deserialize)
            .map_err(|e| ConfigError::LoadFailed {
                reason: e.to_string(),
            })?;

        if config.llm.api_key.as_deref().is_none_or(|key| key.trim().is_empty()) {
            config.llm.api_key = hf_token.filter(|token| !token.trim().is_empty());
        }

        config.validate()?;
        Ok(config)
    }

    /// Checks value ranges.
    ///
    /// # Errors
    ///
    /// Returns the first out-of-range value found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.bind_addr.parse::<SocketAddr>().is_err() {
            return Err(ConfigError::Invalid {
                field: "bind_addr",
                reason: format!("'{}' is not a socket address", self.bind_addr),
            });
        }
        if self.agent.timeout_secs == 0 {
            return Err(ConfigError::Invalid {
                field: "agent.timeout_secs",
                reason: "must be greater than zero".to_string(),
            });
        }
        if !(0.0..=2.0).contains(&self.agent.temperature) {
            return Err(ConfigError::Invalid {
                field: "agent.temperature",
                reason: format!("{} is outside [0, 2]", self.agent.temperature),
            });
        }
        if !(0.0..=1.0).contains(&self.detection.threshold) {
            return Err(ConfigError::Invalid {
                field: "detection.threshold",
                reason: format!("{} is outside [0, 1]", self.detection.threshold),
            });
        }
        if self.memory.max_turns == 0 {
            return Err(ConfigError::Invalid {
                field: "memory.max_turns",
                reason: "must be at least 1".to_string(),
            });
        }
        Ok(())
    }

    /// The configured API key, if the check is enabled.
    #[must_use]
    pub fn api_key(&self) -> Option<&str> {
        self.api_key.as_deref().filter(|key| !key.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn load(pairs: &[(&str, &str)]) -> scambait_core::Result<ServerConfig, ConfigError> {
        let vars = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        ServerConfig::load(Some(vars), None)
    }

    #[test]
    fn empty_environment_uses_defaults() {
        let config = load(&[]).expect("defaults load");
        assert_eq!(config.bind_addr, "0.0.0.0:8000");
        assert!(config.api_key().is_none());
        assert_eq!(config.llm.model, "Qwen/Qwen2.5-1.5B-Instruct");
        assert_eq!(config.llm.endpoint(), "https://router.huggingface.co/v1");
        assert_eq!(config.agent.timeout(), Duration::from_secs(25));
        assert_eq!(config.agent.max_tokens, 100);
        assert_eq!(config.memory.max_turns, 20);
        assert_eq!(config.detection.threshold, 0.5);
        assert!(config.detection.patterns_file.is_none());
    }

    #[test]
    fn nested_keys_are_read() {
        let config = load(&[
            ("SCAMBAIT__API_KEY", "s3cret"),
            ("SCAMBAIT__LLM__BASE_URL", "http://127.0.0.1:11434/v1"),
            ("SCAMBAIT__LLM__MODEL", "llama3"),
            ("SCAMBAIT__AGENT__TIMEOUT_SECS", "10"),
            ("SCAMBAIT__AGENT__TEMPERATURE", "0.3"),
            ("SCAMBAIT__MEMORY__MAX_TURNS", "6"),
            ("SCAMBAIT__DETECTION__THRESHOLD", "0.7"),
        ])
        .expect("load");

        assert_eq!(config.api_key(), Some("s3cret"));
        assert_eq!(config.llm.endpoint(), "http://127.0.0.1:11434/v1");
        assert_eq!(config.llm.model, "llama3");
        assert_eq!(config.agent.agent_config().timeout, Duration::from_secs(10));
        assert_eq!(config.agent.temperature, 0.3);
        assert_eq!(config.memory.max_turns, 6);
        assert_eq!(config.detection.threshold, 0.7);
    }

    #[test]
    fn hf_token_fills_missing_llm_key() {
        let config =
            ServerConfig::load(Some(config::Map::new()), Some("hf_abc".to_string())).expect("load");
        assert_eq!(config.llm.api_key.as_deref(), Some("hf_abc"));

        let vars = [("SCAMBAIT__LLM__API_KEY".to_string(), "explicit".to_string())]
            .into_iter()
            .collect();
        let config = ServerConfig::load(Some(vars), Some("hf_abc".to_string())).expect("load");
        assert_eq!(config.llm.api_key.as_deref(), Some("explicit"));
    }

    #[test]
    fn out_of_range_values_are_rejected() {
        for (key, value, field) in [
            ("SCAMBAIT__AGENT__TIMEOUT_SECS", "0", "agent.timeout_secs"),
            ("SCAMBAIT__AGENT__TEMPERATURE", "3.5", "agent.temperature"),
            ("SCAMBAIT__DETECTION__THRESHOLD", "1.5", "detection.threshold"),
            ("SCAMBAIT__MEMORY__MAX_TURNS", "0", "memory.max_turns"),
            ("SCAMBAIT__BIND_ADDR", "not-an-addr", "bind_addr"),
        ] {
            let err = load(&[(key, value)]).expect_err("should be rejected");
            let rendered = err.to_string();
            assert!(
                rendered.contains(&format!("invalid configuration for '{field}'")),
                "{key}={value}: {rendered}"
            );
        }
    }

    #[test]
    fn unparseable_value_fails_to_load() {
        let err = load(&[("SCAMBAIT__AGENT__MAX_TOKENS", "lots")]).expect_err("not a number");
        assert!(err.to_string().contains("failed to load configuration"));
    }

    #[test]
    fn builtin_patterns_without_file() {
        let library = DetectionSettings::default()
            .pattern_library()
            .expect("builtin");
        assert!(!library.signals().is_empty());
    }

    #[test]
    fn patterns_file_replaces_builtin_signals() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        write!(
            file,
            r#"{{"signals": [{{"name": "crypto", "pattern": "\\busdt\\b", "weight": 0.6}}]}}"#
        )
        .expect("write patterns");

        let settings = DetectionSettings {
            patterns_file: Some(file.path().to_path_buf()),
            ..DetectionSettings::default()
        };
        let library = settings.pattern_library().expect("custom patterns");
        let names: Vec<&str> = library.signals().iter().map(|s| s.name()).collect();
        assert_eq!(names, vec!["crypto"]);
    }

    #[test]
    fn broken_patterns_file_is_an_error() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        write!(
            file,
            r#"{{"signals": [{{"name": "bad", "pattern": "(unclosed", "weight": 0.1}}]}}"#
        )
        .expect("write patterns");

        let settings = DetectionSettings {
            patterns_file: Some(file.path().to_path_buf()),
            ..DetectionSettings::default()
        };
        let err = settings.pattern_library().expect_err("invalid regex");
        assert!(err.to_string().contains("invalid pattern 'bad'"));
    }
}
