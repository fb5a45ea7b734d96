//! Agent configuration
//!
//! `Config` is supplied by the caller (CLI, GUI, tests). It can be built in
//! code with the `with_*` setters, deserialized from any serde source, or
//! read from `SYSAGENT_*` environment variables with [`Config::from_env`].

use std::env;
use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Directory name used under the platform config directory
const APP_DIR: &str = "sysagent";

/// LLM backends the agent knows how to talk to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    /// OpenAI-compatible chat completions API
    OpenAi,
    /// Local Ollama server
    Ollama,
    /// No LLM: rule-based resolution only
    None,
}

impl FromStr for ProviderKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "openai" => Ok(ProviderKind::OpenAi),
            "ollama" => Ok(ProviderKind::Ollama),
            "none" | "local" | "rules" | "" => Ok(ProviderKind::None),
            other => Err(format!("unknown LLM provider: {}", other)),
        }
    }
}

impl std::fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProviderKind::OpenAi => write!(f, "openai"),
            ProviderKind::Ollama => write!(f, "ollama"),
            ProviderKind::None => write!(f, "none"),
        }
    }
}

/// Settings for LLM-backed resolution
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmSettings {
    /// Primary provider
    pub provider: ProviderKind,
    /// Providers tried, in order, after the primary fails
    pub fallback: Vec<ProviderKind>,
    /// Model name sent with each request
    pub model: String,
    /// Sampling temperature
    pub temperature: f32,
    /// Maximum tokens in the reply
    pub max_tokens: u32,
    /// API key for OpenAI-compatible providers
    pub api_key: Option<String>,
    /// Base URL override for OpenAI-compatible providers
    pub base_url: Option<String>,
    /// Base URL of the Ollama server
    pub ollama_base_url: String,
    /// Model used when the Ollama provider runs
    pub ollama_model: String,
    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            provider: ProviderKind::OpenAi,
            fallback: Vec::new(),
            model: "gpt-4o-mini".to_string(),
            temperature: 0.1,
            max_tokens: 2000,
            api_key: None,
            base_url: None,
            ollama_base_url: "http://localhost:11434".to_string(),
            ollama_model: "llama2".to_string(),
            timeout_secs: 30,
        }
    }
}

impl LlmSettings {
    /// Primary provider followed by the fallbacks, duplicates and `None` removed
    pub fn provider_order(&self) -> Vec<ProviderKind> {
        let mut order = Vec::new();
        for kind in std::iter::once(self.provider).chain(self.fallback.iter().copied()) {
            if kind != ProviderKind::None && !order.contains(&kind) {
                order.push(kind);
            }
        }
        order
    }
}

/// Safety switches
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SecurityConfig {
    /// Check permissions but never invoke handlers
    pub dry_run: bool,
    /// Append every command to the audit trail
    pub audit_logging: bool,
    /// Run the destructive-pattern denylist
    pub guardrails_enabled: bool,
    /// Whether permission prompts may block on the terminal
    pub interactive: bool,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            dry_run: false,
            audit_logging: true,
            guardrails_enabled: true,
            interactive: true,
        }
    }
}

/// Top-level configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// LLM settings
    pub agent: LlmSettings,
    /// Safety settings
    pub security: SecurityConfig,
    /// Explicit config directory (defaults to the per-user config dir)
    pub config_dir: Option<PathBuf>,
    /// Echo info-level logs to the terminal
    pub verbose: bool,
    /// Debug-level logging
    pub debug: bool,
}

impl Config {
    /// Create a default configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a configuration from `SYSAGENT_*` environment variables
    pub fn from_env() -> Self {
        let mut config = Self::default();
        let agent = &mut config.agent;

        if let Some(provider) = env_parse::<ProviderKind>("SYSAGENT_LLM_PROVIDER") {
            agent.provider = provider;
        }
        if let Ok(list) = env::var("SYSAGENT_LLM_FALLBACK") {
            agent.fallback = list
                .split(',')
                .filter(|s| !s.trim().is_empty())
                .filter_map(|s| match s.parse() {
                    Ok(kind) => Some(kind),
                    Err(e) => {
                        tracing::warn!("[Config] Ignoring fallback provider: {}", e);
                        None
                    }
                })
                .collect();
        }
        if let Some(model) = env_string("SYSAGENT_MODEL") {
            agent.model = model;
        }
        agent.api_key = env_string("SYSAGENT_OPENAI_API_KEY").or_else(|| env_string("OPENAI_API_KEY"));
        agent.base_url = env_string("SYSAGENT_OPENAI_BASE_URL");
        if let Some(url) = env_string("SYSAGENT_OLLAMA_BASE_URL") {
            agent.ollama_base_url = url;
        }
        if let Some(model) = env_string("SYSAGENT_OLLAMA_MODEL") {
            agent.ollama_model = model;
        }
        if let Some(temperature) = env_parse("SYSAGENT_TEMPERATURE") {
            agent.temperature = temperature;
        }
        if let Some(max_tokens) = env_parse("SYSAGENT_MAX_TOKENS") {
            agent.max_tokens = max_tokens;
        }
        if let Some(timeout) = env_parse("SYSAGENT_TIMEOUT") {
            agent.timeout_secs = timeout;
        }

        if let Some(dry_run) = env_flag("SYSAGENT_DRY_RUN") {
            config.security.dry_run = dry_run;
        }
        if let Some(audit) = env_flag("SYSAGENT_AUDIT_LOG") {
            config.security.audit_logging = audit;
        }
        config.verbose = env_flag("SYSAGENT_VERBOSE").unwrap_or(false);
        config.debug = env_flag("SYSAGENT_DEBUG").unwrap_or(false);
        config.config_dir = env_string("SYSAGENT_CONFIG_DIR").map(PathBuf::from);

        config
    }

    /// Set the primary LLM provider
    pub fn with_provider(mut self, provider: ProviderKind) -> Self {
        self.agent.provider = provider;
        self
    }

    /// Set the fallback providers
    pub fn with_fallback(mut self, fallback: Vec<ProviderKind>) -> Self {
        self.agent.fallback = fallback;
        self
    }

    /// Set the model name
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.agent.model = model.into();
        self
    }

    /// Set the OpenAI API key
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.agent.api_key = Some(api_key.into());
        self
    }

    /// Set the config directory
    pub fn with_config_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config_dir = Some(dir.into());
        self
    }

    /// Enable or disable dry-run mode
    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.security.dry_run = dry_run;
        self
    }

    /// Enable or disable the audit trail
    pub fn with_audit_logging(mut self, enabled: bool) -> Self {
        self.security.audit_logging = enabled;
        self
    }

    /// Enable or disable interactive permission prompts
    pub fn with_interactive(mut self, interactive: bool) -> Self {
        self.security.interactive = interactive;
        self
    }

    /// Resolve the config directory
    ///
    /// Explicit override first, then `<platform config dir>/sysagent`,
    /// then `./.sysagent` when the platform has no config dir.
    pub fn config_dir(&self) -> PathBuf {
        if let Some(dir) = &self.config_dir {
            return dir.clone();
        }
        dirs::config_dir()
            .map(|d| d.join(APP_DIR))
            .unwrap_or_else(|| PathBuf::from(format!(".{}", APP_DIR)))
    }

    /// Directory holding log files and the audit trail
    pub fn logs_dir(&self) -> PathBuf {
        self.config_dir().join("logs")
    }

    /// Path of the persisted permission map
    pub fn permissions_file(&self) -> PathBuf {
        self.config_dir().join("permissions.json")
    }
}

fn env_string(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn env_parse<T: FromStr>(key: &str) -> Option<T>
where
    T::Err: std::fmt::Display,
{
    let raw = env_string(key)?;
    match raw.parse() {
        Ok(value) => Some(value),
        Err(e) => {
            tracing::warn!("[Config] Ignoring {}={}: {}", key, raw, e);
            None
        }
    }
}

fn env_flag(key: &str) -> Option<bool> {
    env_string(key).map(|v| matches!(v.to_lowercase().as_str(), "1" | "true" | "yes" | "on"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults() {
        let config = Config::default();
        assert_eq!(config.agent.provider, ProviderKind::OpenAi);
        assert_eq!(config.agent.max_tokens, 2000);
        assert!((config.agent.temperature - 0.1).abs() < f32::EPSILON);
        assert!(!config.security.dry_run);
        assert!(config.security.guardrails_enabled);
    }

    #[test]
    fn test_provider_kind_parse() {
        assert_eq!("OpenAI".parse::<ProviderKind>(), Ok(ProviderKind::OpenAi));
        assert_eq!("ollama".parse::<ProviderKind>(), Ok(ProviderKind::Ollama));
        assert_eq!("local".parse::<ProviderKind>(), Ok(ProviderKind::None));
        assert!("bedrock".parse::<ProviderKind>().is_err());
    }

    #[test]
    fn test_provider_order_dedups() {
        let config = Config::new()
            .with_provider(ProviderKind::OpenAi)
            .with_fallback(vec![ProviderKind::None, ProviderKind::Ollama, ProviderKind::OpenAi]);
        assert_eq!(
            config.agent.provider_order(),
            vec![ProviderKind::OpenAi, ProviderKind::Ollama]
        );

        let config = Config::new().with_provider(ProviderKind::None);
        assert!(config.agent.provider_order().is_empty());
    }

    #[test]
    fn test_explicit_config_dir() {
        let config = Config::new().with_config_dir("/tmp/sysagent-test");
        assert_eq!(config.config_dir(), PathBuf::from("/tmp/sysagent-test"));
        assert_eq!(
            config.permissions_file(),
            PathBuf::from("/tmp/sysagent-test/permissions.json")
        );
        assert_eq!(config.logs_dir(), PathBuf::from("/tmp/sysagent-test/logs"));
    }

    #[test]
    fn test_deserialize_partial() {
        let config: Config =
            serde_json::from_str(r#"{"agent": {"provider": "ollama"}, "security": {"dry_run": true}}"#)
                .unwrap();
        assert_eq!(config.agent.provider, ProviderKind::Ollama);
        assert_eq!(config.agent.model, "gpt-4o-mini");
        assert!(config.security.dry_run);
        assert!(config.security.audit_logging);
    }
}
