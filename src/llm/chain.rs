//! Ordered provider fallback
//!
//! Wraps several `LlmProvider`s and tries them in order. The agent sees a
//! single `Arc<dyn LlmProvider>`.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;

use super::ollama::OllamaProvider;
use super::openai::OpenAiProvider;
use super::provider::{ChatRequest, LlmProvider};
use crate::config::{LlmSettings, ProviderKind};

/// Providers tried in order until one answers
pub struct ProviderChain {
    providers: Vec<Arc<dyn LlmProvider>>,
}

impl ProviderChain {
    pub fn new(providers: Vec<Arc<dyn LlmProvider>>) -> Self {
        Self { providers }
    }

    /// Build the chain described by `settings`
    ///
    /// Providers that cannot be constructed (for example OpenAI without a
    /// key) are skipped with a warning. Returns `None` when nothing usable
    /// remains, meaning rule-only resolution.
    pub fn from_settings(settings: &LlmSettings) -> Option<Self> {
        let timeout = Duration::from_secs(settings.timeout_secs.max(1));
        let mut providers: Vec<Arc<dyn LlmProvider>> = Vec::new();

        for kind in settings.provider_order() {
            let built: Result<Arc<dyn LlmProvider>> = match kind {
                ProviderKind::OpenAi => match &settings.api_key {
                    Some(key) => OpenAiProvider::new(key, timeout).map(|p| {
                        let p = match &settings.base_url {
                            Some(url) => p.with_base_url(url),
                            None => p,
                        };
                        Arc::new(p) as Arc<dyn LlmProvider>
                    }),
                    None => Err(anyhow::anyhow!("no API key configured")),
                },
                ProviderKind::Ollama => OllamaProvider::new(&settings.ollama_base_url, timeout)
                    .map(|p| Arc::new(p.with_model(&settings.ollama_model)) as Arc<dyn LlmProvider>),
                ProviderKind::None => continue,
            };

            match built {
                Ok(provider) => {
                    tracing::info!("[LLM] Using provider: {}", provider.provider_name());
                    providers.push(provider);
                }
                Err(e) => tracing::warn!("[LLM] Skipping provider {}: {}", kind, e),
            }
        }

        if providers.is_empty() {
            tracing::info!("[LLM] No provider available, using rule-based resolution");
            None
        } else {
            Some(Self::new(providers))
        }
    }

    pub fn len(&self) -> usize {
        self.providers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }

    /// Names of the providers, in the order they are tried
    pub fn provider_names(&self) -> Vec<String> {
        self.providers.iter().map(|p| p.provider_name().to_string()).collect()
    }
}

#[async_trait::async_trait]
impl LlmProvider for ProviderChain {
    async fn complete(&self, request: &ChatRequest) -> Result<String> {
        let mut last_error = anyhow::anyhow!("no LLM providers configured");

        for provider in &self.providers {
            match provider.complete(request).await {
                Ok(text) => return Ok(text),
                Err(e) => {
                    tracing::warn!("[LLM] {} failed: {:#}", provider.provider_name(), e);
                    last_error = e;
                }
            }
        }

        Err(last_error)
    }

    fn provider_name(&self) -> &str {
        "chain"
    }
}
