//! LLM Provider trait
//!
//! Abstracts the chat-completion call so that different backends (OpenAI,
//! Ollama, test doubles) can be used interchangeably by the intent resolver.

use anyhow::Result;
use serde::{Deserialize, Serialize};

/// One chat-completion request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatRequest {
    pub system_prompt: String,
    pub user_prompt: String,
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
}

/// Trait for LLM providers used by the intent resolver.
///
/// Providers only need to turn a system/user prompt pair into response
/// text; plan parsing happens in the agent.
#[async_trait::async_trait]
pub trait LlmProvider: Send + Sync {
    /// Send the request and return the assistant's text.
    async fn complete(&self, request: &ChatRequest) -> Result<String>;

    /// Get the provider name (e.g., "openai", "ollama").
    fn provider_name(&self) -> &str;
}
