//! Ollama provider (`/api/chat`, non-streaming)

use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::provider::{ChatRequest, LlmProvider};

#[derive(Debug, Serialize)]
struct OllamaRequest<'a> {
    model: &'a str,
    messages: Vec<OllamaMessage<'a>>,
    stream: bool,
    options: OllamaOptions,
}

#[derive(Debug, Serialize)]
struct OllamaMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct OllamaOptions {
    temperature: f32,
    num_predict: u32,
}

#[derive(Debug, Deserialize)]
struct OllamaResponse {
    message: Option<OllamaReply>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OllamaReply {
    #[serde(default)]
    content: String,
}

/// Provider for a local Ollama server
pub struct OllamaProvider {
    client: Client,
    base_url: String,
    model: Option<String>,
}

impl OllamaProvider {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            model: None,
        })
    }

    /// Pin the model regardless of the request
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    fn endpoint(&self) -> String {
        format!("{}/api/chat", self.base_url)
    }
}

#[async_trait::async_trait]
impl LlmProvider for OllamaProvider {
    async fn complete(&self, request: &ChatRequest) -> Result<String> {
        let body = OllamaRequest {
            model: self.model.as_deref().unwrap_or(&request.model),
            messages: vec![
                OllamaMessage {
                    role: "system",
                    content: &request.system_prompt,
                },
                OllamaMessage {
                    role: "user",
                    content: &request.user_prompt,
                },
            ],
            stream: false,
            options: OllamaOptions {
                temperature: request.temperature,
                num_predict: request.max_tokens,
            },
        };

        tracing::debug!("[Ollama] POST {} (model {})", self.endpoint(), body.model);

        let response = self
            .client
            .post(self.endpoint())
            .json(&body)
            .send()
            .await
            .context("Failed to send request to Ollama")?;

        let status = response.status();
        let text = response
            .text()
            .await
            .context("Failed to read Ollama response body")?;

        if !status.is_success() {
            tracing::error!("[Ollama] API error: {} - {}", status, text);
            anyhow::bail!("Ollama API error ({}): {}", status, text);
        }

        parse_chat(&text)
    }

    fn provider_name(&self) -> &str {
        "ollama"
    }
}

/// Extract the reply text from a non-streaming `/api/chat` body
pub fn parse_chat(body: &str) -> Result<String> {
    let response: OllamaResponse =
        serde_json::from_str(body).context("Failed to parse Ollama response")?;
    if let Some(error) = response.error {
        anyhow::bail!("Ollama error: {}", error);
    }
    response
        .message
        .map(|m| m.content)
        .filter(|c| !c.is_empty())
        .context("No content in Ollama response")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_chat() {
        let body = r#"{"model":"llama2","message":{"role":"assistant","content":"hello"},"done":true}"#;
        assert_eq!(parse_chat(body).unwrap(), "hello");
    }

    #[test]
    fn test_parse_chat_errors() {
        assert!(parse_chat(r#"{"error":"model not found"}"#).is_err());
        assert!(parse_chat(r#"{"message":{"role":"assistant","content":""}}"#).is_err());
    }

    #[test]
    fn test_endpoint() {
        let provider = OllamaProvider::new("http://localhost:11434/", Duration::from_secs(1)).unwrap();
        assert_eq!(provider.endpoint(), "http://localhost:11434/api/chat");
    }
}
