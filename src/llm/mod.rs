pub mod chain;
pub mod ollama;
pub mod openai;
pub mod provider;

pub use chain::ProviderChain;
pub use ollama::OllamaProvider;
pub use openai::OpenAiProvider;
pub use provider::{ChatRequest, LlmProvider};
