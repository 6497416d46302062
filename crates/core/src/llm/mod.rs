pub mod anthropic;
pub mod error;
pub mod json;
mod sections;
pub mod openai;

use crate::config::Settings;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provider {
    Anthropic,
    OpenAI,
}

impl std::str::FromStr for Provider {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "anthropic" | "claude" => Ok(Provider::Anthropic),
            "openai" => Ok(Provider::OpenAI),
            other => anyhow::bail!("unknown LLM_PROVIDER {other:?} (expected anthropic or openai)"),
        }
    }
}

/// A prompt plus the JSON schema the answer must follow.
#[derive(Debug, Clone)]
pub struct StructuredPrompt {
    pub system: String,
    pub user: String,
    pub schema_name: &'static str,
    pub schema_description: &'static str,
    pub schema: serde_json::Value,
}

#[async_trait::async_trait]
pub trait LlmClient: Send + Sync {
    fn provider(&self) -> Provider;

    /// Returns the model's raw answer text (JSON when the provider honored the schema).
    async fn generate_structured(&self, prompt: &StructuredPrompt) -> anyhow::Result<String>;
}

/// Builds the configured client. `LLM_PROVIDER` wins; otherwise the first provider with a key.
pub fn client_from_settings(settings: &Settings) -> anyhow::Result<Arc<dyn LlmClient>> {
    let provider = match settings.llm_provider.as_deref() {
        Some(s) => s.parse::<Provider>()?,
        None if settings.anthropic_api_key.is_none() && settings.openai_api_key.is_some() => {
            Provider::OpenAI
        }
        None => Provider::Anthropic,
    };

    Ok(match provider {
        Provider::Anthropic => Arc::new(anthropic::AnthropicClient::from_settings(settings)?),
        Provider::OpenAI => Arc::new(openai::OpenAiClient::from_settings(settings)?),
    })
}
