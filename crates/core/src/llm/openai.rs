use crate::config::{ApiKey, Settings};
use crate::llm::error::LlmDiagnosticsError;
use crate::llm::{LlmClient, Provider, StructuredPrompt};
use anyhow::Context;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use serde::{Deserialize, Serialize};

const DEFAULT_BASE_URL: &str = "https://api.openai.com";
const DEFAULT_MODEL: &str = "gpt-4o";
const TEMPERATURE: f32 = 0.3;

#[derive(Debug, Clone)]
pub struct OpenAiClient {
    http: reqwest::Client,
    api_key: ApiKey,
    base_url: String,
    model: String,
}

impl OpenAiClient {
    pub fn from_settings(settings: &Settings) -> anyhow::Result<Self> {
        let api_key = settings.require_openai_api_key()?.clone();
        let base_url = settings
            .openai_base_url
            .clone()
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        let model = settings
            .openai_model
            .clone()
            .unwrap_or_else(|| DEFAULT_MODEL.to_string());

        let http = reqwest::Client::builder()
            .timeout(settings.llm_timeout)
            .build()
            .context("failed to build reqwest client")?;

        Ok(Self {
            http,
            api_key,
            base_url,
            model,
        })
    }

    fn request<'a>(&'a self, prompt: &'a StructuredPrompt) -> ChatRequest<'a> {
        ChatRequest {
            model: &self.model,
            temperature: TEMPERATURE,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: &prompt.system,
                },
                ChatMessage {
                    role: "user",
                    content: &prompt.user,
                },
            ],
            response_format: ResponseFormat::JsonSchema {
                json_schema: JsonSchemaFormat {
                    name: prompt.schema_name,
                    description: prompt.schema_description,
                    schema: &prompt.schema,
                },
            },
        }
    }

    fn response_text(res: ChatResponse) -> anyhow::Result<String> {
        let choice = res
            .choices
            .into_iter()
            .next()
            .context("OpenAI response contained no choices")?;
        if choice.finish_reason.as_deref() == Some("length") {
            tracing::warn!("OpenAI finish_reason=length; report output may be truncated");
        }
        if let Some(refusal) = choice.message.refusal.filter(|s| !s.trim().is_empty()) {
            anyhow::bail!("OpenAI model refused the request: {refusal}");
        }
        Ok(choice.message.content.unwrap_or_default())
    }
}

#[async_trait::async_trait]
impl LlmClient for OpenAiClient {
    fn provider(&self) -> Provider {
        Provider::OpenAI
    }

    async fn generate_structured(&self, prompt: &StructuredPrompt) -> anyhow::Result<String> {
        let mut headers = HeaderMap::new();
        let mut auth = HeaderValue::from_str(&format!("Bearer {}", self.api_key.expose()))
            .context("OPENAI_API_KEY contains invalid header characters")?;
        auth.set_sensitive(true);
        headers.insert(AUTHORIZATION, auth);

        let url = format!(
            "{}/v1/chat/completions",
            self.base_url.trim_end_matches('/')
        );
        let res = self
            .http
            .post(url)
            .headers(headers)
            .json(&self.request(prompt))
            .send()
            .await
            .context("OpenAI request failed")?;

        let status = res.status();
        let text = res
            .text()
            .await
            .context("failed to read OpenAI response body")?;
        if !status.is_success() {
            return Err(LlmDiagnosticsError::http(Provider::OpenAI, status, text).into());
        }

        let parsed = serde_json::from_str::<ChatResponse>(&text)
            .context("failed to decode OpenAI response into ChatResponse")?;
        Self::response_text(parsed)
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    temperature: f32,
    messages: Vec<ChatMessage<'a>>,
    response_format: ResponseFormat<'a>,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ResponseFormat<'a> {
    JsonSchema { json_schema: JsonSchemaFormat<'a> },
}

#[derive(Debug, Serialize)]
struct JsonSchemaFormat<'a> {
    name: &'static str,
    description: &'static str,
    schema: &'a serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChatResponseMessage {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    refusal: Option<String>,
}
