use crate::config::{ApiKey, Settings};
use crate::llm::error::LlmDiagnosticsError;
use crate::llm::{LlmClient, Provider, StructuredPrompt};
use anyhow::Context;
use reqwest::header::{HeaderMap, HeaderValue};
use serde::{Deserialize, Serialize};

const ANTHROPIC_VERSION: &str = "2023-06-01";
const DEFAULT_BASE_URL: &str = "https://api.anthropic.com";
const DEFAULT_MODEL: &str = "claude-3-5-sonnet-latest";
const DEFAULT_MAX_TOKENS: u32 = 4096;
const TEMPERATURE: f32 = 0.3;

#[derive(Debug, Clone)]
pub struct AnthropicClient {
    http: reqwest::Client,
    api_key: ApiKey,
    base_url: String,
    model: String,
    max_tokens: u32,
}

impl AnthropicClient {
    pub fn from_settings(settings: &Settings) -> anyhow::Result<Self> {
        let api_key = settings.require_anthropic_api_key()?.clone();
        let base_url = settings
            .anthropic_base_url
            .clone()
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        let model = settings
            .anthropic_model
            .clone()
            .unwrap_or_else(|| DEFAULT_MODEL.to_string());
        let max_tokens = settings.anthropic_max_tokens.unwrap_or(DEFAULT_MAX_TOKENS);

        let http = reqwest::Client::builder()
            .timeout(settings.llm_timeout)
            .build()
            .context("failed to build reqwest client")?;

        Ok(Self {
            http,
            api_key,
            base_url,
            model,
            max_tokens,
        })
    }

    async fn create_message(
        &self,
        req: CreateMessageRequest,
    ) -> anyhow::Result<CreateMessageResponse> {
        let mut headers = HeaderMap::new();
        let mut key = HeaderValue::from_str(self.api_key.expose())
            .context("ANTHROPIC_API_KEY contains invalid header characters")?;
        key.set_sensitive(true);
        headers.insert("x-api-key", key);
        headers.insert(
            "anthropic-version",
            HeaderValue::from_static(ANTHROPIC_VERSION),
        );

        let url = format!("{}/v1/messages", self.base_url.trim_end_matches('/'));
        let res = self
            .http
            .post(url)
            .headers(headers)
            .json(&req)
            .send()
            .await
            .context("Anthropic request failed")?;

        let status = res.status();
        let text = res
            .text()
            .await
            .context("failed to read Anthropic response body")?;
        if !status.is_success() {
            return Err(LlmDiagnosticsError::http(Provider::Anthropic, status, text).into());
        }

        serde_json::from_str::<CreateMessageResponse>(&text)
            .context("failed to decode Anthropic response into CreateMessageResponse")
    }

    fn request(&self, prompt: &StructuredPrompt, max_tokens: u32) -> CreateMessageRequest {
        CreateMessageRequest {
            model: self.model.clone(),
            max_tokens,
            temperature: TEMPERATURE,
            system: Some(prompt.system.clone()),
            messages: vec![Message {
                role: "user",
                content: prompt.user.clone(),
            }],
            tools: Some(vec![Tool {
                name: prompt.schema_name,
                description: prompt.schema_description,
                input_schema: prompt.schema.clone(),
            }]),
            tool_choice: Some(ToolChoice::Tool {
                name: prompt.schema_name,
            }),
        }
    }

    fn response_text(res: &CreateMessageResponse) -> String {
        let mut out = String::new();
        for block in &res.content {
            if let ContentBlock::Text { text } = block {
                if !out.is_empty() {
                    out.push('\n');
                }
                out.push_str(text);
            }
        }
        out
    }

    fn response_tool_input(res: &CreateMessageResponse, tool_name: &str) -> Option<serde_json::Value> {
        res.content.iter().find_map(|block| match block {
            ContentBlock::ToolUse { name, input, .. } if name == tool_name => Some(input.clone()),
            _ => None,
        })
    }
}

#[async_trait::async_trait]
impl LlmClient for AnthropicClient {
    fn provider(&self) -> Provider {
        Provider::Anthropic
    }

    async fn generate_structured(&self, prompt: &StructuredPrompt) -> anyhow::Result<String> {
        let mut res = self.create_message(self.request(prompt, self.max_tokens)).await?;

        // If the model hit max_tokens, retry once with a higher ceiling.
        if matches!(res.stop_reason.as_deref(), Some("max_tokens")) {
            let bumped = self.max_tokens.saturating_mul(2).max(8192);
            tracing::warn!(
                from = self.max_tokens,
                to = bumped,
                "Anthropic stop_reason=max_tokens; retrying once with higher max_tokens"
            );
            res = self.create_message(self.request(prompt, bumped)).await?;
        }

        if let Some(input) = Self::response_tool_input(&res, prompt.schema_name) {
            return serde_json::to_string(&input).context("failed to re-encode tool_use.input");
        }

        // Fallback to text (should be rare with a forced tool choice).
        tracing::debug!("Anthropic response had no tool_use block; using text content");
        Ok(Self::response_text(&res))
    }
}

#[derive(Debug, Clone, Serialize)]
struct CreateMessageRequest {
    model: String,
    max_tokens: u32,
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
    messages: Vec<Message>,

    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<Vec<Tool>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_choice: Option<ToolChoice>,
}

#[derive(Debug, Clone, Serialize)]
struct Message {
    role: &'static str,
    content: String,
}

#[derive(Debug, Clone, Deserialize)]
struct CreateMessageResponse {
    content: Vec<ContentBlock>,

    #[serde(default)]
    stop_reason: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
struct Tool {
    name: &'static str,
    description: &'static str,
    input_schema: serde_json::Value,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type")]
enum ToolChoice {
    #[serde(rename = "tool")]
    Tool { name: &'static str },
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type")]
enum ContentBlock {
    #[serde(rename = "text")]
    Text { text: String },

    #[serde(rename = "tool_use")]
    ToolUse {
        #[serde(default)]
        name: String,
        #[serde(default)]
        input: serde_json::Value,
    },

    #[serde(other)]
    Unknown,
}
