use crate::config::{ApiKey, Settings};
use crate::error::PipelineError;
use crate::research::{SearchClient, SearchHit};
use anyhow::Context;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use std::time::Duration;

const DEFAULT_BASE_URL: &str = "https://api.tavily.com";
const DEFAULT_MAX_RESULTS: u32 = 5;

#[derive(Debug, Clone)]
pub struct TavilyClient {
    http: reqwest::Client,
    api_key: ApiKey,
    base_url: String,
    max_results: u32,
}

impl TavilyClient {
    pub fn from_settings(settings: &Settings) -> anyhow::Result<Self> {
        let api_key = settings.require_tavily_api_key()?.clone();
        let base_url = settings
            .tavily_base_url
            .clone()
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        let max_results = settings.tavily_max_results.unwrap_or(DEFAULT_MAX_RESULTS);
        Self::new(api_key, base_url, max_results, settings.search_timeout)
    }

    pub fn new(
        api_key: ApiKey,
        base_url: String,
        max_results: u32,
        timeout: Duration,
    ) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("failed to build Tavily http client")?;

        Ok(Self {
            http,
            api_key,
            base_url,
            max_results: max_results.clamp(1, 20),
        })
    }

    fn headers(&self) -> anyhow::Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        let mut auth = HeaderValue::from_str(&format!("Bearer {}", self.api_key.expose()))
            .context("Tavily API key contains invalid header characters")?;
        auth.set_sensitive(true);
        headers.insert(AUTHORIZATION, auth);
        Ok(headers)
    }
}

#[async_trait::async_trait]
impl SearchClient for TavilyClient {
    fn provider_name(&self) -> &'static str {
        "tavily"
    }

    async fn search(&self, query: &str) -> anyhow::Result<Vec<SearchHit>> {
        let req = SearchRequest {
            query,
            max_results: self.max_results,
            search_depth: "basic",
            include_answer: false,
            include_raw_content: false,
        };

        let url = format!("{}/search", self.base_url.trim_end_matches('/'));
        let res = self
            .http
            .post(url)
            .headers(self.headers()?)
            .json(&req)
            .send()
            .await
            .context("Tavily request failed")?;

        let status = res.status();
        if matches!(status, StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN) {
            return Err(PipelineError::research_unavailable(format!(
                "Tavily rejected the configured credential (HTTP {status})"
            ))
            .into());
        }

        let text = res
            .text()
            .await
            .context("failed to read Tavily response body")?;
        if !status.is_success() {
            anyhow::bail!("Tavily HTTP {status}: {text}");
        }

        let parsed = serde_json::from_str::<SearchResponse>(&text)
            .context("failed to decode Tavily response into SearchResponse")?;
        Ok(parsed.into_hits())
    }
}

#[derive(Debug, Serialize)]
struct SearchRequest<'a> {
    query: &'a str,
    max_results: u32,
    search_depth: &'static str,
    include_answer: bool,
    include_raw_content: bool,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    results: Vec<SearchResult>,
}

#[derive(Debug, Deserialize)]
struct SearchResult {
    #[serde(default)]
    title: String,
    #[serde(default)]
    url: String,
    #[serde(default)]
    content: String,
}

impl SearchResponse {
    fn into_hits(self) -> Vec<SearchHit> {
        self.results
            .into_iter()
            .map(|r| SearchHit {
                title: r.title,
                snippet: r.content,
                url: r.url,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn decodes_results_and_tolerates_missing_fields() {
        let v = json!({
            "query": "Apple Inc. industry news",
            "results": [
                {"title": "Apple beats estimates", "url": "https://news.example/a", "content": "Revenue up", "score": 0.91},
                {"title": "No body"}
            ]
        });
        let parsed: SearchResponse = serde_json::from_value(v).unwrap();
        let hits = parsed.into_hits();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].snippet, "Revenue up");
        assert_eq!(hits[1].url, "");
    }

    #[test]
    fn empty_body_yields_no_hits() {
        let parsed: SearchResponse = serde_json::from_value(json!({})).unwrap();
        assert!(parsed.into_hits().is_empty());
    }

    #[test]
    fn auth_header_is_marked_sensitive() {
        let client = TavilyClient::new(
            ApiKey::new("tvly-secret"),
            DEFAULT_BASE_URL.to_string(),
            50,
            Duration::from_secs(5),
        )
        .unwrap();
        assert_eq!(client.max_results, 20);
        let headers = client.headers().unwrap();
        assert!(headers[AUTHORIZATION].is_sensitive());
        assert!(!format!("{client:?}").contains("tvly-secret"));
    }
}
